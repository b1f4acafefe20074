pub mod client;
pub mod models;
pub mod oauth;
pub mod parser;
pub mod token;
