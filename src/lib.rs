pub mod api;
pub mod config;
pub mod errors;
pub mod manifest;
pub mod operator;
pub mod plan;
mod preview;
mod prompt;
