pub mod config;
pub mod fetch;
pub mod inegi;
pub mod logging;
