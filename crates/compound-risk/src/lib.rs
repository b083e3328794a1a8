pub mod config;
pub mod constants;
pub mod core;
pub mod errors;
pub mod logging;
pub mod store;
pub mod types;
