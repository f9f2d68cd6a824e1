pub mod config;
pub mod log;

pub use config::Config;
