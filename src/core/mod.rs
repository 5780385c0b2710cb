pub mod config;
pub mod env;
pub mod errors;
pub mod kernel;
pub mod params;
pub(crate) mod time;
