pub mod configuration;
pub mod vault;
