// Persistence layer
pub mod guild_config;

pub use guild_config::ConfigStore;
