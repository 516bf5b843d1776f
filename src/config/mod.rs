//! Configuration — project settings loaded from `.cryptstore.toml`.

pub mod settings;

pub use settings::Settings;
