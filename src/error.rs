use thiserror::Error;

/// Errors while loading a table configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors while registering a custom cell type provider
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("cell type provider has an empty name")]
    EmptyName,

    #[error("cell type '{0}' collides with a standard cell type")]
    ReservedName(String),

    #[error("cell type '{0}' is already registered")]
    Duplicate(String),

    #[error("cell type '{name}' declares an empty type attribute name")]
    EmptyAttribute { name: String },
}
