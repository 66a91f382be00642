use thiserror::Error;

#[derive(Error, Debug)]
pub enum StratevoError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(
        "Constraint exhaustion in generation {generation}: produced {produced}/{target} valid offspring after {attempts} attempts"
    )]
    ConstraintExhaustion {
        generation: u32,
        produced: usize,
        target: usize,
        attempts: usize,
    },

    #[error("Population has not been seeded")]
    NotSeeded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Layered config error: {0}")]
    Layered(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, StratevoError>;
