use thiserror::Error;

pub mod app_config;
pub mod categories;
pub mod company;
pub mod config;
pub mod scoring;

pub use app_config::AppConfig;
pub use categories::QueryCategory;
pub use company::{load_companies, CompaniesFile, CompanyProfile};
pub use config::{load_app_config, load_app_config_from_env};
pub use scoring::{AuthorityWeights, PlatformProfile, ScoringPolicy, ShareOfVoicePolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    FileParse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}
