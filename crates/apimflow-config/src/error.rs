use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Manifest file not found. Looked in:\n\
        - current directory: apim.local.yaml, .apim.local.yaml, apim.yaml, .apim.yaml\n\
        - the ./.apimflow/ directory\n\
        - ~/.config/apimflow/apim.yaml\n\
        Set APIM_MANIFEST_PATH or pass --file to point at one directly"
    )]
    ManifestNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
