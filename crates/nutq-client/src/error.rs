use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid client configuration: {0}")]
    Config(String),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}
