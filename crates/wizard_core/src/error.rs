use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to analysis backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid data url: {0}")]
    InvalidDataUrl(String),
    #[error("asset is not available locally: {0}")]
    AssetUnavailable(String),
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}
