pub type SpoilerResult<T> = Result<T, SpoilerError>;

#[derive(thiserror::Error, Debug)]
pub enum SpoilerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpoilerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }
}
