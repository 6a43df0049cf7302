pub type UvfxResult<T> = Result<T, UvfxError>;

#[derive(thiserror::Error, Debug)]
pub enum UvfxError {
    /// A required named node-group template does not exist in the host project.
    /// Raised before the existing graph is cleared, so the tree stays intact.
    #[error("missing node-group template: '{0}'")]
    MissingTemplate(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("media error: {0}")]
    Media(String),

    #[error("graph error: {0}")]
    Graph(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UvfxError {
    pub fn missing_template(name: impl Into<String>) -> Self {
        Self::MissingTemplate(name.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph(msg.into())
    }
}
