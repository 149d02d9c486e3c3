//! Test controller error types

#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Common(#[from] yaks_common::Error),

    #[error("missing namespace on Test")]
    MissingNamespace,

    #[error("Test '{0}' has no TestID; it was never initialized")]
    MissingTestId(String),
}

impl TestError {
    /// Whether the API server rejected a write because of a stale resourceVersion
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Kube(kube::Error::Api(ae)) => ae.code == 409,
            Self::Common(e) => e.is_conflict(),
            _ => false,
        }
    }

    /// Short label used for the `error_type` log field
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Kube(_) => "kube",
            Self::Serialization(_) => "serialization",
            Self::Common(e) => e.kind_label(),
            Self::MissingNamespace | Self::MissingTestId(_) => "invalid-state",
        }
    }
}
