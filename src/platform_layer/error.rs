// Represents errors that can occur within the platform adapter layer.
//
// Once the session is connected, per-item failures are reported through the
// core error taxonomy instead; the only failure the adapter itself raises is
// failing to bring the automation surface up.
#[derive(Debug, Clone)]
pub enum PlatformError {
    /// Failure during the initialization of the platform layer or its components.
    InitializationFailed(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::InitializationFailed(s) => write!(f, "Initialization Failed: {}", s),
        }
    }
}

impl std::error::Error for PlatformError {}

/// A specialized `Result` type for platform layer operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
