use thiserror::Error;

/// Failures that abort a whole validation run. Anything short of these is
/// reported as a failing check instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The host schema lacks a module type the checks cannot do without.
    #[error("required module type `{0}` is not installed")]
    MissingModuleType(String),
    #[error("failed to read course data: {0:#}")]
    Repository(anyhow::Error),
}

impl EngineError {
    /// Configuration errors are not worth retrying on the next pass.
    pub fn is_fatal_configuration(&self) -> bool {
        matches!(self, EngineError::MissingModuleType(_))
    }
}
