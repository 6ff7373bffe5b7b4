#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PointerError {
    #[error("Malformed url: {0}")]
    MalformedUrl(String),

    #[error("Pointer already disposed: {0}")]
    AlreadyDisposed(String),

    #[error("Pointer is disposed: {0}")]
    Disposed(String),

    #[error("Domain mismatch: {0}")]
    DomainMismatch(String),

    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PointerError>;

/// Reports a structural violation according to the strictness policy.
///
/// Strict registries surface the error to the caller; production ones log it
/// and carry on with best-effort state.
pub fn report_violation(strict: bool, error: PointerError) -> Result<()> {
    if strict {
        Err(error)
    } else {
        log::error!("{error}");
        Ok(())
    }
}
