use crate::models::{ConsumerState, LookupKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unresolved {kind} '{key}' for {requester}")]
    NotFound {
        kind: LookupKind,
        key: String,
        requester: String,
    },
    /// Only visible through introspection; callers see [`ResolveError::NotFound`].
    #[error("{kind} '{key}' denied by policy for {requester}")]
    DeniedByPolicy {
        kind: LookupKind,
        key: String,
        requester: String,
    },
    #[error("{kind} '{identity}' is already registered")]
    AmbiguousRegistration { kind: LookupKind, identity: String },
    #[error("resolution of '{key}' failed: {message}")]
    CacheComputationFailed { key: String, message: String },
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },
    #[error("consumer '{consumer}' cannot move from {from} to {to}")]
    InvalidTransition {
        consumer: String,
        from: ConsumerState,
        to: ConsumerState,
    },
}

impl ResolveError {
    pub fn not_found(kind: LookupKind, key: impl Into<String>, requester: impl ToString) -> Self {
        ResolveError::NotFound {
            kind,
            key: key.into(),
            requester: requester.to_string(),
        }
    }

    /// Map internal-only variants onto what a caller is allowed to observe.
    /// A denied import and an absent export look identical from the outside.
    pub fn surface(self) -> Self {
        match self {
            ResolveError::DeniedByPolicy {
                kind,
                key,
                requester,
            } => ResolveError::NotFound {
                kind,
                key,
                requester,
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ResolveError::NotFound { .. } | ResolveError::DeniedByPolicy { .. }
        )
    }
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
