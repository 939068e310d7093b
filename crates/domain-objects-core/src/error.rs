use crate::provider::ProviderId;
use std::fmt;

/// Failure reported by a [`Provider`](crate::Provider) while computing its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Errors surfaced by operations that have to materialize pending entries.
///
/// The entry that failed stays pending; see
/// [`FailurePolicy`](crate::options::FailurePolicy) for whether the next access
/// calls the provider again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// The provider failed while being realized by this operation.
    Provider {
        provider: ProviderId,
        source: ProviderError,
    },
    /// The provider failed earlier and the collection is configured to keep
    /// reporting that failure instead of retrying.
    Poisoned {
        provider: ProviderId,
        source: ProviderError,
    },
}

impl CollectionError {
    pub fn provider(&self) -> ProviderId {
        match self {
            CollectionError::Provider { provider, .. }
            | CollectionError::Poisoned { provider, .. } => *provider,
        }
    }

    pub fn provider_error(&self) -> &ProviderError {
        match self {
            CollectionError::Provider { source, .. } | CollectionError::Poisoned { source, .. } => {
                source
            }
        }
    }
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::Provider { provider, source } => {
                write!(f, "provider {provider} failed: {source}")
            }
            CollectionError::Poisoned { provider, source } => {
                write!(f, "provider {provider} previously failed: {source}")
            }
        }
    }
}

impl std::error::Error for CollectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.provider_error())
    }
}
