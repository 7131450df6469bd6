//! Error types for scope injection.

use std::error::Error as StdError;
use std::sync::Arc;

/// Injection errors
///
/// Represents the error conditions that can occur while attaching an
/// injection to a scope or while reading an injected alias.
///
/// Errors raised by user factories travel through unchanged inside
/// [`InjectError::Factory`]: the message is displayed verbatim and the
/// original error value stays reachable through [`InjectError::downcast_ref`].
///
/// # Examples
///
/// ```rust
/// use scope_inject::{InjectError, Injection, Scope};
///
/// #[derive(Debug)]
/// struct Offline;
///
/// impl std::fmt::Display for Offline {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "database offline")
///     }
/// }
///
/// impl std::error::Error for Offline {}
///
/// let scope = Scope::new();
/// Injection::<u32>::new(|| Err(InjectError::factory(Offline)))
///     .assign_to(&["db"], &scope)
///     .unwrap();
///
/// let err = scope.get::<u32>("db").unwrap_err();
/// assert_eq!(err.to_string(), "database offline");
/// assert!(err.downcast_ref::<Offline>().is_some());
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum InjectError {
    /// An attachment call named no aliases
    #[error("expected at least one alias in {0}")]
    NoAliases(String),
    /// Same-thread re-entrant construction under the strict recursion policy
    #[error("{0} requested itself")]
    Recursion(String),
    /// Error raised by a user factory, carried verbatim
    #[error(transparent)]
    Factory(Arc<dyn StdError + Send + Sync>),
    /// A host capability (such as frame introspection) is not available
    #[error("{0} is unavailable on this platform")]
    CapabilityUnavailable(&'static str),
    /// Nothing is bound under the alias
    #[error("alias not found: {0}")]
    NotFound(String),
    /// The alias is bound to a value of another type
    #[error("type mismatch for alias {alias}: expected {expected}")]
    TypeMismatch {
        alias: String,
        expected: &'static str,
    },
    /// An externally-managed context cell could not be read
    #[error("context source unavailable: {0}")]
    ContextUnavailable(&'static str),
    /// A configuration value could not be parsed
    #[error("invalid configuration value for {key}: {value:?}")]
    InvalidConfig { key: String, value: String },
    /// The owning injector no longer accepts attachments
    #[error("injector has been shut down")]
    ShutDown,
}

impl InjectError {
    /// Wraps an error raised inside a factory.
    pub fn factory<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        InjectError::Factory(Arc::new(error))
    }

    /// Wraps a plain message raised inside a factory.
    pub fn factory_msg(message: impl Into<String>) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = message.into().into();
        InjectError::Factory(Arc::from(boxed))
    }

    /// Returns the original factory error if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            InjectError::Factory(inner) => {
                let inner: &(dyn StdError + Send + Sync + 'static) = &**inner;
                inner.downcast_ref::<E>()
            }
            _ => None,
        }
    }

    /// True for recursion errors raised by the strict guard.
    pub fn is_recursion(&self) -> bool {
        matches!(self, InjectError::Recursion(_))
    }
}

/// Result type for injection operations
///
/// A convenience alias for `Result<T, InjectError>`. Factories return it, and
/// so does every scope read.
///
/// ```rust
/// use scope_inject::{InjectError, InjectResult};
///
/// fn build_port() -> InjectResult<u16> {
///     Ok(8080)
/// }
///
/// fn missing() -> InjectResult<u16> {
///     Err(InjectError::NotFound("port".to_string()))
/// }
///
/// assert_eq!(build_port().unwrap(), 8080);
/// assert!(missing().is_err());
/// ```
pub type InjectResult<T> = Result<T, InjectError>;
