//! Recursion guards for same-thread re-entrant construction.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::early::EarlyObject;
use crate::error::{InjectError, InjectResult};

/// Callback invoked when a factory re-enters its own construction.
///
/// The guard never produces a value. Returning `Ok(())` lets the nested read
/// observe whatever is currently stored (usually nothing); returning an
/// error aborts the nested read, and the error travels out through the
/// factory to the original reader.
pub type RecursionGuard = Arc<dyn Fn(&EarlyObject) -> InjectResult<()> + Send + Sync>;

/// Lets the re-entrant read continue without a value.
pub fn lenient_recursion_guard(_early: &EarlyObject) -> InjectResult<()> {
    Ok(())
}

/// Rejects the re-entrant read with a recursion error naming the handle.
pub fn strict_recursion_guard(early: &EarlyObject) -> InjectResult<()> {
    Err(InjectError::Recursion(early.to_string()))
}

/// Built-in recursion policies.
///
/// # Examples
///
/// ```rust
/// use scope_inject::{InjectError, Injection, RecursionPolicy, Scope};
///
/// let scope = Scope::new();
/// let inner = scope.clone();
/// Injection::new(move || {
///     // Reads its own alias while being built
///     let fallback = inner.get_or("total", 0u64)?;
///     Ok(*fallback + 1)
/// })
/// .recursion(RecursionPolicy::Lenient)
/// .assign_to(&["total"], &scope)
/// .unwrap();
///
/// assert_eq!(*scope.get::<u64>("total").unwrap(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum RecursionPolicy {
    /// Nested read yields no value
    #[default]
    Lenient,
    /// Nested read fails with [`InjectError::Recursion`]
    Strict,
}

impl RecursionPolicy {
    /// The guard implementing this policy.
    pub fn guard(self) -> RecursionGuard {
        match self {
            RecursionPolicy::Lenient => Arc::new(lenient_recursion_guard),
            RecursionPolicy::Strict => Arc::new(strict_recursion_guard),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecursionPolicy::Lenient => "lenient",
            RecursionPolicy::Strict => "strict",
        }
    }
}

impl fmt::Display for RecursionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecursionPolicy {
    type Err = InjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(RecursionPolicy::Lenient),
            "strict" => Ok(RecursionPolicy::Strict),
            _ => Err(InjectError::InvalidConfig {
                key: "recursion".to_string(),
                value: s.to_string(),
            }),
        }
    }
}
