//! # scope-inject
//!
//! Lazy, transparent value injection into shared name-to-value scopes.
//!
//! An [`Injection`] describes how to build a value. Attaching it to one or
//! more aliases of a [`Scope`] installs a placeholder under each alias; the
//! first read of an alias runs the factory and rewrites the entry, so later
//! readers see a plain value.
//!
//! ## Features
//!
//! - **Lazy construction**: nothing is built until an alias is read
//! - **Multiple aliases**: one attachment, several names, one shared record
//! - **Build policies**: build once per attachment or on every pass; freeze
//!   after the first read or keep rebuilding per access (dynamic)
//! - **Recursion guards**: lenient or strict handling of a factory reading
//!   the alias it is building
//! - **Thread-safe**: concurrent first reads of a build-once alias observe
//!   one value
//! - **Traceability**: `tracing` events plus pluggable [`InjectionObserver`]s
//!
//! ## Quick Start
//!
//! ```rust
//! use scope_inject::{Injection, Scope};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = calls.clone();
//!
//! let scope = Scope::new();
//! Injection::new(move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(Database { url: "postgres://localhost".to_string() })
//! })
//! .once(true)
//! .assign_to(&["db", "database"], &scope)
//! .unwrap();
//!
//! // Nothing has been built yet
//! assert_eq!(calls.load(Ordering::SeqCst), 0);
//!
//! let db = scope.get::<Database>("db").unwrap();
//! let same = scope.get::<Database>("database").unwrap();
//! assert_eq!(db.url, "postgres://localhost");
//! assert!(Arc::ptr_eq(&db, &same));
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Dynamic Aliases
//!
//! ```rust
//! use scope_inject::{Injection, Scope};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let next = AtomicUsize::new(0);
//! let scope = Scope::new();
//! Injection::new(move || {
//!     Ok(format!("injected_object_{}", next.fetch_add(1, Ordering::SeqCst) + 1))
//! })
//! .dynamic(true)
//! .assign_to(&["obj"], &scope)
//! .unwrap();
//!
//! assert_eq!(*scope.get::<String>("obj").unwrap(), "injected_object_1");
//! assert_eq!(*scope.get::<String>("obj").unwrap(), "injected_object_2");
//! ```
//!
//! ## Strict Recursion
//!
//! ```rust
//! use scope_inject::{inject, Injection, Scope};
//!
//! let scope = Scope::new();
//! let inner = scope.clone();
//! inject(&["me"], &scope, Injection::new(move || {
//!     Ok(*inner.get::<u8>("me")? + 1)
//! }))
//! .unwrap();
//!
//! let err = scope.get::<u8>("me").unwrap_err();
//! assert!(err.is_recursion());
//! assert!(err.to_string().contains("requested itself"));
//! ```

// Module declarations
pub mod compat;
pub mod config;
pub mod context;
pub mod early;
pub mod error;
pub mod injection;
pub mod injector;
pub mod key;
pub mod observer;
pub mod recursion;
pub mod scope;
pub mod state;

// Internal modules
mod internal;

// Re-export core types
pub use config::{ConfigSource, EnvironmentConfigSource, InjectorConfig};
pub use context::{context_injection, ContextSource};
pub use early::EarlyObject;
pub use error::{InjectError, InjectResult};
pub use injection::{inject, injection, AttachedHandles, Injection};
pub use injector::{Injector, InjectorBuilder};
pub use key::InjectionKey;
pub use observer::{CountingObserver, InjectionObserver, TracingObserver};
pub use recursion::{lenient_recursion_guard, strict_recursion_guard, RecursionGuard, RecursionPolicy};
pub use scope::Scope;
pub use state::ObjectState;
