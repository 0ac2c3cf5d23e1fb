//! Keystore convergence engine.
//!
//! Drives `keytool` so that each declared alias of a Java keystore ends up
//! holding exactly the declared entry, touching the keystore only when the
//! current state differs.

pub mod cli;
pub mod command;
pub mod convergence;
pub mod error;
pub mod help;
pub mod infrastructure;
pub mod resolver;
pub mod snapshot;
pub mod types;

pub use convergence::engine::{Assessment, Engine, Outcome, Report};
pub use error::{ReconcileError, ReconcileWarning};
