//! Convergence: compare, plan, execute, verify.
//!
//! `compare` classifies the current entry against the desired one, `planner`
//! turns the classification into ordered keytool operations, `executor` runs
//! them and `engine` drives a full pass per alias.

pub mod compare;
pub mod engine;
pub mod executor;
pub mod planner;
