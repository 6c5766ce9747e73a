//! Core types shared by the reelforged pipeline crates.
//!
//! Holds the unified error type, the duration-budget accounting primitive
//! used by the harvest stage, and the retry policy injected into external
//! calls.

pub mod budget;
pub mod error;
pub mod retry;

pub use budget::DurationBudget;
pub use error::{Error, Result};
pub use retry::RetryPolicy;
