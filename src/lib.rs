//! reelforged: a clip harvest, compile and publish pipeline.
//!
//! The pipeline runs in three stages. Harvest walks a channel's feed and
//! downloads short clips until a duration budget is spent. Transform
//! normalizes the clips to a canonical encode profile, burns in their
//! original titles and concatenates them into one compilation. Publish
//! queues the compilation with scheduling metadata and uploads the batch
//! to the hosting platform.

pub mod batch;
pub mod cli;
pub mod config;
pub mod feed;
pub mod harvest;
pub mod manifest;
pub mod publish;
pub mod run;
pub mod schedule;
pub mod store;
pub mod transform;

pub use run::Pipeline;
