//! Core library for the meshdiff tool.
//!
//! Builds a closed solid from a survey point cloud and subtracts a reference
//! solid from it with an external boolean mesh engine.

pub mod config;
pub mod drum;
pub mod engine;
pub mod files;
pub mod geometry;
pub mod io;
pub mod limits;
pub mod mesh;
pub mod outcome;
pub mod pipeline;
pub mod prism;
pub mod sanitize;

pub use config::ToolConfig;
pub use outcome::{ErrorClass, Outcome, PipelineError, PipelineResult};
pub use pipeline::{run_difference, Pipeline};
pub use sanitize::RawArguments;
