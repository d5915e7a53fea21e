// bazaar/src/flow/mod.rs

//! Named-step async pipelines.
//!
//! A [`Pipeline`] is an ordered list of named steps. Each step carries `on`
//! and `after` handlers that receive a clone of the shared [`ContextData`] and
//! decide, through [`PipelineControl`], whether the run continues.

pub mod context_data;
pub mod control;
pub mod pipeline;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use pipeline::{Handler, Pipeline, StepFuture};
pub use step::StepDef;
