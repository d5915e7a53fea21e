// bazaar/src/flow/control.rs

//! Signals for controlling pipeline flow and the outcome of a pipeline run.

/// Signal from a handler indicating whether the pipeline should continue or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Carry on with the remaining handlers and steps.
  Continue,
  /// Halt the pipeline. No further handlers run.
  Stop,
}

/// Outcome of a full pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step ran (or was an optional step without handlers).
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}
