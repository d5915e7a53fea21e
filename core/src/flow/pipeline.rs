// bazaar/src/flow/pipeline.rs

//! The `Pipeline<TData, Err>` type: step declaration, handler registration and
//! execution.

use crate::error::FlowError;
use crate::flow::context_data::ContextData;
use crate::flow::control::{PipelineControl, PipelineResult};
use crate::flow::step::StepDef;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tracing::{event, info_span, Instrument, Level};

/// A pipeline step handler.
///
/// A handler receives its own clone of the run's `ContextData<TData>`, does its
/// work (dropping any lock guard before it awaits) and tells the pipeline
/// whether to continue.
pub type Handler<TData, Err> = Box<dyn Fn(ContextData<TData>) -> StepFuture<Err> + Send + Sync>;

/// The boxed future a [`Handler`] resolves.
pub type StepFuture<Err> = Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>;

/// An ordered list of named steps over the context type `TData`.
///
/// Handlers return `Result<PipelineControl, Err>`. Framework failures (for
/// instance a required step without handlers) are raised as [`FlowError`] and
/// converted into `Err`.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  name: &'static str,
  steps: Vec<StepDef>,
  on: HashMap<String, Vec<Handler<TData, Err>>>,
  after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Declares a pipeline from `(step_name, optional)` pairs.
  pub fn new(name: &'static str, step_defs: &[(&str, bool)]) -> Result<Self, FlowError> {
    let mut steps: Vec<StepDef> = Vec::with_capacity(step_defs.len());
    for (step_name, optional) in step_defs {
      if steps.iter().any(|s| s.name == *step_name) {
        return Err(FlowError::DuplicateStep {
          step_name: (*step_name).to_string(),
        });
      }
      steps.push(StepDef {
        name: (*step_name).to_string(),
        optional: *optional,
      });
    }

    Ok(Self {
      name,
      steps,
      on: HashMap::new(),
      after: HashMap::new(),
    })
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  fn ensure_step_exists(&self, step_name: &str) -> Result<(), FlowError> {
    if self.steps.iter().any(|s| s.name == step_name) {
      Ok(())
    } else {
      Err(FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
    }
  }

  fn wrap<F, UserErr>(
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Handler<TData, Err>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    Box::new(move |ctx_data: ContextData<TData>| -> StepFuture<Err> {
      let user_fut = handler_fn(ctx_data);
      Box::pin(async move { user_fut.await.map_err(Into::into) })
    })
  }

  /// Registers the main handler(s) of a step.
  pub fn on<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Result<(), FlowError>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name)?;
    self
      .on
      .entry(step_name.to_string())
      .or_default()
      .push(Self::wrap(handler_fn));
    Ok(())
  }

  /// Registers a handler that runs once every `on` handler of the step succeeded.
  pub fn after<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Result<(), FlowError>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name)?;
    self
      .after
      .entry(step_name.to_string())
      .or_default()
      .push(Self::wrap(handler_fn));
    Ok(())
  }

  /// Runs every step in declaration order against `ctx_data`.
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, pipeline = self.name, num_steps = self.steps.len(), "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let on_handlers = self.on.get(step_name).map(Vec::as_slice).unwrap_or_default();
      let after_handlers = self.after.get(step_name).map(Vec::as_slice).unwrap_or_default();

      if on_handlers.is_empty() && after_handlers.is_empty() {
        if step_def.optional {
          event!(Level::DEBUG, pipeline = self.name, step = step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, pipeline = self.name, step = step_name, "Non-optional step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = info_span!(
        "pipeline_step",
        pipeline = self.name,
        step = step_name,
        step_index = step_idx
      );

      for (phase, handlers) in [("on", on_handlers), ("after", after_handlers)] {
        for handler_fn in handlers {
          match handler_fn(ctx_data.clone()).instrument(step_span.clone()).await {
            Ok(PipelineControl::Continue) => {}
            Ok(PipelineControl::Stop) => {
              event!(Level::INFO, pipeline = self.name, step = step_name, phase, "Pipeline stopped by a handler.");
              return Ok(PipelineResult::Stopped);
            }
            Err(e) => {
              event!(Level::DEBUG, pipeline = self.name, step = step_name, phase, error = %e, "Handler failed.");
              return Err(e);
            }
          }
        }
      }
    }

    event!(Level::DEBUG, pipeline = self.name, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}

impl<TData, Err> std::fmt::Debug for Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline")
      .field("name", &self.name)
      .field("steps", &self.steps)
      .finish_non_exhaustive()
  }
}
