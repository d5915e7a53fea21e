// bazaar/src/pipelines/mod.rs

//! The cart and order engines, each operation defined as a named-step pipeline.

pub mod cart_pipeline;
pub mod contexts;
pub mod order_pipeline;

use crate::error::{FlowError, MarketError, MarketResult};
use crate::flow::{ContextData, Pipeline, PipelineResult};

/// Runs `pipeline` over `data` and hands the final context back.
///
/// None of the engine pipelines stop early on success, so a stopped run is
/// reported as a flow failure.
pub(crate) async fn run_to_completion<T>(pipeline: &Pipeline<T, MarketError>, data: T) -> MarketResult<T>
where
  T: Clone + Send + Sync + 'static,
{
  let ctx_data = ContextData::new(data);
  match pipeline.run(ctx_data.clone()).await? {
    PipelineResult::Completed => Ok(ctx_data.into_inner()),
    PipelineResult::Stopped => Err(
      FlowError::Halted {
        pipeline: pipeline.name(),
      }
      .into(),
    ),
  }
}
