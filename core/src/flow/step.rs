// bazaar/src/flow/step.rs

/// Definition of a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDef {
  pub name: String,
  /// An optional step without handlers is skipped instead of failing the run.
  pub optional: bool,
}
