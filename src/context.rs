//! Per-run logging context.
//!
//! Components never reach for a process-wide logger configuration. Each run
//! creates one [`PipelineContext`] and hands it to the writers, sessions and
//! stores it builds; they log through the `log` facade with the context's
//! target and run id.

use std::fmt;

use uuid::Uuid;

/// Default log target for pipeline components.
pub const DEFAULT_TARGET: &str = "tessera";

/// Identity of one pipeline run, passed explicitly to the components of that run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    run_id: Uuid,
    target: String,
}

impl PipelineContext {
    /// Create a context with a fresh run id.
    pub fn new<S: Into<String>>(target: S) -> Self {
        PipelineContext {
            run_id: Uuid::new_v4(),
            target: target.into(),
        }
    }

    /// Derive a context for a sub-component, sharing the run id.
    pub fn child(&self, component: &str) -> Self {
        PipelineContext {
            run_id: self.run_id,
            target: format!("{}::{component}", self.target),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Log target to pass to `log` macros.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        PipelineContext::new(DEFAULT_TARGET)
    }
}

impl fmt::Display for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.target, self.run_id)
    }
}
