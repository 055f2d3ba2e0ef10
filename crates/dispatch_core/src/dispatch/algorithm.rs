use tracing::Span;

use crate::config::{DispatchConfig, StrategyKind};
use crate::error::{ConfigError, DispatchError};
use crate::model::RequestId;

use super::assignment::AssignmentStrategy;
use super::rule_based::RuleBasedStrategy;
use super::snapshot::CycleSnapshot;
use super::state::{DispatchContext, DispatchState};
use super::types::CycleReport;

/// Trait for insertion strategies that pair unplanned requests with vehicles.
pub trait InsertionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Open confirmations for requests in `planning` (ascending id order).
    /// Confirmations that complete at creation are committed before returning.
    fn schedule(
        &mut self,
        planning: &[RequestId],
        snapshot: &CycleSnapshot,
        state: &mut DispatchState,
        ctx: &mut DispatchContext<'_>,
        report: &mut CycleReport,
    ) -> Result<(), DispatchError>;
}

pub fn build_strategy(
    config: &DispatchConfig,
    span: Span,
) -> Result<Box<dyn InsertionStrategy>, ConfigError> {
    Ok(match config.strategy {
        StrategyKind::RuleBased => Box::new(RuleBasedStrategy::new(config, span)),
        StrategyKind::Assignment => Box::new(AssignmentStrategy::new(config, span)?),
    })
}
