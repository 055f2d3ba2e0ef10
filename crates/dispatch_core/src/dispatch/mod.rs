pub mod algorithm;
pub mod assignment;
pub mod finder;
pub mod hungarian;
pub mod rule_based;
pub mod snapshot;
pub mod state;
pub mod types;

pub use algorithm::{build_strategy, InsertionStrategy};
pub use assignment::{AssignmentStrategy, FleetSummary};
pub use rule_based::RuleBasedStrategy;
pub use snapshot::{CycleSnapshot, PlanningHorizon, SupplyState};
pub use state::{DispatchContext, DispatchState, UnplannedRequests};
pub use types::{CommittedRide, CycleReport, Dispatch, DropReason, Placement};
