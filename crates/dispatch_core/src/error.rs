use thiserror::Error;

use crate::model::{LinkId, RequestId, SimTime, VehicleId};

/// Invalid dispatch configuration. Reported when a dispatcher is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown dispatch goal `{0}` (expected MIN_WAIT_TIME, MIN_PICKUP_TIME or DEMAND_SUPPLY_EQUIL)")]
    UnknownGoal(String),
    #[error("reoptimization step must be at least one second")]
    ZeroReoptimizationStep,
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("wait time weight must be finite and non-negative, got {0}")]
    InvalidWaitWeight(f64),
    #[error("invalid H3 zone resolution {0}")]
    InvalidResolution(u8),
    #[error("failed to parse dispatch config: {0}")]
    Parse(String),
}

/// Dispatch defects: broken invariants that indicate a programming error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("{0} already has a pending driver confirmation")]
    RequestAlreadyPending(RequestId),
    #[error("{0} already has a pending driver confirmation")]
    VehicleAlreadyPending(VehicleId),
}

/// Why the fleet refused to append a ride to a vehicle schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("{0} is not part of the fleet")]
    UnknownVehicle(VehicleId),
    #[error("{vehicle} service ends at {service_end} ms, before the ride could start")]
    ServiceEnded {
        vehicle: VehicleId,
        service_end: SimTime,
    },
    #[error("no route from {from} to {to}")]
    NoRoute { from: LinkId, to: LinkId },
}

/// Failure decoding an event from its key-value attribute form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventParseError {
    #[error("missing attribute `{0}`")]
    MissingAttribute(&'static str),
    #[error("attribute `{key}` has invalid value `{value}`")]
    InvalidAttribute { key: &'static str, value: String },
    #[error("unknown event type `{0}`")]
    UnknownType(String),
}

/// Failure building a simulation scenario.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0} does not exist in the network")]
    UnknownLink(LinkId),
    #[error("{0} is defined twice")]
    DuplicateVehicle(VehicleId),
}
