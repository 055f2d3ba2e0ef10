//! Dispatch configuration surface.
//!
//! All durations are whole seconds; the dispatcher converts them to [SimTime]
//! milliseconds at construction.

use std::str::FromStr;

use h3o::Resolution;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{secs, SimTime};

/// Objective of the rule-based strategy; selects which side initiates matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum Goal {
    /// Request-initiated: every request gets its nearest vehicle.
    MinWaitTime,
    /// Vehicle-initiated: every idle vehicle gets its nearest request.
    MinPickupTime,
    /// Vehicle-initiated only while urgent demand exceeds idle supply.
    #[default]
    DemandSupplyEquil,
}

impl FromStr for Goal {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "MIN_WAIT_TIME" => Ok(Goal::MinWaitTime),
            "MIN_PICKUP_TIME" => Ok(Goal::MinPickupTime),
            "DEMAND_SUPPLY_EQUIL" => Ok(Goal::DemandSupplyEquil),
            other => Err(ConfigError::UnknownGoal(other.to_string())),
        }
    }
}

impl TryFrom<String> for Goal {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Which insertion strategy the dispatcher runs each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Greedy one-to-one insertion driven by [Goal].
    #[default]
    RuleBased,
    /// Batch bipartite assignment over the whole cycle snapshot.
    Assignment,
}

/// Dispatch configuration. Missing fields in serialized form take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Time a driver takes to confirm a dispatch. 0 = instant auto-accept.
    pub confirmation_delay_secs: u64,
    /// Candidate vehicles considered per request when the idle fleet exceeds this size.
    pub nearest_vehicles_limit: usize,
    /// Candidate requests considered per vehicle when the unplanned queue exceeds this size.
    pub nearest_requests_limit: usize,
    /// Dispatch cycle cadence.
    pub reoptimization_step_secs: u64,
    pub goal: Goal,
    pub strategy: StrategyKind,
    /// Look-ahead for soon-idle vehicles when idle vehicles < urgent requests.
    pub veh_planning_horizon_undersupply_secs: u64,
    /// Look-ahead for soon-idle vehicles when idle vehicles >= urgent requests.
    pub veh_planning_horizon_oversupply_secs: u64,
    /// Batch cost trade-off: cost = pickup travel time + weight * rider wait.
    pub wait_time_weight: f64,
    /// H3 resolution of the zonal registries.
    pub zone_resolution: u8,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            confirmation_delay_secs: 0,
            nearest_vehicles_limit: 30,
            nearest_requests_limit: 30,
            reoptimization_step_secs: 1,
            goal: Goal::default(),
            strategy: StrategyKind::default(),
            veh_planning_horizon_undersupply_secs: 30,
            veh_planning_horizon_oversupply_secs: 99_999,
            wait_time_weight: 1.0,
            zone_resolution: 9,
        }
    }
}

impl DispatchConfig {
    /// Parse a JSON document and validate it. An unrecognised goal name is
    /// reported as [ConfigError::UnknownGoal] rather than a generic parse error.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if let Some(goal) = value.get("goal").and_then(serde_json::Value::as_str) {
            goal.parse::<Goal>()?;
        }
        let config: Self =
            serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reoptimization_step_secs == 0 {
            return Err(ConfigError::ZeroReoptimizationStep);
        }
        if self.nearest_vehicles_limit == 0 {
            return Err(ConfigError::ZeroLimit("nearest_vehicles_limit"));
        }
        if self.nearest_requests_limit == 0 {
            return Err(ConfigError::ZeroLimit("nearest_requests_limit"));
        }
        if !self.wait_time_weight.is_finite() || self.wait_time_weight < 0.0 {
            return Err(ConfigError::InvalidWaitWeight(self.wait_time_weight));
        }
        self.resolution()?;
        Ok(())
    }

    pub fn resolution(&self) -> Result<Resolution, ConfigError> {
        Resolution::try_from(self.zone_resolution)
            .map_err(|_| ConfigError::InvalidResolution(self.zone_resolution))
    }

    pub fn confirmation_delay(&self) -> SimTime {
        secs(self.confirmation_delay_secs)
    }

    pub fn reoptimization_step(&self) -> SimTime {
        secs(self.reoptimization_step_secs)
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_confirmation_delay_secs(mut self, delay: u64) -> Self {
        self.confirmation_delay_secs = delay;
        self
    }

    pub fn with_reoptimization_step_secs(mut self, step: u64) -> Self {
        self.reoptimization_step_secs = step;
        self
    }
}
