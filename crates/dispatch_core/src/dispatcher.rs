//! Dispatch orchestrator: owns the unplanned-request queue and runs one
//! dispatch cycle per reoptimization step.
//!
//! A cycle:
//! 1. promotes due confirmations to complete,
//! 2. reconciles the idle-vehicle index with the fleet,
//! 3. commits (or drops) every completed confirmation,
//! 4. bumps the attempt counter of every request needing (re)planning,
//! 5. snapshots plannable requests and available vehicles,
//! 6. lets the active strategy open new confirmations; those completing at
//!    creation are committed before the cycle ends.

use std::ops::{Deref, DerefMut};

use bevy_ecs::prelude::Resource;
use tracing::{debug, info, Span};

use crate::config::DispatchConfig;
use crate::dispatch::{
    build_strategy, CycleReport, CycleSnapshot, DispatchContext, DispatchState,
    InsertionStrategy,
};
use crate::error::{ConfigError, DispatchError};
use crate::confirmation::ConfirmationRegistry;
use crate::events::EventSink;
use crate::model::{Request, RequestId, SimTime};
use crate::spatial::ZonalRegistry;

pub struct Dispatcher {
    config: DispatchConfig,
    state: DispatchState,
    strategy: Box<dyn InsertionStrategy>,
    span: Span,
}

impl Dispatcher {
    /// Build a dispatcher. Fails fast on an invalid configuration.
    pub fn new(config: DispatchConfig, span: Span) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = ConfirmationRegistry::new(config.confirmation_delay(), span.clone());
        let zones = ZonalRegistry::new(config.resolution()?);
        let strategy = build_strategy(&config, span.clone())?;
        Ok(Self {
            state: DispatchState::new(registry, zones, span.clone()),
            config,
            strategy,
            span,
        })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn reoptimization_step(&self) -> SimTime {
        self.config.reoptimization_step()
    }

    /// Add a newly submitted request to the unplanned queue.
    pub fn submit(&mut self, request: Request) {
        debug!(
            parent: &self.span,
            request = %request.id,
            passenger = %request.passenger,
            latest_start = request.latest_start,
            "request submitted"
        );
        self.state.zones.add_request(request.id, request.from);
        self.state.unplanned.insert(request);
    }

    /// Remove a request the demand side gave up on. A confirmation still
    /// registered for it completes as not accepted.
    pub fn withdraw(
        &mut self,
        request: RequestId,
        now: SimTime,
        events: &mut dyn EventSink,
    ) -> Option<Request> {
        let removed = self.state.unplanned.remove(request)?;
        self.state.zones.remove_request(request);
        self.state.registry.withdraw_request(request, now, events);
        debug!(parent: &self.span, request = %request, "request withdrawn");
        Some(removed)
    }

    pub fn run_cycle(&mut self, ctx: &mut DispatchContext<'_>) -> Result<CycleReport, DispatchError> {
        let now = ctx.now;
        let mut report = CycleReport::new(now, self.strategy.name());

        let promoted = self.state.registry.tick(now);
        self.state.zones.sync_vehicles(&*ctx.fleet, now);

        for id in self.state.registry.completed_ids() {
            self.state.consume(id, ctx, &mut report);
        }
        if !report.committed.is_empty() {
            self.state.zones.sync_vehicles(&*ctx.fleet, now);
        }

        let planning: Vec<RequestId> = self
            .state
            .unplanned
            .ids()
            .into_iter()
            .filter(|&id| !self.state.registry.is_waiting_request(id))
            .collect();
        for &id in &planning {
            if let Some(request) = self.state.unplanned.get_mut(id) {
                request.schedule_attempts += 1;
            }
        }
        report.planned = planning.len();

        let snapshot = CycleSnapshot::build(
            planning.iter().filter_map(|&id| self.state.unplanned.get(id)),
            &*ctx.fleet,
            &self.state.registry,
            &self.config,
            now,
        );
        report.horizon = Some(snapshot.horizon);

        if !planning.is_empty() {
            self.strategy
                .schedule(&planning, &snapshot, &mut self.state, ctx, &mut report)?;
        }

        if report.is_idle() && promoted == 0 {
            debug!(
                parent: &self.span,
                now,
                unplanned = self.state.unplanned.len(),
                pending = self.state.registry.len(),
                "dispatch cycle"
            );
        } else {
            info!(
                parent: &self.span,
                now,
                strategy = report.strategy,
                planned = report.planned,
                opened = report.opened,
                committed = report.committed.len(),
                dropped = report.dropped.len(),
                unmatched = report.unmatched,
                unplanned = self.state.unplanned.len(),
                pending = self.state.registry.len(),
                "dispatch cycle"
            );
        }
        Ok(report)
    }

    pub fn unplanned_len(&self) -> usize {
        self.state.unplanned.len()
    }

    pub fn is_unplanned(&self, request: RequestId) -> bool {
        self.state.unplanned.contains(request)
    }

    pub fn unplanned(&self, request: RequestId) -> Option<&Request> {
        self.state.unplanned.get(request)
    }

    pub fn registry(&self) -> &ConfirmationRegistry {
        &self.state.registry
    }

    pub fn zones(&self) -> &ZonalRegistry {
        &self.state.zones
    }

    /// True while requests wait for a vehicle or confirmations are registered.
    pub fn has_pending_work(&self) -> bool {
        !self.state.unplanned.is_empty() || !self.state.registry.is_empty()
    }
}

/// ECS resource wrapper for the dispatcher.
#[derive(Resource)]
pub struct DispatcherResource(pub Dispatcher);

impl Deref for DispatcherResource {
    type Target = Dispatcher;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DispatcherResource {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
