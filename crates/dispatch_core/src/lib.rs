pub mod clock;
pub mod config;
pub mod confirmation;
pub mod dispatch;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod fleet;
pub mod model;
pub mod network;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod spatial;
pub mod systems;
pub mod telemetry;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
