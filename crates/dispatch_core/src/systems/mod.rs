pub mod dispatch_cycle;
pub mod request_expired;
pub mod request_submitted;
pub mod vehicle_task;
