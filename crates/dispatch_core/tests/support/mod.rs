pub mod expect;
pub mod schedule;
pub mod world;
