//! Durable traffic accounting for a router and a satellite terminal.
//!
//! The [`accounting::AccountingEngine`] turns noisy, occasionally resetting
//! cumulative byte counters into monotonically growing per-source totals.
//! The [`server::scheduler::PollScheduler`] feeds it from the
//! [`sources`] adapters and [`web`] exposes the result.
pub mod accounting;
pub mod db;
pub mod server;
pub mod sources;
pub mod web;
