//! Least-cost public transport routing.
//!
//! Answers: "leaving this place at this time, what is the cheapest way to
//! get there by transit?" Costs combine in-vehicle, waiting and walking time
//! with a transfer penalty that may grow with travel time and with changes
//! of transport mode.

pub mod access;
pub mod domain;
pub mod network;
pub mod planner;
pub mod router;
