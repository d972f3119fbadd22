//! Reusable observers for Hopfield MIQP solvers.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work with the solvers in `hmip-solvers`.
//!
//! # Modules
//!
//! - [`traits`] — Capability traits for cross-solver observers
//!   ([`HasObjective`], [`HasStationarity`], [`CanStopEarly`])
//!
//! # Observers
//!
//! - [`LogObserver`] — reports solver progress through `tracing`
//! - [`Stall`] — stops a solve once the objective stops improving
//!
//! [`Observer`]: hmip_core::Observer
//! [`HasObjective`]: traits::HasObjective
//! [`HasStationarity`]: traits::HasStationarity
//! [`CanStopEarly`]: traits::CanStopEarly

pub mod traits;

mod log;
mod stall;

pub use log::LogObserver;
pub use stall::Stall;
