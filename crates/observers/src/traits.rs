//! Capability traits for cross-solver observers.
//!
//! These traits abstract over solver-specific event and action types, so an
//! observer can be written once and reused with any solver whose types
//! implement them.
//!
//! # Event traits
//!
//! - [`HasObjective`] — events that carry an objective value
//! - [`HasStationarity`] — events that carry a first-order stationarity measure
//!
//! # Action traits
//!
//! - [`CanStopEarly`] — actions that can signal early termination
//!
//! # Example
//!
//! ```rust
//! use hmip_core::Observer;
//! use hmip_observers::traits::{CanStopEarly, HasStationarity};
//!
//! struct GoodEnough {
//!     tolerance: f64,
//! }
//!
//! impl<E: HasStationarity, A: CanStopEarly> Observer<E, A> for GoodEnough {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         (event.stationarity() < self.tolerance).then(A::stop_early)
//!     }
//! }
//! ```

use hmip_solvers::hopfield;

/// An event that carries an objective value.
pub trait HasObjective {
    /// Returns the objective for this event.
    ///
    /// Returns `f64::NAN` when the event carries no objective.
    fn objective(&self) -> f64;
}

/// An event that carries a stationarity measure.
pub trait HasStationarity {
    /// Returns the stationarity measure for this event.
    ///
    /// Returns `f64::NAN` when the event carries no stationarity measure.
    fn stationarity(&self) -> f64;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

impl HasObjective for hopfield::Event<'_> {
    fn objective(&self) -> f64 {
        hopfield::Event::objective(self).unwrap_or(f64::NAN)
    }
}

impl HasStationarity for hopfield::Event<'_> {
    fn stationarity(&self) -> f64 {
        hopfield::Event::stationarity(self).unwrap_or(f64::NAN)
    }
}

impl CanStopEarly for hopfield::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
