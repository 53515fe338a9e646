//! Simulation component (entity) identity and lifecycle.

/// Identifier of simulation component.
pub type Id = u32;

/// Lifecycle state of simulation component.
///
/// A component is `Created` on registration, becomes `Running` when the simulation is started
/// (or when its handler is added to already started simulation), may switch between `Running`
/// and `Waiting` while processing events and ends in `Finished`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityState {
    /// Registered, but not started yet.
    Created,
    /// Receives all events addressed to it.
    Running,
    /// Receives only the events matching its wait predicate, other events are deferred.
    Waiting,
    /// Does not receive events anymore.
    Finished,
}
