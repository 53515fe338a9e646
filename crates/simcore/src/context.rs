//! Accessing simulation from components.

use std::cell::RefCell;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;

use crate::component::{EntityState, Id};
use crate::event::{Event, EventData, EventId, Tag};
use crate::predicate::EventPredicate;
use crate::state::SimulationState;

/// A facade for accessing the simulation state and producing events from simulation components.
pub struct SimulationContext {
    id: Id,
    name: String,
    sim_state: Rc<RefCell<SimulationState>>,
    names: Rc<RefCell<Vec<String>>>,
}

impl SimulationContext {
    pub(crate) fn new(
        id: Id,
        name: &str,
        sim_state: Rc<RefCell<SimulationState>>,
        names: Rc<RefCell<Vec<String>>>,
    ) -> Self {
        Self {
            id,
            name: name.to_owned(),
            sim_state,
            names,
        }
    }

    /// Returns the identifier of component associated with this context.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the name of component associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Returns a random float in the range _[0, 1)_
    /// using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random float in the specified range
    /// using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns a random value from the specified distribution
    /// using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        self.sim_state.borrow_mut().sample_from_distribution(dist)
    }

    /// Creates new event with specified payload, destination and delay.
    ///
    /// Negative delay is replaced with zero and reported as a warning.
    pub fn emit<T>(&mut self, data: T, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, dst, delay)
    }

    /// Creates new immediate (zero-delay) event with specified payload and destination.
    pub fn emit_now<T>(&mut self, data: T, dst: Id) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, dst, 0.)
    }

    /// Creates new event for itself with specified payload and delay.
    pub fn emit_self<T>(&mut self, data: T, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, self.id, delay)
    }

    /// Creates new immediate event for itself with specified payload.
    pub fn emit_self_now<T>(&mut self, data: T) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, self.id, 0.)
    }

    /// Creates new event with specified payload, source, destination and delay.
    pub fn emit_as<T>(&mut self, data: T, src: Id, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, src, dst, delay)
    }

    /// Cancels the specified event.
    ///
    /// Already delivered events cannot be cancelled.
    pub fn cancel_event(&mut self, id: EventId) {
        self.sim_state.borrow_mut().cancel_event(id);
    }

    /// Cancels all pending events which are produced by this component and match the predicate.
    ///
    /// Returns the number of cancelled events.
    pub fn cancel_events(&mut self, pred: &EventPredicate) -> usize {
        let id = self.id;
        self.sim_state
            .borrow_mut()
            .cancel_events(|e| e.src == id && pred.matches(e))
    }

    /// Suspends delivery of events which do not match the predicate.
    ///
    /// Non-matching events addressed to this component are deferred until it resumes,
    /// which happens on the delivery of the first matching event. Deferred events are then
    /// delivered in their original order.
    pub fn wait_for(&mut self, pred: EventPredicate) {
        self.sim_state.borrow_mut().wait_for(self.id, pred);
    }

    /// Returns `true` if the component is waiting for some event.
    pub fn is_waiting(&self) -> bool {
        self.state() == EntityState::Waiting
    }

    /// Returns the number of deferred events addressed to this component which match the predicate.
    pub fn count_deferred(&self, pred: &EventPredicate) -> usize {
        self.sim_state.borrow().count_deferred_events(self.id, pred)
    }

    /// Removes and returns deferred events addressed to this component which match the predicate.
    pub fn take_deferred(&mut self, pred: &EventPredicate) -> Vec<Event> {
        self.sim_state.borrow_mut().take_deferred_events(self.id, pred)
    }

    /// Marks the component as finished, so that it does not receive events anymore.
    pub fn finish(&mut self) {
        self.sim_state.borrow_mut().set_entity_state(self.id, EntityState::Finished);
    }

    /// Returns the lifecycle state of the component.
    pub fn state(&self) -> EntityState {
        self.sim_state
            .borrow()
            .entity_state(self.id)
            .unwrap_or(EntityState::Created)
    }

    /// Returns the tag assigned to events with payload of type `T`.
    pub fn tag_of<T: EventData>(&self) -> Tag {
        self.sim_state.borrow().tag_of::<T>()
    }

    /// Lookup component name by its identifier.
    pub fn lookup_name(&self, id: Id) -> String {
        self.names.borrow()[id as usize].clone()
    }
}
