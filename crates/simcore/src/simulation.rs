//! Simulation configuration and execution.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use log::Level::Trace;
use log::{debug, log_enabled, trace};
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;
use serde_json::json;
use serde_type_name::type_name;

use crate::component::{EntityState, Id};
use crate::context::SimulationContext;
use crate::event::{EventData, Tag};
use crate::handler::{EventCancellationPolicy, EventHandler};
use crate::log::log_undelivered_event;
use crate::state::SimulationState;
use crate::Event;

/// Represents a simulation, provides methods for its configuration and execution.
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    name_to_id: HashMap<String, Id>,
    names: Rc<RefCell<Vec<String>>>,
    handlers: Vec<Option<Rc<RefCell<dyn EventHandler>>>>,
    entities: BTreeSet<Id>,
    started: bool,
}

impl Simulation {
    /// Creates a new simulation with specified random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new(seed))),
            name_to_id: HashMap::new(),
            names: Rc::new(RefCell::new(Vec::new())),
            handlers: Vec::new(),
            entities: BTreeSet::new(),
            started: false,
        }
    }

    fn register(&mut self, name: &str) -> Id {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.name_to_id.len() as Id;
        self.name_to_id.insert(name.to_owned(), id);
        self.names.borrow_mut().push(name.to_owned());
        self.handlers.push(None);
        self.sim_state.borrow_mut().on_register();
        id
    }

    /// Returns the identifier of component by its name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use simcore::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let comp_ctx = sim.create_context("comp");
    /// assert_eq!(sim.lookup_id(comp_ctx.name()), Some(0));
    /// assert_eq!(sim.lookup_id("comp1"), None);
    /// ```
    pub fn lookup_id(&self, name: &str) -> Option<Id> {
        self.name_to_id.get(name).copied()
    }

    /// Returns the name of component by its identifier.
    ///
    /// Panics if component with such Id does not exist.
    pub fn lookup_name(&self, id: Id) -> String {
        self.names.borrow()[id as usize].clone()
    }

    /// Creates a new simulation context with specified name.
    ///
    /// Component ids are assigned sequentially starting from 0.
    pub fn create_context<S>(&mut self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        let ctx = SimulationContext::new(
            self.register(name.as_ref()),
            name.as_ref(),
            self.sim_state.clone(),
            self.names.clone(),
        );
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Created context: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": ctx.name(), "id": ctx.id()})
        );
        ctx
    }

    /// Registers the event handler implementation for component with specified name, returns the component Id.
    ///
    /// If the simulation is already started, the component is started immediately.
    pub fn add_handler<S>(&mut self, name: S, handler: Rc<RefCell<dyn EventHandler>>) -> Id
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        self.handlers[id as usize] = Some(handler.clone());
        self.entities.insert(id);
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Added handler: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
        if self.started {
            self.start_entity(id, handler);
        }
        id
    }

    /// Removes the event handler for component with specified name.
    ///
    /// All subsequent events destined for this component will not be delivered until the handler is added again.
    /// Pending events related to the component are cancelled according to the specified policy.
    ///
    /// Panics if component with such name does not exist.
    pub fn remove_handler<S>(&mut self, name: S, cancel_policy: EventCancellationPolicy)
    where
        S: AsRef<str>,
    {
        let id = match self.lookup_id(name.as_ref()) {
            Some(id) => id,
            None => panic!("Component {} does not exist", name.as_ref()),
        };
        self.handlers[id as usize] = None;
        self.entities.remove(&id);

        match cancel_policy {
            EventCancellationPolicy::Incoming => self.cancel_events(|e| e.dst == id),
            EventCancellationPolicy::Outgoing => self.cancel_events(|e| e.src == id),
            EventCancellationPolicy::All => self.cancel_events(|e| e.src == id || e.dst == id),
            EventCancellationPolicy::None => 0,
        };

        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Removed handler: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
    }

    /// Assigns a numeric tag to events with payload of type `T`.
    ///
    /// Tags are used by [`EventPredicate`](crate::EventPredicate) to filter events by their kind.
    /// Events of unregistered payload types get [`UNTAGGED`](crate::UNTAGGED).
    pub fn register_tag<T: EventData>(&mut self, tag: Tag) {
        self.sim_state.borrow_mut().register_tag::<T>(tag);
    }

    /// Returns the tag assigned to events with payload of type `T`.
    pub fn tag_of<T: EventData>(&self) -> Tag {
        self.sim_state.borrow().tag_of::<T>()
    }

    /// Returns the lifecycle state of component.
    pub fn entity_state(&self, id: Id) -> Option<EntityState> {
        self.sim_state.borrow().entity_state(id)
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Sets the time ceiling: events scheduled after it are never processed.
    pub fn terminate_at(&mut self, time: f64) {
        self.sim_state.borrow_mut().terminate_at(time);
    }

    fn start_entity(&mut self, id: Id, handler: Rc<RefCell<dyn EventHandler>>) {
        if self.entity_state(id) != Some(EntityState::Created) {
            return;
        }
        self.sim_state.borrow_mut().set_entity_state(id, EntityState::Running);
        handler.borrow_mut().on_start();
    }

    /// Starts all registered components by calling their [`EventHandler::on_start()`] hooks
    /// in the order of component ids.
    ///
    /// Called implicitly by the first step of simulation.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let started: Vec<(Id, Rc<RefCell<dyn EventHandler>>)> = self
            .entities
            .iter()
            .filter_map(|id| self.handlers[*id as usize].clone().map(|h| (*id, h)))
            .collect();
        for (id, handler) in started {
            self.start_entity(id, handler);
        }
    }

    /// Returns `true` if all components with registered handlers are finished.
    pub fn is_finished(&self) -> bool {
        !self.entities.is_empty()
            && self
                .entities
                .iter()
                .all(|id| self.entity_state(*id) == Some(EntityState::Finished))
    }

    /// Performs a single step through the simulation.
    ///
    /// Takes the next deliverable event, advances the simulation time to event time and tries to process it
    /// by invoking the [`EventHandler::on()`](crate::EventHandler::on()) method of the corresponding event handler.
    /// If there is no handler registered for component with Id `event.dst` or the component is finished,
    /// logs the undelivered event and discards it.
    ///
    /// Returns `true` if some pending event was found (no matter was it properly processed or not) and `false`
    /// otherwise. The latter means that no progress can be made.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use simcore::Simulation;
    ///
    /// #[derive(Clone, Serialize)]
    /// pub struct SomeEvent {
    /// }
    ///
    /// let mut sim = Simulation::new(123);
    /// let mut comp_ctx = sim.create_context("comp");
    /// assert_eq!(sim.time(), 0.0);
    /// comp_ctx.emit_self(SomeEvent{ }, 1.2);
    /// let mut status = sim.step();
    /// assert!(status);
    /// assert_eq!(sim.time(), 1.2);
    /// status = sim.step();
    /// assert!(!status);
    /// ```
    pub fn step(&mut self) -> bool {
        self.start();
        let next = self.sim_state.borrow_mut().next_event();
        if let Some(event) = next {
            let dst = event.dst;
            if log_enabled!(Trace) {
                let src_name = self.lookup_name(event.src);
                let dst_name = self.lookup_name(event.dst);
                trace!(
                    target: &dst_name,
                    "[{:.3} {} {}] {}",
                    event.time,
                    crate::log::get_colored("EVENT", colored::Color::BrightBlack),
                    dst_name,
                    json!({"type": type_name(&event.data).unwrap_or("unknown"), "data": event.data, "src": src_name, "tag": event.tag})
                );
            }
            let handler = self.handlers.get(dst as usize).cloned().flatten();
            match handler {
                Some(handler) if self.entity_state(dst) != Some(EntityState::Finished) => {
                    handler.borrow_mut().on(event);
                }
                _ => log_undelivered_event(event),
            }
            self.collect_finished(dst);
            true
        } else {
            false
        }
    }

    // Drops the handler of finished component once no pending event references it.
    fn collect_finished(&mut self, id: Id) {
        if self.entity_state(id) != Some(EntityState::Finished) {
            return;
        }
        if let Some(slot) = self.handlers.get_mut(id as usize) {
            if slot.is_some() && !self.sim_state.borrow().has_events_related_to(id) {
                *slot = None;
                debug!(
                    target: "simulation",
                    "[{:.3} {} simulation] Destroyed finished component: {}",
                    self.sim_state.borrow().time(),
                    crate::log::get_colored("DEBUG", colored::Color::Blue),
                    json!({"name": self.names.borrow()[id as usize], "id": id})
                );
            }
        }
    }

    /// Performs the specified number of steps through the simulation.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Processes all events with the minimal pending time, in the order of their creation.
    ///
    /// Returns the number of processed events.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use simcore::Simulation;
    ///
    /// #[derive(Clone, Serialize)]
    /// pub struct SomeEvent {
    /// }
    ///
    /// let mut sim = Simulation::new(123);
    /// let mut comp_ctx = sim.create_context("comp");
    /// comp_ctx.emit_self(SomeEvent{ }, 1.0);
    /// comp_ctx.emit_self(SomeEvent{ }, 1.0);
    /// comp_ctx.emit_self(SomeEvent{ }, 2.0);
    /// assert_eq!(sim.advance(), 2);
    /// assert_eq!(sim.time(), 1.0);
    /// assert_eq!(sim.advance(), 1);
    /// assert_eq!(sim.advance(), 0);
    /// ```
    pub fn advance(&mut self) -> usize {
        self.start();
        let time = match self.peek_time() {
            Some(time) => time,
            None => return 0,
        };
        let mut count = 0;
        while let Some(next_time) = self.peek_time() {
            if next_time > time || !self.step() {
                break;
            }
            count += 1;
        }
        count
    }

    fn peek_time(&self) -> Option<f64> {
        self.sim_state.borrow_mut().peek_time()
    }

    /// Steps through the simulation until there are no pending events left.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }

    /// Steps through the simulation with duration limit.
    ///
    /// Processes events until the next event time is above `current_time + duration`
    /// or there are no pending events left.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.start();
        let end_time = self.time() + duration;
        loop {
            match self.peek_time() {
                Some(time) if time > end_time => return true,
                Some(_) => {
                    self.step();
                }
                None => return false,
            }
        }
    }

    /// Runs the simulation until one of the termination conditions holds:
    /// there are no deliverable events, all components with handlers are finished,
    /// or the time ceiling set by [`terminate_at()`](Self::terminate_at()) is reached.
    ///
    /// In the latter case the simulation time is set to the ceiling.
    /// Then the components which are not finished receive [`EventHandler::on_shutdown()`] and become finished.
    pub fn run(&mut self) {
        self.start();
        while !self.is_finished() && self.step() {}
        let ceiling = self.sim_state.borrow().termination_time();
        if let Some(ceiling) = ceiling {
            if self.sim_state.borrow().has_pending_events() && self.time() < ceiling {
                self.sim_state.borrow_mut().set_time(ceiling);
            }
        }
        self.shutdown();
    }

    /// Calls the shutdown hook of all components which are not finished and marks them as finished.
    pub fn shutdown(&mut self) {
        let active: Vec<(Id, Rc<RefCell<dyn EventHandler>>)> = self
            .entities
            .iter()
            .filter(|id| self.entity_state(**id) != Some(EntityState::Finished))
            .filter_map(|id| self.handlers[*id as usize].clone().map(|h| (*id, h)))
            .collect();
        for (id, handler) in active {
            handler.borrow_mut().on_shutdown();
            self.sim_state.borrow_mut().set_entity_state(id, EntityState::Finished);
        }
    }

    /// Returns a random float in the range _[0, 1)_
    /// using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range
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

    /// Returns the total number of created events.
    ///
    /// Note that cancelled events are also counted here.
    pub fn event_count(&self) -> u64 {
        self.sim_state.borrow().event_count()
    }

    /// Cancels events that satisfy the given predicate function, returns the number of cancelled events.
    ///
    /// Note that already processed events cannot be cancelled.
    pub fn cancel_events<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&Event) -> bool,
    {
        self.sim_state.borrow_mut().cancel_events(pred)
    }

    /// Returns a copy of pending events sorted by time.
    pub fn dump_events(&self) -> Vec<Event> {
        self.sim_state.borrow().dump_events()
    }
}
