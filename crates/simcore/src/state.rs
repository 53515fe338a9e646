use std::any::TypeId;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::component::{EntityState, Id};
use crate::event::{Event, EventData, EventId, Tag, UNTAGGED};
use crate::log::log_incorrect_event;
use crate::predicate::EventPredicate;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

pub struct SimulationState {
    clock: f64,
    rand: Pcg64,
    events: BinaryHeap<Event>,
    deferred_events: VecDeque<Event>,
    canceled_events: HashSet<EventId>,
    event_count: u64,
    tags: HashMap<TypeId, Tag>,
    entity_states: Vec<EntityState>,
    wait_predicates: HashMap<Id, EventPredicate>,
    terminate_at: Option<f64>,
}

impl SimulationState {
    pub fn new(seed: u64) -> Self {
        Self {
            clock: 0.0,
            rand: Pcg64::seed_from_u64(seed),
            events: BinaryHeap::new(),
            deferred_events: VecDeque::new(),
            canceled_events: HashSet::new(),
            event_count: 0,
            tags: HashMap::new(),
            entity_states: Vec::new(),
            wait_predicates: HashMap::new(),
            terminate_at: None,
        }
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn set_time(&mut self, time: f64) {
        self.clock = time;
    }

    pub fn rand(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rand.gen_range(range)
    }

    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        dist.sample(&mut self.rand)
    }

    // Entities --------------------------------------------------------------------------------------------------------

    pub fn on_register(&mut self) {
        self.entity_states.push(EntityState::Created);
    }

    pub fn entity_state(&self, id: Id) -> Option<EntityState> {
        self.entity_states.get(id as usize).copied()
    }

    pub fn set_entity_state(&mut self, id: Id, state: EntityState) {
        if let Some(s) = self.entity_states.get_mut(id as usize) {
            *s = state;
        }
        if state != EntityState::Waiting {
            self.wait_predicates.remove(&id);
        }
    }

    pub fn wait_for(&mut self, id: Id, pred: EventPredicate) {
        if self.entity_state(id) == Some(EntityState::Finished) {
            return;
        }
        self.set_entity_state(id, EntityState::Waiting);
        self.wait_predicates.insert(id, pred);
    }

    // Tags ------------------------------------------------------------------------------------------------------------

    pub fn register_tag<T: EventData>(&mut self, tag: Tag) {
        self.tags.insert(TypeId::of::<T>(), tag);
    }

    pub fn tag_of<T: EventData>(&self) -> Tag {
        self.tags.get(&TypeId::of::<T>()).copied().unwrap_or(UNTAGGED)
    }

    // Events ----------------------------------------------------------------------------------------------------------

    pub fn add_event<T>(&mut self, data: T, src: Id, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        let event_id = self.event_count;
        let event = Event {
            id: event_id,
            // max also maps NaN delay to zero
            time: self.clock + delay.max(0.),
            src,
            dst,
            tag: self.tag_of::<T>(),
            data: Box::new(data),
        };
        if !(delay >= -EPSILON) {
            log_incorrect_event(&event, &format!("negative delay {}, scheduled at current time", delay));
        }
        self.events.push(event);
        self.event_count += 1;
        event_id
    }

    fn is_deliverable(&self, event: &Event) -> bool {
        match self.wait_predicates.get(&event.dst) {
            Some(pred) => pred.matches(event),
            None => true,
        }
    }

    fn is_beyond_ceiling(&self, time: f64) -> bool {
        self.terminate_at.map_or(false, |t| time > t + EPSILON)
    }

    fn resume_if_waiting(&mut self, id: Id) {
        if self.wait_predicates.remove(&id).is_some() {
            self.set_entity_state(id, EntityState::Running);
        }
    }

    pub fn next_event(&mut self) -> Option<Event> {
        if let Some(pos) = self.deferred_events.iter().position(|e| self.is_deliverable(e)) {
            let event = self.deferred_events.remove(pos)?;
            self.resume_if_waiting(event.dst);
            return Some(event);
        }
        loop {
            let event = self.events.pop()?;
            if self.canceled_events.remove(&event.id) {
                continue;
            }
            if self.is_beyond_ceiling(event.time) {
                self.events.push(event);
                return None;
            }
            self.clock = event.time;
            if self.is_deliverable(&event) {
                self.resume_if_waiting(event.dst);
                return Some(event);
            }
            self.deferred_events.push_back(event);
        }
    }

    /// Returns the time of the next event which can be processed, without dequeuing it.
    pub fn peek_time(&mut self) -> Option<f64> {
        if self.deferred_events.iter().any(|e| self.is_deliverable(e)) {
            return Some(self.clock);
        }
        while let Some(event) = self.events.peek() {
            if self.canceled_events.contains(&event.id) {
                let id = event.id;
                self.events.pop();
                self.canceled_events.remove(&id);
                continue;
            }
            if self.is_beyond_ceiling(event.time) {
                return None;
            }
            return Some(event.time);
        }
        None
    }

    pub fn has_pending_events(&self) -> bool {
        self.events.iter().any(|e| !self.canceled_events.contains(&e.id)) || !self.deferred_events.is_empty()
    }

    pub fn has_events_related_to(&self, id: Id) -> bool {
        self.events
            .iter()
            .any(|e| (e.dst == id || e.src == id) && !self.canceled_events.contains(&e.id))
            || self.deferred_events.iter().any(|e| e.dst == id || e.src == id)
    }

    pub fn cancel_event(&mut self, id: EventId) {
        if let Some(pos) = self.deferred_events.iter().position(|e| e.id == id) {
            self.deferred_events.remove(pos);
        } else if id < self.event_count {
            self.canceled_events.insert(id);
        }
    }

    pub fn cancel_events<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&Event) -> bool,
    {
        let mut count = 0;
        for event in self.events.iter() {
            if pred(event) && self.canceled_events.insert(event.id) {
                count += 1;
            }
        }
        let deferred_before = self.deferred_events.len();
        self.deferred_events.retain(|e| !pred(e));
        count + deferred_before - self.deferred_events.len()
    }

    pub fn take_deferred_events(&mut self, id: Id, pred: &EventPredicate) -> Vec<Event> {
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(self.deferred_events.len());
        for event in self.deferred_events.drain(..) {
            if event.dst == id && pred.matches(&event) {
                taken.push(event);
            } else {
                kept.push_back(event);
            }
        }
        self.deferred_events = kept;
        taken
    }

    pub fn count_deferred_events(&self, id: Id, pred: &EventPredicate) -> usize {
        self.deferred_events
            .iter()
            .filter(|e| e.dst == id && pred.matches(e))
            .count()
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn terminate_at(&mut self, time: f64) {
        self.terminate_at = Some(time);
    }

    pub fn termination_time(&self) -> Option<f64> {
        self.terminate_at
    }

    pub fn dump_events(&self) -> Vec<Event> {
        let mut output = Vec::new();
        for event in self.events.iter() {
            if !self.canceled_events.contains(&event.id) {
                output.push((*event).clone())
            }
        }
        for event in self.deferred_events.iter() {
            output.push((*event).clone())
        }
        output.sort();
        // Because the sorting order of events is inverted to be used with BinaryHeap
        output.reverse();
        output
    }
}
