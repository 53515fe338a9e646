//! Event handling.

use crate::event::Event;

/// Trait for consuming events in simulation components.
pub trait EventHandler {
    /// Processes event.
    ///
    /// The per-component transition table is usually written with the [`cast!`](crate::cast!) macro.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use serde::Serialize;
    /// use simcore::{cast, Event, EventHandler, Simulation, SimulationContext};
    ///
    /// #[derive(Clone, Serialize)]
    /// pub struct Reserve {
    ///     pes: u32,
    /// }
    ///
    /// pub struct PeCounter {
    ///     reserved: u32,
    ///     ctx: SimulationContext,
    /// }
    ///
    /// impl EventHandler for PeCounter {
    ///     fn on(&mut self, event: Event) {
    ///         cast!(match event.data {
    ///             Reserve { pes } => {
    ///                 self.reserved += pes;
    ///             }
    ///         })
    ///     }
    /// }
    ///
    /// let mut sim = Simulation::new(42);
    /// let mut client = sim.create_context("client");
    /// let counter = Rc::new(RefCell::new(PeCounter { reserved: 0, ctx: sim.create_context("counter") }));
    /// let counter_id = sim.add_handler("counter", counter.clone());
    /// client.emit(Reserve { pes: 2 }, counter_id, 0.5);
    /// client.emit(Reserve { pes: 3 }, counter_id, 1.0);
    /// sim.step_until_no_events();
    /// assert_eq!(counter.borrow().reserved, 5);
    /// ```
    fn on(&mut self, event: Event);

    /// Called once when the component is started.
    fn on_start(&mut self) {}

    /// Called when the simulation is terminated while the component is not finished.
    fn on_shutdown(&mut self) {}
}

/// Enables the use of pattern matching syntax for processing different types of events
/// by downcasting the event payload from [`EventData`](crate::event::EventData) to user-defined types.
///
/// Match arms need not be exhaustive. If the event payload does not match any of specified arms,
/// the macro logs the event as unhandled under `ERROR` level.
#[macro_export]
macro_rules! cast {
    ( match $event:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        $(
            if $event.data.is::<$type>() {
                if let Ok(__value) = $event.data.downcast::<$type>() {
                    let $type { $($tt)* } = *__value;
                    $($expr)*
                }
            } else
        )*
        {
            $crate::log::log_unhandled_event($event);
        }
    }
}

/// Specifies which pending events are cancelled on event handler removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventCancellationPolicy {
    /// Cancel events destined to the component.
    Incoming,
    /// Cancel events produced by the component.
    Outgoing,
    /// Cancel all events related to the component.
    All,
    /// Do not cancel events.
    None,
}
