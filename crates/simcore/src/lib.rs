#![warn(missing_docs)]
#![doc = include_str!("../readme.md")]

pub mod component;
pub mod context;
pub mod event;
pub mod handler;
pub mod log;
pub mod predicate;
pub mod simulation;
mod state;

pub use colored;
pub use component::{EntityState, Id};
pub use context::SimulationContext;
pub use event::{Event, EventData, EventId, Tag, UNTAGGED};
pub use handler::{EventCancellationPolicy, EventHandler};
pub use predicate::EventPredicate;
pub use simulation::Simulation;
pub use state::EPSILON;
