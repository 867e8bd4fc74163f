//! The reactive dataflow dispatcher: runs systems as their own OS threads,
//! wires them together into dataflow graphs, and barriers a tick on their
//! channels draining.
//!
//! A system is not a function the world calls; it is a standing thread that
//! blocks on its own input channel. [`Dispatcher::dispatch`] feeds every
//! subscribed system the result of resolving its query against the world,
//! and [`Dispatcher::listen_to`] lets one system forward a value straight
//! into another's channel without going through the world at all.

mod barrier;
mod dispatcher;
mod handle;

pub use dispatcher::{Dispatcher, Message, Payload, System, SystemId};
pub use handle::{WeakWorld, WorldHandle};
