//! Progress event types and the in-process event bus.

pub mod bus;

pub use bus::{EventBus, ProgressEvent};
