mod driver;
mod engine;

pub use driver::{CountdownBoard, CountdownHandle, CountdownObserver, CountdownTimer};
pub use engine::{same_countdown, Cadence, CountdownEngine, CountdownState};
