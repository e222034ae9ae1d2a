pub mod controller;
pub mod state;

pub use controller::{TimerController, TimerEvent};
pub use state::{format_clock, TimerPhase, TimerSession, TimerSnapshot, Transition};
