pub mod modes;
pub mod settings;
pub mod timer;
mod utils;

pub use modes::{FocusModeDefinition, ModeCatalog};
pub use settings::FocusConfig;
pub use timer::{
    TimerController, TimerEvent, TimerPhase, TimerSession, TimerSnapshot, Transition,
};

/// Initialise logging (reads RUST_LOG, defaults to info).
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
