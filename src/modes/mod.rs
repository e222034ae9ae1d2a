pub mod catalog;
pub mod definition;

pub use catalog::{ModeCatalog, DEFAULT_MODE_ID};
pub use definition::FocusModeDefinition;
