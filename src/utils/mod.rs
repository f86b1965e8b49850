pub mod configuration;
pub mod format_writers;
pub mod progress_display;

pub use configuration::{ConfigurationManager, ValidatorConfiguration};
pub use progress_display::TerminalProgress;
