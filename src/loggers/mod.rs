mod errors;
mod json;
mod list;
mod noop;
mod scope;
mod terminal;
mod traits;

pub use errors::LoggerError;
pub use json::JsonLogger;
pub use list::{ListLogger, LogRecord};
pub use noop::NoOpLogger;
pub use scope::LoggerScope;
pub use terminal::TerminalLogger;
pub use traits::Logger;
