/// Installs the console + rolling JSON file `tracing` subscriber.
pub mod loggerlocal;

pub use loggerlocal::{setup_logging, LoggerLocalOptions, LoggingError};
