//! Record types, metadata extraction, and the emit path

pub mod assembler;
pub mod config;
pub mod extract;
pub mod record;
pub mod sink;

pub use assembler::{DefaultFormatter, EmitFailure, RecordFormatter};
pub use config::{init_logging, LoggingConfig};
pub use extract::ParamFilter;
pub use record::{ExceptionDescriptor, LogRecord};
pub use sink::{LogSink, MemorySink, SinkError, SinkResult, TracingSink};
