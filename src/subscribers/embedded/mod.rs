//! # Built-in subscribers
//!
//! - [`LogWriter`]: mirrors runtime events into `tracing`.

mod log;

pub use log::LogWriter;
