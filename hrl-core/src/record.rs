//! Types and traits for recording the progress of options.
//!
//! * [`Record`] - a container of key-value pairs
//! * [`RecordValue`] - the values stored in a [`Record`]
//! * [`Recorder`] - destinations of records
//! * [`BufferedRecorder`] - keeps records in memory
//!
//! ```rust
//! use hrl_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("num_goal_hits", 3.0);
//! record.insert("option", RecordValue::String("option-1".to_string()));
//! assert_eq!(record.get_scalar("num_goal_hits").unwrap(), 3.0);
//! ```
mod base;
mod buffered_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use recorder::Recorder;
