//! Follows the shairport-sync metadata pipe and keeps a "now playing" snapshot.
//!
//! The daemon writes a stream of `<item>` records whose `type` and `code`
//! are hex encoded and whose payload is base64. The pipeline is strictly
//! sequential:
//!
//! - [`frame::FrameReader`] reassembles records from arbitrarily split reads
//! - [`decode`] parses the wrapper and decodes hex/base64 fields
//! - [`machine::StateMachine`] applies each item to the snapshot and decides
//!   track changes at bundle-end markers
//!
//! [`pipe::MetadataReader`] drives the pipeline from a file or FIFO and
//! publishes each updated snapshot into a [`SharedState`] that consumers
//! can read at any time.
//!
//! # Examples
//! ```no_run
//! use metapipe::{create_state, Config, MetadataReader};
//!
//! let reader = MetadataReader::new(Config::new("/tmp/shairport-sync-metadata"), create_state());
//! reader.spawn()?;
//! println!("{:?}", reader.snapshot());
//! reader.wait()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod events;
pub mod frame;
pub mod machine;
pub mod pipe;
pub mod state;
pub mod types;

pub use config::Config;
pub use error::{FieldError, StreamError, WrapperError};
pub use events::{EventSink, LogSink, MetadataEvent};
pub use machine::{FingerprintMode, StateMachine};
pub use pipe::MetadataReader;
pub use state::{create_state, SharedState};
pub use types::{AppState, DecodeStats, NowPlaying, PlaybackState, ReaderStatus};
