//! Racecar Log Decoder Library
//!
//! Decodes CAN bus logs recorded on the electric racecar into engineering-unit
//! time series: inverter voltages/currents/temperatures, torques, pedal
//! sensors, gyro, steering, suspension travel, wheel speeds and per-cell
//! battery telemetry.
//!
//! # Architecture
//!
//! - [`formats`] reads log records lazily into [`RawFrame`]s
//! - [`codec`] extracts fixed-width integers from hex payloads
//! - [`multiplex`] maps battery messages onto cells and sensors
//! - [`messages`] holds one decode rule per message, including the stateful
//!   derivations (distance, energy, calculated current)
//! - [`Dataset`] collects the channels; [`Dataset::materialize`] freezes them
//!
//! The ID → meaning mapping is fixed in code; there is no DBC support.
//!
//! # Example Usage
//!
//! ```no_run
//! use racecar_log_decoder::{ChannelId, Decoder, DecoderConfig, GroupId};
//! use std::path::Path;
//!
//! let decoder = Decoder::with_config(DecoderConfig::new().with_debounce_ms(100)).unwrap();
//! let decoded = decoder.decode_file(Path::new("endurance.csv")).unwrap();
//! println!("{} records, {} decoded", decoded.stats.records, decoded.stats.decoded);
//!
//! let data = decoded.dataset.materialize();
//! let distance = data.channel(ChannelId::Distance);
//! if let Some((ts, metres)) = distance.last() {
//!     println!("{:.0} m after {} ms", metres, ts);
//! }
//! let first_cell = data.group_member(GroupId::BmsCell, 0).unwrap();
//! println!("cell 1: {} samples", first_cell.len());
//! ```

// Public modules
pub mod channel;
pub mod codec;
pub mod config;
pub mod dataset;
pub mod decoder;
pub mod formats;
pub mod materialize;
pub mod messages;
pub mod multiplex;
pub mod state;
pub mod types;

// Re-export main types for convenience
pub use channel::{Category, Channel, ChannelGroup, ChannelId, GroupId};
pub use config::DecoderConfig;
pub use dataset::{Dataset, Sample, Target};
pub use decoder::{DecodeStats, DecodedLog, Decoder};
pub use materialize::{MaterializedDataset, Series};
pub use messages::MessageKind;
pub use types::{CodecError, DecoderError, RawFrame, Result, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
