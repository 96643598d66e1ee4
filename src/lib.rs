//! # I1 Telemetry Server
//!
//! A TCP ingestion endpoint and in-memory telemetry cache for the I1
//! binary protocol used by power-line monitoring nodes (weather stations,
//! tower-tilt sensors, conductor-temperature units, and heartbeat
//! controllers).
//!
//! ## Architecture
//!
//! - [`crc`] - Modbus CRC16, the integrity check every frame carries.
//! - [`protocol`] - frame codec: decoding uplink payloads, building
//!   downlink ACKs.
//! - [`framing`] - reassembles whole frames out of a streaming TCP
//!   connection.
//! - [`store`] - bounded, thread-safe telemetry cache with the
//!   foreign-object fusion rule.
//! - [`config`] - server configuration knobs.
//! - [`server`] - the accept loop and per-connection handler.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod crc;
pub mod framing;
pub mod protocol;
pub mod server;
pub mod store;

pub use config::ServerConfig;
pub use protocol::{FrameError, ParsedFrame, Payload};
pub use server::{ServerError, ServerManager};
pub use store::{StoreConfig, StoredRecord, TelemetryStore, UpdateCursor};
