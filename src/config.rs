//! Server configuration (§6.2). Built once from CLI flags in
//! `src/bin/i1_server.rs` and passed by value into the pieces that need
//! it — no environment-variable or file-based layer.

use std::net::Ipv4Addr;

use crate::framing::MAX_FRAME_LEN;
use crate::store::{DEFAULT_ALERT_THRESHOLD_C, DEFAULT_ALERT_TIMEOUT_SECONDS, DEFAULT_MAX_RECORDS};

pub const DEFAULT_LISTEN_PORT: u16 = 9100;
pub const DEFAULT_READ_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen_host: Ipv4Addr,
    pub listen_port: u16,
    pub server_enabled: bool,
    pub max_records: usize,
    pub line_temp_alert_threshold: f32,
    pub line_temp_alert_timeout: u32,
    pub max_frame_size: usize,
    pub read_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_host: Ipv4Addr::UNSPECIFIED,
            listen_port: DEFAULT_LISTEN_PORT,
            server_enabled: true,
            max_records: DEFAULT_MAX_RECORDS,
            line_temp_alert_threshold: DEFAULT_ALERT_THRESHOLD_C,
            line_temp_alert_timeout: DEFAULT_ALERT_TIMEOUT_SECONDS,
            max_frame_size: MAX_FRAME_LEN,
            read_timeout_seconds: DEFAULT_READ_TIMEOUT_SECONDS,
        }
    }
}
