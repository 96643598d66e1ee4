//! In-memory telemetry store (§3.4, §4.4): a bounded ring of fused weather
//! observations, latest-value caches for tilt/heartbeat, and a
//! component-keyed conductor-temperature alert table that feeds the
//! foreign-object fusion rule.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tracing::debug;

use crate::protocol::{HeartbeatPayload, LineTemperaturePayload, TowerTiltPayload, WeatherPayload};

pub const DEFAULT_MAX_RECORDS: usize = 288;
pub const DEFAULT_ALERT_THRESHOLD_C: f32 = 80.0;
pub const DEFAULT_ALERT_TIMEOUT_SECONDS: u32 = 600;

const BEIJING_OFFSET_SECONDS: i32 = 8 * 3600;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreConfig {
    pub max_records: usize,
    pub alert_threshold_c: f32,
    pub alert_timeout_seconds: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            alert_threshold_c: DEFAULT_ALERT_THRESHOLD_C,
            alert_timeout_seconds: DEFAULT_ALERT_TIMEOUT_SECONDS,
        }
    }
}

impl StoreConfig {
    fn normalized(mut self) -> Self {
        self.max_records = self.max_records.max(1);
        self.alert_timeout_seconds = self.alert_timeout_seconds.max(1);
        self
    }
}

/// One fused weather observation, ready for the HTTP read interface (§4.7).
/// `raw_payload` is kept for in-process consumers but left out of the
/// legacy-compatible serialized view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    #[serde(rename = "timestamp_Beijing")]
    pub timestamp_str: String,
    pub sway_speed_dps: f32,
    #[serde(rename = "temperature_C")]
    pub temperature_c: f32,
    #[serde(rename = "humidity_RH")]
    pub humidity_rh: f32,
    #[serde(rename = "pressure_hPa")]
    pub pressure_hpa: f32,
    pub lux: f32,
    pub wire_foreign_object: u8,
    pub component_id: String,
    pub frame_no: u8,
    pub wind_speed_avg_10min: f32,
    pub wind_direction_deg: f32,
    pub wind_speed_max: f32,
    pub wind_speed_extreme: f32,
    pub precipitation_mm: f32,
    pub precipitation_intensity_mm_min: f32,
    #[serde(skip)]
    pub raw_payload: WeatherPayload,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AlertEntry {
    last_alert_timestamp: u32,
    active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataInfo {
    pub source_type: &'static str,
    pub records: usize,
    pub latest_timestamp: Option<String>,
    pub alert_threshold: f32,
    pub alert_timeout: u32,
}

struct Inner {
    config: StoreConfig,
    weather_records: VecDeque<StoredRecord>,
    alerts: HashMap<String, AlertEntry>,
    latest_tilt: HashMap<String, TowerTiltPayload>,
    latest_heartbeat: Option<HeartbeatPayload>,
    update_counter: u64,
}

/// Thread-safe telemetry cache. A single `std::sync::Mutex` guards all
/// state; no store method re-enters the lock, so a plain (non-reentrant)
/// mutex is sufficient.
pub struct TelemetryStore {
    inner: Mutex<Inner>,
}

/// A read-side position into the store's `UpdateCounter`. Each consumer
/// keeps its own cursor so `is_data_updated` answers "changed since *my*
/// last check", independent of other consumers polling the same store.
pub struct UpdateCursor {
    last_seen: AtomicU64,
}

impl UpdateCursor {
    pub fn new() -> Self {
        Self { last_seen: AtomicU64::new(0) }
    }
}

impl Default for UpdateCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                config: config.normalized(),
                weather_records: VecDeque::new(),
                alerts: HashMap::new(),
                latest_tilt: HashMap::new(),
                latest_heartbeat: None,
                update_counter: 0,
            }),
        }
    }

    /// Adjusts store knobs in place (§4.4.5). Changing `max_records`
    /// trims the ring down to the newest `min(old_len, new_max)` records
    /// without disturbing arrival order.
    pub fn configure(
        &self,
        max_records: Option<usize>,
        alert_threshold_c: Option<f32>,
        alert_timeout_seconds: Option<u32>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(max_records) = max_records {
            let max_records = max_records.max(1);
            if max_records != inner.config.max_records {
                inner.config.max_records = max_records;
                while inner.weather_records.len() > max_records {
                    inner.weather_records.pop_front();
                }
            }
        }
        if let Some(threshold) = alert_threshold_c {
            inner.config.alert_threshold_c = threshold;
        }
        if let Some(timeout) = alert_timeout_seconds {
            inner.config.alert_timeout_seconds = timeout.max(1);
        }
    }

    pub fn ingest_weather(&self, payload: WeatherPayload, frame_no: u8) -> StoredRecord {
        let mut inner = self.inner.lock().unwrap();
        let wire_foreign_object = fusion_flag(
            &inner.alerts,
            &payload.component_id,
            payload.time_stamp,
            inner.config.alert_timeout_seconds,
        );

        let record = StoredRecord {
            timestamp_str: format_beijing(payload.time_stamp),
            sway_speed_dps: round2(payload.standard_wind_speed),
            temperature_c: round2(payload.air_temperature),
            humidity_rh: round2(payload.humidity),
            pressure_hpa: round2(payload.air_pressure),
            lux: round2(f32::from(payload.radiation_intensity)),
            wire_foreign_object,
            component_id: payload.component_id.clone(),
            frame_no,
            wind_speed_avg_10min: round2(payload.avg_wind_speed),
            wind_direction_deg: f32::from(payload.avg_wind_direction),
            wind_speed_max: round2(payload.max_wind_speed),
            wind_speed_extreme: round2(payload.extreme_wind_speed),
            precipitation_mm: round2(payload.precipitation),
            precipitation_intensity_mm_min: round2(payload.precipitation_intensity),
            raw_payload: payload,
        };

        if inner.weather_records.len() >= inner.config.max_records {
            inner.weather_records.pop_front();
        }
        inner.weather_records.push_back(record.clone());
        inner.update_counter += 1;
        debug!(component = %record.component_id, counter = inner.update_counter, "weather ingested");
        record
    }

    pub fn ingest_tower_tilt(&self, payload: TowerTiltPayload) {
        let mut inner = self.inner.lock().unwrap();
        let component_id = payload.component_id.clone();
        inner.latest_tilt.insert(component_id.clone(), payload);
        inner.update_counter += 1;
        debug!(component = %component_id, counter = inner.update_counter, "tower tilt ingested");
    }

    pub fn ingest_line_temperature(&self, payload: LineTemperaturePayload) {
        let mut inner = self.inner.lock().unwrap();
        let active = payload.line_temperature >= inner.config.alert_threshold_c;
        let component_id = payload.component_id.clone();
        inner.alerts.insert(component_id.clone(), AlertEntry { last_alert_timestamp: payload.time_stamp, active });
        inner.update_counter += 1;
        debug!(component = %component_id, counter = inner.update_counter, alert_active = active, "line temperature ingested");
    }

    pub fn ingest_heartbeat(&self, payload: HeartbeatPayload) {
        let mut inner = self.inner.lock().unwrap();
        let component_id = payload.cmd_id.clone();
        inner.latest_heartbeat = Some(payload);
        inner.update_counter += 1;
        debug!(component = %component_id, counter = inner.update_counter, "heartbeat ingested");
    }

    pub fn get_all_weather(&self) -> Vec<StoredRecord> {
        self.inner.lock().unwrap().weather_records.iter().cloned().collect()
    }

    pub fn get_latest_weather(&self) -> Option<StoredRecord> {
        self.inner.lock().unwrap().weather_records.back().cloned()
    }

    /// Last `limit` records in arrival order, or all of them if `limit <= 0`.
    pub fn get_recent_weather(&self, limit: i64) -> Vec<StoredRecord> {
        let inner = self.inner.lock().unwrap();
        if limit <= 0 {
            return inner.weather_records.iter().cloned().collect();
        }
        let limit = limit as usize;
        let skip = inner.weather_records.len().saturating_sub(limit);
        inner.weather_records.iter().skip(skip).cloned().collect()
    }

    pub fn get_weather_count(&self) -> usize {
        self.inner.lock().unwrap().weather_records.len()
    }

    pub fn get_latest_tower_tilt(&self) -> HashMap<String, TowerTiltPayload> {
        self.inner.lock().unwrap().latest_tilt.clone()
    }

    pub fn get_latest_heartbeat(&self) -> Option<HeartbeatPayload> {
        self.inner.lock().unwrap().latest_heartbeat.clone()
    }

    /// True iff `UpdateCounter` has moved since this cursor's last check;
    /// the cursor is advanced as a side effect, so a second call in a row
    /// without an intervening write returns `false`.
    pub fn is_data_updated(&self, cursor: &UpdateCursor) -> bool {
        let current = self.inner.lock().unwrap().update_counter;
        let previous = cursor.last_seen.swap(current, Ordering::SeqCst);
        previous != current
    }

    pub fn get_data_info(&self) -> DataInfo {
        let inner = self.inner.lock().unwrap();
        DataInfo {
            source_type: "i1",
            records: inner.weather_records.len(),
            latest_timestamp: inner.weather_records.back().map(|r| r.timestamp_str.clone()),
            alert_threshold: inner.config.alert_threshold_c,
            alert_timeout: inner.config.alert_timeout_seconds,
        }
    }
}

/// Foreign-object fusion rule (§4.4.3): active within the timeout window.
fn fusion_flag(alerts: &HashMap<String, AlertEntry>, component_id: &str, ts: u32, timeout: u32) -> u8 {
    match alerts.get(component_id) {
        Some(entry) if entry.active => {
            let elapsed = i64::from(ts) - i64::from(entry.last_alert_timestamp);
            u8::from(elapsed <= i64::from(timeout))
        }
        _ => 0,
    }
}

fn format_beijing(epoch_seconds: u32) -> String {
    let utc = DateTime::<Utc>::from_timestamp(i64::from(epoch_seconds), 0)
        .expect("u32 epoch seconds is always in chrono's representable range");
    let beijing = FixedOffset::east_opt(BEIJING_OFFSET_SECONDS).expect("fixed +08:00 offset is always valid");
    utc.with_timezone(&beijing).format("%Y-%m-%d %H:%M").to_string()
}

/// Rounds to 2 decimal places using round-half-to-even, matching Python's
/// `round(x, 2)` (the original `add_weather` rounds every field this way).
/// A plain "multiply, round-half-away-from-zero, divide" would diverge from
/// the original on exact `.xx5` ties, e.g. `26.125` rounds to `26.12` under
/// both here and in the original, but would round to `26.13` under
/// round-half-away-from-zero.
fn round2(value: f32) -> f32 {
    let scaled = f64::from(value) * 100.0;
    let floor = scaled.floor();
    let diff = scaled - floor;
    let rounded = match diff.partial_cmp(&0.5) {
        Some(std::cmp::Ordering::Less) => floor,
        Some(std::cmp::Ordering::Greater) => floor + 1.0,
        _ => {
            // Exactly on the tie: round to the even neighbor.
            if (floor as i64) % 2 == 0 {
                floor
            } else {
                floor + 1.0
            }
        }
    };
    (rounded / 100.0) as f32
}
