//! Synthesizes well-formed (and deliberately corrupted) I1 uplink frames
//! for the integration tests. A Rust port of the original fixture's
//! `I1FrameBuilder`, using the crate's own `encode_frame` so every
//! fixture stays byte-compatible with production encoding.

#![allow(dead_code)]

use i1_telemetry::protocol::{
    encode_frame, FRAME_TYPE_UPLINK, PACKET_TYPE_HEARTBEAT, PACKET_TYPE_LINE_TEMPERATURE, PACKET_TYPE_TOWER_TILT,
    PACKET_TYPE_WEATHER,
};

pub fn weather_frame(component_id: &str, frame_no: u8, time_stamp: u32) -> Vec<u8> {
    let mut content = Vec::new();
    content.extend_from_slice(&padded_component_id(component_id));
    content.extend_from_slice(&time_stamp.to_le_bytes());
    content.extend_from_slice(&4.5f32.to_le_bytes()); // avg_wind_speed
    content.extend_from_slice(&170u16.to_le_bytes()); // avg_wind_direction
    content.extend_from_slice(&7.8f32.to_le_bytes()); // max_wind_speed
    content.extend_from_slice(&9.9f32.to_le_bytes()); // extreme_wind_speed
    content.extend_from_slice(&1.1f32.to_le_bytes()); // standard_wind_speed
    content.extend_from_slice(&24.3f32.to_le_bytes()); // air_temperature
    content.extend_from_slice(&655u16.to_le_bytes()); // humidity * 10
    content.extend_from_slice(&1010.2f32.to_le_bytes()); // air_pressure
    content.extend_from_slice(&0.3f32.to_le_bytes()); // precipitation
    content.extend_from_slice(&0.01f32.to_le_bytes()); // precipitation_intensity
    content.extend_from_slice(&610u16.to_le_bytes()); // radiation_intensity
    encode_frame(component_id, FRAME_TYPE_UPLINK, PACKET_TYPE_WEATHER, frame_no, &content)
}

pub fn tower_tilt_frame(component_id: &str, frame_no: u8, time_stamp: u32, inclination: f32) -> Vec<u8> {
    let mut content = Vec::new();
    content.extend_from_slice(&padded_component_id(component_id));
    content.extend_from_slice(&time_stamp.to_le_bytes());
    content.extend_from_slice(&inclination.to_le_bytes());
    content.extend_from_slice(&0.2f32.to_le_bytes()); // inclination_x
    content.extend_from_slice(&0.1f32.to_le_bytes()); // inclination_y
    content.extend_from_slice(&1.5f32.to_le_bytes()); // angle_x
    content.extend_from_slice(&0.8f32.to_le_bytes()); // angle_y
    encode_frame(component_id, FRAME_TYPE_UPLINK, PACKET_TYPE_TOWER_TILT, frame_no, &content)
}

pub fn line_temperature_frame(component_id: &str, frame_no: u8, time_stamp: u32, line_temperature: f32) -> Vec<u8> {
    let mut content = Vec::new();
    content.extend_from_slice(&padded_component_id(component_id));
    content.push(1); // unit_sum
    content.push(1); // unit_no
    content.extend_from_slice(&time_stamp.to_le_bytes());
    content.extend_from_slice(&line_temperature.to_le_bytes());
    encode_frame(component_id, FRAME_TYPE_UPLINK, PACKET_TYPE_LINE_TEMPERATURE, frame_no, &content)
}

pub fn heartbeat_frame(component_id: &str, frame_no: u8, clocktime: u32) -> Vec<u8> {
    let mut content = Vec::new();
    content.extend_from_slice(&clocktime.to_le_bytes());
    content.extend_from_slice(&13.6f32.to_le_bytes()); // battery_voltage
    content.extend_from_slice(&32.0f32.to_le_bytes()); // operation_temperature
    content.extend_from_slice(&95.0f32.to_le_bytes()); // battery_capacity
    content.push(1); // floating_charge
    content.extend_from_slice(&36000u32.to_le_bytes()); // total_working_time
    content.extend_from_slice(&3600u32.to_le_bytes()); // working_time
    content.push(1); // connection_state
    content.extend_from_slice(&1024u32.to_le_bytes()); // send_flow
    content.extend_from_slice(&2048u32.to_le_bytes()); // receive_flow
    content.extend_from_slice(&[1, 0, 0, 0]); // protocol_version
    encode_frame(component_id, FRAME_TYPE_UPLINK, PACKET_TYPE_HEARTBEAT, frame_no, &content)
}

/// Flips one bit in the CRC field of an otherwise well-formed frame.
pub fn corrupt_crc(mut frame: Vec<u8>) -> Vec<u8> {
    let crc_index = frame.len() - 3;
    frame[crc_index] ^= 0xFF;
    frame
}

fn padded_component_id(id: &str) -> [u8; 17] {
    let mut out = [0u8; 17];
    let bytes = id.as_bytes();
    let n = bytes.len().min(17);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}
