//! I1 frame codec: decoding uplink frames into typed payloads and building
//! downlink ACK frames (§3, §4.1, §4.2).

use serde::Serialize;
use thiserror::Error;

use crate::crc::crc16_modbus;

pub const SYNC: [u8; 2] = [0x5A, 0xA5];
pub const END_BYTE: u8 = 0x96;

pub const FRAME_TYPE_UPLINK: u8 = 0x01;
pub const FRAME_TYPE_DOWNLINK: u8 = 0x02;

pub const PACKET_TYPE_WEATHER: u8 = 0x31;
pub const PACKET_TYPE_TOWER_TILT: u8 = 0x32;
pub const PACKET_TYPE_LINE_TEMPERATURE: u8 = 0x33;
pub const PACKET_TYPE_HEARTBEAT: u8 = 0x61;

pub const PACKET_TYPE_WEATHER_ACK: u8 = 0xB1;
pub const PACKET_TYPE_TOWER_TILT_ACK: u8 = 0xB2;
pub const PACKET_TYPE_LINE_TEMPERATURE_ACK: u8 = 0xB3;
pub const PACKET_TYPE_HEARTBEAT_ACK: u8 = 0xE1;

pub const COMPONENT_ID_LEN: usize = 17;
/// Sync(2) + Packet_Length(2) + Cmd_Id(17) + Frame_Type(1) + Packet_Type(1) + Frame_No(1).
pub const HEADER_LEN: usize = 2 + 2 + COMPONENT_ID_LEN + 1 + 1 + 1;
/// Header + CRC16(2) + End(1), i.e. the on-wire size of a frame with empty content.
pub const FRAME_OVERHEAD: usize = HEADER_LEN + 2 + 1;

/// Maps an uplink packet type to its ACK packet type. Unknown types are
/// echoed back unchanged, matching the original `ACK_TYPE_MAP.get(.., default)`.
pub fn ack_code_for(packet_type: u8) -> u8 {
    match packet_type {
        PACKET_TYPE_WEATHER => PACKET_TYPE_WEATHER_ACK,
        PACKET_TYPE_TOWER_TILT => PACKET_TYPE_TOWER_TILT_ACK,
        PACKET_TYPE_LINE_TEMPERATURE => PACKET_TYPE_LINE_TEMPERATURE_ACK,
        PACKET_TYPE_HEARTBEAT => PACKET_TYPE_HEARTBEAT_ACK,
        other => other,
    }
}

/// Recoverable decode failures (§7). The connection handler never tears
/// down a connection over one of these; it emits a failure ACK when the
/// header could still be peeked, or drops the frame silently otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame is shorter than the minimum {FRAME_OVERHEAD}-byte envelope")]
    ShortFrame,
    #[error("sync bytes did not match 5A A5")]
    BadSync,
    #[error("declared Packet_Length does not match the actual frame length")]
    LengthMismatch,
    #[error("end byte did not match 0x96")]
    BadEnd,
    #[error("CRC16 did not match the frame's CRC field")]
    CrcMismatch,
    #[error("packet type 0x{0:02X} is not a supported uplink type")]
    UnsupportedPacketType(u8),
    #[error("payload is shorter than its schema requires")]
    PayloadTruncated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherPayload {
    pub component_id: String,
    pub time_stamp: u32,
    pub avg_wind_speed: f32,
    pub avg_wind_direction: u16,
    pub max_wind_speed: f32,
    pub extreme_wind_speed: f32,
    pub standard_wind_speed: f32,
    pub air_temperature: f32,
    /// Already divided by 10 (wire value is tenths of a percent RH).
    pub humidity: f32,
    pub air_pressure: f32,
    pub precipitation: f32,
    pub precipitation_intensity: f32,
    pub radiation_intensity: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TowerTiltPayload {
    pub component_id: String,
    pub time_stamp: u32,
    pub inclination: f32,
    pub inclination_x: f32,
    pub inclination_y: f32,
    pub angle_x: f32,
    pub angle_y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTemperaturePayload {
    pub component_id: String,
    pub unit_sum: u8,
    pub unit_no: u8,
    pub time_stamp: u32,
    pub line_temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartbeatPayload {
    /// Doubles as the device identifier; copied from the frame's Cmd_Id.
    pub cmd_id: String,
    pub clocktime_stamp: u32,
    pub battery_voltage: f32,
    pub operation_temperature: f32,
    pub battery_capacity: f32,
    pub floating_charge: u8,
    pub total_working_time: u32,
    pub working_time: u32,
    pub connection_state: u8,
    pub send_flow: u32,
    pub receive_flow: u32,
    pub protocol_version: [u8; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "packet_type")]
pub enum Payload {
    Weather(WeatherPayload),
    TowerTilt(TowerTiltPayload),
    LineTemperature(LineTemperaturePayload),
    Heartbeat(HeartbeatPayload),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFrame {
    pub cmd_id: String,
    pub frame_type: u8,
    pub packet_type: u8,
    pub frame_no: u8,
    pub payload: Payload,
}

/// The subset of header fields recoverable from a frame that failed full
/// decode, used to address the failure ACK (§4.5 step 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub cmd_id: String,
    pub packet_type: u8,
    pub frame_no: u8,
}

/// Bounds-checked cursor over a payload's Content bytes. Every read that
/// would run past the end of the slice yields `PayloadTruncated` instead
/// of panicking.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FrameError> {
        let end = self.pos + n;
        let slice = self.data.get(self.pos..end).ok_or(FrameError::PayloadTruncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, FrameError> {
        Ok(self.take(1)?[0])
    }

    fn u16_le(&mut self) -> Result<u16, FrameError> {
        let bytes: [u8; 2] = self.take(2)?.try_into().unwrap();
        Ok(u16::from_le_bytes(bytes))
    }

    fn u32_le(&mut self) -> Result<u32, FrameError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(u32::from_le_bytes(bytes))
    }

    fn f32_le(&mut self) -> Result<f32, FrameError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(f32::from_le_bytes(bytes))
    }

    fn ascii17(&mut self) -> Result<String, FrameError> {
        let raw = self.take(COMPONENT_ID_LEN)?;
        Ok(decode_ascii_field(raw))
    }
}

/// Strips trailing zero padding, then drops any non-ASCII byte silently
/// (§4.2.1: "non-ASCII bytes are dropped silently").
fn decode_ascii_field(raw: &[u8]) -> String {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    raw[..end].iter().filter(|b| b.is_ascii()).map(|&b| b as char).collect()
}

/// Truncates/pads an ASCII identifier to exactly 17 bytes, right-padded
/// with zeros, dropping non-ASCII characters.
fn encode_component_id(id: &str) -> [u8; COMPONENT_ID_LEN] {
    let mut out = [0u8; COMPONENT_ID_LEN];
    let ascii_bytes: std::vec::Vec<u8> = id.bytes().filter(u8::is_ascii).take(COMPONENT_ID_LEN).collect();
    out[..ascii_bytes.len()].copy_from_slice(&ascii_bytes);
    out
}

fn parse_weather(content: &[u8]) -> Result<WeatherPayload, FrameError> {
    let mut cur = Cursor::new(content);
    let component_id = cur.ascii17()?;
    let time_stamp = cur.u32_le()?;
    let avg_wind_speed = cur.f32_le()?;
    let avg_wind_direction = cur.u16_le()?;
    let max_wind_speed = cur.f32_le()?;
    let extreme_wind_speed = cur.f32_le()?;
    let standard_wind_speed = cur.f32_le()?;
    let air_temperature = cur.f32_le()?;
    let humidity_raw = cur.u16_le()?;
    let air_pressure = cur.f32_le()?;
    let precipitation = cur.f32_le()?;
    let precipitation_intensity = cur.f32_le()?;
    let radiation_intensity = cur.u16_le()?;

    Ok(WeatherPayload {
        component_id,
        time_stamp,
        avg_wind_speed,
        avg_wind_direction,
        max_wind_speed,
        extreme_wind_speed,
        standard_wind_speed,
        air_temperature,
        humidity: f32::from(humidity_raw) / 10.0,
        air_pressure,
        precipitation,
        precipitation_intensity,
        radiation_intensity,
    })
}

fn parse_tower_tilt(content: &[u8]) -> Result<TowerTiltPayload, FrameError> {
    let mut cur = Cursor::new(content);
    Ok(TowerTiltPayload {
        component_id: cur.ascii17()?,
        time_stamp: cur.u32_le()?,
        inclination: cur.f32_le()?,
        inclination_x: cur.f32_le()?,
        inclination_y: cur.f32_le()?,
        angle_x: cur.f32_le()?,
        angle_y: cur.f32_le()?,
    })
}

fn parse_line_temperature(content: &[u8]) -> Result<LineTemperaturePayload, FrameError> {
    let mut cur = Cursor::new(content);
    Ok(LineTemperaturePayload {
        component_id: cur.ascii17()?,
        unit_sum: cur.u8()?,
        unit_no: cur.u8()?,
        time_stamp: cur.u32_le()?,
        line_temperature: cur.f32_le()?,
    })
}

fn parse_heartbeat(content: &[u8], cmd_id: &str) -> Result<HeartbeatPayload, FrameError> {
    let mut cur = Cursor::new(content);
    let clocktime_stamp = cur.u32_le()?;
    let battery_voltage = cur.f32_le()?;
    let operation_temperature = cur.f32_le()?;
    let battery_capacity = cur.f32_le()?;
    let floating_charge = cur.u8()?;
    let total_working_time = cur.u32_le()?;
    let working_time = cur.u32_le()?;
    let connection_state = cur.u8()?;
    let send_flow = cur.u32_le()?;
    let receive_flow = cur.u32_le()?;
    let version_bytes = cur.take(4)?;

    Ok(HeartbeatPayload {
        cmd_id: cmd_id.to_string(),
        clocktime_stamp,
        battery_voltage,
        operation_temperature,
        battery_capacity,
        floating_charge,
        total_working_time,
        working_time,
        connection_state,
        send_flow,
        receive_flow,
        protocol_version: [version_bytes[0], version_bytes[1], version_bytes[2], version_bytes[3]],
    })
}

/// Decodes a complete uplink frame (§4.2.1). Preconditions are enforced in
/// the order given in the spec so the returned error kind identifies
/// exactly which check failed.
pub fn decode(frame: &[u8]) -> Result<ParsedFrame, FrameError> {
    if frame.len() < FRAME_OVERHEAD {
        return Err(FrameError::ShortFrame);
    }
    if frame[0..2] != SYNC {
        return Err(FrameError::BadSync);
    }

    let packet_length = u16::from_le_bytes([frame[2], frame[3]]) as usize;
    let expected_len = FRAME_OVERHEAD + packet_length;
    if frame.len() != expected_len {
        return Err(FrameError::LengthMismatch);
    }

    if frame[frame.len() - 1] != END_BYTE {
        return Err(FrameError::BadEnd);
    }

    let crc_expected = u16::from_le_bytes([frame[frame.len() - 3], frame[frame.len() - 2]]);
    let crc_actual = crc16_modbus(&frame[2..frame.len() - 3]);
    if crc_expected != crc_actual {
        return Err(FrameError::CrcMismatch);
    }

    let cmd_id = decode_ascii_field(&frame[4..21]);
    let frame_type = frame[21];
    let packet_type = frame[22];
    let frame_no = frame[23];
    let content = &frame[24..24 + packet_length];

    let payload = match packet_type {
        PACKET_TYPE_WEATHER => Payload::Weather(parse_weather(content)?),
        PACKET_TYPE_TOWER_TILT => Payload::TowerTilt(parse_tower_tilt(content)?),
        PACKET_TYPE_LINE_TEMPERATURE => Payload::LineTemperature(parse_line_temperature(content)?),
        PACKET_TYPE_HEARTBEAT => Payload::Heartbeat(parse_heartbeat(content, &cmd_id)?),
        other => return Err(FrameError::UnsupportedPacketType(other)),
    };

    Ok(ParsedFrame { cmd_id, frame_type, packet_type, frame_no, payload })
}

/// Recovers `Cmd_Id`/`Packet_Type`/`Frame_No` from a frame's fixed header
/// positions without running the full decode, so the caller can still
/// address a failure ACK after a decode error (§4.5 step 1).
pub fn peek_header(frame: &[u8]) -> Option<FrameHeader> {
    if frame.len() < HEADER_LEN {
        return None;
    }
    Some(FrameHeader {
        cmd_id: decode_ascii_field(&frame[4..21]),
        packet_type: frame[22],
        frame_no: frame[23],
    })
}

/// Assembles a complete frame (header + content + CRC + end byte) for
/// either direction. Shared by `encode_ack` and the test fixture builder
/// that synthesizes uplink frames.
pub fn encode_frame(cmd_id: &str, frame_type: u8, packet_type: u8, frame_no: u8, content: &[u8]) -> std::vec::Vec<u8> {
    let cmd_id_bytes = encode_component_id(cmd_id);
    let packet_length = content.len() as u16;

    let mut frame = std::vec::Vec::with_capacity(FRAME_OVERHEAD + content.len());
    frame.extend_from_slice(&SYNC);
    frame.extend_from_slice(&packet_length.to_le_bytes());
    frame.extend_from_slice(&cmd_id_bytes);
    frame.push(frame_type);
    frame.push(packet_type);
    frame.push(frame_no);
    frame.extend_from_slice(content);

    let crc = crc16_modbus(&frame[2..]);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.push(END_BYTE);
    frame
}

/// Builds a downlink ACK frame for an uplink frame identified by
/// `(cmd_id, uplink_packet_type, frame_no)` (§4.2.2).
pub fn encode_ack(
    cmd_id: &str,
    uplink_packet_type: u8,
    frame_no: u8,
    success: bool,
    mode: u8,
    clocktime: u32,
) -> std::vec::Vec<u8> {
    let status = if success { 0xFF } else { 0x00 };
    let mut content = vec![status];
    if uplink_packet_type == PACKET_TYPE_HEARTBEAT {
        content.push(mode);
        content.extend_from_slice(&clocktime.to_le_bytes());
    }
    let ack_packet_type = ack_code_for(uplink_packet_type);
    encode_frame(cmd_id, FRAME_TYPE_DOWNLINK, ack_packet_type, frame_no, &content)
}
