//! End-to-end codec scenarios: build a frame with the shared fixtures,
//! decode it, and check the parsed payload against what was encoded.

mod common;

use common::{corrupt_crc, heartbeat_frame, line_temperature_frame, tower_tilt_frame, weather_frame};
use i1_telemetry::protocol::{decode, peek_header, FrameError, Payload};

#[test]
fn decodes_a_weather_frame_round_trip() {
    let frame = weather_frame("WX-STATION-1", 12, 1_700_000_500);
    let parsed = decode(&frame).expect("well-formed frame decodes");
    assert_eq!(parsed.cmd_id, "WX-STATION-1");
    assert_eq!(parsed.frame_no, 12);
    match parsed.payload {
        Payload::Weather(w) => {
            assert_eq!(w.time_stamp, 1_700_000_500);
            assert!((w.humidity - 65.5).abs() < 1e-3);
        }
        other => panic!("expected weather, got {other:?}"),
    }
}

#[test]
fn decodes_a_tower_tilt_frame_round_trip() {
    let frame = tower_tilt_frame("TWR-07", 3, 1_700_000_600, 2.4);
    let parsed = decode(&frame).expect("well-formed frame decodes");
    match parsed.payload {
        Payload::TowerTilt(t) => {
            assert_eq!(t.component_id, "TWR-07");
            assert!((t.inclination - 2.4).abs() < 1e-6);
        }
        other => panic!("expected tower tilt, got {other:?}"),
    }
}

#[test]
fn decodes_a_line_temperature_frame_round_trip() {
    let frame = line_temperature_frame("LT-12", 5, 1_700_000_700, 92.5);
    let parsed = decode(&frame).expect("well-formed frame decodes");
    match parsed.payload {
        Payload::LineTemperature(l) => {
            assert_eq!(l.component_id, "LT-12");
            assert!((l.line_temperature - 92.5).abs() < 1e-6);
        }
        other => panic!("expected line temperature, got {other:?}"),
    }
}

#[test]
fn decodes_a_heartbeat_frame_round_trip() {
    let frame = heartbeat_frame("HB-CTRL-1", 9, 1_700_000_800);
    let parsed = decode(&frame).expect("well-formed frame decodes");
    match parsed.payload {
        Payload::Heartbeat(h) => {
            assert_eq!(h.cmd_id, "HB-CTRL-1");
            assert_eq!(h.clocktime_stamp, 1_700_000_800);
            assert_eq!(h.connection_state, 1);
        }
        other => panic!("expected heartbeat, got {other:?}"),
    }
}

#[test]
fn crc_mismatch_is_detected_but_header_is_still_recoverable() {
    let frame = corrupt_crc(weather_frame("WX-STATION-1", 1, 1_700_000_000));
    assert_eq!(decode(&frame), Err(FrameError::CrcMismatch));
    let header = peek_header(&frame).expect("header survives a CRC corruption");
    assert_eq!(header.cmd_id, "WX-STATION-1");
}

#[test]
fn garbage_bytes_never_panic_the_decoder() {
    for len in 0..40 {
        let garbage = vec![0x42u8; len];
        let _ = decode(&garbage);
    }
}
