//! Modbus CRC16, used to validate every I1 frame (§4.1).
//!
//! Polynomial `0xA001`, initial value `0xFFFF`, LSB-first, no final XOR, no
//! byte reversal — the reflected form of the standard CRC-16/MODBUS
//! algorithm, equivalent to `crc::CRC_16_MODBUS`.

use crc::{Crc, CRC_16_MODBUS};

const MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Computes the Modbus CRC16 over an arbitrary byte slice.
///
/// For an I1 frame the covered range is `[Packet_Length byte 0 .. last
/// Content byte]` — everything after Sync and before the CRC field itself.
pub fn crc16_modbus(data: &[u8]) -> u16 {
    MODBUS.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_the_seed() {
        assert_eq!(crc16_modbus(&[]), 0xFFFF);
    }

    #[test]
    fn single_byte_reference_vector() {
        assert_eq!(crc16_modbus(&[0x01]), 0x807E);
    }

    #[test]
    fn four_byte_reference_vector() {
        assert_eq!(crc16_modbus(&[0x01, 0x02, 0x03, 0x04]), 0x2BA1);
    }

    #[test]
    fn differs_on_single_bit_flip() {
        let a = crc16_modbus(&[0x10, 0x20, 0x30]);
        let b = crc16_modbus(&[0x10, 0x20, 0x31]);
        assert_ne!(a, b);
    }

    #[test]
    fn stable_across_repeated_calls() {
        let data = b"power-line-telemetry";
        assert_eq!(crc16_modbus(data), crc16_modbus(data));
    }
}
