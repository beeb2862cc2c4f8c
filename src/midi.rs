//! MIDI wire constants and byte utilities
//!
//! Provides the status bytes the monitor cares about, the 4-byte event
//! packing used by the transport layer, and hex formatting for logs.

/// System Exclusive start byte
pub const SYSEX_START: u8 = 0xF0;

/// System Exclusive terminator byte
pub const SYSEX_END: u8 = 0xF7;

/// Control Change status on channel 1 (the only CC status the device uses)
pub const CONTROL_CHANGE: u8 = 0xB0;

/// Number of bytes carried by one packed transport event
pub const BYTES_PER_EVENT: usize = 4;

/// Pack up to four bytes into one event word, first byte in the low octet.
///
/// Missing trailing bytes are zero.
pub fn pack(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(BYTES_PER_EVENT)
        .enumerate()
        .fold(0u32, |word, (i, &b)| word | ((b as u32) << (8 * i)))
}

/// Unpack an event word into its four bytes, low octet first
pub fn unpack(word: u32) -> [u8; BYTES_PER_EVENT] {
    word.to_le_bytes()
}

/// Split a complete MIDI message into packed event words, in order
pub fn pack_message(data: &[u8]) -> Vec<u32> {
    data.chunks(BYTES_PER_EVENT).map(pack).collect()
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_control_change() {
        // CC 47 value 5 arrives as one word
        let word = pack(&[0xB0, 0x2F, 0x05]);
        assert_eq!(word, 0x0005_2FB0);
        assert_eq!(unpack(word), [0xB0, 0x2F, 0x05, 0x00]);
    }

    #[test]
    fn test_pack_message_splits_sysex() {
        let data = [0xF0, 0x00, 0x20, 0x33, 0x02, 0x7F, 0xF7];
        let words = pack_message(&data);

        assert_eq!(words.len(), 2);
        assert_eq!(unpack(words[0]), [0xF0, 0x00, 0x20, 0x33]);
        assert_eq!(unpack(words[1]), [0x02, 0x7F, 0xF7, 0x00]);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xF0, 0x0A, 0xF7]), "F0 0A F7");
        assert_eq!(format_hex(&[]), "");
    }
}
