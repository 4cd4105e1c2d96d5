//! EBML element ids, size markers and byte writers
//!
//! The generator emits fixed-width size fields so that every header has a
//! deterministic length and can be patched in place:
//!
//! | width | marker        | max payload |
//! |-------|---------------|-------------|
//! | 1     | `0x80`        | 126         |
//! | 2     | `0x4000`      | 16 382      |
//! | 4     | `0x1000_0000` | 2^28 - 2    |
//! | 8     | `0x01 << 56`  | 2^56 - 2    |

// Level 0 / 1 element ids
pub const EBML: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];
pub const SEGMENT: [u8; 4] = [0x18, 0x53, 0x80, 0x67];
pub const INFO: [u8; 4] = [0x15, 0x49, 0xA9, 0x66];
pub const TRACKS: [u8; 4] = [0x16, 0x54, 0xAE, 0x6B];
pub const CLUSTER: [u8; 4] = [0x1F, 0x43, 0xB6, 0x75];

// EBML header children
pub const EBML_VERSION: [u8; 2] = [0x42, 0x86];
pub const EBML_READ_VERSION: [u8; 2] = [0x42, 0xF7];
pub const EBML_MAX_ID_LENGTH: [u8; 2] = [0x42, 0xF2];
pub const EBML_MAX_SIZE_LENGTH: [u8; 2] = [0x42, 0xF3];
pub const DOC_TYPE: [u8; 2] = [0x42, 0x82];
pub const DOC_TYPE_VERSION: [u8; 2] = [0x42, 0x87];
pub const DOC_TYPE_READ_VERSION: [u8; 2] = [0x42, 0x85];

// Info children
pub const SEGMENT_UID: [u8; 2] = [0x73, 0xA4];
pub const TIMESTAMP_SCALE: [u8; 3] = [0x2A, 0xD7, 0xB1];
pub const TITLE: [u8; 2] = [0x7B, 0xA9];
pub const MUXING_APP: [u8; 2] = [0x4D, 0x80];
pub const WRITING_APP: [u8; 2] = [0x57, 0x41];

// Track entry children
pub const TRACK_ENTRY: u8 = 0xAE;
pub const TRACK_NUMBER: u8 = 0xD7;
pub const TRACK_UID: [u8; 2] = [0x73, 0xC5];
pub const TRACK_TYPE: u8 = 0x83;
pub const NAME: [u8; 2] = [0x53, 0x6E];
pub const CODEC_ID: u8 = 0x86;
pub const CODEC_PRIVATE: [u8; 2] = [0x63, 0xA2];
pub const VIDEO: u8 = 0xE0;
pub const PIXEL_WIDTH: u8 = 0xB0;
pub const PIXEL_HEIGHT: u8 = 0xBA;
pub const AUDIO: u8 = 0xE1;
pub const SAMPLING_FREQUENCY: u8 = 0xB5;
pub const CHANNELS: u8 = 0x9F;
pub const BIT_DEPTH: [u8; 2] = [0x62, 0x64];

// Cluster children
pub const TIMESTAMP: u8 = 0xE7;
pub const POSITION: u8 = 0xA7;
pub const SIMPLE_BLOCK: u8 = 0xA3;

/// "Unknown size" marker for live Segment and Cluster elements.
pub const UNKNOWN_SIZE: u8 = 0xFF;

pub const SIZE_MARKER_1: u8 = 0x80;
pub const SIZE_MARKER_2: u16 = 0x4000;
pub const SIZE_MARKER_4: u32 = 0x1000_0000;
pub const SIZE_MARKER_8: u64 = 0x01 << 56;

/// Largest value a 2-byte size field can carry.
pub const MAX_SIZE_2: usize = (SIZE_MARKER_2 as usize) - 2;
/// Largest value a 4-byte size field can carry.
pub const MAX_SIZE_4: usize = (SIZE_MARKER_4 as usize) - 2;

/// Append a 1-byte sized unsigned integer element.
pub fn push_uint_1(out: &mut Vec<u8>, id: &[u8], value: u8) {
    out.extend_from_slice(id);
    out.push(SIZE_MARKER_1 | 1);
    out.push(value);
}

/// Append a 2-byte size field. Caller guarantees `len <= MAX_SIZE_2`.
pub fn push_size_2(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(SIZE_MARKER_2 | len as u16).to_be_bytes());
}

/// Append a 4-byte size field. Caller guarantees `len <= MAX_SIZE_4`.
pub fn push_size_4(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(SIZE_MARKER_4 | len as u32).to_be_bytes());
}

/// Append a 16-byte, zero-padded string element.
///
/// At most 15 bytes of `value` are kept so the field stays NUL-terminated.
/// Truncation never splits a UTF-8 character.
pub fn push_fixed_string(out: &mut Vec<u8>, id: &[u8], value: &str) {
    const FIELD_LEN: usize = 16;

    out.extend_from_slice(id);
    out.push(SIZE_MARKER_1 | FIELD_LEN as u8);
    let mut kept = value.len().min(FIELD_LEN - 1);
    while !value.is_char_boundary(kept) {
        kept -= 1;
    }
    out.extend_from_slice(&value.as_bytes()[..kept]);
    out.extend(std::iter::repeat_n(0u8, FIELD_LEN - kept));
}

/// Overwrite a 4-byte size field already present at `offset`.
pub fn patch_size_4(buf: &mut [u8], offset: usize, len: usize) {
    write_u32_be(buf, offset, SIZE_MARKER_4 | len as u32);
}

pub fn write_u16_be(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

pub fn write_u32_be(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

pub fn write_u64_be(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_be_bytes());
}
