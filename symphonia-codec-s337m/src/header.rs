// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decodes an S337M burst header: the extended sync pattern plus the data-type and data-size
//! words that follow it.

use symphonia_core::errors::{buffer_too_small_error, decode_error, unsupported_error, Result};

use crate::sync::{identify_marker_at_start, is_permitted_pair, CarrierWidth, SyncMarker};

/// The inner codec identified by a burst's data type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InnerCodec {
    /// Dolby E (`data_type & 0x1F == 0x1C`).
    DolbyE,
}

/// A decoded S337M burst header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BurstHeader {
    /// The sync marker that was matched.
    pub marker: SyncMarker,
    /// The inner codec identified by the data type.
    pub codec: InnerCodec,
    /// The number of payload bytes that follow the header.
    pub payload_bytes: u32,
}

impl BurstHeader {
    /// Total length, in bytes, of this header plus its payload.
    pub fn burst_len(&self) -> usize {
        self.marker.header_bytes() + self.payload_bytes as usize
    }
}

/// Outcome of attempting to decode a burst header from the start of a buffer.
pub enum HeaderDecode {
    /// `buf` begins with two all-zero header words: there is no header here yet (guard band or
    /// mid-accumulation). The caller should keep accumulating bytes.
    Empty,
    /// A complete, valid burst header was decoded.
    Header(BurstHeader),
}

/// Decode a burst header from the start of `buf`, which must begin at a matched sync marker (or
/// be all-zero, the guard-band case).
///
/// `has_decode_context` distinguishes a "real" decode (the pipeline is about to hand the payload
/// to an inner codec, so an unrecognized data type is a hard `Unsupported` error) from a cheap
/// probe-only call (where an unrecognized type is simply "not a valid header" with no log spam).
pub fn decode_burst_header(
    buf: &[u8],
    carrier: CarrierWidth,
    marker: SyncMarker,
    has_decode_context: bool,
) -> Result<HeaderDecode> {
    if !is_permitted_pair(carrier, marker) {
        return decode_error("s337m: sync marker width inconsistent with carrier width");
    }

    let header_bytes = marker.header_bytes();
    if buf.len() < header_bytes {
        return buffer_too_small_error();
    }

    let (data_type, data_size_bits) = match marker {
        SyncMarker::M16 => {
            if buf[0..4].iter().all(|&b| b == 0) {
                return Ok(HeaderDecode::Empty);
            }
            let data_type = u16::from_le_bytes([buf[4], buf[5]]);
            let data_size = u16::from_le_bytes([buf[6], buf[7]]);
            (data_type as u32, data_size as u32)
        }
        SyncMarker::M20 => {
            if buf[0..6].iter().all(|&b| b == 0) {
                return Ok(HeaderDecode::Empty);
            }
            let type_word = le24(&buf[6..9]);
            let size_word = le24(&buf[9..12]);
            (type_word >> 8, size_word >> 4)
        }
        SyncMarker::M24 => {
            if buf[0..6].iter().all(|&b| b == 0) {
                return Ok(HeaderDecode::Empty);
            }
            let type_word = le24(&buf[6..9]);
            let size_word = le24(&buf[9..12]);
            (type_word >> 8, size_word)
        }
    };

    let word_bits = marker.word_bits();
    let payload_bytes = (word_bits.div_ceil(8) * data_size_bits) / word_bits;

    let codec = match data_type & 0x1F {
        0x1C => InnerCodec::DolbyE,
        other if has_decode_context => {
            log::warn!("s337m: unsupported burst data type 0x{other:02x}");
            return unsupported_error("s337m: unsupported burst data type");
        }
        _ => return decode_error("s337m: unsupported burst data type"),
    };

    Ok(HeaderDecode::Header(BurstHeader { marker, codec, payload_bytes }))
}

/// Decode a burst header from the start of a buffer known to be positioned at a carrier boundary,
/// without first requiring the caller to know which marker matched.
///
/// This is what the decode pipeline (component F) uses: the framing parser guarantees `buf`
/// either starts exactly at a sync marker valid for `carrier`, or is an all-zero guard band. For
/// a 16-bit carrier the marker is always `M16`; for a 24-bit carrier either `M20` or `M24` is
/// tried, mirroring the scanner's own match priority.
pub fn decode_burst_header_for_carrier(
    buf: &[u8],
    carrier: CarrierWidth,
    has_decode_context: bool,
) -> Result<(SyncMarker, HeaderDecode)> {
    let guard_len = match carrier {
        CarrierWidth::Sixteen => 4,
        CarrierWidth::TwentyFour => 6,
    };
    if buf.len() < guard_len {
        return buffer_too_small_error();
    }
    if buf[0..guard_len].iter().all(|&b| b == 0) {
        let marker = match carrier {
            CarrierWidth::Sixteen => SyncMarker::M16,
            CarrierWidth::TwentyFour => SyncMarker::M24,
        };
        return Ok((marker, HeaderDecode::Empty));
    }

    let marker = match identify_marker_at_start(buf, carrier) {
        Some(m) => m,
        None => return decode_error("s337m: no recognized sync marker at burst boundary"),
    };

    decode_burst_header(buf, carrier, marker, has_decode_context).map(|decoded| (marker, decoded))
}

fn le24(buf: &[u8]) -> u32 {
    u32::from(buf[0]) | (u32::from(buf[1]) << 8) | (u32::from(buf[2]) << 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_m16_dolby_e_header() {
        // data_type = 0x1C, data_size = 1792 bits (0x0700).
        let buf = [0x72, 0xF8, 0x1F, 0x4E, 0x1C, 0x00, 0x00, 0x07];
        let decoded =
            decode_burst_header(&buf, CarrierWidth::Sixteen, SyncMarker::M16, true).unwrap();
        match decoded {
            HeaderDecode::Header(h) => {
                assert_eq!(h.codec, InnerCodec::DolbyE);
                assert_eq!(h.payload_bytes, 224);
                assert_eq!(h.burst_len(), 232);
            }
            HeaderDecode::Empty => panic!("expected a header"),
        }
    }

    #[test]
    fn empty_header_is_all_zero() {
        let buf = [0u8; 8];
        let decoded =
            decode_burst_header(&buf, CarrierWidth::Sixteen, SyncMarker::M16, true).unwrap();
        assert!(matches!(decoded, HeaderDecode::Empty));
    }

    #[test]
    fn rejects_mismatched_carrier_and_marker() {
        let buf = [0u8; 12];
        let err = decode_burst_header(&buf, CarrierWidth::Sixteen, SyncMarker::M24, true);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_unsupported_data_type_with_context() {
        let buf = [0x72, 0xF8, 0x1F, 0x4E, 0x01, 0x00, 0x00, 0x07];
        let err = decode_burst_header(&buf, CarrierWidth::Sixteen, SyncMarker::M16, true);
        assert!(err.is_err());
    }

    #[test]
    fn decodes_m24_dolby_e_header() {
        // data_size in bits directly (M24), pick 1792 bits -> payload_bytes = 224.
        let mut buf = vec![0x72, 0xF8, 0x96, 0x1F, 0x4E, 0xA5];
        buf.extend_from_slice(&[0x1C, 0x00, 0x00]); // data_type = 0x1C
        buf.extend_from_slice(&[0x00, 0x07, 0x00]); // data_size = 1792 (LE24)
        let decoded =
            decode_burst_header(&buf, CarrierWidth::TwentyFour, SyncMarker::M24, true).unwrap();
        match decoded {
            HeaderDecode::Header(h) => {
                assert_eq!(h.payload_bytes, 224);
            }
            HeaderDecode::Empty => panic!("expected a header"),
        }
    }

    #[test]
    fn for_carrier_disambiguates_m20_from_m24() {
        let mut buf = vec![0x20, 0x87, 0x6F, 0xF0, 0xE1, 0x54];
        buf.extend_from_slice(&[0x1C, 0x00, 0x00]);
        buf.extend_from_slice(&[0x00, 0x70, 0x00]); // data_size = 0x700 bits = 1792.
        let (marker, decoded) =
            decode_burst_header_for_carrier(&buf, CarrierWidth::TwentyFour, true).unwrap();
        assert_eq!(marker, SyncMarker::M20);
        assert!(matches!(decoded, HeaderDecode::Header(_)));
    }

    #[test]
    fn for_carrier_reports_empty_guard_band() {
        let buf = [0u8; 12];
        let (marker, decoded) =
            decode_burst_header_for_carrier(&buf, CarrierWidth::TwentyFour, true).unwrap();
        assert_eq!(marker, SyncMarker::M24);
        assert!(matches!(decoded, HeaderDecode::Empty));
    }
}
