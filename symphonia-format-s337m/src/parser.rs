// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The push-style framing parser (component D): turns an arbitrary stream of raw PCM carrier
//! bytes into whole S337M bursts, each tagged with the carrier-sample duration it spans.

use symphonia_core::errors::Result;

use symphonia_codec_s337m::header::{decode_burst_header, HeaderDecode};
use symphonia_codec_s337m::sync::{CarrierWidth, ScanState, SyncMarker};

/// The outcome of pushing one chunk of bytes into a [`FramingParser`].
pub enum ParseOutcome {
    /// No complete burst yet; more input is needed.
    Pending,
    /// A complete burst (header plus payload) was assembled, and the number of carrier samples
    /// it spans.
    Burst {
        /// The burst's raw bytes, starting at its sync marker.
        data: Vec<u8>,
        /// The number of carrier samples the burst's bytes span.
        duration_samples: u64,
    },
    /// End of stream was reached with a trailing gap (no further burst) since the last reported
    /// duration. Carries that gap's duration so a caller that wants exact duration accounting
    /// across the whole stream can still account for it.
    Flush {
        /// The number of carrier samples the trailing gap spans.
        duration_samples: u64,
    },
}

/// A burst currently being assembled: bytes accumulate here from its sync marker onward until
/// its header can be decoded and its full length is known.
struct Assembling {
    marker: SyncMarker,
    buf: Vec<u8>,
    needed: Option<usize>,
}

/// Accumulates raw PCM carrier bytes, delivered in arbitrary-sized chunks, into whole S337M
/// bursts.
///
/// A `FramingParser` owns its own [`ScanState`], so it can be fed chunks of any size, in any
/// split, and will find sync markers that straddle chunk boundaries. Guard-band bytes (anything
/// before the first sync marker in the stream) are consumed silently; non-zero bytes found there
/// are logged once and otherwise have no effect on the bursts reported.
pub struct FramingParser {
    carrier: CarrierWidth,
    scanner: ScanState,
    total_scanned: u64,
    inited: bool,
    aes_initial_offset: Option<u64>,
    warned_corrupted_guardband: bool,
    assembling: Option<Assembling>,
    /// Bytes left over after a burst completed mid-chunk; fed back through the scanner ahead of
    /// the next external push.
    carry: Vec<u8>,
    /// Bytes scanned since the last burst completed (or, before the very first sync is found,
    /// always zero) without yet turning up the next sync marker. Folded into the next burst's
    /// reported duration, or into a trailing `Flush` if the stream ends before another burst
    /// completes, so every byte fed to the parser is accounted for in some reported duration
    /// except the one-time startup guard band (see the module's guard-band handling).
    trailing_gap_bytes: u64,
}

impl FramingParser {
    /// Create a new parser for the given carrier width.
    pub fn new(carrier: CarrierWidth) -> Self {
        FramingParser {
            carrier,
            scanner: ScanState::new(),
            total_scanned: 0,
            inited: false,
            aes_initial_offset: None,
            warned_corrupted_guardband: false,
            assembling: None,
            carry: Vec::new(),
            trailing_gap_bytes: 0,
        }
    }

    /// The byte offset, measured from the start of the stream, of the first sync marker this
    /// parser has found. `None` until a sync has been found at least once.
    pub fn initial_offset(&self) -> Option<u64> {
        self.aes_initial_offset
    }

    /// Push the next chunk of raw carrier bytes. An empty slice signals end of stream.
    ///
    /// Yields at most one burst per call, even if `buf` (combined with whatever was left over
    /// from a previous call) contains several back-to-back bursts: a push call never re-scans
    /// what it has already buffered beyond the first complete burst. Callers must follow a
    /// `Burst` result by calling [`poll`](Self::poll) in a loop until it returns `Pending` before
    /// reading and pushing any further bytes, or the surplus bursts sit in `carry` forever and
    /// are never surfaced.
    pub fn push(&mut self, buf: &[u8]) -> Result<ParseOutcome> {
        if buf.is_empty() {
            return self.finish_eof();
        }

        let mut combined;
        let input: &[u8] = if self.carry.is_empty() {
            buf
        }
        else {
            combined = std::mem::take(&mut self.carry);
            combined.extend_from_slice(buf);
            &combined
        };

        match self.assembling.take() {
            Some(mut state) => {
                state.buf.extend_from_slice(input);
                self.try_finish_burst(state)
            }
            None => self.scan_and_start(input),
        }
    }

    /// Try to extract another complete burst from bytes already buffered by a previous `push`,
    /// without reading or requiring any new input.
    ///
    /// A single `push` can hand back bytes spanning several bursts, but only ever reports the
    /// first one; the rest sit in `carry`. Call `poll` in a loop after every `push` (and before
    /// reading more bytes from the underlying stream) until it returns `Pending`, to drain all of
    /// them. `poll` never reports end of stream; use `push(&[])` for that once `poll` has nothing
    /// left to give.
    pub fn poll(&mut self) -> Result<ParseOutcome> {
        match self.assembling.take() {
            Some(state) => self.try_finish_burst(state),
            None => {
                if self.carry.is_empty() {
                    return Ok(ParseOutcome::Pending);
                }
                let input = std::mem::take(&mut self.carry);
                self.scan_and_start(&input)
            }
        }
    }

    /// Bypass sync scanning entirely: treat the whole of `buf` as one already-framed burst. For
    /// use with a container that has already delineated burst boundaries itself.
    pub fn push_complete_frame(&mut self, buf: &[u8]) -> Result<ParseOutcome> {
        if buf.is_empty() {
            return Ok(ParseOutcome::Pending);
        }
        let duration = self.bytes_to_samples(buf.len() as u64);
        Ok(ParseOutcome::Burst { data: buf.to_vec(), duration_samples: duration })
    }

    fn scan_and_start(&mut self, input: &[u8]) -> Result<ParseOutcome> {
        let base = self.total_scanned;

        match self.scanner.scan(input, self.carrier) {
            None => {
                if !self.inited {
                    self.check_guard_band(input);
                }
                else {
                    // A gap between the previous burst and whatever comes next; fold it into
                    // that next burst's duration once it's found (or into the final `Flush` if
                    // the stream ends first).
                    self.trailing_gap_bytes += input.len() as u64;
                }
                self.total_scanned += input.len() as u64;
                Ok(ParseOutcome::Pending)
            }
            Some((abs, marker)) => {
                let local = (abs - base) as usize;
                let sync_len = marker.sync_bytes();

                if !self.inited {
                    self.check_guard_band(&input[..local]);
                    self.inited = true;
                    self.aes_initial_offset = Some(abs);
                    log::debug!("s337m: acquired sync at byte offset {abs}");
                }
                else {
                    self.trailing_gap_bytes += local as u64;
                }

                self.total_scanned += (local + sync_len) as u64;

                let mut acc = Vec::with_capacity(input.len() - local);
                acc.extend_from_slice(&input[local..]);

                self.try_finish_burst(Assembling { marker, buf: acc, needed: None })
            }
        }
    }

    fn try_finish_burst(&mut self, mut state: Assembling) -> Result<ParseOutcome> {
        let header_bytes = state.marker.header_bytes();
        if state.buf.len() < header_bytes {
            self.assembling = Some(state);
            return Ok(ParseOutcome::Pending);
        }

        let total_needed = match state.needed {
            Some(n) => n,
            None => match decode_burst_header(&state.buf, self.carrier, state.marker, false)? {
                HeaderDecode::Header(h) => {
                    let n = h.burst_len();
                    state.needed = Some(n);
                    n
                }
                HeaderDecode::Empty => {
                    // A marker matched but the words that follow are all-zero. This should not
                    // happen for a genuine burst; resume the search rather than getting stuck.
                    return Ok(ParseOutcome::Pending);
                }
            },
        };

        if state.buf.len() < total_needed {
            self.assembling = Some(state);
            return Ok(ParseOutcome::Pending);
        }

        let mut data = state.buf;
        let leftover = data.split_off(total_needed);
        let gap = self.trailing_gap_bytes;
        self.trailing_gap_bytes = 0;
        let duration = self.bytes_to_samples(gap + data.len() as u64);

        self.carry = leftover;

        Ok(ParseOutcome::Burst { data, duration_samples: duration })
    }

    fn finish_eof(&mut self) -> Result<ParseOutcome> {
        // A burst that never completed before the stream ended is truncated; there is nothing
        // sound to decode from it, but its bytes still count towards the stream's total duration,
        // same as any other unattributed gap.
        let assembling_bytes = self.assembling.take().map_or(0, |state| state.buf.len() as u64);

        let gap = self.trailing_gap_bytes + self.carry.len() as u64 + assembling_bytes;
        self.trailing_gap_bytes = 0;
        self.carry.clear();

        if gap == 0 {
            return Ok(ParseOutcome::Pending);
        }

        Ok(ParseOutcome::Flush { duration_samples: self.bytes_to_samples(gap) })
    }

    fn check_guard_band(&mut self, bytes: &[u8]) {
        if !self.warned_corrupted_guardband && bytes.iter().any(|&b| b != 0) {
            log::warn!("s337m: non-null bytes found in guard band before first sync");
            self.warned_corrupted_guardband = true;
        }
    }

    fn bytes_to_samples(&self, bytes: u64) -> u64 {
        bytes / self.carrier.word_bytes() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dolby_e_burst_16() -> Vec<u8> {
        // Sync + data_type 0x1C + data_size 1792 bits, followed by 224 bytes of payload.
        let mut burst = vec![0x72, 0xF8, 0x1F, 0x4E, 0x1C, 0x00, 0x00, 0x07];
        burst.extend(std::iter::repeat(0xAA).take(224));
        burst
    }

    #[test]
    fn emits_one_burst_after_guard_band() {
        let mut parser = FramingParser::new(CarrierWidth::Sixteen);

        let guard = vec![0u8; 6400];
        match parser.push(&guard).unwrap() {
            ParseOutcome::Pending => {}
            _ => panic!("expected no output while scanning the guard band"),
        }

        let burst = dolby_e_burst_16();
        match parser.push(&burst).unwrap() {
            ParseOutcome::Burst { data, duration_samples } => {
                assert_eq!(data.len(), 232);
                assert_eq!(duration_samples, 116);
            }
            _ => panic!("expected a complete burst"),
        }
    }

    #[test]
    fn splits_burst_across_many_small_pushes() {
        let mut parser = FramingParser::new(CarrierWidth::Sixteen);
        let burst = dolby_e_burst_16();

        let mut last = None;
        for chunk in burst.chunks(3) {
            match parser.push(chunk).unwrap() {
                ParseOutcome::Pending => {}
                ParseOutcome::Burst { data, duration_samples } => {
                    last = Some((data, duration_samples));
                }
                ParseOutcome::Flush { .. } => panic!("unexpected flush"),
            }
        }

        let (data, duration_samples) = last.expect("burst should have completed");
        assert_eq!(data, burst);
        assert_eq!(duration_samples, 116);
    }

    #[test]
    fn logs_once_on_corrupted_guard_band_but_still_finds_sync() {
        let mut parser = FramingParser::new(CarrierWidth::Sixteen);

        let mut guard = vec![0u8; 6400];
        guard[100] = 0x01;

        assert!(matches!(parser.push(&guard).unwrap(), ParseOutcome::Pending));
        assert!(parser.warned_corrupted_guardband);

        let burst = dolby_e_burst_16();
        match parser.push(&burst).unwrap() {
            ParseOutcome::Burst { data, .. } => assert_eq!(data.len(), 232),
            _ => panic!("expected a complete burst"),
        }
    }

    #[test]
    fn finds_marker_unaligned_on_24_bit_carrier() {
        let mut parser = FramingParser::new(CarrierWidth::TwentyFour);

        let mut buf = vec![0u8; 24];
        buf[7..13].copy_from_slice(&[0x72, 0xF8, 0x96, 0x1F, 0x4E, 0xA5]);
        buf.extend_from_slice(&[0x1C, 0x00, 0x00, 0x00, 0x07, 0x00]);
        buf.extend(std::iter::repeat(0u8).take(224));

        match parser.push(&buf).unwrap() {
            ParseOutcome::Burst { data, .. } => assert_eq!(data[0..6], [0x72, 0xF8, 0x96, 0x1F, 0x4E, 0xA5]),
            _ => panic!("expected a complete burst"),
        }
    }

    #[test]
    fn eof_with_no_pending_bytes_is_a_no_op() {
        let mut parser = FramingParser::new(CarrierWidth::Sixteen);
        assert!(matches!(parser.push(&[]).unwrap(), ParseOutcome::Pending));
    }

    #[test]
    fn eof_flushes_a_trailing_gap() {
        let mut parser = FramingParser::new(CarrierWidth::Sixteen);
        let burst = dolby_e_burst_16();

        assert!(matches!(parser.push(&burst).unwrap(), ParseOutcome::Burst { .. }));
        assert!(matches!(parser.push(&[0u8; 8]).unwrap(), ParseOutcome::Pending));

        match parser.push(&[]).unwrap() {
            ParseOutcome::Flush { duration_samples } => assert_eq!(duration_samples, 4),
            _ => panic!("expected a flush"),
        }
    }

    #[test]
    fn interburst_gap_is_folded_into_next_burst_duration() {
        let mut parser = FramingParser::new(CarrierWidth::Sixteen);
        let burst = dolby_e_burst_16();

        assert!(matches!(parser.push(&burst).unwrap(), ParseOutcome::Burst { .. }));

        let mut gap_then_burst = vec![0u8; 8];
        gap_then_burst.extend(dolby_e_burst_16());

        match parser.push(&gap_then_burst).unwrap() {
            ParseOutcome::Burst { data, duration_samples } => {
                assert_eq!(data.len(), 232);
                // The 8-byte gap (4 samples) is charged to this burst, unlike the very first
                // burst's leading guard band, which is never reported anywhere.
                assert_eq!(duration_samples, 116 + 4);
            }
            _ => panic!("expected a complete burst"),
        }
    }

    #[test]
    fn eof_during_incomplete_burst_still_reports_its_bytes() {
        let mut parser = FramingParser::new(CarrierWidth::Sixteen);
        // A sync marker and header claiming a payload that never arrives.
        let truncated = vec![0x72, 0xF8, 0x1F, 0x4E, 0x1C, 0x00, 0x00, 0x07, 0xAA, 0xAA];

        assert!(matches!(parser.push(&truncated).unwrap(), ParseOutcome::Pending));

        match parser.push(&[]).unwrap() {
            ParseOutcome::Flush { duration_samples } => {
                assert_eq!(duration_samples, truncated.len() as u64 / 2);
            }
            _ => panic!("expected a flush"),
        }
    }

    #[test]
    fn complete_frame_bypass_skips_scanning() {
        let mut parser = FramingParser::new(CarrierWidth::Sixteen);
        let burst = dolby_e_burst_16();
        match parser.push_complete_frame(&burst).unwrap() {
            ParseOutcome::Burst { data, duration_samples } => {
                assert_eq!(data, burst);
                assert_eq!(duration_samples, 116);
            }
            _ => panic!("expected a burst"),
        }
    }

    #[test]
    fn poll_drains_a_second_burst_buffered_by_one_push() {
        let mut parser = FramingParser::new(CarrierWidth::Sixteen);

        let mut two_bursts = dolby_e_burst_16();
        two_bursts.extend(dolby_e_burst_16());

        match parser.push(&two_bursts).unwrap() {
            ParseOutcome::Burst { data, .. } => assert_eq!(data.len(), 232),
            _ => panic!("expected the first burst"),
        }

        match parser.poll().unwrap() {
            ParseOutcome::Burst { data, duration_samples } => {
                assert_eq!(data.len(), 232);
                assert_eq!(duration_samples, 116);
            }
            _ => panic!("expected the second burst drained from the same push"),
        }

        assert!(matches!(parser.poll().unwrap(), ParseOutcome::Pending));
    }
}
