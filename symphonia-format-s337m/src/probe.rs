// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Probe scoring (component E): decide whether a stream looks like S337M by requiring a couple
//! of genuine Dolby E bursts to turn up, not just a single lucky marker match.

use symphonia_core::formats::probe::Score;
use symphonia_core::io::{FiniteStream, ReadBytes};
use symphonia_core::io::{MediaSourceStream, ScopedStream};
use symphonia_core::errors::Result;

use symphonia_codec_s337m::sync::CarrierWidth;

use crate::parser::{FramingParser, ParseOutcome};

/// The number of complete bursts the probe must observe before it is willing to claim the
/// stream as S337M.
const PROBE_MIN_FRAMES: u64 = 2;
/// The nominal AES3 carrier sample rate S337M is defined over.
const AES_DEFAULT_RATE: u64 = 48_000;
/// The slowest Dolby E frame rate in common use; bounds how much of the stream the probe needs
/// to see to have a realistic chance of observing `PROBE_MIN_FRAMES` bursts.
const MAX_FRAME_RATE: u64 = 30;

/// A content-verified S337M match is scored one above a bare extension-only guess would be.
const CONTENT_VERIFIED_SCORE: u8 = 2;

fn min_probe_carrier_samples() -> u64 {
    (PROBE_MIN_FRAMES * AES_DEFAULT_RATE) / MAX_FRAME_RATE
}

/// Score a stream for S337M-ness on a specific carrier width.
///
/// Requires enough bytes to plausibly contain `PROBE_MIN_FRAMES` bursts, then repeatedly scans
/// for sync markers and decodes their headers, counting how many genuine bursts turn up.
pub fn score_stream(
    mut src: ScopedStream<&mut MediaSourceStream<'_>>,
    carrier: CarrierWidth,
) -> Result<Score> {
    let min_bytes = min_probe_carrier_samples() * carrier.word_bytes() as u64;

    if src.byte_len() < min_bytes {
        return Ok(Score::Unsupported);
    }

    // Give the scan a generous budget beyond the bare minimum so a single large guard band ahead
    // of the first burst does not itself cause a false negative.
    let budget = min_bytes.saturating_mul(4);

    let mut parser = FramingParser::new(carrier);
    let mut found = 0u64;
    let mut chunk = [0u8; 1024];
    let mut consumed = 0u64;

    while consumed < budget {
        let n = src.read_buf(&mut chunk)?;
        if n == 0 {
            break;
        }
        consumed += n as u64;

        match parser.push(&chunk[..n]) {
            Ok(outcome) => {
                if matches!(outcome, ParseOutcome::Burst { .. }) {
                    found += 1;
                    if found >= PROBE_MIN_FRAMES {
                        return Ok(Score::Supported(CONTENT_VERIFIED_SCORE));
                    }
                }
            }
            Err(_) => return Ok(Score::Unsupported),
        }

        // A single push only ever reports the first burst it finds; drain any further ones the
        // same chunk buffered before reading more.
        loop {
            match parser.poll() {
                Ok(ParseOutcome::Burst { .. }) => {
                    found += 1;
                    if found >= PROBE_MIN_FRAMES {
                        return Ok(Score::Supported(CONTENT_VERIFIED_SCORE));
                    }
                }
                Ok(_) => break,
                Err(_) => return Ok(Score::Unsupported),
            }
        }
    }

    Ok(Score::Unsupported)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use symphonia_core::io::{MediaSourceStream, MediaSourceStreamOptions, ReadOnlySource};

    use super::*;

    fn dolby_e_burst_16() -> Vec<u8> {
        let mut burst = vec![0x72, 0xF8, 0x1F, 0x4E, 0x1C, 0x00, 0x00, 0x07];
        burst.extend(std::iter::repeat(0xAA).take(224));
        burst
    }

    fn scoped<'a, 's>(
        bytes: &[u8],
        mss: &'a mut MediaSourceStream<'s>,
    ) -> ScopedStream<&'a mut MediaSourceStream<'s>> {
        ScopedStream::new(mss, bytes.len() as u64)
    }

    #[test]
    fn one_burst_scores_unsupported() {
        let mut bytes = vec![0u8; 6400];
        bytes.extend(dolby_e_burst_16());
        // Pad out to comfortably exceed the minimum probe window so only burst count matters.
        bytes.extend(vec![0u8; 6400]);

        let source = ReadOnlySource::new(Cursor::new(bytes.clone()));
        let mut mss = MediaSourceStream::new(Box::new(source), MediaSourceStreamOptions::default());
        let scoped = scoped(&bytes, &mut mss);

        let score = score_stream(scoped, CarrierWidth::Sixteen).unwrap();
        assert!(matches!(score, Score::Unsupported));
    }

    #[test]
    fn two_bursts_score_supported() {
        let mut bytes = vec![0u8; 6400];
        let burst = dolby_e_burst_16();
        bytes.extend(burst.clone());
        bytes.extend(burst);

        let source = ReadOnlySource::new(Cursor::new(bytes.clone()));
        let mut mss = MediaSourceStream::new(Box::new(source), MediaSourceStreamOptions::default());
        let scoped = scoped(&bytes, &mut mss);

        let score = score_stream(scoped, CarrierWidth::Sixteen).unwrap();
        assert!(matches!(score, Score::Supported(_)));
    }

    #[test]
    fn too_little_data_scores_unsupported() {
        let bytes = dolby_e_burst_16();

        let source = ReadOnlySource::new(Cursor::new(bytes.clone()));
        let mut mss = MediaSourceStream::new(Box::new(source), MediaSourceStreamOptions::default());
        let scoped = scoped(&bytes, &mut mss);

        let score = score_stream(scoped, CarrierWidth::Sixteen).unwrap();
        assert!(matches!(score, Score::Unsupported));
    }
}
