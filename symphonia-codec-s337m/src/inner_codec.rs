// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The inner codec contract that an S337M burst payload is handed to.
//!
//! The real inner codec (Dolby E, in practice) is out of scope for this crate: it is modeled as
//! an internal trait object so the decode pipeline (component F) can be built and tested without
//! it. [`PcmInnerCodec`] is a minimal built-in implementation used to exercise the pipeline: it
//! treats the payload as if it were already PCM, which is enough to drive every pipeline
//! invariant (latching, one-frame delay, resampling, `InputChanged`) without a real Dolby E
//! bitstream.

use symphonia_core::audio::{Channels, Position};
use symphonia_core::audio::sample::SampleFormat;
use symphonia_core::errors::Result;

/// One decoded frame of inner-codec output: planar `i32` samples, plus the format the inner
/// codec reported for this frame.
pub struct InnerFrame {
    pub channels: Channels,
    pub sample_format: SampleFormat,
    pub sample_rate: u32,
    /// Planar samples, one `Vec` per channel, each `nb_samples` long.
    pub planes: Vec<Vec<i32>>,
}

impl InnerFrame {
    pub fn nb_samples(&self) -> usize {
        self.planes.first().map_or(0, Vec::len)
    }
}

/// The push/pull contract a real inner codec (e.g. Dolby E) must satisfy.
pub trait InnerCodec: Send {
    /// Decode one burst payload (already deswizzled into native byte order) into a frame.
    fn decode(&mut self, payload: &[u8]) -> Result<InnerFrame>;

    /// Reset any inter-frame state. Bursts are otherwise independent (each burst is one full
    /// inner codec frame), so most implementations can leave this empty.
    fn reset(&mut self) {}
}

/// The fixed sample rate the built-in test inner codec reports.
pub const PCM_INNER_CODEC_SAMPLE_RATE: u32 = 48_000;

/// A minimal inner codec that treats its payload as already being interleaved 16-bit stereo PCM.
///
/// This is not a real Dolby E decoder; it exists purely so the decode pipeline has something to
/// drive in tests without depending on a real inner codec implementation.
#[derive(Default)]
pub struct PcmInnerCodec;

impl InnerCodec for PcmInnerCodec {
    fn decode(&mut self, payload: &[u8]) -> Result<InnerFrame> {
        let nb_samples = payload.len() / 4;

        let mut left = Vec::with_capacity(nb_samples);
        let mut right = Vec::with_capacity(nb_samples);

        for frame in payload.chunks_exact(4) {
            left.push(i32::from(i16::from_le_bytes([frame[0], frame[1]])));
            right.push(i32::from(i16::from_le_bytes([frame[2], frame[3]])));
        }

        Ok(InnerFrame {
            channels: Channels::Positioned(Position::FRONT_LEFT | Position::FRONT_RIGHT),
            sample_format: SampleFormat::S16,
            sample_rate: PCM_INNER_CODEC_SAMPLE_RATE,
            planes: vec![left, right],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_inner_codec_decodes_interleaved_stereo() {
        let payload = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00];
        let mut codec = PcmInnerCodec;
        let frame = codec.decode(&payload).unwrap();

        assert_eq!(frame.nb_samples(), 2);
        assert_eq!(frame.planes[0], vec![1, 3]);
        assert_eq!(frame.planes[1], vec![2, 4]);
        assert_eq!(frame.sample_rate, PCM_INNER_CODEC_SAMPLE_RATE);
    }
}
