// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The decode pipeline: turns a stream of carrier packets into decoded audio frames.
//!
//! Each call describes one carrier packet (or, for the final call, an empty packet meaning
//! "flush"). Because the inner codec's frame for a given burst can only be known after that
//! burst has been fully decoded, output lags input by one call: the frame returned by call `N`
//! is the (resampled) decode of the burst submitted in call `N - 1`.

use symphonia_core::audio::sample::SampleFormat;
use symphonia_core::audio::{Channels, Position};
use symphonia_core::errors::{decode_error, input_changed_error, Result};

use crate::header::{decode_burst_header_for_carrier, HeaderDecode};
use crate::inner_codec::{InnerCodec, InnerFrame};
use crate::resample::{Resampler, ResamplerConfig};
use crate::swizzle::{swap16, swap24};
use crate::sync::CarrierWidth;

/// The nominal AES3/carrier sample rate S337M bursts are defined over.
pub const CARRIER_SAMPLE_RATE: u32 = 48_000;

/// One decoded, carrier-rate-aligned frame of output audio.
pub struct DecodedFrame {
    pub channels: Channels,
    pub sample_format: SampleFormat,
    pub sample_rate: u32,
    /// Planar `i32` samples, one `Vec` per channel.
    pub planes: Vec<Vec<i32>>,
}

impl DecodedFrame {
    pub fn nb_samples(&self) -> usize {
        self.planes.first().map_or(0, Vec::len)
    }
}

/// State latched from the inner codec's first successful decode.
struct Latched {
    channels: Channels,
    sample_format: SampleFormat,
    codec_initial_sample_rate: u32,
}

/// The S337M decode pipeline: header parsing, deswizzling, inner codec, and drift-correcting
/// resample, glued together with the one-frame delay the format requires.
pub struct DecodePipeline {
    carrier: CarrierWidth,
    passthrough: bool,
    inner_codec: Box<dyn InnerCodec>,
    /// Carrier bytes accumulated since the last real burst header (i.e. the current guard band).
    aes_start_position: u64,
    /// `aes_samples` of the previous call, used to size this call's output frame.
    prev_aes_samples: usize,
    flushed: bool,
    latched: Option<Latched>,
    resampler: Option<Resampler>,
    next_pts: i64,
}

impl DecodePipeline {
    pub fn new(carrier: CarrierWidth, passthrough: bool, inner_codec: Box<dyn InnerCodec>) -> Self {
        DecodePipeline {
            carrier,
            passthrough,
            inner_codec,
            aes_start_position: 0,
            prev_aes_samples: 0,
            flushed: false,
            latched: None,
            resampler: None,
            next_pts: 0,
        }
    }

    /// Reset all inter-packet state. Does not affect `carrier`/`passthrough`.
    pub fn reset(&mut self) {
        self.inner_codec.reset();
        self.aes_start_position = 0;
        self.prev_aes_samples = 0;
        self.flushed = false;
        self.latched = None;
        self.resampler = None;
        self.next_pts = 0;
    }

    /// Decode one carrier packet. An empty packet requests a flush of any buffered audio.
    ///
    /// Returns `Ok(None)` when the call produced no output yet (guard-band accumulation, the
    /// pipeline's first successful inner decode, which is only latched and buffered, or an empty
    /// packet in pass-through mode, which has nothing buffered to flush in the first place).
    pub fn decode(&mut self, packet: &[u8]) -> Result<Option<DecodedFrame>> {
        if self.flushed || (packet.is_empty() && self.passthrough) {
            return Ok(None);
        }
        if self.passthrough {
            return Ok(Some(self.decode_passthrough(packet)));
        }
        self.decode_normal(packet)
    }

    fn decode_passthrough(&mut self, packet: &[u8]) -> DecodedFrame {
        let channels = Channels::Positioned(Position::FRONT_LEFT | Position::FRONT_RIGHT);

        match self.carrier {
            CarrierWidth::Sixteen => {
                let mut left = Vec::with_capacity(packet.len() / 4);
                let mut right = Vec::with_capacity(packet.len() / 4);
                for frame in packet.chunks_exact(4) {
                    left.push(i32::from(i16::from_le_bytes([frame[0], frame[1]])));
                    right.push(i32::from(i16::from_le_bytes([frame[2], frame[3]])));
                }
                DecodedFrame {
                    channels,
                    sample_format: SampleFormat::S16,
                    sample_rate: CARRIER_SAMPLE_RATE,
                    planes: vec![left, right],
                }
            }
            CarrierWidth::TwentyFour => {
                let mut left = Vec::with_capacity(packet.len() / 6);
                let mut right = Vec::with_capacity(packet.len() / 6);
                for frame in packet.chunks_exact(6) {
                    let s0 = u32::from(frame[0]) | (u32::from(frame[1]) << 8) | (u32::from(frame[2]) << 16);
                    let s1 = u32::from(frame[3]) | (u32::from(frame[4]) << 8) | (u32::from(frame[5]) << 16);
                    // Left-justify the 24-bit sample into a 32-bit word; the shift alone
                    // reproduces two's-complement sign extension through the `as i32` cast.
                    left.push((s0 << 8) as i32);
                    right.push((s1 << 8) as i32);
                }
                DecodedFrame {
                    channels,
                    sample_format: SampleFormat::S32,
                    sample_rate: CARRIER_SAMPLE_RATE,
                    planes: vec![left, right],
                }
            }
        }
    }

    fn decode_normal(&mut self, packet: &[u8]) -> Result<Option<DecodedFrame>> {
        let word_div = (self.carrier.word_bits() / 4) as usize;
        let aes_samples = packet.len() / word_div;

        let prev_aes_samples = self.prev_aes_samples;
        self.prev_aes_samples = aes_samples;

        if packet.is_empty() {
            self.flushed = true;
            return match (self.resampler.as_mut(), self.latched.as_ref()) {
                (Some(resampler), Some(latched)) => {
                    let mut out: Vec<Vec<i32>> =
                        (0..latched.channels.count()).map(|_| Vec::new()).collect();
                    resampler.flush(&mut out, prev_aes_samples);
                    Ok(Some(DecodedFrame {
                        channels: latched.channels.clone(),
                        sample_format: latched.sample_format,
                        sample_rate: CARRIER_SAMPLE_RATE,
                        planes: out,
                    }))
                }
                _ => Ok(None),
            };
        }

        let (marker, decoded) = decode_burst_header_for_carrier(packet, self.carrier, true)?;

        let header = match decoded {
            HeaderDecode::Empty => {
                self.aes_start_position += packet.len() as u64;
                return Ok(None);
            }
            HeaderDecode::Header(header) => header,
        };

        let header_bytes = marker.header_bytes();
        let payload_end = header_bytes + header.payload_bytes as usize;
        if packet.len() < payload_end {
            return decode_error("s337m: burst payload truncated");
        }

        let mut payload = packet[header_bytes..payload_end].to_vec();
        match self.carrier {
            CarrierWidth::Sixteen => swap16(&mut payload),
            CarrierWidth::TwentyFour => swap24(&mut payload),
        }

        let inner_frame = self.inner_codec.decode(&payload)?;

        if self.latched.is_none() {
            self.init_first_frame(inner_frame);
            self.aes_start_position = 0;
            return Ok(None);
        }

        self.aes_start_position = 0;
        self.steady_state(inner_frame, prev_aes_samples).map(Some)
    }

    fn init_first_frame(&mut self, inner_frame: InnerFrame) {
        let divisor = u64::from(self.carrier.word_bits() / 4);

        let mut seed_pts: i64 = 0;
        if self.aes_start_position / divisor >= inner_frame.nb_samples() as u64 {
            seed_pts =
                ((u64::from(inner_frame.sample_rate) * self.aes_start_position) / divisor) as i64;
        }

        let mut resampler =
            Resampler::new(inner_frame.channels.count(), ResamplerConfig::pipeline_default(CARRIER_SAMPLE_RATE));
        resampler.set_next_pts(seed_pts);

        {
            let plane_refs: Vec<&[i32]> = inner_frame.planes.iter().map(Vec::as_slice).collect();
            resampler.push(&plane_refs);
        }

        self.next_pts = seed_pts;
        self.resampler = Some(resampler);
        self.latched = Some(Latched {
            channels: inner_frame.channels,
            sample_format: inner_frame.sample_format,
            codec_initial_sample_rate: inner_frame.sample_rate,
        });
    }

    fn steady_state(&mut self, inner_frame: InnerFrame, prev_aes_samples: usize) -> Result<DecodedFrame> {
        let (channels, sample_format, codec_initial_sample_rate) = {
            let latched = self.latched.as_ref().expect("pipeline is initialized");
            (latched.channels.clone(), latched.sample_format, latched.codec_initial_sample_rate)
        };

        if inner_frame.channels != channels
            || inner_frame.sample_format != sample_format
            || inner_frame.sample_rate != codec_initial_sample_rate
        {
            return input_changed_error("s337m: inner codec output format changed");
        }

        self.next_pts += i64::from(codec_initial_sample_rate) * prev_aes_samples as i64;

        let resampler = self.resampler.as_mut().expect("pipeline is initialized");
        resampler.set_next_pts(self.next_pts);

        {
            let plane_refs: Vec<&[i32]> = inner_frame.planes.iter().map(Vec::as_slice).collect();
            resampler.push(&plane_refs);
        }

        let mut out: Vec<Vec<i32>> = (0..channels.count()).map(|_| Vec::new()).collect();
        let written = resampler.convert(&mut out, prev_aes_samples);
        debug_assert_eq!(written, prev_aes_samples);

        Ok(DecodedFrame { channels, sample_format, sample_rate: CARRIER_SAMPLE_RATE, planes: out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inner_codec::PcmInnerCodec;

    fn m16_burst(payload_native: &[(i16, i16)]) -> Vec<u8> {
        // The pipeline byte-swaps the payload before decoding, so pre-swap each 16-bit sample
        // here such that the inner codec observes `payload_native` untouched.
        let mut payload = Vec::with_capacity(payload_native.len() * 4);
        for &(l, r) in payload_native {
            let lb = l.to_le_bytes();
            let rb = r.to_le_bytes();
            payload.extend_from_slice(&[lb[1], lb[0], rb[1], rb[0]]);
        }

        let data_size_bits = (payload.len() * 8) as u16;
        let mut buf = vec![0x72, 0xF8, 0x1F, 0x4E, 0x1C, 0x00];
        buf.extend_from_slice(&data_size_bits.to_le_bytes());
        buf.extend_from_slice(&payload);
        buf
    }

    fn guard_band(len: usize) -> Vec<u8> {
        vec![0u8; len]
    }

    #[test]
    fn passthrough_16_bit_copies_bytes_verbatim() {
        let mut pipeline =
            DecodePipeline::new(CarrierWidth::Sixteen, true, Box::new(PcmInnerCodec));
        let packet = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00];
        let frame = pipeline.decode(&packet).unwrap().unwrap();
        assert_eq!(frame.sample_format, SampleFormat::S16);
        assert_eq!(frame.planes[0], vec![1, 3]);
        assert_eq!(frame.planes[1], vec![2, 4]);
    }

    #[test]
    fn passthrough_empty_packet_emits_no_frame() {
        let mut pipeline =
            DecodePipeline::new(CarrierWidth::Sixteen, true, Box::new(PcmInnerCodec));
        assert!(pipeline.decode(&[]).unwrap().is_none());
        // Repeated flush calls must not start emitting empty frames either.
        assert!(pipeline.decode(&[]).unwrap().is_none());
    }

    #[test]
    fn passthrough_24_bit_repacks_to_s32() {
        let mut pipeline =
            DecodePipeline::new(CarrierWidth::TwentyFour, true, Box::new(PcmInnerCodec));
        // left = 0x000001, right = 0x000002 (LE 24-bit).
        let packet = [0x01, 0x00, 0x00, 0x02, 0x00, 0x00];
        let frame = pipeline.decode(&packet).unwrap().unwrap();
        assert_eq!(frame.sample_format, SampleFormat::S32);
        assert_eq!(frame.planes[0], vec![0x100]);
        assert_eq!(frame.planes[1], vec![0x200]);
    }

    #[test]
    fn accumulates_guard_band_without_emitting() {
        let mut pipeline =
            DecodePipeline::new(CarrierWidth::Sixteen, false, Box::new(PcmInnerCodec));
        let out = pipeline.decode(&guard_band(8)).unwrap();
        assert!(out.is_none());
        assert_eq!(pipeline.aes_start_position, 8);
    }

    #[test]
    fn first_real_header_latches_without_emitting() {
        let mut pipeline =
            DecodePipeline::new(CarrierWidth::Sixteen, false, Box::new(PcmInnerCodec));
        let burst = m16_burst(&[(1, 2), (3, 4)]);
        let out = pipeline.decode(&burst).unwrap();
        assert!(out.is_none());
        assert!(pipeline.latched.is_some());
    }

    #[test]
    fn steady_state_emits_frame_sized_to_previous_call() {
        let mut pipeline =
            DecodePipeline::new(CarrierWidth::Sixteen, false, Box::new(PcmInnerCodec));
        let burst1 = m16_burst(&[(1, 2), (3, 4)]);
        let prev_aes_samples = burst1.len() / 4;
        pipeline.decode(&burst1).unwrap();

        let burst2 = m16_burst(&[(5, 6), (7, 8)]);
        let frame = pipeline.decode(&burst2).unwrap().unwrap();
        assert_eq!(frame.nb_samples(), prev_aes_samples);
        assert_eq!(frame.channels.count(), 2);
    }

    #[test]
    fn flush_emits_final_buffered_frame() {
        let mut pipeline =
            DecodePipeline::new(CarrierWidth::Sixteen, false, Box::new(PcmInnerCodec));
        let burst = m16_burst(&[(1, 2), (3, 4)]);
        let prev_aes_samples = burst.len() / 4;
        pipeline.decode(&burst).unwrap();

        let frame = pipeline.decode(&[]).unwrap().unwrap();
        assert_eq!(frame.nb_samples(), prev_aes_samples);
        assert!(pipeline.flushed);
    }

    #[test]
    fn input_changed_when_inner_sample_rate_shifts() {
        use symphonia_core::audio::Position;
        use symphonia_core::errors::Error;

        struct DriftingRateCodec {
            calls: u32,
        }

        impl InnerCodec for DriftingRateCodec {
            fn decode(&mut self, payload: &[u8]) -> Result<InnerFrame> {
                self.calls += 1;
                let rate = if self.calls == 1 { 48_000 } else { 44_100 };
                let nb_samples = payload.len() / 4;
                Ok(InnerFrame {
                    channels: Channels::Positioned(Position::FRONT_LEFT | Position::FRONT_RIGHT),
                    sample_format: SampleFormat::S16,
                    sample_rate: rate,
                    planes: vec![vec![0i32; nb_samples], vec![0i32; nb_samples]],
                })
            }
        }

        let mut pipeline = DecodePipeline::new(
            CarrierWidth::Sixteen,
            false,
            Box::new(DriftingRateCodec { calls: 0 }),
        );
        pipeline.decode(&m16_burst(&[(1, 2), (3, 4)])).unwrap();
        let err = pipeline.decode(&m16_burst(&[(5, 6), (7, 8)]));
        assert!(matches!(err, Err(Error::InputChanged(_))));
    }
}
