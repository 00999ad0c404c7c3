// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The public `AudioDecoder` surface: one variant per carrier width.

use symphonia_core::audio::{
    AsGenericAudioBufferRef, Audio, AudioBuffer, AudioMut, AudioSpec, Channels,
    GenericAudioBufferRef, Position,
};
use symphonia_core::codecs::audio::{
    AudioCodecId, AudioCodecParameters, AudioDecoder, AudioDecoderOptions, FinalizeResult,
};
use symphonia_core::codecs::registry::{RegisterableAudioDecoder, SupportedAudioCodec};
use symphonia_core::codecs::CodecInfo;
use symphonia_core::common::FourCc;
use symphonia_core::errors::{decode_error, unsupported_error, Result};
use symphonia_core::formats::Packet;
use symphonia_core::support_audio_codec;

use crate::inner_codec::PcmInnerCodec;
use crate::pipeline::{DecodePipeline, CARRIER_SAMPLE_RATE};
use crate::sync::CarrierWidth;

/// Codec ID for S337M carried over a 16-bit PCM carrier.
pub const CODEC_ID_S337M_16: AudioCodecId = AudioCodecId::new(FourCc::new(*b"sm16"));
/// Codec ID for S337M carried over a 24-bit PCM carrier.
pub const CODEC_ID_S337M_24: AudioCodecId = AudioCodecId::new(FourCc::new(*b"sm24"));

fn carrier_for_codec(codec: AudioCodecId) -> Result<CarrierWidth> {
    if codec == CODEC_ID_S337M_16 {
        Ok(CarrierWidth::Sixteen)
    }
    else if codec == CODEC_ID_S337M_24 {
        Ok(CarrierWidth::TwentyFour)
    }
    else {
        unsupported_error("s337m: invalid codec")
    }
}

/// SMPTE ST 337 (S337M) non-PCM-in-PCM decoder.
pub struct S337mDecoder {
    params: AudioCodecParameters,
    pipeline: DecodePipeline,
    buf: AudioBuffer<i32>,
}

impl S337mDecoder {
    pub fn try_new(params: &AudioCodecParameters, opts: &AudioDecoderOptions) -> Result<Self> {
        let carrier = carrier_for_codec(params.codec)?;

        let frames = match params.max_frames_per_packet {
            Some(frames) => frames as usize,
            None => return unsupported_error("s337m: maximum frames per packet is required"),
        };

        let channels = params
            .channels
            .clone()
            .unwrap_or(Channels::Positioned(Position::FRONT_LEFT | Position::FRONT_RIGHT));

        let spec = AudioSpec::new(CARRIER_SAMPLE_RATE, channels);

        Ok(S337mDecoder {
            params: params.clone(),
            pipeline: DecodePipeline::new(carrier, opts.passthrough, Box::new(PcmInnerCodec)),
            buf: AudioBuffer::new(spec, frames),
        })
    }

    fn decode_inner(&mut self, packet: &Packet) -> Result<()> {
        let decoded = self.pipeline.decode(packet.buf())?;

        self.buf.clear();

        let Some(frame) = decoded
        else {
            self.buf.render_uninit(Some(0));
            return Ok(());
        };

        if frame.channels.count() != self.buf.spec().channels().count() {
            return decode_error("s337m: inner codec channel count does not match declared output");
        }

        let nb_samples = frame.nb_samples();
        self.buf.render_uninit(Some(nb_samples));

        for (idx, plane_src) in frame.planes.iter().enumerate() {
            let plane_dst = self.buf.plane_mut(idx).expect("plane index in range");
            plane_dst.copy_from_slice(plane_src);
        }

        Ok(())
    }
}

impl AudioDecoder for S337mDecoder {
    fn reset(&mut self) {
        self.pipeline.reset();
    }

    fn codec_info(&self) -> &CodecInfo {
        &Self::supported_codecs().iter().find(|desc| desc.id == self.params.codec).unwrap().info
    }

    fn codec_params(&self) -> &AudioCodecParameters {
        &self.params
    }

    fn decode(&mut self, packet: &Packet) -> Result<GenericAudioBufferRef<'_>> {
        if let Err(e) = self.decode_inner(packet) {
            self.buf.clear();
            Err(e)
        }
        else {
            Ok(self.buf.as_generic_audio_buffer_ref())
        }
    }

    fn finalize(&mut self) -> FinalizeResult {
        Default::default()
    }

    fn last_decoded(&self) -> GenericAudioBufferRef<'_> {
        self.buf.as_generic_audio_buffer_ref()
    }
}

impl RegisterableAudioDecoder for S337mDecoder {
    fn try_registry_new(
        params: &AudioCodecParameters,
        opts: &AudioDecoderOptions,
    ) -> Result<Box<dyn AudioDecoder>>
    where
        Self: Sized,
    {
        Ok(Box::new(S337mDecoder::try_new(params, opts)?))
    }

    fn supported_codecs() -> &'static [SupportedAudioCodec] {
        &[
            support_audio_codec!(CODEC_ID_S337M_16, "s337m_16", "SMPTE ST 337 (16-bit carrier)"),
            support_audio_codec!(CODEC_ID_S337M_24, "s337m_24", "SMPTE ST 337 (24-bit carrier)"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(codec: AudioCodecId) -> AudioCodecParameters {
        let mut params = AudioCodecParameters::new();
        params
            .for_codec(codec)
            .with_sample_rate(CARRIER_SAMPLE_RATE)
            .with_channels(Channels::Positioned(Position::FRONT_LEFT | Position::FRONT_RIGHT))
            .with_max_frames_per_packet(8192);
        params
    }

    #[test]
    fn try_new_rejects_unknown_codec() {
        let bogus = AudioCodecId::new(FourCc::new(*b"bogo"));
        let err = S337mDecoder::try_new(&params(bogus), &AudioDecoderOptions::default());
        assert!(err.is_err());
    }

    #[test]
    fn passthrough_decode_emits_stereo_frame() {
        let opts = AudioDecoderOptions { passthrough: true, ..Default::default() };
        let mut decoder = S337mDecoder::try_new(&params(CODEC_ID_S337M_16), &opts).unwrap();

        let packet = Packet::new(
            0,
            symphonia_core::units::Timestamp::new(0),
            symphonia_core::units::Duration::from(2u64),
            vec![0x01, 0x00, 0x02, 0x00].into_boxed_slice(),
        );

        let decoded = decoder.decode(&packet).unwrap();
        assert_eq!(decoded.frames(), 2);
    }

    #[test]
    fn first_guard_band_packet_decodes_to_empty_buffer() {
        let mut decoder =
            S337mDecoder::try_new(&params(CODEC_ID_S337M_16), &AudioDecoderOptions::default())
                .unwrap();

        let packet = Packet::new(
            0,
            symphonia_core::units::Timestamp::new(0),
            symphonia_core::units::Duration::from(2u64),
            vec![0u8; 8].into_boxed_slice(),
        );

        let decoded = decoder.decode(&packet).unwrap();
        assert_eq!(decoded.frames(), 0);
    }
}
