// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The public `FormatReader` surface (component G's demuxer half): one reader variant per
//! carrier width.

use std::io::{Seek, SeekFrom};

use symphonia_core::audio::{Channels, Position};
use symphonia_core::codecs::audio::AudioCodecParameters;
use symphonia_core::codecs::CodecParameters;
use symphonia_core::common::FourCc;
use symphonia_core::errors::{seek_error, Error, Result, SeekErrorKind};
use symphonia_core::formats::prelude::*;
use symphonia_core::formats::probe::{ProbeFormatData, ProbeableFormat, Score, Scoreable};
use symphonia_core::io::{MediaSourceStream, ScopedStream};
use symphonia_core::meta::{Metadata, MetadataLog};
use symphonia_core::support_format;

use symphonia_codec_s337m::decoder::{CODEC_ID_S337M_16, CODEC_ID_S337M_24};
use symphonia_codec_s337m::pipeline::CARRIER_SAMPLE_RATE;
use symphonia_codec_s337m::sync::CarrierWidth;

use crate::parser::{FramingParser, ParseOutcome};
use crate::probe;

/// Format ID for S337M carried over a 16-bit PCM carrier.
pub const FORMAT_ID_S337M_16: FormatId = FormatId::new(FourCc::new(*b"sm16"));
/// Format ID for S337M carried over a 24-bit PCM carrier.
pub const FORMAT_ID_S337M_24: FormatId = FormatId::new(FourCc::new(*b"sm24"));

const FORMAT_INFO_16: FormatInfo = FormatInfo {
    format: FORMAT_ID_S337M_16,
    short_name: "s337m_16",
    long_name: "SMPTE ST 337 (16-bit PCM carrier)",
};

const FORMAT_INFO_24: FormatInfo = FormatInfo {
    format: FORMAT_ID_S337M_24,
    short_name: "s337m_24",
    long_name: "SMPTE ST 337 (24-bit PCM carrier)",
};

/// The largest number of carrier samples a single burst's decoded output is expected to span.
/// The inner pipeline uses this to size its output buffer up front.
const MAX_FRAMES_PER_PACKET: u64 = 8192;

/// The number of bytes read from the underlying stream at a time while hunting for the next
/// burst.
const READ_CHUNK: usize = 4096;

struct S337mReader<'s> {
    reader: MediaSourceStream<'s>,
    carrier: CarrierWidth,
    parser: FramingParser,
    tracks: Vec<Track>,
    metadata: MetadataLog,
    next_pts: Timestamp,
    eof: bool,
}

impl<'s> S337mReader<'s> {
    fn try_new(mss: MediaSourceStream<'s>, _opts: FormatOptions, carrier: CarrierWidth) -> Result<Self> {
        let codec = match carrier {
            CarrierWidth::Sixteen => CODEC_ID_S337M_16,
            CarrierWidth::TwentyFour => CODEC_ID_S337M_24,
        };

        let mut audio_params = AudioCodecParameters::new();
        audio_params
            .for_codec(codec)
            .with_sample_rate(CARRIER_SAMPLE_RATE)
            .with_channels(Channels::Positioned(Position::FRONT_LEFT | Position::FRONT_RIGHT))
            .with_max_frames_per_packet(MAX_FRAMES_PER_PACKET);

        let mut track = Track::new(0);
        track.with_codec_params(CodecParameters::Audio(audio_params));

        Ok(S337mReader {
            reader: mss,
            carrier,
            parser: FramingParser::new(carrier),
            tracks: vec![track],
            metadata: MetadataLog::default(),
            next_pts: Timestamp::ZERO,
            eof: false,
        })
    }

    fn next_packet_impl(&mut self) -> Result<Option<Packet>> {
        if self.eof {
            return Ok(None);
        }

        // A single `push` only ever surfaces the first burst it finds; a multi-kilobyte read
        // routinely buffers several. Drain whatever the previous read already turned up before
        // asking the stream for more, or the surplus would sit in the parser forever.
        if let ParseOutcome::Burst { data, duration_samples } = self.parser.poll()? {
            return Ok(Some(self.emit_packet(data, duration_samples)));
        }

        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let n = self.reader.read_buf(&mut chunk)?;

            let outcome = if n == 0 {
                self.eof = true;
                self.parser.push(&[])?
            }
            else {
                self.parser.push(&chunk[..n])?
            };

            match outcome {
                ParseOutcome::Pending => {
                    if self.eof {
                        return Ok(None);
                    }
                }
                ParseOutcome::Burst { data, duration_samples } => {
                    return Ok(Some(self.emit_packet(data, duration_samples)));
                }
                ParseOutcome::Flush { duration_samples } => {
                    self.next_pts = self.next_pts.saturating_add(Duration::from(duration_samples));
                    return Ok(None);
                }
            }
        }
    }

    fn emit_packet(&mut self, data: Vec<u8>, duration_samples: u64) -> Packet {
        let pts = self.next_pts;
        let dur = Duration::from(duration_samples);
        self.next_pts = pts.saturating_add(dur);
        Packet::new(0, pts, dur, data)
    }

    fn into_inner_impl<'t>(self) -> MediaSourceStream<'t>
    where
        's: 't,
    {
        self.reader
    }
}

macro_rules! impl_reader {
    ($name:ident, $carrier:expr, $format_info:expr, $exts:expr, $markers:expr) => {
        #[doc = concat!("SMPTE ST 337 (S337M) demuxer for a ", stringify!($carrier), " carrier.")]
        pub struct $name<'s> {
            inner: S337mReader<'s>,
        }

        impl<'s> $name<'s> {
            pub fn try_new(mss: MediaSourceStream<'s>, opts: FormatOptions) -> Result<Self> {
                Ok($name { inner: S337mReader::try_new(mss, opts, $carrier)? })
            }
        }

        impl Scoreable for $name<'_> {
            fn score(src: ScopedStream<&mut MediaSourceStream<'_>>) -> Result<Score> {
                probe::score_stream(src, $carrier)
            }
        }

        impl<'s> ProbeableFormat<'s> for $name<'s> {
            fn try_probe_new(
                mss: MediaSourceStream<'s>,
                opts: FormatOptions,
            ) -> Result<Box<dyn FormatReader + 's>> {
                Ok(Box::new($name::try_new(mss, opts)?))
            }

            fn probe_data() -> &'static [ProbeFormatData] {
                &[support_format!($format_info, $exts, &["audio/vnd.dolby.dd-raw"], $markers)]
            }
        }

        impl FormatReader for $name<'_> {
            fn format_info(&self) -> &FormatInfo {
                &$format_info
            }

            fn next_packet(&mut self) -> Result<Option<Packet>> {
                self.inner.next_packet_impl()
            }

            fn metadata(&mut self) -> Metadata<'_> {
                self.inner.metadata.metadata()
            }

            fn tracks(&self) -> &[Track] {
                &self.inner.tracks
            }

            fn seek(&mut self, _mode: SeekMode, to: SeekTo) -> Result<SeekedTo> {
                let required_ts = match to {
                    SeekTo::TimeStamp { ts, .. } => ts,
                    SeekTo::Time { time, .. } => {
                        let tb = self.inner.tracks[0]
                            .time_base
                            .ok_or(Error::SeekError(SeekErrorKind::Unseekable))?;
                        tb.calc_timestamp(time).ok_or(Error::SeekError(SeekErrorKind::OutOfRange))?
                    }
                };

                if required_ts != Timestamp::ZERO {
                    return seek_error(SeekErrorKind::Unseekable);
                }

                if !self.inner.reader.is_seekable() {
                    return seek_error(SeekErrorKind::Unseekable);
                }

                self.inner.reader.seek(SeekFrom::Start(0))?;
                self.inner.parser = FramingParser::new($carrier);
                self.inner.next_pts = Timestamp::ZERO;
                self.inner.eof = false;

                Ok(SeekedTo { track_id: 0, actual_ts: Timestamp::ZERO, required_ts })
            }

            fn into_inner<'s>(self: Box<Self>) -> MediaSourceStream<'s>
            where
                Self: 's,
            {
                self.inner.into_inner_impl()
            }
        }
    };
}

impl_reader!(
    S337m16Reader,
    CarrierWidth::Sixteen,
    FORMAT_INFO_16,
    &["s337m"],
    &[&[0x72, 0xF8, 0x1F, 0x4E]]
);

impl_reader!(
    S337m24Reader,
    CarrierWidth::TwentyFour,
    FORMAT_INFO_24,
    &["s337m"],
    &[&[0x72, 0xF8, 0x96, 0x1F, 0x4E, 0xA5], &[0x20, 0x87, 0x6F, 0xF0, 0xE1, 0x54]]
);

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use symphonia_core::io::{MediaSourceStreamOptions, ReadOnlySource};

    use super::*;

    fn dolby_e_burst_16() -> Vec<u8> {
        let mut burst = vec![0x72, 0xF8, 0x1F, 0x4E, 0x1C, 0x00, 0x00, 0x07];
        burst.extend(std::iter::repeat(0xAA).take(224));
        burst
    }

    fn stream(bytes: Vec<u8>) -> MediaSourceStream<'static> {
        let source = ReadOnlySource::new(Cursor::new(bytes));
        MediaSourceStream::new(Box::new(source), MediaSourceStreamOptions::default())
    }

    #[test]
    fn reads_one_burst_packet_after_guard_band() {
        let mut bytes = vec![0u8; 6400];
        bytes.extend(dolby_e_burst_16());

        let mut reader = S337m16Reader::try_new(stream(bytes), FormatOptions::default()).unwrap();

        let packet = reader.next_packet().unwrap().expect("one packet expected");
        assert_eq!(packet.buf().len(), 232);
        assert_eq!(packet.dur().get(), 116);

        assert!(reader.next_packet().unwrap().is_none());
    }

    #[test]
    fn drains_every_burst_from_a_single_read_chunk() {
        // 20 back-to-back 232-byte bursts (4640 bytes) span more than one `READ_CHUNK`-sized
        // read; none of them should be lost to an un-drained `carry` at EOF.
        let mut bytes = Vec::new();
        for _ in 0..20 {
            bytes.extend(dolby_e_burst_16());
        }

        let mut reader = S337m16Reader::try_new(stream(bytes), FormatOptions::default()).unwrap();

        let mut packets = 0;
        while let Some(packet) = reader.next_packet().unwrap() {
            assert_eq!(packet.buf().len(), 232);
            packets += 1;
        }

        assert_eq!(packets, 20);
    }

    #[test]
    fn tracks_describe_the_carrier_codec() {
        let reader = S337m16Reader::try_new(stream(vec![0u8; 16]), FormatOptions::default()).unwrap();
        let track = &reader.tracks()[0];
        let params = track.codec_params.as_ref().unwrap().audio().unwrap();
        assert_eq!(params.codec, CODEC_ID_S337M_16);
        assert_eq!(params.sample_rate, Some(CARRIER_SAMPLE_RATE));
    }

    #[test]
    fn twenty_four_bit_reader_finds_unaligned_marker() {
        let mut bytes = vec![0u8; 24];
        bytes[7..13].copy_from_slice(&[0x72, 0xF8, 0x96, 0x1F, 0x4E, 0xA5]);
        bytes.extend_from_slice(&[0x1C, 0x00, 0x00, 0x00, 0x07, 0x00]);
        bytes.extend(std::iter::repeat(0u8).take(224));

        let mut reader = S337m24Reader::try_new(stream(bytes), FormatOptions::default()).unwrap();
        let packet = reader.next_packet().unwrap().expect("one packet expected");
        assert_eq!(&packet.buf()[0..6], &[0x72, 0xF8, 0x96, 0x1F, 0x4E, 0xA5]);
    }
}
