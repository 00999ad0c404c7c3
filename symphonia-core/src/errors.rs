// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use alloc::boxed::Box;
use core::fmt;
use core::fmt::Display;
use core::result;

#[cfg(not(feature = "std"))]
use core::error::Error as StdError;

use core::ops::Deref;
#[cfg(feature = "std")]
use std::error::Error as StdError;

/// `SeekErrorKind` is a list of generic reasons why a seek may fail.
#[derive(Debug)]
pub enum SeekErrorKind {
    /// The stream is not seekable at all.
    Unseekable,
    /// The stream can only be seeked forward.
    ForwardOnly,
    /// The timestamp to seek to is out of range.
    OutOfRange,
    /// The track ID provided is invalid.
    InvalidTrack,
}

impl SeekErrorKind {
    fn as_str(&self) -> &'static str {
        match *self {
            SeekErrorKind::Unseekable => "stream is not seekable",
            SeekErrorKind::ForwardOnly => "stream can only be seeked forward",
            SeekErrorKind::OutOfRange => "requested seek timestamp is out-of-range for stream",
            SeekErrorKind::InvalidTrack => "invalid track id",
        }
    }
}

/// `Error` provides an enumeration of all possible errors reported by Symphonia.
#[derive(Debug)]
pub enum Error {
    /// An IO error occurred while reading, writing, or seeking the stream.
    IoError(Box<dyn StdError>),
    /// An IO error occurred while reading, writing, or seeking the stream that is retryable.
    IoInterruptedError(Box<dyn StdError>),
    /// The stream contained malformed data and could not be decoded or demuxed.
    DecodeError(&'static str),
    /// The stream could not be seeked.
    SeekError(SeekErrorKind),
    /// An unsupported container or codec feature was encounted.
    Unsupported(&'static str),
    /// A default or user-defined limit was reached while decoding or demuxing the stream. Limits
    /// are used to prevent denial-of-service attacks from malicious streams.
    LimitError(&'static str),
    /// The demuxer or decoder needs to be reset before continuing.
    ResetRequired,
    EndOfFile,
    Other(&'static str),
    /// The characteristics of the underlying stream changed (e.g. sample rate, channel count)
    /// in a way the caller must react to before decoding can continue.
    InputChanged(&'static str),
    /// A caller-supplied buffer was too small to hold the result of an operation.
    BufferTooSmall,
    /// An internal invariant was violated. Indicates a bug rather than a malformed stream.
    InternalBug(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::IoError(ref err) => {
                write!(f, "io error {:?}", err)
            }
            Error::IoInterruptedError(ref err) => {
                write!(f, "io error {:?}", err)
            }
            Error::DecodeError(msg) => {
                write!(f, "malformed stream: {}", msg)
            }
            Error::SeekError(ref kind) => {
                write!(f, "seek error: {}", kind.as_str())
            }
            Error::Unsupported(feature) => {
                write!(f, "unsupported feature: {}", feature)
            }
            Error::LimitError(constraint) => {
                write!(f, "limit reached: {}", constraint)
            }
            Error::ResetRequired => {
                write!(f, "decoder needs to be reset")
            }
            Error::EndOfFile => {
                write!(f, "unexpected end of file")
            }
            Error::Other(msg) => {
                write!(f, "other error: {}", msg)
            }
            Error::InputChanged(what) => {
                write!(f, "input changed: {}", what)
            }
            Error::BufferTooSmall => {
                write!(f, "supplied buffer is too small")
            }
            Error::InternalBug(what) => {
                write!(f, "internal bug: {}", what)
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::IoError(ref err) => Some(err.deref()),
            Error::IoInterruptedError(ref err) => Some(err.deref()),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        match err.kind() {
            std::io::ErrorKind::Interrupted => Error::IoInterruptedError(Box::new(err)),
            std::io::ErrorKind::UnexpectedEof => Error::EndOfFile,
            _ => Error::IoError(Box::new(err)),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a decode error.
pub fn decode_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::DecodeError(desc))
}

/// Convenience function to create a seek error.
pub fn seek_error<T>(kind: SeekErrorKind) -> Result<T> {
    Err(Error::SeekError(kind))
}

/// Convenience function to create an unsupport feature error.
pub fn unsupported_error<T>(feature: &'static str) -> Result<T> {
    Err(Error::Unsupported(feature))
}

/// Convenience function to create a limit error.
pub fn limit_error<T>(constraint: &'static str) -> Result<T> {
    Err(Error::LimitError(constraint))
}

/// Convenience function to create a reset required error.
pub fn reset_error<T>() -> Result<T> {
    Err(Error::ResetRequired)
}

/// Convenience function to create an end-of-stream error.
pub fn end_of_stream_error<T>() -> Result<T> {
    Err(Error::EndOfFile)
}

/// Convenience function to create an input-changed error.
pub fn input_changed_error<T>(what: &'static str) -> Result<T> {
    Err(Error::InputChanged(what))
}

/// Convenience function to create a buffer-too-small error.
pub fn buffer_too_small_error<T>() -> Result<T> {
    Err(Error::BufferTooSmall)
}

/// Convenience function to create an internal bug error.
pub fn internal_bug_error<T>(what: &'static str) -> Result<T> {
    Err(Error::InternalBug(what))
}
