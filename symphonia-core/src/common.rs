// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `common` module defines common enums, structs, types, etc.

use std::fmt;

/// A four-character-code (FourCC): a 4-byte ASCII identifier used throughout multimedia container
/// and codec specifications (e.g. RIFF chunk IDs, ISO-BMFF box types).
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// Create a new `FourCc` from 4 bytes.
    pub const fn new(cc: [u8; 4]) -> FourCc {
        FourCc(cc)
    }

    /// Get the underlying 4 bytes.
    pub const fn get(self) -> [u8; 4] {
        self.0
    }
}

impl From<[u8; 4]> for FourCc {
    fn from(cc: [u8; 4]) -> Self {
        FourCc(cc)
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({})", self)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            }
            else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

/// Describes the relative preference of a registered decoder, format reader, or metadata reader if
/// multiple registered implementations support the same codec or format.
#[derive(Copy, Clone)]
pub enum Tier {
    /// Prefer over others.
    Preferred,
    /// Standard tier: neither preferred nor a fallback. Symphonia's first-party decoders and
    /// readers are registered at this level.
    Standard,
    /// Use as a fallback if nothing else is available.
    Fallback,
}
