// Symphonia
// Copyright (c) 2019 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod audio;
pub mod checksum;
pub mod codecs;
pub mod common;
pub mod errors;
pub mod formats;
pub mod io;
pub mod meta;
pub mod packet;
pub mod subtitle;
pub mod units;
pub mod util;
pub mod video;