// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Utility for testing: a deterministic RNG that replays a fixed byte
//! sequence

use alloc::vec::Vec;
use core::cmp::min;

use rand::{CryptoRng, Error, RngCore};

/// An RNG that hands out the contained bytes in order, cycling back to the
/// front when it runs out. Seeding it with the exact concatenation of the
/// draws a protocol step performs pins that step completely.
pub struct CycleRng {
    v: Vec<u8>,
}

impl CycleRng {
    /// Initialize with the byte sequence to cycle through
    pub fn new(v: Vec<u8>) -> Self {
        CycleRng { v }
    }
}

fn rotate_left<T>(data: &mut [T], steps: usize) {
    if !data.is_empty() {
        data.rotate_left(steps % data.len());
    }
}

impl RngCore for CycleRng {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0; 4];
        self.fill_bytes(&mut bytes);
        u32::from_be_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0; 8];
        self.fill_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let len = min(self.v.len(), dest.len());
        dest[..len].copy_from_slice(&self.v[..len]);
        rotate_left(&mut self.v, len);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for CycleRng {}
