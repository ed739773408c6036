// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

use digest::Update;
use generic_array::{ArrayLength, GenericArray};
use hmac::Mac;

use crate::errors::ProtocolError;

// Corresponds to the I2OSP() function from RFC8017
pub(crate) fn i2osp<L: ArrayLength<u8>>(
    input: usize,
) -> Result<GenericArray<u8, L>, ProtocolError> {
    const USIZE_BYTES: usize = core::mem::size_of::<usize>();

    let encoded = input.to_be_bytes();

    // Every byte that doesn't fit into the output must be zero.
    if encoded[..USIZE_BYTES.saturating_sub(L::USIZE)]
        .iter()
        .any(|&byte| byte != 0)
    {
        return Err(ProtocolError::SerializationError);
    }

    let mut output = GenericArray::default();
    output[L::USIZE.saturating_sub(USIZE_BYTES)..]
        .copy_from_slice(&encoded[USIZE_BYTES.saturating_sub(L::USIZE)..]);
    Ok(output)
}

// Corresponds to the OS2IP() function from RFC8017
#[cfg(test)]
pub(crate) fn os2ip(input: &[u8]) -> Result<usize, ProtocolError> {
    if input.len() > core::mem::size_of::<usize>() {
        return Err(ProtocolError::SerializationError);
    }

    let mut output = [0_u8; core::mem::size_of::<usize>()];
    output[core::mem::size_of::<usize>() - input.len()..].copy_from_slice(input);
    Ok(usize::from_be_bytes(output))
}

pub(crate) trait UpdateExt {
    fn chain_iter<'a>(self, iter: impl Iterator<Item = &'a [u8]>) -> Self;
}

impl<T: Update> UpdateExt for T {
    fn chain_iter<'a>(self, iter: impl Iterator<Item = &'a [u8]>) -> Self {
        let mut state = self;

        for bytes in iter {
            state = state.chain(bytes);
        }

        state
    }
}

pub(crate) trait MacExt {
    fn update_iter<'a>(&mut self, iter: impl Iterator<Item = &'a [u8]>);
}

impl<T: Mac> MacExt for T {
    fn update_iter<'a>(&mut self, iter: impl Iterator<Item = &'a [u8]>) {
        for bytes in iter {
            self.update(bytes);
        }
    }
}

/// Splits a fixed-size array off the front of a slice, advancing the slice
/// past it.
pub(crate) trait SliceExt {
    fn take_array<L: ArrayLength<u8>>(
        self: &mut &Self,
        name: &'static str,
    ) -> Result<GenericArray<u8, L>, ProtocolError>;
}

impl SliceExt for [u8] {
    fn take_array<L: ArrayLength<u8>>(
        self: &mut &Self,
        name: &'static str,
    ) -> Result<GenericArray<u8, L>, ProtocolError> {
        if L::USIZE > self.len() {
            return Err(ProtocolError::SizeError {
                name,
                len: L::USIZE,
                actual_len: self.len(),
            });
        }

        let (front, back) = self.split_at(L::USIZE);
        *self = back;
        Ok(GenericArray::clone_from_slice(front))
    }
}

#[cfg(test)]
pub(crate) trait AssertZeroized {
    fn assert_zeroized(&self);
}

#[cfg(test)]
mod unit_tests {
    use generic_array::typenum::{U1, U2};

    use super::*;

    #[test]
    fn i2osp_bounds() {
        assert!(i2osp::<U1>(0).is_ok());

        assert!(i2osp::<U1>(255).is_ok());
        assert!(i2osp::<U1>(256).is_err());
        assert!(i2osp::<U1>(257).is_err());

        assert!(i2osp::<U2>(256 * 256 - 1).is_ok());
        assert!(i2osp::<U2>(256 * 256).is_err());
        assert!(i2osp::<U2>(256 * 256 + 1).is_err());
    }

    #[test]
    fn i2osp_os2ip_round_trip() {
        for value in [0, 1, 255, 256, 65535] {
            let serialized = i2osp::<U2>(value).unwrap();
            assert_eq!(os2ip(&serialized).unwrap(), value);
        }
    }

    #[test]
    fn take_array_advances() {
        let mut bytes: &[u8] = &[1, 2, 3, 4, 5];

        let front = bytes.take_array::<U2>("front").unwrap();
        assert_eq!(front.as_slice(), &[1, 2]);
        assert_eq!(bytes, &[3, 4, 5]);

        assert!(bytes.take_array::<U2>("middle").is_ok());
        assert!(matches!(
            bytes.take_array::<U2>("back"),
            Err(ProtocolError::SizeError { .. })
        ));
    }
}
