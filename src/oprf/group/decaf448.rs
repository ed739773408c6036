// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Group implementation for decaf448.

use ed448_goldilocks::{CompressedDecaf, DecafPoint, Scalar, WideScalarBytes};
use elliptic_curve::hash2curve::{ExpandMsg, ExpandMsgXof, Expander};
use generic_array::typenum::U56;
use generic_array::GenericArray;
use rand::{CryptoRng, RngCore};
use sha3::Shake256;
use subtle::{Choice, ConstantTimeEq};

use crate::hash::Hash;
use crate::oprf::{Error, Result};

use super::Group;

/// Marker for the decaf448 group, doubling as its
/// [cipher suite](crate::oprf::CipherSuite).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Decaf448;

impl Group for Decaf448 {
    type Elem = DecafPoint;

    type ElemLen = U56;

    type Scalar = Scalar;

    type ScalarLen = U56;

    // Implements `hash_to_decaf448` from RFC 9380 with a 112 byte expansion.
    fn hash_to_curve<H: Hash>(input: &[&[u8]], dst: &[&[u8]]) -> Result<Self::Elem> {
        let mut uniform_bytes = [0; 112];
        ExpandMsgXof::<Shake256>::expand_message(input, dst, 112)
            .map_err(|_| Error::Input)?
            .fill_bytes(&mut uniform_bytes);

        Ok(DecafPoint::from_uniform_bytes(&uniform_bytes))
    }

    fn hash_to_scalar<H: Hash>(input: &[&[u8]], dst: &[&[u8]]) -> Result<Self::Scalar> {
        let mut uniform_bytes = [0; 64];
        ExpandMsgXof::<Shake256>::expand_message(input, dst, 64)
            .map_err(|_| Error::Input)?
            .fill_bytes(&mut uniform_bytes);

        let mut scalar_bytes = WideScalarBytes::default();
        scalar_bytes[..64].copy_from_slice(&uniform_bytes);

        Ok(Scalar::from_bytes_mod_order_wide(&scalar_bytes))
    }

    fn base_elem() -> Self::Elem {
        DecafPoint::GENERATOR
    }

    fn identity_elem() -> Self::Elem {
        DecafPoint::IDENTITY
    }

    fn serialize_elem(elem: Self::Elem) -> GenericArray<u8, Self::ElemLen> {
        elem.compress().0.into()
    }

    fn deserialize_elem(element_bits: &[u8]) -> Result<Self::Elem> {
        let bytes: [u8; 56] = element_bits
            .try_into()
            .map_err(|_| Error::Deserialization)?;
        Option::<DecafPoint>::from(CompressedDecaf(bytes).decompress())
            .filter(|point| !bool::from(point.ct_eq(&DecafPoint::IDENTITY)))
            .ok_or(Error::Deserialization)
    }

    #[cfg(not(test))]
    fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Self::Scalar {
        loop {
            let mut scalar_bytes = [0; 64];
            rng.fill_bytes(&mut scalar_bytes);

            let mut wide_bytes = WideScalarBytes::default();
            wide_bytes[..64].copy_from_slice(&scalar_bytes);
            let scalar = Scalar::from_bytes_mod_order_wide(&wide_bytes);

            if !bool::from(scalar.ct_eq(&Scalar::ZERO)) {
                break scalar;
            }
        }
    }

    // Test vectors drive the rng with pre-committed scalars, which must be
    // consumed whole and in canonical form.
    #[cfg(test)]
    fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Self::Scalar {
        loop {
            let mut scalar_bytes = [0; 56];
            rng.fill_bytes(&mut scalar_bytes);

            if let Ok(scalar) = Self::deserialize_scalar(&scalar_bytes) {
                break scalar;
            }
        }
    }

    fn invert_scalar(scalar: Self::Scalar) -> Self::Scalar {
        scalar.invert()
    }

    fn zero_scalar() -> Self::Scalar {
        Scalar::ZERO
    }

    fn is_zero_scalar(scalar: Self::Scalar) -> Choice {
        scalar.ct_eq(&Scalar::ZERO)
    }

    fn serialize_scalar(scalar: Self::Scalar) -> GenericArray<u8, Self::ScalarLen> {
        scalar.to_bytes().into()
    }

    fn deserialize_scalar(scalar_bits: &[u8]) -> Result<Self::Scalar> {
        let bytes: [u8; 56] = scalar_bits.try_into().map_err(|_| Error::Deserialization)?;

        let mut wide_bytes = WideScalarBytes::default();
        wide_bytes[..56].copy_from_slice(&bytes);
        let scalar = Scalar::from_bytes_mod_order_wide(&wide_bytes);

        // Canonical encodings survive the round-trip, out-of-range ones
        // reduce to something else.
        if scalar.to_bytes() != bytes || bool::from(scalar.ct_eq(&Scalar::ZERO)) {
            return Err(Error::Deserialization);
        }

        Ok(scalar)
    }
}
