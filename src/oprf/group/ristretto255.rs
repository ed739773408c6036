// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Group implementation for ristretto255.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use elliptic_curve::hash2curve::{ExpandMsg, ExpandMsgXmd, Expander};
use generic_array::typenum::U32;
use generic_array::GenericArray;
use rand::{CryptoRng, RngCore};
use subtle::{Choice, ConstantTimeEq};

use crate::hash::Hash;
use crate::oprf::{Error, Result};

use super::Group;

/// Marker for the ristretto255 group, doubling as its
/// [cipher suite](crate::oprf::CipherSuite).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Ristretto255;

impl Group for Ristretto255 {
    type Elem = RistrettoPoint;

    type ElemLen = U32;

    type Scalar = Scalar;

    type ScalarLen = U32;

    // Implements `hash_to_ristretto255` from RFC 9380 with a 64 byte
    // expansion.
    fn hash_to_curve<H: Hash>(input: &[&[u8]], dst: &[&[u8]]) -> Result<Self::Elem> {
        let mut uniform_bytes = [0; 64];
        ExpandMsgXmd::<H>::expand_message(input, dst, 64)
            .map_err(|_| Error::Input)?
            .fill_bytes(&mut uniform_bytes);

        Ok(RistrettoPoint::from_uniform_bytes(&uniform_bytes))
    }

    fn hash_to_scalar<H: Hash>(input: &[&[u8]], dst: &[&[u8]]) -> Result<Self::Scalar> {
        let mut uniform_bytes = [0; 64];
        ExpandMsgXmd::<H>::expand_message(input, dst, 64)
            .map_err(|_| Error::Input)?
            .fill_bytes(&mut uniform_bytes);

        Ok(Scalar::from_bytes_mod_order_wide(&uniform_bytes))
    }

    fn base_elem() -> Self::Elem {
        RISTRETTO_BASEPOINT_POINT
    }

    fn identity_elem() -> Self::Elem {
        RistrettoPoint::identity()
    }

    fn serialize_elem(elem: Self::Elem) -> GenericArray<u8, Self::ElemLen> {
        elem.compress().to_bytes().into()
    }

    fn deserialize_elem(element_bits: &[u8]) -> Result<Self::Elem> {
        CompressedRistretto::from_slice(element_bits)
            .map_err(|_| Error::Deserialization)
            .and_then(|compressed| compressed.decompress().ok_or(Error::Deserialization))
            .and_then(|point| {
                if point.ct_eq(&RistrettoPoint::identity()).into() {
                    Err(Error::Deserialization)
                } else {
                    Ok(point)
                }
            })
    }

    #[cfg(not(test))]
    fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Self::Scalar {
        loop {
            let mut scalar_bytes = [0; 64];
            rng.fill_bytes(&mut scalar_bytes);
            let scalar = Scalar::from_bytes_mod_order_wide(&scalar_bytes);

            if scalar != Scalar::ZERO {
                break scalar;
            }
        }
    }

    // Test vectors drive the rng with pre-committed scalars, which must be
    // consumed whole and in canonical form.
    #[cfg(test)]
    fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Self::Scalar {
        loop {
            let mut scalar_bytes = [0; 32];
            rng.fill_bytes(&mut scalar_bytes);

            if let Some(scalar) = Option::<Scalar>::from(Scalar::from_canonical_bytes(scalar_bytes))
            {
                if scalar != Scalar::ZERO {
                    break scalar;
                }
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
        scalar_bits
            .try_into()
            .ok()
            .and_then(|bytes| Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes)))
            .filter(|scalar| scalar != &Scalar::ZERO)
            .ok_or(Error::Deserialization)
    }
}
