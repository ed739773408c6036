// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Group implementation for the NIST curves, generic over their common
//! arithmetic backend.

use elliptic_curve::group::cofactor::CofactorGroup;
use elliptic_curve::group::Group as _;
use elliptic_curve::hash2curve::{ExpandMsgXmd, FromOkm, GroupDigest};
use elliptic_curve::sec1::{CompressedPointSize, FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{
    AffinePoint, Field, FieldBytes, FieldBytesSize, NonZeroScalar, PrimeField, ProjectivePoint,
    PublicKey, Scalar,
};
use generic_array::typenum::Unsigned;
use generic_array::GenericArray;
use rand::{CryptoRng, RngCore};
use subtle::Choice;

use crate::hash::Hash;
use crate::oprf::{Error, Result};

use super::Group;

impl<C> Group for C
where
    C: GroupDigest,
    FieldBytesSize<C>: ModulusSize,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    ProjectivePoint<C>: CofactorGroup + ToEncodedPoint<C>,
    Scalar<C>: FromOkm,
{
    type Elem = ProjectivePoint<Self>;

    type ElemLen = CompressedPointSize<Self>;

    type Scalar = Scalar<Self>;

    type ScalarLen = FieldBytesSize<Self>;

    fn hash_to_curve<H: Hash>(input: &[&[u8]], dst: &[&[u8]]) -> Result<Self::Elem> {
        Self::hash_from_bytes::<ExpandMsgXmd<H>>(input, dst).map_err(|_| Error::Input)
    }

    fn hash_to_scalar<H: Hash>(input: &[&[u8]], dst: &[&[u8]]) -> Result<Self::Scalar> {
        <Self as GroupDigest>::hash_to_scalar::<ExpandMsgXmd<H>>(input, dst)
            .map_err(|_| Error::Input)
    }

    fn base_elem() -> Self::Elem {
        ProjectivePoint::<Self>::generator()
    }

    fn identity_elem() -> Self::Elem {
        ProjectivePoint::<Self>::identity()
    }

    fn serialize_elem(elem: Self::Elem) -> GenericArray<u8, Self::ElemLen> {
        // The identity encodes to a single byte; the protocol never produces
        // it here, but serialization must stay total.
        let mut bytes = GenericArray::default();
        let encoded = elem.to_encoded_point(true);
        bytes[..encoded.as_bytes().len()].copy_from_slice(encoded.as_bytes());
        bytes
    }

    fn deserialize_elem(element_bits: &[u8]) -> Result<Self::Elem> {
        if element_bits.len() != Self::ElemLen::USIZE {
            return Err(Error::Deserialization);
        }

        // `PublicKey` parses SEC1 encodings and rejects the identity.
        PublicKey::<Self>::from_sec1_bytes(element_bits)
            .map(|public_key| public_key.to_projective())
            .map_err(|_| Error::Deserialization)
    }

    #[cfg(not(test))]
    fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Self::Scalar {
        *NonZeroScalar::<Self>::random(rng)
    }

    // Test vectors drive the rng with pre-committed scalars, which must be
    // consumed whole and in canonical form.
    #[cfg(test)]
    fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Self::Scalar {
        loop {
            let mut scalar_bytes = FieldBytes::<Self>::default();
            rng.fill_bytes(&mut scalar_bytes);

            if let Some(scalar) =
                Option::<Scalar<Self>>::from(Scalar::<Self>::from_repr(scalar_bytes))
            {
                if !bool::from(scalar.is_zero()) {
                    break scalar;
                }
            }
        }
    }

    fn invert_scalar(scalar: Self::Scalar) -> Self::Scalar {
        Option::<Scalar<Self>>::from(scalar.invert()).unwrap_or(Scalar::<Self>::ZERO)
    }

    fn zero_scalar() -> Self::Scalar {
        Scalar::<Self>::ZERO
    }

    fn is_zero_scalar(scalar: Self::Scalar) -> Choice {
        scalar.is_zero()
    }

    fn serialize_scalar(scalar: Self::Scalar) -> GenericArray<u8, Self::ScalarLen> {
        scalar.to_repr()
    }

    fn deserialize_scalar(scalar_bits: &[u8]) -> Result<Self::Scalar> {
        if scalar_bits.len() != Self::ScalarLen::USIZE {
            return Err(Error::Deserialization);
        }

        let mut bytes = FieldBytes::<Self>::default();
        bytes.copy_from_slice(scalar_bits);
        Option::<Scalar<Self>>::from(Scalar::<Self>::from_repr(bytes))
            .filter(|scalar| !bool::from(scalar.is_zero()))
            .ok_or(Error::Deserialization)
    }
}
