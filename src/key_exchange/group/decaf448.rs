// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Key exchange group implementation for decaf448

use ed448_goldilocks::{DecafPoint, Scalar};
use generic_array::typenum::U56;
use generic_array::GenericArray;
use rand::{CryptoRng, RngCore};
use subtle::Choice;

use super::KeGroup;
use crate::errors::InternalError;
use crate::oprf::group::{Decaf448, Group};
use crate::oprf::{derive_keypair, Mode};

impl KeGroup for Decaf448 {
    type Pk = DecafPoint;

    type PkLen = U56;

    type Sk = Scalar;

    type SkLen = U56;

    fn serialize_pk(pk: &Self::Pk) -> GenericArray<u8, Self::PkLen> {
        <Self as Group>::serialize_elem(*pk)
    }

    fn deserialize_pk(bytes: &GenericArray<u8, Self::PkLen>) -> Result<Self::Pk, InternalError> {
        <Self as Group>::deserialize_elem(bytes).map_err(|_| InternalError::PointError)
    }

    fn random_sk<R: RngCore + CryptoRng>(rng: &mut R) -> Self::Sk {
        <Self as Group>::random_scalar(rng)
    }

    fn derive_sk(seed: &[u8], info: &[u8]) -> Result<Self::Sk, InternalError> {
        derive_keypair::<Self>(seed, info, Mode::Oprf)
            .map(|(sk, _)| sk)
            .map_err(InternalError::from)
    }

    fn public_key(sk: &Self::Sk) -> Self::Pk {
        DecafPoint::GENERATOR * *sk
    }

    fn diffie_hellman(pk: &Self::Pk, sk: &Self::Sk) -> GenericArray<u8, Self::PkLen> {
        Self::serialize_pk(&(*pk * *sk))
    }

    fn is_zero_sk(sk: &Self::Sk) -> Choice {
        <Self as Group>::is_zero_scalar(*sk)
    }

    fn zeroize_sk_on_drop(sk: &mut Self::Sk) {
        *sk = Scalar::ZERO;
    }

    fn serialize_sk(sk: &Self::Sk) -> GenericArray<u8, Self::SkLen> {
        <Self as Group>::serialize_scalar(*sk)
    }

    fn deserialize_sk(bytes: &GenericArray<u8, Self::SkLen>) -> Result<Self::Sk, InternalError> {
        <Self as Group>::deserialize_scalar(bytes).map_err(|_| InternalError::PointError)
    }
}

#[cfg(test)]
impl crate::serialization::AssertZeroized for Scalar {
    fn assert_zeroized(&self) {
        assert_eq!(self.to_bytes(), [0; 56]);
    }
}
