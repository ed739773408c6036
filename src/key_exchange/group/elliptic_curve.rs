// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Key exchange group implementation for the NIST curves, generic over their
//! common arithmetic backend.

use elliptic_curve::group::cofactor::CofactorGroup;
use elliptic_curve::hash2curve::{FromOkm, GroupDigest};
use elliptic_curve::sec1::{CompressedPointSize, FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{
    AffinePoint, FieldBytesSize, NonZeroScalar, ProjectivePoint, PublicKey, Scalar, SecretKey,
};
use generic_array::GenericArray;
use rand::{CryptoRng, RngCore};
use subtle::Choice;

use super::KeGroup;
use crate::errors::InternalError;
use crate::oprf::{derive_keypair, CipherSuite, Mode};

impl<C> KeGroup for C
where
    C: CipherSuite<Group = C> + GroupDigest,
    FieldBytesSize<C>: ModulusSize,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    ProjectivePoint<C>: CofactorGroup + ToEncodedPoint<C>,
    Scalar<C>: FromOkm,
{
    type Pk = PublicKey<Self>;

    type PkLen = CompressedPointSize<Self>;

    type Sk = SecretKey<Self>;

    type SkLen = FieldBytesSize<Self>;

    fn serialize_pk(pk: &Self::Pk) -> GenericArray<u8, Self::PkLen> {
        GenericArray::clone_from_slice(pk.to_encoded_point(true).as_bytes())
    }

    fn deserialize_pk(bytes: &GenericArray<u8, Self::PkLen>) -> Result<Self::Pk, InternalError> {
        // `PublicKey` parses SEC1 encodings and rejects the identity.
        PublicKey::<Self>::from_sec1_bytes(bytes).map_err(|_| InternalError::PointError)
    }

    fn random_sk<R: RngCore + CryptoRng>(rng: &mut R) -> Self::Sk {
        SecretKey::<Self>::random(rng)
    }

    fn derive_sk(seed: &[u8], info: &[u8]) -> Result<Self::Sk, InternalError> {
        let (sk, _) = derive_keypair::<Self>(seed, info, Mode::Oprf)?;

        Option::<NonZeroScalar<Self>>::from(NonZeroScalar::new(sk))
            .map(SecretKey::from)
            .ok_or(InternalError::PointError)
    }

    fn public_key(sk: &Self::Sk) -> Self::Pk {
        sk.public_key()
    }

    fn diffie_hellman(pk: &Self::Pk, sk: &Self::Sk) -> GenericArray<u8, Self::PkLen> {
        GenericArray::clone_from_slice(
            (pk.to_projective() * sk.to_nonzero_scalar().as_ref())
                .to_encoded_point(true)
                .as_bytes(),
        )
    }

    fn is_zero_sk(_: &Self::Sk) -> Choice {
        // `SecretKey` maintains the nonzero invariant itself.
        Choice::from(0)
    }

    fn zeroize_sk_on_drop(_: &mut Self::Sk) {}

    fn serialize_sk(sk: &Self::Sk) -> GenericArray<u8, Self::SkLen> {
        sk.to_bytes()
    }

    fn deserialize_sk(bytes: &GenericArray<u8, Self::SkLen>) -> Result<Self::Sk, InternalError> {
        SecretKey::<Self>::from_bytes(bytes).map_err(|_| InternalError::PointError)
    }
}
