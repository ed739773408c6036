// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Includes the KeGroup trait and definitions for the key exchange groups

#[cfg(feature = "decaf448")]
mod decaf448;
mod elliptic_curve;
#[cfg(feature = "ristretto255")]
mod ristretto255;

use generic_array::{ArrayLength, GenericArray};
use rand::{CryptoRng, RngCore};
use subtle::Choice;

use crate::errors::InternalError;

/// A group representation for use in the key exchange
pub trait KeGroup {
    /// Public key
    type Pk: Clone + Sized;
    /// Length of the public key
    type PkLen: ArrayLength<u8> + 'static;
    /// Secret key
    type Sk: Clone + Sized;
    /// Length of the secret key
    type SkLen: ArrayLength<u8> + 'static;

    /// Serializes a public key into its fixed-length canonical encoding
    fn serialize_pk(pk: &Self::Pk) -> GenericArray<u8, Self::PkLen>;

    /// Return a public key from its fixed-length bytes representation,
    /// rejecting non-canonical encodings and the identity element
    fn deserialize_pk(bytes: &GenericArray<u8, Self::PkLen>) -> Result<Self::Pk, InternalError>;

    /// Generate a random secret key
    fn random_sk<R: RngCore + CryptoRng>(rng: &mut R) -> Self::Sk;

    /// Derive a secret key from a seed by rejection sampling, with `info`
    /// mixed into the hashed input
    fn derive_sk(seed: &[u8], info: &[u8]) -> Result<Self::Sk, InternalError>;

    /// Return a public key from its secret key
    fn public_key(sk: &Self::Sk) -> Self::Pk;

    /// Diffie-Hellman key exchange
    fn diffie_hellman(pk: &Self::Pk, sk: &Self::Sk) -> GenericArray<u8, Self::PkLen>;

    /// Constant-time check for the zero secret key
    fn is_zero_sk(sk: &Self::Sk) -> Choice;

    /// Zeroize secret key on drop.
    fn zeroize_sk_on_drop(sk: &mut Self::Sk);

    /// Serializes a secret key into its fixed-length canonical encoding
    fn serialize_sk(sk: &Self::Sk) -> GenericArray<u8, Self::SkLen>;

    /// Return a secret key from its fixed-length bytes representation,
    /// rejecting zero and non-canonical encodings
    fn deserialize_sk(bytes: &GenericArray<u8, Self::SkLen>) -> Result<Self::Sk, InternalError>;
}
