// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Prime-order group abstraction for [RFC 9497] and implementations over
//! ristretto255, decaf448 and the NIST curves.
//!
//! [RFC 9497]: https://www.rfc-editor.org/rfc/rfc9497

#[cfg(feature = "decaf448")]
mod decaf448;
mod elliptic_curve;
#[cfg(feature = "ristretto255")]
mod ristretto255;

use core::ops::{Add, Mul, Sub};

use generic_array::{ArrayLength, GenericArray};
use rand::{CryptoRng, RngCore};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

use crate::hash::Hash;

use super::Result;

#[cfg(feature = "decaf448")]
pub use self::decaf448::Decaf448;
#[cfg(feature = "ristretto255")]
pub use self::ristretto255::Ristretto255;

/// A prime-order group with the operations required by [RFC 9497 § 2.1].
///
/// [RFC 9497 § 2.1]: https://www.rfc-editor.org/rfc/rfc9497#section-2.1
pub trait Group {
    /// The type of group elements.
    type Elem: Add<Self::Elem, Output = Self::Elem>
        + ConstantTimeEq
        + Copy
        + Mul<Self::Scalar, Output = Self::Elem>;

    /// The byte length of a serialized element.
    type ElemLen: ArrayLength<u8> + 'static;

    /// The type of scalars.
    type Scalar: Add<Self::Scalar, Output = Self::Scalar>
        + ConstantTimeEq
        + Copy
        + Mul<Self::Scalar, Output = Self::Scalar>
        + Sub<Self::Scalar, Output = Self::Scalar>
        + Zeroize;

    /// The byte length of a serialized scalar.
    type ScalarLen: ArrayLength<u8> + 'static;

    /// Hashes a domain-separated input to a group element.
    ///
    /// Corresponds to the `HashToGroup` function from [RFC 9497 § 2.1]. The
    /// result may be the identity element; callers check for it where the
    /// protocol demands.
    ///
    /// [RFC 9497 § 2.1]: https://www.rfc-editor.org/rfc/rfc9497#section-2.1
    fn hash_to_curve<H: Hash>(input: &[&[u8]], dst: &[&[u8]]) -> Result<Self::Elem>;

    /// Hashes a domain-separated input to a scalar.
    ///
    /// Corresponds to the `HashToScalar` function from [RFC 9497 § 2.1].
    ///
    /// [RFC 9497 § 2.1]: https://www.rfc-editor.org/rfc/rfc9497#section-2.1
    fn hash_to_scalar<H: Hash>(input: &[&[u8]], dst: &[&[u8]]) -> Result<Self::Scalar>;

    /// The fixed generator of the group.
    fn base_elem() -> Self::Elem;

    /// The identity element.
    fn identity_elem() -> Self::Elem;

    /// Serializes an element into its fixed-length canonical encoding.
    fn serialize_elem(elem: Self::Elem) -> GenericArray<u8, Self::ElemLen>;

    /// Deserializes an element, rejecting malformed encodings and the
    /// identity element.
    fn deserialize_elem(element_bits: &[u8]) -> Result<Self::Elem>;

    /// Samples a uniformly random non-zero scalar.
    fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Self::Scalar;

    /// The multiplicative inverse of a scalar. Callers must not pass zero.
    fn invert_scalar(scalar: Self::Scalar) -> Self::Scalar;

    /// The zero scalar.
    fn zero_scalar() -> Self::Scalar;

    /// Constant-time check for the zero scalar.
    fn is_zero_scalar(scalar: Self::Scalar) -> Choice;

    /// Serializes a scalar into its fixed-length canonical encoding.
    fn serialize_scalar(scalar: Self::Scalar) -> GenericArray<u8, Self::ScalarLen>;

    /// Deserializes a scalar, rejecting zero and non-canonical encodings.
    fn deserialize_scalar(scalar_bits: &[u8]) -> Result<Self::Scalar>;
}
