// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Cipher suite selection for [RFC 9497] protocols.
//!
//! [RFC 9497]: https://www.rfc-editor.org/rfc/rfc9497

use crate::hash::Hash;

use super::group::Group;

/// Configures the underlying group and hash for the protocols in
/// [`crate::oprf`].
///
/// Implementations for the standardized suites are provided on
/// `Ristretto255`, `Decaf448` and the NIST curve types from the `p256`,
/// `p384` and `p521` crates, behind the crate features of the same names.
pub trait CipherSuite {
    /// The ciphersuite identifier as dictated by
    /// [RFC 9497 § 4](https://www.rfc-editor.org/rfc/rfc9497#name-ciphersuites).
    const ID: &'static str;

    /// The prime-order group used by the protocol.
    type Group: Group;

    /// The hash function; it drives domain-separated hashing and the final
    /// protocol output.
    type Hash: Hash;
}

pub(crate) type Elem<CS> = <<CS as CipherSuite>::Group as Group>::Elem;
pub(crate) type ElemLen<CS> = <<CS as CipherSuite>::Group as Group>::ElemLen;
pub(crate) type Scalar<CS> = <<CS as CipherSuite>::Group as Group>::Scalar;
pub(crate) type ScalarLen<CS> = <<CS as CipherSuite>::Group as Group>::ScalarLen;

#[cfg(feature = "ristretto255")]
impl CipherSuite for super::group::Ristretto255 {
    const ID: &'static str = "ristretto255-SHA512";

    type Group = Self;
    type Hash = sha2::Sha512;
}

#[cfg(feature = "decaf448")]
impl CipherSuite for super::group::Decaf448 {
    const ID: &'static str = "decaf448-SHAKE256";

    type Group = Self;
    type Hash = crate::hash::Shake256Fixed<generic_array::typenum::U64>;
}

#[cfg(feature = "p256")]
impl CipherSuite for p256::NistP256 {
    const ID: &'static str = "P256-SHA256";

    type Group = Self;
    type Hash = sha2::Sha256;
}

#[cfg(feature = "p384")]
impl CipherSuite for p384::NistP384 {
    const ID: &'static str = "P384-SHA384";

    type Group = Self;
    type Hash = sha2::Sha384;
}

#[cfg(feature = "p521")]
impl CipherSuite for p521::NistP521 {
    const ID: &'static str = "P521-SHA512";

    type Group = Self;
    type Hash = sha2::Sha512;
}
