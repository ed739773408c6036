// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Defines the CipherSuite trait to specify the underlying primitives for
//! OPAQUE

use crate::key_exchange::group::KeGroup;
use crate::key_exchange::KeyExchange;
use crate::ksf::Ksf;
use crate::oprf;

/// Configures the primitives used in OPAQUE:
/// * The OPRF cipher suite, which determines the oblivious evaluation of the
///   password.
/// * The group used for the key exchange.
/// * The key exchange protocol.
/// * The key stretching function applied to the OPRF output.
///
/// Cipher suites are plain unit structs; a configuration is fixed at the type
/// level and cannot change between protocol steps.
pub trait CipherSuite: Sized {
    /// The OPRF cipher suite, see [`oprf::CipherSuite`].
    type OprfCs: oprf::CipherSuite;
    /// The group used for the key exchange.
    type KeGroup: KeGroup;
    /// The key exchange protocol.
    type KeyExchange: KeyExchange<OprfHash<Self>, Self::KeGroup>;
    /// The key stretching function, see [`Ksf`].
    type Ksf: Ksf;
}

pub(crate) type OprfGroup<CS: CipherSuite> = <CS::OprfCs as oprf::CipherSuite>::Group;
pub(crate) type OprfHash<CS: CipherSuite> = <CS::OprfCs as oprf::CipherSuite>::Hash;

/// The recommended configuration: ristretto255 for both the OPRF and the key
/// exchange, 3DH, and Argon2id with this crate's default parameters.
#[cfg(all(feature = "ristretto255", feature = "argon2"))]
pub struct Ristretto255Sha512;

#[cfg(all(feature = "ristretto255", feature = "argon2"))]
impl CipherSuite for Ristretto255Sha512 {
    type OprfCs = crate::Ristretto255;
    type KeGroup = crate::Ristretto255;
    type KeyExchange = crate::key_exchange::tripledh::TripleDh;
    type Ksf = crate::ksf::Argon2id;
}

/// A configuration over P-256 with SHA-256, 3DH, and Argon2id with this
/// crate's default parameters.
#[cfg(all(feature = "p256", feature = "argon2"))]
pub struct P256Sha256;

#[cfg(all(feature = "p256", feature = "argon2"))]
impl CipherSuite for P256Sha256 {
    type OprfCs = p256::NistP256;
    type KeGroup = p256::NistP256;
    type KeyExchange = crate::key_exchange::tripledh::TripleDh;
    type Ksf = crate::ksf::Argon2id;
}
