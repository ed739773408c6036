// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Errors raised by the OPRF engine.

use displaydoc::Display;

/// Return type of OPRF operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors raised by the protocols in this module. All are terminal; no
/// operation retries internally.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Error {
    /// The protocol inputs have mismatching counts or exceed a batch size of
    /// [`u16::MAX`].
    Batch,
    /// This byte string does not deserialize to a valid value.
    Deserialization,
    /// Deriving a key from this seed and info failed on every permitted
    /// attempt.
    DeriveKeyPair,
    /// The info exceeds a length of [`u16::MAX`].
    Info,
    /// The input exceeds a length of [`u16::MAX`] or hashes to the identity
    /// element.
    Input,
    /// The tweaked key is zero and has no inverse.
    Invert,
    /// The proof failed to verify.
    ProofVerification,
    /// The seed exceeds a length of [`u16::MAX`].
    Seed,
}

impl core::error::Error for Error {}
