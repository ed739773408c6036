// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! A list of error types which are produced during an execution of the protocol

use core::error::Error;

use displaydoc::Display;

use crate::oprf;

/// Represents an error in the manipulation of internal cryptographic data
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum InternalError {
    /// Computing HKDF failed while deriving subkeys
    HkdfError,
    /// Computing HMAC failed while supplying a secret key
    HmacError,
    /// Computing the key stretching function failed
    KsfError,
    /// Deserializing a group element or scalar failed
    PointError,
    /// Error from the OPRF evaluation: {0}
    OprfError(oprf::Error),
}

impl Error for InternalError {}

impl From<oprf::Error> for InternalError {
    fn from(oprf_error: oprf::Error) -> Self {
        Self::OprfError(oprf_error)
    }
}

/// Represents an error in protocol handling
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ProtocolError {
    /// Internal error encountered
    LibraryError(InternalError),
    /** This error occurs when the envelope authentication tag fails to
    verify, typically because the supplied password was incorrect */
    EnvelopeRecoveryError,
    /** This error occurs when the client cannot verify the MAC sent by the
    server in the second key exchange message */
    ServerAuthenticationError,
    /** This error occurs when the server cannot verify the MAC sent by the
    client in the third key exchange message */
    ClientAuthenticationError,
    /// Error with serializing / deserializing protocol messages
    SerializationError,
    /** Invalid length for `{name}`: expected {len}, actual {actual_len} */
    #[allow(clippy::doc_markdown)]
    SizeError {
        /// name
        name: &'static str,
        /// length
        len: usize,
        /// actual
        actual_len: usize,
    },
    /** This error occurs when the client detects that the server has
    reflected the OPRF value (beta == alpha) */
    ReflectedValueError,
}

impl Error for ProtocolError {}

// This is meant to express future(ly) non-trivial ways of converting the
// internal error into a ProtocolError
impl From<InternalError> for ProtocolError {
    fn from(e: InternalError) -> ProtocolError {
        Self::LibraryError(e)
    }
}

impl From<oprf::Error> for ProtocolError {
    fn from(oprf_error: oprf::Error) -> Self {
        Self::LibraryError(InternalError::OprfError(oprf_error))
    }
}
