// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! The base mode, in which the server's output is not verifiable.

use derive_where::derive_where;
use digest::Output;
use generic_array::GenericArray;
use rand::{CryptoRng, RngCore};

use super::ciphersuite::{Elem, Scalar, ScalarLen};
use super::common::{BlindedElement, EvaluationElement, Mode};
use super::internal::{derive_keypair, finalize_after_unblind, input_element};
use super::{CipherSuite, Group, Result};

/// A client in base mode, holding the blinding factor between the two
/// protocol messages.
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; Scalar<CS>)]
pub struct OprfClient<CS: CipherSuite> {
    pub(crate) blind: Scalar<CS>,
}

/// A server in base mode, holding the evaluation key.
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; Scalar<CS>)]
pub struct OprfServer<CS: CipherSuite> {
    pub(crate) key: Scalar<CS>,
}

/// The state and message produced by [`OprfClient::blind`].
#[derive_where(Debug; Scalar<CS>, Elem<CS>)]
pub struct OprfClientBlindResult<CS: CipherSuite> {
    /// The client state, needed to finalize.
    pub state: OprfClient<CS>,
    /// The message to send to the server.
    pub message: BlindedElement<CS>,
}

impl<CS: CipherSuite> OprfClient<CS> {
    /// Blinds the input with a random blinding factor, producing the first
    /// protocol message.
    ///
    /// # Errors
    /// [`Error::Input`](super::Error::Input) if the input is longer than
    /// [`u16::MAX`] or maps to the identity element.
    pub fn blind<R: RngCore + CryptoRng>(
        input: &[u8],
        blinding_factor_rng: &mut R,
    ) -> Result<OprfClientBlindResult<CS>> {
        let element = input_element::<CS>(input, Mode::Oprf)?;
        let blind = CS::Group::random_scalar(blinding_factor_rng);

        Ok(OprfClientBlindResult {
            state: Self { blind },
            message: BlindedElement(element * blind),
        })
    }

    /// Unblinds the server's evaluation and hashes it into the protocol
    /// output.
    ///
    /// # Errors
    /// [`Error::Input`](super::Error::Input) if the input is longer than
    /// [`u16::MAX`].
    pub fn finalize(
        &self,
        input: &[u8],
        evaluation_element: &EvaluationElement<CS>,
    ) -> Result<Output<CS::Hash>> {
        let unblinded_element = evaluation_element.0 * CS::Group::invert_scalar(self.blind);
        finalize_after_unblind::<CS>(input, None, unblinded_element)
    }

    /// Serialization into bytes.
    pub fn serialize(&self) -> GenericArray<u8, ScalarLen<CS>> {
        CS::Group::serialize_scalar(self.blind)
    }

    /// Deserialization from bytes, rejecting a zero blinding factor.
    pub fn deserialize(input: &[u8]) -> Result<Self> {
        CS::Group::deserialize_scalar(input).map(|blind| Self { blind })
    }

    #[cfg(test)]
    pub(crate) fn get_blind(&self) -> Scalar<CS> {
        self.blind
    }
}

impl<CS: CipherSuite> OprfServer<CS> {
    /// Creates a server with a freshly sampled key.
    pub fn new<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            key: CS::Group::random_scalar(rng),
        }
    }

    /// Creates a server from an existing serialized key.
    ///
    /// # Errors
    /// [`Error::Deserialization`](super::Error::Deserialization) if the key
    /// is malformed or zero.
    pub fn new_with_key(private_key_bytes: &[u8]) -> Result<Self> {
        CS::Group::deserialize_scalar(private_key_bytes).map(|key| Self { key })
    }

    /// Derives a server key from a seed, implementing `DeriveKeyPair` from
    /// [RFC 9497 § 3.2].
    ///
    /// # Errors
    /// - [`Error::Seed`](super::Error::Seed) if the seed is longer than
    ///   [`u16::MAX`].
    /// - [`Error::Info`](super::Error::Info) if the info is longer than
    ///   [`u16::MAX`].
    /// - [`Error::DeriveKeyPair`](super::Error::DeriveKeyPair) if no valid
    ///   key can be derived.
    ///
    /// [RFC 9497 § 3.2]: https://www.rfc-editor.org/rfc/rfc9497#section-3.2
    pub fn new_from_seed(seed: &[u8], info: &[u8]) -> Result<Self> {
        let (key, _) = derive_keypair::<CS>(seed, info, Mode::Oprf)?;
        Ok(Self { key })
    }

    /// Evaluates a client-blinded element.
    pub fn blind_evaluate(&self, blinded_element: &BlindedElement<CS>) -> EvaluationElement<CS> {
        EvaluationElement(blinded_element.0 * self.key)
    }

    /// Computes the protocol output for an input directly, without blinding.
    /// This matches what a client obtains for the same input.
    ///
    /// # Errors
    /// [`Error::Input`](super::Error::Input) if the input is longer than
    /// [`u16::MAX`] or maps to the identity element.
    pub fn evaluate(&self, input: &[u8]) -> Result<Output<CS::Hash>> {
        let element = input_element::<CS>(input, Mode::Oprf)?;
        finalize_after_unblind::<CS>(input, None, element * self.key)
    }

    /// Serialization into bytes.
    pub fn serialize(&self) -> GenericArray<u8, ScalarLen<CS>> {
        CS::Group::serialize_scalar(self.key)
    }

    /// Deserialization from bytes, rejecting a zero key.
    pub fn deserialize(input: &[u8]) -> Result<Self> {
        Self::new_with_key(input)
    }

    #[cfg(test)]
    pub(crate) fn get_private_key(&self) -> Scalar<CS> {
        self.key
    }
}
