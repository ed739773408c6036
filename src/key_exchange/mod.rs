// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Includes instantiations of key exchange protocols used in the login step for
//! OPAQUE

pub mod group;
pub(crate) mod shared;
pub mod tripledh;

use core::iter;

use derive_where::derive_where;
use digest::Output;
use generic_array::typenum::U2;
use generic_array::{ArrayLength, GenericArray};
use rand::{CryptoRng, RngCore};
use zeroize::ZeroizeOnDrop;

use crate::ciphersuite::{CipherSuite, OprfHash};
use crate::errors::ProtocolError;
use crate::hash::Hash;
use crate::key_exchange::group::KeGroup;
use crate::key_exchange::shared::STR_CONTEXT;
use crate::keypair::{PrivateKey, PublicKey};
use crate::opaque::Identifiers;
use crate::serialization::i2osp;

/// The key exchange trait.
pub trait KeyExchange<D: Hash, G: KeGroup> {
    /// Client state kept between the first and second client steps.
    type KE1State: Deserialize + Serialize + Clone + ZeroizeOnDrop;
    /// Server state kept between sending its message and checking the client
    /// MAC.
    type KE2State: Deserialize + Serialize + Clone + ZeroizeOnDrop;
    /// First message, sent by the client.
    type KE1Message: Deserialize + Serialize + Clone + ZeroizeOnDrop;
    /// Second message, sent by the server.
    type KE2Message: Deserialize + Serialize + Clone + ZeroizeOnDrop;
    /// Third message, sent by the client.
    type KE3Message: Deserialize + Serialize + Clone + ZeroizeOnDrop;

    /// Client generates [`KE1Message`](Self::KE1Message) and
    /// [`KE1State`](Self::KE1State).
    fn generate_ke1<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<(Self::KE1State, Self::KE1Message), ProtocolError>;

    /// Server generates [`KE2Message`](Self::KE2Message) and
    /// [`KE2State`](Self::KE2State).
    ///
    /// `serialized_credential_request` and `serialized_credential_response`
    /// carry the credential retrieval halves of the first two messages, which
    /// enter the transcript but are opaque to the key exchange itself.
    #[allow(clippy::too_many_arguments)]
    fn generate_ke2<R: RngCore + CryptoRng>(
        rng: &mut R,
        serialized_credential_request: &[u8],
        serialized_credential_response: &[u8],
        ke1_message: Self::KE1Message,
        client_s_pk: PublicKey<G>,
        server_s_sk: &PrivateKey<G>,
        identifiers: SerializedIdentifiers<'_, G>,
        context: SerializedContext<'_>,
    ) -> Result<GenerateKe2Result<D, G, Self>, ProtocolError>;

    /// Client generates [`KE3Message`](Self::KE3Message) and the session key,
    /// verifying the server MAC in the process.
    #[allow(clippy::too_many_arguments)]
    fn generate_ke3(
        serialized_credential_request: &[u8],
        serialized_credential_response: &[u8],
        ke2_message: Self::KE2Message,
        ke1_state: &Self::KE1State,
        server_s_pk: PublicKey<G>,
        client_s_sk: PrivateKey<G>,
        identifiers: SerializedIdentifiers<'_, G>,
        context: SerializedContext<'_>,
    ) -> Result<GenerateKe3Result<D, G, Self>, ProtocolError>;

    /// Server verifies the client MAC and releases the session key.
    fn finish_ke(
        ke3_message: Self::KE3Message,
        ke2_state: &Self::KE2State,
    ) -> Result<Output<D>, ProtocolError>;
}

/// Result type of [`KeyExchange::generate_ke2()`].
pub struct GenerateKe2Result<D: Hash, G: KeGroup, KE: KeyExchange<D, G> + ?Sized> {
    /// The server state.
    pub state: KE::KE2State,
    /// The server message.
    pub message: KE::KE2Message,
    #[cfg(test)]
    pub(crate) handshake_secret: Output<D>,
    #[cfg(test)]
    pub(crate) km2: Output<D>,
}

/// Result type of [`KeyExchange::generate_ke3()`].
pub struct GenerateKe3Result<D: Hash, G: KeGroup, KE: KeyExchange<D, G> + ?Sized> {
    /// The session key.
    pub session_key: Output<D>,
    /// The second client message.
    pub message: KE::KE3Message,
    #[cfg(test)]
    pub(crate) handshake_secret: Output<D>,
    #[cfg(test)]
    pub(crate) km3: Output<D>,
}

/// Serialized form of a `context` string, framed with its length for the
/// transcript.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SerializedContext<'a> {
    length: GenericArray<u8, U2>,
    context: &'a [u8],
}

impl<'a> SerializedContext<'a> {
    pub(crate) fn from(context: Option<&'a [u8]>) -> Result<Self, ProtocolError> {
        let context = context.unwrap_or(&[]);

        Ok(Self {
            length: i2osp::<U2>(context.len())?,
            context,
        })
    }

    /// Returns the serialized form of `context` in multiple byte slices.
    pub fn iter(&self) -> impl Clone + Iterator<Item = &[u8]> {
        iter::once(STR_CONTEXT).chain([self.length.as_slice(), self.context])
    }
}

/// Serialized form of [`Identifiers`](crate::Identifiers).
#[derive_where(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SerializedIdentifiers<'a, G: KeGroup> {
    /// Client identifier.
    pub client: SerializedIdentifier<'a, G>,
    /// Server identifier.
    pub server: SerializedIdentifier<'a, G>,
}

/// Serialized form of a single identifier from
/// [`Identifiers`](crate::Identifiers).
#[derive_where(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SerializedIdentifier<'a, G: KeGroup> {
    length: GenericArray<u8, U2>,
    identifier: Identifier<'a, G>,
}

#[derive_where(Clone, Debug, Eq, Hash, PartialEq)]
enum Identifier<'a, G: KeGroup> {
    Owned(GenericArray<u8, G::PkLen>),
    Borrowed(&'a [u8]),
}

impl<'a, G: KeGroup> SerializedIdentifiers<'a, G> {
    /// Frames the given identifiers, falling back to the static public keys
    /// where an identifier was not supplied.
    pub(crate) fn from_identifiers(
        ids: Identifiers<'a>,
        client_s_pk: GenericArray<u8, G::PkLen>,
        server_s_pk: GenericArray<u8, G::PkLen>,
    ) -> Result<Self, ProtocolError> {
        let client = SerializedIdentifier::from_identifier(ids.client, client_s_pk)?;
        let server = SerializedIdentifier::from_identifier(ids.server, server_s_pk)?;

        Ok(Self { client, server })
    }
}

impl<'a, G: KeGroup> SerializedIdentifier<'a, G> {
    fn from_identifier(
        id: Option<&'a [u8]>,
        s_pk: GenericArray<u8, G::PkLen>,
    ) -> Result<Self, ProtocolError> {
        if let Some(id) = id {
            Ok(SerializedIdentifier {
                length: i2osp::<U2>(id.len())?,
                identifier: Identifier::Borrowed(id),
            })
        } else {
            Ok(SerializedIdentifier {
                length: i2osp::<U2>(s_pk.len())?,
                identifier: Identifier::Owned(s_pk),
            })
        }
    }

    /// Returns the serialized form of the identifier in multiple byte slices.
    pub fn iter(&self) -> impl Clone + Iterator<Item = &[u8]> {
        [self.length.as_slice()]
            .into_iter()
            .chain(match &self.identifier {
                Identifier::Owned(bytes) => [bytes.as_slice()],
                Identifier::Borrowed(bytes) => [*bytes],
            })
    }
}

/// Deserialization trait for key exchange types.
pub trait Deserialize: Sized {
    /// Deserialize [`Self`] from the given `bytes`.
    ///
    /// The deserialized bytes must be taken from `bytes`.
    fn deserialize_take(bytes: &mut &[u8]) -> Result<Self, ProtocolError>;
}

/// Serialization trait for key exchange types.
pub trait Serialize {
    /// The length of the serialized type.
    type Len: ArrayLength<u8>;

    /// Serialize [`Self`] to a fixed-length byte array.
    fn serialize(&self) -> GenericArray<u8, Self::Len>;
}

pub(crate) type Ke1StateLen<CS: CipherSuite> =
    <<CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE1State as Serialize>::Len;
pub(crate) type Ke1MessageLen<CS: CipherSuite> =
    <<CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE1Message as Serialize>::Len;
pub(crate) type Ke2StateLen<CS: CipherSuite> =
    <<CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE2State as Serialize>::Len;
pub(crate) type Ke2MessageLen<CS: CipherSuite> =
    <<CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE2Message as Serialize>::Len;
pub(crate) type Ke3MessageLen<CS: CipherSuite> =
    <<CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE3Message as Serialize>::Len;
