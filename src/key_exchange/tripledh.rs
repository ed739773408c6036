// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! An implementation of the Triple Diffie-Hellman key exchange protocol

use core::ops::Add;

use derive_where::derive_where;
use digest::{Digest, Output};
use generic_array::sequence::Concat;
use generic_array::typenum::Sum;
use generic_array::{ArrayLength, GenericArray};
use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::errors::{InternalError, ProtocolError};
use crate::hash::{Hash, OutputSize};
use crate::key_exchange::group::KeGroup;
use crate::key_exchange::shared::{
    derive_keys, generate_nonce, DerivedKeys, Ke1Message, Ke1State, NonceLen,
    STR_OPAQUE_DERIVE_KEY_PAIR,
};
use crate::key_exchange::{
    Deserialize, GenerateKe2Result, GenerateKe3Result, KeyExchange, Serialize, SerializedContext,
    SerializedIdentifiers,
};
use crate::keypair::{KeyPair, PrivateKey, PublicKey};
use crate::serialization::{SliceExt, UpdateExt};

////////////////////////////
// High-level API Structs //
// ====================== //
////////////////////////////

/// The Triple Diffie-Hellman key exchange implementation
pub struct TripleDh;

/// The server state produced after the second key exchange message
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Ke2State<D: Hash> {
    km3: Output<D>,
    hashed_transcript: Output<D>,
    session_key: Output<D>,
}

/// The second key exchange message
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; G::Pk)]
pub struct Ke2Message<D: Hash, G: KeGroup> {
    server_nonce: GenericArray<u8, NonceLen>,
    server_e_pk: PublicKey<G>,
    mac: Output<D>,
}

/// The third key exchange message
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Ke3Message<D: Hash> {
    mac: Output<D>,
}

////////////////////////////////
// High-level Implementations //
// ========================== //
////////////////////////////////

impl<D: Hash, G: KeGroup> KeyExchange<D, G> for TripleDh
where
    // Ke1State: KeSk + Nonce
    G::SkLen: Add<NonceLen>,
    Sum<G::SkLen, NonceLen>: ArrayLength<u8>,
    // Ke1Message: Nonce + KePk
    NonceLen: Add<G::PkLen>,
    Sum<NonceLen, G::PkLen>: ArrayLength<u8> + Add<OutputSize<D>>,
    // Ke2Message: Nonce + KePk + Hash
    Sum<Sum<NonceLen, G::PkLen>, OutputSize<D>>: ArrayLength<u8>,
    // Ke2State: Hash + Hash + Hash
    OutputSize<D>: Add<OutputSize<D>>,
    Sum<OutputSize<D>, OutputSize<D>>: ArrayLength<u8> + Add<OutputSize<D>>,
    Sum<Sum<OutputSize<D>, OutputSize<D>>, OutputSize<D>>: ArrayLength<u8>,
{
    type KE1State = Ke1State<G>;
    type KE2State = Ke2State<D>;
    type KE1Message = Ke1Message<G>;
    type KE2Message = Ke2Message<D, G>;
    type KE3Message = Ke3Message<D>;

    fn generate_ke1<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<(Self::KE1State, Self::KE1Message), ProtocolError> {
        // Key share seeds are drawn at nonce length (32 bytes) and expanded
        // into an ephemeral key pair, so a caller-supplied RNG fully
        // determines the exchange.
        let client_keyshare_seed = Zeroizing::new(generate_nonce(rng));
        let client_e_kp = KeyPair::<G>::derive_diffie_hellman(
            &client_keyshare_seed,
            STR_OPAQUE_DERIVE_KEY_PAIR,
        )?;
        let client_nonce = generate_nonce(rng);

        let ke1_message = Ke1Message {
            client_nonce,
            client_e_pk: client_e_kp.public().clone(),
        };

        Ok((
            Ke1State {
                client_e_sk: client_e_kp.private().clone(),
                client_nonce,
            },
            ke1_message,
        ))
    }

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
    ) -> Result<GenerateKe2Result<D, G, Self>, ProtocolError> {
        let server_keyshare_seed = Zeroizing::new(generate_nonce(rng));
        let server_e_kp = KeyPair::<G>::derive_diffie_hellman(
            &server_keyshare_seed,
            STR_OPAQUE_DERIVE_KEY_PAIR,
        )?;
        let server_nonce = generate_nonce(rng);

        let mut transcript_hasher = D::new()
            .chain_iter(context.iter())
            .chain_iter(identifiers.client.iter())
            .chain(serialized_credential_request)
            .chain(ke1_message.serialize())
            .chain_iter(identifiers.server.iter())
            .chain(serialized_credential_response)
            .chain(server_nonce)
            .chain(server_e_kp.public().serialize());

        let derived_keys = derive_3dh_keys::<D, G>(
            TripleDhComponents {
                pk1: &ke1_message.client_e_pk,
                sk1: server_e_kp.private(),
                pk2: &ke1_message.client_e_pk,
                sk2: server_s_sk,
                pk3: &client_s_pk,
                sk3: server_e_kp.private(),
            },
            &transcript_hasher.clone().finalize(),
        )?;

        let mut mac_hasher =
            Hmac::<D>::new_from_slice(&derived_keys.km2).map_err(|_| InternalError::HmacError)?;
        mac_hasher.update(&transcript_hasher.clone().finalize());
        let mac = mac_hasher.finalize().into_bytes();

        Digest::update(&mut transcript_hasher, &mac);

        Ok(GenerateKe2Result {
            state: Ke2State {
                km3: derived_keys.km3,
                hashed_transcript: transcript_hasher.finalize(),
                session_key: derived_keys.session_key,
            },
            message: Ke2Message {
                server_nonce,
                server_e_pk: server_e_kp.public().clone(),
                mac,
            },
            #[cfg(test)]
            handshake_secret: derived_keys.handshake_secret,
            #[cfg(test)]
            km2: derived_keys.km2,
        })
    }

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
    ) -> Result<GenerateKe3Result<D, G, Self>, ProtocolError> {
        let mut transcript_hasher = D::new()
            .chain_iter(context.iter())
            .chain_iter(identifiers.client.iter())
            .chain(serialized_credential_request)
            .chain(ke1_state.client_nonce)
            .chain(ke1_state.client_e_sk.public_key().serialize())
            .chain_iter(identifiers.server.iter())
            .chain(serialized_credential_response)
            .chain(ke2_message.serialize_without_mac());

        let derived_keys = derive_3dh_keys::<D, G>(
            TripleDhComponents {
                pk1: &ke2_message.server_e_pk,
                sk1: &ke1_state.client_e_sk,
                pk2: &server_s_pk,
                sk2: &ke1_state.client_e_sk,
                pk3: &ke2_message.server_e_pk,
                sk3: &client_s_sk,
            },
            &transcript_hasher.clone().finalize(),
        )?;

        let mut server_mac =
            Hmac::<D>::new_from_slice(&derived_keys.km2).map_err(|_| InternalError::HmacError)?;
        server_mac.update(&transcript_hasher.clone().finalize());

        server_mac
            .verify(&ke2_message.mac)
            .map_err(|_| ProtocolError::ServerAuthenticationError)?;

        Digest::update(&mut transcript_hasher, &ke2_message.mac);

        let mut client_mac =
            Hmac::<D>::new_from_slice(&derived_keys.km3).map_err(|_| InternalError::HmacError)?;
        client_mac.update(&transcript_hasher.finalize());

        Ok(GenerateKe3Result {
            session_key: derived_keys.session_key,
            message: Ke3Message {
                mac: client_mac.finalize().into_bytes(),
            },
            #[cfg(test)]
            handshake_secret: derived_keys.handshake_secret,
            #[cfg(test)]
            km3: derived_keys.km3,
        })
    }

    fn finish_ke(
        ke3_message: Self::KE3Message,
        ke2_state: &Self::KE2State,
    ) -> Result<Output<D>, ProtocolError> {
        let mut client_mac =
            Hmac::<D>::new_from_slice(&ke2_state.km3).map_err(|_| InternalError::HmacError)?;
        client_mac.update(&ke2_state.hashed_transcript);

        client_mac
            .verify(&ke3_message.mac)
            .map_err(|_| ProtocolError::ClientAuthenticationError)?;

        Ok(ke2_state.session_key.clone())
    }
}

/////////////////////////
// Convenience Structs //
//==================== //
/////////////////////////

// The triple of public and private components used in the 3DH computation.
// From the client's perspective: (server_e, client_e), (server_s, client_e),
// (server_e, client_s). From the server's perspective: (client_e, server_e),
// (client_e, server_s), (client_s, server_e).
struct TripleDhComponents<'a, G: KeGroup> {
    pk1: &'a PublicKey<G>,
    sk1: &'a PrivateKey<G>,
    pk2: &'a PublicKey<G>,
    sk2: &'a PrivateKey<G>,
    pk3: &'a PublicKey<G>,
    sk3: &'a PrivateKey<G>,
}

////////////////////////////////////////////////
// Helper functions and Trait Implementations //
// ========================================== //
////////////////////////////////////////////////

// Helper functions

// Computes the three shared secrets and feeds them into the key schedule.
fn derive_3dh_keys<D: Hash, G: KeGroup>(
    dh: TripleDhComponents<'_, G>,
    hashed_derivation_transcript: &[u8],
) -> Result<DerivedKeys<D>, ProtocolError> {
    let dh1 = Zeroizing::new(dh.sk1.diffie_hellman(dh.pk1));
    let dh2 = Zeroizing::new(dh.sk2.diffie_hellman(dh.pk2));
    let dh3 = Zeroizing::new(dh.sk3.diffie_hellman(dh.pk3));

    derive_keys::<D>(
        [dh1.as_slice(), dh2.as_slice(), dh3.as_slice()].into_iter(),
        hashed_derivation_transcript,
    )
}

// Serialization and deserialization implementations

impl<D: Hash> Deserialize for Ke2State<D> {
    fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            km3: input.take_array("km3")?,
            hashed_transcript: input.take_array("hashed transcript")?,
            session_key: input.take_array("session key")?,
        })
    }
}

impl<D: Hash> Serialize for Ke2State<D>
where
    // Ke2State: Hash + Hash + Hash
    OutputSize<D>: Add<OutputSize<D>>,
    Sum<OutputSize<D>, OutputSize<D>>: ArrayLength<u8> + Add<OutputSize<D>>,
    Sum<Sum<OutputSize<D>, OutputSize<D>>, OutputSize<D>>: ArrayLength<u8>,
{
    type Len = Sum<Sum<OutputSize<D>, OutputSize<D>>, OutputSize<D>>;

    fn serialize(&self) -> GenericArray<u8, Self::Len> {
        self.km3
            .clone()
            .concat(self.hashed_transcript.clone())
            .concat(self.session_key.clone())
    }
}

impl<D: Hash, G: KeGroup> Deserialize for Ke2Message<D, G> {
    fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            server_nonce: input.take_array("server nonce")?,
            server_e_pk: PublicKey::deserialize_take(input)?,
            mac: input.take_array("mac")?,
        })
    }
}

impl<D: Hash, G: KeGroup> Serialize for Ke2Message<D, G>
where
    // Ke2Message: Nonce + KePk + Hash
    NonceLen: Add<G::PkLen>,
    Sum<NonceLen, G::PkLen>: ArrayLength<u8> + Add<OutputSize<D>>,
    Sum<Sum<NonceLen, G::PkLen>, OutputSize<D>>: ArrayLength<u8>,
{
    type Len = Sum<Sum<NonceLen, G::PkLen>, OutputSize<D>>;

    fn serialize(&self) -> GenericArray<u8, Self::Len> {
        self.serialize_without_mac().concat(self.mac.clone())
    }
}

impl<D: Hash, G: KeGroup> Ke2Message<D, G>
where
    NonceLen: Add<G::PkLen>,
    Sum<NonceLen, G::PkLen>: ArrayLength<u8>,
{
    // The prefix of the message that enters the transcript before the MAC is
    // computed over it.
    fn serialize_without_mac(&self) -> GenericArray<u8, Sum<NonceLen, G::PkLen>> {
        self.server_nonce.concat(self.server_e_pk.serialize())
    }
}

impl<D: Hash> Deserialize for Ke3Message<D> {
    fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            mac: input.take_array("mac")?,
        })
    }
}

impl<D: Hash> Serialize for Ke3Message<D> {
    type Len = OutputSize<D>;

    fn serialize(&self) -> GenericArray<u8, Self::Len> {
        self.mac.clone()
    }
}

//////////////////////////
// Test Implementations //
//===================== //
//////////////////////////

#[cfg(test)]
use crate::serialization::AssertZeroized;

#[cfg(test)]
impl<D: Hash> AssertZeroized for Ke2State<D> {
    fn assert_zeroized(&self) {
        let Self {
            km3,
            hashed_transcript,
            session_key,
        } = self;

        for bytes in [km3, hashed_transcript, session_key] {
            assert_eq!(bytes, &GenericArray::default());
        }
    }
}
