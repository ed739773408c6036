// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Envelope sealing and recovery for the client credential file.
//!
//! The envelope holds no key material: it is a nonce plus an authentication
//! tag. The client key pair and the export key are re-derived from
//! `randomized_pwd` and the nonce on every recovery, and the tag binds them
//! to the server public key and the identities in use. When no identities
//! are supplied, the serialized public keys take their place.

use core::ops::Add;

use derive_where::derive_where;
use digest::Output;
use generic_array::sequence::Concat;
use generic_array::typenum::Sum;
use generic_array::{ArrayLength, GenericArray};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::ciphersuite::{CipherSuite, OprfGroup, OprfHash};
use crate::errors::{InternalError, ProtocolError};
use crate::hash::OutputSize;
use crate::key_exchange::shared::{NonceLen, STR_OPAQUE_DERIVE_KEY_PAIR};
use crate::key_exchange::{Deserialize, Serialize, SerializedIdentifiers};
use crate::keypair::{KeyPair, PublicKey};
use crate::opaque::Identifiers;
use crate::oprf::Group;
use crate::serialization::{MacExt, SliceExt};

///////////////
// Constants //
// ========= //
///////////////

// Constant strings for the labeled expansions out of `randomized_pwd`.
static STR_AUTH_KEY: &[u8] = b"AuthKey";
static STR_EXPORT_KEY: &[u8] = b"ExportKey";
static STR_PRIVATE_KEY: &[u8] = b"PrivateKey";

pub(crate) type EnvelopeLen<CS: CipherSuite> = Sum<NonceLen, OutputSize<OprfHash<CS>>>;

////////////////////////////
// High-level API Structs //
// ====================== //
////////////////////////////

/// The envelope stored in the client's record on the server
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct Envelope<CS: CipherSuite> {
    nonce: GenericArray<u8, NonceLen>,
    hmac: Output<OprfHash<CS>>,
}

// (envelope, client public key, export key)
type SealResult<CS: CipherSuite> = (
    Envelope<CS>,
    PublicKey<CS::KeGroup>,
    Output<OprfHash<CS>>,
);

/// The material recovered from a successfully opened envelope.
pub(crate) struct OpenedEnvelope<'a, CS: CipherSuite> {
    pub(crate) client_static_keypair: KeyPair<CS::KeGroup>,
    pub(crate) export_key: Output<OprfHash<CS>>,
    pub(crate) identifiers: SerializedIdentifiers<'a, CS::KeGroup>,
}

////////////////////////////////
// High-level Implementations //
// ========================== //
////////////////////////////////

impl<CS: CipherSuite> Envelope<CS> {
    /// Seals a new envelope under `randomized_pwd`, deriving the client key
    /// pair in the process. A fresh nonce is sampled on each call.
    pub(crate) fn seal<R: RngCore + CryptoRng>(
        rng: &mut R,
        randomized_pwd_hasher: Hkdf<OprfHash<CS>>,
        server_s_pk: &PublicKey<CS::KeGroup>,
        identifiers: Identifiers<'_>,
    ) -> Result<SealResult<CS>, ProtocolError> {
        let mut nonce = GenericArray::default();
        rng.fill_bytes(&mut nonce);

        Self::seal_inner(
            randomized_pwd_hasher,
            nonce,
            server_s_pk,
            identifiers,
            STR_OPAQUE_DERIVE_KEY_PAIR,
        )
    }

    /// Re-derives the envelope contents and checks the authentication tag.
    ///
    /// The tag comparison runs in constant time. A mismatch means a wrong
    /// password or a tampered credential file; the two are indistinguishable
    /// by construction.
    pub(crate) fn open<'a>(
        &self,
        randomized_pwd_hasher: Hkdf<OprfHash<CS>>,
        server_s_pk: &PublicKey<CS::KeGroup>,
        identifiers: Identifiers<'a>,
    ) -> Result<OpenedEnvelope<'a, CS>, ProtocolError> {
        self.open_inner(
            randomized_pwd_hasher,
            server_s_pk,
            identifiers,
            STR_OPAQUE_DERIVE_KEY_PAIR,
        )
    }

    /// An all-zero envelope for the fake record served on login attempts
    /// against unregistered client identifiers.
    pub(crate) fn dummy() -> Self {
        Self {
            nonce: GenericArray::default(),
            hmac: GenericArray::default(),
        }
    }

    /// Seals with a caller-chosen key pair derivation label, exposing how the
    /// label binds the recovered key pair to the protocol.
    #[cfg(test)]
    pub(crate) fn seal_with_derive_label<R: RngCore + CryptoRng>(
        rng: &mut R,
        randomized_pwd_hasher: Hkdf<OprfHash<CS>>,
        server_s_pk: &PublicKey<CS::KeGroup>,
        identifiers: Identifiers<'_>,
        derive_label: &[u8],
    ) -> Result<SealResult<CS>, ProtocolError> {
        let mut nonce = GenericArray::default();
        rng.fill_bytes(&mut nonce);

        Self::seal_inner(
            randomized_pwd_hasher,
            nonce,
            server_s_pk,
            identifiers,
            derive_label,
        )
    }

    #[cfg(test)]
    pub(crate) fn open_with_derive_label<'a>(
        &self,
        randomized_pwd_hasher: Hkdf<OprfHash<CS>>,
        server_s_pk: &PublicKey<CS::KeGroup>,
        identifiers: Identifiers<'a>,
        derive_label: &[u8],
    ) -> Result<OpenedEnvelope<'a, CS>, ProtocolError> {
        self.open_inner(randomized_pwd_hasher, server_s_pk, identifiers, derive_label)
    }

    fn seal_inner(
        randomized_pwd_hasher: Hkdf<OprfHash<CS>>,
        nonce: GenericArray<u8, NonceLen>,
        server_s_pk: &PublicKey<CS::KeGroup>,
        identifiers: Identifiers<'_>,
        derive_label: &[u8],
    ) -> Result<SealResult<CS>, ProtocolError> {
        let client_static_keypair =
            derive_client_keypair::<CS>(&randomized_pwd_hasher, &nonce, derive_label)?;
        let export_key = expand_with_nonce::<CS>(&randomized_pwd_hasher, &nonce, STR_EXPORT_KEY)?;
        let auth_key = expand_with_nonce::<CS>(&randomized_pwd_hasher, &nonce, STR_AUTH_KEY)?;

        let identifiers = SerializedIdentifiers::<CS::KeGroup>::from_identifiers(
            identifiers,
            client_static_keypair.public().serialize(),
            server_s_pk.serialize(),
        )?;

        let mut hmac = Hmac::<OprfHash<CS>>::new_from_slice(&auth_key)
            .map_err(|_| InternalError::HmacError)?;
        hmac.update(&nonce);
        hmac.update(&server_s_pk.serialize());
        hmac.update_iter(identifiers.server.iter());
        hmac.update_iter(identifiers.client.iter());

        Ok((
            Self {
                nonce,
                hmac: hmac.finalize().into_bytes(),
            },
            client_static_keypair.public().clone(),
            export_key,
        ))
    }

    fn open_inner<'a>(
        &self,
        randomized_pwd_hasher: Hkdf<OprfHash<CS>>,
        server_s_pk: &PublicKey<CS::KeGroup>,
        identifiers: Identifiers<'a>,
        derive_label: &[u8],
    ) -> Result<OpenedEnvelope<'a, CS>, ProtocolError> {
        let client_static_keypair =
            derive_client_keypair::<CS>(&randomized_pwd_hasher, &self.nonce, derive_label)?;
        let export_key =
            expand_with_nonce::<CS>(&randomized_pwd_hasher, &self.nonce, STR_EXPORT_KEY)?;
        let auth_key = expand_with_nonce::<CS>(&randomized_pwd_hasher, &self.nonce, STR_AUTH_KEY)?;

        let identifiers = SerializedIdentifiers::<CS::KeGroup>::from_identifiers(
            identifiers,
            client_static_keypair.public().serialize(),
            server_s_pk.serialize(),
        )?;

        let mut hmac = Hmac::<OprfHash<CS>>::new_from_slice(&auth_key)
            .map_err(|_| InternalError::HmacError)?;
        hmac.update(&self.nonce);
        hmac.update(&server_s_pk.serialize());
        hmac.update_iter(identifiers.server.iter());
        hmac.update_iter(identifiers.client.iter());
        let expected_hmac = hmac.finalize().into_bytes();

        if bool::from(expected_hmac.ct_eq(&self.hmac)) {
            Ok(OpenedEnvelope {
                client_static_keypair,
                export_key,
                identifiers,
            })
        } else {
            Err(ProtocolError::EnvelopeRecoveryError)
        }
    }
}

////////////////////////////////////////////////
// Helper functions and Trait Implementations //
// ========================================== //
////////////////////////////////////////////////

// Helper functions

fn expand_with_nonce<CS: CipherSuite>(
    randomized_pwd_hasher: &Hkdf<OprfHash<CS>>,
    nonce: &GenericArray<u8, NonceLen>,
    label: &[u8],
) -> Result<Output<OprfHash<CS>>, InternalError> {
    let mut okm = GenericArray::default();
    randomized_pwd_hasher
        .expand_multi_info(&[nonce.as_slice(), label], &mut okm)
        .map_err(|_| InternalError::HkdfError)?;
    Ok(okm)
}

fn derive_client_keypair<CS: CipherSuite>(
    randomized_pwd_hasher: &Hkdf<OprfHash<CS>>,
    nonce: &GenericArray<u8, NonceLen>,
    derive_label: &[u8],
) -> Result<KeyPair<CS::KeGroup>, ProtocolError> {
    let mut keypair_seed = Zeroizing::new(GenericArray::<
        u8,
        <OprfGroup<CS> as Group>::ScalarLen,
    >::default());
    randomized_pwd_hasher
        .expand_multi_info(&[nonce.as_slice(), STR_PRIVATE_KEY], &mut keypair_seed)
        .map_err(|_| InternalError::HkdfError)?;

    Ok(KeyPair::<CS::KeGroup>::derive_diffie_hellman(
        &keypair_seed,
        derive_label,
    )?)
}

// Serialization and deserialization implementations

impl<CS: CipherSuite> Deserialize for Envelope<CS> {
    fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            nonce: input.take_array("nonce")?,
            hmac: input.take_array("hmac")?,
        })
    }
}

impl<CS: CipherSuite> Serialize for Envelope<CS>
where
    // EnvelopeLen: Nonce + Hash
    NonceLen: Add<OutputSize<OprfHash<CS>>>,
    EnvelopeLen<CS>: ArrayLength<u8>,
{
    type Len = EnvelopeLen<CS>;

    fn serialize(&self) -> GenericArray<u8, Self::Len> {
        self.nonce.concat(self.hmac.clone())
    }
}

//////////////////////////
// Test Implementations //
//===================== //
//////////////////////////

#[cfg(test)]
use crate::serialization::AssertZeroized;

#[cfg(test)]
impl<CS: CipherSuite> AssertZeroized for Envelope<CS> {
    fn assert_zeroized(&self) {
        let Self { nonce, hmac } = self;

        assert_eq!(nonce, &GenericArray::default());
        assert_eq!(hmac, &GenericArray::default());
    }
}

#[cfg(all(test, feature = "ristretto255"))]
mod tests {
    use rand::rngs::OsRng;

    use super::*;
    use crate::key_exchange::tripledh::TripleDh;
    use crate::ksf::Identity;

    struct Suite;

    impl CipherSuite for Suite {
        type OprfCs = crate::Ristretto255;
        type KeGroup = crate::Ristretto255;
        type KeyExchange = TripleDh;
        type Ksf = Identity;
    }

    fn randomized_pwd() -> Hkdf<OprfHash<Suite>> {
        Hkdf::new(None, &[5; 32])
    }

    #[test]
    fn seal_and_open() {
        let mut rng = OsRng;
        let server_s_pk = KeyPair::<crate::Ristretto255>::generate_random(&mut rng)
            .public()
            .clone();

        let (envelope, client_s_pk, export_key) = Envelope::<Suite>::seal(
            &mut rng,
            randomized_pwd(),
            &server_s_pk,
            Identifiers::default(),
        )
        .unwrap();

        let opened = envelope
            .open(randomized_pwd(), &server_s_pk, Identifiers::default())
            .unwrap();

        assert_eq!(
            opened.client_static_keypair.public().serialize(),
            client_s_pk.serialize()
        );
        assert_eq!(opened.export_key, export_key);
    }

    #[test]
    fn open_with_wrong_password_fails() {
        let mut rng = OsRng;
        let server_s_pk = KeyPair::<crate::Ristretto255>::generate_random(&mut rng)
            .public()
            .clone();

        let (envelope, _, _) = Envelope::<Suite>::seal(
            &mut rng,
            randomized_pwd(),
            &server_s_pk,
            Identifiers::default(),
        )
        .unwrap();

        assert!(matches!(
            envelope.open(
                Hkdf::new(None, &[6; 32]),
                &server_s_pk,
                Identifiers::default(),
            ),
            Err(ProtocolError::EnvelopeRecoveryError)
        ));
    }

    #[test]
    fn open_with_wrong_identities_fails() {
        let mut rng = OsRng;
        let server_s_pk = KeyPair::<crate::Ristretto255>::generate_random(&mut rng)
            .public()
            .clone();

        let (envelope, _, _) = Envelope::<Suite>::seal(
            &mut rng,
            randomized_pwd(),
            &server_s_pk,
            Identifiers {
                client: Some(b"alice"),
                server: Some(b"server"),
            },
        )
        .unwrap();

        assert!(matches!(
            envelope.open(
                randomized_pwd(),
                &server_s_pk,
                Identifiers {
                    client: Some(b"bob"),
                    server: Some(b"server"),
                },
            ),
            Err(ProtocolError::EnvelopeRecoveryError)
        ));
    }

    #[test]
    fn derive_label_binds_key_pair() {
        let mut rng = OsRng;
        let server_s_pk = KeyPair::<crate::Ristretto255>::generate_random(&mut rng)
            .public()
            .clone();

        let (envelope, _, _) = Envelope::<Suite>::seal_with_derive_label(
            &mut rng,
            randomized_pwd(),
            &server_s_pk,
            Identifiers::default(),
            b"Other-DeriveKeyPair",
        )
        .unwrap();

        // The default label derives a different key pair, which changes the
        // cleartext credentials and with them the tag.
        assert!(matches!(
            envelope.open(randomized_pwd(), &server_s_pk, Identifiers::default()),
            Err(ProtocolError::EnvelopeRecoveryError)
        ));

        assert!(envelope
            .open_with_derive_label(
                randomized_pwd(),
                &server_s_pk,
                Identifiers::default(),
                b"Other-DeriveKeyPair",
            )
            .is_ok());
    }

    #[test]
    fn serialization_round_trip() {
        let mut rng = OsRng;
        let server_s_pk = KeyPair::<crate::Ristretto255>::generate_random(&mut rng)
            .public()
            .clone();

        let (envelope, _, _) = Envelope::<Suite>::seal(
            &mut rng,
            randomized_pwd(),
            &server_s_pk,
            Identifiers::default(),
        )
        .unwrap();

        let serialized = envelope.serialize();
        let mut input = serialized.as_slice();
        let deserialized = Envelope::<Suite>::deserialize_take(&mut input).unwrap();

        assert!(input.is_empty());
        assert_eq!(envelope, deserialized);
    }
}
