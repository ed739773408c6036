// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Key types for the key exchange group, with serialization that matches the
//! group's canonical encodings.

use derive_where::derive_where;
use generic_array::GenericArray;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{InternalError, ProtocolError};
use crate::key_exchange::group::KeGroup;
use crate::serialization::SliceExt;

/// A public key for use in the key exchange.
#[derive_where(Clone)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; KG::Pk)]
pub struct PublicKey<KG: KeGroup>(KG::Pk);

// Public keys hold no secret material. The marker lets types carrying a
// public key alongside secrets still derive `ZeroizeOnDrop`.
impl<KG: KeGroup> ZeroizeOnDrop for PublicKey<KG> {}

impl<KG: KeGroup> PublicKey<KG> {
    pub(crate) fn new(key: KG::Pk) -> Self {
        Self(key)
    }

    /// Serializes this public key to its canonical byte representation.
    pub fn serialize(&self) -> GenericArray<u8, KG::PkLen> {
        KG::serialize_pk(&self.0)
    }

    /// Deserializes a public key, rejecting trailing input, non-canonical
    /// encodings and the identity element.
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        KG::deserialize_pk(&input.take_array("public key")?)
            .map(Self)
            .map_err(|_| ProtocolError::SerializationError)
    }
}

/// A private key for use in the key exchange. Wiped from memory on drop.
#[derive_where(Clone)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; KG::Sk)]
pub struct PrivateKey<KG: KeGroup>(KG::Sk);

impl<KG: KeGroup> PrivateKey<KG> {
    pub(crate) fn new(key: KG::Sk) -> Self {
        Self(key)
    }

    /// Returns the public key corresponding to this private key.
    pub fn public_key(&self) -> PublicKey<KG> {
        PublicKey(KG::public_key(&self.0))
    }

    pub(crate) fn diffie_hellman(&self, pk: &PublicKey<KG>) -> GenericArray<u8, KG::PkLen> {
        KG::diffie_hellman(&pk.0, &self.0)
    }

    /// Serializes this private key to its canonical byte representation.
    pub fn serialize(&self) -> GenericArray<u8, KG::SkLen> {
        KG::serialize_sk(&self.0)
    }

    /// Deserializes a private key, rejecting trailing input, non-canonical
    /// encodings and zero.
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        KG::deserialize_sk(&input.take_array("private key")?)
            .map(Self)
            .map_err(|_| ProtocolError::SerializationError)
    }
}

impl<KG: KeGroup> Zeroize for PrivateKey<KG> {
    fn zeroize(&mut self) {
        KG::zeroize_sk_on_drop(&mut self.0);
    }
}

impl<KG: KeGroup> Drop for PrivateKey<KG> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<KG: KeGroup> ZeroizeOnDrop for PrivateKey<KG> {}

#[cfg(test)]
impl<KG: KeGroup> crate::serialization::AssertZeroized for PrivateKey<KG>
where
    KG::Sk: crate::serialization::AssertZeroized,
{
    fn assert_zeroized(&self) {
        crate::serialization::AssertZeroized::assert_zeroized(&self.0);
    }
}

/// A private and public key pair for use in the key exchange.
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; KG::Pk, KG::Sk)]
pub struct KeyPair<KG: KeGroup> {
    pk: PublicKey<KG>,
    sk: PrivateKey<KG>,
}

impl<KG: KeGroup> KeyPair<KG> {
    pub(crate) fn from_private_key(sk: PrivateKey<KG>) -> Self {
        let pk = sk.public_key();
        Self { pk, sk }
    }

    /// Generates a fresh random key pair.
    pub fn generate_random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let sk = KG::random_sk(rng);
        let pk = KG::public_key(&sk);
        Self {
            pk: PublicKey(pk),
            sk: PrivateKey(sk),
        }
    }

    /// Derives a key pair deterministically from `seed`, domain-separated by
    /// `info`.
    pub(crate) fn derive_diffie_hellman(seed: &[u8], info: &[u8]) -> Result<Self, InternalError> {
        let sk = KG::derive_sk(seed, info)?;
        let pk = KG::public_key(&sk);
        Ok(Self {
            pk: PublicKey(pk),
            sk: PrivateKey(sk),
        })
    }

    /// The private key of this key pair.
    pub fn private(&self) -> &PrivateKey<KG> {
        &self.sk
    }

    /// The public key of this key pair.
    pub fn public(&self) -> &PublicKey<KG> {
        &self.pk
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;

    fn key_pair_round_trip<KG: KeGroup>() {
        let key_pair = KeyPair::<KG>::generate_random(&mut OsRng);

        let pk_bytes = key_pair.public().serialize();
        let sk_bytes = key_pair.private().serialize();

        let pk = PublicKey::<KG>::deserialize(&pk_bytes).unwrap();
        let sk = PrivateKey::<KG>::deserialize(&sk_bytes).unwrap();

        assert_eq!(pk.serialize(), pk_bytes);
        assert_eq!(sk.serialize(), sk_bytes);
        assert_eq!(sk.public_key().serialize(), pk_bytes);

        assert!(PublicKey::<KG>::deserialize(&pk_bytes[..pk_bytes.len() - 1]).is_err());
        assert!(PrivateKey::<KG>::deserialize(&sk_bytes[..sk_bytes.len() - 1]).is_err());
    }

    fn derive_is_deterministic<KG: KeGroup>() {
        let seed = [0x42; 32];

        let first = KeyPair::<KG>::derive_diffie_hellman(&seed, b"first info").unwrap();
        let second = KeyPair::<KG>::derive_diffie_hellman(&seed, b"first info").unwrap();
        let other = KeyPair::<KG>::derive_diffie_hellman(&seed, b"other info").unwrap();

        assert_eq!(
            first.private().serialize(),
            second.private().serialize(),
            "same seed and info must derive the same key"
        );
        assert_ne!(first.private().serialize(), other.private().serialize());
    }

    fn diffie_hellman_agrees<KG: KeGroup>() {
        let alice = KeyPair::<KG>::generate_random(&mut OsRng);
        let bob = KeyPair::<KG>::generate_random(&mut OsRng);

        let alice_shared = alice.private().diffie_hellman(bob.public());
        let bob_shared = bob.private().diffie_hellman(alice.public());

        assert_eq!(alice_shared, bob_shared);
    }

    #[test]
    fn key_pairs() {
        #[cfg(feature = "ristretto255")]
        key_pair_round_trip::<crate::Ristretto255>();
        #[cfg(feature = "decaf448")]
        key_pair_round_trip::<crate::Decaf448>();
        #[cfg(feature = "p256")]
        key_pair_round_trip::<p256::NistP256>();
        #[cfg(feature = "p384")]
        key_pair_round_trip::<p384::NistP384>();
        #[cfg(feature = "p521")]
        key_pair_round_trip::<p521::NistP521>();
    }

    #[test]
    fn derive_key_pairs() {
        #[cfg(feature = "ristretto255")]
        derive_is_deterministic::<crate::Ristretto255>();
        #[cfg(feature = "decaf448")]
        derive_is_deterministic::<crate::Decaf448>();
        #[cfg(feature = "p256")]
        derive_is_deterministic::<p256::NistP256>();
        #[cfg(feature = "p384")]
        derive_is_deterministic::<p384::NistP384>();
        #[cfg(feature = "p521")]
        derive_is_deterministic::<p521::NistP521>();
    }

    #[test]
    fn diffie_hellman() {
        #[cfg(feature = "ristretto255")]
        diffie_hellman_agrees::<crate::Ristretto255>();
        #[cfg(feature = "decaf448")]
        diffie_hellman_agrees::<crate::Decaf448>();
        #[cfg(feature = "p256")]
        diffie_hellman_agrees::<p256::NistP256>();
        #[cfg(feature = "p384")]
        diffie_hellman_agrees::<p384::NistP384>();
        #[cfg(feature = "p521")]
        diffie_hellman_agrees::<p521::NistP521>();
    }

    #[cfg(feature = "ristretto255")]
    #[test]
    fn private_key_zeroize() {
        let key_pair = KeyPair::<crate::Ristretto255>::generate_random(&mut OsRng);
        let mut sk = key_pair.private().clone();

        sk.zeroize();
        assert_eq!(sk.serialize(), GenericArray::default());
    }
}
