// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Contains the messages used for OPAQUE and the Nopaque recovery flow

use core::ops::Add;

use derive_where::derive_where;
use digest::Output;
use generic_array::sequence::Concat;
use generic_array::typenum::Sum;
use generic_array::{ArrayLength, GenericArray};
use rand::{CryptoRng, RngCore};

use crate::ciphersuite::{CipherSuite, OprfGroup, OprfHash};
use crate::envelope::{Envelope, EnvelopeLen};
use crate::errors::ProtocolError;
use crate::hash::OutputSize;
use crate::key_exchange::group::KeGroup;
use crate::key_exchange::shared::NonceLen;
use crate::key_exchange::{
    Deserialize, Ke1MessageLen, Ke2MessageLen, Ke3MessageLen, KeyExchange, Serialize,
};
use crate::keypair::PublicKey;
use crate::opaque::ServerSetup;
use crate::oprf::{self, Group};
use crate::serialization::SliceExt;

/////////////////////
// Message Lengths //
// =============== //
/////////////////////

/// Length of [`RegistrationRequest`] in bytes.
pub type RegistrationRequestLen<CS: CipherSuite> = <OprfGroup<CS> as Group>::ElemLen;

/// Length of [`RegistrationResponse`] in bytes.
pub type RegistrationResponseLen<CS: CipherSuite> =
    Sum<<OprfGroup<CS> as Group>::ElemLen, <CS::KeGroup as KeGroup>::PkLen>;

/// Length of [`RegistrationUpload`] in bytes.
pub type RegistrationUploadLen<CS: CipherSuite> =
    Sum<Sum<<CS::KeGroup as KeGroup>::PkLen, OutputSize<OprfHash<CS>>>, EnvelopeLen<CS>>;

/// Length of [`CredentialRequest`] in bytes.
pub type CredentialRequestLen<CS: CipherSuite> = <OprfGroup<CS> as Group>::ElemLen;

/// Length of the masked response in a [`CredentialResponse`] in bytes.
pub type MaskedResponseLen<CS: CipherSuite> =
    Sum<Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>, OutputSize<OprfHash<CS>>>;

/// Length of [`CredentialResponse`] in bytes.
pub type CredentialResponseLen<CS: CipherSuite> =
    Sum<Sum<<OprfGroup<CS> as Group>::ElemLen, NonceLen>, MaskedResponseLen<CS>>;

/// Length of [`Ke1`] in bytes.
pub type Ke1Len<CS: CipherSuite> = Sum<CredentialRequestLen<CS>, Ke1MessageLen<CS>>;

/// Length of [`Ke2`] in bytes.
pub type Ke2Len<CS: CipherSuite> = Sum<CredentialResponseLen<CS>, Ke2MessageLen<CS>>;

/// Length of [`Ke3`] in bytes.
pub type Ke3Len<CS: CipherSuite> = Ke3MessageLen<CS>;

/// Length of [`RecoverRequest`] in bytes.
pub type RecoverRequestLen<CS: CipherSuite> = CredentialRequestLen<CS>;

/// Length of [`RecoverResponse`] in bytes.
pub type RecoverResponseLen<CS: CipherSuite> = CredentialResponseLen<CS>;

///////////////////////////
// Registration Messages //
// ===================== //
///////////////////////////

/// The message sent by the client to the server to initiate registration
#[derive_where(Clone)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; oprf::BlindedElement<CS::OprfCs>)]
pub struct RegistrationRequest<CS: CipherSuite> {
    /// blinded password information
    pub(crate) blinded_element: oprf::BlindedElement<CS::OprfCs>,
}

impl<CS: CipherSuite> RegistrationRequest<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, RegistrationRequestLen<CS>> {
        self.blinded_element.serialize()
    }

    /// Deserialization from bytes, rejecting trailing input
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        let blinded_element =
            input.take_array::<<OprfGroup<CS> as Group>::ElemLen>("blinded element")?;

        Ok(Self {
            blinded_element: oprf::BlindedElement::deserialize(&blinded_element)?,
        })
    }
}

/// The answer sent by the server to the user, upon reception of the
/// registration attempt
#[derive_where(Clone)]
#[derive_where(
    Debug, Eq, Hash, Ord, PartialEq, PartialOrd;
    oprf::EvaluationElement<CS::OprfCs>,
    <CS::KeGroup as KeGroup>::Pk,
)]
pub struct RegistrationResponse<CS: CipherSuite> {
    /// the server's oprf output
    pub(crate) evaluation_element: oprf::EvaluationElement<CS::OprfCs>,
    /// server's static public key
    pub(crate) server_s_pk: PublicKey<CS::KeGroup>,
}

impl<CS: CipherSuite> RegistrationResponse<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, RegistrationResponseLen<CS>>
    where
        // RegistrationResponse: Elem + KePk
        <OprfGroup<CS> as Group>::ElemLen: Add<<CS::KeGroup as KeGroup>::PkLen>,
        RegistrationResponseLen<CS>: ArrayLength<u8>,
    {
        self.evaluation_element
            .serialize()
            .concat(self.server_s_pk.serialize())
    }

    /// Deserialization from bytes, rejecting trailing input
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        let evaluation_element =
            input.take_array::<<OprfGroup<CS> as Group>::ElemLen>("evaluation element")?;

        Ok(Self {
            evaluation_element: oprf::EvaluationElement::deserialize(&evaluation_element)?,
            server_s_pk: PublicKey::deserialize_take(input)?,
        })
    }
}

/// The final message from the client, containing sealed cryptographic
/// identifiers
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; <CS::KeGroup as KeGroup>::Pk)]
pub struct RegistrationUpload<CS: CipherSuite> {
    /// The client's static public key
    pub(crate) client_s_pk: PublicKey<CS::KeGroup>,
    /// The masking key used to mask the credential response
    pub(crate) masking_key: Output<OprfHash<CS>>,
    /// The sealed envelope
    pub(crate) envelope: Envelope<CS>,
}

impl<CS: CipherSuite> RegistrationUpload<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, RegistrationUploadLen<CS>>
    where
        // Envelope: Nonce + Hash
        NonceLen: Add<OutputSize<OprfHash<CS>>>,
        EnvelopeLen<CS>: ArrayLength<u8>,
        // RegistrationUpload: (KePk + Hash) + Envelope
        <CS::KeGroup as KeGroup>::PkLen: Add<OutputSize<OprfHash<CS>>>,
        Sum<<CS::KeGroup as KeGroup>::PkLen, OutputSize<OprfHash<CS>>>:
            ArrayLength<u8> + Add<EnvelopeLen<CS>>,
        RegistrationUploadLen<CS>: ArrayLength<u8>,
    {
        self.client_s_pk
            .serialize()
            .concat(self.masking_key.clone())
            .concat(self.envelope.serialize())
    }

    /// Deserialization from bytes, rejecting trailing input
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            client_s_pk: PublicKey::deserialize_take(input)?,
            masking_key: input.take_array("masking key")?,
            envelope: Envelope::deserialize_take(input)?,
        })
    }

    // Creates a fake record, for login attempts against unregistered client
    // identifiers.
    pub(crate) fn dummy<R: RngCore + CryptoRng>(
        rng: &mut R,
        server_setup: &ServerSetup<CS>,
    ) -> Self {
        let mut masking_key = Output::<OprfHash<CS>>::default();
        rng.fill_bytes(&mut masking_key);

        Self {
            client_s_pk: server_setup.fake_keypair.public().clone(),
            masking_key,
            envelope: Envelope::dummy(),
        }
    }
}

////////////////////
// Login Messages //
// ============== //
////////////////////

/// The credential retrieval half of the first login message
#[derive_where(Clone)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; oprf::BlindedElement<CS::OprfCs>)]
pub struct CredentialRequest<CS: CipherSuite> {
    /// blinded password information
    pub(crate) blinded_element: oprf::BlindedElement<CS::OprfCs>,
}

impl<CS: CipherSuite> CredentialRequest<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, CredentialRequestLen<CS>> {
        self.blinded_element.serialize()
    }

    /// Deserialization from bytes, rejecting trailing input
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        let blinded_element =
            input.take_array::<<OprfGroup<CS> as Group>::ElemLen>("blinded element")?;

        Ok(Self {
            blinded_element: oprf::BlindedElement::deserialize(&blinded_element)?,
        })
    }
}

/// The credential retrieval half of the second login message: the evaluated
/// element plus the masked server public key and envelope
#[derive_where(Clone)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; oprf::EvaluationElement<CS::OprfCs>)]
pub struct CredentialResponse<CS: CipherSuite>
where
    // MaskedResponse: (KePk + Nonce) + Hash
    <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
    Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
    MaskedResponseLen<CS>: ArrayLength<u8>,
{
    /// the server's oprf output
    pub(crate) evaluation_element: oprf::EvaluationElement<CS::OprfCs>,
    pub(crate) masking_nonce: GenericArray<u8, NonceLen>,
    pub(crate) masked_response: GenericArray<u8, MaskedResponseLen<CS>>,
}

impl<CS: CipherSuite> CredentialResponse<CS>
where
    <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
    Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
    MaskedResponseLen<CS>: ArrayLength<u8>,
{
    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, CredentialResponseLen<CS>>
    where
        // CredentialResponse: (Elem + Nonce) + MaskedResponse
        <OprfGroup<CS> as Group>::ElemLen: Add<NonceLen>,
        Sum<<OprfGroup<CS> as Group>::ElemLen, NonceLen>:
            ArrayLength<u8> + Add<MaskedResponseLen<CS>>,
        CredentialResponseLen<CS>: ArrayLength<u8>,
    {
        self.evaluation_element
            .serialize()
            .concat(self.masking_nonce)
            .concat(self.masked_response.clone())
    }

    /// Deserialization from bytes, rejecting trailing input
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        let evaluation_element =
            input.take_array::<<OprfGroup<CS> as Group>::ElemLen>("evaluation element")?;

        Ok(Self {
            evaluation_element: oprf::EvaluationElement::deserialize(&evaluation_element)?,
            masking_nonce: input.take_array("masking nonce")?,
            masked_response: input.take_array("masked response")?,
        })
    }
}

/// The message sent by the user to the server, to initiate a login
#[derive_where(Clone)]
#[derive_where(
    Debug, Eq, Hash, Ord, PartialEq, PartialOrd;
    oprf::BlindedElement<CS::OprfCs>,
    <CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE1Message,
)]
pub struct Ke1<CS: CipherSuite> {
    pub(crate) credential_request: CredentialRequest<CS>,
    pub(crate) ke1_message: <CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE1Message,
}

impl<CS: CipherSuite> Ke1<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, Ke1Len<CS>>
    where
        // Ke1: CredentialRequest + Ke1Message
        CredentialRequestLen<CS>: Add<Ke1MessageLen<CS>>,
        Ke1Len<CS>: ArrayLength<u8>,
    {
        self.credential_request
            .serialize()
            .concat(self.ke1_message.serialize())
    }

    /// Deserialization from bytes, rejecting trailing input
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            credential_request: CredentialRequest::deserialize_take(input)?,
            ke1_message: Deserialize::deserialize_take(input)?,
        })
    }
}

/// The answer sent by the server to the user, upon reception of the login
/// attempt
#[derive_where(Clone)]
#[derive_where(
    Debug, Eq, Hash, Ord, PartialEq, PartialOrd;
    oprf::EvaluationElement<CS::OprfCs>,
    <CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE2Message,
)]
pub struct Ke2<CS: CipherSuite>
where
    // MaskedResponse: (KePk + Nonce) + Hash
    <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
    Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
    MaskedResponseLen<CS>: ArrayLength<u8>,
{
    pub(crate) credential_response: CredentialResponse<CS>,
    pub(crate) ke2_message: <CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE2Message,
}

impl<CS: CipherSuite> Ke2<CS>
where
    <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
    Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
    MaskedResponseLen<CS>: ArrayLength<u8>,
{
    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, Ke2Len<CS>>
    where
        // CredentialResponse: (Elem + Nonce) + MaskedResponse
        <OprfGroup<CS> as Group>::ElemLen: Add<NonceLen>,
        Sum<<OprfGroup<CS> as Group>::ElemLen, NonceLen>:
            ArrayLength<u8> + Add<MaskedResponseLen<CS>>,
        // Ke2: CredentialResponse + Ke2Message
        CredentialResponseLen<CS>: ArrayLength<u8> + Add<Ke2MessageLen<CS>>,
        Ke2Len<CS>: ArrayLength<u8>,
    {
        self.credential_response
            .serialize()
            .concat(self.ke2_message.serialize())
    }

    /// Deserialization from bytes, rejecting trailing input
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            credential_response: CredentialResponse::deserialize_take(input)?,
            ke2_message: Deserialize::deserialize_take(input)?,
        })
    }
}

/// The answer sent by the client to the server, upon reception of the
/// server's response
#[derive_where(Clone)]
#[derive_where(
    Debug, Eq, Hash, Ord, PartialEq, PartialOrd;
    <CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE3Message,
)]
pub struct Ke3<CS: CipherSuite> {
    pub(crate) ke3_message: <CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE3Message,
}

impl<CS: CipherSuite> Ke3<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, Ke3Len<CS>> {
        self.ke3_message.serialize()
    }

    /// Deserialization from bytes, rejecting trailing input
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            ke3_message: Deserialize::deserialize_take(input)?,
        })
    }
}

///////////////////////
// Recovery Messages //
// ================= //
///////////////////////

/// The message sent by the client to the server to initiate a credential
/// recovery
#[derive_where(Clone)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; oprf::BlindedElement<CS::OprfCs>)]
pub struct RecoverRequest<CS: CipherSuite> {
    pub(crate) credential_request: CredentialRequest<CS>,
}

impl<CS: CipherSuite> RecoverRequest<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, RecoverRequestLen<CS>> {
        self.credential_request.serialize()
    }

    /// Deserialization from bytes, rejecting trailing input
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            credential_request: CredentialRequest::deserialize_take(input)?,
        })
    }
}

/// The answer sent by the server to the client, upon reception of a recovery
/// attempt. Identical in shape to the credential half of [`Ke2`]; recovery
/// runs no key exchange on top of it.
#[derive_where(Clone)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; oprf::EvaluationElement<CS::OprfCs>)]
pub struct RecoverResponse<CS: CipherSuite>
where
    // MaskedResponse: (KePk + Nonce) + Hash
    <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
    Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
    MaskedResponseLen<CS>: ArrayLength<u8>,
{
    pub(crate) credential_response: CredentialResponse<CS>,
}

impl<CS: CipherSuite> RecoverResponse<CS>
where
    <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
    Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
    MaskedResponseLen<CS>: ArrayLength<u8>,
{
    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, RecoverResponseLen<CS>>
    where
        // CredentialResponse: (Elem + Nonce) + MaskedResponse
        <OprfGroup<CS> as Group>::ElemLen: Add<NonceLen>,
        Sum<<OprfGroup<CS> as Group>::ElemLen, NonceLen>:
            ArrayLength<u8> + Add<MaskedResponseLen<CS>>,
        RecoverResponseLen<CS>: ArrayLength<u8>,
    {
        self.credential_response.serialize()
    }

    /// Deserialization from bytes, rejecting trailing input
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;
        let result = Self::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(result)
    }

    pub(crate) fn deserialize_take(input: &mut &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            credential_response: CredentialResponse::deserialize_take(input)?,
        })
    }
}
