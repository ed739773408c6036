// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Provides the main OPAQUE API

use alloc::vec::Vec;
use core::ops::Add;

use derive_where::derive_where;
use digest::Output;
use generic_array::sequence::Concat;
use generic_array::typenum::Sum;
use generic_array::{ArrayLength, GenericArray};
use hkdf::{Hkdf, HkdfExtract};
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::ciphersuite::{CipherSuite, OprfGroup, OprfHash};
use crate::envelope::{Envelope, EnvelopeLen};
use crate::errors::{InternalError, ProtocolError};
use crate::hash::OutputSize;
use crate::key_exchange::group::KeGroup;
use crate::key_exchange::shared::{generate_nonce, NonceLen, STR_OPAQUE_DERIVE_KEY_PAIR};
use crate::key_exchange::{
    Deserialize, Ke2StateLen, KeyExchange, Serialize, SerializedContext, SerializedIdentifiers,
};
use crate::keypair::{KeyPair, PrivateKey, PublicKey};
use crate::ksf::Ksf;
use crate::messages::{
    CredentialRequest, CredentialResponse, CredentialResponseLen, Ke1, Ke2, Ke3,
    MaskedResponseLen, RegistrationRequest, RegistrationResponse, RegistrationUpload,
    RegistrationUploadLen,
};
use crate::oprf::{self, Group};
use crate::serialization::SliceExt;

///////////////
// Constants //
// ========= //
///////////////

static STR_CREDENTIAL_RESPONSE_PAD: &[u8] = b"CredentialResponsePad";
static STR_MASKING_KEY: &[u8] = b"MaskingKey";
static STR_OPRF_KEY: &[u8] = b"OprfKey";

///////////////////
// State Lengths //
// ============= //
///////////////////

/// Length of [`ServerSetup`] in bytes for serialization.
pub type ServerSetupLen<CS: CipherSuite> = Sum<
    Sum<OutputSize<OprfHash<CS>>, <CS::KeGroup as KeGroup>::SkLen>,
    <CS::KeGroup as KeGroup>::SkLen,
>;

/// Length of [`ClientRegistration`] in bytes for serialization.
pub type ClientRegistrationLen<CS: CipherSuite> =
    Sum<<OprfGroup<CS> as Group>::ScalarLen, <OprfGroup<CS> as Group>::ElemLen>;

/// Length of [`ServerRegistration`] in bytes for serialization.
pub type ServerRegistrationLen<CS: CipherSuite> = RegistrationUploadLen<CS>;

/// Length of [`ServerLogin`] in bytes for serialization.
pub type ServerLoginLen<CS: CipherSuite> = Ke2StateLen<CS>;

////////////////////////////
// High-level API Structs //
// ====================== //
////////////////////////////

/// The state elements the server holds upon setup
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(
    Debug, Eq, Hash, Ord, PartialEq, PartialOrd;
    <CS::KeGroup as KeGroup>::Pk,
    <CS::KeGroup as KeGroup>::Sk,
)]
pub struct ServerSetup<CS: CipherSuite> {
    pub(crate) oprf_seed: Output<OprfHash<CS>>,
    keypair: KeyPair<CS::KeGroup>,
    pub(crate) fake_keypair: KeyPair<CS::KeGroup>,
}

/// The state elements the client holds upon registration
#[derive_where(Clone)]
#[derive_where(
    Debug, Eq, Hash, Ord, PartialEq, PartialOrd;
    oprf::OprfClient<CS::OprfCs>,
    oprf::BlindedElement<CS::OprfCs>,
)]
pub struct ClientRegistration<CS: CipherSuite> {
    pub(crate) oprf_client: oprf::OprfClient<CS::OprfCs>,
    pub(crate) blinded_element: oprf::BlindedElement<CS::OprfCs>,
}

/// The state elements the server holds upon registration, which is identical
/// to the registration record uploaded by the client
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; <CS::KeGroup as KeGroup>::Pk)]
pub struct ServerRegistration<CS: CipherSuite>(pub(crate) RegistrationUpload<CS>);

/// The state elements the client holds upon login
#[derive_where(Clone)]
pub struct ClientLogin<CS: CipherSuite> {
    pub(crate) oprf_client: oprf::OprfClient<CS::OprfCs>,
    pub(crate) ke1_state: <CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE1State,
    pub(crate) credential_request: CredentialRequest<CS>,
    pub(crate) password: Zeroizing<Vec<u8>>,
}

/// The state elements the server holds upon login
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(
    Debug, Eq, Hash, Ord, PartialEq, PartialOrd;
    <CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE2State,
)]
pub struct ServerLogin<CS: CipherSuite> {
    pub(crate) ke2_state: <CS::KeyExchange as KeyExchange<OprfHash<CS>, CS::KeGroup>>::KE2State,
}

////////////////////////////////
// High-level Implementations //
// ========================== //
////////////////////////////////

impl<CS: CipherSuite> ServerSetup<CS> {
    /// Generate a new instance of server setup
    pub fn new<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let keypair = KeyPair::generate_random(rng);
        Self::new_with_key_pair(rng, keypair)
    }

    /// Create [`ServerSetup`] with the given keypair
    pub fn new_with_key_pair<R: CryptoRng + RngCore>(
        rng: &mut R,
        keypair: KeyPair<CS::KeGroup>,
    ) -> Self {
        let mut oprf_seed = Output::<OprfHash<CS>>::default();
        rng.fill_bytes(&mut oprf_seed);

        Self {
            oprf_seed,
            keypair,
            fake_keypair: KeyPair::generate_random(rng),
        }
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, ServerSetupLen<CS>>
    where
        // ServerSetup: (Hash + KeSk) + KeSk
        OutputSize<OprfHash<CS>>: Add<<CS::KeGroup as KeGroup>::SkLen>,
        Sum<OutputSize<OprfHash<CS>>, <CS::KeGroup as KeGroup>::SkLen>:
            ArrayLength<u8> + Add<<CS::KeGroup as KeGroup>::SkLen>,
        ServerSetupLen<CS>: ArrayLength<u8>,
    {
        self.oprf_seed
            .clone()
            .concat(self.keypair.private().serialize())
            .concat(self.fake_keypair.private().serialize())
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;

        let oprf_seed = input.take_array("oprf seed")?;
        let keypair = KeyPair::from_private_key(PrivateKey::deserialize_take(&mut input)?);
        let fake_keypair = KeyPair::from_private_key(PrivateKey::deserialize_take(&mut input)?);

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(Self {
            oprf_seed,
            keypair,
            fake_keypair,
        })
    }

    /// Returns the keypair
    pub fn keypair(&self) -> &KeyPair<CS::KeGroup> {
        &self.keypair
    }
}

impl<CS: CipherSuite> ClientRegistration<CS> {
    /// Returns an initial "blinded" request to send to the server, as well as
    /// a [`ClientRegistration`]
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        password: &[u8],
    ) -> Result<ClientRegistrationStartResult<CS>, ProtocolError> {
        let blind_result = oprf::OprfClient::blind(password, rng)?;

        Ok(ClientRegistrationStartResult {
            message: RegistrationRequest {
                blinded_element: blind_result.message.clone(),
            },
            state: Self {
                oprf_client: blind_result.state,
                blinded_element: blind_result.message,
            },
        })
    }

    /// "Unblinds" the server's answer and returns a final message containing
    /// cryptographic identifiers, to be sent to the server
    pub fn finish<R: CryptoRng + RngCore>(
        self,
        rng: &mut R,
        password: &[u8],
        registration_response: RegistrationResponse<CS>,
        params: ClientRegistrationFinishParameters<'_, '_, CS>,
    ) -> Result<ClientRegistrationFinishResult<CS>, ProtocolError> {
        // Check for a reflected value from the server
        if bool::from(
            registration_response
                .evaluation_element
                .0
                .ct_eq(&self.blinded_element.0),
        ) {
            return Err(ProtocolError::ReflectedValueError);
        }

        #[cfg_attr(not(test), allow(unused_variables))]
        let (randomized_pwd, randomized_pwd_hasher) = get_password_derived_key::<CS>(
            password,
            self.oprf_client.clone(),
            &registration_response.evaluation_element,
            params.ksf,
        )?;

        let masking_key = derive_masking_key::<CS>(&randomized_pwd_hasher)?;

        let result = Envelope::<CS>::seal(
            rng,
            randomized_pwd_hasher,
            &registration_response.server_s_pk,
            params.identifiers,
        )?;

        Ok(ClientRegistrationFinishResult {
            message: RegistrationUpload {
                envelope: result.0,
                masking_key,
                client_s_pk: result.1,
            },
            export_key: result.2,
            server_s_pk: registration_response.server_s_pk,
            #[cfg(test)]
            state: self,
            #[cfg(test)]
            randomized_pwd,
        })
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, ClientRegistrationLen<CS>>
    where
        // ClientRegistration: Scalar + Elem
        <OprfGroup<CS> as Group>::ScalarLen: Add<<OprfGroup<CS> as Group>::ElemLen>,
        ClientRegistrationLen<CS>: ArrayLength<u8>,
    {
        self.oprf_client
            .serialize()
            .concat(self.blinded_element.serialize())
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;

        let oprf_client = input.take_array::<<OprfGroup<CS> as Group>::ScalarLen>("oprf client")?;
        let blinded_element =
            input.take_array::<<OprfGroup<CS> as Group>::ElemLen>("blinded element")?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(Self {
            oprf_client: oprf::OprfClient::deserialize(&oprf_client)?,
            blinded_element: oprf::BlindedElement::deserialize(&blinded_element)?,
        })
    }
}

impl<CS: CipherSuite> ServerRegistration<CS> {
    /// From the client's "blinded" password, returns a response to be sent
    /// back to the client, as well as a [`ServerRegistration`]
    pub fn start(
        server_setup: &ServerSetup<CS>,
        message: RegistrationRequest<CS>,
        credential_identifier: &[u8],
    ) -> Result<ServerRegistrationStartResult<CS>, ProtocolError> {
        let oprf_server = oprf_key_from_seed::<CS>(&server_setup.oprf_seed, credential_identifier)?;

        let evaluation_element = oprf_server.blind_evaluate(&message.blinded_element);

        Ok(ServerRegistrationStartResult {
            message: RegistrationResponse {
                evaluation_element,
                server_s_pk: server_setup.keypair.public().clone(),
            },
            #[cfg(test)]
            oprf_key: oprf_server.serialize(),
        })
    }

    /// From the client's cryptographic identifiers, fully populates and
    /// returns a [`ServerRegistration`]
    pub fn finish(message: RegistrationUpload<CS>) -> Self {
        Self(message)
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, ServerRegistrationLen<CS>>
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
        self.0.serialize()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        RegistrationUpload::deserialize(input).map(Self)
    }
}

impl<CS: CipherSuite> ClientLogin<CS> {
    /// Returns an initial "blinded" password request to send to the server, as
    /// well as a [`ClientLogin`]
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        password: &[u8],
    ) -> Result<ClientLoginStartResult<CS>, ProtocolError> {
        let blind_result = oprf::OprfClient::blind(password, rng)?;

        let credential_request = CredentialRequest {
            blinded_element: blind_result.message,
        };

        let (ke1_state, ke1_message) = CS::KeyExchange::generate_ke1(rng)?;

        Ok(ClientLoginStartResult {
            message: Ke1 {
                credential_request: credential_request.clone(),
                ke1_message,
            },
            state: Self {
                oprf_client: blind_result.state,
                ke1_state,
                credential_request,
                password: Zeroizing::new(password.to_vec()),
            },
        })
    }

    /// "Unblinds" the server's answer, recovers the envelope contents and
    /// completes the key exchange, returning a final message for the server
    pub fn finish(
        self,
        ke2: Ke2<CS>,
        params: ClientLoginFinishParameters<'_, '_, '_, CS>,
    ) -> Result<ClientLoginFinishResult<CS>, ProtocolError>
    where
        // MaskedResponse: (KePk + Nonce) + Hash
        <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
        Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
        MaskedResponseLen<CS>: ArrayLength<u8>,
        // CredentialResponse: (Elem + Nonce) + MaskedResponse
        <OprfGroup<CS> as Group>::ElemLen: Add<NonceLen>,
        Sum<<OprfGroup<CS> as Group>::ElemLen, NonceLen>:
            ArrayLength<u8> + Add<MaskedResponseLen<CS>>,
        CredentialResponseLen<CS>: ArrayLength<u8>,
    {
        // Check for a reflected value from the server
        if bool::from(
            ke2.credential_response
                .evaluation_element
                .0
                .ct_eq(&self.credential_request.blinded_element.0),
        ) {
            return Err(ProtocolError::ReflectedValueError);
        }

        let (_, randomized_pwd_hasher) = get_password_derived_key::<CS>(
            &self.password,
            self.oprf_client.clone(),
            &ke2.credential_response.evaluation_element,
            params.ksf,
        )?;

        let masking_key = derive_masking_key::<CS>(&randomized_pwd_hasher)?;

        let (server_s_pk, envelope) = unmask_response::<CS>(
            &masking_key,
            &ke2.credential_response.masking_nonce,
            &ke2.credential_response.masked_response,
        )?;

        let opened_envelope = envelope.open(
            randomized_pwd_hasher,
            &server_s_pk,
            params.identifiers,
        )?;

        let serialized_credential_request = self.credential_request.serialize();
        let serialized_credential_response = ke2.credential_response.serialize();
        let context = SerializedContext::from(params.context)?;

        let result = CS::KeyExchange::generate_ke3(
            &serialized_credential_request,
            &serialized_credential_response,
            ke2.ke2_message,
            &self.ke1_state,
            server_s_pk.clone(),
            opened_envelope.client_static_keypair.private().clone(),
            opened_envelope.identifiers,
            context,
        )?;

        Ok(ClientLoginFinishResult {
            message: Ke3 {
                ke3_message: result.message,
            },
            session_key: result.session_key,
            export_key: opened_envelope.export_key,
            server_s_pk,
            #[cfg(test)]
            handshake_secret: result.handshake_secret,
        })
    }

    /// Serialization into bytes
    ///
    /// The password occupies the variable-length tail of the output.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = self.oprf_client.serialize().to_vec();
        bytes.extend_from_slice(&self.ke1_state.serialize());
        bytes.extend_from_slice(&self.credential_request.serialize());
        bytes.extend_from_slice(&self.password);
        bytes
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;

        let oprf_client = input.take_array::<<OprfGroup<CS> as Group>::ScalarLen>("oprf client")?;
        let ke1_state = Deserialize::deserialize_take(&mut input)?;
        let credential_request = CredentialRequest::deserialize_take(&mut input)?;
        let password = Zeroizing::new(input.to_vec());

        Ok(Self {
            oprf_client: oprf::OprfClient::deserialize(&oprf_client)?,
            ke1_state,
            credential_request,
            password,
        })
    }
}

impl<CS: CipherSuite> ServerLogin<CS> {
    /// From the client's "blinded" password, returns a challenge to be sent
    /// back to the client, as well as a [`ServerLogin`]
    ///
    /// If no password file is supplied, the server runs the flow against a
    /// fake record so that the response is indistinguishable from that of a
    /// registered client.
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        server_setup: &ServerSetup<CS>,
        password_file: Option<ServerRegistration<CS>>,
        ke1: Ke1<CS>,
        credential_identifier: &[u8],
        ServerLoginStartParameters {
            context,
            identifiers,
        }: ServerLoginStartParameters<'_, '_>,
    ) -> Result<ServerLoginStartResult<CS>, ProtocolError>
    where
        // MaskedResponse: (KePk + Nonce) + Hash
        <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
        Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
        MaskedResponseLen<CS>: ArrayLength<u8>,
        // Envelope: Nonce + Hash
        NonceLen: Add<OutputSize<OprfHash<CS>>>,
        EnvelopeLen<CS>: ArrayLength<u8>,
        // CredentialResponse: (Elem + Nonce) + MaskedResponse
        <OprfGroup<CS> as Group>::ElemLen: Add<NonceLen>,
        Sum<<OprfGroup<CS> as Group>::ElemLen, NonceLen>:
            ArrayLength<u8> + Add<MaskedResponseLen<CS>>,
        CredentialResponseLen<CS>: ArrayLength<u8>,
    {
        let record = match password_file {
            Some(x) => x,
            None => ServerRegistration(RegistrationUpload::dummy(rng, server_setup)),
        };

        let client_s_pk = record.0.client_s_pk.clone();
        let context = SerializedContext::from(context)?;
        let server_s_sk = server_setup.keypair.private();
        let server_s_pk = server_setup.keypair.public();

        let masking_nonce = generate_nonce::<R>(rng);

        let masked_response = mask_response::<CS>(
            &record.0.masking_key,
            &masking_nonce,
            server_s_pk,
            &record.0.envelope,
        )?;

        let oprf_server = oprf_key_from_seed::<CS>(&server_setup.oprf_seed, credential_identifier)?;
        let evaluation_element = oprf_server.blind_evaluate(&ke1.credential_request.blinded_element);

        let credential_response = CredentialResponse {
            evaluation_element,
            masking_nonce,
            masked_response,
        };

        let identifiers = SerializedIdentifiers::<CS::KeGroup>::from_identifiers(
            identifiers,
            client_s_pk.serialize(),
            server_s_pk.serialize(),
        )?;

        let serialized_credential_request = ke1.credential_request.serialize();
        let serialized_credential_response = credential_response.serialize();

        let result = CS::KeyExchange::generate_ke2(
            rng,
            &serialized_credential_request,
            &serialized_credential_response,
            ke1.ke1_message,
            client_s_pk,
            server_s_sk,
            identifiers,
            context,
        )?;

        Ok(ServerLoginStartResult {
            message: Ke2 {
                credential_response,
                ke2_message: result.message,
            },
            state: Self {
                ke2_state: result.state,
            },
            #[cfg(test)]
            handshake_secret: result.handshake_secret,
            #[cfg(test)]
            server_mac_key: result.km2,
        })
    }

    /// From the client's second and final message, check the client's
    /// authentication and produce a message transport
    pub fn finish(self, ke3: Ke3<CS>) -> Result<ServerLoginFinishResult<CS>, ProtocolError> {
        let session_key = CS::KeyExchange::finish_ke(ke3.ke3_message, &self.ke2_state)?;

        Ok(ServerLoginFinishResult { session_key })
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> GenericArray<u8, ServerLoginLen<CS>> {
        self.ke2_state.serialize()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;

        let ke2_state = Deserialize::deserialize_take(&mut input)?;

        if !input.is_empty() {
            return Err(ProtocolError::SerializationError);
        }

        Ok(Self { ke2_state })
    }
}

/////////////////////////
// Convenience Structs //
// =================== //
/////////////////////////

/// Optional client and server identifiers to be bound into the envelope and
/// the login transcript. Each identifier defaults to the corresponding
/// serialized static public key when absent.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Identifiers<'a> {
    /// Client identifier
    pub client: Option<&'a [u8]>,
    /// Server identifier
    pub server: Option<&'a [u8]>,
}

/// Contains the fields that are returned by a client registration start
#[derive_where(Clone)]
pub struct ClientRegistrationStartResult<CS: CipherSuite> {
    /// The registration request message to be sent to the server
    pub message: RegistrationRequest<CS>,
    /// The client state that must be persisted in order to complete
    /// registration
    pub state: ClientRegistration<CS>,
}

/// Optional parameters for client registration finish
#[derive_where(Clone, Default)]
pub struct ClientRegistrationFinishParameters<'i, 'h, CS: CipherSuite> {
    /// Specifying the identifiers idU and idS
    pub identifiers: Identifiers<'i>,
    /// Specifying a configuration for the key stretching function
    pub ksf: Option<&'h CS::Ksf>,
}

/// Contains the fields that are returned by a client registration finish
#[derive_where(Clone)]
pub struct ClientRegistrationFinishResult<CS: CipherSuite> {
    /// The registration upload message to be sent to the server
    pub message: RegistrationUpload<CS>,
    /// The export key output by client registration
    pub export_key: Output<OprfHash<CS>>,
    /// The server's static public key
    pub server_s_pk: PublicKey<CS::KeGroup>,
    /// Instance of the client registration, only used in tests for checking
    /// zeroize
    #[cfg(test)]
    pub state: ClientRegistration<CS>,
    /// The hardened password output, only used in tests
    #[cfg(test)]
    pub randomized_pwd: Output<OprfHash<CS>>,
}

/// Contains the fields that are returned by a server registration start
#[derive_where(Clone)]
pub struct ServerRegistrationStartResult<CS: CipherSuite> {
    /// The registration response message to send to the client
    pub message: RegistrationResponse<CS>,
    /// The per-credential OPRF key, only used in tests
    #[cfg(test)]
    pub oprf_key: GenericArray<u8, <OprfGroup<CS> as Group>::ScalarLen>,
}

/// Contains the fields that are returned by a client login start
#[derive_where(Clone)]
pub struct ClientLoginStartResult<CS: CipherSuite> {
    /// The message to send to the server to begin the login protocol
    pub message: Ke1<CS>,
    /// The state that the client must keep in order to complete the protocol
    pub state: ClientLogin<CS>,
}

/// Optional parameters for client login finish
#[derive_where(Clone, Default)]
pub struct ClientLoginFinishParameters<'c, 'i, 'h, CS: CipherSuite> {
    /// Specifying a context field that the server must agree on
    pub context: Option<&'c [u8]>,
    /// Specifying the identifiers idU and idS
    pub identifiers: Identifiers<'i>,
    /// Specifying a configuration for the key stretching function
    pub ksf: Option<&'h CS::Ksf>,
}

/// Contains the fields that are returned by a client login finish
#[derive_where(Clone)]
pub struct ClientLoginFinishResult<CS: CipherSuite> {
    /// The message to send to the server to complete the protocol
    pub message: Ke3<CS>,
    /// The session key
    pub session_key: Output<OprfHash<CS>>,
    /// The client-side export key
    pub export_key: Output<OprfHash<CS>>,
    /// The server's static public key
    pub server_s_pk: PublicKey<CS::KeGroup>,
    /// The handshake secret, only used in tests
    #[cfg(test)]
    pub handshake_secret: Output<OprfHash<CS>>,
}

/// Optional parameters for server login start
#[derive(Clone, Debug, Default)]
pub struct ServerLoginStartParameters<'c, 'i> {
    /// Specifying a context field that the client must agree on
    pub context: Option<&'c [u8]>,
    /// Specifying the identifiers idU and idS
    pub identifiers: Identifiers<'i>,
}

/// Contains the fields that are returned by a server login start
#[derive_where(Clone)]
pub struct ServerLoginStartResult<CS: CipherSuite>
where
    // MaskedResponse: (KePk + Nonce) + Hash
    <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
    Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
    MaskedResponseLen<CS>: ArrayLength<u8>,
{
    /// The message to send back to the client
    pub message: Ke2<CS>,
    /// The state that the server must keep in order to finish the protocol
    pub state: ServerLogin<CS>,
    /// The handshake secret, only used in tests
    #[cfg(test)]
    pub handshake_secret: Output<OprfHash<CS>>,
    /// The server MAC key, only used in tests
    #[cfg(test)]
    pub server_mac_key: Output<OprfHash<CS>>,
}

/// Contains the fields that are returned by a server login finish
#[derive_where(Clone)]
pub struct ServerLoginFinishResult<CS: CipherSuite> {
    /// The session key
    pub session_key: Output<OprfHash<CS>>,
}

//////////////////////
// Helper functions //
// ================ //
//////////////////////

/// Derives the randomized password from the OPRF output and the key
/// stretching function, returning it together with an extracted HKDF instance
pub(crate) fn get_password_derived_key<CS: CipherSuite>(
    password: &[u8],
    oprf_client: oprf::OprfClient<CS::OprfCs>,
    evaluation_element: &oprf::EvaluationElement<CS::OprfCs>,
    ksf: Option<&CS::Ksf>,
) -> Result<(Output<OprfHash<CS>>, Hkdf<OprfHash<CS>>), ProtocolError> {
    let oprf_output = oprf_client.finalize(password, evaluation_element)?;

    let hardened_output = match ksf {
        Some(ksf) => ksf.hash(oprf_output.clone()),
        None => CS::Ksf::default().hash(oprf_output.clone()),
    }
    .map_err(ProtocolError::from)?;

    let mut hkdf = HkdfExtract::<OprfHash<CS>>::new(None);
    hkdf.input_ikm(&oprf_output);
    hkdf.input_ikm(&hardened_output);
    Ok(hkdf.finalize())
}

pub(crate) fn derive_masking_key<CS: CipherSuite>(
    randomized_pwd_hasher: &Hkdf<OprfHash<CS>>,
) -> Result<Output<OprfHash<CS>>, ProtocolError> {
    let mut masking_key = Output::<OprfHash<CS>>::default();
    randomized_pwd_hasher
        .expand(STR_MASKING_KEY, &mut masking_key)
        .map_err(|_| InternalError::HkdfError)?;
    Ok(masking_key)
}

/// Derives the per-credential OPRF key from the server's OPRF seed and the
/// credential identifier
pub(crate) fn oprf_key_from_seed<CS: CipherSuite>(
    oprf_seed: &Output<OprfHash<CS>>,
    credential_identifier: &[u8],
) -> Result<oprf::OprfServer<CS::OprfCs>, ProtocolError> {
    let mut oprf_key_seed =
        Zeroizing::new(GenericArray::<u8, <OprfGroup<CS> as Group>::ScalarLen>::default());
    Hkdf::<OprfHash<CS>>::from_prk(oprf_seed)
        .map_err(|_| InternalError::HkdfError)?
        .expand_multi_info(&[credential_identifier, STR_OPRF_KEY], &mut oprf_key_seed)
        .map_err(|_| InternalError::HkdfError)?;

    Ok(oprf::OprfServer::new_from_seed(
        &oprf_key_seed,
        STR_OPAQUE_DERIVE_KEY_PAIR,
    )?)
}

/// Pads and XORs the serialized server public key and envelope with an
/// HKDF-expanded mask
pub(crate) fn mask_response<CS: CipherSuite>(
    masking_key: &[u8],
    masking_nonce: &[u8],
    server_s_pk: &PublicKey<CS::KeGroup>,
    envelope: &Envelope<CS>,
) -> Result<GenericArray<u8, MaskedResponseLen<CS>>, ProtocolError>
where
    // MaskedResponse: (KePk + Nonce) + Hash
    <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
    Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
    MaskedResponseLen<CS>: ArrayLength<u8>,
    // Envelope: Nonce + Hash
    NonceLen: Add<OutputSize<OprfHash<CS>>>,
    EnvelopeLen<CS>: ArrayLength<u8>,
{
    let mut xor_pad = GenericArray::<u8, MaskedResponseLen<CS>>::default();
    Hkdf::<OprfHash<CS>>::from_prk(masking_key)
        .map_err(|_| InternalError::HkdfError)?
        .expand_multi_info(&[masking_nonce, STR_CREDENTIAL_RESPONSE_PAD], &mut xor_pad)
        .map_err(|_| InternalError::HkdfError)?;

    for (x1, x2) in xor_pad.iter_mut().zip(
        server_s_pk
            .serialize()
            .iter()
            .chain(envelope.serialize().iter()),
    ) {
        *x1 ^= x2;
    }

    Ok(xor_pad)
}

/// Reverses the masking of a credential response, recovering the server
/// public key and the envelope
pub(crate) fn unmask_response<CS: CipherSuite>(
    masking_key: &[u8],
    masking_nonce: &[u8],
    masked_response: &[u8],
) -> Result<(PublicKey<CS::KeGroup>, Envelope<CS>), ProtocolError>
where
    // MaskedResponse: (KePk + Nonce) + Hash
    <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
    Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
    MaskedResponseLen<CS>: ArrayLength<u8>,
{
    let mut xor_pad = GenericArray::<u8, MaskedResponseLen<CS>>::default();
    Hkdf::<OprfHash<CS>>::from_prk(masking_key)
        .map_err(|_| InternalError::HkdfError)?
        .expand_multi_info(&[masking_nonce, STR_CREDENTIAL_RESPONSE_PAD], &mut xor_pad)
        .map_err(|_| InternalError::HkdfError)?;

    for (x1, x2) in xor_pad.iter_mut().zip(masked_response) {
        *x1 ^= x2;
    }

    let mut unmasked = xor_pad.as_slice();
    let server_s_pk = PublicKey::deserialize_take(&mut unmasked)?;
    let envelope = Envelope::deserialize_take(&mut unmasked)?;

    Ok((server_s_pk, envelope))
}
