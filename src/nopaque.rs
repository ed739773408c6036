// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Provides a two-message recovery flow which re-derives the client's export
//! key from a password, without running a key exchange.
//!
//! This flow is strictly weaker than a full login. It establishes no session
//! key and never authenticates the client to the server; the response is
//! only as trustworthy as the envelope check the client performs on it. Use
//! it to recover envelope-protected secrets, not to establish a channel.
//!
//! Registration records are shared with the full protocol: a client
//! registered through [`ClientRegistration`](crate::ClientRegistration) can
//! recover its export key here with no extra server-side setup.

use alloc::vec::Vec;
use core::marker::PhantomData;
use core::ops::Add;

use derive_where::derive_where;
use digest::Output;
use generic_array::typenum::Sum;
use generic_array::{ArrayLength, GenericArray};
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::ciphersuite::{CipherSuite, OprfGroup, OprfHash};
use crate::envelope::EnvelopeLen;
use crate::errors::ProtocolError;
use crate::hash::OutputSize;
use crate::key_exchange::group::KeGroup;
use crate::key_exchange::shared::{generate_nonce, NonceLen};
use crate::keypair::PublicKey;
use crate::messages::{
    CredentialRequest, CredentialResponse, MaskedResponseLen, RecoverRequest, RecoverResponse,
    RegistrationUpload,
};
use crate::opaque::{
    derive_masking_key, get_password_derived_key, mask_response, oprf_key_from_seed, unmask_response,
    Identifiers, ServerRegistration, ServerSetup,
};
use crate::oprf::{self, Group};
use crate::serialization::SliceExt;

////////////////////////////
// High-level API Structs //
// ====================== //
////////////////////////////

/// The state elements the client holds while recovering its export key
#[derive_where(Clone)]
pub struct ClientRecovery<CS: CipherSuite> {
    pub(crate) oprf_client: oprf::OprfClient<CS::OprfCs>,
    pub(crate) blinded_element: oprf::BlindedElement<CS::OprfCs>,
    pub(crate) password: Zeroizing<Vec<u8>>,
}

/// The server side of the recovery flow
///
/// Recovery is stateless for the server, so this type is never instantiated;
/// it only carries the [`start`](Self::start) operation.
pub struct ServerRecovery<CS: CipherSuite>(PhantomData<CS>);

////////////////////////////////
// High-level Implementations //
// ========================== //
////////////////////////////////

impl<CS: CipherSuite> ClientRecovery<CS> {
    /// Returns an initial "blinded" password request to send to the server,
    /// as well as a [`ClientRecovery`]
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        password: &[u8],
    ) -> Result<ClientRecoveryStartResult<CS>, ProtocolError> {
        let blind_result = oprf::OprfClient::blind(password, rng)?;

        Ok(ClientRecoveryStartResult {
            message: RecoverRequest {
                credential_request: CredentialRequest {
                    blinded_element: blind_result.message.clone(),
                },
            },
            state: Self {
                oprf_client: blind_result.state,
                blinded_element: blind_result.message,
                password: Zeroizing::new(password.to_vec()),
            },
        })
    }

    /// "Unblinds" the server's answer and recovers the envelope contents
    pub fn finish(
        self,
        response: RecoverResponse<CS>,
        params: ClientRecoveryFinishParameters<'_, '_, CS>,
    ) -> Result<ClientRecoveryFinishResult<CS>, ProtocolError>
    where
        // MaskedResponse: (KePk + Nonce) + Hash
        <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
        Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
        MaskedResponseLen<CS>: ArrayLength<u8>,
    {
        // Check for a reflected value from the server
        if bool::from(
            response
                .credential_response
                .evaluation_element
                .0
                .ct_eq(&self.blinded_element.0),
        ) {
            return Err(ProtocolError::ReflectedValueError);
        }

        let (_, randomized_pwd_hasher) = get_password_derived_key::<CS>(
            &self.password,
            self.oprf_client.clone(),
            &response.credential_response.evaluation_element,
            params.ksf,
        )?;

        let masking_key = derive_masking_key::<CS>(&randomized_pwd_hasher)?;

        let (server_s_pk, envelope) = unmask_response::<CS>(
            &masking_key,
            &response.credential_response.masking_nonce,
            &response.credential_response.masked_response,
        )?;

        let opened_envelope =
            envelope.open(randomized_pwd_hasher, &server_s_pk, params.identifiers)?;

        Ok(ClientRecoveryFinishResult {
            export_key: opened_envelope.export_key,
            server_s_pk,
        })
    }

    /// Serialization into bytes
    ///
    /// The password occupies the variable-length tail of the output.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = self.oprf_client.serialize().to_vec();
        bytes.extend_from_slice(&self.blinded_element.serialize());
        bytes.extend_from_slice(&self.password);
        bytes
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = input;

        let oprf_client = input.take_array::<<OprfGroup<CS> as Group>::ScalarLen>("oprf client")?;
        let blinded_element =
            input.take_array::<<OprfGroup<CS> as Group>::ElemLen>("blinded element")?;
        let password = Zeroizing::new(input.to_vec());

        Ok(Self {
            oprf_client: oprf::OprfClient::deserialize(&oprf_client)?,
            blinded_element: oprf::BlindedElement::deserialize(&blinded_element)?,
            password,
        })
    }
}

impl<CS: CipherSuite> ServerRecovery<CS> {
    /// From the client's "blinded" password, returns a response carrying the
    /// masked credentials, to be sent back to the client
    ///
    /// The server holds no state for recovery. If no password file is
    /// supplied, the flow runs against a fake record so that the response is
    /// indistinguishable from that of a registered client.
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        server_setup: &ServerSetup<CS>,
        password_file: Option<ServerRegistration<CS>>,
        request: RecoverRequest<CS>,
        credential_identifier: &[u8],
    ) -> Result<ServerRecoveryStartResult<CS>, ProtocolError>
    where
        // MaskedResponse: (KePk + Nonce) + Hash
        <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
        Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
        MaskedResponseLen<CS>: ArrayLength<u8>,
        // Envelope: Nonce + Hash
        NonceLen: Add<OutputSize<OprfHash<CS>>>,
        EnvelopeLen<CS>: ArrayLength<u8>,
    {
        let record = match password_file {
            Some(x) => x,
            None => ServerRegistration(RegistrationUpload::dummy(rng, server_setup)),
        };

        let masking_nonce = generate_nonce::<R>(rng);

        let masked_response = mask_response::<CS>(
            &record.0.masking_key,
            &masking_nonce,
            server_setup.keypair().public(),
            &record.0.envelope,
        )?;

        let oprf_server = oprf_key_from_seed::<CS>(&server_setup.oprf_seed, credential_identifier)?;
        let evaluation_element =
            oprf_server.blind_evaluate(&request.credential_request.blinded_element);

        Ok(ServerRecoveryStartResult {
            message: RecoverResponse {
                credential_response: CredentialResponse {
                    evaluation_element,
                    masking_nonce,
                    masked_response,
                },
            },
            #[cfg(test)]
            oprf_key: oprf_server.serialize(),
        })
    }
}

/////////////////////////
// Convenience Structs //
// =================== //
/////////////////////////

/// Contains the fields that are returned by a client recovery start
#[derive_where(Clone)]
pub struct ClientRecoveryStartResult<CS: CipherSuite> {
    /// The recovery request message to be sent to the server
    pub message: RecoverRequest<CS>,
    /// The client state that must be persisted in order to complete recovery
    pub state: ClientRecovery<CS>,
}

/// Optional parameters for client recovery finish
#[derive_where(Clone, Default)]
pub struct ClientRecoveryFinishParameters<'i, 'h, CS: CipherSuite> {
    /// Specifying the identifiers idU and idS
    pub identifiers: Identifiers<'i>,
    /// Specifying a configuration for the key stretching function
    pub ksf: Option<&'h CS::Ksf>,
}

/// Contains the fields that are returned by a client recovery finish
#[derive_where(Clone)]
pub struct ClientRecoveryFinishResult<CS: CipherSuite> {
    /// The recovered export key
    pub export_key: Output<OprfHash<CS>>,
    /// The server's static public key, as authenticated by the envelope
    pub server_s_pk: PublicKey<CS::KeGroup>,
}

/// Contains the fields that are returned by a server recovery start
#[derive_where(Clone)]
pub struct ServerRecoveryStartResult<CS: CipherSuite>
where
    // MaskedResponse: (KePk + Nonce) + Hash
    <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
    Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
    MaskedResponseLen<CS>: ArrayLength<u8>,
{
    /// The recovery response message to send to the client
    pub message: RecoverResponse<CS>,
    /// The per-credential OPRF key, only used in tests
    #[cfg(test)]
    pub oprf_key: GenericArray<u8, <OprfGroup<CS> as Group>::ScalarLen>,
}
