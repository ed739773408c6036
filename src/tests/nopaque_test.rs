// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

#![allow(unsafe_code)]

//! End-to-end tests for the two-message recovery flow against password files
//! written by the registration flow.

use core::mem::ManuallyDrop;
use core::ops::Add;

use generic_array::typenum::Sum;
use generic_array::ArrayLength;
use rand::rngs::OsRng;

use crate::ciphersuite::{OprfGroup, OprfHash};
use crate::envelope::EnvelopeLen;
use crate::errors::*;
use crate::hash::OutputSize;
use crate::key_exchange::group::KeGroup;
use crate::key_exchange::shared::NonceLen;
use crate::key_exchange::tripledh::TripleDh;
use crate::ksf::Identity;
use crate::oprf::Group;
use crate::*;

// Tests
// =====

#[cfg(feature = "ristretto255")]
struct Ristretto255;

#[cfg(feature = "ristretto255")]
impl CipherSuite for Ristretto255 {
    type OprfCs = crate::Ristretto255;
    type KeGroup = crate::Ristretto255;
    type KeyExchange = TripleDh;
    type Ksf = Identity;
}

#[cfg(feature = "decaf448")]
struct Decaf448;

#[cfg(feature = "decaf448")]
impl CipherSuite for Decaf448 {
    type OprfCs = crate::Decaf448;
    type KeGroup = crate::Decaf448;
    type KeyExchange = TripleDh;
    type Ksf = Identity;
}

#[cfg(feature = "p256")]
struct P256;

#[cfg(feature = "p256")]
impl CipherSuite for P256 {
    type OprfCs = p256::NistP256;
    type KeGroup = p256::NistP256;
    type KeyExchange = TripleDh;
    type Ksf = Identity;
}

#[cfg(feature = "p384")]
struct P384;

#[cfg(feature = "p384")]
impl CipherSuite for P384 {
    type OprfCs = p384::NistP384;
    type KeGroup = p384::NistP384;
    type KeyExchange = TripleDh;
    type Ksf = Identity;
}

#[cfg(feature = "p521")]
struct P521;

#[cfg(feature = "p521")]
impl CipherSuite for P521 {
    type OprfCs = p521::NistP521;
    type KeGroup = p521::NistP521;
    type KeyExchange = TripleDh;
    type Ksf = Identity;
}

static STR_PASSWORD: &str = "password";
static STR_CREDENTIAL_IDENTIFIER: &str = "credential_identifier";

/// Registers `password` against a fresh server setup, returning the setup and
/// the stored password file.
fn register<CS: CipherSuite>(
    server_setup: &ServerSetup<CS>,
    password: &[u8],
) -> Result<(ServerRegistration<CS>, Vec<u8>), ProtocolError> {
    let mut client_rng = OsRng;

    let client_registration_start_result =
        ClientRegistration::<CS>::start(&mut client_rng, password)?;
    let server_registration_start_result = ServerRegistration::<CS>::start(
        server_setup,
        client_registration_start_result.message,
        STR_CREDENTIAL_IDENTIFIER.as_bytes(),
    )?;
    let client_registration_finish_result = client_registration_start_result.state.finish(
        &mut client_rng,
        password,
        server_registration_start_result.message,
        ClientRegistrationFinishParameters::default(),
    )?;
    let export_key = client_registration_finish_result.export_key.to_vec();
    let password_file = ServerRegistration::finish(client_registration_finish_result.message);

    Ok((password_file, export_key))
}

#[test]
fn test_recovery_round_trip() -> Result<(), ProtocolError> {
    fn inner<CS: CipherSuite>() -> Result<(), ProtocolError>
    where
        // MaskedResponse: (KePk + Nonce) + Hash
        <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
        Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
        MaskedResponseLen<CS>: ArrayLength<u8>,
        // Envelope: Nonce + Hash
        NonceLen: Add<OutputSize<OprfHash<CS>>>,
        EnvelopeLen<CS>: ArrayLength<u8>,
    {
        let mut client_rng = OsRng;
        let mut server_rng = OsRng;
        let server_setup = ServerSetup::<CS>::new(&mut server_rng);
        let (password_file, registration_export_key) =
            register(&server_setup, STR_PASSWORD.as_bytes())?;

        // The server holds no state between the two messages
        let client_recovery_start_result =
            ClientRecovery::<CS>::start(&mut client_rng, STR_PASSWORD.as_bytes())?;
        let server_recovery_start_result = ServerRecovery::<CS>::start(
            &mut server_rng,
            &server_setup,
            Some(password_file),
            client_recovery_start_result.message,
            STR_CREDENTIAL_IDENTIFIER.as_bytes(),
        )?;
        let client_recovery_finish_result = client_recovery_start_result.state.finish(
            server_recovery_start_result.message,
            ClientRecoveryFinishParameters::default(),
        )?;

        assert_eq!(
            hex::encode(&registration_export_key),
            hex::encode(&client_recovery_finish_result.export_key)
        );
        assert_eq!(
            hex::encode(server_setup.keypair().public().serialize()),
            hex::encode(client_recovery_finish_result.server_s_pk.serialize())
        );
        Ok(())
    }

    #[cfg(feature = "ristretto255")]
    inner::<Ristretto255>()?;
    #[cfg(feature = "decaf448")]
    inner::<Decaf448>()?;
    #[cfg(feature = "p256")]
    inner::<P256>()?;
    #[cfg(feature = "p384")]
    inner::<P384>()?;
    #[cfg(feature = "p521")]
    inner::<P521>()?;

    Ok(())
}

#[test]
fn test_recovery_wrong_password_fails() -> Result<(), ProtocolError> {
    fn inner<CS: CipherSuite>() -> Result<(), ProtocolError>
    where
        // MaskedResponse: (KePk + Nonce) + Hash
        <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
        Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
        MaskedResponseLen<CS>: ArrayLength<u8>,
        // Envelope: Nonce + Hash
        NonceLen: Add<OutputSize<OprfHash<CS>>>,
        EnvelopeLen<CS>: ArrayLength<u8>,
    {
        let mut client_rng = OsRng;
        let mut server_rng = OsRng;
        let server_setup = ServerSetup::<CS>::new(&mut server_rng);
        let (password_file, _) = register(&server_setup, b"good password")?;

        let client_recovery_start_result =
            ClientRecovery::<CS>::start(&mut client_rng, b"bad password")?;
        let server_recovery_start_result = ServerRecovery::<CS>::start(
            &mut server_rng,
            &server_setup,
            Some(password_file),
            client_recovery_start_result.message,
            STR_CREDENTIAL_IDENTIFIER.as_bytes(),
        )?;
        let client_recovery_result = client_recovery_start_result.state.finish(
            server_recovery_start_result.message,
            ClientRecoveryFinishParameters::default(),
        );

        assert!(client_recovery_result.is_err());
        Ok(())
    }

    #[cfg(feature = "ristretto255")]
    inner::<Ristretto255>()?;
    #[cfg(feature = "decaf448")]
    inner::<Decaf448>()?;
    #[cfg(feature = "p256")]
    inner::<P256>()?;
    #[cfg(feature = "p384")]
    inner::<P384>()?;
    #[cfg(feature = "p521")]
    inner::<P521>()?;

    Ok(())
}

#[test]
fn test_recovery_fake_record_fails() -> Result<(), ProtocolError> {
    fn inner<CS: CipherSuite>() -> Result<(), ProtocolError>
    where
        // MaskedResponse: (KePk + Nonce) + Hash
        <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
        Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
        MaskedResponseLen<CS>: ArrayLength<u8>,
        // Envelope: Nonce + Hash
        NonceLen: Add<OutputSize<OprfHash<CS>>>,
        EnvelopeLen<CS>: ArrayLength<u8>,
    {
        let mut client_rng = OsRng;
        let mut server_rng = OsRng;
        let server_setup = ServerSetup::<CS>::new(&mut server_rng);

        // No record exists. The server must still answer with a response
        // indistinguishable from a real one, and the client must fail only
        // when opening the envelope.
        let client_recovery_start_result =
            ClientRecovery::<CS>::start(&mut client_rng, STR_PASSWORD.as_bytes())?;
        let server_recovery_start_result = ServerRecovery::<CS>::start(
            &mut server_rng,
            &server_setup,
            None,
            client_recovery_start_result.message,
            b"unregistered identifier",
        )?;
        let client_recovery_result = client_recovery_start_result.state.finish(
            server_recovery_start_result.message,
            ClientRecoveryFinishParameters::default(),
        );

        assert!(client_recovery_result.is_err());
        Ok(())
    }

    #[cfg(feature = "ristretto255")]
    inner::<Ristretto255>()?;
    #[cfg(feature = "decaf448")]
    inner::<Decaf448>()?;
    #[cfg(feature = "p256")]
    inner::<P256>()?;
    #[cfg(feature = "p384")]
    inner::<P384>()?;
    #[cfg(feature = "p521")]
    inner::<P521>()?;

    Ok(())
}

#[test]
fn test_recovery_mismatched_identifiers_fail() -> Result<(), ProtocolError> {
    fn inner<CS: CipherSuite>() -> Result<(), ProtocolError>
    where
        // MaskedResponse: (KePk + Nonce) + Hash
        <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
        Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
        MaskedResponseLen<CS>: ArrayLength<u8>,
        // Envelope: Nonce + Hash
        NonceLen: Add<OutputSize<OprfHash<CS>>>,
        EnvelopeLen<CS>: ArrayLength<u8>,
    {
        let mut client_rng = OsRng;
        let mut server_rng = OsRng;
        let server_setup = ServerSetup::<CS>::new(&mut server_rng);

        // Seal the envelope over explicit identifiers
        let client_registration_start_result =
            ClientRegistration::<CS>::start(&mut client_rng, STR_PASSWORD.as_bytes())?;
        let server_registration_start_result = ServerRegistration::<CS>::start(
            &server_setup,
            client_registration_start_result.message,
            STR_CREDENTIAL_IDENTIFIER.as_bytes(),
        )?;
        let client_registration_finish_result = client_registration_start_result.state.finish(
            &mut client_rng,
            STR_PASSWORD.as_bytes(),
            server_registration_start_result.message,
            ClientRegistrationFinishParameters {
                identifiers: Identifiers {
                    client: Some(b"alice"),
                    server: Some(b"server"),
                },
                ksf: None,
            },
        )?;
        let password_file =
            ServerRegistration::finish(client_registration_finish_result.message);

        // Recovering under the default identifiers must not open it
        let client_recovery_start_result =
            ClientRecovery::<CS>::start(&mut client_rng, STR_PASSWORD.as_bytes())?;
        let server_recovery_start_result = ServerRecovery::<CS>::start(
            &mut server_rng,
            &server_setup,
            Some(password_file),
            client_recovery_start_result.message,
            STR_CREDENTIAL_IDENTIFIER.as_bytes(),
        )?;
        let client_recovery_result = client_recovery_start_result.state.finish(
            server_recovery_start_result.message,
            ClientRecoveryFinishParameters::default(),
        );

        assert!(matches!(
            client_recovery_result,
            Err(ProtocolError::EnvelopeRecoveryError)
        ));
        Ok(())
    }

    #[cfg(feature = "ristretto255")]
    inner::<Ristretto255>()?;
    #[cfg(feature = "decaf448")]
    inner::<Decaf448>()?;
    #[cfg(feature = "p256")]
    inner::<P256>()?;
    #[cfg(feature = "p384")]
    inner::<P384>()?;
    #[cfg(feature = "p521")]
    inner::<P521>()?;

    Ok(())
}

#[test]
fn test_recovery_state_serialization() -> Result<(), ProtocolError> {
    fn inner<CS: CipherSuite>() -> Result<(), ProtocolError>
    where
        // MaskedResponse: (KePk + Nonce) + Hash
        <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
        Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
        MaskedResponseLen<CS>: ArrayLength<u8>,
        // Envelope: Nonce + Hash
        NonceLen: Add<OutputSize<OprfHash<CS>>>,
        EnvelopeLen<CS>: ArrayLength<u8>,
    {
        let mut client_rng = OsRng;
        let mut server_rng = OsRng;
        let server_setup = ServerSetup::<CS>::new(&mut server_rng);
        let (password_file, registration_export_key) =
            register(&server_setup, STR_PASSWORD.as_bytes())?;

        // Suspend the client between the two messages
        let client_recovery_start_result =
            ClientRecovery::<CS>::start(&mut client_rng, STR_PASSWORD.as_bytes())?;
        let state_bytes = client_recovery_start_result.state.serialize();

        let server_recovery_start_result = ServerRecovery::<CS>::start(
            &mut server_rng,
            &server_setup,
            Some(password_file),
            client_recovery_start_result.message,
            STR_CREDENTIAL_IDENTIFIER.as_bytes(),
        )?;

        let client_recovery_finish_result = ClientRecovery::<CS>::deserialize(&state_bytes)?
            .finish(
                server_recovery_start_result.message,
                ClientRecoveryFinishParameters::default(),
            )?;

        assert_eq!(
            hex::encode(&registration_export_key),
            hex::encode(&client_recovery_finish_result.export_key)
        );
        Ok(())
    }

    #[cfg(feature = "ristretto255")]
    inner::<Ristretto255>()?;
    #[cfg(feature = "decaf448")]
    inner::<Decaf448>()?;
    #[cfg(feature = "p256")]
    inner::<P256>()?;
    #[cfg(feature = "p384")]
    inner::<P384>()?;
    #[cfg(feature = "p521")]
    inner::<P521>()?;

    Ok(())
}

#[test]
fn test_recovery_reflected_value_error() -> Result<(), ProtocolError> {
    fn inner<CS: CipherSuite>() -> Result<(), ProtocolError>
    where
        // MaskedResponse: (KePk + Nonce) + Hash
        <CS::KeGroup as KeGroup>::PkLen: Add<NonceLen>,
        Sum<<CS::KeGroup as KeGroup>::PkLen, NonceLen>: Add<OutputSize<OprfHash<CS>>>,
        MaskedResponseLen<CS>: ArrayLength<u8>,
        // Envelope: Nonce + Hash
        NonceLen: Add<OutputSize<OprfHash<CS>>>,
        EnvelopeLen<CS>: ArrayLength<u8>,
        // CredentialResponse: (KgPk + Nonce) + MaskedResponse
        <OprfGroup<CS> as Group>::ElemLen: Add<NonceLen>,
        Sum<<OprfGroup<CS> as Group>::ElemLen, NonceLen>:
            ArrayLength<u8> + Add<MaskedResponseLen<CS>>,
        CredentialResponseLen<CS>: ArrayLength<u8>,
    {
        let mut client_rng = OsRng;
        let mut server_rng = OsRng;
        let server_setup = ServerSetup::<CS>::new(&mut server_rng);
        let (password_file, _) = register(&server_setup, STR_PASSWORD.as_bytes())?;

        let client_recovery_start_result =
            ClientRecovery::<CS>::start(&mut client_rng, STR_PASSWORD.as_bytes())?;
        let request_bytes = client_recovery_start_result.message.serialize();
        let server_recovery_start_result = ServerRecovery::<CS>::start(
            &mut server_rng,
            &server_setup,
            Some(password_file),
            RecoverRequest::deserialize(&request_bytes)?,
            STR_CREDENTIAL_IDENTIFIER.as_bytes(),
        )?;
        let response_bytes = server_recovery_start_result.message.serialize();

        // Replace the evaluation element with the client's own blinded element
        let reflected_response = RecoverResponse::<CS>::deserialize(
            &[&request_bytes[..], &response_bytes[request_bytes.len()..]].concat(),
        )?;

        let client_recovery_result = client_recovery_start_result.state.finish(
            reflected_response,
            ClientRecoveryFinishParameters::default(),
        );

        assert!(matches!(
            client_recovery_result,
            Err(ProtocolError::ReflectedValueError)
        ));
        Ok(())
    }

    #[cfg(feature = "ristretto255")]
    inner::<Ristretto255>()?;
    #[cfg(feature = "decaf448")]
    inner::<Decaf448>()?;
    #[cfg(feature = "p256")]
    inner::<P256>()?;
    #[cfg(feature = "p384")]
    inner::<P384>()?;
    #[cfg(feature = "p521")]
    inner::<P521>()?;

    Ok(())
}

#[test]
fn test_zeroize_client_recovery() -> Result<(), ProtocolError> {
    fn inner<CS: CipherSuite>() -> Result<(), ProtocolError> {
        let mut client_rng = OsRng;
        let client_recovery_start_result =
            ClientRecovery::<CS>::start(&mut client_rng, STR_PASSWORD.as_bytes())?;

        let mut state = ManuallyDrop::new(client_recovery_start_result.state);
        unsafe { ManuallyDrop::drop(&mut state) };

        for byte in state.oprf_client.serialize() {
            assert_eq!(byte, 0);
        }
        Ok(())
    }

    #[cfg(feature = "ristretto255")]
    inner::<Ristretto255>()?;
    #[cfg(feature = "decaf448")]
    inner::<Decaf448>()?;
    #[cfg(feature = "p256")]
    inner::<P256>()?;
    #[cfg(feature = "p384")]
    inner::<P384>()?;
    #[cfg(feature = "p521")]
    inner::<P521>()?;

    Ok(())
}
