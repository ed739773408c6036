// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! An implementation of the OPAQUE asymmetric password-authenticated key
//! exchange protocol, together with a password-only recovery flow that shares
//! its registration records
//!
//! Note: This implementation is in sync with [RFC 9807](https://www.rfc-editor.org/rfc/rfc9807),
//! and builds on the oblivious pseudorandom function from
//! [RFC 9497](https://www.rfc-editor.org/rfc/rfc9497), which is exposed on
//! its own in the [`oprf`] module.
//!
//! # Overview
//!
//! OPAQUE is a protocol between a client and a server. They must first agree
//! on a collection of primitives to be kept consistent throughout protocol
//! execution. These include:
//! * an OPRF cipher suite,
//! * a group used for the key exchange,
//! * a key exchange protocol, and
//! * a key stretching function.
//!
//! We will use the following choices in this example:
//! ```
//! use opaque_pake::CipherSuite;
//!
//! struct DefaultCipherSuite;
//!
//! impl CipherSuite for DefaultCipherSuite {
//!     type OprfCs = opaque_pake::Ristretto255;
//!     type KeGroup = opaque_pake::Ristretto255;
//!     type KeyExchange = opaque_pake::key_exchange::tripledh::TripleDh;
//!     type Ksf = opaque_pake::ksf::Identity;
//! }
//! ```
//!
//! Note that our choice of key stretching function in this example,
//! [`Identity`](ksf::Identity), is selected only to ensure that the examples
//! execute quickly. A real application should use an actual key stretching
//! function, such as [`Argon2id`](ksf::Argon2id), available with the `argon2`
//! feature.
//!
//! ## Setup
//! To set up the protocol, the server generates a [`ServerSetup`] object.
//! This bundles the server's static key pair with the seed from which all
//! per-credential OPRF keys are derived, and must be persisted and reused for
//! all registration and login steps:
//! ```
//! # #[cfg(feature = "ristretto255")]
//! # {
//! # use opaque_pake::CipherSuite;
//! # struct DefaultCipherSuite;
//! # impl CipherSuite for DefaultCipherSuite {
//! #     type OprfCs = opaque_pake::Ristretto255;
//! #     type KeGroup = opaque_pake::Ristretto255;
//! #     type KeyExchange = opaque_pake::key_exchange::tripledh::TripleDh;
//! #     type Ksf = opaque_pake::ksf::Identity;
//! # }
//! use opaque_pake::ServerSetup;
//! use rand::rngs::OsRng;
//!
//! let mut rng = OsRng;
//! let server_setup = ServerSetup::<DefaultCipherSuite>::new(&mut rng);
//! # }
//! ```
//! The corresponding `server_setup.serialize()` and
//! [`ServerSetup::deserialize`] functions can be used for persistence.
//!
//! ## Registration
//! Registration consists of four steps along with three messages. A
//! successful execution results in the server holding a password file for the
//! client, which is opaque in the sense that it cannot be used to impersonate
//! the client without knowledge of the password.
//!
//! In the first step, the client runs [`ClientRegistration::start`] with its
//! password to produce a registration request:
//! ```
//! # #[cfg(feature = "ristretto255")]
//! # {
//! # use opaque_pake::CipherSuite;
//! # struct DefaultCipherSuite;
//! # impl CipherSuite for DefaultCipherSuite {
//! #     type OprfCs = opaque_pake::Ristretto255;
//! #     type KeGroup = opaque_pake::Ristretto255;
//! #     type KeyExchange = opaque_pake::key_exchange::tripledh::TripleDh;
//! #     type Ksf = opaque_pake::ksf::Identity;
//! # }
//! use opaque_pake::ClientRegistration;
//! use rand::rngs::OsRng;
//!
//! let mut client_rng = OsRng;
//! let client_registration_start =
//!     ClientRegistration::<DefaultCipherSuite>::start(&mut client_rng, b"password")?;
//! # }
//! # Ok::<(), opaque_pake::errors::ProtocolError>(())
//! ```
//! The request in `client_registration_start.message` is sent to the server,
//! and `client_registration_start.state` must be kept on the client for the
//! third step.
//!
//! In the second step, the server evaluates the request under the credential
//! identifier chosen for this client, attaching its static public key:
//! ```
//! # #[cfg(feature = "ristretto255")]
//! # {
//! # use opaque_pake::CipherSuite;
//! # struct DefaultCipherSuite;
//! # impl CipherSuite for DefaultCipherSuite {
//! #     type OprfCs = opaque_pake::Ristretto255;
//! #     type KeGroup = opaque_pake::Ristretto255;
//! #     type KeyExchange = opaque_pake::key_exchange::tripledh::TripleDh;
//! #     type Ksf = opaque_pake::ksf::Identity;
//! # }
//! # use opaque_pake::{ClientRegistration, ServerSetup};
//! use opaque_pake::ServerRegistration;
//! # use rand::rngs::OsRng;
//! # let mut rng = OsRng;
//! # let server_setup = ServerSetup::<DefaultCipherSuite>::new(&mut rng);
//! # let client_registration_start =
//! #     ClientRegistration::<DefaultCipherSuite>::start(&mut rng, b"password")?;
//!
//! let server_registration_start = ServerRegistration::start(
//!     &server_setup,
//!     client_registration_start.message,
//!     b"alice@example.com",
//! )?;
//! # }
//! # Ok::<(), opaque_pake::errors::ProtocolError>(())
//! ```
//! The response in `server_registration_start.message` is returned to the
//! client. The server holds no state between registration steps.
//!
//! In the third step, the client unblinds the response, seals its envelope
//! and produces the registration upload, along with an export key:
//! ```
//! # #[cfg(feature = "ristretto255")]
//! # {
//! # use opaque_pake::CipherSuite;
//! # struct DefaultCipherSuite;
//! # impl CipherSuite for DefaultCipherSuite {
//! #     type OprfCs = opaque_pake::Ristretto255;
//! #     type KeGroup = opaque_pake::Ristretto255;
//! #     type KeyExchange = opaque_pake::key_exchange::tripledh::TripleDh;
//! #     type Ksf = opaque_pake::ksf::Identity;
//! # }
//! # use opaque_pake::{ClientRegistration, ServerRegistration, ServerSetup};
//! use opaque_pake::ClientRegistrationFinishParameters;
//! # use rand::rngs::OsRng;
//! # let mut rng = OsRng;
//! # let server_setup = ServerSetup::<DefaultCipherSuite>::new(&mut rng);
//! # let client_registration_start =
//! #     ClientRegistration::<DefaultCipherSuite>::start(&mut rng, b"password")?;
//! # let server_registration_start = ServerRegistration::start(
//! #     &server_setup,
//! #     client_registration_start.message,
//! #     b"alice@example.com",
//! # )?;
//!
//! let client_registration_finish = client_registration_start.state.finish(
//!     &mut rng,
//!     b"password",
//!     server_registration_start.message,
//!     ClientRegistrationFinishParameters::default(),
//! )?;
//! # }
//! # Ok::<(), opaque_pake::errors::ProtocolError>(())
//! ```
//! The upload in `client_registration_finish.message` is sent to the server.
//! The client can use `client_registration_finish.export_key` for
//! applications that process user information beyond the core protocol, such
//! as encrypting additional secrets; the server never sees it.
//!
//! In the fourth step, the server finalizes the password file and stores it
//! under the client's credential identifier:
//! ```
//! # #[cfg(feature = "ristretto255")]
//! # {
//! # use opaque_pake::CipherSuite;
//! # struct DefaultCipherSuite;
//! # impl CipherSuite for DefaultCipherSuite {
//! #     type OprfCs = opaque_pake::Ristretto255;
//! #     type KeGroup = opaque_pake::Ristretto255;
//! #     type KeyExchange = opaque_pake::key_exchange::tripledh::TripleDh;
//! #     type Ksf = opaque_pake::ksf::Identity;
//! # }
//! # use opaque_pake::{
//! #     ClientRegistration, ClientRegistrationFinishParameters, ServerRegistration, ServerSetup,
//! # };
//! # use rand::rngs::OsRng;
//! # let mut rng = OsRng;
//! # let server_setup = ServerSetup::<DefaultCipherSuite>::new(&mut rng);
//! # let client_registration_start =
//! #     ClientRegistration::<DefaultCipherSuite>::start(&mut rng, b"password")?;
//! # let server_registration_start = ServerRegistration::start(
//! #     &server_setup,
//! #     client_registration_start.message,
//! #     b"alice@example.com",
//! # )?;
//! # let client_registration_finish = client_registration_start.state.finish(
//! #     &mut rng,
//! #     b"password",
//! #     server_registration_start.message,
//! #     ClientRegistrationFinishParameters::default(),
//! # )?;
//!
//! let password_file = ServerRegistration::finish(client_registration_finish.message);
//! let password_file_bytes = password_file.serialize();
//! # }
//! # Ok::<(), opaque_pake::errors::ProtocolError>(())
//! ```
//!
//! ## Login
//! Login consists of four steps along with three messages, and doubles as an
//! authenticated key exchange: on success both sides hold the same session
//! key, and each side knows the other took part in the exchange.
//!
//! ```
//! # #[cfg(feature = "ristretto255")]
//! # {
//! # use opaque_pake::CipherSuite;
//! # struct DefaultCipherSuite;
//! # impl CipherSuite for DefaultCipherSuite {
//! #     type OprfCs = opaque_pake::Ristretto255;
//! #     type KeGroup = opaque_pake::Ristretto255;
//! #     type KeyExchange = opaque_pake::key_exchange::tripledh::TripleDh;
//! #     type Ksf = opaque_pake::ksf::Identity;
//! # }
//! # use opaque_pake::{
//! #     ClientRegistration, ClientRegistrationFinishParameters, ServerRegistration, ServerSetup,
//! # };
//! use opaque_pake::{
//!     ClientLogin, ClientLoginFinishParameters, ServerLogin, ServerLoginStartParameters,
//! };
//! # use rand::rngs::OsRng;
//! # let mut rng = OsRng;
//! # let server_setup = ServerSetup::<DefaultCipherSuite>::new(&mut rng);
//! # let client_registration_start =
//! #     ClientRegistration::<DefaultCipherSuite>::start(&mut rng, b"password")?;
//! # let server_registration_start = ServerRegistration::start(
//! #     &server_setup,
//! #     client_registration_start.message,
//! #     b"alice@example.com",
//! # )?;
//! # let client_registration_finish = client_registration_start.state.finish(
//! #     &mut rng,
//! #     b"password",
//! #     server_registration_start.message,
//! #     ClientRegistrationFinishParameters::default(),
//! # )?;
//! # let password_file = ServerRegistration::finish(client_registration_finish.message);
//!
//! // Client initiates a login, blinding the password and starting the key
//! // exchange
//! let client_login_start = ClientLogin::<DefaultCipherSuite>::start(&mut rng, b"password")?;
//!
//! // Server responds, looking up the password file under the credential
//! // identifier from its storage
//! let server_login_start = ServerLogin::start(
//!     &mut rng,
//!     &server_setup,
//!     Some(password_file),
//!     client_login_start.message,
//!     b"alice@example.com",
//!     ServerLoginStartParameters::default(),
//! )?;
//!
//! // Client recovers its envelope, authenticates the server and produces the
//! // final message
//! let client_login_finish = client_login_start
//!     .state
//!     .finish(server_login_start.message, ClientLoginFinishParameters::default())?;
//!
//! // Server authenticates the client
//! let server_login_finish = server_login_start.state.finish(client_login_finish.message)?;
//!
//! assert_eq!(client_login_finish.session_key, server_login_finish.session_key);
//! # }
//! # Ok::<(), opaque_pake::errors::ProtocolError>(())
//! ```
//! A login against a wrong password, a tampered message or an unregistered
//! credential identifier fails with an error; an attempt against an
//! unregistered identifier is served from a fake record, so the responses
//! leak nothing about which identifiers are registered.
//!
//! ## Recovery
//! The [`ClientRecovery`]/[`ServerRecovery`] flow re-derives the export key
//! from the password in two messages, against the same password files that
//! registration produces. It is strictly weaker than a login: no session key
//! is established and the client never authenticates to the server.
//! ```
//! # #[cfg(feature = "ristretto255")]
//! # {
//! # use opaque_pake::CipherSuite;
//! # struct DefaultCipherSuite;
//! # impl CipherSuite for DefaultCipherSuite {
//! #     type OprfCs = opaque_pake::Ristretto255;
//! #     type KeGroup = opaque_pake::Ristretto255;
//! #     type KeyExchange = opaque_pake::key_exchange::tripledh::TripleDh;
//! #     type Ksf = opaque_pake::ksf::Identity;
//! # }
//! # use opaque_pake::{
//! #     ClientRegistration, ClientRegistrationFinishParameters, ServerRegistration, ServerSetup,
//! # };
//! use opaque_pake::{ClientRecovery, ClientRecoveryFinishParameters, ServerRecovery};
//! # use rand::rngs::OsRng;
//! # let mut rng = OsRng;
//! # let server_setup = ServerSetup::<DefaultCipherSuite>::new(&mut rng);
//! # let client_registration_start =
//! #     ClientRegistration::<DefaultCipherSuite>::start(&mut rng, b"password")?;
//! # let server_registration_start = ServerRegistration::start(
//! #     &server_setup,
//! #     client_registration_start.message,
//! #     b"alice@example.com",
//! # )?;
//! # let client_registration_finish = client_registration_start.state.finish(
//! #     &mut rng,
//! #     b"password",
//! #     server_registration_start.message,
//! #     ClientRegistrationFinishParameters::default(),
//! # )?;
//! # let password_file = ServerRegistration::finish(client_registration_finish.message);
//!
//! let client_recovery_start = ClientRecovery::<DefaultCipherSuite>::start(&mut rng, b"password")?;
//!
//! let server_recovery_start = ServerRecovery::start(
//!     &mut rng,
//!     &server_setup,
//!     Some(password_file),
//!     client_recovery_start.message,
//!     b"alice@example.com",
//! )?;
//!
//! let client_recovery_finish = client_recovery_start
//!     .state
//!     .finish(server_recovery_start.message, ClientRecoveryFinishParameters::default())?;
//!
//! assert_eq!(
//!     client_recovery_finish.export_key,
//!     client_registration_finish.export_key,
//! );
//! # }
//! # Ok::<(), opaque_pake::errors::ProtocolError>(())
//! ```
//!
//! # Identifiers and context
//!
//! Both sides may bind optional client and server identifiers into the
//! envelope with [`Identifiers`]; a login or recovery then only succeeds if
//! both sides supply the same identifiers as registration did. Likewise, an
//! application-layer context string can be passed to the login functions, and
//! both sides must agree on it for the key exchange to complete.
//!
//! # Features
//!
//! * `argon2`: provides [`Argon2id`](ksf::Argon2id), the recommended key
//!   stretching function. Enabled by default.
//! * `ristretto255`: provides [`Ristretto255`] as an OPRF cipher suite and
//!   key exchange group. Enabled by default.
//! * `decaf448`: provides [`Decaf448`] as an OPRF cipher suite and key
//!   exchange group.
//! * `p256`, `p384` and `p521`: enable the corresponding NIST curve types
//!   from the [`p256`](https://docs.rs/p256), [`p384`](https://docs.rs/p384)
//!   and [`p521`](https://docs.rs/p521) crates as OPRF cipher suites and key
//!   exchange groups.
//! * `std`: enables the `std` features of dependencies. Enabled by default;
//!   the crate itself is `no_std` compatible.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::cargo, clippy::missing_errors_doc, missing_docs)]
#![allow(clippy::multiple_crate_versions)]

extern crate alloc;

// Error types
pub mod errors;

// High-level APIs
mod nopaque;
mod opaque;

pub mod ciphersuite;
mod envelope;
pub mod hash;
pub mod key_exchange;
pub mod keypair;
pub mod ksf;
mod messages;
pub mod oprf;
mod serialization;

#[cfg(test)]
mod tests;

#[cfg(feature = "decaf448")]
pub use crate::oprf::group::Decaf448;
#[cfg(feature = "ristretto255")]
pub use crate::oprf::group::Ristretto255;

pub use crate::ciphersuite::CipherSuite;
pub use crate::messages::{
    CredentialRequest, CredentialRequestLen, CredentialResponse, CredentialResponseLen, Ke1,
    Ke1Len, Ke2, Ke2Len, Ke3, Ke3Len, MaskedResponseLen, RecoverRequest, RecoverRequestLen,
    RecoverResponse, RecoverResponseLen, RegistrationRequest, RegistrationRequestLen,
    RegistrationResponse, RegistrationResponseLen, RegistrationUpload, RegistrationUploadLen,
};
pub use crate::nopaque::{
    ClientRecovery, ClientRecoveryFinishParameters, ClientRecoveryFinishResult,
    ClientRecoveryStartResult, ServerRecovery, ServerRecoveryStartResult,
};
pub use crate::opaque::{
    ClientLogin, ClientLoginFinishParameters, ClientLoginFinishResult, ClientLoginStartResult,
    ClientRegistration, ClientRegistrationFinishParameters, ClientRegistrationFinishResult,
    ClientRegistrationLen, ClientRegistrationStartResult, Identifiers, ServerLogin,
    ServerLoginFinishResult, ServerLoginLen, ServerLoginStartParameters, ServerLoginStartResult,
    ServerRegistration, ServerRegistrationLen, ServerRegistrationStartResult, ServerSetup,
    ServerSetupLen,
};
