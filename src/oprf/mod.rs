// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! An implementation of the protocols from [RFC 9497]: an oblivious
//! pseudorandom function ([`OprfClient`], [`OprfServer`]), a verifiable OPRF
//! ([`VoprfClient`], [`VoprfServer`]) and a partially-oblivious PRF
//! ([`PoprfClient`], [`PoprfServer`]).
//!
//! The password protocols in the rest of this crate run on top of the base
//! OPRF mode, but this module stands on its own and exposes all three modes
//! over the groups selected by the crate features.
//!
//! [RFC 9497]: https://www.rfc-editor.org/rfc/rfc9497

mod ciphersuite;
mod common;
mod errors;
pub mod group;
mod internal;
#[allow(clippy::module_inception)]
mod oprf;
mod poprf;
mod voprf;

pub use self::ciphersuite::CipherSuite;
pub use self::common::{BlindedElement, EvaluationElement, Mode, Proof};
pub use self::errors::{Error, Result};
pub use self::group::Group;
pub(crate) use self::internal::derive_keypair;
pub use self::oprf::{OprfClient, OprfClientBlindResult, OprfServer};
pub use self::poprf::{
    PoprfClient, PoprfClientBlindResult, PoprfServer, PoprfServerBatchEvaluateResult,
    PoprfServerEvaluateResult,
};
pub use self::voprf::{
    VoprfClient, VoprfClientBlindResult, VoprfServer, VoprfServerBatchEvaluateResult,
    VoprfServerEvaluateResult,
};
