// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! The partially-oblivious mode, in which client and server agree on public
//! info that is mixed into the key for each evaluation.

use alloc::vec::Vec;
use core::ops::Add;

use derive_where::derive_where;
use digest::Output;
use generic_array::sequence::Concat;
use generic_array::typenum::{Sum, Unsigned};
use generic_array::{ArrayLength, GenericArray};
use rand::{CryptoRng, RngCore};

use super::ciphersuite::{Elem, ElemLen, Scalar, ScalarLen};
use super::common::{BlindedElement, EvaluationElement, Mode, Proof};
use super::internal::{
    compute_tweak, derive_keypair, finalize_after_unblind, generate_proof, input_element,
    verify_proof,
};
use super::{CipherSuite, Error, Group, Result};

/// A client in partially-oblivious mode. It remembers the blinded element so
/// the server's proof can be checked before unblinding.
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; Elem<CS>, Scalar<CS>)]
pub struct PoprfClient<CS: CipherSuite> {
    pub(crate) blind: Scalar<CS>,
    #[derive_where(skip(Zeroize))]
    pub(crate) blinded_element: Elem<CS>,
}

/// A server in partially-oblivious mode, holding the evaluation key pair. The
/// info tweak is applied per evaluation.
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; Elem<CS>, Scalar<CS>)]
pub struct PoprfServer<CS: CipherSuite> {
    pub(crate) sk: Scalar<CS>,
    #[derive_where(skip(Zeroize))]
    pub(crate) pk: Elem<CS>,
}

/// The state and message produced by [`PoprfClient::blind`].
#[derive_where(Debug; Elem<CS>, Scalar<CS>)]
pub struct PoprfClientBlindResult<CS: CipherSuite> {
    /// The client state, needed to finalize.
    pub state: PoprfClient<CS>,
    /// The message to send to the server.
    pub message: BlindedElement<CS>,
}

/// The message and proof produced by [`PoprfServer::blind_evaluate`].
#[derive_where(Debug; Elem<CS>, Scalar<CS>)]
pub struct PoprfServerEvaluateResult<CS: CipherSuite> {
    /// The message to send back to the client.
    pub message: EvaluationElement<CS>,
    /// The proof of correct evaluation under the tweaked key.
    pub proof: Proof<CS>,
}

/// The messages and batch proof produced by
/// [`PoprfServer::batch_blind_evaluate`].
#[derive_where(Debug; Elem<CS>, Scalar<CS>)]
pub struct PoprfServerBatchEvaluateResult<CS: CipherSuite> {
    /// The messages to send back to the client, in the order the blinded
    /// elements were given.
    pub messages: Vec<EvaluationElement<CS>>,
    /// The proof covering the whole batch.
    pub proof: Proof<CS>,
}

impl<CS: CipherSuite> PoprfClient<CS> {
    /// Blinds the input with a random blinding factor, producing the first
    /// protocol message. The info is only needed later, to finalize.
    ///
    /// # Errors
    /// [`Error::Input`] if the input is longer than [`u16::MAX`] or maps to
    /// the identity element.
    pub fn blind<R: RngCore + CryptoRng>(
        input: &[u8],
        blinding_factor_rng: &mut R,
    ) -> Result<PoprfClientBlindResult<CS>> {
        let element = input_element::<CS>(input, Mode::Poprf)?;
        let blind = CS::Group::random_scalar(blinding_factor_rng);
        let blinded_element = element * blind;

        Ok(PoprfClientBlindResult {
            state: Self {
                blind,
                blinded_element,
            },
            message: BlindedElement(blinded_element),
        })
    }

    /// Verifies the server's proof against the info-tweaked public key, then
    /// unblinds the evaluation and hashes it into the protocol output.
    ///
    /// # Errors
    /// - [`Error::Info`] if the info is longer than [`u16::MAX`].
    /// - [`Error::ProofVerification`] if the proof does not check out.
    /// - [`Error::Input`] if the input is longer than [`u16::MAX`].
    pub fn finalize(
        &self,
        input: &[u8],
        evaluation_element: &EvaluationElement<CS>,
        proof: &Proof<CS>,
        pk: Elem<CS>,
        info: &[u8],
    ) -> Result<Output<CS::Hash>> {
        let tweaked_key = tweaked_public_key::<CS>(pk, info)?;

        verify_proof::<CS>(
            CS::Group::base_elem(),
            tweaked_key,
            &[evaluation_element.0],
            &[self.blinded_element],
            proof,
            Mode::Poprf,
        )?;

        let unblinded_element = evaluation_element.0 * CS::Group::invert_scalar(self.blind);
        finalize_after_unblind::<CS>(input, Some(info), unblinded_element)
    }

    /// Verifies a batch proof in one shot, then unblinds and hashes each
    /// evaluation. Outputs are returned in input order.
    ///
    /// # Errors
    /// - [`Error::Batch`] if the slice lengths differ or exceed [`u16::MAX`].
    /// - [`Error::Info`] if the info is longer than [`u16::MAX`].
    /// - [`Error::ProofVerification`] if the proof does not check out.
    /// - [`Error::Input`] if an input is longer than [`u16::MAX`].
    pub fn batch_finalize<I: AsRef<[u8]>>(
        inputs: &[I],
        clients: &[Self],
        messages: &[EvaluationElement<CS>],
        proof: &Proof<CS>,
        pk: Elem<CS>,
        info: &[u8],
    ) -> Result<Vec<Output<CS::Hash>>> {
        if inputs.len() != clients.len() || inputs.len() != messages.len() {
            return Err(Error::Batch);
        }

        let tweaked_key = tweaked_public_key::<CS>(pk, info)?;

        let blinded_elements: Vec<_> = clients
            .iter()
            .map(|client| client.blinded_element)
            .collect();
        let evaluation_elements: Vec<_> = messages.iter().map(|message| message.0).collect();

        verify_proof::<CS>(
            CS::Group::base_elem(),
            tweaked_key,
            &evaluation_elements,
            &blinded_elements,
            proof,
            Mode::Poprf,
        )?;

        inputs
            .iter()
            .zip(clients)
            .zip(messages)
            .map(|((input, client), message)| {
                let unblinded_element = message.0 * CS::Group::invert_scalar(client.blind);
                finalize_after_unblind::<CS>(input.as_ref(), Some(info), unblinded_element)
            })
            .collect()
    }

    /// Serialization into bytes.
    pub fn serialize(&self) -> GenericArray<u8, Sum<ScalarLen<CS>, ElemLen<CS>>>
    where
        ScalarLen<CS>: Add<ElemLen<CS>>,
        Sum<ScalarLen<CS>, ElemLen<CS>>: ArrayLength<u8>,
    {
        CS::Group::serialize_scalar(self.blind).concat(CS::Group::serialize_elem(
            self.blinded_element,
        ))
    }

    /// Deserialization from bytes, rejecting a zero blinding factor.
    pub fn deserialize(input: &[u8]) -> Result<Self> {
        if input.len() != ScalarLen::<CS>::USIZE + ElemLen::<CS>::USIZE {
            return Err(Error::Deserialization);
        }

        let (blind_bytes, element_bytes) = input.split_at(ScalarLen::<CS>::USIZE);

        Ok(Self {
            blind: CS::Group::deserialize_scalar(blind_bytes)?,
            blinded_element: CS::Group::deserialize_elem(element_bytes)?,
        })
    }

    #[cfg(test)]
    pub(crate) fn get_blind(&self) -> Scalar<CS> {
        self.blind
    }
}

impl<CS: CipherSuite> PoprfServer<CS> {
    /// Creates a server with a freshly sampled key pair.
    pub fn new<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let sk = CS::Group::random_scalar(rng);

        Self {
            sk,
            pk: CS::Group::base_elem() * sk,
        }
    }

    /// Creates a server from an existing serialized private key.
    ///
    /// # Errors
    /// [`Error::Deserialization`] if the key is malformed or zero.
    pub fn new_with_key(private_key_bytes: &[u8]) -> Result<Self> {
        let sk = CS::Group::deserialize_scalar(private_key_bytes)?;

        Ok(Self {
            sk,
            pk: CS::Group::base_elem() * sk,
        })
    }

    /// Derives a server key pair from a seed, implementing `DeriveKeyPair`
    /// from [RFC 9497 § 3.2].
    ///
    /// # Errors
    /// - [`Error::Seed`] if the seed is longer than [`u16::MAX`].
    /// - [`Error::Info`] if the info is longer than [`u16::MAX`].
    /// - [`Error::DeriveKeyPair`] if no valid key can be derived.
    ///
    /// [RFC 9497 § 3.2]: https://www.rfc-editor.org/rfc/rfc9497#section-3.2
    pub fn new_from_seed(seed: &[u8], info: &[u8]) -> Result<Self> {
        let (sk, pk) = derive_keypair::<CS>(seed, info, Mode::Poprf)?;
        Ok(Self { sk, pk })
    }

    /// Evaluates a client-blinded element under the info-tweaked key and
    /// proves the evaluation against the tweaked public key.
    ///
    /// # Errors
    /// - [`Error::Info`] if the info is longer than [`u16::MAX`].
    /// - [`Error::Invert`] if the tweaked key is zero.
    pub fn blind_evaluate<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        blinded_element: &BlindedElement<CS>,
        info: &[u8],
    ) -> Result<PoprfServerEvaluateResult<CS>> {
        let (t, tweaked_key) = self.tweaked_key(info)?;

        let evaluation_element = blinded_element.0 * CS::Group::invert_scalar(t);

        let proof = generate_proof::<CS, R>(
            rng,
            t,
            CS::Group::base_elem(),
            tweaked_key,
            &[evaluation_element],
            &[blinded_element.0],
            Mode::Poprf,
        )?;

        Ok(PoprfServerEvaluateResult {
            message: EvaluationElement(evaluation_element),
            proof,
        })
    }

    /// Evaluates a batch of blinded elements under a single proof.
    ///
    /// # Errors
    /// - [`Error::Batch`] if the batch exceeds [`u16::MAX`] elements.
    /// - [`Error::Info`] if the info is longer than [`u16::MAX`].
    /// - [`Error::Invert`] if the tweaked key is zero.
    pub fn batch_blind_evaluate<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        blinded_elements: &[BlindedElement<CS>],
        info: &[u8],
    ) -> Result<PoprfServerBatchEvaluateResult<CS>> {
        let (t, tweaked_key) = self.tweaked_key(info)?;
        let t_inverted = CS::Group::invert_scalar(t);

        let inputs: Vec<_> = blinded_elements.iter().map(|element| element.0).collect();
        let outputs: Vec<_> = inputs.iter().map(|element| *element * t_inverted).collect();

        let proof = generate_proof::<CS, R>(
            rng,
            t,
            CS::Group::base_elem(),
            tweaked_key,
            &outputs,
            &inputs,
            Mode::Poprf,
        )?;

        Ok(PoprfServerBatchEvaluateResult {
            messages: outputs.into_iter().map(EvaluationElement).collect(),
            proof,
        })
    }

    /// Computes the protocol output for an input directly, without blinding.
    /// This matches what a client obtains for the same input and info.
    ///
    /// # Errors
    /// - [`Error::Input`] if the input is longer than [`u16::MAX`] or maps to
    ///   the identity element.
    /// - [`Error::Info`] if the info is longer than [`u16::MAX`].
    /// - [`Error::Invert`] if the tweaked key is zero.
    pub fn evaluate(&self, input: &[u8], info: &[u8]) -> Result<Output<CS::Hash>> {
        let element = input_element::<CS>(input, Mode::Poprf)?;
        let (t, _) = self.tweaked_key(info)?;

        finalize_after_unblind::<CS>(input, Some(info), element * CS::Group::invert_scalar(t))
    }

    /// The public key clients derive the tweaked verification key from.
    pub fn get_public_key(&self) -> Elem<CS> {
        self.pk
    }

    /// Serialization into bytes.
    pub fn serialize(&self) -> GenericArray<u8, Sum<ScalarLen<CS>, ElemLen<CS>>>
    where
        ScalarLen<CS>: Add<ElemLen<CS>>,
        Sum<ScalarLen<CS>, ElemLen<CS>>: ArrayLength<u8>,
    {
        CS::Group::serialize_scalar(self.sk).concat(CS::Group::serialize_elem(self.pk))
    }

    /// Deserialization from bytes, rejecting a zero private key.
    pub fn deserialize(input: &[u8]) -> Result<Self> {
        if input.len() != ScalarLen::<CS>::USIZE + ElemLen::<CS>::USIZE {
            return Err(Error::Deserialization);
        }

        let (sk_bytes, pk_bytes) = input.split_at(ScalarLen::<CS>::USIZE);

        Ok(Self {
            sk: CS::Group::deserialize_scalar(sk_bytes)?,
            pk: CS::Group::deserialize_elem(pk_bytes)?,
        })
    }

    /// Computes the info tweak `t = sk + m` and the matching tweaked public
    /// key `g * t`.
    fn tweaked_key(&self, info: &[u8]) -> Result<(Scalar<CS>, Elem<CS>)> {
        let t = self.sk + compute_tweak::<CS>(info)?;

        if CS::Group::is_zero_scalar(t).into() {
            return Err(Error::Invert);
        }

        Ok((t, CS::Group::base_elem() * t))
    }

    #[cfg(test)]
    pub(crate) fn get_private_key(&self) -> Scalar<CS> {
        self.sk
    }
}

/// Computes the tweaked public key `g * m + pk` a client verifies proofs
/// against.
fn tweaked_public_key<CS: CipherSuite>(pk: Elem<CS>, info: &[u8]) -> Result<Elem<CS>> {
    Ok(CS::Group::base_elem() * compute_tweak::<CS>(info)? + pk)
}
