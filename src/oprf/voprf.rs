// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! The verifiable mode, in which evaluations carry a proof that they were
//! produced with the key behind the server's public key.

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
    derive_keypair, finalize_after_unblind, generate_proof, input_element, verify_proof,
};
use super::{CipherSuite, Error, Group, Result};

/// A client in verifiable mode. It remembers the blinded element so the
/// server's proof can be checked before unblinding.
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; Elem<CS>, Scalar<CS>)]
pub struct VoprfClient<CS: CipherSuite> {
    pub(crate) blind: Scalar<CS>,
    #[derive_where(skip(Zeroize))]
    pub(crate) blinded_element: Elem<CS>,
}

/// A server in verifiable mode, holding the evaluation key pair.
#[derive_where(Clone, ZeroizeOnDrop)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; Elem<CS>, Scalar<CS>)]
pub struct VoprfServer<CS: CipherSuite> {
    pub(crate) sk: Scalar<CS>,
    #[derive_where(skip(Zeroize))]
    pub(crate) pk: Elem<CS>,
}

/// The state and message produced by [`VoprfClient::blind`].
#[derive_where(Debug; Elem<CS>, Scalar<CS>)]
pub struct VoprfClientBlindResult<CS: CipherSuite> {
    /// The client state, needed to finalize.
    pub state: VoprfClient<CS>,
    /// The message to send to the server.
    pub message: BlindedElement<CS>,
}

/// The message and proof produced by [`VoprfServer::blind_evaluate`].
#[derive_where(Debug; Elem<CS>, Scalar<CS>)]
pub struct VoprfServerEvaluateResult<CS: CipherSuite> {
    /// The message to send back to the client.
    pub message: EvaluationElement<CS>,
    /// The proof of correct evaluation.
    pub proof: Proof<CS>,
}

/// The messages and batch proof produced by
/// [`VoprfServer::batch_blind_evaluate`].
#[derive_where(Debug; Elem<CS>, Scalar<CS>)]
pub struct VoprfServerBatchEvaluateResult<CS: CipherSuite> {
    /// The messages to send back to the client, in the order the blinded
    /// elements were given.
    pub messages: Vec<EvaluationElement<CS>>,
    /// The proof covering the whole batch.
    pub proof: Proof<CS>,
}

impl<CS: CipherSuite> VoprfClient<CS> {
    /// Blinds the input with a random blinding factor, producing the first
    /// protocol message.
    ///
    /// # Errors
    /// [`Error::Input`] if the input is longer than [`u16::MAX`] or maps to
    /// the identity element.
    pub fn blind<R: RngCore + CryptoRng>(
        input: &[u8],
        blinding_factor_rng: &mut R,
    ) -> Result<VoprfClientBlindResult<CS>> {
        let element = input_element::<CS>(input, Mode::Voprf)?;
        let blind = CS::Group::random_scalar(blinding_factor_rng);
        let blinded_element = element * blind;

        Ok(VoprfClientBlindResult {
            state: Self {
                blind,
                blinded_element,
            },
            message: BlindedElement(blinded_element),
        })
    }

    /// Verifies the server's proof against its public key, then unblinds the
    /// evaluation and hashes it into the protocol output.
    ///
    /// # Errors
    /// - [`Error::ProofVerification`] if the proof does not check out.
    /// - [`Error::Input`] if the input is longer than [`u16::MAX`].
    pub fn finalize(
        &self,
        input: &[u8],
        evaluation_element: &EvaluationElement<CS>,
        proof: &Proof<CS>,
        pk: Elem<CS>,
    ) -> Result<Output<CS::Hash>> {
        verify_proof::<CS>(
            CS::Group::base_elem(),
            pk,
            &[self.blinded_element],
            &[evaluation_element.0],
            proof,
            Mode::Voprf,
        )?;

        let unblinded_element = evaluation_element.0 * CS::Group::invert_scalar(self.blind);
        finalize_after_unblind::<CS>(input, None, unblinded_element)
    }

    /// Verifies a batch proof in one shot, then unblinds and hashes each
    /// evaluation. Outputs are returned in input order.
    ///
    /// # Errors
    /// - [`Error::Batch`] if the slice lengths differ or exceed [`u16::MAX`].
    /// - [`Error::ProofVerification`] if the proof does not check out.
    /// - [`Error::Input`] if an input is longer than [`u16::MAX`].
    pub fn batch_finalize<I: AsRef<[u8]>>(
        inputs: &[I],
        clients: &[Self],
        messages: &[EvaluationElement<CS>],
        proof: &Proof<CS>,
        pk: Elem<CS>,
    ) -> Result<Vec<Output<CS::Hash>>> {
        if inputs.len() != clients.len() || inputs.len() != messages.len() {
            return Err(Error::Batch);
        }

        let blinded_elements: Vec<_> = clients
            .iter()
            .map(|client| client.blinded_element)
            .collect();
        let evaluation_elements: Vec<_> = messages.iter().map(|message| message.0).collect();

        verify_proof::<CS>(
            CS::Group::base_elem(),
            pk,
            &blinded_elements,
            &evaluation_elements,
            proof,
            Mode::Voprf,
        )?;

        inputs
            .iter()
            .zip(clients)
            .zip(messages)
            .map(|((input, client), message)| {
                let unblinded_element = message.0 * CS::Group::invert_scalar(client.blind);
                finalize_after_unblind::<CS>(input.as_ref(), None, unblinded_element)
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

impl<CS: CipherSuite> VoprfServer<CS> {
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
        let (sk, pk) = derive_keypair::<CS>(seed, info, Mode::Voprf)?;
        Ok(Self { sk, pk })
    }

    /// Evaluates a client-blinded element and proves the evaluation used the
    /// key pair's private key.
    pub fn blind_evaluate<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        blinded_element: &BlindedElement<CS>,
    ) -> Result<VoprfServerEvaluateResult<CS>> {
        let evaluation_element = blinded_element.0 * self.sk;

        let proof = generate_proof::<CS, R>(
            rng,
            self.sk,
            CS::Group::base_elem(),
            self.pk,
            &[blinded_element.0],
            &[evaluation_element],
            Mode::Voprf,
        )?;

        Ok(VoprfServerEvaluateResult {
            message: EvaluationElement(evaluation_element),
            proof,
        })
    }

    /// Evaluates a batch of blinded elements under a single proof.
    ///
    /// # Errors
    /// [`Error::Batch`] if the batch exceeds [`u16::MAX`] elements.
    pub fn batch_blind_evaluate<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        blinded_elements: &[BlindedElement<CS>],
    ) -> Result<VoprfServerBatchEvaluateResult<CS>> {
        let inputs: Vec<_> = blinded_elements.iter().map(|element| element.0).collect();
        let outputs: Vec<_> = inputs.iter().map(|element| *element * self.sk).collect();

        let proof = generate_proof::<CS, R>(
            rng,
            self.sk,
            CS::Group::base_elem(),
            self.pk,
            &inputs,
            &outputs,
            Mode::Voprf,
        )?;

        Ok(VoprfServerBatchEvaluateResult {
            messages: outputs.into_iter().map(EvaluationElement).collect(),
            proof,
        })
    }

    /// Computes the protocol output for an input directly, without blinding.
    /// This matches what a client obtains for the same input.
    ///
    /// # Errors
    /// [`Error::Input`] if the input is longer than [`u16::MAX`] or maps to
    /// the identity element.
    pub fn evaluate(&self, input: &[u8]) -> Result<Output<CS::Hash>> {
        let element = input_element::<CS>(input, Mode::Voprf)?;
        finalize_after_unblind::<CS>(input, None, element * self.sk)
    }

    /// The public key clients verify proofs against.
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

    #[cfg(test)]
    pub(crate) fn get_private_key(&self) -> Scalar<CS> {
        self.sk
    }
}
