// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! Transcript computations shared by all three protocol modes.

use digest::{Digest, Output};
use generic_array::typenum::Unsigned;
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;

use crate::hash::{Hash, OutputSize};
use crate::serialization::UpdateExt;

use super::ciphersuite::{Elem, ElemLen, Scalar};
use super::common::{Mode, Proof};
use super::{CipherSuite, Error, Group, Result};

pub(crate) const STR_CHALLENGE: &[u8] = b"Challenge";
pub(crate) const STR_COMPOSITE: &[u8] = b"Composite";
pub(crate) const STR_DERIVE_KEYPAIR: &[u8] = b"DeriveKeyPair";
pub(crate) const STR_FINALIZE: &[u8] = b"Finalize";
pub(crate) const STR_HASH_TO_GROUP: &[u8] = b"HashToGroup-";
pub(crate) const STR_HASH_TO_SCALAR: &[u8] = b"HashToScalar-";
pub(crate) const STR_INFO: &[u8] = b"Info";
pub(crate) const STR_OPRF_V1: &[u8] = b"OPRFV1-";
pub(crate) const STR_SEED: &[u8] = b"Seed-";

/// Builds `"OPRFV1-" || I2OSP(mode, 1) || "-" || ID` as a list of parts.
pub(crate) fn create_context_string<CS: CipherSuite>(mode: Mode) -> [&'static [u8]; 4] {
    [STR_OPRF_V1, mode.as_bytes(), b"-", CS::ID.as_bytes()]
}

pub(crate) fn create_dst<CS: CipherSuite>(
    prefix: &'static [u8],
    mode: Mode,
) -> [&'static [u8]; 5] {
    let [version, mode_id, separator, suite_id] = create_context_string::<CS>(mode);
    [prefix, version, mode_id, separator, suite_id]
}

/// Maps an input to a non-identity group element under the mode's domain
/// separation tag.
pub(crate) fn input_element<CS: CipherSuite>(input: &[u8], mode: Mode) -> Result<Elem<CS>> {
    if u16::try_from(input.len()).is_err() {
        return Err(Error::Input);
    }

    let dst = create_dst::<CS>(STR_HASH_TO_GROUP, mode);
    let element = CS::Group::hash_to_curve::<CS::Hash>(&[input], &dst)?;

    if element.ct_eq(&CS::Group::identity_elem()).into() {
        return Err(Error::Input);
    }

    Ok(element)
}

/// Implements `DeriveKeyPair` from [RFC 9497 § 3.2].
///
/// [RFC 9497 § 3.2]: https://www.rfc-editor.org/rfc/rfc9497#section-3.2
pub(crate) fn derive_keypair<CS: CipherSuite>(
    seed: &[u8],
    info: &[u8],
    mode: Mode,
) -> Result<(Scalar<CS>, Elem<CS>)> {
    if u16::try_from(seed.len()).is_err() {
        return Err(Error::Seed);
    }

    let info_len = u16::try_from(info.len())
        .map_err(|_| Error::Info)?
        .to_be_bytes();
    let dst = create_dst::<CS>(STR_DERIVE_KEYPAIR, mode);

    for counter in u8::MIN..=u8::MAX {
        let sk = CS::Group::hash_to_scalar::<CS::Hash>(&[seed, &info_len, info, &[counter]], &dst)?;

        if !bool::from(CS::Group::is_zero_scalar(sk)) {
            return Ok((sk, CS::Group::base_elem() * sk));
        }
    }

    Err(Error::DeriveKeyPair)
}

/// Implements `ComputeComposites` and `ComputeCompositesFast` from
/// [RFC 9497 § 2.2.1]; the fast path is taken when the private key is
/// supplied.
///
/// [RFC 9497 § 2.2.1]: https://www.rfc-editor.org/rfc/rfc9497#section-2.2.1
fn compute_composites<CS: CipherSuite>(
    k_option: Option<Scalar<CS>>,
    b: Elem<CS>,
    c_slice: &[Elem<CS>],
    d_slice: &[Elem<CS>],
    mode: Mode,
) -> Result<(Elem<CS>, Elem<CS>)> {
    if c_slice.len() != d_slice.len() || u16::try_from(c_slice.len()).is_err() {
        return Err(Error::Batch);
    }

    let h2s_dst = create_dst::<CS>(STR_HASH_TO_SCALAR, mode);
    let seed_dst = create_dst::<CS>(STR_SEED, mode);
    let seed_dst_len = u16::try_from(seed_dst.iter().map(|part| part.len()).sum::<usize>())
        .map_err(|_| Error::Input)?
        .to_be_bytes();

    let elem_len = ElemLen::<CS>::U16.to_be_bytes();
    let seed_len = OutputSize::<CS::Hash>::U16.to_be_bytes();

    let seed = CS::Hash::new()
        .chain_update(elem_len)
        .chain_update(CS::Group::serialize_elem(b))
        .chain_update(seed_dst_len)
        .chain_iter(seed_dst.into_iter())
        .finalize();

    let mut m = CS::Group::identity_elem();
    let mut z = CS::Group::identity_elem();

    for (i, (c, d)) in c_slice.iter().zip(d_slice).enumerate() {
        let index = u16::try_from(i).map_err(|_| Error::Batch)?.to_be_bytes();
        let c_bytes = CS::Group::serialize_elem(*c);
        let d_bytes = CS::Group::serialize_elem(*d);

        let di = CS::Group::hash_to_scalar::<CS::Hash>(
            &[
                &seed_len,
                &seed,
                &index,
                &elem_len,
                &c_bytes,
                &elem_len,
                &d_bytes,
                STR_COMPOSITE,
            ],
            &h2s_dst,
        )?;

        m = *c * di + m;

        if k_option.is_none() {
            z = *d * di + z;
        }
    }

    let z = match k_option {
        Some(k) => m * k,
        None => z,
    };

    Ok((m, z))
}

fn compute_challenge<CS: CipherSuite>(
    b: Elem<CS>,
    m: Elem<CS>,
    z: Elem<CS>,
    t2: Elem<CS>,
    t3: Elem<CS>,
    mode: Mode,
) -> Result<Scalar<CS>> {
    let h2s_dst = create_dst::<CS>(STR_HASH_TO_SCALAR, mode);
    let elem_len = ElemLen::<CS>::U16.to_be_bytes();

    let b_bytes = CS::Group::serialize_elem(b);
    let m_bytes = CS::Group::serialize_elem(m);
    let z_bytes = CS::Group::serialize_elem(z);
    let t2_bytes = CS::Group::serialize_elem(t2);
    let t3_bytes = CS::Group::serialize_elem(t3);

    CS::Group::hash_to_scalar::<CS::Hash>(
        &[
            &elem_len,
            &b_bytes,
            &elem_len,
            &m_bytes,
            &elem_len,
            &z_bytes,
            &elem_len,
            &t2_bytes,
            &elem_len,
            &t3_bytes,
            STR_CHALLENGE,
        ],
        &h2s_dst,
    )
}

/// Implements `GenerateProof` from [RFC 9497 § 2.2.1].
///
/// [RFC 9497 § 2.2.1]: https://www.rfc-editor.org/rfc/rfc9497#section-2.2.1
pub(crate) fn generate_proof<CS: CipherSuite, R: RngCore + CryptoRng>(
    rng: &mut R,
    k: Scalar<CS>,
    a: Elem<CS>,
    b: Elem<CS>,
    c_slice: &[Elem<CS>],
    d_slice: &[Elem<CS>],
    mode: Mode,
) -> Result<Proof<CS>> {
    let (m, z) = compute_composites::<CS>(Some(k), b, c_slice, d_slice, mode)?;

    let r = CS::Group::random_scalar(rng);
    let t2 = a * r;
    let t3 = m * r;

    let c_scalar = compute_challenge::<CS>(b, m, z, t2, t3, mode)?;
    let s_scalar = r - c_scalar * k;

    Ok(Proof { c_scalar, s_scalar })
}

/// Implements `VerifyProof` from [RFC 9497 § 2.2.2].
///
/// [RFC 9497 § 2.2.2]: https://www.rfc-editor.org/rfc/rfc9497#section-2.2.2
pub(crate) fn verify_proof<CS: CipherSuite>(
    a: Elem<CS>,
    b: Elem<CS>,
    c_slice: &[Elem<CS>],
    d_slice: &[Elem<CS>],
    proof: &Proof<CS>,
    mode: Mode,
) -> Result<()> {
    let (m, z) = compute_composites::<CS>(None, b, c_slice, d_slice, mode)?;
    let t2 = a * proof.s_scalar + b * proof.c_scalar;
    let t3 = m * proof.s_scalar + z * proof.c_scalar;

    let expected = compute_challenge::<CS>(b, m, z, t2, t3, mode)?;

    if expected.ct_eq(&proof.c_scalar).into() {
        Ok(())
    } else {
        Err(Error::ProofVerification)
    }
}

/// Hashes the unblinded element into the protocol output, implementing the
/// `Finalize` framing common to all modes. The info is only framed in for the
/// partially-oblivious mode.
pub(crate) fn finalize_after_unblind<CS: CipherSuite>(
    input: &[u8],
    info: Option<&[u8]>,
    unblinded_element: Elem<CS>,
) -> Result<Output<CS::Hash>> {
    let input_len = u16::try_from(input.len())
        .map_err(|_| Error::Input)?
        .to_be_bytes();
    let elem_len = ElemLen::<CS>::U16.to_be_bytes();

    let mut hash = CS::Hash::new().chain_update(input_len).chain_update(input);

    if let Some(info) = info {
        let info_len = u16::try_from(info.len())
            .map_err(|_| Error::Info)?
            .to_be_bytes();
        hash = hash.chain_update(info_len).chain_update(info);
    }

    Ok(hash
        .chain_update(elem_len)
        .chain_update(CS::Group::serialize_elem(unblinded_element))
        .chain_update(STR_FINALIZE)
        .finalize())
}

/// Computes the info tweak scalar `m` for the partially-oblivious mode.
pub(crate) fn compute_tweak<CS: CipherSuite>(info: &[u8]) -> Result<Scalar<CS>> {
    let info_len = u16::try_from(info.len())
        .map_err(|_| Error::Info)?
        .to_be_bytes();
    let dst = create_dst::<CS>(STR_HASH_TO_SCALAR, Mode::Poprf);

    CS::Group::hash_to_scalar::<CS::Hash>(&[STR_INFO, &info_len, info], &dst)
}
