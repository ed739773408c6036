// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! The protocol mode and the wire types shared by all three modes.

use core::ops::Add;

use derive_where::derive_where;
use generic_array::sequence::Concat;
use generic_array::typenum::{Sum, Unsigned};
use generic_array::GenericArray;

use super::ciphersuite::{Elem, ElemLen, Scalar, ScalarLen};
use super::{CipherSuite, Error, Group, Result};

/// The protocol mode, fixed by the choice of client and server type. It keys
/// all domain separation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Mode {
    /// The base mode.
    Oprf,
    /// The verifiable mode.
    Voprf,
    /// The partially-oblivious mode.
    Poprf,
}

impl Mode {
    /// The mode identifier byte used in the context string.
    pub(crate) fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Oprf => &[0],
            Self::Voprf => &[1],
            Self::Poprf => &[2],
        }
    }
}

/// A client-blinded group element, sent to the server for evaluation.
#[derive_where(Clone)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; Elem<CS>)]
pub struct BlindedElement<CS: CipherSuite>(pub(crate) Elem<CS>);

/// A server-evaluated group element, returned to the client for unblinding.
#[derive_where(Clone)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; Elem<CS>)]
pub struct EvaluationElement<CS: CipherSuite>(pub(crate) Elem<CS>);

/// A non-interactive zero-knowledge proof that a batch of elements was
/// evaluated with the key committed to by the server's public key.
#[derive_where(Clone)]
#[derive_where(Debug, Eq, Hash, Ord, PartialEq, PartialOrd; Scalar<CS>)]
pub struct Proof<CS: CipherSuite> {
    pub(crate) c_scalar: Scalar<CS>,
    pub(crate) s_scalar: Scalar<CS>,
}

impl<CS: CipherSuite> BlindedElement<CS> {
    /// Serialization into bytes.
    pub fn serialize(&self) -> GenericArray<u8, ElemLen<CS>> {
        CS::Group::serialize_elem(self.0)
    }

    /// Deserialization from bytes.
    pub fn deserialize(input: &[u8]) -> Result<Self> {
        CS::Group::deserialize_elem(input).map(Self)
    }
}

impl<CS: CipherSuite> EvaluationElement<CS> {
    /// Serialization into bytes.
    pub fn serialize(&self) -> GenericArray<u8, ElemLen<CS>> {
        CS::Group::serialize_elem(self.0)
    }

    /// Deserialization from bytes.
    pub fn deserialize(input: &[u8]) -> Result<Self> {
        CS::Group::deserialize_elem(input).map(Self)
    }
}

impl<CS: CipherSuite> Proof<CS>
where
    ScalarLen<CS>: Add<ScalarLen<CS>>,
    Sum<ScalarLen<CS>, ScalarLen<CS>>: generic_array::ArrayLength<u8>,
{
    /// Serialization into bytes.
    pub fn serialize(&self) -> GenericArray<u8, Sum<ScalarLen<CS>, ScalarLen<CS>>> {
        CS::Group::serialize_scalar(self.c_scalar)
            .concat(CS::Group::serialize_scalar(self.s_scalar))
    }

    /// Deserialization from bytes.
    pub fn deserialize(input: &[u8]) -> Result<Self> {
        if input.len() != 2 * ScalarLen::<CS>::USIZE {
            return Err(Error::Deserialization);
        }

        let (c_bytes, s_bytes) = input.split_at(ScalarLen::<CS>::USIZE);

        Ok(Self {
            c_scalar: CS::Group::deserialize_scalar(c_bytes)?,
            s_scalar: CS::Group::deserialize_scalar(s_bytes)?,
        })
    }
}
