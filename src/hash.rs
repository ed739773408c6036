// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

//! A convenience trait for digest bounds used throughout the library

#[cfg(feature = "decaf448")]
use core::marker::PhantomData;

use digest::block_buffer::Eager;
#[cfg(feature = "decaf448")]
use digest::core_api::{
    Block, Buffer, CoreWrapper, ExtendableOutputCore, XofReaderCore,
};
use digest::core_api::{BlockSizeUser, BufferKindUser, CoreProxy, FixedOutputCore, UpdateCore};
#[cfg(feature = "decaf448")]
use digest::{Output, Reset};
use digest::{Digest, FixedOutputReset, HashMarker, OutputSizeUser, Update};
#[cfg(feature = "decaf448")]
use generic_array::typenum::{Le, Unsigned};
use generic_array::typenum::{IsLess, IsLessOrEqual, NonZero, U256};
#[cfg(feature = "decaf448")]
use generic_array::ArrayLength;

/// Convenience type for the output size of a hash function.
pub type OutputSize<D> = <D as OutputSizeUser>::OutputSize;

/// Trait inheriting the requirements from [`Digest`] for compatibility with
/// HKDF, HMAC and `expand_message_xmd`.
pub trait Hash:
    Clone
    + Default
    + BlockSizeUser
    + Digest
    + FixedOutputReset
    + HashMarker
    + OutputSizeUser<OutputSize: IsLess<U256> + IsLessOrEqual<Self::BlockSize>>
    + CoreProxy<Core: ProxyHash + OutputSizeUser<OutputSize = Self::OutputSize>>
    + Update
{
}

impl<T> Hash for T where
    T: Clone
        + Default
        + BlockSizeUser
        + Digest
        + FixedOutputReset
        + HashMarker
        + OutputSizeUser<OutputSize: IsLess<U256> + IsLessOrEqual<T::BlockSize>>
        + CoreProxy<Core: ProxyHash + OutputSizeUser<OutputSize = T::OutputSize>>
        + Update
{
}

/// Requirements on the core type of a [`Hash`], as demanded by the block-level
/// HMAC implementation.
pub trait ProxyHash:
    BlockSizeUser<BlockSize: IsLess<U256, Output: NonZero>>
    + BufferKindUser<BufferKind = Eager>
    + Clone
    + Default
    + FixedOutputCore
    + HashMarker
    + UpdateCore
{
}

impl<T> ProxyHash for T where
    T: BlockSizeUser<BlockSize: IsLess<U256, Output: NonZero>>
        + BufferKindUser<BufferKind = Eager>
        + Clone
        + Default
        + FixedOutputCore
        + HashMarker
        + UpdateCore
{
}

/// SHAKE256 pinned to a fixed output length, standing in where a regular
/// digest is expected. With a 64 byte output this serves as the hash of the
/// decaf448 suite.
#[cfg(feature = "decaf448")]
pub type Shake256Fixed<L> = XofFixedWrapper<sha3::Shake256, L>;

/// Adapter pinning an extendable-output function to a fixed output length.
#[cfg(feature = "decaf448")]
pub type XofFixedWrapper<X, L> = CoreWrapper<XofFixedCore<<X as CoreProxy>::Core, L>>;

/// Core type backing [`XofFixedWrapper`].
#[cfg(feature = "decaf448")]
#[derive(Clone, Debug, Default)]
pub struct XofFixedCore<X, L> {
    xof: X,
    _output: PhantomData<L>,
}

#[cfg(feature = "decaf448")]
impl<X: ExtendableOutputCore, L> HashMarker for XofFixedCore<X, L>
where
    X::BlockSize: IsLess<U256>,
    Le<X::BlockSize, U256>: NonZero,
{
}

#[cfg(feature = "decaf448")]
impl<X: ExtendableOutputCore, L> BlockSizeUser for XofFixedCore<X, L>
where
    X::BlockSize: IsLess<U256>,
    Le<X::BlockSize, U256>: NonZero,
{
    type BlockSize = X::BlockSize;
}

#[cfg(feature = "decaf448")]
impl<X: ExtendableOutputCore, L> BufferKindUser for XofFixedCore<X, L>
where
    X::BlockSize: IsLess<U256>,
    Le<X::BlockSize, U256>: NonZero,
{
    type BufferKind = X::BufferKind;
}

#[cfg(feature = "decaf448")]
impl<X: ExtendableOutputCore, L: ArrayLength<u8> + 'static> OutputSizeUser for XofFixedCore<X, L>
where
    X::BlockSize: IsLess<U256>,
    Le<X::BlockSize, U256>: NonZero,
{
    type OutputSize = L;
}

#[cfg(feature = "decaf448")]
impl<X: ExtendableOutputCore, L> UpdateCore for XofFixedCore<X, L>
where
    X::BlockSize: IsLess<U256>,
    Le<X::BlockSize, U256>: NonZero,
{
    fn update_blocks(&mut self, blocks: &[Block<Self>]) {
        self.xof.update_blocks(blocks);
    }
}

#[cfg(feature = "decaf448")]
impl<X: ExtendableOutputCore, L: ArrayLength<u8> + 'static> FixedOutputCore for XofFixedCore<X, L>
where
    X::BlockSize: IsLess<U256>,
    Le<X::BlockSize, U256>: NonZero,
{
    fn finalize_fixed_core(&mut self, buffer: &mut Buffer<Self>, out: &mut Output<Self>) {
        let mut reader = self.xof.finalize_xof_core(buffer);
        let block_size = <X::ReaderCore as BlockSizeUser>::BlockSize::USIZE;

        for chunk in out.chunks_mut(block_size) {
            let block = reader.read_block();
            chunk.copy_from_slice(&block[..chunk.len()]);
        }
    }
}

#[cfg(feature = "decaf448")]
impl<X: ExtendableOutputCore + Default, L> Reset for XofFixedCore<X, L>
where
    X::BlockSize: IsLess<U256>,
    Le<X::BlockSize, U256>: NonZero,
{
    fn reset(&mut self) {
        self.xof = X::default();
    }
}
