//! Address word definition.
//!
//! Simulated addresses are plain unsigned machine words. Arithmetic on them is
//! performed modulo the address width so that offsets computed near the top of
//! the address space wrap instead of panicking in debug builds.

/// A simulated address.
pub type Address = u64;

/// Width of [`Address`] in bits.
pub const ADDRESS_BITS: u32 = Address::BITS;

/// Number of distinct addresses, one past the highest representable address.
pub const ADDRESS_SPACE: u128 = 1 << ADDRESS_BITS;

/// Adds `delta` to `base`, wrapping at the address width.
#[inline(always)]
pub const fn advance(base: Address, delta: Address) -> Address {
    base.wrapping_add(delta)
}

/// Distance from `base` to `addr`, wrapping at the address width.
#[inline(always)]
pub const fn distance(base: Address, addr: Address) -> Address {
    addr.wrapping_sub(base)
}
