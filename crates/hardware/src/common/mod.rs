//! Common types shared by every part of the framework.
//!
//! This module provides the vocabulary the component tree, clock, and memory
//! subsystems are written in:
//! 1. **Addresses:** The `Address` word and wrapping offset arithmetic.
//! 2. **Ranges:** `AddressRange`, a normalized half-open span of addresses.
//! 3. **Access Types:** Read/Write classification used by access violations.
//! 4. **Errors:** The crate-wide `Error` enum and `Result` alias.

/// Address word and offset helpers.
pub mod addr;

/// Memory access type definitions.
pub mod data;

/// Error taxonomy for component, clock, and memory failures.
pub mod error;

/// Address range type with normalization, containment, and intersection.
pub mod range;

pub use addr::{ADDRESS_BITS, Address};
pub use data::AccessType;
pub use error::{Error, Result};
pub use range::AddressRange;
