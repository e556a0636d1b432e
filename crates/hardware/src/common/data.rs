//! Memory access types.
//!
//! Memory dispatchers report which kind of access failed so the caller can
//! tell a read violation from a write violation at the same address.

/// Type of memory access operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// Data read access (`get_cell`, serialization).
    Read,

    /// Data write access (`set_cell`, deserialization).
    Write,
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}
