//! Memory tests.


/// Lazily allocated leaves.
pub mod chunked;

/// Address dispatch, the lookup cache, and registration.
pub mod main_memory;
