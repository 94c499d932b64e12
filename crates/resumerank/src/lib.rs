//! Public facade crate for `resumerank`.
//!
//! Re-exports the backend-agnostic types from `resumerank-core` at the root and the local
//! extraction/ranking implementation as `local`.

pub use resumerank_core::*;
pub use resumerank_local as local;
pub use resumerank_local::rank::{rank, rank_or_empty};
pub use resumerank_local::{screen, Screening};
