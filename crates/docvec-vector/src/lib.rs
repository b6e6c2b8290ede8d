//! docvec-vector
//!
//! Per-document embedding stores: build-time validation and normalization,
//! a flat exact index, a checksummed binary format and atomic persistence.

pub mod codec;
mod dir;
pub mod math;
mod store;

pub use codec::DecodeError;
pub use dir::StoreDir;
pub use store::DocumentStore;
