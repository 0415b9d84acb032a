//! # Token Orchestration
//!
//! The creator ([`issue`]) encodes, signs, and optionally encrypts a claim
//! set to mint a compact token; the validator ([`validate`]) runs the
//! reverse state machine (parse, decrypt, verify, claim checks), failing
//! closed on any ambiguity. Neither holds state between calls.

pub mod create;
pub mod validate;

pub use create::issue;
pub use validate::{validate, ValidationOptions, ValidationParameters};
