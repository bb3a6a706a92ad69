//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT encoding/decoding and refresh-token digests.
//! - [`tokens`] -- Session token issuance, verification, rotation, revocation.
//! - [`cookies`] -- `Set-Cookie` construction and cookie parsing.

pub mod cookies;
pub mod jwt;
pub mod password;
pub mod tokens;
