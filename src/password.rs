//! Two-stage password hashing.
//!
//! Stored credentials are `bcrypt(hex(sha512_256(password)))`. The SHA-512/256
//! pre-hash bounds every password to 64 ASCII bytes, which keeps it under
//! bcrypt's 72 byte input limit without truncating long passwords. The digest
//! is hex encoded so no byte of it is ever dropped before comparison.

use bcrypt::BcryptError;
use sha2::{Digest, Sha512_256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    /// The stored hash is not a valid bcrypt string.
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(#[source] BcryptError),

    #[error("failed to hash password: {0}")]
    Hashing(#[source] BcryptError),
}

/// Outcome of comparing a submitted password with a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Match,
    Mismatch,
}

/// Stage one: fixed-width encoding of the password digest.
pub fn prehash(plaintext: &str) -> String {
    hex::encode(Sha512_256::digest(plaintext.as_bytes()))
}

/// Checks `plaintext` against a hash produced by [`hash_password`].
///
/// A wrong password is `Ok(Verification::Mismatch)`. `Err` is reserved for
/// hashes bcrypt cannot parse.
pub fn verify(plaintext: &str, stored_hash: &str) -> Result<Verification, PasswordError> {
    let digest = prehash(plaintext);
    match bcrypt::verify(digest, stored_hash) {
        Ok(true) => Ok(Verification::Match),
        Ok(false) => Ok(Verification::Mismatch),
        Err(e) => Err(PasswordError::MalformedHash(e)),
    }
}

pub fn hash_password(plaintext: &str, cost: u32) -> Result<String, PasswordError> {
    bcrypt::hash(prehash(plaintext), cost).map_err(PasswordError::Hashing)
}
