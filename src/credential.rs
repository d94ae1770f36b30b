// Credential lifecycle: plaintext goes in, only a salted one-way hash is kept
use crate::db::UserCredential;
use crate::error::DomainError;

/// Hash a plaintext password for storage. The plaintext is rejected up front
/// when empty and is never persisted or retrievable.
pub fn hash_password(plaintext: &str) -> Result<String, DomainError> {
    if plaintext.is_empty() {
        return Err(DomainError::InvalidInput("password must not be empty"));
    }
    bcrypt::hash(plaintext, bcrypt::DEFAULT_COST).map_err(|e| DomainError::Storage(e.to_string()))
}

/// Wrapped hash-comparison object, lazily constructed from a stored hash.
/// Comparison never propagates an error outward: a malformed stored hash is a
/// data-integrity situation the caller must treat exactly like a wrong
/// password.
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub fn new(stored_hash: &str) -> Self {
        PasswordDigest(stored_hash.to_string())
    }

    pub fn verify(&self, candidate: &str) -> bool {
        bcrypt::verify(candidate, &self.0).unwrap_or(false)
    }
}

impl UserCredential {
    /// The credential's password attribute, as a comparison object.
    pub fn password(&self) -> PasswordDigest {
        PasswordDigest::new(&self.password_hash)
    }
}
