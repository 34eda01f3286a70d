// ============================
// crates/engine/src/password.rs
// ============================
//! Password hashing and verification.
//!
//! The engine stores and compares opaque hashes only. The concrete scheme
//! sits behind [`PasswordService`] so callers can swap it; the default is
//! argon2id in PHC string format.
use crate::config::PasswordRequirements;
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use zeroize::Zeroize;

/// Opaque hashing collaborator.
pub trait PasswordService: Send + Sync {
    /// Hash a plaintext password into a self-describing hash string.
    fn hash(&self, plain: &str) -> anyhow::Result<String>;
    /// Verify a plaintext password against a stored hash.
    fn verify(&self, hash: &str, plain: &str) -> bool;
}

/// Default argon2id implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Service;

impl PasswordService for Argon2Service {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, hash: &str, plain: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Hash a password and zeroize the plaintext buffer.
pub fn hash_password_secure(
    service: &dyn PasswordService,
    plain: &mut String,
) -> anyhow::Result<String> {
    let hash = service.hash(plain);
    plain.zeroize();
    hash
}

/// Check if a password meets the complexity requirements.
pub fn validate_password_strength(password: &str, requirements: &PasswordRequirements) -> bool {
    if password.len() < requirements.min_length {
        return false;
    }

    if requirements.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        return false;
    }

    if requirements.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
        return false;
    }

    if requirements.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    if requirements.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
        return false;
    }

    true
}
