use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

/// One-way credential hashing. Implementations embed the salt in the digest.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plain: &str) -> anyhow::Result<String>;

    /// Returns `false` for a wrong password and for a digest it cannot parse.
    fn verify(&self, plain: &str, digest: &str) -> bool;
}

/// Argon2id with the crate's default cost parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        hash_password(plain)
    }

    fn verify(&self, plain: &str, digest: &str) -> bool {
        verify_password(plain, digest)
    }
}

/// PHC-encoded Argon2id digest with a fresh random salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|digest| digest.to_string())
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            anyhow::anyhow!("hash password: {e}")
        })
}

pub fn verify_password(plain: &str, digest: &str) -> bool {
    let parsed = match PasswordHash::new(digest) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "stored password digest is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_phc_argon2id_and_verifies() {
        let digest = hash_password("tr0ub4dor&3").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(verify_password("tr0ub4dor&3", &digest));
        assert!(!digest.contains("tr0ub4dor"));
    }

    #[test]
    fn near_miss_password_is_rejected() {
        let digest = Argon2Hasher.hash("blue-lantern-42").unwrap();
        assert!(!Argon2Hasher.verify("blue-lantern-43", &digest));
        assert!(!Argon2Hasher.verify("", &digest));
    }

    #[test]
    fn malformed_digest_fails_closed() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("password123").unwrap();
        let b = hash_password("password123").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("password123", &a));
        assert!(verify_password("password123", &b));
    }
}
