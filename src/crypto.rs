use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use error_stack::{Report, Result};
use once_cell::sync::Lazy;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;

static CONTEXT: Lazy<Argon2<'static>> = Lazy::new(|| {
    Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2::Params::DEFAULT,
    )
});

#[derive(Debug, Error)]
#[error("Failed to generate password hash")]
pub struct HashPasswordError;

/// Hashes a secret with Argon2id and a fresh random salt, producing
/// a PHC string (`$argon2id$v=19$...`).
pub fn hash(password: impl AsRef<[u8]>) -> Result<String, HashPasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = CONTEXT
        .hash_password(password.as_ref(), &salt)
        .map_err(|e| Report::new(HashPasswordError).attach_printable(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Result of checking a presented secret against a [`StoredCredential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Matched,
    /// The presented secret equals the stored value byte for byte, so
    /// the stored value is a plaintext secret and should be rehashed.
    MatchedPlaintext,
    Rejected,
}

impl Verdict {
    #[must_use]
    pub fn is_match(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// A credential as it is stored on an operator account.
///
/// Accounts created before hashing was introduced keep their secret
/// in plaintext. Only values that parse as a PHC string naming an
/// Argon2 variant are treated as hashes; a plaintext secret that
/// merely starts with `$` stays plaintext.
#[derive(Debug)]
pub enum StoredCredential<'a> {
    Hashed { hash: PasswordHash<'a>, raw: &'a str },
    LegacyPlaintext(&'a str),
}

impl<'a> StoredCredential<'a> {
    #[must_use]
    pub fn classify(stored: &'a str) -> Self {
        match PasswordHash::new(stored) {
            Ok(hash) if argon2::Algorithm::new(hash.algorithm).is_ok() => Self::Hashed {
                hash,
                raw: stored,
            },
            _ => Self::LegacyPlaintext(stored),
        }
    }

    #[must_use]
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::LegacyPlaintext(..))
    }

    #[must_use]
    pub fn verify(&self, presented: &[u8]) -> Verdict {
        match self {
            Self::Hashed { hash, raw } => match CONTEXT.verify_password(presented, hash) {
                Ok(..) => Verdict::Matched,
                Err(argon2::password_hash::Error::Password) => Verdict::Rejected,
                Err(error) => {
                    // looks like Argon2 but cannot be verified as one
                    warn!(%error, "stored credential is not a usable hash, comparing it as plaintext");
                    compare_plaintext(raw, presented)
                }
            },
            Self::LegacyPlaintext(stored) => compare_plaintext(stored, presented),
        }
    }
}

fn compare_plaintext(stored: &str, presented: &[u8]) -> Verdict {
    if bool::from(stored.as_bytes().ct_eq(presented)) {
        Verdict::MatchedPlaintext
    } else {
        Verdict::Rejected
    }
}

/// Burns roughly the same amount of time as verifying a real hash,
/// so unknown emails cannot be told apart by response time.
pub fn dummy_verify(presented: &[u8]) {
    static DUMMY: Lazy<Option<String>> = Lazy::new(|| hash(b"rollcall-dummy-credential").ok());

    if let Some(dummy) = DUMMY.as_deref() {
        let _outcome = StoredCredential::classify(dummy).verify(presented);
    }
}
