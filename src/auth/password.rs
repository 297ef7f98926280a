use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use tracing::error;

pub const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    // Stand-in for accounts that don't exist, so a failed login costs one argon2 verify either way.
    static ref DECOY_HASH: Option<String> = hash_password("rollcall-decoy-credential").ok();
}

#[cfg(test)]
thread_local! {
    static VERIFICATIONS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Argon2 verifications run on the current thread.
#[cfg(test)]
pub(crate) fn verifications() -> usize {
    VERIFICATIONS.with(|c| c.get())
}

/// Checks a new account password before it is hashed.
pub fn check_policy(plain: &str) -> Result<(), String> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("password must be at least {MIN_PASSWORD_LEN} characters"));
    }
    if plain.trim().is_empty() {
        return Err("password must not be blank".into());
    }
    Ok(())
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| {
            error!(error = %e, "could not hash account password");
            anyhow::anyhow!("password hashing failed: {e}")
        })
}

/// Checks a login attempt against the stored PHC string.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    #[cfg(test)]
    VERIFICATIONS.with(|c| c.set(c.get() + 1));

    let phc = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "stored password hash is not a PHC string");
        anyhow::anyhow!("stored password hash is unreadable: {e}")
    })?;
    Ok(Argon2::default().verify_password(plain.as_bytes(), &phc).is_ok())
}

/// Verifies a login attempt for an account that may not exist.
///
/// Without an account the password is checked against a decoy hash and the
/// result is always `false`.
pub fn verify_login(plain: &str, stored: Option<&str>) -> anyhow::Result<bool> {
    match stored {
        Some(hash) => verify_password(plain, hash),
        None => {
            if let Some(decoy) = DECOY_HASH.as_deref() {
                let _ = verify_password(plain, decoy);
            }
            Ok(false)
        }
    }
}
