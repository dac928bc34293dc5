use rand::{distributions::Alphanumeric, Rng};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// Well-formed bcrypt hash that matches no password, verified against when the
// user does not exist so both login failures cost the same.
const DUMMY_HASH: &str = "$2b$12$C6UzMDM.H6dfI/f/IKxGhu1JtJ2lh2E6ZlKdfcFq3Nf9z1nRb4E3W";

pub fn generate_random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

pub async fn hash_password(password: &str, cost: u32) -> Result<String, CryptoError> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, CryptoError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(valid)
}

/// Checks `password` against `hash`, or against a dummy hash when there is no
/// stored user. Malformed hashes count as a mismatch.
pub async fn verify_password_or_dummy(password: &str, hash: Option<&str>) -> bool {
    let candidate = hash.unwrap_or(DUMMY_HASH);
    let valid = verify_password(password, candidate).await.unwrap_or(false);
    valid && hash.is_some()
}
