/// Team invite tokens
///
/// The plaintext token is handed to the invitee (by email) exactly once. Only
/// its SHA-256 hash is persisted, so a leaked `team_invites` table cannot be used
/// to join teams.
///
/// # Token Format
///
/// `tbinv_` followed by 40 base62 characters (46 chars total).
///
/// # Example
///
/// ```
/// use teamboard_shared::auth::invite_token::{generate_invite_token, hash_invite_token};
///
/// let (token, hash) = generate_invite_token();
/// assert!(token.starts_with("tbinv_"));
/// assert_eq!(hash, hash_invite_token(&token));
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_RANDOM_LENGTH: usize = 40;

const TOKEN_PREFIX: &str = "tbinv_";

/// Total length of an invite token
pub const INVITE_TOKEN_LENGTH: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_LENGTH;

/// Generates a fresh token and its storage hash
///
/// Returns `(plaintext_token, sha256_hex)`.
pub fn generate_invite_token() -> (String, String) {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    let random_part: String = (0..TOKEN_RANDOM_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    let token = format!("{}{}", TOKEN_PREFIX, random_part);
    let hash = hash_invite_token(&token);

    (token, hash)
}

/// Hex-encoded SHA-256 of the token (64 chars)
pub fn hash_invite_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.trim().as_bytes()))
}

/// Cheap shape check before touching the store
pub fn is_well_formed(token: &str) -> bool {
    let token = token.trim();
    token.len() == INVITE_TOKEN_LENGTH
        && token
            .strip_prefix(TOKEN_PREFIX)
            .map_or(false, |rest| rest.chars().all(|c| c.is_ascii_alphanumeric()))
}
