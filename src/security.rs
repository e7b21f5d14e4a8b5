//! Password digests, one-time codes and reset tokens.
//!
//! Passwords are stored as `sha256$<rounds>$<salt>$<digest>`: a random
//! 16-byte salt and an iterated salted SHA-256. One-time codes and reset
//! tokens are random and only their plain SHA-256 hex is persisted.

use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256";
const ROUNDS: u32 = 10_000;
const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 32;

/// Length of a generated one-time code.
pub const OTP_DIGITS: usize = 6;

/// SHA-256 of `value` as lowercase hex.
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn stretch(salt: &str, password: &str, rounds: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();
    for _ in 1..rounds {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(digest);
        digest = hasher.finalize();
    }
    format!("{digest:x}")
}

/// Salted, iterated digest of `password` in the stored format.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = to_hex(&salt);
    let digest = stretch(&salt, password, ROUNDS);
    format!("{SCHEME}${ROUNDS}${salt}${digest}")
}

/// Whether `password` matches a value produced by [`hash_password`].
///
/// A malformed stored value never matches.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(rounds), Some(salt), Some(expected), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(rounds) = rounds.parse::<u32>() else {
        return false;
    };
    if rounds == 0 {
        return false;
    }
    constant_time_eq(&stretch(salt, password, rounds), expected)
}

/// Compare two digests without stopping at the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Random numeric code of [`OTP_DIGITS`] digits, zero-padded.
pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{code:0width$}", width = OTP_DIGITS)
}

/// Random URL-safe token (hex of 32 random bytes).
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}
