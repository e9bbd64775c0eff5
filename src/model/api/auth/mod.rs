mod token;
mod user;

use argon2::Config;
use rand::Rng;

pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{Rights, User};

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::Error> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())
}
