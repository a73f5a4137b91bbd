use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::seq::SliceRandom;
use rand::Rng;

use souls_shared::errors::{AppError, ErrorCode};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one number"));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one letter"));
    }
    Ok(())
}

/// Generate a human-readable profile code of the form `K4-7Q-ZC`:
/// an uppercase letter, a digit 1-9, then two dash-separated pairs
/// drawn from uppercase letters and digits.
pub fn generate_profile_code() -> String {
    let mut rng = rand::thread_rng();
    let letter = (b'A' + rng.gen_range(0..26)) as char;
    let digit = rng.gen_range(1..=9);
    let pair = |rng: &mut rand::rngs::ThreadRng| -> String {
        (0..2)
            .map(|_| *CODE_ALPHABET.choose(rng).unwrap() as char)
            .collect()
    };
    format!("{letter}{digit}-{}-{}", pair(&mut rng), pair(&mut rng))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("correct horse 1").unwrap();
        assert!(verify_password("correct horse 1", &hash).unwrap());
        assert!(!verify_password("wrong horse 1", &hash).unwrap());
    }

    #[test]
    fn weak_passwords_rejected() {
        assert!(validate_password("short1").is_err());
        assert!(validate_password("onlyletters").is_err());
        assert!(validate_password("123456789").is_err());
        assert!(validate_password("longenough1").is_ok());
    }

    #[test]
    fn profile_code_format() {
        for _ in 0..50 {
            let code = generate_profile_code();
            let bytes = code.as_bytes();
            assert_eq!(code.len(), 8, "unexpected code: {code}");
            assert!(bytes[0].is_ascii_uppercase());
            assert!((b'1'..=b'9').contains(&bytes[1]));
            assert_eq!(bytes[2], b'-');
            assert_eq!(bytes[5], b'-');
            for &b in [bytes[3], bytes[4], bytes[6], bytes[7]].iter() {
                assert!(b.is_ascii_uppercase() || b.is_ascii_digit());
            }
        }
    }

    #[test]
    fn profile_codes_vary() {
        let codes: std::collections::HashSet<String> =
            (0..20).map(|_| generate_profile_code()).collect();
        assert!(codes.len() > 1);
    }
}
