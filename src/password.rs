use thiserror::Error;

/// Characters accepted as the "special" class.
pub const SPECIAL_CHARACTERS: &[char] = &['!', '@', '#', '$', '%', '^', '&', '*', '.'];

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// PolicyError
///
/// The first password-strength rule a candidate fails. Rules are checked in
/// declaration order and only one is ever reported.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    #[error("password needs to be at least 8 characters long")]
    TooShort,
    #[error("Password Not Compliant: min 1 Maj")]
    MissingUppercase,
    #[error("Password Not Compliant: min 1 lower case")]
    MissingLowercase,
    #[error("Password Not Compliant: min 1 Number")]
    MissingDigit,
    #[error("Password Not Compliant: min 1 special")]
    MissingSpecial,
}

/// validate_password
///
/// Checks length, then uppercase, lowercase, digit and special character, and
/// returns the first rule that is violated.
pub fn validate_password(password: &str) -> Result<(), PolicyError> {
    // Measured in bytes: multibyte characters count for their UTF-8 width.
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(PolicyError::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PolicyError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PolicyError::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PolicyError::MissingDigit);
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(&c)) {
        return Err(PolicyError::MissingSpecial);
    }
    Ok(())
}

/// Hashes a plaintext password with bcrypt at the given cost.
///
/// bcrypt is CPU bound; async callers should run this on the blocking pool.
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Returns false for a wrong password and for a hash that cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("stored password hash could not be verified: {}", e);
            false
        }
    }
}
