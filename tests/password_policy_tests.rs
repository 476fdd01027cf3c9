use catalog_api::{
    AppError,
    password::{PolicyError, hash_password, validate_password, verify_password},
};

#[test]
fn test_length_is_checked_first() {
    // Fails every other rule too, but only the first is reported.
    assert_eq!(validate_password("abc"), Err(PolicyError::TooShort));
    assert_eq!(validate_password("Ab1.xyz"), Err(PolicyError::TooShort));
}

#[test]
fn test_length_counts_utf8_bytes() {
    // Seven characters, ten bytes.
    let accented = "Ab1!\u{e9}\u{e9}\u{e9}";
    assert_eq!(accented.chars().count(), 7);

    assert_eq!(validate_password(accented), Ok(()));
    // Six bytes in total is still short.
    assert_eq!(validate_password("A\u{e9}\u{e9}1"), Err(PolicyError::TooShort));
}

#[test]
fn test_each_rule_reports_its_message() {
    let cases = [
        ("lowercase1!", "Password Not Compliant: min 1 Maj"),
        ("UPPERCASE1!", "Password Not Compliant: min 1 lower case"),
        ("NoDigits!!", "Password Not Compliant: min 1 Number"),
        ("NoSpecial12", "Password Not Compliant: min 1 special"),
    ];

    for (candidate, expected) in cases {
        let err = validate_password(candidate).unwrap_err();
        assert_eq!(err.to_string(), expected, "candidate: {candidate}");
    }
}

#[test]
fn test_policy_error_becomes_bad_request() {
    let err: AppError = PolicyError::MissingDigit.into();

    assert_eq!(err, AppError::validation("Password Not Compliant: min 1 Number"));
    assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[test]
fn test_compliant_passwords() {
    for candidate in ["Sup3r.Secret", "Abcdef1#", "P@ssw0rd", "Zz9$Zz9$Zz9$"] {
        assert_eq!(validate_password(candidate), Ok(()), "candidate: {candidate}");
    }
}

#[test]
fn test_hash_and_verify() {
    let hash = hash_password("Sup3r.Secret", 4).unwrap();

    assert_ne!(hash, "Sup3r.Secret");
    assert!(verify_password("Sup3r.Secret", &hash));
    assert!(!verify_password("Sup3r.Secreu", &hash));
}

#[test]
fn test_unparsable_hash_never_verifies() {
    assert!(!verify_password("Sup3r.Secret", "not-a-bcrypt-hash"));
}
