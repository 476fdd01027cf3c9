use catalog_api::auth::{Claims, RegisteredClaims, TOKEN_TTL_HOURS, TokenError, TokenService};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

const SECRET: &str = "token-test-secret";

fn issued_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
}

#[test]
fn test_token_verifies_within_lifetime() {
    let service = TokenService::with_default_ttl(SECRET);
    let issued = service.issue_at(7, issued_at()).unwrap();

    assert_eq!(issued.expires_at, issued_at() + Duration::hours(TOKEN_TTL_HOURS));
    assert_eq!(service.verify_at(&issued.token, issued_at() + Duration::hours(1)), Ok(7));
}

#[test]
fn test_token_expires_after_two_hours() {
    let service = TokenService::with_default_ttl(SECRET);
    let issued = service.issue_at(7, issued_at()).unwrap();

    let just_before = issued_at() + Duration::hours(2) - Duration::seconds(1);
    assert_eq!(service.verify_at(&issued.token, just_before), Ok(7));

    // Expiry is exclusive: a token is dead at exactly `exp`.
    let at_expiry = issued_at() + Duration::hours(2);
    assert_eq!(service.verify_at(&issued.token, at_expiry), Err(TokenError::Expired));

    let after = issued_at() + Duration::hours(2) + Duration::seconds(1);
    assert_eq!(service.verify_at(&issued.token, after), Err(TokenError::Expired));
}

#[test]
fn test_custom_ttl() {
    let service = TokenService::new(SECRET, Duration::minutes(5));
    let issued = service.issue_at(1, issued_at()).unwrap();

    assert_eq!(
        service.verify_at(&issued.token, issued_at() + Duration::minutes(6)),
        Err(TokenError::Expired)
    );
}

#[test]
fn test_wrong_secret_is_invalid() {
    let issued = TokenService::with_default_ttl("another-secret")
        .issue_at(7, issued_at())
        .unwrap();

    let service = TokenService::with_default_ttl(SECRET);
    assert_eq!(
        service.verify_at(&issued.token, issued_at()),
        Err(TokenError::Invalid)
    );
}

#[test]
fn test_garbage_is_malformed() {
    let service = TokenService::with_default_ttl(SECRET);

    assert_eq!(service.verify_at("", issued_at()), Err(TokenError::Malformed));
    assert_eq!(service.verify_at("garbage", issued_at()), Err(TokenError::Malformed));
    assert_eq!(service.verify_at("a.b.c", issued_at()), Err(TokenError::Malformed));
}

#[test]
fn test_other_algorithm_is_malformed() {
    let claims = Claims {
        user_id: 7,
        registered: RegisteredClaims {
            iat: issued_at().timestamp(),
            exp: (issued_at() + Duration::hours(2)).timestamp(),
        },
    };
    let token = encode(
        &Header::new(Algorithm::HS384),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let service = TokenService::with_default_ttl(SECRET);
    assert_eq!(service.verify_at(&token, issued_at()), Err(TokenError::Malformed));
}

#[test]
fn test_claims_wire_shape() {
    let claims = Claims {
        user_id: 3,
        registered: RegisteredClaims { iat: 100, exp: 7300 },
    };

    let json = serde_json::to_value(&claims).unwrap();

    assert_eq!(json, serde_json::json!({ "user_id": 3, "iat": 100, "exp": 7300 }));
}
