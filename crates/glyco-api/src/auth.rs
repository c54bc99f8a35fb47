//! Bearer-token issuance and verification.
//!
//! Tokens are `base64url(claims JSON).base64url(HMAC-SHA256 signature)` with
//! claims `{sub, exp}`. Verification checks the signature and the expiry and
//! nothing else — there is no revocation list.

use axum::http::{HeaderMap, header};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// The payload embedded in a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  /// The authenticated username.
  pub sub: String,
  /// Expiry as epoch seconds.
  pub exp: i64,
}

/// Signs and verifies bearer tokens for this server instance.
pub struct TokenAuthority {
  secret: Vec<u8>,
  life:   Duration,
}

impl TokenAuthority {
  pub fn new(secret: impl Into<Vec<u8>>, life_minutes: i64) -> Self {
    Self {
      secret: secret.into(),
      life:   Duration::minutes(life_minutes),
    }
  }

  /// Issue a token for `subject` expiring one token-lifetime from now.
  pub fn issue(&self, subject: &str) -> Result<String, ApiError> {
    let claims = Claims {
      sub: subject.to_string(),
      exp: (Utc::now() + self.life).timestamp(),
    };
    let body = serde_json::to_vec(&claims)
      .map_err(|e| ApiError::Internal(e.to_string()))?;
    let payload = B64.encode(body);
    let signature = self.sign(payload.as_bytes())?;
    Ok(format!("{payload}.{}", B64.encode(signature)))
  }

  /// Verify signature and expiry; returns the embedded claims.
  pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
    let (payload, signature) = token.split_once('.').ok_or(ApiError::Unauthorized)?;
    let signature = B64.decode(signature).map_err(|_| ApiError::Unauthorized)?;

    let mut mac = self.mac()?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).map_err(|_| ApiError::Unauthorized)?;

    let body = B64.decode(payload).map_err(|_| ApiError::Unauthorized)?;
    let claims: Claims =
      serde_json::from_slice(&body).map_err(|_| ApiError::Unauthorized)?;

    if claims.exp < Utc::now().timestamp() {
      return Err(ApiError::Unauthorized);
    }
    Ok(claims)
  }

  /// Verify the `Authorization: Bearer …` header of a request.
  pub fn verify_bearer(&self, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let header_val = headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .ok_or(ApiError::Unauthorized)?;
    let token = header_val
      .strip_prefix("Bearer ")
      .ok_or(ApiError::Unauthorized)?;
    self.verify(token)
  }

  fn sign(&self, data: &[u8]) -> Result<Vec<u8>, ApiError> {
    let mut mac = self.mac()?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
  }

  fn mac(&self) -> Result<HmacSha256, ApiError> {
    HmacSha256::new_from_slice(&self.secret)
      .map_err(|e| ApiError::Internal(e.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn authority() -> TokenAuthority {
    TokenAuthority::new("test-secret", 30)
  }

  #[test]
  fn issued_tokens_verify_and_carry_the_subject() {
    let auth = authority();
    let token = auth.issue("alice").unwrap();
    let claims = auth.verify(&token).unwrap();
    assert_eq!(claims.sub, "alice");
    assert!(claims.exp > Utc::now().timestamp());
  }

  #[test]
  fn expired_tokens_are_rejected() {
    let auth = TokenAuthority::new("test-secret", -1);
    let token = auth.issue("alice").unwrap();
    assert!(matches!(auth.verify(&token), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn tampered_payloads_are_rejected() {
    let auth = authority();
    let token = auth.issue("alice").unwrap();
    let (payload, signature) = token.split_once('.').unwrap();
    let forged_claims = Claims {
      sub: "mallory".to_string(),
      exp: Utc::now().timestamp() + 3600,
    };
    let forged_payload = B64.encode(serde_json::to_vec(&forged_claims).unwrap());
    assert_ne!(forged_payload, payload);
    let forged = format!("{forged_payload}.{signature}");
    assert!(matches!(auth.verify(&forged), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn tokens_signed_with_another_secret_are_rejected() {
    let token = TokenAuthority::new("other-secret", 30).issue("alice").unwrap();
    assert!(matches!(authority().verify(&token), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn bearer_header_extraction() {
    let auth = authority();
    let token = auth.issue("alice").unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    assert!(auth.verify_bearer(&headers).is_ok());

    let mut basic = HeaderMap::new();
    basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
    assert!(matches!(auth.verify_bearer(&basic), Err(ApiError::Unauthorized)));

    assert!(matches!(
      auth.verify_bearer(&HeaderMap::new()),
      Err(ApiError::Unauthorized)
    ));
  }
}
