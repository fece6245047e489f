use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::config::JwtConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("expected a {0:?} token")]
    WrongKind(TokenKind),
}

/// Access and refresh tokens are signed with different secrets, so neither
/// can pass for the other even before the `kind` claim is checked.
#[derive(Clone)]
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(cfg.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(cfg.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: cfg.access_ttl,
            refresh_ttl: cfg.refresh_ttl,
        }
    }

    fn sign_with_kind(&self, user_id: Uuid, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let (ttl, key) = match kind {
            TokenKind::Access => (self.access_ttl, &self.access_encoding),
            TokenKind::Refresh => (self.refresh_ttl, &self.refresh_encoding),
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
            kind,
        };
        let token = encode(&Header::default(), &claims, key)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    pub fn issue_pair(&self, user_id: Uuid) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign_access(user_id)?,
            refresh_token: self.sign_refresh(user_id)?,
        })
    }

    fn verify_with(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let key = match expected {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })?;
        if data.claims.kind != expected {
            return Err(TokenError::WrongKind(expected));
        }
        debug!(user_id = %data.claims.sub, kind = ?expected, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_with(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_with(token, TokenKind::Refresh)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn jwt_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            access_ttl: Duration::from_secs(300),
            refresh_ttl: Duration::from_secs(3600),
        }
    }

    /// Signs arbitrary claims, for crafting expired or foreign tokens.
    pub(crate) fn forge(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    pub(crate) fn claims_for(user_id: Uuid, kind: TokenKind, exp_offset_secs: i64) -> Claims {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Claims {
            sub: user_id,
            iat: (now - 7200) as usize,
            exp: (now + exp_offset_secs) as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
            jti: Uuid::new_v4(),
            kind,
        }
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = JwtKeys::new(&jwt_config());
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        let claims = keys.verify_access(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn tokens_do_not_cross_over() {
        let keys = JwtKeys::new(&jwt_config());
        let pair = keys.issue_pair(Uuid::new_v4()).unwrap();
        assert!(keys.verify_refresh(&pair.refresh_token).is_ok());
        assert_eq!(keys.verify_refresh(&pair.access_token).unwrap_err(), TokenError::Invalid);
        assert_eq!(keys.verify_access(&pair.refresh_token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn kind_claim_is_checked_even_with_right_secret() {
        let keys = JwtKeys::new(&jwt_config());
        let refresh_kind = forge(
            &claims_for(Uuid::new_v4(), TokenKind::Refresh, 600),
            "access-secret",
        );
        assert_eq!(
            keys.verify_access(&refresh_kind).unwrap_err(),
            TokenError::WrongKind(TokenKind::Access)
        );
    }

    #[test]
    fn each_token_gets_its_own_id() {
        let keys = JwtKeys::new(&jwt_config());
        let id = Uuid::new_v4();
        let a = keys.verify_access(&keys.sign_access(id).unwrap()).unwrap();
        let b = keys.verify_access(&keys.sign_access(id).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let keys = JwtKeys::new(&jwt_config());
        let expired = forge(&claims_for(Uuid::new_v4(), TokenKind::Access, -60), "access-secret");
        assert_eq!(keys.verify_access(&expired).unwrap_err(), TokenError::Expired);

        let foreign = forge(&claims_for(Uuid::new_v4(), TokenKind::Access, 600), "other-secret");
        assert_eq!(keys.verify_access(&foreign).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn verify_rejects_wrong_audience() {
        let keys = JwtKeys::new(&jwt_config());
        let mut other = jwt_config();
        other.audience = "someone-else".into();
        let token = JwtKeys::new(&other).sign_access(Uuid::new_v4()).unwrap();
        assert_eq!(keys.verify_access(&token).unwrap_err(), TokenError::Invalid);
    }
}
