use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signing algorithms the codec can be configured with. Restricting the
/// configuration to this enum keeps the codec inside the HMAC family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum HmacAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl From<HmacAlgorithm> for Algorithm {
    fn from(alg: HmacAlgorithm) -> Self {
        match alg {
            HmacAlgorithm::HS256 => Algorithm::HS256,
            HmacAlgorithm::HS384 => Algorithm::HS384,
            HmacAlgorithm::HS512 => Algorithm::HS512,
        }
    }
}

const HMAC_FAMILY: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub algorithm: HmacAlgorithm,
    pub access_ttl: Duration,
    pub signing_key: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    exp: i64,
    iat: i64,
    jti: String, // keeps two tokens minted in the same second distinct
}

fn encode_access(uid: &UserId, cfg: &JwtConfig) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.access_ttl;
    let claims = AccessClaims {
        sub: uid.to_string(),
        exp: exp_dt.timestamp(),
        iat: iat_dt.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    let token = encode(
        &Header::new(cfg.algorithm.into()),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::TokenGeneration(e.to_string()))?;
    let exp_dt = DateTime::from_timestamp(claims.exp, 0)
        .ok_or_else(|| AuthError::TokenGeneration("expiry out of range".to_string()))?;
    Ok((token, exp_dt))
}

fn decode_access(token: &str, cfg: &JwtConfig, check_exp: bool) -> Result<AccessClaims, AuthError> {
    let mut v = Validation::new(cfg.algorithm.into());
    v.algorithms = HMAC_FAMILY.to_vec();
    v.leeway = 0;
    v.validate_exp = check_exp;
    v.set_required_spec_claims(&["exp", "sub"]);
    let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(&cfg.signing_key), &v)
        .map_err(|_| AuthError::InvalidAccessToken)?;
    // jsonwebtoken still accepts a token during the second `exp` names. The
    // blacklist entry is gone by then, so that second counts as expired.
    if check_exp && data.claims.exp <= Utc::now().timestamp() {
        return Err(AuthError::InvalidAccessToken);
    }
    Ok(data.claims)
}

fn into_verify_result(claims: AccessClaims) -> Result<TokenVerifyResult, AuthError> {
    if claims.sub.is_empty() {
        return Err(AuthError::InvalidTokenFormat);
    }
    let expires_at =
        DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::InvalidTokenFormat)?;
    Ok(TokenVerifyResult {
        user_id: UserId(claims.sub),
        expires_at,
    })
}

pub struct JwtHmacCodec {
    cfg: JwtConfig,
}

impl JwtHmacCodec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHmacCodec { cfg }
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHmacCodec {
    async fn issue_access_token(
        &self,
        user: &UserId,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_access(user, &self.cfg)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        into_verify_result(decode_access(&token.0, &self.cfg, true)?)
    }

    async fn inspect_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        into_verify_result(decode_access(&token.0, &self.cfg, false)?)
    }
}
