pub mod config;

use std::collections::HashMap;

use anyhow::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AuthorizeError;
use crate::keys::{KeySet, SigningKey};

use config::VerifierConfig;

/// Claims read from the payload before the signature is checked. Only used to
/// find the issuer, never trusted.
#[derive(Debug, Clone, Deserialize)]
pub struct UnverifiedClaims {
    #[serde(default)]
    pub iss: String,
    #[serde(default)]
    pub sub: String,
}

#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub header: Header,
    pub kid: String,
    pub payload: UnverifiedClaims,
}

/// Claims of a token whose signature, issuer and validity window have been
/// checked.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VerifiedClaims {
    pub sub: String,
    pub iss: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    /// Not validated, so kept in whatever shape the issuer wrote it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VerifiedClaims {
    /// The claims as an authorizer context. The gateway only passes string,
    /// number and boolean values on, so nested claims are dropped.
    pub fn to_context(&self) -> Map<String, Value> {
        let mut context = Map::new();
        context.insert(String::from("sub"), Value::from(self.sub.clone()));
        context.insert(String::from("iss"), Value::from(self.iss.clone()));
        for (name, value) in self.extra.iter() {
            if matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
                context.insert(name.clone(), value.clone());
            }
        }
        context
    }
}

/// Structural decode without signature verification.
pub fn decode_unverified(token: &str) -> Result<DecodedToken, AuthorizeError> {
    let header = decode_header(token)
        .map_err(|e| AuthorizeError::Decode(format!("invalid token header: {e}")))?;

    let payload = match token.split('.').nth(1) {
        Some(payload) => payload,
        None => return Err(AuthorizeError::Decode(String::from("missing token payload"))),
    };
    let payload = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthorizeError::Decode(format!("invalid token payload encoding: {e}")))?;
    let payload: UnverifiedClaims = serde_json::from_slice(&payload)
        .map_err(|e| AuthorizeError::Decode(format!("invalid token payload: {e}")))?;

    let kid = match header.kid.as_deref() {
        Some(kid) if !kid.is_empty() => kid.to_string(),
        _ => return Err(AuthorizeError::Decode(String::from("token header has no kid"))),
    };
    if payload.iss.is_empty() {
        return Err(AuthorizeError::Decode(String::from("token has no iss claim")));
    }
    if payload.sub.is_empty() {
        return Err(AuthorizeError::Decode(String::from("token has no sub claim")));
    }

    Ok(DecodedToken {
        header,
        kid,
        payload,
    })
}

/// Picks the key whose identifier equals `kid`. When several keys share an
/// identifier the last one in the key set wins.
pub fn select_key<'a>(keys: &'a [SigningKey], kid: &str) -> Result<&'a SigningKey, AuthorizeError> {
    let lookup: HashMap<&str, &SigningKey> = keys
        .iter()
        .filter_map(|key| key.id().map(|id| (id, key)))
        .collect();

    match lookup.get(kid).copied() {
        Some(key) => Ok(key),
        None => Err(AuthorizeError::KeyNotFound(kid.to_string())),
    }
}

pub struct TokenVerifier {
    algorithms: Vec<Algorithm>,
    allowed_issuers: Vec<String>,
    audience: Option<String>,
    leeway: u64,
}

impl TokenVerifier {
    pub fn new(cfg: &VerifierConfig) -> Result<Self> {
        Ok(Self {
            algorithms: cfg.parse_algorithms()?,
            allowed_issuers: cfg.allowed_issuers.clone(),
            audience: cfg.audience.clone(),
            leeway: cfg.leeway,
        })
    }

    /// Decodes the token and rejects issuers outside the allow list, before
    /// anything is fetched from the issuer.
    pub fn decode(&self, token: &str) -> Result<DecodedToken, AuthorizeError> {
        let decoded = decode_unverified(token)?;
        if !self.allowed_issuers.is_empty() && !self.allowed_issuers.contains(&decoded.payload.iss)
        {
            return Err(AuthorizeError::Decode(format!(
                "issuer '{}' is not allowed",
                decoded.payload.iss
            )));
        }
        Ok(decoded)
    }

    pub fn verify(
        &self,
        token: &str,
        decoded: &DecodedToken,
        key_set: &KeySet,
    ) -> Result<VerifiedClaims, AuthorizeError> {
        let key = select_key(&key_set.keys, &decoded.kid)?;

        let alg = decoded.header.alg;
        if !self.algorithms.contains(&alg) {
            return Err(AuthorizeError::Signature(ErrorKind::InvalidAlgorithm.into()));
        }
        if let Some(key_alg) = key.alg.as_deref() {
            if key_alg.parse::<Algorithm>().ok() != Some(alg) {
                return Err(AuthorizeError::Signature(ErrorKind::InvalidAlgorithm.into()));
            }
        }

        let decoding_key = key
            .decoding_key(alg)
            .map_err(|e| AuthorizeError::KeySet {
                url: key_set.url.clone(),
                reason: format!("key '{}': {e:#}", decoded.kid),
            })?;

        self.verify_signature(token, alg, &decoding_key, &decoded.payload.iss)
    }

    pub fn verify_signature(
        &self,
        token: &str,
        alg: Algorithm,
        key: &DecodingKey,
        issuer: &str,
    ) -> Result<VerifiedClaims, AuthorizeError> {
        let mut validation = Validation::new(alg);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        validation.set_issuer(&[issuer]);
        match self.audience.as_ref() {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.set_required_spec_claims(&["exp", "iss", "sub", "aud"]);
            }
            None => {
                validation.validate_aud = false;
                validation.set_required_spec_claims(&["exp", "iss", "sub"]);
            }
        }

        let data = decode::<VerifiedClaims>(token, key, &validation)
            .map_err(AuthorizeError::Signature)?;
        Ok(data.claims)
    }
}
