use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Local;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use once_cell::sync::Lazy;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509NameBuilder};
use serde_json::{json, Value};

use crate::keys::discovery_url;
use crate::keys::fetch::JsonFetcher;
use crate::keys::SigningKey;

pub const ISSUER: &str = "https://login.example.com/tenant";

pub static TEST_ISSUER: Lazy<TestIssuer> = Lazy::new(|| TestIssuer::generate(ISSUER));

/// Same issuer url as [`TEST_ISSUER`], different key pair.
pub static ROGUE_ISSUER: Lazy<TestIssuer> = Lazy::new(|| TestIssuer::generate(ISSUER));

/// Serves fixed documents by url and records every requested url.
pub struct StaticFetcher {
    docs: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new(docs: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            docs: Mutex::new(docs.into_iter().collect()),
            requests: Mutex::new(vec![]),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::<(String, Value)>::new())
    }

    /// Replaces the document served at `url`.
    pub fn publish(&self, url: &str, value: Value) {
        self.docs.lock().unwrap().insert(url.to_string(), value);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl JsonFetcher for StaticFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.requests.lock().unwrap().push(url.to_string());
        let value = self.docs.lock().unwrap().get(url).cloned();
        match value {
            Some(value) => Ok(value),
            None => bail!("connection refused: {url}"),
        }
    }
}

/// An identity provider with a freshly generated RSA key and self-signed
/// certificate.
pub struct TestIssuer {
    pub issuer: String,
    private_key: Vec<u8>,
    public_key: Vec<u8>,
    cert_der: Vec<u8>,
    x5t: String,
    n: Vec<u8>,
    e: Vec<u8>,
}

impl TestIssuer {
    pub fn generate(issuer: &str) -> Self {
        let rsa = Rsa::generate(2048).unwrap();
        let n = rsa.n().to_vec();
        let e = rsa.e().to_vec();
        let pkey = PKey::from_rsa(rsa).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "login.example.com").unwrap();
        let name = name.build();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&pkey).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(1).unwrap())
            .unwrap();
        builder.sign(&pkey, MessageDigest::sha256()).unwrap();
        let cert = builder.build();

        let digest = cert.digest(MessageDigest::sha1()).unwrap();

        Self {
            issuer: issuer.to_string(),
            private_key: pkey.private_key_to_pem_pkcs8().unwrap(),
            public_key: pkey.public_key_to_pem().unwrap(),
            cert_der: cert.to_der().unwrap(),
            x5t: URL_SAFE_NO_PAD.encode(&*digest),
            n,
            e,
        }
    }

    pub fn jwks_uri(&self) -> String {
        format!("{}/discovery/keys", self.issuer)
    }

    pub fn public_key_pem(&self) -> Vec<u8> {
        self.public_key.clone()
    }

    /// A JWKS entry carrying the certificate, the way most providers publish.
    pub fn signing_key(&self, kid: &str) -> SigningKey {
        SigningKey {
            kid: Some(kid.to_string()),
            x5t: Some(self.x5t.clone()),
            x5c: vec![STANDARD.encode(&self.cert_der)],
            kty: Some("RSA".to_string()),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            ..Default::default()
        }
    }

    /// A JWKS entry with only the raw RSA parameters.
    pub fn component_key(&self, kid: &str) -> SigningKey {
        SigningKey {
            kid: Some(kid.to_string()),
            kty: Some("RSA".to_string()),
            n: Some(URL_SAFE_NO_PAD.encode(&self.n)),
            e: Some(URL_SAFE_NO_PAD.encode(&self.e)),
            ..Default::default()
        }
    }

    /// Claims valid for the next hour.
    pub fn claims(&self, sub: &str) -> Value {
        let now = Local::now().timestamp();
        json!({
            "iss": self.issuer,
            "sub": sub,
            "iat": now,
            "nbf": now,
            "exp": now + 3600,
        })
    }

    pub fn sign(&self, kid: &str, claims: &Value) -> String {
        self.sign_with(Algorithm::RS256, Some(kid), claims)
    }

    pub fn sign_with(&self, alg: Algorithm, kid: Option<&str>, claims: &Value) -> String {
        let mut header = Header::new(alg);
        header.kid = kid.map(String::from);
        let key = EncodingKey::from_rsa_pem(&self.private_key).unwrap();
        encode(&header, claims, &key).unwrap()
    }

    /// A fetcher publishing `keys` through this issuer's discovery document.
    pub fn fetcher(&self, keys: Vec<SigningKey>) -> StaticFetcher {
        StaticFetcher::new([
            (
                discovery_url(&self.issuer),
                json!({ "issuer": self.issuer, "jwks_uri": self.jwks_uri() }),
            ),
            (self.jwks_uri(), json!({ "keys": keys })),
        ])
    }
}
