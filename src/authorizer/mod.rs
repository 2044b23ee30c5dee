pub mod config;

use log::{debug, error, info, warn};

use crate::envelope::RequestEnvelope;
use crate::error::{AuthorizeError, Unauthorized};
use crate::keys::fetch::JsonFetcher;
use crate::keys::KeyResolver;
use crate::policy::{PolicyBuilder, PolicyDocument};
use crate::token::{TokenVerifier, VerifiedClaims};

/// Turns a gateway authorizer event into an allow decision for the token's
/// subject, or [`Unauthorized`].
pub struct Authorizer<F: JsonFetcher> {
    resolver: KeyResolver<F>,
    verifier: TokenVerifier,
    forward_claims: bool,
}

impl<F: JsonFetcher> Authorizer<F> {
    pub fn new(resolver: KeyResolver<F>, verifier: TokenVerifier) -> Self {
        Self {
            resolver,
            verifier,
            forward_claims: false,
        }
    }

    pub fn with_forward_claims(mut self, forward_claims: bool) -> Self {
        self.forward_claims = forward_claims;
        self
    }

    /// The failure reason is logged here and never returned.
    pub async fn authorize(&self, envelope: &RequestEnvelope) -> Result<PolicyDocument, Unauthorized> {
        match self.try_authorize(envelope).await {
            Ok(doc) => {
                info!(
                    "Allow principal '{}' on '{}'",
                    doc.principal_id,
                    envelope.resource_arn().unwrap_or_default()
                );
                Ok(doc)
            }
            Err(err) => Err(reject(&err)),
        }
    }

    /// Authorizes a raw JSON event, as received from the gateway.
    pub async fn authorize_event(&self, event: &[u8]) -> Result<PolicyDocument, Unauthorized> {
        match RequestEnvelope::from_slice(event) {
            Ok(envelope) => self.authorize(&envelope).await,
            Err(err) => Err(reject(&err)),
        }
    }

    /// Same as [`Authorizer::authorize`] but hands the failure back.
    pub async fn try_authorize(
        &self,
        envelope: &RequestEnvelope,
    ) -> Result<PolicyDocument, AuthorizeError> {
        let token = envelope.raw_token()?;
        let coords = envelope.coordinates()?;

        let claims = self.verify_token(token).await?;

        let mut builder = PolicyBuilder::from_coordinates(claims.sub.clone(), &coords);
        builder.allow_all_methods();
        if self.forward_claims {
            builder.with_context(claims.to_context());
        }

        Ok(builder.build()?)
    }

    pub async fn verify_token(&self, token: &str) -> Result<VerifiedClaims, AuthorizeError> {
        let decoded = self.verifier.decode(token)?;
        let issuer = decoded.payload.iss.as_str();
        debug!("Verify token of '{}' issued by '{issuer}'", decoded.payload.sub);

        let resolved = self.resolver.resolve(issuer).await?;
        match self.verifier.verify(token, &decoded, &resolved.key_set) {
            Err(AuthorizeError::KeyNotFound(kid)) if resolved.from_cache => {
                warn!("Key '{kid}' not in cached key set of '{issuer}', refresh keys");
                match self.resolver.refresh_stale(issuer).await? {
                    Some(key_set) => self.verifier.verify(token, &decoded, &key_set),
                    None => Err(AuthorizeError::KeyNotFound(kid)),
                }
            }
            result => result,
        }
    }
}

fn reject(err: &AuthorizeError) -> Unauthorized {
    error!("Authorize request failed, kind: {}, error: {err}", err.kind());
    Unauthorized
}
