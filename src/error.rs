use thiserror::Error;

/// Errors raised while compiling a policy document. These are contract
/// violations by the caller of [`crate::policy::PolicyBuilder`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid HTTP verb '{0}', expect one of GET, POST, PUT, PATCH, HEAD, DELETE, OPTIONS or ALL")]
    InvalidVerb(String),

    #[error("invalid resource path '{0}', path should match [/.a-zA-Z0-9-*]+")]
    InvalidResourcePath(String),

    #[error("no statement defined for the policy")]
    EmptyPolicy,
}

/// Every way an authorization attempt can fail. The orchestrator logs these
/// and hands the caller nothing but [`Unauthorized`].
#[derive(Error, Debug)]
pub enum AuthorizeError {
    #[error("invalid request envelope: {0}")]
    InvalidEnvelope(String),

    #[error("unable to get authorization token from request envelope")]
    MissingToken,

    #[error("decode token failed: {0}")]
    Decode(String),

    #[error("invalid openid discovery document from '{url}': {reason}")]
    Discovery { url: String, reason: String },

    #[error("no available public keys from key set '{url}': {reason}")]
    KeySet { url: String, reason: String },

    #[error("token kid '{0}' not found in public keys")]
    KeyNotFound(String),

    #[error("verify token failed: {0}")]
    Signature(#[source] jsonwebtoken::errors::Error),

    #[error("invalid resource identifier: {0}")]
    InvalidResourceIdentifier(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl AuthorizeError {
    /// Stable label used when recording the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEnvelope(_) => "invalid_envelope",
            Self::MissingToken => "missing_token",
            Self::Decode(_) => "decode",
            Self::Discovery { .. } => "discovery",
            Self::KeySet { .. } => "key_set",
            Self::KeyNotFound(_) => "key_not_found",
            Self::Signature(_) => "signature",
            Self::InvalidResourceIdentifier(_) => "invalid_resource_identifier",
            Self::Policy(PolicyError::InvalidVerb(_)) => "invalid_verb",
            Self::Policy(PolicyError::InvalidResourcePath(_)) => "invalid_resource_path",
            Self::Policy(PolicyError::EmptyPolicy) => "empty_policy",
        }
    }
}

/// The only failure a caller of [`crate::authorizer::Authorizer::authorize`]
/// ever sees.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unauthorized")]
pub struct Unauthorized;
