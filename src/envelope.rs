use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::arn::ResourceCoordinates;
use crate::error::AuthorizeError;

const BEARER_PREFIX: &str = "Bearer ";

/// The authorizer event, in one of the two payload formats the gateway can
/// send. The `version` field selects the variant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "version")]
pub enum RequestEnvelope {
    #[serde(rename = "1.0", rename_all = "camelCase")]
    V1 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        authorization_token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        method_arn: Option<String>,
    },

    #[serde(rename = "2.0", rename_all = "camelCase")]
    V2 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        authorization: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        route_arn: Option<String>,
    },
}

impl RequestEnvelope {
    pub fn from_value(value: Value) -> Result<Self, AuthorizeError> {
        serde_json::from_value(value).map_err(|e| AuthorizeError::InvalidEnvelope(e.to_string()))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, AuthorizeError> {
        serde_json::from_slice(data).map_err(|e| AuthorizeError::InvalidEnvelope(e.to_string()))
    }

    /// The bearer token with its `Bearer ` prefix removed.
    pub fn raw_token(&self) -> Result<&str, AuthorizeError> {
        let token = match self {
            Self::V1 {
                authorization_token,
                ..
            } => authorization_token.as_deref(),
            Self::V2 { authorization, .. } => authorization.as_deref(),
        };

        let token = token.map(str::trim_start).unwrap_or_default();
        let token = token.strip_prefix(BEARER_PREFIX).unwrap_or(token).trim();
        if token.is_empty() {
            return Err(AuthorizeError::MissingToken);
        }

        Ok(token)
    }

    pub fn resource_arn(&self) -> Option<&str> {
        match self {
            Self::V1 { method_arn, .. } => method_arn.as_deref(),
            Self::V2 { route_arn, .. } => route_arn.as_deref(),
        }
    }

    pub fn coordinates(&self) -> Result<ResourceCoordinates, AuthorizeError> {
        match self.resource_arn() {
            Some(arn) if !arn.is_empty() => ResourceCoordinates::parse(arn),
            _ => Err(AuthorizeError::InvalidResourceIdentifier(String::from(
                "missing arn, check your event format",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_v1_envelope() {
        let envelope = RequestEnvelope::from_value(json!({
            "version": "1.0",
            "type": "TOKEN",
            "authorizationToken": "Bearer abc.def.ghi",
            "methodArn": "arn:aws:execute-api:us-east-1:123456789012:abcdef123/test/GET/request",
        }))
        .unwrap();

        assert!(matches!(envelope, RequestEnvelope::V1 { .. }));
        assert_eq!(envelope.raw_token().unwrap(), "abc.def.ghi");
        assert_eq!(envelope.coordinates().unwrap().scope.stage, "test");
    }

    #[test]
    fn test_v2_envelope() {
        let envelope = RequestEnvelope::from_value(json!({
            "version": "2.0",
            "authorization": "abc.def.ghi",
            "routeArn": "arn:aws:execute-api:eu-west-1:1:api/$default/GET/items",
        }))
        .unwrap();

        assert!(matches!(envelope, RequestEnvelope::V2 { .. }));
        assert_eq!(envelope.raw_token().unwrap(), "abc.def.ghi");
        assert_eq!(envelope.coordinates().unwrap().scope.stage, "$default");
    }

    #[test]
    fn test_version_selects_fields() {
        // A V2 envelope never reads the V1 field names.
        let envelope = RequestEnvelope::from_value(json!({
            "version": "2.0",
            "authorizationToken": "abc.def.ghi",
            "methodArn": "arn:aws:execute-api:eu-west-1:1:api/dev/GET/items",
        }))
        .unwrap();

        assert!(matches!(
            envelope.raw_token(),
            Err(AuthorizeError::MissingToken)
        ));
        assert!(matches!(
            envelope.coordinates(),
            Err(AuthorizeError::InvalidResourceIdentifier(_))
        ));
    }

    #[test]
    fn test_missing_token() {
        for token in [None, Some(""), Some("Bearer "), Some("  Bearer   "), Some("   ")] {
            let envelope = RequestEnvelope::V1 {
                authorization_token: token.map(String::from),
                method_arn: None,
            };
            assert!(matches!(
                envelope.raw_token(),
                Err(AuthorizeError::MissingToken)
            ));
        }
    }

    #[test]
    fn test_bearer_prefix() {
        let cases = [
            ("Bearer abc.def.ghi", "abc.def.ghi"),
            ("  Bearer abc.def.ghi  ", "abc.def.ghi"),
            ("abc.def.ghi", "abc.def.ghi"),
            ("Bearer", "Bearer"),
            ("Basic dXNlcg==", "Basic dXNlcg=="),
        ];
        for (raw, expect) in cases {
            let envelope = RequestEnvelope::V2 {
                authorization: Some(raw.to_string()),
                route_arn: None,
            };
            assert_eq!(envelope.raw_token().unwrap(), expect, "{raw}");
        }
    }

    #[test]
    fn test_invalid_envelope() {
        for value in [json!({}), json!({"version": "3.0"}), json!("1.0")] {
            assert!(matches!(
                RequestEnvelope::from_value(value),
                Err(AuthorizeError::InvalidEnvelope(_))
            ));
        }
    }
}
