use std::fmt;
use std::str::FromStr;

use crate::error::AuthorizeError;

/// Service segment of every API Gateway execution ARN.
pub const SERVICE: &str = "execute-api";

pub const DEFAULT_PARTITION: &str = "aws";

/// The wildcard used for unset coordinates, verbs and paths.
pub const WILDCARD: &str = "*";

/// The stage an authorization decision is scoped to. Parsing an incoming ARN
/// and formatting the ARNs of generated statements both go through this type
/// so the two grammars cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiScope {
    pub partition: String,
    pub region: String,
    pub account_id: String,
    pub rest_api_id: String,
    pub stage: String,
}

impl ApiScope {
    /// `arn:<partition>:execute-api:<region>:<account>:<api>/<stage>/<verb>/<path>`
    pub fn method_arn(&self, verb: &str, path: &str) -> String {
        format!(
            "arn:{}:{SERVICE}:{}:{}:{}/{}/{verb}/{path}",
            self.partition, self.region, self.account_id, self.rest_api_id, self.stage
        )
    }
}

/// Coordinates of the operation a request targets, taken from the envelope's
/// `methodArn` or `routeArn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCoordinates {
    pub scope: ApiScope,
    pub verb: Option<String>,
    pub path: Option<String>,
}

impl ResourceCoordinates {
    const SEGMENTS: usize = 6;

    pub fn parse(arn: &str) -> Result<Self, AuthorizeError> {
        let parts: Vec<&str> = arn.split(':').collect();
        if parts.len() != Self::SEGMENTS {
            return Err(AuthorizeError::InvalidResourceIdentifier(format!(
                "expect {} ':' separated segments in '{arn}', found {}",
                Self::SEGMENTS,
                parts.len()
            )));
        }

        let mut api_parts = parts[5].splitn(4, '/');
        let (rest_api_id, stage) = match (api_parts.next(), api_parts.next()) {
            (Some(api), Some(stage)) => (api, stage),
            _ => {
                return Err(AuthorizeError::InvalidResourceIdentifier(format!(
                    "expect '<api>/<stage>' in '{arn}'"
                )))
            }
        };
        let verb = api_parts.next().map(String::from);
        let path = api_parts.next().map(String::from);

        Ok(Self {
            scope: ApiScope {
                partition: parts[1].to_string(),
                region: parts[3].to_string(),
                account_id: parts[4].to_string(),
                rest_api_id: rest_api_id.to_string(),
                stage: stage.to_string(),
            },
            verb,
            path,
        })
    }
}

impl FromStr for ResourceCoordinates {
    type Err = AuthorizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = self.verb.as_deref().unwrap_or(WILDCARD);
        let path = self.path.as_deref().unwrap_or_default();
        write!(f, "{}", self.scope.method_arn(verb, path))
    }
}
