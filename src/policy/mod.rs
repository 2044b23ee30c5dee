mod builder;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PolicyError;

pub use builder::{ApiOptions, PolicyBuilder};

/// IAM policy language version stamped on every document.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The only action an API Gateway authorizer can grant.
pub const EXECUTE_API_ACTION: &str = "execute-api:Invoke";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Head,
    Delete,
    Options,
    /// Matches every verb, rendered as `*`.
    All,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::All => "*",
        }
    }
}

impl FromStr for HttpVerb {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            "ALL" | "*" => Ok(Self::All),
            _ => Err(PolicyError::InvalidVerb(s.to_string())),
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A statement compiled from method grants.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: String,
    pub effect: Effect,
    pub resource: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Map<String, Value>>,
}

impl Statement {
    pub fn new(effect: Effect, resource: Vec<String>) -> Self {
        Self {
            action: String::from(EXECUTE_API_ACTION),
            effect,
            resource,
            condition: None,
        }
    }

    pub fn with_condition(effect: Effect, resource: String, condition: Map<String, Value>) -> Self {
        Self {
            action: String::from(EXECUTE_API_ACTION),
            effect,
            resource: vec![resource],
            condition: Some(condition),
        }
    }
}

/// One entry of the `Statement` array: either generated from grants, or a
/// caller-supplied statement emitted exactly as given.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PolicyStatement {
    Generated(Statement),
    Custom(Map<String, Value>),
}

impl From<Statement> for PolicyStatement {
    fn from(statement: Statement) -> Self {
        Self::Generated(statement)
    }
}

impl From<Map<String, Value>> for PolicyStatement {
    fn from(statement: Map<String, Value>) -> Self {
        Self::Custom(statement)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

/// The authorizer response handed back to the gateway.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub principal_id: String,
    pub context: Map<String, Value>,
    pub policy_document: Policy,
}
