use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use crate::arn::{ApiScope, ResourceCoordinates, DEFAULT_PARTITION, WILDCARD};
use crate::error::PolicyError;

use super::{
    Effect, HttpVerb, Policy, PolicyDocument, PolicyStatement, Statement, POLICY_VERSION,
};

/// Optional coordinates of the API a policy applies to. Missing or empty
/// values become `*`.
#[derive(Debug, Clone, Default)]
pub struct ApiOptions {
    pub partition: Option<String>,
    pub region: Option<String>,
    pub rest_api_id: Option<String>,
    pub stage: Option<String>,
}

#[derive(Debug, Clone)]
struct MethodGrant {
    resource_arn: String,
    conditions: Option<Map<String, Value>>,
}

/// Accumulates method grants for one principal and compiles them into a
/// [`PolicyDocument`].
///
/// Every grant is validated when it is added, so a bad verb or path is
/// reported at the call that introduced it:
///
/// ```
/// use jwt_authorizer::policy::{ApiOptions, PolicyBuilder};
///
/// let mut builder = PolicyBuilder::new("user", "123456789012", ApiOptions::default());
/// builder
///     .allow_method("GET", "/pets")?
///     .deny_method("DELETE", "/pets/*")?;
/// let doc = builder.build()?;
/// assert_eq!(doc.policy_document.statement.len(), 2);
/// # Ok::<(), jwt_authorizer::error::PolicyError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    principal_id: String,
    scope: ApiScope,

    allowed: Vec<MethodGrant>,
    denied: Vec<MethodGrant>,
    custom: Vec<PolicyStatement>,

    context: Map<String, Value>,
}

impl PolicyBuilder {
    pub fn new(
        principal_id: impl Into<String>,
        account_id: impl Into<String>,
        options: ApiOptions,
    ) -> Self {
        let partition = options
            .partition
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| String::from(DEFAULT_PARTITION));

        Self {
            principal_id: principal_id.into(),
            scope: ApiScope {
                partition,
                region: or_wildcard(options.region),
                account_id: account_id.into(),
                rest_api_id: or_wildcard(options.rest_api_id),
                stage: or_wildcard(options.stage),
            },
            allowed: vec![],
            denied: vec![],
            custom: vec![],
            context: Map::new(),
        }
    }

    /// Scopes the builder to the API and stage a request targets.
    pub fn from_coordinates(principal_id: impl Into<String>, coords: &ResourceCoordinates) -> Self {
        let scope = &coords.scope;
        Self::new(
            principal_id,
            scope.account_id.clone(),
            ApiOptions {
                partition: Some(scope.partition.clone()),
                region: Some(scope.region.clone()),
                rest_api_id: Some(scope.rest_api_id.clone()),
                stage: Some(scope.stage.clone()),
            },
        )
    }

    pub fn allow_method(&mut self, verb: &str, resource: &str) -> Result<&mut Self, PolicyError> {
        self.add_method(Effect::Allow, verb, resource, None)
    }

    pub fn allow_method_with_conditions(
        &mut self,
        verb: &str,
        resource: &str,
        conditions: Map<String, Value>,
    ) -> Result<&mut Self, PolicyError> {
        self.add_method(Effect::Allow, verb, resource, Some(conditions))
    }

    pub fn allow_all_methods(&mut self) -> &mut Self {
        self.add_grant(Effect::Allow, HttpVerb::All, WILDCARD, None);
        self
    }

    pub fn deny_method(&mut self, verb: &str, resource: &str) -> Result<&mut Self, PolicyError> {
        self.add_method(Effect::Deny, verb, resource, None)
    }

    pub fn deny_method_with_conditions(
        &mut self,
        verb: &str,
        resource: &str,
        conditions: Map<String, Value>,
    ) -> Result<&mut Self, PolicyError> {
        self.add_method(Effect::Deny, verb, resource, Some(conditions))
    }

    pub fn deny_all_methods(&mut self) -> &mut Self {
        self.add_grant(Effect::Deny, HttpVerb::All, WILDCARD, None);
        self
    }

    /// Appends a statement that skips consolidation and is emitted after all
    /// generated statements.
    pub fn add_statement(&mut self, statement: impl Into<PolicyStatement>) -> &mut Self {
        self.custom.push(statement.into());
        self
    }

    pub fn with_context(&mut self, context: Map<String, Value>) -> &mut Self {
        self.context = context;
        self
    }

    pub fn build(&self) -> Result<PolicyDocument, PolicyError> {
        if self.allowed.is_empty() && self.denied.is_empty() && self.custom.is_empty() {
            return Err(PolicyError::EmptyPolicy);
        }

        let mut statements = statements_for_effect(Effect::Allow, &self.allowed);
        statements.extend(statements_for_effect(Effect::Deny, &self.denied));
        statements.extend(self.custom.iter().cloned());

        Ok(PolicyDocument {
            principal_id: self.principal_id.clone(),
            context: self.context.clone(),
            policy_document: Policy {
                version: String::from(POLICY_VERSION),
                statement: statements,
            },
        })
    }

    fn add_method(
        &mut self,
        effect: Effect,
        verb: &str,
        resource: &str,
        conditions: Option<Map<String, Value>>,
    ) -> Result<&mut Self, PolicyError> {
        let verb: HttpVerb = verb.parse()?;
        validate_resource_path(resource)?;
        self.add_grant(effect, verb, resource, conditions);
        Ok(self)
    }

    fn add_grant(
        &mut self,
        effect: Effect,
        verb: HttpVerb,
        resource: &str,
        conditions: Option<Map<String, Value>>,
    ) {
        let path = resource.strip_prefix('/').unwrap_or(resource);
        let grant = MethodGrant {
            resource_arn: self.scope.method_arn(verb.as_str(), path),
            // An empty condition block constrains nothing, so it groups with
            // the unconditional grants.
            conditions: conditions.filter(|c| !c.is_empty()),
        };

        match effect {
            Effect::Allow => self.allowed.push(grant),
            Effect::Deny => self.denied.push(grant),
        }
    }
}

fn or_wildcard(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| String::from(WILDCARD))
}

/// `%2F` stays encoded, the way decodeURI leaves reserved escapes, so it fails
/// the character check instead of slipping a `%` into the ARN.
const ENCODED_SLASH: &str = "%2f";

fn validate_resource_path(resource: &str) -> Result<(), PolicyError> {
    if resource.to_ascii_lowercase().contains(ENCODED_SLASH) {
        return Err(PolicyError::InvalidResourcePath(resource.to_string()));
    }

    let decoded = match percent_decode_str(resource).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => return Err(PolicyError::InvalidResourcePath(resource.to_string())),
    };

    if decoded.is_empty() || !decoded.chars().all(is_path_char) {
        return Err(PolicyError::InvalidResourcePath(decoded.into_owned()));
    }

    Ok(())
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '*')
}

/// Conditional grants each get a statement of their own, the rest share one
/// statement that follows them.
fn statements_for_effect(effect: Effect, grants: &[MethodGrant]) -> Vec<PolicyStatement> {
    let mut statements: Vec<PolicyStatement> = vec![];
    let mut resources = vec![];

    for grant in grants {
        match &grant.conditions {
            Some(conditions) => statements.push(
                Statement::with_condition(effect, grant.resource_arn.clone(), conditions.clone())
                    .into(),
            ),
            None => resources.push(grant.resource_arn.clone()),
        }
    }

    if !resources.is_empty() {
        statements.push(Statement::new(effect, resources).into());
    }

    statements
}
