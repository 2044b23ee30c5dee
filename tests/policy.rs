use serde_json::{json, Map, Value};

use jwt_authorizer::envelope::RequestEnvelope;
use jwt_authorizer::error::{AuthorizeError, PolicyError};
use jwt_authorizer::policy::{ApiOptions, PolicyBuilder};

const METHOD_ARN: &str = "arn:aws:execute-api:eu-west-1:210987654321:orders42/live/GET/orders/17";

fn conditions(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("conditions should be an object"),
    }
}

#[test]
fn build_from_request() {
    let envelope = RequestEnvelope::from_value(json!({
        "version": "1.0",
        "type": "TOKEN",
        "methodArn": METHOD_ARN,
        "authorizationToken": "Bearer abc.def.ghi",
    }))
    .unwrap();
    assert_eq!(envelope.raw_token().unwrap(), "abc.def.ghi");

    let coords = envelope.coordinates().unwrap();
    let mut builder = PolicyBuilder::from_coordinates("user-42", &coords);
    builder
        .allow_method_with_conditions(
            "POST",
            "/orders",
            conditions(json!({ "IpAddress": { "aws:SourceIp": ["10.0.0.0/8"] } })),
        )
        .unwrap()
        .allow_method("GET", "/orders/*")
        .unwrap()
        .allow_method("HEAD", "orders")
        .unwrap()
        .deny_method("DELETE", "/orders/*")
        .unwrap()
        .add_statement(conditions(json!({
            "Action": "execute-api:ManageConnections",
            "Effect": "Allow",
            "Resource": "*",
        })));

    let doc = builder.build().unwrap();
    let prefix = "arn:aws:execute-api:eu-west-1:210987654321:orders42/live";
    assert_eq!(
        serde_json::to_value(&doc).unwrap(),
        json!({
            "principalId": "user-42",
            "context": {},
            "policyDocument": {
                "Version": "2012-10-17",
                "Statement": [
                    {
                        "Action": "execute-api:Invoke",
                        "Effect": "Allow",
                        "Resource": [format!("{prefix}/POST/orders")],
                        "Condition": { "IpAddress": { "aws:SourceIp": ["10.0.0.0/8"] } },
                    },
                    {
                        "Action": "execute-api:Invoke",
                        "Effect": "Allow",
                        "Resource": [
                            format!("{prefix}/GET/orders/*"),
                            format!("{prefix}/HEAD/orders"),
                        ],
                    },
                    {
                        "Action": "execute-api:Invoke",
                        "Effect": "Deny",
                        "Resource": [format!("{prefix}/DELETE/orders/*")],
                    },
                    {
                        "Action": "execute-api:ManageConnections",
                        "Effect": "Allow",
                        "Resource": "*",
                    },
                ],
            },
        })
    );
}

#[test]
fn build_with_wildcard_scope() {
    let mut builder = PolicyBuilder::new("user-42", "210987654321", ApiOptions::default());
    builder.deny_all_methods();

    let doc = builder.build().unwrap();
    assert_eq!(
        serde_json::to_value(&doc.policy_document).unwrap()["Statement"],
        json!([{
            "Action": "execute-api:Invoke",
            "Effect": "Deny",
            "Resource": ["arn:aws:execute-api:*:210987654321:*/*/*/*"],
        }])
    );
}

#[test]
fn reject_invalid_grants() {
    let mut builder = PolicyBuilder::new("user-42", "210987654321", ApiOptions::default());

    assert_eq!(
        builder.allow_method("FETCH", "/orders").unwrap_err(),
        PolicyError::InvalidVerb(String::from("FETCH"))
    );
    assert!(matches!(
        builder.allow_method("GET", "/orders%20all").unwrap_err(),
        PolicyError::InvalidResourcePath(_)
    ));
    assert_eq!(builder.build().unwrap_err(), PolicyError::EmptyPolicy);

    let err: AuthorizeError = PolicyError::EmptyPolicy.into();
    assert_eq!(err.kind(), "empty_policy");
}

#[test]
fn reject_malformed_request() {
    let envelope = RequestEnvelope::from_value(json!({
        "version": "2.0",
        "routeArn": "orders42/live/GET/orders",
        "authorization": "abc.def.ghi",
    }))
    .unwrap();
    assert!(matches!(
        envelope.coordinates(),
        Err(AuthorizeError::InvalidResourceIdentifier(_))
    ));

    assert!(matches!(
        RequestEnvelope::from_value(json!({ "methodArn": METHOD_ARN })),
        Err(AuthorizeError::InvalidEnvelope(_))
    ));
}
