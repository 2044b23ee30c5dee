//! Lambda-style request authorizer for an HTTP API gateway.
//!
//! A bearer JWT is verified against the signing keys its issuer publishes
//! through OpenID Connect discovery, and the verified subject is granted an
//! IAM-style policy document over the API stage the request targets.

pub mod arn;
pub mod authorizer;
pub mod config;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod keys;
pub mod logs;
pub mod policy;
pub mod token;

#[cfg(test)]
mod testutil;
