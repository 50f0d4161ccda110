//! Explanation of an authorization decision (audit / debugging).
//!
//! An explanation lists the checks the gate performed, in order, for one
//! operation and identity. It only ever mentions requirements declared on that
//! operation; it never enumerates everything the caller holds.

use serde::Serialize;

use crate::gate::{AuthzError, FailureKind, GrantReason};
use crate::ResolutionSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Registration,
    AllowAnonymous,
    Authentication,
    Role,
    Permission,
}

/// One evaluated check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckStep {
    pub check: CheckKind,
    /// Operation, user id, role list or permission name, depending on `check`.
    pub subject: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResolutionSource>,
}

impl CheckStep {
    pub fn new(check: CheckKind, subject: impl Into<String>, passed: bool) -> Self {
        Self {
            check,
            subject: subject.into(),
            passed,
            source: None,
        }
    }

    pub fn with_source(mut self, source: ResolutionSource) -> Self {
        self.source = Some(source);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub operation: String,
    pub granted: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmet: Option<String>,
    pub steps: Vec<CheckStep>,
}

impl AuthorizationExplanation {
    pub fn new(
        operation: &str,
        outcome: &Result<GrantReason, AuthzError>,
        steps: Vec<CheckStep>,
    ) -> Self {
        match outcome {
            Ok(reason) => Self {
                operation: operation.to_string(),
                granted: true,
                reason: reason.as_str().to_string(),
                failure: None,
                unmet: None,
                steps,
            },
            Err(err) => Self {
                operation: operation.to_string(),
                granted: false,
                reason: err.to_string(),
                failure: Some(err.kind()),
                unmet: err.unmet(),
                steps,
            },
        }
    }
}
