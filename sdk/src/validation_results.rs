// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Validation outcomes returned as data.
//!
//! Validators never return `Err` for an expected failure. They return a
//! [`ValidationResult`] whose `failure_reasons` lists every
//! [`ValidationError`] that contributed to the verdict.

use serde::Serialize;
use thiserror::Error;

use crate::{
    crypto::raw_signature::RawSignatureValidationError,
    status_tracker::{LogItem, StatusTracker},
    validation_status, Error,
};

/// The flat validation taxonomy.
///
/// Each variant carries a diagnostic message. The variant itself is the
/// machine-readable reason; see [`ValidationError::code`].
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(tag = "code", content = "message", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationError {
    /// A signature did not verify, or no signer was available to verify it.
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    /// Issuer/subject linkage is broken or the path is malformed.
    #[error("chain invalid: {0}")]
    ChainInvalid(String),

    /// The certificate is listed on an authoritative CRL.
    #[error("certificate revoked: {0}")]
    CertificateRevoked(String),

    /// The certificate's validity window ended.
    #[error("certificate expired: {0}")]
    Expired(String),

    /// The certificate's validity window has not started.
    #[error("certificate not yet valid: {0}")]
    NotYetValid(String),

    /// Basic constraints, key usage or subject country are wrong for the
    /// certificate's role.
    #[error("invalid constraints: {0}")]
    InvalidConstraints(String),

    /// Malformed input or an unexpected provider error.
    #[error("unknown error: {0}")]
    UnknownError(String),

    /// No CRL could be obtained for the issuer.
    #[error("CRL unavailable: {0}")]
    CrlUnavailable(String),

    /// The CRL fetch exceeded its deadline.
    #[error("CRL fetch timed out: {0}")]
    CrlFetchTimeout(String),
}

impl ValidationError {
    /// Returns the stable SCREAMING_CASE reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SignatureInvalid(_) => "SIGNATURE_INVALID",
            Self::ChainInvalid(_) => "CHAIN_INVALID",
            Self::CertificateRevoked(_) => "CERTIFICATE_REVOKED",
            Self::Expired(_) => "EXPIRED",
            Self::NotYetValid(_) => "NOT_YET_VALID",
            Self::InvalidConstraints(_) => "INVALID_CONSTRAINTS",
            Self::UnknownError(_) => "UNKNOWN_ERROR",
            Self::CrlUnavailable(_) => "CRL_UNAVAILABLE",
            Self::CrlFetchTimeout(_) => "CRL_FETCH_TIMEOUT",
        }
    }

    /// Returns the dotted status code used in the audit log.
    pub fn validation_status(&self) -> &'static str {
        match self {
            Self::SignatureInvalid(_) => validation_status::CHAIN_SIGNATURE_MISMATCH,
            Self::ChainInvalid(_) => validation_status::CHAIN_ISSUER_MISMATCH,
            Self::CertificateRevoked(_) => validation_status::REVOCATION_REVOKED,
            Self::Expired(_) => validation_status::CERTIFICATE_EXPIRED,
            Self::NotYetValid(_) => validation_status::CERTIFICATE_NOT_YET_VALID,
            Self::InvalidConstraints(_) => validation_status::CERTIFICATE_KEY_USAGE_INVALID,
            Self::UnknownError(_) => validation_status::GENERAL_ERROR,
            Self::CrlUnavailable(_) => validation_status::REVOCATION_CRL_UNAVAILABLE,
            Self::CrlFetchTimeout(_) => validation_status::REVOCATION_CRL_FETCH_TIMEOUT,
        }
    }

    /// Returns `true` if this error rejects the object being validated.
    ///
    /// `CrlUnavailable` and `CrlFetchTimeout` are soft: under the default
    /// fail-open policy they are reported but do not reject.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::CrlUnavailable(_) | Self::CrlFetchTimeout(_))
    }

    /// Returns the diagnostic message.
    pub fn message(&self) -> &str {
        match self {
            Self::SignatureInvalid(m)
            | Self::ChainInvalid(m)
            | Self::CertificateRevoked(m)
            | Self::Expired(m)
            | Self::NotYetValid(m)
            | Self::InvalidConstraints(m)
            | Self::UnknownError(m)
            | Self::CrlUnavailable(m)
            | Self::CrlFetchTimeout(m) => m,
        }
    }

    /// Classifies an error raised while verifying a signature.
    ///
    /// A signature that does not verify is `SignatureInvalid`. Parse
    /// failures, unsupported algorithms and library errors are
    /// `UnknownError`. The original message is kept in both cases.
    pub(crate) fn from_signature_error(context: &str, err: &Error) -> Self {
        match err {
            Error::RawSignature(
                RawSignatureValidationError::SignatureMismatch
                | RawSignatureValidationError::InvalidSignature
                | RawSignatureValidationError::InvalidPublicKey,
            ) => Self::SignatureInvalid(format!("{context}: {err}")),
            _ => Self::UnknownError(format!("{context}: {err}")),
        }
    }
}

/// Aggregate verdict of a [`ValidationResult`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationOutcome {
    /// No fatal failure was found.
    Success,

    /// At least one fatal failure was found.
    Failed,
}

/// The result of validating a certificate or a trust path.
///
/// Built once from the findings of a validation run and never mutated.
/// `failure_reasons` is non-empty exactly when `status` is
/// [`ValidationOutcome::Failed`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationResult {
    status: ValidationOutcome,
    failure_reasons: Vec<ValidationError>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<ValidationError>,

    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,

    log: Vec<LogItem>,
}

impl ValidationResult {
    /// A successful result with no findings.
    pub fn success() -> Self {
        Findings::default().into_result()
    }

    /// A failed result with a single reason.
    pub fn failure(err: ValidationError) -> Self {
        let mut findings = Findings::default();
        findings.fail(
            crate::log_item!("", err.to_string(), "ValidationResult::failure"),
            err,
        );
        findings.into_result()
    }

    /// Aggregate verdict.
    pub fn status(&self) -> ValidationOutcome {
        self.status
    }

    /// `true` when the status is [`ValidationOutcome::Success`].
    pub fn is_success(&self) -> bool {
        self.status == ValidationOutcome::Success
    }

    /// Fatal failures, in the order they were found.
    pub fn failure_reasons(&self) -> &[ValidationError] {
        &self.failure_reasons
    }

    /// Soft findings that did not reject (for example an unavailable CRL
    /// under fail-open).
    pub fn warnings(&self) -> &[ValidationError] {
        &self.warnings
    }

    /// Human-readable summary.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// The audit trail of checks performed.
    pub fn log(&self) -> &[LogItem] {
        &self.log
    }

    /// Returns `true` if any failure has the given reason code.
    pub fn has_failure(&self, code: &str) -> bool {
        self.failure_reasons.iter().any(|e| e.code() == code)
    }

    /// Returns `true` if any warning has the given reason code.
    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|e| e.code() == code)
    }

    /// Returns `true` if the audit trail contains the given status code.
    pub fn has_status(&self, status: &str) -> bool {
        self.log
            .iter()
            .any(|i| i.validation_status.as_deref() == Some(status))
    }
}

/// Accumulates findings while a validator runs.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    tracker: StatusTracker,
    failures: Vec<ValidationError>,
    warnings: Vec<ValidationError>,
    summary: Option<String>,
}

impl Findings {
    pub(crate) fn pass(&mut self, item: LogItem) {
        item.success(&mut self.tracker);
    }

    pub(crate) fn note(&mut self, item: LogItem) {
        item.informational(&mut self.tracker);
    }

    pub(crate) fn fail(&mut self, item: LogItem, err: ValidationError) {
        let item = if item.validation_status.is_none() {
            item.validation_status(err.validation_status())
        } else {
            item
        };
        item.failure_no_throw(&mut self.tracker, &err);
        self.failures.push(err);
    }

    /// Records a soft finding.
    pub(crate) fn warn(&mut self, item: LogItem, err: ValidationError) {
        let item = if item.validation_status.is_none() {
            item.validation_status(err.validation_status())
        } else {
            item
        };
        item.informational(&mut self.tracker);
        self.warnings.push(err);
    }

    /// Folds a nested result into this one, inside a named scope.
    pub(crate) fn absorb(&mut self, scope: &str, result: &ValidationResult) {
        let mut nested = StatusTracker::default();
        for item in result.log() {
            let mut item = item.clone();
            if item.label.is_empty() {
                item.label = scope.to_owned().into();
            }
            nested.add_non_error(item);
        }
        self.tracker.append(&nested);
        self.failures.extend(result.failure_reasons.iter().cloned());
        self.warnings.extend(result.warnings.iter().cloned());
    }

    pub(crate) fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub(crate) fn failures(&self) -> &[ValidationError] {
        &self.failures
    }

    pub(crate) fn summarize<S: Into<String>>(&mut self, summary: S) {
        self.summary = Some(summary.into());
    }

    pub(crate) fn into_result(self) -> ValidationResult {
        let status = if self.failures.is_empty() {
            ValidationOutcome::Success
        } else {
            ValidationOutcome::Failed
        };

        ValidationResult {
            status,
            failure_reasons: self.failures,
            warnings: self.warnings,
            summary: self.summary,
            log: self.tracker.into_items(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::log_item;

    #[test]
    fn failed_iff_reasons_present() {
        let ok = ValidationResult::success();
        assert!(ok.is_success());
        assert!(ok.failure_reasons().is_empty());

        let bad = ValidationResult::failure(ValidationError::Expired("notAfter passed".into()));
        assert_eq!(bad.status(), ValidationOutcome::Failed);
        assert!(bad.has_failure("EXPIRED"));
        assert!(bad.has_status(validation_status::CERTIFICATE_EXPIRED));
    }

    #[test]
    fn warnings_do_not_fail() {
        let mut findings = Findings::default();
        findings.warn(
            log_item!("chain[1]", "no CRL", "test"),
            ValidationError::CrlUnavailable("directory empty".into()),
        );
        let result = findings.into_result();

        assert!(result.is_success());
        assert!(result.has_warning("CRL_UNAVAILABLE"));
        assert!(result.has_status(validation_status::REVOCATION_CRL_UNAVAILABLE));
    }

    #[test]
    fn absorb_labels_nested_items() {
        let inner = ValidationResult::failure(ValidationError::InvalidConstraints("no cA".into()));
        let mut findings = Findings::default();
        findings.absorb("chain[0]", &inner);
        let result = findings.into_result();

        assert!(!result.is_success());
        assert_eq!(result.log()[0].label, "chain[0]");
    }

    #[test]
    fn fatal_classification() {
        assert!(ValidationError::SignatureInvalid(String::new()).is_fatal());
        assert!(ValidationError::CertificateRevoked(String::new()).is_fatal());
        assert!(!ValidationError::CrlUnavailable(String::new()).is_fatal());
        assert!(!ValidationError::CrlFetchTimeout(String::new()).is_fatal());
    }

    #[test]
    fn serializes_reason_codes() {
        let result = ValidationResult::failure(ValidationError::ChainInvalid("issuer".into()));
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "FAILED");
        assert_eq!(json["failure_reasons"][0]["code"], "CHAIN_INVALID");
        assert_eq!(json["failure_reasons"][0]["message"], "issuer");
    }
}
