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

//! Checks a single certificate in isolation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    certificate::Certificate,
    log_item,
    utils::time::utc_now,
    validation_results::{Findings, ValidationError, ValidationResult},
    validation_status::*,
};

/// The position a certificate is being validated for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateRole {
    /// Self-issued trust anchor (CSCA). Must verify under its own key.
    Root,

    /// Issues the next certificate in the path.
    Intermediate,

    /// End of the path; signs documents.
    Leaf,
}

impl CertificateRole {
    fn must_issue(self) -> bool {
        matches!(self, Self::Root | Self::Intermediate)
    }
}

/// Validates one certificate's validity window, self-signature, basic
/// constraints, key usage and subject country.
///
/// Stateless; a single instance may be shared between tasks.
#[derive(Clone, Copy, Debug, Default)]
pub struct CertificateStructuralValidator;

impl CertificateStructuralValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates `cert` for `role` at the current time.
    pub fn validate(&self, cert: &Certificate, role: CertificateRole) -> ValidationResult {
        self.validate_at(cert, role, utc_now())
    }

    /// Validates `cert` for `role` as of `at`.
    ///
    /// Stops at the first hard failure. A CA missing `cRLSign` is recorded
    /// as an informational finding only.
    pub fn validate_at(
        &self,
        cert: &Certificate,
        role: CertificateRole,
        at: DateTime<Utc>,
    ) -> ValidationResult {
        let mut findings = Findings::default();
        let label = cert.subject_dn().to_owned();

        if let Err(err) = Self::check_validity(cert, at) {
            findings.fail(
                log_item!(label, "certificate outside validity period", "validate_at"),
                err,
            );
            return findings.into_result();
        }
        findings.pass(
            log_item!(label.clone(), "certificate inside validity period", "validate_at")
                .validation_status(CERTIFICATE_INSIDE_VALIDITY),
        );

        if role == CertificateRole::Root {
            if let Err(err) = cert.verify_signed_by(&cert.public_key().spki_der) {
                let err = ValidationError::from_signature_error("self-signature", &err);
                let status = match err {
                    ValidationError::SignatureInvalid(_) => CERTIFICATE_SELF_SIGNATURE_MISMATCH,
                    _ => ALGORITHM_UNSUPPORTED,
                };
                findings.fail(
                    log_item!(label, "root signature does not verify", "validate_at")
                        .validation_status(status),
                    err,
                );
                return findings.into_result();
            }
            findings.pass(
                log_item!(label.clone(), "root self-signature verified", "validate_at")
                    .validation_status(CERTIFICATE_SELF_SIGNATURE_VALIDATED),
            );
        }

        if role.must_issue() && !cert.is_ca() {
            findings.fail(
                log_item!(label, "basic constraints do not assert cA", "validate_at")
                    .validation_status(CERTIFICATE_BASIC_CONSTRAINTS_INVALID),
                ValidationError::InvalidConstraints(format!(
                    "{role:?} certificate is not a CA"
                )),
            );
            return findings.into_result();
        }

        let key_usage = cert.key_usage().unwrap_or_default();
        let missing = if role.must_issue() {
            (!key_usage.key_cert_sign).then_some("keyCertSign")
        } else {
            (!key_usage.digital_signature).then_some("digitalSignature")
        };
        if let Some(bit) = missing {
            findings.fail(
                log_item!(label, format!("key usage lacks {bit}"), "validate_at")
                    .validation_status(CERTIFICATE_KEY_USAGE_INVALID),
                ValidationError::InvalidConstraints(format!(
                    "{role:?} certificate does not assert {bit}"
                )),
            );
            return findings.into_result();
        }
        if role.must_issue() && !key_usage.crl_sign {
            findings.note(
                log_item!(label.clone(), "CA does not assert cRLSign", "validate_at")
                    .validation_status(CERTIFICATE_CRL_SIGN_MISSING),
            );
        }
        findings.pass(
            log_item!(label.clone(), "constraints match role", "validate_at")
                .validation_status(CERTIFICATE_CONSTRAINTS_VALIDATED),
        );

        match cert.country_code() {
            Some(c) if c.len() == 2 && c.bytes().all(|b| b.is_ascii_alphabetic()) => {
                findings.pass(
                    log_item!(label, "subject country present", "validate_at")
                        .validation_status(CERTIFICATE_COUNTRY_PRESENT),
                );
            }
            other => {
                findings.fail(
                    log_item!(label, "subject country missing", "validate_at")
                        .validation_status(CERTIFICATE_COUNTRY_MISSING),
                    ValidationError::InvalidConstraints(match other {
                        Some(c) => format!("subject country {c:?} is not a 2-letter code"),
                        None => "subject has no country attribute".to_owned(),
                    }),
                );
            }
        }

        findings.into_result()
    }

    fn check_validity(cert: &Certificate, at: DateTime<Utc>) -> Result<(), ValidationError> {
        let period = cert.validity_period();
        if at > period.not_after {
            Err(ValidationError::Expired(format!(
                "notAfter {} is before {at}",
                period.not_after
            )))
        } else if at < period.not_before {
            Err(ValidationError::NotYetValid(format!(
                "notBefore {} is after {at}",
                period.not_before
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;

    use super::*;

    fn cert(der: &[u8]) -> Certificate {
        Certificate::from_der(der).unwrap()
    }

    fn mid_2027() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2027, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn valid_root() {
        let csca = cert(include_bytes!("../tests/fixtures/pki/csca.der"));
        let result = CertificateStructuralValidator::new().validate_at(
            &csca,
            CertificateRole::Root,
            mid_2027(),
        );

        assert!(result.is_success(), "{result:?}");
        assert!(result.has_status(CERTIFICATE_SELF_SIGNATURE_VALIDATED));
        assert!(result.has_status(CERTIFICATE_COUNTRY_PRESENT));
    }

    #[test]
    fn valid_pss_root() {
        let csca = cert(include_bytes!("../tests/fixtures/pki/csca_pss.der"));
        let result = CertificateStructuralValidator::new().validate_at(
            &csca,
            CertificateRole::Root,
            mid_2027(),
        );

        assert!(result.is_success(), "{result:?}");
        assert!(result.has_status(CERTIFICATE_SELF_SIGNATURE_VALIDATED));
    }

    #[test]
    fn expired_root() {
        let csca = cert(include_bytes!("../tests/fixtures/pki/csca.der"));
        let later = Utc.with_ymd_and_hms(2050, 1, 1, 0, 0, 0).unwrap();
        let result =
            CertificateStructuralValidator::new().validate_at(&csca, CertificateRole::Root, later);

        assert!(!result.is_success());
        assert_eq!(result.failure_reasons().len(), 1);
        assert!(result.has_failure("EXPIRED"));
    }

    #[test]
    fn not_yet_valid() {
        let dsc = cert(include_bytes!("../tests/fixtures/pki/dsc.der"));
        let earlier = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let result =
            CertificateStructuralValidator::new().validate_at(&dsc, CertificateRole::Leaf, earlier);

        assert!(result.has_failure("NOT_YET_VALID"));
    }

    #[test]
    fn root_without_ca_flag() {
        let not_ca = cert(include_bytes!("../tests/fixtures/pki/csca_not_ca.der"));
        let result = CertificateStructuralValidator::new().validate_at(
            &not_ca,
            CertificateRole::Root,
            mid_2027(),
        );

        assert!(result.has_failure("INVALID_CONSTRAINTS"));
        assert!(result.has_status(CERTIFICATE_BASIC_CONSTRAINTS_INVALID));
    }

    #[test]
    fn root_without_country() {
        let no_country = cert(include_bytes!("../tests/fixtures/pki/csca_no_country.der"));
        let result = CertificateStructuralValidator::new().validate_at(
            &no_country,
            CertificateRole::Root,
            mid_2027(),
        );

        assert!(result.has_failure("INVALID_CONSTRAINTS"));
        assert!(result.has_status(CERTIFICATE_COUNTRY_MISSING));
    }

    #[test]
    fn leaf_cannot_issue() {
        let dsc = cert(include_bytes!("../tests/fixtures/pki/dsc.der"));
        let validator = CertificateStructuralValidator::new();

        assert!(validator
            .validate_at(&dsc, CertificateRole::Leaf, mid_2027())
            .is_success());

        let as_intermediate =
            validator.validate_at(&dsc, CertificateRole::Intermediate, mid_2027());
        assert!(as_intermediate.has_failure("INVALID_CONSTRAINTS"));
    }

    #[test]
    fn non_self_signed_root() {
        // Signed by the CSCA, so its own key does not verify it.
        let dsc = cert(include_bytes!("../tests/fixtures/pki/dsc.der"));
        let result = CertificateStructuralValidator::new().validate_at(
            &dsc,
            CertificateRole::Root,
            mid_2027(),
        );

        assert!(result.has_failure("SIGNATURE_INVALID"));
        assert!(result.has_status(CERTIFICATE_SELF_SIGNATURE_MISMATCH));
    }
}
