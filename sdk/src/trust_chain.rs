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

//! Trust path validation from a CSCA outward.

use std::slice::Iter;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::{
    certificate::{Certificate, CertificateType},
    log_item,
    ports::CscaLookup,
    revocation::{RevocationChecker, RevocationStatus},
    settings::RevocationSettings,
    structural_validator::{CertificateRole, CertificateStructuralValidator},
    utils::time::utc_now,
    validation_results::{Findings, ValidationError, ValidationResult},
    validation_status::*,
    Error, Result,
};

/// Longest path the validator accepts: CSCA, DSC, DS.
pub const MAX_PATH_LEN: usize = 3;

/// An ordered path of one to three certificates, root first.
#[derive(Clone, Debug, PartialEq)]
pub struct TrustPath {
    certs: Vec<Certificate>,
}

impl TrustPath {
    /// Builds a path from `certs`, root first.
    ///
    /// The third element, when present, is typed as a
    /// [`CertificateType::Ds`].
    pub fn new(certs: Vec<Certificate>) -> Result<Self> {
        if certs.is_empty() || certs.len() > MAX_PATH_LEN {
            return Err(Error::BadParam(format!(
                "a trust path holds 1 to {MAX_PATH_LEN} certificates, got {}",
                certs.len()
            )));
        }

        let certs = certs
            .into_iter()
            .enumerate()
            .map(|(i, c)| if i == 2 { c.with_type(CertificateType::Ds) } else { c })
            .collect();
        Ok(Self { certs })
    }

    /// A root and the certificate it issued.
    pub fn csca_dsc(csca: Certificate, dsc: Certificate) -> Self {
        Self {
            certs: vec![csca, dsc],
        }
    }

    pub fn root(&self) -> &Certificate {
        &self.certs[0]
    }

    pub fn intermediate(&self) -> Option<&Certificate> {
        self.certs.get(1)
    }

    pub fn leaf(&self) -> Option<&Certificate> {
        self.certs.get(2)
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, Certificate> {
        self.certs.iter()
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certs
    }
}

impl<'a> IntoIterator for &'a TrustPath {
    type Item = &'a Certificate;
    type IntoIter = Iter<'a, Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.certs.iter()
    }
}

/// Validates trust paths.
///
/// Holds no per-path state; concurrent calls with distinct paths are safe
/// and repeated calls with the same path and time give equal results.
#[derive(Clone, Debug)]
pub struct TrustChainValidator {
    structural: CertificateStructuralValidator,
    revocation: Option<RevocationChecker>,
    settings: RevocationSettings,
}

impl TrustChainValidator {
    /// Creates a validator. Without a [`RevocationChecker`], revocation is
    /// recorded as skipped.
    pub fn new(revocation: Option<RevocationChecker>, settings: &RevocationSettings) -> Self {
        Self {
            structural: CertificateStructuralValidator::new(),
            revocation,
            settings: settings.clone(),
        }
    }

    /// Validates `path` at the current time.
    pub async fn validate(&self, path: &TrustPath) -> ValidationResult {
        self.validate_at(path, utc_now()).await
    }

    /// Validates `path` as of `at`.
    ///
    /// The root is checked in self-signed mode. Each following certificate
    /// must name its parent as issuer, verify under the parent's key, pass
    /// the structural checks for its position and, for the DSC slot (and
    /// the leaf when configured), not be revoked. Validation stops at the
    /// first fatal finding.
    pub async fn validate_at(&self, path: &TrustPath, at: DateTime<Utc>) -> ValidationResult {
        let mut findings = Findings::default();
        let certs = path.certificates();

        let root = self
            .structural
            .validate_at(&certs[0], CertificateRole::Root, at);
        findings.absorb("chain[0]", &root);
        if findings.has_failures() {
            return Self::finish(findings, path);
        }

        for (i, pair) in certs.windows(2).enumerate() {
            let (parent, child) = (&pair[0], &pair[1]);
            let position = i + 1;
            let scope = format!("chain[{position}]");

            let linkage = self.validate_issuer_relationship(child, parent);
            findings.absorb(&scope, &linkage);
            if findings.has_failures() {
                return Self::finish(findings, path);
            }

            let role = if position == certs.len() - 1 {
                CertificateRole::Leaf
            } else {
                CertificateRole::Intermediate
            };
            let structural = self.structural.validate_at(child, role, at);
            findings.absorb(&scope, &structural);
            if findings.has_failures() {
                return Self::finish(findings, path);
            }

            let wants_revocation = position == 1 || self.settings.check_leaf_revocation;
            if wants_revocation {
                self.check_revocation(child, parent, &scope, &mut findings)
                    .await;
                if findings.has_failures() {
                    return Self::finish(findings, path);
                }
            }
        }

        findings.pass(
            log_item!("chain", format!("{} certificate path validated", certs.len()), "validate_at")
                .validation_status(CHAIN_VALIDATED),
        );
        Self::finish(findings, path)
    }

    /// Checks that `parent` issued `child`: the issuer DN must equal the
    /// parent's subject DN exactly, and the child's signature must verify
    /// under the parent's key.
    pub fn validate_issuer_relationship(
        &self,
        child: &Certificate,
        parent: &Certificate,
    ) -> ValidationResult {
        let mut findings = Findings::default();

        if child.issuer_dn() != parent.subject_dn() {
            findings.fail(
                log_item!(
                    child.subject_dn().to_owned(),
                    "issuer does not match parent subject",
                    "validate_issuer_relationship"
                )
                .validation_status(CHAIN_ISSUER_MISMATCH),
                ValidationError::ChainInvalid(format!(
                    "issuer \"{}\" does not match parent subject \"{}\"",
                    child.issuer_dn(),
                    parent.subject_dn()
                )),
            );
            return findings.into_result();
        }
        findings.pass(
            log_item!(
                child.subject_dn().to_owned(),
                "issuer matches parent subject",
                "validate_issuer_relationship"
            )
            .validation_status(CHAIN_ISSUER_MATCH),
        );

        match child.verify_signed_by(&parent.public_key().spki_der) {
            Ok(()) => findings.pass(
                log_item!(
                    child.subject_dn().to_owned(),
                    "signature verified under parent key",
                    "validate_issuer_relationship"
                )
                .validation_status(CHAIN_SIGNATURE_VALIDATED),
            ),
            Err(err) => {
                let err = ValidationError::from_signature_error("certificate signature", &err);
                let status = match err {
                    ValidationError::SignatureInvalid(_) => CHAIN_SIGNATURE_MISMATCH,
                    _ => ALGORITHM_UNSUPPORTED,
                };
                findings.fail(
                    log_item!(
                        child.subject_dn().to_owned(),
                        "signature does not verify under parent key",
                        "validate_issuer_relationship"
                    )
                    .validation_status(status),
                    err,
                );
            }
        }

        findings.into_result()
    }

    /// Validates a CSCA on its own, as of now.
    pub fn validate_csca(&self, csca: &Certificate) -> ValidationResult {
        self.validate_csca_at(csca, utc_now())
    }

    /// Validates a CSCA on its own, as of `at`.
    pub fn validate_csca_at(&self, csca: &Certificate, at: DateTime<Utc>) -> ValidationResult {
        self.structural
            .validate_at(csca, CertificateRole::Root, at)
    }

    /// Validates a DSC against the CSCA that issued it, as of now. The CSCA
    /// itself is not re-validated.
    pub async fn validate_dsc(&self, dsc: &Certificate, csca: &Certificate) -> ValidationResult {
        self.validate_dsc_at(dsc, csca, utc_now()).await
    }

    /// Validates a DSC against its CSCA as of `at`.
    pub async fn validate_dsc_at(
        &self,
        dsc: &Certificate,
        csca: &Certificate,
        at: DateTime<Utc>,
    ) -> ValidationResult {
        let mut findings = Findings::default();

        findings.absorb("dsc", &self.validate_issuer_relationship(dsc, csca));
        if !findings.has_failures() {
            let structural = self.structural.validate_at(dsc, CertificateRole::Leaf, at);
            findings.absorb("dsc", &structural);
        }
        if !findings.has_failures() {
            self.check_revocation(dsc, csca, "dsc", &mut findings).await;
        }

        findings.into_result()
    }

    /// Finds the CSCA that issued `signer` through `lookup` and validates
    /// the two element path as of `at`.
    ///
    /// Candidates are the roots for the signer's issuer country (or
    /// `fallback_country`) whose subject equals the signer's issuer; the
    /// first that validates wins. Returns the CSCA the result refers to.
    pub async fn anchor_at(
        &self,
        lookup: &dyn CscaLookup,
        signer: &Certificate,
        fallback_country: Option<&str>,
        at: DateTime<Utc>,
    ) -> (Option<Certificate>, ValidationResult) {
        let country = signer
            .issuer()
            .name
            .country_code
            .as_deref()
            .or(fallback_country);

        let Some(country) = country else {
            return (
                None,
                ValidationResult::failure(ValidationError::ChainInvalid(
                    "no issuing country to look up a CSCA".into(),
                )),
            );
        };

        let roots = match lookup.find_roots_by_country(country).await {
            Ok(roots) => roots,
            Err(err) => {
                warn!("CSCA lookup for {country} failed: {err}");
                return (
                    None,
                    ValidationResult::failure(ValidationError::UnknownError(format!(
                        "CSCA lookup for {country}: {err}"
                    ))),
                );
            }
        };

        let candidates: Vec<Certificate> = roots
            .into_iter()
            .filter(|c| c.subject_dn() == signer.issuer_dn())
            .collect();

        let Some((last, others)) = candidates.split_last() else {
            let mut findings = Findings::default();
            findings.fail(
                log_item!(
                    signer.issuer_dn().to_owned(),
                    "no CSCA matches the signer's issuer",
                    "anchor_at"
                )
                .validation_status(CSCA_NOT_FOUND),
                ValidationError::ChainInvalid(format!(
                    "no CSCA for {country} with subject \"{}\"",
                    signer.issuer_dn()
                )),
            );
            return (None, findings.into_result());
        };

        for csca in others {
            let chain = self.validate_pair(csca, signer, at).await;
            if chain.is_success() {
                return (Some(csca.clone()), chain);
            }
        }
        let chain = self.validate_pair(last, signer, at).await;
        (Some(last.clone()), chain)
    }

    async fn validate_pair(
        &self,
        csca: &Certificate,
        signer: &Certificate,
        at: DateTime<Utc>,
    ) -> ValidationResult {
        let path = TrustPath::csca_dsc(csca.clone(), signer.clone());
        let chain = self.validate_at(&path, at).await;
        debug!(
            "document signer checked against {}: {:?}",
            csca.subject_dn(),
            chain.status()
        );
        chain
    }

    async fn check_revocation(
        &self,
        child: &Certificate,
        parent: &Certificate,
        scope: &str,
        findings: &mut Findings,
    ) {
        let Some(checker) = &self.revocation else {
            findings.note(
                log_item!(scope.to_owned(), "no revocation checker configured", "check_revocation")
                    .validation_status(REVOCATION_SKIPPED),
            );
            return;
        };

        let result = checker.check_with_issuer(child, parent).await;
        let item = log_item!(
            scope.to_owned(),
            format!("revocation status {:?}", result.revocation_status),
            "check_revocation"
        );

        if result.crl_from_cache {
            debug!("{scope}: CRL served from cache");
        }

        let item = match (result.revocation_status, result.crl_issuer_dn.is_some()) {
            (RevocationStatus::NotRevoked | RevocationStatus::Revoked, _) => {
                findings.pass(
                    log_item!(
                        scope.to_owned(),
                        "CRL verified under the issuer key",
                        "check_revocation"
                    )
                    .validation_status(CRL_SIGNATURE_VALIDATED),
                );
                item
            }
            // a CRL was found but did not verify
            (RevocationStatus::CrlUnavailable, true) => {
                item.validation_status(CRL_SIGNATURE_MISMATCH)
            }
            _ => item,
        };

        match (result.revocation_status, result.to_validation_error()) {
            (RevocationStatus::NotRevoked, _) | (_, None) => {
                findings.pass(item.validation_status(REVOCATION_NOT_REVOKED));
            }
            (RevocationStatus::Revoked, Some(err)) => {
                findings.fail(item.validation_status(REVOCATION_REVOKED), err);
            }
            (_, Some(err)) if self.settings.fail_open => {
                info!("{scope}: {err}; continuing under fail-open policy");
                findings.warn(item, err);
            }
            (_, Some(err)) => findings.fail(item, err),
        }
    }

    fn finish(mut findings: Findings, path: &TrustPath) -> ValidationResult {
        let subject = path
            .certificates()
            .last()
            .map(|c| c.subject_dn().to_owned())
            .unwrap_or_default();

        let summary = match findings.failures().first() {
            None => format!("trust path for {subject} is valid"),
            Some(first) => format!("trust path for {subject} is invalid: {first}"),
        };
        debug!("{summary}");
        findings.summarize(summary);
        findings.into_result()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::{
        crl::Crl,
        crl_cache::CrlCache,
        ports::{
            memory::{MemoryCrlDirectory, MemoryCrlStore},
            CrlDirectory,
        },
        settings::CrlCacheSettings,
    };

    const CSCA: &[u8] = include_bytes!("../tests/fixtures/pki/csca.der");
    const CSCA_IMPOSTOR: &[u8] = include_bytes!("../tests/fixtures/pki/csca_impostor.der");
    const CSCA_OTHER: &[u8] = include_bytes!("../tests/fixtures/pki/csca_other.der");
    const DSC: &[u8] = include_bytes!("../tests/fixtures/pki/dsc.der");
    const DSC_REVOKED: &[u8] = include_bytes!("../tests/fixtures/pki/dsc_revoked.der");
    const INTERMEDIATE: &[u8] = include_bytes!("../tests/fixtures/pki/chain_intermediate.der");
    const LEAF: &[u8] = include_bytes!("../tests/fixtures/pki/chain_leaf.der");
    const EMPTY_CRL: &[u8] = include_bytes!("../tests/fixtures/pki/csca_empty.crl");
    const REVOKING_CRL: &[u8] = include_bytes!("../tests/fixtures/pki/csca_revoking.crl");

    struct FailingDirectory;

    #[async_trait]
    impl CrlDirectory for FailingDirectory {
        async fn find_crl_by_issuer(&self, _: &str, _: &str) -> Result<Option<Vec<u8>>> {
            Err(Error::Port("directory unreachable".into()))
        }
    }

    fn cert(der: &[u8]) -> Certificate {
        Certificate::from_der(der).unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2027, 6, 1, 0, 0, 0).unwrap()
    }

    fn validator_with(
        directory: Arc<dyn CrlDirectory>,
        settings: RevocationSettings,
    ) -> TrustChainValidator {
        let cache = CrlCache::new(
            Arc::new(MemoryCrlStore::new()),
            directory,
            &CrlCacheSettings::default(),
        );
        let checker = RevocationChecker::new(Arc::new(cache), &settings);
        TrustChainValidator::new(Some(checker), &settings)
    }

    fn directory_with(crl: &[u8]) -> Arc<dyn CrlDirectory> {
        let directory = MemoryCrlDirectory::new();
        directory.publish("UT", &Crl::from_der(crl).unwrap());
        Arc::new(directory)
    }

    #[tokio::test]
    async fn csca_dsc_path_is_valid() {
        let validator = validator_with(directory_with(EMPTY_CRL), RevocationSettings::default());
        let path = TrustPath::csca_dsc(cert(CSCA), cert(DSC));

        let result = validator.validate_at(&path, at()).await;
        assert!(result.is_success(), "{result:?}");
        assert!(result.has_status(CHAIN_VALIDATED));
        assert!(result.has_status(REVOCATION_NOT_REVOKED));
        assert!(result.warnings().is_empty());
    }

    #[tokio::test]
    async fn revoked_dsc_fails() {
        let validator = validator_with(directory_with(REVOKING_CRL), RevocationSettings::default());
        let path = TrustPath::csca_dsc(cert(CSCA), cert(DSC_REVOKED));

        let result = validator.validate_at(&path, at()).await;
        assert!(!result.is_success());
        assert!(result.has_failure("CERTIFICATE_REVOKED"));
        assert!(result.has_status(REVOCATION_REVOKED));
    }

    #[tokio::test]
    async fn impostor_root_breaks_signature() {
        let validator = validator_with(directory_with(EMPTY_CRL), RevocationSettings::default());
        let path = TrustPath::csca_dsc(cert(CSCA_IMPOSTOR), cert(DSC));

        let result = validator.validate_at(&path, at()).await;
        assert_eq!(result.failure_reasons().len(), 1);
        assert!(result.has_failure("SIGNATURE_INVALID"));
        assert!(result.has_status(CHAIN_SIGNATURE_MISMATCH));
    }

    #[tokio::test]
    async fn unrelated_root_breaks_linkage() {
        let validator = validator_with(directory_with(EMPTY_CRL), RevocationSettings::default());
        let path = TrustPath::csca_dsc(cert(CSCA_OTHER), cert(DSC));

        let result = validator.validate_at(&path, at()).await;
        assert!(result.has_failure("CHAIN_INVALID"));
        assert!(!result.has_status(CHAIN_SIGNATURE_MISMATCH));
    }

    #[tokio::test]
    async fn three_element_path_fails_open() {
        let validator = validator_with(Arc::new(FailingDirectory), RevocationSettings::default());
        let path = TrustPath::new(vec![cert(CSCA), cert(INTERMEDIATE), cert(LEAF)]).unwrap();
        assert_eq!(path.leaf().unwrap().cert_type(), CertificateType::Ds);

        let result = validator.validate_at(&path, at()).await;
        assert!(result.is_success(), "{result:?}");
        assert!(result.has_warning("CRL_UNAVAILABLE"));
        assert!(result.has_status(REVOCATION_CRL_UNAVAILABLE));
    }

    #[tokio::test]
    async fn fail_closed_rejects_missing_crl() {
        let settings = RevocationSettings {
            fail_open: false,
            ..Default::default()
        };
        let validator = validator_with(Arc::new(FailingDirectory), settings);
        let path = TrustPath::csca_dsc(cert(CSCA), cert(DSC));

        let result = validator.validate_at(&path, at()).await;
        assert!(!result.is_success());
        assert!(result.has_failure("CRL_UNAVAILABLE"));
    }

    #[tokio::test]
    async fn dsc_cannot_act_as_intermediate() {
        let validator = validator_with(directory_with(EMPTY_CRL), RevocationSettings::default());
        // The DSC has no cA flag, so it cannot sit in the middle of a path.
        let path = TrustPath::new(vec![cert(CSCA), cert(DSC), cert(LEAF)]).unwrap();

        let result = validator.validate_at(&path, at()).await;
        assert!(result.has_failure("INVALID_CONSTRAINTS"));
    }

    #[tokio::test]
    async fn single_certificate_skips_linkage() {
        let validator = validator_with(directory_with(EMPTY_CRL), RevocationSettings::default());

        for der in [CSCA, DSC, CSCA_OTHER] {
            let path = TrustPath::new(vec![cert(der)]).unwrap();
            let result = validator.validate_at(&path, at()).await;
            assert!(!result.has_failure("CHAIN_INVALID"));
        }
    }

    #[tokio::test]
    async fn repeated_validation_is_identical() {
        let validator = validator_with(directory_with(EMPTY_CRL), RevocationSettings::default());
        let path = TrustPath::new(vec![cert(CSCA), cert(INTERMEDIATE), cert(LEAF)]).unwrap();

        let first = validator.validate_at(&path, at()).await;
        let second = validator.validate_at(&path, at()).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn without_checker_revocation_is_skipped() {
        let validator = TrustChainValidator::new(None, &RevocationSettings::default());
        let result = validator
            .validate_at(&TrustPath::csca_dsc(cert(CSCA), cert(DSC)), at())
            .await;

        assert!(result.is_success());
        assert!(result.has_status(REVOCATION_SKIPPED));
    }

    #[tokio::test]
    async fn decomposed_steps() {
        let validator = validator_with(directory_with(REVOKING_CRL), RevocationSettings::default());

        assert!(validator
            .validate_issuer_relationship(&cert(DSC), &cert(CSCA))
            .is_success());
        assert!(validator.validate_csca_at(&cert(CSCA), at()).is_success());
        assert!(validator
            .validate_dsc_at(&cert(DSC), &cert(CSCA), at())
            .await
            .is_success());
        assert!(validator
            .validate_dsc_at(&cert(DSC_REVOKED), &cert(CSCA), at())
            .await
            .has_failure("CERTIFICATE_REVOKED"));
    }

    #[test]
    fn path_length_bounds() {
        assert!(TrustPath::new(vec![]).is_err());
        assert!(TrustPath::new(vec![cert(CSCA); 4]).is_err());
        assert_eq!(TrustPath::new(vec![cert(CSCA)]).unwrap().len(), 1);
    }
}
