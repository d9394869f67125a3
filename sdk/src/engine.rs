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

//! The validation engine, composed once from the three ports and the
//! settings.

use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::info;
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    certificate::{Certificate, CertificateStatus, CertificateType},
    crl_cache::CrlCache,
    passive_auth::{PaResult, PassiveAuthenticationEngine, PassportData},
    ports::{CrlDirectory, CrlStore, CscaLookup},
    revocation::{RevocationCheckResult, RevocationChecker},
    settings::Settings,
    structural_validator::{CertificateRole, CertificateStructuralValidator},
    trust_chain::{TrustChainValidator, TrustPath},
    utils::time::utc_now,
    validation_results::ValidationResult,
    Result,
};

/// Outcome of validating one certificate of a batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateValidation {
    pub certificate_id: Uuid,
    pub subject_dn: String,
    pub cert_type: CertificateType,

    /// Status derived from `result`.
    pub status: CertificateStatus,
    pub result: ValidationResult,
}

/// Entry point to every validation the core offers.
///
/// Cloning is cheap; clones share the CRL cache.
#[derive(Clone)]
pub struct ValidationEngine {
    settings: Settings,
    cache: Arc<CrlCache>,
    structural: CertificateStructuralValidator,
    revocation: RevocationChecker,
    chain: TrustChainValidator,
    passive_auth: PassiveAuthenticationEngine,
    csca_lookup: Arc<dyn CscaLookup>,
}

impl fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ValidationEngine {
    /// Builds the engine. `settings` is validated first.
    pub fn new(
        store: Arc<dyn CrlStore>,
        directory: Arc<dyn CrlDirectory>,
        csca_lookup: Arc<dyn CscaLookup>,
        settings: Settings,
    ) -> Result<Self> {
        settings.validate()?;

        let cache = Arc::new(CrlCache::new(store, directory, &settings.crl_cache));
        let revocation = RevocationChecker::new(cache.clone(), &settings.revocation);
        let chain = TrustChainValidator::new(Some(revocation.clone()), &settings.revocation);
        let passive_auth = PassiveAuthenticationEngine::new(
            chain.clone(),
            csca_lookup.clone(),
            &settings.passive_auth,
        );

        info!(
            "validation engine ready (fetch timeout {}s, fail-open {})",
            settings.revocation.fetch_timeout_secs, settings.revocation.fail_open
        );

        Ok(Self {
            settings,
            cache,
            structural: CertificateStructuralValidator::new(),
            revocation,
            chain,
            passive_auth,
            csca_lookup,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The shared CRL cache.
    pub fn crl_cache(&self) -> &Arc<CrlCache> {
        &self.cache
    }

    /// Starts the periodic sweep of expired CRLs at the configured
    /// interval. Must be called from within a tokio runtime.
    pub fn spawn_crl_sweeper(&self) -> JoinHandle<()> {
        self.cache
            .spawn_sweeper(Duration::from_secs(self.settings.crl_cache.sweep_interval_secs))
    }

    /// Structural checks of one certificate for `role`.
    pub fn validate_certificate(
        &self,
        cert: &Certificate,
        role: CertificateRole,
    ) -> ValidationResult {
        self.structural.validate(cert, role)
    }

    pub fn validate_certificate_at(
        &self,
        cert: &Certificate,
        role: CertificateRole,
        at: DateTime<Utc>,
    ) -> ValidationResult {
        self.structural.validate_at(cert, role, at)
    }

    pub async fn validate_chain(&self, path: &TrustPath) -> ValidationResult {
        self.chain.validate(path).await
    }

    pub async fn validate_chain_at(&self, path: &TrustPath, at: DateTime<Utc>) -> ValidationResult {
        self.chain.validate_at(path, at).await
    }

    /// Revocation status of `cert`. When the issuing CSCA is known the CRL
    /// must also verify under its key.
    pub async fn check_revocation(
        &self,
        cert: &Certificate,
        issuer: Option<&Certificate>,
    ) -> RevocationCheckResult {
        match issuer {
            Some(issuer) => self.revocation.check_with_issuer(cert, issuer).await,
            None => self.revocation.check_certificate(cert).await,
        }
    }

    pub async fn verify_passport(&self, passport: &PassportData) -> PaResult {
        self.passive_auth.verify(passport).await
    }

    /// Passive Authentication as of `at`.
    pub async fn verify_passport_at(&self, passport: &PassportData, at: DateTime<Utc>) -> PaResult {
        self.passive_auth.verify_at(passport, at).await
    }

    /// Validates many certificates, at most `batch.max_concurrency` at a
    /// time. Results are returned in input order.
    pub async fn validate_batch(&self, certs: Vec<Certificate>) -> Vec<CertificateValidation> {
        self.validate_batch_at(certs, utc_now()).await
    }

    /// Validates many certificates as of `at`.
    ///
    /// Self-issued certificates are validated as CSCAs. Any other
    /// certificate is anchored to a CSCA from the lookup port and validated
    /// as a two element path, which includes its revocation check.
    pub async fn validate_batch_at(
        &self,
        certs: Vec<Certificate>,
        at: DateTime<Utc>,
    ) -> Vec<CertificateValidation> {
        let total = certs.len();
        let outcomes: Vec<CertificateValidation> = stream::iter(certs)
            .map(|cert| self.validate_one(cert, at))
            .buffered(self.settings.batch.max_concurrency)
            .collect()
            .await;

        let valid = outcomes
            .iter()
            .filter(|o| o.status == CertificateStatus::Valid)
            .count();
        info!("batch validation: {valid} of {total} certificates valid");
        outcomes
    }

    async fn validate_one(&self, cert: Certificate, at: DateTime<Utc>) -> CertificateValidation {
        let result = if cert.is_self_issued() {
            self.chain.validate_csca_at(&cert, at)
        } else {
            self.chain
                .anchor_at(self.csca_lookup.as_ref(), &cert, None, at)
                .await
                .1
        };

        let cert = cert.with_validation_outcome(&result);
        CertificateValidation {
            certificate_id: cert.id(),
            subject_dn: cert.subject_dn().to_owned(),
            cert_type: cert.cert_type(),
            status: cert.status(),
            result,
        }
    }
}
