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

//! Revocation decisions from cached CRLs.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    certificate::Certificate,
    crl_cache::{CrlCache, CrlLookup},
    settings::RevocationSettings,
    validation_results::ValidationError,
};

/// Outcome of a revocation check.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevocationStatus {
    /// An authoritative CRL does not list the serial.
    NotRevoked,

    /// An authoritative CRL lists the serial.
    Revoked,

    /// No usable CRL could be found.
    CrlUnavailable,

    /// The CRL lookup did not finish in time.
    CrlFetchTimeout,
}

/// The full record of one revocation check. Returned for every check,
/// including checks whose CRL lookup failed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationCheckResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<Uuid>,
    pub serial_number: String,
    pub revocation_status: RevocationStatus,
    pub revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason_code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crl_issuer_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crl_last_update: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crl_next_update: Option<DateTime<Utc>>,
    pub crl_from_cache: bool,
    pub duration_millis: u64,
}

impl RevocationCheckResult {
    fn without_crl(serial_number: String, status: RevocationStatus) -> Self {
        Self {
            certificate_id: None,
            serial_number,
            revocation_status: status,
            revoked: false,
            revoked_at: None,
            revocation_reason_code: None,
            crl_issuer_dn: None,
            crl_last_update: None,
            crl_next_update: None,
            crl_from_cache: false,
            duration_millis: 0,
        }
    }

    /// The finding this result contributes to a chain validation, if any.
    pub fn to_validation_error(&self) -> Option<ValidationError> {
        let issuer = self.crl_issuer_dn.as_deref().unwrap_or("unknown issuer");
        match self.revocation_status {
            RevocationStatus::NotRevoked => None,
            RevocationStatus::Revoked => Some(ValidationError::CertificateRevoked(format!(
                "serial {} revoked by {issuer}{}",
                self.serial_number,
                self.revoked_at
                    .map(|at| format!(" at {at}"))
                    .unwrap_or_default()
            ))),
            RevocationStatus::CrlUnavailable => Some(ValidationError::CrlUnavailable(format!(
                "no usable CRL for serial {}",
                self.serial_number
            ))),
            RevocationStatus::CrlFetchTimeout => Some(ValidationError::CrlFetchTimeout(format!(
                "CRL lookup for serial {} timed out",
                self.serial_number
            ))),
        }
    }
}

/// Decides whether a certificate is revoked using the [`CrlCache`].
///
/// Never returns an error: an unavailable or slow CRL source yields
/// `CrlUnavailable` or `CrlFetchTimeout`, which callers treat according to
/// their fail-open policy.
#[derive(Clone, Debug)]
pub struct RevocationChecker {
    cache: Arc<CrlCache>,
    timeout: Duration,
}

impl RevocationChecker {
    pub fn new(cache: Arc<CrlCache>, settings: &RevocationSettings) -> Self {
        Self {
            cache,
            timeout: Duration::from_secs(settings.fetch_timeout_secs),
        }
    }

    /// The cache this checker reads from.
    pub fn cache(&self) -> &Arc<CrlCache> {
        &self.cache
    }

    /// Checks `serial_number` against the CRL of `issuer_dn` in
    /// `country_code`.
    pub async fn check(
        &self,
        issuer_dn: &str,
        serial_number: &str,
        country_code: &str,
    ) -> RevocationCheckResult {
        let started = std::time::Instant::now();
        // Echoed as given; the CRL compares normalized serials.
        let serial = serial_number.to_owned();

        let mut result = match self.fetch(issuer_dn, country_code).await {
            Ok(Some(found)) => Self::decide(serial, &found),
            Ok(None) => {
                RevocationCheckResult::without_crl(serial, RevocationStatus::CrlUnavailable)
            }
            Err(_elapsed) => {
                warn!(
                    "CRL lookup for {country_code}:{issuer_dn} exceeded {:?}",
                    self.timeout
                );
                RevocationCheckResult::without_crl(serial, RevocationStatus::CrlFetchTimeout)
            }
        };

        result.duration_millis = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            "revocation check {}:{} -> {:?}",
            issuer_dn, result.serial_number, result.revocation_status
        );
        result
    }

    /// Checks `cert` against the CRL of the CA named as its issuer.
    pub async fn check_certificate(&self, cert: &Certificate) -> RevocationCheckResult {
        let mut result = self
            .check(cert.issuer_dn(), cert.serial_number(), lookup_country(cert, None))
            .await;
        result.certificate_id = Some(cert.id());
        result
    }

    /// Checks `cert`, accepting the CRL only if it verifies under
    /// `issuer`'s key. A CRL that does not verify is not authoritative and
    /// the result is `CrlUnavailable`.
    pub async fn check_with_issuer(
        &self,
        cert: &Certificate,
        issuer: &Certificate,
    ) -> RevocationCheckResult {
        let started = std::time::Instant::now();
        let serial = cert.serial_number().to_owned();
        let country = lookup_country(cert, Some(issuer));

        let mut result = match self.fetch(cert.issuer_dn(), country).await {
            Ok(Some(found)) => match found.crl.verify_signature(&issuer.public_key().spki_der) {
                Ok(()) => Self::decide(serial, &found),
                Err(err) => {
                    warn!(
                        "CRL from {} does not verify under its issuer: {err}",
                        found.crl.issuer_name()
                    );
                    let mut r = RevocationCheckResult::without_crl(
                        serial,
                        RevocationStatus::CrlUnavailable,
                    );
                    r.crl_issuer_dn = Some(found.crl.issuer_name().to_owned());
                    r
                }
            },
            Ok(None) => {
                RevocationCheckResult::without_crl(serial, RevocationStatus::CrlUnavailable)
            }
            Err(_elapsed) => {
                warn!(
                    "CRL lookup for {country}:{} exceeded {:?}",
                    cert.issuer_dn(),
                    self.timeout
                );
                RevocationCheckResult::without_crl(serial, RevocationStatus::CrlFetchTimeout)
            }
        };

        result.certificate_id = Some(cert.id());
        result.duration_millis = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        result
    }

    async fn fetch(
        &self,
        issuer_dn: &str,
        country_code: &str,
    ) -> Result<Option<CrlLookup>, tokio::time::error::Elapsed> {
        tokio::time::timeout(self.timeout, self.cache.lookup(issuer_dn, country_code)).await
    }

    fn decide(serial: String, found: &CrlLookup) -> RevocationCheckResult {
        let crl = &found.crl;
        let entry = crl.find_revoked(&serial);

        RevocationCheckResult {
            certificate_id: None,
            revocation_status: if entry.is_some() {
                RevocationStatus::Revoked
            } else {
                RevocationStatus::NotRevoked
            },
            revoked: entry.is_some(),
            revoked_at: entry.map(|e| e.revoked_at),
            revocation_reason_code: entry.and_then(|e| e.reason_code),
            crl_issuer_dn: Some(crl.issuer_name().to_owned()),
            crl_last_update: Some(crl.this_update()),
            crl_next_update: crl.next_update(),
            crl_from_cache: found.from_cache(),
            duration_millis: 0,
            serial_number: serial,
        }
    }
}

// CRLs are filed under the issuing CA's country. The subject's own country
// stands in when the issuer name carries none.
fn lookup_country<'a>(cert: &'a Certificate, issuer: Option<&'a Certificate>) -> &'a str {
    issuer
        .and_then(|i| i.country_code())
        .or(cert.issuer().name.country_code.as_deref())
        .or(cert.country_code())
        .unwrap_or_default()
}
