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

//! The parsed certificate revocation list model.

use std::collections::BTreeMap;

use asn1_rs::{Any, FromDer};
use chrono::{DateTime, Utc};
use serde::Serialize;
use x509_parser::revocation_list::CertificateRevocationList;

use crate::{
    crypto::raw_signature::{verify_signature, RawSignatureValidationError, SignatureAlgorithm},
    utils::{normalize_serial, time::asn1_time_to_datetime},
    Error, Result,
};

/// One revoked certificate entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RevokedEntry {
    /// Normalized serial number.
    pub serial_number: String,

    /// When the certificate was revoked.
    pub revoked_at: DateTime<Utc>,

    /// RFC 5280 `CRLReason` code, if the entry carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<u8>,
}

/// A parsed CRL. Immutable once built; a fresher CRL for the same issuer
/// supersedes it rather than modifying it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Crl {
    issuer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    country_code: Option<String>,
    this_update: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_update: Option<DateTime<Utc>>,
    revoked: BTreeMap<String, RevokedEntry>,
    #[serde(skip)]
    der: Vec<u8>,
}

impl Crl {
    /// Parse a DER CRL.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, crl) = CertificateRevocationList::from_der(der)
            .map_err(|e| Error::CrlParse(e.to_string()))?;

        let this_update = asn1_time_to_datetime(&crl.last_update())
            .ok_or_else(|| Error::CrlParse("thisUpdate out of range".into()))?;
        let next_update = crl.next_update().as_ref().and_then(asn1_time_to_datetime);

        let mut revoked = BTreeMap::new();
        for entry in crl.iter_revoked_certificates() {
            let serial_number = normalize_serial(&const_hex::encode(entry.raw_serial()));
            let revoked_at = asn1_time_to_datetime(&entry.revocation_date)
                .ok_or_else(|| Error::CrlParse("revocationDate out of range".into()))?;

            revoked.insert(
                serial_number.clone(),
                RevokedEntry {
                    serial_number,
                    revoked_at,
                    reason_code: entry.reason_code().map(|(_critical, code)| code.0),
                },
            );
        }

        let country_code = crl
            .issuer()
            .iter_country()
            .next()
            .and_then(|c| c.as_str().ok())
            .map(str::to_owned);

        Ok(Self {
            issuer_name: crl.issuer().to_string(),
            country_code,
            this_update,
            next_update,
            revoked,
            der: der.to_vec(),
        })
    }

    /// Issuer DN, rendered the same way as [`Certificate::subject_dn`].
    ///
    /// [`Certificate::subject_dn`]: crate::Certificate::subject_dn
    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    /// Issuer country code, if present.
    pub fn country_code(&self) -> Option<&str> {
        self.country_code.as_deref()
    }

    /// `thisUpdate`
    pub fn this_update(&self) -> DateTime<Utc> {
        self.this_update
    }

    /// `nextUpdate`
    pub fn next_update(&self) -> Option<DateTime<Utc>> {
        self.next_update
    }

    /// Raw DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Number of revoked entries.
    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }

    /// Iterate over revoked entries in serial order.
    pub fn revoked_entries(&self) -> impl Iterator<Item = &RevokedEntry> {
        self.revoked.values()
    }

    /// Look up a serial number. The serial is normalized before comparison.
    pub fn find_revoked(&self, serial_number: &str) -> Option<&RevokedEntry> {
        self.revoked.get(&normalize_serial(serial_number))
    }

    /// `true` when `nextUpdate` is present and already past at `now`.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.next_update.is_some_and(|next| next < now)
    }

    /// Verify the CRL signature with the issuer's DER
    /// `SubjectPublicKeyInfo`.
    pub fn verify_signature(&self, issuer_spki: &[u8]) -> Result<()> {
        let (_, crl) = CertificateRevocationList::from_der(&self.der)
            .map_err(|e| Error::CrlParse(e.to_string()))?;

        let alg = SignatureAlgorithm::from_algorithm_identifier(&crl.signature_algorithm)
            .ok_or(RawSignatureValidationError::UnsupportedAlgorithm)?;

        let tbs = tbs_cert_list(&self.der)
            .ok_or_else(|| Error::CrlParse("unable to locate tbsCertList".into()))?;

        verify_signature(alg, crl.signature_value.as_ref(), tbs, issuer_spki)?;
        Ok(())
    }
}

// CertificateList ::= SEQUENCE { tbsCertList, signatureAlgorithm, signatureValue }
fn tbs_cert_list(der: &[u8]) -> Option<&[u8]> {
    let (_, outer) = Any::from_der(der).ok()?;
    let content = outer.data;
    let (rem, _tbs) = Any::from_der(content).ok()?;
    Some(&content[..content.len() - rem.len()])
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;

    use super::*;
    use crate::Certificate;

    const CSCA: &[u8] = include_bytes!("../tests/fixtures/pki/csca.der");
    const CSCA_IMPOSTOR: &[u8] = include_bytes!("../tests/fixtures/pki/csca_impostor.der");
    const REVOKING: &[u8] = include_bytes!("../tests/fixtures/pki/csca_revoking.crl");
    const EMPTY: &[u8] = include_bytes!("../tests/fixtures/pki/csca_empty.crl");
    const STALE: &[u8] = include_bytes!("../tests/fixtures/pki/csca_stale.crl");

    #[test]
    fn parses_revoking_crl() {
        let crl = Crl::from_der(REVOKING).unwrap();
        let csca = Certificate::from_der(CSCA).unwrap();

        assert_eq!(crl.issuer_name(), csca.subject_dn());
        assert_eq!(crl.country_code(), Some("UT"));
        assert_eq!(crl.revoked_count(), 1);

        let entry = crl.find_revoked("0A1B2C3D4E5F").unwrap();
        assert_eq!(entry.serial_number, "A1B2C3D4E5F");
        assert_eq!(entry.reason_code, Some(1));
        assert_eq!(
            entry.revoked_at,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );

        assert!(crl.find_revoked("0a:1b:2c:3d:4e:5f").is_some());
        assert!(crl.find_revoked("1001").is_none());
    }

    #[test]
    fn empty_crl_has_no_entries() {
        let crl = Crl::from_der(EMPTY).unwrap();
        assert_eq!(crl.revoked_count(), 0);
        assert!(crl.next_update().is_some());
    }

    #[test]
    fn staleness_follows_next_update() {
        let stale = Crl::from_der(STALE).unwrap();
        let now = Utc.with_ymd_and_hms(2027, 6, 1, 0, 0, 0).unwrap();

        assert!(stale.is_stale_at(now));
        assert!(!Crl::from_der(REVOKING).unwrap().is_stale_at(now));
    }

    #[test]
    fn signature_verifies_against_issuer_only() {
        let crl = Crl::from_der(REVOKING).unwrap();
        let csca = Certificate::from_der(CSCA).unwrap();
        let impostor = Certificate::from_der(CSCA_IMPOSTOR).unwrap();

        crl.verify_signature(&csca.public_key().spki_der).unwrap();
        assert!(crl
            .verify_signature(&impostor.public_key().spki_der)
            .is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Crl::from_der(&[0x30, 0x03, 0x02, 0x01, 0x00]),
            Err(Error::CrlParse(_))
        ));
    }
}
