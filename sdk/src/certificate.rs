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

//! The parsed certificate model.
//!
//! A [`Certificate`] is built once from DER bytes and is read-only
//! afterwards. Its fingerprint and identity are derived from the DER and
//! cannot be set independently. Its status changes only through
//! [`Certificate::with_validation_outcome`].

use std::fmt;

use asn1_rs::FromDer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use x509_parser::{
    certificate::X509Certificate,
    extensions::ParsedExtension,
    pem::Pem,
    x509::{AttributeTypeAndValue, X509Name},
};

use crate::{
    crypto::{
        hash::sha256,
        raw_signature::{oids::*, verify_signature, RawSignatureValidationError, SignatureAlgorithm},
    },
    utils::{normalize_serial, time::asn1_time_to_datetime},
    validation_results::{ValidationOutcome, ValidationResult},
    Error, Result,
};

/// Role of a certificate in the ICAO PKI.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateType {
    /// Country Signing CA: the self-issued root of a country's PKI.
    Csca,

    /// Document Signer Certificate, issued by a CSCA.
    Dsc,

    /// Document Signer end-entity certificate at the leaf of a
    /// three-element path.
    Ds,

    /// Role could not be inferred.
    Unknown,
}

/// Validation-derived status of a certificate.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    /// The last validation succeeded.
    Valid,

    /// The last validation failed for a reason other than expiry or
    /// revocation.
    Invalid,

    /// The last validation found the certificate expired.
    Expired,

    /// The last validation found the certificate revoked.
    Revoked,

    /// Not validated yet.
    #[default]
    Unknown,
}

impl From<&ValidationResult> for CertificateStatus {
    fn from(result: &ValidationResult) -> Self {
        match result.status() {
            ValidationOutcome::Success => Self::Valid,
            ValidationOutcome::Failed if result.has_failure("CERTIFICATE_REVOKED") => {
                Self::Revoked
            }
            ValidationOutcome::Failed if result.has_failure("EXPIRED") => Self::Expired,
            ValidationOutcome::Failed => Self::Invalid,
        }
    }
}

/// Subject or issuer name details.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NameInfo {
    /// The distinguished name rendered as an RFC 4514 style string. Issuer
    /// and subject linkage is an exact comparison of this string.
    pub distinguished_name: String,

    /// The `C` attribute, if present.
    pub country_code: Option<String>,

    /// The first `O` attribute, if present.
    pub organization: Option<String>,

    /// The first `CN` attribute, if present.
    pub common_name: Option<String>,
}

impl NameInfo {
    fn from_x509(name: &X509Name) -> Self {
        Self {
            distinguished_name: name.to_string(),
            country_code: first_attr(name.iter_country()),
            organization: first_attr(name.iter_organization()),
            common_name: first_attr(name.iter_common_name()),
        }
    }
}

fn first_attr<'a>(
    mut attrs: impl Iterator<Item = &'a AttributeTypeAndValue<'a>>,
) -> Option<String> {
    attrs
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_owned)
}

/// Issuer name details, plus whether this certificate may itself act as an
/// issuer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct IssuerInfo {
    /// The issuer's name.
    #[serde(flatten)]
    pub name: NameInfo,

    /// `true` when this certificate asserts `cA` in basic constraints.
    pub is_ca: bool,
}

/// The certificate validity window.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ValidityPeriod {
    /// Start of the window.
    pub not_before: DateTime<Utc>,

    /// End of the window.
    pub not_after: DateTime<Utc>,
}

impl ValidityPeriod {
    /// Returns `true` if `at` lies within the window (both ends inclusive).
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

/// Key usage bits relevant to the ICAO profile.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct KeyUsageFlags {
    /// `digitalSignature`
    pub digital_signature: bool,

    /// `keyCertSign`
    pub key_cert_sign: bool,

    /// `cRLSign`
    pub crl_sign: bool,
}

/// The subject public key.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PublicKeyInfo {
    /// `RSA`, `EC`, or the dotted key algorithm OID.
    pub algorithm: String,

    /// DER `SubjectPublicKeyInfo`.
    #[serde(skip)]
    pub spki_der: Vec<u8>,
}

/// A parsed X.509 certificate.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Certificate {
    id: Uuid,
    #[serde(rename = "type")]
    cert_type: CertificateType,
    subject: NameInfo,
    issuer: IssuerInfo,
    validity_period: ValidityPeriod,
    public_key: PublicKeyInfo,
    serial_number: String,
    fingerprint_sha256: String,
    status: CertificateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_usage: Option<KeyUsageFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_key_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authority_key_identifier: Option<String>,
    #[serde(skip)]
    der: Vec<u8>,
}

impl Certificate {
    /// Parse a DER certificate.
    ///
    /// Fails if the bytes are not a certificate, or if `notAfter` does not
    /// follow `notBefore`.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, x509) = X509Certificate::from_der(der)
            .map_err(|e| Error::CertificateParse(e.to_string()))?;

        let validity = x509.validity();
        let validity_period = ValidityPeriod {
            not_before: asn1_time_to_datetime(&validity.not_before)
                .ok_or_else(|| Error::CertificateParse("notBefore out of range".into()))?,
            not_after: asn1_time_to_datetime(&validity.not_after)
                .ok_or_else(|| Error::CertificateParse("notAfter out of range".into()))?,
        };
        if validity_period.not_after <= validity_period.not_before {
            return Err(Error::InvalidValidityPeriod);
        }

        let is_ca = x509.is_ca();

        let key_usage = x509
            .key_usage()
            .map_err(|e| Error::CertificateParse(e.to_string()))?
            .map(|ku| KeyUsageFlags {
                digital_signature: ku.value.digital_signature(),
                key_cert_sign: ku.value.key_cert_sign(),
                crl_sign: ku.value.crl_sign(),
            });

        let mut subject_key_identifier = None;
        let mut authority_key_identifier = None;
        for ext in x509.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::SubjectKeyIdentifier(ski) => {
                    subject_key_identifier = Some(const_hex::encode_upper(ski.0));
                }
                ParsedExtension::AuthorityKeyIdentifier(aki) => {
                    authority_key_identifier = aki
                        .key_identifier
                        .as_ref()
                        .map(|k| const_hex::encode_upper(k.0));
                }
                _ => {}
            }
        }

        let spki = x509.public_key();
        let key_alg = &spki.algorithm.algorithm;
        let public_key = PublicKeyInfo {
            algorithm: if *key_alg == RSA_OID || *key_alg == RSA_PSS_OID {
                "RSA".to_owned()
            } else if *key_alg == EC_PUBLICKEY_OID {
                "EC".to_owned()
            } else {
                key_alg.to_id_string()
            },
            spki_der: spki.raw.to_vec(),
        };

        let subject = NameInfo::from_x509(x509.subject());
        let issuer = IssuerInfo {
            name: NameInfo::from_x509(x509.issuer()),
            is_ca,
        };

        let fingerprint = sha256(der);
        let cert_type = infer_type(
            subject.distinguished_name == issuer.name.distinguished_name,
            is_ca,
            key_usage,
        );

        Ok(Self {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, &fingerprint),
            cert_type,
            subject,
            issuer,
            validity_period,
            public_key,
            serial_number: normalize_serial(&const_hex::encode(x509.raw_serial())),
            fingerprint_sha256: const_hex::encode(&fingerprint),
            status: CertificateStatus::Unknown,
            key_usage,
            subject_key_identifier,
            authority_key_identifier,
            der: der.to_vec(),
        })
    }

    /// Parse every `CERTIFICATE` block in a PEM buffer.
    pub fn from_pem(pem: &[u8]) -> Result<Vec<Self>> {
        let mut certs = vec![];
        for block in Pem::iter_from_buffer(pem) {
            let block = block.map_err(|e| Error::CertificateParse(e.to_string()))?;
            if block.label == "CERTIFICATE" {
                certs.push(Self::from_der(&block.contents)?);
            }
        }

        if certs.is_empty() {
            return Err(Error::CertificateParse(
                "no CERTIFICATE block in PEM input".into(),
            ));
        }
        Ok(certs)
    }

    /// Parse DER or PEM, whichever the bytes contain.
    pub fn from_bytes(bytes: &[u8]) -> Result<Vec<Self>> {
        if bytes.starts_with(b"-----BEGIN") {
            Self::from_pem(bytes)
        } else {
            Ok(vec![Self::from_der(bytes)?])
        }
    }

    /// Deterministic identity derived from the fingerprint.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Role of the certificate.
    pub fn cert_type(&self) -> CertificateType {
        self.cert_type
    }

    /// Returns a copy with the role set, for callers that know the
    /// certificate's position (a leaf document signer, for example).
    #[must_use]
    pub fn with_type(self, cert_type: CertificateType) -> Self {
        Self { cert_type, ..self }
    }

    /// Subject name details.
    pub fn subject(&self) -> &NameInfo {
        &self.subject
    }

    /// Issuer name details.
    pub fn issuer(&self) -> &IssuerInfo {
        &self.issuer
    }

    /// Subject DN string.
    pub fn subject_dn(&self) -> &str {
        &self.subject.distinguished_name
    }

    /// Issuer DN string.
    pub fn issuer_dn(&self) -> &str {
        &self.issuer.name.distinguished_name
    }

    /// Subject country code, if present.
    pub fn country_code(&self) -> Option<&str> {
        self.subject.country_code.as_deref()
    }

    /// Validity window.
    pub fn validity_period(&self) -> &ValidityPeriod {
        &self.validity_period
    }

    /// Subject public key.
    pub fn public_key(&self) -> &PublicKeyInfo {
        &self.public_key
    }

    /// Normalized uppercase hex serial number.
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Lowercase hex SHA-256 of the DER encoding.
    pub fn fingerprint_sha256(&self) -> &str {
        &self.fingerprint_sha256
    }

    /// Status from the most recent validation.
    pub fn status(&self) -> CertificateStatus {
        self.status
    }

    /// `true` when basic constraints assert `cA`.
    pub fn is_ca(&self) -> bool {
        self.issuer.is_ca
    }

    /// Key usage bits, or `None` when the extension is absent.
    pub fn key_usage(&self) -> Option<KeyUsageFlags> {
        self.key_usage
    }

    /// Subject key identifier, uppercase hex.
    pub fn subject_key_identifier(&self) -> Option<&str> {
        self.subject_key_identifier.as_deref()
    }

    /// Authority key identifier, uppercase hex.
    pub fn authority_key_identifier(&self) -> Option<&str> {
        self.authority_key_identifier.as_deref()
    }

    /// Raw DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// `true` when subject and issuer DNs are equal.
    pub fn is_self_issued(&self) -> bool {
        self.subject.distinguished_name == self.issuer.name.distinguished_name
    }

    /// Returns a copy whose status reflects `result`.
    #[must_use]
    pub fn with_validation_outcome(self, result: &ValidationResult) -> Self {
        Self {
            status: CertificateStatus::from(result),
            ..self
        }
    }

    /// Verify this certificate's signature with `issuer_spki` (the DER
    /// `SubjectPublicKeyInfo` of the presumed issuer).
    pub fn verify_signed_by(&self, issuer_spki: &[u8]) -> Result<()> {
        let (_, x509) = X509Certificate::from_der(&self.der)
            .map_err(|e| Error::CertificateParse(e.to_string()))?;

        let alg = SignatureAlgorithm::from_algorithm_identifier(&x509.signature_algorithm)
            .ok_or(RawSignatureValidationError::UnsupportedAlgorithm)?;

        verify_signature(
            alg,
            x509.signature_value.as_ref(),
            x509.tbs_certificate.as_ref(),
            issuer_spki,
        )?;
        Ok(())
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (serial {})", self.subject.distinguished_name, self.serial_number)
    }
}

fn infer_type(
    self_issued: bool,
    is_ca: bool,
    key_usage: Option<KeyUsageFlags>,
) -> CertificateType {
    match (self_issued, is_ca) {
        (true, true) => CertificateType::Csca,
        (false, true) => CertificateType::Dsc,
        (_, false) if key_usage.is_some_and(|ku| ku.digital_signature) => CertificateType::Dsc,
        _ => CertificateType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const CSCA: &[u8] = include_bytes!("../tests/fixtures/pki/csca.der");
    const CSCA_PEM: &[u8] = include_bytes!("../tests/fixtures/pki/csca.pem");
    const DSC: &[u8] = include_bytes!("../tests/fixtures/pki/dsc.der");
    const DSC_REVOKED: &[u8] = include_bytes!("../tests/fixtures/pki/dsc_revoked.der");

    #[test]
    fn parses_csca() {
        let csca = Certificate::from_der(CSCA).unwrap();

        assert_eq!(csca.cert_type(), CertificateType::Csca);
        assert_eq!(csca.country_code(), Some("UT"));
        assert_eq!(csca.subject().common_name.as_deref(), Some("CSCA Utopia"));
        assert_eq!(
            csca.subject().organization.as_deref(),
            Some("Utopia Passport Office")
        );
        assert!(csca.is_ca());
        assert!(csca.is_self_issued());
        assert_eq!(csca.public_key().algorithm, "RSA");
        assert_eq!(csca.serial_number(), "1");
        assert_eq!(csca.status(), CertificateStatus::Unknown);

        let ku = csca.key_usage().unwrap();
        assert!(ku.key_cert_sign && ku.crl_sign);
    }

    #[test]
    fn parses_document_signer() {
        let dsc = Certificate::from_der(DSC).unwrap();

        assert_eq!(dsc.cert_type(), CertificateType::Dsc);
        assert!(!dsc.is_ca());
        assert!(!dsc.is_self_issued());
        assert_eq!(dsc.public_key().algorithm, "EC");
        assert_eq!(dsc.serial_number(), "1001");
        assert!(dsc.key_usage().unwrap().digital_signature);
        assert!(dsc.authority_key_identifier().is_some());

        let csca = Certificate::from_der(CSCA).unwrap();
        assert_eq!(dsc.issuer_dn(), csca.subject_dn());
        assert_eq!(
            dsc.authority_key_identifier(),
            csca.subject_key_identifier()
        );
    }

    #[test]
    fn fingerprint_is_sha256_of_der() {
        let dsc = Certificate::from_der(DSC).unwrap();
        assert_eq!(dsc.fingerprint_sha256(), const_hex::encode(sha256(DSC)));

        // Identity is a pure function of the bytes.
        assert_eq!(dsc.id(), Certificate::from_der(DSC).unwrap().id());
        assert_ne!(dsc.id(), Certificate::from_der(CSCA).unwrap().id());
    }

    #[test]
    fn serial_is_normalized() {
        let revoked = Certificate::from_der(DSC_REVOKED).unwrap();
        assert_eq!(revoked.serial_number(), "A1B2C3D4E5F");
    }

    #[test]
    fn pem_and_der_agree() {
        let from_pem = Certificate::from_pem(CSCA_PEM).unwrap();
        assert_eq!(from_pem.len(), 1);
        assert_eq!(from_pem[0], Certificate::from_der(CSCA).unwrap());

        assert_eq!(Certificate::from_bytes(CSCA_PEM).unwrap().len(), 1);
        assert!(Certificate::from_pem(b"-----BEGIN NOTHING-----").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Certificate::from_der(b"definitely not DER"),
            Err(Error::CertificateParse(_))
        ));
    }

    #[test]
    fn signature_linkage() {
        let csca = Certificate::from_der(CSCA).unwrap();
        let dsc = Certificate::from_der(DSC).unwrap();

        csca.verify_signed_by(&csca.public_key().spki_der).unwrap();
        dsc.verify_signed_by(&csca.public_key().spki_der).unwrap();
        assert!(matches!(
            csca.verify_signed_by(&dsc.public_key().spki_der),
            Err(Error::RawSignature(_))
        ));
    }

    #[test]
    fn status_follows_validation_outcome() {
        use crate::validation_results::ValidationError;

        let dsc = Certificate::from_der(DSC).unwrap();

        let revoked = ValidationResult::failure(ValidationError::CertificateRevoked("x".into()));
        assert_eq!(
            dsc.clone().with_validation_outcome(&revoked).status(),
            CertificateStatus::Revoked
        );
        assert_eq!(
            dsc.with_validation_outcome(&ValidationResult::success()).status(),
            CertificateStatus::Valid
        );
    }
}
