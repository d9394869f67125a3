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

//! The Document Security Object (SOD) of an eMRTD.
//!
//! A SOD is a CMS `SignedData` whose encapsulated content is an
//! [`LdsSecurityObject`], optionally wrapped in the ICAO application tag
//! `0x77`.

use std::{collections::BTreeMap, str::FromStr};

use asn1_rs::FromDer;
use rasn::{prelude::*, types};
use rasn_cms::{CertificateChoices, SignedData, SignerIdentifier, SignerInfo};
use thiserror::Error;

use crate::{
    certificate::Certificate,
    crypto::{
        asn1::icao9303::{ContentInfo, LdsSecurityObject, ID_LDS_SECURITY_OBJECT, ID_SIGNED_DATA},
        hash::DigestAlgorithm,
        raw_signature::{verify_signature, RawSignatureValidationError, SignatureAlgorithm},
    },
    validation_results::ValidationError,
    validation_status, Error, Result,
};

/// ICAO 9303 application tag wrapping the SOD on the chip (EF.SOD).
const ICAO_SOD_TAG: u8 = 0x77;

/// Strip the `0x77` tag and length header if present.
///
/// Unwrapped input is returned as is. A wrapped input whose length header is
/// malformed or runs past the end of the buffer is an error.
pub fn unwrap_icao_tag(data: &[u8]) -> Result<&[u8]> {
    let Some((&tag, rest)) = data.split_first() else {
        return Err(Error::SodParse("empty input".to_string()));
    };
    if tag != ICAO_SOD_TAG {
        return Ok(data);
    }

    let Some((&first, rest)) = rest.split_first() else {
        return Err(Error::SodParse("missing length after 0x77 tag".to_string()));
    };

    let (len, body) = if first < 0x80 {
        (first as usize, rest)
    } else {
        let octets = (first & 0x7f) as usize;
        if octets == 0 || octets > 4 || rest.len() < octets {
            return Err(Error::SodParse(format!(
                "unsupported length header 0x{first:02x}"
            )));
        }
        let len = rest[..octets]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize);
        (len, &rest[octets..])
    };

    body.get(..len).ok_or_else(|| {
        Error::SodParse(format!(
            "0x77 length {len} exceeds the {} bytes available",
            body.len()
        ))
    })
}

/// Describes why a SOD signature did not verify.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SodSignatureError {
    /// The `SignedData` carries no signer info.
    #[error("SOD has no signer info")]
    NoSignerInfo,

    /// Signed attributes are present but carry no usable `messageDigest`.
    #[error("signed attributes carry no single messageDigest value")]
    MissingMessageDigest,

    /// The `messageDigest` attribute does not match the encapsulated content.
    #[error("messageDigest does not match the encapsulated content")]
    MessageDigestMismatch,

    /// The `SignedData` has no encapsulated content to verify.
    #[error("SOD has no encapsulated content")]
    MissingContent,

    /// The digest or signature algorithm is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A signer info field could not be re-encoded or parsed.
    #[error("malformed signer info: {0}")]
    Malformed(String),

    /// The raw signature check failed.
    #[error(transparent)]
    Signature(#[from] RawSignatureValidationError),
}

impl SodSignatureError {
    /// Dotted status code for the audit log.
    pub fn validation_status(&self) -> &'static str {
        match self {
            Self::MessageDigestMismatch | Self::MissingMessageDigest => {
                validation_status::SOD_MESSAGE_DIGEST_MISMATCH
            }
            Self::NoSignerInfo => validation_status::SOD_SIGNER_MISSING,
            Self::UnsupportedAlgorithm(_)
            | Self::Signature(RawSignatureValidationError::UnsupportedAlgorithm) => {
                validation_status::ALGORITHM_UNSUPPORTED
            }
            Self::MissingContent | Self::Malformed(_) => validation_status::SOD_MALFORMED,
            Self::Signature(_) => validation_status::SOD_SIGNATURE_MISMATCH,
        }
    }

    /// Algorithms that cannot be checked are `UNKNOWN_ERROR`; every other
    /// failure is `SIGNATURE_INVALID`.
    pub fn to_validation_error(&self) -> ValidationError {
        match self {
            Self::UnsupportedAlgorithm(_)
            | Self::Signature(
                RawSignatureValidationError::UnsupportedAlgorithm
                | RawSignatureValidationError::CryptoLibraryError(_),
            ) => ValidationError::UnknownError(format!("SOD signature: {self}")),
            _ => ValidationError::SignatureInvalid(format!("SOD signature: {self}")),
        }
    }
}

/// A decoded Document Security Object.
#[derive(Clone, Debug)]
pub struct Sod {
    signed_data: SignedData,
}

impl Sod {
    /// Decode a SOD, with or without the `0x77` wrapper.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let cms = unwrap_icao_tag(data)?;

        let content_info: ContentInfo = rasn::ber::decode(cms)
            .map_err(|e| Error::SodParse(format!("not a CMS ContentInfo: {e}")))?;

        if content_info.content_type != ID_SIGNED_DATA {
            return Err(Error::SodParse(format!(
                "content type {} is not signedData",
                content_info.content_type
            )));
        }

        let signed_data: SignedData = rasn::ber::decode(content_info.content.as_bytes())
            .map_err(|e| Error::SodParse(format!("malformed SignedData: {e}")))?;

        Ok(Self { signed_data })
    }

    /// All certificates embedded in the `SignedData`.
    pub fn certificates(&self) -> Result<Vec<Certificate>> {
        let Some(certs) = &self.signed_data.certificates else {
            return Ok(Vec::new());
        };

        certs
            .to_vec()
            .into_iter()
            .filter_map(|cc| match cc {
                CertificateChoices::Certificate(c) => Some(c),
                _ => None,
            })
            .map(|c| {
                let der = rasn::der::encode(c)
                    .map_err(|e| Error::SodParse(format!("embedded certificate: {e}")))?;
                Certificate::from_der(&der)
            })
            .collect()
    }

    /// The document signer certificate embedded in the SOD.
    ///
    /// The certificate named by the first signer info's `sid` is preferred;
    /// a SOD with a single embedded certificate falls back to that one.
    pub fn signer_certificate(&self) -> Result<Option<Certificate>> {
        let Some(certs) = &self.signed_data.certificates else {
            return Ok(None);
        };
        let certs = certs.to_vec();

        let signer = self.signer_info().and_then(|si| {
            certs.iter().find_map(|cc| {
                let CertificateChoices::Certificate(c) = cc else {
                    return None;
                };
                match &si.sid {
                    SignerIdentifier::IssuerAndSerialNumber(sn) => (sn.issuer
                        == c.tbs_certificate.issuer
                        && sn.serial_number == c.tbs_certificate.serial_number)
                        .then_some(c),
                    SignerIdentifier::SubjectKeyIdentifier(ski) => {
                        let der = rasn::der::encode(c).ok()?;
                        let cert = Certificate::from_der(&der).ok()?;
                        let ski = const_hex::encode_upper(ski);
                        (cert.subject_key_identifier() == Some(ski.as_str())).then_some(c)
                    }
                }
            })
        });

        let chosen = match signer {
            Some(c) => Some(c),
            None if certs.len() == 1 => certs.iter().find_map(|cc| match cc {
                CertificateChoices::Certificate(c) => Some(c),
                _ => None,
            }),
            None => None,
        };

        let Some(cert) = chosen else {
            return Ok(None);
        };

        let der = rasn::der::encode(cert)
            .map_err(|e| Error::SodParse(format!("embedded certificate: {e}")))?;
        Certificate::from_der(&der).map(Some)
    }

    fn signer_info(&self) -> Option<&SignerInfo> {
        self.signed_data.signer_infos.to_vec().first().copied()
    }

    /// The encapsulated content (the DER `LDSSecurityObject`).
    pub fn encapsulated_content(&self) -> Option<&[u8]> {
        self.signed_data
            .encap_content_info
            .content
            .as_ref()
            .map(|c| &c[..])
    }

    /// Verify the SOD signature with `signer`'s public key.
    ///
    /// When signed attributes are present the signature covers their DER
    /// encoding and their `messageDigest` must equal the digest of the
    /// encapsulated content. Otherwise it covers the content itself.
    pub fn verify_signature(
        &self,
        signer: &Certificate,
    ) -> std::result::Result<(), SodSignatureError> {
        let si = self.signer_info().ok_or(SodSignatureError::NoSignerInfo)?;
        let content = self
            .encapsulated_content()
            .ok_or(SodSignatureError::MissingContent)?;

        let digest_oid = si.digest_algorithm.algorithm.to_string();
        let digest = asn1_rs::Oid::from_str(&digest_oid)
            .ok()
            .and_then(|oid| DigestAlgorithm::from_oid(&oid))
            .ok_or_else(|| SodSignatureError::UnsupportedAlgorithm(digest_oid.clone()))?;

        let tbs = match &si.signed_attrs {
            Some(attrs) => {
                let md = attrs
                    .to_vec()
                    .into_iter()
                    .find(|a| a.r#type == Oid::ISO_MEMBER_BODY_US_RSADSI_PKCS9_MESSAGE_DIGEST)
                    .filter(|a| a.values.len() == 1)
                    .and_then(|a| {
                        a.values.to_vec().first().and_then(|v| {
                            rasn::der::decode::<types::OctetString>(v.as_bytes()).ok()
                        })
                    })
                    .ok_or(SodSignatureError::MissingMessageDigest)?;

                if md.as_ref() != digest.digest(content).as_slice() {
                    return Err(SodSignatureError::MessageDigestMismatch);
                }

                rasn::der::encode(attrs).map_err(|e| SodSignatureError::Malformed(e.to_string()))?
            }
            None => content.to_vec(),
        };

        let alg_der = rasn::der::encode(&si.signature_algorithm)
            .map_err(|e| SodSignatureError::Malformed(e.to_string()))?;
        let (_, alg_id) = x509_parser::x509::AlgorithmIdentifier::from_der(&alg_der)
            .map_err(|e| SodSignatureError::Malformed(e.to_string()))?;
        let alg = SignatureAlgorithm::from_identifier_with_digest(&alg_id, Some(digest))
            .ok_or_else(|| {
                SodSignatureError::UnsupportedAlgorithm(alg_id.algorithm.to_id_string())
            })?;

        verify_signature(alg, si.signature.as_ref(), &tbs, &signer.public_key().spki_der)?;
        Ok(())
    }

    /// Decode the encapsulated `LDSSecurityObject`.
    pub fn lds_security_object(&self) -> Result<LdsSecurityObject> {
        let eci = &self.signed_data.encap_content_info;
        if eci.content_type != ID_LDS_SECURITY_OBJECT {
            return Err(Error::SodParse(format!(
                "encapsulated content type {} is not ldsSecurityObject",
                eci.content_type
            )));
        }

        let content = self
            .encapsulated_content()
            .ok_or_else(|| Error::SodParse("no encapsulated content".to_string()))?;

        rasn::der::decode(content)
            .map_err(|e| Error::SodParse(format!("malformed LDSSecurityObject: {e}")))
    }

    /// Hash algorithm and data-group hash table of the security object.
    pub fn data_group_hashes(&self) -> Result<(DigestAlgorithm, BTreeMap<u8, Vec<u8>>)> {
        let lds = self.lds_security_object()?;

        let oid = lds.hash_algorithm.algorithm.to_string();
        let alg = asn1_rs::Oid::from_str(&oid)
            .ok()
            .and_then(|o| DigestAlgorithm::from_oid(&o))
            .ok_or(Error::UnsupportedAlgorithm(oid))?;

        let mut table = BTreeMap::new();
        for entry in lds.data_group_hash_values {
            if !(1..=16).contains(&entry.data_group_number) {
                return Err(Error::InvalidDataGroup(entry.data_group_number));
            }
            if entry.data_group_hash_value.len() != alg.output_len() {
                return Err(Error::SodParse(format!(
                    "DG{} hash is {} bytes, {alg} needs {}",
                    entry.data_group_number,
                    entry.data_group_hash_value.len(),
                    alg.output_len()
                )));
            }
            table.insert(entry.data_group_number, entry.data_group_hash_value.to_vec());
        }

        Ok((alg, table))
    }

    /// LDS version ("0107", "0108", ...) when the security object carries one.
    pub fn lds_version(&self) -> Option<String> {
        self.lds_security_object()
            .ok()
            .and_then(|lds| lds.lds_version_info)
            .map(|v| String::from_utf8_lossy(v.lds_version.as_bytes()).into_owned())
    }
}
