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

use std::fmt;

use asn1_rs::{Any, Class, FromDer, Tag};
use serde::Serialize;
use x509_parser::{oid_registry::Oid, x509::AlgorithmIdentifier};

use crate::crypto::{hash::DigestAlgorithm, raw_signature::oids::*};

/// Signature algorithms found on CSCA, document signer and CRL signatures
/// and in SOD signer infos.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum SignatureAlgorithm {
    /// RSASSA-PKCS1-v1_5 with the given digest.
    RsaPkcs1(DigestAlgorithm),

    /// RSASSA-PSS with the given digest (MGF1 uses the same digest).
    RsaPss(DigestAlgorithm),

    /// ECDSA with the given digest.
    Ecdsa(DigestAlgorithm),
}

impl SignatureAlgorithm {
    /// The digest algorithm the signature is computed over.
    pub fn digest(&self) -> DigestAlgorithm {
        match self {
            Self::RsaPkcs1(d) | Self::RsaPss(d) | Self::Ecdsa(d) => *d,
        }
    }

    /// Identify the algorithm of a certificate or CRL signature.
    pub fn from_algorithm_identifier(alg: &AlgorithmIdentifier) -> Option<Self> {
        Self::from_identifier_with_digest(alg, None)
    }

    /// Identify the algorithm of a CMS signer info.
    ///
    /// CMS allows the signature algorithm to name only the key type
    /// (`rsaEncryption`, `id-ecPublicKey`), in which case the signer's
    /// digest algorithm completes it.
    pub fn from_identifier_with_digest(
        alg: &AlgorithmIdentifier,
        digest: Option<DigestAlgorithm>,
    ) -> Option<Self> {
        let oid = &alg.algorithm;

        if *oid == SHA1_WITH_RSAENCRYPTION_OID {
            Some(Self::RsaPkcs1(DigestAlgorithm::Sha1))
        } else if *oid == SHA224_WITH_RSAENCRYPTION_OID {
            Some(Self::RsaPkcs1(DigestAlgorithm::Sha224))
        } else if *oid == SHA256_WITH_RSAENCRYPTION_OID {
            Some(Self::RsaPkcs1(DigestAlgorithm::Sha256))
        } else if *oid == SHA384_WITH_RSAENCRYPTION_OID {
            Some(Self::RsaPkcs1(DigestAlgorithm::Sha384))
        } else if *oid == SHA512_WITH_RSAENCRYPTION_OID {
            Some(Self::RsaPkcs1(DigestAlgorithm::Sha512))
        } else if *oid == ECDSA_WITH_SHA1_OID {
            Some(Self::Ecdsa(DigestAlgorithm::Sha1))
        } else if *oid == ECDSA_WITH_SHA224_OID {
            Some(Self::Ecdsa(DigestAlgorithm::Sha224))
        } else if *oid == ECDSA_WITH_SHA256_OID {
            Some(Self::Ecdsa(DigestAlgorithm::Sha256))
        } else if *oid == ECDSA_WITH_SHA384_OID {
            Some(Self::Ecdsa(DigestAlgorithm::Sha384))
        } else if *oid == ECDSA_WITH_SHA512_OID {
            Some(Self::Ecdsa(DigestAlgorithm::Sha512))
        } else if *oid == RSA_PSS_OID {
            rsa_pss_digest(alg).map(Self::RsaPss)
        } else if *oid == RSA_OID {
            digest.map(Self::RsaPkcs1)
        } else if *oid == EC_PUBLICKEY_OID {
            digest.map(Self::Ecdsa)
        } else {
            None
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RsaPkcs1(d) => write!(f, "RSA-PKCS1 with {d}"),
            Self::RsaPss(d) => write!(f, "RSA-PSS with {d}"),
            Self::Ecdsa(d) => write!(f, "ECDSA with {d}"),
        }
    }
}

// RSASSA-PSS-params (RFC 4055). Every field has a DEFAULT: an absent hash
// is SHA-1 and an absent mask generation function is MGF1 with SHA-1. The
// hash and the MGF1 hash must agree.
fn rsa_pss_digest(alg: &AlgorithmIdentifier) -> Option<DigestAlgorithm> {
    let Some(parameters) = &alg.parameters else {
        return Some(DigestAlgorithm::Sha1);
    };
    let seq = parameters.as_sequence().ok()?;

    let mut hash = DigestAlgorithm::Sha1;
    let mut mgf_hash = DigestAlgorithm::Sha1;

    let mut rest: &[u8] = &seq.content;
    while !rest.is_empty() {
        let (i, field) = <Any as asn1_rs::FromDer>::from_der(rest).ok()?;
        rest = i;

        if field.class() != Class::ContextSpecific {
            return None;
        }
        match field.tag() {
            Tag(0) => {
                let (_, hash_alg) = AlgorithmIdentifier::from_der(field.data).ok()?;
                hash = DigestAlgorithm::from_oid(&hash_alg.algorithm)?;
            }
            Tag(1) => mgf_hash = mgf1_digest(field.data)?,
            // Salt length and trailer field do not select a verifier.
            _ => {}
        }
    }

    (hash == mgf_hash).then_some(hash)
}

fn mgf1_digest(der: &[u8]) -> Option<DigestAlgorithm> {
    let (_, mgf_alg) = AlgorithmIdentifier::from_der(der).ok()?;
    if mgf_alg.algorithm != MGF1_OID {
        return None;
    }

    let mgf_params = mgf_alg.parameters?;
    let mgf_params = mgf_params.as_sequence().ok()?;
    let (_, mgf_hash) = <Any as asn1_rs::FromDer>::from_der(&mgf_params.content).ok()?;
    let mgf_hash: Oid = mgf_hash.as_oid().ok()?;

    DigestAlgorithm::from_oid(&mgf_hash)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use x509_parser::certificate::X509Certificate;

    use super::*;

    #[test]
    fn certificate_signature_algorithms() {
        let (_, csca) =
            X509Certificate::from_der(include_bytes!("../../../tests/fixtures/pki/csca.der"))
                .unwrap();
        assert_eq!(
            SignatureAlgorithm::from_algorithm_identifier(&csca.signature_algorithm),
            Some(SignatureAlgorithm::RsaPkcs1(DigestAlgorithm::Sha256))
        );

        let (_, leaf) = X509Certificate::from_der(include_bytes!(
            "../../../tests/fixtures/pki/chain_leaf.der"
        ))
        .unwrap();
        assert_eq!(
            SignatureAlgorithm::from_algorithm_identifier(&leaf.signature_algorithm),
            Some(SignatureAlgorithm::Ecdsa(DigestAlgorithm::Sha256))
        );
    }

    #[test]
    fn key_only_identifier_needs_digest() {
        let (_, csca) =
            X509Certificate::from_der(include_bytes!("../../../tests/fixtures/pki/csca.der"))
                .unwrap();
        let key_alg = &csca.public_key().algorithm;

        assert_eq!(SignatureAlgorithm::from_algorithm_identifier(key_alg), None);
        assert_eq!(
            SignatureAlgorithm::from_identifier_with_digest(key_alg, Some(DigestAlgorithm::Sha1)),
            Some(SignatureAlgorithm::RsaPkcs1(DigestAlgorithm::Sha1))
        );
    }

    #[test]
    fn pss_certificate_signature() {
        let (_, csca) =
            X509Certificate::from_der(include_bytes!("../../../tests/fixtures/pki/csca_pss.der"))
                .unwrap();
        assert_eq!(
            SignatureAlgorithm::from_algorithm_identifier(&csca.signature_algorithm),
            Some(SignatureAlgorithm::RsaPss(DigestAlgorithm::Sha256))
        );
    }

    #[test]
    fn pss_parameters_fall_back_to_defaults() {
        // rsassaPss with an empty RSASSA-PSS-params SEQUENCE.
        let empty = [
            0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0a, 0x30,
            0x00,
        ];
        let (_, alg) = AlgorithmIdentifier::from_der(&empty).unwrap();
        assert_eq!(
            SignatureAlgorithm::from_algorithm_identifier(&alg),
            Some(SignatureAlgorithm::RsaPss(DigestAlgorithm::Sha1))
        );

        // SHA-256 hash with the MGF left at its MGF1-SHA-1 default.
        let mismatched = [
            0x30, 0x1e, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0a, 0x30,
            0x11, 0xa0, 0x0f, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04,
            0x02, 0x01, 0x05, 0x00,
        ];
        let (_, alg) = AlgorithmIdentifier::from_der(&mismatched).unwrap();
        assert_eq!(SignatureAlgorithm::from_algorithm_identifier(&alg), None);
    }
}
