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

//! Utilities for the ECDSA signatures found in CMS signer infos, CRLs and
//! certificates.

use asn1_rs::FromDer;
use x509_parser::{
    der_parser::{
        der::{parse_der_integer, parse_der_sequence_defined_g},
        error::BerResult,
    },
    x509::SubjectPublicKeyInfo,
};

use crate::crypto::raw_signature::{
    oids::{EC_PUBLICKEY_OID, PRIME256V1_OID, SECP384R1_OID, SECP521R1_OID},
    RawSignatureValidationError,
};

/// NIST curves supported by `EcdsaValidator`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum EcdsaCurve {
    /// NIST curve P-256
    P256,

    /// NIST curve P-384
    P384,

    /// NIST curve P-521
    P521,
}

impl EcdsaCurve {
    /// Size in bytes of one scalar (`r` or `s`) on this curve.
    pub(crate) fn scalar_len(&self) -> usize {
        match self {
            EcdsaCurve::P256 => 32,
            EcdsaCurve::P384 => 48,
            EcdsaCurve::P521 => 66,
        }
    }
}

struct EcSigComps<'a> {
    r: &'a [u8],
    s: &'a [u8],
}

fn parse_ec_der_sig(data: &[u8]) -> BerResult<EcSigComps> {
    parse_der_sequence_defined_g(|content: &[u8], _| {
        let (rem, r) = parse_der_integer(content)?;
        let (rem, s) = parse_der_integer(rem)?;
        Ok((
            rem,
            EcSigComps {
                r: r.as_slice()?,
                s: s.as_slice()?,
            },
        ))
    })(data)
}

/// Convert a DER `Ecdsa-Sig-Value` into the fixed-width `r || s` form the
/// RustCrypto verifiers expect.
pub(crate) fn der_to_p1363(
    data: &[u8],
    curve: EcdsaCurve,
) -> Result<Vec<u8>, RawSignatureValidationError> {
    let (_, comps) =
        parse_ec_der_sig(data).map_err(|_| RawSignatureValidationError::InvalidSignature)?;

    let width = curve.scalar_len();
    let mut out = Vec::with_capacity(width * 2);
    for scalar in [comps.r, comps.s] {
        // DER integers carry a leading zero when the high bit is set.
        let start = scalar.iter().position(|b| *b != 0).unwrap_or(scalar.len());
        let trimmed = &scalar[start..];
        if trimmed.len() > width {
            return Err(RawSignatureValidationError::InvalidSignature);
        }
        out.resize(out.len() + width - trimmed.len(), 0);
        out.extend_from_slice(trimmed);
    }

    Ok(out)
}

/// Returns the supported [`EcdsaCurve`] for a DER `SubjectPublicKeyInfo`.
pub(crate) fn ec_curve_from_public_key_der(public_key: &[u8]) -> Option<EcdsaCurve> {
    let (_, pk) = SubjectPublicKeyInfo::from_der(public_key).ok()?;

    let public_key_alg = &pk.algorithm;
    if public_key_alg.algorithm != EC_PUBLICKEY_OID {
        return None;
    }

    let named_curve_oid = public_key_alg.parameters.as_ref()?.as_oid().ok()?;
    if named_curve_oid == PRIME256V1_OID {
        Some(EcdsaCurve::P256)
    } else if named_curve_oid == SECP384R1_OID {
        Some(EcdsaCurve::P384)
    } else if named_curve_oid == SECP521R1_OID {
        Some(EcdsaCurve::P521)
    } else {
        None
    }
}
