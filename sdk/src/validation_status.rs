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

//! Dotted status codes attached to [`LogItem`]s.
//!
//! Each code names one check and its outcome. Codes are stable strings so
//! audit trails written by one release can be read by the next.
//!
//! [`LogItem`]: crate::status_tracker::LogItem

#![deny(missing_docs)]

use crate::status_tracker::LogKind;

// -- success codes --

/// The certificate was inside its validity window at the time of checking.
pub const CERTIFICATE_INSIDE_VALIDITY: &str = "certificate.insideValidity";

/// A self-issued certificate verified against its own public key.
pub const CERTIFICATE_SELF_SIGNATURE_VALIDATED: &str = "certificate.selfSignature.validated";

/// Basic constraints and key usage match the role the certificate plays.
pub const CERTIFICATE_CONSTRAINTS_VALIDATED: &str = "certificate.constraints.validated";

/// The subject carries a two-letter country code.
pub const CERTIFICATE_COUNTRY_PRESENT: &str = "certificate.country.present";

/// The child's issuer DN equals the parent's subject DN.
pub const CHAIN_ISSUER_MATCH: &str = "chain.issuer.match";

/// The child's signature verified with the parent's public key.
pub const CHAIN_SIGNATURE_VALIDATED: &str = "chain.signature.validated";

/// Every element of the trust path validated.
pub const CHAIN_VALIDATED: &str = "chain.validated";

/// The serial number is absent from an authoritative CRL.
pub const REVOCATION_NOT_REVOKED: &str = "revocation.notRevoked";

/// The CRL signature verified against its issuing CA.
pub const CRL_SIGNATURE_VALIDATED: &str = "crl.signature.validated";

/// The SOD signature verified with the embedded signer certificate.
pub const SOD_SIGNATURE_VALIDATED: &str = "sod.signature.validated";

/// A data group's digest equals the value recorded in the SOD.
pub const DATA_GROUP_HASH_MATCH: &str = "dataGroup.hash.match";

/// A CSCA was found that anchors the document signer.
pub const CSCA_FOUND: &str = "csca.found";

// -- informational codes --

/// Revocation was not checked for this element.
pub const REVOCATION_SKIPPED: &str = "revocation.skipped";

/// No CRL could be obtained; the element was accepted under fail-open.
pub const REVOCATION_CRL_UNAVAILABLE: &str = "revocation.crl.unavailable";

/// The CRL fetch exceeded its deadline; the element was accepted under
/// fail-open.
pub const REVOCATION_CRL_FETCH_TIMEOUT: &str = "revocation.crl.fetchTimeout";

/// The key usage extension is absent or lacks `cRLSign` on a CA.
pub const CERTIFICATE_CRL_SIGN_MISSING: &str = "certificate.keyUsage.cRLSignMissing";

// -- failure codes --

/// The certificate could not be parsed.
pub const CERTIFICATE_MALFORMED: &str = "certificate.malformed";

/// The certificate's `notAfter` is in the past.
pub const CERTIFICATE_EXPIRED: &str = "certificate.expired";

/// The certificate's `notBefore` is in the future.
pub const CERTIFICATE_NOT_YET_VALID: &str = "certificate.notYetValid";

/// A self-issued certificate did not verify against its own public key.
pub const CERTIFICATE_SELF_SIGNATURE_MISMATCH: &str = "certificate.selfSignature.mismatch";

/// A CA certificate does not assert `cA` in basic constraints.
pub const CERTIFICATE_BASIC_CONSTRAINTS_INVALID: &str = "certificate.basicConstraints.invalid";

/// A required key usage bit is absent.
pub const CERTIFICATE_KEY_USAGE_INVALID: &str = "certificate.keyUsage.invalid";

/// The subject has no two-letter country code.
pub const CERTIFICATE_COUNTRY_MISSING: &str = "certificate.country.missing";

/// The child's issuer DN does not equal the parent's subject DN.
pub const CHAIN_ISSUER_MISMATCH: &str = "chain.issuer.mismatch";

/// The child's signature did not verify with the parent's public key.
pub const CHAIN_SIGNATURE_MISMATCH: &str = "chain.signature.mismatch";

/// The serial number is listed on an authoritative CRL.
pub const REVOCATION_REVOKED: &str = "revocation.revoked";

/// The CRL signature did not verify against the issuing CA.
pub const CRL_SIGNATURE_MISMATCH: &str = "crl.signature.mismatch";

/// The SOD could not be unwrapped or parsed as CMS signed data.
pub const SOD_MALFORMED: &str = "sod.malformed";

/// The SOD does not embed a signer certificate.
pub const SOD_SIGNER_MISSING: &str = "sod.signer.missing";

/// The SOD signature did not verify.
pub const SOD_SIGNATURE_MISMATCH: &str = "sod.signature.mismatch";

/// The `messageDigest` signed attribute does not match the content.
pub const SOD_MESSAGE_DIGEST_MISMATCH: &str = "sod.messageDigest.mismatch";

/// The LDS security object (data-group hash table) is missing or malformed.
pub const SOD_HASH_TABLE_MALFORMED: &str = "sod.hashTable.malformed";

/// A data group's digest differs from the value recorded in the SOD.
pub const DATA_GROUP_HASH_MISMATCH: &str = "dataGroup.hash.mismatch";

/// A submitted data group has no entry in the SOD hash table.
pub const DATA_GROUP_NOT_IN_SOD: &str = "dataGroup.notInSod";

/// No CSCA for the signer's issuer could be located.
pub const CSCA_NOT_FOUND: &str = "csca.notFound";

/// The signature or digest algorithm is not supported.
pub const ALGORITHM_UNSUPPORTED: &str = "algorithm.unsupported";

/// An unexpected error occurred while validating.
pub const GENERAL_ERROR: &str = "general.error";

/// Returns `true` if the status code is a success code.
///
/// ```
/// use icao_pkd::validation_status::*;
///
/// assert!(is_success(CHAIN_VALIDATED));
/// assert!(!is_success(REVOCATION_REVOKED));
/// ```
pub fn is_success(status_code: &str) -> bool {
    matches!(log_kind(status_code), LogKind::Success)
}

/// Returns the [`LogKind`] for a given status code.
pub fn log_kind(status_code: &str) -> LogKind {
    match status_code {
        CERTIFICATE_INSIDE_VALIDITY
        | CERTIFICATE_SELF_SIGNATURE_VALIDATED
        | CERTIFICATE_CONSTRAINTS_VALIDATED
        | CERTIFICATE_COUNTRY_PRESENT
        | CHAIN_ISSUER_MATCH
        | CHAIN_SIGNATURE_VALIDATED
        | CHAIN_VALIDATED
        | REVOCATION_NOT_REVOKED
        | CRL_SIGNATURE_VALIDATED
        | SOD_SIGNATURE_VALIDATED
        | DATA_GROUP_HASH_MATCH
        | CSCA_FOUND => LogKind::Success,
        REVOCATION_SKIPPED
        | REVOCATION_CRL_UNAVAILABLE
        | REVOCATION_CRL_FETCH_TIMEOUT
        | CERTIFICATE_CRL_SIGN_MISSING => LogKind::Informational,
        _ => LogKind::Failure,
    }
}
