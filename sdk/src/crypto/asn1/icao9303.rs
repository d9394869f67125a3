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

//! Document Security Object structures from ICAO Doc 9303 part 10.

use rasn::{
    prelude::*,
    types::{OctetString, PrintableString, SequenceOf},
};

/// `id-icao-mrtd-security-ldsSecurityObject`
pub const ID_LDS_SECURITY_OBJECT: &Oid = Oid::const_new(&[2, 23, 136, 1, 1, 1]);

/// `id-signedData` from RFC 5652.
pub const ID_SIGNED_DATA: &Oid = Oid::const_new(&[1, 2, 840, 113549, 1, 7, 2]);

/// The outer CMS `ContentInfo` wrapping a SOD's `SignedData`.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ContentInfo {
    pub(crate) content_type: ObjectIdentifier,

    #[rasn(tag(explicit(0)))]
    pub(crate) content: Any,
}

/// ```asn1
/// LDSSecurityObject ::= SEQUENCE {
///     version LDSSecurityObjectVersion,
///     hashAlgorithm DigestAlgorithmIdentifier,
///     dataGroupHashValues SEQUENCE SIZE (2..ub-DataGroups) OF DataGroupHash,
///     ldsVersionInfo LDSVersionInfo OPTIONAL }
/// ```
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq)]
pub struct LdsSecurityObject {
    /// `0` for LDS 1.7, `1` when `ldsVersionInfo` is present.
    pub version: u32,

    /// Algorithm used for every data group hash.
    pub hash_algorithm: rasn_pkix::AlgorithmIdentifier,

    /// Hashes of the data groups present on the chip.
    pub data_group_hash_values: SequenceOf<DataGroupHash>,

    /// LDS and Unicode versions (LDS 1.8 and later).
    pub lds_version_info: Option<LdsVersionInfo>,
}

/// ```asn1
/// DataGroupHash ::= SEQUENCE {
///     dataGroupNumber DataGroupNumber,
///     dataGroupHashValue OCTET STRING }
/// ```
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq)]
pub struct DataGroupHash {
    pub data_group_number: u8,
    pub data_group_hash_value: OctetString,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq)]
pub struct LdsVersionInfo {
    pub lds_version: PrintableString,
    pub unicode_version: PrintableString,
}
