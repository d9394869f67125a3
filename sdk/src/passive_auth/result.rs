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

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    crypto::hash::DigestAlgorithm,
    status_tracker::LogItem,
    validation_results::{Findings, ValidationError},
    Error, Result,
};

/// What a passport presents for Passive Authentication.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassportData {
    /// EF.SOD, with or without the `0x77` wrapper.
    pub sod: Vec<u8>,

    /// Data group bytes keyed by data group number.
    pub data_groups: BTreeMap<u8, Vec<u8>>,

    /// Issuing state, used to find the CSCA when the signer's issuer name
    /// carries no country.
    pub issuing_country: Option<String>,

    pub document_number: Option<String>,
}

impl PassportData {
    pub fn new(sod: Vec<u8>) -> Self {
        Self {
            sod,
            ..Default::default()
        }
    }

    /// Adds data group `number` (1 to 16).
    pub fn with_data_group(mut self, number: u8, bytes: Vec<u8>) -> Result<Self> {
        if !(1..=16).contains(&number) {
            return Err(Error::InvalidDataGroup(number));
        }
        self.data_groups.insert(number, bytes);
        Ok(self)
    }

    #[must_use]
    pub fn with_issuing_country<S: Into<String>>(mut self, country: S) -> Self {
        self.issuing_country = Some(country.into());
        self
    }

    #[must_use]
    pub fn with_document_number<S: Into<String>>(mut self, number: S) -> Self {
        self.document_number = Some(number.into());
        self
    }
}

/// Aggregate Passive Authentication verdict.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaStatus {
    Valid,
    #[default]
    Invalid,
}

/// Outcome for one submitted data group.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataGroupResult {
    pub data_group_number: u8,
    pub valid: bool,

    /// Hex hash from the SOD, absent when the SOD does not list the group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<String>,

    /// Hex hash of the submitted bytes.
    pub computed_hash: String,
}

/// The result of verifying one passport.
///
/// The SOD signature, the trust chain and each data group are scored
/// independently; `status` is `VALID` only when all of them pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaResult {
    pub status: PaStatus,

    /// Subject DN of the document signer embedded in the SOD.
    pub signer_subject: Option<String>,

    pub signer_serial_number: Option<String>,

    /// Subject DN of the CSCA the signer chained to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csca_subject: Option<String>,

    pub chain_valid: bool,
    pub sod_signature_valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_algorithm: Option<DigestAlgorithm>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lds_version: Option<String>,

    pub data_group_results: Vec<DataGroupResult>,
    pub data_group_valid_count: usize,
    pub data_group_invalid_count: usize,

    /// Every fatal finding, in the order found.
    pub errors: Vec<ValidationError>,

    /// Soft findings, such as an unavailable CRL under fail-open.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationError>,

    pub log: Vec<LogItem>,
}

impl PaResult {
    /// `true` when `status` is `VALID`.
    pub fn is_valid(&self) -> bool {
        self.status == PaStatus::Valid
    }

    /// Returns `true` if any error has the given reason code.
    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code() == code)
    }

    pub(crate) fn finish(mut self, findings: Findings) -> Self {
        self.data_group_valid_count = self.data_group_results.iter().filter(|r| r.valid).count();
        self.data_group_invalid_count = self.data_group_results.len() - self.data_group_valid_count;

        let result = findings.into_result();
        self.errors = result.failure_reasons().to_vec();
        self.warnings = result.warnings().to_vec();
        self.log = result.log().to_vec();

        self.status = if self.sod_signature_valid
            && self.chain_valid
            && self.data_group_invalid_count == 0
            && self.errors.is_empty()
        {
            PaStatus::Valid
        } else {
            PaStatus::Invalid
        };
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn data_group_numbers_are_bounded() {
        let pd = PassportData::new(vec![])
            .with_data_group(1, vec![1])
            .unwrap()
            .with_data_group(16, vec![16])
            .unwrap();
        assert_eq!(pd.data_groups.len(), 2);

        assert!(matches!(
            PassportData::new(vec![]).with_data_group(0, vec![]),
            Err(Error::InvalidDataGroup(0))
        ));
        assert!(matches!(
            PassportData::new(vec![]).with_data_group(17, vec![]),
            Err(Error::InvalidDataGroup(17))
        ));
    }

    #[test]
    fn status_requires_every_part() {
        let mut r = PaResult {
            sod_signature_valid: true,
            chain_valid: true,
            data_group_results: vec![DataGroupResult {
                data_group_number: 1,
                valid: true,
                expected_hash: Some("00".into()),
                computed_hash: "00".into(),
            }],
            ..Default::default()
        };
        assert!(r.clone().finish(Findings::default()).is_valid());

        r.data_group_results.push(DataGroupResult {
            data_group_number: 2,
            valid: false,
            expected_hash: Some("00".into()),
            computed_hash: "01".into(),
        });
        let r = r.finish(Findings::default());
        assert_eq!(r.status, PaStatus::Invalid);
        assert_eq!(r.data_group_valid_count, 1);
        assert_eq!(r.data_group_invalid_count, 1);
    }

    #[test]
    fn serializes_output_contract() {
        let r = PaResult::default().finish(Findings::default());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "INVALID");
        assert_eq!(json["chainValid"], false);
        assert_eq!(json["sodSignatureValid"], false);
        assert_eq!(json["dataGroupValidCount"], 0);
        assert_eq!(json["dataGroupInvalidCount"], 0);
        assert!(json["errors"].as_array().unwrap().is_empty());
        assert!(json.get("signerSubject").is_some());
    }
}
