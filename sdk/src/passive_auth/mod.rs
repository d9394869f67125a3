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

//! ICAO 9303 Passive Authentication.
//!
//! Verification runs in a fixed order: unwrap and decode the SOD, extract
//! the document signer, verify the SOD signature, read the data-group hash
//! table, score each submitted data group, then anchor the signer to a
//! CSCA. A SOD that cannot be decoded or whose signature does not verify
//! stops verification. Data-group and chain outcomes are reported side by
//! side.

mod result;
mod sod;

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use log::info;

pub use result::{DataGroupResult, PaResult, PaStatus, PassportData};
pub use sod::{unwrap_icao_tag, Sod, SodSignatureError};

use crate::{
    crypto::hash::DigestAlgorithm,
    log_item,
    ports::CscaLookup,
    settings::PassiveAuthSettings,
    trust_chain::TrustChainValidator,
    utils::time::utc_now,
    validation_results::{Findings, ValidationError},
    validation_status::*,
};

/// Verifies passports against their SOD and the CSCAs known for the
/// issuing state.
#[derive(Clone)]
pub struct PassiveAuthenticationEngine {
    chain: TrustChainValidator,
    csca_lookup: Arc<dyn CscaLookup>,
    settings: PassiveAuthSettings,
}

impl std::fmt::Debug for PassiveAuthenticationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassiveAuthenticationEngine")
            .field("chain", &self.chain)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PassiveAuthenticationEngine {
    pub fn new(
        chain: TrustChainValidator,
        csca_lookup: Arc<dyn CscaLookup>,
        settings: &PassiveAuthSettings,
    ) -> Self {
        Self {
            chain,
            csca_lookup,
            settings: settings.clone(),
        }
    }

    /// Verifies `passport` as of now.
    pub async fn verify(&self, passport: &PassportData) -> PaResult {
        self.verify_at(passport, utc_now()).await
    }

    /// Verifies `passport` as of `at`.
    pub async fn verify_at(&self, passport: &PassportData, at: DateTime<Utc>) -> PaResult {
        let mut findings = Findings::default();
        let mut result = PaResult::default();

        let sod = match Sod::from_bytes(&passport.sod) {
            Ok(sod) => sod,
            Err(err) => {
                findings.fail(
                    log_item!("sod", "SOD could not be decoded", "verify_at")
                        .validation_status(SOD_MALFORMED),
                    ValidationError::UnknownError(err.to_string()),
                );
                return Self::finish(result, findings, passport);
            }
        };

        let signer = match sod.signer_certificate() {
            Ok(Some(signer)) => signer,
            Ok(None) => {
                findings.fail(
                    log_item!("sod", "SOD embeds no document signer certificate", "verify_at")
                        .validation_status(SOD_SIGNER_MISSING),
                    ValidationError::SignatureInvalid(
                        "no signer certificate embedded in the SOD".into(),
                    ),
                );
                return Self::finish(result, findings, passport);
            }
            Err(err) => {
                findings.fail(
                    log_item!("sod", "embedded signer certificate is unreadable", "verify_at")
                        .validation_status(CERTIFICATE_MALFORMED),
                    ValidationError::SignatureInvalid(format!(
                        "embedded signer certificate: {err}"
                    )),
                );
                return Self::finish(result, findings, passport);
            }
        };
        result.signer_subject = Some(signer.subject_dn().to_owned());
        result.signer_serial_number = Some(signer.serial_number().to_owned());

        match sod.verify_signature(&signer) {
            Ok(()) => {
                result.sod_signature_valid = true;
                findings.pass(
                    log_item!("sod", "SOD signature verified", "verify_at")
                        .validation_status(SOD_SIGNATURE_VALIDATED),
                );
            }
            Err(err) => {
                findings.fail(
                    log_item!("sod", "SOD signature does not verify", "verify_at")
                        .validation_status(err.validation_status()),
                    err.to_validation_error(),
                );
                return Self::finish(result, findings, passport);
            }
        }

        match sod.data_group_hashes() {
            Ok((alg, table)) => {
                result.hash_algorithm = Some(alg);
                result.lds_version = sod.lds_version();
                result.data_group_results =
                    self.score_data_groups(alg, &table, &passport.data_groups, &mut findings);
            }
            Err(err) => findings.fail(
                log_item!("sod", "data group hash table is malformed", "verify_at")
                    .validation_status(SOD_HASH_TABLE_MALFORMED),
                ValidationError::UnknownError(err.to_string()),
            ),
        }

        let (csca, chain) = self
            .chain
            .anchor_at(
                self.csca_lookup.as_ref(),
                &signer,
                passport.issuing_country.as_deref(),
                at,
            )
            .await;
        result.chain_valid = chain.is_success();
        if let Some(csca) = &csca {
            findings.pass(
                log_item!("chain", format!("anchored to {}", csca.subject_dn()), "verify_at")
                    .validation_status(CSCA_FOUND),
            );
        }
        result.csca_subject = csca.map(|c| c.subject_dn().to_owned());
        findings.absorb("chain", &chain);

        Self::finish(result, findings, passport)
    }

    fn score_data_groups(
        &self,
        alg: DigestAlgorithm,
        table: &BTreeMap<u8, Vec<u8>>,
        submitted: &BTreeMap<u8, Vec<u8>>,
        findings: &mut Findings,
    ) -> Vec<DataGroupResult> {
        let mut scored = Vec::with_capacity(submitted.len());

        for (&number, bytes) in submitted {
            let label = format!("DG{number}");
            let computed = alg.digest(bytes);
            let computed_hash = const_hex::encode(&computed);

            if !(1..=16).contains(&number) {
                findings.fail(
                    log_item!(label, "data group number out of range", "score_data_groups")
                        .validation_status(GENERAL_ERROR),
                    ValidationError::UnknownError(
                        crate::Error::InvalidDataGroup(number).to_string(),
                    ),
                );
                scored.push(DataGroupResult {
                    data_group_number: number,
                    valid: false,
                    expected_hash: None,
                    computed_hash,
                });
                continue;
            }

            let Some(expected) = table.get(&number) else {
                if self.settings.require_all_data_groups_in_sod {
                    let reason = format!("{label} is not listed in the SOD");
                    let err = ValidationError::SignatureInvalid(reason);
                    findings.fail(
                        log_item!(label, "data group is not listed in the SOD", "score_data_groups")
                            .validation_status(DATA_GROUP_NOT_IN_SOD),
                        err,
                    );
                    scored.push(DataGroupResult {
                        data_group_number: number,
                        valid: false,
                        expected_hash: None,
                        computed_hash,
                    });
                } else {
                    findings.note(
                        log_item!(label, "data group is not listed in the SOD", "score_data_groups")
                            .validation_status(DATA_GROUP_NOT_IN_SOD),
                    );
                }
                continue;
            };

            let valid = *expected == computed;
            if valid {
                findings.pass(
                    log_item!(label, "data group hash matches", "score_data_groups")
                        .validation_status(DATA_GROUP_HASH_MATCH),
                );
            } else {
                let reason = format!("{label} hash does not match the SOD");
                let err = ValidationError::SignatureInvalid(reason);
                findings.fail(
                    log_item!(label, "data group hash does not match", "score_data_groups")
                        .validation_status(DATA_GROUP_HASH_MISMATCH),
                    err,
                );
            }

            scored.push(DataGroupResult {
                data_group_number: number,
                valid,
                expected_hash: Some(const_hex::encode(expected)),
                computed_hash,
            });
        }

        scored
    }

    fn finish(result: PaResult, findings: Findings, passport: &PassportData) -> PaResult {
        let result = result.finish(findings);
        info!(
            "passive authentication of {}: {:?} ({} DG valid, {} DG invalid)",
            passport.document_number.as_deref().unwrap_or("<unknown document>"),
            result.status,
            result.data_group_valid_count,
            result.data_group_invalid_count
        );
        result
    }
}
