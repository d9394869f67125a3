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

//! Parse, validate and publish a batch of PKD objects.
//!
//! The stages run strictly in that order. CRLs are ingested into the cache
//! before any certificate is validated, so the certificates of a batch are
//! checked against the CRLs that came with it. Blobs that fail to parse are
//! reported and skipped; a publisher failure stops the run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::{
    certificate::{Certificate, CertificateStatus},
    crl::Crl,
    engine::{CertificateValidation, ValidationEngine},
    utils::time::utc_now,
    Error, Result,
};

/// A raw object as produced by file ingestion.
#[derive(Clone, Debug, PartialEq)]
pub enum PkdBlob {
    /// DER or PEM certificate bytes (PEM may hold several certificates).
    Certificate(Vec<u8>),

    /// DER CRL bytes and the country the CRL is filed under.
    Crl { country_code: String, der: Vec<u8> },
}

/// A CRL accepted into the cache.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrlIngested {
    pub issuer_name: String,
    pub country_code: String,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub revoked_count: usize,
}

/// A blob that could not be parsed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    /// Position of the blob in the input.
    pub index: usize,
    pub reason: String,
}

/// One published outcome.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PipelineOutcome {
    Certificate(CertificateValidation),
    Crl(CrlIngested),
    Rejected(Rejection),
}

/// Receives each outcome of a pipeline run, in order.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, outcome: &PipelineOutcome) -> Result<()>;
}

/// Counts for one run.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub certificates_valid: usize,
    pub certificates_invalid: usize,
    pub crls_ingested: usize,
    pub rejected: usize,
}

enum Parsed {
    Certificates(Vec<Certificate>),
    Crl(String, Crl),
}

/// Runs batches through parse, validate and publish.
#[derive(Clone)]
pub struct Pipeline {
    engine: ValidationEngine,
    publisher: Arc<dyn Publisher>,
}

impl Pipeline {
    pub fn new(engine: ValidationEngine, publisher: Arc<dyn Publisher>) -> Self {
        Self { engine, publisher }
    }

    /// Runs `blobs` as of now.
    pub async fn run(&self, blobs: Vec<PkdBlob>) -> Result<PipelineReport> {
        self.run_at(blobs, utc_now()).await
    }

    /// Runs `blobs`, validating certificates as of `at`.
    pub async fn run_at(&self, blobs: Vec<PkdBlob>, at: DateTime<Utc>) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        let mut outcomes = Vec::with_capacity(blobs.len());

        // parse
        let mut certs = Vec::new();
        let mut crls = Vec::new();
        for (index, blob) in blobs.into_iter().enumerate() {
            match Self::parse(blob) {
                Ok(Parsed::Certificates(mut parsed)) => certs.append(&mut parsed),
                Ok(Parsed::Crl(country, crl)) => crls.push((country, crl)),
                Err(err) => {
                    warn!("blob {index} rejected: {err}");
                    report.rejected += 1;
                    outcomes.push(PipelineOutcome::Rejected(Rejection {
                        index,
                        reason: err.to_string(),
                    }));
                }
            }
        }
        debug!("parsed {} certificates and {} CRLs", certs.len(), crls.len());

        // validate
        let cache = self.engine.crl_cache();
        for (country_code, crl) in crls {
            let crl = cache.ingest(&country_code, crl).await;
            report.crls_ingested += 1;
            outcomes.push(PipelineOutcome::Crl(CrlIngested {
                issuer_name: crl.issuer_name().to_owned(),
                country_code,
                this_update: crl.this_update(),
                next_update: crl.next_update(),
                revoked_count: crl.revoked_count(),
            }));
        }

        for validation in self.engine.validate_batch_at(certs, at).await {
            if validation.status == CertificateStatus::Valid {
                report.certificates_valid += 1;
            } else {
                report.certificates_invalid += 1;
            }
            outcomes.push(PipelineOutcome::Certificate(validation));
        }

        // publish
        for outcome in &outcomes {
            self.publisher
                .publish(outcome)
                .await
                .map_err(|e| Error::Pipeline {
                    stage: "publish",
                    reason: e.to_string(),
                })?;
        }

        Ok(report)
    }

    fn parse(blob: PkdBlob) -> Result<Parsed> {
        match blob {
            PkdBlob::Certificate(bytes) => {
                Certificate::from_bytes(&bytes).map(Parsed::Certificates)
            }
            PkdBlob::Crl { country_code, der } => {
                if country_code.len() != 2 {
                    return Err(Error::BadParam(format!(
                        "CRL country code \"{country_code}\" is not two letters"
                    )));
                }
                Ok(Parsed::Crl(country_code, Crl::from_der(&der)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;
    use crate::{
        ports::memory::{MemoryCrlDirectory, MemoryCrlStore, MemoryCscaLookup},
        settings::Settings,
    };

    const CSCA: &[u8] = include_bytes!("../tests/fixtures/pki/csca.der");
    const DSC: &[u8] = include_bytes!("../tests/fixtures/pki/dsc.der");
    const DSC_REVOKED: &[u8] = include_bytes!("../tests/fixtures/pki/dsc_revoked.der");
    const REVOKING: &[u8] = include_bytes!("../tests/fixtures/pki/csca_revoking.crl");

    #[derive(Default)]
    struct Collector {
        seen: Mutex<Vec<PipelineOutcome>>,
    }

    #[async_trait]
    impl Publisher for Collector {
        async fn publish(&self, outcome: &PipelineOutcome) -> Result<()> {
            self.seen.lock().unwrap().push(outcome.clone());
            Ok(())
        }
    }

    struct Refusing;

    #[async_trait]
    impl Publisher for Refusing {
        async fn publish(&self, _: &PipelineOutcome) -> Result<()> {
            Err(Error::Port("LDAP server unavailable".into()))
        }
    }

    fn engine() -> ValidationEngine {
        // The directory has nothing: revocation depends on the batch's own CRL.
        ValidationEngine::new(
            Arc::new(MemoryCrlStore::new()),
            Arc::new(MemoryCrlDirectory::new()),
            Arc::new(MemoryCscaLookup::new(vec![
                Certificate::from_der(CSCA).unwrap()
            ])),
            Settings::default(),
        )
        .unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2027, 6, 1, 0, 0, 0).unwrap()
    }

    fn batch() -> Vec<PkdBlob> {
        vec![
            PkdBlob::Certificate(CSCA.to_vec()),
            PkdBlob::Certificate(DSC.to_vec()),
            PkdBlob::Certificate(DSC_REVOKED.to_vec()),
            PkdBlob::Certificate(b"not a certificate".to_vec()),
            PkdBlob::Crl {
                country_code: "UT".into(),
                der: REVOKING.to_vec(),
            },
        ]
    }

    #[tokio::test]
    async fn runs_stages_in_order() {
        let collector = Arc::new(Collector::default());
        let pipeline = Pipeline::new(engine(), collector.clone());

        let report = pipeline.run_at(batch(), at()).await.unwrap();

        assert_eq!(
            report,
            PipelineReport {
                certificates_valid: 2,
                certificates_invalid: 1,
                crls_ingested: 1,
                rejected: 1,
            }
        );

        let seen = collector.seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert!(matches!(&seen[0], PipelineOutcome::Rejected(r) if r.index == 3));
        assert!(matches!(&seen[1], PipelineOutcome::Crl(c) if c.revoked_count == 1));
        match &seen[4] {
            PipelineOutcome::Certificate(v) => {
                assert_eq!(v.status, CertificateStatus::Revoked);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn publisher_failure_stops_the_run() {
        let pipeline = Pipeline::new(engine(), Arc::new(Refusing));

        let err = pipeline.run_at(batch(), at()).await.unwrap_err();
        assert!(matches!(err, Error::Pipeline { stage: "publish", .. }));
    }

    #[tokio::test]
    async fn rejects_bad_crl_country() {
        let collector = Arc::new(Collector::default());
        let pipeline = Pipeline::new(engine(), collector.clone());

        let report = pipeline
            .run_at(
                vec![PkdBlob::Crl {
                    country_code: "UTO".into(),
                    der: REVOKING.to_vec(),
                }],
                at(),
            )
            .await
            .unwrap();

        assert_eq!(report.rejected, 1);
        assert_eq!(report.crls_ingested, 0);
    }
}
