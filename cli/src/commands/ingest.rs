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

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use clap::Parser;
use icao_pkd::{
    pipeline::{Pipeline, PipelineOutcome, PkdBlob, Publisher},
    Crl,
};
use log::warn;

use super::Context;

#[derive(Debug, Parser)]
pub struct Ingest {
    /// Certificate (.der, .pem, .cer, .crt) and CRL (.crl) files.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Country for CRLs whose issuer names none.
    #[arg(long)]
    pub country: Option<String>,
}

/// Prints each outcome as one JSON line.
struct JsonLines;

#[async_trait]
impl Publisher for JsonLines {
    async fn publish(&self, outcome: &PipelineOutcome) -> icao_pkd::Result<()> {
        println!("{}", serde_json::to_string(outcome)?);
        Ok(())
    }
}

impl Ingest {
    fn blob(&self, path: &Path) -> Result<PkdBlob> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let is_crl = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("crl"));
        if !is_crl {
            return Ok(PkdBlob::Certificate(bytes));
        }

        // A CRL that does not parse is left for the pipeline to reject.
        let country_code = Crl::from_der(&bytes)
            .ok()
            .and_then(|crl| crl.country_code().map(str::to_owned))
            .or_else(|| self.country.clone())
            .unwrap_or_default();
        if country_code.is_empty() {
            warn!("{}: no country for this CRL", path.display());
        }
        Ok(PkdBlob::Crl {
            country_code,
            der: bytes,
        })
    }

    pub async fn execute(&self, context: &Context) -> Result<bool> {
        let blobs = self
            .paths
            .iter()
            .map(|p| self.blob(p))
            .collect::<Result<Vec<_>>>()?;

        let pipeline = Pipeline::new(context.engine.clone(), Arc::new(JsonLines));
        let report = pipeline.run_at(blobs, context.at).await?;
        println!("{}", serde_json::to_string(&report)?);
        Ok(report.certificates_invalid == 0 && report.rejected == 0)
    }
}
