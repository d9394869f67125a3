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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use icao_pkd::RevocationStatus;

use super::{print_json, read_certificate, Context};

#[derive(Debug, Parser)]
pub struct Revocation {
    /// The certificate to check.
    pub path: PathBuf,

    /// The issuing CSCA. When given, the CRL must verify under its key.
    #[arg(long)]
    pub issuer: Option<PathBuf>,
}

impl Revocation {
    pub async fn execute(&self, context: &Context) -> Result<bool> {
        let cert = read_certificate(&self.path)?;
        let issuer = self.issuer.as_deref().map(read_certificate).transpose()?;

        let result = context
            .engine
            .check_revocation(&cert, issuer.as_ref())
            .await;
        print_json(&result)?;
        Ok(result.revocation_status == RevocationStatus::NotRevoked)
    }
}
