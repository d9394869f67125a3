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
use icao_pkd::TrustPath;

use super::{print_json, read_certificate, Context};

#[derive(Debug, Parser)]
pub struct Chain {
    /// Certificates from the CSCA down, one to three of them.
    #[arg(required = true, num_args = 1..=3)]
    pub paths: Vec<PathBuf>,
}

impl Chain {
    pub async fn execute(&self, context: &Context) -> Result<bool> {
        let certs = self
            .paths
            .iter()
            .map(|p| read_certificate(p))
            .collect::<Result<Vec<_>>>()?;
        let path = TrustPath::new(certs)?;

        let result = context.engine.validate_chain_at(&path, context.at).await;
        print_json(&result)?;
        Ok(result.is_success())
    }
}
