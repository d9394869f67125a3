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

use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context as _, Result};
use clap::Parser;
use icao_pkd::PassportData;

use super::{print_json, Context};

/// `N=PATH` as given to `--dg`.
#[derive(Clone, Debug)]
pub struct DataGroupArg {
    pub number: u8,
    pub path: PathBuf,
}

impl DataGroupArg {
    fn parse(s: &str) -> Result<Self> {
        let (number, path) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected N=PATH, got \"{s}\""))?;
        let number = number
            .trim_start_matches("DG")
            .trim_start_matches("dg")
            .parse::<u8>()
            .with_context(|| format!("invalid data group number in \"{s}\""))?;
        Ok(Self {
            number,
            path: path.into(),
        })
    }
}

#[derive(Debug, Parser)]
pub struct Pa {
    /// Path to EF.SOD, with or without its 0x77 wrapper.
    pub sod: PathBuf,

    /// A data group as N=PATH, for example `--dg 1=EF.DG1`. Repeatable.
    #[arg(long = "dg", value_parser = DataGroupArg::parse)]
    pub data_groups: Vec<DataGroupArg>,

    /// Issuing state, used when the signer's issuer names no country.
    #[arg(long)]
    pub country: Option<String>,

    /// Document number, carried into the log only.
    #[arg(long)]
    pub document_number: Option<String>,
}

impl Pa {
    pub async fn execute(&self, context: &Context) -> Result<bool> {
        let sod = fs::read(&self.sod)
            .with_context(|| format!("Failed to read {}", self.sod.display()))?;

        let mut passport = PassportData::new(sod);
        for dg in &self.data_groups {
            let bytes = fs::read(&dg.path)
                .with_context(|| format!("Failed to read {}", dg.path.display()))?;
            passport = passport.with_data_group(dg.number, bytes)?;
        }
        if let Some(country) = &self.country {
            passport = passport.with_issuing_country(country.as_str());
        }
        if let Some(number) = &self.document_number {
            passport = passport.with_document_number(number.as_str());
        }

        let result = context
            .engine
            .verify_passport_at(&passport, context.at)
            .await;
        print_json(&result)?;
        Ok(result.is_valid())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parses_data_group_args() {
        let dg = DataGroupArg::parse("2=photo.bin").unwrap();
        assert_eq!(dg.number, 2);
        assert_eq!(dg.path, PathBuf::from("photo.bin"));

        assert_eq!(DataGroupArg::parse("DG11=x").unwrap().number, 11);
        assert!(DataGroupArg::parse("photo.bin").is_err());
        assert!(DataGroupArg::parse("x=photo.bin").is_err());
    }
}
