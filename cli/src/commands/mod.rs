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

mod cert;
mod chain;
mod ingest;
mod pa;
mod revocation;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};
use icao_pkd::{ports::memory::MemoryCrlStore, Settings, ValidationEngine};
use serde::Serialize;

pub use self::{cert::Cert, chain::Chain, ingest::Ingest, pa::Pa, revocation::Revocation};
use crate::trust_material;

/// Tool for validating ICAO 9303 certificates, CRLs and passports.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a .toml or .json settings file.
    #[arg(long, global = true, env = "PKDTOOL_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Validate as of this RFC 3339 time instead of now.
    #[arg(long, global = true, value_parser = parse_time)]
    pub at: Option<DateTime<Utc>>,

    /// Folder of CSCA certificates (DER or PEM).
    #[arg(long, global = true, env = "PKDTOOL_CSCAS")]
    pub cscas: Option<PathBuf>,

    /// Folder of DER CRLs, each filed under its issuer's country.
    #[arg(long, global = true, env = "PKDTOOL_CRLS")]
    pub crls: Option<PathBuf>,

    /// Use verbose output (-vv very verbose output).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Structural checks of one certificate.
    Cert(Cert),
    /// Validate a CSCA, CSCA -> DSC or CSCA -> CA -> DS path.
    Chain(Chain),
    /// Check a certificate against its issuer's CRL.
    Revocation(Revocation),
    /// Passive Authentication of an EF.SOD and its data groups.
    Pa(Pa),
    /// Run certificates and CRLs through the ingestion pipeline.
    Ingest(Ingest),
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid RFC 3339 time: {s}"))?
        .with_timezone(&Utc))
}

/// What every command runs against.
pub struct Context {
    pub engine: ValidationEngine,
    pub at: DateTime<Utc>,
}

impl CliArgs {
    pub fn context(&self) -> Result<Context> {
        let settings = match &self.settings {
            Some(path) => Settings::from_file(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => Settings::default(),
        };

        let directory = match &self.crls {
            Some(dir) => trust_material::load_crl_directory(dir)?,
            None => Default::default(),
        };
        let cscas = match &self.cscas {
            Some(dir) => trust_material::load_csca_lookup(dir)?,
            None => Default::default(),
        };

        let engine = ValidationEngine::new(
            Arc::new(MemoryCrlStore::new()),
            Arc::new(directory),
            Arc::new(cscas),
            settings,
        )?;

        Ok(Context {
            engine,
            at: self.at.unwrap_or_else(Utc::now),
        })
    }
}

/// Prints `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Reads one certificate (the first, for PEM bundles).
pub(crate) fn read_certificate(path: &std::path::Path) -> Result<icao_pkd::Certificate> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    icao_pkd::Certificate::from_bytes(&bytes)?
        .into_iter()
        .next()
        .with_context(|| format!("No certificate in {}", path.display()))
}
