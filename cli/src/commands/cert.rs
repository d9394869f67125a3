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
use clap::{Parser, ValueEnum};
use icao_pkd::{CertificateRole, ValidationResult};
use serde::Serialize;

use super::{print_json, read_certificate, Context};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Role {
    Root,
    Intermediate,
    Leaf,
}

impl From<Role> for CertificateRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Root => CertificateRole::Root,
            Role::Intermediate => CertificateRole::Intermediate,
            Role::Leaf => CertificateRole::Leaf,
        }
    }
}

#[derive(Debug, Parser)]
pub struct Cert {
    /// Path to a DER or PEM certificate.
    pub path: PathBuf,

    /// The position the certificate is checked for.
    #[arg(long, value_enum, default_value_t = Role::Root)]
    pub role: Role,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CertReport<'a> {
    subject_dn: &'a str,
    issuer_dn: &'a str,
    serial_number: &'a str,
    fingerprint_sha256: &'a str,
    role: CertificateRole,
    result: ValidationResult,
}

impl Cert {
    pub async fn execute(&self, context: &Context) -> Result<bool> {
        let cert = read_certificate(&self.path)?;
        let role = self.role.into();
        let result = context
            .engine
            .validate_certificate_at(&cert, role, context.at);

        let valid = result.is_success();
        print_json(&CertReport {
            subject_dn: cert.subject_dn(),
            issuer_dn: cert.issuer_dn(),
            serial_number: cert.serial_number(),
            fingerprint_sha256: cert.fingerprint_sha256(),
            role,
            result,
        })?;
        Ok(valid)
    }
}
