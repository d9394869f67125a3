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

//! Interfaces to the collaborators the validation core depends on.
//!
//! The core never stores or fetches anything itself. A durable CRL store,
//! a directory that serves CRLs and a CSCA lookup are handed to it at
//! construction time. [`memory`] holds simple in-process implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{certificate::Certificate, crl::Crl, Result};

pub mod memory;

/// A CRL as kept by the durable store.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CrlRecord {
    /// Issuer DN, exactly as rendered by the parser.
    pub issuer_name: String,

    /// Country the CRL was stored under.
    pub country_code: String,

    /// `thisUpdate`
    pub this_update: DateTime<Utc>,

    /// `nextUpdate`
    pub next_update: Option<DateTime<Utc>>,

    /// Normalized revoked serial numbers.
    pub revoked_serial_numbers: Vec<String>,

    /// DER encoding of the CRL.
    pub der: Vec<u8>,
}

impl CrlRecord {
    /// Builds a record for `crl` stored under `country_code`.
    pub fn from_crl(crl: &Crl, country_code: &str) -> Self {
        Self {
            issuer_name: crl.issuer_name().to_owned(),
            country_code: country_code.to_owned(),
            this_update: crl.this_update(),
            next_update: crl.next_update(),
            revoked_serial_numbers: crl
                .revoked_entries()
                .map(|e| e.serial_number.clone())
                .collect(),
            der: crl.der().to_vec(),
        }
    }

    /// `true` when `nextUpdate` is present and already past at `now`.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.next_update.is_some_and(|next| next < now)
    }
}

/// Durable storage for CRLs.
#[async_trait]
pub trait CrlStore: Send + Sync {
    /// Returns the stored CRL for an issuer DN and country, if any.
    async fn find_by_issuer_and_country(
        &self,
        issuer_dn: &str,
        country_code: &str,
    ) -> Result<Option<CrlRecord>>;

    /// Stores `record`, replacing any record for the same issuer and
    /// country.
    async fn save(&self, record: CrlRecord) -> Result<()>;
}

/// The source of truth for CRLs (an ICAO PKD mirror, an LDAP directory).
///
/// Errors are never fatal to the caller; the cache treats them as
/// "not found".
#[async_trait]
pub trait CrlDirectory: Send + Sync {
    /// Fetches the DER bytes of the current CRL for an issuer.
    async fn find_crl_by_issuer(
        &self,
        issuer_dn: &str,
        country_code: &str,
    ) -> Result<Option<Vec<u8>>>;
}

/// Resolves trust anchors for Passive Authentication.
#[async_trait]
pub trait CscaLookup: Send + Sync {
    /// Returns every known CSCA for a country.
    async fn find_roots_by_country(&self, country_code: &str) -> Result<Vec<Certificate>>;
}
