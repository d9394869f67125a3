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

//! In-memory port implementations.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CrlDirectory, CrlRecord, CrlStore, CscaLookup};
use crate::{certificate::Certificate, crl::Crl, Result};

fn key(issuer_dn: &str, country_code: &str) -> (String, String) {
    (country_code.to_owned(), issuer_dn.to_owned())
}

/// A [`CrlStore`] backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryCrlStore {
    records: DashMap<(String, String), CrlRecord>,
}

impl MemoryCrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CrlStore for MemoryCrlStore {
    async fn find_by_issuer_and_country(
        &self,
        issuer_dn: &str,
        country_code: &str,
    ) -> Result<Option<CrlRecord>> {
        Ok(self
            .records
            .get(&key(issuer_dn, country_code))
            .map(|r| r.value().clone()))
    }

    async fn save(&self, record: CrlRecord) -> Result<()> {
        self.records
            .insert(key(&record.issuer_name, &record.country_code), record);
        Ok(())
    }
}

/// A [`CrlDirectory`] serving a fixed set of CRLs.
#[derive(Debug, Default)]
pub struct MemoryCrlDirectory {
    crls: DashMap<(String, String), Vec<u8>>,
}

impl MemoryCrlDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `crl` under `country_code`, replacing any earlier CRL
    /// from the same issuer.
    pub fn publish(&self, country_code: &str, crl: &Crl) {
        self.crls
            .insert(key(crl.issuer_name(), country_code), crl.der().to_vec());
    }
}

#[async_trait]
impl CrlDirectory for MemoryCrlDirectory {
    async fn find_crl_by_issuer(
        &self,
        issuer_dn: &str,
        country_code: &str,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self
            .crls
            .get(&key(issuer_dn, country_code))
            .map(|der| der.value().clone()))
    }
}

/// A [`CscaLookup`] over a fixed list of certificates.
#[derive(Clone, Debug, Default)]
pub struct MemoryCscaLookup {
    roots: Vec<Certificate>,
}

impl MemoryCscaLookup {
    pub fn new(roots: Vec<Certificate>) -> Self {
        Self { roots }
    }
}

#[async_trait]
impl CscaLookup for MemoryCscaLookup {
    async fn find_roots_by_country(&self, country_code: &str) -> Result<Vec<Certificate>> {
        Ok(self
            .roots
            .iter()
            .filter(|c| c.country_code() == Some(country_code))
            .cloned()
            .collect())
    }
}
