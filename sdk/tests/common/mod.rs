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

//! Fixtures and port doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use icao_pkd::{
    ports::{memory::MemoryCrlDirectory, CrlDirectory},
    Certificate, Crl, Error, Result,
};

pub const CSCA: &[u8] = include_bytes!("../fixtures/pki/csca.der");
pub const CSCA_OTHER: &[u8] = include_bytes!("../fixtures/pki/csca_other.der");
pub const DSC: &[u8] = include_bytes!("../fixtures/pki/dsc.der");
pub const DSC_REVOKED: &[u8] = include_bytes!("../fixtures/pki/dsc_revoked.der");
pub const INTERMEDIATE: &[u8] = include_bytes!("../fixtures/pki/chain_intermediate.der");
pub const LEAF: &[u8] = include_bytes!("../fixtures/pki/chain_leaf.der");
pub const CRL_EMPTY: &[u8] = include_bytes!("../fixtures/pki/csca_empty.crl");
pub const CRL_REVOKING: &[u8] = include_bytes!("../fixtures/pki/csca_revoking.crl");
pub const CRL_STALE: &[u8] = include_bytes!("../fixtures/pki/csca_stale.crl");
pub const SOD: &[u8] = include_bytes!("../fixtures/pki/sod.bin");
pub const DG1: &[u8] = include_bytes!("../fixtures/pki/dg1.bin");
pub const DG2: &[u8] = include_bytes!("../fixtures/pki/dg2.bin");
pub const DG2_TAMPERED: &[u8] = include_bytes!("../fixtures/pki/dg2_tampered.bin");
pub const DG11: &[u8] = include_bytes!("../fixtures/pki/dg11.bin");

pub fn cert(der: &[u8]) -> Certificate {
    Certificate::from_der(der).unwrap()
}

pub fn crl(der: &[u8]) -> Crl {
    Crl::from_der(der).unwrap()
}

/// A time inside every fixture certificate's validity window.
pub fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2027, 6, 1, 0, 0, 0).unwrap()
}

/// Serves the given CRLs under `UT` and counts fetches.
#[derive(Default)]
pub struct CountingDirectory {
    inner: MemoryCrlDirectory,
    calls: AtomicUsize,
}

impl CountingDirectory {
    pub fn serving(crls: &[&[u8]]) -> Arc<Self> {
        let directory = Self::default();
        for der in crls {
            directory.inner.publish("UT", &crl(der));
        }
        Arc::new(directory)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrlDirectory for CountingDirectory {
    async fn find_crl_by_issuer(
        &self,
        issuer_dn: &str,
        country_code: &str,
    ) -> Result<Option<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_crl_by_issuer(issuer_dn, country_code).await
    }
}

/// Fails every fetch.
pub struct FailingDirectory;

#[async_trait]
impl CrlDirectory for FailingDirectory {
    async fn find_crl_by_issuer(&self, _: &str, _: &str) -> Result<Option<Vec<u8>>> {
        Err(Error::Port("directory unreachable".into()))
    }
}
