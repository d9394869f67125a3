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

#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Validation of ICAO 9303 PKI material: CSCA and document signer
//! certificates, trust paths, CRL-based revocation and Passive
//! Authentication of eMRTD data.
//!
//! The crate stores and fetches nothing itself. A durable CRL store, a CRL
//! directory and a CSCA lookup are supplied through the traits in
//! [`ports`]; [`ValidationEngine`] is composed from them once.
//!
//! # Example: Checking a CSCA
//!
//! ```
//! # use icao_pkd::Result;
//! use icao_pkd::{Certificate, CertificateRole, CertificateStructuralValidator};
//!
//! # fn main() -> Result<()> {
//! let der = std::fs::read("tests/fixtures/pki/csca.der")?;
//! let csca = Certificate::from_der(&der)?;
//!
//! let result = CertificateStructuralValidator::new().validate(&csca, CertificateRole::Root);
//! println!("{}: {:?}", csca.subject_dn(), result.status());
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Passive Authentication
//!
//! ```no_run
//! # use icao_pkd::Result;
//! use std::sync::Arc;
//!
//! use icao_pkd::{
//!     ports::memory::{MemoryCrlDirectory, MemoryCrlStore, MemoryCscaLookup},
//!     Certificate, PassportData, Settings, ValidationEngine,
//! };
//!
//! # async fn verify() -> Result<()> {
//! let csca = Certificate::from_der(&std::fs::read("csca.der")?)?;
//! let engine = ValidationEngine::new(
//!     Arc::new(MemoryCrlStore::new()),
//!     Arc::new(MemoryCrlDirectory::new()),
//!     Arc::new(MemoryCscaLookup::new(vec![csca])),
//!     Settings::default(),
//! )?;
//!
//! let passport = PassportData::new(std::fs::read("EF.SOD")?)
//!     .with_data_group(1, std::fs::read("EF.DG1")?)?;
//! let result = engine.verify_passport(&passport).await;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```

mod certificate;
pub use certificate::{
    Certificate, CertificateStatus, CertificateType, IssuerInfo, KeyUsageFlags, NameInfo,
    PublicKeyInfo, ValidityPeriod,
};

mod crl;
pub use crl::{Crl, RevokedEntry};

pub mod crl_cache;
pub use crl_cache::CrlCache;

pub mod crypto;

mod engine;
pub use engine::{CertificateValidation, ValidationEngine};

mod error;
pub use error::{Error, Result};

pub mod passive_auth;
pub use passive_auth::{PaResult, PaStatus, PassiveAuthenticationEngine, PassportData};

pub mod pipeline;

pub mod ports;

pub mod revocation;
pub use revocation::{RevocationCheckResult, RevocationChecker, RevocationStatus};

pub mod settings;
pub use settings::Settings;

pub mod status_tracker;

mod structural_validator;
pub use structural_validator::{CertificateRole, CertificateStructuralValidator};

pub mod trust_chain;
pub use trust_chain::{TrustChainValidator, TrustPath};

pub(crate) mod utils;
pub use utils::normalize_serial;

mod validation_results;
pub use validation_results::{ValidationError, ValidationOutcome, ValidationResult};

pub mod validation_status;

/// The internal name of this crate
pub const NAME: &str = "icao-pkd";
/// The version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
