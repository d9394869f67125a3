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

//! Runtime configuration for the validation engine.
//!
//! [`Settings::default`] gives the documented defaults. Partial TOML or
//! JSON documents are merged over those defaults and validated before
//! they are returned.

use std::path::Path;

use config::{Config, FileFormat};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// trait used to validate user input to make sure user supplied configurations are valid
pub(crate) trait SettingsValidate {
    // returns error if settings are invalid
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Settings for revocation checking.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RevocationSettings {
    /// Upper bound on one CRL lookup, in seconds.
    ///
    /// The default value is 30. Accepted range is 5 to 300.
    pub fetch_timeout_secs: u64,

    /// Whether an unavailable or timed-out CRL lets validation proceed.
    ///
    /// The default value is true. When false, `CRL_UNAVAILABLE` and
    /// `CRL_FETCH_TIMEOUT` fail the chain.
    pub fail_open: bool,

    /// Whether the third element of a path is revocation-checked.
    ///
    /// The default value is false.
    pub check_leaf_revocation: bool,
}

impl Default for RevocationSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            fail_open: true,
            check_leaf_revocation: false,
        }
    }
}

impl SettingsValidate for RevocationSettings {
    fn validate(&self) -> Result<()> {
        if !(5..=300).contains(&self.fetch_timeout_secs) {
            return Err(Error::BadParam(format!(
                "revocation.fetch_timeout_secs must be between 5 and 300, got {}",
                self.fetch_timeout_secs
            )));
        }
        Ok(())
    }
}

/// Settings for the CRL cache.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct CrlCacheSettings {
    /// How long a CRL without `nextUpdate` stays cached, in seconds.
    ///
    /// The default value is 86400 (24 hours).
    pub default_ttl_secs: u64,

    /// Interval of the background sweep of expired entries, in seconds.
    ///
    /// The default value is 3600.
    pub sweep_interval_secs: u64,
}

impl Default for CrlCacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: 86_400,
            sweep_interval_secs: 3_600,
        }
    }
}

const MAX_TTL_SECS: u64 = 366 * 86_400;

impl SettingsValidate for CrlCacheSettings {
    fn validate(&self) -> Result<()> {
        if self.default_ttl_secs == 0 || self.default_ttl_secs > MAX_TTL_SECS {
            return Err(Error::BadParam(format!(
                "crl_cache.default_ttl_secs must be between 1 and {MAX_TTL_SECS}"
            )));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::BadParam(
                "crl_cache.sweep_interval_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for Passive Authentication.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct PassiveAuthSettings {
    /// Whether a submitted data group with no hash in the SOD counts as
    /// invalid.
    ///
    /// The default value is true.
    pub require_all_data_groups_in_sod: bool,
}

impl Default for PassiveAuthSettings {
    fn default() -> Self {
        Self {
            require_all_data_groups_in_sod: true,
        }
    }
}

impl SettingsValidate for PassiveAuthSettings {}

/// Settings for batch validation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Number of certificates validated concurrently.
    ///
    /// The default value is 8.
    pub max_concurrency: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}

impl SettingsValidate for BatchSettings {
    fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::BadParam(
                "batch.max_concurrency must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for the whole validation core.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Settings {
    pub revocation: RevocationSettings,
    pub crl_cache: CrlCacheSettings,
    pub passive_auth: PassiveAuthSettings,
    pub batch: BatchSettings,
}

impl SettingsValidate for Settings {
    fn validate(&self) -> Result<()> {
        self.revocation.validate()?;
        self.crl_cache.validate()?;
        self.passive_auth.validate()?;
        self.batch.validate()
    }
}

impl Settings {
    /// Load [Settings] from a `.toml` or `.json` file.
    pub fn from_file<P: AsRef<Path>>(settings_path: P) -> Result<Self> {
        let ext = settings_path
            .as_ref()
            .extension()
            .ok_or(Error::UnsupportedType)?
            .to_string_lossy()
            .into_owned();

        let setting_buf = std::fs::read(&settings_path).map_err(Error::IoError)?;
        Settings::from_string(&String::from_utf8_lossy(&setting_buf), &ext)
    }

    /// Load [Settings] from a string. Format of configuration must be
    /// supplied (json or toml). Missing values take their defaults.
    pub fn from_string(settings_str: &str, format: &str) -> Result<Self> {
        let f = match format.to_lowercase().as_str() {
            "json" => FileFormat::Json,
            "toml" => FileFormat::Toml,
            _ => return Err(Error::UnsupportedType),
        };

        let defaults = Config::try_from(&Settings::default())
            .map_err(|e| Error::OtherError(Box::new(e)))?;

        let settings = Config::builder()
            .add_source(defaults)
            .add_source(config::File::from_str(settings_str, f))
            .build() // merge overrides, allows for partial changes
            .map_err(|_e| Error::BadParam("could not parse configuration file".into()))?
            .try_deserialize::<Settings>()
            .map_err(|e| Error::BadParam(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Checks every section, returning [`Error::BadParam`] for the first
    /// out-of-range value.
    pub fn validate(&self) -> Result<()> {
        SettingsValidate::validate(self)
    }

    /// The CRL fetch timeout as a [`std::time::Duration`].
    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.revocation.fetch_timeout_secs)
    }
}
