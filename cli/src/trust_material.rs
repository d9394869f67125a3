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

//! Loads folders of CSCAs and CRLs into the in-memory ports.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use icao_pkd::{
    ports::memory::{MemoryCrlDirectory, MemoryCscaLookup},
    Certificate, Crl,
};
use log::{info, warn};

fn files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Every CRL in `dir`, filed under its issuer's country. Files that do not
/// parse, or whose issuer names no country, are skipped with a warning.
pub fn load_crl_directory(dir: &Path) -> Result<MemoryCrlDirectory> {
    let directory = MemoryCrlDirectory::new();
    let mut count = 0;

    for path in files_in(dir)? {
        let crl = match Crl::from_der(&fs::read(&path)?) {
            Ok(crl) => crl,
            Err(err) => {
                warn!("skipping {}: {err}", path.display());
                continue;
            }
        };
        let Some(country) = crl.country_code().map(str::to_owned) else {
            warn!("skipping {}: issuer has no country", path.display());
            continue;
        };
        directory.publish(&country, &crl);
        count += 1;
    }

    info!("loaded {count} CRLs from {}", dir.display());
    Ok(directory)
}

/// Every certificate in `dir`. PEM files may hold several.
pub fn load_csca_lookup(dir: &Path) -> Result<MemoryCscaLookup> {
    let mut roots = Vec::new();

    for path in files_in(dir)? {
        match Certificate::from_bytes(&fs::read(&path)?) {
            Ok(mut certs) => roots.append(&mut certs),
            Err(err) => warn!("skipping {}: {err}", path.display()),
        }
    }

    info!("loaded {} CSCAs from {}", roots.len(), dir.display());
    Ok(MemoryCscaLookup::new(roots))
}
