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

use std::{error::Error, fs, path::PathBuf, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

const AT: &str = "2027-06-01T00:00:00Z";

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../sdk/tests/fixtures/pki");
    path.push(name);
    fs::canonicalize(path).expect("canonicalize")
}

// A fresh folder holding copies of `names`.
fn folder_with(folder: &str, names: &[&str]) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(folder);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create_dir_all");
    for name in names {
        fs::copy(fixture_path(name), dir.join(name)).expect("copy");
    }
    dir
}

fn pkdtool() -> Command {
    let mut cmd = Command::cargo_bin("pkdtool").expect("pkdtool binary");
    cmd.args(["--at", AT]);
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("JSON on stdout")
}

#[test]
fn cert_reports_valid_csca() -> Result<(), Box<dyn Error>> {
    pkdtool()
        .arg("cert")
        .arg(fixture_path("csca.der"))
        .assert()
        .success()
        .stdout(str_contains("\"status\": \"SUCCESS\""))
        .stdout(str_contains("CSCA Utopia"));
    Ok(())
}

#[test]
fn cert_rejects_signer_as_root() -> Result<(), Box<dyn Error>> {
    pkdtool()
        .arg("cert")
        .arg(fixture_path("dsc.der"))
        .args(["--role", "root"])
        .assert()
        .code(1)
        .stdout(str_contains("\"status\": \"FAILED\""));
    Ok(())
}

#[test]
fn missing_file_is_trouble() -> Result<(), Box<dyn Error>> {
    pkdtool()
        .args(["cert", "does/not/exist.der"])
        .assert()
        .code(2)
        .stderr(str_contains("Failed to read"));
    Ok(())
}

#[test]
fn chain_finds_revoked_signer() -> Result<(), Box<dyn Error>> {
    let crls = folder_with("chain_crls", &["csca_revoking.crl"]);

    let output = pkdtool()
        .arg("chain")
        .arg(fixture_path("csca.der"))
        .arg(fixture_path("dsc_revoked.der"))
        .arg("--crls")
        .arg(&crls)
        .output()?;

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["status"], "FAILED");
    assert!(json.to_string().contains("CERTIFICATE_REVOKED"));
    Ok(())
}

#[test]
fn revocation_of_good_signer() -> Result<(), Box<dyn Error>> {
    let crls = folder_with("revocation_crls", &["csca_revoking.crl"]);

    let output = pkdtool()
        .arg("revocation")
        .arg(fixture_path("dsc.der"))
        .arg("--issuer")
        .arg(fixture_path("csca.der"))
        .arg("--crls")
        .arg(&crls)
        .output()?;

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["revocationStatus"], "NOT_REVOKED");
    Ok(())
}

#[test]
fn passive_authentication_of_genuine_passport() -> Result<(), Box<dyn Error>> {
    let cscas = folder_with("pa_cscas", &["csca.der", "csca_other.der"]);

    let output = pkdtool()
        .arg("pa")
        .arg(fixture_path("sod.bin"))
        .arg("--dg")
        .arg(format!("1={}", fixture_path("dg1.bin").display()))
        .arg("--dg")
        .arg(format!("2={}", fixture_path("dg2.bin").display()))
        .arg("--dg")
        .arg(format!("11={}", fixture_path("dg11.bin").display()))
        .arg("--cscas")
        .arg(&cscas)
        .output()?;

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["status"], "VALID");
    assert_eq!(json["dataGroupValidCount"], 3);
    Ok(())
}

#[test]
fn passive_authentication_flags_tampered_group() -> Result<(), Box<dyn Error>> {
    let cscas = folder_with("pa_tampered_cscas", &["csca.der"]);

    let output = pkdtool()
        .arg("pa")
        .arg(fixture_path("sod.bin"))
        .arg("--dg")
        .arg(format!("2={}", fixture_path("dg2_tampered.bin").display()))
        .arg("--cscas")
        .arg(&cscas)
        .output()?;

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["status"], "INVALID");
    assert_eq!(json["dataGroupInvalidCount"], 1);
    assert_eq!(json["chainValid"], true);
    assert_eq!(json["errors"][0]["code"], "SIGNATURE_INVALID");
    Ok(())
}

#[test]
fn ingest_prints_one_line_per_outcome() -> Result<(), Box<dyn Error>> {
    let cscas = folder_with("ingest_cscas", &["csca.der"]);

    let output = pkdtool()
        .arg("ingest")
        .arg(fixture_path("csca.der"))
        .arg(fixture_path("dsc_revoked.der"))
        .arg(fixture_path("csca_revoking.crl"))
        .arg("--cscas")
        .arg(&cscas)
        .output()?;

    assert_eq!(output.status.code(), Some(1));
    let lines: Vec<Value> = String::from_utf8(output.stdout)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["kind"], "crl");
    assert_eq!(lines[2]["status"], "REVOKED");
    assert_eq!(lines[3]["certificatesValid"], 1);
    assert_eq!(lines[3]["crlsIngested"], 1);
    Ok(())
}

#[test]
fn bad_settings_are_trouble() -> Result<(), Box<dyn Error>> {
    let dir = folder_with("bad_settings", &[]);
    let settings = dir.join("settings.toml");
    fs::write(&settings, "[revocation]\nfetch_timeout_secs = 1\n")?;

    pkdtool()
        .arg("--settings")
        .arg(&settings)
        .arg("cert")
        .arg(fixture_path("csca.der"))
        .assert()
        .code(2)
        .stderr(str_contains("fetch_timeout_secs"));
    Ok(())
}

fn str_contains(s: &str) -> predicates::str::ContainsPredicate {
    predicate::str::contains(s)
}
