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

pub(crate) mod time;

/// Normalize a certificate serial number for comparison.
///
/// Accepts hex with or without `:`/space separators and leading zeros, in
/// either case. Returns uppercase hex without leading zeros (`"0"` for an
/// all-zero serial).
///
/// ```
/// use icao_pkd::normalize_serial;
///
/// assert_eq!(normalize_serial("0a:1b:2c:3d:4e:5f"), "A1B2C3D4E5F");
/// assert_eq!(normalize_serial("00 00"), "0");
/// ```
pub fn normalize_serial(serial: &str) -> String {
    let digits: String = serial
        .chars()
        .filter(|c| !matches!(c, ':' | ' ' | '-'))
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}
