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

use thiserror::Error;

use crate::crypto::raw_signature::RawSignatureValidationError;

/// `Error` enumerates errors returned by parsing, settings and port
/// operations.
///
/// Expected validation failures are never reported through this type; they
/// are returned as [`ValidationError`](crate::ValidationError)s inside a
/// result value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The certificate bytes could not be decoded.
    #[error("could not parse certificate: {0}")]
    CertificateParse(String),

    /// The CRL bytes could not be decoded.
    #[error("could not parse CRL: {0}")]
    CrlParse(String),

    /// The SOD could not be unwrapped or decoded.
    #[error("could not parse SOD: {0}")]
    SodParse(String),

    /// The certificate's validity window is inverted.
    #[error("certificate notAfter precedes notBefore")]
    InvalidValidityPeriod,

    /// A data group number outside 1..=16.
    #[error("data group number {0} is outside 1..=16")]
    InvalidDataGroup(u8),

    /// The algorithm identified by the OID is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A parameter is out of range or malformed.
    #[error("bad parameter: {0}")]
    BadParam(String),

    /// The file format is not one of the supported settings formats.
    #[error("type is unsupported")]
    UnsupportedType,

    /// A port implementation failed.
    #[error("port error: {0}")]
    Port(String),

    /// A pipeline stage failed.
    #[error("pipeline stage '{stage}' failed: {reason}")]
    Pipeline {
        /// Name of the stage.
        stage: &'static str,
        /// What went wrong.
        reason: String,
    },

    #[error(transparent)]
    RawSignature(#[from] RawSignatureValidationError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    OtherError(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// A specialized `Result` type for PKD operations.
pub type Result<T> = std::result::Result<T, Error>;
