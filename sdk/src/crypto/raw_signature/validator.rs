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

use crate::crypto::{
    hash::DigestAlgorithm,
    raw_signature::{
        rust_native::validators::{EcdsaValidator, RsaLegacyValidator, RsaValidator},
        SignatureAlgorithm,
    },
};

/// A `RawSignatureValidator` implementation checks a signature encoded using a
/// specific signature algorithm and a private/public key pair.
///
/// The signature is typically carried by a certificate, a CRL or a CMS
/// signer info; this trait only sees the raw bytes.
pub trait RawSignatureValidator {
    /// Return `Ok(())` if the signature `sig` is valid for the raw content
    /// `data` and the DER `SubjectPublicKeyInfo` `public_key`.
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError>;
}

/// Return a validator for the given signature algorithm.
pub fn validator_for_signature_alg(
    alg: SignatureAlgorithm,
) -> Option<Box<dyn RawSignatureValidator + Send + Sync>> {
    match alg {
        SignatureAlgorithm::Ecdsa(digest) => Some(Box::new(EcdsaValidator::new(digest))),
        SignatureAlgorithm::RsaPkcs1(digest) => Some(Box::new(match digest {
            DigestAlgorithm::Sha1 => RsaLegacyValidator::Sha1,
            DigestAlgorithm::Sha224 => RsaLegacyValidator::Rsa224,
            DigestAlgorithm::Sha256 => RsaLegacyValidator::Rsa256,
            DigestAlgorithm::Sha384 => RsaLegacyValidator::Rsa384,
            DigestAlgorithm::Sha512 => RsaLegacyValidator::Rsa512,
        })),
        SignatureAlgorithm::RsaPss(digest) => Some(Box::new(match digest {
            DigestAlgorithm::Sha1 => RsaValidator::Ps1,
            DigestAlgorithm::Sha224 => RsaValidator::Ps224,
            DigestAlgorithm::Sha256 => RsaValidator::Ps256,
            DigestAlgorithm::Sha384 => RsaValidator::Ps384,
            DigestAlgorithm::Sha512 => RsaValidator::Ps512,
        })),
    }
}

/// Verify `sig` over `data` with the given algorithm and public key.
pub fn verify_signature(
    alg: SignatureAlgorithm,
    sig: &[u8],
    data: &[u8],
    public_key: &[u8],
) -> Result<(), RawSignatureValidationError> {
    let validator =
        validator_for_signature_alg(alg).ok_or(RawSignatureValidationError::UnsupportedAlgorithm)?;
    validator.validate(sig, data, public_key)
}

/// Describes errors that can be identified when validating a raw signature.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum RawSignatureValidationError {
    /// The signature does not match the provided data or public key.
    #[error("the signature does not match the provided data or public key")]
    SignatureMismatch,

    /// An error was reported by the underlying cryptography implementation.
    #[error("an error was reported by the cryptography library: {0}")]
    CryptoLibraryError(String),

    /// An invalid public key was provided.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// An invalid signature value was provided.
    #[error("invalid signature value")]
    InvalidSignature,

    /// The signature uses an unsupported signing or hash algorithm.
    #[error("signature uses an unsupported algorithm")]
    UnsupportedAlgorithm,
}
