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

use ecdsa::signature::hazmat::PrehashVerifier;

use crate::crypto::{
    ec_utils::{der_to_p1363, ec_curve_from_public_key_der, EcdsaCurve},
    hash::DigestAlgorithm,
    raw_signature::{RawSignatureValidationError, RawSignatureValidator},
};

/// An `EcdsaValidator` validates ECDSA signatures over P-256, P-384 or
/// P-521 computed with the given digest.
///
/// The curve is taken from the public key, not from the signature
/// algorithm, so a P-384 signer using SHA-256 is accepted.
pub(crate) struct EcdsaValidator {
    digest: DigestAlgorithm,
}

impl EcdsaValidator {
    pub(crate) fn new(digest: DigestAlgorithm) -> Self {
        Self { digest }
    }
}

impl RawSignatureValidator for EcdsaValidator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let digest = self.digest.digest(data);

        let curve = ec_curve_from_public_key_der(public_key)
            .ok_or(RawSignatureValidationError::InvalidPublicKey)?;

        // CMS and X.509 carry DER signatures; accept a bare r||s as well.
        let sig = match der_to_p1363(sig, curve) {
            Ok(p1363) => p1363,
            Err(_) if sig.len() == curve.scalar_len() * 2 => sig.to_vec(),
            Err(err) => return Err(err),
        };

        let result = match curve {
            EcdsaCurve::P256 => {
                use p256::pkcs8::DecodePublicKey;

                let signature = p256::ecdsa::Signature::from_slice(&sig)
                    .map_err(|_| RawSignatureValidationError::InvalidSignature)?;
                let vk = p256::ecdsa::VerifyingKey::from_public_key_der(public_key)
                    .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

                vk.verify_prehash(&digest, &signature)
            }

            EcdsaCurve::P384 => {
                use p384::pkcs8::DecodePublicKey;

                let signature = p384::ecdsa::Signature::from_slice(&sig)
                    .map_err(|_| RawSignatureValidationError::InvalidSignature)?;
                let vk = p384::ecdsa::VerifyingKey::from_public_key_der(public_key)
                    .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

                vk.verify_prehash(&digest, &signature)
            }

            EcdsaCurve::P521 => {
                use p521::pkcs8::DecodePublicKey;

                let signature = p521::ecdsa::Signature::from_slice(&sig)
                    .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

                // P521 verifying keys are not decodable from SPKI directly.
                let pk = p521::PublicKey::from_public_key_der(public_key)
                    .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;
                let vk = p521::ecdsa::VerifyingKey::from_sec1_bytes(&pk.to_sec1_bytes())
                    .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

                vk.verify_prehash(&digest, &signature)
            }
        };

        result.map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}
