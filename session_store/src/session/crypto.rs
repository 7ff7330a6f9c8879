//! Signing, verification and optional sealing of session payloads.
//!
//! Signing is HMAC-SHA256 over the encoded payload; sealing is
//! ChaCha20-Poly1305 with the AEAD key derived from the ring key by SHA-256.
//! Verification walks the key ring newest-first so sessions signed before a
//! rotation stay valid while the old key remains in the ring.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use ring::aead::{self, CHACHA20_POLY1305, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::session::errors::SessionError;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;

pub(crate) fn sign(payload: &[u8], key: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Ordered secret keys: element 0 signs and seals, every element may verify.
#[derive(Clone)]
pub(crate) struct KeyRing {
    keys: Vec<Vec<u8>>,
}

impl KeyRing {
    pub(crate) fn new(
        signing_key: Vec<u8>,
        rotated: Vec<Vec<u8>>,
    ) -> Result<Self, SessionError> {
        if signing_key.is_empty() {
            return Err(SessionError::Config(
                "No signing key configured".to_string(),
            ));
        }
        let mut keys = Vec::with_capacity(rotated.len() + 1);
        keys.push(signing_key);
        keys.extend(rotated.into_iter().filter(|key| !key.is_empty()));
        Ok(Self { keys })
    }

    pub(crate) fn signing_key(&self) -> &[u8] {
        &self.keys[0]
    }

    /// Constant-time tag verification against every key in the ring.
    pub(crate) fn verify(&self, payload: &[u8], tag: &[u8]) -> bool {
        self.keys.iter().any(|key| {
            let expected = sign(payload, key);
            expected.as_slice().ct_eq(tag).into()
        })
    }

    /// Seal a payload under the current key. The random 96-bit nonce is
    /// prepended to the ciphertext.
    pub(crate) fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, SessionError> {
        let rng = SystemRandom::new();
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill(&mut nonce_bytes)
            .map_err(|_| SessionError::Crypto("Failed to generate nonce".to_string()))?;

        let key = sealing_key(self.signing_key());
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);
        let mut in_out = plaintext.to_vec();
        key.seal_in_place_append_tag(nonce, aead::Aad::empty(), &mut in_out)
            .map_err(|_| SessionError::Crypto("Failed to seal session payload".to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&in_out);
        Ok(blob)
    }

    /// Open a sealed blob, trying each ring key. Authentication failure is
    /// absorbed as `None`.
    pub(crate) fn open(&self, blob: &[u8]) -> Option<Vec<u8>> {
        if blob.len() < NONCE_LEN {
            return None;
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        self.keys.iter().find_map(|secret| {
            let key = sealing_key(secret);
            let nonce = Nonce::try_assume_unique_for_key(nonce_bytes).ok()?;
            let mut in_out = ciphertext.to_vec();
            let plaintext = key.open_in_place(nonce, aead::Aad::empty(), &mut in_out).ok()?;
            Some(plaintext.to_vec())
        })
    }
}

fn sealing_key(secret: &[u8]) -> LessSafeKey {
    let digest = Sha256::digest(secret);
    let unbound = UnboundKey::new(&CHACHA20_POLY1305, digest.as_slice())
        .expect("SHA-256 digest matches the ChaCha20-Poly1305 key length");
    LessSafeKey::new(unbound)
}

/// Produce the signed wire form `base64(payload)--base64(tag)`.
pub(crate) fn encode_signed(payload: &[u8], keyring: &KeyRing) -> String {
    let tag = sign(payload, keyring.signing_key());
    format!("{}--{}", STANDARD.encode(payload), STANDARD.encode(tag))
}

/// Parse and verify the signed wire form, returning the payload bytes.
/// Standard base64 keeps `--` out of both halves, so the separator is
/// unambiguous.
pub(crate) fn decode_signed(value: &str, keyring: &KeyRing) -> Result<Vec<u8>, SessionError> {
    let (payload_b64, tag_b64) = value
        .split_once("--")
        .ok_or_else(|| SessionError::Decode("Missing signature separator".to_string()))?;
    let payload = STANDARD
        .decode(payload_b64)
        .map_err(|_| SessionError::Decode("Invalid base64 payload".to_string()))?;
    let tag = STANDARD
        .decode(tag_b64)
        .map_err(|_| SessionError::Decode("Invalid base64 signature".to_string()))?;

    if !keyring.verify(&payload, &tag) {
        return Err(SessionError::Tamper);
    }
    Ok(payload)
}
