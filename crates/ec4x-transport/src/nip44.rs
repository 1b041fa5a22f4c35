//! NIP-44 v2 envelope cryptography.
//!
//! One-time ephemeral X25519 keypair against the recipient's long-term
//! key, HKDF-SHA256 with the `nip44-v2` conversation constant, per-message
//! nonce expanded into a ChaCha20 key/nonce and an HMAC-SHA256 key.
//! Plaintext is length-prefixed (16-bit big-endian) and padded on a
//! power-of-two chunk schedule before encryption; the MAC covers
//! `nonce || ciphertext`.
//!
//! Envelope layout: `version(1) || ephemeral_pubkey(32) || nonce(32) ||
//! ciphertext || mac(32)`.

use chacha20::ChaCha20;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::TransportError;

/// Envelope version byte.
pub const VERSION: u8 = 2;

/// Conversation-key derivation salt.
const CONVERSATION_SALT: &[u8] = b"nip44-v2";

/// Minimum envelope size: version + ephemeral key + nonce + one padded
/// block is absent (ciphertext may be 32) + mac.
const MIN_ENVELOPE: usize = 1 + 32 + 32 + 32 + 32;

type HmacSha256 = Hmac<Sha256>;

/// The per-message symmetric material expanded from a conversation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageKeys {
    /// ChaCha20 stream key.
    pub chacha_key: [u8; 32],
    /// ChaCha20 nonce (IETF, 96-bit).
    pub chacha_nonce: [u8; 12],
    /// HMAC-SHA256 key.
    pub hmac_key: [u8; 32],
}

/// Derive the symmetric conversation key for a key pair.
///
/// Symmetric by Diffie-Hellman: `conversation_key(a, B) ==
/// conversation_key(b, A)`.
pub fn conversation_key(secret: &[u8; 32], public: &[u8; 32]) -> [u8; 32] {
    let shared = StaticSecret::from(*secret).diffie_hellman(&PublicKey::from(*public));
    let (prk, _) = Hkdf::<Sha256>::extract(Some(CONVERSATION_SALT), shared.as_bytes());
    prk.into()
}

/// Expand a conversation key and per-message nonce into message keys.
pub fn message_keys(
    conversation_key: &[u8; 32],
    nonce: &[u8; 32],
) -> Result<MessageKeys, TransportError> {
    let hk = Hkdf::<Sha256>::from_prk(conversation_key)
        .map_err(|_| TransportError::InvalidKey("conversation key is not a valid PRK"))?;
    let mut okm = [0u8; 76];
    hk.expand(nonce, &mut okm)
        .map_err(|_| TransportError::InvalidKey("HKDF expand failed"))?;
    let mut chacha_key = [0u8; 32];
    let mut chacha_nonce = [0u8; 12];
    let mut hmac_key = [0u8; 32];
    chacha_key.copy_from_slice(&okm[0..32]);
    chacha_nonce.copy_from_slice(&okm[32..44]);
    hmac_key.copy_from_slice(&okm[44..76]);
    Ok(MessageKeys {
        chacha_key,
        chacha_nonce,
        hmac_key,
    })
}

/// The padded length for a plaintext of `unpadded` bytes.
///
/// Chunk sizes follow the power-of-two schedule: 32 up to 256 bytes of
/// content, then `next_power_of_two / 8` beyond that.
pub fn calc_padded_len(unpadded: usize) -> usize {
    if unpadded <= 32 {
        return 32;
    }
    // Smallest power of two strictly greater than `unpadded - 1`.
    let mut next_power = (unpadded - 1).next_power_of_two();
    if next_power < unpadded {
        next_power = next_power.saturating_mul(2);
    }
    let chunk = if next_power <= 256 { 32 } else { next_power / 8 };
    chunk * ((unpadded - 1) / chunk + 1)
}

/// Length-prefix and pad a plaintext.
pub fn pad(plaintext: &[u8]) -> Result<Vec<u8>, TransportError> {
    let len = plaintext.len();
    if len == 0 || len > 65_535 {
        return Err(TransportError::PlaintextLength(len));
    }
    let padded_len = calc_padded_len(len);
    let mut out = Vec::with_capacity(2 + padded_len);
    out.extend_from_slice(&u16::try_from(len).map_err(|_| TransportError::PlaintextLength(len))?.to_be_bytes());
    out.extend_from_slice(plaintext);
    out.resize(2 + padded_len, 0);
    Ok(out)
}

/// Strip the length prefix and padding.
///
/// Every slice below is guarded by the length checks above it.
#[allow(clippy::indexing_slicing)]
pub fn unpad(padded: &[u8]) -> Result<Vec<u8>, TransportError> {
    if padded.len() < 2 {
        return Err(TransportError::BadLengthPrefix);
    }
    let len = usize::from(u16::from_be_bytes([padded[0], padded[1]]));
    if len == 0 || padded.len() < 2 + len || padded.len() != 2 + calc_padded_len(len) {
        return Err(TransportError::BadLengthPrefix);
    }
    Ok(padded[2..2 + len].to_vec())
}

/// Encrypt a payload to `recipient_public` under a fresh ephemeral key.
pub fn encrypt(
    plaintext: &[u8],
    recipient_public: &[u8; 32],
) -> Result<Vec<u8>, TransportError> {
    let mut ephemeral_secret = [0u8; 32];
    let mut nonce = [0u8; 32];
    let mut rng = rand::rng();
    rng.fill(&mut ephemeral_secret);
    rng.fill(&mut nonce);
    encrypt_with(plaintext, &ephemeral_secret, recipient_public, &nonce)
}

/// Deterministic encryption core, taking the ephemeral secret and nonce
/// explicitly (exposed for tests and replay tooling).
pub fn encrypt_with(
    plaintext: &[u8],
    ephemeral_secret: &[u8; 32],
    recipient_public: &[u8; 32],
    nonce: &[u8; 32],
) -> Result<Vec<u8>, TransportError> {
    let conversation = conversation_key(ephemeral_secret, recipient_public);
    let keys = message_keys(&conversation, nonce)?;

    let mut buffer = pad(plaintext)?;
    let mut cipher = ChaCha20::new(&keys.chacha_key.into(), &keys.chacha_nonce.into());
    cipher.apply_keystream(&mut buffer);

    let mut mac = HmacSha256::new_from_slice(&keys.hmac_key)
        .map_err(|_| TransportError::InvalidKey("HMAC key length"))?;
    mac.update(nonce);
    mac.update(&buffer);
    let tag = mac.finalize().into_bytes();

    let ephemeral_public = PublicKey::from(&StaticSecret::from(*ephemeral_secret));
    let mut envelope = Vec::with_capacity(1 + 32 + 32 + buffer.len() + 32);
    envelope.push(VERSION);
    envelope.extend_from_slice(ephemeral_public.as_bytes());
    envelope.extend_from_slice(nonce);
    envelope.extend_from_slice(&buffer);
    envelope.extend_from_slice(&tag);
    Ok(envelope)
}

/// Verify and decrypt an envelope with the recipient's secret key.
///
/// The fixed-offset slices below are guarded by the `MIN_ENVELOPE` check.
#[allow(clippy::indexing_slicing)]
pub fn decrypt(
    envelope: &[u8],
    recipient_secret: &[u8; 32],
) -> Result<Vec<u8>, TransportError> {
    if envelope.len() < MIN_ENVELOPE {
        return Err(TransportError::Malformed("envelope too short"));
    }
    let version = envelope[0];
    if version != VERSION {
        return Err(TransportError::BadVersion(version));
    }
    let mut ephemeral_public = [0u8; 32];
    ephemeral_public.copy_from_slice(&envelope[1..33]);
    let mut nonce = [0u8; 32];
    nonce.copy_from_slice(&envelope[33..65]);
    let ciphertext = &envelope[65..envelope.len() - 32];
    let tag = &envelope[envelope.len() - 32..];

    let conversation = conversation_key(recipient_secret, &ephemeral_public);
    let keys = message_keys(&conversation, &nonce)?;

    let mut mac = HmacSha256::new_from_slice(&keys.hmac_key)
        .map_err(|_| TransportError::InvalidKey("HMAC key length"))?;
    mac.update(&nonce);
    mac.update(ciphertext);
    mac.verify_slice(tag)
        .map_err(|_| TransportError::MacMismatch)?;

    let mut buffer = ciphertext.to_vec();
    let mut cipher = ChaCha20::new(&keys.chacha_key.into(), &keys.chacha_nonce.into());
    cipher.apply_keystream(&mut buffer);
    unpad(&buffer)
}

/// The X25519 public key for a 32-byte secret.
pub fn public_key(secret: &[u8; 32]) -> [u8; 32] {
    *PublicKey::from(&StaticSecret::from(*secret)).as_bytes()
}

/// Parse a 64-character hex key.
pub fn parse_key(hex_key: &str) -> Result<[u8; 32], TransportError> {
    let bytes = hex::decode(hex_key)
        .map_err(|_| TransportError::InvalidKey("not valid hex"))?;
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| TransportError::InvalidKey("not 32 bytes"))?;
    Ok(array)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hex32(s: &str) -> [u8; 32] {
        parse_key(s).unwrap()
    }

    #[test]
    fn conversation_key_is_symmetric_for_the_reference_secrets() {
        let mut sec1 = [0u8; 32];
        sec1[31] = 1;
        let mut sec2 = [0u8; 32];
        sec2[31] = 2;
        let pub1 = public_key(&sec1);
        let pub2 = public_key(&sec2);
        assert_eq!(conversation_key(&sec1, &pub2), conversation_key(&sec2, &pub1));
    }

    #[test]
    fn message_keys_match_the_reference_vector() {
        let conversation =
            hex32("a1a3d60f3470a8612633924e91febf96dc5366ce130f658b1f0fc652c20b3b54");
        let nonce =
            hex32("e1e6f880560d6d149ed83dcc7e5861ee62a5ee051f7fde9975fe5d25d2a02d72");
        let keys = message_keys(&conversation, &nonce).unwrap();
        assert_eq!(
            hex::encode(keys.chacha_key),
            "f145f3bed47cb70dbeaac07f3a3fe683e822b3715edb7c4fe310829014ce7d76"
        );
        assert_eq!(hex::encode(keys.chacha_nonce), "c4ad129bb01180c0933a160c");
        assert_eq!(
            hex::encode(keys.hmac_key),
            "027c1db445f05e2eee864a0975b0ddef5b7110583c8c192de3732571ca5838c4"
        );
    }

    #[test]
    fn padded_lengths_follow_the_chunk_schedule() {
        assert_eq!(calc_padded_len(1), 32);
        assert_eq!(calc_padded_len(32), 32);
        assert_eq!(calc_padded_len(33), 64);
        assert_eq!(calc_padded_len(256), 256);
        assert_eq!(calc_padded_len(257), 320);
    }

    #[test]
    fn pad_round_trips_across_sizes() {
        for size in [1usize, 31, 32, 33, 255, 256, 257, 1024, 65_535] {
            let plaintext = vec![0xA7u8; size];
            assert_eq!(unpad(&pad(&plaintext).unwrap()).unwrap(), plaintext);
        }
    }

    #[test]
    fn empty_and_oversize_plaintexts_are_rejected() {
        assert!(matches!(pad(&[]), Err(TransportError::PlaintextLength(0))));
        let big = vec![0u8; 65_536];
        assert!(pad(&big).is_err());
    }

    #[test]
    fn encrypt_decrypt_round_trips() {
        let mut recipient_secret = [0u8; 32];
        recipient_secret[31] = 7;
        let recipient_public = public_key(&recipient_secret);
        let message = b"all fleets converge on the hub";

        let envelope = encrypt(message, &recipient_public).unwrap();
        let decrypted = decrypt(&envelope, &recipient_secret).unwrap();
        assert_eq!(decrypted, message);
    }

    #[test]
    fn tampered_ciphertext_fails_the_mac() {
        let mut recipient_secret = [0u8; 32];
        recipient_secret[31] = 9;
        let recipient_public = public_key(&recipient_secret);

        let mut envelope = encrypt(b"the treasury is empty", &recipient_public).unwrap();
        let flip_at = 70;
        envelope[flip_at] ^= 0x01;
        assert!(matches!(
            decrypt(&envelope, &recipient_secret),
            Err(TransportError::MacMismatch)
        ));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut recipient_secret = [0u8; 32];
        recipient_secret[31] = 4;
        let recipient_public = public_key(&recipient_secret);
        let mut envelope = encrypt(b"hold the line", &recipient_public).unwrap();
        envelope[0] = 1;
        assert!(matches!(
            decrypt(&envelope, &recipient_secret),
            Err(TransportError::BadVersion(1))
        ));
    }

    #[test]
    fn deterministic_core_is_reproducible() {
        let ephemeral = hex32("5a4b3c2d1e0f5a4b3c2d1e0f5a4b3c2d1e0f5a4b3c2d1e0f5a4b3c2d1e0f5a4b");
        let nonce = hex32("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f");
        let mut recipient_secret = [0u8; 32];
        recipient_secret[31] = 3;
        let recipient_public = public_key(&recipient_secret);

        let a = encrypt_with(b"rendezvous at dawn", &ephemeral, &recipient_public, &nonce).unwrap();
        let b = encrypt_with(b"rendezvous at dawn", &ephemeral, &recipient_public, &nonce).unwrap();
        assert_eq!(a, b);
        assert_eq!(decrypt(&a, &recipient_secret).unwrap(), b"rendezvous at dawn");
    }
}
