//! Ethereum-style signing primitives shared by the wallet-signed venues:
//! keccak-256, address derivation, minimal ABI encoding, EIP-191 personal
//! messages and EIP-712 typed-data digests. Signatures are recoverable
//! secp256k1 signatures serialized as `r ‖ s ‖ v` with `v ∈ {27, 28}`.

use crate::core::errors::ExchangeError;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

pub type Address = [u8; 20];
pub type Hash32 = [u8; 32];

pub fn keccak256(data: &[u8]) -> Hash32 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// Parse a hex private key (with or without `0x`)
pub fn parse_private_key(private_key: &str) -> Result<SecretKey, ExchangeError> {
    let trimmed = private_key.trim().trim_start_matches("0x");
    if trimmed.is_empty() {
        return Err(ExchangeError::credential("Private key is empty"));
    }
    let bytes = Zeroizing::new(
        hex::decode(trimmed)
            .map_err(|e| ExchangeError::credential(format!("Invalid private key hex: {}", e)))?,
    );
    SecretKey::from_slice(&bytes)
        .map_err(|e| ExchangeError::credential(format!("Invalid private key: {}", e)))
}

pub fn parse_address(address: &str) -> Result<Address, ExchangeError> {
    let trimmed = address.trim().trim_start_matches("0x");
    let bytes = hex::decode(trimmed)
        .map_err(|e| ExchangeError::credential(format!("Invalid address '{}': {}", address, e)))?;
    bytes.try_into().map_err(|_| {
        ExchangeError::credential(format!("Address '{}' is not 20 bytes", address))
    })
}

pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let public_key_bytes = public_key.serialize_uncompressed();

    // Drop the 0x04 prefix of the uncompressed encoding
    let hash = keccak256(&public_key_bytes[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

pub fn address_of(secret_key: &SecretKey) -> Address {
    let secp = Secp256k1::signing_only();
    public_key_to_address(&PublicKey::from_secret_key(&secp, secret_key))
}

/// Sign a 32-byte digest, returning `r ‖ s ‖ v`
pub fn sign_digest(secret_key: &SecretKey, digest: &Hash32) -> Result<[u8; 65], ExchangeError> {
    let secp = Secp256k1::signing_only();
    let message = Message::from_digest_slice(digest)
        .map_err(|e| ExchangeError::credential(format!("Failed to create message: {}", e)))?;

    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();

    let mut signature = [0u8; 65];
    signature[..64].copy_from_slice(&compact);
    signature[64] = 27 + recovery_id.to_i32() as u8;
    Ok(signature)
}

/// Recover the signing address from an `r ‖ s ‖ v` signature
pub fn recover_address(digest: &Hash32, signature: &[u8; 65]) -> Result<Address, ExchangeError> {
    let secp = Secp256k1::verification_only();
    let v = i32::from(signature[64]);
    let recovery_id = RecoveryId::from_i32(if v >= 27 { v - 27 } else { v })
        .map_err(|e| ExchangeError::credential(format!("Invalid recovery id: {}", e)))?;
    let recoverable = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|e| ExchangeError::credential(format!("Invalid signature: {}", e)))?;
    let message = Message::from_digest_slice(digest)
        .map_err(|e| ExchangeError::credential(format!("Failed to create message: {}", e)))?;
    let public_key = secp
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| ExchangeError::credential(format!("Signature recovery failed: {}", e)))?;
    Ok(public_key_to_address(&public_key))
}

/// EIP-191 personal message digest: `keccak("\x19Ethereum Signed Message:\n" ‖ len ‖ message)`
pub fn personal_message_hash(message: &[u8]) -> Hash32 {
    let mut data = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    data.extend_from_slice(message);
    keccak256(&data)
}

/// ABI value for the static/dynamic types the venues need
#[derive(Debug, Clone)]
pub enum AbiToken {
    String(String),
    Address(Address),
    Uint(u128),
    FixedBytes(Hash32),
}

fn word_from_u128(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// `abi.encode(tokens...)` for a flat tuple
pub fn abi_encode(tokens: &[AbiToken]) -> Vec<u8> {
    let head_size = tokens.len() * 32;
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            AbiToken::String(value) => {
                head.extend_from_slice(&word_from_u128((head_size + tail.len()) as u128));
                let bytes = value.as_bytes();
                tail.extend_from_slice(&word_from_u128(bytes.len() as u128));
                tail.extend_from_slice(bytes);
                let padding = (32 - bytes.len() % 32) % 32;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
            AbiToken::Address(address) => {
                let mut word = [0u8; 32];
                word[12..].copy_from_slice(address);
                head.extend_from_slice(&word);
            }
            AbiToken::Uint(value) => head.extend_from_slice(&word_from_u128(*value)),
            AbiToken::FixedBytes(bytes) => head.extend_from_slice(bytes),
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// EIP-712 domain separator for `EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)`
pub fn eip712_domain_separator(
    name: &str,
    version: &str,
    chain_id: u64,
    verifying_contract: &Address,
) -> Hash32 {
    let type_hash = keccak256(
        b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
    );
    keccak256(&abi_encode(&[
        AbiToken::FixedBytes(type_hash),
        AbiToken::FixedBytes(keccak256(name.as_bytes())),
        AbiToken::FixedBytes(keccak256(version.as_bytes())),
        AbiToken::Uint(u128::from(chain_id)),
        AbiToken::Address(*verifying_contract),
    ]))
}

/// `keccak(0x1901 ‖ domain_separator ‖ struct_hash)`
pub fn eip712_signing_hash(domain_separator: &Hash32, struct_hash: &Hash32) -> Hash32 {
    let mut data = Vec::with_capacity(66);
    data.extend_from_slice(&[0x19, 0x01]);
    data.extend_from_slice(domain_separator);
    data.extend_from_slice(struct_hash);
    keccak256(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Widely published example key; never funded.
    const TEST_PRIVATE_KEY: &str =
        "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_address_derivation() {
        let key = parse_private_key(TEST_PRIVATE_KEY).unwrap();
        assert_eq!(
            format_address(&address_of(&key)),
            "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23"
        );
    }

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_invalid_private_key() {
        assert!(matches!(
            parse_private_key(""),
            Err(ExchangeError::CredentialError(_))
        ));
        assert!(matches!(
            parse_private_key("0xzz"),
            Err(ExchangeError::CredentialError(_))
        ));
    }

    #[test]
    fn test_sign_and_recover() {
        let key = parse_private_key(TEST_PRIVATE_KEY).unwrap();
        let digest = personal_message_hash(b"hello");
        let signature = sign_digest(&key, &digest).unwrap();
        assert!(signature[64] == 27 || signature[64] == 28);
        assert_eq!(recover_address(&digest, &signature).unwrap(), address_of(&key));
    }

    #[test]
    fn test_abi_encode_dynamic_string_layout() {
        let user = [0x11u8; 20];
        let encoded = abi_encode(&[
            AbiToken::String("abc".to_string()),
            AbiToken::Address(user),
            AbiToken::Uint(7),
        ]);
        // 3 head words + length word + one padded data word
        assert_eq!(encoded.len(), 5 * 32);
        assert_eq!(encoded[31], 0x60); // offset of the string payload
        assert_eq!(&encoded[44..64], &user);
        assert_eq!(encoded[95], 7);
        assert_eq!(encoded[127], 3);
        assert_eq!(&encoded[128..131], b"abc");
        assert!(encoded[131..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_abi_encode_exact_multiple_has_no_padding() {
        let text = "a".repeat(32);
        let encoded = abi_encode(&[AbiToken::String(text)]);
        assert_eq!(encoded.len(), 3 * 32);
    }
}
