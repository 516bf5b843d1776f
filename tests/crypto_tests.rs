//! Integration tests for the CryptStore crypto module.

use cryptstore::crypto::padding::{pad, unpad};
use cryptstore::crypto::{CbcHmacCryptor, CipherMode, Cryptor, GcmCryptor, MacAlgorithm};
use cryptstore::errors::{CryptStoreError, KeyRole};

const ENC: &[u8] = b"0123456789abcdef";
const INT: &[u8] = b"integrity-key-0123";

fn cryptors() -> Vec<(&'static str, Box<dyn Cryptor>)> {
    vec![
        (
            "cbc-hmac/sha256",
            Box::new(CbcHmacCryptor::new(ENC, INT, MacAlgorithm::Sha256).unwrap()),
        ),
        (
            "cbc-hmac/sha512",
            Box::new(CbcHmacCryptor::new(ENC, INT, MacAlgorithm::Sha512).unwrap()),
        ),
        ("gcm", Box::new(GcmCryptor::new(ENC).unwrap())),
    ]
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    let messages: [&[u8]; 4] = [b"", b"x", b"exactly sixteen!", &[0xAB; 1000]];
    let ads: [&[u8]; 3] = [b"", b"header", &[7u8; 300]];

    for (name, c) in cryptors() {
        for m in messages {
            for ad in ads {
                let package = c.encrypt(m, ad).expect("encrypt should succeed");
                let (plain, back) = c.decrypt(&package).expect("decrypt should succeed");
                assert_eq!(plain, m, "{name}: message mismatch");
                assert_eq!(back, ad, "{name}: additional data mismatch");
            }
        }
    }
}

#[test]
fn all_aes_key_sizes_work_for_both_modes() {
    let key = b"0123456789abcdef0123456789abcdef";
    for len in [16usize, 24, 32] {
        for mode in [CipherMode::CbcHmac, CipherMode::Gcm] {
            let c = mode
                .cryptor(&key[..len], INT, MacAlgorithm::Sha256)
                .unwrap();
            let package = c.encrypt(b"value", b"").unwrap();
            assert_eq!(c.decrypt(&package).unwrap().0, b"value");
        }
    }
}

// ---------------------------------------------------------------------------
// Non-determinism
// ---------------------------------------------------------------------------

#[test]
fn packages_are_pairwise_distinct() {
    for (name, c) in cryptors() {
        let packages: Vec<Vec<u8>> = (0..12)
            .map(|_| c.encrypt(b"same plaintext", b"same ad").unwrap())
            .collect();
        for i in 0..packages.len() {
            for j in (i + 1)..packages.len() {
                assert_ne!(packages[i], packages[j], "{name}: packages {i} and {j} match");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tamper detection
// ---------------------------------------------------------------------------

#[test]
fn flipping_any_byte_is_detected() {
    for (name, c) in cryptors() {
        let package = c.encrypt(b"attack at dawn", b"ad").unwrap();
        for i in 0..package.len() {
            let mut tampered = package.clone();
            tampered[i] ^= 0x01;
            assert!(
                c.decrypt(&tampered).is_err(),
                "{name}: flipping byte {i} went unnoticed"
            );
        }
    }
}

#[test]
fn payload_tampering_reports_integrity_error() {
    for (name, c) in cryptors() {
        let mut package = c.encrypt(b"attack at dawn", b"").unwrap();
        let last = package.len() - 1;
        package[last] ^= 0x80;
        assert!(
            matches!(c.decrypt(&package), Err(CryptStoreError::IntegrityCompromised)),
            "{name}: wrong error kind"
        );
    }
}

#[test]
fn truncated_packages_fail() {
    for (name, c) in cryptors() {
        let package = c.encrypt(b"hello", b"").unwrap();
        for len in 0..package.len() {
            assert!(c.decrypt(&package[..len]).is_err(), "{name}: prefix {len} decrypted");
        }
    }
}

#[test]
fn decrypt_with_wrong_keys_fails() {
    let package = CbcHmacCryptor::new(ENC, INT, MacAlgorithm::Sha256)
        .unwrap()
        .encrypt(b"secret", b"")
        .unwrap();
    let other = CbcHmacCryptor::new(ENC, b"another-integrity-key", MacAlgorithm::Sha256).unwrap();
    assert!(matches!(
        other.decrypt(&package),
        Err(CryptStoreError::IntegrityCompromised)
    ));

    let package = GcmCryptor::new(ENC).unwrap().encrypt(b"secret", b"").unwrap();
    let other = GcmCryptor::new(b"fedcba9876543210").unwrap();
    assert!(other.decrypt(&package).is_err());
}

// ---------------------------------------------------------------------------
// Key validation
// ---------------------------------------------------------------------------

#[test]
fn short_keys_are_rejected() {
    assert!(matches!(
        CbcHmacCryptor::new(b"short", INT, MacAlgorithm::Sha256),
        Err(CryptStoreError::KeyTooShort {
            role: KeyRole::Encryption,
            ..
        })
    ));
    assert!(matches!(
        CbcHmacCryptor::new(ENC, b"short", MacAlgorithm::Sha256),
        Err(CryptStoreError::KeyTooShort {
            role: KeyRole::Integrity,
            ..
        })
    ));
    assert!(matches!(
        GcmCryptor::new(b"0123456789abcde"),
        Err(CryptStoreError::KeyTooShort { .. })
    ));
}

#[test]
fn equal_keys_are_rejected() {
    assert!(matches!(
        CbcHmacCryptor::new(ENC, ENC, MacAlgorithm::Sha256),
        Err(CryptStoreError::KeysMustDiffer)
    ));
}

#[test]
fn odd_key_lengths_are_unsupported() {
    assert!(matches!(
        GcmCryptor::new(&[1u8; 20]),
        Err(CryptStoreError::UnsupportedKeyLength { len: 20, .. })
    ));
}

#[test]
fn oversized_additional_data_is_rejected() {
    let ad = vec![0u8; 65_536];
    for (_, c) in cryptors() {
        assert!(matches!(
            c.encrypt(b"m", &ad),
            Err(CryptStoreError::AdditionalDataTooLarge(65_536))
        ));
    }
}

// ---------------------------------------------------------------------------
// Padding
// ---------------------------------------------------------------------------

#[test]
fn padding_edge_cases() {
    assert_eq!(pad(0, 16).unwrap(), vec![16u8; 16]);
    assert_eq!(pad(16, 16).unwrap(), vec![16u8; 16]);
    assert_eq!(pad(15, 16).unwrap(), vec![1u8]);

    let mut block = b"abc".to_vec();
    block.extend(pad(3, 16).unwrap());
    assert_eq!(unpad(&block).unwrap(), 3);

    assert!(matches!(unpad(&[]), Err(CryptStoreError::EmptyInput)));
    assert!(matches!(unpad(&[0u8; 16]), Err(CryptStoreError::PaddingInvalid)));
    assert!(matches!(unpad(&[17u8; 16]), Err(CryptStoreError::PaddingInvalid)));
    assert!(pad(3, 0).is_err());
}

#[test]
fn block_aligned_message_gets_a_full_padding_block() {
    let c = CbcHmacCryptor::new(ENC, INT, MacAlgorithm::Sha256).unwrap();
    let aligned = c.encrypt(&[0x41; 32], b"").unwrap();
    let short = c.encrypt(&[0x41; 31], b"").unwrap();
    assert_eq!(aligned.len(), short.len() + 16);
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

#[test]
fn signatures_verify_and_reject() {
    for mac in [MacAlgorithm::Sha256, MacAlgorithm::Sha512] {
        let tag = mac.sign(INT, b"message").unwrap();
        assert_eq!(tag.len(), mac.output_len());
        assert!(mac.verify(&tag, INT, b"message").is_ok());
        assert!(matches!(
            mac.verify(&tag, INT, b"massage"),
            Err(CryptStoreError::SignatureInvalid)
        ));
        assert!(mac.verify(&tag[..tag.len() - 1], INT, b"message").is_err());
    }
}
