use std::ops::Range;

use chrono::DateTime;

use truststore::artifact::{build, BuildRequest, EncodedArtifact};
use truststore::certificate::{decode_chains, CertificateChainInput};
use truststore::common::{TrustStoreError, TrustStoreResult};
use truststore::identity::compute_id;
use truststore::jks;
use truststore::trust_store::{Timestamp, TrustStore};

const ISRG_ROOT_X1: &str = include_str!("fixtures/isrg_root_x1.pem");
const ISRG_ROOT_X2: &str = include_str!("fixtures/isrg_root_x2.pem");
const BOTH: [&str; 2] = [ISRG_ROOT_X1, ISRG_ROOT_X2];
const TIMESTAMP: &str = "2023-11-14T22:13:20Z";

// Offsets into a single entry store
const VERSION_BYTE: usize = 7;
const COUNT: Range<usize> = 8..12;
const TAG_BYTE: usize = 15;
const CERTIFICATE_TYPE: Range<usize> = 27..34;

fn request(certificates: &[&str], password: &str, timestamp: Option<&str>) -> BuildRequest {
    BuildRequest {
        certificates: certificates.iter().map(|c| c.to_string()).collect(),
        password: password.into(),
        timestamp: timestamp.map(String::from),
    }
}

fn build_at(certificates: &[&str], password: &str) -> TrustStoreResult<EncodedArtifact> {
    build(&request(certificates, password, Some(TIMESTAMP)))
}

fn unsealed_store() -> TrustStoreResult<Vec<u8>> {
    Ok(build_at(&[ISRG_ROOT_X1], "")?.bytes)
}

fn der_of(pem_text: &str) -> Vec<u8> {
    pem::parse(pem_text).unwrap().into_contents()
}

fn is_malformed<T>(result: TrustStoreResult<T>) -> bool {
    matches!(result, Err(TrustStoreError::MalformedStore(_)))
}

#[test]
fn test_sealed_store_matches_keytool_output() -> TrustStoreResult<()> {
    let artifact = build_at(&BOTH, "changeit")?;
    assert_eq!(2018, artifact.bytes.len());
    assert_eq!("9d0f85c92894e64ef3446f4930b58b5681256f63", artifact.id);
    assert_eq!(TIMESTAMP, artifact.timestamp);
    let header: [u8; 12] = [0xfe, 0xed, 0xfe, 0xed, 0, 0, 0, 2, 0, 0, 0, 2];
    assert_eq!(header, &artifact.bytes[..12]);
    Ok(())
}

#[test]
fn test_unsealed_store_has_no_digest() -> TrustStoreResult<()> {
    let artifact = build_at(&BOTH, "")?;
    assert_eq!(1998, artifact.bytes.len());
    assert_eq!("a87dafb2c8a6d2c187ac569c9fe759574a72210b", artifact.id);
    Ok(())
}

#[test]
fn test_repeated_builds_are_identical() -> TrustStoreResult<()> {
    let reversed = [ISRG_ROOT_X2, ISRG_ROOT_X1];
    let first = build_at(&reversed, "secret")?;
    let second = build_at(&reversed, "secret")?;
    assert_eq!(first, second);
    assert_eq!(compute_id(&first.base64), first.id);
    assert_eq!(40, first.id.len());
    let lowercase_hex = |c: char| c.is_ascii_digit() || ('a'..='f').contains(&c);
    assert!(first.id.chars().all(lowercase_hex));
    Ok(())
}

#[test]
fn test_rebuild_with_returned_timestamp_reproduces_artifact() -> TrustStoreResult<()> {
    let first = build(&request(&BOTH, "", None))?;
    assert!(DateTime::parse_from_rfc3339(&first.timestamp).is_ok());
    assert!(first.timestamp.ends_with('Z'));
    let second = build(&request(&BOTH, "", Some(&first.timestamp)))?;
    assert_eq!(first.base64, second.base64);
    assert_eq!(first.id, second.id);
    assert_eq!(first.timestamp, second.timestamp);
    Ok(())
}

#[test]
fn test_timestamp_changes_identifier() -> TrustStoreResult<()> {
    let first = build_at(&[ISRG_ROOT_X1], "")?;
    let later = Some("2023-11-14T22:13:21Z");
    let second = build(&request(&[ISRG_ROOT_X1], "", later))?;
    assert_ne!(first.id, second.id);
    Ok(())
}

#[test]
fn test_order_changes_identifier() -> TrustStoreResult<()> {
    let first = build_at(&BOTH, "")?;
    let second = build_at(&[ISRG_ROOT_X2, ISRG_ROOT_X1], "")?;
    assert_ne!(first.id, second.id);
    Ok(())
}

#[test]
fn test_round_trip_recovers_certificates_in_order() -> TrustStoreResult<()> {
    let artifact = build_at(&BOTH, "changeit")?;
    let bytes = EncodedArtifact::decode_base64(&artifact.base64)?;
    let store = jks::decode(&bytes, "changeit")?;
    let aliases: Vec<_> = store.aliases().collect();
    assert_eq!(vec!["0", "1"], aliases);
    let entries = store.entries();
    assert_eq!(der_of(ISRG_ROOT_X1), entries[0].certificate.der);
    assert_eq!(der_of(ISRG_ROOT_X2), entries[1].certificate.der);
    for entry in entries {
        assert_eq!(1_700_000_000_000, entry.created_at.timestamp_millis());
    }
    Ok(())
}

#[test]
fn test_entries_are_encoded_in_position_order() -> TrustStoreResult<()> {
    let chains: Vec<&str> = BOTH.iter().copied().cycle().take(12).collect();
    let artifact = build_at(&chains, "changeit")?;
    let store = jks::decode(&artifact.bytes, "changeit")?;
    let aliases: Vec<String> = store.aliases().map(String::from).collect();
    let expected: Vec<String> = (0..12).map(|i| i.to_string()).collect();
    assert_eq!(expected, aliases);
    for (entry, chain) in store.entries().iter().zip(&chains) {
        assert_eq!(der_of(chain), entry.certificate.der);
    }
    Ok(())
}

#[test]
fn test_empty_input_is_rejected() {
    let cases = [
        ("", None),
        ("secret", Some(TIMESTAMP)),
        ("x", Some("bogus")),
    ];
    for (password, timestamp) in cases {
        let result = build(&request(&[], password, timestamp));
        assert_eq!(Err(TrustStoreError::EmptyInput), result);
    }
    let input = CertificateChainInput::new(vec![]);
    assert_eq!(Err(TrustStoreError::EmptyInput), input);
}

#[test]
fn test_password_changes_identifier() -> TrustStoreResult<()> {
    let open = build_at(&[ISRG_ROOT_X1], "")?;
    let sealed = build_at(&[ISRG_ROOT_X1], "changeit")?;
    let resealed = build_at(&[ISRG_ROOT_X1], "changeme")?;
    assert_ne!(open.base64, sealed.base64);
    assert_ne!(sealed.base64, resealed.base64);
    assert_ne!(sealed.id, resealed.id);
    Ok(())
}

#[test]
fn test_wrong_password_fails_integrity_check() -> TrustStoreResult<()> {
    let artifact = build_at(&[ISRG_ROOT_X1], "changeit")?;
    let result = jks::decode(&artifact.bytes, "changeme");
    assert_eq!(Err(TrustStoreError::IntegrityCheck), result);
    // No password skips verification
    assert_eq!(1, jks::decode(&artifact.bytes, "")?.len());
    Ok(())
}

#[test]
fn test_unsealed_store_with_password_fails_integrity_check() -> TrustStoreResult<()> {
    let bytes = unsealed_store()?;
    let result = jks::decode(&bytes, "changeit");
    assert_eq!(Err(TrustStoreError::IntegrityCheck), result);
    Ok(())
}

#[test]
fn test_multiple_blocks_get_contiguous_aliases() -> TrustStoreResult<()> {
    let bundle = format!("{ISRG_ROOT_X1}\n{ISRG_ROOT_X2}");
    let chains = vec![bundle, ISRG_ROOT_X2.to_string()];
    let certificates = decode_chains(&CertificateChainInput::new(chains)?)?;
    let positions: Vec<_> = certificates.iter().map(|c| c.position).collect();
    assert_eq!(vec![0, 1, 2], positions);

    let timestamp = Timestamp::resolve(Some(TIMESTAMP));
    let store = TrustStore::build(certificates, timestamp.value, "")?;
    let aliases: Vec<_> = store.aliases().collect();
    assert_eq!(vec!["0", "1", "2"], aliases);
    let der = |alias: &str| store.get(alias).map(|e| e.certificate.der.clone());
    assert_eq!(Some(der_of(ISRG_ROOT_X1)), der("0"));
    assert_eq!(Some(der_of(ISRG_ROOT_X2)), der("1"));
    assert_eq!(Some(der_of(ISRG_ROOT_X2)), der("2"));
    Ok(())
}

#[test]
fn test_chain_without_block_is_rejected() {
    let result = build(&request(&[ISRG_ROOT_X1, "not a certificate"], "", None));
    match result {
        Err(TrustStoreError::Decode(reason)) => assert!(reason.starts_with("chain 1")),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_unexpected_block_type_is_rejected() {
    let key = pem::encode(&pem::Pem::new("PRIVATE KEY", vec![1, 2, 3]));
    let result = build(&request(&[key.as_str()], "", None));
    assert!(matches!(result, Err(TrustStoreError::Decode(_))));
}

#[test]
fn test_malformed_block_is_rejected() {
    let broken = "-----BEGIN CERTIFICATE-----\n!!!!\n-----END CERTIFICATE-----\n";
    let result = build(&request(&[broken], "", None));
    assert!(matches!(result, Err(TrustStoreError::Decode(_))));
}

#[test]
fn test_truncated_buffer_fails_serialization() -> TrustStoreResult<()> {
    let input = CertificateChainInput::new(vec![ISRG_ROOT_X1.to_string()])?;
    let timestamp = Timestamp::resolve(Some(TIMESTAMP));
    let store = TrustStore::build(decode_chains(&input)?, timestamp.value, "changeit")?;
    let mut buffer = [0u8; 64];
    let result = jks::write_to(&store, &mut buffer[..]);
    assert!(matches!(result, Err(TrustStoreError::Serialization(_))));
    Ok(())
}

#[test]
fn test_truncated_store_is_malformed() -> TrustStoreResult<()> {
    let bytes = unsealed_store()?;
    assert!(is_malformed(jks::decode(&bytes[..bytes.len() - 10], "")));
    let mut bad_magic = bytes.clone();
    bad_magic[0] = 0;
    assert!(is_malformed(jks::decode(&bad_magic, "")));
    Ok(())
}

#[test]
fn test_version_1_store_has_no_certificate_type() -> TrustStoreResult<()> {
    let mut bytes = unsealed_store()?;
    bytes[VERSION_BYTE] = 1;
    bytes.drain(CERTIFICATE_TYPE);
    let store = jks::decode(&bytes, "")?;
    assert_eq!(vec!["0"], store.aliases().collect::<Vec<_>>());
    let entries = store.entries();
    assert_eq!(der_of(ISRG_ROOT_X1), entries[0].certificate.der);
    Ok(())
}

#[test]
fn test_private_key_entry_is_rejected() -> TrustStoreResult<()> {
    let mut bytes = unsealed_store()?;
    bytes[TAG_BYTE] = 1;
    let result = jks::decode(&bytes, "");
    let reason = "private key entries are not supported".to_string();
    assert_eq!(Err(TrustStoreError::MalformedStore(reason)), result);
    Ok(())
}

#[test]
fn test_unknown_entry_tag_is_rejected() -> TrustStoreResult<()> {
    let mut bytes = unsealed_store()?;
    bytes[TAG_BYTE] = 9;
    assert!(is_malformed(jks::decode(&bytes, "")));
    Ok(())
}

#[test]
fn test_unsupported_certificate_type_is_rejected() -> TrustStoreResult<()> {
    let mut bytes = unsealed_store()?;
    let type_name = &bytes[CERTIFICATE_TYPE.start + 2..CERTIFICATE_TYPE.end];
    assert_eq!(b"X.509", type_name);
    bytes[CERTIFICATE_TYPE.end - 1] = b'8';
    assert!(is_malformed(jks::decode(&bytes, "")));
    Ok(())
}

#[test]
fn test_unexpected_trailer_is_malformed() -> TrustStoreResult<()> {
    let mut bytes = unsealed_store()?;
    bytes.extend_from_slice(&[0; 7]);
    assert!(is_malformed(jks::decode(&bytes, "")));
    assert!(is_malformed(jks::decode(&bytes, "changeit")));

    let mut sealed = build_at(&[ISRG_ROOT_X1], "changeit")?.bytes;
    sealed.push(0);
    assert!(is_malformed(jks::decode(&sealed, "changeit")));
    Ok(())
}

#[test]
fn test_oversized_entry_count_is_malformed() -> TrustStoreResult<()> {
    let mut bytes = unsealed_store()?;
    bytes[COUNT].copy_from_slice(&u32::MAX.to_be_bytes());
    assert!(is_malformed(jks::decode(&bytes, "")));
    Ok(())
}

#[test]
fn test_certificate_summary() -> TrustStoreResult<()> {
    let input = CertificateChainInput::new(vec![ISRG_ROOT_X1.to_string()])?;
    let certificates = decode_chains(&input)?;
    let certificate = &certificates[0];
    let fingerprint = "CA:BD:2A:79:A1:07:6A:31:F2:1D:25:36:35:CB:03:9D:43:29:A5:E8";
    assert_eq!(fingerprint, certificate.fingerprint());
    let subject = certificate.subject_common_name();
    assert_eq!(Some("ISRG Root X1"), subject.as_deref());
    Ok(())
}
