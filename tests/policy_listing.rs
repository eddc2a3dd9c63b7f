//! Integration tests for the public listing pipeline: raw registry tuples
//! in, classified and ordered policies out.

use flareinsure_backend::models::{PolicyRecord, PolicyStatus};
use flareinsure_backend::registry::codec::{decode_policy, DecodeOutcome};
use flareinsure_backend::registry::status::classify_and_sort;

const NOW: i64 = 1_750_000_000;

/// Build the 9-word ABI tuple by hand, the way the contract returns it.
fn tuple(
    insurer_byte: u8,
    finalized: bool,
    paid_out: bool,
    coverage: u128,
    premium: u128,
    maturity: i64,
    deadline: i64,
    deposit: u128,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(288);
    // insurer / policyholder: low 20 bytes of the word; a single repeated
    // byte keeps the fixture readable.
    for addr_byte in [insurer_byte, 0xbb] {
        out.extend_from_slice(&[0u8; 12]);
        out.extend_from_slice(&[addr_byte; 20]);
    }
    let mut word = |value: u128| {
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&value.to_be_bytes());
    };
    word(finalized as u128);
    word(paid_out as u128);
    word(coverage);
    word(premium);
    word(maturity as u128);
    word(deadline as u128);
    word(deposit);
    out
}

#[test]
fn raw_tuple_round_trips_into_a_named_record() {
    let bytes = tuple(0xaa, true, false, 1_000, 50, NOW + 100, NOW - 100, 1_000);
    let DecodeOutcome::Record(record) = decode_policy(4, &bytes) else {
        panic!("expected a record");
    };
    assert_eq!(record.id, 4);
    assert_eq!(record.insurer, format!("0x{}", "aa".repeat(20)));
    assert!(record.is_finalized);
    assert!(!record.is_paid_out);
    assert_eq!(record.coverage, 1_000);
    assert_eq!(record.maturity_second, NOW + 100);
}

#[test]
fn zero_insurer_terminates_the_listing() {
    let bytes = tuple(0x00, false, false, 0, 0, 0, 0, 0);
    assert_eq!(decode_policy(1, &bytes), DecodeOutcome::Sentinel);
}

#[test]
fn truncated_tuple_is_malformed() {
    let bytes = tuple(0xaa, false, false, 1, 1, NOW, NOW, 1);
    assert!(matches!(
        decode_policy(1, &bytes[..bytes.len() - 32]),
        DecodeOutcome::Malformed { len: 256 }
    ));
}

#[test]
fn decoded_records_classify_and_order_for_display() {
    let records: Vec<PolicyRecord> = [
        tuple(0xaa, true, true, 1_000, 50, NOW - 500, NOW - 500, 1_000), // settled
        tuple(0xaa, true, false, 1_000, 50, NOW - 1, NOW - 500, 1_000),  // claimable
        tuple(0xaa, false, false, 1_000, 50, NOW + 900, NOW + 900, 1_000), // purchasable
        tuple(0xaa, true, false, 1_000, 50, NOW + 900, NOW - 500, 1_000), // active
    ]
    .iter()
    .enumerate()
    .map(|(i, bytes)| match decode_policy(i as u64 + 1, bytes) {
        DecodeOutcome::Record(r) => r,
        other => panic!("expected record, got {:?}", other),
    })
    .collect();

    let listed = classify_and_sort(&records, NOW);
    let statuses: Vec<PolicyStatus> = listed.iter().map(|p| p.status).collect();
    assert_eq!(
        statuses,
        vec![
            PolicyStatus::Claimable,
            PolicyStatus::Active,
            PolicyStatus::Purchasable,
            PolicyStatus::Settled,
        ]
    );
    let ids: Vec<u64> = listed.iter().map(|p| p.record.id).collect();
    assert_eq!(ids, vec![2, 4, 3, 1]);

    // Enable flags mirror the dispatcher's predicates.
    assert!(listed[0].claim_enabled);
    assert!(listed[2].purchase_enabled);
    assert!(!listed[3].purchase_enabled && !listed[3].claim_enabled);
}

#[test]
fn wei_scale_amounts_serialize_as_strings() {
    let bytes = tuple(
        0xaa,
        false,
        false,
        1_000_000_000_000_000_000_000, // 1000 FLR, past u64::MAX
        50_000_000_000_000_000_000,
        NOW + 100,
        NOW + 100,
        1_000_000_000_000_000_000_000,
    );
    let DecodeOutcome::Record(record) = decode_policy(1, &bytes) else {
        panic!("expected a record");
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["coverage"], "1000000000000000000000");
    assert_eq!(json["premium"], "50000000000000000000");
}
