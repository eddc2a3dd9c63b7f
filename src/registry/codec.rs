//! ABI codec for the insurance registry contract.
//!
//! `getPolicy(uint256)` returns a fixed-order 9-field tuple as nine 32-byte
//! words: (insurer, policyholder, isFinalized, isPaidOut, coverage, premium,
//! maturitySecond, purchaseDeadline, deposit). The decoder maps the
//! positional words into a named [`PolicyRecord`] and never trusts the shape:
//! a wrong word count is reported as `Malformed`, not a panic.

use crate::models::PolicyRecord;

/// getPolicy(uint256) selector: 0x2b07fce3
pub const GET_POLICY: [u8; 4] = [0x2b, 0x07, 0xfc, 0xe3];
/// purchasePolicy(uint256) selector: 0xc1260c9a
pub const PURCHASE_POLICY: [u8; 4] = [0xc1, 0x26, 0x0c, 0x9a];
/// settle(uint256) selector: 0x8df82800
pub const SETTLE: [u8; 4] = [0x8d, 0xf8, 0x28, 0x00];

const WORD: usize = 32;
const TUPLE_WORDS: usize = 9;

/// Outcome of decoding one registry response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Record(PolicyRecord),
    /// Zero-address insurer: end of the populated id range.
    Sentinel,
    /// Wrong word count. The scan skips this id and continues.
    Malformed { len: usize },
}

/// Build `0x`-prefixed call data: 4-byte selector + 32-byte big-endian id.
pub fn encode_call(selector: [u8; 4], id: u64) -> String {
    let mut data = Vec::with_capacity(4 + WORD);
    data.extend_from_slice(&selector);
    data.extend_from_slice(&[0u8; WORD - 8]);
    data.extend_from_slice(&id.to_be_bytes());
    format!("0x{}", hex::encode(data))
}

/// Decode the raw `eth_call` bytes for one policy id.
pub fn decode_policy(id: u64, bytes: &[u8]) -> DecodeOutcome {
    if bytes.len() != WORD * TUPLE_WORDS {
        return DecodeOutcome::Malformed { len: bytes.len() };
    }

    let word = |i: usize| &bytes[i * WORD..(i + 1) * WORD];

    let insurer_word = word(0);
    if insurer_word.iter().all(|&b| b == 0) {
        return DecodeOutcome::Sentinel;
    }

    DecodeOutcome::Record(PolicyRecord {
        id,
        insurer: address(insurer_word),
        policyholder: address(word(1)),
        is_finalized: boolean(word(2)),
        is_paid_out: boolean(word(3)),
        coverage: amount(word(4)),
        premium: amount(word(5)),
        maturity_second: seconds(word(6)),
        purchase_deadline: seconds(word(7)),
        deposit: amount(word(8)),
    })
}

/// Address is the low 20 bytes of the word, rendered as lowercase hex.
fn address(word: &[u8]) -> String {
    format!("0x{}", hex::encode(&word[12..32]))
}

fn boolean(word: &[u8]) -> bool {
    word[31] != 0
}

/// Amounts fit u128 in practice (low 16 bytes of the word), same treatment
/// the Chainlink aggregator answer gets.
fn amount(word: &[u8]) -> u128 {
    u128::from_be_bytes(word[16..32].try_into().unwrap_or([0; 16]))
}

/// Unix timestamps in whole seconds, low 8 bytes of the word.
fn seconds(word: &[u8]) -> i64 {
    i64::from_be_bytes(word[24..32].try_into().unwrap_or([0; 8]))
}

/// Test-only inverse of [`decode_policy`], used by mock transports.
#[cfg(test)]
pub fn encode_policy(record: &PolicyRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(WORD * TUPLE_WORDS);
    push_address(&mut out, &record.insurer);
    push_address(&mut out, &record.policyholder);
    push_u128(&mut out, record.is_finalized as u128);
    push_u128(&mut out, record.is_paid_out as u128);
    push_u128(&mut out, record.coverage);
    push_u128(&mut out, record.premium);
    push_u128(&mut out, record.maturity_second as u128);
    push_u128(&mut out, record.purchase_deadline as u128);
    push_u128(&mut out, record.deposit);
    out
}

#[cfg(test)]
fn push_address(out: &mut Vec<u8>, addr: &str) {
    let raw = hex::decode(addr.trim_start_matches("0x")).unwrap_or_default();
    out.extend_from_slice(&[0u8; 12]);
    let mut padded = [0u8; 20];
    let n = raw.len().min(20);
    padded[20 - n..].copy_from_slice(&raw[raw.len() - n..]);
    out.extend_from_slice(&padded);
}

#[cfg(test)]
fn push_u128(out: &mut Vec<u8>, value: u128) {
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ZERO_ADDRESS;

    fn sample_record() -> PolicyRecord {
        PolicyRecord {
            id: 7,
            insurer: "0x1111111111111111111111111111111111111111".to_string(),
            policyholder: "0x2222222222222222222222222222222222222222".to_string(),
            is_finalized: true,
            is_paid_out: false,
            coverage: 1_000_000_000_000_000_000_000, // 1000 FLR
            premium: 50_000_000_000_000_000_000,
            maturity_second: 1_760_000_000,
            purchase_deadline: 1_755_000_000,
            deposit: 1_000_000_000_000_000_000_000,
        }
    }

    #[test]
    fn decodes_well_formed_tuple() {
        let record = sample_record();
        let bytes = encode_policy(&record);
        assert_eq!(bytes.len(), 288);
        assert_eq!(decode_policy(7, &bytes), DecodeOutcome::Record(record));
    }

    #[test]
    fn zero_insurer_is_sentinel() {
        let mut record = sample_record();
        record.insurer = ZERO_ADDRESS.to_string();
        let bytes = encode_policy(&record);
        assert_eq!(decode_policy(7, &bytes), DecodeOutcome::Sentinel);
    }

    #[test]
    fn wrong_word_count_is_malformed_not_panic() {
        let bytes = encode_policy(&sample_record());
        assert_eq!(
            decode_policy(1, &bytes[..256]),
            DecodeOutcome::Malformed { len: 256 }
        );
        assert_eq!(decode_policy(1, &[]), DecodeOutcome::Malformed { len: 0 });
        // Correct length plus a trailing byte is also not a 9-word tuple.
        let mut long = bytes.clone();
        long.push(0);
        assert_eq!(
            decode_policy(1, &long),
            DecodeOutcome::Malformed { len: 289 }
        );
    }

    #[test]
    fn call_data_layout() {
        let data = encode_call(GET_POLICY, 3);
        assert_eq!(
            data,
            "0x2b07fce30000000000000000000000000000000000000000000000000000000000000003"
        );
    }

    #[test]
    fn nonzero_bool_word_decodes_true() {
        let mut record = sample_record();
        record.is_finalized = false;
        let mut bytes = encode_policy(&record);
        bytes[2 * 32 + 31] = 0x02; // nonstandard but truthy
        match decode_policy(7, &bytes) {
            DecodeOutcome::Record(r) => assert!(r.is_finalized),
            other => panic!("expected record, got {:?}", other),
        }
    }
}
