//! Policy status classification and display ordering.
//!
//! Pure functions of (record, now). `now` is injected Unix seconds, the
//! same unit the ledger stamps on policies. Milliseconds here would silently
//! misclassify every record.

use crate::models::{ClassifiedPolicy, PolicyRecord, PolicyStatus};

/// Assign exactly one lifecycle category. An unfinalized policy stays in the
/// purchasable bucket even past its deadline; the deadline gates
/// [`purchase_enabled`], not the category.
pub fn classify(record: &PolicyRecord, now: i64) -> PolicyStatus {
    if !record.is_finalized {
        return PolicyStatus::Purchasable;
    }
    if record.is_paid_out {
        return PolicyStatus::Settled;
    }
    if record.maturity_second <= now {
        PolicyStatus::Claimable
    } else {
        PolicyStatus::Active
    }
}

/// Shared purchase predicate. Both the listing's "Buy" flag and the
/// dispatcher's fail-fast check call this, so they cannot diverge.
pub fn purchase_enabled(record: &PolicyRecord, now: i64) -> bool {
    !record.is_finalized && record.purchase_deadline > now
}

/// Shared claim predicate, same contract as [`purchase_enabled`].
pub fn claim_enabled(record: &PolicyRecord, now: i64) -> bool {
    record.is_finalized && !record.is_paid_out && record.maturity_second <= now
}

/// Classify a fetched list and order it for display: claimable first, then
/// active, purchasable, settled. The sort is stable, so equal ranks keep
/// their ascending-id fetch order.
pub fn classify_and_sort(records: &[PolicyRecord], now: i64) -> Vec<ClassifiedPolicy> {
    let mut out: Vec<ClassifiedPolicy> = records
        .iter()
        .map(|record| {
            let status = classify(record, now);
            ClassifiedPolicy {
                record: record.clone(),
                status,
                rank: status.rank(),
                purchase_enabled: purchase_enabled(record, now),
                claim_enabled: claim_enabled(record, now),
            }
        })
        .collect();
    out.sort_by_key(|p| p.rank);
    out
}
