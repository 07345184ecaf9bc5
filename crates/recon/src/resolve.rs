//! Latest-state resolution for append-only logs.
//!
//! A log is collapsed to one row per key: the row with the greatest ordering
//! value. Null ordering values sort after every non-null one, so they only
//! win when a key has nothing else. The sort is stable, so ties keep the
//! earliest row in input order.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{LeadLog, MembershipLog, ReferralEvent, ReferralStatusLog};

/// Collapse `rows` to the latest row per key.
///
/// Rows whose key is `None` are dropped, as are rows whose key is not in
/// `only` when a filter is given.
pub fn latest_per_key<T, K, O, F>(
    rows: Vec<T>,
    key_of: K,
    order_of: F,
    only: Option<&HashSet<String>>,
) -> Vec<T>
where
    K: Fn(&T) -> Option<&str>,
    F: Fn(&T) -> Option<O>,
    O: Ord,
{
    let mut rows: Vec<T> = rows
        .into_iter()
        .filter(|row| match (key_of(row), only) {
            (None, _) => false,
            (Some(key), Some(filter)) => filter.contains(key),
            (Some(_), None) => true,
        })
        .collect();

    rows.sort_by(|a, b| {
        key_of(a)
            .cmp(&key_of(b))
            .then_with(|| descending_nulls_last(order_of(a), order_of(b)))
    });

    // Sorted by key, so the first row of each run is the latest.
    let mut out: Vec<T> = Vec::with_capacity(rows.len());
    for row in rows {
        let is_new_key = out.last().map_or(true, |prev| key_of(prev) != key_of(&row));
        if is_new_key {
            out.push(row);
        }
    }
    out
}

fn descending_nulls_last<O: Ord>(a: Option<O>, b: Option<O>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ---------------------------------------------------------------------------
// Instantiations
// ---------------------------------------------------------------------------

/// Latest status log per referral, by `created_at`, restricted to referrals
/// that exist in the referral table.
pub fn resolve_referral_logs(
    logs: Vec<ReferralStatusLog>,
    referrals: &[ReferralEvent],
) -> Vec<ReferralStatusLog> {
    let known: HashSet<String> = referrals.iter().map(|r| r.referral_id.clone()).collect();
    let out = latest_per_key(
        logs,
        |l| l.user_referral_id.as_deref(),
        |l| l.created_at,
        Some(&known),
    );
    tracing::debug!(resolved = out.len(), "resolved referral status logs");
    out
}

/// Latest membership row per user, ordered by `membership_expired_date`.
///
/// This is a business-date ordering: the row with the furthest expiry wins
/// even if a later-written row has an earlier expiry.
pub fn resolve_user_logs(logs: Vec<MembershipLog>) -> Vec<MembershipLog> {
    let out = latest_per_key(
        logs,
        |l| l.user_id.as_deref(),
        |l| -> Option<NaiveDate> { l.membership_expired_date },
        None,
    );
    tracing::debug!(resolved = out.len(), "resolved membership logs");
    out
}

/// Latest lead row per lead, by `created_at`, restricted to leads referenced
/// as a referee. Null referee ids contribute nothing to the filter.
pub fn resolve_lead_logs(logs: Vec<LeadLog>, referrals: &[ReferralEvent]) -> Vec<LeadLog> {
    let referenced: HashSet<String> = referrals
        .iter()
        .filter_map(|r| r.referee_id.clone())
        .collect();
    let out = latest_per_key(
        logs,
        |l| l.lead_id.as_deref(),
        |l| -> Option<DateTime<Utc>> { l.created_at },
        Some(&referenced),
    );
    tracing::debug!(resolved = out.len(), "resolved lead logs");
    out
}
