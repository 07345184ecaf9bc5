//! Master join: six ordered left-outer-joins against the referral spine.
//!
//! No referral is ever dropped. A referral whose key is null, or has no
//! match, keeps an empty slot for that entity. A right-hand key that occurs
//! more than once fans the referral out once per match; duplicates are
//! reported and, under `DuplicatePolicy::Error`, rejected before joining.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::config::DuplicatePolicy;
use crate::error::ReconError;
use crate::model::{
    LeadProfile, MasterRow, PaidTransaction, ReferralEvent, ReferralStatus, ReferralStatusLog,
    ReferrerProfile, RewardDefinition,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinName {
    StatusLog,
    Status,
    Reward,
    Transaction,
    Referrer,
    Lead,
}

impl std::fmt::Display for JoinName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StatusLog => write!(f, "status_log"),
            Self::Status => write!(f, "status"),
            Self::Reward => write!(f, "reward"),
            Self::Transaction => write!(f, "transaction"),
            Self::Referrer => write!(f, "referrer"),
            Self::Lead => write!(f, "lead"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateKey {
    pub join: JoinName,
    pub key: String,
    pub count: usize,
}

/// Right-hand sides of the join, already resolved and projected.
#[derive(Debug, Clone, Default)]
pub struct JoinSources {
    pub status_logs: Vec<ReferralStatusLog>,
    pub statuses: Vec<ReferralStatus>,
    pub rewards: Vec<RewardDefinition>,
    pub transactions: Vec<PaidTransaction>,
    pub referrers: Vec<ReferrerProfile>,
    pub leads: Vec<LeadProfile>,
}

#[derive(Debug)]
pub struct JoinOutput {
    pub rows: Vec<MasterRow>,
    pub duplicates: Vec<DuplicateKey>,
}

/// Build one `MasterRow` per referral (per match, on fan-out).
pub fn assemble(
    referrals: Vec<ReferralEvent>,
    sources: &JoinSources,
    policy: DuplicatePolicy,
) -> Result<JoinOutput, ReconError> {
    let mut duplicates = Vec::new();

    let status_logs = index(JoinName::StatusLog, &sources.status_logs, |l| l.user_referral_id.as_deref(), &mut duplicates);
    let statuses = index(JoinName::Status, &sources.statuses, |s| Some(s.id.as_str()), &mut duplicates);
    let rewards = index(JoinName::Reward, &sources.rewards, |r| Some(r.id.as_str()), &mut duplicates);
    let transactions = index(JoinName::Transaction, &sources.transactions, |t| Some(t.transaction_id.as_str()), &mut duplicates);
    let referrers = index(JoinName::Referrer, &sources.referrers, |p| Some(p.user_id.as_str()), &mut duplicates);
    let leads = index(JoinName::Lead, &sources.leads, |p| Some(p.lead_id.as_str()), &mut duplicates);

    if !duplicates.is_empty() {
        match policy {
            DuplicatePolicy::Error => return Err(ReconError::DuplicateKeys(duplicates)),
            DuplicatePolicy::Warn => {
                for dup in &duplicates {
                    tracing::warn!(
                        join = %dup.join,
                        key = %dup.key,
                        count = dup.count,
                        "duplicate join key; referral rows will fan out"
                    );
                }
            }
        }
    }

    let spine = referrals.len();
    let rows: Vec<MasterRow> = referrals.into_iter().map(MasterRow::new).collect();

    let rows = left_join(rows, &status_logs, |m| Some(m.referral.referral_id.as_str()), |m, v| m.status_log = Some(v));
    let rows = left_join(rows, &statuses, |m| m.referral.user_referral_status_id.as_deref(), |m, v| m.status = Some(v));
    let rows = left_join(rows, &rewards, |m| m.referral.referral_reward_id.as_deref(), |m, v| m.reward = Some(v));
    let rows = left_join(rows, &transactions, |m| m.referral.transaction_id.as_deref(), |m, v| m.transaction = Some(v));
    let rows = left_join(rows, &referrers, |m| m.referral.referrer_id.as_deref(), |m, v| m.referrer = Some(v));
    let rows = left_join(rows, &leads, |m| m.referral.referee_id.as_deref(), |m, v| m.lead = Some(v));

    tracing::debug!(referrals = spine, rows = rows.len(), "assembled master rows");

    Ok(JoinOutput { rows, duplicates })
}

/// Group right-hand rows by key, recording keys that occur more than once.
fn index<'a, T, K>(
    join: JoinName,
    rows: &'a [T],
    key_of: K,
    duplicates: &mut Vec<DuplicateKey>,
) -> HashMap<&'a str, Vec<&'a T>>
where
    K: Fn(&'a T) -> Option<&'a str>,
{
    let mut by_key: HashMap<&'a str, Vec<&'a T>> = HashMap::new();
    for row in rows {
        if let Some(key) = key_of(row) {
            by_key.entry(key).or_default().push(row);
        }
    }

    // BTreeMap for stable reporting order
    let dups: BTreeMap<&str, usize> = by_key
        .iter()
        .filter(|(_, hits)| hits.len() > 1)
        .map(|(key, hits)| (*key, hits.len()))
        .collect();
    duplicates.extend(dups.into_iter().map(|(key, count)| DuplicateKey {
        join,
        key: key.to_string(),
        count,
    }));

    by_key
}

fn left_join<T, K, S>(
    rows: Vec<MasterRow>,
    index: &HashMap<&str, Vec<&T>>,
    left_key: K,
    set: S,
) -> Vec<MasterRow>
where
    T: Clone,
    K: Fn(&MasterRow) -> Option<&str>,
    S: Fn(&mut MasterRow, T),
{
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let hits = left_key(&row).and_then(|key| index.get(key));
        match hits {
            None => out.push(row),
            Some(hits) => {
                for hit in hits {
                    let mut joined = row.clone();
                    set(&mut joined, (*hit).clone());
                    out.push(joined);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn referral(id: &str, reward: Option<&str>, txn: Option<&str>) -> ReferralEvent {
        ReferralEvent {
            referral_id: id.into(),
            referral_source: Some("User Sign Up".into()),
            referral_at: None,
            referrer_id: Some("u1".into()),
            referee_id: None,
            referee_name: None,
            referee_phone: None,
            referral_reward_id: reward.map(Into::into),
            transaction_id: txn.map(Into::into),
            user_referral_status_id: Some("st1".into()),
            updated_at: None,
        }
    }

    fn reward(id: &str, value: f64) -> RewardDefinition {
        RewardDefinition { id: id.into(), reward_value: Some(value) }
    }

    fn sources() -> JoinSources {
        JoinSources {
            statuses: vec![ReferralStatus { id: "st1".into(), description: Some("Berhasil".into()) }],
            rewards: vec![reward("rw1", 30.0), reward("rw2", 0.0)],
            ..JoinSources::default()
        }
    }

    #[test]
    fn every_referral_survives() {
        let referrals = vec![
            referral("r1", Some("rw1"), Some("tx-missing")),
            referral("r2", None, None),
            referral("r3", Some("rw-unknown"), None),
        ];
        let out = assemble(referrals, &sources(), DuplicatePolicy::Warn).unwrap();
        assert_eq!(out.rows.len(), 3);
        assert!(out.duplicates.is_empty());

        let ids: Vec<_> = out.rows.iter().map(|r| r.referral.referral_id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);

        assert_eq!(out.rows[0].reward_value(), Some(30.0));
        assert!(out.rows[0].transaction.is_none());
        assert!(out.rows[1].reward.is_none());
        assert!(out.rows[2].reward.is_none());
        // Status joined through user_referral_status_id
        assert_eq!(out.rows[2].description(), Some("Berhasil"));
    }

    #[test]
    fn duplicate_key_fans_out_under_warn() {
        let mut src = sources();
        src.rewards.push(reward("rw1", 60.0));
        let out = assemble(vec![referral("r1", Some("rw1"), None)], &src, DuplicatePolicy::Warn).unwrap();

        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].reward_value(), Some(30.0));
        assert_eq!(out.rows[1].reward_value(), Some(60.0));
        assert_eq!(
            out.duplicates,
            vec![DuplicateKey { join: JoinName::Reward, key: "rw1".into(), count: 2 }]
        );
    }

    #[test]
    fn duplicate_key_rejected_under_error() {
        let mut src = sources();
        src.rewards.push(reward("rw2", 5.0));
        let err = assemble(vec![referral("r1", None, None)], &src, DuplicatePolicy::Error).unwrap_err();
        match err {
            ReconError::DuplicateKeys(dups) => {
                assert_eq!(dups.len(), 1);
                assert_eq!(dups[0].key, "rw2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unused_duplicates_still_reported() {
        // The duplicate key matches no referral, but it is still a data defect.
        let mut src = sources();
        src.rewards.push(reward("rw2", 5.0));
        let out = assemble(vec![referral("r1", Some("rw1"), None)], &src, DuplicatePolicy::Warn).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.duplicates.len(), 1);
    }

    #[test]
    fn referrer_and_lead_slots() {
        let mut r = referral("r1", None, None);
        r.referee_id = Some("lead-1".into());
        let src = JoinSources {
            referrers: vec![ReferrerProfile {
                user_id: "u1".into(),
                referrer_name: Some("Dewi".into()),
                referrer_phone_number: None,
                referrer_homeclub: None,
                referrer_timezone: None,
                membership_expired_date: None,
                is_deleted: Some(false),
            }],
            leads: vec![LeadProfile {
                lead_id: "lead-1".into(),
                source_category: Some("Offline".into()),
                preferred_location: None,
                timezone_location: None,
                current_status: None,
            }],
            ..JoinSources::default()
        };
        let out = assemble(vec![r], &src, DuplicatePolicy::Warn).unwrap();
        let row = &out.rows[0];
        assert_eq!(row.referrer.as_ref().and_then(|p| p.referrer_name.as_deref()), Some("Dewi"));
        assert_eq!(row.source_category(), Some("Offline"));
        assert!(row.status.is_none());
    }
}
