use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input tables
// ---------------------------------------------------------------------------

/// One referrer→referee relationship. The spine of the report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferralEvent {
    pub referral_id: String,
    pub referral_source: Option<String>,
    pub referral_at: Option<DateTime<Utc>>,
    pub referrer_id: Option<String>,
    pub referee_id: Option<String>,
    pub referee_name: Option<String>,
    pub referee_phone: Option<String>,
    pub referral_reward_id: Option<String>,
    pub transaction_id: Option<String>,
    pub user_referral_status_id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Append-only referral status history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferralStatusLog {
    pub id: String,
    pub user_referral_id: Option<String>,
    pub source_transaction_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_reward_granted: Option<bool>,
}

/// Status reference table (`user_referral_statuses`).
#[derive(Debug, Clone, PartialEq)]
pub struct ReferralStatus {
    pub id: String,
    pub description: Option<String>,
}

/// Append-only membership history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MembershipLog {
    pub id: String,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub homeclub: Option<String>,
    pub timezone_homeclub: Option<String>,
    pub membership_expired_date: Option<NaiveDate>,
    pub is_deleted: Option<bool>,
}

/// Append-only lead history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeadLog {
    pub id: String,
    pub lead_id: Option<String>,
    pub source_category: Option<String>,
    pub preferred_location: Option<String>,
    pub timezone_location: Option<String>,
    pub current_status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RewardDefinition {
    pub id: String,
    pub reward_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaidTransaction {
    pub transaction_id: String,
    pub transaction_status: Option<String>,
    pub transaction_at: Option<DateTime<Utc>>,
    pub transaction_location: Option<String>,
    pub transaction_type: Option<String>,
}

/// All seven source tables, loaded and deduplicated.
#[derive(Debug, Clone, Default)]
pub struct AuditInput {
    pub referrals: Vec<ReferralEvent>,
    pub referral_logs: Vec<ReferralStatusLog>,
    pub statuses: Vec<ReferralStatus>,
    pub user_logs: Vec<MembershipLog>,
    pub lead_logs: Vec<LeadLog>,
    pub rewards: Vec<RewardDefinition>,
    pub transactions: Vec<PaidTransaction>,
}

// ---------------------------------------------------------------------------
// Projected entities
// ---------------------------------------------------------------------------

/// Membership fields renamed so they read as the referrer's in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferrerProfile {
    pub user_id: String,
    pub referrer_name: Option<String>,
    pub referrer_phone_number: Option<String>,
    pub referrer_homeclub: Option<String>,
    pub referrer_timezone: Option<String>,
    pub membership_expired_date: Option<NaiveDate>,
    pub is_deleted: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeadProfile {
    pub lead_id: String,
    pub source_category: Option<String>,
    pub preferred_location: Option<String>,
    pub timezone_location: Option<String>,
    pub current_status: Option<String>,
}

// ---------------------------------------------------------------------------
// Master row
// ---------------------------------------------------------------------------

/// One referral after every join. `None` in a slot means the join found no
/// match, so every field of that entity reads as null.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterRow {
    pub referral: ReferralEvent,
    pub status_log: Option<ReferralStatusLog>,
    pub status: Option<ReferralStatus>,
    pub reward: Option<RewardDefinition>,
    pub transaction: Option<PaidTransaction>,
    pub referrer: Option<ReferrerProfile>,
    pub lead: Option<LeadProfile>,
    pub referral_source_category: Option<String>,
    pub is_business_logic_valid: bool,
}

impl MasterRow {
    pub fn new(referral: ReferralEvent) -> Self {
        Self {
            referral,
            status_log: None,
            status: None,
            reward: None,
            transaction: None,
            referrer: None,
            lead: None,
            referral_source_category: None,
            is_business_logic_valid: false,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.description.as_deref())
    }

    pub fn reward_value(&self) -> Option<f64> {
        self.reward.as_ref().and_then(|r| r.reward_value)
    }

    pub fn is_reward_granted(&self) -> Option<bool> {
        self.status_log.as_ref().and_then(|l| l.is_reward_granted)
    }

    pub fn transaction_status(&self) -> Option<&str> {
        self.transaction.as_ref().and_then(|t| t.transaction_status.as_deref())
    }

    pub fn transaction_type(&self) -> Option<&str> {
        self.transaction.as_ref().and_then(|t| t.transaction_type.as_deref())
    }

    pub fn transaction_at(&self) -> Option<DateTime<Utc>> {
        self.transaction.as_ref().and_then(|t| t.transaction_at)
    }

    pub fn membership_expired_date(&self) -> Option<NaiveDate> {
        self.referrer.as_ref().and_then(|r| r.membership_expired_date)
    }

    pub fn is_deleted(&self) -> Option<bool> {
        self.referrer.as_ref().and_then(|r| r.is_deleted)
    }

    pub fn source_category(&self) -> Option<&str> {
        self.lead.as_ref().and_then(|l| l.source_category.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditSummary {
    pub total_rows: usize,
    pub valid: usize,
    pub invalid: usize,
    pub uncomputable: usize,
    /// Rows per `referral_source_category`; null is keyed as `"(none)"`.
    pub by_category: BTreeMap<String, usize>,
    /// Rows per deciding guard or failure reason.
    pub by_verdict: BTreeMap<String, usize>,
    /// Duplicate right-hand keys seen per join.
    pub duplicate_keys: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub meta: AuditMeta,
    pub summary: AuditSummary,
    #[serde(skip)]
    pub rows: Vec<crate::report::ReportRow>,
}
