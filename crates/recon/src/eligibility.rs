//! Business-logic validity of a referral reward.
//!
//! Evaluation walks an ordered list of named guards; the first guard that
//! reaches a verdict decides the row. Every conjunct checks its inputs for
//! null before comparing, so a row that cannot be evaluated is reported as
//! `Uncomputable` rather than failing. Only `Valid` counts as valid.

use chrono::Datelike;

use crate::model::MasterRow;

pub const STATUS_PENDING: &str = "Menunggu";
pub const STATUS_FAILED: &str = "Tidak Berhasil";
pub const STATUS_SUCCESS: &str = "Berhasil";
pub const TRANSACTION_PAID: &str = "PAID";
pub const TRANSACTION_NEW: &str = "NEW";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Pending or rejected referral that paid out nothing.
    PendingOrRejectedWithoutReward,
    /// Successful referral backed by a new, paid, in-month transaction.
    QualifiedReward,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::PendingOrRejectedWithoutReward => "pending_or_rejected_without_reward",
            Rule::QualifiedReward => "qualified_reward",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    NoRuleMatched,
    RewardNotPositive,
    StatusNotSuccessful,
    TransactionNotPaid,
    TransactionNotNew,
    TransactionBeforeReferral,
    DifferentMonth,
    MembershipExpired,
    ReferrerDeleted,
    RewardNotGranted,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::NoRuleMatched => "no_rule_matched",
            Reason::RewardNotPositive => "reward_not_positive",
            Reason::StatusNotSuccessful => "status_not_successful",
            Reason::TransactionNotPaid => "transaction_not_paid",
            Reason::TransactionNotNew => "transaction_not_new",
            Reason::TransactionBeforeReferral => "transaction_before_referral",
            Reason::DifferentMonth => "different_month",
            Reason::MembershipExpired => "membership_expired",
            Reason::ReferrerDeleted => "referrer_deleted",
            Reason::RewardNotGranted => "reward_not_granted",
        }
    }
}

/// A field a conjunct needed but found null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    RewardValue,
    Description,
    TransactionId,
    TransactionStatus,
    TransactionType,
    TransactionAt,
    ReferralAt,
    MembershipExpiredDate,
    IsDeleted,
    IsRewardGranted,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::RewardValue => "reward_value",
            Field::Description => "description",
            Field::TransactionId => "transaction_id",
            Field::TransactionStatus => "transaction_status",
            Field::TransactionType => "transaction_type",
            Field::TransactionAt => "transaction_at",
            Field::ReferralAt => "referral_at",
            Field::MembershipExpiredDate => "membership_expired_date",
            Field::IsDeleted => "is_deleted",
            Field::IsRewardGranted => "is_reward_granted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid(Rule),
    Invalid(Reason),
    Uncomputable(Field),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }

    /// `valid:<rule>`, `invalid:<reason>` or `uncomputable:<field>`.
    pub fn label(&self) -> String {
        match self {
            Verdict::Valid(rule) => format!("valid:{}", rule.as_str()),
            Verdict::Invalid(reason) => format!("invalid:{}", reason.as_str()),
            Verdict::Uncomputable(field) => format!("uncomputable:{}", field.as_str()),
        }
    }
}

struct Guard {
    rule: Rule,
    /// `None` when the guard does not apply to the row.
    check: fn(&MasterRow) -> Option<Verdict>,
}

const GUARDS: &[Guard] = &[
    Guard {
        rule: Rule::PendingOrRejectedWithoutReward,
        check: pending_or_rejected_without_reward,
    },
    Guard {
        rule: Rule::QualifiedReward,
        check: qualified_reward,
    },
];

pub fn evaluate(row: &MasterRow) -> Verdict {
    for guard in GUARDS {
        if let Some(verdict) = (guard.check)(row) {
            tracing::trace!(
                referral_id = %row.referral.referral_id,
                guard = guard.rule.as_str(),
                verdict = %verdict.label(),
                "eligibility decided"
            );
            return verdict;
        }
    }
    Verdict::Invalid(Reason::NoRuleMatched)
}

fn pending_or_rejected_without_reward(row: &MasterRow) -> Option<Verdict> {
    let not_applied = matches!(row.description(), Some(STATUS_PENDING | STATUS_FAILED));
    let no_reward = row.reward_value().map_or(true, |v| v == 0.0);
    (not_applied && no_reward).then_some(Verdict::Valid(Rule::PendingOrRejectedWithoutReward))
}

fn qualified_reward(row: &MasterRow) -> Option<Verdict> {
    Some(match check_qualified(row) {
        Ok(()) => Verdict::Valid(Rule::QualifiedReward),
        Err(verdict) => verdict,
    })
}

fn check_qualified(row: &MasterRow) -> Result<(), Verdict> {
    let reward = present(row.reward_value(), Field::RewardValue)?;
    ensure(reward > 0.0, Reason::RewardNotPositive)?;

    let description = present(row.description(), Field::Description)?;
    ensure(description == STATUS_SUCCESS, Reason::StatusNotSuccessful)?;

    present(row.referral.transaction_id.as_deref(), Field::TransactionId)?;
    let status = present(row.transaction_status(), Field::TransactionStatus)?;
    ensure(status == TRANSACTION_PAID, Reason::TransactionNotPaid)?;
    let kind = present(row.transaction_type(), Field::TransactionType)?;
    ensure(kind == TRANSACTION_NEW, Reason::TransactionNotNew)?;

    let transaction_at = present(row.transaction_at(), Field::TransactionAt)?;
    let referral_at = present(row.referral.referral_at, Field::ReferralAt)?;
    ensure(transaction_at > referral_at, Reason::TransactionBeforeReferral)?;
    ensure(
        transaction_at.year() == referral_at.year() && transaction_at.month() == referral_at.month(),
        Reason::DifferentMonth,
    )?;

    let expiry = present(row.membership_expired_date(), Field::MembershipExpiredDate)?;
    ensure(expiry >= transaction_at.date_naive(), Reason::MembershipExpired)?;

    let deleted = present(row.is_deleted(), Field::IsDeleted)?;
    ensure(!deleted, Reason::ReferrerDeleted)?;

    let granted = present(row.is_reward_granted(), Field::IsRewardGranted)?;
    ensure(granted, Reason::RewardNotGranted)
}

fn present<T>(value: Option<T>, field: Field) -> Result<T, Verdict> {
    value.ok_or(Verdict::Uncomputable(field))
}

fn ensure(condition: bool, reason: Reason) -> Result<(), Verdict> {
    if condition {
        Ok(())
    } else {
        Err(Verdict::Invalid(reason))
    }
}
