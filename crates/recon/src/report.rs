//! Final report: column selection, rendering, and run summary.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::eligibility::Verdict;
use crate::error::ReconError;
use crate::join::DuplicateKey;
use crate::model::{AuditSummary, MasterRow};
use crate::temporal::format_instant;

/// Output columns, in order.
pub const REPORT_COLUMNS: [&str; 20] = [
    "referral_id",
    "referral_source",
    "referral_source_category",
    "referral_at",
    "referrer_id",
    "referrer_name",
    "referrer_phone_number",
    "referrer_homeclub",
    "referee_id",
    "referee_name",
    "referee_phone",
    "referral_status",
    "num_reward_days",
    "transaction_id",
    "transaction_status",
    "transaction_at",
    "transaction_location",
    "transaction_type",
    "updated_at",
    "is_business_logic_valid",
];

/// One report line. Field order matches `REPORT_COLUMNS`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub referral_id: String,
    pub referral_source: Option<String>,
    pub referral_source_category: Option<String>,
    pub referral_at: Option<String>,
    pub referrer_id: Option<String>,
    pub referrer_name: Option<String>,
    pub referrer_phone_number: Option<String>,
    pub referrer_homeclub: Option<String>,
    pub referee_id: Option<String>,
    pub referee_name: Option<String>,
    pub referee_phone: Option<String>,
    pub referral_status: Option<String>,
    pub num_reward_days: Option<f64>,
    pub transaction_id: Option<String>,
    pub transaction_status: Option<String>,
    pub transaction_at: Option<String>,
    pub transaction_location: Option<String>,
    pub transaction_type: Option<String>,
    pub updated_at: Option<String>,
    pub is_business_logic_valid: bool,
}

/// Select and rename the report columns. `description` becomes
/// `referral_status` and `reward_value` becomes `num_reward_days`.
pub fn project(row: &MasterRow) -> ReportRow {
    let referral = &row.referral;
    let referrer = row.referrer.as_ref();
    let transaction = row.transaction.as_ref();

    ReportRow {
        referral_id: referral.referral_id.clone(),
        referral_source: referral.referral_source.clone(),
        referral_source_category: row.referral_source_category.clone(),
        referral_at: referral.referral_at.as_ref().map(format_instant),
        referrer_id: referral.referrer_id.clone(),
        referrer_name: referrer.and_then(|p| p.referrer_name.clone()),
        referrer_phone_number: referrer.and_then(|p| p.referrer_phone_number.clone()),
        referrer_homeclub: referrer.and_then(|p| p.referrer_homeclub.clone()),
        referee_id: referral.referee_id.clone(),
        referee_name: referral.referee_name.clone(),
        referee_phone: referral.referee_phone.clone(),
        referral_status: row.description().map(str::to_owned),
        num_reward_days: row.reward_value(),
        transaction_id: referral.transaction_id.clone(),
        transaction_status: transaction.and_then(|t| t.transaction_status.clone()),
        transaction_at: row.transaction_at().as_ref().map(format_instant),
        transaction_location: transaction.and_then(|t| t.transaction_location.clone()),
        transaction_type: transaction.and_then(|t| t.transaction_type.clone()),
        updated_at: referral.updated_at.as_ref().map(format_instant),
        is_business_logic_valid: row.is_business_logic_valid,
    }
}

/// Write the report with a header row. Nulls are empty cells.
pub fn write_report<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), ReconError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    let io_err = |e: csv::Error| ReconError::Io(e.to_string());

    // Header is written explicitly so an empty report still has one.
    wtr.write_record(REPORT_COLUMNS).map_err(io_err)?;
    for row in rows {
        wtr.serialize(row).map_err(io_err)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render the whole report in memory.
pub fn render_report(rows: &[ReportRow]) -> Result<Vec<u8>, ReconError> {
    let mut buf = Vec::new();
    write_report(rows, &mut buf)?;
    Ok(buf)
}

/// Tally rows by validity, category and verdict.
pub fn summarize(
    rows: &[MasterRow],
    verdicts: &[Verdict],
    duplicates: &[DuplicateKey],
) -> AuditSummary {
    let mut summary = AuditSummary {
        total_rows: rows.len(),
        ..AuditSummary::default()
    };

    for (row, verdict) in rows.iter().zip(verdicts) {
        match verdict {
            Verdict::Valid(_) => summary.valid += 1,
            Verdict::Invalid(_) => summary.invalid += 1,
            Verdict::Uncomputable(_) => summary.uncomputable += 1,
        }
        let category = row.referral_source_category.as_deref().unwrap_or("(none)");
        *summary.by_category.entry(category.to_string()).or_insert(0) += 1;
        *summary.by_verdict.entry(verdict.label()).or_insert(0) += 1;
    }

    let mut by_join: BTreeMap<String, usize> = BTreeMap::new();
    for dup in duplicates {
        *by_join.entry(dup.join.to_string()).or_insert(0) += 1;
    }
    summary.duplicate_keys = by_join;

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::{Field, Reason, Rule};
    use crate::join::JoinName;
    use crate::model::{ReferralEvent, ReferralStatus, RewardDefinition};
    use chrono::{TimeZone, Utc};

    fn master(id: &str) -> MasterRow {
        MasterRow::new(ReferralEvent {
            referral_id: id.into(),
            referral_source: Some("User Sign Up".into()),
            referral_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap()),
            referrer_id: Some("u1".into()),
            referee_id: Some("u2".into()),
            referee_name: Some("Budi, Jr.".into()),
            referee_phone: None,
            referral_reward_id: None,
            transaction_id: None,
            user_referral_status_id: None,
            updated_at: None,
        })
    }

    #[test]
    fn renames_status_and_reward() {
        let mut row = master("r1");
        row.status = Some(ReferralStatus { id: "st".into(), description: Some("Berhasil".into()) });
        row.reward = Some(RewardDefinition { id: "rw".into(), reward_value: Some(30.0) });
        let out = project(&row);
        assert_eq!(out.referral_status.as_deref(), Some("Berhasil"));
        assert_eq!(out.num_reward_days, Some(30.0));
        assert_eq!(out.referral_at.as_deref(), Some("2024-05-01 03:00:00+00:00"));
        assert_eq!(out.referrer_name, None);
    }

    #[test]
    fn csv_has_header_and_empty_nulls() {
        let mut row = master("r1");
        row.referral_source_category = Some("Online".into());
        row.is_business_logic_valid = true;
        let bytes = render_report(&[project(&row)]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), REPORT_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "r1,User Sign Up,Online,2024-05-01 03:00:00+00:00,u1,,,,u2,\"Budi, Jr.\",,,,,,,,,,true"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_report_still_has_header() {
        let text = String::from_utf8(render_report(&[]).unwrap()).unwrap();
        assert_eq!(text.trim_end(), REPORT_COLUMNS.join(","));
    }

    #[test]
    fn summary_counts() {
        let mut a = master("a");
        a.referral_source_category = Some("Online".into());
        let b = master("b");
        let c = master("c");
        let verdicts = vec![
            Verdict::Valid(Rule::QualifiedReward),
            Verdict::Invalid(Reason::DifferentMonth),
            Verdict::Uncomputable(Field::TransactionId),
        ];
        let dups = vec![DuplicateKey { join: JoinName::Reward, key: "rw1".into(), count: 2 }];
        let s = summarize(&[a, b, c], &verdicts, &dups);
        assert_eq!(s.total_rows, 3);
        assert_eq!((s.valid, s.invalid, s.uncomputable), (1, 1, 1));
        assert_eq!(s.by_category["Online"], 1);
        assert_eq!(s.by_category["(none)"], 2);
        assert_eq!(s.by_verdict["invalid:different_month"], 1);
        assert_eq!(s.duplicate_keys["reward"], 1);
    }
}
