//! CSV → typed tables.
//!
//! Each loader checks its required columns up front, then converts every
//! record. Empty cells become `None`; a cell that is present but unparseable
//! aborts the load. Extra columns are ignored.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::{DateTime, NaiveDate, Utc};
use csv::StringRecord;

use crate::error::ReconError;
use crate::model::{
    AuditInput, LeadLog, MembershipLog, PaidTransaction, ReferralEvent, ReferralStatus,
    ReferralStatusLog, RewardDefinition,
};
use crate::temporal::{parse_date, parse_instant};

/// Source table names, as used in errors, logs and config.
pub mod tables {
    pub const REFERRALS: &str = "user_referrals";
    pub const REFERRAL_LOGS: &str = "user_referral_logs";
    pub const USER_LOGS: &str = "user_logs";
    pub const LEAD_LOGS: &str = "lead_logs";
    pub const STATUSES: &str = "user_referral_statuses";
    pub const REWARDS: &str = "referral_rewards";
    pub const TRANSACTIONS: &str = "paid_transactions";
}

/// Load all seven tables. `source` returns the CSV text for a table name.
pub fn load_input<F>(mut source: F) -> Result<AuditInput, ReconError>
where
    F: FnMut(&'static str) -> Result<String, ReconError>,
{
    let input = AuditInput {
        referrals: load_referrals(&source(tables::REFERRALS)?)?,
        referral_logs: load_referral_logs(&source(tables::REFERRAL_LOGS)?)?,
        user_logs: load_user_logs(&source(tables::USER_LOGS)?)?,
        lead_logs: load_lead_logs(&source(tables::LEAD_LOGS)?)?,
        statuses: load_statuses(&source(tables::STATUSES)?)?,
        rewards: load_rewards(&source(tables::REWARDS)?)?,
        transactions: load_transactions(&source(tables::TRANSACTIONS)?)?,
    };

    tracing::debug!(
        referrals = input.referrals.len(),
        referral_logs = input.referral_logs.len(),
        user_logs = input.user_logs.len(),
        lead_logs = input.lead_logs.len(),
        statuses = input.statuses.len(),
        rewards = input.rewards.len(),
        transactions = input.transactions.len(),
        "loaded input tables"
    );

    Ok(input)
}

pub fn load_referrals(csv_data: &str) -> Result<Vec<ReferralEvent>, ReconError> {
    let table = RawTable::read(tables::REFERRALS, csv_data)?;
    let c = table.columns([
        "referral_id",
        "referral_source",
        "referral_at",
        "referrer_id",
        "referee_id",
        "referee_name",
        "referee_phone",
        "referral_reward_id",
        "transaction_id",
        "user_referral_status_id",
        "updated_at",
    ])?;

    let rows = table.map_rows(c[0], |r| {
        Ok(ReferralEvent {
            referral_id: r.required(c[0]),
            referral_source: r.text(c[1]),
            referral_at: r.instant(c[2])?,
            referrer_id: r.text(c[3]),
            referee_id: r.text(c[4]),
            referee_name: r.text(c[5]),
            referee_phone: r.text(c[6]),
            referral_reward_id: r.text(c[7]),
            transaction_id: r.text(c[8]),
            user_referral_status_id: r.text(c[9]),
            updated_at: r.instant(c[10])?,
        })
    })?;
    Ok(drop_exact_duplicates(table.name, rows))
}

pub fn load_referral_logs(csv_data: &str) -> Result<Vec<ReferralStatusLog>, ReconError> {
    let table = RawTable::read(tables::REFERRAL_LOGS, csv_data)?;
    let c = table.columns([
        "id",
        "user_referral_id",
        "source_transaction_id",
        "created_at",
        "is_reward_granted",
    ])?;

    let rows = table.map_rows(c[0], |r| {
        Ok(ReferralStatusLog {
            id: r.required(c[0]),
            user_referral_id: r.text(c[1]),
            source_transaction_id: r.text(c[2]),
            created_at: r.instant(c[3])?,
            is_reward_granted: r.boolean(c[4])?,
        })
    })?;
    Ok(drop_exact_duplicates(table.name, rows))
}

pub fn load_statuses(csv_data: &str) -> Result<Vec<ReferralStatus>, ReconError> {
    let table = RawTable::read(tables::STATUSES, csv_data)?;
    let c = table.columns(["id", "description"])?;

    table.map_rows(c[0], |r| {
        Ok(ReferralStatus {
            id: r.required(c[0]),
            description: r.text(c[1]),
        })
    })
}

pub fn load_user_logs(csv_data: &str) -> Result<Vec<MembershipLog>, ReconError> {
    let table = RawTable::read(tables::USER_LOGS, csv_data)?;
    let c = table.columns([
        "id",
        "user_id",
        "name",
        "phone_number",
        "homeclub",
        "timezone_homeclub",
        "membership_expired_date",
        "is_deleted",
    ])?;

    let rows = table.map_rows(c[0], |r| {
        Ok(MembershipLog {
            id: r.required(c[0]),
            user_id: r.text(c[1]),
            name: r.text(c[2]),
            phone_number: r.text(c[3]),
            homeclub: r.text(c[4]),
            timezone_homeclub: r.text(c[5]),
            membership_expired_date: r.date(c[6])?,
            is_deleted: r.boolean(c[7])?,
        })
    })?;
    Ok(drop_exact_duplicates(table.name, rows))
}

pub fn load_lead_logs(csv_data: &str) -> Result<Vec<LeadLog>, ReconError> {
    let table = RawTable::read(tables::LEAD_LOGS, csv_data)?;
    let c = table.columns([
        "id",
        "lead_id",
        "source_category",
        "preferred_location",
        "timezone_location",
        "current_status",
        "created_at",
    ])?;

    let rows = table.map_rows(c[0], |r| {
        Ok(LeadLog {
            id: r.required(c[0]),
            lead_id: r.text(c[1]),
            source_category: r.text(c[2]),
            preferred_location: r.text(c[3]),
            timezone_location: r.text(c[4]),
            current_status: r.text(c[5]),
            created_at: r.instant(c[6])?,
        })
    })?;
    Ok(drop_exact_duplicates(table.name, rows))
}

pub fn load_rewards(csv_data: &str) -> Result<Vec<RewardDefinition>, ReconError> {
    let table = RawTable::read(tables::REWARDS, csv_data)?;
    let c = table.columns(["id", "reward_value"])?;

    table.map_rows(c[0], |r| {
        Ok(RewardDefinition {
            id: r.required(c[0]),
            reward_value: r.number(c[1])?,
        })
    })
}

pub fn load_transactions(csv_data: &str) -> Result<Vec<PaidTransaction>, ReconError> {
    let table = RawTable::read(tables::TRANSACTIONS, csv_data)?;
    let c = table.columns([
        "transaction_id",
        "transaction_status",
        "transaction_at",
        "transaction_location",
        "transaction_type",
    ])?;

    table.map_rows(c[0], |r| {
        Ok(PaidTransaction {
            transaction_id: r.required(c[0]),
            transaction_status: r.text(c[1]),
            transaction_at: r.instant(c[2])?,
            transaction_location: r.text(c[3]),
            transaction_type: r.text(c[4]),
        })
    })
}

/// Drop rows equal to an earlier row, keeping input order. Runs on typed
/// rows, so cells that differ only in padding or timestamp spelling match.
fn drop_exact_duplicates<T: Eq + Hash>(table: &'static str, rows: Vec<T>) -> Vec<T> {
    let keep: Vec<bool> = {
        let mut seen: HashSet<&T> = HashSet::with_capacity(rows.len());
        rows.iter().map(|row| seen.insert(row)).collect()
    };
    let before = rows.len();
    let out: Vec<T> = rows
        .into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect();

    if out.len() < before {
        tracing::debug!(table, dropped = before - out.len(), "dropped duplicate rows");
    }
    out
}

// ---------------------------------------------------------------------------
// Raw table
// ---------------------------------------------------------------------------

struct RawTable {
    name: &'static str,
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl RawTable {
    fn read(name: &'static str, csv_data: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());

        let csv_err = |e: csv::Error| ReconError::Csv {
            table: name.into(),
            message: e.to_string(),
        };

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let records = reader
            .records()
            .collect::<Result<Vec<StringRecord>, _>>()
            .map_err(csv_err)?;

        Ok(Self { name, headers, records })
    }

    fn columns<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N], ReconError> {
        let mut out = [0usize; N];
        for (slot, name) in out.iter_mut().zip(names) {
            *slot = self.headers.iter().position(|h| h == name).ok_or_else(|| {
                ReconError::MissingColumn {
                    table: self.name.into(),
                    column: name.into(),
                }
            })?;
        }
        Ok(out)
    }

    fn map_rows<T, F>(&self, id_col: usize, mut f: F) -> Result<Vec<T>, ReconError>
    where
        F: FnMut(&Cells<'_>) -> Result<T, ReconError>,
    {
        self.records
            .iter()
            .map(|record| {
                f(&Cells {
                    table: self.name,
                    headers: &self.headers,
                    record,
                    record_id: record.get(id_col).unwrap_or("").trim(),
                })
            })
            .collect()
    }
}

struct Cells<'a> {
    table: &'static str,
    headers: &'a [String],
    record: &'a StringRecord,
    record_id: &'a str,
}

impl Cells<'_> {
    fn raw(&self, idx: usize) -> Option<&str> {
        self.record.get(idx).map(str::trim).filter(|v| !v.is_empty())
    }

    fn text(&self, idx: usize) -> Option<String> {
        self.raw(idx).map(str::to_owned)
    }

    fn required(&self, idx: usize) -> String {
        self.raw(idx).unwrap_or_default().to_owned()
    }

    fn instant(&self, idx: usize) -> Result<Option<DateTime<Utc>>, ReconError> {
        self.parsed(idx, parse_instant, |table, record_id, column, value| ReconError::DateParse {
            table,
            record_id,
            column,
            value,
        })
    }

    fn date(&self, idx: usize) -> Result<Option<NaiveDate>, ReconError> {
        self.parsed(idx, parse_date, |table, record_id, column, value| ReconError::DateParse {
            table,
            record_id,
            column,
            value,
        })
    }

    fn number(&self, idx: usize) -> Result<Option<f64>, ReconError> {
        let parse = |v: &str| v.parse::<f64>().ok().filter(|n| n.is_finite());
        self.parsed(idx, parse, |table, record_id, column, value| ReconError::NumberParse {
            table,
            record_id,
            column,
            value,
        })
    }

    fn boolean(&self, idx: usize) -> Result<Option<bool>, ReconError> {
        self.parsed(idx, parse_bool, |table, record_id, column, value| ReconError::BoolParse {
            table,
            record_id,
            column,
            value,
        })
    }

    fn parsed<T, P, E>(&self, idx: usize, parse: P, err: E) -> Result<Option<T>, ReconError>
    where
        P: Fn(&str) -> Option<T>,
        E: FnOnce(String, String, String, String) -> ReconError,
    {
        let Some(value) = self.raw(idx) else {
            return Ok(None);
        };
        match parse(value) {
            Some(v) => Ok(Some(v)),
            None => Err(err(
                self.table.into(),
                self.record_id.into(),
                self.headers[idx].clone(),
                value.into(),
            )),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "1.0" | "yes" => Some(true),
        "false" | "f" | "0" | "0.0" | "no" => Some(false),
        _ => None,
    }
}
