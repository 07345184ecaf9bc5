use crate::classify::source_category;
use crate::config::PipelineConfig;
use crate::eligibility::{evaluate, Verdict};
use crate::error::ReconError;
use crate::join::{assemble, JoinSources};
use crate::model::{AuditInput, AuditMeta, AuditResult};
use crate::project::{lead_profile, referrer_profile};
use crate::report::{project, summarize};
use crate::resolve::{resolve_lead_logs, resolve_referral_logs, resolve_user_logs};
use crate::temporal::now_rfc3339;

/// Run the audit over loaded tables. Returns report rows + summary.
pub fn run(config: &PipelineConfig, input: AuditInput) -> Result<AuditResult, ReconError> {
    let AuditInput {
        referrals,
        referral_logs,
        statuses,
        user_logs,
        lead_logs,
        rewards,
        transactions,
    } = input;

    // Resolve log histories
    let status_logs = resolve_referral_logs(referral_logs, &referrals);
    let referrers = resolve_user_logs(user_logs)
        .into_iter()
        .map(referrer_profile)
        .collect();
    let leads = resolve_lead_logs(lead_logs, &referrals)
        .into_iter()
        .map(lead_profile)
        .collect();

    let sources = JoinSources {
        status_logs,
        statuses,
        rewards,
        transactions,
        referrers,
        leads,
    };
    let joined = assemble(referrals, &sources, config.join.on_duplicate)?;

    // Classify + evaluate
    let mut rows = joined.rows;
    let mut verdicts: Vec<Verdict> = Vec::with_capacity(rows.len());
    for row in &mut rows {
        row.referral_source_category = source_category(row);
        let verdict = evaluate(row);
        row.is_business_logic_valid = verdict.is_valid();
        verdicts.push(verdict);
    }

    let summary = summarize(&rows, &verdicts, &joined.duplicates);
    tracing::info!(
        rows = summary.total_rows,
        valid = summary.valid,
        invalid = summary.invalid,
        uncomputable = summary.uncomputable,
        "referral audit complete"
    );

    Ok(AuditResult {
        meta: AuditMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: now_rfc3339(),
        },
        summary,
        rows: rows.iter().map(project).collect(),
    })
}
