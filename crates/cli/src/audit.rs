//! `refaudit run` and `refaudit validate`: config-driven referral audit.

use std::path::{Path, PathBuf};

use refaudit_recon::load::load_input;
use refaudit_recon::{render_report, PipelineConfig, ReconError};

use crate::exit_codes::{audit_exit_code, EXIT_AUDIT_CONFIG, EXIT_AUDIT_OUTPUT};
use crate::CliError;

pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub json: bool,
    pub summary: Option<PathBuf>,
}

fn audit_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
                Some("check the config with `refaudit validate <config>`")
            }
            ReconError::MissingColumn { .. } => Some("column names are matched exactly, after trimming"),
            ReconError::DuplicateKeys(_) => {
                Some("set `on_duplicate = \"warn\"` under [join] to fan out instead")
            }
            ReconError::Io(_) => Some("check [input] dir in the config or pass --data-dir"),
            _ => None,
        };
        CliError {
            code: audit_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(str::to_owned),
        }
    }
}

/// Read and validate a config, resolving its directories against the
/// file's own location.
fn load_config(path: &Path) -> Result<PipelineConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| audit_err(EXIT_AUDIT_CONFIG, format!("cannot read config {}: {e}", path.display())))?;
    let mut config = PipelineConfig::from_toml(&text)?;

    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    config.rebase(base_dir);
    Ok(config)
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config.input.dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }

    tracing::info!(
        config = %config.name,
        input = %config.input.dir.display(),
        on_duplicate = %config.join.on_duplicate,
        "starting referral audit"
    );

    // Load
    let input = load_input(|table| {
        let path = config
            .table_path(table)
            .ok_or_else(|| ReconError::Io(format!("no input file configured for table '{table}'")))?;
        std::fs::read_to_string(&path)
            .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))
    })?;

    // Run engine
    let result = refaudit_recon::run(&config, input)?;

    // Render fully before touching the output directory
    let report = render_report(&result.rows).map_err(|e| audit_err(EXIT_AUDIT_OUTPUT, e.to_string()))?;
    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| audit_err(EXIT_AUDIT_OUTPUT, format!("JSON serialization error: {e}")))?;

    // Summary first: a failed summary write leaves no report behind
    if let Some(ref path) = args.summary {
        std::fs::write(path, &json_str).map_err(|e| {
            audit_err(EXIT_AUDIT_OUTPUT, format!("cannot write summary {}: {e}", path.display()))
        })?;
        eprintln!("wrote {}", path.display());
    }

    let report_path = config.report_path();
    std::fs::create_dir_all(&config.output.dir).map_err(|e| {
        audit_err(
            EXIT_AUDIT_OUTPUT,
            format!("cannot create output directory {}: {e}", config.output.dir.display()),
        )
    })?;
    std::fs::write(&report_path, &report).map_err(|e| {
        audit_err(EXIT_AUDIT_OUTPUT, format!("cannot write {}: {e}", report_path.display()))
    })?;

    if args.json {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!("report written: {} ({} rows)", report_path.display(), s.total_rows);
    eprintln!(
        "validity: {} valid, {} invalid, {} uncomputable",
        s.valid, s.invalid, s.uncomputable,
    );

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "config OK: \"{}\" (input {}, report {}, on_duplicate = {})",
        config.name,
        config.input.dir.display(),
        config.report_path().display(),
        config.join.on_duplicate,
    );
    Ok(())
}
