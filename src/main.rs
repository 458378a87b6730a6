use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tab2json::{
    coerce::{self, CoercionDirective, ColumnList, DirectiveOptions},
    config::Config,
    json::{self, Orient},
    table::{self, snake},
};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Convert a CSV or Parquet table into JSON, normalizing headers and dates.
#[derive(Debug, Parser)]
#[command(name = "tab2json", version)]
struct Cli {
    /// Input file (.csv or .parquet)
    input: PathBuf,

    /// Output .json file (default: input path with a .json extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// YAML settings file; command-line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON layout: records (array of objects) or table (JSON Table Schema)
    #[arg(long)]
    orient: Option<Orient>,

    /// Keep headers exactly as in the input
    #[arg(long)]
    keep_headers: bool,

    /// Turn empty text cells into null
    #[arg(long)]
    na_null: bool,

    /// Date output: iso or epoch
    #[arg(long, value_name = "MODE")]
    date_format: Option<String>,

    /// Unit for epoch output: s or ms
    #[arg(long, value_name = "UNIT")]
    epoch_unit: Option<String>,

    /// Read ambiguous dates as day/month instead of month/day
    #[arg(long, conflicts_with = "no_dayfirst")]
    dayfirst: bool,

    /// Read ambiguous dates as month/day, overriding the settings file
    #[arg(long)]
    no_dayfirst: bool,

    /// Comma-separated columns to always parse as dates
    #[arg(long, value_name = "COLS")]
    date_cols: Option<String>,

    /// Only convert forced or already-typed date columns
    #[arg(long)]
    no_auto_dates: bool,

    /// Fraction of values that must parse before a text column becomes dates
    #[arg(long, value_name = "RATIO")]
    date_threshold: Option<f64>,

    /// Exact chrono format for parsing dates, e.g. "%d/%m/%Y %H:%M"
    #[arg(long, value_name = "FMT")]
    date_parse_format: Option<String>,
}

impl Cli {
    /// Flags as a config layer; unset flags leave file values alone.
    fn as_config(&self) -> Config {
        Config {
            orient: self.orient,
            keep_headers: self.keep_headers.then_some(true),
            na_null: self.na_null.then_some(true),
            dates: DirectiveOptions {
                date_format: self.date_format.clone(),
                epoch_unit: self.epoch_unit.clone(),
                dayfirst: match (self.dayfirst, self.no_dayfirst) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                date_columns: self.date_cols.clone().map(ColumnList::Csv),
                auto_dates: self.no_auto_dates.then_some(false),
                date_threshold: self.date_threshold,
                date_parse_format: self.date_parse_format.clone(),
            },
        }
    }
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) settings: file, then flags ───────────────────────────────
    let cli = Cli::parse();
    let file_cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let cfg = file_cfg.overlay(cli.as_config());
    debug!(?cfg, "effective settings");

    let keep_headers = cfg.keep_headers.unwrap_or(false);
    let mut date_opts = cfg.dates.clone();
    if !keep_headers {
        date_opts = date_opts.map_date_columns(snake);
    }
    // invalid settings stop here, before any data is read
    let directive = CoercionDirective::from_options(&date_opts)?;

    // ─── 3) load & normalize ─────────────────────────────────────────
    let mut table = table::load_table(&cli.input)?;
    if !keep_headers {
        table.normalize_headers();
    }
    if cfg.na_null.unwrap_or(false) {
        table.null_blank_text();
    }

    // ─── 4) dates ────────────────────────────────────────────────────
    let report = coerce::run(&mut table, &directive);
    for col in &report.columns {
        debug!(column = %col.name, outcome = %col.outcome, "column result");
    }

    // ─── 5) write ────────────────────────────────────────────────────
    let out_path = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("json"));
    json::write_json(&table, cfg.orient.unwrap_or_default(), &out_path)?;

    info!(path = %out_path.display(), "done");
    println!("wrote {}", out_path.display());
    Ok(())
}
