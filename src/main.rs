use std::sync::OnceLock;
use anyhow::{Context, Result};
use clap::{ArgAction, ColorChoice, CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use is_terminal::IsTerminal;
use regex::Regex;
use serde::Deserialize;
mod filter;
mod input;
mod output;
mod projector;
mod record;
mod row_parser;
mod scanner;
mod summary;

use crate::filter::{RecordFilter, DEFAULT_PREFIX_FAMILIES};
use crate::output::{Destination, OutputFmt};
use crate::record::Metric;
use crate::scanner::{BlockScanner, ScanContext, CASSANDRA_TIMESTAMP};
use crate::summary::RunStats;

static ENABLE_COLOR: OnceLock<bool> = OnceLock::new();

const DEFAULT_CONFIG: &str = "PoolStats.toml";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Clone, Copy, Debug, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogFormat { Text, Json }

#[derive(Parser, Debug)]
#[command(
    name = "PoolStats",
    about = "Extract thread pool statistics tables from server logs into CSV",
    long_about = "Scans server logs for periodic thread pool statistics tables (Pool Name / Active / Pending / ... / All Time Blocked) and writes them as CSV. Without --pools every pool becomes one row per sample; with --pools each timestamp becomes one row with a column per pool and metric.",
    after_long_help = "Examples:\n  PoolStats system.log\n  PoolStats --pools CompactionExecutor,GossipStage system.log\n  PoolStats --pools TPC system1.log system2.log\n  PoolStats --pools CompactionExecutor --metrics Active,Completed -o compaction.csv system.log\n  PoolStats --timestamp-pattern cassandra --summary /var/log/cassandra",
    color = ColorChoice::Auto
)]
struct Args {
    /// Log files (or directories) to scan, in order
    #[arg(required_unless_present = "completions")]
    files: Vec<String>,
    /// Comma-separated pool names (case-insensitive); switches to one row per timestamp
    #[arg(long, value_delimiter = ',')]
    pools: Vec<String>,
    /// Comma-separated metrics for per-pool columns (Active, Pending, Backpressure, Delayed, Shared, Stolen, Completed, Blocked, All_Time_Blocked)
    #[arg(long, value_delimiter = ',')]
    metrics: Vec<String>,
    /// Output path, `-` for stdout (default pool_metrics_<timestamp>.csv)
    #[arg(long, short = 'o')]
    output: Option<String>,
    /// csv (default) or tsv
    #[arg(long, value_enum)]
    format: Option<OutputFmt>,
    /// Glob applied to files inside directory arguments
    #[arg(long, short = 'g')]
    file_glob: Option<String>,
    #[arg(long, short = 'r', default_value_t = false)]
    recursive: bool,
    /// Regex applied to the line before each table; first capture group becomes the timestamp (`cassandra` preset)
    #[arg(long)]
    timestamp_pattern: Option<String>,
    /// Print a per-pool summary table to stderr
    #[arg(long, default_value_t = false)]
    summary: bool,
    #[arg(long, default_value_t = false)]
    progress: bool,
    #[arg(long)]
    config: Option<String>,
    #[arg(long, short = 'C', default_value_t = false)]
    no_color: bool,
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    #[arg(long)]
    log_path: Option<String>,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
    #[arg(long)]
    completions_out: Option<String>,
    #[arg(skip)]
    prefix_families: Vec<String>,
    #[arg(skip)]
    selected_metrics: Vec<Metric>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            files: vec![],
            pools: vec![],
            metrics: vec![],
            output: None,
            format: None,
            file_glob: None,
            recursive: false,
            timestamp_pattern: None,
            summary: false,
            progress: false,
            config: None,
            no_color: false,
            log_level: None,
            log_format: None,
            log_path: None,
            verbose: 0,
            quiet: false,
            completions: None,
            completions_out: None,
            prefix_families: vec![],
            selected_metrics: vec![],
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct AppConfig {
    pools: Option<Vec<String>>,
    metrics: Option<Vec<String>>,
    output: Option<String>,
    format: Option<OutputFmt>,
    file_glob: Option<String>,
    recursive: Option<bool>,
    timestamp_pattern: Option<String>,
    prefix_families: Option<Vec<String>>,
    log_format: Option<LogFormat>,
    log_path: Option<String>,
    progress: Option<bool>,
    summary: Option<bool>,
}

fn parse_metrics(items: &[String]) -> Result<Vec<Metric>, String> {
    items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).map(|s| s.parse::<Metric>()).collect()
}

fn main() {
    let mut args = Args::parse();
    if let Some(sh) = args.completions {
        let mut cmd = Args::command();
        if let Some(path) = args.completions_out.as_ref() {
            if let Ok(mut f) = std::fs::File::create(path) { clap_complete::generate(sh, &mut cmd, "PoolStats", &mut f); } else { clap_complete::generate(sh, &mut cmd, "PoolStats", &mut std::io::stdout()); }
        } else {
            clap_complete::generate(sh, &mut cmd, "PoolStats", &mut std::io::stdout());
        }
        return;
    }
    let cfg = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => { eprintln!("Error: {:#}", e); std::process::exit(1); }
    };
    if let Some(cfg) = cfg && let Err(e) = apply_config(&mut args, cfg) {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }
    match parse_metrics(&args.metrics) {
        Ok(m) => args.selected_metrics = m,
        Err(e) => Args::command().error(clap::error::ErrorKind::InvalidValue, e).exit(),
    }
    if args.prefix_families.is_empty() { args.prefix_families = DEFAULT_PREFIX_FAMILIES.iter().map(|s| s.to_string()).collect(); }
    init_logging(&args);
    let term = std::env::var("TERM").unwrap_or_default();
    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let enable_color = std::io::stderr().is_terminal() && !no_color_env && term != "dumb" && !args.no_color;
    let _ = ENABLE_COLOR.set(enable_color);
    if let Err(e) = run(&args) {
        log::error!("{:#}", e);
        eprintln!("{}", paint(&format!("Error: {:#}", e), "1;31"));
        std::process::exit(1);
    }
}

// --config, then $POOLSTATS_CONFIG, then ./PoolStats.toml; only the implicit default may be absent
fn load_config(explicit: Option<&str>) -> Result<Option<AppConfig>> {
    let chosen = explicit.map(|s| s.to_string()).or_else(|| std::env::var("POOLSTATS_CONFIG").ok());
    let (path, required) = match chosen { Some(p) => (p, true), None => (DEFAULT_CONFIG.to_string(), false) };
    let s = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to read config {}", path)),
    };
    let cfg = toml::from_str::<AppConfig>(&s).with_context(|| format!("failed to parse config {}", path))?;
    Ok(Some(cfg))
}

fn apply_config(args: &mut Args, cfg: AppConfig) -> Result<()> {
    if args.pools.is_empty() && let Some(v) = cfg.pools { args.pools = v; }
    if args.metrics.is_empty() && let Some(v) = cfg.metrics {
        parse_metrics(&v).map_err(anyhow::Error::msg).context("invalid metrics in config")?;
        args.metrics = v;
    }
    if args.output.is_none() && let Some(v) = cfg.output { args.output = Some(v); }
    if args.format.is_none() && let Some(v) = cfg.format { args.format = Some(v); }
    if args.file_glob.is_none() && let Some(v) = cfg.file_glob { args.file_glob = Some(v); }
    if let Some(v) = cfg.recursive { args.recursive |= v; }
    if args.timestamp_pattern.is_none() && let Some(v) = cfg.timestamp_pattern { args.timestamp_pattern = Some(v); }
    if let Some(v) = cfg.prefix_families { args.prefix_families = v; }
    if args.log_format.is_none() && let Some(v) = cfg.log_format { args.log_format = Some(v); }
    if args.log_path.is_none() && let Some(v) = cfg.log_path { args.log_path = Some(v); }
    if let Some(v) = cfg.progress { args.progress |= v; }
    if let Some(v) = cfg.summary { args.summary |= v; }
    Ok(())
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if let Some(lvl) = args.log_level {
        let f = match lvl { LogLevel::Error => log::LevelFilter::Error, LogLevel::Warn => log::LevelFilter::Warn, LogLevel::Info => log::LevelFilter::Info, LogLevel::Debug => log::LevelFilter::Debug, LogLevel::Trace => log::LevelFilter::Trace };
        builder.filter_level(f);
    } else if args.verbose > 0 {
        let f = if args.verbose >= 3 { log::LevelFilter::Trace } else if args.verbose == 2 { log::LevelFilter::Debug } else { log::LevelFilter::Info };
        builder.filter_level(f);
    }
    if let Some(fmt) = args.log_format {
        match fmt {
            LogFormat::Json => {
                builder.format(|buf, record| {
                    use std::io::Write;
                    let ts = chrono::Local::now().to_rfc3339();
                    let obj = serde_json::json!({
                        "ts": ts,
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "msg": record.args().to_string(),
                    });
                    writeln!(buf, "{}", obj)
                });
            }
            LogFormat::Text => {
                builder.format(|buf, record| {
                    use std::io::Write;
                    let ts = chrono::Local::now().format("%H:%M:%S");
                    writeln!(buf, "[{:<5} {}] {}", record.level(), ts, record.args())
                });
            }
        }
    }
    if let Some(path) = args.log_path.as_ref() {
        match std::fs::File::create(path) {
            Ok(f) => { builder.target(env_logger::Target::Pipe(Box::new(f))); }
            Err(e) => { eprintln!("Failed to open log file {}: {}", path, e); }
        }
    }
    builder.init();
}

fn compile_timestamp_pattern(p: Option<&str>) -> Result<Option<Regex>> {
    let Some(p) = p else { return Ok(None) };
    let src = if p.eq_ignore_ascii_case("cassandra") { CASSANDRA_TIMESTAMP } else { p };
    let re = Regex::new(src).with_context(|| format!("invalid timestamp pattern '{}'", p))?;
    Ok(Some(re))
}

struct Extraction {
    table: projector::Table,
    stats: RunStats,
    pools: Vec<summary::PoolSummary>,
}

fn extract(args: &Args) -> Result<Extraction> {
    let timestamp_pattern = compile_timestamp_pattern(args.timestamp_pattern.as_deref())?;
    let files = input::expand_inputs(&args.files, args.file_glob.as_deref(), args.recursive)?;
    let mut stats = RunStats { files: files.len(), ..Default::default() };
    let mut blocks = Vec::new();
    for (file_index, path) in files.iter().enumerate() {
        let pb = if args.progress { Some(indicatif::ProgressBar::new_spinner()) } else { None };
        if let Some(pb) = pb.as_ref() { pb.set_message(format!("Scanning {}", path.display())); pb.enable_steady_tick(std::time::Duration::from_millis(120)); }
        let lines = input::read_lines(path, file_index)?;
        let ctx = ScanContext { file_index, timestamp_pattern: timestamp_pattern.clone() };
        let before = blocks.len();
        for block in BlockScanner::new(lines.into_iter(), ctx) {
            stats.observe(&block);
            blocks.push(block);
        }
        log::info!("{}: {} pool tables", path.display(), blocks.len() - before);
        if let Some(pb) = pb { pb.finish_and_clear(); }
    }
    let filtered = RecordFilter::new(&args.pools, &args.prefix_families, &args.selected_metrics).apply(blocks);
    for e in &filtered.unmatched { log::warn!("Pool filter '{}' matched no records", e); }
    if filtered.pool_filter.is_none() && !args.selected_metrics.is_empty() { log::info!("--metrics only applies together with --pools; writing the fixed row columns"); }
    let pools = summary::summarize(&filtered.records);
    let table = projector::project(&filtered);
    log::info!("{} blocks ({} empty), {} records, {} output rows", stats.blocks, stats.empty_blocks, stats.records, table.rows.len());
    Ok(Extraction { table, stats, pools })
}

fn run(args: &Args) -> Result<()> {
    let ex = extract(args)?;
    if ex.stats.blocks == 0 { log::warn!("No pool statistics found in the provided files"); }
    let format = args.format.unwrap_or(OutputFmt::Csv);
    let dest = Destination::resolve(args.output.as_deref(), format);
    output::write_to(&dest, &ex.table, format)?;
    if args.summary { eprintln!("{}", summary::render(&ex.stats, &ex.pools)); }
    if !args.quiet && let Destination::File(p) = &dest {
        eprintln!("{}", paint(&format!("Output written: {} ({} rows)", p.display(), ex.table.rows.len()), "1;36"));
    }
    Ok(())
}

fn paint(s: &str, code: &str) -> String {
    if *ENABLE_COLOR.get().unwrap_or(&false) { format!("\x1b[{}m{}\x1b[0m", code, s) } else { s.to_string() }
}
