//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::{write_indicator_bars, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_report_adapter::SvgReportAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::bar::IndicatorBar;
use crate::domain::config_validation::{
    parse_date, parsed_double, parsed_int, positive_int, validate_config,
};
use crate::domain::error::TrendangleError;
use crate::domain::indicator_helpers::{annotate, IndicatorConfig};
use crate::domain::metrics::Summary;
use crate::domain::session::{filter_session, resample, SessionWindow};
use crate::domain::strategy::{SameBarPolicy, Strategy};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "trendangle", about = "EMA angle trend-following backtester")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest and write reports
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [data] path
        #[arg(long)]
        data: Option<PathBuf>,
        /// Treat the data file as an already annotated bar stream
        #[arg(long)]
        precomputed: bool,
        /// Overrides [report] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the annotated indicator bar stream to a CSV file
    Annotate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate a configuration and print the resolved parameters
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show bar count and time range of the data file
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

/// Where bars come from and which slice of them to use.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub path: Option<PathBuf>,
    pub precomputed: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// How raw bars are turned into the indicator stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// `None` keeps every hour.
    pub session: Option<SessionWindow>,
    pub resample_minutes: u32,
    pub indicators: IndicatorConfig,
}

/// Everything a run needs, resolved from a validated config.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data: DataSettings,
    pub pipeline: PipelineSettings,
    pub strategy: Strategy,
    pub backtest: BacktestConfig,
    pub output_dir: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            precomputed,
            output,
        } => run_backtest(&config, data, precomputed, output),
        Command::Annotate {
            config,
            data,
            output,
        } => run_annotate(&config, data, &output),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, data } => run_info(&config, data),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    // A subscriber may already be installed when `run` is called repeatedly.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load and validate a config file, then resolve it into [`Settings`].
pub fn load_settings(path: &Path) -> Result<Settings, TrendangleError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)?;
    build_settings(&adapter)
}

pub fn build_settings(adapter: &dyn ConfigPort) -> Result<Settings, TrendangleError> {
    Ok(Settings {
        data: build_data_settings(adapter)?,
        pipeline: build_pipeline(adapter)?,
        strategy: build_strategy(adapter)?,
        backtest: build_backtest_config(adapter)?,
        output_dir: adapter.get_string("report", "output_dir").map(PathBuf::from),
    })
}

pub fn build_data_settings(adapter: &dyn ConfigPort) -> Result<DataSettings, TrendangleError> {
    Ok(DataSettings {
        path: adapter.get_string("data", "path").map(PathBuf::from),
        precomputed: adapter.get_bool("data", "precomputed", false),
        start_date: parse_date(adapter, "start_date")?,
        end_date: parse_date(adapter, "end_date")?,
    })
}

fn period(adapter: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<usize, TrendangleError> {
    let value = positive_int(adapter, section, key, default)?;
    usize::try_from(value).map_err(|_| TrendangleError::invalid(section, key, "too large"))
}

pub fn build_pipeline(adapter: &dyn ConfigPort) -> Result<PipelineSettings, TrendangleError> {
    let session = if adapter.get_bool("session", "enabled", true) {
        let hour = |key: &str, default: i64| {
            u32::try_from(parsed_int(adapter, "session", key, default)?)
                .map_err(|_| TrendangleError::invalid("session", key, "hour out of range"))
        };
        Some(SessionWindow {
            start_hour: hour("start_hour", 7)?,
            end_hour: hour("end_hour", 20)?,
        })
    } else {
        None
    };

    let minutes = period(adapter, "resample", "minutes", 5)?;
    let resample_minutes = u32::try_from(minutes)
        .map_err(|_| TrendangleError::invalid("resample", "minutes", "too large"))?;

    Ok(PipelineSettings {
        session,
        resample_minutes,
        indicators: IndicatorConfig {
            fast_period: period(adapter, "indicators", "fast_period", 9)?,
            slow_period: period(adapter, "indicators", "slow_period", 20)?,
            volatility_period: period(adapter, "indicators", "volatility_period", 14)?,
            slope_lookback: period(adapter, "indicators", "slope_lookback", 3)?,
        },
    })
}

pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<Strategy, TrendangleError> {
    let defaults = Strategy::default();
    let same_bar_policy = match adapter.get_string("strategy", "same_bar_policy") {
        Some(s) => s
            .parse::<SameBarPolicy>()
            .map_err(|reason| TrendangleError::invalid("strategy", "same_bar_policy", reason))?,
        None => defaults.same_bar_policy,
    };

    Ok(Strategy {
        name: adapter.get_string("strategy", "name").unwrap_or(defaults.name),
        angle_threshold: parsed_double(adapter, "strategy", "angle_threshold", defaults.angle_threshold)?,
        reward_risk_ratio: parsed_double(
            adapter,
            "strategy",
            "reward_risk_ratio",
            defaults.reward_risk_ratio,
        )?,
        risk_fraction: parsed_double(adapter, "strategy", "risk_fraction", defaults.risk_fraction)?,
        same_bar_policy,
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, TrendangleError> {
    Ok(BacktestConfig {
        initial_balance: parsed_double(
            adapter,
            "backtest",
            "initial_balance",
            BacktestConfig::default().initial_balance,
        )?,
    })
}

/// `--data` wins over `[data] path`; one of them is required.
fn resolve_data_path(settings: &Settings, data_override: Option<PathBuf>) -> Result<PathBuf, TrendangleError> {
    data_override
        .or_else(|| settings.data.path.clone())
        .ok_or_else(|| TrendangleError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })
}

/// Load raw bars, apply the session filter and resampling, and annotate.
pub fn prepare_bars(
    data_port: &dyn DataPort,
    settings: &Settings,
) -> Result<Vec<IndicatorBar>, TrendangleError> {
    let raw = data_port.fetch_ohlcv(settings.data.start_date, settings.data.end_date)?;
    let loaded = raw.len();

    let pipeline = &settings.pipeline;
    let in_session = match &pipeline.session {
        Some(window) => filter_session(raw, window),
        None => raw,
    };
    let resampled = resample(&in_session, pipeline.resample_minutes);
    let bars = annotate(&resampled, &pipeline.indicators);
    info!(
        loaded,
        in_session = in_session.len(),
        resampled = resampled.len(),
        annotated = bars.len(),
        "bars prepared"
    );

    if bars.is_empty() {
        return Err(TrendangleError::InsufficientData {
            bars: resampled.len(),
            minimum: pipeline.indicators.warmup_bars() + 1,
        });
    }
    Ok(bars)
}

/// Load the indicator stream, either precomputed or prepared from raw bars.
pub fn load_stream(
    data_port: &dyn DataPort,
    settings: &Settings,
    precomputed: bool,
) -> Result<Vec<IndicatorBar>, TrendangleError> {
    if !precomputed {
        return prepare_bars(data_port, settings);
    }
    let bars = data_port.fetch_indicator_bars(settings.data.start_date, settings.data.end_date)?;
    if bars.is_empty() {
        return Err(TrendangleError::InsufficientData { bars: 0, minimum: 1 });
    }
    Ok(bars)
}

/// Run the full pipeline against a data port and hand the result to each
/// reporter when an output directory is given.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    settings: &Settings,
    precomputed: bool,
    output_dir: Option<&Path>,
    reporters: &[&dyn ReportPort],
) -> Result<BacktestResult, TrendangleError> {
    let bars = load_stream(data_port, settings, precomputed)?;

    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        eprintln!(
            "Running backtest: {} on {} bars, {} to {}",
            settings.strategy.name,
            bars.len(),
            first.timestamp,
            last.timestamp
        );
    }

    let result = backtest_engine::run_backtest(&bars, &settings.strategy, &settings.backtest)?;
    print_summary(&result);

    if let Some(dir) = output_dir {
        fs::create_dir_all(dir)?;
        for reporter in reporters {
            for path in reporter.write(&result, &bars, dir)? {
                eprintln!("Report written to: {}", path.display());
            }
        }
    }
    Ok(result)
}

fn print_summary(result: &BacktestResult) {
    let summary = Summary::compute(&result.ledger);
    let scan = &result.scan;

    eprintln!("\n=== Results ===");
    eprintln!("Bars Scanned:     {}", scan.bars);
    eprintln!(
        "Setups:           {} ({} rejected, {} unresolved)",
        scan.setups, scan.rejected_setups, scan.unresolved_setups
    );
    eprintln!("Initial Balance:  {:.2}", summary.initial_balance);
    eprintln!("Final Balance:    {:.2}", summary.final_balance);
    eprintln!("Total Trades:     {}", summary.trade_count);

    let Some(stats) = summary.stats else {
        eprintln!("No trades taken.");
        return;
    };
    eprintln!(
        "Win Rate:         {:.1}% ({} won, {} lost)",
        stats.win_rate * 100.0,
        stats.wins,
        stats.losses
    );
    eprintln!("Expectancy:       {:.2}", stats.expectancy);
    eprintln!("Max Drawdown:     {:.2}", stats.max_drawdown);
    eprintln!("Total Return:     {:.2}%", stats.total_return * 100.0);
    eprintln!("Profit Factor:    {:.2}", stats.profit_factor);
    eprintln!("Largest Win:      {:.2}", stats.largest_win);
    eprintln!("Largest Loss:     {:.2}", stats.largest_loss);
    eprintln!("Avg Bars Held:    {:.1}", stats.avg_bars_held);
}

fn run_backtest(
    config_path: &Path,
    data: Option<PathBuf>,
    precomputed: bool,
    output: Option<PathBuf>,
) -> Result<(), TrendangleError> {
    let settings = load_settings(config_path)?;
    let data_path = resolve_data_path(&settings, data)?;
    let precomputed = precomputed || settings.data.precomputed;
    let output_dir = output.or_else(|| settings.output_dir.clone());

    eprintln!("Loading bars from {}", data_path.display());
    let data_port = CsvAdapter::new(data_path);
    run_backtest_pipeline(
        &data_port,
        &settings,
        precomputed,
        output_dir.as_deref(),
        &[&CsvReportAdapter, &SvgReportAdapter],
    )?;
    Ok(())
}

fn run_annotate(
    config_path: &Path,
    data: Option<PathBuf>,
    output: &Path,
) -> Result<(), TrendangleError> {
    let settings = load_settings(config_path)?;
    let data_path = resolve_data_path(&settings, data)?;

    eprintln!("Loading bars from {}", data_path.display());
    let bars = prepare_bars(&CsvAdapter::new(data_path), &settings)?;
    write_indicator_bars(&bars, output)?;
    eprintln!("Wrote {} annotated bars to {}", bars.len(), output.display());
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), TrendangleError> {
    let settings = load_settings(config_path)?;
    eprintln!("Config validated successfully");

    let data = &settings.data;
    let pipeline = &settings.pipeline;
    let strategy = &settings.strategy;
    let fmt_date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());

    eprintln!("\nData:");
    eprintln!(
        "  path:               {}",
        data.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(from --data)".into())
    );
    eprintln!("  precomputed:        {}", data.precomputed);
    eprintln!("  range:              {} to {}", fmt_date(data.start_date), fmt_date(data.end_date));
    eprintln!("\nPipeline:");
    match &pipeline.session {
        Some(w) => eprintln!("  session hours:      {:02}-{:02}", w.start_hour, w.end_hour),
        None => eprintln!("  session hours:      all"),
    }
    eprintln!("  resample:           {} min", pipeline.resample_minutes);
    eprintln!(
        "  EMAs:               {} / {}",
        pipeline.indicators.fast_period, pipeline.indicators.slow_period
    );
    eprintln!("  ATR period:         {}", pipeline.indicators.volatility_period);
    eprintln!("  slope lookback:     {}", pipeline.indicators.slope_lookback);
    eprintln!("\nStrategy: {}", strategy.name);
    eprintln!("  angle threshold:    {}", strategy.angle_threshold);
    eprintln!("  reward/risk:        {}", strategy.reward_risk_ratio);
    eprintln!("  risk fraction:      {}", strategy.risk_fraction);
    eprintln!("  same-bar policy:    {}", strategy.same_bar_policy);
    eprintln!("\nInitial balance:    {:.2}", settings.backtest.initial_balance);
    Ok(())
}

fn run_info(config_path: &Path, data: Option<PathBuf>) -> Result<(), TrendangleError> {
    let settings = load_settings(config_path)?;
    let data_path = resolve_data_path(&settings, data)?;
    let adapter = CsvAdapter::new(&data_path);

    match adapter.get_data_range()? {
        Some((first, last, count)) => {
            eprintln!("{}:", data_path.display());
            eprintln!("  Bars:   {}", count);
            eprintln!("  First:  {}", first);
            eprintln!("  Last:   {}", last);
        }
        None => eprintln!("{}: no data rows", data_path.display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn cli_parses_backtest_flags() {
        let cli = Cli::try_parse_from([
            "trendangle",
            "-v",
            "backtest",
            "-c",
            "run.ini",
            "--data",
            "bars.csv",
            "--precomputed",
            "-o",
            "out",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Backtest {
                config,
                data,
                precomputed,
                output,
            } => {
                assert_eq!(config, PathBuf::from("run.ini"));
                assert_eq!(data, Some(PathBuf::from("bars.csv")));
                assert!(precomputed);
                assert_eq!(output, Some(PathBuf::from("out")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn annotate_requires_output() {
        assert!(Cli::try_parse_from(["trendangle", "annotate", "-c", "run.ini"]).is_err());
    }

    #[test]
    fn build_settings_uses_defaults() {
        let settings = build_settings(&config("[data]\npath = bars.csv\n")).unwrap();
        assert_eq!(settings.data.path, Some(PathBuf::from("bars.csv")));
        assert!(!settings.data.precomputed);
        assert_eq!(settings.pipeline.session, Some(SessionWindow::default()));
        assert_eq!(settings.pipeline.resample_minutes, 5);
        assert_eq!(settings.pipeline.indicators, IndicatorConfig::default());
        assert_eq!(settings.strategy, Strategy::default());
        assert_eq!(settings.backtest, BacktestConfig::default());
        assert_eq!(settings.output_dir, None);
    }

    #[test]
    fn build_settings_reads_every_section() {
        let ini = r#"
[data]
precomputed = yes
start_date = 2024-01-01
end_date = 2024-06-30

[session]
enabled = false

[resample]
minutes = 15

[indicators]
fast_period = 5
slow_period = 30
volatility_period = 10
slope_lookback = 4

[strategy]
name = Gold Angle
angle_threshold = 25
reward_risk_ratio = 3
risk_fraction = 0.02
same_bar_policy = target_first

[backtest]
initial_balance = 5000

[report]
output_dir = reports
"#;
        let settings = build_settings(&config(ini)).unwrap();
        assert!(settings.data.precomputed);
        assert_eq!(settings.data.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(settings.data.end_date, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(settings.pipeline.session, None);
        assert_eq!(settings.pipeline.resample_minutes, 15);
        assert_eq!(settings.pipeline.indicators.fast_period, 5);
        assert_eq!(settings.pipeline.indicators.slope_lookback, 4);
        assert_eq!(settings.strategy.name, "Gold Angle");
        assert!((settings.strategy.angle_threshold - 25.0).abs() < f64::EPSILON);
        assert!((settings.strategy.reward_risk_ratio - 3.0).abs() < f64::EPSILON);
        assert!((settings.strategy.risk_fraction - 0.02).abs() < f64::EPSILON);
        assert_eq!(settings.strategy.same_bar_policy, SameBarPolicy::TargetFirst);
        assert!((settings.backtest.initial_balance - 5000.0).abs() < f64::EPSILON);
        assert_eq!(settings.output_dir, Some(PathBuf::from("reports")));
    }

    #[test]
    fn data_override_wins_over_config() {
        let settings = build_settings(&config("[data]\npath = a.csv\n")).unwrap();
        let path = resolve_data_path(&settings, Some(PathBuf::from("b.csv"))).unwrap();
        assert_eq!(path, PathBuf::from("b.csv"));
    }

    #[test]
    fn missing_data_path_is_config_missing() {
        let settings = build_settings(&config("[strategy]\nname = x\n")).unwrap();
        match resolve_data_path(&settings, None) {
            Err(TrendangleError::ConfigMissing { section, key }) => {
                assert_eq!(section, "data");
                assert_eq!(key, "path");
            }
            other => panic!("expected ConfigMissing, got {other:?}"),
        }
    }

    #[test]
    fn bad_policy_is_config_invalid() {
        let err = build_strategy(&config("[strategy]\nsame_bar_policy = coin_flip\n")).unwrap_err();
        assert!(matches!(err, TrendangleError::ConfigInvalid { .. }));
    }

    #[test]
    fn builders_share_the_validating_parsers() {
        let err = build_settings(&config("[strategy]\nrisk_fraction = NaN\n")).unwrap_err();
        assert!(matches!(err, TrendangleError::ConfigInvalid { ref key, .. } if key == "risk_fraction"));

        let err = build_settings(&config("[backtest]\ninitial_balance = inf\n")).unwrap_err();
        assert!(matches!(err, TrendangleError::ConfigInvalid { ref key, .. } if key == "initial_balance"));

        let err = build_settings(&config("[indicators]\nfast_period = 0\n")).unwrap_err();
        assert!(matches!(err, TrendangleError::ConfigInvalid { ref key, .. } if key == "fast_period"));
    }
}
