//! Batch Calc CLI Application
//!
//! Runs a batch of binary integer operations with a fixed number of them in
//! flight at once. This CLI is a thin layer over batch-calc-lib.

mod ui;

use batch_calc_lib::{
    parse_expressions, BatchGenerator, BatchSummary, CalcConfig, CalcError, CollectingReporter,
    ConfigManager, FileConfig, OperationRegistry, PendingRequest, Reporter, StdioReporter,
    UnitReport, WorkDispatcher, MAX_BATCH_SIZE, MAX_CAPACITY,
};
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{CommandFactory, Parser};
use serde::Serialize;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for batch-calc
#[derive(Parser, Debug)]
#[command(name = "batch-calc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Run a batch of integer operations with bounded concurrency")]
#[command(
    long_about = "Run a batch of binary integer operations (+ - * /), one thread per operation,\nwith at most N operations in flight at once.\n\nWithout arguments, 20 random operations run with a capacity of 5.\nOptions go before EXPRESSIONS; anything after the first expression is read as an expression."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Expressions to run instead of a random batch (e.g. "7+3" "9 / 0")
    #[arg(
        value_name = "EXPRESSIONS",
        allow_hyphen_values = true,
        help_heading = "Batch Selection"
    )]
    pub expressions: Vec<String>,

    /// Number of random operations to generate (default: 20, max: 10000)
    #[arg(
        short = 'n',
        long = "count",
        value_name = "N",
        help_heading = "Batch Selection"
    )]
    pub count: Option<usize>,

    /// Seed for the random generator (reproducible batches)
    #[arg(long = "seed", value_name = "SEED", help_heading = "Batch Selection")]
    pub seed: Option<u64>,

    /// Smallest generated operand (default: 0)
    #[arg(
        long = "min",
        value_name = "INT",
        allow_hyphen_values = true,
        help_heading = "Batch Selection"
    )]
    pub min_operand: Option<i64>,

    /// Largest generated operand (default: 99)
    #[arg(
        long = "max",
        value_name = "INT",
        allow_hyphen_values = true,
        help_heading = "Batch Selection"
    )]
    pub max_operand: Option<i64>,

    /// Print the batch without running it
    #[arg(long = "dry-run", help_heading = "Batch Selection")]
    pub dry_run: bool,

    /// Output reports and summary as one JSON document
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Colored, aligned output with a header
    #[arg(short = 'p', long = "pretty", help_heading = "Output Format")]
    pub pretty: bool,

    /// Print a summary after the batch completes
    #[arg(short = 's', long = "summary", help_heading = "Output Format")]
    pub summary: bool,

    /// Max operations in flight at once (default: 5, max: 100)
    #[arg(
        short = 'c',
        long = "concurrency",
        value_name = "N",
        help_heading = "Performance"
    )]
    pub concurrency: Option<usize>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Debug-level logging on stderr
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Output settings after merging config files and flags.
#[derive(Debug, Clone, PartialEq)]
struct OutputOptions {
    json: bool,
    json_pretty: bool,
    pretty: bool,
    summary: bool,
}

/// Shape of `--json` output.
#[derive(Serialize)]
struct JsonOutput<'a> {
    reports: &'a [UnitReport],
    notices: &'a [CalcError],
    summary: &'a BatchSummary,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "batch-calc starting");

    if let Err(e) = run_batch(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over the flags.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(args)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn default_log_level(args: &Args) -> &'static str {
    if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_CAPACITY {
            return Err(format!(
                "Concurrency must be between 1 and {}",
                MAX_CAPACITY
            ));
        }
    }

    if let Some(count) = args.count {
        if count > MAX_BATCH_SIZE {
            return Err(format!("Count must not exceed {}", MAX_BATCH_SIZE));
        }
    }

    if let (Some(min), Some(max)) = (args.min_operand, args.max_operand) {
        if min > max {
            return Err(format!("--min ({}) must not exceed --max ({})", min, max));
        }
    }

    // Random batch options make no sense with explicit expressions
    let generator_flags = [
        args.count.is_some(),
        args.seed.is_some(),
        args.min_operand.is_some(),
        args.max_operand.is_some(),
    ];
    if !args.expressions.is_empty() && generator_flags.iter().any(|&set| set) {
        return Err(
            "Cannot combine EXPRESSIONS with --count, --seed, --min or --max".to_string(),
        );
    }

    if let Some(flag) = args.expressions.iter().find(|e| is_known_flag(e)) {
        return Err(format!(
            "Option '{}' found after EXPRESSIONS; place options before expressions",
            flag
        ));
    }

    if args.json && args.pretty {
        return Err("Cannot specify both --json and --pretty".to_string());
    }

    Ok(())
}

/// Whether `arg` names one of our own options, e.g. `-v` or `--json=true`.
fn is_known_flag(arg: &str) -> bool {
    let command = Args::command();

    if let Some(long) = arg.strip_prefix("--") {
        let name = long.split('=').next().unwrap_or(long);
        return command.get_arguments().any(|a| a.get_long() == Some(name))
            || matches!(name, "help" | "version");
    }

    let Some(shorts) = arg.strip_prefix('-') else {
        return false;
    };
    // Only the leading letter matters: `-n5` is `-n 5`
    match shorts.chars().next() {
        Some(c) => {
            command.get_arguments().any(|a| a.get_short() == Some(c)) || matches!(c, 'h' | 'V')
        }
        None => false,
    }
}

/// Main batch logic
async fn run_batch(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let file_config = load_file_config(&args)?;
    let config = build_config(&args, &file_config)?;
    let output = build_output_options(&args, &file_config);

    let registry = OperationRegistry::new();
    let requests = get_requests(&args, &config, &registry)?;

    if args.dry_run {
        return display_dry_run(&requests, &output);
    }

    let collector = Arc::new(CollectingReporter::new());
    let reporter: Arc<dyn Reporter> = if output.json {
        collector.clone()
    } else if output.pretty {
        Arc::new(ui::PrettyReporter)
    } else {
        Arc::new(StdioReporter)
    };

    if output.pretty {
        ui::print_header(requests.len(), config.concurrency, config.generate.seed);
    }

    let dispatcher = WorkDispatcher::with_config(&config, reporter)?;
    let summary = tokio::task::spawn_blocking(move || dispatcher.run(requests)).await?;

    if output.json {
        display_json_results(
            &collector.reports_by_index(),
            &collector.notices(),
            &summary,
            output.json_pretty,
        )?;
    } else if output.summary {
        if output.pretty {
            println!();
        }
        ui::print_summary(&summary, output.pretty);
    }

    Ok(())
}

/// Load the explicit `--config` file, or whatever discovery finds.
fn load_file_config(args: &Args) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new(args.verbose);

    if let Some(explicit_config_path) = &args.config {
        tracing::info!(path = %explicit_config_path, "using explicit config file");

        let file_config = config_manager
            .load_file(explicit_config_path)
            .map_err(|e| {
                format!(
                    "Failed to load config file '{}': {}",
                    explicit_config_path, e
                )
            })?;
        return Ok(file_config);
    }

    tracing::debug!("discovering config files");
    match config_manager.discover_and_load() {
        Ok(file_config) => Ok(file_config),
        Err(e) => {
            tracing::warn!(error = %e, "config discovery failed, using defaults");
            Ok(FileConfig::default())
        }
    }
}

/// Build the run configuration: defaults, then config files, then CLI flags.
fn build_config(
    args: &Args,
    file_config: &FileConfig,
) -> Result<CalcConfig, Box<dyn std::error::Error>> {
    let config = merge_file_config_into_calc_config(CalcConfig::default(), file_config);
    let config = apply_cli_args_to_config(config, args);

    config.validate()?;
    Ok(config)
}

/// Merge FileConfig into CalcConfig
fn merge_file_config_into_calc_config(mut config: CalcConfig, file_config: &FileConfig) -> CalcConfig {
    if let Some(defaults) = &file_config.defaults {
        if let Some(concurrency) = defaults.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(count) = defaults.count {
            config.generate.count = count;
        }
        if let Some(seed) = defaults.seed {
            config.generate.seed = Some(seed);
        }
        if let Some(min) = defaults.min_operand {
            config.generate.min_operand = min;
        }
        if let Some(max) = defaults.max_operand {
            config.generate.max_operand = max;
        }
    }

    config
}

/// CLI flags override only when given.
fn apply_cli_args_to_config(mut config: CalcConfig, args: &Args) -> CalcConfig {
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(count) = args.count {
        config.generate.count = count;
    }
    if let Some(seed) = args.seed {
        config.generate.seed = Some(seed);
    }
    if let Some(min) = args.min_operand {
        config.generate.min_operand = min;
    }
    if let Some(max) = args.max_operand {
        config.generate.max_operand = max;
    }

    config
}

fn build_output_options(args: &Args, file_config: &FileConfig) -> OutputOptions {
    let file_output = file_config.output.clone().unwrap_or_default();

    OutputOptions {
        json: args.json,
        json_pretty: file_output.json_pretty.unwrap_or(true),
        // --json turns off pretty even when a config file enables it
        pretty: !args.json && (args.pretty || file_output.pretty.unwrap_or(false)),
        summary: args.summary || file_output.summary.unwrap_or(false),
    }
}

/// Parse explicit expressions or generate a random batch.
fn get_requests(
    args: &Args,
    config: &CalcConfig,
    registry: &OperationRegistry,
) -> Result<Vec<PendingRequest>, Box<dyn std::error::Error>> {
    if args.expressions.is_empty() {
        let generator = BatchGenerator::new(config.generate.clone())?;
        let requests = generator.generate(registry);
        tracing::info!(count = requests.len(), seed = ?config.generate.seed, "generated random batch");
        return Ok(requests);
    }

    let (requests, errors) = parse_expressions(&args.expressions);
    for error in &errors {
        eprintln!("Error: {}", error);
    }

    if requests.is_empty() {
        return Err("No valid expressions to run".into());
    }

    Ok(requests)
}

fn display_dry_run(
    requests: &[PendingRequest],
    output: &OutputOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if output.json {
        let json = if output.json_pretty {
            serde_json::to_string_pretty(requests)?
        } else {
            serde_json::to_string(requests)?
        };
        println!("{}", json);
    } else {
        ui::print_requests(requests);
        eprintln!(
            "{} operation{} would be run",
            requests.len(),
            if requests.len() == 1 { "" } else { "s" }
        );
    }

    Ok(())
}

/// Display results in JSON format
fn display_json_results(
    reports: &[UnitReport],
    notices: &[CalcError],
    summary: &BatchSummary,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = JsonOutput {
        reports,
        notices,
        summary,
    };
    let json = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch_calc_lib::{DefaultsConfig, OutputConfig};

    fn create_test_args() -> Args {
        Args {
            expressions: vec![],
            count: None,
            seed: None,
            min_operand: None,
            max_operand: None,
            dry_run: false,
            json: false,
            pretty: false,
            summary: false,
            concurrency: None,
            config: None,
            debug: false,
            verbose: false,
        }
    }

    fn file_config_with_defaults(defaults: DefaultsConfig) -> FileConfig {
        FileConfig {
            defaults: Some(defaults),
            output: None,
        }
    }

    #[test]
    fn test_zero_argument_invocation_is_valid() {
        let args = create_test_args();
        assert!(validate_args(&args).is_ok());

        let config = build_config(&args, &FileConfig::default()).unwrap();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.generate.count, 20);
    }

    #[test]
    fn test_validate_concurrency_bounds() {
        let mut args = create_test_args();
        args.concurrency = Some(0);
        assert!(validate_args(&args).is_err());

        args.concurrency = Some(101);
        assert!(validate_args(&args).is_err());

        args.concurrency = Some(100);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_count_and_range() {
        let mut args = create_test_args();
        args.count = Some(MAX_BATCH_SIZE + 1);
        assert!(validate_args(&args).is_err());

        let mut args = create_test_args();
        args.min_operand = Some(10);
        args.max_operand = Some(-10);
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_expressions_conflict_with_generator_flags() {
        let mut args = create_test_args();
        args.expressions = vec!["7+3".to_string()];
        assert!(validate_args(&args).is_ok());

        args.seed = Some(1);
        let err = validate_args(&args).unwrap_err();
        assert!(err.contains("EXPRESSIONS"));
    }

    #[test]
    fn test_leading_minus_expressions_parse_as_expressions() {
        let args = Args::try_parse_from(["batch-calc", "-4*2", "-c", "3"]).unwrap();
        assert_eq!(args.expressions, vec!["-4*2".to_string(), "-c".to_string(), "3".to_string()]);
        assert!(validate_args(&args).is_err());

        let args = Args::try_parse_from(["batch-calc", "-c", "3", "-4*2", "-1 - -1"]).unwrap();
        assert_eq!(args.concurrency, Some(3));
        assert_eq!(args.expressions, vec!["-4*2".to_string(), "-1 - -1".to_string()]);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_is_known_flag() {
        assert!(is_known_flag("-v"));
        assert!(is_known_flag("-n5"));
        assert!(is_known_flag("--json"));
        assert!(is_known_flag("--config=foo.toml"));
        assert!(is_known_flag("--help"));
        assert!(!is_known_flag("-4*2"));
        assert!(!is_known_flag("--4"));
        assert!(!is_known_flag("7+3"));
        assert!(!is_known_flag("-"));
    }

    #[test]
    fn test_json_and_pretty_conflict() {
        let mut args = create_test_args();
        args.json = true;
        args.pretty = true;
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_default_log_level() {
        let mut args = create_test_args();
        assert_eq!(default_log_level(&args), "warn");
        args.verbose = true;
        assert_eq!(default_log_level(&args), "info");
        args.debug = true;
        assert_eq!(default_log_level(&args), "debug");
    }

    #[test]
    fn test_file_config_applies_when_flags_absent() {
        let args = create_test_args();
        let file_config = file_config_with_defaults(DefaultsConfig {
            concurrency: Some(3),
            count: Some(7),
            seed: Some(11),
            min_operand: Some(-5),
            max_operand: Some(5),
        });

        let config = build_config(&args, &file_config).unwrap();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.generate.count, 7);
        assert_eq!(config.generate.seed, Some(11));
        assert_eq!(config.generate.min_operand, -5);
        assert_eq!(config.generate.max_operand, 5);
    }

    #[test]
    fn test_cli_args_override_file_config() {
        let mut args = create_test_args();
        args.concurrency = Some(8);
        args.seed = Some(99);

        let file_config = file_config_with_defaults(DefaultsConfig {
            concurrency: Some(3),
            count: Some(7),
            seed: Some(11),
            ..Default::default()
        });

        let config = build_config(&args, &file_config).unwrap();
        assert_eq!(config.concurrency, 8); // CLI wins
        assert_eq!(config.generate.seed, Some(99)); // CLI wins
        assert_eq!(config.generate.count, 7); // file preserved
    }

    #[test]
    fn test_merged_range_is_validated() {
        let mut args = create_test_args();
        args.max_operand = Some(3);
        let file_config = file_config_with_defaults(DefaultsConfig {
            min_operand: Some(10),
            ..Default::default()
        });

        assert!(build_config(&args, &file_config).is_err());
    }

    #[test]
    fn test_output_options_precedence() {
        let file_config = FileConfig {
            defaults: None,
            output: Some(OutputConfig {
                pretty: Some(true),
                summary: Some(true),
                json_pretty: Some(false),
            }),
        };

        let args = create_test_args();
        let output = build_output_options(&args, &file_config);
        assert!(output.pretty);
        assert!(output.summary);
        assert!(!output.json_pretty);

        let mut args = create_test_args();
        args.json = true;
        let output = build_output_options(&args, &file_config);
        assert!(output.json);
        assert!(!output.pretty);
    }

    #[test]
    fn test_output_options_defaults() {
        let output = build_output_options(&create_test_args(), &FileConfig::default());
        assert_eq!(
            output,
            OutputOptions {
                json: false,
                json_pretty: true,
                pretty: false,
                summary: false,
            }
        );
    }

    #[test]
    fn test_get_requests_from_expressions() {
        let mut args = create_test_args();
        args.expressions = vec!["7+3".to_string(), "bogus".to_string(), "9 / 0".to_string()];

        let config = CalcConfig::default();
        let requests = get_requests(&args, &config, &OperationRegistry::new()).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], PendingRequest::new(0, 7, '+', 3));
        assert_eq!(requests[1], PendingRequest::new(1, 9, '/', 0));
    }

    #[test]
    fn test_get_requests_all_invalid() {
        let mut args = create_test_args();
        args.expressions = vec!["nope".to_string()];

        let result = get_requests(&args, &CalcConfig::default(), &OperationRegistry::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_get_requests_random_batch() {
        let args = create_test_args();
        let config = CalcConfig::default().with_count(12).with_seed(3);

        let requests = get_requests(&args, &config, &OperationRegistry::new()).unwrap();
        assert_eq!(requests.len(), 12);
        assert!(requests
            .iter()
            .all(|r| (0..=99).contains(&r.a) && (0..=99).contains(&r.b)));
    }

    #[test]
    fn test_json_output_shape() {
        let reports = vec![UnitReport::success(
            "ThreadId(2)".to_string(),
            &PendingRequest::new(0, 7, '+', 3),
            10,
        )];
        let summary = BatchSummary {
            total: 1,
            completed: 1,
            succeeded: 1,
            ..Default::default()
        };

        let notices = vec![CalcError::DuplicateTask { task_id: 0 }];

        let value = serde_json::to_value(JsonOutput {
            reports: &reports,
            notices: &notices,
            summary: &summary,
        })
        .unwrap();
        assert_eq!(value["reports"][0]["result"], 10);
        assert_eq!(value["notices"][0]["kind"], "duplicate_task");
        assert_eq!(value["notices"][0]["task_id"], 0);
        assert_eq!(value["summary"]["succeeded"], 1);
    }
}
