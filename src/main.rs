use clap::{Args, Parser, Subcommand};
use log::{error, info, LevelFilter};
use openaq_collect::{Collector, CollectorError, Config, IndicatorCollector, ResultTable};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Collect per-country air quality averages from OpenAQ and health indicators from IHME.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Output CSV path. Defaults to `<data_path>/openaq_data.csv` or `<data_path>/ihme_data.csv`.
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Runs `air-quality` when omitted.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Average OpenAQ yearly sensor summaries per country.
    AirQuality(AirQualityArgs),
    /// Fetch one IHME indicator estimate per country.
    Health(HealthArgs),
}

#[derive(Args, Debug, Default)]
struct AirQualityArgs {
    /// Seed for sensor sampling, overrides `collection.seed`.
    #[arg(long)]
    seed: Option<u64>,
}

/// Each flag overrides the matching key of the `indicator` config section.
#[derive(Args, Debug, Default)]
struct HealthArgs {
    #[arg(long)]
    indicator_id: Option<u32>,

    #[arg(long)]
    year: Option<i32>,

    #[arg(long)]
    sex_id: Option<u32>,

    #[arg(long)]
    age_group_id: Option<u32>,

    #[arg(long)]
    scenario: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CollectorError> {
    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Some(Command::Health(args)) => {
            apply_health_overrides(&mut config, &args);
            let output = cli.output.unwrap_or_else(|| config.ihme_output_path());
            let collector = IndicatorCollector::from_config(&config)?;
            let table = collector.collect_configured(&config).await?;
            write(&table, &output)
        }
        Some(Command::AirQuality(args)) => run_air_quality(config, args, cli.output).await,
        None => run_air_quality(config, AirQualityArgs::default(), cli.output).await,
    }
}

async fn run_air_quality(
    mut config: Config,
    args: AirQualityArgs,
    output: Option<PathBuf>,
) -> Result<(), CollectorError> {
    if args.seed.is_some() {
        config.collection.seed = args.seed;
    }
    let output = output.unwrap_or_else(|| config.output_path());

    let collector = Collector::from_config(&config)?;
    let table = collector.collect_configured(&config).await?;
    write(&table, &output)
}

fn apply_health_overrides(config: &mut Config, args: &HealthArgs) {
    let indicator = &mut config.indicator;
    if let Some(indicator_id) = args.indicator_id {
        indicator.indicator_id = indicator_id;
    }
    if let Some(year) = args.year {
        indicator.year = year;
    }
    if let Some(sex_id) = args.sex_id {
        indicator.sex_id = sex_id;
    }
    if let Some(age_group_id) = args.age_group_id {
        indicator.age_group_id = age_group_id;
    }
    if let Some(scenario) = args.scenario {
        indicator.scenario = scenario;
    }
}

fn write(table: &ResultTable, output: &Path) -> Result<(), CollectorError> {
    table.write_csv(output)?;
    info!(
        "Wrote {} countries x {} columns to {}",
        table.len(),
        table.parameters().len(),
        output.display()
    );
    Ok(())
}
