#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use log::warn;
use std::path::PathBuf;
use std::process;

use prsrap::config::LaunchConfig;
use prsrap::eval::plot::{self, FacetGrid};
use prsrap::eval::tables;
use prsrap::ram::{self, DEFAULT_NUM_FEATURES, DEFAULT_NUM_SAMPLES};
use prsrap::shared::api::DxApiClient;
use prsrap::workflows::automl::AutomlArgs;
use prsrap::workflows::basil::BasilArgs;
use prsrap::workflows::filter_vars::{FilterVarsArgs, FilterVarsBasilArgs, FilterVarsClumpsArgs};
use prsrap::workflows::gwas::GwasArgs;
use prsrap::workflows::prsice::PrsiceArgs;
use prsrap::workflows::score_preds::ScorePredsArgs;
use prsrap::workflows::{self, Launcher};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    name = "prsrap",
    about = "Launch GWAS and PRS workflows on the UK Biobank RAP and compare their scores",
    version
)]
pub struct Cli {
    /// TOML file overriding workflow IDs, instance types and default paths
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args)]
pub struct TablesArgs {
    /// Local directory for the four score tables (defaults to the configured save_dir)
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct PlotArgs {
    /// Directory holding the test_*_scores.csv tables (defaults to the configured save_dir)
    #[arg(long, value_name = "DIR")]
    pub scores_dir: Option<PathBuf>,

    /// Metric column to plot
    #[arg(long, default_value = "r2")]
    pub metric: String,

    /// Print the chart to stdout instead of opening the interactive display
    #[arg(long)]
    pub print: bool,

    /// Width of the printed chart in characters
    #[arg(long, default_value = "160", requires = "print")]
    pub width: u16,

    /// Height of the printed chart in lines
    #[arg(long, default_value = "48", requires = "print")]
    pub height: u16,
}

#[derive(Args)]
pub struct EstimateRamArgs {
    /// Number of samples in the genotype matrix
    #[arg(long, default_value_t = DEFAULT_NUM_SAMPLES)]
    pub num_samples: u64,

    /// Number of variants kept after filtering
    #[arg(long, default_value_t = DEFAULT_NUM_FEATURES)]
    pub num_features: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a PLINK2 GWAS on the training split
    #[command(about = "Launch a PLINK2 GWAS (outputs: {pheno}_glm[_wb][_dev])")]
    Gwas(GwasArgs),

    /// Fit a clumping and thresholding PRS with PRSice-2
    #[command(about = "Launch PRSice-2 clumping and thresholding")]
    Prsice(PrsiceArgs),

    /// Fit a penalized PRS with BASIL
    #[command(about = "Launch a BASIL iterative screening fit")]
    Basil(BasilArgs),

    /// Fit an AutoML PRS on a pre-filtered variant set
    #[command(about = "Launch an AutoML PRS fit")]
    Automl(AutomlArgs),

    /// Filter variants for AutoML using GWAS summary statistics
    #[command(about = "Launch variant filtering from GWAS summary statistics")]
    FilterVars(FilterVarsArgs),

    /// Filter variants for AutoML using PRSice-2 clumps
    #[command(about = "Launch variant filtering from PRSice-2 clumps")]
    FilterVarsClumps(FilterVarsClumpsArgs),

    /// Filter variants for AutoML using BASIL's selected features
    #[command(about = "Launch variant filtering from BASIL's selected features")]
    FilterVarsBasil(FilterVarsBasilArgs),

    /// Score a fitted model's validation and test predictions
    #[command(about = "Launch scoring of a model's predictions (outputs: scores.json)")]
    ScorePreds(ScorePredsArgs),

    /// Download all available scores into four CSV tables
    #[command(about = "Aggregate score artifacts (outputs: {val,test_all,test_wb,test_nwb}_scores.csv)")]
    Tables(TablesArgs),

    /// Plot a metric across models, phenotypes and test partitions
    #[command(about = "Plot a metric from the test score tables")]
    Plot(PlotArgs),

    /// Estimate memory needed by the variant-filter stage
    #[command(about = "Estimate RAM for a dense genotype matrix and its XᵀX")]
    EstimateRam(EstimateRamArgs),

    /// Print the effective configuration as TOML
    #[command(about = "Print the effective configuration as TOML")]
    ShowConfig,

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { config, command } = Cli::parse();

    let result = match command {
        Some(command) => match LaunchConfig::load_or_default(config.as_deref()) {
            Ok(config) => run(command, &config),
            Err(e) => Err(e.into()),
        },
        None => {
            let _ = Cli::command().print_help();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(command: Commands, config: &LaunchConfig) -> CliResult {
    match command {
        Commands::Gwas(args) => run_launcher(&args, config),
        Commands::Prsice(args) => run_launcher(&args, config),
        Commands::Basil(args) => run_launcher(&args, config),
        Commands::Automl(args) => run_launcher(&args, config),
        Commands::FilterVars(args) => run_launcher(&args, config),
        Commands::FilterVarsClumps(args) => run_launcher(&args, config),
        Commands::FilterVarsBasil(args) => run_launcher(&args, config),
        Commands::ScorePreds(args) => run_launcher(&args, config),
        Commands::Tables(args) => run_tables(args, config),
        Commands::Plot(args) => run_plot(args, config),
        Commands::EstimateRam(args) => {
            run_estimate_ram(args);
            Ok(())
        }
        Commands::ShowConfig => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Commands::Version => {
            print_version_info();
            Ok(())
        }
    }
}

fn run_launcher(launcher: &dyn Launcher, config: &LaunchConfig) -> CliResult {
    workflows::launch(launcher, config, DxApiClient::from_env)?;
    Ok(())
}

fn run_tables(args: TablesArgs, config: &LaunchConfig) -> CliResult {
    let save_dir = args.save_dir.unwrap_or_else(|| config.eval.save_dir.clone());
    let platform = DxApiClient::from_env()?;
    let score_tables = tables::aggregate(&platform, config)?;
    if score_tables.is_empty() {
        warn!("No scores.json artifacts were found; writing empty tables.");
    }
    for path in tables::write_tables(&save_dir, &score_tables)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_plot(args: PlotArgs, config: &LaunchConfig) -> CliResult {
    let scores_dir = args
        .scores_dir
        .unwrap_or_else(|| config.eval.save_dir.clone());
    let grid = FacetGrid::new(plot::load_plot_rows(&scores_dir, &args.metric)?);
    if args.print {
        print!(
            "{}",
            plot::render_to_text(&grid, &args.metric, args.width, args.height)?
        );
    } else {
        plot::show(&grid, &args.metric)?;
    }
    Ok(())
}

fn run_estimate_ram(args: EstimateRamArgs) {
    let estimate = ram::estimate(args.num_samples, args.num_features);
    println!(
        "{} samples x {} features",
        args.num_samples, args.num_features
    );
    println!("Genotype matrix: {:.2} GiB", estimate.genotype_gib);
    println!("XᵀX matrix:      {:.2} GiB", estimate.xtx_gib);
}

fn print_version_info() {
    println!("prsrap {}", env!("CARGO_PKG_VERSION"));
    match option_env!("PRSRAP_RELEASE_TAG") {
        Some(tag) => println!("Release: {tag}"),
        None => println!("Release: development build"),
    }
}
