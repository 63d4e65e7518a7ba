use anyhow::{Context as _, Result, bail};
use churnflow::analysis::churn::{churn_by_segment, churn_rate};
use churnflow::analysis::correlation::{HIGH_CORRELATION_THRESHOLD, correlation_matrix};
use churnflow::analysis::segmentation::segment_customers;
use churnflow::config::{DEFAULT_CONFIG_PATH, PipelineConfig};
use churnflow::etl::transformer::{TENURE_GROUP_COLUMN, Transformer};
use churnflow::etl::{Pipeline, PipelineSummary, SourceDescriptor, frame::has_column};
use churnflow::io::{self, SheetSelector};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

const CHURN_COLUMN: &str = "Churn";
const SEGMENT_FEATURES: [&str; 3] = ["tenure", "MonthlyCharges", "TotalCharges"];

#[derive(Parser)]
#[command(name = "churnflow", about = "Customer churn ETL and analysis")]
pub struct Cli {
    /// JSON configuration file. Defaults to config/settings.json when it exists.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SourceKind {
    Mock,
    Csv,
    Excel,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the extract, transform, validate and load pipeline
    Run {
        /// Source type. Inferred from the input extension when omitted.
        #[arg(short, long, value_enum)]
        source: Option<SourceKind>,

        /// Input file for csv, excel and json sources
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Worksheet name for excel sources. The first sheet is read by default.
        #[arg(long)]
        sheet: Option<String>,

        /// Number of mock records
        #[arg(short, long)]
        records: Option<usize>,

        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Base name for the output files
        #[arg(short, long)]
        base_name: Option<String>,

        #[arg(long)]
        skip_validation: bool,
    },
    /// Print churn rates and customer segments for a processed dataset
    Analyze {
        /// Dataset file (CSV, Parquet, JSON or Excel)
        #[arg(short, long)]
        data: PathBuf,

        /// Number of k-means segments
        #[arg(short = 'k', long, default_value_t = 4)]
        clusters: usize,

        /// Report numeric column pairs whose |r| exceeds this
        #[arg(long, default_value_t = HIGH_CORRELATION_THRESHOLD)]
        threshold: f64,
    },
}

/// Reads `path`, or the default config file when present, or built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(PipelineConfig::load_or_default(DEFAULT_CONFIG_PATH)?),
    }
}

/// Returns whether the command succeeded.
pub fn run_command(command: Commands, config: PipelineConfig) -> Result<bool> {
    match command {
        Commands::Run {
            source,
            input,
            sheet,
            records,
            output_dir,
            base_name,
            skip_validation,
        } => {
            let mut config = config;
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(base) = base_name {
                config.base_filename = base;
            }
            if let Some(name) = sheet {
                config.extract.excel_sheet = SheetSelector::Name(name);
            }
            config.skip_validation |= skip_validation;

            let source = resolve_source(source, input, records, &config)?;
            handle_run(config, &source)
        }
        Commands::Analyze {
            data,
            clusters,
            threshold,
        } => {
            handle_analyze(&data, clusters, threshold)?;
            Ok(true)
        }
    }
}

fn resolve_source(
    kind: Option<SourceKind>,
    input: Option<PathBuf>,
    records: Option<usize>,
    config: &PipelineConfig,
) -> Result<SourceDescriptor> {
    let sheet = config.extract.excel_sheet.clone();
    let source = match (kind, input) {
        (Some(SourceKind::Mock) | None, None) => SourceDescriptor::Mock {
            records: records.unwrap_or(config.extract.mock_records),
        },
        (None, Some(path)) => SourceDescriptor::from_path(path, sheet)?,
        (Some(SourceKind::Csv), Some(path)) => SourceDescriptor::Csv { path },
        (Some(SourceKind::Excel), Some(path)) => SourceDescriptor::Excel { path, sheet },
        (Some(SourceKind::Json), Some(path)) => SourceDescriptor::Json { path },
        (Some(SourceKind::Mock), Some(_)) => bail!("--input cannot be used with the mock source"),
        (Some(kind), None) => bail!("--input is required for the {kind:?} source"),
    };
    Ok(source)
}

fn handle_run(config: PipelineConfig, source: &SourceDescriptor) -> Result<bool> {
    let mut pipeline = Pipeline::new(config);
    let summary = pipeline.run(source)?;
    print_summary(&summary);
    println!("Run log: {}", pipeline.summary_path().display());
    Ok(summary.success)
}

fn print_summary(summary: &PipelineSummary) {
    println!("Run {} finished as {}", summary.run_id, summary.final_state);
    println!("Duration: {:.2}s", summary.duration_seconds);
    if let Some(records) = summary.records_extracted {
        println!("Records extracted: {records}");
    }
    if let Some(records) = summary.records_loaded {
        println!("Records loaded: {records}");
    }
    if let (Some(before), Some(after)) = (summary.columns_original, summary.columns_final) {
        println!("Columns: {before} -> {after}");
    }
    if let Some(report) = &summary.validation_results {
        println!(
            "Validation: {} errors, {} warnings",
            report.errors.len(),
            report.warnings.len()
        );
        for error in &report.errors {
            println!("  error: {error}");
        }
    }
    for (format, path) in &summary.output_files {
        println!("  {format}: {}", path.display());
    }
    if let Some(error) = &summary.error {
        println!("Failed: {error}");
    }
}

fn handle_analyze(data: &Path, clusters: usize, threshold: f64) -> Result<()> {
    let mut df = io::load_df(data).with_context(|| format!("Failed to load {}", data.display()))?;
    if !has_column(&df, TENURE_GROUP_COLUMN) && has_column(&df, "tenure") {
        df = Transformer::default().create_tenure_groups(&df, "tenure")?;
    }

    println!("Customers: {}", df.height());
    println!("Churn rate: {:.1}%", churn_rate(&df, CHURN_COLUMN)? * 100.0);

    for segment_column in ["Contract", TENURE_GROUP_COLUMN] {
        if !has_column(&df, segment_column) {
            continue;
        }
        println!("\nChurn by {segment_column}:");
        for (segment, churn) in churn_by_segment(&df, segment_column, CHURN_COLUMN)? {
            println!(
                "  {segment:<20} {:>5} customers  {:>5.1}%",
                churn.customers,
                churn.churn_rate * 100.0
            );
        }
    }

    match correlation_matrix(&df) {
        Ok(matrix) => {
            let pairs = matrix.high_correlations(threshold);
            println!("\nCorrelations above {threshold}: {}", pairs.len());
            for pair in pairs {
                println!("  {} ~ {}: {:+.3}", pair.first, pair.second, pair.coefficient);
            }
        }
        Err(e) => println!("\nCorrelations skipped: {e}"),
    }

    let features: Vec<String> = SEGMENT_FEATURES
        .iter()
        .filter(|f| has_column(&df, f))
        .map(|f| (*f).to_owned())
        .collect();
    if features.is_empty() {
        println!("\nNo segmentation features present");
        return Ok(());
    }

    let segmentation = segment_customers(&df, &features, clusters)?;
    println!("\nSegments (k = {clusters}):");
    for profile in &segmentation.profiles {
        let means: Vec<String> = profile
            .feature_means
            .iter()
            .map(|(name, mean)| format!("{name}={mean:.1}"))
            .collect();
        let churn = profile
            .churn_rate
            .map_or_else(|| "n/a".to_owned(), |rate| format!("{:.1}%", rate * 100.0));
        println!(
            "  #{} {:>5} customers  churn {churn:>6}  {}",
            profile.segment,
            profile.customers,
            means.join(" ")
        );
    }
    Ok(())
}
