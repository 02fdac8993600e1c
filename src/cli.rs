//! calidad CLI - dataset quality grading from the command line.

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use serde_json::json;

use crate::{
    analysis::{run_operations, AggregateOp},
    config::{Config, Dialect},
    dataset::{as_f64, TableScan},
    engine::QualityAssessmentEngine,
    error::{Error, Result},
    histogram::HistogramBinner,
    plot::{boxplot_chart, boxplot_summary, histogram_chart, human_count},
    registry::DatasetRegistry,
    score::QualityScorer,
};

/// calidad - Dataset Quality Grading for Columnar Text Corpora
#[derive(Parser)]
#[command(name = "calidad")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display file metadata (rows, columns) without scanning data
    Info {
        /// Path to a Parquet file
        path: PathBuf,
    },
    /// Run the full quality assessment and print bundle, score and grade
    Grade {
        /// Path to a Parquet file
        path: PathBuf,
        /// Text column name
        #[arg(long, default_value = "text")]
        text_column: String,
        /// Token-count column name
        #[arg(long, default_value = "token_count")]
        token_column: String,
        /// Id column name (omit to skip id duplicate checking)
        #[arg(long)]
        id_column: Option<String>,
        /// Sampling-pass size
        #[arg(long, default_value_t = 10_000)]
        sample_size: usize,
        /// Classifier worker count
        #[arg(long, default_value_t = 8)]
        workers: usize,
        /// Seed for a reproducible sample draw
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print a log-scale histogram chart spec for a numeric column
    Histogram {
        /// Path to a Parquet file
        path: PathBuf,
        /// Numeric column to bin
        #[arg(short, long, default_value = "token_count")]
        column: String,
        /// Bin count
        #[arg(long, default_value_t = 50)]
        bins: usize,
        /// Axis tick count
        #[arg(long, default_value_t = 6)]
        ticks: usize,
        /// Chart dialect: vega or vega-lite
        #[arg(long, default_value = "vega")]
        dialect: String,
    },
    /// Print a boxplot chart spec for a numeric column
    Boxplot {
        /// Path to a Parquet file
        path: PathBuf,
        /// Numeric column to summarize
        #[arg(short, long, default_value = "token_count")]
        column: String,
        /// Chart dialect: vega or vega-lite
        #[arg(long, default_value = "vega")]
        dialect: String,
    },
    /// Evaluate column aggregations ("row_count", "sum:col", "mean:col",
    /// "min:col", "max:col", "distinct_count:col")
    Analyze {
        /// Path to a Parquet file
        path: PathBuf,
        /// Operations to evaluate
        #[arg(short, long, required = true)]
        op: Vec<String>,
    },
    /// Dataset registry commands
    #[command(subcommand)]
    Registry(RegistryCommands),
}

#[derive(Subcommand)]
enum RegistryCommands {
    /// List every dataset under a registry root
    List {
        /// Registry root directory
        root: PathBuf,
    },
    /// Resolve a (dataset, variant, version) triple
    Resolve {
        /// Registry root directory
        root: PathBuf,
        /// Dataset slug
        dataset: String,
        /// Variant name
        variant: String,
        /// Version name
        version: String,
    },
}

/// Parses arguments and runs the requested command.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Info { path } => {
            let scan = TableScan::from_parquet(&path)?;
            println!("dataset: {}", scan.label());
            println!("rows:    {}", human_count(scan.row_count() as u64));
            println!("columns:");
            let schema = scan.schema();
            for field in schema.fields() {
                println!("  {} ({})", field.name(), field.data_type());
            }
            Ok(())
        }
        Commands::Grade {
            path,
            text_column,
            token_column,
            id_column,
            sample_size,
            workers,
            seed,
        } => {
            let mut config = Config::default()
                .with_text_column(text_column)
                .with_token_column(token_column)
                .with_sample_size(sample_size)
                .with_workers(workers);
            if let Some(id) = id_column {
                config = config.with_id_column(Some(id));
            }
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }

            let engine = QualityAssessmentEngine::new(config)?;
            let scan = TableScan::from_parquet(&path)?;
            let bundle = engine.assess(&scan)?;
            let result = QualityScorer::new().score(&bundle);

            let output = json!({ "checks": bundle, "quality": result });
            println!("{}", pretty(&output)?);
            Ok(())
        }
        Commands::Histogram {
            path,
            column,
            bins,
            ticks,
            dialect,
        } => {
            let dialect = Dialect::parse(&dialect)?;
            let scan = TableScan::from_parquet(&path)?;
            let values = collect_numeric(&scan, &column)?;
            let title = format!("'{}' in {}", column, scan.label());
            let spec = HistogramBinner::new()
                .with_bins(bins)
                .with_ticks(ticks)
                .bin(title, &values)?;
            println!("{}", pretty(&histogram_chart(&spec, dialect))?);
            Ok(())
        }
        Commands::Boxplot {
            path,
            column,
            dialect,
        } => {
            let dialect = Dialect::parse(&dialect)?;
            let scan = TableScan::from_parquet(&path)?;
            let values = collect_numeric(&scan, &column)?;
            let summary = boxplot_summary(&values)?;
            let title = format!("'{}' in {}", column, scan.label());
            println!("{}", pretty(&boxplot_chart(&title, &summary, dialect))?);
            Ok(())
        }
        Commands::Analyze { path, op } => {
            let ops = op
                .iter()
                .map(|raw| parse_op(raw))
                .collect::<Result<Vec<_>>>()?;
            let scan = TableScan::from_parquet(&path)?;
            let result = run_operations(&scan, &ops)?;
            println!("{}", pretty(&json!(result))?);
            Ok(())
        }
        Commands::Registry(RegistryCommands::List { root }) => {
            let registry = DatasetRegistry::open(root)?;
            for dataset in registry.datasets() {
                println!("{}", dataset.slug);
                for variant in &dataset.variants {
                    let versions: Vec<&str> = variant
                        .versions
                        .iter()
                        .map(|v| v.version.as_str())
                        .collect();
                    println!("  {}: {}", variant.variant, versions.join(", "));
                }
            }
            Ok(())
        }
        Commands::Registry(RegistryCommands::Resolve {
            root,
            dataset,
            variant,
            version,
        }) => {
            let registry = DatasetRegistry::open(root)?;
            let entry = registry.resolve(&dataset, &variant, &version)?;
            println!("{}", pretty(&json!(entry))?);
            Ok(())
        }
    }
}

fn collect_numeric(scan: &TableScan, column: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for batch in scan.stream(&[column])? {
        let batch = batch?;
        let Some(array) = batch.column_by_name(column) else {
            continue;
        };
        let floats = as_f64(array)?;
        values.extend(floats.iter().flatten());
    }
    Ok(values)
}

fn parse_op(raw: &str) -> Result<AggregateOp> {
    if raw == "row_count" {
        return Ok(AggregateOp::RowCount);
    }
    let Some((op, column)) = raw.split_once(':') else {
        return Err(Error::invalid_operation(format!(
            "operation '{raw}' is not 'row_count' or 'op:column'"
        )));
    };
    let column = column.to_string();
    match op {
        "sum" => Ok(AggregateOp::Sum(column)),
        "mean" => Ok(AggregateOp::Mean(column)),
        "min" => Ok(AggregateOp::Min(column)),
        "max" => Ok(AggregateOp::Max(column)),
        "distinct_count" => Ok(AggregateOp::DistinctCount(column)),
        other => Err(Error::invalid_operation(format!(
            "unknown aggregation '{other}'"
        ))),
    }
}

fn pretty(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Error::invalid_operation(format!("could not serialize output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_op() {
        assert_eq!(parse_op("row_count").unwrap(), AggregateOp::RowCount);
        assert_eq!(
            parse_op("mean:token_count").unwrap(),
            AggregateOp::Mean("token_count".to_string())
        );
        assert_eq!(
            parse_op("distinct_count:id").unwrap(),
            AggregateOp::DistinctCount("id".to_string())
        );
        assert!(parse_op("median:token_count").is_err());
        assert!(parse_op("sum").is_err());
    }

    #[test]
    fn test_cli_parses_grade_flags() {
        let cli = Cli::try_parse_from([
            "calidad",
            "grade",
            "corpus.parquet",
            "--sample-size",
            "500",
            "--workers",
            "2",
            "--seed",
            "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Grade {
                sample_size,
                workers,
                seed,
                ..
            } => {
                assert_eq!(sample_size, 500);
                assert_eq!(workers, 2);
                assert_eq!(seed, Some(7));
            }
            _ => panic!("expected grade"),
        }
    }

    #[test]
    fn test_cli_parses_registry_resolve() {
        let cli = Cli::try_parse_from([
            "calidad", "registry", "resolve", "/data", "wiki", "clean", "v1",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Registry(RegistryCommands::Resolve { .. })
        ));
    }
}
