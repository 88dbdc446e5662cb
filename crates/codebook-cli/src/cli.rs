//! CLI argument definitions using clap.

use clap::{ArgAction, Parser, Subcommand};
use codebook::SourceFormat;
use std::path::PathBuf;

/// Codebook: clinical data dictionary toolkit
#[derive(Parser)]
#[command(name = "codebook")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a data dictionary and show its fields and archetype mappings
    Inspect {
        /// Path to the dictionary (CSV, JSON, YAML, XML)
        #[arg(value_name = "DICTIONARY")]
        dictionary: PathBuf,

        /// Force the container format instead of detecting it
        #[arg(short, long)]
        format: Option<SourceFormat>,

        /// Skip REDCap/OMOP/FHIR parsers and use the generic one
        #[arg(long)]
        generic: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Normalize a dataset against a dictionary and score its quality
    Normalize {
        /// Path to the dictionary
        #[arg(value_name = "DICTIONARY")]
        dictionary: PathBuf,

        /// Path to the dataset (CSV/TSV)
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// Output path for the normalized dataset (default: <dataset>.normalized.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output path for the quality report (default: <dataset>.quality.json)
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Year used as "now" when checking dates
        #[arg(long)]
        reference_year: Option<i32>,
    },

    /// Detect what cryptically named binary columns encode
    Detect {
        /// Path to the dataset (CSV/TSV)
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// Minimum confidence for a result to be reported
        #[arg(long, default_value = "0.6")]
        min_confidence: f64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
