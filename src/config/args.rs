use crate::core::processor::DEFAULT_BATCH_PATTERN;
use crate::core::reference::SAMPLE_CSV_NAME;
use crate::domain::model::{Alignment, CellPosition, ImageOptions, ReplaceOptions};
use crate::utils::error::{AutomationError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{validate_file_extension, validate_range, Validate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "hwpx-automation", version)]
#[command(about = "Tax invoice extraction and HWPX document automation")]
pub struct CliConfig {
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, global = true, default_value = "compact")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Extract tax invoice fields into JSON
    Extract(ExtractArgs),
    /// Generate placeholder terms from a tax invoice
    Terms(TermsArgs),
    /// Search and replace terms in HWPX documents
    Replace(ReplaceArgs),
    /// Insert an image into a table cell
    InsertImage(InsertImageArgs),
    /// List the tables of an HWPX document
    Tables(TablesArgs),
    /// Write sample reference files
    Samples(SamplesArgs),
    /// Check OCR engine, inputs and output directory
    Doctor(DoctorArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    /// Invoice file (pdf, txt or image)
    pub input: PathBuf,

    #[arg(short, long, default_value = "output.json")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct TermsArgs {
    /// Invoice file (pdf, txt or image)
    pub input: PathBuf,

    /// Output reference file (.csv or .json)
    #[arg(short, long, default_value = "invoice_terms.json")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct ReplaceArgs {
    /// HWPX file to process
    pub input: Option<PathBuf>,

    /// Reference data file (csv, json, xlsx)
    #[arg(short, long, default_value = SAMPLE_CSV_NAME)]
    pub reference: PathBuf,

    /// Output file for single-file mode (.hwpx, .txt or .json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Process every matching file in this folder
    #[arg(short, long, value_name = "FOLDER_PATH", conflicts_with = "input")]
    pub batch: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_BATCH_PATTERN)]
    pub pattern: String,

    /// Output folder for batch mode
    #[arg(long, default_value = "./processed")]
    pub output_dir: PathBuf,

    #[arg(long, help = "Show matches without changing anything")]
    pub preview: bool,

    #[arg(long)]
    pub case_sensitive: bool,

    #[arg(long)]
    pub whole_word: bool,

    #[arg(long, help = "Treat search terms as regular expressions")]
    pub regex: bool,

    #[arg(long)]
    pub no_backup: bool,

    /// Maximum replacements per term (unlimited when omitted)
    #[arg(long)]
    pub max_replacements: Option<usize>,
}

impl ReplaceArgs {
    pub fn options(&self) -> ReplaceOptions {
        ReplaceOptions {
            case_sensitive: self.case_sensitive,
            whole_word_only: self.whole_word,
            use_regex: self.regex,
            max_replacements_per_term: self.max_replacements,
            preview_only: self.preview,
            backup_original: !self.no_backup,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct InsertImageArgs {
    pub input: PathBuf,
    pub image: PathBuf,
    pub output: PathBuf,
    pub table: usize,
    pub row: usize,
    pub column: usize,

    #[arg(long, default_value_t = 100.0)]
    pub width: f64,

    #[arg(long, default_value_t = 80.0)]
    pub height: f64,

    #[arg(long, help = "Stretch to the exact width and height")]
    pub no_ratio: bool,

    #[arg(long, value_enum, default_value = "center")]
    pub alignment: Alignment,
}

impl InsertImageArgs {
    pub fn position(&self) -> CellPosition {
        CellPosition {
            table: self.table,
            row: self.row,
            column: self.column,
        }
    }

    pub fn image_options(&self) -> ImageOptions {
        ImageOptions {
            width_mm: self.width,
            height_mm: self.height,
            maintain_ratio: !self.no_ratio,
            alignment: self.alignment,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct TablesArgs {
    pub input: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct SamplesArgs {
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct DoctorArgs {
    /// Fail when no OCR engine is available
    #[arg(long)]
    pub require_ocr: bool,

    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Documents that must exist
    pub documents: Vec<PathBuf>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

fn path_str(path: &std::path::Path) -> String {
    path.display().to_string()
}

impl Validate for ReplaceArgs {
    fn validate(&self) -> Result<()> {
        if self.input.is_none() && self.batch.is_none() {
            return Err(AutomationError::MissingConfigError {
                field: "input or --batch".to_string(),
            });
        }
        if let Some(output) = &self.output {
            validate_file_extension("output", &path_str(output), &["hwpx", "txt", "json"])?;
        }
        if self.pattern.trim().is_empty() {
            return Err(AutomationError::InvalidConfigValueError {
                field: "pattern".to_string(),
                value: self.pattern.clone(),
                reason: "Pattern cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl Validate for InsertImageArgs {
    fn validate(&self) -> Result<()> {
        validate_file_extension("input", &path_str(&self.input), &["hwpx"])?;
        validate_file_extension("output", &path_str(&self.output), &["hwpx"])?;
        validate_range("width", self.width, 1.0, 1000.0)?;
        validate_range("height", self.height, 1.0, 1000.0)?;
        Ok(())
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Replace(args) => args.validate(),
            Command::InsertImage(args) => args.validate(),
            Command::Terms(args) => {
                validate_file_extension("output", &path_str(&args.output), &["csv", "json"])
            }
            Command::Extract(_) | Command::Tables(_) | Command::Samples(_) | Command::Doctor(_) => {
                Ok(())
            }
        }
    }
}
