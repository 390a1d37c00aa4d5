use crate::config::{CliOverrides, Config, TableLayout};
use crate::error::Result;
use crate::job::ConversionJob;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pdf-tables")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert tables in PDF files into Excel workbooks")]
#[command(
    long_about = "pdf-tables converts the tables found in one or more PDF files, or in every PDF \
                  under a folder, into .xlsx workbooks. A folder's hierarchy is mirrored under \
                  the output directory, and one unreadable file never stops the batch."
)]
#[command(before_help = "📊 pdf-tables - batch PDF table extraction")]
#[command(after_help = "EXAMPLES:\n  \
    pdf-tables invoices/ -o spreadsheets/\n  \
    pdf-tables report.pdf summary.pdf -o out/\n  \
    pdf-tables scans/ --layout merged --workers 4\n  \
    pdf-tables scans/ --dry-run\n  \
    pdf-tables --generate-config --config pdf-tables.toml")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// PDF files, or a single folder to convert recursively
    #[arg(required_unless_present = "generate_config", num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Output directory (defaults to ./converted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// How tables of one PDF are laid out in its workbook
    #[arg(long, value_enum)]
    pub layout: Option<Layout>,

    /// Number of files converted concurrently (0 = one per CPU)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Per-file extraction timeout in seconds (0 disables it)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Keep every cell as text instead of detecting numeric columns
    #[arg(long)]
    pub no_numeric: bool,

    /// Write a folder's output under <output>/<folder name>
    #[arg(long)]
    pub nest_under_source_name: bool,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, help = "List the files that would be converted without converting them")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Write a sample configuration file (to --config or ./pdf-tables.toml)")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Layout {
    /// One worksheet per detected table
    SheetPerTable,
    /// All tables of a PDF on a single worksheet
    Merged,
}

impl From<Layout> for TableLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::SheetPerTable => TableLayout::SheetPerTable,
            Layout::Merged => TableLayout::Merged,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_destination(self.output.clone())
            .with_layout(self.layout.map(TableLayout::from))
            .with_workers(self.workers)
            .with_task_timeout(self.timeout)
            .with_no_numeric(self.no_numeric)
            .with_nest_under_source_name(self.nest_under_source_name.then_some(true))
    }

    /// Build the job from the positional inputs and the resolved config.
    pub fn conversion_job(&self, config: &Config) -> Result<ConversionJob> {
        let job = ConversionJob::from_inputs(&self.inputs, config.output.destination.clone())?;

        if config.output.nest_under_source_name {
            Ok(job.nested_under_source_name())
        } else {
            Ok(job)
        }
    }
}
