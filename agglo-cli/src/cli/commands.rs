//! Command implementations and argument parsing for the agglo CLI.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use agglo_core::{Algorithm, DataSource, HacBuilder, HacError, LinkageKind, MergeHistory};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::points::{PointCloud, PointsError};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "agglo",
    about = "Hierarchical agglomerative clustering of a points file."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Cluster a points file and print the merge history.
    Run(RunCommand),
}

/// Options accepted by the `run` command.
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Text file with one point per line, coordinates separated by commas or
    /// whitespace.
    pub path: PathBuf,

    /// Linkage: single, complete, average, weighted, centroid, median, ward.
    #[arg(long, default_value_t = LinkageKind::GroupAverage)]
    pub linkage: LinkageKind,

    /// Algorithm: naive, anderberg, nn-chain.
    #[arg(long, default_value_t = Algorithm::NnChain)]
    pub algorithm: Algorithm,

    /// Keep merges in the order the algorithm found them.
    #[arg(long = "no-optimize-order")]
    pub no_optimize_order: bool,

    /// Use squared Euclidean distances and report squared heights.
    #[arg(long)]
    pub squared: bool,

    /// Override name for the data source (defaults to the file name).
    #[arg(long)]
    pub name: Option<String>,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O failed while opening the input.
    #[error("failed to open `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The points file could not be parsed.
    #[error(transparent)]
    Points(#[from] PointsError),
    /// Clustering failed.
    #[error(transparent)]
    Core(#[from] HacError),
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Name reported by the data source implementation.
    pub data_source: String,
    /// Merge history produced by the run.
    pub history: MergeHistory,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when reading the input or clustering fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use agglo_cli::cli::{Cli, Command, RunCommand, run_cli};
/// # use agglo_core::{Algorithm, LinkageKind};
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// std::fs::write(file.path(), "0,0\n0,1\n5,5\n")?;
/// let cli = Cli {
///     command: Command::Run(RunCommand {
///         path: file.path().to_path_buf(),
///         linkage: LinkageKind::Single,
///         algorithm: Algorithm::NnChain,
///         no_optimize_order: false,
///         squared: false,
///         name: None,
///     }),
/// };
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.history.merge_count(), 2);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Run(run) => {
            Span::current().record("command", field::display("run"));
            run_command(run)
        }
    }
}

#[instrument(
    name = "cli.execute",
    err,
    skip(command),
    fields(path = field::Empty, override_name = field::Empty),
)]
pub(super) fn run_command(command: RunCommand) -> Result<ExecutionSummary, CliError> {
    let RunCommand {
        path,
        linkage,
        algorithm,
        no_optimize_order,
        squared,
        name,
    } = command;
    let span = Span::current();
    span.record("path", field::display(path.display()));
    span.record(
        "override_name",
        field::display(name.as_deref().unwrap_or("<derived>")),
    );

    let hac = HacBuilder::new()
        .with_linkage(linkage)
        .with_algorithm(algorithm)
        .with_optimize_order(!no_optimize_order)
        .build();
    let chosen_name = derive_data_source_name(&path, name.as_deref());
    let points = PointCloud::try_from_reader(chosen_name, open_reader(&path)?)?
        .with_squared(squared);
    let history = hac.run(&points)?;
    info!(
        data_source = points.name(),
        points = points.len(),
        dims = points.dims(),
        merges = history.merge_count(),
        "command completed"
    );
    Ok(ExecutionSummary {
        data_source: points.name().to_owned(),
        history,
    })
}

#[instrument(name = "cli.open_reader", err, fields(path = field::Empty))]
pub(super) fn open_reader(path: &Path) -> Result<BufReader<File>, CliError> {
    Span::current().record("path", field::display(path.display()));
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

pub(super) fn derive_data_source_name(path: &Path, override_name: Option<&str>) -> String {
    if let Some(name) = override_name {
        return name.to_owned();
    }

    path.file_stem()
        .and_then(|value| value.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| "data_source".to_owned())
}

/// Renders `summary` to `writer` as a header followed by one tab-separated
/// row per merge: index, left, right, distance, size.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use agglo_cli::cli::{ExecutionSummary, render_summary};
/// # use agglo_core::ClusterMergeHistoryBuilder;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let mut builder = ClusterMergeHistoryBuilder::new(2, false);
/// builder.strict_add(1, 0.5, 0)?;
/// let summary = ExecutionSummary {
///     data_source: "demo".into(),
///     history: builder.complete(),
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// assert_eq!(
///     String::from_utf8(buffer)?,
///     "data source: demo\nmerges: 1\n0\t1\t0\t0.5\t2\n"
/// );
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "data source: {}", summary.data_source)?;
    writeln!(writer, "merges: {}", summary.history.merge_count())?;
    for (index, merge) in summary.history.iter().enumerate() {
        writeln!(
            writer,
            "{index}\t{}\t{}\t{}\t{}",
            merge.left(),
            merge.right(),
            merge.distance(),
            merge.size()
        )?;
    }
    Ok(())
}
