//! Unit tests for the CLI commands and points ingestion.

use super::commands::{derive_data_source_name, run_command};
use super::test_helpers::{
    create_points_file, run_cli_expecting_error, run_command_expecting_error, run_defaults,
    temp_dir,
};
use super::{Cli, CliError, Command, ExecutionSummary, PointsError, render_summary, run_cli};

use std::path::Path;

use agglo_core::{Algorithm, HacError, LinkageKind};
use agglo_test_support::tracing::RecordingLayer;
use clap::Parser;
use rstest::rstest;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const LINE: &str = "# objects on a line\n0\n1\n3\n7\n";

#[rstest]
#[case::override_name("/tmp/source.txt", Some("override"), "override")]
#[case::stem_with_extension("/tmp/source.txt", None, "source")]
#[case::stem_without_extension("/tmp/source", None, "source")]
#[case::missing_stem("", None, "data_source")]
fn derive_data_source_name_selects_expected_name(
    #[case] raw_path: &str,
    #[case] override_name: Option<&'static str>,
    #[case] expected: &str,
) {
    let path = Path::new(raw_path);
    let name = derive_data_source_name(path, override_name);
    assert_eq!(name, expected);
}

#[rstest]
fn run_prints_merge_table(
    #[values(Algorithm::Naive, Algorithm::Anderberg, Algorithm::NnChain)] algorithm: Algorithm,
) -> TestResult {
    let dir = temp_dir();
    let path = create_points_file(&dir, "line.txt", LINE)?;
    let mut command = run_defaults(path);
    command.linkage = LinkageKind::Single;
    command.algorithm = algorithm;

    let summary = run_cli(Cli {
        command: Command::Run(command),
    })?;
    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    assert_eq!(
        String::from_utf8(buffer)?,
        "data source: line\nmerges: 3\n0\t1\t0\t1\t2\n1\t2\t4\t2\t3\n2\t3\t5\t4\t4\n"
    );
    Ok(())
}

#[rstest]
fn squared_flag_reports_squared_heights() -> TestResult {
    let dir = temp_dir();
    let path = create_points_file(&dir, "line.txt", LINE)?;
    let mut command = run_defaults(path);
    command.linkage = LinkageKind::Single;
    command.squared = true;
    command.name = Some("squares".into());

    let summary = run_command(command)?;
    assert_eq!(summary.data_source, "squares");
    assert!(summary.history.is_squared());
    assert_eq!(summary.history.distances(), &[1.0, 4.0, 16.0]);
    Ok(())
}

#[rstest]
fn disabling_order_repair_keeps_chain_order() -> TestResult {
    // Objects at 0, 1, 10, 10.5 under centroid linkage: the chain finds the
    // wider pair first.
    let dir = temp_dir();
    let path = create_points_file(&dir, "pairs.txt", "0\n1\n10\n10.5\n")?;
    let mut command = run_defaults(path.clone());
    command.linkage = LinkageKind::Centroid;
    command.no_optimize_order = true;
    let raw = run_command(command)?;
    assert_eq!(raw.history.distances(), &[1.0, 0.5, 9.75]);

    let mut command = run_defaults(path);
    command.linkage = LinkageKind::Centroid;
    let repaired = run_command(command)?;
    assert_eq!(repaired.history.distances(), &[0.5, 1.0, 9.75]);
    Ok(())
}

#[rstest]
fn run_rejects_empty_files() -> TestResult {
    let dir = temp_dir();
    let path = create_points_file(&dir, "empty.txt", "# nothing here\n")?;
    let err = run_cli_expecting_error(
        Cli {
            command: Command::Run(run_defaults(path)),
        },
        "empty input must fail",
    );
    assert!(matches!(err, CliError::Core(HacError::EmptySource { .. })));
    Ok(())
}

#[rstest]
fn run_rejects_malformed_points() -> TestResult {
    let dir = temp_dir();
    let path = create_points_file(&dir, "bad.txt", "1,2\n3,x\n")?;
    let err = run_command_expecting_error(run_defaults(path), "malformed input must fail");
    assert!(matches!(
        err,
        CliError::Points(PointsError::InvalidNumber { line: 2, .. })
    ));
    Ok(())
}

#[rstest]
fn render_summary_handles_single_point() -> TestResult {
    let dir = temp_dir();
    let path = create_points_file(&dir, "one.txt", "4,2\n")?;
    let summary: ExecutionSummary = run_command(run_defaults(path))?;
    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    assert_eq!(String::from_utf8(buffer)?, "data source: one\nmerges: 0\n");
    Ok(())
}

#[rstest]
fn clap_parses_run_options() {
    let cli = Cli::try_parse_from([
        "agglo",
        "run",
        "points.txt",
        "--linkage",
        "ward",
        "--algorithm",
        "anderberg",
        "--no-optimize-order",
        "--squared",
        "--name",
        "demo",
    ])
    .expect("arguments must parse");
    let Command::Run(run) = cli.command;
    assert_eq!(run.path, Path::new("points.txt"));
    assert_eq!(run.linkage, LinkageKind::Ward);
    assert_eq!(run.algorithm, Algorithm::Anderberg);
    assert!(run.no_optimize_order);
    assert!(run.squared);
    assert_eq!(run.name.as_deref(), Some("demo"));
}

#[rstest]
fn clap_applies_defaults() {
    let cli = Cli::try_parse_from(["agglo", "run", "points.txt"]).expect("arguments must parse");
    let Command::Run(run) = cli.command;
    assert_eq!(run.linkage, LinkageKind::GroupAverage);
    assert_eq!(run.algorithm, Algorithm::NnChain);
    assert!(!run.no_optimize_order);
    assert!(!run.squared);
}

#[rstest]
#[case::linkage("--linkage", "furthest")]
#[case::algorithm("--algorithm", "slink")]
fn clap_rejects_unknown_names(#[case] flag: &str, #[case] value: &str) {
    let result = Cli::try_parse_from(["agglo", "run", "points.txt", flag, value]);
    assert!(result.is_err());
}

#[rstest]
fn run_command_emits_tracing_fields() -> TestResult {
    let dir = temp_dir();
    let path = create_points_file(&dir, "line.txt", LINE)?;
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());

    let summary =
        tracing::subscriber::with_default(subscriber, || run_command(run_defaults(path)))?;
    assert_eq!(summary.data_source, "line");

    let execute = layer.span("cli.execute").expect("cli.execute span must exist");
    assert!(
        execute
            .fields
            .get("path")
            .is_some_and(|value| value.ends_with("line.txt"))
    );
    assert_eq!(
        execute.fields.get("override_name"),
        Some(&"<derived>".to_owned())
    );

    let run = layer.span("hac.run").expect("hac.run span must exist");
    assert_eq!(run.fields.get("data_source"), Some(&"line".to_owned()));
    assert_eq!(run.fields.get("items"), Some(&"4".to_owned()));

    let completed = layer
        .events_at(Level::INFO)
        .into_iter()
        .find(|event| event.message() == Some("command completed"))
        .expect("completion event must exist");
    assert_eq!(completed.field("data_source"), Some("line"));
    assert_eq!(completed.field("merges"), Some("3"));
    assert_eq!(completed.field("dims"), Some("1"));
    Ok(())
}

#[rstest]
fn open_reader_records_path_on_error() -> TestResult {
    let dir = temp_dir();
    let missing_path = dir.path().join("missing.txt");
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());

    let err = tracing::subscriber::with_default(subscriber, || {
        run_command(run_defaults(missing_path.clone()))
    })
    .expect_err("missing file must fail");
    assert!(matches!(err, CliError::Io { .. }));

    let reader_span = layer
        .span("cli.open_reader")
        .expect("reader span must exist");
    assert!(
        reader_span
            .fields
            .get("path")
            .is_some_and(|value| value.ends_with("missing.txt"))
    );
    Ok(())
}
