//! Commands run against edge files on disk.

use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use vfengine_cli::OutputFormat;
use vfengine_cli::commands::run::{self, RunArgs};
use vfengine_cli::commands::stats;
use vfengine_cli::loader;
use vfengine_core::plan::SinkKind;

fn edge_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn run_args(edges: PathBuf, query: &str) -> RunArgs {
    RunArgs {
        edges,
        query: query.to_string(),
        order: Vec::new(),
        unpacked: false,
        sink: SinkKind::Count,
        cascade: false,
        sources: Vec::new(),
        relations: Vec::new(),
        debug_chunks: false,
    }
}

const EDGES: &str = "src,dst\n1,2\n1,3\n1,4\n2,3\n2,4\n3,4\n";

#[test]
fn test_run_packed_and_unpacked() {
    let file = edge_file(EDGES);
    let mut args = run_args(file.path().to_path_buf(), "a->b,b->c");
    let packed = run::execute(&args).unwrap();
    assert_eq!(packed.rows, 4);
    assert!(packed.packed);

    args.unpacked = true;
    let unpacked = run::execute(&args).unwrap();
    assert_eq!(unpacked.rows, 4);
    assert!(!unpacked.packed);
}

#[test]
fn test_run_prints_quietly() {
    let file = edge_file(EDGES);
    let mut args = run_args(file.path().to_path_buf(), "a->b");
    args.sink = SinkKind::Min;
    args.cascade = true;
    run::run(&args, OutputFormat::Table, true).unwrap();
    run::run(&args, OutputFormat::Json, true).unwrap();
}

#[test]
fn test_run_reports_plan_errors() {
    let file = edge_file(EDGES);
    let mut args = run_args(file.path().to_path_buf(), "a->b,c->d");
    args.order = vec!["a".into(), "b".into(), "c".into(), "d".into()];
    let err = run::execute(&args).unwrap_err();
    assert!(format!("{err:#}").contains("Cartesian product detected"));
}

#[test]
fn test_run_missing_file() {
    let args = run_args(PathBuf::from("/nonexistent/edges.csv"), "a->b");
    let err = run::execute(&args).unwrap_err();
    assert!(err.to_string().contains("failed to open"));
}

#[test]
fn test_stats() {
    let file = edge_file(EDGES);
    let store = loader::load_store(file.path()).unwrap();
    let output = stats::collect(&store);
    assert_eq!(output.node_count, 5);
    assert_eq!(output.edge_count, 6);
    assert_eq!(output.max_id, Some(4));
    assert_eq!(output.max_out_degree, 3);
    assert_eq!(output.max_in_degree, 3);

    stats::run(file.path(), OutputFormat::Json, true).unwrap();
}
