//! End-to-end coverage of the `parse` subcommand, driven through
//! `slc_cli::cli::dispatch`.

use std::fs;
use std::sync::{Mutex, OnceLock};

use slc_cli::cli::{dispatch, Commands};

/// `cmd_parse`'s `largo.toml` fallback reads the process's current
/// directory, which is global state shared across every test in this
/// binary. Serialize the tests that touch it so they don't race.
fn cwd_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

#[test]
fn parse_reports_no_diagnostics_for_well_formed_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.slc");
    fs::write(&path, "const x = 1;\nfn f() void {}\n").unwrap();

    dispatch(Commands::Parse { file: Some(path), ast: false }).unwrap();
}

#[test]
fn parse_falls_back_to_largo_toml_when_no_file_is_given() {
    let _guard = cwd_lock().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cwd = std::env::current_dir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/main.slc"), "const x = 1;\n").unwrap();
    fs::write(dir.path().join("largo.toml"), "[project]\nsource = [\"src/main.slc\"]\n").unwrap();

    std::env::set_current_dir(dir.path()).unwrap();
    let result = dispatch(Commands::Parse { file: None, ast: true });
    std::env::set_current_dir(cwd).unwrap();

    result.unwrap();
}

#[test]
fn parse_errors_without_a_file_or_config() {
    let _guard = cwd_lock().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cwd = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let result = dispatch(Commands::Parse { file: None, ast: false });
    std::env::set_current_dir(cwd).unwrap();

    assert!(result.is_err());
}
