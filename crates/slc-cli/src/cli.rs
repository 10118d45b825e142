//! Command-line argument parsing and dispatch.
//!
//! Two subcommand families, one per core: `parse` drives `slc-lexer` and
//! `slc-parser` over a source file; `trie` builds or inspects an
//! export-trie binary via `slc-trie`.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use slc_trie::ExportTrie;

#[derive(Parser)]
#[command(name = "slc")]
#[command(about = "Source-language parser and export-trie driver")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a source file and print its diagnostics.
    Parse {
        /// Source file to parse. Falls back to `largo.toml`'s
        /// `[project] source` list when omitted.
        file: Option<PathBuf>,

        /// Also dump the raw `{tag, main_token, data}` node list.
        #[arg(long)]
        ast: bool,
    },

    /// Build or inspect an export trie.
    #[command(subcommand)]
    Trie(TrieCommands),
}

#[derive(Subcommand)]
pub enum TrieCommands {
    /// Build an export trie from a symbols file and write it to disk.
    Build {
        /// One symbol per line: `name offset`, e.g. `_main 0x1000`.
        symbols: PathBuf,

        /// Output path for the serialized trie.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print every symbol an export trie file contains.
    Dump {
        /// Path to a file previously written by `trie build`.
        file: PathBuf,
    },
}

/// Parses command-line arguments and dispatches to the matching command.
/// Initializes logging exactly once, before anything else runs.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    dispatch(Cli::parse().command)
}

/// Runs one already-parsed command. Split out from [`run_cli`] so
/// integration tests can drive a command without going through real
/// process arguments.
pub fn dispatch(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Parse { file, ast } => cmd_parse(file, ast),
        Commands::Trie(TrieCommands::Build { symbols, output }) => cmd_trie_build(&symbols, &output),
        Commands::Trie(TrieCommands::Dump { file }) => cmd_trie_dump(&file),
    }
}

fn cmd_parse(file: Option<PathBuf>, dump_ast: bool) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let config = ProjectConfig::load(&cwd)?;

    let path = file
        .or_else(|| config.as_ref().and_then(|c| c.project.source.first().map(PathBuf::from)))
        .ok_or("no source file given and no [project] source in largo.toml")?;

    let source = fs::read_to_string(&path)?;
    let tokens = slc_lexer::lex(&source);
    let ast = slc_parser::parse_root(&source, &tokens);

    if dump_ast {
        for (i, node) in ast.nodes.iter().enumerate() {
            println!("{i}\t{:?}\tmain_token={}\tdata=({}, {})", node.tag, node.main_token, node.data.lhs, node.data.rhs);
        }
    }

    if ast.errors.is_empty() {
        println!("{}: no diagnostics", path.display());
    } else {
        for diag in &ast.errors {
            println!("{}", slc_parser::render_diagnostic(&source, &tokens, diag));
        }
    }

    Ok(())
}

fn cmd_trie_build(symbols_path: &Path, output_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(symbols_path)?;
    let mut trie = ExportTrie::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or_else(|| format!("{}:{}: missing symbol name", symbols_path.display(), lineno + 1))?;
        let offset_str = parts
            .next()
            .ok_or_else(|| format!("{}:{}: missing vmaddr offset", symbols_path.display(), lineno + 1))?;
        let vmaddr_offset = parse_offset(offset_str)
            .ok_or_else(|| format!("{}:{}: invalid offset {offset_str:?}", symbols_path.display(), lineno + 1))?;
        trie.put(name.as_bytes(), 0, vmaddr_offset);
    }

    trie.finalize();
    let mut bytes = Vec::new();
    trie.write(&mut bytes);
    fs::write(output_path, &bytes)?;

    println!(
        "wrote {} ({} nodes, {} bytes) to {}",
        symbols_path.display(),
        trie.node_count(),
        bytes.len(),
        output_path.display()
    );
    Ok(())
}

fn cmd_trie_dump(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    let mut trie = ExportTrie::read(&mut Cursor::new(bytes.as_slice()))?;
    trie.finalize();

    let mut symbols = trie.symbols();
    symbols.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, terminal) in &symbols {
        println!("{}\t0x{:x}\tflags=0x{:x}", String::from_utf8_lossy(name), terminal.vmaddr_offset, terminal.flags);
    }
    println!("{} symbols, {} nodes, {} bytes", symbols.len(), trie.node_count(), trie.size());
    Ok(())
}

fn parse_offset(s: &str) -> Option<u64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_offsets() {
        assert_eq!(parse_offset("0x1000"), Some(0x1000));
        assert_eq!(parse_offset("4096"), Some(4096));
        assert_eq!(parse_offset("not a number"), None);
    }

    #[test]
    fn builds_and_dumps_a_trie_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let symbols_path = dir.path().join("symbols.txt");
        fs::write(&symbols_path, "__mh_execute_header 0x0\n_main 0x1000\n").unwrap();
        let output_path = dir.path().join("out.trie");

        cmd_trie_build(&symbols_path, &output_path).unwrap();
        let bytes = fs::read(&output_path).unwrap();

        let mut trie = ExportTrie::read(&mut Cursor::new(bytes.as_slice())).unwrap();
        trie.finalize();
        let mut symbols = trie.symbols();
        symbols.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[1].0, b"_main");
        assert_eq!(symbols[1].1.vmaddr_offset, 0x1000);
    }

    #[test]
    fn parse_falls_back_to_project_config_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.slc"), "const x = 1;\n").unwrap();
        fs::write(dir.path().join("largo.toml"), "[project]\nsource = [\"src/main.slc\"]\n").unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap();
        let resolved =
            None.or_else(|| config.as_ref().and_then(|c| c.project.source.first().map(PathBuf::from))).unwrap();
        assert_eq!(resolved, PathBuf::from("src/main.slc"));
    }
}
