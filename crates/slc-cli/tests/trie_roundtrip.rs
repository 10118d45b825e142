//! End-to-end coverage of the `trie build` / `trie dump` pair, driven
//! through `slc_cli::cli::dispatch` — the same split `run_cli` uses
//! between argument parsing and execution, so this exercises exactly what
//! the `slc` binary would run for `slc trie build`/`slc trie dump`.

use std::fs;
use std::io::Cursor;

use slc_cli::cli::{dispatch, Commands, TrieCommands};
use slc_trie::ExportTrie;

#[test]
fn build_then_dump_recovers_every_symbol() {
    let dir = tempfile::tempdir().unwrap();
    let symbols_path = dir.path().join("symbols.txt");
    fs::write(
        &symbols_path,
        "# comment lines and blanks are ignored\n\n__mh_execute_header 0x0\n_main 0x1000\n_helper 42\n",
    )
    .unwrap();
    let output_path = dir.path().join("out.trie");

    dispatch(Commands::Trie(TrieCommands::Build { symbols: symbols_path.clone(), output: output_path.clone() }))
        .unwrap();

    let bytes = fs::read(&output_path).unwrap();
    let mut read_back = ExportTrie::read(&mut Cursor::new(bytes.as_slice())).unwrap();
    read_back.finalize();

    let mut symbols = read_back.symbols();
    symbols.sort_by(|a, b| a.0.cmp(&b.0));
    let names: Vec<Vec<u8>> = symbols.iter().map(|(name, _)| name.clone()).collect();
    assert_eq!(names, vec![b"__mh_execute_header".to_vec(), b"_helper".to_vec(), b"_main".to_vec()]);

    let main_entry = symbols.iter().find(|(name, _)| name == b"_main").unwrap();
    assert_eq!(main_entry.1.vmaddr_offset, 0x1000);

    // `trie dump` should run over the same file without error.
    dispatch(Commands::Trie(TrieCommands::Dump { file: output_path })).unwrap();
}

#[test]
fn dump_rejects_a_file_that_is_not_a_trie() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("not_a_trie.bin");
    fs::write(&bogus, [0x80u8]).unwrap();
    assert!(dispatch(Commands::Trie(TrieCommands::Dump { file: bogus })).is_err());
}
