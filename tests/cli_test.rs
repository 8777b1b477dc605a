#![cfg(test)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn write_puzzle(dir: &TempDir, structure: &str, words: &str) -> (PathBuf, PathBuf) {
    let structure_path = dir.path().join("structure.txt");
    let words_path = dir.path().join("words.txt");
    fs::write(&structure_path, structure).expect("wrote structure");
    fs::write(&words_path, words).expect("wrote words");
    (structure_path, words_path)
}

fn run_solver(args: &[&PathBuf]) -> Output {
    let solver = PathBuf::from(env!("CARGO_BIN_EXE_crossword-csp"));

    let mut command = Command::new(solver);
    let _ = command.stdout(Stdio::piped()).stderr(Stdio::piped()).stdin(Stdio::null());
    for arg in args {
        let _ = command.arg(arg);
    }

    command.output().expect("ran solver")
}

#[test]
fn prints_filled_grid() {
    let dir = TempDir::new().unwrap();
    let (structure, words) = write_puzzle(&dir, "___\n_##\n_##\n", "cat\ncar\nant\n");

    let output = run_solver(&[&structure, &words]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with('C'));
    assert!(lines[1].starts_with('A'));
    assert!(lines[1].ends_with("██"));
}

#[test]
fn writes_grid_to_output_path() {
    let dir = TempDir::new().unwrap();
    let (structure, words) = write_puzzle(&dir, "___\n", "dog\n");
    let output_path = dir.path().join("out.txt");

    let output = run_solver(&[&structure, &words, &output_path]);

    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&output_path).unwrap(), "DOG\n");
}

#[test]
fn reports_no_solution() {
    let dir = TempDir::new().unwrap();
    let (structure, words) = write_puzzle(&dir, "___\n###\n___\n", "cat\n");

    let output = run_solver(&[&structure, &words]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap().trim(), "No solution.");
}

#[test]
fn rejects_wrong_argument_count() {
    let dir = TempDir::new().unwrap();
    let (structure, _) = write_puzzle(&dir, "___\n", "cat\n");

    let output = run_solver(&[&structure]);

    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}

#[test]
fn fails_on_ragged_structure() {
    let dir = TempDir::new().unwrap();
    let (structure, words) = write_puzzle(&dir, "___\n__\n", "cat\n");

    let output = run_solver(&[&structure, &words]);

    assert_eq!(output.status.code(), Some(1));
}
