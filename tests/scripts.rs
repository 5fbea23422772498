//! Runs every `tests/scripts/*.lox` program and checks it against the
//! expectations written inline in its comments:
//!
//! * `//print: text`: the next line of output must be `text`.
//! * `//error: note`: this line must produce a diagnostic of any tier.
//!
//! A script without any `//error:` marker must run cleanly.  When a sibling
//! `<script>.lox.out` file exists, its lines are the expected output instead
//! of the `//print:` markers.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use loxwalk::error::LoxError;
use loxwalk::interpreter::Interpreter;
use loxwalk::Lox;
use pretty_assertions::assert_eq;

const PRINT_MARKER: &str = "//print:";
const ERROR_MARKER: &str = "//error:";

#[derive(Debug, Default)]
struct Expectations {
    output: Vec<String>,
    error_lines: BTreeSet<usize>,
}

fn expectations(path: &Path, source: &str) -> Expectations {
    let mut expected = Expectations::default();
    let out_file = path.with_extension("lox.out");
    let whole_output = out_file.exists();

    if whole_output {
        let text = fs::read_to_string(&out_file)
            .unwrap_or_else(|e| panic!("cannot read {}: {}", out_file.display(), e));
        expected.output = text.lines().map(str::to_owned).collect();
    }

    for (index, line) in source.lines().enumerate() {
        if let Some(pos) = line.find(PRINT_MARKER).filter(|_| !whole_output) {
            let text = line[pos + PRINT_MARKER.len()..].trim();
            expected.output.push(text.to_owned());
        }

        if line.contains(ERROR_MARKER) {
            expected.error_lines.insert(index + 1);
        }
    }

    expected
}

fn scripts() -> Vec<PathBuf> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("scripts");

    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", dir.display(), e))
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "lox"))
        .collect();

    paths.sort();
    paths
}

fn check_script(path: &Path) {
    let source = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e));
    let expected = expectations(path, &source);

    let output = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&output);
    let mut lox = Lox::new(Interpreter::with_printer(move |text: &str| {
        sink.borrow_mut().push(text.to_owned());
    }));

    let mut diagnostics: Vec<LoxError> = Vec::new();
    let result = lox.run(&source, &mut diagnostics);

    let mut error_lines: BTreeSet<usize> = diagnostics.iter().filter_map(LoxError::line).collect();

    match &result {
        Err(e @ LoxError::Runtime(_)) => {
            error_lines.extend(e.line());
        }
        Err(LoxError::Static { .. }) | Ok(()) => {}
        Err(other) => panic!("{}: unexpected failure: {}", path.display(), other),
    }

    assert_eq!(
        error_lines,
        expected.error_lines,
        "{}: diagnostics were {:?}, result {:?}",
        path.display(),
        diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        result
    );

    assert_eq!(
        *output.borrow(),
        expected.output,
        "{}: printed output differs",
        path.display()
    );
}

#[test]
fn test_all_scripts() {
    let paths = scripts();
    assert!(!paths.is_empty(), "no scripts found");

    for path in &paths {
        check_script(path);
    }
}
