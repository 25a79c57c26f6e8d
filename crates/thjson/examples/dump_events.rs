//! Prints the event stream of a THJSON document.
//!
//! Reads the file named on the command line, or standard input when no file
//! is given, and prints one line per parser event with nesting shown by
//! indentation.
//!
//! ```bash
//! cargo run -p thjson --example dump_events -- save.thjson
//! ```

use std::io::Read;
use std::process::ExitCode;

use thjson::{parse_slice, CommentKind, Listener, Result, Scalar};

#[derive(Default)]
struct Dump {
    depth: usize,
}

impl Dump {
    fn line(&self, text: &str) {
        println!("{:indent$}{text}", "", indent = self.depth * 2);
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: &str) {
        self.depth -= 1;
        self.line(text);
    }
}

impl Listener for Dump {
    fn begin(&mut self) -> Result<()> {
        self.open("document");
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.close("/document");
        Ok(())
    }

    fn begin_object(&mut self, key: &str, class: &str) -> Result<()> {
        self.open(&format!("object {key}: ({class})"));
        Ok(())
    }

    fn begin_object_value(&mut self, class: &str) -> Result<()> {
        self.open(&format!("object ({class})"));
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        self.close("/object");
        Ok(())
    }

    fn begin_map(&mut self, key: &str) -> Result<()> {
        self.open(&format!("map {key}:"));
        Ok(())
    }

    fn begin_map_value(&mut self) -> Result<()> {
        self.open("map");
        Ok(())
    }

    fn end_map(&mut self) -> Result<()> {
        self.close("/map");
        Ok(())
    }

    fn begin_list(&mut self, key: &str, class: &str) -> Result<()> {
        self.open(&format!("list {key}: ({class})"));
        Ok(())
    }

    fn begin_list_value(&mut self, class: &str) -> Result<()> {
        self.open(&format!("list ({class})"));
        Ok(())
    }

    fn end_list(&mut self) -> Result<()> {
        self.close("/list");
        Ok(())
    }

    fn begin_array(&mut self, key: &str) -> Result<()> {
        self.open(&format!("array {key}:"));
        Ok(())
    }

    fn begin_array_value(&mut self) -> Result<()> {
        self.open("array");
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        self.close("/array");
        Ok(())
    }

    fn property(&mut self, key: &str, value: Scalar<'_>) -> Result<()> {
        self.line(&format!("{key} = {value:?}"));
        Ok(())
    }

    fn null_property(&mut self, key: &str) -> Result<()> {
        self.line(&format!("{key} = null"));
        Ok(())
    }

    fn value(&mut self, value: Scalar<'_>) -> Result<()> {
        self.line(&format!("{value:?}"));
        Ok(())
    }

    fn null_value(&mut self) -> Result<()> {
        self.line("null");
        Ok(())
    }

    fn comment(&mut self, text: &str, kind: CommentKind) -> Result<()> {
        self.line(&format!("comment({kind:?}): {}", text.trim()));
        Ok(())
    }

    fn directive(&mut self, text: &str) -> Result<()> {
        self.line(&format!("directive: {text}"));
        Ok(())
    }
}

fn main() -> ExitCode {
    let mut input = Vec::new();
    match std::env::args().nth(1) {
        Some(path) => match std::fs::read(&path) {
            Ok(bytes) => input = bytes,
            Err(err) => {
                eprintln!("{path}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            if let Err(err) = std::io::stdin().read_to_end(&mut input) {
                eprintln!("stdin: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    let mut dump = Dump::default();
    if let Err(err) = parse_slice(&input, &mut dump) {
        eprintln!("parse error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
