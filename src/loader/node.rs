//! loader::node
//!
//! Module strategies backed by a JavaScript runtime process.
//!
//! Each strategy runs a short helper script that loads the module, looks up
//! the export and prints it as JSON on stdout. A missing export is signalled
//! with exit status [`MISSING_EXPORT_STATUS`] so it can be told apart from a
//! module that failed to evaluate.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

use super::{LoadError, ModuleFormat};

/// Exit status the helper scripts use for "loaded, but no such export".
pub const MISSING_EXPORT_STATUS: i32 = 3;

/// Longest stderr excerpt kept in a [`LoadError::Runtime`].
const STDERR_LIMIT: usize = 2000;

const IMPORT_SCRIPT: &str = r#"
import { pathToFileURL } from 'node:url';
const [, file, name] = process.argv;
const mod = await import(pathToFileURL(file).href);
if (mod[name] === undefined) {
  process.exitCode = 3;
} else {
  process.stdout.write(JSON.stringify(mod[name]));
}
"#;

const REQUIRE_SCRIPT: &str = r#"
const path = require('node:path');
const [, file, name] = process.argv;
const mod = require(path.resolve(file));
if (mod == null || mod[name] === undefined) {
  process.exitCode = 3;
} else {
  process.stdout.write(JSON.stringify(mod[name]));
}
"#;

/// Loads the artifact as an ES module (`import()`).
#[derive(Debug, Clone)]
pub struct ImportModule {
    program: String,
}

impl ImportModule {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ModuleFormat for ImportModule {
    fn name(&self) -> &'static str {
        "import"
    }

    fn load_export(&self, path: &Path, export: &str) -> Result<Value, LoadError> {
        let output = run(
            &self.program,
            &["--input-type=module", "-e", IMPORT_SCRIPT],
            path,
            export,
        )?;
        interpret(output, export)
    }
}

/// Loads the artifact as a CommonJS module (`require()`).
#[derive(Debug, Clone)]
pub struct RequireModule {
    program: String,
}

impl RequireModule {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ModuleFormat for RequireModule {
    fn name(&self) -> &'static str {
        "require"
    }

    fn load_export(&self, path: &Path, export: &str) -> Result<Value, LoadError> {
        let output = run(
            &self.program,
            &["--input-type=commonjs", "-e", REQUIRE_SCRIPT],
            path,
            export,
        )?;
        interpret(output, export)
    }
}

fn run(program: &str, args: &[&str], path: &Path, export: &str) -> Result<Output, LoadError> {
    Command::new(program)
        .args(args)
        .arg(path)
        .arg(export)
        .output()
        .map_err(|source| LoadError::Spawn {
            program: program.to_string(),
            source,
        })
}

/// Map a finished helper process onto a load result.
fn interpret(output: Output, export: &str) -> Result<Value, LoadError> {
    if output.status.code() == Some(MISSING_EXPORT_STATUS) {
        return Err(LoadError::MissingExport {
            export: export.to_string(),
        });
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LoadError::Runtime {
            status: output.status.to_string(),
            stderr: excerpt(stderr.trim()),
        });
    }

    serde_json::from_slice(&output.stdout).map_err(|e| LoadError::InvalidJson(e.to_string()))
}

fn excerpt(stderr: &str) -> String {
    if stderr.len() <= STDERR_LIMIT {
        return stderr.to_string();
    }
    let mut end = STDERR_LIMIT;
    while !stderr.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &stderr[..end])
}
