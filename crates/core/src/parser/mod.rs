//! Character-level recursive-descent parser.
//!
//! The parser never fails as a whole. Each declaration routine returns
//! `Result<Decl, Diagnostic>` where `Err` means the node was discarded;
//! every other complaint goes into the shared diagnostic sink and parsing
//! carries on with a best-effort node.
use crate::ast::{Contract, Decl};
use crate::cursor::Cursor;
use crate::error::{Diagnostic, DiagnosticKind};
use serde::{Deserialize, Serialize};

mod decls;
mod lexical;
mod vibe;

/// How `=name` inside vibe prose is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathRefMode {
    /// `=name` becomes a data reference, exactly like `%name`.
    #[default]
    Data,
    /// `=name` becomes a path reference and participates in ordering.
    Path,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParseOptions {
    #[serde(default)]
    pub path_refs: PathRefMode,
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser {
    cursor: Cursor,
    options: ParseOptions,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn new(cursor: Cursor, options: ParseOptions) -> Self {
        Parser {
            cursor,
            options,
            diagnostics: Vec::new(),
        }
    }

    /// Record a diagnostic at the cursor.
    fn error(&mut self, kind: DiagnosticKind) {
        let (line, col) = self.cursor.position();
        self.error_at(kind, line, col);
    }

    fn error_at(&mut self, kind: DiagnosticKind, line: u32, col: u32) {
        self.diagnostics.push(Diagnostic::new(kind, line, col));
    }

    /// A node-discarding diagnostic at the cursor, returned to the caller
    /// instead of recorded.
    fn discard(&self, kind: DiagnosticKind) -> Diagnostic {
        let (line, col) = self.cursor.position();
        Diagnostic::new(kind, line, col)
    }

    fn keep<T>(&mut self, result: Result<T, Diagnostic>) -> Option<T> {
        match result {
            Ok(node) => Some(node),
            Err(d) => {
                self.diagnostics.push(d);
                None
            }
        }
    }

    // -- Top level ----------------------------------------------

    fn parse_contract(&mut self) -> Contract {
        let mut contract = Contract::default();
        loop {
            self.skip_whitespace();
            match self.cursor.peek() {
                None => break,
                Some('@') => {
                    let space = self.parse_space();
                    if let Some(s) = self.keep(space) {
                        contract.decls.push(Decl::Space(s));
                    }
                }
                Some('#') => {
                    let agent = self.parse_agent();
                    if let Some(a) = self.keep(agent) {
                        contract.decls.push(Decl::Agent(a));
                    }
                }
                Some('=') => {
                    let path = self.parse_path();
                    if let Some(p) = self.keep(path) {
                        contract.decls.push(Decl::Path(p));
                    }
                }
                Some(c) if !c.is_ascii() => {
                    self.error(DiagnosticKind::NonAsciiChar);
                    self.cursor.advance();
                }
                Some(_) => {
                    self.error(DiagnosticKind::ExpectedOuterDecl);
                    self.skip_line();
                }
            }
        }
        contract
    }
}

/// Parse a contract with default options.
pub fn parse(src: &str) -> (Contract, Vec<Diagnostic>) {
    parse_with(src, &ParseOptions::default())
}

pub fn parse_with(src: &str, options: &ParseOptions) -> (Contract, Vec<Diagnostic>) {
    run(Cursor::new(src), options)
}

/// Parse raw bytes. Invalid UTF-8 is reported as `NonAsciiChar` and
/// skipped, one unit per invalid sequence.
pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> (Contract, Vec<Diagnostic>) {
    run(Cursor::from_bytes(bytes), options)
}

fn run(cursor: Cursor, options: &ParseOptions) -> (Contract, Vec<Diagnostic>) {
    let mut p = Parser::new(cursor, *options);
    let contract = p.parse_contract();
    tracing::debug!(
        decls = contract.decls.len(),
        diagnostics = p.diagnostics.len(),
        "parsed contract"
    );
    (contract, p.diagnostics)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
