use crate::ast::Identifier;
use serde::Serialize;
use std::fmt;

/// Everything the parser and the resolver can complain about.
///
/// Parser kinds are plain tags; resolution kinds carry the identifier they
/// concern. None of them abort processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "identifier")]
pub enum DiagnosticKind {
    // Malformed input
    #[error("Unexpected meta-character")]
    UnexpectedMetachar,
    #[error("Unexpected non-ASCII character")]
    NonAsciiChar,

    // Structure
    #[error("Expected Declaration: @space, #agent, =path")]
    ExpectedOuterDecl,
    #[error("Expected Declaration inside @space scope: #agent, $task")]
    ExpectedInnerDecl,
    #[error("Expected Space Declaration: @space")]
    ExpectedSpaceDecl,
    #[error("Expected Agent Declaration: #agent")]
    ExpectedAgentDecl,
    #[error("Expected Task Declaration: $task")]
    ExpectedTaskDecl,
    #[error("Expected Path Declaration: =path")]
    ExpectedPathDecl,
    #[error("Expected Data Name: %data")]
    ExpectedDataName,
    #[error("Expected Identifier: ident")]
    ExpectedIdentifier,
    #[error("Expected in or out")]
    ExpectedInOut,
    #[error("Expected =")]
    ExpectedEquals,
    #[error("Mismatched Parentheses")]
    MismatchedParens,
    #[error("Illegal declaration inside @space scope. Should be: #agent, $task")]
    IllegalDeclarationInsideSpaceScope,
    #[error("A path connects exactly two spaces: (@source, @dest)")]
    PathEndpointCount,

    // Tags
    #[error("Missing Required Tag Definition")]
    MissingRequiredTag,
    #[error("Duplicate or Contradictory Tag Definition")]
    DuplicateTag,
    #[error("Unknown Tag Name")]
    UnknownTag,

    // Imports
    #[error("Missing import for $use expression: should take the form $use(element), where element is a @space or #agent.")]
    UseMissingImport,
    #[error("Cannot import this element. Expression should take the form $use(element), where element is a @space or #agent.")]
    UseUnsupportedImport,

    // Resolution
    #[error("Undeclared Identifier: {0}")]
    UndeclaredIdentifier(Identifier),
    #[error("Duplicate Identifier: {0}")]
    DuplicateIdentifier(Identifier),
    #[error("Node {0} is in a cycle")]
    DependencyCycle(Identifier),
}

impl DiagnosticKind {
    /// Stable name of the variant, used in JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::UnexpectedMetachar => "UnexpectedMetachar",
            DiagnosticKind::NonAsciiChar => "NonAsciiChar",
            DiagnosticKind::ExpectedOuterDecl => "ExpectedOuterDecl",
            DiagnosticKind::ExpectedInnerDecl => "ExpectedInnerDecl",
            DiagnosticKind::ExpectedSpaceDecl => "ExpectedSpaceDecl",
            DiagnosticKind::ExpectedAgentDecl => "ExpectedAgentDecl",
            DiagnosticKind::ExpectedTaskDecl => "ExpectedTaskDecl",
            DiagnosticKind::ExpectedPathDecl => "ExpectedPathDecl",
            DiagnosticKind::ExpectedDataName => "ExpectedDataName",
            DiagnosticKind::ExpectedIdentifier => "ExpectedIdentifier",
            DiagnosticKind::ExpectedInOut => "ExpectedInOut",
            DiagnosticKind::ExpectedEquals => "ExpectedEquals",
            DiagnosticKind::MismatchedParens => "MismatchedParens",
            DiagnosticKind::IllegalDeclarationInsideSpaceScope => {
                "IllegalDeclarationInsideSpaceScope"
            }
            DiagnosticKind::PathEndpointCount => "PathEndpointCount",
            DiagnosticKind::MissingRequiredTag => "MissingRequiredTag",
            DiagnosticKind::DuplicateTag => "DuplicateTag",
            DiagnosticKind::UnknownTag => "UnknownTag",
            DiagnosticKind::UseMissingImport => "UseMissingImport",
            DiagnosticKind::UseUnsupportedImport => "UseUnsupportedImport",
            DiagnosticKind::UndeclaredIdentifier(_) => "UndeclaredIdentifier",
            DiagnosticKind::DuplicateIdentifier(_) => "DuplicateIdentifier",
            DiagnosticKind::DependencyCycle(_) => "DependencyCycle",
        }
    }

    /// True for diagnostics raised by name resolution or ordering rather
    /// than by the parser.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            DiagnosticKind::UndeclaredIdentifier(_)
                | DiagnosticKind::DuplicateIdentifier(_)
                | DiagnosticKind::DependencyCycle(_)
        )
    }
}

/// A positioned diagnostic. Lines are 1-based; columns count the characters
/// consumed on the line before the offending one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: u32,
    pub col: u32,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, line: u32, col: u32) -> Self {
        Diagnostic { kind, line, col }
    }

    /// `"line, col: message"`
    pub fn render(&self) -> String {
        format!("{}, {}: {}", self.line, self.col, self.kind)
    }

    /// Flat JSON form used by the CLI. Always includes every field.
    pub fn to_json_value(&self) -> serde_json::Value {
        let identifier = match &self.kind {
            DiagnosticKind::UndeclaredIdentifier(id)
            | DiagnosticKind::DuplicateIdentifier(id)
            | DiagnosticKind::DependencyCycle(id) => Some(id.to_string()),
            _ => None,
        };
        serde_json::json!({
            "col":        self.col,
            "identifier": identifier,
            "kind":       self.kind.code(),
            "line":       self.line,
            "message":    self.kind.to_string(),
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
