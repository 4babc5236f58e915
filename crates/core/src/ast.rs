//! Declaration tree produced by the parser.
//!
//! Every declaration carries the source lines it spans. Nothing here is
//! resolved: meta-references hold names, and the ordering stage looks them
//! up in the contract-wide [`Scope`](crate::scope::Scope).

use serde::Serialize;
use std::fmt;

// ──────────────────────────────────────────────
// Identifiers
// ──────────────────────────────────────────────

/// The namespace an identifier lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Space,
    Agent,
    Task,
    Path,
}

impl Kind {
    /// The sigil that opens a declaration of this kind.
    pub fn sigil(self) -> char {
        match self {
            Kind::Space => '@',
            Kind::Agent => '#',
            Kind::Task => '$',
            Kind::Path => '=',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Space => "space",
            Kind::Agent => "agent",
            Kind::Task => "task",
            Kind::Path => "path",
        }
    }
}

/// A declared name qualified by its kind. Two declarations collide only if
/// both kind and name match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Identifier {
    pub kind: Kind,
    pub name: String,
}

impl Identifier {
    pub fn new(kind: Kind, name: impl Into<String>) -> Self {
        Identifier {
            kind,
            name: name.into(),
        }
    }

    pub fn space(name: impl Into<String>) -> Self {
        Identifier::new(Kind::Space, name)
    }

    pub fn agent(name: impl Into<String>) -> Self {
        Identifier::new(Kind::Agent, name)
    }

    pub fn task(name: impl Into<String>) -> Self {
        Identifier::new(Kind::Task, name)
    }

    pub fn path(name: impl Into<String>) -> Self {
        Identifier::new(Kind::Path, name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.sigil(), self.name)
    }
}

// ──────────────────────────────────────────────
// Tags
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpaceType {
    #[default]
    Unknown,
    Ui,
    Io,
    Data,
    Func,
    Agentic,
}

impl SpaceType {
    /// Map an (uppercased) tag name to a space type.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "UI" => Some(SpaceType::Ui),
            "IO" => Some(SpaceType::Io),
            "DATA" => Some(SpaceType::Data),
            "FUNC" => Some(SpaceType::Func),
            "AGENTIC" => Some(SpaceType::Agentic),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpaceType::Unknown => "UNKNOWN",
            SpaceType::Ui => "UI",
            SpaceType::Io => "IO",
            SpaceType::Data => "DATA",
            SpaceType::Func => "FUNC",
            SpaceType::Agentic => "AGENTIC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentType {
    #[default]
    Unknown,
    Af,
    Df,
}

impl AgentType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "AF" => Some(AgentType::Af),
            "DF" => Some(AgentType::Df),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentType::Unknown => "UNKNOWN",
            AgentType::Af => "AF",
            AgentType::Df => "DF",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PathType {
    #[default]
    Unknown,
    Invoke,
    Attend,
}

impl PathType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "INVOKE" => Some(PathType::Invoke),
            "ATTEND" => Some(PathType::Attend),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PathType::Unknown => "UNKNOWN",
            PathType::Invoke => "INVOKE",
            PathType::Attend => "ATTEND",
        }
    }
}

/// A `:NAME` annotation as scanned, uppercased, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub line: u32,
    pub col: u32,
}

// ──────────────────────────────────────────────
// Parameters
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    In,
    Out,
}

impl Direction {
    /// Case-insensitive `in` / `out` keyword lookup.
    pub fn from_keyword(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("in") {
            Some(Direction::In)
        } else if word.eq_ignore_ascii_case("out") {
            Some(Direction::Out)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub direction: Direction,
    pub data_name: String,
    pub line: u32,
    pub col: u32,
}

impl Param {
    pub fn new(direction: Direction, data_name: impl Into<String>, line: u32, col: u32) -> Self {
        Param {
            direction,
            data_name: data_name.into(),
            line,
            col,
        }
    }
}

/// Canonical text: `in=%name` / `out=%name`.
impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=%{}", self.direction.as_str(), self.data_name)
    }
}

// ──────────────────────────────────────────────
// Vibe blocks and meta-references
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UseImportType {
    Space,
    Agent,
}

/// A structured token embedded in vibe prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "ref", rename_all = "snake_case")]
pub enum MetaRef {
    /// `%name`: a value flowing through a param. Never a graph edge.
    Data { ident: String, line: u32, col: u32 },
    /// `$name(args)`
    Task {
        ident: String,
        args: Vec<Param>,
        line: u32,
        col: u32,
    },
    /// `$use(@space)` or `$use(#agent)`
    UseImport {
        import_type: UseImportType,
        imported: String,
        line: u32,
        col: u32,
    },
    /// `=name`
    Path { ident: String, line: u32, col: u32 },
}

impl MetaRef {
    /// The declaration this reference points at, if it names one.
    pub fn target(&self) -> Option<Identifier> {
        match self {
            MetaRef::Data { .. } => None,
            MetaRef::Task { ident, .. } => Some(Identifier::task(ident.as_str())),
            MetaRef::UseImport {
                import_type: UseImportType::Space,
                imported,
                ..
            } => Some(Identifier::space(imported.as_str())),
            MetaRef::UseImport {
                import_type: UseImportType::Agent,
                imported,
                ..
            } => Some(Identifier::agent(imported.as_str())),
            MetaRef::Path { ident, .. } => Some(Identifier::path(ident.as_str())),
        }
    }

    /// Line and column of the reference's sigil.
    pub fn position(&self) -> (u32, u32) {
        match self {
            MetaRef::Data { line, col, .. }
            | MetaRef::Task { line, col, .. }
            | MetaRef::UseImport { line, col, .. }
            | MetaRef::Path { line, col, .. } => (*line, *col),
        }
    }
}

/// Canonical text form, as re-inserted into normalized prose.
impl fmt::Display for MetaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaRef::Data { ident, .. } => write!(f, "%{}", ident),
            MetaRef::Task { ident, args, .. } => {
                let args: Vec<String> = args.iter().map(Param::to_string).collect();
                write!(f, "${}({})", ident, args.join(", "))
            }
            MetaRef::UseImport {
                import_type,
                imported,
                ..
            } => {
                let sigil = match import_type {
                    UseImportType::Space => '@',
                    UseImportType::Agent => '#',
                };
                write!(f, "$use({}{})", sigil, imported)
            }
            MetaRef::Path { ident, .. } => write!(f, "={}", ident),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VibeBlock {
    /// Normalized prose, one entry per non-blank marker line.
    pub prose: Vec<String>,
    pub meta_refs: Vec<MetaRef>,
    pub line_start: u32,
    pub line_end: u32,
}

impl VibeBlock {
    pub fn empty(line: u32) -> Self {
        VibeBlock {
            prose: Vec::new(),
            meta_refs: Vec::new(),
            line_start: line,
            line_end: line,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prose.is_empty() && self.meta_refs.is_empty()
    }
}

// ──────────────────────────────────────────────
// Declarations
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceDecl {
    pub ident: Identifier,
    pub space_type: SpaceType,
    pub replicable: bool,
    pub params: Vec<Param>,
    pub vibe: VibeBlock,
    pub agents: Vec<AgentDecl>,
    pub tasks: Vec<TaskDecl>,
    pub line_start: u32,
    pub line_end: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentDecl {
    pub ident: Identifier,
    pub agent_type: AgentType,
    pub params: Vec<Param>,
    pub vibe: VibeBlock,
    pub line_start: u32,
    pub line_end: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDecl {
    pub ident: Identifier,
    pub params: Vec<Param>,
    pub vibe: VibeBlock,
    pub line_start: u32,
    pub line_end: u32,
}

/// A named reference to a space from a path clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceRef {
    pub name: String,
    pub line: u32,
    pub col: u32,
}

impl SpaceRef {
    pub fn ident(&self) -> Identifier {
        Identifier::space(self.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathDecl {
    pub ident: Identifier,
    pub path_type: PathType,
    pub source: SpaceRef,
    pub dest: SpaceRef,
    pub vibe: VibeBlock,
    pub line_start: u32,
    pub line_end: u32,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decl", rename_all = "lowercase")]
pub enum Decl {
    Space(SpaceDecl),
    Agent(AgentDecl),
    Path(PathDecl),
}

/// The parsed document. Top-level declarations are kept in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contract {
    pub decls: Vec<Decl>,
}

impl Contract {
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn spaces(&self) -> impl Iterator<Item = &SpaceDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Space(s) => Some(s),
            _ => None,
        })
    }

    /// Top-level agents only; agents nested in a space live on the space.
    pub fn agents(&self) -> impl Iterator<Item = &AgentDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Agent(a) => Some(a),
            _ => None,
        })
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Path(p) => Some(p),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ref_renders_canonical_text() {
        let r = MetaRef::Task {
            ident: "tasky".to_string(),
            args: vec![
                Param::new(Direction::In, "a", 1, 8),
                Param::new(Direction::Out, "b", 1, 14),
            ],
            line: 1,
            col: 1,
        };
        assert_eq!(r.to_string(), "$tasky(in=%a, out=%b)");
    }

    #[test]
    fn use_import_renders_with_kind_sigil() {
        let space = MetaRef::UseImport {
            import_type: UseImportType::Space,
            imported: "store".to_string(),
            line: 1,
            col: 0,
        };
        let agent = MetaRef::UseImport {
            import_type: UseImportType::Agent,
            imported: "clerk".to_string(),
            line: 1,
            col: 0,
        };
        assert_eq!(space.to_string(), "$use(@store)");
        assert_eq!(agent.to_string(), "$use(#clerk)");
    }

    #[test]
    fn data_refs_have_no_target() {
        let r = MetaRef::Data {
            ident: "x".to_string(),
            line: 1,
            col: 0,
        };
        assert_eq!(r.target(), None);
        let p = MetaRef::Path {
            ident: "wire".to_string(),
            line: 1,
            col: 0,
        };
        assert_eq!(p.target(), Some(Identifier::path("wire")));
    }

    #[test]
    fn identifiers_compare_by_kind_and_name() {
        assert_eq!(Identifier::task("a"), Identifier::task("a"));
        assert_ne!(Identifier::task("a"), Identifier::agent("a"));
        assert_eq!(Identifier::agent("clerk").to_string(), "#clerk");
    }
}
