use super::Parser;
use crate::ast::{
    AgentDecl, AgentType, Identifier, PathDecl, PathType, SpaceDecl, SpaceRef, SpaceType, Tag,
    TaskDecl,
};
use crate::error::{Diagnostic, DiagnosticKind};

/// How a declaration's vocabulary received one tag.
enum TagFit {
    Set,
    Duplicate,
    Unknown,
}

/// Assign `value` to an exclusive category unless it already has one.
fn set_once<T: PartialEq + Copy + Default>(slot: &mut T, value: T) -> TagFit {
    if *slot == T::default() {
        *slot = value;
        TagFit::Set
    } else {
        TagFit::Duplicate
    }
}

impl Parser {
    /// Identifier after a declaration sigil. If it is missing, the header
    /// line and any vibe block under it are skipped and the node discarded.
    fn declared_name(&mut self) -> Result<String, Diagnostic> {
        let name = self.identifier();
        if name.is_empty() {
            let d = self.discard(DiagnosticKind::ExpectedIdentifier);
            self.skip_line();
            self.skip_vibe_block();
            return Err(d);
        }
        Ok(name)
    }

    /// Report tags in source order against a declaration's vocabulary.
    fn interpret_tags(&mut self, tags: &[Tag], mut apply: impl FnMut(&str) -> TagFit) {
        for tag in tags {
            let kind = if tag.name.is_empty() {
                DiagnosticKind::ExpectedIdentifier
            } else {
                match apply(&tag.name) {
                    TagFit::Set => continue,
                    TagFit::Duplicate => DiagnosticKind::DuplicateTag,
                    TagFit::Unknown => DiagnosticKind::UnknownTag,
                }
            };
            self.error_at(kind, tag.line, tag.col);
        }
    }

    // -- Spaces -------------------------------------------------

    pub(super) fn parse_space(&mut self) -> Result<SpaceDecl, Diagnostic> {
        let line_start = self.cursor.line();
        if !self.cursor.eat('@') {
            return Err(self.discard(DiagnosticKind::ExpectedSpaceDecl));
        }
        let name = self.declared_name()?;

        let tags = self.parse_tags();
        let mut space_type = SpaceType::Unknown;
        let mut replicable = false;
        self.interpret_tags(&tags, |tag| {
            if tag == "REPLICABLE" {
                if replicable {
                    return TagFit::Duplicate;
                }
                replicable = true;
                return TagFit::Set;
            }
            match SpaceType::from_tag(tag) {
                Some(t) => set_once(&mut space_type, t),
                None => TagFit::Unknown,
            }
        });

        let params = self.parse_params();
        self.finish_header_line();
        let vibe = self.parse_vibe_block(line_start);

        let mut agents = Vec::new();
        let mut tasks = Vec::new();
        self.parse_space_scope(&mut agents, &mut tasks);

        let line_end = agents
            .iter()
            .map(|a| a.line_end)
            .chain(tasks.iter().map(|t| t.line_end))
            .fold(vibe.line_end.max(line_start), u32::max);

        Ok(SpaceDecl {
            ident: Identifier::space(name),
            space_type,
            replicable,
            params,
            vibe,
            agents,
            tasks,
            line_start,
            line_end,
        })
    }

    /// Nested agents and tasks. A space has no closing delimiter: the scope
    /// ends at the first thing that is not `#` or `$`.
    fn parse_space_scope(&mut self, agents: &mut Vec<AgentDecl>, tasks: &mut Vec<TaskDecl>) {
        loop {
            self.skip_whitespace();
            match self.cursor.peek() {
                None => break,
                Some('#') => {
                    let agent = self.parse_agent();
                    if let Some(a) = self.keep(agent) {
                        agents.push(a);
                    }
                }
                Some('$') => {
                    let task = self.parse_task();
                    if let Some(t) = self.keep(task) {
                        tasks.push(t);
                    }
                }
                // Left for the top level to pick up.
                Some('@') | Some('=') => {
                    self.error(DiagnosticKind::IllegalDeclarationInsideSpaceScope);
                    break;
                }
                Some(c) if !c.is_ascii() => {
                    self.error(DiagnosticKind::NonAsciiChar);
                    self.cursor.advance();
                }
                Some(_) => {
                    self.error(DiagnosticKind::ExpectedInnerDecl);
                    self.skip_line();
                    break;
                }
            }
        }
    }

    // -- Agents and tasks ---------------------------------------

    pub(super) fn parse_agent(&mut self) -> Result<AgentDecl, Diagnostic> {
        let line_start = self.cursor.line();
        if !self.cursor.eat('#') {
            return Err(self.discard(DiagnosticKind::ExpectedAgentDecl));
        }
        let name = self.declared_name()?;

        let tags = self.parse_tags();
        let mut agent_type = AgentType::Unknown;
        self.interpret_tags(&tags, |tag| match AgentType::from_tag(tag) {
            Some(t) => set_once(&mut agent_type, t),
            None => TagFit::Unknown,
        });
        if agent_type == AgentType::Unknown {
            self.error(DiagnosticKind::MissingRequiredTag);
        }

        let params = self.parse_params();
        self.finish_header_line();
        let vibe = self.parse_vibe_block(line_start);

        Ok(AgentDecl {
            ident: Identifier::agent(name),
            agent_type,
            params,
            line_end: vibe.line_end.max(line_start),
            vibe,
            line_start,
        })
    }

    pub(super) fn parse_task(&mut self) -> Result<TaskDecl, Diagnostic> {
        let line_start = self.cursor.line();
        if !self.cursor.eat('$') {
            return Err(self.discard(DiagnosticKind::ExpectedTaskDecl));
        }
        let name = self.declared_name()?;

        let tags = self.parse_tags();
        self.interpret_tags(&tags, |_| TagFit::Unknown);

        let params = self.parse_params();
        self.finish_header_line();
        let vibe = self.parse_vibe_block(line_start);

        Ok(TaskDecl {
            ident: Identifier::task(name),
            params,
            line_end: vibe.line_end.max(line_start),
            vibe,
            line_start,
        })
    }

    // -- Paths --------------------------------------------------

    pub(super) fn parse_path(&mut self) -> Result<PathDecl, Diagnostic> {
        let line_start = self.cursor.line();
        if !self.cursor.eat('=') {
            return Err(self.discard(DiagnosticKind::ExpectedPathDecl));
        }
        let name = self.declared_name()?;

        let tags = self.parse_tags();
        let mut path_type = PathType::Unknown;
        self.interpret_tags(&tags, |tag| match PathType::from_tag(tag) {
            Some(t) => set_once(&mut path_type, t),
            None => TagFit::Unknown,
        });
        if path_type == PathType::Unknown {
            self.error(DiagnosticKind::MissingRequiredTag);
        }

        let (source, dest) = match self.parse_path_endpoints() {
            Ok(endpoints) => endpoints,
            Err(d) => {
                self.skip_line();
                self.skip_vibe_block();
                return Err(d);
            }
        };
        self.finish_header_line();
        let vibe = self.parse_vibe_block(line_start);

        Ok(PathDecl {
            ident: Identifier::path(name),
            path_type,
            source,
            dest,
            line_end: vibe.line_end.max(line_start),
            vibe,
            line_start,
        })
    }

    /// `(@source, @dest)`. Any deviation discards the path.
    fn parse_path_endpoints(&mut self) -> Result<(SpaceRef, SpaceRef), Diagnostic> {
        self.skip_spaces();
        let (open_line, open_col) = self.cursor.position();
        if !self.cursor.eat('(') {
            return Err(self.discard(DiagnosticKind::ExpectedSpaceDecl));
        }

        let mut refs = Vec::new();
        loop {
            self.skip_spaces();
            match self.cursor.peek() {
                Some(')') => {
                    self.cursor.advance();
                    break;
                }
                None | Some('\n') => return Err(self.discard(DiagnosticKind::MismatchedParens)),
                Some(',') | Some(';') => {
                    self.cursor.advance();
                }
                Some('@') => {
                    let (line, col) = self.cursor.position();
                    self.cursor.advance();
                    let name = self.identifier();
                    if name.is_empty() {
                        return Err(self.discard(DiagnosticKind::ExpectedIdentifier));
                    }
                    refs.push(SpaceRef { name, line, col });
                }
                Some(_) => return Err(self.discard(DiagnosticKind::ExpectedSpaceDecl)),
            }
        }

        match <[SpaceRef; 2]>::try_from(refs) {
            Ok([source, dest]) => Ok((source, dest)),
            Err(_) => Err(Diagnostic::new(
                DiagnosticKind::PathEndpointCount,
                open_line,
                open_col,
            )),
        }
    }
}
