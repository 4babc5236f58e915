use super::{Parser, PathRefMode};
use crate::ast::{MetaRef, UseImportType, VibeBlock};
use crate::cursor::DECODE_FAILURE;
use crate::error::DiagnosticKind;

impl Parser {
    /// Marker lines (`>`) following a declaration header. A block with no
    /// lines spans just the header line.
    pub(super) fn parse_vibe_block(&mut self, header_line: u32) -> VibeBlock {
        let mut block = VibeBlock::empty(header_line);
        let mut first = true;
        loop {
            self.skip_spaces();
            if !self.cursor.eat('>') {
                break;
            }
            let line = self.cursor.line();
            if first {
                block.line_start = line;
                first = false;
            }
            block.line_end = line;

            self.skip_spaces();
            if self.at_line_end() {
                self.skip_line();
                continue;
            }
            let text = self.parse_vibe_line(&mut block.meta_refs);
            if !text.is_empty() {
                block.prose.push(text);
            }
        }
        block
    }

    /// Skip a vibe block without recording it.
    pub(super) fn skip_vibe_block(&mut self) {
        loop {
            self.skip_spaces();
            if !self.cursor.eat('>') {
                break;
            }
            self.skip_line();
        }
    }

    /// One line of prose after the marker, through the newline.
    /// Returns the normalized text; references are appended to `refs`.
    fn parse_vibe_line(&mut self, refs: &mut Vec<MetaRef>) -> String {
        let mut out = String::new();
        let mut pending_space = false;
        loop {
            let Some(c) = self.cursor.peek() else { break };
            if c == '\n' {
                self.cursor.advance();
                break;
            }
            if self.skip_spaces() > 0 {
                pending_space = true;
                continue;
            }
            if c == DECODE_FAILURE {
                self.error(DiagnosticKind::NonAsciiChar);
                self.cursor.advance();
                continue;
            }
            if pending_space {
                if !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
            }

            match c {
                '%' => self.data_ref('%', &mut out, refs),
                '=' => match self.options.path_refs {
                    PathRefMode::Data => self.data_ref('=', &mut out, refs),
                    PathRefMode::Path => self.path_ref(&mut out, refs),
                },
                '$' => {
                    if self.task_or_use_ref(&mut out, refs) {
                        self.skip_spaces();
                        pending_space = true;
                    }
                }
                _ => {
                    out.push(c);
                    self.cursor.advance();
                }
            }
        }
        out
    }

    /// `%name`, or `=name` read as data. Either way the prose gets the
    /// canonical `%name`; a sigil with no name stays literal.
    fn data_ref(&mut self, sigil: char, out: &mut String, refs: &mut Vec<MetaRef>) {
        let (line, col) = self.cursor.position();
        self.cursor.advance();
        let ident = self.identifier();
        if ident.is_empty() {
            out.push(sigil);
            return;
        }
        let r = MetaRef::Data { ident, line, col };
        out.push_str(&r.to_string());
        refs.push(r);
    }

    fn path_ref(&mut self, out: &mut String, refs: &mut Vec<MetaRef>) {
        let (line, col) = self.cursor.position();
        self.cursor.advance();
        out.push('=');
        let ident = self.identifier();
        if ident.is_empty() {
            return;
        }
        out.push_str(&ident);
        refs.push(MetaRef::Path { ident, line, col });
    }

    /// `$task(args)` or `$use(import)`. Returns true when a task reference
    /// was recorded.
    fn task_or_use_ref(&mut self, out: &mut String, refs: &mut Vec<MetaRef>) -> bool {
        let (line, col) = self.cursor.position();
        self.cursor.advance();
        let ident = self.identifier();
        if ident.is_empty() {
            out.push('$');
            return false;
        }

        if ident == "use" && self.cursor.peek() == Some('(') {
            if let Some(r) = self.use_import(line, col) {
                out.push_str(&r.to_string());
                refs.push(r);
            }
            return false;
        }

        let args = self.parse_params();
        let r = MetaRef::Task {
            ident,
            args,
            line,
            col,
        };
        out.push_str(&r.to_string());
        refs.push(r);
        true
    }

    /// The `(...)` of `$use(...)`: exactly one `@space` or `#agent`.
    fn use_import(&mut self, line: u32, col: u32) -> Option<MetaRef> {
        self.cursor.advance();
        self.skip_spaces();
        let import_type = match self.cursor.peek() {
            Some(')') => {
                self.error(DiagnosticKind::UseMissingImport);
                self.cursor.advance();
                return None;
            }
            None | Some('\n') => {
                self.error(DiagnosticKind::MismatchedParens);
                return None;
            }
            Some('@') => UseImportType::Space,
            Some('#') => UseImportType::Agent,
            Some(_) => {
                self.error(DiagnosticKind::UseUnsupportedImport);
                self.abandon_list();
                return None;
            }
        };

        self.cursor.advance();
        let imported = self.identifier();
        if imported.is_empty() {
            self.error(DiagnosticKind::ExpectedIdentifier);
            self.abandon_list();
            return None;
        }
        if !self.close_use_list() {
            return None;
        }
        Some(MetaRef::UseImport {
            import_type,
            imported,
            line,
            col,
        })
    }

    /// False when a second element follows the import.
    fn close_use_list(&mut self) -> bool {
        self.skip_spaces();
        match self.cursor.peek() {
            Some(')') => {
                self.cursor.advance();
                true
            }
            Some(',') => {
                self.error(DiagnosticKind::UseUnsupportedImport);
                self.abandon_list();
                false
            }
            _ => {
                self.error(DiagnosticKind::MismatchedParens);
                self.abandon_list();
                true
            }
        }
    }
}
