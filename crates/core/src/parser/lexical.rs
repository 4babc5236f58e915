use super::Parser;
use crate::ast::{Direction, Param, Tag};
use crate::error::DiagnosticKind;

pub(super) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

impl Parser {
    // -- Whitespace and lines -----------------------------------

    /// Skip spaces and tabs (and stray carriage returns) on the current
    /// line. Returns how many were skipped.
    pub(super) fn skip_spaces(&mut self) -> usize {
        let mut n = 0;
        while self.cursor.peek().is_some_and(is_blank) {
            self.cursor.advance();
            n += 1;
        }
        n
    }

    /// Skip all whitespace, newlines included.
    pub(super) fn skip_whitespace(&mut self) {
        while self.cursor.peek().is_some_and(|c| is_blank(c) || c == '\n') {
            self.cursor.advance();
        }
    }

    /// Consume the rest of the current line, newline included.
    pub(super) fn skip_line(&mut self) {
        while let Some(c) = self.cursor.advance() {
            if c == '\n' {
                break;
            }
        }
    }

    pub(super) fn at_line_end(&self) -> bool {
        matches!(self.cursor.peek(), None | Some('\n'))
    }

    /// Finish a declaration header. Anything but trailing blanks before the
    /// newline is reported once and the remainder of the line dropped.
    pub(super) fn finish_header_line(&mut self) {
        self.skip_spaces();
        match self.cursor.peek() {
            None => {}
            Some('\n') => {
                self.cursor.advance();
            }
            Some(c) => {
                let kind = if c == ')' {
                    DiagnosticKind::MismatchedParens
                } else if !c.is_ascii() {
                    DiagnosticKind::NonAsciiChar
                } else {
                    DiagnosticKind::UnexpectedMetachar
                };
                self.error(kind);
                self.skip_line();
            }
        }
    }

    // -- Identifiers --------------------------------------------

    /// `[A-Za-z_][A-Za-z0-9_]*`, or the empty string if the next rune
    /// cannot start an identifier. Nothing is consumed in that case.
    pub(super) fn identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.cursor.advance() {
            let accepted = if ident.is_empty() {
                is_ident_start(c)
            } else {
                is_ident_continue(c)
            };
            if !accepted {
                self.cursor.pushback();
                break;
            }
            ident.push(c);
        }
        ident
    }

    /// Identifier following `%`. Reports `ExpectedIdentifier` when absent.
    fn data_name(&mut self) -> Option<String> {
        let (line, col) = self.cursor.position();
        let name = self.identifier();
        if name.is_empty() {
            self.error_at(DiagnosticKind::ExpectedIdentifier, line, col);
            None
        } else {
            Some(name)
        }
    }

    // -- Tags ---------------------------------------------------

    /// Zero or more `:NAME`, uppercased. A colon with no name yields a tag
    /// with an empty name; interpretation is left to the caller.
    pub(super) fn parse_tags(&mut self) -> Vec<Tag> {
        let mut tags = Vec::new();
        loop {
            self.skip_spaces();
            if !self.cursor.eat(':') {
                break;
            }
            self.skip_spaces();
            let (line, col) = self.cursor.position();
            let name = self.identifier().to_ascii_uppercase();
            tags.push(Tag { name, line, col });
        }
        tags
    }

    // -- Parameter lists ----------------------------------------

    /// `'(' (item (',' | ';')?)* ')'`, or nothing when no `(` follows.
    ///
    /// Direction carries over from one item to the next. Never consumes
    /// the newline that ends the line.
    pub(super) fn parse_params(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        self.skip_spaces();
        if !self.cursor.eat('(') {
            return params;
        }

        let mut direction = Direction::In;
        loop {
            self.skip_spaces();
            let (line, col) = self.cursor.position();
            match self.cursor.peek() {
                Some(')') => {
                    self.cursor.advance();
                    break;
                }
                None | Some('\n') => {
                    self.error(DiagnosticKind::MismatchedParens);
                    break;
                }
                Some(',') | Some(';') => {
                    self.cursor.advance();
                }
                Some('%') => {
                    self.cursor.advance();
                    match self.data_name() {
                        Some(name) => params.push(Param::new(direction, name, line, col)),
                        None => {
                            self.abandon_list();
                            break;
                        }
                    }
                }
                Some(c) if is_ident_start(c) => {
                    let word = self.identifier();
                    match self.directed_item(word, line, col, &mut direction) {
                        Ok(Some(param)) => params.push(param),
                        Ok(None) => {}
                        Err(()) => {
                            self.abandon_list();
                            break;
                        }
                    }
                }
                Some(c) if !c.is_ascii() => {
                    self.error(DiagnosticKind::NonAsciiChar);
                    self.cursor.advance();
                }
                Some(_) => {
                    self.error(DiagnosticKind::UnexpectedMetachar);
                    self.cursor.advance();
                }
            }
        }
        params
    }

    /// The rest of an item that started with a word: ideally `in=%x` or
    /// `out=%x`. `Err` aborts the remainder of the list.
    fn directed_item(
        &mut self,
        word: String,
        line: u32,
        col: u32,
        direction: &mut Direction,
    ) -> Result<Option<Param>, ()> {
        let keyword = Direction::from_keyword(&word);
        self.skip_spaces();
        let has_equals = self.cursor.eat('=');

        match (keyword, has_equals) {
            (Some(d), true) => *direction = d,
            (Some(d), false) => {
                self.error(DiagnosticKind::ExpectedEquals);
                *direction = d;
                if self.cursor.peek() != Some('%') {
                    return Ok(None);
                }
            }
            (None, true) => {
                self.error_at(DiagnosticKind::ExpectedInOut, line, col);
            }
            (None, false) => {
                // Degrade to a bare data name with the inherited direction.
                self.error_at(DiagnosticKind::ExpectedInOut, line, col);
                self.error(DiagnosticKind::ExpectedDataName);
                return Ok(Some(Param::new(*direction, word, line, col)));
            }
        }

        self.skip_spaces();
        if self.cursor.eat('%') {
            let name = self.data_name().ok_or(())?;
            return Ok(Some(Param::new(*direction, name, line, col)));
        }

        self.error(DiagnosticKind::ExpectedDataName);
        let name = self.identifier();
        if name.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Param::new(*direction, name, line, col)))
        }
    }

    /// Drop the rest of a broken list: through the closing `)` if it is on
    /// this line, otherwise up to (not including) the newline.
    pub(super) fn abandon_list(&mut self) {
        while let Some(c) = self.cursor.peek() {
            if c == '\n' {
                break;
            }
            self.cursor.advance();
            if c == ')' {
                break;
            }
        }
    }
}
