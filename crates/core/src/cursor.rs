//! Rune-at-a-time reader with one rune of pushback and `(line, col)`
//! tracking. Recovery logic lives in the parser, not here.

/// Stand-in for an input unit that failed to decode.
pub const DECODE_FAILURE: char = char::REPLACEMENT_CHARACTER;

#[derive(Debug, Clone)]
pub struct Cursor {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    /// Position before the most recent `advance`, consumed by `pushback`.
    last: Option<(u32, u32)>,
}

impl Cursor {
    pub fn new(src: &str) -> Self {
        Cursor::from_chars(src.chars().collect())
    }

    /// Decode bytes leniently: each invalid UTF-8 sequence becomes a single
    /// [`DECODE_FAILURE`] unit.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut chars = Vec::with_capacity(bytes.len());
        for chunk in bytes.utf8_chunks() {
            chars.extend(chunk.valid().chars());
            if !chunk.invalid().is_empty() {
                chars.push(DECODE_FAILURE);
            }
        }
        Cursor::from_chars(chars)
    }

    fn from_chars(chars: Vec<char>) -> Self {
        Cursor {
            chars,
            pos: 0,
            line: 1,
            col: 0,
            last: None,
        }
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Consume and return the next rune.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.last = Some((self.line, self.col));
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Un-read the rune returned by the last `advance`. Only one rune of
    /// pushback is available; a second call without an intervening
    /// `advance` does nothing.
    pub fn pushback(&mut self) {
        debug_assert!(self.last.is_some(), "pushback without advance");
        if let Some((line, col)) = self.last.take() {
            self.pos -= 1;
            self.line = line;
            self.col = col;
        }
    }

    /// Consume `c` if it is next.
    pub fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    pub fn position(&self) -> (u32, u32) {
        (self.line, self.col)
    }
}
