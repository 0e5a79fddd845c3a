//! Lexer for Mython source text.
//!
//! Input is processed line by line. Blank lines and comment-only lines are
//! skipped wholesale and produce no tokens. For every other line the leading
//! spaces are converted into Indent/Dedent tokens at two spaces per level,
//! the remainder is tokenized, and a single Newline is emitted. After the
//! last line the indent stack unwinds to zero and an Eof token closes the
//! stream.

pub mod error;
pub mod token;

pub use self::error::{LexError, LexResult};
pub use self::token::{Span, Token, TokenKind};

struct Lexer {
    tokens: Vec<Token>,
    indent: usize,
}

impl Lexer {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            indent: 0,
        }
    }

    fn lex_line(&mut self, line_no: u32, line: &str) -> LexResult<()> {
        if is_blank_or_comment(line) {
            return Ok(());
        }

        let mut scanner = LineScanner::new(line, line_no);
        let width = scanner.consume_while(|c| c == ' ');
        if scanner.peek_char() == Some('\t') {
            return Err(LexError::TabIndentation { line: line_no });
        }
        if width % 2 != 0 {
            return Err(LexError::OddIndentation {
                width,
                line: line_no,
            });
        }

        let span = Span::new(line_no, 1);
        while self.indent < width {
            self.indent += 2;
            self.tokens.push(Token::new(TokenKind::Indent, span));
        }
        while self.indent > width {
            self.indent -= 2;
            self.tokens.push(Token::new(TokenKind::Dedent, span));
        }

        self.read_tokens(&mut scanner)?;
        self.push_newline(Span::new(line_no, scanner.column()));
        Ok(())
    }

    fn read_tokens(&mut self, scanner: &mut LineScanner) -> LexResult<()> {
        while let Some(c) = scanner.peek_char() {
            match c {
                ' ' => {
                    scanner.consume_char();
                }
                '#' => break,
                '\'' | '"' => self.read_string(scanner, c)?,
                '=' | '<' | '>' | '!' => self.read_operator(scanner, c)?,
                c if c.is_ascii_digit() => self.read_number(scanner)?,
                c if c == '_' || c.is_ascii_alphabetic() => self.read_word(scanner),
                other => {
                    // Anything unrecognized is deferred to the parser as a
                    // plain Char token.
                    let span = scanner.span();
                    scanner.consume_char();
                    self.tokens.push(Token::new(TokenKind::Char(other), span));
                }
            }
        }
        Ok(())
    }

    fn read_string(&mut self, scanner: &mut LineScanner, delimiter: char) -> LexResult<()> {
        let span = scanner.span();
        scanner.consume_char();

        let mut value = String::new();
        loop {
            match scanner.consume_char() {
                None => return Err(LexError::UnterminatedString { line: span.line }),
                Some(c) if c == delimiter => break,
                Some('\\') => match scanner.consume_char() {
                    None => return Err(LexError::UnterminatedString { line: span.line }),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c @ ('\'' | '"')) => value.push(c),
                    // An unrecognized escape drops both characters.
                    Some(_) => {}
                },
                Some(c) => value.push(c),
            }
        }

        self.tokens.push(Token::new(TokenKind::String(value), span));
        Ok(())
    }

    fn read_operator(&mut self, scanner: &mut LineScanner, first: char) -> LexResult<()> {
        let span = scanner.span();
        scanner.consume_char();

        if scanner.peek_char() == Some('=') {
            scanner.consume_char();
            let kind = match first {
                '=' => TokenKind::Eq,
                '!' => TokenKind::NotEq,
                '<' => TokenKind::LessOrEq,
                _ => TokenKind::GreaterOrEq,
            };
            self.tokens.push(Token::new(kind, span));
            return Ok(());
        }

        // `!` has no single-character meaning; `=`, `<` and `>` do.
        if first == '!' {
            return Err(LexError::LoneBang {
                line: span.line,
                column: span.column,
            });
        }
        self.tokens.push(Token::new(TokenKind::Char(first), span));
        Ok(())
    }

    fn read_number(&mut self, scanner: &mut LineScanner) -> LexResult<()> {
        let span = scanner.span();
        let start = scanner.pos();
        scanner.consume_while(|c| c.is_ascii_digit());

        let literal = scanner.slice_from(start);
        let value = literal.parse::<i32>().map_err(|_| LexError::InvalidNumber {
            literal: literal.to_string(),
            line: span.line,
        })?;
        self.tokens.push(Token::new(TokenKind::Number(value), span));
        Ok(())
    }

    fn read_word(&mut self, scanner: &mut LineScanner) {
        let span = scanner.span();
        let start = scanner.pos();
        scanner.consume_while(|c| c == '_' || c.is_ascii_alphanumeric());

        let kind = match scanner.slice_from(start) {
            "class" => TokenKind::Class,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "def" => TokenKind::Def,
            "print" => TokenKind::Print,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            word => TokenKind::Id(word.to_string()),
        };
        self.tokens.push(Token::new(kind, span));
    }

    fn push_newline(&mut self, span: Span) {
        if !matches!(
            self.tokens.last(),
            Some(Token {
                kind: TokenKind::Newline,
                ..
            })
        ) {
            self.tokens.push(Token::new(TokenKind::Newline, span));
        }
    }

    fn finish(mut self, line_count: u32) -> Vec<Token> {
        let span = Span::new(line_count + 1, 1);
        while self.indent > 0 {
            self.indent -= 2;
            self.tokens.push(Token::new(TokenKind::Dedent, span));
        }
        self.tokens.push(Token::new(TokenKind::Eof, span));
        self.tokens
    }
}

/// A line is skipped when it holds nothing but spaces, optionally followed
/// by a `#` comment.
fn is_blank_or_comment(line: &str) -> bool {
    for c in line.chars() {
        if c != ' ' {
            return c == '#';
        }
    }
    true
}

struct LineScanner<'a> {
    line: &'a str,
    pos: usize,
    line_no: u32,
}

impl<'a> LineScanner<'a> {
    fn new(line: &'a str, line_no: u32) -> Self {
        Self { line, pos: 0, line_no }
    }

    fn peek_char(&self) -> Option<char> {
        self.line[self.pos..].chars().next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn consume_while<P>(&mut self, keep_predicate: P) -> usize
    where
        P: Fn(char) -> bool,
    {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !keep_predicate(c) {
                break;
            }
            self.consume_char();
        }
        self.pos - start
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn slice_from(&self, start: usize) -> &'a str {
        &self.line[start..self.pos]
    }

    fn span(&self) -> Span {
        Span::new(self.line_no, self.pos as u32 + 1)
    }

    fn column(&self) -> u32 {
        self.pos as u32 + 1
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new();
    let mut line_count = 0;
    for (index, line) in input.lines().enumerate() {
        line_count = index as u32 + 1;
        lexer.lex_line(line_count, line)?;
    }
    Ok(lexer.finish(line_count))
}
