use std::cell::RefCell;
use std::rc::Rc;

use crate::context::Context;
use crate::error::{ErrorHandler, LexError};
use crate::queue::TokenQueue;
use crate::token::{keyword_kind, Token, TokenKind};

pub(crate) const EOF_CHAR: char = '\0';

/// Scanner over one in-memory source buffer. Each `get_token` call
/// classifies the next lexical unit and advances the cursor past it,
/// tracking 1-based row/column positions.
pub struct Lexer<'a> {
    src: Vec<char>,
    pos: usize,
    row: usize,
    col: usize,

    context: &'a Context,
    handler: Rc<RefCell<ErrorHandler>>,
}

impl<'a> Lexer<'a> {
    pub fn new(
        input_stream: &str,
        context: &'a Context,
        handler: Rc<RefCell<ErrorHandler>>,
    ) -> Lexer<'a> {
        Lexer {
            src: input_stream.chars().collect(),
            pos: 0,
            row: 1,
            col: 1,
            context,
            handler,
        }
    }

    /// Scan the next token. Lexical errors are reported through the shared
    /// handler and returned; the cursor has always advanced past the
    /// offending input, so the caller may keep scanning.
    pub fn get_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;

        let row = self.row;
        let col = self.col;
        let ch = self.next();

        let kind = match ch {
            EOF_CHAR => TokenKind::Eof,
            '=' => match self.peek() {
                '=' => {
                    self.next();
                    TokenKind::EqualsEquals
                }
                _ => TokenKind::Equals,
            },
            '!' => match self.peek() {
                '=' => {
                    self.next();
                    TokenKind::ExclamationEquals
                }
                _ => TokenKind::Exclamation,
            },
            '<' => match self.peek() {
                '=' => {
                    self.next();
                    TokenKind::LessThanEqual
                }
                '<' => {
                    self.next();
                    TokenKind::LeftShift
                }
                _ => TokenKind::LessThan,
            },
            '>' => match self.peek() {
                '=' => {
                    self.next();
                    TokenKind::GreaterThanEqual
                }
                '>' => {
                    self.next();
                    TokenKind::RightShift
                }
                _ => TokenKind::GreaterThan,
            },
            '&' => match self.peek() {
                '&' => {
                    self.next();
                    TokenKind::AndAnd
                }
                _ => TokenKind::And,
            },
            '|' => match self.peek() {
                '|' => {
                    self.next();
                    TokenKind::BarBar
                }
                _ => TokenKind::Bar,
            },
            '+' => match self.peek() {
                '+' => {
                    self.next();
                    TokenKind::PlusPlus
                }
                _ => TokenKind::Plus,
            },
            '-' => match self.peek() {
                '-' => {
                    self.next();
                    TokenKind::MinusMinus
                }
                '>' => {
                    self.next();
                    TokenKind::Arrow
                }
                _ => TokenKind::Minus,
            },
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '~' => TokenKind::Tilde,
            '^' => TokenKind::Caret,
            '.' => TokenKind::Dot,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '[' => TokenKind::OpenBracket,
            ']' => TokenKind::CloseBracket,
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '?' => TokenKind::Question,
            '\'' => return self.quoted_literal('\'', TokenKind::CharLiteral, row, col),
            '"' => return self.quoted_literal('"', TokenKind::StringLiteral, row, col),
            _ if ch.is_ascii_digit() => return self.number(ch, row, col),
            _ if ch.is_ascii_alphabetic() => return Ok(self.symbol(ch, row, col)),
            _ => {
                let error = LexError::UnknownCharacter { ch, row, col };
                self.handler.borrow_mut().report_lex_error(&error);
                return Err(error);
            }
        };

        Ok(Token { kind, text: None, row, col })
    }

    /// Drive the scanner to end of input, pushing every token into a fresh
    /// queue. Lexical errors become `Error` tokens; the next well-formed
    /// token ends the panic region. `Eof` is not pushed.
    pub fn tokenize(&mut self) -> TokenQueue {
        let mut queue = TokenQueue::new();
        let mut recovering = false;
        loop {
            match self.get_token() {
                Ok(token) => {
                    if recovering {
                        self.handler.borrow_mut().exit_panic();
                        recovering = false;
                    }
                    if token.kind == TokenKind::Eof {
                        break;
                    }
                    queue.push(token);
                }
                Err(error) => {
                    let (row, col) = error.position();
                    queue.push(Token { kind: TokenKind::Error, text: None, row, col });
                    recovering = true;
                }
            }
        }
        queue
    }

    fn make_token(&self, kind: TokenKind, text: &str, row: usize, col: usize) -> Token {
        Token {
            kind,
            text: Some(self.context.get_string(text)),
            row,
            col,
        }
    }

    fn symbol(&mut self, first: char, row: usize, col: usize) -> Token {
        let mut text = String::new();
        text.push(first);
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            text.push(self.next());
        }

        let kind = keyword_kind(&text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, &text, row, col)
    }

    /// Numeric literal scanning. Keeps the raw spelling; conversion to a
    /// value is deferred to the consumer.
    fn number(&mut self, first: char, row: usize, col: usize) -> Result<Token, LexError> {
        let mut text = String::new();
        text.push(first);

        let mut floating = false;

        if first == '0' && matches!(self.peek(), 'x' | 'X') {
            text.push(self.next());
            while self.peek().is_ascii_hexdigit() {
                text.push(self.next());
            }
            if self.peek() == '.' && self.peek_ahead(1).is_ascii_hexdigit() {
                floating = true;
                text.push(self.next());
                while self.peek().is_ascii_hexdigit() {
                    text.push(self.next());
                }
            }
            if matches!(self.peek(), 'p' | 'P') && self.exponent_follows() {
                floating = true;
                self.scan_exponent(&mut text);
            }
            if text.len() == 2 {
                return Err(self.malformed(text, row, col));
            }
        } else if first == '0' && matches!(self.peek(), 'b' | 'B') {
            text.push(self.next());
            while matches!(self.peek(), '0' | '1') {
                text.push(self.next());
            }
            if text.len() == 2 {
                return Err(self.malformed(text, row, col));
            }
        } else {
            while self.peek().is_ascii_digit() {
                text.push(self.next());
            }
            if self.peek() == '.' && self.peek_ahead(1).is_ascii_digit() {
                floating = true;
                text.push(self.next());
                while self.peek().is_ascii_digit() {
                    text.push(self.next());
                }
            }
            if matches!(self.peek(), 'e' | 'E') && self.exponent_follows() {
                floating = true;
                self.scan_exponent(&mut text);
            }
        }

        let mut float_suffix = false;
        let mut long_suffix = false;
        while matches!(self.peek(), 'f' | 'F' | 'l' | 'L') {
            let suffix = self.next();
            text.push(suffix);
            match suffix {
                'f' | 'F' => float_suffix = true,
                _ => long_suffix = true,
            }
        }

        // The float and long-double suffixes are mutually exclusive.
        if float_suffix && long_suffix {
            return Err(self.malformed(text, row, col));
        }

        let kind = if float_suffix {
            TokenKind::FloatLiteral
        } else if long_suffix {
            TokenKind::LongDoubleLiteral
        } else if floating {
            TokenKind::DoubleLiteral
        } else {
            TokenKind::IntLiteral
        };

        Ok(self.make_token(kind, &text, row, col))
    }

    /// True when the exponent marker at the cursor is followed by digits,
    /// with an optional sign in between.
    fn exponent_follows(&self) -> bool {
        let after = if matches!(self.peek_ahead(1), '+' | '-') { 2 } else { 1 };
        self.peek_ahead(after).is_ascii_digit()
    }

    fn scan_exponent(&mut self, text: &mut String) {
        text.push(self.next());
        if matches!(self.peek(), '+' | '-') {
            text.push(self.next());
        }
        while self.peek().is_ascii_digit() {
            text.push(self.next());
        }
    }

    fn malformed(&mut self, text: String, row: usize, col: usize) -> LexError {
        let error = LexError::MalformedNumber { text, row, col };
        self.handler.borrow_mut().report_lex_error(&error);
        error
    }

    /// Char and string literals, raw spelling kept with quotes and escape
    /// sequences unprocessed.
    fn quoted_literal(
        &mut self,
        quote: char,
        kind: TokenKind,
        row: usize,
        col: usize,
    ) -> Result<Token, LexError> {
        let mut text = String::new();
        text.push(quote);
        loop {
            match self.next() {
                EOF_CHAR | '\n' => {
                    let error = LexError::UnterminatedLiteral { row, col };
                    self.handler.borrow_mut().report_lex_error(&error);
                    return Err(error);
                }
                '\\' => {
                    text.push('\\');
                    let escaped = self.next();
                    if escaped == EOF_CHAR {
                        let error = LexError::UnterminatedLiteral { row, col };
                        self.handler.borrow_mut().report_lex_error(&error);
                        return Err(error);
                    }
                    text.push(escaped);
                }
                ch if ch == quote => {
                    text.push(quote);
                    break;
                }
                ch => text.push(ch),
            }
        }
        Ok(self.make_token(kind, &text, row, col))
    }

    /// Skip whitespace and comments up to the start of the next token.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            let ch = self.peek();
            if ch.is_ascii_whitespace() {
                self.next();
            } else if ch == '/' && self.peek_ahead(1) == '/' {
                self.skip_line();
            } else if ch == '/' && self.peek_ahead(1) == '*' {
                self.skip_block_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_line(&mut self) {
        let mut ch = self.next();
        while ch != EOF_CHAR && ch != '\n' {
            ch = self.next();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let row = self.row;
        let col = self.col;
        self.next();
        self.next();
        loop {
            match self.next() {
                EOF_CHAR => {
                    let error = LexError::UnterminatedComment { row, col };
                    self.handler.borrow_mut().report_lex_error(&error);
                    return Err(error);
                }
                '*' if self.peek() == '/' => {
                    self.next();
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    fn peek(&self) -> char {
        self.src.get(self.pos).copied().unwrap_or(EOF_CHAR)
    }

    fn peek_ahead(&self, n: usize) -> char {
        self.src.get(self.pos + n).copied().unwrap_or(EOF_CHAR)
    }

    fn next(&mut self) -> char {
        match self.src.get(self.pos).copied() {
            None => EOF_CHAR,
            Some(ch) => {
                self.pos += 1;
                if ch == '\n' {
                    self.row += 1;
                    self.col = 1;
                } else {
                    self.col += 1;
                }
                ch
            }
        }
    }
}
