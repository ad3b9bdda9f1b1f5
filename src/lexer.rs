// ABOUTME: Character stream to token stream, with state-sensitive disambiguation
// ABOUTME: of '/' (division vs regex) and strict '.' (object-access) handling.

use crate::error::LexError;
use crate::token::{Token, TokenKind};

/// Tokens whose presence immediately before a `/` means that `/` is division,
/// not the start of a regex literal (§4.1).
fn ends_value(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Number | TokenKind::Ident | TokenKind::RParen | TokenKind::RBracket
    )
}

fn keyword(word: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match word {
        "true" => True,
        "false" => False,
        "nil" => Nil,
        "if" => KwIf,
        "else" => KwElse,
        "elsif" => KwElsif,
        "for" => KwFor,
        "in" => KwIn,
        "while" => KwWhile,
        "break" => KwBreak,
        "continue" => KwContinue,
        "return" => KwReturn,
        "try" => KwTry,
        "catch" => KwCatch,
        "finally" => KwFinally,
        "throw" => KwThrow,
        "fn" => KwFn,
        "lambda" => KwLambda,
        "end" => KwEnd,
        "let" => KwLet,
        "new" => KwNew,
        "use" => KwUse,
        _ => return None,
    })
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Lazily tokenizes a source string. `next_token` is the primitive; the
/// two-character arithmetic/bitwise/comparison operators and the `>>>`
/// extension of `>>` are resolved here with a one-character lookahead, never
/// more.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    last_kind: Option<TokenKind>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            last_kind: None,
        }
    }

    /// Tokenizes the whole source up front. Convenience wrapper over
    /// `next_token` for callers (the parsers) that want the full stream.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(ch) = c {
            self.pos += 1;
            if ch == '\n' {
                self.line += 1;
            }
        }
        c
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') if self.peek_at(1) == Some('#') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn make(&mut self, kind: TokenKind, start: usize, line: usize) -> Token {
        let lexeme: String = self.chars[start..self.pos].iter().collect();
        self.last_kind = Some(kind);
        Token::new(kind, lexeme, start, self.pos, line)
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();

        let start = self.pos;
        let line = self.line;

        let c = match self.peek() {
            None => return Ok(self.make(TokenKind::Eof, start, line)),
            Some(c) => c,
        };

        if c.is_ascii_digit() || (c == '.' && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()))
        {
            return Ok(self.scan_number(start, line));
        }

        if is_ident_start(c) {
            return Ok(self.scan_ident(start, line));
        }

        match c {
            '"' | '\'' => self.scan_string(c, start, line),
            '/' => {
                if self.last_kind.map(ends_value).unwrap_or(false) {
                    self.advance();
                    Ok(self.make(TokenKind::Slash, start, line))
                } else {
                    self.scan_regex(start, line)
                }
            }
            '.' => {
                if matches!(self.peek_at(1), Some(d) if is_ident_start(d)) {
                    self.advance();
                    Ok(self.make(TokenKind::Dot, start, line))
                } else {
                    let found = self.peek_at(1).unwrap_or('\0');
                    Err(LexError::DanglingDot { line, found })
                }
            }
            _ => self.scan_operator_or_punct(start, line),
        }
    }

    fn scan_number(&mut self, start: usize, line: usize) -> Token {
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.advance();
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.advance();
            }
        } else {
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
            if self.peek() == Some('.') && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit())
            {
                self.advance();
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
            if matches!(self.peek(), Some('e') | Some('E')) {
                let save = self.pos;
                self.advance();
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.advance();
                }
                if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                        self.advance();
                    }
                } else {
                    self.pos = save;
                }
            }
        }

        if matches!(self.peek(), Some('N') | Some('M')) {
            self.advance();
        }

        self.make(TokenKind::Number, start, line)
    }

    fn scan_ident(&mut self, start: usize, line: usize) -> Token {
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.advance();
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let kind = keyword(&word).unwrap_or(TokenKind::Ident);
        self.make(kind, start, line)
    }

    fn scan_string(&mut self, quote: char, start: usize, line: usize) -> Result<Token, LexError> {
        self.advance(); // opening quote
        loop {
            match self.peek() {
                None => return Err(LexError::UnterminatedString { line }),
                Some('\\') => {
                    self.advance();
                    if self.advance().is_none() {
                        return Err(LexError::UnterminatedString { line });
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
        Ok(self.make(TokenKind::Str, start, line))
    }

    fn scan_regex(&mut self, start: usize, line: usize) -> Result<Token, LexError> {
        self.advance(); // opening '/'
        loop {
            match self.peek() {
                None | Some('\n') => return Err(LexError::UnterminatedRegex { line }),
                Some('\\') => {
                    self.advance();
                    if matches!(self.peek(), None | Some('\n')) {
                        return Err(LexError::UnterminatedRegex { line });
                    }
                    self.advance();
                }
                Some('/') => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
        Ok(self.make(TokenKind::Regex, start, line))
    }

    fn scan_operator_or_punct(&mut self, start: usize, line: usize) -> Result<Token, LexError> {
        use TokenKind::*;

        let c = self.advance().expect("checked by caller");
        let next = self.peek();

        let kind = match (c, next) {
            ('=', Some('=')) => {
                self.advance();
                EqEq
            }
            ('!', Some('=')) => {
                self.advance();
                NotEq
            }
            ('<', Some('=')) => {
                self.advance();
                Le
            }
            ('>', Some('=')) => {
                self.advance();
                Ge
            }
            ('&', Some('&')) => {
                self.advance();
                AndAnd
            }
            ('|', Some('|')) => {
                self.advance();
                OrOr
            }
            ('*', Some('*')) => {
                self.advance();
                StarStar
            }
            ('-', Some('>')) => {
                self.advance();
                Arrow
            }
            ('=', Some('~')) => {
                self.advance();
                RegexMatch
            }
            ('<', Some('<')) => {
                self.advance();
                Shl
            }
            ('>', Some('>')) => {
                self.advance();
                // `>>` extends to `>>>` across intervening whitespace, but not
                // across a comment or anything else — only blank space counts.
                let mut ahead = 0;
                while matches!(self.peek_at(ahead), Some(c) if c.is_whitespace()) {
                    ahead += 1;
                }
                if self.peek_at(ahead) == Some('>') {
                    for _ in 0..=ahead {
                        self.advance();
                    }
                    UShr
                } else {
                    Shr
                }
            }
            ('(', _) => LParen,
            (')', _) => RParen,
            ('[', _) => LBracket,
            (']', _) => RBracket,
            ('{', _) => LBrace,
            ('}', _) => RBrace,
            (',', _) => Comma,
            (';', _) => Semicolon,
            (':', _) => Colon,
            ('+', _) => Plus,
            ('-', _) => Minus,
            ('*', _) => Star,
            ('%', _) => Percent,
            ('&', _) => Amp,
            ('|', _) => Pipe,
            ('^', _) => Caret,
            ('~', _) => Tilde,
            ('=', _) => Eq,
            ('<', _) => Lt,
            ('>', _) => Gt,
            ('!', _) => Bang,
            ('?', _) => Question,
            (other, _) => return Err(LexError::UnexpectedChar { line, found: other }),
        };

        Ok(self.make(kind, start, line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn division_after_identifier() {
        assert_eq!(
            kinds("a / b"),
            vec![TokenKind::Ident, TokenKind::Slash, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn regex_after_assignment() {
        let toks = Lexer::tokenize("let r = /abc/;").unwrap();
        assert_eq!(toks[3].kind, TokenKind::Regex);
        assert_eq!(&*toks[3].lexeme, "/abc/");
    }

    #[test]
    fn division_after_closing_paren() {
        assert_eq!(
            kinds("f() / 2"),
            vec![
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Slash,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn dot_chain_emits_separate_tokens() {
        assert_eq!(
            kinds("a.b.c"),
            vec![
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn dangling_dot_is_an_error() {
        assert!(matches!(
            Lexer::tokenize("a. 1"),
            Err(LexError::DanglingDot { .. })
        ));
    }

    #[test]
    fn leading_decimal_point_number() {
        assert_eq!(kinds(".5"), vec![TokenKind::Number, TokenKind::Eof]);
    }

    #[test]
    fn hex_and_suffixed_numbers() {
        let toks = Lexer::tokenize("0xFF 10N 2.5M 1e10").unwrap();
        assert!(toks.iter().all(|t| t.kind == TokenKind::Number || t.kind == TokenKind::Eof));
    }

    #[test]
    fn shift_and_unsigned_shift() {
        assert_eq!(kinds("a << b"), vec![TokenKind::Ident, TokenKind::Shl, TokenKind::Ident, TokenKind::Eof]);
        assert_eq!(kinds("a >> b"), vec![TokenKind::Ident, TokenKind::Shr, TokenKind::Ident, TokenKind::Eof]);
        assert_eq!(kinds("a >>> b"), vec![TokenKind::Ident, TokenKind::UShr, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn unsigned_shift_extends_across_whitespace() {
        // `>> >` is still one `>>>` token; only the non-whitespace character
        // after the `>>` decides whether it extends.
        assert_eq!(kinds("a >> > b"), vec![TokenKind::Ident, TokenKind::UShr, TokenKind::Ident, TokenKind::Eof]);
        assert_eq!(
            kinds("a >>   > b"),
            vec![TokenKind::Ident, TokenKind::UShr, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn line_comment_runs_to_newline() {
        assert_eq!(
            kinds("1 ## comment\n2"),
            vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn line_numbers_track_newlines() {
        let toks = Lexer::tokenize("let a = 1;\nlet b = 2;").unwrap();
        let b_tok = toks.iter().find(|t| &*t.lexeme == "b").unwrap();
        assert_eq!(b_tok.line, 2);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(matches!(
            Lexer::tokenize("\"abc"),
            Err(LexError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn unterminated_regex_is_an_error() {
        assert!(matches!(
            Lexer::tokenize("/abc"),
            Err(LexError::UnterminatedRegex { .. })
        ));
    }

    #[test]
    fn keywords_and_booleans() {
        assert_eq!(
            kinds("if else elsif for in while break continue return try catch finally throw fn lambda end let new use true false nil"),
            vec![
                TokenKind::KwIf, TokenKind::KwElse, TokenKind::KwElsif, TokenKind::KwFor,
                TokenKind::KwIn, TokenKind::KwWhile, TokenKind::KwBreak, TokenKind::KwContinue,
                TokenKind::KwReturn, TokenKind::KwTry, TokenKind::KwCatch, TokenKind::KwFinally,
                TokenKind::KwThrow, TokenKind::KwFn, TokenKind::KwLambda, TokenKind::KwEnd,
                TokenKind::KwLet, TokenKind::KwNew, TokenKind::KwUse,
                TokenKind::True, TokenKind::False, TokenKind::Nil, TokenKind::Eof,
            ]
        );
    }
}
