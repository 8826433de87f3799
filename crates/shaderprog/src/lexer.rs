//! Tokenizer for shader source text.

use crate::error::{CompileError, CompileResult, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dot,
    Question,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PlusPlus,
    MinusMinus,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
}

impl Punct {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::Comma => ",",
            Punct::Semicolon => ";",
            Punct::Dot => ".",
            Punct::Question => "?",
            Punct::Colon => ":",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Assign => "=",
            Punct::PlusAssign => "+=",
            Punct::MinusAssign => "-=",
            Punct::StarAssign => "*=",
            Punct::SlashAssign => "/=",
            Punct::PlusPlus => "++",
            Punct::MinusMinus => "--",
            Punct::Eq => "==",
            Punct::NotEq => "!=",
            Punct::Lt => "<",
            Punct::Le => "<=",
            Punct::Gt => ">",
            Punct::Ge => ">=",
            Punct::AndAnd => "&&",
            Punct::OrOr => "||",
            Punct::Bang => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Number(f32),
    Punct(Punct),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

/// Two-character operators, checked before their one-character prefixes.
const DOUBLE_PUNCTS: [(&str, Punct); 12] = [
    ("+=", Punct::PlusAssign),
    ("-=", Punct::MinusAssign),
    ("*=", Punct::StarAssign),
    ("/=", Punct::SlashAssign),
    ("++", Punct::PlusPlus),
    ("--", Punct::MinusMinus),
    ("==", Punct::Eq),
    ("!=", Punct::NotEq),
    ("<=", Punct::Le),
    (">=", Punct::Ge),
    ("&&", Punct::AndAnd),
    ("||", Punct::OrOr),
];

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn pos(&self) -> Pos {
        Pos::new(self.line, self.column)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_second(&self) -> Option<char> {
        let mut lookahead = self.chars.clone();
        lookahead.next();
        lookahead.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }
}

pub(crate) fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();

    loop {
        skip_trivia(&mut cursor)?;
        let pos = cursor.pos();
        let Some(ch) = cursor.peek() else {
            tokens.push(Token {
                kind: TokenKind::Eof,
                pos,
            });
            return Ok(tokens);
        };

        let kind = if ch.is_ascii_alphabetic() || ch == '_' {
            TokenKind::Ident(lex_ident(&mut cursor))
        } else if ch.is_ascii_digit()
            || (ch == '.' && cursor.peek_second().is_some_and(|c| c.is_ascii_digit()))
        {
            TokenKind::Number(lex_number(&mut cursor, pos)?)
        } else {
            TokenKind::Punct(lex_punct(&mut cursor, pos)?)
        };
        tokens.push(Token { kind, pos });
    }
}

fn skip_trivia(cursor: &mut Cursor<'_>) -> CompileResult<()> {
    loop {
        match cursor.peek() {
            Some(ch) if ch.is_whitespace() => {
                cursor.bump();
            }
            Some('/') if cursor.peek_second() == Some('/') => {
                while let Some(ch) = cursor.bump() {
                    if ch == '\n' {
                        break;
                    }
                }
            }
            Some('/') if cursor.peek_second() == Some('*') => {
                let start = cursor.pos();
                cursor.bump();
                cursor.bump();
                let mut closed = false;
                while let Some(ch) = cursor.bump() {
                    if ch == '*' && cursor.peek() == Some('/') {
                        cursor.bump();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(CompileError::at(start, "unterminated block comment"));
                }
            }
            _ => return Ok(()),
        }
    }
}

fn lex_ident(cursor: &mut Cursor<'_>) -> String {
    let mut ident = String::new();
    while let Some(ch) = cursor.peek() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            ident.push(ch);
            cursor.bump();
        } else {
            break;
        }
    }
    ident
}

fn lex_number(cursor: &mut Cursor<'_>, pos: Pos) -> CompileResult<f32> {
    let mut text = String::new();
    let mut seen_dot = false;
    let mut seen_exponent = false;

    while let Some(ch) = cursor.peek() {
        if ch.is_ascii_digit() {
            text.push(ch);
        } else if ch == '.' && !seen_dot && !seen_exponent {
            seen_dot = true;
            text.push(ch);
        } else if (ch == 'e' || ch == 'E') && !seen_exponent {
            seen_exponent = true;
            text.push(ch);
            cursor.bump();
            if let Some(sign @ ('+' | '-')) = cursor.peek() {
                text.push(sign);
                cursor.bump();
            }
            continue;
        } else {
            break;
        }
        cursor.bump();
    }

    // Precision suffixes are accepted and ignored.
    if let Some('f' | 'F' | 'h' | 'H') = cursor.peek() {
        cursor.bump();
    }

    text.parse::<f32>()
        .map_err(|_| CompileError::at(pos, format!("invalid numeric literal '{text}'")))
}

fn lex_punct(cursor: &mut Cursor<'_>, pos: Pos) -> CompileResult<Punct> {
    let first = cursor.peek().unwrap_or_default();
    if let Some(second) = cursor.peek_second() {
        let pair: String = [first, second].iter().collect();
        if let Some((_, punct)) = DOUBLE_PUNCTS.iter().find(|(text, _)| *text == pair) {
            cursor.bump();
            cursor.bump();
            return Ok(*punct);
        }
    }

    let punct = match first {
        '(' => Punct::LParen,
        ')' => Punct::RParen,
        '{' => Punct::LBrace,
        '}' => Punct::RBrace,
        ',' => Punct::Comma,
        ';' => Punct::Semicolon,
        '.' => Punct::Dot,
        '?' => Punct::Question,
        ':' => Punct::Colon,
        '+' => Punct::Plus,
        '-' => Punct::Minus,
        '*' => Punct::Star,
        '/' => Punct::Slash,
        '=' => Punct::Assign,
        '<' => Punct::Lt,
        '>' => Punct::Gt,
        '!' => Punct::Bang,
        other => {
            return Err(CompileError::at(
                pos,
                format!("unexpected character '{other}'"),
            ))
        }
    };
    cursor.bump();
    Ok(punct)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn lexes_numbers_in_all_spellings() {
        assert_eq!(
            kinds("1 2.5 .5 1e2 3.0f"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(2.5),
                TokenKind::Number(0.5),
                TokenKind::Number(100.0),
                TokenKind::Number(3.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn prefers_compound_operators() {
        assert_eq!(
            kinds("a+=b++<=c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct(Punct::PlusAssign),
                TokenKind::Ident("b".into()),
                TokenKind::Punct(Punct::PlusPlus),
                TokenKind::Punct(Punct::Le),
                TokenKind::Ident("c".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_comments_and_tracks_positions() {
        let tokens = tokenize("// header\n/* block\n */  uv").expect("tokenize");
        assert_eq!(tokens[0].kind, TokenKind::Ident("uv".into()));
        assert_eq!(tokens[0].pos, Pos::new(3, 6));
    }

    #[test]
    fn reports_unterminated_comment() {
        let err = tokenize("float x; /* open").unwrap_err();
        assert_eq!((err.line, err.column), (1, 10));
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = tokenize("float x = 1 @ 2;").unwrap_err();
        assert!(err.message.contains('@'));
        assert_eq!(err.column, 13);
    }
}
