//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer never fails. Characters outside the alphabet become
//! `Error` tokens and flow downstream like any other kind; the parser's
//! first mismatch against one produces the syntax diagnostic. Identifiers
//! are letters only, so `x1` lexes as an identifier followed by a number.

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Eof,
  Error,
  If,
  Else,
  Int,
  Return,
  Void,
  While,
  Plus,
  Minus,
  Times,
  Div,
  Less,
  LessEq,
  Greater,
  GreaterEq,
  Equal,
  NotEqual,
  Assign,
  Semicolon,
  Comma,
  OpenParen,
  CloseParen,
  OpenBracket,
  CloseBracket,
  OpenBrace,
  CloseBrace,
  Num,
  Id,
}

impl TokenKind {
  /// The vocabulary diagnostics use for this kind.
  pub fn name(self) -> &'static str {
    match self {
      TokenKind::Eof => "END_FILE",
      TokenKind::Error => "ERROR",
      TokenKind::If => "IF",
      TokenKind::Else => "ELSE",
      TokenKind::Int => "INT",
      TokenKind::Return => "RETURN",
      TokenKind::Void => "VOID",
      TokenKind::While => "WHILE",
      TokenKind::Plus => "PLUS",
      TokenKind::Minus => "MINUS",
      TokenKind::Times => "TIMES",
      TokenKind::Div => "DIV",
      TokenKind::Less => "LESS",
      TokenKind::LessEq => "LEQ",
      TokenKind::Greater => "GREAT",
      TokenKind::GreaterEq => "GEQ",
      TokenKind::Equal => "EQUAL",
      TokenKind::NotEqual => "N_EQUAL",
      TokenKind::Assign => "ASSIGN",
      TokenKind::Semicolon => "SEMI_COL",
      TokenKind::Comma => "COMMA",
      TokenKind::OpenParen => "O_PAREN",
      TokenKind::CloseParen => "C_PAREN",
      TokenKind::OpenBracket => "O_BRACK",
      TokenKind::CloseBracket => "C_BRACK",
      TokenKind::OpenBrace => "O_BRACE",
      TokenKind::CloseBrace => "C_BRACE",
      TokenKind::Num => "NUM",
      TokenKind::Id => "ID",
    }
  }
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  /// Materialized value of a `Num` token. `None` on a `Num` means the
  /// literal did not fit in an `i64`; the parser reports that as a
  /// tree-construction error.
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  /// Convenience constructor to keep the `tokenize` loop readable.
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> Vec<Token> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    // A '//' comment runs to the end of the line.
    if c == b'/' && bytes.get(i + 1) == Some(&b'/') {
      while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
      }
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let value = input[start..i].parse::<i64>().ok();
      tokens.push(Token::new(TokenKind::Num, start, i - start, value));
      continue;
    }

    if c.is_ascii_alphabetic() {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
      }
      let kind = keyword_kind(&input[start..i]).unwrap_or(TokenKind::Id);
      tokens.push(Token::new(kind, start, i - start, None));
      continue;
    }

    if let Some((symbol, kind)) = [
      ("==", TokenKind::Equal),
      ("!=", TokenKind::NotEqual),
      ("<=", TokenKind::LessEq),
      (">=", TokenKind::GreaterEq),
    ]
    .into_iter()
    .find(|(symbol, _)| input[i..].starts_with(symbol))
    {
      tokens.push(Token::new(kind, i, symbol.len(), None));
      i += symbol.len();
      continue;
    }

    let kind = match c {
      b'+' => TokenKind::Plus,
      b'-' => TokenKind::Minus,
      b'*' => TokenKind::Times,
      b'/' => TokenKind::Div,
      b'<' => TokenKind::Less,
      b'>' => TokenKind::Greater,
      b'=' => TokenKind::Assign,
      b';' => TokenKind::Semicolon,
      b',' => TokenKind::Comma,
      b'(' => TokenKind::OpenParen,
      b')' => TokenKind::CloseParen,
      b'[' => TokenKind::OpenBracket,
      b']' => TokenKind::CloseBracket,
      b'{' => TokenKind::OpenBrace,
      b'}' => TokenKind::CloseBrace,
      _ => TokenKind::Error,
    };
    // A stray may be multi-byte; never leave the cursor inside a character.
    let len = match kind {
      TokenKind::Error => input[i..].chars().next().map_or(1, char::len_utf8),
      _ => 1,
    };
    tokens.push(Token::new(kind, i, len, None));
    i += len;
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  tokens
}

fn keyword_kind(word: &str) -> Option<TokenKind> {
  match word {
    "if" => Some(TokenKind::If),
    "else" => Some(TokenKind::Else),
    "int" => Some(TokenKind::Int),
    "return" => Some(TokenKind::Return),
    "void" => Some(TokenKind::Void),
    "while" => Some(TokenKind::While),
    _ => None,
  }
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}
