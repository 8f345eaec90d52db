pub mod token;

use crate::error::{OkerError, OkerResult};
use token::{keyword_or_ident, Token, TokenType};

pub struct Lexer {
  input: Vec<char>,
  position: usize,
  line: usize,
  column: usize,
}

impl Lexer {
  pub fn new(input: &str) -> Self {
    Self {
      input: input.chars().collect(),
      position: 0,
      line: 1,
      column: 1,
    }
  }

  fn current_char(&self) -> Option<char> {
    self.input.get(self.position).copied()
  }

  fn peek_char(&self) -> Option<char> {
    self.input.get(self.position + 1).copied()
  }

  fn advance(&mut self) -> Option<char> {
    let ch = self.current_char()?;
    self.position += 1;
    if ch == '\n' {
      self.line += 1;
      self.column = 1;
    } else {
      self.column += 1;
    }
    Some(ch)
  }

  fn skip_whitespace(&mut self) {
    while let Some(ch) = self.current_char() {
      if ch.is_whitespace() && ch != '\n' {
        self.advance();
      } else {
        break;
      }
    }
  }

  fn read_number(&mut self) -> Token {
    let start_line = self.line;
    let start_column = self.column;
    let mut num = String::new();
    let mut has_decimal = false;

    while let Some(ch) = self.current_char() {
      if ch.is_ascii_digit() {
        num.push(ch);
        self.advance();
      } else if ch == '.' && !has_decimal {
        has_decimal = true;
        num.push(ch);
        self.advance();
      } else {
        break;
      }
    }

    Token::new(TokenType::Number, num, start_line, start_column)
  }

  fn read_string(&mut self) -> OkerResult<Token> {
    let start_line = self.line;
    let start_column = self.column;
    let mut value = String::new();
    let mut terminated = false;

    self.advance(); // opening quote

    while let Some(ch) = self.current_char() {
      if ch == '"' {
        self.advance();
        terminated = true;
        break;
      } else if ch == '\\' {
        self.advance();
        if let Some(escaped) = self.current_char() {
          match escaped {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            '\\' => value.push('\\'),
            '"' => value.push('"'),
            // Unknown escape keeps the following character
            _ => value.push(escaped),
          }
          self.advance();
        }
      } else {
        value.push(ch);
        self.advance();
      }
    }

    if !terminated {
      return Err(OkerError::lex("Unterminated string literal", start_line));
    }

    Ok(Token::new(TokenType::String, value, start_line, start_column))
  }

  fn read_identifier(&mut self) -> Token {
    let start_line = self.line;
    let start_column = self.column;
    let mut ident = String::new();

    while let Some(ch) = self.current_char() {
      if ch.is_ascii_alphanumeric() || ch == '_' {
        ident.push(ch);
        self.advance();
      } else {
        break;
      }
    }

    let token_type = keyword_or_ident(&ident);
    Token::new(token_type, ident, start_line, start_column)
  }

  fn read_line_comment(&mut self) -> Token {
    let start_line = self.line;
    let start_column = self.column;
    let mut text = String::new();

    self.advance(); // ~

    while let Some(ch) = self.current_char() {
      if ch == '\n' {
        break;
      }
      text.push(ch);
      self.advance();
    }

    Token::new(TokenType::Comment, text, start_line, start_column)
  }

  fn read_block_comment(&mut self) -> Token {
    let start_line = self.line;
    let start_column = self.column;
    let mut text = String::new();

    self.advance(); // ~
    self.advance(); // ~

    while let Some(ch) = self.current_char() {
      if ch == '~' && self.peek_char() == Some('~') {
        self.advance();
        self.advance();
        break;
      }
      text.push(ch);
      self.advance();
    }

    Token::new(TokenType::Comment, text, start_line, start_column)
  }

  fn single(&mut self, token_type: TokenType, lexeme: &str) -> Token {
    let token = Token::new(token_type, lexeme, self.line, self.column);
    self.advance();
    token
  }

  /// Two-character operator if the next char matches, else the one-character
  /// fallback.
  fn one_or_two(
    &mut self,
    second: char,
    double_type: TokenType,
    double_lexeme: &str,
    single_type: TokenType,
    single_lexeme: &str,
  ) -> Token {
    let line = self.line;
    let column = self.column;
    self.advance();
    if self.current_char() == Some(second) {
      self.advance();
      Token::new(double_type, double_lexeme, line, column)
    } else {
      Token::new(single_type, single_lexeme, line, column)
    }
  }

  pub fn next_token(&mut self) -> OkerResult<Token> {
    self.skip_whitespace();

    let line = self.line;
    let column = self.column;

    let token = match self.current_char() {
      None => Token::new(TokenType::Eof, "", line, column),

      Some('\n') => self.single(TokenType::Newline, "\n"),

      Some('"') => return self.read_string(),

      Some('~') => {
        if self.peek_char() == Some('~') {
          self.read_block_comment()
        } else {
          self.read_line_comment()
        }
      }

      Some(ch) if ch.is_ascii_digit() => self.read_number(),

      Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => self.read_identifier(),

      Some('+') => self.single(TokenType::Plus, "+"),
      Some('-') => self.single(TokenType::Minus, "-"),
      Some('*') => self.single(TokenType::Multiply, "*"),
      Some('/') => self.single(TokenType::Divide, "/"),
      Some('%') => self.single(TokenType::Modulo, "%"),

      Some('=') => self.one_or_two('=', TokenType::Equal, "==", TokenType::Assign, "="),
      Some('!') => self.one_or_two('=', TokenType::NotEqual, "!=", TokenType::Not, "!"),
      Some('<') => self.one_or_two('=', TokenType::LessEqual, "<=", TokenType::LessThan, "<"),
      Some('>') => self.one_or_two(
        '=',
        TokenType::GreaterEqual,
        ">=",
        TokenType::GreaterThan,
        ">",
      ),

      Some('(') => self.single(TokenType::LParen, "("),
      Some(')') => self.single(TokenType::RParen, ")"),
      Some('{') => self.single(TokenType::LBrace, "{"),
      Some('}') => self.single(TokenType::RBrace, "}"),
      Some('[') => self.single(TokenType::LBracket, "["),
      Some(']') => self.single(TokenType::RBracket, "]"),
      Some(',') => self.single(TokenType::Comma, ","),
      Some(':') => self.single(TokenType::Colon, ":"),
      Some(';') => self.single(TokenType::Semicolon, ";"),

      Some('.') => {
        if self.peek_char().map(|c| c.is_ascii_digit()).unwrap_or(false) {
          self.read_number()
        } else {
          self.single(TokenType::Dot, ".")
        }
      }

      Some(ch) => {
        let mut lexeme = String::new();
        lexeme.push(ch);
        self.single(TokenType::Unknown, &lexeme)
      }
    };

    Ok(token)
  }

  pub fn tokenize(&mut self) -> OkerResult<Vec<Token>> {
    let mut tokens = Vec::new();

    loop {
      let token = self.next_token()?;
      let is_eof = token.token_type == TokenType::Eof;
      tokens.push(token);
      if is_eof {
        break;
      }
    }

    Ok(tokens)
  }
}
