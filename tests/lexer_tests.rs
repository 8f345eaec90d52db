use oker::error::OkerError;
use oker::lexer::token::{Token, TokenType};
use oker::lexer::Lexer;

fn tokenize(source: &str) -> Vec<Token> {
  Lexer::new(source).tokenize().expect("lexer should succeed")
}

fn token_types(source: &str) -> Vec<TokenType> {
  tokenize(source)
    .into_iter()
    .map(|token| token.token_type)
    .collect()
}

#[test]
fn lexes_basic_tokens() {
  let tokens = tokenize("let x = 42");

  assert_eq!(tokens.len(), 5);
  assert_eq!(tokens[0].token_type, TokenType::Let);
  assert_eq!(tokens[1].token_type, TokenType::Identifier);
  assert_eq!(tokens[1].lexeme, "x");
  assert_eq!(tokens[2].token_type, TokenType::Assign);
  assert_eq!(tokens[3].token_type, TokenType::Number);
  assert_eq!(tokens[3].lexeme, "42");
  assert_eq!(tokens[4].token_type, TokenType::Eof);
}

#[test]
fn lexes_string_literal() {
  let tokens = tokenize("\"Hello, World!\"");

  assert_eq!(tokens.len(), 2);
  assert_eq!(tokens[0].token_type, TokenType::String);
  assert_eq!(tokens[0].lexeme, "Hello, World!");
}

#[test]
fn escapes_produce_single_characters() {
  let tokens = tokenize(r#""a\nb\tc\rd\\e\"f""#);

  assert_eq!(tokens[0].token_type, TokenType::String);
  assert_eq!(tokens[0].lexeme, "a\nb\tc\rd\\e\"f");
}

#[test]
fn unknown_escape_keeps_following_character() {
  let tokens = tokenize(r#""a\qb""#);
  assert_eq!(tokens[0].lexeme, "aqb");
}

#[test]
fn unterminated_string_is_a_lexical_error() {
  let result = Lexer::new("let s = \"oops\nsay s").tokenize();
  match result {
    Err(OkerError::Lex { line, .. }) => assert_eq!(line, 1),
    other => panic!("expected lexical error, got {other:?}"),
  }
}

#[test]
fn lexes_keywords() {
  let types = token_types("let say if else end while repeat makef return try fail class new this break continue");
  assert_eq!(
    types,
    vec![
      TokenType::Let,
      TokenType::Say,
      TokenType::If,
      TokenType::Else,
      TokenType::End,
      TokenType::While,
      TokenType::Repeat,
      TokenType::Makef,
      TokenType::Return,
      TokenType::Try,
      TokenType::Fail,
      TokenType::Class,
      TokenType::New,
      TokenType::This,
      TokenType::Break,
      TokenType::Continue,
      TokenType::Eof,
    ]
  );
}

#[test]
fn booleans_keep_their_lexeme() {
  let tokens = tokenize("true false");
  assert_eq!(tokens[0].token_type, TokenType::Boolean);
  assert_eq!(tokens[0].lexeme, "true");
  assert_eq!(tokens[1].token_type, TokenType::Boolean);
  assert_eq!(tokens[1].lexeme, "false");
}

#[test]
fn lexes_operators() {
  let types = token_types("+ - * / % == != < <= > >= and or not !");
  assert_eq!(
    types,
    vec![
      TokenType::Plus,
      TokenType::Minus,
      TokenType::Multiply,
      TokenType::Divide,
      TokenType::Modulo,
      TokenType::Equal,
      TokenType::NotEqual,
      TokenType::LessThan,
      TokenType::LessEqual,
      TokenType::GreaterThan,
      TokenType::GreaterEqual,
      TokenType::And,
      TokenType::Or,
      TokenType::Not,
      TokenType::Not,
      TokenType::Eof,
    ]
  );
}

#[test]
fn multi_character_operators_win_over_prefixes() {
  // == grabs two characters, the leftover = is an assignment
  let tokens = tokenize("===");
  assert_eq!(tokens[0].token_type, TokenType::Equal);
  assert_eq!(tokens[1].token_type, TokenType::Assign);

  let tokens = tokenize("!==");
  assert_eq!(tokens[0].token_type, TokenType::NotEqual);
  assert_eq!(tokens[1].token_type, TokenType::Assign);
}

#[test]
fn lexes_punctuation() {
  let types = token_types("( ) { } [ ] , . : ;");
  assert_eq!(
    types,
    vec![
      TokenType::LParen,
      TokenType::RParen,
      TokenType::LBrace,
      TokenType::RBrace,
      TokenType::LBracket,
      TokenType::RBracket,
      TokenType::Comma,
      TokenType::Dot,
      TokenType::Colon,
      TokenType::Semicolon,
      TokenType::Eof,
    ]
  );
}

#[test]
fn lexes_numbers() {
  let tokens = tokenize("42 3.14 .5");
  assert_eq!(tokens[0].lexeme, "42");
  assert_eq!(tokens[1].lexeme, "3.14");
  assert_eq!(tokens[2].lexeme, ".5");
  for token in &tokens[..3] {
    assert_eq!(token.token_type, TokenType::Number);
  }
}

#[test]
fn line_comment_runs_to_newline() {
  let tokens = tokenize("let x = 1 ~ a comment\nsay x");
  let comment = tokens
    .iter()
    .find(|t| t.token_type == TokenType::Comment)
    .expect("comment token");
  assert_eq!(comment.lexeme, " a comment");
  // The newline after the comment survives
  assert!(tokens.iter().any(|t| t.token_type == TokenType::Newline));
}

#[test]
fn block_comment_spans_lines() {
  let tokens = tokenize("~~ first\nsecond ~~ let x = 1");
  assert_eq!(tokens[0].token_type, TokenType::Comment);
  assert_eq!(tokens[0].lexeme, " first\nsecond ");
  assert_eq!(tokens[1].token_type, TokenType::Let);
}

#[test]
fn tokens_carry_line_and_column() {
  let tokens = tokenize("let x = 42\nsay x");

  assert_eq!((tokens[0].line, tokens[0].column), (1, 1)); // let
  assert_eq!((tokens[1].line, tokens[1].column), (1, 5)); // x
  assert_eq!((tokens[2].line, tokens[2].column), (1, 7)); // =
  assert_eq!((tokens[3].line, tokens[3].column), (1, 9)); // 42
  assert_eq!((tokens[4].line, tokens[4].column), (1, 11)); // newline

  let say = &tokens[5];
  assert_eq!(say.token_type, TokenType::Say);
  assert_eq!((say.line, say.column), (2, 1));
  let x = &tokens[6];
  assert_eq!((x.line, x.column), (2, 5));
}

#[test]
fn exactly_one_eof_token() {
  for source in ["", "let x = 1", "say 1\nsay 2\n"] {
    let tokens = tokenize(source);
    let eof_count = tokens
      .iter()
      .filter(|t| t.token_type == TokenType::Eof)
      .count();
    assert_eq!(eof_count, 1, "source {source:?}");
    assert_eq!(tokens.last().unwrap().token_type, TokenType::Eof);
  }
}

#[test]
fn unknown_character_becomes_unknown_token() {
  let tokens = tokenize("let x = 1 @");
  assert!(tokens
    .iter()
    .any(|t| t.token_type == TokenType::Unknown && t.lexeme == "@"));
}
