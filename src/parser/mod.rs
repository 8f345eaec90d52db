pub mod ast;
pub mod display;

use crate::error::{OkerError, OkerResult};
use crate::lexer::token::{Token, TokenType};
use ast::{BinaryOp, Expr, FunctionDecl, Program, Span, Stmt, UnaryOp};

pub struct Parser {
  tokens: Vec<Token>,
  current: usize,
}

impl Parser {
  pub fn new(mut tokens: Vec<Token>) -> Self {
    if tokens.is_empty() {
      tokens.push(Token::new(TokenType::Eof, "", 1, 1));
    }
    Self { tokens, current: 0 }
  }

  fn peek(&self) -> &Token {
    &self.tokens[self.current.min(self.tokens.len() - 1)]
  }

  fn previous(&self) -> &Token {
    &self.tokens[self.current.saturating_sub(1)]
  }

  fn advance(&mut self) -> Token {
    if !self.is_at_end() {
      self.current += 1;
    }
    self.previous().clone()
  }

  fn check(&self, token_type: TokenType) -> bool {
    !self.is_at_end() && self.peek().token_type == token_type
  }

  fn match_token(&mut self, token_type: TokenType) -> bool {
    if self.check(token_type) {
      self.advance();
      true
    } else {
      false
    }
  }

  fn is_at_end(&self) -> bool {
    self.peek().token_type == TokenType::Eof
  }

  fn error_here(&self, message: impl Into<String>) -> OkerError {
    let token = self.peek();
    OkerError::parse(message, token.line, token.column)
  }

  fn expect(&mut self, token_type: TokenType, message: &str) -> OkerResult<Token> {
    if self.check(token_type) {
      Ok(self.advance())
    } else {
      Err(self.error_here(message))
    }
  }

  fn skip_newlines(&mut self) {
    while self.match_token(TokenType::Newline)
      || self.match_token(TokenType::Comment)
      || self.match_token(TokenType::Semicolon)
    {}
  }

  fn span_of(token: &Token) -> Span {
    Span::new(token.line, token.column)
  }

  pub fn parse(&mut self) -> OkerResult<Program> {
    let mut statements = Vec::new();

    self.skip_newlines();
    while !self.is_at_end() {
      statements.push(self.statement()?);
      self.skip_newlines();
    }

    Ok(Program { statements })
  }

  fn statement(&mut self) -> OkerResult<Stmt> {
    match self.peek().token_type {
      TokenType::Let => self.let_statement(),
      TokenType::Say => self.say_statement(),
      TokenType::If => self.if_statement(),
      TokenType::While => self.while_statement(),
      TokenType::Repeat => self.repeat_statement(),
      TokenType::Makef => {
        let decl = self.function_declaration()?;
        Ok(Stmt::FunctionDecl(decl))
      }
      TokenType::Class => self.class_declaration(),
      TokenType::Return => self.return_statement(),
      TokenType::Break => {
        let token = self.advance();
        Ok(Stmt::Break {
          span: Self::span_of(&token),
        })
      }
      TokenType::Continue => {
        let token = self.advance();
        Ok(Stmt::Continue {
          span: Self::span_of(&token),
        })
      }
      TokenType::Try => self.try_statement(),
      TokenType::Unknown => Err(self.error_here(format!(
        "Unexpected character '{}'",
        self.peek().lexeme
      ))),
      _ => self.expression_or_assignment(),
    }
  }

  fn let_statement(&mut self) -> OkerResult<Stmt> {
    let let_token = self.advance();
    let span = Self::span_of(&let_token);

    let name = self
      .expect(TokenType::Identifier, "Expected identifier after 'let'")?
      .lexeme;

    let initializer = if self.match_token(TokenType::Assign) {
      Some(self.expression()?)
    } else {
      None
    };

    Ok(Stmt::VarDecl {
      name,
      initializer,
      span,
    })
  }

  /// `say expr` is sugar for a call to the `say` builtin.
  fn say_statement(&mut self) -> OkerResult<Stmt> {
    let say_token = self.advance();
    let span = Self::span_of(&say_token);

    let arg = self.expression()?;
    let callee = Expr::Identifier {
      name: "say".to_string(),
      span,
    };

    Ok(Stmt::ExpressionStmt {
      expr: Expr::Call {
        callee: Box::new(callee),
        args: vec![arg],
        is_new: false,
        span,
      },
      span,
    })
  }

  fn block(&mut self, terminators: &[TokenType]) -> OkerResult<Vec<Stmt>> {
    let mut statements = Vec::new();

    self.skip_newlines();
    while !self.is_at_end() && !terminators.contains(&self.peek().token_type) {
      statements.push(self.statement()?);
      self.skip_newlines();
    }

    Ok(statements)
  }

  fn expect_colon(&mut self, opener: &Token, construct: &str) -> OkerResult<()> {
    if self.match_token(TokenType::Colon) {
      Ok(())
    } else {
      Err(OkerError::parse(
        format!("Expected ':' after {construct}"),
        opener.line,
        opener.column,
      ))
    }
  }

  fn expect_end(&mut self, opener: &Token, construct: &str) -> OkerResult<()> {
    if self.match_token(TokenType::End) {
      Ok(())
    } else {
      Err(OkerError::parse(
        format!(
          "Expected 'end' to close '{construct}' starting on line {}",
          opener.line
        ),
        opener.line,
        opener.column,
      ))
    }
  }

  fn if_statement(&mut self) -> OkerResult<Stmt> {
    let if_token = self.advance();
    let span = Self::span_of(&if_token);

    let condition = self.expression()?;
    self.expect_colon(&if_token, "if condition")?;

    let then_branch = self.block(&[TokenType::Else, TokenType::End])?;

    let else_branch = if self.match_token(TokenType::Else) {
      // `else if` arrives as an `else:` block holding a nested `if ... end`
      self.expect_colon(&if_token, "else")?;
      self.block(&[TokenType::End])?
    } else {
      Vec::new()
    };

    self.expect_end(&if_token, "if")?;

    Ok(Stmt::If {
      condition,
      then_branch,
      else_branch,
      span,
    })
  }

  fn while_statement(&mut self) -> OkerResult<Stmt> {
    let while_token = self.advance();
    let span = Self::span_of(&while_token);

    let condition = self.expression()?;
    self.expect_colon(&while_token, "while condition")?;

    let body = self.block(&[TokenType::End])?;
    self.expect_end(&while_token, "while")?;

    Ok(Stmt::While {
      condition,
      body,
      span,
    })
  }

  fn repeat_statement(&mut self) -> OkerResult<Stmt> {
    let repeat_token = self.advance();
    let span = Self::span_of(&repeat_token);

    let count = self.expression()?;
    self.expect_colon(&repeat_token, "repeat count")?;

    let body = self.block(&[TokenType::End])?;
    self.expect_end(&repeat_token, "repeat")?;

    Ok(Stmt::Repeat { count, body, span })
  }

  fn function_declaration(&mut self) -> OkerResult<FunctionDecl> {
    let makef_token = self.advance();
    let span = Self::span_of(&makef_token);

    let name = self
      .expect(TokenType::Identifier, "Expected function name after 'makef'")?
      .lexeme;

    self.expect(TokenType::LParen, "Expected '(' after function name")?;

    let mut params = Vec::new();
    if !self.check(TokenType::RParen) {
      loop {
        let param = self.expect(TokenType::Identifier, "Expected parameter name")?;
        params.push(param.lexeme);
        if !self.match_token(TokenType::Comma) {
          break;
        }
      }
    }

    self.expect(TokenType::RParen, "Expected ')' after parameters")?;
    self.expect_colon(&makef_token, "function signature")?;

    let body = self.block(&[TokenType::End])?;
    self.expect_end(&makef_token, "makef")?;

    Ok(FunctionDecl {
      name,
      params,
      body,
      span,
    })
  }

  fn class_declaration(&mut self) -> OkerResult<Stmt> {
    let class_token = self.advance();
    let span = Self::span_of(&class_token);

    let name = self
      .expect(TokenType::Identifier, "Expected class name after 'class'")?
      .lexeme;
    self.expect_colon(&class_token, "class name")?;

    let mut methods = Vec::new();
    self.skip_newlines();
    while !self.check(TokenType::End) && !self.is_at_end() {
      if !self.check(TokenType::Makef) {
        return Err(self.error_here("Class bodies may only contain method declarations"));
      }
      methods.push(self.function_declaration()?);
      self.skip_newlines();
    }

    self.expect_end(&class_token, "class")?;

    Ok(Stmt::ClassDecl {
      name,
      methods,
      span,
    })
  }

  fn return_statement(&mut self) -> OkerResult<Stmt> {
    let return_token = self.advance();
    let span = Self::span_of(&return_token);

    let value = if self.check(TokenType::Newline)
      || self.check(TokenType::Semicolon)
      || self.check(TokenType::End)
      || self.is_at_end()
    {
      None
    } else {
      Some(self.expression()?)
    };

    Ok(Stmt::Return { value, span })
  }

  fn try_statement(&mut self) -> OkerResult<Stmt> {
    let try_token = self.advance();
    let span = Self::span_of(&try_token);

    self.expect_colon(&try_token, "'try'")?;
    let try_block = self.block(&[TokenType::Fail, TokenType::End])?;

    if !self.check(TokenType::Fail) {
      return Err(OkerError::parse(
        "Expected 'fail' block after 'try' body",
        try_token.line,
        try_token.column,
      ));
    }
    let fail_token = self.advance();
    self.expect_colon(&fail_token, "'fail'")?;
    let fail_block = self.block(&[TokenType::End])?;

    self.expect_end(&try_token, "try")?;

    Ok(Stmt::Try {
      try_block,
      fail_block,
      span,
    })
  }

  /// Parse an expression, then upgrade to an assignment if `=` follows.
  fn expression_or_assignment(&mut self) -> OkerResult<Stmt> {
    let expr = self.expression()?;
    let span = expr.span();

    if self.match_token(TokenType::Assign) {
      match expr {
        Expr::Identifier { .. } | Expr::Index { .. } | Expr::Member { .. } => {}
        _ => {
          return Err(OkerError::parse(
            "Invalid assignment target",
            span.line,
            span.column,
          ));
        }
      }
      let value = self.expression()?;
      return Ok(Stmt::Assign {
        target: expr,
        value,
        span,
      });
    }

    Ok(Stmt::ExpressionStmt { expr, span })
  }

  // Expression cascade, lowest precedence first. All binary operators are
  // left-associative.

  fn expression(&mut self) -> OkerResult<Expr> {
    self.logical_or()
  }

  fn logical_or(&mut self) -> OkerResult<Expr> {
    let mut expr = self.logical_and()?;

    while self.match_token(TokenType::Or) {
      let span = expr.span();
      let right = self.logical_and()?;
      expr = Expr::Binary {
        left: Box::new(expr),
        op: BinaryOp::Or,
        right: Box::new(right),
        span,
      };
    }

    Ok(expr)
  }

  fn logical_and(&mut self) -> OkerResult<Expr> {
    let mut expr = self.equality()?;

    while self.match_token(TokenType::And) {
      let span = expr.span();
      let right = self.equality()?;
      expr = Expr::Binary {
        left: Box::new(expr),
        op: BinaryOp::And,
        right: Box::new(right),
        span,
      };
    }

    Ok(expr)
  }

  fn equality(&mut self) -> OkerResult<Expr> {
    let mut expr = self.comparison()?;

    loop {
      let op = if self.match_token(TokenType::Equal) {
        BinaryOp::Equal
      } else if self.match_token(TokenType::NotEqual) {
        BinaryOp::NotEqual
      } else {
        break;
      };
      let span = expr.span();
      let right = self.comparison()?;
      expr = Expr::Binary {
        left: Box::new(expr),
        op,
        right: Box::new(right),
        span,
      };
    }

    Ok(expr)
  }

  fn comparison(&mut self) -> OkerResult<Expr> {
    let mut expr = self.additive()?;

    loop {
      let op = if self.match_token(TokenType::LessThan) {
        BinaryOp::LessThan
      } else if self.match_token(TokenType::LessEqual) {
        BinaryOp::LessEqual
      } else if self.match_token(TokenType::GreaterThan) {
        BinaryOp::GreaterThan
      } else if self.match_token(TokenType::GreaterEqual) {
        BinaryOp::GreaterEqual
      } else {
        break;
      };
      let span = expr.span();
      let right = self.additive()?;
      expr = Expr::Binary {
        left: Box::new(expr),
        op,
        right: Box::new(right),
        span,
      };
    }

    Ok(expr)
  }

  fn additive(&mut self) -> OkerResult<Expr> {
    let mut expr = self.multiplicative()?;

    loop {
      let op = if self.match_token(TokenType::Plus) {
        BinaryOp::Add
      } else if self.match_token(TokenType::Minus) {
        BinaryOp::Subtract
      } else {
        break;
      };
      let span = expr.span();
      let right = self.multiplicative()?;
      expr = Expr::Binary {
        left: Box::new(expr),
        op,
        right: Box::new(right),
        span,
      };
    }

    Ok(expr)
  }

  fn multiplicative(&mut self) -> OkerResult<Expr> {
    let mut expr = self.unary()?;

    loop {
      let op = if self.match_token(TokenType::Multiply) {
        BinaryOp::Multiply
      } else if self.match_token(TokenType::Divide) {
        BinaryOp::Divide
      } else if self.match_token(TokenType::Modulo) {
        BinaryOp::Modulo
      } else {
        break;
      };
      let span = expr.span();
      let right = self.unary()?;
      expr = Expr::Binary {
        left: Box::new(expr),
        op,
        right: Box::new(right),
        span,
      };
    }

    Ok(expr)
  }

  fn unary(&mut self) -> OkerResult<Expr> {
    let op = if self.check(TokenType::Minus) {
      Some(UnaryOp::Negate)
    } else if self.check(TokenType::Not) {
      Some(UnaryOp::Not)
    } else {
      None
    };

    if let Some(op) = op {
      let token = self.advance();
      let operand = self.unary()?;
      return Ok(Expr::Unary {
        op,
        operand: Box::new(operand),
        span: Self::span_of(&token),
      });
    }

    self.postfix()
  }

  /// Postfix chain: calls, subscripts, and member access.
  fn postfix(&mut self) -> OkerResult<Expr> {
    let mut expr = self.primary()?;

    loop {
      if self.match_token(TokenType::LParen) {
        let args = self.arguments()?;
        let span = expr.span();
        expr = Expr::Call {
          callee: Box::new(expr),
          args,
          is_new: false,
          span,
        };
      } else if self.match_token(TokenType::LBracket) {
        self.skip_newlines();
        let index = self.expression()?;
        self.skip_newlines();
        self.expect(TokenType::RBracket, "Expected ']' after index")?;
        let span = expr.span();
        expr = Expr::Index {
          object: Box::new(expr),
          index: Box::new(index),
          span,
        };
      } else if self.match_token(TokenType::Dot) {
        let property = self
          .expect(TokenType::Identifier, "Expected property name after '.'")?
          .lexeme;
        let span = expr.span();
        expr = Expr::Member {
          object: Box::new(expr),
          property,
          span,
        };
      } else {
        break;
      }
    }

    Ok(expr)
  }

  fn arguments(&mut self) -> OkerResult<Vec<Expr>> {
    let mut args = Vec::new();

    self.skip_newlines();
    if !self.check(TokenType::RParen) {
      loop {
        args.push(self.expression()?);
        self.skip_newlines();
        if !self.match_token(TokenType::Comma) {
          break;
        }
        self.skip_newlines();
      }
    }
    self.expect(TokenType::RParen, "Expected ')' after arguments")?;

    Ok(args)
  }

  fn primary(&mut self) -> OkerResult<Expr> {
    if self.check(TokenType::Boolean) {
      let token = self.advance();
      return Ok(Expr::BoolLit {
        value: token.lexeme == "true",
        span: Self::span_of(&token),
      });
    }

    if self.check(TokenType::Number) {
      let token = self.advance();
      let value = token.lexeme.parse::<f64>().map_err(|_| {
        OkerError::parse(
          format!("Invalid number literal '{}'", token.lexeme),
          token.line,
          token.column,
        )
      })?;
      return Ok(Expr::NumberLit {
        value,
        span: Self::span_of(&token),
      });
    }

    if self.check(TokenType::String) {
      let token = self.advance();
      return Ok(Expr::StringLit {
        value: token.lexeme.clone(),
        span: Self::span_of(&token),
      });
    }

    if self.check(TokenType::This) {
      let token = self.advance();
      return Ok(Expr::Identifier {
        name: "this".to_string(),
        span: Self::span_of(&token),
      });
    }

    if self.check(TokenType::Identifier) {
      let token = self.advance();
      return Ok(Expr::Identifier {
        name: token.lexeme.clone(),
        span: Self::span_of(&token),
      });
    }

    if self.check(TokenType::New) {
      return self.new_expression();
    }

    if self.match_token(TokenType::LParen) {
      let expr = self.expression()?;
      self.expect(TokenType::RParen, "Expected ')' after expression")?;
      return Ok(expr);
    }

    if self.check(TokenType::LBracket) {
      return self.list_literal();
    }

    if self.check(TokenType::LBrace) {
      return self.dict_literal();
    }

    Err(self.error_here("Expected expression"))
  }

  fn new_expression(&mut self) -> OkerResult<Expr> {
    let new_token = self.advance();
    let span = Self::span_of(&new_token);

    let class_token = self.expect(TokenType::Identifier, "Expected class name after 'new'")?;
    let callee = Expr::Identifier {
      name: class_token.lexeme.clone(),
      span: Self::span_of(&class_token),
    };

    self.expect(TokenType::LParen, "Expected '(' after class name")?;
    let args = self.arguments()?;

    Ok(Expr::Call {
      callee: Box::new(callee),
      args,
      is_new: true,
      span,
    })
  }

  fn list_literal(&mut self) -> OkerResult<Expr> {
    let open = self.advance();
    let span = Self::span_of(&open);
    let mut elements = Vec::new();

    self.skip_newlines();
    if !self.check(TokenType::RBracket) {
      loop {
        elements.push(self.expression()?);
        self.skip_newlines();
        if !self.match_token(TokenType::Comma) {
          break;
        }
        self.skip_newlines();
      }
    }
    self.expect(TokenType::RBracket, "Expected ']' after list elements")?;

    Ok(Expr::ListLit { elements, span })
  }

  fn dict_literal(&mut self) -> OkerResult<Expr> {
    let open = self.advance();
    let span = Self::span_of(&open);
    let mut entries = Vec::new();

    self.skip_newlines();
    if !self.check(TokenType::RBrace) {
      loop {
        let key = self.expression()?;
        self.skip_newlines();
        self.expect(TokenType::Colon, "Expected ':' after dictionary key")?;
        self.skip_newlines();
        let value = self.expression()?;
        entries.push((key, value));
        self.skip_newlines();
        if !self.match_token(TokenType::Comma) {
          break;
        }
        self.skip_newlines();
      }
    }
    self.expect(TokenType::RBrace, "Expected '}' after dictionary entries")?;

    Ok(Expr::DictLit { entries, span })
  }
}
