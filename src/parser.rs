//! Recursive-descent parser for the C-- grammar.
//!
//! The grammar is not LL(1) in two places: a declaration's kind is decided
//! by the token after `type_specifier ID`, and a statement beginning with
//! an identifier may be an assignment or a plain expression. Both are
//! handled the same way: checkpoint the cursor, parse ahead, and rewind
//! before committing to the production that won.

use crate::ast::{
  BinaryOp, Block, Declaration, Expr, FunDecl, Param, Program, Statement, VarDecl, VarRef,
};
use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, token_text};
use crate::ty::Type;

/// program => declaration { declaration }
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens, source);
  let mut declarations = vec![parse_declaration(&mut stream)?];
  while !stream.at(TokenKind::Eof) {
    declarations.push(parse_declaration(&mut stream)?);
  }
  Ok(Program { declarations })
}

/// declaration => var_declaration | fun_declaration
///
/// Both alternatives begin with `type_specifier ID`; the token after that
/// prefix decides the winner, and the cursor rewinds before reparsing.
fn parse_declaration(stream: &mut TokenStream) -> CompileResult<Declaration> {
  let checkpoint = stream.checkpoint();
  parse_type_specifier(stream)?;
  stream.ident()?;
  let decider = stream.kind();
  if !matches!(
    decider,
    TokenKind::Semicolon | TokenKind::OpenBracket | TokenKind::OpenParen
  ) {
    return Err(stream.unexpected("declaration"));
  }
  stream.rewind(checkpoint);
  if decider == TokenKind::OpenParen {
    Ok(Declaration::Function(parse_fun_declaration(stream)?))
  } else {
    Ok(Declaration::Variable(parse_var_declaration(stream)?))
  }
}

/// type_specifier => 'int' | 'void'
fn parse_type_specifier(stream: &mut TokenStream) -> CompileResult<Type> {
  if stream.eat(TokenKind::Int) {
    Ok(Type::Int)
  } else if stream.eat(TokenKind::Void) {
    Ok(Type::Void)
  } else {
    Err(stream.unexpected("type_specifier"))
  }
}

/// var_declaration => type_specifier ID ';' | type_specifier ID '[' NUM ']' ';'
fn parse_var_declaration(stream: &mut TokenStream) -> CompileResult<VarDecl> {
  let ty = parse_type_specifier(stream)?;
  let name = stream.ident()?;
  let array_len = if stream.eat(TokenKind::OpenBracket) {
    let len = stream.number()?;
    stream.expect(TokenKind::CloseBracket)?;
    Some(len)
  } else {
    None
  };
  stream.expect(TokenKind::Semicolon)?;
  Ok(VarDecl { ty, name, array_len })
}

/// fun_declaration => type_specifier ID '(' params ')' compound_stmt
fn parse_fun_declaration(stream: &mut TokenStream) -> CompileResult<FunDecl> {
  let ty = parse_type_specifier(stream)?;
  let name = stream.ident()?;
  stream.expect(TokenKind::OpenParen)?;
  let params = parse_params(stream)?;
  stream.expect(TokenKind::CloseParen)?;
  let body = parse_compound(stream)?;
  Ok(FunDecl { ty, name, params, body })
}

/// params => param_list | 'void'
///
/// A lone `void` is the empty list, but `void x` must still reach the
/// parameter rule (and fail its type check later), so look one token past
/// the keyword before consuming it.
fn parse_params(stream: &mut TokenStream) -> CompileResult<Vec<Param>> {
  let checkpoint = stream.checkpoint();
  if stream.eat(TokenKind::Void) {
    if stream.at(TokenKind::Id) {
      stream.rewind(checkpoint);
    } else {
      return Ok(Vec::new());
    }
  }
  parse_param_list(stream)
}

/// param_list => param { ',' param }
fn parse_param_list(stream: &mut TokenStream) -> CompileResult<Vec<Param>> {
  let mut params = vec![parse_param(stream)?];
  while stream.eat(TokenKind::Comma) {
    params.push(parse_param(stream)?);
  }
  Ok(params)
}

/// param => type_specifier ID | type_specifier ID '[' ']'
fn parse_param(stream: &mut TokenStream) -> CompileResult<Param> {
  let ty = parse_type_specifier(stream)?;
  let name = stream.ident()?;
  let array = if stream.eat(TokenKind::OpenBracket) {
    stream.expect(TokenKind::CloseBracket)?;
    true
  } else {
    false
  };
  Ok(Param { ty, name, array })
}

/// compound_stmt => '{' local_declarations statement_list '}'
fn parse_compound(stream: &mut TokenStream) -> CompileResult<Block> {
  stream.expect(TokenKind::OpenBrace)?;
  let locals = parse_local_declarations(stream)?;
  let statements = parse_statement_list(stream)?;
  stream.expect(TokenKind::CloseBrace)?;
  Ok(Block { locals, statements })
}

/// local_declarations => { var_declaration }
fn parse_local_declarations(stream: &mut TokenStream) -> CompileResult<Vec<VarDecl>> {
  let mut locals = Vec::new();
  while matches!(stream.kind(), TokenKind::Int | TokenKind::Void) {
    locals.push(parse_var_declaration(stream)?);
  }
  Ok(locals)
}

/// statement_list => { statement }
///
/// A statement can only begin with ID, '{', 'if', 'while' or 'return';
/// the list ends at the first token outside that set.
fn parse_statement_list(stream: &mut TokenStream) -> CompileResult<Vec<Statement>> {
  let mut statements = Vec::new();
  while matches!(
    stream.kind(),
    TokenKind::Id | TokenKind::OpenBrace | TokenKind::If | TokenKind::While | TokenKind::Return
  ) {
    statements.push(parse_statement(stream)?);
  }
  Ok(statements)
}

/// statement => expression_stmt | compound_stmt | selection_stmt
///            | iteration_stmt | return_stmt
fn parse_statement(stream: &mut TokenStream) -> CompileResult<Statement> {
  match stream.kind() {
    TokenKind::Id => parse_expression_stmt(stream),
    TokenKind::OpenBrace => Ok(Statement::Compound(parse_compound(stream)?)),
    TokenKind::If => parse_if(stream),
    TokenKind::While => parse_while(stream),
    TokenKind::Return => parse_return(stream),
    _ => Err(stream.unexpected("statement")),
  }
}

/// expression_stmt => [ expression ] ';'
fn parse_expression_stmt(stream: &mut TokenStream) -> CompileResult<Statement> {
  if stream.eat(TokenKind::Semicolon) {
    return Ok(Statement::Expression(None));
  }
  let expr = parse_expression(stream)?;
  stream.expect(TokenKind::Semicolon)?;
  Ok(Statement::Expression(Some(expr)))
}

/// selection_stmt => 'if' '(' expression ')' statement [ 'else' statement ]
///
/// An `else` binds to the nearest unmatched `if`.
fn parse_if(stream: &mut TokenStream) -> CompileResult<Statement> {
  stream.expect(TokenKind::If)?;
  stream.expect(TokenKind::OpenParen)?;
  let condition = parse_expression(stream)?;
  stream.expect(TokenKind::CloseParen)?;
  let then_branch = Box::new(parse_statement(stream)?);
  let else_branch = if stream.eat(TokenKind::Else) {
    Some(Box::new(parse_statement(stream)?))
  } else {
    None
  };
  Ok(Statement::If { condition, then_branch, else_branch })
}

/// iteration_stmt => 'while' '(' expression ')' statement
fn parse_while(stream: &mut TokenStream) -> CompileResult<Statement> {
  stream.expect(TokenKind::While)?;
  stream.expect(TokenKind::OpenParen)?;
  let condition = parse_expression(stream)?;
  stream.expect(TokenKind::CloseParen)?;
  let body = Box::new(parse_statement(stream)?);
  Ok(Statement::While { condition, body })
}

/// return_stmt => 'return' ';' | 'return' expression ';'
fn parse_return(stream: &mut TokenStream) -> CompileResult<Statement> {
  stream.expect(TokenKind::Return)?;
  if stream.eat(TokenKind::Semicolon) {
    return Ok(Statement::Return(None));
  }
  let expr = parse_expression(stream)?;
  stream.expect(TokenKind::Semicolon)?;
  Ok(Statement::Return(Some(expr)))
}

/// expression => var '=' expression | simple_expression
///
/// A leading call is the whole expression and is dispatched directly.
/// Otherwise the var is parsed speculatively, index and all; when no '='
/// follows, the cursor rewinds and the same tokens reparse as a
/// simple_expression.
fn parse_expression(stream: &mut TokenStream) -> CompileResult<Expr> {
  if stream.at(TokenKind::Id) {
    if stream.peek_next() == TokenKind::OpenParen {
      return parse_call(stream);
    }
    let checkpoint = stream.checkpoint();
    let target = parse_var(stream)?;
    if stream.eat(TokenKind::Assign) {
      let value = parse_expression(stream)?;
      return Ok(Expr::assign(target, value));
    }
    stream.rewind(checkpoint);
  }
  parse_simple_expression(stream)
}

/// simple_expression => additive_exp [ relop additive_exp ]
///
/// At most one relational operator; `a < b < c` does not parse.
fn parse_simple_expression(stream: &mut TokenStream) -> CompileResult<Expr> {
  let lhs = parse_additive(stream)?;
  if let Some(op) = relop(stream.kind()) {
    stream.advance();
    let rhs = parse_additive(stream)?;
    return Ok(Expr::binary(op, lhs, rhs));
  }
  Ok(lhs)
}

/// relop => '<=' | '<' | '>' | '>=' | '==' | '!='
fn relop(kind: TokenKind) -> Option<BinaryOp> {
  match kind {
    TokenKind::Less => Some(BinaryOp::Lt),
    TokenKind::LessEq => Some(BinaryOp::Le),
    TokenKind::Greater => Some(BinaryOp::Gt),
    TokenKind::GreaterEq => Some(BinaryOp::Ge),
    TokenKind::Equal => Some(BinaryOp::Eq),
    TokenKind::NotEqual => Some(BinaryOp::Ne),
    _ => None,
  }
}

/// additive_exp => term { addop term }
fn parse_additive(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_term(stream)?;
  loop {
    let op = match stream.kind() {
      TokenKind::Plus => BinaryOp::Add,
      TokenKind::Minus => BinaryOp::Sub,
      _ => break,
    };
    stream.advance();
    let rhs = parse_term(stream)?;
    node = Expr::binary(op, node, rhs);
  }
  Ok(node)
}

/// term => factor { mulop factor }
fn parse_term(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_factor(stream)?;
  loop {
    let op = match stream.kind() {
      TokenKind::Times => BinaryOp::Mul,
      TokenKind::Div => BinaryOp::Div,
      _ => break,
    };
    stream.advance();
    let rhs = parse_factor(stream)?;
    node = Expr::binary(op, node, rhs);
  }
  Ok(node)
}

/// factor => '(' expression ')' | var | call | NUM
fn parse_factor(stream: &mut TokenStream) -> CompileResult<Expr> {
  match stream.kind() {
    TokenKind::OpenParen => {
      stream.advance();
      let node = parse_expression(stream)?;
      stream.expect(TokenKind::CloseParen)?;
      Ok(node)
    }
    TokenKind::Id => {
      if stream.peek_next() == TokenKind::OpenParen {
        parse_call(stream)
      } else {
        Ok(Expr::Var(parse_var(stream)?))
      }
    }
    TokenKind::Num => Ok(Expr::number(stream.number()?)),
    _ => Err(stream.unexpected("factor")),
  }
}

/// var => ID | ID '[' expression ']'
fn parse_var(stream: &mut TokenStream) -> CompileResult<VarRef> {
  let name = stream.ident()?;
  let index = if stream.eat(TokenKind::OpenBracket) {
    let index = parse_expression(stream)?;
    stream.expect(TokenKind::CloseBracket)?;
    Some(index)
  } else {
    None
  };
  Ok(VarRef::new(name, index))
}

/// call => ID '(' args ')'
fn parse_call(stream: &mut TokenStream) -> CompileResult<Expr> {
  let name = stream.ident()?;
  stream.expect(TokenKind::OpenParen)?;
  let args = parse_args(stream)?;
  stream.expect(TokenKind::CloseParen)?;
  Ok(Expr::call(name, args))
}

/// args => expression { ',' expression } | empty
fn parse_args(stream: &mut TokenStream) -> CompileResult<Vec<Expr>> {
  if stream.at(TokenKind::CloseParen) {
    return Ok(Vec::new());
  }
  let mut args = vec![parse_expression(stream)?];
  while stream.eat(TokenKind::Comma) {
    args.push(parse_expression(stream)?);
  }
  Ok(args)
}

/// Cursor over the token vector. Backtracking is a saved position restored
/// with `rewind`; the tokens themselves never change.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self { tokens, source, pos: 0 }
  }

  /// The token under the cursor. The vector is always EOF-terminated and
  /// the cursor never moves past that terminal.
  fn peek(&self) -> &Token {
    &self.tokens[self.pos]
  }

  fn kind(&self) -> TokenKind {
    self.peek().kind
  }

  /// One token of extra lookahead, for the call/var split.
  fn peek_next(&self) -> TokenKind {
    match self.tokens.get(self.pos + 1) {
      Some(token) => token.kind,
      None => TokenKind::Eof,
    }
  }

  fn at(&self, kind: TokenKind) -> bool {
    self.kind() == kind
  }

  fn advance(&mut self) {
    if self.peek().kind != TokenKind::Eof {
      self.pos += 1;
    }
  }

  /// Consume the current token if it has the given kind.
  fn eat(&mut self, kind: TokenKind) -> bool {
    if self.at(kind) {
      self.advance();
      true
    } else {
      false
    }
  }

  /// Consume a token of the expected kind or fail with the caret
  /// diagnostic naming both kinds.
  fn expect(&mut self, expected: TokenKind) -> CompileResult<Token> {
    let token = self.peek().clone();
    if token.kind == expected {
      self.advance();
      Ok(token)
    } else {
      Err(CompileError::syntax(
        self.source,
        token.loc,
        format!("expected '{}', got '{}'", expected.name(), token.kind.name()),
      ))
    }
  }

  /// Consume an ID token and return its spelling.
  fn ident(&mut self) -> CompileResult<String> {
    let token = self.expect(TokenKind::Id)?;
    Ok(token_text(&token, self.source).to_string())
  }

  /// Consume a NUM token and materialize its value. A literal too large to
  /// represent is a tree-construction error, not a syntax error.
  fn number(&mut self) -> CompileResult<i64> {
    let token = self.expect(TokenKind::Num)?;
    token.value.ok_or_else(|| {
      CompileError::ast(
        self.source,
        token.loc,
        "integer literal does not fit in a 64-bit word".to_string(),
      )
    })
  }

  fn checkpoint(&self) -> usize {
    self.pos
  }

  fn rewind(&mut self, checkpoint: usize) {
    self.pos = checkpoint;
  }

  fn unexpected(&self, production: &str) -> CompileError {
    let token = self.peek();
    CompileError::syntax(
      self.source,
      token.loc,
      format!("unexpected '{}' in {}", token.kind.name(), production),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tokenizer::tokenize;

  fn program(source: &str) -> Program {
    parse(tokenize(source), source).unwrap()
  }

  fn parse_err(source: &str) -> CompileError {
    parse(tokenize(source), source).unwrap_err()
  }

  fn expr(source: &str) -> Expr {
    let mut stream = TokenStream::new(tokenize(source), source);
    parse_expression(&mut stream).unwrap()
  }

  #[test]
  fn declaration_kind_follows_the_lookahead() {
    let program = program("int x;\nint a[3];\nvoid main(void) { }");
    assert_eq!(program.declarations.len(), 3);
    assert!(matches!(
      &program.declarations[0],
      Declaration::Variable(v) if !v.is_array()
    ));
    assert!(matches!(
      &program.declarations[1],
      Declaration::Variable(v) if v.array_len == Some(3)
    ));
    assert!(matches!(&program.declarations[2], Declaration::Function(_)));
  }

  #[test]
  fn void_params_mean_an_empty_list() {
    let program = program("void main(void) { }");
    let Declaration::Function(main) = &program.declarations[0] else {
      panic!("expected a function");
    };
    assert!(main.params.is_empty());
  }

  #[test]
  fn params_parse_with_array_markers() {
    let program = program("int f(int a, int b[]) { } void main(void) { }");
    let Declaration::Function(f) = &program.declarations[0] else {
      panic!("expected a function");
    };
    assert_eq!(f.params.len(), 2);
    assert!(!f.params[0].array);
    assert!(f.params[1].array);
  }

  #[test]
  fn empty_parens_are_not_a_parameter_list() {
    let err = parse_err("int f() { } void main(void) { }");
    assert!(err.to_string().contains("type_specifier"));
  }

  #[test]
  fn assignment_and_comparison_disambiguate() {
    assert_eq!(expr("x = 1").to_string(), "x = 1");
    assert_eq!(expr("x < 1").to_string(), "(x < 1)");
    assert_eq!(expr("a[i] = 2").to_string(), "a[i] = 2");
    assert_eq!(expr("a[i] < 2").to_string(), "(a[i] < 2)");
  }

  #[test]
  fn nested_indices_survive_the_rewind() {
    assert_eq!(expr("a[b[i]] = 0").to_string(), "a[b[i]] = 0");
    assert_eq!(expr("a[b[i]] + 1").to_string(), "(a[b[i]] + 1)");
  }

  #[test]
  fn assignment_is_right_associative() {
    assert_eq!(expr("x = y = 1").to_string(), "x = y = 1");
  }

  #[test]
  fn additive_and_mul_fold_left() {
    assert_eq!(expr("10 - 3 - 2").to_string(), "((10 - 3) - 2)");
    assert_eq!(expr("8 / 2 / 2").to_string(), "((8 / 2) / 2)");
    assert_eq!(expr("2 + 3 * 4").to_string(), "(2 + (3 * 4))");
    assert_eq!(expr("(2 + 3) * 4").to_string(), "((2 + 3) * 4)");
  }

  #[test]
  fn one_relop_per_simple_expression() {
    assert_eq!(expr("a + 1 < b * 2").to_string(), "((a + 1) < (b * 2))");
    let err = parse_err("void main(void) { x = a < b < c; }");
    assert!(err.to_string().contains("got 'LESS'"));
  }

  #[test]
  fn calls_nest_inside_arithmetic() {
    assert_eq!(expr("1 + f(2)").to_string(), "(1 + f(2))");
    assert_eq!(expr("f()").to_string(), "f()");
    assert_eq!(expr("f(a, b + 1, g(c))").to_string(), "f(a, (b + 1), g(c))");
  }

  #[test]
  fn leading_call_is_the_whole_expression() {
    // Operators cannot continue it; parenthesize to use a call's value
    // in arithmetic.
    let err = parse_err("void main(void) { x = f(1) + 2; }");
    assert!(err.to_string().contains("expected 'SEMI_COL', got 'PLUS'"));
    assert_eq!(
      expr("(f(1)) + 2").to_string(),
      "(f(1) + 2)"
    );
  }

  #[test]
  fn else_binds_to_the_nearest_if() {
    let program = program("void main(void) { if (x) if (y) x = 1; else x = 2; }");
    let Declaration::Function(main) = &program.declarations[0] else {
      panic!("expected a function");
    };
    let Statement::If { then_branch, else_branch, .. } = &main.body.statements[0] else {
      panic!("expected an if");
    };
    assert!(else_branch.is_none());
    assert!(matches!(
      then_branch.as_ref(),
      Statement::If { else_branch: Some(_), .. }
    ));
  }

  #[test]
  fn statements_start_with_a_known_token() {
    // The statement list stops at an unknown token, so inside a compound
    // the brace match reports it; after `else` the statement rule itself
    // does.
    let err = parse_err("void main(void) { + }");
    assert!(err.to_string().contains("expected 'C_BRACE', got 'PLUS'"));
    let err = parse_err("void main(void) { if (x) y = 1; else + }");
    assert!(err.to_string().contains("unexpected 'PLUS' in statement"));
  }

  #[test]
  fn bare_semicolon_is_not_a_statement() {
    let err = parse_err("void main(void) { ; }");
    assert!(err.to_string().contains("expected 'C_BRACE', got 'SEMI_COL'"));
  }

  #[test]
  fn locals_precede_statements() {
    let err = parse_err("void main(void) { x = 1; int y; }");
    // The declaration after a statement falls out of the statement set and
    // fails the closing brace match.
    assert!(err.to_string().contains("expected 'C_BRACE', got 'INT'"));
  }

  #[test]
  fn missing_semicolon_names_both_kinds() {
    let err = parse_err("void main(void) { int y }");
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("expected 'SEMI_COL', got 'C_BRACE'"));
  }

  #[test]
  fn garbled_declaration_reports_the_deciding_token() {
    // A global missing its semicolon never reaches the var_declaration
    // rule; the dispatch rejects it at the token after `type ID`.
    let err = parse_err("int x\nvoid main(void) { }");
    assert!(err.to_string().starts_with("[Error] Line/Col 2:1\n"));
    assert!(err.to_string().contains("unexpected 'VOID' in declaration"));
  }

  #[test]
  fn error_tokens_surface_in_diagnostics() {
    let err = parse_err("int $;");
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("got 'ERROR'"));
  }

  #[test]
  fn empty_input_is_a_syntax_error() {
    let err = parse_err("");
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("END_FILE"));
  }

  #[test]
  fn oversized_array_length_is_a_tree_error() {
    let err = parse_err("int a[99999999999999999999];\nvoid main(void) { }");
    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("does not fit"));
  }

  #[test]
  fn diagnostics_carry_line_and_caret() {
    let err = parse_err("int x;\nint y\nvoid main(void) { }");
    let rendered = err.to_string();
    assert!(rendered.starts_with("[Error] Line/Col 3:1\n"));
    assert!(rendered.contains("\nvoid main(void) { }\n^\n"));
  }

  #[test]
  fn display_round_trips_through_the_parser() {
    let source = "int count;\n\
                  int data[10];\n\
                  int sum(int high) {\n\
                  int i; int total;\n\
                  i = 0;\n\
                  total = 0;\n\
                  while (i < high) {\n\
                  total = total + data[i];\n\
                  i = i + 1;\n\
                  }\n\
                  return total;\n\
                  }\n\
                  void main(void) {\n\
                  count = input();\n\
                  if (count > 10) count = 10;\n\
                  else count = count;\n\
                  data[0] = 1;\n\
                  output(sum(count));\n\
                  }\n";
    let first = program(source);
    let printed = first.to_string();
    let second = parse(tokenize(&printed), &printed).unwrap();
    assert_eq!(first, second);
  }
}
