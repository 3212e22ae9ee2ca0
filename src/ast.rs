//! The abstract syntax tree the parser produces and the later stages walk.
//!
//! Every node kind is its own enum or struct rather than a generic tagged
//! node; shapes that cannot occur do not parse. The `Display` impls
//! re-serialize a tree as compilable source, which the tests use to pin
//! grouping and associativity.

use std::fmt;

use crate::ty::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Lt,
  Le,
  Gt,
  Ge,
  Eq,
  Ne,
}

impl BinaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Lt => "<",
      BinaryOp::Le => "<=",
      BinaryOp::Gt => ">",
      BinaryOp::Ge => ">=",
      BinaryOp::Eq => "==",
      BinaryOp::Ne => "!=",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
  pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
  Variable(VarDecl),
  Function(FunDecl),
}

impl Declaration {
  pub fn name(&self) -> &str {
    match self {
      Declaration::Variable(var) => &var.name,
      Declaration::Function(fun) => &fun.name,
    }
  }
}

/// A variable declaration, global or local. `array_len` keeps the declared
/// length exactly as written; the analyzer rejects non-positive ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDecl {
  pub ty: Type,
  pub name: String,
  pub array_len: Option<i64>,
}

impl VarDecl {
  pub fn is_array(&self) -> bool {
    self.array_len.is_some()
  }
}

/// A function definition. An empty `params` vector is the `(void)` form;
/// the grammar has no bare `()` parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunDecl {
  pub ty: Type,
  pub name: String,
  pub params: Vec<Param>,
  pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
  pub ty: Type,
  pub name: String,
  pub array: bool,
}

/// A compound statement: local declarations first, then statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
  pub locals: Vec<VarDecl>,
  pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
  /// An expression statement, or a bare `;` when `None`.
  Expression(Option<Expr>),
  Compound(Block),
  If {
    condition: Expr,
    then_branch: Box<Statement>,
    else_branch: Option<Box<Statement>>,
  },
  While {
    condition: Expr,
    body: Box<Statement>,
  },
  Return(Option<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
  Num(i64),
  Var(VarRef),
  Call { name: String, args: Vec<Expr> },
  Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
  Assign { target: VarRef, value: Box<Expr> },
}

/// A variable reference, possibly subscripted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
  pub name: String,
  pub index: Option<Box<Expr>>,
}

impl VarRef {
  pub fn new(name: impl Into<String>, index: Option<Expr>) -> Self {
    Self { name: name.into(), index: index.map(Box::new) }
  }
}

impl Expr {
  pub fn number(value: i64) -> Self {
    Expr::Num(value)
  }

  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
    Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
  }

  pub fn assign(target: VarRef, value: Expr) -> Self {
    Expr::Assign { target, value: Box::new(value) }
  }

  pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
    Expr::Call { name: name.into(), args }
  }
}

impl fmt::Display for BinaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.symbol())
  }
}

impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for decl in &self.declarations {
      write!(f, "{decl}")?;
    }
    Ok(())
  }
}

impl fmt::Display for Declaration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Declaration::Variable(var) => write!(f, "{var}"),
      Declaration::Function(fun) => write!(f, "{fun}"),
    }
  }
}

impl fmt::Display for VarDecl {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.array_len {
      Some(len) => writeln!(f, "{} {}[{}];", self.ty, self.name, len),
      None => writeln!(f, "{} {};", self.ty, self.name),
    }
  }
}

impl fmt::Display for FunDecl {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}(", self.ty, self.name)?;
    if self.params.is_empty() {
      write!(f, "void")?;
    } else {
      for (i, param) in self.params.iter().enumerate() {
        if i > 0 {
          write!(f, ", ")?;
        }
        write!(f, "{param}")?;
      }
    }
    write!(f, ") {}", self.body)
  }
}

impl fmt::Display for Param {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.array {
      write!(f, "{} {}[]", self.ty, self.name)
    } else {
      write!(f, "{} {}", self.ty, self.name)
    }
  }
}

impl fmt::Display for Block {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{{")?;
    for local in &self.locals {
      write!(f, "{local}")?;
    }
    for statement in &self.statements {
      write!(f, "{statement}")?;
    }
    writeln!(f, "}}")
  }
}

impl fmt::Display for Statement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Statement::Expression(None) => writeln!(f, ";"),
      Statement::Expression(Some(expr)) => writeln!(f, "{expr};"),
      Statement::Compound(block) => write!(f, "{block}"),
      Statement::If { condition, then_branch, else_branch } => {
        write!(f, "if ({condition}) {then_branch}")?;
        match else_branch {
          Some(else_branch) => write!(f, "else {else_branch}"),
          None => Ok(()),
        }
      }
      Statement::While { condition, body } => {
        write!(f, "while ({condition}) {body}")
      }
      Statement::Return(None) => writeln!(f, "return;"),
      Statement::Return(Some(expr)) => writeln!(f, "return {expr};"),
    }
  }
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Expr::Num(value) => write!(f, "{value}"),
      Expr::Var(var) => write!(f, "{var}"),
      Expr::Call { name, args } => {
        write!(f, "{name}(")?;
        for (i, arg) in args.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{arg}")?;
        }
        write!(f, ")")
      }
      Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
      Expr::Assign { target, value } => write!(f, "{target} = {value}"),
    }
  }
}

impl fmt::Display for VarRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.index {
      Some(index) => write!(f, "{}[{}]", self.name, index),
      None => write!(f, "{}", self.name),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn binary_display_shows_grouping() {
    let expr = Expr::binary(
      BinaryOp::Sub,
      Expr::binary(BinaryOp::Sub, Expr::number(10), Expr::number(3)),
      Expr::number(2),
    );
    assert_eq!(expr.to_string(), "((10 - 3) - 2)");
  }

  #[test]
  fn assignment_display() {
    let expr = Expr::assign(
      VarRef::new("a", Some(Expr::number(0))),
      Expr::call("f", vec![Expr::number(1), Expr::number(2)]),
    );
    assert_eq!(expr.to_string(), "a[0] = f(1, 2)");
  }

  #[test]
  fn statement_display_terminates_with_semicolons() {
    let stmt = Statement::Return(Some(Expr::Var(VarRef::new("x", None))));
    assert_eq!(stmt.to_string(), "return x;\n");
    assert_eq!(Statement::Expression(None).to_string(), ";\n");
  }

  #[test]
  fn function_display_spells_out_void_params() {
    let fun = FunDecl {
      ty: Type::Void,
      name: "main".to_string(),
      params: Vec::new(),
      body: Block { locals: Vec::new(), statements: Vec::new() },
    };
    assert_eq!(fun.to_string(), "void main(void) {\n}\n");
  }
}
