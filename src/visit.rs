//! A fallible visitor over the AST.
//!
//! The `walk_*` functions own the canonical child order; a visitor
//! overrides only the hooks it cares about and calls back into the walk
//! to descend. Both the analyzer and the code generator are visitors, so
//! the tree is traversed in the same order in every stage.

use crate::ast::{Block, Declaration, Expr, FunDecl, Param, Program, Statement, VarDecl, VarRef};
use crate::error::CompileResult;

pub trait Visitor: Sized {
  fn visit_program(&mut self, program: &Program) -> CompileResult<()> {
    walk_program(self, program)
  }

  fn visit_declaration(&mut self, decl: &Declaration) -> CompileResult<()> {
    walk_declaration(self, decl)
  }

  fn visit_param(&mut self, _param: &Param) -> CompileResult<()> {
    Ok(())
  }

  fn visit_block(&mut self, block: &Block) -> CompileResult<()> {
    walk_block(self, block)
  }

  fn visit_local(&mut self, _decl: &VarDecl) -> CompileResult<()> {
    Ok(())
  }

  fn visit_statement(&mut self, stmt: &Statement) -> CompileResult<()> {
    walk_statement(self, stmt)
  }

  fn visit_expr(&mut self, expr: &Expr) -> CompileResult<()> {
    walk_expr(self, expr)
  }

  fn visit_var(&mut self, var: &VarRef) -> CompileResult<()> {
    walk_var(self, var)
  }

  fn visit_call(&mut self, _name: &str, args: &[Expr]) -> CompileResult<()> {
    walk_call(self, args)
  }
}

pub fn walk_program<V: Visitor>(v: &mut V, program: &Program) -> CompileResult<()> {
  for decl in &program.declarations {
    v.visit_declaration(decl)?;
  }
  Ok(())
}

pub fn walk_declaration<V: Visitor>(v: &mut V, decl: &Declaration) -> CompileResult<()> {
  match decl {
    Declaration::Variable(_) => Ok(()),
    Declaration::Function(fun) => walk_function(v, fun),
  }
}

/// Parameters first, then the body block.
pub fn walk_function<V: Visitor>(v: &mut V, fun: &FunDecl) -> CompileResult<()> {
  for param in &fun.params {
    v.visit_param(param)?;
  }
  v.visit_block(&fun.body)
}

/// Locals first, then statements, mirroring the compound grammar.
pub fn walk_block<V: Visitor>(v: &mut V, block: &Block) -> CompileResult<()> {
  for local in &block.locals {
    v.visit_local(local)?;
  }
  for statement in &block.statements {
    v.visit_statement(statement)?;
  }
  Ok(())
}

pub fn walk_statement<V: Visitor>(v: &mut V, stmt: &Statement) -> CompileResult<()> {
  match stmt {
    Statement::Expression(expr) => {
      if let Some(expr) = expr {
        v.visit_expr(expr)?;
      }
      Ok(())
    }
    Statement::Compound(block) => v.visit_block(block),
    Statement::If { condition, then_branch, else_branch } => {
      v.visit_expr(condition)?;
      v.visit_statement(then_branch)?;
      if let Some(else_branch) = else_branch {
        v.visit_statement(else_branch)?;
      }
      Ok(())
    }
    Statement::While { condition, body } => {
      v.visit_expr(condition)?;
      v.visit_statement(body)
    }
    Statement::Return(expr) => {
      if let Some(expr) = expr {
        v.visit_expr(expr)?;
      }
      Ok(())
    }
  }
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Expr) -> CompileResult<()> {
  match expr {
    Expr::Num(_) => Ok(()),
    Expr::Var(var) => v.visit_var(var),
    Expr::Call { name, args } => v.visit_call(name, args),
    Expr::Binary { lhs, rhs, .. } => {
      v.visit_expr(lhs)?;
      v.visit_expr(rhs)
    }
    Expr::Assign { target, value } => {
      v.visit_var(target)?;
      v.visit_expr(value)
    }
  }
}

pub fn walk_var<V: Visitor>(v: &mut V, var: &VarRef) -> CompileResult<()> {
  if let Some(index) = &var.index {
    v.visit_expr(index)?;
  }
  Ok(())
}

pub fn walk_call<V: Visitor>(v: &mut V, args: &[Expr]) -> CompileResult<()> {
  for arg in args {
    v.visit_expr(arg)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::{BinaryOp, VarRef};

  /// Records the order nodes are seen in, to pin the canonical walk.
  struct Recorder {
    events: Vec<String>,
  }

  impl Visitor for Recorder {
    fn visit_var(&mut self, var: &VarRef) -> CompileResult<()> {
      self.events.push(format!("var {}", var.name));
      walk_var(self, var)
    }

    fn visit_call(&mut self, name: &str, args: &[Expr]) -> CompileResult<()> {
      self.events.push(format!("call {name}"));
      walk_call(self, args)
    }

    fn visit_expr(&mut self, expr: &Expr) -> CompileResult<()> {
      if let Expr::Num(value) = expr {
        self.events.push(format!("num {value}"));
      }
      walk_expr(self, expr)
    }
  }

  #[test]
  fn walks_assignment_target_before_value() {
    let expr = Expr::assign(
      VarRef::new("x", None),
      Expr::binary(BinaryOp::Add, Expr::number(1), Expr::call("f", vec![Expr::number(2)])),
    );
    let mut recorder = Recorder { events: Vec::new() };
    recorder.visit_expr(&expr).unwrap();
    assert_eq!(recorder.events, vec!["var x", "num 1", "call f", "num 2"]);
  }

  #[test]
  fn walks_index_expressions() {
    let expr = Expr::Var(VarRef::new("a", Some(Expr::Var(VarRef::new("i", None)))));
    let mut recorder = Recorder { events: Vec::new() };
    recorder.visit_expr(&expr).unwrap();
    assert_eq!(recorder.events, vec!["var a", "var i"]);
  }
}
