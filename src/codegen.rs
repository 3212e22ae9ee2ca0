//! Code generation: lower the validated AST to MIPS assembly text.
//!
//! The emitter is an accumulator machine: every expression leaves its
//! value in `$a0`, and binary operations spill the left operand to an
//! explicit operand stack below `$sp`. `$t8` and `$t9` hold an address and
//! the word size during element arithmetic; there is no register
//! allocation. `$fp` is the callee's frame base, with the saved `$ra` at
//! offset 0, parameters above it and locals below.

use crate::ast::{
  BinaryOp, Block, Declaration, Expr, FunDecl, Param, Program, Statement, VarDecl, VarRef,
};
use crate::error::{CompileError, CompileResult};
use crate::symtab::{Category, Symbol, SymbolTable};
use crate::visit::{self, Visitor};

/// Emit the whole program. Deterministic: label numbering and section
/// state are fresh on every call.
pub fn generate(program: &Program) -> CompileResult<String> {
  let mut generator = Generator::new();
  generator.visit_program(program)?;
  Ok(generator.asm)
}

struct Generator {
  asm: String,
  scopes: SymbolTable,
  /// Next unallocated number for an if/while label family.
  labels: i64,
  /// False while the `.data` section is open.
  in_code: bool,
  /// Next local slot below `$fp`; restarts at 4 for every compound.
  local_offset: i64,
  /// Frame offset for the next parameter, above `$fp`.
  param_offset: i64,
}

impl Generator {
  fn new() -> Self {
    Self {
      asm: String::new(),
      scopes: SymbolTable::new(),
      labels: 0,
      in_code: true,
      local_offset: 4,
      param_offset: 4,
    }
  }

  /// One instruction line, the mnemonic left-justified in a seven-column
  /// field.
  fn emit(&mut self, mnemonic: &str, operands: &str) {
    if operands.is_empty() {
      self.asm.push_str(&format!("{mnemonic}\n"));
    } else {
      self.asm.push_str(&format!("{mnemonic:<7}{operands}\n"));
    }
  }

  fn label(&mut self, name: &str) {
    self.asm.push_str(&format!("{name}:\n"));
  }

  fn blank(&mut self) {
    self.asm.push('\n');
  }

  /// Claim the next if/while label number before any child emits.
  fn next_label(&mut self) -> i64 {
    let n = self.labels;
    self.labels += 1;
    n
  }

  fn enter_data(&mut self) {
    if self.in_code {
      self.asm.push_str(".data\n");
      self.in_code = false;
    }
  }

  fn enter_text(&mut self) {
    if !self.in_code {
      self.asm.push_str(".text\n");
      self.in_code = true;
    }
  }

  /// Push the accumulator onto the operand stack.
  fn push_acc(&mut self) {
    self.emit("sw", "$a0, 0($sp)");
    self.emit("addiu", "$sp, $sp, -4");
  }

  fn lookup(&self, name: &str) -> CompileResult<Symbol> {
    match self.scopes.lookup(name) {
      Some(symbol) => Ok(symbol.clone()),
      None => Err(CompileError::codegen(format!(
        "no symbol for '{name}' at generation time"
      ))),
    }
  }

  /// `input` reads an integer into the accumulator; `output` prints the
  /// accumulator. Both are leaf routines using the bare syscall protocol.
  fn emit_input_function(&mut self) {
    self.blank();
    self.label("input");
    self.emit("li", "$v0, 5");
    self.emit("syscall", "");
    self.emit("move", "$a0, $v0");
    self.emit("jr", "$ra");
  }

  fn emit_output_function(&mut self) {
    self.blank();
    self.label("output");
    self.emit("li", "$v0, 1");
    self.emit("syscall", "");
    self.emit("jr", "$ra");
  }

  /// Function prologue. `main` also carries the built-ins and the
  /// `.globl` directive; every function starts its frame by anchoring
  /// `$fp` and saving `$ra` at offset 0.
  fn function_entry(&mut self, fun: &FunDecl) {
    self.enter_text();
    if fun.name == "main" {
      self.emit_input_function();
      self.emit_output_function();
      self.blank();
      self.asm.push_str(".globl main\n");
      self.label("main");
    } else {
      self.blank();
      self.label(&fun.name);
    }
    self.emit("move", "$fp, $sp");
    self.emit("sw", "$ra, 0($sp)");
    self.emit("addiu", "$sp, $sp, -4");
    self.blank();
  }

  /// Function epilogue behind the `{name}_exit` label every `return`
  /// jumps to. `main` exits the program instead of returning.
  fn function_exit(&mut self, fun: &FunDecl, symbol: &Symbol) {
    if fun.name == "main" {
      self.blank();
      self.label("main_exit");
      self.emit("li", "$v0, 10");
      self.emit("syscall", "");
    } else {
      self.label(&format!("{}_exit", fun.name));
      self.emit("addiu", &format!("$sp, $sp, {}", symbol.offset));
      self.emit("lw", "$ra, 0($sp)");
      self.emit("addiu", &format!("$sp, $sp, {}", (symbol.len + 1) * 4));
      self.emit("lw", "$fp, 4($sp)");
      self.emit("jr", "$ra");
    }
  }

  /// Scale the evaluated index by the word size; the element offset ends
  /// up in the accumulator.
  fn emit_index(&mut self, var: &VarRef) -> CompileResult<()> {
    let Some(index) = &var.index else {
      return Err(CompileError::codegen(format!(
        "array '{}' referenced without an index",
        var.name
      )));
    };
    self.visit_expr(index)?;
    self.emit("li", "$t9, 4");
    self.emit("mul", "$a0, $a0, $t9");
    Ok(())
  }

  /// Store the accumulator into a variable. The value is pushed around
  /// the address computation; the array paths reload it before the store;
  /// every path drops one operand slot at the end.
  fn emit_store(&mut self, target: &VarRef) -> CompileResult<()> {
    let symbol = self.lookup(&target.name)?;
    self.push_acc();
    match (symbol.local, symbol.category) {
      (false, Category::Scalar) => {
        self.emit("la", &format!("$t8, {}", symbol.name));
        self.emit("sw", "$a0, 0($t8)");
      }
      (false, Category::Array) => {
        self.emit("la", &format!("$t8, {}", symbol.name));
        self.emit_index(target)?;
        self.emit("add", "$t8, $t8, $a0");
        self.emit("lw", "$a0, 4($sp)");
        self.emit("addiu", "$sp, $sp, 4");
        self.emit("sw", "$a0, 0($t8)");
      }
      (true, Category::Scalar) => {
        self.emit("sw", &format!("$a0, {}($fp)", symbol.offset));
      }
      (true, Category::Array) => {
        self.emit("move", "$t8, $fp");
        self.emit("addiu", &format!("$t8, $t8, {}", symbol.offset));
        self.emit_index(target)?;
        self.emit("sub", "$t8, $t8, $a0");
        self.emit("lw", "$a0, 4($sp)");
        self.emit("addiu", "$sp, $sp, 4");
        self.emit("sw", "$a0, 0($t8)");
      }
      _ => {
        return Err(CompileError::codegen(format!(
          "'{}' is not a variable",
          target.name
        )));
      }
    }
    self.emit("addiu", "$sp, $sp, 4");
    Ok(())
  }
}

/// Bytes the epilogue unwinds for body-level locals plus the `$ra` slot.
/// Locals of nested compounds are not counted.
fn local_frame_size(block: &Block) -> i64 {
  let mut total = 4;
  for local in &block.locals {
    total += match local.array_len {
      Some(len) => len * 4,
      None => 4,
    };
  }
  total
}

fn mnemonic(op: BinaryOp) -> &'static str {
  match op {
    BinaryOp::Add => "add",
    BinaryOp::Sub => "sub",
    BinaryOp::Mul => "mul",
    BinaryOp::Div => "div",
    BinaryOp::Lt => "slt",
    BinaryOp::Le => "sle",
    BinaryOp::Gt => "sgt",
    BinaryOp::Ge => "sge",
    BinaryOp::Eq => "seq",
    BinaryOp::Ne => "sne",
  }
}

impl Visitor for Generator {
  fn visit_declaration(&mut self, decl: &Declaration) -> CompileResult<()> {
    match decl {
      Declaration::Variable(var) => {
        let symbol = match var.array_len {
          Some(len) => Symbol::array(&var.name, var.ty, false, 0, len),
          None => Symbol::scalar(&var.name, var.ty, false, 0),
        };
        self.scopes.add(symbol)?;
        self.enter_data();
        let words = var.array_len.unwrap_or(1);
        self.asm.push_str(&format!("{}: .word 0:{}\n", var.name, words));
        Ok(())
      }
      Declaration::Function(fun) => {
        let symbol = Symbol::function(
          &fun.name,
          fun.ty,
          fun.params.len() as i64,
          local_frame_size(&fun.body),
        );
        self.scopes.add(symbol.clone())?;
        self.scopes.enter_scope();
        self.param_offset = 4;
        for param in &fun.params {
          self.visit_param(param)?;
        }
        self.function_entry(fun);
        self.visit_block(&fun.body)?;
        self.function_exit(fun, &symbol);
        self.scopes.exit_scope();
        Ok(())
      }
    }
  }

  fn visit_param(&mut self, param: &Param) -> CompileResult<()> {
    let symbol = if param.array {
      Symbol::array(&param.name, param.ty, true, self.param_offset, 0)
    } else {
      Symbol::scalar(&param.name, param.ty, true, self.param_offset)
    };
    self.param_offset += 4;
    self.scopes.add(symbol)
  }

  fn visit_block(&mut self, block: &Block) -> CompileResult<()> {
    self.local_offset = 4;
    visit::walk_block(self, block)
  }

  fn visit_local(&mut self, decl: &VarDecl) -> CompileResult<()> {
    let offset = -self.local_offset;
    let symbol = match decl.array_len {
      Some(len) => {
        self.local_offset += len * 4;
        self.emit("addiu", &format!("$sp, $sp, -{}", len * 4));
        Symbol::array(&decl.name, decl.ty, true, offset, len)
      }
      None => {
        self.local_offset += 4;
        self.emit("addiu", "$sp, $sp, -4");
        Symbol::scalar(&decl.name, decl.ty, true, offset)
      }
    };
    self.scopes.add(symbol)
  }

  fn visit_statement(&mut self, stmt: &Statement) -> CompileResult<()> {
    match stmt {
      Statement::Expression(expr) => {
        if let Some(expr) = expr {
          self.visit_expr(expr)?;
        }
        Ok(())
      }
      Statement::Compound(block) => self.visit_block(block),
      Statement::If { condition, then_branch, else_branch } => {
        let n = self.next_label();
        self.visit_expr(condition)?;
        self.emit("bne", &format!("$a0, $zero, true_branch{n}"));
        self.label(&format!("false_branch{n}"));
        if let Some(else_branch) = else_branch {
          self.visit_statement(else_branch)?;
        }
        self.emit("b", &format!("end_if{n}"));
        self.label(&format!("true_branch{n}"));
        self.visit_statement(then_branch)?;
        self.label(&format!("end_if{n}"));
        Ok(())
      }
      Statement::While { condition, body } => {
        let n = self.next_label();
        self.label(&format!("while_start{n}"));
        self.visit_expr(condition)?;
        self.emit("beq", &format!("$a0, $zero, while_end{n}"));
        self.visit_statement(body)?;
        self.emit("b", &format!("while_start{n}"));
        self.label(&format!("while_end{n}"));
        Ok(())
      }
      Statement::Return(expr) => {
        let exit_label = match self.scopes.current_function() {
          Some(function) => format!("{}_exit", function.name),
          None => return Err(CompileError::codegen("return outside of a function")),
        };
        if let Some(expr) = expr {
          self.visit_expr(expr)?;
        }
        self.emit("j", &exit_label);
        Ok(())
      }
    }
  }

  fn visit_expr(&mut self, expr: &Expr) -> CompileResult<()> {
    match expr {
      Expr::Num(value) => {
        self.emit("li", &format!("$a0, {value}"));
        Ok(())
      }
      Expr::Var(var) => self.visit_var(var),
      Expr::Call { name, args } => self.visit_call(name, args),
      Expr::Binary { op, lhs, rhs } => {
        self.visit_expr(lhs)?;
        self.push_acc();
        self.visit_expr(rhs)?;
        self.emit("lw", "$t1, 4($sp)");
        self.emit(mnemonic(*op), "$a0, $t1, $a0");
        self.emit("addiu", "$sp, $sp, 4");
        Ok(())
      }
      Expr::Assign { target, value } => {
        self.visit_expr(value)?;
        self.emit_store(target)
      }
    }
  }

  /// Load a variable into the accumulator. Globals are addressed through
  /// their label, locals relative to `$fp`; array elements grow upward
  /// from a global's base and downward from a local's.
  fn visit_var(&mut self, var: &VarRef) -> CompileResult<()> {
    let symbol = self.lookup(&var.name)?;
    match (symbol.local, symbol.category) {
      (false, Category::Scalar) => {
        self.emit("la", &format!("$t8, {}", symbol.name));
        self.emit("lw", "$a0, 0($t8)");
        Ok(())
      }
      (false, Category::Array) => {
        self.emit("la", &format!("$t8, {}", symbol.name));
        self.emit_index(var)?;
        self.emit("add", "$t8, $t8, $a0");
        self.emit("lw", "$a0, 0($t8)");
        Ok(())
      }
      (true, Category::Scalar) => {
        self.emit("lw", &format!("$a0, {}($fp)", symbol.offset));
        Ok(())
      }
      (true, Category::Array) => {
        self.emit("move", "$t8, $fp");
        self.emit("addiu", &format!("$t8, $t8, {}", symbol.offset));
        self.emit_index(var)?;
        self.emit("sub", "$t8, $t8, $a0");
        self.emit("lw", "$a0, 0($t8)");
        Ok(())
      }
      _ => Err(CompileError::codegen(format!(
        "'{}' is not a variable",
        var.name
      ))),
    }
  }

  /// Call protocol: save the caller's `$fp`, push the arguments in
  /// reverse so the first parameter lands at `$fp+4` in the callee, then
  /// jump. The built-ins take their argument in the accumulator and save
  /// nothing.
  fn visit_call(&mut self, name: &str, args: &[Expr]) -> CompileResult<()> {
    if name == "input" || name == "output" {
      for arg in args {
        self.visit_expr(arg)?;
      }
      self.emit("jal", name);
      return Ok(());
    }
    self.emit("sw", "$fp, 0($sp)");
    self.emit("addiu", "$sp, $sp, -4");
    for arg in args.iter().rev() {
      self.visit_expr(arg)?;
      self.push_acc();
    }
    self.emit("jal", name);
    Ok(())
  }
}
