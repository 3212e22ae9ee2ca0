//! Semantic analysis: scope construction and the static well-formedness
//! rules, run between parsing and code generation.
//!
//! The analyzer is a visitor over the immutable AST; all of its state is
//! the scope stack. Calls and variable uses resolve by name only, so a
//! name declared as anything satisfies a use of any shape.

use crate::ast::{Declaration, Expr, Param, Program, VarDecl, VarRef};
use crate::error::{CompileError, CompileResult};
use crate::symtab::{Symbol, SymbolTable};
use crate::ty::Type;
use crate::visit::{self, Visitor};

const RESERVED_WORDS: [&str; 6] = ["else", "int", "return", "void", "while", "if"];

/// Validate the program: every rule violated reports the first offender.
pub fn analyze(program: &Program) -> CompileResult<()> {
  let mut analyzer = Analyzer { scopes: SymbolTable::new() };
  analyzer.install_builtins()?;
  analyzer.visit_program(program)
}

struct Analyzer {
  scopes: SymbolTable,
}

impl Analyzer {
  /// Pre-populate the root scope: the reserved words occupy their names,
  /// and the two built-in functions become callable.
  fn install_builtins(&mut self) -> CompileResult<()> {
    for word in RESERVED_WORDS {
      self.scopes.add(Symbol::reserved(word))?;
    }
    self.scopes.add(Symbol::function("input", Type::Int, 0, 0))?;
    self.scopes.add(Symbol::function("output", Type::Int, 1, 0))?;
    Ok(())
  }

  /// Rules shared by globals and locals: a declared array length must be
  /// positive, storable data must be `int`, and the name must be new in
  /// the current scope.
  fn declare_variable(&mut self, decl: &VarDecl) -> CompileResult<()> {
    if let Some(len) = decl.array_len
      && len <= 0
    {
      return Err(CompileError::IllegalArrayLength { name: decl.name.clone(), len });
    }
    if decl.ty != Type::Int {
      return Err(CompileError::NonIntVariable { name: decl.name.clone() });
    }
    let symbol = match decl.array_len {
      Some(len) => Symbol::array(&decl.name, decl.ty, false, 0, len),
      None => Symbol::scalar(&decl.name, decl.ty, false, 0),
    };
    self.scopes.add(symbol)
  }
}

fn is_void_main(decl: &Declaration) -> bool {
  match decl {
    Declaration::Function(fun) => {
      fun.name == "main" && fun.ty == Type::Void && fun.params.is_empty()
    }
    Declaration::Variable(_) => false,
  }
}

impl Visitor for Analyzer {
  fn visit_program(&mut self, program: &Program) -> CompileResult<()> {
    if program.declarations.is_empty() {
      return Err(CompileError::EmptyProgram);
    }
    let last = program.declarations.len() - 1;
    for (i, decl) in program.declarations.iter().enumerate() {
      if i == last && !is_void_main(decl) {
        return Err(CompileError::MalformedMain);
      }
      self.visit_declaration(decl)?;
    }
    Ok(())
  }

  fn visit_declaration(&mut self, decl: &Declaration) -> CompileResult<()> {
    match decl {
      Declaration::Variable(var) => self.declare_variable(var),
      Declaration::Function(fun) => {
        // The function's own name goes into the enclosing scope first, so
        // recursive calls inside the body resolve.
        self
          .scopes
          .add(Symbol::function(&fun.name, fun.ty, fun.params.len() as i64, 0))?;
        self.scopes.enter_scope();
        let result = visit::walk_function(self, fun);
        self.scopes.exit_scope();
        result
      }
    }
  }

  fn visit_param(&mut self, param: &Param) -> CompileResult<()> {
    if param.ty != Type::Int {
      return Err(CompileError::NonIntParameter { name: param.name.clone() });
    }
    let symbol = if param.array {
      Symbol::array(&param.name, param.ty, true, 0, 0)
    } else {
      Symbol::scalar(&param.name, param.ty, true, 0)
    };
    self.scopes.add(symbol)
  }

  fn visit_local(&mut self, decl: &VarDecl) -> CompileResult<()> {
    self.declare_variable(decl)
  }

  fn visit_var(&mut self, var: &VarRef) -> CompileResult<()> {
    if !self.scopes.contains(&var.name) {
      return Err(CompileError::UndeclaredId { name: var.name.clone() });
    }
    visit::walk_var(self, var)
  }

  fn visit_call(&mut self, name: &str, args: &[Expr]) -> CompileResult<()> {
    if !self.scopes.contains(name) {
      return Err(CompileError::UndeclaredFunction { name: name.to_string() });
    }
    visit::walk_call(self, args)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse;
  use crate::tokenizer::tokenize;

  fn analyze_source(source: &str) -> CompileResult<()> {
    analyze(&parse(tokenize(source), source).unwrap())
  }

  #[test]
  fn accepts_a_well_formed_program() {
    let source = "int x;\n\
                  int data[4];\n\
                  int twice(int n) { return n + n; }\n\
                  void main(void) {\n\
                  x = input();\n\
                  data[0] = twice(x);\n\
                  output(data[0]);\n\
                  }\n";
    assert!(analyze_source(source).is_ok());
  }

  #[test]
  fn last_declaration_must_be_void_main() {
    let err = analyze_source("void main(void) { } int x;").unwrap_err();
    assert!(matches!(err, CompileError::MalformedMain));
    let err = analyze_source("int main(void) { return 0; }").unwrap_err();
    assert!(matches!(err, CompileError::MalformedMain));
    let err = analyze_source("void main(int x) { }").unwrap_err();
    assert!(matches!(err, CompileError::MalformedMain));
    assert_eq!(err.exit_code(), 4);
  }

  #[test]
  fn empty_program_is_rejected() {
    // Unreachable through the parser, which demands one declaration, but
    // the rule holds for a directly built tree.
    let err = analyze(&Program { declarations: Vec::new() }).unwrap_err();
    assert!(matches!(err, CompileError::EmptyProgram));
  }

  #[test]
  fn array_length_must_be_positive() {
    let err = analyze_source("int a[0];\nvoid main(void) { }").unwrap_err();
    assert!(matches!(err, CompileError::IllegalArrayLength { len: 0, .. }));
    assert!(analyze_source("int a[1];\nvoid main(void) { }").is_ok());
    // The length rule fires before the type rule.
    let err = analyze_source("void a[0];\nvoid main(void) { }").unwrap_err();
    assert!(matches!(err, CompileError::IllegalArrayLength { len: 0, .. }));
  }

  #[test]
  fn variables_and_params_must_be_int() {
    let err = analyze_source("void x;\nvoid main(void) { }").unwrap_err();
    assert!(matches!(err, CompileError::NonIntVariable { .. }));
    let err = analyze_source("int f(void n) { return 0; } void main(void) { }").unwrap_err();
    assert!(matches!(err, CompileError::NonIntParameter { .. }));
    let err = analyze_source("void main(void) { void y; }").unwrap_err();
    assert!(matches!(err, CompileError::NonIntVariable { .. }));
  }

  #[test]
  fn redeclaration_in_one_scope_fails() {
    let err = analyze_source("int x;\nint x;\nvoid main(void) { }").unwrap_err();
    assert!(matches!(err, CompileError::Redeclared { .. }));
    // Parameters and body locals share one scope, so both collisions hit
    // the same rule.
    let err =
      analyze_source("int f(int a, int a) { return 0; } void main(void) { }").unwrap_err();
    assert!(matches!(err, CompileError::Redeclared { .. }));
    let err =
      analyze_source("int f(int a) { int a; return 0; } void main(void) { }").unwrap_err();
    assert!(matches!(err, CompileError::Redeclared { .. }));
  }

  #[test]
  fn locals_may_shadow_globals() {
    let source = "int x;\nvoid main(void) { int x; x = 1; }";
    assert!(analyze_source(source).is_ok());
  }

  #[test]
  fn nested_compound_locals_share_the_function_scope() {
    // A compound inside a function body does not open a scope of its own,
    // so an inner redeclaration collides while distinct names coexist.
    let err = analyze_source("void main(void) { int x; { int x; } }").unwrap_err();
    assert!(matches!(err, CompileError::Redeclared { .. }));
    assert!(analyze_source("void main(void) { int x; { int y; y = x; } }").is_ok());
  }

  #[test]
  fn undeclared_uses_are_reported() {
    let err = analyze_source("void main(void) { x = 1; }").unwrap_err();
    assert!(matches!(err, CompileError::UndeclaredId { .. }));
    let err = analyze_source("void main(void) { int x; x = f(); }").unwrap_err();
    assert!(matches!(err, CompileError::UndeclaredFunction { .. }));
  }

  #[test]
  fn index_expressions_are_checked() {
    let err = analyze_source("int a[3];\nvoid main(void) { a[i] = 1; }").unwrap_err();
    assert!(matches!(err, CompileError::UndeclaredId { name } if name == "i"));
  }

  #[test]
  fn argument_expressions_are_checked() {
    let err = analyze_source("void main(void) { output(y); }").unwrap_err();
    assert!(matches!(err, CompileError::UndeclaredId { name } if name == "y"));
  }

  #[test]
  fn recursive_calls_resolve() {
    let source = "int fact(int n) {\n\
                  if (n <= 1) return 1;\n\
                  else return n * fact(n - 1);\n\
                  }\n\
                  void main(void) { output(fact(5)); }\n";
    assert!(analyze_source(source).is_ok());
  }

  #[test]
  fn calls_resolve_by_name_alone() {
    // A variable name satisfies a call and a function name satisfies a
    // variable use; shape mismatches surface later, in generation.
    assert!(analyze_source("int x;\nvoid main(void) { x(); }").is_ok());
    assert!(analyze_source("int f(void) { return 1; } void main(void) { f = 2; }").is_ok());
  }

  #[test]
  fn locals_are_not_visible_across_functions() {
    let source = "int f(void) { int a; a = 1; return a; }\n\
                  void main(void) { a = 2; }";
    let err = analyze_source(source).unwrap_err();
    assert!(matches!(err, CompileError::UndeclaredId { name } if name == "a"));
  }
}
