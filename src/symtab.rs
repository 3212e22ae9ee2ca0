//! The scoped symbol table shared by the analyzer and the code generator.
//!
//! A stack of frames. The root frame holds globals (and, in the analyzer,
//! the reserved words and built-ins); each function pushes a frame on
//! entry and pops it on exit. Compounds nested in a body share the
//! function's frame.

use crate::error::{CompileError, CompileResult};
use crate::ty::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
  /// A reserved word. Occupies its name so user code cannot, but is
  /// invisible to ordinary lookup.
  Reserved,
  Scalar,
  Array,
  Function,
}

/// One named entity. `offset` is the frame offset of a local or parameter,
/// and on a function the byte count its epilogue unwinds for body-level
/// locals. `len` is an array's declared length, and on a function its
/// parameter count.
#[derive(Debug, Clone)]
pub struct Symbol {
  pub name: String,
  pub category: Category,
  pub ty: Type,
  pub local: bool,
  pub offset: i64,
  pub len: i64,
}

impl Symbol {
  pub fn reserved(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      category: Category::Reserved,
      ty: Type::Void,
      local: false,
      offset: 0,
      len: 0,
    }
  }

  pub fn scalar(name: impl Into<String>, ty: Type, local: bool, offset: i64) -> Self {
    Self { name: name.into(), category: Category::Scalar, ty, local, offset, len: 0 }
  }

  pub fn array(name: impl Into<String>, ty: Type, local: bool, offset: i64, len: i64) -> Self {
    Self { name: name.into(), category: Category::Array, ty, local, offset, len }
  }

  pub fn function(name: impl Into<String>, ty: Type, params: i64, frame: i64) -> Self {
    Self {
      name: name.into(),
      category: Category::Function,
      ty,
      local: false,
      offset: frame,
      len: params,
    }
  }
}

#[derive(Debug, Default)]
struct Frame {
  symbols: Vec<Symbol>,
}

#[derive(Debug)]
pub struct SymbolTable {
  frames: Vec<Frame>,
}

impl SymbolTable {
  /// A table with the root scope already open.
  pub fn new() -> Self {
    Self { frames: vec![Frame::default()] }
  }

  pub fn enter_scope(&mut self) {
    self.frames.push(Frame::default());
  }

  /// Pop the innermost scope. The root scope stays.
  pub fn exit_scope(&mut self) {
    if self.frames.len() > 1 {
      self.frames.pop();
    }
  }

  /// Add a symbol to the innermost scope. A name already present in that
  /// scope is a redeclaration; outer scopes may be shadowed freely.
  pub fn add(&mut self, symbol: Symbol) -> CompileResult<()> {
    let frame = match self.frames.last_mut() {
      Some(frame) => frame,
      None => unreachable!("the root scope is never popped"),
    };
    if frame.symbols.iter().any(|s| s.name == symbol.name) {
      return Err(CompileError::Redeclared { name: symbol.name });
    }
    frame.symbols.push(symbol);
    Ok(())
  }

  /// The nearest visible symbol with this name, skipping reserved words.
  pub fn lookup(&self, name: &str) -> Option<&Symbol> {
    self
      .frames
      .iter()
      .rev()
      .flat_map(|frame| frame.symbols.iter().rev())
      .find(|s| s.name == name && s.category != Category::Reserved)
  }

  /// Whether any scope knows this name, reserved words included.
  pub fn contains(&self, name: &str) -> bool {
    self
      .frames
      .iter()
      .any(|frame| frame.symbols.iter().any(|s| s.name == name))
  }

  /// The function whose scope the cursor is currently inside: the most
  /// recently added `Function` symbol.
  pub fn current_function(&self) -> Option<&Symbol> {
    self
      .frames
      .iter()
      .rev()
      .flat_map(|frame| frame.symbols.iter().rev())
      .find(|s| s.category == Category::Function)
  }
}
