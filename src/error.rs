use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// Every way a compilation can fail, one variant per failing stage. The
/// driver maps these onto process exit codes with [`CompileError::exit_code`].
#[derive(Debug, Snafu)]
pub enum CompileError {
  /// The parser met a token the grammar does not allow here. Rendered with
  /// the offending source line and a caret under the column.
  #[snafu(display("[Error] Line/Col {line}:{col}\n\n{line_text}\n{marker}\n\n{message}"))]
  Syntax { line: usize, col: usize, line_text: String, marker: String, message: String },

  /// A syntactically valid token could not be turned into a tree node,
  /// such as an integer literal too large for a 64-bit word.
  #[snafu(display("[Error] Line/Col {line}:{col}\n\n{line_text}\n{marker}\n\n{message}"))]
  Ast { line: usize, col: usize, line_text: String, marker: String, message: String },

  #[snafu(display("Error: function '{name}' called but not defined"))]
  UndeclaredFunction { name: String },

  #[snafu(display("Error: id '{name}' used but not declared"))]
  UndeclaredId { name: String },

  #[snafu(display("Error: variable '{name}' already defined"))]
  Redeclared { name: String },

  #[snafu(display("Error: array length {len} illegal for variable '{name}'"))]
  IllegalArrayLength { name: String, len: i64 },

  #[snafu(display("Error: variable '{name}' must be of type int"))]
  NonIntVariable { name: String },

  #[snafu(display("Error: parameter '{name}' must be of type int"))]
  NonIntParameter { name: String },

  #[snafu(display("Error: last declaration must be 'void main(void)'"))]
  MalformedMain,

  #[snafu(display("Error: program has no declarations"))]
  EmptyProgram,

  /// An invariant the analyzer is supposed to guarantee did not hold by
  /// the time code generation looked.
  #[snafu(display("Error: {message}"))]
  Codegen { message: String },
}

impl CompileError {
  /// Syntax error anchored at a byte offset of the source.
  pub fn syntax(source: &str, loc: usize, message: String) -> Self {
    let (line, col, line_text) = locate(source, loc);
    CompileError::Syntax { line, col, line_text, marker: marker(col), message }
  }

  /// Tree-construction error anchored at a byte offset of the source.
  pub fn ast(source: &str, loc: usize, message: String) -> Self {
    let (line, col, line_text) = locate(source, loc);
    CompileError::Ast { line, col, line_text, marker: marker(col), message }
  }

  pub fn codegen(message: impl Into<String>) -> Self {
    CompileError::Codegen { message: message.into() }
  }

  /// The process exit code the driver reports for this error class.
  /// 1 is reserved for argument and I/O failures in the driver itself.
  pub fn exit_code(&self) -> i32 {
    match self {
      CompileError::Syntax { .. } => 2,
      CompileError::Ast { .. } => 3,
      CompileError::Codegen { .. } => 5,
      _ => 4,
    }
  }
}

/// Map a byte offset to a 1-based line and column plus the full text of
/// that line, for the caret rendering.
fn locate(source: &str, loc: usize) -> (usize, usize, String) {
  let mut line = 1;
  let mut line_start = 0;
  for (i, b) in source.bytes().enumerate().take(loc) {
    if b == b'\n' {
      line += 1;
      line_start = i + 1;
    }
  }
  let rest = &source[line_start..];
  let line_text = match rest.find('\n') {
    Some(end) => &rest[..end],
    None => rest,
  };
  (line, loc - line_start + 1, line_text.to_string())
}

fn marker(col: usize) -> String {
  let mut marker = " ".repeat(col - 1);
  marker.push('^');
  marker
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn locates_across_lines() {
    let source = "int x;\nint y;\nvoid main(void) { }\n";
    let (line, col, text) = locate(source, source.find('y').unwrap());
    assert_eq!(line, 2);
    assert_eq!(col, 5);
    assert_eq!(text, "int y;");
  }

  #[test]
  fn locates_start_of_source() {
    let (line, col, text) = locate("int x;", 0);
    assert_eq!((line, col), (1, 1));
    assert_eq!(text, "int x;");
  }

  #[test]
  fn caret_sits_under_the_column() {
    let err = CompileError::syntax("x = ;", 4, "unexpected ';'".to_string());
    let rendered = err.to_string();
    assert!(rendered.starts_with("[Error] Line/Col 1:5\n"));
    assert!(rendered.contains("\nx = ;\n    ^\n"));
  }

  #[test]
  fn exit_codes_by_stage() {
    let syntax = CompileError::syntax("x", 0, String::new());
    let ast = CompileError::ast("x", 0, String::new());
    let semantic = CompileError::UndeclaredId { name: "x".to_string() };
    let codegen = CompileError::codegen("stack mismatch");
    assert_eq!(syntax.exit_code(), 2);
    assert_eq!(ast.exit_code(), 3);
    assert_eq!(semantic.exit_code(), 4);
    assert_eq!(codegen.exit_code(), 5);
  }

  #[test]
  fn semantic_messages_name_the_offender() {
    let err = CompileError::UndeclaredFunction { name: "gcd".to_string() };
    assert_eq!(err.to_string(), "Error: function 'gcd' called but not defined");
    let err = CompileError::IllegalArrayLength { name: "a".to_string(), len: 0 };
    assert_eq!(err.to_string(), "Error: array length 0 illegal for variable 'a'");
  }
}
