use std::fmt;

/// The two C-- types. Only `int` describes storable data; `void` is legal
/// solely as a function return type and as the empty parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
  Int,
  Void,
}

impl Type {
  pub fn is_int(self) -> bool {
    matches!(self, Type::Int)
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Type::Int => f.write_str("int"),
      Type::Void => f.write_str("void"),
    }
  }
}
