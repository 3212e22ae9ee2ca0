use std::env;
use std::fs;
use std::process;

use rcmm::compile;

const DEFAULT_OUTPUT: &str = "a.out";

fn main() {
  let args: Vec<String> = env::args().collect();
  let (input_path, output_path) = match parse_args(&args) {
    Some(paths) => paths,
    None => {
      let program = args.first().map(String::as_str).unwrap_or("rcmm");
      eprintln!("usage: {program} <file> [-o <output>]");
      process::exit(1);
    }
  };

  let source = match fs::read_to_string(input_path) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("{input_path}: {err}");
      process::exit(1);
    }
  };

  match compile(&source) {
    Ok(asm) => {
      if let Err(err) = fs::write(output_path, asm) {
        eprintln!("{output_path}: {err}");
        process::exit(1);
      }
    }
    Err(err) => {
      eprintln!("{err}");
      process::exit(err.exit_code());
    }
  }
}

/// `rcmm <file>` writes to `a.out`; `rcmm <file> -o <output>` picks the
/// destination. Anything else is a usage error.
fn parse_args(args: &[String]) -> Option<(&str, &str)> {
  match args {
    [_, input] => Some((input.as_str(), DEFAULT_OUTPUT)),
    [_, input, flag, output] if flag == "-o" => Some((input.as_str(), output.as_str())),
    _ => None,
  }
}
