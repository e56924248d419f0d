//! CLI host: reads a script path, runs it through the interpreter, and maps
//! the result to a process exit code. Everything interesting
//! lives in the `rulox` library; this binary is a thin driver around it.

use std::io;
use std::process::ExitCode;

const USAGE_EXIT: u8 = 64;

fn main() -> ExitCode {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "rulox".to_string());

    let path = match (args.next(), args.next()) {
        (Some(path), None) => path,
        _ => {
            eprintln!("Usage: {program} <path>");
            return ExitCode::from(USAGE_EXIT);
        }
    };

    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read file \"{path}\": {err}");
            return ExitCode::from(74); // EX_IOERR
        }
    };

    let mut stdout = io::stdout();
    let result = rulox::run(&source, &mut stdout);
    ExitCode::from(result.exit_code() as u8)
}
