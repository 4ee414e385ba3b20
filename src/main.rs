use std::fs::File;
use std::io::prelude::*;
use std::io::{stderr, stdout, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use monkey::interpreter::{load_prelude, Interpreter, Value};
use monkey::reporter::WriteReporter;

const EX_USAGE: u8 = 64;
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;

/// Interpreter for the Monkey programming language
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Script to run. Starts an interactive session when omitted
    script: Option<PathBuf>,

    /// Evaluate this source instead of a script
    #[arg(short, long, conflicts_with = "script")]
    eval: Option<String>,

    /// Print the final value of the script
    #[arg(short, long)]
    print_result: bool,

    /// Source file evaluated first. Its bindings are visible to the script and the session
    #[arg(long, env = "MONKEY_PRELUDE")]
    prelude: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    install_tracing();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            // --help and --version land here too
            _ = error.print();
            return Ok(if error.use_stderr() {
                ExitCode::from(EX_USAGE)
            } else {
                ExitCode::SUCCESS
            });
        }
    };

    let mut interpreter = Interpreter::new();
    if let Some(prelude) = &args.prelude {
        load_prelude(&mut interpreter, prelude)?;
    }

    if let Some(code) = &args.eval {
        Ok(run(&mut interpreter, code, args.print_result))
    } else if let Some(script_path) = &args.script {
        let mut file = File::open(script_path).context("Unable to open script file")?;
        let mut script = String::new();
        file.read_to_string(&mut script)
            .context("Unable to read script file")?;
        Ok(run(&mut interpreter, &script, args.print_result))
    } else {
        run_prompt(&mut interpreter)?;
        Ok(ExitCode::SUCCESS)
    }
}

fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(stderr)
        .try_init();
}

fn run_prompt(interpreter: &mut Interpreter) -> Result<()> {
    let stdin = std::io::stdin().lock();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();
    loop {
        {
            let mut stdout = stdout().lock();
            stdout.write_all(">> ".as_bytes())?;
            stdout.flush()?;
        }
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            break;
        }
        run(interpreter, &line, true);
        // Don't keep appending code until the next time
        line.clear();
    }
    Ok(())
}

fn run(interpreter: &mut Interpreter, code: &str, print_result: bool) -> ExitCode {
    match interpreter.eval_source(code) {
        Ok(Some(Value::Error(error))) => {
            eprintln!("ERROR: {}", error);
            ExitCode::from(EX_SOFTWARE)
        }
        Ok(Some(Value::Null)) | Ok(None) => ExitCode::SUCCESS,
        Ok(Some(value)) => {
            if print_result {
                println!("{}", value);
            }
            ExitCode::SUCCESS
        }
        Err(errors) => {
            let mut stderr = stderr().lock();
            let mut reporter = WriteReporter::new(&mut stderr);
            errors.report_to(&mut reporter);
            ExitCode::from(EX_DATAERR)
        }
    }
}
