use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Instant;

use jonathan::{
    eval_program, run_repl, run_source, Compiler, Engine, EngineError, Environment, Parser, Vm,
};

/// The reference program for the engine benchmark.
const BENCHMARK_SOURCE: &str = "
let fibonacci = fn(x) {
    if (x == 0) {
        0
    } else {
        if (x == 1) {
            return 1;
        } else {
            fibonacci(x - 1) + fibonacci(x - 2);
        }
    }
};
fibonacci(35);
";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => {
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            match run_repl(stdin.lock(), &mut stdout) {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("error: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        Some(flag) if flag == "-engine" || flag.starts_with("-engine=") => {
            let value = match flag.strip_prefix("-engine=") {
                Some(value) => value,
                None => match args.get(1) {
                    Some(value) => value.as_str(),
                    None => {
                        eprintln!("error: -engine requires a value, use 'vm' or 'eval'");
                        return ExitCode::FAILURE;
                    }
                },
            };
            let Ok(engine) = value.parse::<Engine>() else {
                eprintln!("error: unknown engine '{value}', use 'vm' or 'eval'");
                return ExitCode::FAILURE;
            };
            benchmark(engine)
        }
        Some(path) => run_file(path),
    }
}

/// Runs the fibonacci reference program under the chosen engine. Parsing
/// and compilation happen outside the timed region, so the two engines
/// compare on raw run speed.
fn benchmark(engine: Engine) -> ExitCode {
    let mut parser = Parser::from_source(BENCHMARK_SOURCE);
    let program = parser.parse_program();
    if !parser.errors().is_empty() {
        eprintln!("error: {}", parser.errors().join("\n"));
        return ExitCode::FAILURE;
    }
    let mut stdout = io::stdout();

    let (result, duration) = match engine {
        Engine::Vm => {
            let bytecode = match Compiler::new().compile(&program) {
                Ok(bytecode) => bytecode,
                Err(err) => {
                    eprintln!("compiler error: {err}");
                    return ExitCode::FAILURE;
                }
            };
            let mut vm = Vm::new(bytecode, &mut stdout);
            let start = Instant::now();
            if let Err(err) = vm.run() {
                eprintln!("vm error: {err}");
                return ExitCode::FAILURE;
            }
            (vm.last_popped().clone(), start.elapsed())
        }
        Engine::Eval => {
            let env = Environment::new();
            let start = Instant::now();
            match eval_program(&program, &env, &mut stdout) {
                Ok(result) => (result, start.elapsed()),
                Err(err) => {
                    eprintln!("evaluator error: {err}");
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    println!(
        "engine={engine}, result={}, duration={duration:?}",
        result.inspect()
    );
    ExitCode::SUCCESS
}

/// Runs a script file under the VM and prints the program's value.
fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error reading {path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut stdout = io::stdout();
    match run_source(&source, Engine::Vm, &mut stdout) {
        Ok(value) => {
            // Flush `puts` output before the result line.
            let _ = stdout.flush();
            println!("{}", value.inspect());
            ExitCode::SUCCESS
        }
        Err(EngineError::Parse(errors)) => {
            eprintln!(" parser errors:");
            for message in errors {
                eprintln!("\t{message}");
            }
            ExitCode::FAILURE
        }
        Err(EngineError::Compile(err)) => {
            eprintln!("Woops! Compilation failed:\n {err}");
            ExitCode::FAILURE
        }
        Err(EngineError::Runtime(err)) => {
            eprintln!("Woops! Executing bytecode failed:\n {err}");
            ExitCode::FAILURE
        }
    }
}
