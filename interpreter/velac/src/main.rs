//! Vela CLI
//!
//! Driver for evaluating Vela configuration scripts.

mod commands;
mod tracing_setup;

use commands::{lex_file, print_factories, run_file};

fn main() {
    tracing_setup::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "run" => {
            if args.len() < 3 {
                eprintln!("Usage: velac run <file.vela> [--env]");
                std::process::exit(1);
            }
            let dump_env = args.iter().skip(3).any(|arg| arg == "--env");
            run_file(&args[2], dump_env);
        }
        "lex" => {
            if args.len() < 3 {
                eprintln!("Usage: velac lex <file.vela>");
                std::process::exit(1);
            }
            lex_file(&args[2]);
        }
        "factories" => {
            print_factories();
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-v" => {
            println!("Vela {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            // If it looks like a script path, treat it as `run`.
            if std::path::Path::new(command)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("vela"))
            {
                run_file(command, false);
            } else {
                eprintln!("Unknown command: {command}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }
}

fn print_usage() {
    println!("Vela configuration language interpreter");
    println!();
    println!("Usage: velac <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <file.vela>      Evaluate a Vela script");
    println!("  lex <file.vela>      Tokenize a script and display tokens");
    println!("  factories            List registered object factories");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Run options:");
    println!("  --env                Dump the environment after evaluation");
    println!();
    println!("Environment variables:");
    println!("  VELA_LOG             Log filter (RUST_LOG syntax; default: warn)");
    println!("  VELA_LOG_TREE        Hierarchical log output");
    println!();
    println!("Examples:");
    println!("  velac run config.vela --env");
    println!("  velac lex config.vela");
    println!("  velac config.vela            # Shorthand for 'run'");
}
