//! apitest - demo driver for spec-driven API test generation.
//!
//! Runs the full pipeline against the embedded user-store specification:
//! generate an abstract test case for a sequence of block names, then
//! concretize it with Z3 and the in-memory demo application.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use apitest_gen::{AtcGenerator, GeneratedAtc};
use apitest_lang::Program;
use apitest_smt::Z3Solver;
use apitest_tester::Tester;

mod demo;

#[derive(Parser)]
#[command(name = "apitest", version, about = "Spec-driven API test case generation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the embedded demo specification.
    Spec,
    /// Generate the abstract test case for a sequence of block names.
    Atc {
        /// Block names to exercise, in order (names may repeat).
        #[arg(required = true)]
        blocks: Vec<String>,
        /// Emit the program as JSON instead of the line-oriented form.
        #[arg(long)]
        json: bool,
    },
    /// Generate a concrete test case (runs Z3 and the demo application).
    Ctc {
        /// Block names to exercise, in order (names may repeat).
        #[arg(required = true)]
        blocks: Vec<String>,
        /// Emit the program as JSON instead of the line-oriented form.
        #[arg(long)]
        json: bool,
        /// Per-query solver timeout in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Spec => {
            print!("{}", demo::spec());
            Ok(())
        }
        Command::Atc { blocks, json } => {
            let atc = generate_atc(&blocks)?;
            emit(&atc.program, json)
        }
        Command::Ctc {
            blocks,
            json,
            timeout_ms,
        } => {
            let atc = generate_atc(&blocks)?;

            let mut solver = Z3Solver::new(atc.types);
            if let Some(ms) = timeout_ms {
                solver = solver.with_timeout(Duration::from_millis(ms));
            }

            let store = demo::UserStore::new();
            let mut tester = Tester::new(&store, Box::new(solver));
            let ctc = tester
                .generate_ctc(atc.program, Vec::new())
                .context("concretization failed")?;
            if ctc.is_abstract() {
                eprintln!("note: constraints admit no model for some inputs; result is partial");
            }
            emit(&ctc, json)
        }
    }
}

fn generate_atc(blocks: &[String]) -> Result<GeneratedAtc> {
    let spec = demo::spec();
    let symbols = demo::symbols();
    AtcGenerator::new(&spec, &symbols)
        .generate(blocks, &demo::types())
        .context("ATC generation failed")
}

fn emit(program: &Program, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(program).context("serializing program")?
        );
    } else {
        print!("{program}");
    }
    Ok(())
}
