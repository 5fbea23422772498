use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use loxwalk::ast_printer::AstPrinter;
use loxwalk::error::{LoxError, Reporter};
use loxwalk::parser::Parser;
use loxwalk::scanner::Scanner;
use loxwalk::Lox;

/// Exit status for lexical, syntactic and static errors.
const EXIT_STATIC: i32 = 65;

/// Exit status for runtime errors.
const EXIT_RUNTIME: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking Lox interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program; without a file, starts a REPL
    Run { filename: Option<PathBuf> },

    /// Reads and runs one line at a time
    Repl,
}

/// Prints every diagnostic to stderr as soon as it is reported.
#[derive(Debug, Default)]
struct StderrReporter {
    reported: usize,
}

impl Reporter for StderrReporter {
    fn report(&mut self, error: LoxError) {
        debug!("Diagnostic: {}", error);

        self.reported += 1;
        eprintln!("{}", error);
    }
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip the crate prefix from the module path
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("loxwalk::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Maps a failed run to its exit status, printing runtime errors.  Static
/// diagnostics were already printed by the reporter.
fn report_failure(error: &LoxError) -> i32 {
    match error {
        LoxError::Runtime(_) | LoxError::Internal(_) => {
            eprintln!("{}", error);
            EXIT_RUNTIME
        }
        _ => EXIT_STATIC,
    }
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    info!("Running Tokenize subcommand");

    let mut reporter = StderrReporter::default();
    let tokens = Scanner::new(source).scan_tokens(&mut reporter);

    if json {
        let rendered = serde_json::to_string_pretty(&tokens).context("Failed to encode tokens")?;
        println!("{}", rendered);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    if reporter.reported > 0 {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC);
        process::exit(EXIT_STATIC);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(source: &str) {
    info!("Running Parse subcommand");

    let mut reporter = StderrReporter::default();
    let tokens = Scanner::new(source).scan_tokens(&mut reporter);
    let expr = Parser::new(tokens, &mut reporter).parse_expression();

    match expr {
        Some(expr) if reporter.reported == 0 => {
            let ast_str = AstPrinter::print(&expr);

            debug!("AST: {}", ast_str);
            println!("{}", ast_str);
        }
        _ => process::exit(EXIT_STATIC),
    }

    info!("Parse subcommand completed");
}

fn evaluate(source: &str) {
    info!("Running Evaluate subcommand");

    let mut lox = Lox::default();
    let mut reporter = StderrReporter::default();

    match lox.evaluate(source, &mut reporter) {
        Ok(value) => {
            debug!("Evaluated to: {}", value);
            println!("{}", value);
        }
        Err(e) => process::exit(report_failure(&e)),
    }

    info!("Evaluate subcommand completed");
}

fn run(source: &str) {
    info!("Running Run subcommand");
    info!("Provided input:\n {}", source);

    let mut lox = Lox::default();
    let mut reporter = StderrReporter::default();

    if let Err(e) = lox.run(source, &mut reporter) {
        debug!("Run failed: {}", e);
        process::exit(report_failure(&e));
    }

    info!("Program executed successfully");
}

fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut lox = Lox::default();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        // Ctrl-D
        if read == 0 {
            println!();
            break;
        }

        let mut reporter = StderrReporter::default();

        if let Err(e) = lox.run(&line, &mut reporter) {
            debug!("REPL line failed: {}", e);
            report_failure(&e);
        }
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => tokenize(&read_file(filename)?, json)?,
        Commands::Parse { filename } => parse(&read_file(filename)?),
        Commands::Evaluate { filename } => evaluate(&read_file(filename)?),
        Commands::Run {
            filename: Some(filename),
        } => run(&read_file(filename)?),
        Commands::Run { filename: None } | Commands::Repl => repl()?,
    }

    Ok(())
}
