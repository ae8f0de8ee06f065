use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use kunyu::ast_printer::AstPrinter;
use kunyu::error::{ErrorKind, KunyuError};
use kunyu::interpreter::{self, Interpreter, InterpreterConfig, DEFAULT_MAX_CALL_DEPTH};
use kunyu::parser;
use kunyu::repl;
use kunyu::scanner::{self, Scanner};
use kunyu::Session;

#[derive(ClapParser, Debug)]
#[command(version, about = "坤舆 (Kunyu) language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to kunyu.log
    #[arg(long, global = true)]
    log: bool,

    /// Maximum depth of nested function calls
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_depth: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a source file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a source file and prints its syntax tree
    Parse {
        filename: PathBuf,

        /// Print the tree as JSON instead of prefix form
        #[arg(long)]
        json: bool,
    },

    /// Runs a source file as a Kunyu program
    Run { filename: PathBuf },

    /// Starts an interactive session (default)
    Repl,
}

/// Maps a source file and copies it out as UTF‑8 text.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file: File =
        File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len: u64 = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length files cannot be mapped.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read-only and dropped before this function returns;
    // the contents are copied out immediately.
    let map: Mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    let text: &str = std::str::from_utf8(&map)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", map.len(), filename);

    Ok(text.to_owned())
}

fn init_logger() -> Result<()> {
    let log_file: File = File::create("kunyu.log").context("Failed to create kunyu.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'kunyu::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("kunyu::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "{} [{}:{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to kunyu.log");
    Ok(())
}

/// Report an interpreter error and exit with the matching status.
fn fail(e: &KunyuError) -> ! {
    debug!("Exiting after error: {:?}", e);
    eprintln!("{}", e);

    let code: i32 = match e.kind() {
        ErrorKind::Lex | ErrorKind::Parse => 65,
        ErrorKind::Runtime | ErrorKind::Memory => 70,
        ErrorKind::Io => 74,
    };

    std::process::exit(code);
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

    let config = InterpreterConfig {
        max_call_depth: args.max_depth,
    };

    match args.commands.unwrap_or(Commands::Repl) {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");
            let source: String = read_source(&filename)?;

            if json {
                let tokens = scanner::tokenize(&source).unwrap_or_else(|e| fail(&e));
                println!("{}", serde_json::to_string_pretty(&tokens)?);
                return Ok(());
            }

            let stdout = io::stdout();
            let mut out = stdout.lock();

            for token in Scanner::new(&source) {
                match token {
                    Ok(token) => writeln!(out, "{}", token)?,

                    Err(e) => {
                        out.flush()?;
                        fail(&e);
                    }
                }
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename, json } => {
            info!("Running Parse subcommand");
            let source: String = read_source(&filename)?;

            let program = scanner::tokenize(&source)
                .and_then(|tokens| parser::parse(&tokens))
                .unwrap_or_else(|e| fail(&e));

            if json {
                println!("{}", serde_json::to_string_pretty(&program)?);
            } else {
                let tree: String = AstPrinter::print_program(&program);
                debug!("AST: {}", tree);
                println!("{}", tree);
            }

            info!("Parse subcommand completed");
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");
            let source: String = read_source(&filename)?;

            let mut interpreter = Interpreter::with_config(io::stdout().lock(), config);

            if let Err(e) = interpreter::run_source(&mut interpreter, &source) {
                fail(&e);
            }

            info!("Program executed successfully");
        }

        Commands::Repl => {
            info!("Running Repl subcommand");

            let mut session: Session = Session::with_config(config);
            let stdin = io::stdin();

            repl::run(&mut session, stdin.lock(), io::stdout(), io::stderr())
                .context("REPL I/O failed")?;
        }
    }

    Ok(())
}
