//! arborist-build command-line interface
//!
//! Builds the Arborist core static library and its Python extension modules

use clap::{Parser, Subcommand};
use std::process;

/// Display an error with optional backtrace information
fn display_error(err: &anyhow::Error, backtrace_enabled: bool) {
    eprintln!("error: {err}");

    // Show error chain
    let mut source = err.source();
    while let Some(err) = source {
        eprintln!("caused by: {err}");
        source = err.source();
    }

    // Show backtrace if enabled
    if backtrace_enabled {
        let backtrace = err.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            eprintln!("\nBacktrace:");
            eprintln!("{backtrace}");
        }
    }
}

#[derive(Parser)]
#[command(name = "arborist-build")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build the Arborist core library and its Python extensions", long_about = None)]
pub(crate) struct Cli {
    /// Print debug logging to stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Show backtraces for errors (requires `RUST_BACKTRACE=1`)
    #[arg(long, global = true)]
    backtrace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the static library, then every extension module
    Build {
        /// Path to config file (default: ./arborist-build.toml)
        #[arg(long)]
        config: Option<String>,

        /// Compiler driver name (`unix`, `msvc`, `clang`, ...)
        #[arg(long)]
        compiler: Option<String>,

        /// Output directory for objects, library and modules
        #[arg(long)]
        out_dir: Option<String>,

        /// Number of extension modules built at once
        #[arg(long, short = 'j')]
        jobs: Option<usize>,

        /// Stop at the first extension module that fails
        #[arg(long)]
        fail_fast: bool,

        /// Print every tool invocation
        #[arg(long)]
        verbose: bool,

        /// Suppress all output except errors
        #[arg(long, short, conflicts_with = "verbose")]
        quiet: bool,
    },

    /// Show the detected toolchain and the flags it selects
    Flags {
        /// Path to config file
        #[arg(long)]
        config: Option<String>,

        /// Compiler driver name to classify
        #[arg(long)]
        compiler: Option<String>,
    },

    /// List the native and binding sources a build would use
    Sources {
        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },

    /// Remove the build output directory
    Clean {
        /// Path to config file
        #[arg(long)]
        config: Option<String>,

        /// Output directory to remove
        #[arg(long)]
        out_dir: Option<String>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize debug mode
    arborist_build::init_debug(cli.debug);

    let result = match cli.command {
        Commands::Build {
            config,
            compiler,
            out_dir,
            jobs,
            fail_fast,
            verbose,
            quiet,
        } => commands::build::run(&commands::build::BuildOptions {
            config: config.as_deref(),
            compiler: compiler.as_deref(),
            out_dir: out_dir.as_deref(),
            jobs,
            fail_fast,
            verbose,
            quiet,
        }),
        Commands::Flags { config, compiler } => {
            commands::flags::run(config.as_deref(), compiler.as_deref())
        }
        Commands::Sources { config } => commands::sources::run(config.as_deref()),
        Commands::Clean { config, out_dir } => {
            commands::clean::run(config.as_deref(), out_dir.as_deref())
        }
        Commands::Completion { shell } => commands::completion::run(shell),
    };

    if let Err(e) = result {
        // Display error with formatting
        display_error(&e, cli.backtrace);
        process::exit(1);
    }
}

mod commands;
