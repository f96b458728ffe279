//! Command line interface

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "paperweather")]
#[command(version, about = "Ask questions about your documents or the weather", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web UI (default)
    Serve(ServeArgs),

    /// Answer a single query and exit
    Ask {
        /// Question to route to the weather or document pipeline
        query: String,

        /// Run without calling OpenAI
        #[arg(long)]
        offline: bool,
    },

    /// Index every PDF and text file in the data directories
    Ingest {
        #[arg(long)]
        offline: bool,
    },

    /// Create data directories, a .env template and a sample document
    Setup {
        /// Start the web UI once setup completes
        #[arg(long)]
        run: bool,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Address to bind (default from HOST or 127.0.0.1)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (default from PORT or 8501)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Use mock responses instead of OpenAI
    #[arg(long)]
    pub offline: bool,
}

impl Cli {
    /// The requested subcommand, `serve` with defaults when none was given.
    pub fn into_command(self) -> Commands {
        self.command
            .unwrap_or_else(|| Commands::Serve(ServeArgs::default()))
    }
}
