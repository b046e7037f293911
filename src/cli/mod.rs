//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

/// Dataset question answering over your own documents.
#[derive(Debug, Parser)]
#[command(name = "lantros")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve(commands::ServeArgs),

    /// Embed a dataset's files into its collection (replaces previous points).
    /// Needs a persistent vector store; the memory driver is only useful with `serve`.
    Train(commands::TrainArgs),

    /// Retrieve the chunks nearest to a query
    Query(commands::QueryArgs),

    /// Check vector store connectivity and list trained datasets
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_with_global_flags() {
        let cli = Cli::parse_from([
            "lantros", "query", "notes", "what is rust", "--top-k", "3", "-f", "json", "-v",
        ]);

        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(cli.verbose);
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.dataset, "notes");
                assert_eq!(args.text, "what is rust");
                assert_eq!(args.top_k, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_bind() {
        let cli = Cli::parse_from(["lantros", "serve", "--bind", "0.0.0.0:9000"]);
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["lantros", "-f", "yaml", "status"]).is_err());
    }
}
