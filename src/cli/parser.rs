//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// codelode: code-aware retrieval index builder and hybrid search.
///
/// Synchronizes a repository tree into a full-text + vector store through
/// an incremental LLM-chunking pipeline, links chunks into a Q/A graph,
/// and answers hybrid queries with RRF fusion and optional reranking.
#[derive(Parser, Debug)]
#[command(name = "codelode")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the incremental indexing pipeline over the repository root.
    ///
    /// Scans the tree, fingerprints every file, splits changed files into
    /// blocks via the LLM, embeds and writes their chunks, and tombstones
    /// vanished paths.
    #[command(after_help = r#"Examples:
  codelode build                          # index $REPOS_SAFE_ROOT
  codelode build --root ./repos_safe      # index an explicit tree
  codelode build --workers 4              # process four files at a time
"#)]
    Build {
        /// Repository root to index.
        #[arg(long, env = "REPOS_SAFE_ROOT")]
        root: Option<PathBuf>,

        /// Gitignore-syntax exclusion file.
        #[arg(long, env = "IGNORE_FILE")]
        ignore_file: Option<PathBuf>,

        /// Number of files processed concurrently.
        #[arg(long, env = "INDEX_FILE_WORKERS")]
        workers: Option<usize>,
    },

    /// Compute the chunk-to-chunk Q/A link graph over the current index.
    GraphLink,

    /// Run one hybrid retrieval (debugging surface).
    #[command(after_help = r#"Examples:
  codelode search "eviction policy"
  codelode search "eviction policy" --path-prefix src/cache --top-n 5
  codelode search "http handler" --symbols handler,route --rerank
"#)]
    Search {
        /// The question to retrieve for.
        question: String,

        /// Only return chunks whose path starts with this prefix.
        #[arg(long, default_value = "")]
        path_prefix: String,

        /// Number of results to return.
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..=60))]
        top_n: u16,

        /// Symbol names boosting lexical retrieval (comma separated).
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Rerank the shortlist with the cross-encoder.
        #[arg(long)]
        rerank: bool,

        /// Prefix each result line with its line number.
        #[arg(long)]
        line_numbers: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::try_parse_from(["codelode", "build", "--workers", "4"])
            .unwrap_or_else(|_| unreachable!());
        match cli.command {
            Commands::Build { workers, .. } => assert_eq!(workers, Some(4)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_search_defaults() {
        let cli = Cli::try_parse_from(["codelode", "search", "eviction policy"])
            .unwrap_or_else(|_| unreachable!());
        match cli.command {
            Commands::Search {
                question,
                path_prefix,
                top_n,
                symbols,
                rerank,
                line_numbers,
            } => {
                assert_eq!(question, "eviction policy");
                assert_eq!(path_prefix, "");
                assert_eq!(top_n, 10);
                assert!(symbols.is_empty());
                assert!(!rerank);
                assert!(!line_numbers);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_search_symbols_delimited() {
        let cli = Cli::try_parse_from(["codelode", "search", "q", "--symbols", "lru,cache"])
            .unwrap_or_else(|_| unreachable!());
        match cli.command {
            Commands::Search { symbols, .. } => {
                assert_eq!(symbols, vec!["lru".to_string(), "cache".to_string()]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_top_n_range_enforced() {
        assert!(Cli::try_parse_from(["codelode", "search", "q", "--top-n", "0"]).is_err());
        assert!(Cli::try_parse_from(["codelode", "search", "q", "--top-n", "61"]).is_err());
        assert!(Cli::try_parse_from(["codelode", "search", "q", "--top-n", "60"]).is_ok());
    }

    #[test]
    fn test_graph_link_takes_no_args() {
        let cli =
            Cli::try_parse_from(["codelode", "graph-link"]).unwrap_or_else(|_| unreachable!());
        assert!(matches!(cli.command, Commands::GraphLink));
    }
}
