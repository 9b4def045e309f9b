// CLI module for docsearch-cache
// Author: kelexine (https://github.com/kelexine)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docsearch-cache - fuzzy-matching cache in front of a documentation search API
#[derive(Parser, Debug)]
#[command(name = "docsearch-cache", version, about, long_about = None)]
pub struct Args {
    /// Config file (default: ~/.docsearch-cache/config.toml)
    #[arg(long, global = true, env = "DOCSEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Run a single search through the cache and print the result
    Search {
        query: String,

        #[arg(long)]
        page_size: Option<u32>,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        version: Option<String>,
    },
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let args = Args::try_parse_from(["docsearch-cache"]).unwrap();
        assert_eq!(args.command(), Command::Serve);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_search_subcommand() {
        let args = Args::try_parse_from([
            "docsearch-cache",
            "--config",
            "/tmp/config.toml",
            "search",
            "auth config",
            "--page-size",
            "10",
            "--language",
            "rust",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.toml")));
        assert_eq!(
            args.command(),
            Command::Search {
                query: "auth config".to_string(),
                page_size: Some(10),
                language: Some("rust".to_string()),
                version: None,
            }
        );
    }
}
