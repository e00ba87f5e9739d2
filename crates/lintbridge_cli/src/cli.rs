//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// LintBridge - lint files with script plugins and configs
#[derive(Parser)]
#[command(name = "lbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load config modules and print the load result
    Configs {
        /// Config module paths
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Lint files
    Lint {
        /// Config module to load (repeatable)
        #[arg(short, long = "config")]
        configs: Vec<PathBuf>,

        /// Plugin module whose rules are all enabled (repeatable)
        #[arg(short, long = "plugin")]
        plugins: Vec<PathBuf>,

        /// Files to lint
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}
