//! Command-line interface for the `ragchat` binary.
//!
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ragchat - ask questions about your documents
///
/// Chunks documents into named profiles, retrieves the closest chunks for a
/// question and lets a language model answer from them.
#[derive(Parser, Debug)]
#[command(
    name = "ragchat",
    version,
    about = "Ask questions about your documents with retrieval-augmented generation",
    after_help = "EXAMPLES:\n    \
                  ragchat init                                  # Write ragchat.toml\n    \
                  ragchat ingest handbook.md --profile handbook # Load a document\n    \
                  ragchat ask \"How is leave accrued?\" -p handbook\n    \
                  ragchat profiles list                         # Show stored profiles"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "ragchat.toml", global = true)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default ragchat.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing ragchat.toml
        #[arg(short, long)]
        force: bool,

        /// Provider to configure (ollama or openai)
        #[arg(long, default_value = "ollama", value_parser = ["ollama", "openai"])]
        provider: String,
    },

    /// Chunk, embed and store a document in a profile
    ///
    /// With the default write policy the profile's previous contents are
    /// replaced.
    Ingest {
        /// Document to ingest (prompted for if omitted)
        file: Option<PathBuf>,

        /// Profile to store it in (prompted for if omitted)
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Answer a question from a profile
    Ask {
        /// The question (prompted for if omitted)
        question: Option<String>,

        /// Profile to search (prompted for if omitted)
        #[arg(short, long)]
        profile: Option<String>,

        /// Number of chunks to retrieve (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the composed prompt before the answer
        #[arg(long)]
        show_prompt: bool,
    },

    /// Send a prompt straight to the model, without retrieval
    Prompt {
        /// Prompt text
        text: String,
    },

    /// Inspect or remove profiles
    #[command(subcommand)]
    Profiles(ProfileCommands),

    /// Show the effective configuration
    Config {
        /// Only validate, print nothing on success
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List stored profiles
    List,

    /// Delete a profile and everything in it
    Drop {
        /// Name of the profile
        name: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
