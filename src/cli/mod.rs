//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod account;
pub mod ask;

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::core::config::{path_display, Config, ConfigKey};
use crate::core::credentials::KeyringCredentialStore;
use crate::core::request::ApiClient;

#[derive(Parser)]
#[command(name = "kbchat")]
#[command(version)]
#[command(about = "Ask a knowledge-base assistant questions from the terminal")]
#[command(
    long_about = "kbchat talks to a knowledge-base question answering service. Answers are \
streamed as they are generated and cite the documents they came from.\n\n\
Authentication:\n\
  Use 'kbchat login' once; the access token is kept in your system keyring and\n\
  removed automatically when the server rejects it.\n\n\
Environment Variables:\n\
  KBCHAT_BASE_URL   Backend URL (overrides the configured base-url)\n\
  KBCHAT_LOG        Log filter, e.g. 'debug' (logs go to stderr)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend URL for this invocation only
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Print debug logs to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the access token
    Login {
        /// Account name (prompted when omitted)
        #[arg(short = 'u', long)]
        username: Option<String>,
        /// Read the password from the first line of stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },
    /// Sign out and forget the stored token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check whether the backend is up
    Health,
    /// Ask a question
    Ask {
        /// The question (multiple words are joined)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        question: Vec<String>,
        /// Wait for the complete answer instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },
    /// Set a configuration value (base-url, timeout, device-info)
    Set { key: String, value: Vec<String> },
    /// Unset a configuration value
    Unset { key: String },
    /// Print the current configuration
    Config,
}

/// Everything a command needs to talk to the backend.
pub struct Context {
    pub config: Config,
    pub client: ApiClient,
}

impl Context {
    fn new(config: Config, base_url_override: Option<String>) -> Result<Self, Box<dyn Error>> {
        let base_url = base_url_override.unwrap_or_else(|| config.base_url());
        let client = ApiClient::new(
            &base_url,
            config.timeout(),
            Arc::new(KeyringCredentialStore::new()),
        )?;
        Ok(Self { config, client })
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    crate::logging::init(args.verbose);

    let config = Config::load()?;

    match args.command {
        Commands::Set { key, value } => {
            let key: ConfigKey = key.parse()?;
            let mut config = config;
            config.set_value(key, &value.join(" "))?;
            let path = config.save()?;
            println!("✅ Set {key} to: {}", config.describe(key));
            println!("   (saved to {})", path_display(path));
            Ok(())
        }
        Commands::Unset { key } => {
            let key: ConfigKey = key.parse()?;
            let mut config = config;
            config.unset_value(key);
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Commands::Config => {
            config.print_all();
            Ok(())
        }
        command => {
            let context = Context::new(config, args.base_url)?;
            match command {
                Commands::Login {
                    username,
                    password_stdin,
                } => account::run_login(&context, username, password_stdin).await,
                Commands::Logout => account::run_logout(&context).await,
                Commands::Whoami => account::run_whoami(&context).await,
                Commands::Health => account::run_health(&context).await,
                Commands::Ask {
                    question,
                    no_stream,
                } => ask::run_ask(&context, question, no_stream).await,
                Commands::Set { .. } | Commands::Unset { .. } | Commands::Config => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_joins_trailing_words() {
        let args = Args::parse_from(["kbchat", "ask", "what", "is", "--rag"]);
        match args.command {
            Commands::Ask {
                question,
                no_stream,
            } => {
                assert_eq!(question.join(" "), "what is --rag");
                assert!(!no_stream);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let args = Args::parse_from([
            "kbchat",
            "login",
            "-u",
            "admin",
            "--base-url",
            "http://kb:8000",
            "-v",
        ]);
        assert_eq!(args.base_url.as_deref(), Some("http://kb:8000"));
        assert!(args.verbose);
        assert!(matches!(
            args.command,
            Commands::Login { username: Some(ref name), password_stdin: false } if name == "admin"
        ));
    }

    #[test]
    fn no_stream_flag_before_question() {
        let args = Args::parse_from(["kbchat", "ask", "--no-stream", "hello"]);
        assert!(matches!(
            args.command,
            Commands::Ask { no_stream: true, ref question } if question == &["hello".to_string()]
        ));
    }
}
