//! redwire CLI Client
//!
//! Command-line interface for talking to a server over the text protocol.

use clap::{Parser, Subcommand};
use redwire::{Client, Config, RedwireError};
use tracing_subscriber::{fmt, EnvFilter};

/// redwire CLI
#[derive(Parser, Debug)]
#[command(name = "redwire-cli")]
#[command(about = "CLI for the redwire key-value client")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "6379")]
    port: u16,

    /// Read/write timeout in milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping,

    /// Echo a message back
    Echo {
        message: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// Only set if the key does not exist
        #[arg(long)]
        nx: bool,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Increment a counter
    Incr {
        key: String,

        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        by: i64,
    },

    /// Decrement a counter
    Decr {
        key: String,

        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        by: i64,
    },

    /// Check whether a key exists
    Exists {
        key: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List keys matching a pattern
    Keys {
        #[arg(default_value = "*")]
        pattern: String,
    },

    /// Return a random key
    Randomkey,

    /// Rename a key
    Rename {
        src: String,
        dst: String,

        /// Only rename if the destination does not exist
        #[arg(long)]
        nx: bool,
    },

    /// Show the type of a key
    Type {
        key: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut builder = Config::builder().host(&args.host).port(args.port);
    if let Some(ms) = args.timeout_ms {
        builder = builder.read_timeout_ms(ms).write_timeout_ms(ms).connect_timeout_ms(ms);
    }
    let config = builder.build();

    tracing::debug!("redwire-cli v{} -> {}", redwire::VERSION, config.addr());

    match run(config, args.command) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("(error) {}", e);
            std::process::exit(1);
        }
    }
}

fn run(config: Config, command: Commands) -> Result<String, RedwireError> {
    let client = Client::new(config)?;

    let output = match command {
        Commands::Ping => client.ping()?,
        Commands::Echo { message } => String::from_utf8_lossy(&client.echo(message)?).into_owned(),
        Commands::Set { key, value, nx: false } => client.set(&key, value)?,
        Commands::Set { key, value, nx: true } => format_bool(client.set_nx(&key, value)?),
        Commands::Get { key } => match client.get(&key)? {
            Some(value) => String::from_utf8_lossy(&value).into_owned(),
            None => "(nil)".to_string(),
        },
        Commands::Incr { key, by } => format!("(integer) {}", client.incr(&key, by)?),
        Commands::Decr { key, by } => format!("(integer) {}", client.decr(&key, by)?),
        Commands::Exists { key } => format_bool(client.exists(&key)?),
        Commands::Del { key } => format_bool(client.delete(&key)?),
        Commands::Keys { pattern } => {
            let keys = client.keys(&pattern)?;
            if keys.is_empty() {
                "(empty list)".to_string()
            } else {
                keys.iter()
                    .enumerate()
                    .map(|(i, key)| format!("{}) {}", i + 1, key))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Commands::Randomkey => client.randomkey()?.unwrap_or_else(|| "(nil)".to_string()),
        Commands::Rename { src, dst, nx: false } => client.rename(&src, &dst)?,
        Commands::Rename { src, dst, nx: true } => format_bool(client.rename_nx(&src, &dst)?),
        Commands::Type { key } => client.key_type(&key)?,
    };

    client.disconnect();
    Ok(output)
}

fn format_bool(value: bool) -> String {
    format!("(integer) {}", value as i64)
}
