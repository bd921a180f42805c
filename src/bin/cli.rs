//! logkv CLI Client
//!
//! One-shot client for the line-oriented protocol: sends a single command
//! over TCP and prints the server's response verbatim.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use clap::{Parser, Subcommand};

/// logkv CLI
#[derive(Parser, Debug)]
#[command(name = "logkv-cli")]
#[command(about = "CLI for the logkv key-value store")]
#[command(version)]
struct Args {
    /// Server address (host:port)
    #[arg(short, long, default_value = "localhost:8080")]
    server: String,

    /// Connection timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a value under a key
    Put {
        /// The key to store under
        key: String,

        /// The value to store
        value: String,
    },

    /// Fetch the value for a key
    Get {
        /// The key to fetch
        key: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },
}

fn main() {
    let args = Args::parse();

    let line = match &args.command {
        Commands::Put { key, value } => format!("PUT {key} {value}\n"),
        Commands::Get { key } => format!("GET {key}\n"),
        Commands::Del { key } => format!("DEL {key}\n"),
    };

    let mut stream = match TcpStream::connect(&args.server) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let timeout = Duration::from_millis(args.timeout);
    let _ = stream.set_read_timeout(Some(timeout));
    let _ = stream.set_write_timeout(Some(timeout));
    let _ = stream.set_nodelay(true);

    if let Err(e) = stream.write_all(line.as_bytes()) {
        eprintln!("failed to send command: {}", e);
        std::process::exit(1);
    }

    let mut reader = BufReader::new(&stream);
    let mut response = String::new();
    match reader.read_line(&mut response) {
        Ok(0) => {
            eprintln!("server closed the connection");
            std::process::exit(1);
        }
        Ok(_) => print!("{response}"),
        Err(e) => {
            eprintln!("failed to read response: {}", e);
            std::process::exit(1);
        }
    }
}
