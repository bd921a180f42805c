//! Connection Handler
//!
//! Handles one TCP client session: reads commands line by line, executes
//! them in arrival order, and writes one newline-terminated response per
//! command. The connection survives invalid commands; only I/O errors or
//! EOF end the session.

use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{Command, Response};

/// How often a blocked read wakes up to check the shutdown flag
const READ_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A single client session
pub struct Connection {
    stream: TcpStream,
    engine: Arc<Engine>,
    shutdown: Arc<AtomicBool>,
    peer: String,
}

impl Connection {
    /// Wrap an accepted stream. The read timeout lets the session notice a
    /// server shutdown instead of blocking forever on an idle client.
    pub fn new(
        stream: TcpStream,
        engine: Arc<Engine>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        stream.set_read_timeout(Some(READ_POLL_INTERVAL))?;

        Ok(Self {
            stream,
            engine,
            shutdown,
            peer,
        })
    }

    /// Remote address, for logging
    pub fn peer_addr(&self) -> &str {
        &self.peer
    }

    /// Serve the session until EOF, an I/O error, or server shutdown.
    pub fn handle(&mut self) -> Result<()> {
        let mut reader = BufReader::new(self.stream.try_clone()?);
        let mut writer = BufWriter::new(self.stream.try_clone()?);
        let mut line = String::new();

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            match reader.read_line(&mut line) {
                // EOF: client closed its write side
                Ok(0) => break,
                Ok(_) => {
                    let response = match Command::parse(&line) {
                        Some(command) => self.engine.execute(command),
                        None => Response::Invalid,
                    };

                    writeln!(writer, "{response}")?;
                    writer.flush()?;
                    line.clear();
                }
                // Timed-out read: partial input stays in `line`, retry
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}
