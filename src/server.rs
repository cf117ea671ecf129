//! Line-based text protocol in front of a [`FileSystem`].
//!
//! One command per line, one reply per command:
//! `CREATE <name>`, `LIST`, `WRITE <name> <base64>`, `READ <name>`, `DELETE <name>`, `QUIT`.
//! Every accepted connection is served by its own thread.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

use crate::{BlockDevice, FileSystem};

// Padding is optional on input, always emitted on output.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

const UNKNOWN_COMMAND: &str = "ERROR: Unknown command.";

/// Lines to send back for one command, and whether the connection ends afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub close: bool,
}

impl Reply {
    fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            close: false,
        }
    }
}

/// Splits on runs of whitespace into at most three tokens, the last one keeping the remainder.
fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::with_capacity(3);
    let mut rest = line;
    while !rest.is_empty() {
        if tokens.len() == 2 {
            tokens.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(i) => {
                tokens.push(&rest[..i]);
                rest = rest[i..].trim_start();
            }
            None => {
                tokens.push(rest);
                break;
            }
        }
    }
    tokens
}

/// Executes one protocol line against the file system.
pub fn handle_command<D: BlockDevice>(fs: &FileSystem<D>, line: &str) -> Reply {
    let line = line.trim();
    if line.is_empty() {
        return Reply::line(UNKNOWN_COMMAND);
    }

    let tokens = tokenize(line);
    let command = tokens[0].to_uppercase();
    let name = tokens.get(1).copied();

    let result = match command.as_str() {
        "CREATE" => match name {
            None => return Reply::line("ERROR: missing filename"),
            Some(name) => fs
                .create_file(name)
                .map(|_| Reply::line(format!("SUCCESS: File '{name}' created."))),
        },
        "LIST" => {
            let files = fs.list_files();
            if files.is_empty() {
                return Reply::line("(empty)");
            }
            return Reply { lines: files, close: false };
        }
        "WRITE" => match (name, tokens.get(2).copied()) {
            (Some(name), Some(encoded)) => match LENIENT.decode(encoded) {
                Err(_) => return Reply::line("ERROR: invalid base64 payload"),
                Ok(payload) => fs.write_file(name, &payload).map(|_| {
                    Reply::line(format!("SUCCESS: Wrote {} bytes to '{name}'.", payload.len()))
                }),
            },
            _ => return Reply::line("ERROR: missing payload"),
        },
        "READ" => match name {
            None => return Reply::line("ERROR: missing filename"),
            Some(name) => fs.read_file(name).map(|data| Reply::line(STANDARD.encode(data))),
        },
        "DELETE" => match name {
            None => return Reply::line("ERROR: missing filename"),
            Some(name) => fs
                .delete_file(name)
                .map(|_| Reply::line(format!("SUCCESS: File '{name}' deleted."))),
        },
        "QUIT" => {
            return Reply {
                lines: vec!["SUCCESS: Disconnecting.".to_string()],
                close: true,
            };
        }
        _ => return Reply::line(UNKNOWN_COMMAND),
    };

    result.unwrap_or_else(|e| {
        log::warn!("{} failed: {}", command, e);
        Reply::line(format!("ERROR: {e}"))
    })
}

fn serve_client<D: BlockDevice>(fs: &FileSystem<D>, stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        // Undecodable bytes become U+FFFD and fall through to an unknown command.
        let line = String::from_utf8_lossy(&buf);
        if !line.trim().is_empty() {
            log::debug!("[{}] {}", peer, line.trim());
        }
        let reply = handle_command(fs, &line);
        for text in &reply.lines {
            writer.write_all(text.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        if reply.close {
            break;
        }
    }
    Ok(())
}

pub struct Server<D: BlockDevice + 'static> {
    fs: Arc<FileSystem<D>>,
    listener: TcpListener,
}

impl<D: BlockDevice + 'static> Server<D> {
    pub fn bind(addr: impl ToSocketAddrs, fs: Arc<FileSystem<D>>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { fs, listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, one thread per client.
    pub fn run(self) -> io::Result<()> {
        log::info!("file server listening on {}", self.local_addr()?);

        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("accept failed: {}", e);
                    continue;
                }
            };
            let peer = match stream.peer_addr() {
                Ok(peer) => peer,
                Err(e) => {
                    log::warn!("dropping connection without peer address: {}", e);
                    continue;
                }
            };
            log::info!("new connection from {}", peer);

            let fs = Arc::clone(&self.fs);
            thread::Builder::new()
                .name(format!("client-{peer}"))
                .spawn(move || {
                    match serve_client(&fs, stream, peer) {
                        Ok(()) => log::info!("{} disconnected", peer),
                        Err(e) => log::warn!("I/O error with client {}: {}", peer, e),
                    }
                })?;
        }
        Ok(())
    }
}
