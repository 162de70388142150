use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;

use crate::error::{Error, Result};
use crate::transport::LineLink;

/// The terminal token and the payload lines that preceded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: String,
    pub payload: Vec<String>,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

/// Lines that end a command's response.
pub fn is_terminal_token(line: &str) -> bool {
    line == "OK" || line.starts_with("ERR")
}

/// Send `command` and collect its response.
///
/// Lines received before the terminal token form the payload. The protocol is
/// half-duplex: callers must not issue another command until this returns.
/// On timeout, lines consumed so far are dropped.
pub fn send_command<L: LineLink + ?Sized>(
    link: &L,
    command: &str,
    timeout: Duration,
) -> Result<Response> {
    log::debug!("> {command}");
    link.enqueue(command);

    let deadline = Instant::now() + timeout;
    let mut payload = Vec::new();
    loop {
        match link.recv_line(deadline) {
            Ok(line) if is_terminal_token(&line) => {
                log::debug!("< {line} ({} payload lines)", payload.len());
                return Ok(Response {
                    status: line,
                    payload,
                });
            }
            Ok(line) => payload.push(line),
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Timed out waiting for '{command}' after {timeout:?}");
                return Err(Error::Timeout {
                    command: command.to_string(),
                    timeout,
                });
            }
            Err(RecvTimeoutError::Disconnected) => return Err(Error::Disconnected),
        }
    }
}
