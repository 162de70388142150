use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::{Error, Result};

/// Idle sleep when a worker pass neither received nor sent anything.
const IDLE_SLEEP: Duration = Duration::from_millis(10);

const RECV_CHUNK: usize = 4096;

/// A line-oriented, half-duplex command link to the engine.
///
/// Implemented by [`Transport`]; tests substitute in-memory fakes.
pub trait LineLink {
    /// Queue a command for sending. Delivery failures surface later as a disconnect.
    fn enqueue(&self, command: &str);

    /// Wait for the next inbound line until `deadline`.
    ///
    /// Lines already queued are returned even after the peer has gone away;
    /// `Disconnected` is reported only once the queue is drained.
    fn recv_line(&self, deadline: Instant) -> std::result::Result<String, RecvTimeoutError>;

    fn is_connected(&self) -> bool;
}

/// Owns the TCP connection to the engine and a background worker that moves
/// bytes between the socket and two FIFO queues.
pub struct Transport {
    addr: String,
    outbound: Sender<String>,
    inbound: Receiver<String>,
    stop_request: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<Option<TcpStream>>>,
}

impl Transport {
    /// Connect to `addr` and start the I/O worker. There is no retry.
    pub fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|source| Error::Connect {
            addr: addr.to_string(),
            source,
        })?;
        stream
            .set_nonblocking(true)
            .map_err(|source| Error::Connect {
                addr: addr.to_string(),
                source,
            })?;
        // Commands are tiny; don't let Nagle hold them back.
        let _ = stream.set_nodelay(true);
        log::info!("Connected to {addr}");
        Ok(Self::start(addr.to_string(), stream))
    }

    fn start(addr: String, stream: TcpStream) -> Self {
        let (outbound, outbound_rx) = crossbeam_channel::unbounded::<String>();
        let (inbound_tx, inbound) = crossbeam_channel::unbounded::<String>();
        let stop_request = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let mut worker = Worker {
            stream: Some(stream),
            rx_data: Vec::new(),
            tx_data: Vec::new(),
            outbound: outbound_rx,
            inbound: inbound_tx,
        };
        let stop = Arc::clone(&stop_request);
        let alive = Arc::clone(&running);
        let worker = std::thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                if !worker.pass() {
                    break;
                }
            }
            alive.store(false, Ordering::Release);
            worker.stream
        });

        Transport {
            addr,
            outbound,
            inbound,
            stop_request,
            running,
            worker: Some(worker),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Signal the worker, wait for it, then close the connection if it is still open.
    pub fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        self.stop_request.store(true, Ordering::Release);
        match handle.join() {
            Ok(Some(stream)) => {
                let _ = stream.shutdown(Shutdown::Both);
                log::info!("Disconnected from {}", self.addr);
            }
            Ok(None) => {}
            Err(_) => log::error!("Transport worker for {} panicked", self.addr),
        }
        self.running.store(false, Ordering::Release);
    }
}

impl LineLink for Transport {
    fn enqueue(&self, command: &str) {
        if self.outbound.send(command.to_string()).is_err() {
            log::debug!("Dropping '{command}': transport worker is gone");
        }
    }

    fn recv_line(&self, deadline: Instant) -> std::result::Result<String, RecvTimeoutError> {
        self.inbound.recv_deadline(deadline)
    }

    fn is_connected(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker-side state. Lives on the I/O thread only.
struct Worker {
    stream: Option<TcpStream>,
    rx_data: Vec<u8>,
    tx_data: Vec<u8>,
    outbound: Receiver<String>,
    inbound: Sender<String>,
}

impl Worker {
    /// One receive/send pass. Returns false once the connection is closed.
    fn pass(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        let mut busy = false;

        let mut chunk = [0u8; RECV_CHUNK];
        match stream.read(&mut chunk) {
            Ok(0) => {
                log::info!("Server closed the connection");
                self.disconnect();
                return false;
            }
            Ok(n) => {
                log::trace!("Received {n} bytes");
                self.rx_data.extend_from_slice(&chunk[..n]);
                self.extract_lines();
                busy = true;
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                log::warn!("Receive error: {e}");
                self.disconnect();
                return false;
            }
        }

        while let Ok(line) = self.outbound.try_recv() {
            self.tx_data.extend_from_slice(line.as_bytes());
            self.tx_data.push(b'\n');
        }

        if !self.tx_data.is_empty() {
            let Some(stream) = self.stream.as_mut() else {
                return false;
            };
            match stream.write(&self.tx_data) {
                Ok(0) => {
                    log::warn!("Send wrote nothing, closing");
                    self.disconnect();
                    return false;
                }
                Ok(n) => {
                    log::trace!("Sent {n} bytes");
                    self.tx_data.drain(..n);
                    busy = true;
                }
                Err(e)
                    if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    log::warn!("Send error: {e}");
                    self.disconnect();
                    return false;
                }
            }
        }

        if !busy {
            std::thread::sleep(IDLE_SLEEP);
        }
        true
    }

    /// Move every complete line from the receive buffer to the inbound queue.
    /// A trailing partial line stays buffered.
    fn extract_lines(&mut self) {
        let mut start = 0;
        while let Some(pos) = self.rx_data[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            let line = String::from_utf8_lossy(&self.rx_data[start..end]);
            // The receiving side may already be gone during shutdown.
            let _ = self.inbound.send(line.trim_end().to_string());
            start = end + 1;
        }
        self.rx_data.drain(..start);
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn connect_failure_is_reported() {
        let (listener, addr) = listener();
        drop(listener);
        match Transport::connect(&addr) {
            Err(Error::Connect { addr: a, .. }) => assert_eq!(a, addr),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("connect should fail"),
        }
    }

    #[test]
    fn commands_are_sent_newline_terminated_in_order() {
        let (listener, addr) = listener();
        let mut transport = Transport::connect(&addr).unwrap();
        let (server, _) = listener.accept().unwrap();

        transport.enqueue("list_params");
        transport.enqueue("record status");

        let mut reader = BufReader::new(server);
        let mut first = String::new();
        let mut second = String::new();
        reader.read_line(&mut first).unwrap();
        reader.read_line(&mut second).unwrap();
        assert_eq!(first, "list_params\n");
        assert_eq!(second, "record status\n");

        transport.stop();
        assert!(!transport.is_connected());
    }

    #[test]
    fn lines_are_split_and_partial_line_is_kept() {
        let (listener, addr) = listener();
        let transport = Transport::connect(&addr).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        server.write_all(b"first  \r\nsec").unwrap();
        server.flush().unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        assert_eq!(transport.recv_line(deadline).unwrap(), "first");

        // Nothing more until the newline arrives.
        let short = Instant::now() + Duration::from_millis(50);
        assert!(matches!(
            transport.recv_line(short),
            Err(RecvTimeoutError::Timeout)
        ));

        server.write_all(b"ond\nOK\n").unwrap();
        assert_eq!(transport.recv_line(deadline).unwrap(), "second");
        assert_eq!(transport.recv_line(deadline).unwrap(), "OK");
    }

    #[test]
    fn peer_close_marks_disconnected_without_losing_lines() {
        let (listener, addr) = listener();
        let transport = Transport::connect(&addr).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        server.write_all(b"a\nb\n").unwrap();
        server.flush().unwrap();
        drop(server);

        assert!(wait_until(|| !transport.is_connected()));
        assert!(!transport.is_connected());

        let deadline = Instant::now() + Duration::from_millis(100);
        assert_eq!(transport.recv_line(deadline).unwrap(), "a");
        assert_eq!(transport.recv_line(deadline).unwrap(), "b");
        assert!(matches!(
            transport.recv_line(deadline),
            Err(RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn enqueue_after_disconnect_is_harmless() {
        let (listener, addr) = listener();
        let mut transport = Transport::connect(&addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        drop(server);

        assert!(wait_until(|| !transport.is_connected()));
        transport.enqueue("list_params");
        transport.stop();
        transport.stop();
    }
}
