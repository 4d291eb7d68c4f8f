//! Line-oriented byte transport to the arm's board.
//!
//! The board speaks a small text protocol, one command or reply per line.
//! [`DeviceTransport`] opens the device node as a file and runs a reader thread
//! that forwards complete lines over a channel, so waiting for a reply can be
//! bounded by a timeout without interrupting the read itself.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::errors::TransportError;

pub trait Transport: Send {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Waits up to `timeout` for the next complete line from the device.
    fn recv_line(&mut self, timeout: Duration) -> Result<String, TransportError>;

    /// A short description used in logs, e.g. the device path.
    fn describe(&self) -> String;
}

/// Opens a transport. The controller link calls this once, while connecting.
pub trait Connector: Send {
    fn connect(&self) -> Result<Box<dyn Transport>, TransportError>;

    fn describe(&self) -> String;
}

/// Connects to a device node such as `/dev/ttyACM0`.
///
/// The node must already be configured for the board's line settings.
#[derive(Debug, Clone)]
pub struct DeviceConnector {
    path: PathBuf,
}

impl DeviceConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Connector for DeviceConnector {
    fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(DeviceTransport::open(&self.path)?))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

pub struct DeviceTransport {
    path: PathBuf,
    writer: File,
    lines: Receiver<std::io::Result<String>>,
}

impl DeviceTransport {
    pub fn open(path: &Path) -> Result<Self, TransportError> {
        let writer = OpenOptions::new().read(true).write(true).open(path)?;
        let reader = writer.try_clone()?;
        let (tx, rx) = mpsc::channel();

        // The reader thread exits on EOF, on a read error, or once the
        // transport has been dropped and the next line arrives.
        thread::Builder::new()
            .name("neo-device-reader".to_string())
            .spawn(move || {
                let mut reader = BufReader::new(reader);
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) => break,
                        Ok(_) => {
                            if tx.send(Ok(line.trim_end().to_string())).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
            })?;

        log::debug!("Opened arm device {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            lines: rx,
        })
    }
}

impl Transport for DeviceTransport {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn recv_line(&mut self, timeout: Duration) -> Result<String, TransportError> {
        match self.lines.recv_timeout(timeout) {
            Ok(Ok(line)) => Ok(line),
            Ok(Err(e)) => Err(TransportError::Io(e)),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_open_missing_device_fails() {
        let connector = DeviceConnector::new("/nonexistent/neo-arm-device");
        assert!(matches!(connector.connect(), Err(TransportError::Io(_))));
    }

    #[test]
    fn test_reads_lines_then_reports_closed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "READY").unwrap();
        writeln!(file, "OK  ").unwrap();
        file.flush().unwrap();

        let mut transport = DeviceTransport::open(file.path()).unwrap();
        let wait = Duration::from_secs(2);
        assert_eq!(transport.recv_line(wait).unwrap(), "READY");
        assert_eq!(transport.recv_line(wait).unwrap(), "OK");
        assert!(matches!(transport.recv_line(wait), Err(TransportError::Closed)));
    }
}
