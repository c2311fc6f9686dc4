//! Trait abstraction for serial port reads to enable testing

use std::future::Future;
use std::io;

/// Trait for serial port read operations
pub trait SerialPortIO: Send {
    /// Read whatever bytes are available into `buf`, waiting for at least one
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialPortIO
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

impl SerialPortIO for TokioSerialPort {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use tokio::io::AsyncReadExt;
        self.port.read(buf).await
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock serial port for testing
    ///
    /// Each queued burst is returned by one `read` call. With nothing queued,
    /// `read` never completes, like an idle line.
    #[derive(Clone, Default)]
    pub struct MockSerialPort {
        pub bursts: Arc<Mutex<VecDeque<Vec<u8>>>>,
        pub read_error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockSerialPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_read(&self, data: Vec<u8>) {
            self.bursts.lock().unwrap().push_back(data);
        }

        pub fn set_read_error(&self, error: io::ErrorKind) {
            *self.read_error.lock().unwrap() = Some(error);
        }
    }

    impl SerialPortIO for MockSerialPort {
        async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let read_error = *self.read_error.lock().unwrap();
            if let Some(error) = read_error {
                return Err(io::Error::new(error, "Mock read error"));
            }

            let burst = self.bursts.lock().unwrap().pop_front();
            match burst {
                Some(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                None => std::future::pending().await,
            }
        }
    }
}
