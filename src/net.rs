//! HTTP transport used for the listing and asset requests

use crate::constants::USER_AGENT;
use std::io::{self, Read};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("HTTP {0}")]
    Status(u16),
}

/// A single request/response exchange. The returned reader yields the body
/// with headers already consumed; dropping it closes the connection.
pub trait Transport {
    fn get(&self, url: &str) -> Result<Box<dyn Read + '_>, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// `read_timeout` bounds the whole exchange, body included.
    pub fn new(read_timeout: Duration, accept_invalid_certs: bool) -> reqwest::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(read_timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Box<dyn Read + '_>, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(url = %url, status = %response.status(), "Response received");
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }
        Ok(Box::new(TimeoutAwareBody { response }))
    }
}

/// reqwest reports a stalled body as an `Other` error wrapping its own
/// timeout; surface that as `TimedOut` so readers can tell a stall from a
/// dropped connection.
struct TimeoutAwareBody {
    response: reqwest::blocking::Response,
}

impl Read for TimeoutAwareBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.response.read(buf).map_err(|e| {
            if is_timeout(&e) {
                io::Error::new(io::ErrorKind::TimedOut, e)
            } else {
                e
            }
        })
    }
}

fn is_timeout(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::TimedOut {
        return true;
    }
    let mut source = err.get_ref().map(|e| e as &(dyn std::error::Error + 'static));
    while let Some(e) = source {
        if let Some(re) = e.downcast_ref::<reqwest::Error>() {
            if re.is_timeout() {
                return true;
            }
        }
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = std::error::Error::source(e);
    }
    false
}
