use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum LinkError {
    #[error("could not resolve live-link address '{0}'")]
    Address(String),

    #[error("could not connect to Houdini at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("live-link transfer failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed live-link reply: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Houdini reported an error: {0}")]
    Remote(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveLinkConfig {
    pub address: String,
    pub timeout_ms: u64,
}

impl Default for LiveLinkConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            timeout_ms: 2000,
        }
    }
}

/// Envelope the Houdini side wraps every query answer in.
#[derive(Debug, Deserialize)]
struct Reply {
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the Live-Link server running inside Houdini.
///
/// Each call opens its own connection. A sent script is executed for its side
/// effects; a query script must leave its answer in a variable named `result`.
#[derive(Clone, Debug)]
pub struct LiveLink {
    config: LiveLinkConfig,
}

impl LiveLink {
    pub fn new(config: LiveLinkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LiveLinkConfig {
        &self.config
    }

    fn connect(&self) -> Result<TcpStream, LinkError> {
        let addr = self
            .config
            .address
            .to_socket_addrs()
            .map_err(|_| LinkError::Address(self.config.address.clone()))?
            .next()
            .ok_or_else(|| LinkError::Address(self.config.address.clone()))?;
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|source| LinkError::Connect { addr, source })?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(stream)
    }

    /// Sends the generated Python script to the Houdini Live-Link server.
    pub fn send(&self, script: &str) -> Result<(), LinkError> {
        log::info!("🍜 Houdini Ramen: Sending script via Live-Link...");
        log::debug!("{}", script);
        let mut stream = self.connect()?;
        stream.write_all(script.as_bytes())?;
        stream.shutdown(Shutdown::Write)?;
        log::info!("Live-Link successful! Transferred the script to Houdini.");
        Ok(())
    }

    /// Runs `script` in Houdini and returns the JSON value it stored in `result`.
    pub fn query(&self, script: &str) -> Result<Value, LinkError> {
        log::debug!("live-link query:\n{}", script);
        let mut stream = self.connect()?;
        stream.write_all(script.as_bytes())?;
        stream.shutdown(Shutdown::Write)?;

        let mut raw = String::new();
        stream.read_to_string(&mut raw)?;
        parse_reply(&raw)
    }
}

fn parse_reply(raw: &str) -> Result<Value, LinkError> {
    let reply: Reply = serde_json::from_str(raw.trim())?;
    if reply.ok {
        Ok(reply.result)
    } else {
        Err(LinkError::Remote(
            reply.error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}
