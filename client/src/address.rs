//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Target parsing and address resolution

use crate::{ClientError, Result};
use std::fmt;
use std::net::SocketAddr;
use tokio::net::lookup_host;
use tracing::debug;

/// Host used when a target consists of a bare port number
pub const LOCALHOST: &str = "localhost";

/// A parsed `host[:port]` attach target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachTarget {
    /// Host name or IP literal (IPv6 without brackets)
    pub host: String,
    /// Console port
    pub port: u16,
}

impl AttachTarget {
    /// Parse a textual target.
    ///
    /// Accepted forms are `host`, `host:port`, `port`, `[v6]` and
    /// `[v6]:port`. An unbracketed string with several colons is taken as a
    /// bare IPv6 literal. Missing ports default to `default_port`, a bare
    /// number is a port on [`LOCALHOST`].
    pub fn parse(target: &str, default_port: u16) -> Result<AttachTarget> {
        let text = target.trim();
        if text.is_empty() {
            return Err(ClientError::parse(target, "empty target"));
        }

        if let Some(rest) = text.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| ClientError::parse(target, "missing ']'"))?;
            if host.is_empty() {
                return Err(ClientError::parse(target, "empty host name"));
            }
            let port = match after {
                "" => default_port,
                ":" => return Err(ClientError::parse(target, "empty port")),
                _ => match after.strip_prefix(':') {
                    Some(port) => parse_port(target, port)?,
                    None => return Err(ClientError::parse(target, "unexpected text after ']'")),
                },
            };
            return Ok(AttachTarget::new(host, port));
        }

        match text.matches(':').count() {
            0 if text.bytes().all(|b| b.is_ascii_digit()) => {
                Ok(AttachTarget::new(LOCALHOST, parse_port(target, text)?))
            }
            0 => Ok(AttachTarget::new(text, default_port)),
            1 => {
                let (host, port) = text.split_once(':').unwrap_or((text, ""));
                if host.is_empty() {
                    return Err(ClientError::parse(target, "empty host name"));
                }
                if port.is_empty() {
                    return Err(ClientError::parse(target, "empty port"));
                }
                Ok(AttachTarget::new(host, parse_port(target, port)?))
            }
            _ => Ok(AttachTarget::new(text, default_port)),
        }
    }

    pub(crate) fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    /// Resolve to the first usable address
    pub async fn resolve(&self) -> Result<SocketAddr> {
        resolve(&self.host, self.port).await
    }
}

impl fmt::Display for AttachTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn parse_port(target: &str, text: &str) -> Result<u16> {
    match text.parse::<u16>() {
        Ok(0) | Err(_) => Err(ClientError::resolution(
            target,
            format!("port {:?} is not a number in 1..=65535", text),
        )),
        Ok(port) => Ok(port),
    }
}

/// Resolve `host` to every IPv4/IPv6 stream address, in resolver order
pub async fn resolve_all(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let label = AttachTarget::new(host, port).to_string();
    if host.is_empty() {
        return Err(ClientError::resolution(label, "empty host name"));
    }
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| ClientError::resolution(label.clone(), e))?
        .collect();
    debug!(host, port, candidates = addrs.len(), "Resolved host");
    if addrs.is_empty() {
        return Err(ClientError::resolution(label, "no IPv4 or IPv6 address"));
    }
    Ok(addrs)
}

/// Resolve `host` and pick one candidate.
///
/// The first IPv4 address wins, since core consoles listen on IPv4; a host
/// with only IPv6 addresses yields its first one.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let addrs = resolve_all(host, port).await?;
    Ok(addrs
        .iter()
        .copied()
        .find(SocketAddr::is_ipv4)
        .unwrap_or(addrs[0]))
}
