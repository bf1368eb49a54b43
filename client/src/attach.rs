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

//! Attaching a UI process to a running core
//!
//! Attaching happens in strict order:
//!
//! 1. parse the `host[:port]` target,
//! 2. resolve it to one address,
//! 3. declare the primary console connection as the UI (`attach-UI`),
//! 4. open the framebuffer, user-events, core-commands and ui-commands
//!    channels, each a separate connection switched to its service.
//!
//! The result is all or nothing. If any step fails, every connection opened
//! so far is closed before the error is returned.

use crate::address::AttachTarget;
use crate::connector::{ConsoleConnector, ConsoleStream, Established};
use crate::{AttachConfig, ClientError, Result};
use bytes::BytesMut;
use corelink_protocol::{ConsoleService, FramebufferProtocol, is_terminator};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Service channels opened after the console attached, in opening order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Raw framebuffer stream
    Framebuffer,
    /// User input forwarded to the core
    UserEvents,
    /// Commands from the UI to the core
    CoreCommands,
    /// Commands from the core to the UI
    UiCommands,
}

impl ChannelKind {
    /// Every channel, in the order they are opened
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Framebuffer,
        ChannelKind::UserEvents,
        ChannelKind::CoreCommands,
        ChannelKind::UiCommands,
    ];

    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::Framebuffer => "framebuffer",
            ChannelKind::UserEvents => "user-events",
            ChannelKind::CoreCommands => "core-commands",
            ChannelKind::UiCommands => "ui-commands",
        }
    }

    /// Console service the channel switches to
    pub fn service(self, framebuffer: FramebufferProtocol) -> ConsoleService {
        match self {
            ChannelKind::Framebuffer => ConsoleService::Framebuffer(framebuffer),
            ChannelKind::UserEvents => ConsoleService::UserEvents,
            ChannelKind::CoreCommands => ConsoleService::UiCoreControl,
            ChannelKind::UiCommands => ConsoleService::CoreUiControl,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An open service channel.
///
/// Past the handshake the channel carries its service's own payload, so the
/// console line framing is stripped: the socket is exposed as is, together
/// with any bytes that arrived right behind the reply line.
#[derive(Debug)]
pub struct ServiceChannel {
    kind: ChannelKind,
    peer: SocketAddr,
    stream: Option<TcpStream>,
    pending: BytesMut,
}

impl ServiceChannel {
    fn new(kind: ChannelKind, peer: SocketAddr, stream: ConsoleStream) -> Self {
        let parts = stream.into_parts();
        Self {
            kind,
            peer,
            stream: Some(parts.io),
            pending: parts.read_buf,
        }
    }

    /// Which channel this is
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Address of the core end
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Whether the socket is still held
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Bytes received after the handshake but not yet consumed
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// The socket, while the channel is open
    pub fn stream_mut(&mut self) -> Option<&mut TcpStream> {
        self.stream.as_mut()
    }

    /// Take the socket and the buffered bytes, if the channel is open
    pub fn into_parts(mut self) -> Option<(TcpStream, BytesMut)> {
        let pending = std::mem::take(&mut self.pending);
        self.stream.take().map(|stream| (stream, pending))
    }

    /// Close the channel. Returns whether a socket was closed.
    pub fn close(&mut self) -> bool {
        self.pending.clear();
        self.stream.take().is_some()
    }
}

/// A UI bound to one running core
///
/// Owns the primary console connection, which stays the control channel for
/// the lifetime of the session, plus every service channel.
#[derive(Debug)]
pub struct AttachSession {
    address: SocketAddr,
    base_port: u16,
    settings: String,
    console: Option<ConsoleStream>,
    channels: Vec<ServiceChannel>,
}

impl AttachSession {
    /// Console address of the core
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Console port the session is labelled with
    pub fn base_port(&self) -> u16 {
        self.base_port
    }

    /// Settings text the core sent back when the UI attached
    pub fn settings(&self) -> &str {
        &self.settings
    }

    /// Human readable account of the attachment
    pub fn summary(&self) -> String {
        let mut summary = format!("UI is now attached to the core {}", self.address);
        if !self.settings.is_empty() {
            summary.push_str("\nUI setting for the core:\n");
            summary.push_str(&self.settings);
        }
        summary
    }

    /// Whether the primary console is still open
    pub fn is_console_open(&self) -> bool {
        self.console.is_some()
    }

    /// The channel of `kind`, unless it was taken
    pub fn channel(&self, kind: ChannelKind) -> Option<&ServiceChannel> {
        self.channels.iter().find(|c| c.kind == kind && c.is_open())
    }

    /// Mutable access to the channel of `kind`
    pub fn channel_mut(&mut self, kind: ChannelKind) -> Option<&mut ServiceChannel> {
        self.channels
            .iter_mut()
            .find(|c| c.kind == kind && c.is_open())
    }

    /// Remove a channel from the session, handing it to the caller
    pub fn take_channel(&mut self, kind: ChannelKind) -> Option<ServiceChannel> {
        let index = self.channels.iter().position(|c| c.kind == kind)?;
        Some(self.channels.remove(index))
    }

    /// Number of service channels still open
    pub fn open_channels(&self) -> usize {
        self.channels.iter().filter(|c| c.is_open()).count()
    }

    /// Send a command line on the console and collect the reply, up to and
    /// including the `OK` or `KO` line that ends it.
    pub async fn console_command(&mut self, line: &str) -> Result<Vec<String>> {
        let console = self.console.as_mut().ok_or(ClientError::ConnectionClosed)?;
        console.send(line).await?;

        let mut reply = Vec::new();
        loop {
            match console.next().await {
                Some(Ok(text)) => {
                    let done = is_terminator(&text);
                    reply.push(text);
                    if done {
                        return Ok(reply);
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ClientError::ConnectionClosed),
            }
        }
    }

    /// Close every channel and the console. Returns how many sockets were
    /// closed; calling it again closes nothing.
    pub fn close(&mut self) -> usize {
        let mut closed = 0;
        for channel in self.channels.iter_mut() {
            if channel.close() {
                debug!(channel = %channel.kind, "Closed service channel");
                closed += 1;
            }
        }
        if self.console.take().is_some() {
            debug!(address = %self.address, "Closed core console");
            closed += 1;
        }
        closed
    }
}

/// Attach to the core named by `target` (`host[:port]`).
pub async fn attach_to_core(target: &str, config: &AttachConfig) -> Result<AttachSession> {
    counter!("corelink.attach.attempts").increment(1);
    let result = attach(target, config).await;
    if let Err(e) = &result {
        counter!("corelink.attach.failures").increment(1);
        warn!(core = target, error = %e, "Unable to attach to core");
    }
    result
}

async fn attach(target: &str, config: &AttachConfig) -> Result<AttachSession> {
    let target = AttachTarget::parse(target, config.default_port)?;
    let address = target.resolve().await?;
    info!(core = %target, address = %address, "Attaching UI to core");

    let mut console = ConsoleConnector::channel(address, ConsoleService::AttachUi);
    handshake(&mut console, config.handshake_timeout).await;
    let Established { stream, reply } = match console.into_established() {
        Ok(established) => established,
        Err(ClientError::ServiceRejected { reason, .. }) => {
            return Err(ClientError::AttachRejected { addr: address, reason });
        }
        Err(source) => {
            return Err(ClientError::AttachConsole {
                addr: address,
                source: Box::new(source),
            });
        }
    };

    let mut session = AttachSession {
        address,
        base_port: address.port(),
        settings: reply,
        console: Some(stream),
        channels: Vec::with_capacity(ChannelKind::ALL.len()),
    };

    for kind in ChannelKind::ALL {
        let service = kind.service(config.framebuffer_protocol);
        let mut connector = ConsoleConnector::channel(address, service);
        handshake(&mut connector, config.handshake_timeout).await;
        match connector.into_established() {
            Ok(Established { stream, .. }) => {
                debug!(channel = %kind, "Service channel open");
                session.channels.push(ServiceChannel::new(kind, address, stream));
            }
            Err(e) => {
                counter!("corelink.attach.channel_failures", "channel" => kind.name())
                    .increment(1);
                let closed = session.close();
                debug!(channel = %kind, closed, "Tore down partial session");
                return Err(ClientError::AttachChannel {
                    channel: kind,
                    source: Box::new(e),
                });
            }
        }
    }

    info!("{}", session.summary());
    Ok(session)
}

async fn handshake(connector: &mut ConsoleConnector, limit: Option<Duration>) {
    match limit {
        Some(limit) => {
            if timeout(limit, connector.drive()).await.is_err() {
                connector.expire();
            }
        }
        None => connector.drive().await,
    }
}
