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

//! Console connection state machine
//!
//! A [`ConsoleConnector`] drives one connection to a core console from the
//! initial connect through the service handshake:
//!
//! ```text
//! Connecting ──► Handshaking ──► Complete
//!      │              │
//!      └──────────────┴────────► Failed
//! ```
//!
//! Each call to [`ConsoleConnector::step`] performs exactly one transition.
//! The connector never retries. Once terminal, it is never stepped again and
//! its socket is closed, except for a completed service channel whose socket
//! is handed to the caller through [`ConsoleConnector::into_established`].

use crate::{ClientError, Result};
use corelink_protocol::consts::MAX_BANNER_LINES;
use corelink_protocol::{ConsoleCodec, ConsoleCommand, ConsoleService, SwitchReply, is_prompt};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

/// Line-framed console connection
pub type ConsoleStream = Framed<TcpStream, ConsoleCodec>;

/// Progress inside the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Reading the console banner, waiting for the prompt
    AwaitingPrompt {
        /// Banner lines consumed so far
        banner_lines: usize,
    },
    /// Switch command sent, waiting for the reply line
    AwaitingReply,
}

/// Connector state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    /// TCP connect in flight
    Connecting,
    /// Connected, exchanging the handshake
    Handshaking(HandshakePhase),
    /// Handshake finished successfully
    Complete,
    /// Connect or handshake failed
    Failed,
}

impl ConnectorState {
    /// Whether the state is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectorState::Complete | ConnectorState::Failed)
    }

    /// Whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: ConnectorState) -> bool {
        use ConnectorState::*;
        matches!(
            (self, next),
            (Connecting, Handshaking(_) | Failed)
                | (Handshaking(_), Handshaking(_) | Complete | Failed)
        )
    }
}

/// Coarse result of a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Still connecting or handshaking
    Pending,
    /// Reached [`ConnectorState::Complete`]
    Succeeded,
    /// Reached [`ConnectorState::Failed`]
    Failed,
}

/// What the connector is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorMode {
    /// Liveness probe. A successful connect is enough unless
    /// `verify_greeting` asks for the console prompt as well.
    Probe {
        /// Also wait for the console prompt
        verify_greeting: bool,
    },
    /// Switch the connection to a console service
    Channel(ConsoleService),
}

/// A completed service channel handed over by its connector
#[derive(Debug)]
pub struct Established {
    /// Console connection now owned by the service
    pub stream: ConsoleStream,
    /// Text following the acceptance marker
    pub reply: String,
}

/// One connection attempt to a core console
#[derive(Debug)]
pub struct ConsoleConnector {
    address: SocketAddr,
    mode: ConnectorMode,
    state: ConnectorState,
    stream: Option<ConsoleStream>,
    reply: Option<String>,
    failure: Option<ClientError>,
}

impl ConsoleConnector {
    /// Create a connector in [`ConnectorState::Connecting`]
    pub fn new(address: SocketAddr, mode: ConnectorMode) -> Self {
        Self {
            address,
            mode,
            state: ConnectorState::Connecting,
            stream: None,
            reply: None,
            failure: None,
        }
    }

    /// Create a liveness probe
    pub fn probe(address: SocketAddr, verify_greeting: bool) -> Self {
        Self::new(address, ConnectorMode::Probe { verify_greeting })
    }

    /// Create a service channel connector
    pub fn channel(address: SocketAddr, service: ConsoleService) -> Self {
        Self::new(address, ConnectorMode::Channel(service))
    }

    /// Address being dialed
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Port being dialed
    pub fn port(&self) -> u16 {
        self.address.port()
    }

    /// What the connector is for
    pub fn mode(&self) -> ConnectorMode {
        self.mode
    }

    /// Current state
    pub fn state(&self) -> ConnectorState {
        self.state
    }

    /// Terminal outcome, [`Outcome::Pending`] until a terminal state
    pub fn outcome(&self) -> Outcome {
        match self.state {
            ConnectorState::Complete => Outcome::Succeeded,
            ConnectorState::Failed => Outcome::Failed,
            _ => Outcome::Pending,
        }
    }

    /// Reply text of a completed channel handshake
    pub fn reply(&self) -> Option<&str> {
        self.reply.as_deref()
    }

    /// Why the connector failed
    pub fn failure(&self) -> Option<&ClientError> {
        self.failure.as_ref()
    }

    /// Whether the connector still owns an open socket
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Step until a terminal state is reached
    pub async fn drive(&mut self) {
        while !self.state.is_terminal() {
            self.step().await;
        }
    }

    /// Perform one transition and return the new state
    pub async fn step(&mut self) -> ConnectorState {
        match self.state {
            ConnectorState::Connecting => self.on_connecting().await,
            ConnectorState::Handshaking(HandshakePhase::AwaitingPrompt { banner_lines }) => {
                self.on_banner(banner_lines).await
            }
            ConnectorState::Handshaking(HandshakePhase::AwaitingReply) => self.on_reply().await,
            ConnectorState::Complete | ConnectorState::Failed => {}
        }
        self.state
    }

    /// Fail a connector whose time ran out, without further I/O
    pub fn expire(&mut self) {
        if !self.state.is_terminal() {
            self.fail(ClientError::TimeoutExpired);
        }
    }

    /// Close the socket. Returns whether a socket was actually closed;
    /// any call after the first is a no-op.
    pub fn close(&mut self) -> bool {
        match self.stream.take() {
            Some(stream) => {
                trace!(port = self.port(), "Closing console socket");
                drop(stream);
                true
            }
            None => false,
        }
    }

    /// Hand over the socket of a completed channel, or return the failure
    pub fn into_established(mut self) -> Result<Established> {
        match (self.state, self.stream.take()) {
            (ConnectorState::Complete, Some(stream)) => Ok(Established {
                stream,
                reply: self.reply.take().unwrap_or_default(),
            }),
            (ConnectorState::Complete, None) => Err(ClientError::ConnectionClosed),
            (ConnectorState::Failed, _) => Err(self
                .failure
                .take()
                .unwrap_or(ClientError::ConnectionClosed)),
            (_, _) => Err(ClientError::Protocol(format!(
                "handshake with {} did not finish",
                self.address
            ))),
        }
    }

    async fn on_connecting(&mut self) {
        match TcpStream::connect(self.address).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    trace!(port = self.port(), error = %e, "Unable to set TCP_NODELAY");
                }
                self.stream = Some(Framed::new(stream, ConsoleCodec::new()));
                self.transition(ConnectorState::Handshaking(HandshakePhase::AwaitingPrompt {
                    banner_lines: 0,
                }));
                if self.mode == (ConnectorMode::Probe { verify_greeting: false }) {
                    self.complete(None);
                }
            }
            Err(source) => self.fail(ClientError::Connect {
                addr: self.address,
                source,
            }),
        }
    }

    async fn on_banner(&mut self, banner_lines: usize) {
        let line = match self.read_line().await {
            Ok(line) => line,
            Err(e) => return self.fail(e),
        };

        if is_prompt(&line) {
            match self.mode {
                ConnectorMode::Probe { .. } => self.complete(None),
                ConnectorMode::Channel(service) => {
                    match self.send(ConsoleCommand::Switch(service)).await {
                        Ok(()) => {
                            self.transition(ConnectorState::Handshaking(
                                HandshakePhase::AwaitingReply,
                            ));
                        }
                        Err(e) => self.fail(e),
                    }
                }
            }
        } else if banner_lines + 1 >= MAX_BANNER_LINES {
            self.fail(ClientError::Protocol(format!(
                "no console prompt after {} lines",
                MAX_BANNER_LINES
            )));
        } else {
            trace!(port = self.port(), line = %line, "Console banner");
            self.transition(ConnectorState::Handshaking(HandshakePhase::AwaitingPrompt {
                banner_lines: banner_lines + 1,
            }));
        }
    }

    async fn on_reply(&mut self) {
        let line = match self.read_line().await {
            Ok(line) => line,
            Err(e) => return self.fail(e),
        };
        match SwitchReply::parse(&line) {
            Ok(SwitchReply::Accepted(settings)) => self.complete(Some(settings)),
            Ok(SwitchReply::Rejected(reason)) => {
                let service = match self.mode {
                    ConnectorMode::Channel(service) => service.to_string(),
                    ConnectorMode::Probe { .. } => String::new(),
                };
                self.fail(ClientError::ServiceRejected { service, reason })
            }
            Err(e) => self.fail(e.into()),
        }
    }

    async fn read_line(&mut self) -> Result<String> {
        let stream = self.stream.as_mut().ok_or(ClientError::ConnectionClosed)?;
        match stream.next().await {
            Some(Ok(line)) => Ok(line),
            Some(Err(e)) => Err(e.into()),
            None => Err(ClientError::ConnectionClosed),
        }
    }

    async fn send(&mut self, command: ConsoleCommand) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(ClientError::ConnectionClosed)?;
        stream.send(command).await?;
        Ok(())
    }

    fn transition(&mut self, next: ConnectorState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal connector transition {:?} -> {:?}",
            self.state,
            next
        );
        trace!(port = self.port(), from = ?self.state, to = ?next, "Connector transition");
        self.state = next;
    }

    fn complete(&mut self, reply: Option<String>) {
        self.transition(ConnectorState::Complete);
        self.reply = reply;
        if let ConnectorMode::Probe { .. } = self.mode {
            self.close();
        }
        debug!(port = self.port(), mode = ?self.mode, "Console handshake complete");
    }

    fn fail(&mut self, error: ClientError) {
        self.transition(ConnectorState::Failed);
        counter!("corelink.connector.failures").increment(1);
        debug!(port = self.port(), mode = ?self.mode, error = %error, "Console connector failed");
        self.failure = Some(error);
        self.close();
    }
}
