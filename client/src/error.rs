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

//! Client error types

use crate::ChannelKind;
use corelink_protocol::CodecError;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for discovery and attach operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised while discovering or attaching to a core
#[derive(Debug, Error)]
pub enum ClientError {
    /// The target string is malformed
    #[error("Invalid core address {target:?}: {reason}")]
    Parse {
        /// Target as supplied by the caller
        target: String,
        /// What is wrong with it
        reason: String,
    },

    /// The host or port cannot be turned into an IPv4/IPv6 address
    #[error("Unable to resolve {target}: {reason}")]
    Resolution {
        /// Host (and port) that failed to resolve
        target: String,
        /// Resolver diagnostic
        reason: String,
    },

    /// Transport level connect failure
    #[error("Unable to connect to {addr}: {source}")]
    Connect {
        /// Address that was dialed
        addr: SocketAddr,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// The core sent something the handshake does not allow
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The core refused a service switch
    #[error("Core refused service {service:?}: {reason}")]
    ServiceRejected {
        /// Wire name of the requested service
        service: String,
        /// Reason given by the core
        reason: String,
    },

    /// The core refused to accept this process as its UI
    #[error("Unable to attach to the core {addr}: {reason}")]
    AttachRejected {
        /// Console address of the core
        addr: SocketAddr,
        /// Reason given by the core
        reason: String,
    },

    /// The primary console failed before the core answered the attach
    /// request
    #[error("Unable to attach to the core {addr}: attach-UI console failed: {source}")]
    AttachConsole {
        /// Console address of the core
        addr: SocketAddr,
        /// Why the console failed
        #[source]
        source: Box<ClientError>,
    },

    /// One of the service channels failed after the console attached
    #[error("Unable to open {channel} channel: {source}")]
    AttachChannel {
        /// The channel that failed
        channel: ChannelKind,
        /// Why it failed
        #[source]
        source: Box<ClientError>,
    },

    /// A bounded wait expired
    #[error("Operation timed out")]
    TimeoutExpired,

    /// The peer closed the connection mid-handshake
    #[error("Connection closed by core")]
    ConnectionClosed,

    /// I/O error on an established connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub(crate) fn parse(target: &str, reason: impl Into<String>) -> Self {
        ClientError::Parse {
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn resolution(target: impl Into<String>, reason: impl ToString) -> Self {
        ClientError::Resolution {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if the error is a transport error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClientError::Connect { .. } | ClientError::ConnectionClosed | ClientError::Io(_)
        )
    }

    /// Check if the error is a handshake content error
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            ClientError::Protocol(_) | ClientError::ServiceRejected { .. }
        )
    }

    /// Check if the error came out of an attach attempt after parsing and
    /// resolution succeeded
    pub fn is_attach_error(&self) -> bool {
        matches!(
            self,
            ClientError::AttachRejected { .. }
                | ClientError::AttachConsole { .. }
                | ClientError::AttachChannel { .. }
        )
    }

    /// The failed channel, for [`ClientError::AttachChannel`]
    pub fn failed_channel(&self) -> Option<ChannelKind> {
        match self {
            ClientError::AttachChannel { channel, .. } => Some(*channel),
            _ => None,
        }
    }
}

impl From<CodecError> for ClientError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Io(e) => e.into(),
            other => ClientError::Protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ClientError::ConnectionClosed.is_connection_error());
        assert!(ClientError::Protocol("x".into()).is_protocol_error());
        assert!(!ClientError::TimeoutExpired.is_connection_error());
        let err = ClientError::AttachChannel {
            channel: ChannelKind::UserEvents,
            source: Box::new(ClientError::TimeoutExpired),
        };
        assert!(err.is_attach_error());
        assert_eq!(err.failed_channel(), Some(ChannelKind::UserEvents));
    }

    #[test]
    fn test_console_failure_is_attach_error() {
        let addr: SocketAddr = "127.0.0.1:5554".parse().unwrap();
        let err = ClientError::AttachConsole {
            addr,
            source: Box::new(ClientError::TimeoutExpired),
        };
        assert!(err.is_attach_error());
        assert!(!err.is_connection_error());
        assert_eq!(err.failed_channel(), None);
        assert_eq!(
            err.to_string(),
            "Unable to attach to the core 127.0.0.1:5554: attach-UI console failed: \
             Operation timed out"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::AttachChannel {
            channel: ChannelKind::CoreCommands,
            source: Box::new(ClientError::ConnectionClosed),
        };
        assert_eq!(
            err.to_string(),
            "Unable to open core-commands channel: Connection closed by core"
        );

        let err = ClientError::parse(":5555", "empty host name");
        assert_eq!(
            err.to_string(),
            "Invalid core address \":5555\": empty host name"
        );
    }

    #[test]
    fn test_codec_error_conversion() {
        let err: ClientError = CodecError::LineTooLong { limit: 16 }.into();
        assert!(err.is_protocol_error());
        let err: ClientError =
            CodecError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).into();
        assert!(err.is_connection_error());
    }
}
