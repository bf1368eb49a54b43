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

//! # Corelink Client
//!
//! Discovery of running emulator cores and attachment of a detached UI
//! process to one of them.
//!
//! ## Features
//!
//! - **Core Discovery** - Concurrent, deadline-bounded probing of the console port range
//! - **UI Attachment** - All-or-nothing binding to a core's console and service channels
//! - **Single-Threaded** - Every connection is driven from one task, no spawning
//! - **Explicit State Machines** - Each connection is a [`ConsoleConnector`] stepped one transition at a time
//!
//! ## Quick Start
//!
//! ```no_run
//! use corelink_client::{AttachConfig, ProbeConfig, attach_to_core, list_running_cores};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = list_running_cores(&ProbeConfig::new("localhost")).await?;
//!     println!("{}", report);
//!
//!     if let Some(endpoint) = report.endpoints().first() {
//!         let session = attach_to_core(endpoint, &AttachConfig::default()).await?;
//!         println!("{}", session.summary());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Console Commands
//!
//! ```no_run
//! # use corelink_client::{AttachSession, ClientError};
//! # async fn example(session: &mut AttachSession) -> Result<(), ClientError> {
//! // The primary console stays usable once the UI is attached
//! let reply = session.console_command("avd name").await?;
//! for line in reply {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

mod address;
mod attach;
mod config;
mod connector;
mod error;
mod probe;
mod reactor;

pub use address::{AttachTarget, LOCALHOST, resolve, resolve_all};
pub use attach::{AttachSession, ChannelKind, ServiceChannel, attach_to_core};
pub use config::{AttachConfig, ProbeConfig};
pub use connector::{
    ConnectorMode, ConnectorState, ConsoleConnector, ConsoleStream, Established, HandshakePhase,
    Outcome,
};
pub use error::{ClientError, Result};
pub use probe::{DiscoveryReport, ProbeOutcome, ProbeSet, ProbeSlot, list_running_cores};
pub use reactor::{Reactor, RunOutcome, Token};

// Re-export protocol types callers need to configure and inspect sessions
pub use corelink_protocol::{ConsoleService, FramebufferProtocol, consts};
