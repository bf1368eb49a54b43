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

//! # Emulator Core Console Protocol
//!
//! Wire-level pieces shared by everything that talks to a running emulator
//! core over its console port.
//!
//! ## Overview
//!
//! A core process listens on a console port (`5554`, `5556`, ...). Every
//! connection to that port starts as a plain text console: the core prints a
//! banner followed by an `OK` prompt line. A client may then issue a
//! *switch* command, `qemu <service>`, which turns that same connection into
//! a dedicated service channel. The core answers the switch with a single
//! line:
//!
//! - `OK` optionally followed by settings text: the switch was accepted.
//! - `KO` followed by a reason: the switch was refused.
//!
//! After an accepted switch the connection belongs to the selected service.
//! The framebuffer service streams raw pixels, the control services exchange
//! their own command frames. Those payloads are opaque to this crate.
//!
//! ## Core Components
//!
//! - [`ConsoleCodec`]: a [`tokio_util::codec`] line codec for the console.
//! - [`ConsoleCommand`]: the frames a client writes to the console.
//! - [`ConsoleService`]: the logical services a connection may switch to.
//! - [`SwitchReply`]: the parsed answer to a switch command.
//!
//! ## Usage Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use corelink_protocol::{ConsoleCodec, ConsoleCommand, ConsoleService, SwitchReply};
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut codec = ConsoleCodec::new();
//! let mut out = BytesMut::new();
//! codec.encode(ConsoleCommand::Switch(ConsoleService::AttachUi), &mut out).unwrap();
//! assert_eq!(&out[..], b"qemu attach-UI\r\n");
//!
//! let mut input = BytesMut::from(&b"OK\r\n"[..]);
//! let line = codec.decode(&mut input).unwrap().unwrap();
//! assert_eq!(SwitchReply::parse(&line).unwrap(), SwitchReply::Accepted(String::new()));
//! ```

#![warn(missing_docs, rust_2018_idioms)]

mod codec;
pub mod consts;
mod error;
mod reply;
mod service;

pub use codec::{ConsoleCodec, ConsoleCommand};
pub use error::{CodecError, CodecResult};
pub use reply::{SwitchReply, is_prompt, is_terminator};
pub use service::{ConsoleService, FramebufferProtocol};
