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

//! Logical services a console connection can be switched to

use crate::CodecError;
use std::fmt;
use std::str::FromStr;

/// Pixel transport requested from the framebuffer service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FramebufferProtocol {
    /// Unframed raw pixel stream over the socket
    #[default]
    Raw,
    /// Updates through shared memory, notifications over the socket
    Shared,
}

impl FramebufferProtocol {
    /// Wire flag appended to the framebuffer service name
    pub fn flag(self) -> &'static str {
        match self {
            FramebufferProtocol::Raw => "-raw",
            FramebufferProtocol::Shared => "-shared",
        }
    }
}

/// A console service selectable with a switch command
///
/// The display form of each variant is exactly what goes on the wire after
/// the `qemu` verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleService {
    /// Declares the connection as the attached UI's control console
    AttachUi,
    /// Framebuffer updates
    Framebuffer(FramebufferProtocol),
    /// Keyboard, mouse and touch events forwarded from the UI
    UserEvents,
    /// Commands issued by the UI and executed by the core
    UiCoreControl,
    /// Commands issued by the core and executed by the UI
    CoreUiControl,
}

impl ConsoleService {
    /// Wire name of the service without any protocol flag
    pub fn name(&self) -> &'static str {
        match self {
            ConsoleService::AttachUi => "attach-UI",
            ConsoleService::Framebuffer(_) => "framebuffer",
            ConsoleService::UserEvents => "user-events",
            ConsoleService::UiCoreControl => "ui-core-control",
            ConsoleService::CoreUiControl => "core-ui-control",
        }
    }
}

impl fmt::Display for ConsoleService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleService::Framebuffer(protocol) => {
                write!(f, "{} {}", self.name(), protocol.flag())
            }
            _ => f.write_str(self.name()),
        }
    }
}

impl FromStr for ConsoleService {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let flag = parts.next();
        let service = match (name, flag) {
            ("attach-UI", None) => ConsoleService::AttachUi,
            ("framebuffer", None | Some("-raw")) => {
                ConsoleService::Framebuffer(FramebufferProtocol::Raw)
            }
            ("framebuffer", Some("-shared")) => {
                ConsoleService::Framebuffer(FramebufferProtocol::Shared)
            }
            ("user-events", None) => ConsoleService::UserEvents,
            ("ui-core-control", None) => ConsoleService::UiCoreControl,
            ("core-ui-control", None) => ConsoleService::CoreUiControl,
            _ => return Err(CodecError::UnknownService(s.to_string())),
        };
        if parts.next().is_some() {
            return Err(CodecError::UnknownService(s.to_string()));
        }
        Ok(service)
    }
}
