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

//! Discovery and attach configuration

use corelink_protocol::FramebufferProtocol;
use corelink_protocol::consts::{
    CORE_BASE_PORT, CORE_PORT_TIMEOUT, MAX_CORE_PROCS, PORTS_PER_CORE,
};
use std::time::Duration;

/// Core discovery configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Host to enumerate, a name or an IP address
    pub host: String,

    /// Console port of slot 0
    pub base_port: u16,

    /// Number of slots to probe
    pub max_cores: usize,

    /// Per-port timeout. The whole discovery is bounded by twice this.
    pub port_timeout: Duration,

    /// Require the console prompt in addition to a successful connect
    pub verify_greeting: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            base_port: CORE_BASE_PORT,
            max_cores: MAX_CORE_PROCS,
            port_timeout: CORE_PORT_TIMEOUT,
            verify_greeting: false,
        }
    }
}

impl ProbeConfig {
    /// Create a discovery configuration for the given host
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set the console port of slot 0
    pub fn with_base_port(mut self, port: u16) -> Self {
        self.base_port = port;
        self
    }

    /// Set the number of slots to probe
    pub fn with_max_cores(mut self, max: usize) -> Self {
        self.max_cores = max;
        self
    }

    /// Set the per-port timeout
    pub fn with_port_timeout(mut self, timeout: Duration) -> Self {
        self.port_timeout = timeout;
        self
    }

    /// Require the console prompt before a port counts as alive
    pub fn with_verify_greeting(mut self, enabled: bool) -> Self {
        self.verify_greeting = enabled;
        self
    }

    /// Total time allowed for one discovery call
    pub fn deadline(&self) -> Duration {
        self.port_timeout.saturating_mul(2)
    }

    /// Console port probed for `slot`, if it fits in the port range
    pub fn slot_port(&self, slot: usize) -> Option<u16> {
        let offset = u16::try_from(slot).ok()?.checked_mul(PORTS_PER_CORE)?;
        self.base_port.checked_add(offset)
    }
}

/// UI attachment configuration
#[derive(Debug, Clone)]
pub struct AttachConfig {
    /// Console port used when the target names only a host
    pub default_port: u16,

    /// Bound on each individual handshake (None waits forever)
    pub handshake_timeout: Option<Duration>,

    /// Pixel transport requested from the framebuffer service
    pub framebuffer_protocol: FramebufferProtocol,
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            default_port: CORE_BASE_PORT,
            handshake_timeout: Some(CORE_PORT_TIMEOUT),
            framebuffer_protocol: FramebufferProtocol::Raw,
        }
    }
}

impl AttachConfig {
    /// Create an attach configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the port used for host-only targets
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    /// Set the per-handshake timeout
    pub fn with_handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the framebuffer transport
    pub fn with_framebuffer_protocol(mut self, protocol: FramebufferProtocol) -> Self {
        self.framebuffer_protocol = protocol;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(config.base_port, 5554);
        assert_eq!(config.max_cores, 16);
        assert_eq!(config.deadline(), Duration::from_secs(10));
        assert!(!config.verify_greeting);
    }

    #[test]
    fn test_slot_ports() {
        let config = ProbeConfig::new("localhost");
        assert_eq!(config.slot_port(0), Some(5554));
        assert_eq!(config.slot_port(2), Some(5558));
        assert_eq!(config.slot_port(15), Some(5584));

        let config = config.with_base_port(65530);
        assert_eq!(config.slot_port(2), Some(65534));
        assert_eq!(config.slot_port(3), None);
    }

    #[test]
    fn test_attach_builder() {
        let config = AttachConfig::new()
            .with_default_port(5560)
            .with_handshake_timeout(None)
            .with_framebuffer_protocol(FramebufferProtocol::Shared);
        assert_eq!(config.default_port, 5560);
        assert_eq!(config.handshake_timeout, None);
        assert_eq!(config.framebuffer_protocol, FramebufferProtocol::Shared);
    }
}
