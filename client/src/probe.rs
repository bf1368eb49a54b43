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

//! Discovery of running core processes
//!
//! Every core occupies two consecutive ports starting at
//! `base + 2 * slot`. Discovery probes each slot's console port at once,
//! from a single task, under one shared deadline. A slot whose probe has not
//! completed by the deadline counts as empty.

use crate::address::{AttachTarget, resolve};
use crate::connector::{ConsoleConnector, Outcome};
use crate::reactor::{Reactor, RunOutcome};
use crate::{ProbeConfig, Result};
use metrics::{counter, histogram};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Result of probing one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Probe still running
    Pending,
    /// A console answered
    Alive,
    /// Refused, failed or timed out
    Absent,
}

/// One candidate console port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSlot {
    /// Slot index
    pub slot: usize,
    /// Console port of the slot
    pub port: u16,
    /// Probe result
    pub outcome: ProbeOutcome,
}

/// A bounded set of concurrent probes against one host
#[derive(Debug)]
pub struct ProbeSet {
    address: SocketAddr,
    slots: Vec<ProbeSlot>,
    deadline: Duration,
    verify_greeting: bool,
}

impl ProbeSet {
    /// Lay out one slot per candidate port of `config` on `address`.
    ///
    /// Slots whose port would overflow the port range are left out.
    pub fn new(address: SocketAddr, config: &ProbeConfig) -> Self {
        let slots = (0..config.max_cores)
            .map_while(|slot| {
                let port = config.slot_port(slot);
                if port.is_none() {
                    warn!(slot, base_port = config.base_port, "Slot beyond port range, skipping");
                }
                port.map(|port| ProbeSlot {
                    slot,
                    port,
                    outcome: ProbeOutcome::Pending,
                })
            })
            .collect();

        Self {
            address,
            slots,
            deadline: config.deadline(),
            verify_greeting: config.verify_greeting,
        }
    }

    /// Every slot, in slot order
    pub fn slots(&self) -> &[ProbeSlot] {
        &self.slots
    }

    /// Probe every slot concurrently and record the outcomes.
    ///
    /// Sockets are all closed by the time this returns.
    pub async fn run(&mut self) -> RunOutcome {
        let mut reactor = Reactor::new();
        for (index, slot) in self.slots.iter().enumerate() {
            let mut address = self.address;
            address.set_port(slot.port);
            let mut connector = ConsoleConnector::probe(address, self.verify_greeting);
            reactor.register(index, async move {
                connector.drive().await;
                connector.outcome()
            });
        }
        counter!("corelink.probes.started").increment(self.slots.len() as u64);

        let slots = &mut self.slots;
        let outcome = reactor
            .run_until(Instant::now() + self.deadline, |index, result| {
                let slot = &mut slots[index];
                slot.outcome = match result {
                    Outcome::Succeeded => ProbeOutcome::Alive,
                    Outcome::Failed | Outcome::Pending => ProbeOutcome::Absent,
                };
                debug!(port = slot.port, outcome = ?slot.outcome, "Probe finished");
            })
            .await;

        for slot in self.slots.iter_mut() {
            if slot.outcome == ProbeOutcome::Pending {
                debug!(port = slot.port, "Probe still pending at deadline");
                slot.outcome = ProbeOutcome::Absent;
            }
        }
        outcome
    }

    /// Ports whose probe succeeded, in slot order
    pub fn alive_ports(&self) -> Vec<u16> {
        self.slots
            .iter()
            .filter(|slot| slot.outcome == ProbeOutcome::Alive)
            .map(|slot| slot.port)
            .collect()
    }
}

/// Outcome of a discovery call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Host as supplied by the caller
    pub host: String,
    /// Console ports of the cores found, in slot order
    pub ports: Vec<u16>,
    /// Number of slots probed
    pub probed: usize,
    /// Whether some probes were cut off by the deadline
    pub deadline_expired: bool,
}

impl DiscoveryReport {
    /// `host:port` of every core found, IPv6 hosts in brackets
    pub fn endpoints(&self) -> Vec<String> {
        self.ports
            .iter()
            .map(|port| AttachTarget::new(&self.host, *port).to_string())
            .collect()
    }

    /// Whether no core was found
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ports.is_empty() {
            return write!(
                f,
                "There were no running emulator core processes found on {}.",
                self.host
            );
        }
        write!(f, "Running emulator core processes:")?;
        for endpoint in self.endpoints() {
            write!(f, "\n{}", endpoint)?;
        }
        Ok(())
    }
}

/// Enumerate the core processes running on `config.host`.
///
/// Only a resolution failure is an error. Ports that refuse, fail the
/// handshake or stay silent until the deadline are simply not reported.
pub async fn list_running_cores(config: &ProbeConfig) -> Result<DiscoveryReport> {
    let started = Instant::now();
    info!(host = %config.host, "Enumerating running core processes");

    let address = resolve(&config.host, config.base_port).await?;
    let mut probes = ProbeSet::new(address, config);
    let outcome = probes.run().await;
    let ports = probes.alive_ports();

    histogram!("corelink.discovery.duration").record(started.elapsed().as_secs_f64());
    counter!("corelink.probes.found").increment(ports.len() as u64);
    if let RunOutcome::DeadlineExpired { outstanding } = outcome {
        debug!(outstanding, "Discovery deadline expired");
    }
    info!(host = %config.host, found = ports.len(), "Discovery finished");

    Ok(DiscoveryReport {
        host: config.host.clone(),
        probed: probes.slots().len(),
        ports,
        deadline_expired: outcome.deadline_expired(),
    })
}
