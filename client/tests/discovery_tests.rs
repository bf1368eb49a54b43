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

//! Integration tests for core discovery

mod common;

use common::{CoreScript, MockCore, bind_slots};
use corelink_client::{
    AttachTarget, ClientError, ProbeConfig, ProbeOutcome, ProbeSet, list_running_cores,
};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, MutexGuard};
use tracing_test::traced_test;

// Probing scans a port range, so tests that bind listeners must not overlap.
static SERIAL: Mutex<()> = Mutex::const_new(());

async fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().await
}

fn config(host: &str, base: u16, max_cores: usize) -> ProbeConfig {
    ProbeConfig::new(host)
        .with_base_port(base)
        .with_max_cores(max_cores)
        .with_port_timeout(Duration::from_millis(500))
}

#[tokio::test]
#[traced_test]
async fn reports_listening_slots_on_localhost() {
    let _guard = serial().await;
    let (base, _listeners) = bind_slots(&[0, 2]).await;

    let report = list_running_cores(&config("localhost", base, 4))
        .await
        .unwrap();

    assert_eq!(
        report.endpoints(),
        vec![
            format!("localhost:{}", base),
            format!("localhost:{}", base + 4)
        ]
    );
    assert_eq!(report.probed, 4);
    assert!(!report.deadline_expired);
}

#[tokio::test]
async fn reports_exactly_the_live_slots() {
    let _guard = serial().await;
    for slots in [vec![1usize, 3], vec![0, 1, 2, 3, 4, 5], vec![5]] {
        let (base, _listeners) = bind_slots(&slots).await;
        let report = list_running_cores(&config("127.0.0.1", base, 6))
            .await
            .unwrap();
        let expected: Vec<u16> = slots.iter().map(|s| base + 2 * *s as u16).collect();
        assert_eq!(report.ports, expected, "slots {:?}", slots);
    }
}

#[tokio::test]
async fn reports_nothing_when_no_core_runs() {
    let _guard = serial().await;
    let (base, listeners) = bind_slots(&[0]).await;
    drop(listeners);

    let started = Instant::now();
    let report = list_running_cores(&config("127.0.0.1", base, 16))
        .await
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(report.probed, 16);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(
        report.to_string(),
        "There were no running emulator core processes found on 127.0.0.1."
    );
}

#[tokio::test]
async fn silent_consoles_are_cut_off_at_the_deadline() {
    let _guard = serial().await;
    let (base, listeners) = bind_slots(&[0, 1]).await;
    let mut listeners = listeners.into_iter();
    let silent = MockCore::serve(listeners.next().unwrap(), CoreScript::new().mute());
    let live = MockCore::serve(listeners.next().unwrap(), CoreScript::new());

    let config = ProbeConfig::new("127.0.0.1")
        .with_base_port(base)
        .with_max_cores(3)
        .with_port_timeout(Duration::from_millis(150))
        .with_verify_greeting(true);

    let started = Instant::now();
    let report = list_running_cores(&config).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.ports, vec![live.port()]);
    assert!(report.deadline_expired);
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_millis(300) + Duration::from_secs(1));

    // The silent probe's socket was dropped at the deadline
    assert!(silent.wait_closed(1).await);
    assert!(live.wait_closed(1).await);
}

#[tokio::test]
async fn probe_set_marks_every_slot() {
    let _guard = serial().await;
    let (base, _listeners) = bind_slots(&[1]).await;
    let config = config("127.0.0.1", base, 3);

    let mut probes = ProbeSet::new(format!("127.0.0.1:{}", base).parse().unwrap(), &config);
    let outcome = probes.run().await;

    assert!(!outcome.deadline_expired());
    let outcomes: Vec<ProbeOutcome> = probes.slots().iter().map(|s| s.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            ProbeOutcome::Absent,
            ProbeOutcome::Alive,
            ProbeOutcome::Absent
        ]
    );
    assert_eq!(probes.alive_ports(), vec![base + 2]);
}

#[tokio::test]
async fn unresolvable_host_aborts_discovery() {
    let result = list_running_cores(&ProbeConfig::new("")).await;
    assert!(matches!(result, Err(ClientError::Resolution { .. })));
}

#[tokio::test]
async fn greeting_is_not_required_by_default() {
    let _guard = serial().await;
    // A bare listener never prints a banner, yet counts as a live core
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let report = list_running_cores(&config("127.0.0.1", port, 1))
        .await
        .unwrap();
    assert_eq!(report.ports, vec![port]);
}

#[tokio::test]
async fn ipv6_endpoints_can_be_attached_to() {
    let _guard = serial().await;
    // Hosts without an IPv6 loopback have nothing to check.
    let Ok(listener) = TcpListener::bind("[::1]:0").await else {
        return;
    };
    let port = listener.local_addr().unwrap().port();

    let report = list_running_cores(&config("::1", port, 1)).await.unwrap();

    assert_eq!(report.endpoints(), vec![format!("[::1]:{}", port)]);
    let target = AttachTarget::parse(&report.endpoints()[0], 5554).unwrap();
    assert_eq!(target.host, "::1");
    assert_eq!(target.port, port);
}
