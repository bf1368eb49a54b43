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

//! Scripted stand-in for a core console

#![allow(dead_code)]

use corelink_protocol::{ConsoleCodec, ConsoleService};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

pub const BANNER: &str = "Android Console: type 'help' for a list of commands";

/// How the mock core answers a switch command
#[derive(Debug, Clone)]
pub enum Reply {
    /// `OK`, with settings text when non-empty
    Accept(String),
    /// `KO: <reason>`
    Reject(String),
    /// Never answer
    Silent,
    /// Drop the connection
    Hangup,
}

/// Per-service replies, accepting anything not listed
#[derive(Debug, Clone, Default)]
pub struct CoreScript {
    replies: HashMap<ConsoleService, Reply>,
    greeting: bool,
}

impl CoreScript {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            greeting: true,
        }
    }

    pub fn reply(mut self, service: ConsoleService, reply: Reply) -> Self {
        self.replies.insert(service, reply);
        self
    }

    /// Accept connections but never print the console banner
    pub fn mute(mut self) -> Self {
        self.greeting = false;
        self
    }

    fn reply_for(&self, service: &ConsoleService) -> Reply {
        self.replies
            .get(service)
            .cloned()
            .unwrap_or(Reply::Accept(String::new()))
    }
}

pub struct MockCore {
    addr: SocketAddr,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    switches: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl MockCore {
    pub async fn spawn(script: CoreScript) -> MockCore {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::serve(listener, script)
    }

    pub fn serve(listener: TcpListener, script: CoreScript) -> MockCore {
        let addr = listener.local_addr().unwrap();
        let opened = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let switches = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let opened = opened.clone();
            let closed = closed.clone();
            let switches = switches.clone();
            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    opened.fetch_add(1, Ordering::SeqCst);
                    let script = script.clone();
                    let closed = closed.clone();
                    let switches = switches.clone();
                    tokio::spawn(async move {
                        serve_connection(socket, script, switches).await;
                        closed.fetch_add(1, Ordering::SeqCst);
                    });
                }
            })
        };

        MockCore {
            addr,
            opened,
            closed,
            switches,
            task,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Service names requested so far, in arrival order
    pub fn switches(&self) -> Vec<String> {
        self.switches.lock().unwrap().clone()
    }

    /// Wait until at least `count` connections were closed by the client
    pub async fn wait_closed(&self, count: usize) -> bool {
        for _ in 0..200 {
            if self.closed() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for MockCore {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(
    socket: TcpStream,
    script: CoreScript,
    switches: Arc<Mutex<Vec<String>>>,
) {
    let mut framed = Framed::new(socket, ConsoleCodec::new());
    if script.greeting {
        if framed.send(BANNER).await.is_err() || framed.send("OK").await.is_err() {
            return;
        }
    }

    while let Some(Ok(line)) = framed.next().await {
        let Some(name) = line.strip_prefix("qemu ") else {
            // Plain console command: echo it back, then the prompt
            let echo = format!("echo {}", line);
            if framed.send(echo.as_str()).await.is_err() || framed.send("OK").await.is_err() {
                return;
            }
            continue;
        };
        switches.lock().unwrap().push(name.to_string());
        let reply = match name.parse::<ConsoleService>() {
            Ok(service) => script.reply_for(&service),
            Err(_) => Reply::Reject(format!("unknown service {}", name)),
        };
        let line = match reply {
            Reply::Accept(settings) if settings.is_empty() => "OK".to_string(),
            Reply::Accept(settings) => format!("OK: {}", settings),
            Reply::Reject(reason) => format!("KO: {}", reason),
            Reply::Silent => continue,
            Reply::Hangup => return,
        };
        if framed.send(line.as_str()).await.is_err() {
            return;
        }
    }
}

/// Listeners bound on `127.0.0.1` at `base + 2 * slot` for each of `slots`.
///
/// Retries with a fresh base until every slot port can be bound.
pub async fn bind_slots(slots: &[usize]) -> (u16, Vec<TcpListener>) {
    let first = *slots.first().expect("at least one slot");
    for _ in 0..64 {
        let anchor = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = anchor.local_addr().unwrap().port();
        let Some(base) = port.checked_sub(2 * first as u16) else {
            continue;
        };
        let mut listeners = vec![anchor];
        let mut ok = true;
        for slot in &slots[1..] {
            let Some(port) = base.checked_add(2 * *slot as u16) else {
                ok = false;
                break;
            };
            match TcpListener::bind(("127.0.0.1", port)).await {
                Ok(listener) => listeners.push(listener),
                Err(_) => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            return (base, listeners);
        }
    }
    panic!("unable to bind listeners for slots {:?}", slots);
}

/// A local port with nothing listening on it
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
