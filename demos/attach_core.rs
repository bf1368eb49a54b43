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

//! Attach to a running emulator core and report the session.
//!
//! Usage: `cargo run --example attach_core -- [host:]port`

use corelink_client::{AttachConfig, ChannelKind, attach_to_core};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Some(target) = std::env::args().nth(1) else {
        eprintln!("usage: attach_core [host:]port");
        return ExitCode::from(2);
    };

    let mut session = match attach_to_core(&target, &AttachConfig::default()).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("{}", session.summary());
    for kind in ChannelKind::ALL {
        if let Some(channel) = session.channel(kind) {
            println!("  {} channel open to {}", kind, channel.peer_addr());
        }
    }
    if let Ok(reply) = session.console_command("avd name").await {
        for line in reply {
            println!("  console: {}", line);
        }
    }
    session.close();
    ExitCode::SUCCESS
}
