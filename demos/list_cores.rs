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

//! Enumerate the emulator cores running on a host.
//!
//! Usage: `cargo run --example list_cores -- [host]`

use corelink_client::{ClientError, ProbeConfig, list_running_cores};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let host = std::env::args().nth(1).unwrap_or_else(|| "localhost".to_string());
    println!("Enumerating running core processes.");

    match list_running_cores(&ProbeConfig::new(host)).await {
        Ok(report) => println!("{}", report),
        Err(e @ ClientError::Resolution { .. }) => eprintln!("{}", e),
        Err(e) => eprintln!("Discovery failed: {}", e),
    }
}
