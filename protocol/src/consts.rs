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

//! Well-known values of the core console protocol

use std::time::Duration;

/// Console port of the first core on a host.
pub const CORE_BASE_PORT: u16 = 5554;

/// Number of console ports a single core occupies (console and adb).
pub const PORTS_PER_CORE: u16 = 2;

/// Maximum number of core processes running simultaneously on one host.
pub const MAX_CORE_PROCS: usize = 16;

/// Per-port probe timeout. Discovery waits twice this long in total.
pub const CORE_PORT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Prompt line the console prints once it is ready for commands.
pub const CONSOLE_PROMPT: &str = "OK";

/// Marker opening a refusal line.
pub const REJECT_MARKER: &str = "KO";

/// Verb that prefixes every service switch command.
pub const SWITCH_VERB: &str = "qemu";

/// Longest console line accepted before the peer is considered broken.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Banner lines tolerated before the console prompt.
pub const MAX_BANNER_LINES: usize = 16;
