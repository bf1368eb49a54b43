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

//! Interpretation of console reply lines

use crate::consts::{CONSOLE_PROMPT, REJECT_MARKER};
use crate::{CodecError, CodecResult};

/// Answer of the core to a service switch command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchReply {
    /// Switch accepted. Carries the settings text, empty when there is none.
    Accepted(String),
    /// Switch refused. Carries the reason given by the core.
    Rejected(String),
}

impl SwitchReply {
    /// Parse a single reply line
    ///
    /// `OK` (with optional trailing settings) and an empty line are
    /// acceptances, `KO` opens a refusal. A marker only counts as a whole
    /// word, so `OKAY` is not an acceptance. Anything else is an
    /// [`CodecError::UnexpectedReply`].
    pub fn parse(line: &str) -> CodecResult<SwitchReply> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(SwitchReply::Accepted(String::new()));
        }
        if let Some(rest) = strip_marker(line, CONSOLE_PROMPT) {
            return Ok(SwitchReply::Accepted(payload(rest)));
        }
        if let Some(rest) = strip_marker(line, REJECT_MARKER) {
            return Ok(SwitchReply::Rejected(payload(rest)));
        }
        Err(CodecError::UnexpectedReply(line.to_string()))
    }

    /// Whether the core accepted the switch
    pub fn is_accepted(&self) -> bool {
        matches!(self, SwitchReply::Accepted(_))
    }
}

/// Remainder of `line` after `marker`, when the marker stands on its own
fn strip_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(marker)?;
    match rest.chars().next() {
        None | Some(':') => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

fn payload(rest: &str) -> String {
    rest.trim_start()
        .strip_prefix(':')
        .unwrap_or(rest)
        .trim()
        .to_string()
}

/// Whether `line` is the console's ready prompt
pub fn is_prompt(line: &str) -> bool {
    line.trim_end() == CONSOLE_PROMPT
}

/// Whether `line` ends the reply to a console command
pub fn is_terminator(line: &str) -> bool {
    is_prompt(line) || strip_marker(line, REJECT_MARKER).is_some()
}
