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

//! Error types for the console protocol

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while framing or interpreting console traffic
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error from the underlying stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer sent a line longer than the configured limit
    #[error("Console line exceeds {limit} bytes")]
    LineTooLong {
        /// Configured maximum line length
        limit: usize,
    },

    /// The peer sent a line that is not valid UTF-8
    #[error("Console line is not valid UTF-8")]
    InvalidUtf8,

    /// A reply line that is neither an acceptance nor a refusal
    #[error("Unexpected console reply: {0:?}")]
    UnexpectedReply(String),

    /// A service name this protocol does not know
    #[error("Unknown console service: {0:?}")]
    UnknownService(String),
}
