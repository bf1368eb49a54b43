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

//! Single-threaded readiness dispatcher
//!
//! The reactor owns a registration table of in-flight tasks, each keyed by a
//! caller supplied [`Token`]. All tasks are polled from the task that calls
//! [`Reactor::run_until`]; nothing is spawned, so registered tasks need not
//! be `Send` and the table needs no locking. A task's output is dispatched to
//! the caller's handler as soon as it completes. When the deadline passes,
//! every task still registered is dropped in place, which releases whatever
//! sockets it owns without further I/O.

use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::future::Future;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

/// Registration key handed back with each completed task
pub type Token = usize;

/// How a [`Reactor::run_until`] call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every registered task completed
    Drained,
    /// The deadline passed first; `outstanding` tasks were dropped
    DeadlineExpired {
        /// Number of tasks still registered at the deadline
        outstanding: usize,
    },
}

impl RunOutcome {
    /// Whether the deadline cut the run short
    pub fn deadline_expired(&self) -> bool {
        matches!(self, RunOutcome::DeadlineExpired { .. })
    }
}

/// Cooperative event loop over a set of registered tasks
pub struct Reactor<T> {
    registrations: FuturesUnordered<LocalBoxFuture<'static, (Token, T)>>,
}

impl<T: 'static> Default for Reactor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Reactor<T> {
    /// Create an empty reactor
    pub fn new() -> Self {
        Self {
            registrations: FuturesUnordered::new(),
        }
    }

    /// Register a task under `token`
    pub fn register<F>(&mut self, token: Token, task: F)
    where
        F: Future<Output = T> + 'static,
    {
        self.registrations
            .push(async move { (token, task.await) }.boxed_local());
    }

    /// Number of tasks currently registered
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether no task is registered
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Run until every task completed or `deadline` passed, whichever first.
    ///
    /// `dispatch` is invoked once per completed task, in completion order.
    /// Tasks still pending at the deadline are deregistered and dropped.
    pub async fn run_until<D>(&mut self, deadline: Instant, mut dispatch: D) -> RunOutcome
    where
        D: FnMut(Token, T),
    {
        let expiry = sleep_until(deadline);
        tokio::pin!(expiry);

        loop {
            if self.registrations.is_empty() {
                return RunOutcome::Drained;
            }
            tokio::select! {
                biased;
                Some((token, output)) = self.registrations.next() => {
                    trace!(token, "Dispatching completed task");
                    dispatch(token, output);
                }
                _ = &mut expiry => {
                    let outstanding = self.registrations.len();
                    trace!(outstanding, "Deadline expired, dropping pending tasks");
                    self.registrations.clear();
                    return RunOutcome::DeadlineExpired { outstanding };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_drains_ready_tasks() {
        let mut reactor = Reactor::new();
        for token in 0..4 {
            reactor.register(token, async move { token * 10 });
        }
        assert_eq!(reactor.len(), 4);

        let mut seen = Vec::new();
        let outcome = reactor
            .run_until(Instant::now() + Duration::from_secs(1), |token, value| {
                seen.push((token, value))
            })
            .await;

        assert_eq!(outcome, RunOutcome::Drained);
        seen.sort();
        assert_eq!(seen, vec![(0, 0), (1, 10), (2, 20), (3, 30)]);
        assert!(reactor.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_drops_pending_tasks() {
        let mut reactor = Reactor::new();
        reactor.register(0, async { 1u8 });
        reactor.register(1, futures::future::pending::<u8>());
        reactor.register(2, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            3u8
        });

        let mut seen = Vec::new();
        let outcome = reactor
            .run_until(Instant::now() + Duration::from_secs(5), |token, _| {
                seen.push(token)
            })
            .await;

        assert_eq!(outcome, RunOutcome::DeadlineExpired { outstanding: 2 });
        assert!(outcome.deadline_expired());
        assert_eq!(seen, vec![0]);
        assert!(reactor.is_empty());
    }

    #[tokio::test]
    async fn test_empty_reactor_drains_immediately() {
        let mut reactor: Reactor<()> = Reactor::new();
        let outcome = reactor
            .run_until(Instant::now(), |_, _| unreachable!())
            .await;
        assert_eq!(outcome, RunOutcome::Drained);
    }
}
