// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A one-shot external-cancellation signal, wired into the watchdog's
//! highest-priority origin (`signal > health > policy`).

use tokio::sync::watch;

#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelToken { rx })
    }

    /// Signal cancellation. Idempotent; safe to call from a Ctrl-C handler.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new().0
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is signalled; never resolves otherwise.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Sender dropped without ever cancelling: stays pending forever,
                // matching "no cancellation requested".
                std::future::pending::<()>().await;
            }
        }
    }
}
