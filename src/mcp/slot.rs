// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! One-shot HTTP response slot for the POST channel.
//!
//! Every POST owns one slot. Whatever path finishes first fills it and every
//! later fill is rejected, so the handler can never write two responses.

use axum::response::Response;
use std::sync::Mutex;
use tokio::sync::oneshot;

pub struct ResponseSlot {
    tx: Mutex<Option<oneshot::Sender<Response>>>,
}

impl ResponseSlot {
    pub fn new() -> (Self, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Deliver the response. Returns false if the slot was already filled.
    pub fn fill(&self, response: Response) -> bool {
        let sender = self.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        match sender {
            Some(tx) => {
                // The receiver may be gone if the client hung up; the slot still counts as used.
                let _ = tx.send(response);
                true
            }
            None => false,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.tx.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }
}
