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

//! Backend call timing.

use crate::core::traits::BackendResult;
use std::future::Future;
use std::time::Instant;
use tracing::{error, info};

/// Await one backend operation, logging its duration and outcome.
pub async fn timed<T, F>(operation: &'static str, call: F) -> BackendResult<T>
where
    F: Future<Output = BackendResult<T>>,
{
    let started = Instant::now();
    let result = call.await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match &result {
        Ok(_) => info!(operation, duration_ms, "Backend call succeeded"),
        Err(e) => error!(operation, duration_ms, error = %e, "Backend call failed"),
    }
    result
}
