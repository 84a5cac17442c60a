// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use libfuzzer_sys::fuzz_target;
use mcp_tinybird::core::dispatch::McpRequest;
use mcp_tinybird::core::models::IncomingMessage;

fuzz_target!(|data: &[u8]| {
    // Frame classification and typed request decoding must reject, not crash.
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    if let Ok(IncomingMessage::Request(req)) = IncomingMessage::classify(value) {
        let _ = McpRequest::parse(&req.method, req.params);
    }
});
