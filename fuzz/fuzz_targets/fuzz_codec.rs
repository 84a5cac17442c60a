// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use mcp_tinybird::mcp::codec::McpCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Drain every frame the input yields, then flush as if the stream ended.
    let mut codec = McpCodec::new();
    let mut buffer = BytesMut::from(data);

    while let Ok(Some(_)) = codec.decode(&mut buffer) {}
    let _ = codec.decode_eof(&mut buffer);
});
