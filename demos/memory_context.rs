//! Memory and context example.
//!
//! Builds a runtime from the environment (see `RECALL_*` variables), caches a
//! few tagged values, runs a short conversation through the context manager
//! and prints the resulting statistics.
//!
//! Run with `RUST_LOG=debug` to see evictions and trims as they happen.

use recall::prelude::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let runtime = MemoryRuntime::new(RecallConfig {
        memory: MemoryConfig::new(1000, 3600),
        context: ContextConfig::new(120, 4),
    })?;

    // Cache
    let memory = runtime.memory();
    for i in 0..12 {
        let tag = if i % 2 == 0 { "session-7" } else { "session-8" };
        let accepted = memory.put_with_tags(
            format!("result:{}", i),
            json!({"run": i, "ct": 21.5 + i as f64, "note": "qPCR replicate"}),
            [tag],
        );
        println!("put result:{} -> {}", i, accepted);
    }

    let rejected = memory.put("huge", json!("x".repeat(600)));
    println!("put huge -> {}", rejected);

    println!("session-8 items: {}", memory.get_items_by_tag("session-8").len());
    println!("cleared session-7: {}", memory.clear_tags(["session-7"]));

    println!("\nStats: {}", serde_json::to_string_pretty(&memory.get_stats())?);
    println!("Usage: {}", serde_json::to_string_pretty(&memory.get_memory_usage())?);

    // Context
    let contexts = runtime.context();
    let turns = [
        (MessageRole::User, "Which primer set worked best?"),
        (MessageRole::Assistant, "Set B had the lowest Ct variance across replicates."),
        (MessageRole::User, "And the melt curves?"),
        (MessageRole::Assistant, "Single peaks for set B; set A showed primer dimers."),
        (MessageRole::User, "Draft the summary."),
    ];
    for (role, content) in turns {
        contexts.add_message("session-7", role, content);
    }

    println!();
    for message in contexts.get_context("session-7") {
        println!("[{}] {}", message.role, message.content);
    }
    println!("\nContext stats: {}", serde_json::to_string_pretty(&contexts.get_context_stats())?);

    Ok(())
}
