//! Engine tests.
//!
//! Most tests run on a paused tokio clock so retry and poll timings are
//! exact. The SQLite end-to-end tests use real time.
//!
//! - `harness.rs`    - Mock delivery API, recording failure handler, TestHarness
//! - `dispatch.rs`   - Poller claims, double-dispatch guard, concurrency cap
//! - `retry.rs`      - Transient failures and the fixed retry interval
//! - `escalation.rs` - Permanent failures, data errors, failure handlers
//! - `lifecycle.rs`  - start/stop, drain bound, restart
//! - `janitor.rs`    - Processed record sweeping
//! - `content.rs`    - Enqueue paths and payload shapes
//! - `sqlite.rs`     - End-to-end over the SQLite store

mod content;
mod lifecycle;
mod retry;
