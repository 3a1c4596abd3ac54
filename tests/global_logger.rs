use std::fs;

use logtree::{Level, global, init_global, tree_info};
use serde_json::Value;

// The shared logger is process-wide, so this file holds a single test.
#[test]
fn guard_flushes_and_tears_down_shared_logger() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("global.json");

    let guard = init_global(Level::Info, &file).unwrap();
    assert!(global().is_initialized());
    tree_info!(global(), &["global"], "shared {}", "entry");
    global().log(&["global"], Level::Debug, "filtered");
    drop(guard);

    assert!(!global().is_initialized());
    let value: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    let logs = value["global"]["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["Log"], "shared entry");
}
