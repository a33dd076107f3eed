//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the store's core correctness properties:
//! round-trip storage, size accounting, capacity enforcement, oldest-first
//! eviction, and persistence identity.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use tempfile::TempDir;

use crate::cache::record::ResponseRecord;
use crate::cache::store::CacheStore;

// == Test Configuration ==
const TEST_SIZE_LIMIT: u64 = 4096;

fn fresh_store(size_limit: u64) -> (TempDir, CacheStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = CacheStore::load(dir.path().join("responseCache.dat"), size_limit)
        .expect("empty store");
    (dir, store)
}

/// Record with a deterministic creation time, `seq` seconds after epoch.
fn record_at(key: &str, payload: &str, seq: i64) -> ResponseRecord {
    ResponseRecord::with_created_at(key, payload, Utc.timestamp_opt(seq, 0).unwrap())
}

// == Strategies ==
/// Generates valid cache keys (URL-ish, never containing a newline)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_/:.-]{1,64}"
}

/// Generates payloads small enough to never trip the size-limit rejection
fn valid_payload_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,128}"
}

/// Generates a sequence of cache operations for model-based testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, payload: String },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_payload_strategy())
            .prop_map(|(key, payload)| CacheOp::Set { key, payload }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For all keys k: Get(k) after Set(k, p), with no intervening eviction
    // of k, returns p unchanged.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), payload in valid_payload_strategy()) {
        let (_dir, mut store) = fresh_store(TEST_SIZE_LIMIT);

        store.set(ResponseRecord::new(key.clone(), payload.clone())).unwrap();

        let record = store.get(&key).expect("record present");
        prop_assert_eq!(&record.payload, &payload, "Round-trip payload mismatch");
    }

    // For all operation sequences: the running size counter equals the sum
    // of live payload sizes, and never exceeds the limit after any call.
    #[test]
    fn prop_size_counter_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (_dir, mut store) = fresh_store(TEST_SIZE_LIMIT);
        // Shadow model of what should be live, maintained by replaying the
        // store's own eviction-free semantics plus observed removals
        let mut model: HashMap<String, String> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { key, payload } => {
                    store.set(ResponseRecord::new(key.clone(), payload.clone())).unwrap();
                    model.insert(key, payload);
                }
                CacheOp::Get { key } => {
                    let _ = store.get(&key);
                }
                CacheOp::Remove { key } => {
                    store.remove(&key);
                    model.remove(&key);
                }
            }

            // The model can only drift from the store through eviction;
            // drop model entries the store no longer holds
            let model_keys: Vec<String> = model.keys().cloned().collect();
            for key in model_keys {
                if store.get(key.as_str()).is_none() {
                    model.remove(&key);
                }
            }

            let expected: u64 = model.values().map(|p| p.len() as u64).sum();
            prop_assert_eq!(store.total_bytes(), expected, "Size counter drifted from live records");
            prop_assert!(
                store.total_bytes() <= TEST_SIZE_LIMIT,
                "Size counter {} exceeds limit {}",
                store.total_bytes(),
                TEST_SIZE_LIMIT
            );
        }
    }

    // For all Set sequences under a small limit: the bound holds after
    // every call, even when each call must evict.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec(
            (valid_key_strategy(), "[a-zA-Z0-9]{1,64}"),
            1..100
        )
    ) {
        let limit = 256u64;
        let (_dir, mut store) = fresh_store(limit);

        for (key, payload) in entries {
            store.set(ResponseRecord::new(key, payload)).unwrap();
            prop_assert!(
                store.total_bytes() <= limit,
                "Total {} exceeds limit {}",
                store.total_bytes(),
                limit
            );
        }
    }

    // Removing an absent key succeeds and changes nothing.
    #[test]
    fn prop_remove_absent_is_noop(
        present in valid_key_strategy(),
        absent in valid_key_strategy(),
        payload in valid_payload_strategy()
    ) {
        prop_assume!(present != absent);
        let (_dir, mut store) = fresh_store(TEST_SIZE_LIMIT);
        store.set(ResponseRecord::new(present, payload)).unwrap();

        let before = store.total_bytes();
        prop_assert!(!store.remove(&absent));
        prop_assert_eq!(store.total_bytes(), before, "Counter changed on absent remove");
        prop_assert_eq!(store.len(), 1);
    }

    // Storing V1 then V2 under one key yields V2 and a single live record.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        first in valid_payload_strategy(),
        second in valid_payload_strategy()
    ) {
        let (_dir, mut store) = fresh_store(TEST_SIZE_LIMIT);

        store.set(ResponseRecord::new(key.clone(), first)).unwrap();
        store.set(ResponseRecord::new(key.clone(), second.clone())).unwrap();

        let record = store.get(&key).expect("record present");
        prop_assert_eq!(&record.payload, &second, "Overwrite should return new payload");
        prop_assert_eq!(store.len(), 1, "Overwrite should keep a single record");
    }

    // Eviction removes the oldest creation times first and never the
    // record that triggered it.
    #[test]
    fn prop_eviction_prefers_oldest(record_count in 3usize..12) {
        // Each record is 32 bytes; the limit fits all but one
        let limit = (record_count as u64 - 1) * 32;
        let (_dir, mut store) = fresh_store(limit);
        let payload = "x".repeat(32);

        for i in 0..record_count - 1 {
            store.set(record_at(&format!("key{i}"), &payload, 1000 + i as i64)).unwrap();
        }

        // The trigger record carries the oldest stamp of all, yet survives
        store.set(record_at("trigger", &payload, 1)).unwrap();

        prop_assert!(store.get("trigger").is_some(), "Just-inserted record must survive");
        prop_assert!(store.get("key0").is_none(), "Oldest record should be evicted");
        for i in 1..record_count - 1 {
            prop_assert!(
                store.get(&format!("key{i}")).is_some(),
                "Newer record key{} should survive a single eviction",
                i
            );
        }
    }

    // FlushAll empties the store and a reload of the backing file agrees.
    #[test]
    fn prop_flush_all_empties_store_and_disk(
        entries in prop::collection::vec(
            (valid_key_strategy(), valid_payload_strategy()),
            1..10
        )
    ) {
        let (dir, mut store) = fresh_store(TEST_SIZE_LIMIT);
        for (key, payload) in &entries {
            store.set(ResponseRecord::new(key.clone(), payload.clone())).unwrap();
        }

        store.flush_all().unwrap();

        prop_assert!(store.is_empty());
        prop_assert_eq!(store.total_bytes(), 0);
        for (key, _) in &entries {
            prop_assert!(store.get(key).is_none());
        }

        let reloaded = CacheStore::load(dir.path().join("responseCache.dat"), TEST_SIZE_LIMIT)
            .unwrap();
        prop_assert!(reloaded.is_empty(), "Backing file should hold zero records");
    }
}

// Persistence properties get fewer cases; each one touches the filesystem
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Persist followed by load reproduces the exact record set.
    #[test]
    fn prop_persist_load_identity(
        entries in prop::collection::hash_map(
            valid_key_strategy(),
            valid_payload_strategy(),
            1..16
        )
    ) {
        let (dir, mut store) = fresh_store(TEST_SIZE_LIMIT);
        for (i, (key, payload)) in entries.iter().enumerate() {
            store.set(record_at(key, payload, 1000 + i as i64)).unwrap();
        }
        store.persist().unwrap();

        let mut reloaded = CacheStore::load(dir.path().join("responseCache.dat"), TEST_SIZE_LIMIT)
            .unwrap();
        prop_assert_eq!(reloaded.len(), entries.len());
        prop_assert_eq!(reloaded.total_bytes(), store.total_bytes());
        for (key, payload) in &entries {
            let record = reloaded.get(key).expect("record survives reload");
            prop_assert_eq!(&record.payload, payload);
        }
    }

    // A file truncated at any point loads without error and yields only
    // records that were originally stored.
    #[test]
    fn prop_truncated_file_loads_prefix(
        entries in prop::collection::hash_map(
            valid_key_strategy(),
            "[a-zA-Z0-9]{1,32}",
            2..10
        ),
        cut in 1usize..200
    ) {
        let (dir, mut store) = fresh_store(TEST_SIZE_LIMIT);
        for (i, (key, payload)) in entries.iter().enumerate() {
            store.set(record_at(key, payload, 1000 + i as i64)).unwrap();
        }
        store.persist().unwrap();

        let path = dir.path().join("responseCache.dat");
        let mut bytes = std::fs::read(&path).unwrap();
        let cut = cut.min(bytes.len().saturating_sub(1));
        bytes.truncate(bytes.len() - cut);
        std::fs::write(&path, bytes).unwrap();

        let mut reloaded = CacheStore::load(&path, TEST_SIZE_LIMIT).unwrap();
        prop_assert!(reloaded.len() < entries.len(), "Truncation must drop the damaged tail");
        let keys: Vec<String> = entries.keys().cloned().collect();
        for key in keys {
            if let Some(record) = reloaded.get(&key) {
                prop_assert_eq!(&record.payload, entries.get(record.key.as_str()).unwrap());
            }
        }
    }
}
