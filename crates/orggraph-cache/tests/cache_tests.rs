use orggraph_cache::{request_fingerprint, ResultCache};
use orggraph_core::AnalyticsRequest;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn fingerprinted_requests_share_cache_entries() {
    let cache = ResultCache::new(10, Duration::from_secs(60));

    let first = AnalyticsRequest::centrality("degree", Some("Person".into()), 10);
    let repeat = AnalyticsRequest::centrality("degree", Some("Person".into()), 10);

    cache.put(&request_fingerprint(&first), "ranked".to_string());
    assert_eq!(
        cache.get(&request_fingerprint(&repeat)),
        Some("ranked".to_string())
    );

    let narrower = AnalyticsRequest::centrality("degree", Some("Team".into()), 10);
    assert_eq!(cache.get(&request_fingerprint(&narrower)), None);
}

#[test]
fn pattern_invalidation_targets_one_operation() {
    let cache = ResultCache::new(10, Duration::from_secs(60));

    let centrality = AnalyticsRequest::centrality("degree", None, 10);
    let stats = AnalyticsRequest::stats(None, None, 1000);
    cache.put(&request_fingerprint(&centrality), "c".to_string());
    cache.put(&request_fingerprint(&stats), "s".to_string());

    assert_eq!(cache.invalidate(Some("centrality")), 1);
    assert_eq!(cache.get(&request_fingerprint(&centrality)), None);
    assert_eq!(cache.get(&request_fingerprint(&stats)), Some("s".to_string()));
}

#[test]
fn concurrent_readers_and_writers_stay_consistent() {
    let cache = Arc::new(ResultCache::new(50, Duration::from_secs(60)));

    let mut handles = Vec::new();
    for worker in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(std::thread::spawn(move || {
            for i in 0..100 {
                let key = format!("stats:summary:{:04}", i % 60);
                if worker % 2 == 0 {
                    cache.put(&key, format!("value-{i}"));
                } else {
                    let _ = cache.get(&key);
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Capacity is a hard bound regardless of interleaving.
    assert!(cache.len() <= 50);
    let stats = cache.stats();
    assert_eq!(stats.max_entries, 50);
    assert!(stats.hits + stats.misses > 0);
}
