//! Single-flight behaviour of the signal cache under concurrent requests

use market_structure::{
    CacheConfig, CacheStatus, EngineError, InFlightPolicy, SignalBundle, SignalCache, StalenessKey,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strategy_shared::testing::zigzag_series;
use tokio::sync::{oneshot, Notify};
use types::{Candle, Resolution, SeriesKey};

fn key() -> SeriesKey {
    SeriesKey::new("XAUUSD", Resolution::M5)
}

fn window(len: usize) -> Arc<[Candle]> {
    Arc::from(&zigzag_series(200, 100.0, 5.0, 6)[..len])
}

fn cache(in_flight: InFlightPolicy) -> Arc<SignalCache> {
    Arc::new(SignalCache::new(CacheConfig {
        staleness: StalenessKey::LatestTimestamp,
        in_flight,
    }))
}

async fn prime(cache: &SignalCache, candles: Arc<[Candle]>) -> Arc<SignalBundle> {
    cache
        .get_or_compute(&key(), candles, |c| async move { Ok(SignalBundle::empty(c.len())) })
        .await
        .unwrap()
        .bundle
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cold_requests_compute_once() {
    let cache = cache(InFlightPolicy::Wait);
    let runs = Arc::new(AtomicUsize::new(0));
    let candles = window(100);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let runs = Arc::clone(&runs);
            let candles = Arc::clone(&candles);
            tokio::spawn(async move {
                cache
                    .get_or_compute(&key(), candles, move |c| async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(SignalBundle::empty(c.len()))
                    })
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut lookups = Vec::new();
    for task in tasks {
        lookups.push(task.await.unwrap());
    }

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    let first = &lookups[0].bundle;
    assert!(lookups.iter().all(|l| Arc::ptr_eq(&l.bundle, first)));
    assert_eq!(lookups.iter().filter(|l| l.status == CacheStatus::Computed).count(), 1);

    let stats = cache.stats();
    assert_eq!(stats.recomputations, 1);
    assert_eq!(stats.coalesced + stats.hits, 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_waiting_request_joins_running_recomputation() {
    let cache = cache(InFlightPolicy::Wait);
    let old = prime(&cache, window(100)).await;

    let started = Arc::new(Notify::new());
    let (release, gate) = oneshot::channel::<()>();

    let leader = {
        let cache = Arc::clone(&cache);
        let started = Arc::clone(&started);
        tokio::spawn(async move {
            cache
                .get_or_compute(&key(), window(101), move |c| async move {
                    started.notify_one();
                    let _ = gate.await;
                    Ok(SignalBundle::empty(c.len()))
                })
                .await
                .unwrap()
        })
    };
    started.notified().await;

    let follower = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .get_or_compute(&key(), window(101), |_| async {
                    Err(EngineError::ComputationFailure {
                        stage: "test",
                        message: "follower must not compute".to_string(),
                    })
                })
                .await
                .unwrap()
        })
    };

    // Readers see the previous bundle while the leader is blocked
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(Arc::ptr_eq(&cache.peek(&key()).unwrap(), &old));

    release.send(()).unwrap();
    let leader = leader.await.unwrap();
    let follower = follower.await.unwrap();

    assert_eq!(leader.status, CacheStatus::Recomputed);
    assert_eq!(follower.status, CacheStatus::Joined);
    assert!(Arc::ptr_eq(&leader.bundle, &follower.bundle));
    assert!(!Arc::ptr_eq(&leader.bundle, &old));
    assert_eq!(cache.stats().recomputations, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_serve_stale_returns_previous_bundle_immediately() {
    let cache = cache(InFlightPolicy::ServeStale);
    let old = prime(&cache, window(100)).await;

    let started = Arc::new(Notify::new());
    let (release, gate) = oneshot::channel::<()>();

    let leader = {
        let cache = Arc::clone(&cache);
        let started = Arc::clone(&started);
        tokio::spawn(async move {
            cache
                .get_or_compute(&key(), window(101), move |c| async move {
                    started.notify_one();
                    let _ = gate.await;
                    Ok(SignalBundle::empty(c.len()))
                })
                .await
                .unwrap()
        })
    };
    started.notified().await;

    let stale = cache
        .get_or_compute(&key(), window(101), |_| async {
            Err(EngineError::ComputationFailure {
                stage: "test",
                message: "stale reader must not compute".to_string(),
            })
        })
        .await
        .unwrap();
    assert_eq!(stale.status, CacheStatus::ServedStale);
    assert!(Arc::ptr_eq(&stale.bundle, &old));

    release.send(()).unwrap();
    let fresh = leader.await.unwrap();
    assert_eq!(fresh.status, CacheStatus::Recomputed);
    assert_eq!(fresh.bundle.len(), 101);
    assert!(Arc::ptr_eq(&cache.peek(&key()).unwrap(), &fresh.bundle));

    let stats = cache.stats();
    assert_eq!(stats.stale_served, 1);
    assert_eq!(stats.recomputations, 2);
}

#[tokio::test]
async fn test_sequential_requests_share_one_bundle() {
    let cache = cache(InFlightPolicy::Wait);
    let runs = AtomicUsize::new(0);
    let candles = window(80);

    let mut bundles = Vec::new();
    for _ in 0..10 {
        let lookup = cache
            .get_or_compute(&key(), Arc::clone(&candles), |c| {
                runs.fetch_add(1, Ordering::SeqCst);
                async move { Ok(SignalBundle::empty(c.len())) }
            })
            .await
            .unwrap();
        bundles.push(lookup.bundle);
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(bundles.iter().all(|b| Arc::ptr_eq(b, &bundles[0])));

    cache
        .get_or_compute(&key(), window(81), |c| {
            runs.fetch_add(1, Ordering::SeqCst);
            async move { Ok(SignalBundle::empty(c.len())) }
        })
        .await
        .unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_invalidate_during_recomputation_does_not_start_second_run() {
    let cache = cache(InFlightPolicy::Wait);
    prime(&cache, window(100)).await;

    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(Notify::new());
    let (release, gate) = oneshot::channel::<()>();

    let leader = {
        let cache = Arc::clone(&cache);
        let (running, peak, started) = (Arc::clone(&running), Arc::clone(&peak), Arc::clone(&started));
        tokio::spawn(async move {
            cache
                .get_or_compute(&key(), window(101), move |c| async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    started.notify_one();
                    let _ = gate.await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(SignalBundle::empty(c.len()))
                })
                .await
                .unwrap()
        })
    };
    started.notified().await;

    assert!(cache.invalidate(&key()));
    assert!(cache.peek(&key()).is_none());

    let follower = {
        let cache = Arc::clone(&cache);
        let (running, peak) = (Arc::clone(&running), Arc::clone(&peak));
        tokio::spawn(async move {
            cache
                .get_or_compute(&key(), window(101), move |c| async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(SignalBundle::empty(c.len()))
                })
                .await
                .unwrap()
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    release.send(()).unwrap();
    let leader = leader.await.unwrap();
    let follower = follower.await.unwrap();

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(follower.status, CacheStatus::Joined);
    assert!(Arc::ptr_eq(&leader.bundle, &follower.bundle));
    // The running computation's result lands in the live slot
    assert!(Arc::ptr_eq(&cache.peek(&key()).unwrap(), &leader.bundle));
    assert_eq!(cache.stats().recomputations, 2);
}
