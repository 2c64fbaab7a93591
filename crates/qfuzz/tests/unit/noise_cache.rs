//! Day-keyed noise profile memoization.

use std::cell::Cell;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use qfuzz::{noisy_scenario, Error, ErrorKind, NoiseProfile, NoiseProfileCache, ProviderError};

fn profile(backend: &str, p: f64) -> NoiseProfile {
    NoiseProfile {
        backend: backend.to_string(),
        payload: serde_json::json!({ "depolarizing": p }),
        properties: None,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

#[test]
fn hit_does_not_refetch() {
    let dir = tempfile::tempdir().unwrap();
    let cache = NoiseProfileCache::with_clock(dir.path(), || day(1));
    let calls = Cell::new(0);
    let fetch = |b: &str| {
        calls.set(calls.get() + 1);
        Ok(profile(b, 0.01))
    };

    let first = cache.get("fake_kyiv", fetch).unwrap();
    let second = cache.get("fake_kyiv", fetch).unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(first, second);
    assert!(dir.path().join("fake_kyiv_20240501_noise.json").exists());
}

#[test]
fn record_survives_a_new_cache_instance() {
    let dir = tempfile::tempdir().unwrap();
    NoiseProfileCache::with_clock(dir.path(), || day(2))
        .get("dev", |b| Ok(profile(b, 0.02)))
        .unwrap();

    let reopened = NoiseProfileCache::with_clock(dir.path(), || day(2));
    let cached = reopened
        .get("dev", |_| Err(ProviderError::Request("must not be called".into())))
        .unwrap();
    assert_eq!(cached.payload["depolarizing"], 0.02);
}

#[test]
fn new_day_refetches() {
    let dir = tempfile::tempdir().unwrap();
    let today = Arc::new(Mutex::new(day(3)));
    let clock = Arc::clone(&today);
    let cache = NoiseProfileCache::with_clock(dir.path(), move || *clock.lock().unwrap());

    cache.get("dev", |b| Ok(profile(b, 0.01))).unwrap();
    *today.lock().unwrap() = day(4);
    let fresh = cache.get("dev", |b| Ok(profile(b, 0.05))).unwrap();

    assert_eq!(fresh.payload["depolarizing"], 0.05);
    assert!(dir.path().join("dev_20240503_noise.json").exists());
    assert!(dir.path().join("dev_20240504_noise.json").exists());
}

#[test]
fn provider_error_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let cache = NoiseProfileCache::with_clock(dir.path(), || day(5));

    let err = cache
        .get("dev", |_| Err(ProviderError::Authentication("no token".into())))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Provider);
    match err {
        Error::Provider {
            backend, operation, ..
        } => {
            assert_eq!(backend, "dev");
            assert_eq!(operation, "fetch_profile");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!cache.path_for("dev").exists());

    let ok = cache.get("dev", |b| Ok(profile(b, 0.01))).unwrap();
    assert_eq!(ok.backend, "dev");
}

#[test]
fn corrupt_record_is_refetched() {
    let dir = tempfile::tempdir().unwrap();
    let cache = NoiseProfileCache::with_clock(dir.path(), || day(6));
    std::fs::write(cache.path_for("dev"), b"{ truncated").unwrap();

    let p = cache.get("dev", |b| Ok(profile(b, 0.03))).unwrap();
    assert_eq!(p.payload["depolarizing"], 0.03);

    let again = cache
        .get("dev", |_| Err(ProviderError::Request("must not be called".into())))
        .unwrap();
    assert_eq!(again, p);
}

#[test]
fn noisy_scenario_uses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = NoiseProfileCache::with_clock(dir.path().join("nested"), || day(7));
    let provider = |b: &str| Ok::<_, ProviderError>(profile(b, 0.04));

    let scenario = noisy_scenario(&cache, &provider, "aer", "fake_kyiv", 256).unwrap();
    assert_eq!(scenario.name, "noisy");
    assert_eq!(scenario.backend, "aer");
    assert_eq!(scenario.shots, 256);
    assert_eq!(scenario.noise.unwrap().backend, "fake_kyiv");
    assert!(cache.path_for("fake_kyiv").exists());
}
