use std::fs;
use std::path::Path;

use shotclock::cache::{
    AssetCache, AssetRequest, DirSource, FetchOutcome, PRECACHE_MANIFEST, UPLOAD_ENDPOINT,
};
use tempfile::TempDir;

fn populate_static_dir(root: &Path) {
    for path in PRECACHE_MANIFEST {
        let full = root.join(path);
        fs::write(&full, format!("contents of {path}")).unwrap();
    }
}

#[test]
fn install_precaches_the_manifest() {
    let static_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    populate_static_dir(static_dir.path());

    let source = DirSource::new(static_dir.path().to_path_buf());
    let cache = AssetCache::new(cache_dir.path().to_path_buf());
    cache.install(&source).unwrap();

    // every manifest asset is now served without the source
    let broken = DirSource::new(cache_dir.path().join("nonexistent"));
    for path in PRECACHE_MANIFEST {
        match cache.fetch(&AssetRequest::get(path), &broken).unwrap() {
            FetchOutcome::CacheHit(bytes) => {
                assert_eq!(bytes, format!("contents of {path}").into_bytes());
            }
            other => panic!("expected cache hit for '{path}', got {other:?}"),
        }
    }
}

#[test]
fn install_fails_when_an_asset_is_missing() {
    let static_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    populate_static_dir(static_dir.path());
    fs::remove_file(static_dir.path().join("style.css")).unwrap();

    let source = DirSource::new(static_dir.path().to_path_buf());
    let cache = AssetCache::new(cache_dir.path().to_path_buf());

    let err = cache.install(&source).unwrap_err();
    assert!(err.to_string().contains("style.css"));
}

#[test]
fn activate_prunes_stale_versions() {
    let cache_dir = TempDir::new().unwrap();
    fs::create_dir_all(cache_dir.path().join("shotclock-v0")).unwrap();
    fs::create_dir_all(cache_dir.path().join("countdown-timer-v14")).unwrap();

    let cache = AssetCache::with_version(cache_dir.path().to_path_buf(), "shotclock-v2");
    fs::create_dir_all(cache_dir.path().join("shotclock-v2")).unwrap();

    cache.activate().unwrap();

    assert!(!cache_dir.path().join("shotclock-v0").exists());
    assert!(!cache_dir.path().join("countdown-timer-v14").exists());
    assert!(cache_dir.path().join("shotclock-v2").exists());
}

#[test]
fn network_fetch_stores_a_copy() {
    let static_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    fs::write(static_dir.path().join("logo.svg"), "<svg/>").unwrap();

    let source = DirSource::new(static_dir.path().to_path_buf());
    let cache = AssetCache::new(cache_dir.path().to_path_buf());

    let request = AssetRequest::get("logo.svg");
    assert_eq!(
        cache.fetch(&request, &source).unwrap(),
        FetchOutcome::Network(b"<svg/>".to_vec())
    );

    // the copy survives the source going away
    let broken = DirSource::new(cache_dir.path().join("nonexistent"));
    assert_eq!(
        cache.fetch(&request, &broken).unwrap(),
        FetchOutcome::CacheHit(b"<svg/>".to_vec())
    );
}

#[test]
fn api_paths_are_never_stored() {
    let static_dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    fs::create_dir_all(static_dir.path().join("api")).unwrap();
    fs::write(static_dir.path().join("api/config"), "{}").unwrap();

    let source = DirSource::new(static_dir.path().to_path_buf());
    let cache = AssetCache::new(cache_dir.path().to_path_buf());

    let request = AssetRequest::get("/api/config");
    assert_eq!(
        cache.fetch(&request, &source).unwrap(),
        FetchOutcome::Network(b"{}".to_vec())
    );

    // second fetch still goes to the source
    let broken = DirSource::new(cache_dir.path().join("nonexistent"));
    assert_eq!(
        cache.fetch(&request, &broken).unwrap(),
        FetchOutcome::Offline
    );
}

#[test]
fn upload_posts_bypass_the_cache() {
    let cache_dir = TempDir::new().unwrap();
    let cache = AssetCache::new(cache_dir.path().to_path_buf());
    let broken = DirSource::new(cache_dir.path().join("nonexistent"));

    assert_eq!(
        cache
            .fetch(&AssetRequest::post(UPLOAD_ENDPOINT), &broken)
            .unwrap(),
        FetchOutcome::Bypass
    );
}

#[test]
fn miss_with_dead_source_reports_offline() {
    let cache_dir = TempDir::new().unwrap();
    let cache = AssetCache::new(cache_dir.path().to_path_buf());
    let broken = DirSource::new(cache_dir.path().join("nonexistent"));

    assert_eq!(
        cache.fetch(&AssetRequest::get("missing.css"), &broken).unwrap(),
        FetchOutcome::Offline
    );
}
