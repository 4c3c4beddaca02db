//! Integration tests for the cache facade
//!
//! Covers round-trips, overwrites, self-healing of stale index records,
//! persistence across restarts and crash leftovers.

use fetchcache_cache::{
    Cache, CacheConfig, Error, ListedEntry, Lookup, ResponseDescriptor, TMP_SUFFIX, derive_key,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tempfile::TempDir;

fn descriptor(content_type: &str) -> ResponseDescriptor {
    ResponseDescriptor {
        status_code: 200,
        content_type: content_type.to_string(),
        headers: BTreeMap::from([("content-type".to_string(), content_type.to_string())]),
    }
}

fn content_path(config: &CacheConfig, url: &str) -> PathBuf {
    config
        .entries_dir()
        .join(format!("{}.content", derive_key(url)))
}

fn meta_path(config: &CacheConfig, url: &str) -> PathBuf {
    config
        .entries_dir()
        .join(format!("{}.meta.json", derive_key(url)))
}

#[tokio::test]
async fn set_then_get_round_trips() {
    let tmp = TempDir::new().unwrap();
    let cache = Cache::initialize(&CacheConfig::new(tmp.path())).await.unwrap();
    let body: Vec<u8> = (0u8..=255).collect();

    cache
        .set("https://a.example/bin", &descriptor("application/octet-stream"), &body)
        .await
        .unwrap();

    let hit = cache
        .get("https://a.example/bin")
        .await
        .unwrap()
        .found()
        .expect("entry should be cached");
    assert_eq!(hit.content, body);
    assert_eq!(hit.metadata.content_type, "application/octet-stream");
    assert_eq!(hit.metadata.byte_size, 256);
}

#[tokio::test]
async fn second_set_overwrites_first() {
    let tmp = TempDir::new().unwrap();
    let cache = Cache::initialize(&CacheConfig::new(tmp.path())).await.unwrap();

    cache
        .set("https://a.example", &descriptor("text/plain"), b"old payload")
        .await
        .unwrap();
    cache
        .set("https://a.example", &descriptor("text/html"), b"new")
        .await
        .unwrap();

    let hit = cache.get("https://a.example").await.unwrap().found().unwrap();
    assert_eq!(hit.content, b"new");
    assert_eq!(hit.metadata.content_type, "text/html");
    assert_eq!(
        cache.list().await,
        vec![ListedEntry {
            url: "https://a.example".to_string(),
            byte_size: 3,
        }]
    );
}

#[tokio::test]
async fn deleted_artifacts_self_heal() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig::new(tmp.path());
    let cache = Cache::initialize(&config).await.unwrap();
    cache
        .set("https://a.example", &descriptor("text/plain"), b"hello")
        .await
        .unwrap();
    cache
        .set("https://b.example", &descriptor("text/plain"), b"world")
        .await
        .unwrap();

    std::fs::remove_file(content_path(&config, "https://a.example")).unwrap();
    std::fs::remove_file(meta_path(&config, "https://a.example")).unwrap();

    assert_eq!(cache.get("https://a.example").await.unwrap(), Lookup::Absent);

    let listed: Vec<String> = cache.list().await.into_iter().map(|e| e.url).collect();
    assert_eq!(listed, vec!["https://b.example".to_string()]);

    // The repair was persisted, not just applied in memory
    let index: serde_json::Value =
        serde_json::from_slice(&std::fs::read(config.index_path()).unwrap()).unwrap();
    assert!(index.get(derive_key("https://a.example").as_str()).is_none());
    assert!(index.get(derive_key("https://b.example").as_str()).is_some());
}

#[tokio::test]
async fn partial_artifacts_self_heal() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig::new(tmp.path());
    let cache = Cache::initialize(&config).await.unwrap();
    cache
        .set("https://a.example", &descriptor("text/plain"), b"hello")
        .await
        .unwrap();

    // Only the metadata half goes missing
    std::fs::remove_file(meta_path(&config, "https://a.example")).unwrap();

    assert_eq!(cache.get("https://a.example").await.unwrap(), Lookup::Absent);
    assert!(cache.list().await.is_empty());
}

#[tokio::test]
async fn truncated_content_self_heals() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig::new(tmp.path());
    let cache = Cache::initialize(&config).await.unwrap();
    cache
        .set("https://a.example", &descriptor("text/plain"), b"hello world")
        .await
        .unwrap();

    std::fs::write(content_path(&config, "https://a.example"), b"hello").unwrap();

    assert_eq!(cache.get("https://a.example").await.unwrap(), Lookup::Absent);
    assert!(cache.list().await.is_empty());
}

#[tokio::test]
async fn entries_survive_restart() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig::new(tmp.path());
    {
        let cache = Cache::initialize(&config).await.unwrap();
        cache
            .set("https://a.example", &descriptor("text/plain"), b"persisted")
            .await
            .unwrap();
    }

    let restarted = Cache::initialize(&config).await.unwrap();

    let hit = restarted.get("https://a.example").await.unwrap().found().unwrap();
    assert_eq!(hit.content, b"persisted");
    assert_eq!(restarted.list().await.len(), 1);
}

#[tokio::test]
async fn crash_before_rename_keeps_previous_content() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig::new(tmp.path());
    {
        let cache = Cache::initialize(&config).await.unwrap();
        cache
            .set("https://a.example", &descriptor("text/plain"), b"complete value")
            .await
            .unwrap();
    }

    // Simulate a crash after the temp sibling was partly written but before
    // it was renamed over the content file
    let final_path = content_path(&config, "https://a.example");
    let mut tmp_name = final_path.clone().into_os_string();
    tmp_name.push(TMP_SUFFIX);
    let tmp_path = PathBuf::from(tmp_name);
    std::fs::write(&tmp_path, b"replacement val").unwrap();

    assert_eq!(std::fs::read(&final_path).unwrap(), b"complete value");

    let restarted = Cache::initialize(&config).await.unwrap();
    assert!(!tmp_path.exists(), "orphaned temp file should be swept");
    let hit = restarted.get("https://a.example").await.unwrap().found().unwrap();
    assert_eq!(hit.content, b"complete value");
}

#[tokio::test]
async fn crash_on_first_write_is_a_miss() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig::new(tmp.path());
    Cache::initialize(&config).await.unwrap();

    // Only a temp sibling exists; the final path was never created
    let final_path = content_path(&config, "https://a.example");
    let mut tmp_name = final_path.clone().into_os_string();
    tmp_name.push(TMP_SUFFIX);
    std::fs::write(PathBuf::from(tmp_name), b"parti").unwrap();

    let cache = Cache::initialize(&config).await.unwrap();
    assert!(!final_path.exists());
    assert_eq!(cache.get("https://a.example").await.unwrap(), Lookup::Absent);
}

#[tokio::test]
async fn startup_sweep_leaves_foreign_tmp_files() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig::new(tmp.path());
    std::fs::create_dir_all(config.entries_dir()).unwrap();

    let root_index_tmp = tmp.path().join(format!("index.json{TMP_SUFFIX}"));
    let root_foreign = tmp.path().join("draft.tmp");
    let entries_foreign = config.entries_dir().join("unrelated.tmp");
    let entries_short_key = config.entries_dir().join(format!("abc.content{TMP_SUFFIX}"));
    let stray_artifact_name = tmp
        .path()
        .join(format!("{}.content{TMP_SUFFIX}", derive_key("https://a.example")));
    for path in [
        &root_index_tmp,
        &root_foreign,
        &entries_foreign,
        &entries_short_key,
        &stray_artifact_name,
    ] {
        std::fs::write(path, b"user data").unwrap();
    }

    Cache::initialize(&config).await.unwrap();

    assert!(!root_index_tmp.exists());
    assert!(root_foreign.exists());
    assert!(entries_foreign.exists());
    assert!(entries_short_key.exists());
    // Artifact temp names only belong to the cache inside entries/
    assert!(stray_artifact_name.exists());
}

#[tokio::test]
async fn list_reports_each_url_once_with_sizes() {
    let tmp = TempDir::new().unwrap();
    let cache = Cache::initialize(&CacheConfig::new(tmp.path())).await.unwrap();

    cache
        .set("https://a.example", &descriptor("text/plain"), b"12345")
        .await
        .unwrap();
    cache
        .set("https://b.example", &descriptor("text/plain"), b"twelve bytes")
        .await
        .unwrap();
    cache
        .set("https://c.example", &descriptor("text/plain"), b"")
        .await
        .unwrap();

    let mut listed = cache.list().await;
    listed.sort_by(|a, b| a.url.cmp(&b.url));

    assert_eq!(
        listed,
        vec![
            ListedEntry {
                url: "https://a.example".to_string(),
                byte_size: 5,
            },
            ListedEntry {
                url: "https://b.example".to_string(),
                byte_size: 12,
            },
            ListedEntry {
                url: "https://c.example".to_string(),
                byte_size: 0,
            },
        ]
    );

    let json = serde_json::to_value(&listed[0]).unwrap();
    assert_eq!(json, serde_json::json!({"url": "https://a.example", "byteSize": 5}));
}

#[tokio::test]
async fn corrupt_index_aborts_startup() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig::new(tmp.path());
    std::fs::write(config.index_path(), b"not json at all").unwrap();

    let err = Cache::initialize(&config).await.unwrap_err();

    assert!(matches!(err, Error::CorruptIndex { .. }));
}

#[tokio::test]
async fn on_disk_layout_matches_documented_format() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig::new(tmp.path());
    let cache = Cache::initialize(&config).await.unwrap();

    cache
        .set("https://a.example/page", &descriptor("text/html"), b"<p>hi</p>")
        .await
        .unwrap();

    let key = derive_key("https://a.example/page");
    assert_eq!(
        std::fs::read(content_path(&config, "https://a.example/page")).unwrap(),
        b"<p>hi</p>"
    );

    let meta: serde_json::Value = serde_json::from_slice(
        &std::fs::read(meta_path(&config, "https://a.example/page")).unwrap(),
    )
    .unwrap();
    assert_eq!(meta["url"], "https://a.example/page");
    assert_eq!(meta["hash"], key.as_str());
    assert_eq!(meta["contentType"], "text/html");
    assert_eq!(meta["statusCode"], 200);
    assert_eq!(meta["byteSize"], 9);
    assert_eq!(meta["headers"]["content-type"], "text/html");
    assert!(
        chrono::DateTime::parse_from_rfc3339(meta["cachedAt"].as_str().unwrap()).is_ok(),
        "cachedAt should be RFC 3339"
    );

    let index: serde_json::Value =
        serde_json::from_slice(&std::fs::read(config.index_path()).unwrap()).unwrap();
    assert_eq!(index[key.as_str()]["url"], "https://a.example/page");
    assert_eq!(index[key.as_str()]["byteSize"], 9);
    assert_eq!(index[key.as_str()]["cachedAt"], meta["cachedAt"]);
}
