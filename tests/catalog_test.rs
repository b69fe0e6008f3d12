//! 参照カタログ構築テスト
//!
//! インデックス読み込み・マニフェスト/フォルダからの再構築・差し替えを検証

use icon_grid_rust::catalog::{self, BuildSource, CatalogOrigin, CatalogStore};
use icon_grid_rust::config::{CatalogConfig, CentralCrop};
use image::{Rgb, RgbImage};
use std::path::Path;
use tempfile::tempdir;

/// 位置の違うブロックを持つアイコン画像
fn icon(seed: u32) -> RgbImage {
    RgbImage::from_fn(80, 80, |x, y| {
        let bx = 10 + (seed * 13) % 40;
        let by = 15 + (seed * 7) % 35;
        if x >= bx && x < bx + 25 && y >= by && y < by + 25 {
            Rgb([240, 200, 40])
        } else {
            Rgb([(x * 3) as u8, (y * 2) as u8, 90])
        }
    })
}

fn catalog_config(root: &Path) -> CatalogConfig {
    CatalogConfig {
        reference_dir: root.join("reference"),
        index_path: root.join("data").join("index.json"),
        manifest_path: root.join("reference").join("manifest.json"),
    }
}

/// フォルダスキャンで再構築し、壊れた画像は読み飛ばす
#[test]
fn test_rebuild_from_directory_skips_corrupt_images() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = catalog_config(dir.path());
    std::fs::create_dir_all(&config.reference_dir).unwrap();

    icon(1).save(config.reference_dir.join("slime.png")).unwrap();
    icon(2).save(config.reference_dir.join("golem.png")).unwrap();
    std::fs::write(config.reference_dir.join("broken.png"), b"not a png").unwrap();

    let snapshot = catalog::load_or_build(&config, &CentralCrop::default(), || {}).unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.skipped, 1);
    assert_eq!(
        snapshot.origin,
        CatalogOrigin::Rebuilt(BuildSource::Directory(config.reference_dir.clone()))
    );

    let names: Vec<&str> = snapshot.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["golem", "slime"]);
    assert!(snapshot.entries.iter().all(|e| e.element.is_none() && e.secondary_hash.is_some()));

    // 保存されたインデックスが次回の読み込みで使われる
    assert!(config.index_path.exists());
    let reloaded = catalog::load_or_build(&config, &CentralCrop::default(), || {}).unwrap();
    assert_eq!(reloaded.origin, CatalogOrigin::IndexFile);
    assert_eq!(reloaded.entries, snapshot.entries);
}

/// マニフェストの同名・属性違いエントリは曖昧な名前になる
#[test]
fn test_rebuild_from_manifest_with_homonyms() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = catalog_config(dir.path());
    std::fs::create_dir_all(&config.reference_dir).unwrap();

    icon(3).save(config.reference_dir.join("imp_fire.png")).unwrap();
    icon(4).save(config.reference_dir.join("imp_water.png")).unwrap();
    icon(5).save(config.reference_dir.join("slime.png")).unwrap();

    let manifest = serde_json::json!([
        {"name": "Imp", "element": "Fire", "file": "imp_fire.png"},
        {"name": "Imp", "element": "Water", "file": "imp_water.png"},
        {"name": "Slime", "element": "Wind", "file": "slime.png"},
        {"name": "Ghost", "element": "Dark", "file": "ghost.png"},
        {"element": "Light", "file": "slime.png"}
    ]);
    std::fs::write(&config.manifest_path, manifest.to_string()).unwrap();

    let snapshot = catalog::load_or_build(&config, &CentralCrop::default(), || {}).unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.skipped, 2);
    assert!(snapshot.is_ambiguous("Imp"));
    assert!(!snapshot.is_ambiguous("Slime"));
    assert!(matches!(snapshot.origin, CatalogOrigin::Rebuilt(BuildSource::Manifest(_))));
}

/// 参照フォルダがなければ空のカタログで、インデックスも作らない
#[test]
fn test_missing_reference_dir_gives_empty_catalog() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = catalog_config(dir.path());

    let snapshot = catalog::load_or_build(&config, &CentralCrop::default(), || {}).unwrap();
    assert!(snapshot.is_empty());
    assert!(!config.index_path.exists());
}

/// 壊れたインデックスは再構築で置き換える
#[test]
fn test_corrupt_index_triggers_rebuild() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = catalog_config(dir.path());
    std::fs::create_dir_all(&config.reference_dir).unwrap();
    std::fs::create_dir_all(config.index_path.parent().unwrap()).unwrap();
    std::fs::write(&config.index_path, "{ broken").unwrap();
    icon(6).save(config.reference_dir.join("wisp.png")).unwrap();

    let snapshot = catalog::load_or_build(&config, &CentralCrop::default(), || {}).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(catalog::load_index(&config.index_path).len(), 1);
}

/// 進捗コールバックは参照画像ごとに呼ばれる
#[test]
fn test_progress_is_reported_per_image() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let dir = tempdir().expect("Failed to create temp dir");
    let config = catalog_config(dir.path());
    std::fs::create_dir_all(&config.reference_dir).unwrap();
    for i in 0..4 {
        icon(i).save(config.reference_dir.join(format!("icon{}.png", i))).unwrap();
    }

    let calls = AtomicUsize::new(0);
    let report = catalog::build_catalog(&config, &CentralCrop::default(), || {
        calls.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(report.entries.len(), 4);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

/// ストアの差し替えはバージョンを進める
#[test]
fn test_store_refresh_versions() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = catalog_config(dir.path());
    std::fs::create_dir_all(&config.reference_dir).unwrap();
    icon(7).save(config.reference_dir.join("imp.png")).unwrap();

    let store = CatalogStore::new();
    let first = store.refresh(&config, &CentralCrop::default(), || {}).unwrap();
    let second = store.refresh(&config, &CentralCrop::default(), || {}).unwrap();

    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);
    assert_eq!(second.origin, CatalogOrigin::IndexFile);
    assert_eq!(store.current().version, 2);
}
