//! 参照カタログ
//!
//! カタログは不変のスナップショットとして扱う。再読み込み時は新しい
//! スナップショットを作って丸ごと差し替えるので、読み手が構築途中の
//! カタログを見ることはない。

pub mod build;
pub mod index;

pub use build::{build_catalog, BuildReport, BuildSource, ReferenceSource, SkipReason};
pub use index::{load_index, save_index};

use crate::config::{CatalogConfig, CentralCrop};
use crate::error::Result;
use icon_grid_common::ReferenceEntry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock};

/// カタログの出どころ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogOrigin {
    /// まだ読み込んでいない
    Unloaded,
    IndexFile,
    Rebuilt(BuildSource),
}

impl fmt::Display for CatalogOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogOrigin::Unloaded => f.write_str("未読み込み"),
            CatalogOrigin::IndexFile => f.write_str("インデックスファイル"),
            CatalogOrigin::Rebuilt(source) => write!(f, "再構築 ({})", source),
        }
    }
}

/// ある時点のカタログ
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub version: u64,
    pub entries: Vec<ReferenceEntry>,
    /// 属性違いの同名エントリを持つ名前
    pub ambiguous: HashSet<String>,
    pub origin: CatalogOrigin,
    /// 構築時に読み込めなかった参照画像の数
    pub skipped: usize,
}

impl CatalogSnapshot {
    pub fn new(entries: Vec<ReferenceEntry>, origin: CatalogOrigin) -> Self {
        let ambiguous = ambiguous_names(&entries);
        Self {
            version: 0,
            entries,
            ambiguous,
            origin,
            skipped: 0,
        }
    }

    pub fn unloaded() -> Self {
        Self::new(Vec::new(), CatalogOrigin::Unloaded)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous.contains(name)
    }
}

/// 空でない属性が2種類以上ある名前の集合
pub fn ambiguous_names(entries: &[ReferenceEntry]) -> HashSet<String> {
    let mut elements: HashMap<&str, HashSet<&str>> = HashMap::new();
    for entry in entries {
        if let Some(element) = entry.element_tag() {
            elements.entry(entry.name.as_str()).or_default().insert(element);
        }
    }
    elements
        .into_iter()
        .filter(|(_, set)| set.len() > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// インデックスを読み、空なら参照画像から再構築して保存する
pub fn load_or_build<F>(config: &CatalogConfig, crop: &CentralCrop, on_progress: F) -> Result<CatalogSnapshot>
where
    F: Fn() + Sync,
{
    let entries = load_index(&config.index_path);
    if !entries.is_empty() {
        log::info!("インデックス読み込み: {} ({}件)", config.index_path.display(), entries.len());
        return Ok(CatalogSnapshot::new(entries, CatalogOrigin::IndexFile));
    }
    rebuild(config, crop, on_progress)
}

/// 参照画像から再構築して保存する
///
/// 参照フォルダがない場合は空のカタログで、保存もしない。
pub fn rebuild<F>(config: &CatalogConfig, crop: &CentralCrop, on_progress: F) -> Result<CatalogSnapshot>
where
    F: Fn() + Sync,
{
    let report = build_catalog(config, crop, on_progress);
    if report.source != BuildSource::Missing {
        save_index(&config.index_path, &report.entries)?;
        log::info!("インデックス保存: {}", config.index_path.display());
    }

    let mut snapshot = CatalogSnapshot::new(report.entries, CatalogOrigin::Rebuilt(report.source));
    snapshot.skipped = report.skipped;
    Ok(snapshot)
}

/// 現在のカタログを保持する共有ストア
///
/// 読み手は `current()` で得た `Arc` を1リクエストの間保持する。
#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::unloaded())),
        }
    }

    pub fn current(&self) -> Arc<CatalogSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// スナップショットを差し替える。バージョンは単調増加
    pub fn replace(&self, mut snapshot: CatalogSnapshot) -> Arc<CatalogSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        snapshot.version = guard.version + 1;
        let snapshot = Arc::new(snapshot);
        *guard = Arc::clone(&snapshot);
        log::debug!("カタログ差し替え: v{} ({}件)", snapshot.version, snapshot.len());
        snapshot
    }

    /// インデックスを読み直し（必要なら再構築し）て差し替える
    pub fn refresh<F>(&self, config: &CatalogConfig, crop: &CentralCrop, on_progress: F) -> Result<Arc<CatalogSnapshot>>
    where
        F: Fn() + Sync,
    {
        let snapshot = load_or_build(config, crop, on_progress)?;
        Ok(self.replace(snapshot))
    }
}
