//! 参照画像からのカタログ構築
//!
//! マニフェストがあればその項目を、なければ参照フォルダ内の画像を使う。
//! 画像ごとに「エントリ」か「スキップ理由」のどちらかを作り、壊れた画像が
//! あっても構築全体は止めない。

use crate::config::{CatalogConfig, CentralCrop};
use crate::error::IconGridError;
use crate::matcher::fingerprint;
use crate::scanner;
use icon_grid_common::{ManifestItem, ReferenceEntry};
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};

/// 構築元
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildSource {
    Manifest(PathBuf),
    Directory(PathBuf),
    /// 参照フォルダが存在しない
    Missing,
}

impl fmt::Display for BuildSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildSource::Manifest(path) => write!(f, "マニフェスト {}", path.display()),
            BuildSource::Directory(path) => write!(f, "フォルダ {}", path.display()),
            BuildSource::Missing => f.write_str("なし"),
        }
    }
}

/// ハッシュ計算前の参照画像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSource {
    pub name: String,
    pub element: Option<String>,
    pub path: PathBuf,
}

/// 参照画像をカタログに入れなかった理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// マニフェスト項目に name または file がない
    MissingField,
    FileNotFound(String),
    Unreadable { path: String, reason: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField => f.write_str("name/fileがありません"),
            SkipReason::FileNotFound(path) => write!(f, "ファイルが見つかりません: {}", path),
            SkipReason::Unreadable { path, reason } => write!(f, "読み込めません {}: {}", path, reason),
        }
    }
}

/// 構築結果
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub source: BuildSource,
    pub entries: Vec<ReferenceEntry>,
    pub skipped: usize,
}

/// マニフェストを読む。読めない・不正な場合は空（フォルダスキャンにフォールバック）
pub fn read_manifest(path: &Path) -> Vec<ManifestItem> {
    if !path.exists() {
        return Vec::new();
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(IconGridError::from)
        .and_then(|content| {
            serde_json::from_str::<Vec<ManifestItem>>(&content)
                .map_err(|e| IconGridError::InvalidManifest(format!("{}: {}", path.display(), e)))
        });
    match parsed {
        Ok(items) => items,
        Err(e) => {
            log::warn!("マニフェストを無視します: {}", e);
            Vec::new()
        }
    }
}

/// マニフェスト項目を参照画像に解決する
///
/// `file` がそのまま存在しなければ、マニフェストのあるフォルダからの相対パスとして再試行する。
pub fn resolve_manifest_item(item: &ManifestItem, manifest_dir: &Path) -> Result<ReferenceSource, SkipReason> {
    let (name, file) = match (&item.name, &item.file) {
        (Some(name), Some(file)) if !name.is_empty() && !file.is_empty() => (name, file),
        _ => return Err(SkipReason::MissingField),
    };

    let direct = PathBuf::from(file);
    let path = if direct.exists() {
        direct
    } else {
        let relative = manifest_dir.join(file);
        if direct.is_relative() && relative.exists() {
            relative
        } else {
            return Err(SkipReason::FileNotFound(file.clone()));
        }
    };

    Ok(ReferenceSource {
        name: name.clone(),
        element: item.element.clone(),
        path,
    })
}

/// 参照画像1枚をハッシュ化する
pub fn hash_reference(source: &ReferenceSource, crop: &CentralCrop) -> Result<ReferenceEntry, SkipReason> {
    let path = source.path.display().to_string();
    let image = image::open(&source.path).map_err(|e| SkipReason::Unreadable {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let print = fingerprint(&image, crop);
    Ok(ReferenceEntry {
        name: source.name.clone(),
        element: source.element.clone(),
        source_path: path,
        primary_hash: print.primary,
        secondary_hash: Some(print.secondary),
    })
}

/// 構築対象を集める
pub fn collect_sources(config: &CatalogConfig) -> (BuildSource, Vec<Result<ReferenceSource, SkipReason>>) {
    if !config.reference_dir.exists() {
        log::warn!("参照フォルダが見つかりません: {}", config.reference_dir.display());
        return (BuildSource::Missing, Vec::new());
    }

    let manifest = read_manifest(&config.manifest_path);
    if !manifest.is_empty() {
        let manifest_dir = config.manifest_path.parent().unwrap_or(Path::new("."));
        let sources = manifest
            .iter()
            .map(|item| resolve_manifest_item(item, manifest_dir))
            .collect();
        return (BuildSource::Manifest(config.manifest_path.clone()), sources);
    }

    let sources = match scanner::scan_reference_dir(&config.reference_dir) {
        Ok(images) => images
            .into_iter()
            .map(|img| {
                Ok(ReferenceSource {
                    name: img.name,
                    element: None,
                    path: img.path,
                })
            })
            .collect(),
        Err(e) => {
            log::warn!("参照フォルダをスキャンできません: {}", e);
            Vec::new()
        }
    };
    (BuildSource::Directory(config.reference_dir.clone()), sources)
}

/// 参照画像を並列にハッシュ化してカタログを作る
///
/// `on_progress` は画像1枚の処理ごとに呼ばれる（ワーカースレッドから）。
pub fn build_catalog<F>(config: &CatalogConfig, crop: &CentralCrop, on_progress: F) -> BuildReport
where
    F: Fn() + Sync,
{
    let (source, candidates) = collect_sources(config);
    log::info!("カタログ構築: {} ({}件)", source, candidates.len());

    let outcomes: Vec<Result<ReferenceEntry, SkipReason>> = candidates
        .into_par_iter()
        .map(|candidate| {
            let outcome = candidate.and_then(|src| hash_reference(&src, crop));
            on_progress();
            outcome
        })
        .collect();

    let (entries, skipped) = outcomes
        .into_iter()
        .fold((Vec::new(), 0usize), |(mut entries, skipped), outcome| match outcome {
            Ok(entry) => {
                entries.push(entry);
                (entries, skipped)
            }
            Err(reason) => {
                log::warn!("参照画像をスキップ: {}", reason);
                (entries, skipped + 1)
            }
        });

    log::info!("カタログ構築完了: {}件 (スキップ {}件)", entries.len(), skipped);
    BuildReport {
        source,
        entries,
        skipped,
    }
}
