//! インデックスファイル（ハッシュ計算済みカタログ）の読み書き
//!
//! 形式: `[{name, element, file, phash, dhash}, ...]`

use crate::error::{IconGridError, Result};
use icon_grid_common::ReferenceEntry;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// インデックスを読み込む
///
/// ファイルがない・壊れている場合は空を返す（呼び出し側で再構築する）。
pub fn load_index(path: &Path) -> Vec<ReferenceEntry> {
    if !path.exists() {
        return Vec::new();
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::warn!("インデックスを開けません {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let reader = BufReader::new(file);
    match serde_json::from_reader::<_, Vec<ReferenceEntry>>(reader) {
        Ok(entries) => entries,
        Err(e) => {
            let err = IconGridError::InvalidIndex(format!("{}: {}", path.display(), e));
            log::warn!("{} (再構築します)", err);
            Vec::new()
        }
    }
}

/// インデックスを保存（親ディレクトリも作成）
pub fn save_index(path: &Path, entries: &[ReferenceEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, entries)?;
    Ok(())
}
