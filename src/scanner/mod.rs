use crate::error::{IconGridError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// 参照画像1枚
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub path: PathBuf,
    /// ファイル名の拡張子を除いた部分
    pub name: String,
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// 参照画像フォルダを再帰的にスキャン（パス順）
pub fn scan_reference_dir(folder: &Path) -> Result<Vec<ReferenceImage>> {
    if !folder.exists() {
        return Err(IconGridError::FolderNotFound(folder.display().to_string()));
    }

    let mut images: Vec<ReferenceImage> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_image_path(e.path()))
        .filter_map(|e| {
            let name = e.path().file_stem()?.to_string_lossy().to_string();
            Some(ReferenceImage {
                path: e.into_path(),
                name,
            })
        })
        .collect();

    images.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(images)
}
