use crate::error::{IconGridError, Result};
use icon_grid_common::GridSpec;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// 全体設定
///
/// 読み込み順: デフォルト → 設定ファイル → 環境変数 → CLIフラグ（main側で適用）
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub thresholds: MatchThresholds,
    pub grid: GridSpec,
    pub tuning: DetectionTuning,
    pub central_crop: CentralCrop,
}

/// 参照カタログの場所
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub reference_dir: PathBuf,
    pub index_path: PathBuf,
    pub manifest_path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            reference_dir: PathBuf::from("data/reference"),
            index_path: PathBuf::from("data/index.json"),
            manifest_path: PathBuf::from("data/reference/manifest.json"),
        }
    }
}

/// 照合結果の採用しきい値
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MatchThresholds {
    /// これを超える距離の最良候補は捨てる
    pub max_distance: u32,
    /// 次点との差がこれ未満なら捨てる
    pub min_margin: u32,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            max_distance: 22,
            min_margin: 0,
        }
    }
}

/// タイル検出・グリッド推定のヒューリスティック定数
///
/// 値は特定のゲームUIで調整されたもの。別の画面スタイルでは見直しが必要。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionTuning {
    /// タイル候補の最小辺（px）
    pub min_tile_size: u32,
    /// 画像幅・高さに対するタイル候補の最大比率
    pub max_tile_fraction: f64,
    /// 幅/高さ比の下限
    pub min_aspect: f64,
    /// 幅/高さ比の上限
    pub max_aspect: f64,
    /// 左端がこの比率より右の候補は右側UIとして除外
    pub right_rail_fraction: f64,
    /// 中央値サイズからの許容ずれ
    pub size_tolerance: f64,
    /// 中心間距離がこの比率未満なら重複とみなす
    pub dedup_fraction: f64,
    /// ガウスぼかしのσ
    pub blur_sigma: f32,
    /// 適応的二値化のブロック半径（ブロック幅 = 2r+1）
    pub threshold_block_radius: u32,
    /// 適応的二値化で局所平均から引く値
    pub threshold_offset: i32,
    /// グリッド推定に必要な最小タイル数
    pub min_grid_tiles: usize,
    /// 座標クラスタリングの許容幅（中央値サイズ比）
    pub cluster_tolerance: f64,
    /// 行・列を残す最低密度（最多行・列の件数比）
    pub dense_fraction: f64,
    /// 行・列を残す最低件数
    pub dense_minimum: usize,
    /// 推定グリッドの最小行数・列数
    pub min_grid_lines: usize,
    /// 残った行中心へのスナップ許容幅（中央値高さ比）
    pub row_snap_tolerance: f64,
}

impl Default for DetectionTuning {
    fn default() -> Self {
        Self {
            min_tile_size: 45,
            max_tile_fraction: 0.5,
            min_aspect: 0.85,
            max_aspect: 1.15,
            right_rail_fraction: 0.78,
            size_tolerance: 0.3,
            dedup_fraction: 0.35,
            blur_sigma: 0.8,
            threshold_block_radius: 10,
            threshold_offset: 5,
            min_grid_tiles: 8,
            cluster_tolerance: 0.6,
            dense_fraction: 0.6,
            dense_minimum: 3,
            min_grid_lines: 4,
            row_snap_tolerance: 0.6,
        }
    }
}

/// ハッシュ計算前にタイル外周を落とす比率
///
/// 枠線と下部の名前ラベルが指紋に混ざらないようにする。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CentralCrop {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for CentralCrop {
    fn default() -> Self {
        Self {
            left: 0.10,
            right: 0.10,
            top: 0.18,
            bottom: 0.12,
        }
    }
}

impl CentralCrop {
    /// `width`×`height` に対する中央領域 `(x0, y0, x1, y1)`。空になる場合は None
    pub fn region(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = (width as f64 * self.left) as u32;
        let x1 = (width as f64 * (1.0 - self.right)) as u32;
        let y0 = (height as f64 * self.top) as u32;
        let y1 = (height as f64 * (1.0 - self.bottom)) as u32;
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }
}

impl Config {
    /// 設定を読み込む
    ///
    /// `path` 指定時はそのファイルが必須。未指定時は `~/.config/icon-grid/config.json`
    /// があれば読む。最後に環境変数で上書きする。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(IconGridError::FileNotFound(path.display().to_string()));
                }
                Self::read_file(path)?
            }
            None => match Self::config_path() {
                Ok(default_path) if default_path.exists() => Self::read_file(&default_path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        parse_sections(&content).map_err(|e| IconGridError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| IconGridError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("icon-grid").join("config.json"))
    }

    /// 環境変数による上書き
    ///
    /// 数値として解釈できない値は設定エラー。
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("REFERENCE_DIR") {
            self.catalog.reference_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("INDEX_PATH") {
            self.catalog.index_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("MANIFEST_PATH") {
            self.catalog.manifest_path = PathBuf::from(path);
        }

        let numeric: [(&str, &mut u32); 8] = [
            ("MATCH_MAX_DIST", &mut self.thresholds.max_distance),
            ("MATCH_MIN_MARGIN", &mut self.thresholds.min_margin),
            ("GRID_ROWS", &mut self.grid.rows),
            ("GRID_COLS", &mut self.grid.cols),
            ("GRID_MARGIN_X", &mut self.grid.margin_x),
            ("GRID_MARGIN_Y", &mut self.grid.margin_y),
            ("GRID_GAP_X", &mut self.grid.gap_x),
            ("GRID_GAP_Y", &mut self.grid.gap_y),
        ];
        for (key, slot) in numeric {
            if let Some(raw) = lookup(key) {
                *slot = raw.trim().parse().map_err(|_| {
                    IconGridError::Config(format!("{} は0以上の整数で指定してください: {:?}", key, raw))
                })?;
            }
        }

        Ok(())
    }

    /// キャリブレーション出力（GridSpec JSON）を固定グリッドとして読み込む
    pub fn load_grid_spec(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(IconGridError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        self.grid = parse_sections(&content)
            .map_err(|e| IconGridError::Config(format!("グリッド設定が不正 {}: {}", path.display(), e)))?;
        Ok(())
    }
}

/// 設定JSONをオブジェクトとしてのみ受け付ける
///
/// serdeの構造体は配列も受け付けるため、`[1, 2]` が先頭フィールドに
/// 入ってしまう。設定には配列の項目がないので、どの階層でも配列は不正。
fn parse_sections<T: DeserializeOwned>(content: &str) -> std::result::Result<T, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    if !is_object_tree(&value) {
        return Err("オブジェクト形式で指定してください".into());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn is_object_tree(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.values().all(|v| match v {
            Value::Object(_) => is_object_tree(v),
            Value::Array(_) => false,
            _ => true,
        }),
        _ => false,
    }
}
