//! 部分的な検出からのグリッド推定
//!
//! 検出できたタイルの中心座標を行・列にクラスタリングし、疎な行・列を
//! 落としてから、全ての (行, 列) の組にセルを合成する。隠れていて検出
//! できなかったアイコンもこれで拾える。

use super::cluster::cluster_positions;
use crate::config::DetectionTuning;
use icon_grid_common::BBox;

/// タイルからグリッドのセルを推定する
///
/// 推定できない場合は None（呼び出し側は検出タイルをそのまま使う）。
/// 戻り値は行優先・座標昇順。
pub fn infer_grid(
    tiles: &[BBox],
    median_w: f64,
    median_h: f64,
    width: u32,
    height: u32,
    tuning: &DetectionTuning,
) -> Option<Vec<BBox>> {
    if tiles.len() < tuning.min_grid_tiles {
        log::debug!("グリッド推定スキップ: タイル{}件", tiles.len());
        return None;
    }

    let tol_x = median_w * tuning.cluster_tolerance;
    let tol_y = median_h * tuning.cluster_tolerance;

    let row_centers = cluster_positions(&centers_y(tiles), tol_y);
    if row_centers.is_empty() {
        return None;
    }

    // 右側パネル等の疎な行を落とす
    let row_counts = count_nearest(&row_centers, &centers_y(tiles));
    let keep_rows = dense_lines(&row_centers, &row_counts, tuning);
    if keep_rows.is_empty() {
        return None;
    }

    let snap = median_h * tuning.row_snap_tolerance;
    let filtered: Vec<BBox> = tiles
        .iter()
        .filter(|t| {
            let cy = t.center().1;
            nearest(&keep_rows, cy).is_some_and(|i| (keep_rows[i] - cy).abs() <= snap)
        })
        .copied()
        .collect();

    let col_centers = cluster_positions(&centers_x(&filtered), tol_x);
    let row_centers = cluster_positions(&centers_y(&filtered), tol_y);
    if col_centers.len() < tuning.min_grid_lines || row_centers.len() < tuning.min_grid_lines {
        log::debug!(
            "グリッド推定スキップ: {}行 x {}列",
            row_centers.len(),
            col_centers.len()
        );
        return None;
    }

    let col_counts = count_nearest(&col_centers, &centers_x(&filtered));
    let mut keep_cols = dense_lines(&col_centers, &col_counts, tuning);
    if keep_cols.len() < tuning.min_grid_lines {
        keep_cols = col_centers;
    }

    let cells: Vec<BBox> = row_centers
        .iter()
        .flat_map(|&ry| keep_cols.iter().map(move |&rx| (rx, ry)))
        .filter_map(|(rx, ry)| synthesize_cell(rx, ry, median_w, median_h, width, height))
        .collect();

    log::debug!(
        "グリッド推定: {}行 x {}列 → {}セル (検出{}件)",
        row_centers.len(),
        keep_cols.len(),
        cells.len(),
        tiles.len()
    );
    Some(cells)
}

fn centers_x(tiles: &[BBox]) -> Vec<f64> {
    tiles.iter().map(|t| t.center().0).collect()
}

fn centers_y(tiles: &[BBox]) -> Vec<f64> {
    tiles.iter().map(|t| t.center().1).collect()
}

/// 最も近い中心のインデックス（同距離なら先のもの）
fn nearest(centers: &[f64], value: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &c) in centers.iter().enumerate() {
        let d = (c - value).abs();
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

fn count_nearest(centers: &[f64], values: &[f64]) -> Vec<usize> {
    let mut counts = vec![0; centers.len()];
    for &v in values {
        if let Some(i) = nearest(centers, v) {
            counts[i] += 1;
        }
    }
    counts
}

/// 最多件数に対して十分な件数を持つ行・列だけを残す
fn dense_lines(centers: &[f64], counts: &[usize], tuning: &DetectionTuning) -> Vec<f64> {
    let max_count = counts.iter().copied().max().unwrap_or(0);
    let required = tuning
        .dense_minimum
        .max((max_count as f64 * tuning.dense_fraction) as usize);
    centers
        .iter()
        .zip(counts)
        .filter(|&(_, &count)| count >= required)
        .map(|(&c, _)| c)
        .collect()
}

fn synthesize_cell(cx: f64, cy: f64, median_w: f64, median_h: f64, width: u32, height: u32) -> Option<BBox> {
    let x = (cx - median_w / 2.0) as i64;
    let y = (cy - median_h / 2.0) as i64;
    if x < 0 || y < 0 {
        return None;
    }
    let cell = BBox::new(x as u32, y as u32, median_w as u32, median_h as u32);
    (!cell.is_empty_within(width, height)).then_some(cell)
}
