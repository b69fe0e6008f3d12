//! 固定グリッドの切り出し

use icon_grid_common::{BBox, GridSpec};

/// 固定グリッドのセル矩形（行優先）
///
/// 切り出し結果が空になるセルは黙って捨てる。
pub fn fixed_cells(spec: &GridSpec, width: u32, height: u32) -> Vec<BBox> {
    if !spec.is_fixed() {
        return Vec::new();
    }

    let cell_w = cell_extent(width, spec.cols, spec.margin_x, spec.gap_x);
    let cell_h = cell_extent(height, spec.rows, spec.margin_y, spec.gap_y);
    if cell_w <= 0 || cell_h <= 0 {
        log::warn!(
            "固定グリッドのセルサイズが不正です ({}x{}): 設定を確認してください",
            cell_w,
            cell_h
        );
        return Vec::new();
    }

    let mut cells = Vec::with_capacity(spec.rows as usize * spec.cols as usize);
    for r in 0..spec.rows as i64 {
        for c in 0..spec.cols as i64 {
            let x = spec.margin_x as i64 + c * (cell_w + spec.gap_x as i64);
            let y = spec.margin_y as i64 + r * (cell_h + spec.gap_y as i64);
            if x >= width as i64 || y >= height as i64 {
                continue;
            }
            let cell = BBox::new(x as u32, y as u32, cell_w as u32, cell_h as u32);
            if !cell.is_empty_within(width, height) {
                cells.push(cell);
            }
        }
    }
    cells
}

/// (全長 - 2×余白 - (個数-1)×間隔) / 個数（切り捨て）
fn cell_extent(total: u32, count: u32, margin: u32, gap: u32) -> i64 {
    let usable = total as i64 - 2 * margin as i64 - (count as i64 - 1) * gap as i64;
    usable.div_euclid(count as i64)
}
