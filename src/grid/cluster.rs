//! 1次元座標のクラスタリング

/// 中央値（偶数個なら中央2値の平均）。空なら0.0
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// 近い座標をまとめ、各クラスタの中央値を昇順で返す
///
/// ソート後に1回走査し、直前に追加した値との差が `tolerance` を超えたら
/// 新しいクラスタを始める。
pub fn cluster_positions(values: &[f64], tolerance: f64) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut clusters: Vec<Vec<f64>> = Vec::new();
    for value in sorted {
        match clusters.last_mut() {
            Some(current) if current.last().is_some_and(|&last| (value - last).abs() <= tolerance) => {
                current.push(value)
            }
            _ => clusters.push(vec![value]),
        }
    }

    clusters.iter().map(|c| median(c)).collect()
}
