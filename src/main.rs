use anyhow::{Context, Result};
use clap::Parser;
use icon_grid_rust::{calibrate, catalog, cli, config, pipeline};
use catalog::CatalogStore;
use cli::{Cli, Commands};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = Config::load(cli.config.as_deref()).context("設定の読み込みに失敗しました")?;

    match cli.command {
        Commands::Detect { images, output, grid_spec, max_dist, min_margin, show_layout } => {
            println!("🔍 icon-grid - アイコン検出\n");

            if let Some(path) = grid_spec {
                config.load_grid_spec(&path)?;
            }
            if let Some(max_dist) = max_dist {
                config.thresholds.max_distance = max_dist;
            }
            if let Some(min_margin) = min_margin {
                config.thresholds.min_margin = min_margin;
            }

            // 1. カタログ
            println!("[1/3] 参照カタログを読み込み中...");
            let store = CatalogStore::new();
            let snapshot = refresh_catalog(&store, &config, false)?;
            println!("✔ {}件の参照アイコン ({})\n", snapshot.len(), snapshot.origin);

            // 2. 画像読み込み（読めないファイルは読み飛ばす）
            println!("[2/3] 画像を読み込み中...");
            let mut encoded = Vec::new();
            for path in &images {
                match std::fs::read(path) {
                    Ok(bytes) => encoded.push(bytes),
                    Err(e) => log::warn!("読み込めません {}: {}", path.display(), e),
                }
            }
            println!("✔ {}/{}枚\n", encoded.len(), images.len());

            // 3. 検出
            println!("[3/3] 検出中...{}", if config.grid.is_fixed() { " (固定グリッド)" } else { "" });
            let report = pipeline::detect_async(&store, Arc::new(config), encoded).await?;
            let response = report.response;
            println!("✔ {}件検出\n", response.count);

            if show_layout {
                for (index, layout) in &report.layouts {
                    println!("  画像{}: {} ({}タイル)", index + 1, layout.strategy, layout.boxes.len());
                }
                println!();
            }

            let json = serde_json::to_string_pretty(&response)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("結果を保存できません: {}", path.display()))?;
                    println!("✔ 結果を保存: {}", path.display());
                }
                None => println!("{}", json),
            }

            println!("\n✅ 検出完了");
        }

        Commands::Index { info, rebuild } => {
            let store = CatalogStore::new();
            let snapshot = refresh_catalog(&store, &config, rebuild)?;

            if rebuild {
                println!("✔ インデックスを再構築しました: {}", config.catalog.index_path.display());
            }

            if info || !rebuild {
                println!("カタログ情報:");
                println!("  インデックス: {}", config.catalog.index_path.display());
                println!("  出どころ: {}", snapshot.origin);
                println!("  件数: {}", snapshot.len());
                println!("  曖昧な名前: {}", snapshot.ambiguous.len());
                if snapshot.skipped > 0 {
                    println!("  スキップ: {}", snapshot.skipped);
                }
            }
        }

        Commands::Calibrate { image, output } => {
            println!("📐 icon-grid - グリッド推定\n");
            let calibration = calibrate::calibrate_file(&image, &output)?;
            println!("{}", serde_json::to_string_pretty(&calibration)?);
            println!("\n✔ 保存: {}", output.display());
        }

        Commands::Config { show, init } => {
            if init {
                let path = match cli.config {
                    Some(path) => path,
                    None => Config::config_path()?,
                };
                Config::default().save(&path)?;
                println!("✔ デフォルト設定を書き出しました: {}", path.display());
            }

            if show || !init {
                println!("設定:");
                println!("  参照フォルダ: {}", config.catalog.reference_dir.display());
                println!("  インデックス: {}", config.catalog.index_path.display());
                println!("  マニフェスト: {}", config.catalog.manifest_path.display());
                println!("  最大距離: {}", config.thresholds.max_distance);
                println!("  最小マージン: {}", config.thresholds.min_margin);
                if config.grid.is_fixed() {
                    let g = &config.grid;
                    println!(
                        "  グリッド: {}行 x {}列 (余白 {},{} / 間隔 {},{})",
                        g.rows, g.cols, g.margin_x, g.margin_y, g.gap_x, g.gap_y
                    );
                } else {
                    println!("  グリッド: 自動検出");
                }
            }
        }
    }

    Ok(())
}

/// カタログを読み込んでストアを差し替える。再構築時は進捗バーを出す
fn refresh_catalog(store: &CatalogStore, config: &Config, force_rebuild: bool) -> Result<Arc<catalog::CatalogSnapshot>> {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner} 参照画像をハッシュ化中 {pos}枚")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let on_progress = || progress.inc(1);
    let snapshot = if force_rebuild {
        let rebuilt = catalog::rebuild(&config.catalog, &config.central_crop, on_progress)?;
        store.replace(rebuilt)
    } else {
        store.refresh(&config.catalog, &config.central_crop, on_progress)?
    };
    progress.finish_and_clear();

    Ok(snapshot)
}
