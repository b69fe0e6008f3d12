use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "icon-grid")]
#[command(about = "スクリーンショットのアイコングリッド検出・知覚ハッシュ照合ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（デフォルト: ~/.config/icon-grid/config.json）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// スクリーンショットからアイコンを検出
    Detect {
        /// 画像ファイル（複数可）
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// 出力JSONファイル（デフォルト: 標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 固定グリッド設定JSON（calibrateの出力）
        #[arg(short, long)]
        grid_spec: Option<PathBuf>,

        /// 採用する最大ハミング距離
        #[arg(long)]
        max_dist: Option<u32>,

        /// 次点との最小マージン
        #[arg(long)]
        min_margin: Option<u32>,

        /// 検出したタイル配置も表示
        #[arg(long)]
        show_layout: bool,
    },

    /// 参照カタログ（インデックス）の管理
    Index {
        /// インデックス情報を表示
        #[arg(short, long)]
        info: bool,

        /// 参照画像から強制的に再構築
        #[arg(short, long)]
        rebuild: bool,
    },

    /// サンプル画像から固定グリッド設定を推定
    Calibrate {
        /// サンプルのスクリーンショット
        #[arg(required = true)]
        image: PathBuf,

        /// 出力JSONファイル
        #[arg(short, long, default_value = "data/grid_spec.json")]
        output: PathBuf,
    },

    /// 設定の表示・初期化
    Config {
        /// 現在の設定を表示
        #[arg(short, long)]
        show: bool,

        /// デフォルト設定を設定ファイルに書き出す
        #[arg(long)]
        init: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_detect() {
        let cli = Cli::parse_from(["icon-grid", "detect", "a.png", "b.png", "--max-dist", "10", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Detect { images, max_dist, min_margin, .. } => {
                assert_eq!(images.len(), 2);
                assert_eq!(max_dist, Some(10));
                assert_eq!(min_margin, None);
            }
            _ => panic!("detect expected"),
        }
    }
}
