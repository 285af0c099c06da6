//! アプリケーションのエントリポイントとランタイム初期化。

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

mod api;
mod app;
mod catalog;
mod chat;
mod config;
mod error;
mod events;
mod exif_location;
mod geocoding;
mod input;
mod layout;
mod resource;
mod session;
mod shortcuts;
mod timefmt;
mod ui;
mod wizard;
mod worker;

/// ファイルロギングを初期化し、非同期ガードを生存させる。
fn init_logging(log_file: &str) -> Result<WorkerGuard> {
    // TUIの標準出力を汚さないよう、ファイルへ直接書き込む。
    let file_appender = tracing_appender::rolling::never(".", log_file);
    // 非同期書き込み用のラッパーとガードを用意する。
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    tracing::info!("logging to {}", log_file);
    Ok(guard)
}

#[tokio::main]
/// エントリポイント：設定読込→ログ初期化→UI開始→端末復元。
async fn main() -> Result<()> {
    // 設定を読み込む（無ければ既定値で作成）。
    let cfg = config::Config::load_or_default(Path::new("config.toml"))?;
    // ロガーを初期化し、ガードを保持して書き込みを継続させる。
    let _log_guard = init_logging(&cfg.logging.file)?;
    tracing::info!("app starting, server {}", cfg.api.base_url);
    // TUI用の端末状態へ切り替える。
    let mut terminal = ui::init_terminal()?;
    let res = app::run_app(&mut terminal, cfg).await;
    // 端末の状態を必ず元に戻す。
    ui::restore_terminal()?;
    if let Err(ref e) = res {
        tracing::error!("app error: {e}");
    }
    tracing::info!("app exiting");
    res
}
