//! レイアウト計算のヘルパー関数

use ratatui::prelude::*;

/// 画面共通の3つの領域
pub struct MainLayout {
    /// 本文の領域
    pub body: Rect,
    /// HELPバーの領域
    pub help_bar: Rect,
    /// STATUSバーの領域
    pub status_bar: Rect,
}

/// 本文を左右に分けた領域（一覧 + INFO Panel）
pub struct BodyLayout {
    /// 一覧・フォームの領域
    pub list: Rect,
    /// INFO Panelの領域
    pub info_panel: Rect,
}

/// ウィザード本文の領域
pub struct WizardLayout {
    /// ステップ表示と進捗バー
    pub header: Rect,
    /// ステージごとの内容
    pub content: Rect,
}

/// 画面を3つの領域に分割（Body + HELP + STATUS）
pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Body
            Constraint::Length(3), // HELPバー
            Constraint::Length(3), // STATUSバー
        ])
        .split(area);

    MainLayout {
        body: chunks[0],
        help_bar: chunks[1],
        status_bar: chunks[2],
    }
}

/// Body領域を2つに分割（一覧 65% + INFO Panel 35%）
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(65), // 一覧
            Constraint::Percentage(35), // INFO Panel
        ])
        .split(area);

    BodyLayout {
        list: chunks[0],
        info_panel: chunks[1],
    }
}

/// ウィザード本文をヘッダ（ステップ + ゲージ）と内容に分割
pub fn create_wizard_layout(area: Rect) -> WizardLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // ステップ + 進捗
            Constraint::Min(1),    // 内容
        ])
        .split(area);

    WizardLayout {
        header: chunks[0],
        content: chunks[1],
    }
}
