//! TUI内での文字列入力コンポーネント（InputBox）。

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::wizard::DraftField;

/// InputBox入力状態
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// プロンプトメッセージ
    pub prompt: String,
    /// 現在の入力値
    pub value: String,
    /// カーソル位置（文字単位）
    pub cursor: usize,
    /// 入力を伏せ字で表示するか（パスワード用）
    pub masked: bool,
    /// 入力完了時のコールバック識別子
    pub callback_id: InputCallbackId,
}

/// 入力完了時のコールバック識別子
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputCallbackId {
    // Login画面用
    LoginUsername,
    LoginPassword,

    // Deliveries画面用
    FilterCity,

    // Wizard画面用
    WizardPhotoPaths,
    WizardField(DraftField),
    WizardProductQuantity(i64),

    // Chat画面用
    ChatMessage,

    // Products画面用（新規はSKU→名称→単位の順に入力）
    NewProductSku,
    NewProductName { sku: String },
    NewProductUnit { sku: String, name: String },
    // 編集ではSKUを変更できない
    EditProductName { id: i64, unit: String },
    EditProductUnit { id: i64, name: String },
    DeleteProduct(i64),
}

impl InputBoxState {
    /// 初期値付きで入力ボックスを作る（カーソルは末尾）。
    pub fn new(prompt: impl Into<String>, value: impl Into<String>, callback_id: InputCallbackId) -> Self {
        let value = value.into();
        Self {
            prompt: prompt.into(),
            cursor: value.chars().count(),
            value,
            masked: false,
            callback_id,
        }
    }

    /// 伏せ字表示の入力ボックスにする。
    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    /// 文字を挿入
    pub fn insert_char(&mut self, c: char) {
        // カーソル位置のバイトオフセットを求めて挿入する。
        let at = self.byte_offset(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Backspace（カーソル前の文字を削除）
    pub fn backspace(&mut self) {
        // カーソルが先頭なら何もしない。
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_offset(self.cursor);
            self.value.remove(at);
        }
    }

    /// Delete（カーソル位置の文字を削除）
    pub fn delete(&mut self) {
        // カーソルが末尾なら何もしない。
        if self.cursor < self.value.chars().count() {
            let at = self.byte_offset(self.cursor);
            self.value.remove(at);
        }
    }

    /// カーソルを左に移動
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// カーソルを右に移動
    pub fn move_right(&mut self) {
        // 末尾を超えないようにする。
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    /// カーソルを先頭に移動
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// カーソルを末尾に移動
    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// 行全体をクリア
    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// 文字位置からバイト位置へ変換する。
    fn byte_offset(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// 表示用の文字列（伏せ字なら*に置換）。
    fn display_value(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

/// InputBoxをポップアップとして描画
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    // 中央に配置されたポップアップ領域を計算する。
    let popup_area = centered_popup(f.area(), 70, 7);

    // 既存の描画を消してポップアップ用の背景にする。
    f.render_widget(Clear, popup_area);

    // ポップアップの外枠とスタイルを描画する。
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Input")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    // 内部レイアウト（プロンプト + 入力フィールド + ヘルプ）を定義する。
    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // プロンプト
            Constraint::Length(1), // 入力フィールド
            Constraint::Length(1), // 空行
            Constraint::Length(1), // ヘルプ
        ])
        .split(popup_area);

    // プロンプトメッセージを描画する。
    let prompt_widget = Paragraph::new(state.prompt.clone()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt_widget, inner_layout[0]);

    // カーソル位置が表示幅を超えた場合のスクロール量を算出する。
    let display_width = inner_layout[1].width as usize;
    let scroll_offset = state.cursor.saturating_sub(display_width.saturating_sub(2));

    // 現在の入力値を可視範囲に切り出し、カーソル位置に|を挿入する。
    let chars: Vec<char> = state.display_value().chars().collect();
    let cursor_in_visible = state.cursor - scroll_offset;
    let visible: Vec<char> = chars
        .iter()
        .skip(scroll_offset)
        .take(display_width.saturating_sub(1))
        .copied()
        .collect();
    let split = cursor_in_visible.min(visible.len());
    let before: String = visible[..split].iter().collect();
    let after: String = visible[split..].iter().collect();

    // 文字列とカーソルを含む入力欄を描画する。
    let input_widget =
        Paragraph::new(format!("{before}|{after}")).style(Style::default().fg(Color::Green));
    f.render_widget(input_widget, inner_layout[1]);

    // ヘルプテキストを描画する。
    let help = Paragraph::new("Enter=OK | Esc=Cancel | Ctrl+U=Clear")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, inner_layout[3]);
}

/// 中央配置のポップアップ領域を計算
pub fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    // 縦方向の余白を作り、中央行を取り出す。
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    // 横方向も中央に寄せてポップアップ領域を返す。
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_handles_multibyte_text() {
        // マルチバイト文字を含む編集を検証する。
        let mut s = InputBoxState::new("Street:", "Jl. Ké", InputCallbackId::ChatMessage);
        s.insert_char('5');
        assert_eq!(s.value, "Jl. Ké5");
        s.move_left();
        s.backspace();
        assert_eq!(s.value, "Jl. K5");
        s.move_home();
        s.delete();
        assert_eq!(s.value, "l. K5");
        assert_eq!(s.cursor, 0);
    }

    #[test]
    fn masked_input_hides_value() {
        // パスワード入力は伏せ字で表示する。
        let s = InputBoxState::new("Password:", "pw1", InputCallbackId::LoginPassword).masked();
        assert_eq!(s.display_value(), "***");
        assert_eq!(s.value, "pw1");
    }
}
