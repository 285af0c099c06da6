//! 画面遷移用のUI状態と画面種別。

/// TUIで現在表示中の画面。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// ログイン画面。
    Login,
    /// 配送一覧画面。
    Deliveries,
    /// 選択配送の詳細画面。
    Detail,
    /// 配送作成ウィザード画面。
    Wizard,
    /// 配送ごとのチャット画面。
    Chat,
    /// 商品カタログ管理画面（スーパーバイザーのみ）。
    Products,
}

/// 描画側と共有するUI状態。
#[derive(Clone, Debug)]
pub struct UiState {
    /// 現在の画面。
    pub screen: Screen,
    /// 一覧の選択行。
    pub selected: usize,
    /// 詳細画面で選択中の写真。
    pub selected_photo: usize,
    /// ウィザードで選択中の行（写真・住所欄・商品）。
    pub wizard_cursor: usize,
    /// 商品管理画面の選択行。
    pub selected_product: usize,
    /// 右側パネルに表示するログ。
    pub log: Vec<String>,
    /// 画面下部のステータス文言。
    pub status: String,
    /// エラーメッセージ（強調表示用）。
    pub error: Option<String>,
}

impl UiState {
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            selected: 0,
            selected_photo: 0,
            wizard_cursor: 0,
            selected_product: 0,
            log: vec![],
            status: "Ready".into(),
            error: None,
        }
    }
}
