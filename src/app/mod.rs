//! TUIのイベントループ、入力処理、状態管理。

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::mpsc;

use crate::{
    api::models::{DeliveryFilter, DeliveryListItem, Product, User, UserRole},
    chat::ChatState,
    config::Config,
    events::{Screen, UiState},
    input::InputBoxState,
    resource::Resource,
    session::SessionStore,
    shortcuts::Shortcuts,
    ui::Tui,
    wizard::DeliveryDraft,
    worker::{self, DeliveryRow, WizardCmd, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// 入力処理と描画で共有するアプリ状態。
pub struct App {
    /// メモリ上の現在設定。
    pub cfg: Config,
    /// 選択位置やステータスなどUI固有の状態。
    pub ui: UiState,
    /// ログイン中のユーザー（未ログインならNone）。
    pub user: Option<User>,
    /// ログイン画面で編集するユーザー名。
    pub login_username: String,
    /// ログイン画面で編集するパスワード。
    pub login_password: String,
    /// 配送一覧（未読数付き）。
    pub deliveries: Resource<Vec<DeliveryRow>>,
    /// 一覧の絞り込み条件。
    pub filter: DeliveryFilter,
    /// 詳細画面で表示中の配送。
    pub detail: Resource<DeliveryListItem>,
    /// ウィザードの最新スナップショット。
    pub draft: Option<DeliveryDraft>,
    /// チャットの最新スナップショット。
    pub chat: Option<ChatState>,
    /// 商品管理画面のカタログ。
    pub products: Resource<Vec<Product>>,
    /// Workerへのコマンド送信チャネル。
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    /// Workerからのイベント受信チャネル。
    pub worker_rx: mpsc::Receiver<WorkerEvent>,
    /// 入力ボックスの状態（入力中はSome）。
    pub input_box: Option<InputBoxState>,
    /// ショートカットキー設定。
    pub shortcuts: Shortcuts,
}

impl App {
    /// ログイン中ユーザーの役割（未ログインならNone）。
    pub fn role(&self) -> Option<UserRole> {
        self.user.as_ref().map(|u| u.role)
    }
}

/// ユーザーが終了するまでメインTUIループを回す。
pub async fn run_app(terminal: &mut Tui, cfg: Config) -> Result<()> {
    // ショートカット設定を読み込む（無ければデフォルト）。
    let shortcuts_path = PathBuf::from("shortcut.toml");
    let shortcuts = Shortcuts::load_or_default(&shortcuts_path)?;

    // 接続先サーバーごとのセッションを開く。
    let session = Arc::new(SessionStore::open(&cfg.session.path, &cfg.api.base_url).await?);

    // Worker通信用のコマンド/イベントチャネルを作る。
    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);

    // 設定スナップショットとセッションでWorkerを起動する。
    tokio::spawn(worker::run(rx_cmd, tx_ev, cfg.clone(), session));

    // 保存済みセッションがあればWorkerがLoggedInを送ってくる。
    let mut app = App {
        cfg,
        ui: UiState::new(Screen::Login),
        user: None,
        login_username: String::new(),
        login_password: String::new(),
        deliveries: Resource::Success(vec![]),
        filter: DeliveryFilter::default(),
        detail: Resource::Loading,
        draft: None,
        chat: None,
        products: Resource::Success(vec![]),
        worker_tx: tx_cmd,
        worker_rx: rx_ev,
        input_box: None,
        shortcuts,
    };

    loop {
        // 現在の状態を描画する。
        terminal.draw(|f| draw(f, &app))?;

        // 入力処理の前にWorkerイベントを消化する。
        while let Ok(ev) = app.worker_rx.try_recv() {
            handle_worker_event(&mut app, ev).await?;
        }

        // UIの応答性確保のため短いタイムアウトで入力をポーリングする。
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            // どのフェーズでもCtrl+Cで終了できるようにする。
            if is_ctrl_c(&k) {
                break;
            }
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }
    Ok(())
}

/// WorkerイベントをUI状態へ反映する。
async fn handle_worker_event(app: &mut App, ev: WorkerEvent) -> Result<()> {
    match ev {
        WorkerEvent::LoggedIn(user) => {
            // 一覧画面へ移動して最新の配送を取得する。
            app.ui.status = format!("Signed in as {} ({:?})", user.username, user.role);
            app.user = Some(user);
            app.login_password.clear();
            app.ui.error = None;
            app.ui.screen = Screen::Deliveries;
            request_refresh(app).await?;
        }
        WorkerEvent::LoggedOut => {
            // 画面状態を初期化してログイン画面へ戻る。
            app.user = None;
            app.deliveries = Resource::Success(vec![]);
            app.draft = None;
            app.chat = None;
            app.products = Resource::Success(vec![]);
            app.ui = UiState::new(Screen::Login);
            app.ui.status = "Signed out".into();
        }
        WorkerEvent::Deliveries(list) => {
            // 一覧を更新し、選択位置を範囲内に収める。
            if let Resource::Success(rows) = &list {
                app.ui.selected = app.ui.selected.min(rows.len().saturating_sub(1));
                app.ui.status = format!("Loaded {} deliveries", rows.len());
            }
            app.deliveries = list;
        }
        WorkerEvent::Detail(detail) => {
            // 写真の選択位置を範囲内に収める。
            if let Resource::Success(item) = &detail {
                app.ui.selected_photo = app
                    .ui
                    .selected_photo
                    .min(item.photos.len().saturating_sub(1));
            }
            app.detail = detail;
        }
        WorkerEvent::Draft(draft) => {
            // ウィザード画面以外に届いた古いスナップショットは捨てる。
            if app.ui.screen != Screen::Wizard {
                return Ok(());
            }
            if draft.is_completed {
                // 完了したら一覧へ戻り、Worker側の下書きも破棄する。
                app.worker_tx.send(WorkerCmd::Wizard(WizardCmd::Cancel)).await?;
                app.draft = None;
                app.ui.screen = Screen::Deliveries;
                app.ui.status = "Delivery saved".into();
                request_refresh(app).await?;
            } else {
                app.draft = Some(*draft);
            }
        }
        WorkerEvent::Chat(state) => {
            // チャット画面表示中のみ反映する。
            if app.ui.screen == Screen::Chat {
                app.chat = Some(*state);
            }
        }
        WorkerEvent::Products(list) => {
            // 削除後などに選択位置が範囲外にならないよう調整する。
            if let Resource::Success(items) = &list {
                app.ui.selected_product = app
                    .ui
                    .selected_product
                    .min(items.len().saturating_sub(1));
            }
            app.products = list;
        }
        WorkerEvent::Log(s) => {
            // 成功メッセージはステータス行にも出す。
            app.ui.status = s.clone();
            // ログを追加する。
            app.ui.log.push(s);
        }
        WorkerEvent::Error(s) => {
            // エラーを強調表示する。
            app.ui.status = "Error".into();
            app.ui.error = Some(s);
        }
    }
    Ok(())
}

/// 現在の絞り込み条件でWorkerへ一覧の再取得を依頼する。
pub async fn request_refresh(app: &mut App) -> Result<()> {
    tracing::info!("refresh requested");
    app.worker_tx
        .send(WorkerCmd::RefreshDeliveries(app.filter.clone()))
        .await?;
    app.ui.status = "Refreshing deliveries...".into();
    Ok(())
}
