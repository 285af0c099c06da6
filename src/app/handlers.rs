//! キー入力ハンドラー関数。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

use crate::{
    api::models::{DeliveryStatus, UserRole},
    catalog::ProductForm,
    events::Screen,
    input::{InputBoxState, InputCallbackId},
    resource::Resource,
    shortcuts,
    wizard::{DeliveryDraft, DraftField, WizardStage},
    worker::{ChatCmd, ProductCmd, WizardCmd, WorkerCmd},
};

use super::{App, request_refresh};

/// キー入力を1件処理し、終了すべきならtrueを返す。
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 入力ボックスが開いていれば最優先で処理する。
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }

    // 表示済みのエラーは次のキー入力で消す。
    app.ui.error = None;

    // 画面ごとのハンドラへ委譲する。
    match app.ui.screen {
        Screen::Login => handle_login_key(app, k).await,
        Screen::Deliveries => handle_deliveries_key(app, k).await,
        Screen::Detail => handle_detail_key(app, k).await,
        Screen::Wizard => handle_wizard_key(app, k).await,
        Screen::Chat => handle_chat_key(app, k).await,
        Screen::Products => handle_products_key(app, k).await,
    }
}

/// 役割が合わなければステータス行に理由を出してfalseを返す。
fn require_role(app: &mut App, role: UserRole, action: &str) -> bool {
    if app.role() == Some(role) {
        return true;
    }
    let who = match role {
        UserRole::Sales => "sales users",
        UserRole::Supervisor => "supervisors",
    };
    app.ui.status = format!("Only {who} can {action}");
    false
}

/// Ctrl+Cかどうかを判定する。
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// ログイン画面のキー処理。
async fn handle_login_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.login;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.username) {
        // ユーザー名の入力ボックスを開く。
        app.input_box = Some(InputBoxState::new(
            "Username:",
            app.login_username.clone(),
            InputCallbackId::LoginUsername,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.password) {
        // パスワードは伏せ字で入力させる。
        app.input_box = Some(
            InputBoxState::new("Password:", "", InputCallbackId::LoginPassword).masked(),
        );
    } else if shortcuts::matches_shortcut(&k, &sc.submit) {
        // 両方そろっていればWorkerへログインを依頼する。
        if app.login_username.trim().is_empty() || app.login_password.is_empty() {
            app.ui.error = Some("username and password are required".into());
            return Ok(false);
        }
        app.worker_tx
            .send(WorkerCmd::Login {
                username: app.login_username.trim().to_string(),
                password: app.login_password.clone(),
            })
            .await?;
        app.ui.status = "Signing in...".into();
    }

    Ok(false)
}

/// 配送一覧画面のキー処理。
async fn handle_deliveries_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.deliveries;
    let count = app.deliveries.items().len();

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.refresh) {
        request_refresh(app).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        // 次の行へ移動する。
        if app.ui.selected + 1 < count {
            app.ui.selected += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        // 前の行へ移動する。
        app.ui.selected = app.ui.selected.saturating_sub(1);
    } else if shortcuts::matches_shortcut(&k, &sc.open) {
        // 選択中の配送の詳細を開く。
        let Some(row) = app.deliveries.items().get(app.ui.selected) else {
            return Ok(false);
        };
        let id = row.item.delivery.id;
        app.detail = Resource::Loading;
        app.ui.selected_photo = 0;
        app.ui.screen = Screen::Detail;
        app.worker_tx.send(WorkerCmd::OpenDelivery(id)).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.new_delivery) {
        // 配送の作成は営業のみ。
        if !require_role(app, UserRole::Sales, "create deliveries") {
            return Ok(false);
        }
        // 新しい下書きでウィザードを開始する。
        app.draft = None;
        app.ui.wizard_cursor = 0;
        app.ui.screen = Screen::Wizard;
        app.worker_tx
            .send(WorkerCmd::Wizard(WizardCmd::Start))
            .await?;
    } else if shortcuts::matches_shortcut(&k, &sc.filter_status) {
        // ステータス絞り込みを順に切り替える。
        app.filter.status = next_status_filter(app.filter.status);
        app.ui.selected = 0;
        request_refresh(app).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.filter_city) {
        // 市区の絞り込みを入力させる。
        app.input_box = Some(InputBoxState::new(
            "City filter (empty = all):",
            app.filter.city.clone().unwrap_or_default(),
            InputCallbackId::FilterCity,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.products) {
        // 商品管理はスーパーバイザーのみ。
        if !require_role(app, UserRole::Supervisor, "manage products") {
            return Ok(false);
        }
        app.products = Resource::Loading;
        app.ui.selected_product = 0;
        app.ui.screen = Screen::Products;
        send_products(app, ProductCmd::Load).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.logout) {
        app.worker_tx.send(WorkerCmd::Logout).await?;
    }

    Ok(false)
}

/// 絞り込みなし→各ステータス→絞り込みなし、の順に巡回する。
fn next_status_filter(current: Option<DeliveryStatus>) -> Option<DeliveryStatus> {
    match current {
        None => Some(DeliveryStatus::NeedToConfirm),
        Some(DeliveryStatus::NeedToConfirm) => Some(DeliveryStatus::Ready),
        Some(DeliveryStatus::Ready) => Some(DeliveryStatus::Done),
        Some(DeliveryStatus::Done) => Some(DeliveryStatus::Broken),
        Some(DeliveryStatus::Broken) => None,
    }
}

/// 配送詳細画面のキー処理。
async fn handle_detail_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.detail;

    if shortcuts::matches_shortcut(&k, &sc.back) {
        // 一覧へ戻り、変更を反映するため再取得する。
        app.ui.screen = Screen::Deliveries;
        request_refresh(app).await?;
        return Ok(false);
    }

    // 以降の操作は詳細が読み込み済みのときのみ有効。
    let Some(item) = app.detail.data().cloned() else {
        return Ok(false);
    };
    let delivery_id = item.delivery.id;
    let photo_count = item.photos.len();

    if shortcuts::matches_shortcut(&k, &sc.refresh) {
        app.worker_tx
            .send(WorkerCmd::OpenDelivery(delivery_id))
            .await?;
    } else if shortcuts::matches_shortcut(&k, &sc.chat) {
        // チャット画面へ移動して接続を依頼する。
        app.chat = None;
        app.ui.screen = Screen::Chat;
        app.worker_tx
            .send(WorkerCmd::Chat(ChatCmd::Open(delivery_id)))
            .await?;
    } else if shortcuts::matches_shortcut(&k, &sc.next_photo) {
        if app.ui.selected_photo + 1 < photo_count {
            app.ui.selected_photo += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.prev_photo) {
        app.ui.selected_photo = app.ui.selected_photo.saturating_sub(1);
    } else if shortcuts::matches_shortcut(&k, &sc.delete_photo) {
        if !require_role(app, UserRole::Supervisor, "delete photos") {
            return Ok(false);
        }
        // 選択中の写真を削除する（完了後に詳細を再読込）。
        if let Some(photo) = item.photos.get(app.ui.selected_photo) {
            let photo_id = photo.id;
            app.worker_tx
                .send(WorkerCmd::DeletePhoto {
                    delivery_id,
                    photo_id,
                })
                .await?;
            app.ui.status = format!("Deleting photo {photo_id}...");
        }
    } else if shortcuts::matches_shortcut(&k, &sc.cycle_status) {
        if !require_role(app, UserRole::Supervisor, "change delivery status") {
            return Ok(false);
        }
        // ステータスを次の値へ進める。
        let status = item.delivery.status.cycled();
        app.worker_tx
            .send(WorkerCmd::SetStatus {
                delivery_id,
                status,
            })
            .await?;
        app.ui.status = format!("Setting status to {}...", status.as_str());
    }

    Ok(false)
}

/// ウィザード画面のキー処理。
async fn handle_wizard_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = app.shortcuts.wizard.clone();

    if shortcuts::matches_shortcut(&k, &sc.cancel) {
        // 下書きを破棄して一覧へ戻る（作成済みの仮配送はサーバーに残る）。
        app.worker_tx
            .send(WorkerCmd::Wizard(WizardCmd::Cancel))
            .await?;
        app.draft = None;
        app.ui.screen = Screen::Deliveries;
        request_refresh(app).await?;
        return Ok(false);
    }

    // スナップショット未着の間は操作を受け付けない。
    let Some(draft) = app.draft.clone() else {
        return Ok(false);
    };
    // 通信中は重複操作を防ぐ。
    if draft.is_uploading || draft.is_loading {
        return Ok(false);
    }

    let rows = wizard_row_count(app);
    if shortcuts::matches_shortcut(&k, &sc.dismiss_error) {
        send_wizard(app, WizardCmd::ClearError).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        if app.ui.wizard_cursor + 1 < rows {
            app.ui.wizard_cursor += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        app.ui.wizard_cursor = app.ui.wizard_cursor.saturating_sub(1);
    } else if shortcuts::matches_shortcut(&k, &sc.next) {
        // 現在のステージを確定する。
        let cmd = match draft.current_stage {
            WizardStage::SelectPhotos => WizardCmd::ConfirmPhotos,
            WizardStage::ReviewLocation => WizardCmd::ConfirmLocation,
            WizardStage::AddProducts => WizardCmd::Save,
        };
        app.ui.wizard_cursor = 0;
        send_wizard(app, cmd).await?;
    } else {
        match draft.current_stage {
            WizardStage::SelectPhotos => {
                if shortcuts::matches_shortcut(&k, &sc.add) {
                    // 写真のパスを入力させる（カンマ区切り・ディレクトリ可）。
                    app.input_box = Some(InputBoxState::new(
                        "Photo files or folders (comma separated):",
                        "",
                        InputCallbackId::WizardPhotoPaths,
                    ));
                } else if shortcuts::matches_shortcut(&k, &sc.remove)
                    && let Some(p) = draft.selected_photos.get(app.ui.wizard_cursor)
                {
                    send_wizard(app, WizardCmd::RemovePhoto(p.source.clone())).await?;
                }
            }
            WizardStage::ReviewLocation => {
                // 選択中の住所欄を編集する。
                if (shortcuts::matches_shortcut(&k, &sc.edit)
                    || shortcuts::matches_shortcut(&k, &sc.add))
                    && let Some(field) = DraftField::LOCATION.get(app.ui.wizard_cursor)
                {
                    app.input_box = Some(InputBoxState::new(
                        format!("{}:", field.label()),
                        draft.field(*field),
                        InputCallbackId::WizardField(*field),
                    ));
                }
            }
            WizardStage::AddProducts => {
                handle_product_key(app, &k, &draft).await?;
            }
        }
    }

    Ok(false)
}

/// 商品ステージのキー処理（0行目はメモ、以降はカタログ）。
async fn handle_product_key(
    app: &mut App,
    k: &KeyEvent,
    draft: &DeliveryDraft,
) -> Result<()> {
    let sc = app.shortcuts.wizard.clone();

    if shortcuts::matches_shortcut(k, &sc.reload_products) {
        return send_wizard(app, WizardCmd::ReloadProducts).await;
    }

    if app.ui.wizard_cursor == 0 {
        // メモ欄を編集する。
        if shortcuts::matches_shortcut(k, &sc.edit) || shortcuts::matches_shortcut(k, &sc.add) {
            app.input_box = Some(InputBoxState::new(
                "Notes:",
                draft.notes.clone(),
                InputCallbackId::WizardField(DraftField::Notes),
            ));
        }
        return Ok(());
    }

    let Some(product) = draft
        .available_products
        .items()
        .get(app.ui.wizard_cursor - 1)
        .cloned()
    else {
        return Ok(());
    };
    let selected = draft
        .selected_products
        .iter()
        .find(|p| p.product.id == product.id);

    if shortcuts::matches_shortcut(k, &sc.add) {
        // 数量1で追加する（既に追加済みなら何もしない）。
        send_wizard(
            app,
            WizardCmd::AddProduct {
                product_id: product.id,
                quantity: 1.0,
            },
        )
        .await?;
    } else if shortcuts::matches_shortcut(k, &sc.remove) {
        send_wizard(app, WizardCmd::RemoveProduct(product.id)).await?;
    } else if shortcuts::matches_shortcut(k, &sc.edit) {
        // 数量を入力させる。
        let current = selected.map(|p| p.quantity.to_string()).unwrap_or_default();
        app.input_box = Some(InputBoxState::new(
            format!("Quantity of {} ({}):", product.name, product.unit),
            current,
            InputCallbackId::WizardProductQuantity(product.id),
        ));
    }
    Ok(())
}

/// 現在のステージで選択可能な行数。
fn wizard_row_count(app: &App) -> usize {
    let Some(draft) = &app.draft else {
        return 0;
    };
    match draft.current_stage {
        WizardStage::SelectPhotos => draft.selected_photos.len(),
        WizardStage::ReviewLocation => DraftField::LOCATION.len(),
        WizardStage::AddProducts => 1 + draft.available_products.items().len(),
    }
}

async fn send_wizard(app: &mut App, cmd: WizardCmd) -> Result<()> {
    app.worker_tx.send(WorkerCmd::Wizard(cmd)).await?;
    Ok(())
}

/// チャット画面のキー処理。
async fn handle_chat_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.chat;

    if shortcuts::matches_shortcut(&k, &sc.back) {
        // 接続を閉じて詳細画面へ戻る。
        app.worker_tx.send(WorkerCmd::Chat(ChatCmd::Close)).await?;
        app.chat = None;
        app.ui.screen = Screen::Detail;
        if let Some(item) = app.detail.data() {
            let id = item.delivery.id;
            app.worker_tx.send(WorkerCmd::OpenDelivery(id)).await?;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.compose) {
        app.input_box = Some(InputBoxState::new(
            "Message:",
            "",
            InputCallbackId::ChatMessage,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.load_older) {
        app.worker_tx
            .send(WorkerCmd::Chat(ChatCmd::LoadOlder))
            .await?;
    } else if shortcuts::matches_shortcut(&k, &sc.dismiss_error) {
        app.worker_tx
            .send(WorkerCmd::Chat(ChatCmd::ClearError))
            .await?;
    }

    Ok(false)
}

/// 商品管理画面のキー処理。
async fn handle_products_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = app.shortcuts.products.clone();
    let count = app.products.items().len();

    if shortcuts::matches_shortcut(&k, &sc.back) {
        app.ui.screen = Screen::Deliveries;
        return Ok(false);
    }
    // 役割が変わっていた場合に備え、画面内の操作も毎回確認する。
    if !require_role(app, UserRole::Supervisor, "manage products") {
        return Ok(false);
    }

    if shortcuts::matches_shortcut(&k, &sc.refresh) {
        send_products(app, ProductCmd::Load).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        if app.ui.selected_product + 1 < count {
            app.ui.selected_product += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        app.ui.selected_product = app.ui.selected_product.saturating_sub(1);
    } else if shortcuts::matches_shortcut(&k, &sc.add) {
        // SKUから順に入力させる。
        app.input_box = Some(InputBoxState::new(
            "New product SKU:",
            "",
            InputCallbackId::NewProductSku,
        ));
    } else if let Some(p) = app.products.items().get(app.ui.selected_product).cloned() {
        if shortcuts::matches_shortcut(&k, &sc.edit) {
            // SKUは固定のまま名称→単位を編集する。
            app.input_box = Some(InputBoxState::new(
                format!("Name of {}:", p.sku),
                p.name,
                InputCallbackId::EditProductName {
                    id: p.id,
                    unit: p.unit,
                },
            ));
        } else if shortcuts::matches_shortcut(&k, &sc.delete) {
            // 誤操作防止のため確認を取る。
            app.input_box = Some(InputBoxState::new(
                format!("Delete {} ({})? type y to confirm:", p.name, p.sku),
                "",
                InputCallbackId::DeleteProduct(p.id),
            ));
        }
    }

    Ok(false)
}

async fn send_products(app: &mut App, cmd: ProductCmd) -> Result<()> {
    app.worker_tx.send(WorkerCmd::Products(cmd)).await?;
    Ok(())
}

/// 入力ボックスのキー処理。
async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 入力ボックスが無ければ何もしない。
    let Some(input_state) = &mut app.input_box else {
        return Ok(false);
    };

    // 入力ボックス用ショートカットを参照する。
    let sc = &app.shortcuts.input_box;

    // 入力ボックス中でもCtrl+Cで終了できるようにする。
    if is_ctrl_c(&k) {
        return Ok(true);
    }

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        // 入力ボックスを閉じる前に値とコールバック種別を保存する。
        let value = input_state.value.clone();
        let callback_id = input_state.callback_id.clone();
        app.input_box = None;

        // コールバック種別に応じて値を反映する。
        apply_input_callback(app, callback_id, value).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        // 入力を破棄して入力ボックスを閉じる。
        app.input_box = None;
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        input_state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        input_state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        input_state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        input_state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        input_state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        input_state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        // コントロールキーでない通常の文字のみ挿入する。
        input_state.insert_char(c);
    }

    Ok(false)
}

/// 入力ボックスのコールバックを適用する。
async fn apply_input_callback(
    app: &mut App,
    callback_id: InputCallbackId,
    value: String,
) -> Result<()> {
    match callback_id {
        InputCallbackId::LoginUsername => app.login_username = value,
        InputCallbackId::LoginPassword => app.login_password = value,
        InputCallbackId::FilterCity => {
            // 空欄なら絞り込みを解除して再取得する。
            let city = value.trim();
            app.filter.city = (!city.is_empty()).then(|| city.to_string());
            app.ui.selected = 0;
            request_refresh(app).await?;
        }
        InputCallbackId::WizardPhotoPaths => {
            let paths = parse_paths(&value);
            if !paths.is_empty() {
                send_wizard(app, WizardCmd::AddPhotos(paths)).await?;
            }
        }
        InputCallbackId::WizardField(field) => {
            send_wizard(app, WizardCmd::SetField(field, value)).await?;
        }
        InputCallbackId::WizardProductQuantity(product_id) => {
            // 数値でなければエラー表示のみ。
            let Ok(quantity) = value.trim().parse::<f64>() else {
                app.ui.error = Some("quantity must be a number".into());
                return Ok(());
            };
            let already = app.draft.as_ref().is_some_and(|d| {
                d.selected_products
                    .iter()
                    .any(|p| p.product.id == product_id)
            });
            let cmd = if already {
                WizardCmd::SetQuantity {
                    product_id,
                    quantity,
                }
            } else {
                WizardCmd::AddProduct {
                    product_id,
                    quantity,
                }
            };
            send_wizard(app, cmd).await?;
        }
        InputCallbackId::ChatMessage => {
            app.worker_tx
                .send(WorkerCmd::Chat(ChatCmd::Send(value)))
                .await?;
        }
        InputCallbackId::NewProductSku => {
            app.input_box = Some(InputBoxState::new(
                "Product name:",
                "",
                InputCallbackId::NewProductName { sku: value },
            ));
        }
        InputCallbackId::NewProductName { sku } => {
            app.input_box = Some(InputBoxState::new(
                "Unit (e.g. pcs, sak):",
                "",
                InputCallbackId::NewProductUnit { sku, name: value },
            ));
        }
        InputCallbackId::NewProductUnit { sku, name } => {
            // 空欄チェックはWorker側でも行うが、ここで先に弾く。
            let form = ProductForm {
                sku,
                name,
                unit: value,
            };
            if let Some(label) = form.missing_field() {
                app.ui.error = Some(format!("{label} is required"));
                return Ok(());
            }
            send_products(app, ProductCmd::Create(form)).await?;
        }
        InputCallbackId::EditProductName { id, unit } => {
            app.input_box = Some(InputBoxState::new(
                "Unit:",
                unit,
                InputCallbackId::EditProductUnit { id, name: value },
            ));
        }
        InputCallbackId::EditProductUnit { id, name } => {
            send_products(
                app,
                ProductCmd::Update {
                    id,
                    name,
                    unit: value,
                },
            )
            .await?;
        }
        InputCallbackId::DeleteProduct(id) => {
            if value.trim().eq_ignore_ascii_case("y") {
                send_products(app, ProductCmd::Delete(id)).await?;
            } else {
                app.ui.status = "Delete cancelled".into();
            }
        }
    }
    Ok(())
}

/// カンマ区切りのパス列を分解する（前後の空白と引用符は除く）。
fn parse_paths(value: &str) -> Vec<PathBuf> {
    value
        .split(',')
        .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
