//! TUI描画関連の関数。

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};

use crate::{
    api::{live::ConnectionState, models::DeliveryStatus},
    events::Screen,
    input, layout,
    resource::Resource,
    shortcuts::Shortcuts,
    timefmt,
    wizard::{DeliveryDraft, DraftField, PhotoUploadState, WizardStage},
};

use super::App;

/// 選択行のハイライト色。
fn highlight() -> Style {
    Style::default()
        .bg(Color::Rgb(255, 140, 0)) // オレンジ色の背景
        .fg(Color::Black) // 黒文字
        .add_modifier(Modifier::BOLD)
}

/// 画面全体のレイアウトを描画する。
pub fn draw(f: &mut Frame, app: &App) {
    // レイアウト（Body + HELP + STATUS）を作る。
    let main_layout = layout::create_main_layout(f.area());

    // 画面ごとの本文を描画する。
    match app.ui.screen {
        Screen::Login => draw_login(f, app, main_layout.body),
        Screen::Deliveries => draw_deliveries(f, app, main_layout.body),
        Screen::Detail => draw_detail(f, app, main_layout.body),
        Screen::Wizard => draw_wizard(f, app, main_layout.body),
        Screen::Chat => draw_chat(f, app, main_layout.body),
        Screen::Products => draw_products(f, app, main_layout.body),
    }

    // HELPバー（画面ごとのショートカット）を描画する。
    let help_bar = Paragraph::new(get_help_text(app.ui.screen, &app.shortcuts))
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, main_layout.help_bar);

    // STATUSバー（画面名・エラー）を描画する。
    f.render_widget(build_status_bar(app), main_layout.status_bar);

    // 入力ボックスが開いていれば重ねて描画する。
    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

/// ログイン画面を描画する。
fn draw_login(f: &mut Frame, app: &App, area: Rect) {
    let popup = input::centered_popup(area, 60, 9);
    let password = "*".repeat(app.login_password.chars().count());
    let text = format!(
        "Server:   {}\n\nUsername: {}\nPassword: {}\n\nPress u / p to edit, Enter to sign in.",
        app.cfg.api.base_url, app.login_username, password
    );
    let content = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Sign in"))
        .wrap(Wrap { trim: false });
    f.render_widget(content, popup);
}

/// 配送一覧画面を描画する。
fn draw_deliveries(f: &mut Frame, app: &App, area: Rect) {
    let body = layout::create_body_layout(area);
    let rows_data = app.deliveries.items();

    // 一覧からテーブル行を組み立てる。
    let rows = rows_data.iter().enumerate().map(|(i, r)| {
        let d = &r.item.delivery;
        let unread = if r.unread > 0 {
            format!("● {}", r.unread)
        } else {
            String::new()
        };
        Row::new(vec![
            format!("{}", i + 1),
            d.location_name.clone().unwrap_or_else(|| format!("#{}", d.id)),
            d.city.clone().unwrap_or_default(),
            status_label(d.status).to_string(),
            timefmt::display_date(&d.created_at),
            r.item.photos.len().to_string(),
            unread,
        ])
        .style(Style::default().fg(status_color(d.status)))
    });

    // 読み込み状態をタイトルに反映する。
    let title = if app.deliveries.is_loading() {
        "DELIVERIES (loading...)".to_string()
    } else if let Some(e) = app.deliveries.error() {
        format!("DELIVERIES (error: {e})")
    } else {
        format!("DELIVERIES ({})", filter_label(app))
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(6),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(title))
    .header(Row::new(vec!["#", "location", "city", "status", "date", "photos", "chat"]).bold())
    .row_highlight_style(highlight());

    // 選択中の行をハイライトする。
    let mut table_state = ratatui::widgets::TableState::default();
    if !rows_data.is_empty() {
        table_state.select(Some(app.ui.selected));
    }
    f.render_stateful_widget(table, body.list, &mut table_state);

    // INFOパネルに選択中の配送とログを表示する。
    let info = Paragraph::new(build_deliveries_info_text(app))
        .block(Block::default().borders(Borders::ALL).title("INFO"))
        .wrap(Wrap { trim: true });
    f.render_widget(info, body.info_panel);
}

/// 一覧画面用の情報テキストを構築する。
fn build_deliveries_info_text(app: &App) -> String {
    let user = app
        .user
        .as_ref()
        .map(|u| format!("{} ({:?})", u.username, u.role))
        .unwrap_or_else(|| "-".into());
    let selected = app
        .deliveries
        .items()
        .get(app.ui.selected)
        .map(|r| {
            let d = &r.item.delivery;
            format!(
                "#{} {}\n{}\n{}, {}, {}\nProducts: {}",
                d.id,
                d.location_name.as_deref().unwrap_or("-"),
                d.street.as_deref().unwrap_or("-"),
                d.district.as_deref().unwrap_or("-"),
                d.city.as_deref().unwrap_or("-"),
                d.region.as_deref().unwrap_or("-"),
                r.item.products.len()
            )
        })
        .unwrap_or_else(|| "No delivery selected".into());
    format!(
        "User: {}\nFilter: {}\n\n{}\n\nLog:\n{}",
        user,
        filter_label(app),
        selected,
        recent_log(app)
    )
}

/// 絞り込み条件の表示文字列。
fn filter_label(app: &App) -> String {
    let status = app.filter.status.map(status_label).unwrap_or("all");
    match &app.filter.city {
        Some(city) => format!("{status} in {city}"),
        None => status.to_string(),
    }
}

/// 直近のログ行。
fn recent_log(app: &App) -> String {
    let skip = app.ui.log.len().saturating_sub(8);
    app.ui.log[skip..].join("\n")
}

/// 配送詳細画面を描画する。
fn draw_detail(f: &mut Frame, app: &App, area: Rect) {
    let body = layout::create_body_layout(area);

    let item = match &app.detail {
        Resource::Success(item) => item,
        Resource::Loading => {
            f.render_widget(
                Paragraph::new("Loading...")
                    .block(Block::default().borders(Borders::ALL).title("DELIVERY")),
                body.list,
            );
            return;
        }
        Resource::Error(e) => {
            f.render_widget(
                Paragraph::new(format!("Failed to load delivery: {e}"))
                    .style(Style::default().fg(Color::Red))
                    .block(Block::default().borders(Borders::ALL).title("DELIVERY")),
                body.list,
            );
            return;
        }
    };
    let d = &item.delivery;

    // 配送の各項目と商品を並べる。
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Status: "),
            Span::styled(status_label(d.status), Style::default().fg(status_color(d.status)).bold()),
        ]),
        Line::from(format!("Location: {}", d.location_name.as_deref().unwrap_or("-"))),
        Line::from(format!("Street:   {}", d.street.as_deref().unwrap_or("-"))),
        Line::from(format!("District: {}", d.district.as_deref().unwrap_or("-"))),
        Line::from(format!("City:     {}", d.city.as_deref().unwrap_or("-"))),
        Line::from(format!("Region:   {}", d.region.as_deref().unwrap_or("-"))),
        Line::from(format!(
            "Coords:   {}, {}",
            d.lat.as_deref().unwrap_or("-"),
            d.lon.as_deref().unwrap_or("-")
        )),
        Line::from(format!("Notes:    {}", d.notes.as_deref().unwrap_or("-"))),
        Line::from(format!(
            "Created:  {} {}",
            timefmt::display_date(&d.created_at),
            timefmt::display_time(&d.created_at)
        )),
        Line::from(""),
        Line::from("Products:").bold(),
    ];
    if item.products.is_empty() {
        lines.push(Line::from("  (none)"));
    }
    for p in &item.products {
        lines.push(Line::from(format!(
            "  {} {} - {} {}",
            p.product_sku, p.product_name, p.qty, p.product_unit
        )));
    }

    let info = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(format!("DELIVERY #{}", d.id)))
        .wrap(Wrap { trim: false });
    f.render_widget(info, body.list);

    // 写真一覧を描画する。
    let photos: Vec<ListItem> = item
        .photos
        .iter()
        .map(|p| ListItem::new(format!("#{} {}", p.id, p.url)))
        .collect();
    let list = List::new(photos)
        .block(Block::default().borders(Borders::ALL).title(format!("PHOTOS ({})", item.photos.len())))
        .highlight_style(highlight());
    let mut state = ListState::default();
    if !item.photos.is_empty() {
        state.select(Some(app.ui.selected_photo));
    }
    f.render_stateful_widget(list, body.info_panel, &mut state);
}

/// ウィザード画面を描画する。
fn draw_wizard(f: &mut Frame, app: &App, area: Rect) {
    let wl = layout::create_wizard_layout(area);

    let Some(draft) = &app.draft else {
        f.render_widget(
            Paragraph::new("Preparing new delivery...")
                .block(Block::default().borders(Borders::ALL).title("New delivery")),
            area,
        );
        return;
    };

    // ステップ番号とアップロード進捗をヘッダに表示する。
    let stage = draft.current_stage;
    let title = format!(
        "Step {}/{}: {}",
        stage.step_number(),
        WizardStage::COUNT,
        stage.title()
    );
    let (ratio, label) = if draft.is_uploading && draft.total_photos > 0 {
        (
            draft.upload_progress as f64 / draft.total_photos as f64,
            format!("Uploading photo {}/{}", draft.upload_progress, draft.total_photos),
        )
    } else if draft.is_loading {
        (0.0, "Saving...".to_string())
    } else {
        (
            stage.step_number() as f64 / WizardStage::COUNT as f64,
            format!("{} of {}", stage.step_number(), WizardStage::COUNT),
        )
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(Color::Rgb(255, 140, 0)))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(label);
    f.render_widget(gauge, wl.header);

    let body = layout::create_body_layout(wl.content);
    match stage {
        WizardStage::SelectPhotos => draw_wizard_photos(f, app, draft, body.list),
        WizardStage::ReviewLocation => draw_wizard_location(f, app, draft, body.list),
        WizardStage::AddProducts => draw_wizard_products(f, app, draft, body.list),
    }

    // 右パネルに下書きの要約を表示する。
    let summary = format!(
        "Delivery: {}\nPhotos: {}\nLocation: {}\nProducts: {}\n{}\n{}",
        draft
            .delivery_id
            .map(|id| format!("#{id} (unconfirmed)"))
            .unwrap_or_else(|| "not created yet".into()),
        draft.selected_photos.len(),
        if draft.location_name.is_empty() { "-" } else { &draft.location_name },
        draft.selected_products.len(),
        if draft.formatted_address.is_empty() {
            String::new()
        } else {
            format!("Geocoded: {}\n", draft.formatted_address)
        },
        draft
            .error
            .as_deref()
            .map(|e| format!("ERROR: {e}\n(x to dismiss)"))
            .unwrap_or_default()
    );
    let style = if draft.error.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let info = Paragraph::new(summary)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("DRAFT"))
        .wrap(Wrap { trim: true });
    f.render_widget(info, body.info_panel);
}

fn draw_wizard_photos(f: &mut Frame, app: &App, draft: &DeliveryDraft, area: Rect) {
    let items: Vec<ListItem> = draft
        .selected_photos
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let gps = match p.location() {
                Some((lat, lon)) => format!("{lat:.5}, {lon:.5}"),
                None => "no GPS".into(),
            };
            let (state, color) = match p.upload_state {
                PhotoUploadState::Pending => ("pending", Color::Gray),
                PhotoUploadState::Uploading => ("uploading", Color::Yellow),
                PhotoUploadState::Uploaded => ("uploaded", Color::Green),
                PhotoUploadState::Failed => ("FAILED", Color::Red),
            };
            let taken = p.taken_at.as_deref().unwrap_or("no date");
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:>2}. {} ", i + 1, p.source.display())),
                Span::styled(format!("[{gps}] "), Style::default().fg(Color::Cyan)),
                Span::styled(format!("{taken} "), Style::default().fg(Color::DarkGray)),
                Span::styled(state, Style::default().fg(color)),
            ]))
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("PHOTOS ({})", draft.selected_photos.len())),
        )
        .highlight_style(highlight());
    let mut state = ListState::default();
    if !draft.selected_photos.is_empty() {
        state.select(Some(app.ui.wizard_cursor));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_wizard_location(f: &mut Frame, app: &App, draft: &DeliveryDraft, area: Rect) {
    let items: Vec<ListItem> = DraftField::LOCATION
        .iter()
        .map(|field| {
            let value = draft.field(*field);
            let shown = if value.trim().is_empty() {
                Span::styled("(empty)", Style::default().fg(Color::DarkGray))
            } else {
                Span::raw(value.to_string())
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:<14}", field.label())),
                shown,
            ]))
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("LOCATION"))
        .highlight_style(highlight());
    let mut state = ListState::default().with_selected(Some(app.ui.wizard_cursor));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_wizard_products(f: &mut Frame, app: &App, draft: &DeliveryDraft, area: Rect) {
    let notes = if draft.notes.is_empty() { "(none)" } else { &draft.notes };
    let mut items = vec![ListItem::new(format!("Notes: {notes}"))];

    match &draft.available_products {
        Resource::Loading => items.push(ListItem::new("Loading products...")),
        Resource::Error(e) => items.push(ListItem::new(
            Line::from(format!("Products unavailable: {e} (r to retry)")).red(),
        )),
        Resource::Success(products) => {
            for p in products {
                let qty = draft
                    .selected_products
                    .iter()
                    .find(|s| s.product.id == p.id)
                    .map(|s| s.quantity);
                let line = match qty {
                    Some(q) => Line::from(format!("[x] {} {} - {} {}", p.sku, p.name, q, p.unit))
                        .green(),
                    None => Line::from(format!("[ ] {} {} ({})", p.sku, p.name, p.unit)),
                };
                items.push(ListItem::new(line));
            }
        }
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("PRODUCTS"))
        .highlight_style(highlight());
    let mut state = ListState::default().with_selected(Some(app.ui.wizard_cursor));
    f.render_stateful_widget(list, area, &mut state);
}

/// チャット画面を描画する。
fn draw_chat(f: &mut Frame, app: &App, area: Rect) {
    let Some(chat) = &app.chat else {
        f.render_widget(
            Paragraph::new("Opening chat...")
                .block(Block::default().borders(Borders::ALL).title("CHAT")),
            area,
        );
        return;
    };

    let mut lines: Vec<Line> = vec![];
    if chat.is_loading_more {
        lines.push(Line::from("loading older messages...").dark_gray());
    } else if chat.can_load_more && !chat.messages.is_empty() {
        lines.push(Line::from("(o / PageUp for older messages)").dark_gray());
    }
    if chat.is_loading {
        lines.push(Line::from("Loading messages..."));
    }

    // 日付が変わる位置に区切りを入れて時系列で並べる。
    let mut last_date = String::new();
    for m in &chat.messages {
        let date = timefmt::display_date(&m.created_at);
        if date != last_date {
            lines.push(Line::from(format!("── {date} ──")).dark_gray());
            last_date = date;
        }
        let name_style = if chat.is_own(m) {
            Style::default().fg(Color::Rgb(255, 140, 0)).bold()
        } else {
            Style::default().fg(Color::Cyan).bold()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", timefmt::display_time(&m.created_at)), Style::default().fg(Color::DarkGray)),
            Span::styled(format!("[{}] {}: ", m.sender_initial, m.sender_username), name_style),
            Span::raw(m.content.clone()),
        ]));
    }
    if chat.is_sending {
        lines.push(Line::from("sending...").dark_gray());
    }
    if let Some(e) = &chat.error {
        lines.push(Line::from(format!("ERROR: {e} (x to dismiss)")).red());
    }

    // 最新行が見えるよう末尾へスクロールする。
    let inner_height = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(inner_height) as u16;

    let (conn, color) = match chat.connection {
        ConnectionState::Connecting => ("connecting", Color::Yellow),
        ConnectionState::Connected => ("live", Color::Green),
        ConnectionState::Disconnected => ("offline", Color::Gray),
        ConnectionState::Error => ("connection error", Color::Red),
    };
    let title = Line::from(vec![
        Span::raw(format!(
            "CHAT #{} ",
            chat.delivery_id.map(|id| id.to_string()).unwrap_or_default()
        )),
        Span::styled(format!("[{conn}]"), Style::default().fg(color)),
    ]);
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(widget, area);
}

/// 商品管理画面を描画する。
fn draw_products(f: &mut Frame, app: &App, area: Rect) {
    let body = layout::create_body_layout(area);
    let items = app.products.items();

    let rows = items.iter().map(|p| {
        Row::new(vec![
            p.sku.clone(),
            p.name.clone(),
            p.unit.clone(),
            p.id.to_string(),
        ])
    });

    // 読み込み状態をタイトルに反映する。
    let title = if app.products.is_loading() {
        "PRODUCTS (loading...)".to_string()
    } else if let Some(e) = app.products.error() {
        format!("PRODUCTS (error: {e})")
    } else {
        format!("PRODUCTS ({})", items.len())
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Min(16),
            Constraint::Length(8),
            Constraint::Length(6),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(title))
    .header(Row::new(vec!["sku", "name", "unit", "id"]).bold())
    .row_highlight_style(highlight());

    let mut table_state = ratatui::widgets::TableState::default();
    if !items.is_empty() {
        table_state.select(Some(app.ui.selected_product));
    }
    f.render_stateful_widget(table, body.list, &mut table_state);

    // 選択中の商品と直近のログを表示する。
    let selected = items
        .get(app.ui.selected_product)
        .map(|p| format!("SKU:  {}\nName: {}\nUnit: {}", p.sku, p.name, p.unit))
        .unwrap_or_else(|| "No product selected".into());
    let info = Paragraph::new(format!(
        "{selected}\n\nSKU cannot be changed after creation.\n\n{}",
        recent_log(app)
    ))
    .block(Block::default().borders(Borders::ALL).title("INFO"))
    .wrap(Wrap { trim: true });
    f.render_widget(info, body.info_panel);
}

/// ステータスバーを構築する。
fn build_status_bar(app: &App) -> Paragraph<'static> {
    let screen_name = match app.ui.screen {
        Screen::Login => "Login",
        Screen::Deliveries => "Deliveries",
        Screen::Detail => "Detail",
        Screen::Wizard => "New delivery",
        Screen::Chat => "Chat",
        Screen::Products => "Products",
    };

    // エラーの有無でステータス文字列を切り替える。
    let status_text = if let Some(err) = &app.ui.error {
        format!("[{}] ERROR: {}", screen_name, err)
    } else {
        format!("[{}] {}", screen_name, app.ui.status)
    };

    let mut status_bar = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true });

    // エラー時は赤色で強調表示する。
    if app.ui.error.is_some() {
        status_bar = status_bar.style(Style::default().fg(Color::Red));
    }

    status_bar
}

/// 現在画面に応じたヘルプ文字列を返す。
fn get_help_text(screen: Screen, shortcuts: &Shortcuts) -> String {
    match screen {
        Screen::Login => format!(
            "{}: username | {}: password | {}: sign in | {}: quit",
            format_keys(&shortcuts.login.username),
            format_keys(&shortcuts.login.password),
            format_keys(&shortcuts.login.submit),
            format_keys(&shortcuts.login.quit)
        ),
        Screen::Deliveries => format!(
            "{}: open | {}: new | {}: products | {}: refresh | {}: status filter | {}: city filter | {}/{}: navigate | {}: logout | {}: quit",
            format_keys(&shortcuts.deliveries.open),
            format_keys(&shortcuts.deliveries.new_delivery),
            format_keys(&shortcuts.deliveries.products),
            format_keys(&shortcuts.deliveries.refresh),
            format_keys(&shortcuts.deliveries.filter_status),
            format_keys(&shortcuts.deliveries.filter_city),
            format_keys(&shortcuts.deliveries.up),
            format_keys(&shortcuts.deliveries.down),
            format_keys(&shortcuts.deliveries.logout),
            format_keys(&shortcuts.deliveries.quit)
        ),
        Screen::Detail => format!(
            "{}: chat | {}: cycle status | {}: delete photo | {}/{}: photos | {}: reload | {}: back",
            format_keys(&shortcuts.detail.chat),
            format_keys(&shortcuts.detail.cycle_status),
            format_keys(&shortcuts.detail.delete_photo),
            format_keys(&shortcuts.detail.prev_photo),
            format_keys(&shortcuts.detail.next_photo),
            format_keys(&shortcuts.detail.refresh),
            format_keys(&shortcuts.detail.back)
        ),
        Screen::Wizard => format!(
            "{}: add | {}: edit | {}: remove | {}: next step | {}: reload products | {}: dismiss error | {}: cancel",
            format_keys(&shortcuts.wizard.add),
            format_keys(&shortcuts.wizard.edit),
            format_keys(&shortcuts.wizard.remove),
            format_keys(&shortcuts.wizard.next),
            format_keys(&shortcuts.wizard.reload_products),
            format_keys(&shortcuts.wizard.dismiss_error),
            format_keys(&shortcuts.wizard.cancel)
        ),
        Screen::Chat => format!(
            "{}: write | {}: older messages | {}: dismiss error | {}: back",
            format_keys(&shortcuts.chat.compose),
            format_keys(&shortcuts.chat.load_older),
            format_keys(&shortcuts.chat.dismiss_error),
            format_keys(&shortcuts.chat.back)
        ),
        Screen::Products => format!(
            "{}: add | {}: edit | {}: delete | {}/{}: navigate | {}: reload | {}: back",
            format_keys(&shortcuts.products.add),
            format_keys(&shortcuts.products.edit),
            format_keys(&shortcuts.products.delete),
            format_keys(&shortcuts.products.up),
            format_keys(&shortcuts.products.down),
            format_keys(&shortcuts.products.refresh),
            format_keys(&shortcuts.products.back)
        ),
    }
}

/// ショートカットキーの配列を表示用文字列に変換する。
fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}

/// 配送ステータスを一覧表示用の短いラベルへ変換する。
fn status_label(s: DeliveryStatus) -> &'static str {
    match s {
        DeliveryStatus::Ready => "Ready",
        DeliveryStatus::Done => "Done",
        DeliveryStatus::Broken => "Broken",
        DeliveryStatus::NeedToConfirm => "Unconfirmed",
    }
}

/// ステータスごとの表示色。
fn status_color(s: DeliveryStatus) -> Color {
    match s {
        DeliveryStatus::Ready => Color::Cyan,
        DeliveryStatus::Done => Color::Green,
        DeliveryStatus::Broken => Color::Red,
        DeliveryStatus::NeedToConfirm => Color::Yellow,
    }
}
