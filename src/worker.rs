//! Background worker owning the API client and the two engines.

use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use reqwest::Client;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    api::{
        ApiClient,
        chat::ChatGateway,
        deliveries::DeliveryGateway,
        live::ChatSocket,
        models::{
            DeliveryFilter, DeliveryListItem, DeliveryStatus, Product, UpdateDeliveryRequest,
            User, UserRole,
        },
    },
    catalog::{ProductCatalog, ProductForm},
    chat::{ChatSession, ChatState},
    config::Config,
    exif_location,
    geocoding::NominatimGeocoder,
    resource::Resource,
    session::SessionStore,
    wizard::{DeliveryDraft, DraftField, SelectedPhoto, WizardEngine},
};

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCmd {
    /// Authenticate and persist the session.
    Login { username: String, password: String },
    /// Drop the session and any open engine.
    Logout,
    /// Reload the delivery list and unread counts.
    RefreshDeliveries(DeliveryFilter),
    /// Load one delivery with products and photos.
    OpenDelivery(i64),
    /// Delete a photo, then reload its delivery.
    DeletePhoto { delivery_id: i64, photo_id: i64 },
    /// Move a delivery to another status, then reload it.
    SetStatus {
        delivery_id: i64,
        status: DeliveryStatus,
    },
    Wizard(WizardCmd),
    Chat(ChatCmd),
    Products(ProductCmd),
}

/// Wizard intents; each maps to one engine operation.
#[derive(Debug)]
pub enum WizardCmd {
    /// Start a fresh draft, discarding any previous one.
    Start,
    /// Add image files (directories are expanded).
    AddPhotos(Vec<PathBuf>),
    RemovePhoto(PathBuf),
    ConfirmPhotos,
    SetField(DraftField, String),
    ConfirmLocation,
    AddProduct { product_id: i64, quantity: f64 },
    RemoveProduct(i64),
    SetQuantity { product_id: i64, quantity: f64 },
    Save,
    ReloadProducts,
    ClearError,
    /// Leave the wizard; a provisional delivery stays on the server.
    Cancel,
}

#[derive(Debug)]
pub enum ChatCmd {
    Open(i64),
    LoadOlder,
    Send(String),
    ClearError,
    Close,
}

/// Supervisor catalog intents; every mutation is followed by a reload.
#[derive(Debug)]
pub enum ProductCmd {
    Load,
    Create(ProductForm),
    Update { id: i64, name: String, unit: String },
    Delete(i64),
}

/// One row of the delivery list.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliveryRow {
    pub item: DeliveryListItem,
    pub unread: i64,
}

/// Events emitted by the worker for UI updates.
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    /// Session restored at startup or created by login.
    LoggedIn(User),
    LoggedOut,
    Deliveries(Resource<Vec<DeliveryRow>>),
    Detail(Resource<DeliveryListItem>),
    /// Latest wizard snapshot.
    Draft(Box<DeliveryDraft>),
    /// Latest chat snapshot.
    Chat(Box<ChatState>),
    /// Product catalog for the supervisor screen.
    Products(Resource<Vec<Product>>),
    /// Informational log message.
    Log(String),
    /// User-visible error message.
    Error(String),
}

/// State owned by the worker task.
struct Worker {
    cfg: Config,
    api: ApiClient,
    geocoder: Arc<NominatimGeocoder>,
    tx: mpsc::Sender<WorkerEvent>,
    wizard: Option<WizardEngine>,
    wizard_forwarder: Option<JoinHandle<()>>,
    chat: Option<ChatSession>,
    chat_forwarder: Option<JoinHandle<()>>,
}

/// Main worker loop: restore the session, then handle commands sequentially.
pub async fn run(
    mut rx: mpsc::Receiver<WorkerCmd>,
    tx: mpsc::Sender<WorkerEvent>,
    cfg: Config,
    session: Arc<SessionStore>,
) {
    tracing::info!("worker started");
    let timeout = Duration::from_secs(cfg.api.request_timeout_secs);

    // Client setup is done once; failures are terminal.
    let http = match Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("HTTP client init failed: {e}");
            let _ = tx
                .send(WorkerEvent::Error(format!("HTTP client init failed: {e}")))
                .await;
            return;
        }
    };
    let api = ApiClient::with_client(http.clone(), &cfg.api.base_url, session.clone());
    let geocoder = Arc::new(NominatimGeocoder::new(
        http,
        &cfg.geocoding.base_url,
        &cfg.geocoding.user_agent,
        &cfg.geocoding.language,
    ));

    let mut worker = Worker {
        cfg,
        api,
        geocoder,
        tx,
        wizard: None,
        wizard_forwarder: None,
        chat: None,
        chat_forwarder: None,
    };

    if session.is_logged_in().await
        && let Some(login) = session.login_response().await
    {
        tracing::info!("session restored for {}", login.user.username);
        worker.emit(WorkerEvent::LoggedIn(login.user)).await;
    }

    // Process commands one at a time so engine operations never overlap.
    while let Some(cmd) = rx.recv().await {
        worker.handle(cmd).await;
    }
    worker.close_chat().await;
    tracing::info!("worker stopped");
}

impl Worker {
    async fn emit(&self, ev: WorkerEvent) {
        // The UI may already be gone during shutdown.
        let _ = self.tx.send(ev).await;
    }

    async fn handle(&mut self, cmd: WorkerCmd) {
        match cmd {
            WorkerCmd::Login { username, password } => {
                tracing::info!("login requested for {username}");
                match self.api.login(&username, &password).await {
                    Ok(resp) => self.emit(WorkerEvent::LoggedIn(resp.user)).await,
                    Err(e) => {
                        let msg = e.or_generic("Login failed").message;
                        self.emit(WorkerEvent::Error(msg)).await;
                    }
                }
            }

            WorkerCmd::Logout => {
                let who = self.api.session().username().await.unwrap_or_default();
                tracing::info!("logout requested for {who}");
                self.cancel_wizard();
                self.close_chat().await;
                match self.api.logout().await {
                    Ok(()) => self.emit(WorkerEvent::LoggedOut).await,
                    Err(e) => {
                        tracing::error!("logout failed: {e}");
                        self.emit(WorkerEvent::Error(format!("logout failed: {e}")))
                            .await;
                    }
                }
            }

            WorkerCmd::RefreshDeliveries(filter) => self.refresh_deliveries(&filter).await,

            WorkerCmd::OpenDelivery(id) => self.load_detail(id).await,

            WorkerCmd::DeletePhoto {
                delivery_id,
                photo_id,
            } => {
                if !self.has_role(UserRole::Supervisor, "delete photos").await {
                    return;
                }
                tracing::info!("delete photo {photo_id} of delivery {delivery_id}");
                match self.api.delete_photo(photo_id).await {
                    Ok(()) => {
                        self.emit(WorkerEvent::Log(format!("photo {photo_id} deleted")))
                            .await;
                        self.load_detail(delivery_id).await;
                    }
                    Err(e) => self.emit(WorkerEvent::Error(e.message)).await,
                }
            }

            WorkerCmd::SetStatus {
                delivery_id,
                status,
            } => {
                if !self.has_role(UserRole::Supervisor, "change delivery status").await {
                    return;
                }
                let req = UpdateDeliveryRequest {
                    status: Some(status),
                    ..Default::default()
                };
                match self.api.update_delivery(delivery_id, &req).await {
                    Ok(d) => {
                        tracing::info!("delivery {} is now {:?}", d.id, d.status);
                        self.load_detail(delivery_id).await;
                    }
                    Err(e) => self.emit(WorkerEvent::Error(e.message)).await,
                }
            }

            WorkerCmd::Wizard(cmd) => self.handle_wizard(cmd).await,
            WorkerCmd::Chat(cmd) => self.handle_chat(cmd).await,
            WorkerCmd::Products(cmd) => self.handle_products(cmd).await,
        }
    }

    /// Report an error unless the stored session has `role`.
    async fn has_role(&self, role: UserRole, action: &str) -> bool {
        if self.api.session().role().await == Some(role) {
            return true;
        }
        tracing::warn!("{action} refused: {role:?} role required");
        let who = match role {
            UserRole::Sales => "sales users",
            UserRole::Supervisor => "supervisors",
        };
        self.emit(WorkerEvent::Error(format!("Only {who} can {action}")))
            .await;
        false
    }

    /// Catalog operations run with the role of the stored session.
    async fn handle_products(&self, cmd: ProductCmd) {
        let role = self.api.session().role().await;
        let catalog = ProductCatalog::new(Arc::new(self.api.clone()), role);
        let outcome = match cmd {
            ProductCmd::Load => None,
            ProductCmd::Create(form) => Some(catalog.create(&form).await),
            ProductCmd::Update { id, name, unit } => Some(catalog.update(id, &name, &unit).await),
            ProductCmd::Delete(id) => Some(catalog.delete(id).await),
        };
        match outcome {
            Some(Ok(msg)) => self.emit(WorkerEvent::Log(msg)).await,
            Some(Err(e)) => {
                tracing::warn!("product change rejected: {e}");
                self.emit(WorkerEvent::Error(e.message)).await;
                return;
            }
            None => {}
        }
        self.emit(WorkerEvent::Products(Resource::Loading)).await;
        self.emit(WorkerEvent::Products(catalog.load().await)).await;
    }

    /// List deliveries and join in unread counts; a failed count lookup
    /// only drops the badges.
    async fn refresh_deliveries(&self, filter: &DeliveryFilter) {
        self.emit(WorkerEvent::Deliveries(Resource::Loading)).await;
        let (items, unread) = tokio::join!(
            self.api.list_deliveries(filter),
            self.api.unread_counts()
        );
        let counts: HashMap<i64, i64> = match unread {
            Ok(list) => list.into_iter().map(|u| (u.delivery_id, u.count)).collect(),
            Err(e) => {
                tracing::warn!("unread counts unavailable: {e}");
                HashMap::new()
            }
        };
        let rows = items.map(|items| {
            items
                .into_iter()
                .map(|item| DeliveryRow {
                    unread: counts.get(&item.delivery.id).copied().unwrap_or(0),
                    item,
                })
                .collect::<Vec<_>>()
        });
        if let Ok(rows) = &rows {
            tracing::info!("deliveries loaded: {}", rows.len());
        }
        self.emit(WorkerEvent::Deliveries(Resource::from_result(rows)))
            .await;
    }

    async fn load_detail(&self, id: i64) {
        self.emit(WorkerEvent::Detail(Resource::Loading)).await;
        let r = self.api.get_delivery(id).await;
        self.emit(WorkerEvent::Detail(Resource::from_result(r))).await;
    }

    async fn handle_wizard(&mut self, cmd: WizardCmd) {
        if let WizardCmd::Start = cmd {
            if !self.has_role(UserRole::Sales, "create deliveries").await {
                return;
            }
            self.cancel_wizard();
            let api = Arc::new(self.api.clone());
            let engine = WizardEngine::start(
                api.clone(),
                self.geocoder.clone(),
                api,
                self.cfg.wizard.max_photos,
            )
            .await;
            self.wizard_forwarder = Some(forward_snapshots(
                engine.subscribe(),
                self.tx.clone(),
                |d| WorkerEvent::Draft(Box::new(d)),
            ));
            self.wizard = Some(engine);
            return;
        }
        if let WizardCmd::Cancel = cmd {
            self.cancel_wizard();
            return;
        }

        let Some(engine) = self.wizard.as_mut() else {
            tracing::debug!("wizard command without a draft: {cmd:?}");
            return;
        };
        // Stage operations surface their failure in the draft itself.
        let result = match cmd {
            WizardCmd::AddPhotos(paths) => {
                let photos = select_photos(paths).await;
                engine.add_photos(photos);
                Ok(())
            }
            WizardCmd::RemovePhoto(path) => {
                engine.remove_photo(&path);
                Ok(())
            }
            WizardCmd::ConfirmPhotos => engine.confirm_photos().await,
            WizardCmd::SetField(field, value) => {
                engine.set_field(field, value);
                Ok(())
            }
            WizardCmd::ConfirmLocation => engine.confirm_location().await,
            WizardCmd::AddProduct {
                product_id,
                quantity,
            } => {
                let product = engine
                    .snapshot()
                    .available_products
                    .items()
                    .iter()
                    .find(|p| p.id == product_id)
                    .cloned();
                if let Some(p) = product {
                    engine.add_product(p, quantity);
                }
                Ok(())
            }
            WizardCmd::RemoveProduct(id) => {
                engine.remove_product(id);
                Ok(())
            }
            WizardCmd::SetQuantity {
                product_id,
                quantity,
            } => {
                engine.update_product_quantity(product_id, quantity);
                Ok(())
            }
            WizardCmd::Save => engine.save_delivery().await,
            WizardCmd::ReloadProducts => {
                engine.reload_products().await;
                Ok(())
            }
            WizardCmd::ClearError => {
                engine.clear_error();
                Ok(())
            }
            WizardCmd::Start | WizardCmd::Cancel => Ok(()),
        };
        if let Err(e) = result {
            tracing::debug!("wizard operation ended with: {e}");
        }
        if engine.snapshot().is_completed {
            self.emit(WorkerEvent::Log("delivery saved".into())).await;
        }
    }

    fn cancel_wizard(&mut self) {
        if let Some(h) = self.wizard_forwarder.take() {
            h.abort();
        }
        if let Some(engine) = self.wizard.take() {
            let d = engine.snapshot();
            if let Some(id) = d.delivery_id
                && !d.is_completed
            {
                tracing::warn!("wizard left with provisional delivery {id}");
            }
        }
    }

    async fn handle_chat(&mut self, cmd: ChatCmd) {
        match cmd {
            ChatCmd::Open(delivery_id) => {
                if self.chat.is_none() {
                    let api: Arc<dyn ChatGateway> = Arc::new(self.api.clone());
                    let socket = ChatSocket::new(
                        self.cfg.api.ws_base_url(),
                        self.api.session().clone(),
                    );
                    let session = ChatSession::new(
                        api,
                        Arc::new(socket),
                        self.api.session().clone(),
                        self.cfg.chat.page_size,
                    );
                    self.chat_forwarder = Some(forward_snapshots(
                        session.subscribe(),
                        self.tx.clone(),
                        |s| WorkerEvent::Chat(Box::new(s)),
                    ));
                    self.chat = Some(session);
                }
                if let Some(chat) = self.chat.as_mut() {
                    chat.initialize(delivery_id).await;
                }
            }
            ChatCmd::LoadOlder => {
                if let Some(chat) = &self.chat {
                    chat.load_older().await;
                }
            }
            ChatCmd::Send(content) => {
                if let Some(chat) = &self.chat
                    && let Err(e) = chat.send(&content).await
                {
                    tracing::warn!("message not sent: {e}");
                }
            }
            ChatCmd::ClearError => {
                if let Some(chat) = &self.chat {
                    chat.clear_error();
                }
            }
            ChatCmd::Close => self.close_chat().await,
        }
    }

    async fn close_chat(&mut self) {
        if let Some(mut chat) = self.chat.take() {
            chat.close().await;
        }
        if let Some(h) = self.chat_forwarder.take() {
            h.abort();
        }
    }
}

/// Forward every published snapshot to the UI until the engine goes away.
fn forward_snapshots<T>(
    mut rx: watch::Receiver<T>,
    tx: mpsc::Sender<WorkerEvent>,
    wrap: fn(T) -> WorkerEvent,
) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if tx.send(wrap(snapshot)).await.is_err() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
}

/// Expand directories, then read GPS tags off the blocking pool.
async fn select_photos(paths: Vec<PathBuf>) -> Vec<SelectedPhoto> {
    let files = expand_image_paths(paths).await;
    let joined = tokio::task::spawn_blocking(move || {
        files
            .into_iter()
            .map(|p| {
                // Files picked from disk are originals; there is no processed copy.
                let exif = exif_location::extract_exif_data(&p, None);
                SelectedPhoto::new(p, exif.location()).with_taken_at(exif.date_time)
            })
            .collect::<Vec<_>>()
    })
    .await;
    match joined {
        Ok(photos) => photos,
        Err(e) => {
            tracing::error!("photo scan failed: {e}");
            vec![]
        }
    }
}

fn is_image(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
        .unwrap_or(false)
}

/// Files are kept as given; directories contribute their images sorted by name.
async fn expand_image_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut out = vec![];
    for path in paths {
        let Ok(meta) = tokio::fs::metadata(&path).await else {
            tracing::warn!("photo path not found: {}", path.display());
            continue;
        };
        if meta.is_file() {
            out.push(path);
            continue;
        }
        let Ok(mut dir) = tokio::fs::read_dir(&path).await else {
            continue;
        };
        let mut found = vec![];
        while let Ok(Some(entry)) = dir.next_entry().await {
            let p = entry.path();
            if is_image(&p) {
                found.push(p);
            }
        }
        found.sort();
        out.extend(found);
    }
    out
}
