//! Delivery creation wizard: draft state and stage orchestration.
//!
//! The wizard walks three stages in order. Confirming the photo stage creates
//! a provisional delivery (status `NeedToConfirm`) on the server, resolves the
//! first photo's coordinates to an address and uploads the photos one by one.
//! The location stage patches the address, and saving the product stage
//! patches products and notes and finalizes the status to `Ready`.
//!
//! A wizard abandoned midway leaves its provisional delivery on the server;
//! it is not cleaned up.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    api::{
        deliveries::DeliveryGateway,
        models::{
            CreateDeliveryRequest, DeliveryProductInput, DeliveryStatus, Product,
            UpdateDeliveryRequest,
        },
        products::ProductGateway,
    },
    error::WizardError,
    geocoding::GeocodingGateway,
    resource::Resource,
};

pub const MSG_SELECT_PHOTO: &str = "select at least one photo";
pub const MSG_LOCATION_REQUIRED: &str = "all location fields are required";
pub const MSG_ADD_PRODUCT: &str = "add at least one product";

/// Wizard stages, walked forward only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardStage {
    /// Pick photos.
    SelectPhotos,
    /// Review and complete the address.
    ReviewLocation,
    /// Choose products and quantities.
    AddProducts,
}

impl WizardStage {
    /// Total number of stages.
    pub const COUNT: usize = 3;

    /// 1-based position of the stage.
    pub fn step_number(&self) -> usize {
        match self {
            WizardStage::SelectPhotos => 1,
            WizardStage::ReviewLocation => 2,
            WizardStage::AddProducts => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStage::SelectPhotos => "Select photos",
            WizardStage::ReviewLocation => "Review location",
            WizardStage::AddProducts => "Add products",
        }
    }
}

/// Upload progress of a single photo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhotoUploadState {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

/// A photo picked by the user, identified by its source path.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedPhoto {
    pub source: PathBuf,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Capture time from the photo's metadata, as written by the camera.
    pub taken_at: Option<String>,
    pub upload_state: PhotoUploadState,
}

impl SelectedPhoto {
    pub fn new(source: impl Into<PathBuf>, location: Option<(f64, f64)>) -> Self {
        Self {
            source: source.into(),
            latitude: location.map(|l| l.0),
            longitude: location.map(|l| l.1),
            taken_at: None,
            upload_state: PhotoUploadState::Pending,
        }
    }

    pub fn with_taken_at(mut self, taken_at: Option<String>) -> Self {
        self.taken_at = taken_at;
        self
    }

    /// Coordinates when both parts were extracted.
    pub fn location(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Product picked for the delivery; quantity is always positive.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductQuantity {
    pub product: Product,
    pub quantity: f64,
}

/// Free-text fields editable by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftField {
    Latitude,
    Longitude,
    LocationName,
    Street,
    District,
    City,
    Region,
    Notes,
}

impl DraftField {
    /// Fields shown on the location stage, in display order.
    pub const LOCATION: [DraftField; 7] = [
        DraftField::LocationName,
        DraftField::Street,
        DraftField::District,
        DraftField::City,
        DraftField::Region,
        DraftField::Latitude,
        DraftField::Longitude,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DraftField::Latitude => "Latitude",
            DraftField::Longitude => "Longitude",
            DraftField::LocationName => "Location name",
            DraftField::Street => "Street",
            DraftField::District => "District",
            DraftField::City => "City",
            DraftField::Region => "Region",
            DraftField::Notes => "Notes",
        }
    }
}

/// In-memory state of one wizard run, published as immutable snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliveryDraft {
    pub current_stage: WizardStage,
    /// Set once the provisional delivery exists; never changes afterwards.
    pub delivery_id: Option<i64>,
    pub selected_photos: Vec<SelectedPhoto>,
    pub upload_progress: usize,
    pub total_photos: usize,

    pub latitude: String,
    pub longitude: String,
    pub location_name: String,
    pub street: String,
    pub district: String,
    pub city: String,
    pub region: String,
    /// Geocoder's one-line address, shown as a hint while reviewing.
    pub formatted_address: String,

    pub selected_products: Vec<ProductQuantity>,
    pub available_products: Resource<Vec<Product>>,
    pub notes: String,

    /// Last surfaced failure, cleared on acknowledgment.
    pub error: Option<String>,
    pub is_loading: bool,
    pub is_uploading: bool,
    /// Terminal: the delivery is finalized.
    pub is_completed: bool,
}

impl Default for DeliveryDraft {
    fn default() -> Self {
        Self {
            current_stage: WizardStage::SelectPhotos,
            delivery_id: None,
            selected_photos: vec![],
            upload_progress: 0,
            total_photos: 0,
            latitude: String::new(),
            longitude: String::new(),
            location_name: String::new(),
            street: String::new(),
            district: String::new(),
            city: String::new(),
            region: String::new(),
            formatted_address: String::new(),
            selected_products: vec![],
            available_products: Resource::Loading,
            notes: String::new(),
            error: None,
            is_loading: false,
            is_uploading: false,
            is_completed: false,
        }
    }
}

impl DeliveryDraft {
    pub fn field(&self, field: DraftField) -> &str {
        match field {
            DraftField::Latitude => &self.latitude,
            DraftField::Longitude => &self.longitude,
            DraftField::LocationName => &self.location_name,
            DraftField::Street => &self.street,
            DraftField::District => &self.district,
            DraftField::City => &self.city,
            DraftField::Region => &self.region,
            DraftField::Notes => &self.notes,
        }
    }

    fn field_mut(&mut self, field: DraftField) -> &mut String {
        match field {
            DraftField::Latitude => &mut self.latitude,
            DraftField::Longitude => &mut self.longitude,
            DraftField::LocationName => &mut self.location_name,
            DraftField::Street => &mut self.street,
            DraftField::District => &mut self.district,
            DraftField::City => &mut self.city,
            DraftField::Region => &mut self.region,
            DraftField::Notes => &mut self.notes,
        }
    }

    /// True when every address field has text. Coordinates are optional.
    pub fn location_complete(&self) -> bool {
        [
            &self.location_name,
            &self.street,
            &self.district,
            &self.city,
            &self.region,
        ]
        .iter()
        .all(|s| !s.trim().is_empty())
    }

    /// Patch carrying the address; blanks are sent as absent.
    fn location_patch(&self) -> UpdateDeliveryRequest {
        UpdateDeliveryRequest {
            location_name: non_blank(&self.location_name),
            street: non_blank(&self.street),
            district: non_blank(&self.district),
            city: non_blank(&self.city),
            region: non_blank(&self.region),
            lat: non_blank(&self.latitude),
            lon: non_blank(&self.longitude),
            ..Default::default()
        }
    }
}

fn non_blank(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Drives one delivery draft through the three stages.
pub struct WizardEngine {
    /// Correlates log lines of one wizard run.
    draft_id: Uuid,
    deliveries: Arc<dyn DeliveryGateway>,
    geocoder: Arc<dyn GeocodingGateway>,
    products: Arc<dyn ProductGateway>,
    max_photos: usize,
    state: watch::Sender<DeliveryDraft>,
}

impl WizardEngine {
    /// Create a fresh draft and load the product catalog once.
    pub async fn start(
        deliveries: Arc<dyn DeliveryGateway>,
        geocoder: Arc<dyn GeocodingGateway>,
        products: Arc<dyn ProductGateway>,
        max_photos: usize,
    ) -> Self {
        let (state, _) = watch::channel(DeliveryDraft::default());
        let mut engine = Self {
            draft_id: Uuid::new_v4(),
            deliveries,
            geocoder,
            products,
            max_photos,
            state,
        };
        tracing::info!("wizard {} started", engine.draft_id);
        engine.reload_products().await;
        engine
    }

    /// Observe draft snapshots.
    pub fn subscribe(&self) -> watch::Receiver<DeliveryDraft> {
        self.state.subscribe()
    }

    /// Current draft.
    pub fn snapshot(&self) -> DeliveryDraft {
        self.state.borrow().clone()
    }

    fn update(&self, f: impl FnOnce(&mut DeliveryDraft)) {
        self.state.send_modify(f);
    }

    /// Surface `e` in the draft's error slot and return it.
    fn fail(&self, e: WizardError) -> Result<(), WizardError> {
        tracing::warn!("wizard {}: {e}", self.draft_id);
        let msg = e.to_string();
        self.update(|d| d.error = Some(msg));
        Err(e)
    }

    fn require_stage(&self, stage: WizardStage) -> Result<(), WizardError> {
        let current = self.state.borrow().current_stage;
        if current != stage || self.state.borrow().is_completed {
            tracing::debug!(
                "wizard {}: ignored {:?} operation in {:?}",
                self.draft_id,
                stage,
                current
            );
            return Err(WizardError::WrongStage);
        }
        Ok(())
    }

    /// (Re)load the product catalog. Failure is surfaced but not blocking.
    pub async fn reload_products(&mut self) {
        self.update(|d| d.available_products = Resource::Loading);
        let result = self.products.list_products().await;
        if let Err(e) = &result {
            tracing::warn!("wizard {}: product catalog failed: {e}", self.draft_id);
        }
        self.update(|d| {
            if let Err(e) = &result {
                d.error = Some(e.message.clone());
            }
            d.available_products = Resource::from_result(result);
        });
    }

    // ---- stage 1: photos ----

    /// Add photos in order, skipping known sources and anything past the limit.
    pub fn add_photos(&mut self, photos: Vec<SelectedPhoto>) {
        if self.state.borrow().current_stage != WizardStage::SelectPhotos {
            return;
        }
        let max = self.max_photos;
        self.update(|d| {
            for p in photos {
                if d.selected_photos.len() >= max {
                    break;
                }
                if d.selected_photos.iter().any(|s| s.source == p.source) {
                    continue;
                }
                d.selected_photos.push(p);
            }
        });
    }

    /// Remove a photo by its source path.
    pub fn remove_photo(&mut self, source: &Path) {
        if self.state.borrow().current_stage != WizardStage::SelectPhotos {
            return;
        }
        self.update(|d| d.selected_photos.retain(|p| p.source != source));
    }

    /// Create the provisional delivery, geocode, upload photos, then advance.
    ///
    /// A retry after a failed upload reuses the delivery id and skips photos
    /// that already reached the server.
    pub async fn confirm_photos(&mut self) -> Result<(), WizardError> {
        self.require_stage(WizardStage::SelectPhotos)?;
        let draft = self.snapshot();
        if draft.selected_photos.is_empty() {
            return self.fail(WizardError::Validation(MSG_SELECT_PHOTO));
        }

        self.update(|d| {
            d.is_uploading = true;
            d.error = None;
            d.upload_progress = 0;
            d.total_photos = d.selected_photos.len();
        });

        let delivery_id = match draft.delivery_id {
            Some(id) => id,
            None => {
                let req = CreateDeliveryRequest {
                    status: Some(DeliveryStatus::NeedToConfirm),
                    products: vec![],
                    ..Default::default()
                };
                match self.deliveries.create_delivery(&req).await {
                    Ok(delivery) => {
                        tracing::info!(
                            "wizard {}: provisional delivery {} created",
                            self.draft_id,
                            delivery.id
                        );
                        self.update(|d| d.delivery_id = Some(delivery.id));
                        delivery.id
                    }
                    Err(e) => {
                        self.update(|d| d.is_uploading = false);
                        return self.fail(e.into());
                    }
                }
            }
        };

        let coords = draft.selected_photos[0].location();
        if let Some((lat, lon)) = coords {
            let geo = self.geocoder.reverse_geocode(lat, lon).await;
            if let Err(e) = &geo {
                tracing::warn!("wizard {}: geocoding failed, using coordinates only: {e}", self.draft_id);
            }
            self.update(|d| {
                // Debug formatting keeps the fraction ("1.0", not "1").
                d.latitude = format!("{lat:?}");
                d.longitude = format!("{lon:?}");
                if let Ok(g) = geo {
                    d.location_name = g.location_name.unwrap_or_default();
                    d.street = g.street.unwrap_or_default();
                    d.district = g.district.unwrap_or_default();
                    d.city = g.city.unwrap_or_default();
                    d.region = g.region.unwrap_or_default();
                    d.formatted_address = g.formatted_address.unwrap_or_default();
                }
            });
        }

        // Strictly one upload at a time; stop at the first failure.
        for (index, photo) in draft.selected_photos.iter().enumerate() {
            if photo.upload_state == PhotoUploadState::Uploaded {
                self.update(|d| d.upload_progress = index + 1);
                continue;
            }
            self.set_photo_state(&photo.source, PhotoUploadState::Uploading, Some(index + 1));

            match self.deliveries.upload_photo(delivery_id, &photo.source).await {
                Ok(uploaded) => {
                    tracing::info!(
                        "wizard {}: photo {}/{} uploaded as {}",
                        self.draft_id,
                        index + 1,
                        draft.selected_photos.len(),
                        uploaded.id
                    );
                    self.set_photo_state(&photo.source, PhotoUploadState::Uploaded, None);
                }
                Err(e) => {
                    self.set_photo_state(&photo.source, PhotoUploadState::Failed, None);
                    self.update(|d| d.is_uploading = false);
                    return self.fail(WizardError::Remote(format!(
                        "Failed to upload photo {}: {}",
                        index + 1,
                        e.message
                    )));
                }
            }
        }

        if coords.is_some() {
            let req = self.snapshot().location_patch();
            if let Err(e) = self.deliveries.update_delivery(delivery_id, &req).await {
                tracing::warn!("wizard {}: location patch ignored: {e}", self.draft_id);
            }
        }

        self.update(|d| {
            d.is_uploading = false;
            d.current_stage = WizardStage::ReviewLocation;
        });
        Ok(())
    }

    fn set_photo_state(&self, source: &Path, state: PhotoUploadState, progress: Option<usize>) {
        self.update(|d| {
            if let Some(p) = d.selected_photos.iter_mut().find(|p| p.source == source) {
                p.upload_state = state;
            }
            if let Some(n) = progress {
                d.upload_progress = n;
            }
        });
    }

    // ---- stage 2: location ----

    /// Update any free-text field of the draft.
    pub fn set_field(&mut self, field: DraftField, value: impl Into<String>) {
        let value = value.into();
        self.update(|d| *d.field_mut(field) = value);
    }

    /// Patch the reviewed address and advance.
    pub async fn confirm_location(&mut self) -> Result<(), WizardError> {
        self.require_stage(WizardStage::ReviewLocation)?;
        let draft = self.snapshot();
        if !draft.location_complete() {
            return self.fail(WizardError::Validation(MSG_LOCATION_REQUIRED));
        }
        let Some(delivery_id) = draft.delivery_id else {
            return self.fail(WizardError::MissingDelivery);
        };

        self.update(|d| {
            d.is_loading = true;
            d.error = None;
        });
        let result = self
            .deliveries
            .update_delivery(delivery_id, &draft.location_patch())
            .await;
        self.update(|d| d.is_loading = false);
        if let Err(e) = result {
            return self.fail(e.into());
        }

        tracing::info!("wizard {}: location saved for {}", self.draft_id, delivery_id);
        self.update(|d| d.current_stage = WizardStage::AddProducts);
        Ok(())
    }

    // ---- stage 3: products ----

    /// Add a product; an already selected product keeps its first quantity.
    pub fn add_product(&mut self, product: Product, quantity: f64) {
        if quantity.is_nan() || quantity <= 0.0 {
            return;
        }
        self.update(|d| {
            if d.selected_products.iter().any(|p| p.product.id == product.id) {
                return;
            }
            d.selected_products.push(ProductQuantity { product, quantity });
        });
    }

    pub fn remove_product(&mut self, product_id: i64) {
        self.update(|d| d.selected_products.retain(|p| p.product.id != product_id));
    }

    /// Change a quantity; non-positive values are dropped silently.
    pub fn update_product_quantity(&mut self, product_id: i64, quantity: f64) {
        if quantity.is_nan() || quantity <= 0.0 {
            return;
        }
        self.update(|d| {
            if let Some(p) = d
                .selected_products
                .iter_mut()
                .find(|p| p.product.id == product_id)
            {
                p.quantity = quantity;
            }
        });
    }

    /// Send products and notes, finalizing the delivery.
    pub async fn save_delivery(&mut self) -> Result<(), WizardError> {
        self.require_stage(WizardStage::AddProducts)?;
        let draft = self.snapshot();
        if draft.selected_products.is_empty() {
            return self.fail(WizardError::Validation(MSG_ADD_PRODUCT));
        }
        let Some(delivery_id) = draft.delivery_id else {
            return self.fail(WizardError::MissingDelivery);
        };

        self.update(|d| {
            d.is_loading = true;
            d.error = None;
        });
        let req = UpdateDeliveryRequest {
            notes: non_blank(&draft.notes),
            status: Some(DeliveryStatus::Ready),
            products: Some(
                draft
                    .selected_products
                    .iter()
                    .map(|p| DeliveryProductInput {
                        product_id: p.product.id,
                        qty: p.quantity,
                    })
                    .collect(),
            ),
            ..Default::default()
        };
        let result = self.deliveries.update_delivery(delivery_id, &req).await;
        self.update(|d| d.is_loading = false);
        if let Err(e) = result {
            return self.fail(e.into());
        }

        tracing::info!("wizard {}: delivery {} finalized", self.draft_id, delivery_id);
        self.update(|d| d.is_completed = true);
        Ok(())
    }

    /// Acknowledge the surfaced error.
    pub fn clear_error(&mut self) {
        self.update(|d| d.error = None);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        api::models::{
            CreateProductRequest, Delivery, DeliveryFilter, DeliveryListItem, DeliveryPhoto,
            UpdateProductRequest,
        },
        error::RemoteError,
        geocoding::GeocodingResult,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Call {
        Create(CreateDeliveryRequest),
        Update(i64, UpdateDeliveryRequest),
        Upload(i64, PathBuf),
    }

    #[derive(Default)]
    pub struct FakeDeliveries {
        pub calls: Mutex<Vec<Call>>,
        pub fail_create: bool,
        pub fail_update: Mutex<bool>,
        pub fail_upload_of: Mutex<Option<PathBuf>>,
        /// Draft observed at each upload dispatch.
        pub probe: Mutex<Option<watch::Receiver<DeliveryDraft>>>,
        pub progress_seen: Mutex<Vec<(usize, usize)>>,
    }

    impl FakeDeliveries {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn uploads(&self) -> Vec<PathBuf> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Upload(_, p) => Some(p),
                    _ => None,
                })
                .collect()
        }

        fn updates(&self) -> Vec<UpdateDeliveryRequest> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Update(_, r) => Some(r),
                    _ => None,
                })
                .collect()
        }
    }

    pub fn delivery(id: i64, status: DeliveryStatus) -> Delivery {
        Delivery {
            id,
            location_name: None,
            street: None,
            district: None,
            city: None,
            region: None,
            lat: None,
            lon: None,
            notes: None,
            status,
            created_at: "2026-01-05T01:38:46Z".into(),
            created_by: 1,
            updated_at: "2026-01-05T01:38:46Z".into(),
            updated_by: 1,
        }
    }

    #[async_trait]
    impl DeliveryGateway for FakeDeliveries {
        async fn create_delivery(
            &self,
            req: &CreateDeliveryRequest,
        ) -> Result<Delivery, RemoteError> {
            self.calls.lock().unwrap().push(Call::Create(req.clone()));
            if self.fail_create {
                return Err(RemoteError::new("create refused"));
            }
            Ok(delivery(77, DeliveryStatus::NeedToConfirm))
        }

        async fn update_delivery(
            &self,
            id: i64,
            req: &UpdateDeliveryRequest,
        ) -> Result<Delivery, RemoteError> {
            self.calls.lock().unwrap().push(Call::Update(id, req.clone()));
            if *self.fail_update.lock().unwrap() {
                return Err(RemoteError::new("update refused"));
            }
            Ok(delivery(id, req.status.unwrap_or(DeliveryStatus::NeedToConfirm)))
        }

        async fn get_delivery(&self, _id: i64) -> Result<DeliveryListItem, RemoteError> {
            Err(RemoteError::new("not used"))
        }

        async fn list_deliveries(
            &self,
            _filter: &DeliveryFilter,
        ) -> Result<Vec<DeliveryListItem>, RemoteError> {
            Ok(vec![])
        }

        async fn upload_photo(
            &self,
            delivery_id: i64,
            source: &Path,
        ) -> Result<DeliveryPhoto, RemoteError> {
            if let Some(rx) = self.probe.lock().unwrap().as_ref() {
                let d = rx.borrow();
                self.progress_seen
                    .lock()
                    .unwrap()
                    .push((d.upload_progress, d.total_photos));
            }
            self.calls
                .lock()
                .unwrap()
                .push(Call::Upload(delivery_id, source.to_path_buf()));
            if self.fail_upload_of.lock().unwrap().as_deref() == Some(source) {
                return Err(RemoteError::new("413 too large"));
            }
            Ok(DeliveryPhoto {
                id: 1,
                delivery_id,
                url: format!("/uploads/{}", source.display()),
                created_at: "2026-01-05T01:40:00Z".into(),
            })
        }

        async fn delete_photo(&self, _photo_id: i64) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    pub struct FakeGeocoder {
        pub result: Result<GeocodingResult, RemoteError>,
        pub calls: Mutex<Vec<(f64, f64)>>,
    }

    #[async_trait]
    impl GeocodingGateway for FakeGeocoder {
        async fn reverse_geocode(
            &self,
            lat: f64,
            lon: f64,
        ) -> Result<GeocodingResult, RemoteError> {
            self.calls.lock().unwrap().push((lat, lon));
            self.result.clone()
        }
    }

    pub struct FakeProducts {
        pub result: Mutex<Result<Vec<Product>, RemoteError>>,
    }

    #[async_trait]
    impl ProductGateway for FakeProducts {
        async fn list_products(&self) -> Result<Vec<Product>, RemoteError> {
            self.result.lock().unwrap().clone()
        }

        // The wizard only reads the catalog.
        async fn create_product(
            &self,
            _req: &CreateProductRequest,
        ) -> Result<Product, RemoteError> {
            Err(RemoteError::new("read-only catalog"))
        }

        async fn update_product(
            &self,
            _id: i64,
            _req: &UpdateProductRequest,
        ) -> Result<Product, RemoteError> {
            Err(RemoteError::new("read-only catalog"))
        }

        async fn delete_product(&self, _id: i64) -> Result<(), RemoteError> {
            Err(RemoteError::new("read-only catalog"))
        }
    }

    pub fn product(id: i64, sku: &str) -> Product {
        Product {
            id,
            sku: sku.into(),
            name: format!("Product {sku}"),
            unit: "pcs".into(),
        }
    }

    fn full_address() -> GeocodingResult {
        GeocodingResult {
            location_name: Some("Toko Maju".into()),
            street: Some("Jl. Merdeka 1".into()),
            district: Some("Gambir".into()),
            city: Some("Jakarta Pusat".into()),
            region: Some("DKI Jakarta".into()),
            formatted_address: Some("Jl. Merdeka 1, Gambir, Jakarta Pusat".into()),
        }
    }

    struct Harness {
        deliveries: Arc<FakeDeliveries>,
        geocoder: Arc<FakeGeocoder>,
        products: Arc<FakeProducts>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with(FakeDeliveries::default(), Ok(full_address()))
        }

        fn with(
            deliveries: FakeDeliveries,
            geo: Result<GeocodingResult, RemoteError>,
        ) -> Self {
            Self {
                deliveries: Arc::new(deliveries),
                geocoder: Arc::new(FakeGeocoder {
                    result: geo,
                    calls: Mutex::new(vec![]),
                }),
                products: Arc::new(FakeProducts {
                    result: Mutex::new(Ok(vec![product(7, "X"), product(8, "Y")])),
                }),
            }
        }

        async fn engine(&self) -> WizardEngine {
            WizardEngine::start(
                self.deliveries.clone(),
                self.geocoder.clone(),
                self.products.clone(),
                10,
            )
            .await
        }
    }

    fn photos(names: &[&str]) -> Vec<SelectedPhoto> {
        names
            .iter()
            .map(|n| SelectedPhoto::new(format!("/photos/{n}.jpg"), None))
            .collect()
    }

    fn fill_location(engine: &mut WizardEngine) {
        engine.set_field(DraftField::LocationName, "Toko Maju");
        engine.set_field(DraftField::Street, "Jl. Merdeka 1");
        engine.set_field(DraftField::District, "Gambir");
        engine.set_field(DraftField::City, "Jakarta Pusat");
        engine.set_field(DraftField::Region, "DKI Jakarta");
    }

    #[tokio::test]
    async fn confirm_without_photos_never_reaches_the_server() {
        let h = Harness::new();
        let mut engine = h.engine().await;

        let err = engine.confirm_photos().await.unwrap_err();
        assert_eq!(err, WizardError::Validation(MSG_SELECT_PHOTO));
        let d = engine.snapshot();
        assert_eq!(d.current_stage, WizardStage::SelectPhotos);
        assert_eq!(d.error.as_deref(), Some(MSG_SELECT_PHOTO));
        assert!(d.delivery_id.is_none());
        assert!(h.deliveries.calls().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_stops_the_sequence() {
        let fakes = FakeDeliveries::default();
        *fakes.fail_upload_of.lock().unwrap() = Some(PathBuf::from("/photos/b.jpg"));
        let h = Harness::with(fakes, Ok(full_address()));
        let mut engine = h.engine().await;
        engine.add_photos(photos(&["a", "b", "c"]));

        let err = engine.confirm_photos().await.unwrap_err();
        assert!(matches!(err, WizardError::Remote(ref m) if m.starts_with("Failed to upload photo 2")));
        assert_eq!(
            h.deliveries.uploads(),
            vec![PathBuf::from("/photos/a.jpg"), PathBuf::from("/photos/b.jpg")]
        );

        let d = engine.snapshot();
        let states: Vec<_> = d.selected_photos.iter().map(|p| p.upload_state).collect();
        assert_eq!(
            states,
            vec![
                PhotoUploadState::Uploaded,
                PhotoUploadState::Failed,
                PhotoUploadState::Pending
            ]
        );
        assert_eq!(d.current_stage, WizardStage::SelectPhotos);
        assert!(!d.is_uploading);
        assert_eq!(d.delivery_id, Some(77));
    }

    #[tokio::test]
    async fn progress_counts_up_one_per_dispatch() {
        let h = Harness::new();
        let mut engine = h.engine().await;
        *h.deliveries.probe.lock().unwrap() = Some(engine.subscribe());
        engine.add_photos(photos(&["a", "b", "c"]));

        engine.confirm_photos().await.unwrap();
        assert_eq!(
            *h.deliveries.progress_seen.lock().unwrap(),
            vec![(1, 3), (2, 3), (3, 3)]
        );
        let d = engine.snapshot();
        assert_eq!(d.upload_progress, 3);
        assert!(d.upload_progress <= d.total_photos);
    }

    #[tokio::test]
    async fn geocode_failure_keeps_coordinates_and_advances() {
        let h = Harness::with(
            FakeDeliveries::default(),
            Err(RemoteError::new("No address found for the given coordinates")),
        );
        let mut engine = h.engine().await;
        engine.add_photos(vec![SelectedPhoto::new("/photos/a.jpg", Some((-6.2, 106.8)))]);

        engine.confirm_photos().await.unwrap();
        let d = engine.snapshot();
        assert_eq!(d.current_stage, WizardStage::ReviewLocation);
        assert_eq!(d.latitude, "-6.2");
        assert_eq!(d.longitude, "106.8");
        for f in [&d.location_name, &d.street, &d.district, &d.city, &d.region] {
            assert!(f.is_empty());
        }
        assert!(d.error.is_none());
    }

    #[tokio::test]
    async fn create_failure_keeps_no_delivery_id() {
        let h = Harness::with(
            FakeDeliveries {
                fail_create: true,
                ..Default::default()
            },
            Ok(full_address()),
        );
        let mut engine = h.engine().await;
        engine.add_photos(photos(&["a"]));

        let err = engine.confirm_photos().await.unwrap_err();
        assert_eq!(err, WizardError::Remote("create refused".into()));
        let d = engine.snapshot();
        assert!(d.delivery_id.is_none());
        assert!(!d.is_uploading);
        assert_eq!(d.current_stage, WizardStage::SelectPhotos);
        assert!(h.deliveries.uploads().is_empty());
        assert!(h.geocoder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn retry_reuses_delivery_and_skips_uploaded_photos() {
        let fakes = FakeDeliveries::default();
        *fakes.fail_upload_of.lock().unwrap() = Some(PathBuf::from("/photos/b.jpg"));
        let h = Harness::with(fakes, Ok(full_address()));
        let mut engine = h.engine().await;
        engine.add_photos(photos(&["a", "b"]));
        assert!(engine.confirm_photos().await.is_err());

        *h.deliveries.fail_upload_of.lock().unwrap() = None;
        engine.confirm_photos().await.unwrap();

        let creates = h
            .deliveries
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Create(_)))
            .count();
        assert_eq!(creates, 1);
        assert_eq!(
            h.deliveries.uploads(),
            vec![
                PathBuf::from("/photos/a.jpg"),
                PathBuf::from("/photos/b.jpg"),
                PathBuf::from("/photos/b.jpg"),
            ]
        );
        let d = engine.snapshot();
        assert_eq!(d.delivery_id, Some(77));
        assert_eq!(d.current_stage, WizardStage::ReviewLocation);
        assert!(d.error.is_none());
    }

    #[tokio::test]
    async fn stage_one_location_patch_is_best_effort() {
        let h = Harness::new();
        *h.deliveries.fail_update.lock().unwrap() = true;
        let mut engine = h.engine().await;
        engine.add_photos(vec![SelectedPhoto::new("/photos/a.jpg", Some((1.0, 2.0)))]);

        engine.confirm_photos().await.unwrap();
        assert_eq!(h.deliveries.updates().len(), 1);
        let d = engine.snapshot();
        assert_eq!(d.current_stage, WizardStage::ReviewLocation);
        assert!(d.error.is_none());
    }

    #[tokio::test]
    async fn partial_address_leaves_missing_fields_empty() {
        let h = Harness::with(
            FakeDeliveries::default(),
            Ok(GeocodingResult {
                city: Some("C".into()),
                ..Default::default()
            }),
        );
        let mut engine = h.engine().await;
        engine.add_photos(vec![SelectedPhoto::new("/photos/a.jpg", Some((1.0, 2.0)))]);

        engine.confirm_photos().await.unwrap();
        let d = engine.snapshot();
        assert_eq!(d.current_stage, WizardStage::ReviewLocation);
        assert_eq!(d.city, "C");
        for f in [&d.location_name, &d.street, &d.district, &d.region, &d.formatted_address] {
            assert!(f.is_empty());
        }
        assert_eq!(d.latitude, "1.0");
        assert_eq!(d.longitude, "2.0");
        assert_eq!(
            h.deliveries.updates(),
            vec![UpdateDeliveryRequest {
                city: Some("C".into()),
                lat: Some("1.0".into()),
                lon: Some("2.0".into()),
                ..Default::default()
            }]
        );
    }

    #[tokio::test]
    async fn photos_without_gps_skip_geocode_and_patch() {
        let h = Harness::new();
        let mut engine = h.engine().await;
        engine.add_photos(photos(&["a"]));

        engine.confirm_photos().await.unwrap();
        assert!(h.geocoder.calls.lock().unwrap().is_empty());
        assert!(h.deliveries.updates().is_empty());
        assert!(engine.snapshot().latitude.is_empty());
    }

    #[tokio::test]
    async fn location_gate_blocks_until_address_is_complete() {
        let h = Harness::new();
        let mut engine = h.engine().await;
        engine.add_photos(photos(&["a"]));
        engine.confirm_photos().await.unwrap();

        fill_location(&mut engine);
        engine.set_field(DraftField::District, "  ");
        let err = engine.confirm_location().await.unwrap_err();
        assert_eq!(err, WizardError::Validation(MSG_LOCATION_REQUIRED));
        assert_eq!(engine.snapshot().current_stage, WizardStage::ReviewLocation);
        assert!(h.deliveries.updates().is_empty());

        engine.set_field(DraftField::District, "Gambir");
        engine.confirm_location().await.unwrap();
        let updates = h.deliveries.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].district.as_deref(), Some("Gambir"));
        // Blank coordinates are sent as absent.
        assert_eq!(updates[0].lat, None);
        assert_eq!(updates[0].lon, None);
        assert_eq!(engine.snapshot().current_stage, WizardStage::AddProducts);
    }

    #[tokio::test]
    async fn location_patch_failure_keeps_stage() {
        let h = Harness::new();
        let mut engine = h.engine().await;
        engine.add_photos(photos(&["a"]));
        engine.confirm_photos().await.unwrap();
        fill_location(&mut engine);

        *h.deliveries.fail_update.lock().unwrap() = true;
        let err = engine.confirm_location().await.unwrap_err();
        assert_eq!(err, WizardError::Remote("update refused".into()));
        let d = engine.snapshot();
        assert_eq!(d.current_stage, WizardStage::ReviewLocation);
        assert_eq!(d.error.as_deref(), Some("update refused"));
        assert!(!d.is_loading);

        engine.clear_error();
        assert!(engine.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn stage_operations_reject_the_wrong_stage() {
        let h = Harness::new();
        let mut engine = h.engine().await;
        assert_eq!(
            engine.confirm_location().await.unwrap_err(),
            WizardError::WrongStage
        );
        assert_eq!(
            engine.save_delivery().await.unwrap_err(),
            WizardError::WrongStage
        );
        assert!(engine.snapshot().error.is_none());

        engine.add_photos(photos(&["a"]));
        engine.confirm_photos().await.unwrap();
        // A second "next" queued behind the first one.
        assert_eq!(
            engine.confirm_photos().await.unwrap_err(),
            WizardError::WrongStage
        );
        assert_eq!(h.deliveries.uploads().len(), 1);
    }

    #[tokio::test]
    async fn products_are_first_write_wins_and_quantities_stay_positive() {
        let h = Harness::new();
        let mut engine = h.engine().await;

        engine.add_product(product(7, "X"), 3.0);
        engine.add_product(product(7, "X"), 9.0);
        engine.add_product(product(8, "Y"), 0.0);
        let d = engine.snapshot();
        assert_eq!(d.selected_products.len(), 1);
        assert_eq!(d.selected_products[0].quantity, 3.0);

        engine.update_product_quantity(7, 0.0);
        engine.update_product_quantity(7, -5.0);
        engine.update_product_quantity(7, f64::NAN);
        assert_eq!(engine.snapshot().selected_products[0].quantity, 3.0);

        engine.update_product_quantity(7, 4.5);
        assert_eq!(engine.snapshot().selected_products[0].quantity, 4.5);

        engine.remove_product(7);
        assert!(engine.snapshot().selected_products.is_empty());
    }

    #[tokio::test]
    async fn photo_selection_dedupes_caps_and_removes_by_source() {
        let h = Harness::new();
        let mut engine = WizardEngine::start(
            h.deliveries.clone(),
            h.geocoder.clone(),
            h.products.clone(),
            2,
        )
        .await;

        engine.add_photos(photos(&["a", "a", "b", "c"]));
        let sources: Vec<_> = engine
            .snapshot()
            .selected_photos
            .into_iter()
            .map(|p| p.source)
            .collect();
        assert_eq!(
            sources,
            vec![PathBuf::from("/photos/a.jpg"), PathBuf::from("/photos/b.jpg")]
        );

        engine.remove_photo(Path::new("/photos/a.jpg"));
        let d = engine.snapshot();
        assert_eq!(d.selected_photos.len(), 1);
        assert_eq!(d.selected_photos[0].source, PathBuf::from("/photos/b.jpg"));
    }

    #[tokio::test]
    async fn catalog_failure_is_surfaced_and_retryable() {
        let h = Harness::new();
        *h.products.result.lock().unwrap() = Err(RemoteError::new("catalog down"));
        let mut engine = h.engine().await;
        let d = engine.snapshot();
        assert_eq!(d.error.as_deref(), Some("catalog down"));
        assert!(d.available_products.items().is_empty());

        *h.products.result.lock().unwrap() = Ok(vec![product(7, "X")]);
        engine.reload_products().await;
        assert_eq!(engine.snapshot().available_products.items().len(), 1);
    }

    #[tokio::test]
    async fn save_requires_products_and_failure_is_not_terminal() {
        let h = Harness::new();
        let mut engine = h.engine().await;
        engine.add_photos(photos(&["a"]));
        engine.confirm_photos().await.unwrap();
        fill_location(&mut engine);
        engine.confirm_location().await.unwrap();

        assert_eq!(
            engine.save_delivery().await.unwrap_err(),
            WizardError::Validation(MSG_ADD_PRODUCT)
        );

        engine.add_product(product(7, "X"), 1.0);
        *h.deliveries.fail_update.lock().unwrap() = true;
        assert!(engine.save_delivery().await.is_err());
        let d = engine.snapshot();
        assert!(!d.is_completed);
        assert_eq!(d.current_stage, WizardStage::AddProducts);
    }

    #[tokio::test]
    async fn full_run_finalizes_the_delivery() {
        let h = Harness::new();
        let mut engine = h.engine().await;
        engine.add_photos(vec![
            SelectedPhoto::new("/photos/a.jpg", Some((1.0, 2.0))),
            SelectedPhoto::new("/photos/b.jpg", None),
        ]);

        engine.confirm_photos().await.unwrap();
        let d = engine.snapshot();
        assert_eq!(d.delivery_id, Some(77));
        assert_eq!(*h.geocoder.calls.lock().unwrap(), vec![(1.0, 2.0)]);
        assert_eq!(
            h.deliveries.uploads(),
            vec![PathBuf::from("/photos/a.jpg"), PathBuf::from("/photos/b.jpg")]
        );
        assert_eq!(h.deliveries.updates().len(), 1);
        assert_eq!(d.current_stage, WizardStage::ReviewLocation);
        assert_eq!(d.location_name, "Toko Maju");
        assert_eq!(d.formatted_address, "Jl. Merdeka 1, Gambir, Jakarta Pusat");
        assert_eq!(h.deliveries.updates()[0].lat.as_deref(), Some("1.0"));

        fill_location(&mut engine);
        engine.confirm_location().await.unwrap();
        assert_eq!(h.deliveries.updates().len(), 2);
        assert_eq!(engine.snapshot().current_stage, WizardStage::AddProducts);

        engine.add_product(product(7, "X"), 3.0);
        engine.set_field(DraftField::Notes, "  ");
        engine.save_delivery().await.unwrap();

        let last = h.deliveries.updates().pop().unwrap();
        assert_eq!(last.status, Some(DeliveryStatus::Ready));
        assert_eq!(
            last.products,
            Some(vec![DeliveryProductInput {
                product_id: 7,
                qty: 3.0
            }])
        );
        assert_eq!(last.notes, None);
        assert!(engine.snapshot().is_completed);

        // Completed drafts accept no further stage operations.
        assert_eq!(
            engine.save_delivery().await.unwrap_err(),
            WizardError::WrongStage
        );
    }
}
