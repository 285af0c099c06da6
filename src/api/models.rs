//! Wire types for the delivery REST API.

use serde::{Deserialize, Serialize};

/// Delivery lifecycle status as sent on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Ready,
    Done,
    Broken,
    /// Provisional status of a delivery still being created by the wizard.
    NeedToConfirm,
}

impl DeliveryStatus {
    /// Wire value, used for query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Ready => "Ready",
            DeliveryStatus::Done => "Done",
            DeliveryStatus::Broken => "Broken",
            DeliveryStatus::NeedToConfirm => "NeedToConfirm",
        }
    }

    /// Next status in the supervisor's cycle on the detail screen.
    pub fn cycled(&self) -> Self {
        match self {
            DeliveryStatus::NeedToConfirm => DeliveryStatus::Ready,
            DeliveryStatus::Ready => DeliveryStatus::Done,
            DeliveryStatus::Done => DeliveryStatus::Broken,
            DeliveryStatus::Broken => DeliveryStatus::Ready,
        }
    }
}

/// Delivery resource returned by create/update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    pub location_name: Option<String>,
    pub street: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub notes: Option<String>,
    pub status: DeliveryStatus,
    pub created_at: String,
    pub created_by: i64,
    pub updated_at: String,
    pub updated_by: i64,
}

/// Product line inside a create/update request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryProductInput {
    pub product_id: i64,
    pub qty: f64,
}

/// `POST /deliveries` body.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CreateDeliveryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,
    pub products: Vec<DeliveryProductInput>,
}

/// `PUT /deliveries/{id}` body; absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UpdateDeliveryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<DeliveryProductInput>>,
}

/// Product line of a delivery detail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryProductDetail {
    pub product_id: i64,
    pub product_sku: String,
    pub product_name: String,
    pub product_unit: String,
    pub qty: f64,
}

/// Photo attached to a delivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPhoto {
    pub id: i64,
    pub delivery_id: i64,
    pub url: String,
    pub created_at: String,
}

/// Flattened delivery with its products and photos (list rows and detail view).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryListItem {
    #[serde(flatten)]
    pub delivery: Delivery,
    #[serde(default)]
    pub products: Vec<DeliveryProductDetail>,
    #[serde(default)]
    pub photos: Vec<DeliveryPhoto>,
}

/// Query parameters of `GET /deliveries`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeliveryFilter {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub status: Option<DeliveryStatus>,
}

impl DeliveryFilter {
    /// Present parameters as `(name, value)` pairs.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut q = vec![];
        if let Some(p) = self.page {
            q.push(("page", p.to_string()));
        }
        if let Some(l) = self.limit {
            q.push(("limit", l.to_string()));
        }
        if let Some(d) = &self.district {
            q.push(("district", d.clone()));
        }
        if let Some(c) = &self.city {
            q.push(("city", c.clone()));
        }
        if let Some(r) = &self.region {
            q.push(("region", r.clone()));
        }
        if let Some(s) = self.status {
            q.push(("status", s.as_str().to_string()));
        }
        q
    }
}

/// Reference product used by the wizard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub unit: String,
}

/// `POST /products` body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    pub unit: String,
}

/// `PUT /products/{id}` body; the SKU is fixed once created.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UpdateProductRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Chat message bound to a delivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub delivery_id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub sender_initial: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct MarkReadRequest {
    pub last_read_message_id: i64,
}

/// Unread message count per delivery.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UnreadCount {
    pub delivery_id: i64,
    pub count: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Sales,
    Supervisor,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub initial: String,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}
