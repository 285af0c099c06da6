//! Delivery API wrappers.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;

use super::{
    ApiClient,
    models::{
        CreateDeliveryRequest, Delivery, DeliveryFilter, DeliveryListItem, DeliveryPhoto,
        UpdateDeliveryRequest,
    },
};
use crate::error::RemoteError;

/// Typed delivery calls used by the wizard and the list/detail screens.
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    async fn create_delivery(&self, req: &CreateDeliveryRequest) -> Result<Delivery, RemoteError>;
    /// Partial update; absent fields are left untouched.
    async fn update_delivery(
        &self,
        id: i64,
        req: &UpdateDeliveryRequest,
    ) -> Result<Delivery, RemoteError>;
    async fn get_delivery(&self, id: i64) -> Result<DeliveryListItem, RemoteError>;
    async fn list_deliveries(
        &self,
        filter: &DeliveryFilter,
    ) -> Result<Vec<DeliveryListItem>, RemoteError>;
    /// Upload the image at `source` as a photo of the delivery.
    async fn upload_photo(
        &self,
        delivery_id: i64,
        source: &Path,
    ) -> Result<DeliveryPhoto, RemoteError>;
    async fn delete_photo(&self, photo_id: i64) -> Result<(), RemoteError>;
}

#[async_trait]
impl DeliveryGateway for ApiClient {
    async fn create_delivery(&self, req: &CreateDeliveryRequest) -> Result<Delivery, RemoteError> {
        let rb = self.http.post(self.url("deliveries")).json(req);
        self.send_json(rb)
            .await
            .map_err(|e| e.or_generic("Failed to create delivery"))
    }

    async fn update_delivery(
        &self,
        id: i64,
        req: &UpdateDeliveryRequest,
    ) -> Result<Delivery, RemoteError> {
        let rb = self.http.put(self.url(&format!("deliveries/{id}"))).json(req);
        self.send_json(rb)
            .await
            .map_err(|e| e.or_generic("Failed to update delivery"))
    }

    async fn get_delivery(&self, id: i64) -> Result<DeliveryListItem, RemoteError> {
        let rb = self.http.get(self.url(&format!("deliveries/{id}")));
        self.send_json(rb)
            .await
            .map_err(|e| e.or_generic("Failed to fetch delivery details"))
    }

    async fn list_deliveries(
        &self,
        filter: &DeliveryFilter,
    ) -> Result<Vec<DeliveryListItem>, RemoteError> {
        let rb = self
            .http
            .get(self.url("deliveries"))
            .query(&filter.query_pairs());
        self.send_json(rb)
            .await
            .map_err(|e| e.or_generic("Failed to fetch deliveries"))
    }

    async fn upload_photo(
        &self,
        delivery_id: i64,
        source: &Path,
    ) -> Result<DeliveryPhoto, RemoteError> {
        let bytes = tokio::fs::read(source)
            .await
            .map_err(|e| RemoteError::new(format!("Failed to open file: {e}")))?;
        let filename = photo_file_name(source);
        let part = Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str(photo_mime(&filename))?;
        let form = Form::new().part("photo", part);

        let rb = self
            .http
            .post(self.url(&format!("deliveries/{delivery_id}/photos/upload")))
            .multipart(form);
        self.send_json(rb)
            .await
            .map_err(|e| e.or_generic("Failed to upload photo"))
    }

    async fn delete_photo(&self, photo_id: i64) -> Result<(), RemoteError> {
        let rb = self.http.delete(self.url(&format!("photos/{photo_id}")));
        self.send_empty(rb)
            .await
            .map_err(|e| e.or_generic("Failed to delete photo"))
    }
}

/// File name sent with the multipart part.
fn photo_file_name(source: &Path) -> String {
    source
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("photo.jpg")
        .to_string()
}

/// MIME type guessed from the extension.
fn photo_mime(filename: &str) -> &'static str {
    if filename.to_ascii_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}
