//! Product catalog API wrapper.

use async_trait::async_trait;

use super::{
    ApiClient,
    models::{CreateProductRequest, Product, UpdateProductRequest},
};
use crate::error::RemoteError;

/// Product catalog: read by the wizard, edited by supervisors.
#[async_trait]
pub trait ProductGateway: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, RemoteError>;
    async fn create_product(&self, req: &CreateProductRequest) -> Result<Product, RemoteError>;
    async fn update_product(
        &self,
        id: i64,
        req: &UpdateProductRequest,
    ) -> Result<Product, RemoteError>;
    async fn delete_product(&self, id: i64) -> Result<(), RemoteError>;
}

#[async_trait]
impl ProductGateway for ApiClient {
    async fn list_products(&self) -> Result<Vec<Product>, RemoteError> {
        // The catalog is edited by supervisors; never serve a cached copy.
        let rb = self
            .http
            .get(self.url("products"))
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache");
        self.send_json(rb)
            .await
            .map_err(|e| e.or_generic("Failed to fetch products"))
    }

    async fn create_product(&self, req: &CreateProductRequest) -> Result<Product, RemoteError> {
        let rb = self.http.post(self.url("products")).json(req);
        self.send_json(rb)
            .await
            .map_err(|e| e.or_generic("Failed to create product"))
    }

    async fn update_product(
        &self,
        id: i64,
        req: &UpdateProductRequest,
    ) -> Result<Product, RemoteError> {
        let rb = self.http.put(self.url(&format!("products/{id}"))).json(req);
        self.send_json(rb)
            .await
            .map_err(|e| e.or_generic("Failed to update product"))
    }

    async fn delete_product(&self, id: i64) -> Result<(), RemoteError> {
        let rb = self.http.delete(self.url(&format!("products/{id}")));
        self.send_empty(rb)
            .await
            .map_err(|e| e.or_generic("Failed to delete product"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::client_for;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lists_catalog_without_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .and(header("cache-control", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 7, "sku": "X", "name": "Semen 50kg", "unit": "sak"}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Some("tok"));
        let products = client.list_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].sku, "X");
    }

    #[tokio::test]
    async fn malformed_body_is_a_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Some("tok"));
        assert!(client.list_products().await.is_err());
    }

    #[tokio::test]
    async fn create_posts_all_three_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/products"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({"sku": "CEM-50", "name": "Semen", "unit": "sak"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"id": 9, "sku": "CEM-50", "name": "Semen", "unit": "sak"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Some("tok"));
        let req = CreateProductRequest {
            sku: "CEM-50".into(),
            name: "Semen".into(),
            unit: "sak".into(),
        };
        assert_eq!(client.create_product(&req).await.unwrap().id, 9);
    }

    #[tokio::test]
    async fn update_sends_only_changed_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/products/9"))
            .and(body_json(json!({"unit": "karung"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"id": 9, "sku": "CEM-50", "name": "Semen", "unit": "karung"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Some("tok"));
        let req = UpdateProductRequest {
            unit: Some("karung".into()),
            ..Default::default()
        };
        assert_eq!(client.update_product(9, &req).await.unwrap().unit, "karung");
    }

    #[tokio::test]
    async fn delete_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/products/9"))
            .respond_with(ResponseTemplate::new(409).set_body_string("product in use"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Some("tok"));
        let err = client.delete_product(9).await.unwrap_err();
        assert!(err.message.contains("409"));
        assert!(err.message.contains("product in use"));
    }
}
