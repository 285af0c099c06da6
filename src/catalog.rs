//! Supervisor product management.
//!
//! Every mutation is checked against the stored role before it reaches the
//! server, and the catalog is reloaded afterwards so the list shown is the
//! server's view.

use std::sync::Arc;

use crate::{
    api::{
        models::{CreateProductRequest, Product, UpdateProductRequest, UserRole},
        products::ProductGateway,
    },
    error::RemoteError,
    resource::Resource,
};

/// Message shown when a non-supervisor reaches a catalog mutation.
pub const SUPERVISOR_ONLY: &str = "Only supervisors can manage products";

/// Fields entered on the product form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductForm {
    pub sku: String,
    pub name: String,
    pub unit: String,
}

impl ProductForm {
    /// First required field left blank, by label.
    pub fn missing_field(&self) -> Option<&'static str> {
        [("SKU", &self.sku), ("Name", &self.name), ("Unit", &self.unit)]
            .into_iter()
            .find(|(_, v)| v.trim().is_empty())
            .map(|(label, _)| label)
    }
}

/// Catalog operations on behalf of one user role.
pub struct ProductCatalog {
    gateway: Arc<dyn ProductGateway>,
    role: Option<UserRole>,
}

impl ProductCatalog {
    pub fn new(gateway: Arc<dyn ProductGateway>, role: Option<UserRole>) -> Self {
        Self { gateway, role }
    }

    fn ensure_supervisor(&self) -> Result<(), RemoteError> {
        match self.role {
            Some(UserRole::Supervisor) => Ok(()),
            _ => Err(RemoteError::new(SUPERVISOR_ONLY)),
        }
    }

    /// Current catalog, sorted by SKU.
    pub async fn load(&self) -> Resource<Vec<Product>> {
        if let Err(e) = self.ensure_supervisor() {
            return Resource::Error(e.message);
        }
        let r = self.gateway.list_products().await.map(|mut list| {
            list.sort_by(|a, b| a.sku.cmp(&b.sku));
            list
        });
        Resource::from_result(r)
    }

    /// Create a product; every field is required and sent trimmed.
    pub async fn create(&self, form: &ProductForm) -> Result<String, RemoteError> {
        self.ensure_supervisor()?;
        if let Some(label) = form.missing_field() {
            return Err(RemoteError::new(format!("{label} is required")));
        }
        let req = CreateProductRequest {
            sku: form.sku.trim().to_string(),
            name: form.name.trim().to_string(),
            unit: form.unit.trim().to_string(),
        };
        let p = self.gateway.create_product(&req).await?;
        tracing::info!("product {} created as {}", p.sku, p.id);
        Ok("Product created successfully".into())
    }

    /// Rename or re-unit a product; the SKU never changes.
    pub async fn update(&self, id: i64, name: &str, unit: &str) -> Result<String, RemoteError> {
        self.ensure_supervisor()?;
        for (label, v) in [("Name", name), ("Unit", unit)] {
            if v.trim().is_empty() {
                return Err(RemoteError::new(format!("{label} is required")));
            }
        }
        let req = UpdateProductRequest {
            name: Some(name.trim().to_string()),
            unit: Some(unit.trim().to_string()),
        };
        let p = self.gateway.update_product(id, &req).await?;
        tracing::info!("product {} updated", p.id);
        Ok("Product updated successfully".into())
    }

    pub async fn delete(&self, id: i64) -> Result<String, RemoteError> {
        self.ensure_supervisor()?;
        self.gateway.delete_product(id).await?;
        tracing::info!("product {id} deleted");
        Ok("Product deleted successfully".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::wizard::tests::product;

    #[derive(Default)]
    struct RecordingProducts {
        list: Vec<Product>,
        created: Mutex<Vec<CreateProductRequest>>,
        updated: Mutex<Vec<(i64, UpdateProductRequest)>>,
        deleted: Mutex<Vec<i64>>,
        fail_with: Option<RemoteError>,
    }

    #[async_trait]
    impl ProductGateway for RecordingProducts {
        async fn list_products(&self) -> Result<Vec<Product>, RemoteError> {
            Ok(self.list.clone())
        }

        async fn create_product(
            &self,
            req: &CreateProductRequest,
        ) -> Result<Product, RemoteError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            self.created.lock().unwrap().push(req.clone());
            Ok(Product {
                id: 1,
                sku: req.sku.clone(),
                name: req.name.clone(),
                unit: req.unit.clone(),
            })
        }

        async fn update_product(
            &self,
            id: i64,
            req: &UpdateProductRequest,
        ) -> Result<Product, RemoteError> {
            self.updated.lock().unwrap().push((id, req.clone()));
            Ok(product(id, "X"))
        }

        async fn delete_product(&self, id: i64) -> Result<(), RemoteError> {
            self.deleted.lock().unwrap().push(id);
            Ok(())
        }
    }

    fn catalog(gw: &Arc<RecordingProducts>, role: UserRole) -> ProductCatalog {
        ProductCatalog::new(gw.clone(), Some(role))
    }

    fn form(sku: &str, name: &str, unit: &str) -> ProductForm {
        ProductForm {
            sku: sku.into(),
            name: name.into(),
            unit: unit.into(),
        }
    }

    #[tokio::test]
    async fn sales_users_cannot_touch_the_catalog() {
        let gw = Arc::new(RecordingProducts::default());
        let c = catalog(&gw, UserRole::Sales);

        assert_eq!(c.load().await, Resource::Error(SUPERVISOR_ONLY.into()));
        let err = c.create(&form("A", "B", "C")).await.unwrap_err();
        assert_eq!(err.message, SUPERVISOR_ONLY);
        assert!(c.update(3, "n", "u").await.is_err());
        assert!(c.delete(3).await.is_err());
        assert!(gw.created.lock().unwrap().is_empty());
        assert!(gw.updated.lock().unwrap().is_empty());
        assert!(gw.deleted.lock().unwrap().is_empty());

        let anonymous = ProductCatalog::new(gw.clone(), None);
        assert!(anonymous.delete(3).await.is_err());
    }

    #[tokio::test]
    async fn create_requires_every_field_and_trims() {
        let gw = Arc::new(RecordingProducts::default());
        let c = catalog(&gw, UserRole::Supervisor);

        let err = c.create(&form("CEM", "  ", "sak")).await.unwrap_err();
        assert_eq!(err.message, "Name is required");
        assert!(gw.created.lock().unwrap().is_empty());

        let msg = c.create(&form(" CEM-50 ", "Semen ", "sak")).await.unwrap();
        assert_eq!(msg, "Product created successfully");
        assert_eq!(
            *gw.created.lock().unwrap(),
            vec![CreateProductRequest {
                sku: "CEM-50".into(),
                name: "Semen".into(),
                unit: "sak".into(),
            }]
        );
    }

    #[tokio::test]
    async fn update_sends_name_and_unit_only() {
        let gw = Arc::new(RecordingProducts::default());
        let c = catalog(&gw, UserRole::Supervisor);

        assert!(c.update(4, "Semen", "").await.is_err());
        c.update(4, "Semen Putih", "sak").await.unwrap();
        assert_eq!(
            *gw.updated.lock().unwrap(),
            vec![(
                4,
                UpdateProductRequest {
                    name: Some("Semen Putih".into()),
                    unit: Some("sak".into()),
                }
            )]
        );
    }

    #[tokio::test]
    async fn supervisor_sees_catalog_sorted_and_can_delete() {
        let gw = Arc::new(RecordingProducts {
            list: vec![product(2, "B"), product(1, "A")],
            ..Default::default()
        });
        let c = catalog(&gw, UserRole::Supervisor);

        let skus: Vec<_> = c.load().await.items().iter().map(|p| p.sku.clone()).collect();
        assert_eq!(skus, vec!["A", "B"]);
        assert_eq!(c.delete(2).await.unwrap(), "Product deleted successfully");
        assert_eq!(*gw.deleted.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn server_errors_pass_through() {
        let gw = Arc::new(RecordingProducts {
            fail_with: Some(RemoteError::new("HTTP status 409 Conflict error: duplicate sku")),
            ..Default::default()
        });
        let c = catalog(&gw, UserRole::Supervisor);

        let err = c.create(&form("A", "B", "C")).await.unwrap_err();
        assert!(err.message.contains("duplicate sku"));
    }
}
