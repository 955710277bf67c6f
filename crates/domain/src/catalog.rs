//! Catalog reads and administrative writes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use store::{CatalogRepository, Money, Product, ProductDraft, ProductId};

use crate::error::{DomainError, Result};

/// Extensions tried for a product image, in order.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Image served when a product has none of its own.
pub const DEFAULT_IMAGE: &str = "default.jpg";

/// Fields to change on a product. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i32>,
}

impl ProductPatch {
    /// Merges the provided fields onto `current`.
    pub fn apply(self, current: Product) -> ProductDraft {
        ProductDraft {
            name: self.name.unwrap_or(current.name),
            description: self.description.or(current.description),
            category: self.category.unwrap_or(current.category),
            subcategory: self.subcategory.or(current.subcategory),
            price: self.price.unwrap_or(current.price),
            stock: self.stock.unwrap_or(current.stock),
        }
    }
}

/// Picks the image file name for a product from the names that exist.
///
/// Pure so it can be reused against any directory listing.
pub fn resolve_image_name(id: ProductId, exists: impl Fn(&str) -> bool) -> String {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| format!("product_{id}.{ext}"))
        .find(|name| exists(name))
        .unwrap_or_else(|| DEFAULT_IMAGE.to_string())
}

/// Resolves product images under a directory of static assets.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    dir: PathBuf,
    url_prefix: String,
}

impl ImageResolver {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of the regular files in the image directory.
    ///
    /// Read once per request and shared by every product in it. A missing or
    /// unreadable directory lists as empty, so every product gets the default.
    pub async fn listing(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(dir = %self.dir.display(), error = %err, "image directory unreadable");
                return names;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if is_file && let Ok(name) = entry.file_name().into_string() {
                names.insert(name);
            }
        }
        names
    }

    /// Public URL of the product's image within a directory listing.
    pub fn url_in(&self, id: ProductId, listing: &HashSet<String>) -> String {
        let name = resolve_image_name(id, |name| listing.contains(name));
        format!("{}/{name}", self.url_prefix)
    }

    /// Public URL of the product's image, or of the default image.
    pub async fn image_url(&self, id: ProductId) -> String {
        self.url_in(id, &self.listing().await)
    }
}

/// A product as shown to clients, with its derived image URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductView {
    pub product: Product,
    pub image: String,
}

/// Service for catalog operations.
#[derive(Clone)]
pub struct CatalogService<R> {
    repo: R,
    images: ImageResolver,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: R, images: ImageResolver) -> Self {
        Self { repo, images }
    }

    async fn view(&self, product: Product) -> ProductView {
        ProductView {
            image: self.images.image_url(product.id).await,
            product,
        }
    }

    async fn views(&self, products: Vec<Product>) -> Vec<ProductView> {
        let listing = self.images.listing().await;
        products
            .into_iter()
            .map(|product| ProductView {
                image: self.images.url_in(product.id, &listing),
                product,
            })
            .collect()
    }

    pub async fn list(&self) -> Result<Vec<ProductView>> {
        let products = self.repo.list_products().await?;
        Ok(self.views(products).await)
    }

    pub async fn get(&self, id: ProductId) -> Result<ProductView> {
        let product = self
            .repo
            .get_product(id)
            .await?
            .ok_or(DomainError::product_not_found(id))?;
        Ok(self.view(product).await)
    }

    pub async fn by_category(&self, category: &str) -> Result<Vec<ProductView>> {
        let products = self.repo.products_by_category(category).await?;
        Ok(self.views(products).await)
    }

    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: ProductDraft) -> Result<ProductView> {
        if draft.name.trim().is_empty() {
            return Err(DomainError::Validation("Product name is required".to_string()));
        }
        if draft.category.trim().is_empty() {
            return Err(DomainError::Validation(
                "Product category is required".to_string(),
            ));
        }
        let product = self.repo.create_product(draft).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(self.view(product).await)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<ProductView> {
        let current = self
            .repo
            .get_product(id)
            .await?
            .ok_or(DomainError::product_not_found(id))?;
        let draft = patch.apply(current);
        if draft.name.trim().is_empty() {
            return Err(DomainError::Validation("Product name is required".to_string()));
        }
        let product = self.repo.update_product(id, draft).await?;
        Ok(self.view(product).await)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        if self.repo.delete_product(id).await? {
            Ok(())
        } else {
            Err(DomainError::product_not_found(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use store::InMemoryStore;

    use super::*;

    fn resolver(dir: &Path) -> ImageResolver {
        ImageResolver::new(dir, "/assets/images/")
    }

    fn draft(name: &str) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            category: "home".to_string(),
            price: Money::from_cents(1000),
            stock: 4,
            ..Default::default()
        }
    }

    #[test]
    fn image_lookup_prefers_extensions_in_order() {
        let id = ProductId::new(3);
        let name = resolve_image_name(id, |n| n == "product_3.png" || n == "product_3.webp");
        assert_eq!(name, "product_3.png");
        assert_eq!(resolve_image_name(id, |_| false), DEFAULT_IMAGE);
    }

    #[tokio::test]
    async fn resolver_looks_in_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("product_7.jpeg"), b"img").unwrap();
        std::fs::create_dir(dir.path().join("product_8.jpg")).unwrap();
        let images = resolver(dir.path());

        assert_eq!(
            images.image_url(ProductId::new(7)).await,
            "/assets/images/product_7.jpeg"
        );
        assert_eq!(
            images.image_url(ProductId::new(8)).await,
            "/assets/images/default.jpg"
        );

        let missing = resolver(&dir.path().join("absent"));
        assert_eq!(
            missing.image_url(ProductId::new(7)).await,
            "/assets/images/default.jpg"
        );
    }

    #[tokio::test]
    async fn listed_products_get_their_images() {
        let dir = tempfile::tempdir().unwrap();
        let service = CatalogService::new(InMemoryStore::new(), resolver(dir.path()));
        let lamp = service.create(draft("Lamp")).await.unwrap();
        let rug = service.create(draft("Rug")).await.unwrap();
        std::fs::write(dir.path().join(format!("product_{}.png", rug.product.id)), b"img")
            .unwrap();

        let listed = service.by_category("home").await.unwrap();
        let image_of = |id: ProductId| {
            listed
                .iter()
                .find(|v| v.product.id == id)
                .map(|v| v.image.clone())
        };
        assert_eq!(
            image_of(lamp.product.id).as_deref(),
            Some("/assets/images/default.jpg")
        );
        assert_eq!(
            image_of(rug.product.id),
            Some(format!("/assets/images/product_{}.png", rug.product.id))
        );
    }

    #[tokio::test]
    async fn patch_merges_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let service = CatalogService::new(InMemoryStore::new(), resolver(dir.path()));
        let created = service.create(draft("Lamp")).await.unwrap();

        let updated = service
            .update(
                created.product.id,
                ProductPatch {
                    stock: Some(9),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.product.stock, 9);
        assert_eq!(updated.product.name, "Lamp");
        assert_eq!(updated.product.price, Money::from_cents(1000));
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = CatalogService::new(InMemoryStore::new(), resolver(dir.path()));

        let missing = service
            .update(ProductId::new(42), ProductPatch::default())
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound { id: 42, .. })));
        assert!(service.delete(ProductId::new(42)).await.is_err());
    }

    #[tokio::test]
    async fn create_rejects_blank_name_and_negative_price() {
        let dir = tempfile::tempdir().unwrap();
        let service = CatalogService::new(InMemoryStore::new(), resolver(dir.path()));

        assert!(matches!(
            service.create(draft("  ")).await,
            Err(DomainError::Validation(_))
        ));

        let mut negative = draft("Lamp");
        negative.price = Money::from_cents(-1);
        assert!(matches!(
            service.create(negative).await,
            Err(DomainError::Validation(_))
        ));
    }
}
