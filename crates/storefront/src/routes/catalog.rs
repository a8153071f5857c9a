//! Catalog pages: home, shop listing, product detail.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use streetlab_core::{Product, Size, StockLevel};

use super::redirect_with_flash;
use crate::error::Result;
use crate::middleware::{OptionalAuth, cart_count, take_flash};
use crate::state::AppState;

/// Number of products shown on the home page.
const FEATURED_LIMIT: u32 = 4;

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HomeView {
    /// Name of the logged-in user.
    pub user_name: Option<String>,
    pub featured: Vec<Product>,
    /// Units in the cart badge.
    pub cart_count: u32,
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ShopView {
    pub category: Option<String>,
    pub categories: Vec<String>,
    pub products: Vec<Product>,
    pub cart_count: u32,
    pub messages: Vec<String>,
}

/// Units on hand for one size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeAvailability {
    pub size: Size,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct ProductView {
    pub product: Product,
    /// Standard sizes in display order, zero where no stock row exists.
    pub sizes: Vec<SizeAvailability>,
    pub cart_count: u32,
    pub messages: Vec<String>,
}

/// Stock for each standard size, in display order.
#[must_use]
pub fn size_availability(levels: &[StockLevel]) -> Vec<SizeAvailability> {
    Size::standard()
        .into_iter()
        .map(|size| {
            let quantity = levels
                .iter()
                .find(|level| level.size == size)
                .map_or(0, StockLevel::available);
            SizeAvailability { size, quantity }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub category: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Home page with the newest active products.
#[instrument(skip(state, session, user))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<HomeView>> {
    let featured = state.catalog().featured(FEATURED_LIMIT).await?;
    Ok(Json(HomeView {
        user_name: user.map(|u| u.name),
        featured,
        cart_count: cart_count(&session).await?,
        messages: take_flash(&session).await?.into_messages(),
    }))
}

/// Active products, optionally filtered by category.
#[instrument(skip(state, session))]
pub async fn shop(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
    session: Session,
) -> Result<Json<ShopView>> {
    let category = query
        .category
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty());

    let products = state.catalog().active_products(category.as_deref()).await?;
    let categories = state.catalog().categories().await?;

    Ok(Json(ShopView {
        category,
        categories,
        products,
        cart_count: cart_count(&session).await?,
        messages: take_flash(&session).await?.into_messages(),
    }))
}

/// Product detail. Unknown or inactive products send the visitor back to the shop.
#[instrument(skip(state, session))]
pub async fn product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    session: Session,
) -> Result<Response> {
    let Some(product) = state
        .catalog()
        .product_by_slug(&slug)
        .await?
        .filter(|product| product.active)
    else {
        return Ok(redirect_with_flash(&session, "/shop", "Product not found")
            .await?
            .into_response());
    };

    let levels = state.catalog().stock_levels(product.id).await?;

    Ok(Json(ProductView {
        sizes: size_availability(&levels),
        product,
        cart_count: cart_count(&session).await?,
        messages: take_flash(&session).await?.into_messages(),
    })
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use streetlab_core::ProductId;

    fn level(size: &str, quantity: i32) -> StockLevel {
        StockLevel {
            product_id: ProductId::new(7),
            size: Size::parse(size).unwrap(),
            quantity,
        }
    }

    #[test]
    fn test_size_availability_fills_missing_sizes() {
        let sizes = size_availability(&[level("G", 2), level("P", 5)]);
        let codes: Vec<_> = sizes.iter().map(|s| (s.size.as_str(), s.quantity)).collect();
        assert_eq!(codes, [("P", 5), ("M", 0), ("G", 2)]);
    }

    #[test]
    fn test_size_availability_without_stock_rows() {
        assert!(size_availability(&[]).iter().all(|s| s.quantity == 0));
    }
}
