//! Back-office handlers: dashboard counters, product and order mutations.
//!
//! Every handler takes [`RequireAdmin`]; anyone else is sent to
//! `/login?next=/admin`.

use axum::{
    Form, Json,
    extract::{Path, State},
    response::Redirect,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use streetlab_core::{Money, OrderId, OrderStatus, ProductId, Size};

use super::redirect_with_flash;
use crate::db::{ProductRepository, RepositoryError};
use crate::db::products::{ProductChanges, ProductDraft, StockInput};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, take_flash};
use crate::models::DashboardCounts;
use crate::state::AppState;

const ADMIN_PATH: &str = "/admin";

// =============================================================================
// Form Types
// =============================================================================

/// Product create/edit form. Stock fields hold the units for P, M and G.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub slug: String,
    pub price: String,
    pub description: String,
    pub category: String,
    /// Image file name; blank keeps the current image on edit.
    pub image: String,
    /// Checkbox; present means active.
    pub active: Option<String>,
    pub stock_p: String,
    pub stock_m: String,
    pub stock_g: String,
}

/// Order status form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Dashboard page data.
#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub counts: DashboardCounts,
    pub messages: Vec<String>,
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

/// Units typed into a stock field. Anything but plain digits counts as zero.
fn parse_stock(raw: &str) -> u32 {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    raw.parse().unwrap_or(0)
}

impl ProductForm {
    fn price(&self) -> std::result::Result<Money, String> {
        let amount: Decimal = self
            .price
            .trim()
            .replace(',', ".")
            .parse()
            .map_err(|_| format!("Invalid price: {}", self.price.trim()))?;
        if amount.is_sign_negative() {
            return Err("Price cannot be negative".to_owned());
        }
        Ok(Money::new(amount).round_cents())
    }

    fn name(&self) -> std::result::Result<String, String> {
        optional(&self.name).ok_or_else(|| "Name is required".to_owned())
    }

    fn stock(&self) -> Vec<StockInput> {
        Size::standard()
            .into_iter()
            .zip([&self.stock_p, &self.stock_m, &self.stock_g])
            .map(|(size, raw)| StockInput {
                size,
                quantity: parse_stock(raw),
            })
            .collect()
    }

    fn draft(&self) -> std::result::Result<ProductDraft, String> {
        let slug = optional(&self.slug).ok_or_else(|| "Slug is required".to_owned())?;
        Ok(ProductDraft {
            slug,
            name: self.name()?,
            price: self.price()?,
            description: optional(&self.description),
            category: optional(&self.category),
            image: optional(&self.image),
            active: self.active.is_some(),
        })
    }

    fn changes(&self) -> std::result::Result<ProductChanges, String> {
        Ok(ProductChanges {
            name: self.name()?,
            price: self.price()?,
            description: optional(&self.description),
            category: optional(&self.category),
            image: optional(&self.image),
            active: self.active.is_some(),
        })
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Dashboard counters.
#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
) -> Result<Json<DashboardView>> {
    let counts = state.admin_orders().dashboard_counts().await?;
    Ok(Json(DashboardView {
        counts,
        messages: take_flash(&session).await?.into_messages(),
    }))
}

/// Create a product with its P/M/G stock.
#[instrument(skip(state, session, admin, form), fields(user_id = %admin.id, slug = %form.slug))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let draft = match form.draft() {
        Ok(draft) => draft,
        Err(message) => return redirect_with_flash(&session, ADMIN_PATH, message).await,
    };

    match ProductRepository::new(state.pool())
        .create(&draft, &form.stock())
        .await
    {
        Ok(id) => {
            redirect_with_flash(&session, ADMIN_PATH, format!("Product {id} created")).await
        }
        Err(RepositoryError::Conflict(message)) => {
            redirect_with_flash(&session, ADMIN_PATH, capitalize(&message)).await
        }
        Err(err) => Err(err.into()),
    }
}

/// Update a product and overwrite its P/M/G stock.
#[instrument(skip(state, session, admin, form), fields(user_id = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    let changes = match form.changes() {
        Ok(changes) => changes,
        Err(message) => return redirect_with_flash(&session, ADMIN_PATH, message).await,
    };

    match ProductRepository::new(state.pool())
        .update(id, &changes, &form.stock())
        .await
    {
        Ok(()) => redirect_with_flash(&session, ADMIN_PATH, format!("Product {id} updated")).await,
        Err(RepositoryError::Conflict(message)) => {
            redirect_with_flash(&session, ADMIN_PATH, capitalize(&message)).await
        }
        Err(err) => Err(err.into()),
    }
}

/// Delete a product and its stock.
#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    match ProductRepository::new(state.pool()).delete(id).await {
        Ok(()) => redirect_with_flash(&session, ADMIN_PATH, format!("Product {id} deleted")).await,
        Err(RepositoryError::Conflict(message)) => {
            redirect_with_flash(&session, ADMIN_PATH, capitalize(&message)).await
        }
        Err(err) => Err(err.into()),
    }
}

/// Change an order's status.
#[instrument(skip(state, session, admin, form), fields(user_id = %admin.id, status = %form.status))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let id = OrderId::new(id);
    let status: OrderStatus = form.status.parse().map_err(AppError::BadRequest)?;

    state.admin_orders().update_status(id, status).await?;
    redirect_with_flash(&session, ADMIN_PATH, format!("Order {id} marked {status}")).await
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: " Box Tee ".to_owned(),
            slug: "box-tee".to_owned(),
            price: "89,90".to_owned(),
            active: Some("on".to_owned()),
            stock_p: "3".to_owned(),
            stock_m: "abc".to_owned(),
            stock_g: String::new(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_parse_stock_treats_non_digits_as_zero() {
        assert_eq!(parse_stock(" 12 "), 12);
        assert_eq!(parse_stock("-3"), 0);
        assert_eq!(parse_stock("1.5"), 0);
        assert_eq!(parse_stock(""), 0);
        assert_eq!(parse_stock("99999999999"), 0);
    }

    #[test]
    fn test_draft_from_form() {
        let draft = form().draft().unwrap();
        assert_eq!(draft.name, "Box Tee");
        assert_eq!(draft.price, Money::from_cents(8990));
        assert!(draft.active);
        assert_eq!(draft.description, None);
        assert_eq!(draft.image, None);
    }

    #[test]
    fn test_stock_in_size_order() {
        let stock = form().stock();
        let pairs: Vec<_> = stock.iter().map(|s| (s.size.as_str(), s.quantity)).collect();
        assert_eq!(pairs, [("P", 3), ("M", 0), ("G", 0)]);
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let mut bad = form();
        bad.price = "free".to_owned();
        assert!(bad.draft().unwrap_err().starts_with("Invalid price"));

        let mut bad = form();
        bad.price = "-1".to_owned();
        assert!(bad.changes().is_err());

        let mut bad = form();
        bad.slug = "  ".to_owned();
        assert_eq!(bad.draft().unwrap_err(), "Slug is required");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("slug already exists"), "Slug already exists");
        assert_eq!(capitalize(""), "");
    }
}
