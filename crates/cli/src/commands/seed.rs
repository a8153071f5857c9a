//! Demo catalog.
//!
//! A handful of tees and hoodies with stock in the standard sizes, enough to
//! click through the shop, cart and checkout locally.

use sqlx::PgPool;

use streetlab_core::{Money, Size};
use streetlab_storefront::db::products::{ProductDraft, StockInput};
use streetlab_storefront::db::{ProductRepository, RepositoryError};

use super::CommandError;

struct DemoProduct {
    slug: &'static str,
    name: &'static str,
    cents: i64,
    category: &'static str,
    description: &'static str,
    /// Units for P, M and G.
    stock: [u32; 3],
}

const DEMO_CATALOG: &[DemoProduct] = &[
    DemoProduct {
        slug: "box-tee-preta",
        name: "Box Tee Preta",
        cents: 8990,
        category: "camisetas",
        description: "Heavyweight cotton tee with a boxy cut.",
        stock: [5, 8, 4],
    },
    DemoProduct {
        slug: "box-tee-off-white",
        name: "Box Tee Off-White",
        cents: 8990,
        category: "camisetas",
        description: "Heavyweight cotton tee with a boxy cut.",
        stock: [3, 6, 0],
    },
    DemoProduct {
        slug: "moletom-logo",
        name: "Moletom Logo",
        cents: 21990,
        category: "moletons",
        description: "Brushed fleece hoodie with embroidered logo.",
        stock: [2, 4, 3],
    },
    DemoProduct {
        slug: "bone-dad-hat",
        name: "Boné Dad Hat",
        cents: 7990,
        category: "acessorios",
        description: "Six-panel washed cotton cap.",
        stock: [0, 10, 0],
    },
    DemoProduct {
        slug: "cargo-ripstop",
        name: "Calça Cargo Ripstop",
        cents: 27990,
        category: "calcas",
        description: "Ripstop cargo pants with adjustable hem.",
        stock: [1, 1, 1],
    },
];

fn stock_for(product: &DemoProduct) -> Vec<StockInput> {
    Size::standard()
        .into_iter()
        .zip(product.stock)
        .map(|(size, quantity)| StockInput { size, quantity })
        .collect()
}

/// Insert the demo products that do not exist yet.
pub async fn demo_catalog(pool: &PgPool) -> Result<(), CommandError> {
    let products = ProductRepository::new(pool);
    let mut inserted = 0_usize;

    for demo in DEMO_CATALOG {
        let draft = ProductDraft {
            slug: demo.slug.to_owned(),
            name: demo.name.to_owned(),
            price: Money::from_cents(demo.cents),
            description: Some(demo.description.to_owned()),
            category: Some(demo.category.to_owned()),
            image: Some(format!("{}.jpg", demo.slug)),
            active: true,
        };

        match products.create(&draft, &stock_for(demo)).await {
            Ok(id) => {
                inserted += 1;
                tracing::info!(product_id = %id, slug = demo.slug, "Seeded product");
            }
            Err(RepositoryError::Conflict(_)) => {
                tracing::info!(slug = demo.slug, "Already present, skipped");
            }
            Err(err) => return Err(err.into()),
        }
    }

    tracing::info!(inserted, total = DEMO_CATALOG.len(), "Seeding complete");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_slugs_unique() {
        let mut slugs: Vec<_> = DEMO_CATALOG.iter().map(|p| p.slug).collect();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), DEMO_CATALOG.len());
    }

    #[test]
    fn test_stock_follows_size_order() {
        let stock = stock_for(&DEMO_CATALOG[0]);
        let pairs: Vec<_> = stock.iter().map(|s| (s.size.as_str(), s.quantity)).collect();
        assert_eq!(pairs, [("P", 5), ("M", 8), ("G", 4)]);
    }
}
