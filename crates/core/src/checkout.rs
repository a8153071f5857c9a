//! Checkout session state and order assembly.
//!
//! [`CheckoutSession`] is the whole of what checkout keeps between requests:
//! the cart, the shipping fee once calculated, and the idempotency token of
//! the order being placed. Handlers load it from the session store, pass it
//! by value through the checkout service, and write back what comes out.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::Cart;
use crate::{Email, EmailError, Money, PaymentMethod, ProductId, RegionCode, Size, shipping_fee};

/// Idempotency key attached to one checkout attempt.
///
/// Generated on the first `finish_order` submission and reused by every
/// retry until the order commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderToken(Uuid);

impl OrderToken {
    /// Generate a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for OrderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Subtotal, shipping and grand total of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub shipping: Money,
    /// `round(subtotal + shipping, 2)`.
    pub total: Money,
}

impl Totals {
    #[must_use]
    pub fn new(subtotal: Money, shipping: Money) -> Self {
        Self {
            subtotal,
            shipping,
            total: (subtotal + shipping).round_cents(),
        }
    }
}

/// Per-session checkout state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub cart: Cart,
    pub shipping: Option<Money>,
    pub order_token: Option<OrderToken>,
}

impl CheckoutSession {
    /// The shipping fee if one has been calculated and is positive.
    #[must_use]
    pub fn shipping_fee(&self) -> Option<Money> {
        self.shipping.filter(Money::is_positive)
    }

    /// Payment can be chosen once shipping is known.
    #[must_use]
    pub fn payment_selectable(&self) -> bool {
        self.shipping_fee().is_some()
    }

    /// Totals at the cart's current prices; shipping counts as zero until
    /// calculated.
    #[must_use]
    pub fn totals(&self) -> Totals {
        Totals::new(
            self.cart.subtotal(),
            self.shipping_fee().unwrap_or(Money::ZERO),
        )
    }

    /// Store the fee for `region` and return it.
    pub fn apply_shipping(&mut self, region: &RegionCode) -> Money {
        let fee = shipping_fee(region);
        self.shipping = Some(fee);
        fee
    }

    /// The current order token, generating one on first use.
    pub fn token_or_generate(&mut self) -> OrderToken {
        *self.order_token.get_or_insert_with(OrderToken::generate)
    }

    /// Reset after an order is placed: empty cart, no shipping, no token.
    pub fn complete(&mut self) {
        self.cart.clear();
        self.shipping = None;
        self.order_token = None;
    }
}

/// The two explicit checkout actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutAction {
    CalcShipping,
    FinishOrder,
}

impl std::str::FromStr for CheckoutAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "calc_shipping" => Ok(Self::CalcShipping),
            "finish_order" => Ok(Self::FinishOrder),
            other => Err(ValidationError::UnknownAction(other.to_owned())),
        }
    }
}

/// Problems with checkout input that the customer can fix.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Inform your state to calculate shipping.")]
    MissingRegion,
    #[error("Calculate shipping before choosing a payment method.")]
    ShippingNotCalculated,
    #[error("Shipping was calculated for another state. Calculate it again for {0}.")]
    ShippingRegionChanged(RegionCode),
    #[error("Fill in every field and choose a payment method (missing: {}).", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Invalid email address: {0}")]
    InvalidEmail(#[from] EmailError),
    #[error("Unknown payment method: {0}")]
    InvalidPaymentMethod(String),
    #[error("Your cart is empty.")]
    EmptyCart,
    #[error("Unknown checkout action: {0}")]
    UnknownAction(String),
}

/// Raw checkout form fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    pub action: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub address_line: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_zip: Option<String>,
    pub payment_method: Option<String>,
}

/// Validated customer, address and payment details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: Email,
    pub address_line: String,
    pub city: String,
    pub region: RegionCode,
    pub zip: String,
    pub payment_method: PaymentMethod,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl CheckoutForm {
    /// The requested action.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownAction`] for a missing or
    /// unrecognized `action` field.
    pub fn action(&self) -> Result<CheckoutAction, ValidationError> {
        present(self.action.as_ref())
            .ok_or_else(|| ValidationError::UnknownAction(String::new()))?
            .parse()
    }

    /// The destination region.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingRegion`] if blank.
    pub fn region(&self) -> Result<RegionCode, ValidationError> {
        present(self.address_state.as_ref())
            .and_then(|code| RegionCode::parse(code).ok())
            .ok_or(ValidationError::MissingRegion)
    }

    /// Validate every customer, address and payment field.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFields`] naming every blank field,
    /// or an email/payment-method error for malformed values.
    pub fn customer_details(&self) -> Result<CustomerDetails, ValidationError> {
        let fields = [
            ("customer_name", present(self.customer_name.as_ref())),
            ("customer_email", present(self.customer_email.as_ref())),
            ("address_line", present(self.address_line.as_ref())),
            ("address_city", present(self.address_city.as_ref())),
            ("address_state", present(self.address_state.as_ref())),
            ("address_zip", present(self.address_zip.as_ref())),
            ("payment_method", present(self.payment_method.as_ref())),
        ];

        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let [name, email, line, city, state, zip, payment] = fields.map(|(_, v)| v.unwrap_or(""));

        Ok(CustomerDetails {
            name: name.to_owned(),
            email: Email::parse(email)?,
            address_line: line.to_owned(),
            city: city.to_owned(),
            region: RegionCode::parse(state).map_err(|_| ValidationError::MissingRegion)?,
            zip: zip.to_owned(),
            payment_method: payment
                .parse()
                .map_err(|_| ValidationError::InvalidPaymentMethod(payment.to_owned()))?,
        })
    }
}

/// One line of an order about to be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    /// Product name, kept for stock-conflict messages.
    pub name: String,
    pub size: Size,
    pub quantity: u32,
    /// Price at purchase time.
    pub unit_price: Money,
}

impl NewOrderLine {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Everything the order store needs to commit an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub token: OrderToken,
    pub customer: CustomerDetails,
    pub lines: Vec<NewOrderLine>,
    pub totals: Totals,
}

impl NewOrder {
    /// Assemble an order from a reconciled session.
    ///
    /// The subtotal is the sum of the order lines, so it always matches
    /// what gets written as order lines.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyCart`] or
    /// [`ValidationError::ShippingNotCalculated`] when the session is not
    /// ready to be placed, and [`ValidationError::ShippingRegionChanged`]
    /// when the delivery state would be charged a different fee.
    pub fn from_session(
        session: &CheckoutSession,
        customer: CustomerDetails,
        token: OrderToken,
    ) -> Result<Self, ValidationError> {
        let shipping = session
            .shipping_fee()
            .ok_or(ValidationError::ShippingNotCalculated)?;
        if shipping_fee(&customer.region) != shipping {
            return Err(ValidationError::ShippingRegionChanged(customer.region));
        }
        if session.cart.is_empty() {
            return Err(ValidationError::EmptyCart);
        }

        let lines: Vec<NewOrderLine> = session
            .cart
            .lines()
            .iter()
            .map(|line| NewOrderLine {
                product_id: line.product_id,
                name: line.name.clone(),
                size: line.size.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();
        let subtotal = lines.iter().map(NewOrderLine::line_total).sum();

        Ok(Self {
            token,
            customer,
            lines,
            totals: Totals::new(subtotal, shipping),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::CartLine;

    fn filled_form() -> CheckoutForm {
        CheckoutForm {
            action: Some("finish_order".to_owned()),
            customer_name: Some("Ana Souza".to_owned()),
            customer_email: Some("Ana@Example.com".to_owned()),
            address_line: Some("Rua Augusta, 100".to_owned()),
            address_city: Some("São Paulo".to_owned()),
            address_state: Some(" sp".to_owned()),
            address_zip: Some("01304-000".to_owned()),
            payment_method: Some("pix".to_owned()),
        }
    }

    fn session_with_cart() -> CheckoutSession {
        CheckoutSession {
            cart: Cart::from_lines(vec![CartLine {
                product_id: ProductId::new(7),
                name: "Box Tee".to_owned(),
                unit_price: Money::from_cents(8990),
                image: None,
                size: Size::parse("M").unwrap(),
                quantity: 2,
            }]),
            shipping: None,
            order_token: None,
        }
    }

    #[test]
    fn test_totals_round_to_cents() {
        let totals = Totals::new(
            Money::new(rust_decimal::Decimal::new(100_005, 4)),
            Money::from_cents(1500),
        );
        assert_eq!(totals.total, Money::from_cents(2500));
    }

    #[test]
    fn test_apply_shipping_enables_payment() {
        let mut session = session_with_cart();
        assert!(!session.payment_selectable());

        let fee = session.apply_shipping(&RegionCode::parse("RJ").unwrap());

        assert_eq!(fee, Money::from_cents(2900));
        assert!(session.payment_selectable());
        assert_eq!(session.totals().total, Money::from_cents(20880));
    }

    #[test]
    fn test_zero_shipping_counts_as_unset() {
        let mut session = session_with_cart();
        session.shipping = Some(Money::ZERO);
        assert_eq!(session.shipping_fee(), None);
    }

    #[test]
    fn test_token_is_stable_until_complete() {
        let mut session = session_with_cart();
        let first = session.token_or_generate();
        assert_eq!(session.token_or_generate(), first);

        session.complete();
        assert!(session.cart.is_empty());
        assert_eq!(session.shipping, None);
        assert_eq!(session.order_token, None);
    }

    #[test]
    fn test_customer_details_normalizes() {
        let details = filled_form().customer_details().unwrap();
        assert_eq!(details.email.as_str(), "ana@example.com");
        assert_eq!(details.region.as_str(), "SP");
        assert_eq!(details.payment_method, PaymentMethod::Pix);
    }

    #[test]
    fn test_customer_details_lists_missing_fields() {
        let form = CheckoutForm {
            address_zip: Some("   ".to_owned()),
            payment_method: None,
            ..filled_form()
        };
        assert_eq!(
            form.customer_details(),
            Err(ValidationError::MissingFields(vec![
                "address_zip",
                "payment_method"
            ]))
        );
    }

    #[test]
    fn test_customer_details_rejects_unknown_payment() {
        let form = CheckoutForm {
            payment_method: Some("cash".to_owned()),
            ..filled_form()
        };
        assert!(matches!(
            form.customer_details(),
            Err(ValidationError::InvalidPaymentMethod(_))
        ));
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!(filled_form().action(), Ok(CheckoutAction::FinishOrder));
        let form = CheckoutForm {
            action: Some("pay_now".to_owned()),
            ..CheckoutForm::default()
        };
        assert!(form.action().is_err());
        assert!(CheckoutForm::default().action().is_err());
    }

    #[test]
    fn test_new_order_requires_shipping() {
        let session = session_with_cart();
        let details = filled_form().customer_details().unwrap();
        assert_eq!(
            NewOrder::from_session(&session, details, OrderToken::generate()),
            Err(ValidationError::ShippingNotCalculated)
        );
    }

    #[test]
    fn test_new_order_subtotal_matches_lines() {
        let mut session = session_with_cart();
        session.apply_shipping(&RegionCode::parse("BA").unwrap());
        let form = CheckoutForm {
            address_state: Some("ba".to_owned()),
            ..filled_form()
        };
        let details = form.customer_details().unwrap();

        let order = NewOrder::from_session(&session, details, OrderToken::generate()).unwrap();

        let lines_total: Money = order.lines.iter().map(NewOrderLine::line_total).sum();
        assert_eq!(order.totals.subtotal, lines_total);
        assert_eq!(order.totals.shipping, Money::from_cents(4500));
        assert_eq!(order.totals.total, Money::from_cents(22480));
    }

    #[test]
    fn test_session_serde_shape() {
        let mut session = session_with_cart();
        session.apply_shipping(&RegionCode::parse("SP").unwrap());
        let json = serde_json::to_value(&session).unwrap();

        assert!(json["cart"].is_array());
        assert_eq!(json["shipping"], "15.00");
        assert!(json["order_token"].is_null());
    }

    #[test]
    fn test_new_order_rejects_fee_from_another_zone() {
        let mut session = session_with_cart();
        session.apply_shipping(&RegionCode::parse("RJ").unwrap());

        let details = filled_form().customer_details().unwrap();
        assert_eq!(
            NewOrder::from_session(&session, details, OrderToken::generate()),
            Err(ValidationError::ShippingRegionChanged(
                RegionCode::parse("SP").unwrap()
            ))
        );

        let form = CheckoutForm {
            address_state: Some("MG".to_owned()),
            ..filled_form()
        };
        let details = form.customer_details().unwrap();
        let order = NewOrder::from_session(&session, details, OrderToken::generate()).unwrap();
        assert_eq!(order.totals.shipping, Money::from_cents(2900));
    }
}
