//! Quick-action detection over bot responses.
//!
//! Each rule looks at the raw response text on its own; the recognizer runs
//! all of them and unions whatever they emit.

use crate::types::{QuickAction, QuickActionSet};
use regex::Regex;
use std::sync::LazyLock;

static ORDER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"order #(\d+)").expect("order id pattern is valid"));

/// Known product names, matched in catalog order.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<String>,
}

impl Catalog {
    pub fn new(products: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            products: products.into_iter().map(Into::into).collect(),
        }
    }

    pub fn products(&self) -> &[String] {
        &self.products
    }
}

pub trait IntentRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, text: &str) -> Vec<QuickAction>;
}

/// Offers checkout when the bot mentions checking out or shopping on.
pub struct CheckoutOfferRule;

impl IntentRule for CheckoutOfferRule {
    fn name(&self) -> &'static str {
        "checkout_offer"
    }

    fn evaluate(&self, text: &str) -> Vec<QuickAction> {
        if text.contains("proceed to checkout") || text.contains("continue shopping") {
            vec![QuickAction::Checkout, QuickAction::ContinueShopping]
        } else {
            Vec::new()
        }
    }
}

/// Offers cancellation for an order status report, unless it is already cancelled.
pub struct OrderStatusRule;

impl OrderStatusRule {
    fn extract_order_id(text: &str) -> Option<String> {
        ORDER_ID_PATTERN
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl IntentRule for OrderStatusRule {
    fn name(&self) -> &'static str {
        "order_status"
    }

    fn evaluate(&self, text: &str) -> Vec<QuickAction> {
        if !text.contains("Your order #") || !text.contains("is currently") {
            return Vec::new();
        }
        if text.contains("cancelled") {
            return Vec::new();
        }
        vec![QuickAction::CancelOrder(Self::extract_order_id(text))]
    }
}

pub struct ProductMentionRule {
    catalog: Catalog,
}

impl ProductMentionRule {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl IntentRule for ProductMentionRule {
    fn name(&self) -> &'static str {
        "product_mention"
    }

    fn evaluate(&self, text: &str) -> Vec<QuickAction> {
        let haystack = text.to_lowercase();
        self.catalog
            .products()
            .iter()
            .filter(|product| haystack.contains(&product.to_lowercase()))
            .map(|product| QuickAction::ConfirmOrder(product.clone()))
            .collect()
    }
}

pub struct IntentRecognizer {
    rules: Vec<Box<dyn IntentRule>>,
}

impl IntentRecognizer {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_rules(vec![
            Box::new(CheckoutOfferRule),
            Box::new(OrderStatusRule),
            Box::new(ProductMentionRule::new(catalog)),
        ])
    }

    pub fn with_rules(rules: Vec<Box<dyn IntentRule>>) -> Self {
        Self { rules }
    }

    pub fn recognize(&self, text: &str) -> QuickActionSet {
        let mut set = QuickActionSet::new();
        for rule in &self.rules {
            let actions = rule.evaluate(text);
            if !actions.is_empty() {
                tracing::debug!(rule = rule.name(), count = actions.len(), "intent rule matched");
            }
            set.extend(actions);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(["idli mix", "dosa mix", "thandai", "badam milk"])
    }

    #[test]
    fn checkout_offer_emits_both_actions() {
        let actions = CheckoutOfferRule.evaluate("Would you like to proceed to checkout?");
        assert_eq!(actions, vec![QuickAction::Checkout, QuickAction::ContinueShopping]);
        assert_eq!(
            CheckoutOfferRule.evaluate("You can continue shopping"),
            vec![QuickAction::Checkout, QuickAction::ContinueShopping]
        );
    }

    #[test]
    fn checkout_offer_is_case_sensitive() {
        assert!(CheckoutOfferRule.evaluate("Proceed To Checkout").is_empty());
    }

    #[test]
    fn order_status_extracts_id() {
        let actions = OrderStatusRule.evaluate("Your order #482 is currently shipped");
        assert_eq!(actions, vec![QuickAction::CancelOrder(Some("482".into()))]);
    }

    #[test]
    fn order_status_skips_cancelled_orders() {
        assert!(OrderStatusRule
            .evaluate("Your order #482 is currently cancelled")
            .is_empty());
        assert!(OrderStatusRule
            .evaluate("Your order #482 is currently shipped. Order 9 was cancelled.")
            .is_empty());
    }

    #[test]
    fn order_status_without_digits_has_no_id() {
        let actions = OrderStatusRule.evaluate("Your order #abc is currently pending");
        assert_eq!(actions, vec![QuickAction::CancelOrder(None)]);
    }

    #[test]
    fn order_status_needs_both_markers() {
        assert!(OrderStatusRule.evaluate("Your order #5 shipped").is_empty());
        assert!(OrderStatusRule.evaluate("It is currently raining").is_empty());
    }

    #[test]
    fn product_mentions_follow_catalog_order() {
        let rule = ProductMentionRule::new(catalog());
        let actions = rule.evaluate("We have Dosa Mix and idli mix in stock");
        assert_eq!(
            actions,
            vec![
                QuickAction::ConfirmOrder("idli mix".into()),
                QuickAction::ConfirmOrder("dosa mix".into()),
            ]
        );
    }

    #[test]
    fn recognizer_unions_all_rules() {
        let recognizer = IntentRecognizer::new(catalog());
        let set = recognizer.recognize(
            "Your order #7 is currently processing (thandai x2). You can continue shopping.",
        );
        let actions: Vec<_> = set.iter().cloned().collect();
        assert_eq!(
            actions,
            vec![
                QuickAction::Checkout,
                QuickAction::ContinueShopping,
                QuickAction::CancelOrder(Some("7".into())),
                QuickAction::ConfirmOrder("thandai".into()),
            ]
        );
    }

    #[test]
    fn recognizer_returns_empty_set_for_plain_text() {
        let recognizer = IntentRecognizer::new(catalog());
        assert!(recognizer.recognize("Hello there!").is_empty());
    }
}
