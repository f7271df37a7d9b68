use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A selectable next step offered after a bot response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickAction {
    Checkout,
    ContinueShopping,
    ConfirmOrder(String),
    CancelOrder(Option<String>),
}

impl QuickAction {
    pub fn label(&self) -> String {
        match self {
            QuickAction::Checkout => "Checkout".to_string(),
            QuickAction::ContinueShopping => "Continue Shopping".to_string(),
            QuickAction::ConfirmOrder(product) => format!("Confirm Order for {product}"),
            QuickAction::CancelOrder(_) => "Cancel Order".to_string(),
        }
    }

    /// Conversational input synthesized when this action is chosen, if it re-enters the chat.
    pub fn follow_up_text(&self) -> Option<String> {
        match self {
            QuickAction::Checkout | QuickAction::ContinueShopping => None,
            QuickAction::ConfirmOrder(product) => Some(format!("Confirm order for {product}")),
            QuickAction::CancelOrder(Some(order_id)) => Some(format!("Cancel order #{order_id}")),
            QuickAction::CancelOrder(None) => Some("Cancel order".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuickActionSet {
    actions: Vec<QuickAction>,
}

impl QuickActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, actions: impl IntoIterator<Item = QuickAction>) {
        for action in actions {
            if !self.actions.contains(&action) {
                self.actions.push(action);
            }
        }
    }

    pub fn contains(&self, action: &QuickAction) -> bool {
        self.actions.contains(action)
    }

    pub fn get(&self, index: usize) -> Option<&QuickAction> {
        self.actions.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuickAction> {
        self.actions.iter()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

impl FromIterator<QuickAction> for QuickActionSet {
    fn from_iter<I: IntoIterator<Item = QuickAction>>(iter: I) -> Self {
        let mut set = QuickActionSet::new();
        set.extend(iter);
        set
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionToken {
    PlaceOrder,
    CancelOrder,
    ViewOrders,
}

impl ActionToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionToken::PlaceOrder => "place_order",
            ActionToken::CancelOrder => "cancel_order",
            ActionToken::ViewOrders => "view_orders",
        }
    }

    pub fn fallback_message(&self) -> &'static str {
        match self {
            ActionToken::PlaceOrder => "An error occurred while placing the order.",
            ActionToken::CancelOrder => "An error occurred while canceling the order.",
            ActionToken::ViewOrders => "An error occurred while retrieving orders.",
        }
    }
}

impl FromStr for ActionToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "place_order" => Ok(ActionToken::PlaceOrder),
            "cancel_order" => Ok(ActionToken::CancelOrder),
            "view_orders" => Ok(ActionToken::ViewOrders),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured arguments carried by a dispatcher event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActionArgs {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default, rename = "orderId", alias = "order_id")]
    pub order_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderActionRequest {
    pub action: ActionToken,
    pub user_id: String,
    pub product: Option<String>,
    pub quantity: Option<Value>,
    pub order_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub redirect: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub text: String,
    pub conversation_id: String,
    pub thread_id: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub conversation_id: String,
    pub thread_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_up_text_for_cancel_with_and_without_id() {
        assert_eq!(
            QuickAction::CancelOrder(Some("482".into())).follow_up_text().as_deref(),
            Some("Cancel order #482")
        );
        assert_eq!(
            QuickAction::CancelOrder(None).follow_up_text().as_deref(),
            Some("Cancel order")
        );
        assert_eq!(QuickAction::ContinueShopping.follow_up_text(), None);
    }

    #[test]
    fn action_token_rejects_unknown() {
        assert_eq!("view_orders".parse::<ActionToken>(), Ok(ActionToken::ViewOrders));
        assert_eq!("bogus".parse::<ActionToken>(), Err("bogus".to_string()));
    }

    #[test]
    fn action_args_accept_camel_and_snake_order_id() {
        let args: ActionArgs =
            serde_json::from_str(r#"{"action":"cancel_order","orderId":7}"#).unwrap();
        assert_eq!(args.order_id, Some(Value::from(7)));
        let args: ActionArgs =
            serde_json::from_str(r#"{"action":"cancel_order","order_id":"7"}"#).unwrap();
        assert_eq!(args.order_id, Some(Value::from("7")));
    }
}
