use crate::order_service::{OrderService, OrderServiceError};
use crate::types::{ActionArgs, ActionToken, OrderActionRequest};
use anyhow::{anyhow, bail, Result};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid action specified.")]
    InvalidAction(String),
    #[error("{0}")]
    Service(String),
    #[error("{}", .action.fallback_message())]
    Transport {
        action: ActionToken,
        #[source]
        source: OrderServiceError,
    },
}

impl DispatchError {
    fn from_service(action: ActionToken, err: OrderServiceError) -> Self {
        match err {
            OrderServiceError::Service(message) => DispatchError::Service(message),
            source => DispatchError::Transport { action, source },
        }
    }
}

impl OrderActionRequest {
    pub fn from_args(args: &ActionArgs, user_id: &str) -> Result<Self, DispatchError> {
        let action = args
            .action
            .parse::<ActionToken>()
            .map_err(DispatchError::InvalidAction)?;
        Ok(Self {
            action,
            user_id: user_id.to_string(),
            product: args.product.clone(),
            quantity: args.quantity.clone(),
            order_id: args.order_id.clone(),
        })
    }
}

/// Translates one structured order action into exactly one reply line.
pub struct OrderActionDispatcher<S> {
    service: S,
}

impl<S: OrderService> OrderActionDispatcher<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn dispatch(&self, args: &ActionArgs, user_id: &str) -> String {
        match self.try_dispatch(args, user_id).await {
            Ok(value) => value.to_string(),
            Err(err) => {
                match &err {
                    DispatchError::InvalidAction(token) => {
                        warn!(action = %token, user = %user_id, "dispatch: invalid action")
                    }
                    DispatchError::Service(message) => {
                        info!(user = %user_id, error = %message, "dispatch: order service rejected action")
                    }
                    DispatchError::Transport { action, source } => {
                        warn!(%action, user = %user_id, error = %source, "dispatch: order service unavailable")
                    }
                }
                err.to_string()
            }
        }
    }

    pub async fn try_dispatch(&self, args: &ActionArgs, user_id: &str) -> Result<Value, DispatchError> {
        let request = OrderActionRequest::from_args(args, user_id)?;
        info!(action = %request.action, user = %request.user_id, "dispatch: forwarding to order service");

        let result = match request.action {
            ActionToken::PlaceOrder => {
                self.service
                    .place_order(
                        &request.user_id,
                        request.product.as_deref(),
                        request.quantity.as_ref(),
                    )
                    .await
            }
            ActionToken::CancelOrder => {
                self.service
                    .cancel_order(&request.user_id, request.order_id.as_ref())
                    .await
            }
            ActionToken::ViewOrders => self.service.view_orders(&request.user_id).await,
        };

        let value = result.map_err(|err| DispatchError::from_service(request.action, err))?;
        if let Some(message) = value
            .get("error")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
        {
            return Err(DispatchError::Service(message.to_string()));
        }
        Ok(value)
    }
}

/// Parses structured action args out of a chat message.
///
/// Accepts either a JSON object or `action key=value ...`, with an optional
/// leading `<@BOT>` mention. Values that parse as integers become JSON numbers.
pub fn parse_action_text(text: &str) -> Result<ActionArgs> {
    let mut rest = text.trim();
    while let Some(stripped) = rest.strip_prefix("<@") {
        let end = stripped
            .find('>')
            .ok_or_else(|| anyhow!("unterminated mention"))?;
        rest = stripped[end + 1..].trim_start();
    }

    if rest.starts_with('{') {
        let args: ActionArgs = serde_json::from_str(rest)?;
        return Ok(args);
    }

    let mut tokens = tokenize(rest)?.into_iter();
    let mut args = ActionArgs::default();
    let mut pending = tokens.next();
    if let Some(first) = pending.take() {
        if first.contains('=') {
            pending = Some(first);
        } else {
            args.action = first;
        }
    }

    for token in pending.into_iter().chain(tokens) {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got {token}"))?;
        match key {
            "action" => args.action = value.to_string(),
            "product" => args.product = Some(value.to_string()),
            "quantity" => args.quantity = Some(parse_scalar(value)),
            "orderId" | "order_id" | "order" => args.order_id = Some(parse_scalar(value)),
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in input.chars() {
        match ch {
            '"' | '\u{201c}' | '\u{201d}' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        bail!("unterminated quote");
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

pub fn parse_scalar(value: &str) -> Value {
    value
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(value))
}
