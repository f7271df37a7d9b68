use crate::dispatcher::{parse_action_text, DispatchError, OrderActionDispatcher};
use crate::order_service::OrderService;
use crate::slack_adapter::SlackAdapter;
use crate::types::{IncomingMessage, OutgoingMessage};
use anyhow::Result;
use tracing::{error, info, warn};

pub struct Coordinator<S> {
    slack: SlackAdapter,
    dispatcher: OrderActionDispatcher<S>,
}

impl<S: OrderService> Coordinator<S> {
    pub fn new(slack: SlackAdapter, dispatcher: OrderActionDispatcher<S>) -> Self {
        Self { slack, dispatcher }
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                maybe_msg = self.slack.incoming().recv() => {
                    let msg = match maybe_msg {
                        Some(m) => m,
                        None => break,
                    };
                    if let Err(err) = self.handle_incoming(msg).await {
                        error!("incoming error: {err:#}");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutting down on ctrl-c");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn handle_incoming(&self, msg: IncomingMessage) -> Result<()> {
        let outgoing = answer(&self.dispatcher, &msg).await;
        self.slack.send(&outgoing).await
    }
}

/// Produces the single reply for one structured action event.
pub async fn answer<S: OrderService>(
    dispatcher: &OrderActionDispatcher<S>,
    msg: &IncomingMessage,
) -> OutgoingMessage {
    let text = match parse_action_text(&msg.text) {
        Ok(args) => dispatcher.dispatch(&args, &msg.user_id).await,
        Err(err) => {
            warn!(user = %msg.user_id, "unparseable action: {err:#}");
            DispatchError::InvalidAction(msg.text.clone()).to_string()
        }
    };

    OutgoingMessage {
        text,
        conversation_id: msg.conversation_id.clone(),
        thread_id: msg.thread_id.clone(),
    }
}
