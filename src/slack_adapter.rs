use crate::config::SlackConfig;
use crate::types::{IncomingMessage, OutgoingMessage};
use anyhow::{Context, Result};
use slack_morphism::prelude::*;
use slack_morphism::prelude::SlackClientHyperHttpsConnector;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Clone)]
struct SlackBridge {
    tx: mpsc::UnboundedSender<IncomingMessage>,
}

pub struct SlackAdapter {
    client: Arc<SlackClient<SlackClientHyperHttpsConnector>>,
    bot_token: SlackApiToken,
    rx: mpsc::UnboundedReceiver<IncomingMessage>,
}

impl SlackAdapter {
    pub async fn connect(cfg: &SlackConfig) -> Result<Self> {
        info!("slack: connecting (socket mode)");
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = SlackClientHyperHttpsConnector::new()
            .context("failed to create slack hyper connector")?;
        let client: Arc<SlackClient<SlackClientHyperHttpsConnector>> =
            Arc::new(SlackClient::new(connector));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(cfg.bot_token.clone()));
        let app_token = SlackApiToken::new(SlackApiTokenValue(cfg.app_token.clone()));

        let env = Arc::new(
            SlackClientEventsListenerEnvironment::new(client.clone())
                .with_user_state(SlackBridge { tx }),
        );

        let callbacks = SlackSocketModeListenerCallbacks::new()
            .with_push_events(push_events_callback::<SlackClientHyperHttpsConnector>);

        let socket_mode_config = SlackClientSocketModeConfig::new();
        let socket_mode_listener =
            SlackClientSocketModeListener::new(&socket_mode_config, env, callbacks);

        socket_mode_listener
            .listen_for(&app_token)
            .await
            .context("failed to register socket mode listener")?;
        info!("slack: socket mode listener registered");

        tokio::spawn(async move {
            debug!("slack: socket mode listener starting");
            socket_mode_listener.start().await;
            warn!("slack: socket mode listener stopped");
        });

        Ok(SlackAdapter {
            client,
            bot_token,
            rx,
        })
    }

    pub fn incoming(&mut self) -> &mut mpsc::UnboundedReceiver<IncomingMessage> {
        &mut self.rx
    }

    pub async fn send(&self, message: &OutgoingMessage) -> Result<()> {
        debug!(
            channel = %message.conversation_id,
            thread = message.thread_id.as_deref().unwrap_or("-"),
            "slack: sending reply"
        );
        let session = self.client.open_session(&self.bot_token);
        let mut req = SlackApiChatPostMessageRequest {
            channel: SlackChannelId(message.conversation_id.clone()),
            content: SlackMessageContent {
                text: Some(message.text.clone()),
                blocks: None,
                attachments: None,
                upload: None,
                files: None,
                reactions: None,
                metadata: None,
                markdown_text: None,
            },
            as_user: None,
            icon_emoji: None,
            icon_url: None,
            link_names: None,
            parse: None,
            thread_ts: None,
            username: None,
            reply_broadcast: None,
            unfurl_links: None,
            unfurl_media: None,
        };

        if let Some(thread_id) = &message.thread_id {
            req.thread_ts = Some(SlackTs(thread_id.clone()));
        }

        session
            .chat_post_message(&req)
            .await
            .context("failed to post slack message")?;
        Ok(())
    }
}

async fn push_events_callback<SCHC>(
    event: SlackPushEventCallback,
    _client: Arc<SlackClient<SCHC>>,
    state: SlackClientEventsUserState,
) -> UserCallbackResult<()>
where
    SCHC: SlackClientHttpConnector + Send + Sync + 'static,
{
    let bridge = {
        let guard = state.read().await;
        guard
            .get_user_state::<SlackBridge>()
            .cloned()
            .ok_or_else(|| "missing slack bridge")?
    };

    if let SlackEventCallbackBody::AppMention(app_mention) = event.event {
        let text = app_mention.content.text.unwrap_or_default();
        let channel = app_mention
            .origin
            .channel
            .map(|c| c.to_string())
            .unwrap_or_default();
        let user_id = app_mention.user.to_string();
        let thread_id = app_mention.origin.thread_ts.map(|ts| ts.to_string());

        if channel.is_empty() || user_id.is_empty() {
            warn!(
                channel = %channel,
                text_len = text.len(),
                "slack: app_mention ignored (missing channel or user)"
            );
            return Ok(());
        }

        debug!(
            channel = %channel,
            user = %user_id,
            thread = thread_id.as_deref().unwrap_or("-"),
            "slack: app_mention -> incoming"
        );
        let _ = bridge.tx.send(IncomingMessage {
            text,
            conversation_id: channel,
            thread_id,
            user_id,
        });
    }

    Ok(())
}
