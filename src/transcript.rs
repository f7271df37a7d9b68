use crate::types::{ChatMessage, Role};

/// Ordered, append-only log of the messages exchanged in one session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::User, text));
    }

    pub fn push_bot(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::Bot, text));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages appended after the first `seen` entries.
    pub fn since(&self, seen: usize) -> &[ChatMessage] {
        self.messages.get(seen..).unwrap_or(&[])
    }

    pub fn last_bot_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|msg| msg.role == Role::Bot)
            .map(|msg| msg.text.as_str())
    }
}

pub fn format_messages(messages: &[ChatMessage]) -> Option<String> {
    if messages.is_empty() {
        return None;
    }

    let mut out = String::new();
    for msg in messages {
        match msg.role {
            Role::User => out.push_str("You: "),
            Role::Bot => out.push_str("Bot: "),
        }
        out.push_str(&msg.text);
        out.push('\n');
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_returns_only_new_messages() {
        let mut transcript = Transcript::new();
        transcript.push_bot("hello");
        let seen = transcript.len();
        transcript.push_user("hi");
        transcript.push_bot("how can I help?");

        let fresh = transcript.since(seen);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh[0].role, Role::User);
        assert!(transcript.since(10).is_empty());
    }

    #[test]
    fn last_bot_text_skips_user_messages() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.last_bot_text(), None);
        transcript.push_bot("first");
        transcript.push_user("question");
        assert_eq!(transcript.last_bot_text(), Some("first"));
    }

    #[test]
    fn format_prefixes_roles() {
        let mut transcript = Transcript::new();
        transcript.push_user("track my order");
        transcript.push_bot("Your order #3 is currently shipped");
        let out = format_messages(transcript.messages()).unwrap();
        assert_eq!(out, "You: track my order\nBot: Your order #3 is currently shipped\n");
        assert!(format_messages(&[]).is_none());
    }
}
