use crate::engine::Navigator;
use crate::types::QuickActionSet;
use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Message(String),
    /// Zero-based index into the offered quick actions.
    Select(usize),
    Quit,
}

pub fn parse_input(line: &str) -> Result<ReplInput> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        bail!("empty input");
    }

    if let Some(rest) = trimmed.strip_prefix('/') {
        let rest = rest.trim();
        if rest == "quit" || rest == "q" {
            return Ok(ReplInput::Quit);
        }
        let number: usize = rest
            .parse()
            .with_context(|| format!("unknown command: /{rest}"))?;
        if number == 0 {
            bail!("quick actions are numbered from 1");
        }
        return Ok(ReplInput::Select(number - 1));
    }

    Ok(ReplInput::Message(trimmed.to_string()))
}

pub fn render_quick_actions(actions: &QuickActionSet) -> Option<String> {
    if actions.is_empty() {
        return None;
    }
    let buttons: Vec<String> = actions
        .iter()
        .enumerate()
        .map(|(i, action)| format!("[/{}] {}", i + 1, action.label()))
        .collect();
    Some(buttons.join("  "))
}

/// Prints navigation targets instead of leaving a page.
pub struct TerminalNavigator {
    base_url: String,
}

impl TerminalNavigator {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("{}/{}", self.base_url, target.trim_start_matches('/'))
        }
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, target: &str) {
        println!("-> navigating to {}", self.resolve(target));
    }
}
