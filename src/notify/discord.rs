use chrono::Utc;
use serde::Serialize;

const ALERT_COLOR: u32 = 15158332; // Red

// Discord embed limits, in characters
const MAX_TITLE: usize = 256;
const MAX_DESCRIPTION: usize = 4096;

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

impl Embed {
    /// Embed carrying an alert text, the first line becomes the title
    pub fn alert(message: &str) -> Self {
        let title = message
            .lines()
            .next()
            .map(|line| truncate(line, MAX_TITLE));

        Embed {
            title,
            description: Some(truncate(message, MAX_DESCRIPTION)),
            color: Some(ALERT_COLOR),
            footer: Some(EmbedFooter {
                text: String::from("market-sentinel"),
            }),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}
