//! Feishu message documents.
//!
//! Two wire shapes are supported:
//! - `post`: rich text, a list of rows where each row is a list of inline elements.
//! - `interactive` (card): a header plus one flat, ordered list of elements.
//!
//! Everything here is pure; uploads and lookups happen before a [`MessageContent`] is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use suzu_core::alert::entity::BatchStatus;
use suzu_core::config::MessageFormat;
use suzu_core::notify::error::NotifyError;

/// Locale key of the post body.
pub const POST_LOCALE: &str = "zh_cn";
/// Label of the link back to the alert list.
pub const ALERT_LIST_TEXT: &str = "Alerting list";
/// Most images one `img_combination` element accepts; larger sets are split.
pub const CARD_IMAGES_PER_BLOCK: usize = 9;

/// Everything a message is assembled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent {
    pub title: String,
    pub text: String,
    /// Uploaded image handles, in upload order.
    pub image_keys: Vec<String>,
    /// Deep link to the alert list.
    pub link: Option<String>,
    /// Resolved user IDs, or `["all"]`.
    pub mentions: Vec<String>,
    pub status: BatchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum PostElement {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "img")]
    Image { image_key: String },
    #[serde(rename = "a")]
    Link { text: String, href: String },
    #[serde(rename = "at")]
    At { user_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMessage {
    pub msg_type: String,
    pub content: PostContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostContent {
    pub post: BTreeMap<String, PostBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostBody {
    pub title: String,
    pub content: Vec<Vec<PostElement>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMessage {
    pub msg_type: String,
    pub card: Card,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub header: CardHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_link: Option<CardLink>,
    pub elements: Vec<CardElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardHeader {
    pub title: PlainText,
    /// Header color template, e.g. `red`.
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<CardIcon>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainText {
    pub tag: String,
    pub content: String,
}

impl PlainText {
    fn new(content: impl Into<String>) -> Self {
        Self {
            tag: "plain_text".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardIcon {
    pub tag: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLink {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub img_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub tag: String,
    pub text: PlainText,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum CardElement {
    #[serde(rename = "markdown")]
    Markdown { content: String },
    #[serde(rename = "img")]
    Image { img_key: String, alt: PlainText },
    #[serde(rename = "img_combination")]
    ImageCombination {
        combination_mode: String,
        img_list: Vec<ImageRef>,
    },
    #[serde(rename = "action")]
    Action { actions: Vec<Button> },
    #[serde(rename = "hr")]
    Divider,
}

/// A message ready to be serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Post(PostMessage),
    Card(CardMessage),
}

impl Payload {
    /// Builds the document for the configured format.
    pub fn build(format: MessageFormat, content: &MessageContent) -> Self {
        match format {
            MessageFormat::Post => Self::post(content),
            MessageFormat::Card => Self::card(content),
        }
    }

    /// # Summary
    /// Builds a `post` message.
    ///
    /// # Logic
    /// Rows, each only when non-empty: text, all images, alert-list link, all mentions.
    pub fn post(content: &MessageContent) -> Self {
        let mut rows = Vec::new();

        if !content.text.is_empty() {
            rows.push(vec![PostElement::Text {
                text: content.text.clone(),
            }]);
        }
        if !content.image_keys.is_empty() {
            rows.push(
                content
                    .image_keys
                    .iter()
                    .map(|key| PostElement::Image {
                        image_key: key.clone(),
                    })
                    .collect(),
            );
        }
        if let Some(link) = &content.link {
            rows.push(vec![PostElement::Link {
                text: ALERT_LIST_TEXT.to_string(),
                href: link.clone(),
            }]);
        }
        if !content.mentions.is_empty() {
            rows.push(
                content
                    .mentions
                    .iter()
                    .map(|id| PostElement::At {
                        user_id: id.clone(),
                    })
                    .collect(),
            );
        }

        let mut post = BTreeMap::new();
        post.insert(
            POST_LOCALE.to_string(),
            PostBody {
                title: content.title.clone(),
                content: rows,
            },
        );

        Payload::Post(PostMessage {
            msg_type: MessageFormat::Post.msg_type().to_string(),
            content: PostContent { post },
        })
    }

    /// # Summary
    /// Builds an interactive card message.
    ///
    /// # Logic
    /// Elements in order: markdown text, image blocks of at most
    /// `CARD_IMAGES_PER_BLOCK` images, alert-list button,
    /// divider (only between prior content and mentions), mention markdown.
    /// Header color and icon follow the batch status.
    pub fn card(content: &MessageContent) -> Self {
        let mut elements = Vec::new();

        if !content.text.is_empty() {
            elements.push(CardElement::Markdown {
                content: content.text.clone(),
            });
        }
        for chunk in content.image_keys.chunks(CARD_IMAGES_PER_BLOCK) {
            elements.push(image_block(chunk));
        }
        if let Some(link) = &content.link {
            elements.push(CardElement::Action {
                actions: vec![Button {
                    tag: "button".to_string(),
                    text: PlainText::new(ALERT_LIST_TEXT),
                    kind: "primary".to_string(),
                    url: link.clone(),
                }],
            });
        }
        if !content.mentions.is_empty() {
            if !elements.is_empty() {
                elements.push(CardElement::Divider);
            }
            let mentions: Vec<String> = content
                .mentions
                .iter()
                .map(|id| format!("<at id={id}></at>"))
                .collect();
            elements.push(CardElement::Markdown {
                content: mentions.join(" "),
            });
        }

        let (template, icon) = header_style(content.status);
        Payload::Card(CardMessage {
            msg_type: MessageFormat::Card.msg_type().to_string(),
            card: Card {
                header: CardHeader {
                    title: PlainText::new(content.title.clone()),
                    template: template.to_string(),
                    icon: Some(CardIcon {
                        tag: "standard_icon".to_string(),
                        token: icon.to_string(),
                    }),
                },
                card_link: content.link.clone().map(|url| CardLink { url }),
                elements,
            },
        })
    }

    /// Serializes the document; the only fatal failure of payload building.
    pub fn to_json(&self) -> Result<String, NotifyError> {
        serde_json::to_string(self).map_err(|e| NotifyError::EncodingFailed(e.to_string()))
    }
}

// 单张用 img，两张用 bisect，三张及以上用 trisect
fn image_block(keys: &[String]) -> CardElement {
    match keys {
        [single] => CardElement::Image {
            img_key: single.clone(),
            alt: PlainText::new(""),
        },
        many => CardElement::ImageCombination {
            combination_mode: if many.len() == 2 { "bisect" } else { "trisect" }.to_string(),
            img_list: many
                .iter()
                .map(|key| ImageRef {
                    img_key: key.clone(),
                })
                .collect(),
        },
    }
}

// (header template, icon token)
fn header_style(status: BatchStatus) -> (&'static str, &'static str) {
    match status {
        BatchStatus::Resolved => ("green", "resolve_outlined"),
        BatchStatus::Firing | BatchStatus::Mixed => ("red", "warning_outlined"),
    }
}
