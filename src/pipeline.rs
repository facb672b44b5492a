use crate::error::FetchError;
use crate::render;
use crate::transport::with_timeout;
use crate::view::{Element, Node};
use crate::widget::Widget;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

pub const PLACEHOLDER_TEXT: &str = "…";
pub const SEND_ERROR_TEXT: &str = "Sorry, we couldn't reach the assistant. Please try again.";
pub const GENERIC_GREETING: &str = "Hi! How can we help you today?";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    chatbot_id: &'a str,
    session_id: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatInit {
    #[serde(default)]
    success: bool,
    welcome_message: Option<String>,
    #[serde(default)]
    quick_menu: Option<Vec<QuickMenuItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuickMenuItem {
    Plain(String),
    Labelled {
        label: Option<String>,
        text: Option<String>,
    },
}

impl QuickMenuItem {
    fn label(&self) -> Option<&str> {
        let raw = match self {
            QuickMenuItem::Plain(s) => Some(s.as_str()),
            QuickMenuItem::Labelled { label, text } => label.as_deref().or(text.as_deref()),
        };
        raw.map(str::trim).filter(|s| !s.is_empty())
    }
}

struct Welcome {
    message: String,
    menu: Vec<String>,
}

impl Widget {
    /// Sends `text`, or the trimmed input value when `None`. Empty input is a
    /// no-op. The user bubble and a placeholder are in the DOM before the
    /// request starts; the placeholder later receives the reply or
    /// [`SEND_ERROR_TEXT`].
    ///
    /// Overlapping sends are not serialised: each fills its own placeholder.
    pub async fn send_message(&self, text: Option<&str>) {
        let message = match text {
            Some(explicit) => explicit.trim().to_string(),
            None => self.take_input(),
        };
        if message.is_empty() {
            return;
        }

        self.append_bubble("user", &message, false);
        let Some(placeholder) = self.append_bubble("assistant", PLACEHOLDER_TEXT, true) else {
            return;
        };

        let reply = match self.post_chat(&message).await {
            Ok(reply) => reply,
            Err(err) => {
                if self.config.debug {
                    warn!(chatbot_id = %self.config.chatbot_id, %err, "chat message failed");
                } else {
                    debug!(chatbot_id = %self.config.chatbot_id, %err, "chat message failed");
                }
                SEND_ERROR_TEXT.to_string()
            }
        };
        self.fill_bubble(&placeholder, &reply);
    }

    async fn post_chat(&self, message: &str) -> Result<String, FetchError> {
        let url = self.config.chat_url()?;
        let body = serde_json::to_value(ChatRequest {
            chatbot_id: &self.config.chatbot_id,
            session_id: &self.session_id,
            message,
            company_id: self.config.company_id.as_deref(),
        })?;
        let resp = with_timeout(
            self.policy.chat_timeout,
            self.transport.post_json(&url, &body),
        )
        .await?;
        let reply: ChatReply = resp.json()?;
        reply
            .reply
            .filter(|r| !r.trim().is_empty())
            .ok_or(FetchError::Rejected("missing reply"))
    }

    /// Appends the welcome message and quick menu. Runs at most once per
    /// widget; later calls return immediately.
    pub async fn load_welcome(&self) {
        if self.welcome_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        let bubble = match self.fetch_welcome().await {
            Ok(welcome) => {
                let mut bubble = render::bubble("assistant", &welcome.message, None);
                if !welcome.menu.is_empty() {
                    let items = welcome
                        .menu
                        .iter()
                        .map(|item| Node::from(Element::new("li").text(item)));
                    bubble = bubble.child(Element::new("ol").class("cw-quick-menu").children(items));
                }
                bubble
            }
            Err(err) => {
                if self.config.debug {
                    warn!(chatbot_id = %self.config.chatbot_id, %err, "chat init failed");
                } else {
                    debug!(chatbot_id = %self.config.chatbot_id, %err, "chat init failed");
                }
                render::bubble("assistant", GENERIC_GREETING, None)
            }
        };
        self.append_node(bubble.into());
    }

    async fn fetch_welcome(&self) -> Result<Welcome, FetchError> {
        let url = self.config.chat_init_url()?;
        let resp = with_timeout(self.policy.init_timeout, self.transport.get(&url)).await?;
        let init: ChatInit = resp.json()?;
        if !init.success {
            return Err(FetchError::Rejected("success flag not set"));
        }
        let message = init
            .welcome_message
            .filter(|m| !m.trim().is_empty())
            .ok_or(FetchError::Rejected("missing welcome message"))?;
        let menu = init
            .quick_menu
            .iter()
            .flatten()
            .filter_map(QuickMenuItem::label)
            .map(str::to_string)
            .collect();
        Ok(Welcome { message, menu })
    }
}
