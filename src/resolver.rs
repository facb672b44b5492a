use crate::error::BootError;
use crate::page::{HostPage, ScriptTag};
use tracing::error;
use url::Url;

/// File name the runtime is served under; used to find our own tag when the
/// current script is unknown.
pub const SCRIPT_FILENAME: &str = "chat-widget.js";
pub const DEFAULT_LOCAL_API_BASE: &str = "http://localhost:4000/api";
pub const DEFAULT_PRODUCTION_API_BASE: &str = "https://api.chatwidget.app/api";

/// Tenant identity and endpoints, resolved once at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub chatbot_id: String,
    pub widget_id: String,
    pub company_id: Option<String>,
    pub api_base: Url,
    pub debug: bool,
}

impl WidgetConfig {
    /// Id of the host element the widget renders into.
    pub fn host_id(&self) -> String {
        format!("chat-widget-host-{}", self.widget_id)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, url::ParseError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        url.set_query(None);
        Ok(url)
    }

    pub fn settings_url(&self) -> Result<Url, url::ParseError> {
        let mut url = self.endpoint(&["chat-widget", "appearance", "get", &self.widget_id])?;
        if let Some(company) = &self.company_id {
            url.query_pairs_mut().append_pair("companyId", company);
        }
        Ok(url)
    }

    pub fn chat_init_url(&self) -> Result<Url, url::ParseError> {
        let mut url = self.endpoint(&["chatbot", "chat_init"])?;
        url.query_pairs_mut().append_pair("chatbotId", &self.chatbot_id);
        Ok(url)
    }

    pub fn chat_url(&self) -> Result<Url, url::ParseError> {
        self.endpoint(&["chatbot", "chat"])
    }
}

/// Picks the embedding tag: the current script when known, else the last tag
/// whose `src` mentions [`SCRIPT_FILENAME`].
pub fn locate_script(page: &HostPage) -> Option<&ScriptTag> {
    page.current_script().or_else(|| {
        page.scripts()
            .iter()
            .rev()
            .find(|s| s.src.as_deref().is_some_and(|src| src.contains(SCRIPT_FILENAME)))
    })
}

struct Lookup<'a> {
    tag: &'a ScriptTag,
    src: Option<Url>,
}

impl Lookup<'_> {
    /// `data-*` attribute first, then the camelCase query param on `src`.
    fn value(&self, attr: &str, param: &str) -> Option<String> {
        let from_attr = self
            .tag
            .attrs
            .get(attr)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        from_attr.or_else(|| {
            self.src.as_ref().and_then(|src| {
                src.query_pairs()
                    .find(|(k, _)| k == param)
                    .map(|(_, v)| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
        })
    }
}

pub fn resolve(page: &HostPage) -> Result<WidgetConfig, BootError> {
    let result = resolve_inner(page);
    if let Err(err) = &result {
        error!(%err, page = %page.url(), "chat widget not started");
    }
    result
}

fn resolve_inner(page: &HostPage) -> Result<WidgetConfig, BootError> {
    let tag = locate_script(page).ok_or(BootError::ScriptNotFound)?;
    let src = tag.src.as_deref().and_then(|s| page.url().join(s).ok());
    let lookup = Lookup { tag, src };

    let chatbot_id = lookup
        .value("data-chatbot-id", "chatbotId")
        .ok_or(BootError::ConfigMissing("chatbotId"))?;
    let widget_id = lookup
        .value("data-widget-id", "widgetId")
        .ok_or(BootError::ConfigMissing("widgetId"))?;
    let company_id = lookup.value("data-company-id", "companyId");
    let debug = lookup
        .value("data-debug", "debug")
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    let api_base = match lookup.value("data-api-base", "apiBase") {
        Some(explicit) => parse_api_base(&explicit)?,
        None => {
            let local = lookup
                .src
                .as_ref()
                .and_then(|u| u.host_str())
                .is_some_and(|h| h.contains("localhost"));
            let fallback = if local {
                DEFAULT_LOCAL_API_BASE
            } else {
                DEFAULT_PRODUCTION_API_BASE
            };
            parse_api_base(fallback)?
        }
    };

    Ok(WidgetConfig {
        chatbot_id,
        widget_id,
        company_id,
        api_base,
        debug,
    })
}

fn parse_api_base(raw: &str) -> Result<Url, BootError> {
    Url::parse(raw.trim_end_matches('/')).map_err(|source| BootError::InvalidApiBase {
        value: raw.to_string(),
        source,
    })
}
