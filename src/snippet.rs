use crate::view::Element;
use serde::Deserialize;

/// Values a dashboard fills into the embed tag it shows to customers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedOptions {
    pub chatbot_id: String,
    pub widget_id: String,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

/// Renders the `<script>` tag to paste into a site. All values are
/// attribute-escaped.
pub fn embed_snippet(script_url: &str, opts: &EmbedOptions) -> String {
    let mut tag = Element::new("script")
        .attr("src", script_url)
        .attr("data-chatbot-id", opts.chatbot_id.as_str())
        .attr("data-widget-id", opts.widget_id.as_str());
    if let Some(company) = opts.company_id.as_deref().filter(|c| !c.is_empty()) {
        tag = tag.attr("data-company-id", company);
    }
    if let Some(api_base) = opts.api_base.as_deref().filter(|a| !a.is_empty()) {
        tag = tag.attr("data-api-base", api_base);
    }
    if opts.debug {
        tag = tag.attr("data-debug", "1");
    }
    tag.flag("async", true).to_html()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HostPage;
    use crate::resolver::resolve;
    use crate::session::MemoryStore;
    use std::sync::Arc;
    use url::Url;

    #[test]
    fn snippet_escapes_and_resolves_back() {
        let opts = EmbedOptions {
            chatbot_id: "cb\"1".into(),
            widget_id: "w1".into(),
            company_id: Some("co1".into()),
            api_base: None,
            debug: true,
        };
        let html = embed_snippet("https://cdn.test/chat-widget.js", &opts);
        assert_eq!(
            html,
            "<script src=\"https://cdn.test/chat-widget.js\" data-chatbot-id=\"cb&quot;1\" \
data-widget-id=\"w1\" data-company-id=\"co1\" data-debug=\"1\" async></script>"
        );

        let page = HostPage::from_html(
            Url::parse("https://shop.test/").unwrap(),
            &format!("<html><body>{html}</body></html>"),
            Arc::new(MemoryStore::new()),
        );
        let cfg = resolve(&page).unwrap();
        assert_eq!(cfg.chatbot_id, "cb\"1");
        assert_eq!(cfg.company_id.as_deref(), Some("co1"));
        assert!(cfg.debug);
    }
}
