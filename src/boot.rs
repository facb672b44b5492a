use crate::error::BootError;
use crate::guard;
use crate::page::HostPage;
use crate::resolver;
use crate::session;
use crate::settings::{RetryPolicy, load_widget_settings};
use crate::transport::Transport;
use crate::widget::Widget;
use std::sync::Arc;
use tracing::info;

pub enum BootOutcome {
    Mounted(Arc<Widget>),
    /// The runtime already ran on this page; nothing was touched.
    AlreadyLoaded,
}

impl BootOutcome {
    pub fn widget(&self) -> Option<&Arc<Widget>> {
        match self {
            BootOutcome::Mounted(widget) => Some(widget),
            BootOutcome::AlreadyLoaded => None,
        }
    }
}

/// Starts the widget on `page`: version guard, config, session, settings,
/// first render, mount. Safe to call any number of times per page.
pub async fn boot(
    page: &HostPage,
    transport: Arc<dyn Transport>,
    policy: &RetryPolicy,
) -> Result<BootOutcome, BootError> {
    if !guard::claim_page(page) {
        return Ok(BootOutcome::AlreadyLoaded);
    }
    let config = resolver::resolve(page)?;
    let host_id = config.host_id();
    if guard::host_already_mounted(page, &host_id) {
        return Ok(BootOutcome::AlreadyLoaded);
    }

    let session_id = session::session_id(page.storage());
    let settings = load_widget_settings(transport.as_ref(), &config, policy).await;
    info!(
        chatbot_id = %config.chatbot_id,
        widget_id = %config.widget_id,
        api_base = %config.api_base,
        "chat widget mounted"
    );
    let widget = Arc::new(Widget::new(
        config,
        session_id,
        settings,
        policy.clone(),
        transport,
    ));
    page.mount(&host_id, widget.clone());
    Ok(BootOutcome::Mounted(widget))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::ScriptTag;
    use crate::render::Screen;
    use crate::session::{KeyValueStore, MemoryStore};
    use crate::settings::AppearanceConfig;
    use crate::transport::mock::{MockTransport, Scripted};
    use serde_json::json;
    use url::Url;

    const SETTINGS: &str = "/api/chat-widget/appearance/get/w1";

    fn tag() -> ScriptTag {
        ScriptTag::with_src("https://cdn.test/chat-widget.js")
            .attr("data-chatbot-id", "cb1")
            .attr("data-widget-id", "w1")
            .attr("data-api-base", "https://api.test/api")
    }

    fn page(storage: Arc<dyn KeyValueStore>, scripts: Vec<ScriptTag>) -> HostPage {
        HostPage::new(Url::parse("https://shop.test/").unwrap(), scripts, storage)
    }

    #[tokio::test(start_paused = true)]
    async fn second_execution_is_a_no_op() {
        let transport = Arc::new(MockTransport::new());
        let page = page(Arc::new(MemoryStore::new()), vec![tag(), tag()]);
        let first = boot(&page, transport.clone(), &RetryPolicy::default()).await.unwrap();
        assert!(first.widget().is_some());
        let nodes = first.widget().unwrap().snapshot().count_elements();
        let settings_calls = transport.calls_to(SETTINGS);

        let second = boot(&page, transport.clone(), &RetryPolicy::default()).await.unwrap();
        assert!(matches!(second, BootOutcome::AlreadyLoaded));
        assert_eq!(page.host_count(), 1);
        assert_eq!(page.widgets()[0].snapshot().count_elements(), nodes);
        assert_eq!(transport.calls_to(SETTINGS), settings_calls);
    }

    #[tokio::test(start_paused = true)]
    async fn existing_host_element_blocks_boot() {
        let transport = Arc::new(MockTransport::new());
        let page = page(Arc::new(MemoryStore::new()), vec![tag()]);
        boot(&page, transport.clone(), &RetryPolicy::default()).await.unwrap();
        page.set_global(guard::LOADED_FLAG, "older");
        let again = boot(&page, transport, &RetryPolicy::default()).await.unwrap();
        assert!(matches!(again, BootOutcome::AlreadyLoaded));
        assert_eq!(page.host_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn host_element_in_page_markup_blocks_boot() {
        let transport = Arc::new(MockTransport::new());
        let html = r#"<html><body>
            <div id="chat-widget-host-w1" class="cw-host"></div>
            <script src="https://cdn.test/chat-widget.js" data-chatbot-id="cb1"
                data-widget-id="w1" data-api-base="https://api.test/api"></script>
            </body></html>"#;
        let page = HostPage::from_html(
            Url::parse("https://shop.test/").unwrap(),
            html,
            Arc::new(MemoryStore::new()),
        );
        let outcome = boot(&page, transport.clone(), &RetryPolicy::default()).await.unwrap();
        assert!(matches!(outcome, BootOutcome::AlreadyLoaded));
        assert_eq!(page.host_count(), 0);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn session_is_stable_across_page_loads() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        let first_page = page(storage.clone(), vec![tag()]);
        let second_page = page(storage, vec![tag()]);
        let a = boot(&first_page, transport.clone(), &RetryPolicy::default()).await.unwrap();
        let b = boot(&second_page, transport, &RetryPolicy::default()).await.unwrap();
        assert_eq!(
            a.widget().unwrap().session_id(),
            b.widget().unwrap().session_id()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_widget_id_renders_nothing() {
        let transport = Arc::new(MockTransport::new());
        let page = page(
            Arc::new(MemoryStore::new()),
            vec![ScriptTag::with_src("/chat-widget.js?chatbotId=cb1")],
        );
        let err = boot(&page, transport.clone(), &RetryPolicy::default()).await;
        assert!(matches!(err, Err(BootError::ConfigMissing("widgetId"))));
        assert_eq!(page.host_count(), 0);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn production_default_and_welcome_scenario() {
        let transport = Arc::new(
            MockTransport::new()
                .script(
                    "/api/chatbot/chat_init",
                    vec![Scripted::Json(200, json!({"success": true, "welcomeMessage": "Hi"}))],
                ),
        );
        let tag = ScriptTag::with_src("https://cdn.test/chat-widget.js")
            .attr("data-chatbot-id", "cb1")
            .attr("data-widget-id", "w1");
        let page = page(Arc::new(MemoryStore::new()), vec![tag]);
        let outcome = boot(&page, transport.clone(), &RetryPolicy::default()).await.unwrap();
        let widget = outcome.widget().unwrap();
        assert_eq!(widget.config().api_base.host_str(), Some("api.chatwidget.app"));

        widget.toggle();
        widget.open_chat().await;
        assert_eq!(widget.state().screen, Screen::Chat);
        assert_eq!(widget.bubbles(), vec![("assistant".to_string(), "Hi".to_string())]);
        assert_eq!(transport.calls_to("/api/chatbot/chat_init"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn settings_timeouts_render_default_home_screen() {
        let transport = Arc::new(MockTransport::new().script(SETTINGS, vec![Scripted::Hang]));
        let page = page(Arc::new(MemoryStore::new()), vec![tag()]);
        let outcome = boot(&page, transport.clone(), &RetryPolicy::default()).await.unwrap();
        let widget = outcome.widget().unwrap();
        assert_eq!(widget.settings().appearance, AppearanceConfig::default());
        assert!(widget.settings().starters.is_empty());
        assert_eq!(transport.calls_to(SETTINGS), 2);

        widget.toggle();
        let tree = widget.snapshot();
        let title = tree.find_by_class("cw-title")[0].text_content();
        assert_eq!(title, AppearanceConfig::default().home_title);
        assert!(!tree.find_by_class("cw-home")[0].has_attr("hidden"));
        assert!(tree.to_html().contains(&AppearanceConfig::default().brand_color));
    }
}
