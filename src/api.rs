use crate::boot::{BootOutcome, boot};
use crate::inject::inject_widget;
use crate::page::HostPage;
use crate::server::AppState;
use crate::snippet::{EmbedOptions, embed_snippet};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tracing::warn;

pub async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    pub chatbot_id: Option<String>,
    pub widget_id: Option<String>,
    pub company_id: Option<String>,
    pub api_base: Option<String>,
    pub open: Option<String>,
    pub screen: Option<String>,
    pub message: Option<String>,
}

fn demo_page(state: &AppState, query: &PreviewQuery) -> Option<String> {
    let opts = EmbedOptions {
        chatbot_id: query.chatbot_id.clone()?,
        widget_id: query.widget_id.clone()?,
        company_id: query.company_id.clone(),
        api_base: query.api_base.clone(),
        debug: true,
    };
    let tag = embed_snippet(&state.config.script_url, &opts);
    Some(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Chat widget preview</title></head>\
<body><main><h1>Chat widget preview</h1></main>{tag}</body></html>"
    ))
}

/// Boots the widget against the host page (configured, or generated from
/// the query) and returns the page with the rendered widget host appended.
pub async fn preview(State(state): State<AppState>, Query(query): Query<PreviewQuery>) -> Response {
    let html = match (&state.host_html, demo_page(&state, &query)) {
        (_, Some(generated)) => generated,
        (Some(configured), None) => configured.to_string(),
        (None, None) => {
            return (
                StatusCode::BAD_REQUEST,
                "chatbotId and widgetId are required when no host page is configured",
            )
                .into_response();
        }
    };

    let page = HostPage::from_html(
        state.config.host_page_url.clone(),
        &html,
        state.storage.clone(),
    );
    let widget = match boot(&page, state.transport.clone(), &state.config.policy).await {
        Ok(BootOutcome::Mounted(widget)) => widget,
        Ok(BootOutcome::AlreadyLoaded) => return Html(html).into_response(),
        Err(err) => return (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    };

    if query.open.as_deref().is_some_and(|v| v == "1" || v == "true") {
        widget.toggle();
    }
    if query.screen.as_deref() == Some("chat") {
        widget.open_chat().await;
    }
    if let Some(message) = query.message.as_deref() {
        widget.open_chat().await;
        widget.send_message(Some(message)).await;
    }

    match inject_widget(&html, &widget.to_html()) {
        Ok(rendered) => Html(rendered).into_response(),
        Err(err) => {
            warn!(%err, "failed to inject widget into host page");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

pub async fn snippet(State(state): State<AppState>, Query(opts): Query<EmbedOptions>) -> Response {
    embed_snippet(&state.config.script_url, &opts).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::server::router;
    use crate::session::MemoryStore;
    use crate::transport::mock::{MockTransport, Scripted};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(transport: Arc<MockTransport>, host_html: Option<&str>) -> AppState {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        AppState::new(
            config,
            transport,
            Arc::new(MemoryStore::new()),
            host_html.map(str::to_string),
        )
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, String) {
        let resp = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn healthz_is_no_content() {
        let (status, _) = get(state(Arc::new(MockTransport::new()), None), "/healthz").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test(start_paused = true)]
    async fn preview_renders_open_chat_into_configured_page() {
        let transport = Arc::new(
            MockTransport::new()
                .script(
                    "/api/chat-widget/appearance/get/w1",
                    vec![Scripted::Json(
                        200,
                        json!({"success": true, "data": {"exists": true, "appearance": {"brandName": "Acme"}}}),
                    )],
                )
                .script(
                    "/api/chatbot/chat_init",
                    vec![Scripted::Json(200, json!({"success": true, "welcomeMessage": "Welcome!"}))],
                )
                .script("/api/chatbot/chat", vec![Scripted::Json(200, json!({"reply": "$10/mo"}))]),
        );
        let host = "<html><body><h1>Shop</h1>\
<script src=\"https://cdn.test/chat-widget.js\" data-chatbot-id=\"cb1\" data-widget-id=\"w1\"></script>\
</body></html>";
        let (status, body) = get(
            state(transport, Some(host)),
            "/preview?open=1&message=price%3F",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>Shop</h1>"));
        assert!(body.contains("id=\"chat-widget-host-w1\""));
        assert!(body.contains("Acme"));
        assert!(body.contains("Welcome!"));
        assert!(body.contains("price?"));
        assert!(body.contains("$10/mo"));
    }

    #[tokio::test]
    async fn preview_without_ids_or_page_is_bad_request() {
        let (status, _) = get(state(Arc::new(MockTransport::new()), None), "/preview").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn preview_reports_config_errors() {
        let host = "<html><body><script src=\"/chat-widget.js?chatbotId=cb1\"></script></body></html>";
        let (status, body) = get(state(Arc::new(MockTransport::new()), Some(host)), "/preview").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("widgetId"));
    }

    #[tokio::test]
    async fn snippet_endpoint_builds_tag() {
        let (status, body) = get(
            state(Arc::new(MockTransport::new()), None),
            "/snippet?chatbotId=cb1&widgetId=w1&companyId=co1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("<script src=\"https://cdn.chatwidget.app/chat-widget.js\""));
        assert!(body.contains("data-company-id=\"co1\""));
    }
}
