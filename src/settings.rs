use crate::error::FetchError;
use crate::resolver::WidgetConfig;
use crate::transport::{Transport, with_timeout};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    #[default]
    Right,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Left => "left",
            Position::Right => "right",
        }
    }
}

/// Tenant appearance. Always fully populated; see [`AppearanceConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppearanceConfig {
    pub brand_name: String,
    pub brand_logo: Option<String>,
    pub brand_color: String,
    pub action_color: String,
    pub background_color: String,
    pub background_image: Option<String>,
    pub home_title: String,
    pub home_message: String,
    pub position: Position,
    pub online_status: String,
    pub offline_status: String,
    pub sound: bool,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            brand_name: "Support".to_string(),
            brand_logo: None,
            brand_color: "#4f46e5".to_string(),
            action_color: "#4f46e5".to_string(),
            background_color: "#ffffff".to_string(),
            background_image: None,
            home_title: "Hi there 👋".to_string(),
            home_message: "Ask us anything. We usually reply in a few seconds.".to_string(),
            position: Position::Right,
            online_status: "We're online".to_string(),
            offline_status: "We'll be back soon".to_string(),
            sound: false,
        }
    }
}

/// Partial appearance as stored by the dashboard. Missing, null or blank
/// fields keep their default.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AppearancePatch {
    brand_name: Option<String>,
    brand_logo: Option<String>,
    brand_color: Option<String>,
    action_color: Option<String>,
    background_color: Option<String>,
    background_image: Option<String>,
    home_title: Option<String>,
    home_message: Option<String>,
    #[serde(deserialize_with = "lenient_position")]
    position: Option<Position>,
    online_status: Option<String>,
    offline_status: Option<String>,
    sound: Option<bool>,
}

fn lenient_position<'de, D>(de: D) -> Result<Option<Position>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(de)?;
    Ok(match raw.as_ref().and_then(|v| v.as_str()) {
        Some(v) if v.eq_ignore_ascii_case("left") => Some(Position::Left),
        Some(v) if v.eq_ignore_ascii_case("right") => Some(Position::Right),
        _ => None,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppearancePatch {
    fn apply(self, base: AppearanceConfig) -> AppearanceConfig {
        AppearanceConfig {
            brand_name: non_blank(self.brand_name).unwrap_or(base.brand_name),
            brand_logo: non_blank(self.brand_logo).or(base.brand_logo),
            brand_color: non_blank(self.brand_color).unwrap_or(base.brand_color),
            action_color: non_blank(self.action_color).unwrap_or(base.action_color),
            background_color: non_blank(self.background_color).unwrap_or(base.background_color),
            background_image: non_blank(self.background_image).or(base.background_image),
            home_title: non_blank(self.home_title).unwrap_or(base.home_title),
            home_message: non_blank(self.home_message).unwrap_or(base.home_message),
            position: self.position.unwrap_or(base.position),
            online_status: non_blank(self.online_status).unwrap_or(base.online_status),
            offline_status: non_blank(self.offline_status).unwrap_or(base.offline_status),
            sound: self.sound.unwrap_or(base.sound),
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Starter {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Starter {
    pub fn is_visible(&self) -> bool {
        self.enabled && !self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WidgetSettings {
    pub appearance: AppearanceConfig,
    pub starters: Vec<Starter>,
    pub updated_at: Option<String>,
}

impl WidgetSettings {
    pub fn visible_starters(&self) -> impl Iterator<Item = (usize, &Starter)> {
        self.starters
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_visible())
    }
}

#[derive(Debug, Deserialize)]
struct SettingsEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<SettingsData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsData {
    #[serde(default = "default_enabled")]
    exists: bool,
    #[serde(default)]
    appearance: Option<AppearancePatch>,
    #[serde(default)]
    starters: Option<Vec<Starter>>,
    #[serde(default)]
    updated_at: Option<serde_json::Value>,
}

/// Timeouts and retry shape for outbound calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub settings_timeout: Duration,
    pub settings_attempts: u32,
    pub retry_base_delay: Duration,
    pub chat_timeout: Duration,
    pub init_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            settings_timeout: Duration::from_secs(8),
            settings_attempts: 2,
            retry_base_delay: Duration::from_millis(600),
            chat_timeout: Duration::from_secs(30),
            init_timeout: Duration::from_secs(8),
        }
    }
}

enum Fetched {
    Settings(WidgetSettings),
    NotSaved,
}

async fn fetch_once(
    transport: &dyn Transport,
    config: &WidgetConfig,
    timeout: Duration,
) -> Result<Fetched, FetchError> {
    let url = config.settings_url()?;
    let resp = with_timeout(timeout, transport.get(&url)).await?;
    let envelope: SettingsEnvelope = resp.json()?;
    if !envelope.success {
        return Err(FetchError::Rejected("success flag not set"));
    }
    let data = envelope.data.ok_or(FetchError::Rejected("missing data"))?;
    if !data.exists {
        return Ok(Fetched::NotSaved);
    }
    let appearance = data
        .appearance
        .unwrap_or_default()
        .apply(AppearanceConfig::default());
    let updated_at = data.updated_at.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    Ok(Fetched::Settings(WidgetSettings {
        appearance,
        starters: data.starters.unwrap_or_default(),
        updated_at,
    }))
}

/// Fetches the tenant's appearance and starters. Never fails: timeouts,
/// bad statuses and malformed bodies are retried, then the defaults are
/// returned so rendering is never blocked.
pub async fn load_widget_settings(
    transport: &dyn Transport,
    config: &WidgetConfig,
    policy: &RetryPolicy,
) -> WidgetSettings {
    let attempts = policy.settings_attempts.max(1);
    for attempt in 1..=attempts {
        match fetch_once(transport, config, policy.settings_timeout).await {
            Ok(Fetched::Settings(settings)) => {
                debug!(
                    widget_id = %config.widget_id,
                    starters = settings.starters.len(),
                    updated_at = ?settings.updated_at,
                    "loaded widget settings"
                );
                return settings;
            }
            Ok(Fetched::NotSaved) => {
                debug!(widget_id = %config.widget_id, "no saved widget settings; using defaults");
                return WidgetSettings::default();
            }
            Err(err) => {
                if config.debug {
                    warn!(widget_id = %config.widget_id, attempt, %err, "widget settings fetch failed");
                } else {
                    debug!(widget_id = %config.widget_id, attempt, %err, "widget settings fetch failed");
                }
                if attempt < attempts {
                    sleep(policy.retry_base_delay * attempt).await;
                }
            }
        }
    }
    WidgetSettings::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, Scripted};
    use serde_json::json;
    use url::Url;

    const PATH: &str = "/api/chat-widget/appearance/get/w1";

    fn config(company: Option<&str>) -> WidgetConfig {
        WidgetConfig {
            chatbot_id: "cb1".into(),
            widget_id: "w1".into(),
            company_id: company.map(str::to_string),
            api_base: Url::parse("https://api.test/api").unwrap(),
            debug: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn merges_remote_appearance_over_defaults() {
        let transport = MockTransport::new().script(
            PATH,
            vec![Scripted::Json(
                200,
                json!({
                    "success": true,
                    "data": {
                        "exists": true,
                        "appearance": {
                            "brandName": "Acme",
                            "brandColor": "#ff0000",
                            "position": "LEFT",
                            "homeTitle": "  ",
                            "brandLogo": null
                        },
                        "starters": [
                            {"text": "Pricing", "enabled": true},
                            {"text": "Hidden", "enabled": false},
                            {"text": "Hours"}
                        ],
                        "updatedAt": "2026-01-02T03:04:05Z"
                    }
                }),
            )],
        );
        let settings = load_widget_settings(&transport, &config(Some("co9")), &RetryPolicy::default()).await;
        assert_eq!(settings.appearance.brand_name, "Acme");
        assert_eq!(settings.appearance.brand_color, "#ff0000");
        assert_eq!(settings.appearance.position, Position::Left);
        assert_eq!(settings.appearance.home_title, AppearanceConfig::default().home_title);
        assert_eq!(settings.starters.len(), 3);
        let visible: Vec<_> = settings.visible_starters().map(|(_, s)| s.text.as_str()).collect();
        assert_eq!(visible, vec!["Pricing", "Hours"]);
        assert_eq!(settings.updated_at.as_deref(), Some("2026-01-02T03:04:05Z"));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url.query(), Some("companyId=co9"));
    }

    #[tokio::test(start_paused = true)]
    async fn unsaved_tenant_returns_defaults_without_retry() {
        let transport = MockTransport::new().script(
            PATH,
            vec![Scripted::Json(200, json!({"success": true, "data": {"exists": false}}))],
        );
        let settings = load_widget_settings(&transport, &config(None), &RetryPolicy::default()).await;
        assert_eq!(settings, WidgetSettings::default());
        assert_eq!(transport.calls_to(PATH), 1);
        assert_eq!(transport.calls()[0].url.query(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_recovers() {
        let transport = MockTransport::new().script(
            PATH,
            vec![
                Scripted::Raw(502, "bad gateway"),
                Scripted::Json(
                    200,
                    json!({"success": true, "data": {"exists": true, "appearance": {"brandName": "Later"}}}),
                ),
            ],
        );
        let settings = load_widget_settings(&transport, &config(None), &RetryPolicy::default()).await;
        assert_eq!(settings.appearance.brand_name, "Later");
        assert!(settings.starters.is_empty());
        assert_eq!(transport.calls_to(PATH), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn double_timeout_falls_back_to_defaults() {
        let transport = MockTransport::new().script(PATH, vec![Scripted::Hang]);
        let started = tokio::time::Instant::now();
        let settings = load_widget_settings(&transport, &config(None), &RetryPolicy::default()).await;
        assert_eq!(settings.appearance, AppearanceConfig::default());
        assert!(settings.starters.is_empty());
        assert_eq!(transport.calls_to(PATH), 2);
        assert!(started.elapsed() >= Duration::from_millis(16_600));
    }

    #[tokio::test(start_paused = true)]
    async fn non_json_body_is_retried_then_defaulted() {
        let transport = MockTransport::new().script(PATH, vec![Scripted::Raw(200, "<!doctype html>")]);
        let settings = load_widget_settings(&transport, &config(None), &RetryPolicy::default()).await;
        assert_eq!(settings, WidgetSettings::default());
        assert_eq!(transport.calls_to(PATH), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unsuccessful_envelope_is_a_failure() {
        let transport = MockTransport::new().script(
            PATH,
            vec![Scripted::Json(200, json!({"success": false, "message": "nope"}))],
        );
        let settings = load_widget_settings(&transport, &config(None), &RetryPolicy::default()).await;
        assert_eq!(settings, WidgetSettings::default());
        assert_eq!(transport.calls_to(PATH), 2);
    }
}
