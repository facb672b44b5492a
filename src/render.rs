use crate::settings::{AppearanceConfig, WidgetSettings};
use crate::view::{Element, Node, Stylesheet, css_color, css_url};

pub const MESSAGES_ID: &str = "cw-messages";
pub const INPUT_ID: &str = "cw-input";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Home,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UiState {
    pub open: bool,
    pub screen: Screen,
}

fn stylesheet(appearance: &AppearanceConfig) -> Stylesheet {
    let brand = css_color(&appearance.brand_color);
    let action = css_color(&appearance.action_color);
    let background = css_color(&appearance.background_color);
    let side = appearance.position.as_str();
    let hero_image = appearance
        .background_image
        .as_deref()
        .map(css_url)
        .filter(|u| !u.is_empty())
        .map(|u| format!("background-image:url(\"{u}\");background-size:cover;"))
        .unwrap_or_default();
    Stylesheet::new(format!(
        ".cw-host{{all:initial;position:fixed;bottom:20px;{side}:20px;z-index:2147483000;\
font-family:system-ui,-apple-system,sans-serif;font-size:14px;color:#111827}}\
.cw-host *{{box-sizing:border-box}}\
.cw-host [hidden]{{display:none!important}}\
.cw-launcher{{width:56px;height:56px;border-radius:50%;border:0;cursor:pointer;\
background:{brand};color:#fff;font-size:24px;box-shadow:0 4px 12px rgba(0,0,0,.2)}}\
.cw-panel{{position:absolute;bottom:72px;{side}:0;width:360px;max-height:560px;\
display:flex;flex-direction:column;border-radius:16px;overflow:hidden;\
background:{background};box-shadow:0 12px 32px rgba(0,0,0,.18)}}\
.cw-header{{display:flex;align-items:center;gap:8px;padding:12px 16px;background:{brand};color:#fff}}\
.cw-logo{{width:28px;height:28px;border-radius:50%}}\
.cw-brand{{font-weight:600;flex:1}}\
.cw-status{{font-size:12px;opacity:.85}}\
.cw-close,.cw-back{{background:none;border:0;color:#fff;font-size:18px;cursor:pointer}}\
.cw-hero{{padding:24px 16px;background:{brand};color:#fff;{hero_image}}}\
.cw-starters{{list-style:none;margin:0;padding:12px 16px;display:flex;flex-direction:column;gap:8px}}\
.cw-starter{{width:100%;text-align:left;padding:10px 12px;border-radius:10px;\
border:1px solid {action};background:#fff;color:{action};cursor:pointer}}\
.cw-start{{margin:0 16px 16px;padding:12px;border:0;border-radius:10px;background:{action};color:#fff;cursor:pointer}}\
.cw-messages{{flex:1;overflow-y:auto;padding:12px 16px;display:flex;flex-direction:column;gap:8px;min-height:280px}}\
.cw-bubble{{max-width:80%;padding:8px 12px;border-radius:12px;white-space:pre-wrap;word-wrap:break-word}}\
.cw-user{{align-self:flex-end;background:{action};color:#fff}}\
.cw-assistant{{align-self:flex-start;background:#f3f4f6}}\
.cw-quick-menu{{margin:6px 0 0;padding-left:18px}}\
.cw-compose{{display:flex;gap:8px;padding:12px 16px;border-top:1px solid #e5e7eb}}\
.cw-input{{flex:1;padding:8px 10px;border:1px solid #d1d5db;border-radius:8px}}\
.cw-send{{padding:8px 14px;border:0;border-radius:8px;background:{action};color:#fff;cursor:pointer}}"
    ))
}

fn header(appearance: &AppearanceConfig, state: &UiState) -> Element {
    let mut header = Element::new("header").class("cw-header");
    if state.screen == Screen::Chat {
        header = header.child(
            Element::new("button")
                .class("cw-back")
                .attr("type", "button")
                .attr("data-action", "back-home")
                .attr("aria-label", "Back")
                .text("‹"),
        );
    }
    if let Some(logo) = &appearance.brand_logo {
        header = header.child(
            Element::new("img")
                .class("cw-logo")
                .attr("src", logo.as_str())
                .attr("alt", ""),
        );
    }
    header
        .child(Element::new("span").class("cw-brand").text(&appearance.brand_name))
        .child(Element::new("span").class("cw-status").text(&appearance.online_status))
        .child(
            Element::new("button")
                .class("cw-close")
                .attr("type", "button")
                .attr("data-action", "close")
                .attr("aria-label", "Close chat")
                .text("×"),
        )
}

fn home_screen(settings: &WidgetSettings, state: &UiState) -> Element {
    let appearance = &settings.appearance;
    let starters = settings.visible_starters().map(|(index, starter)| {
        Node::from(
            Element::new("li").child(
                Element::new("button")
                    .class("cw-starter")
                    .attr("type", "button")
                    .attr("data-action", "starter")
                    .attr("data-index", index.to_string())
                    .text(&starter.text),
            ),
        )
    });
    Element::new("section")
        .class("cw-home")
        .flag("hidden", state.screen != Screen::Home)
        .child(
            Element::new("div")
                .class("cw-hero")
                .child(Element::new("h2").class("cw-title").text(&appearance.home_title))
                .child(Element::new("p").class("cw-message").text(&appearance.home_message)),
        )
        .child(Element::new("ul").class("cw-starters").children(starters))
        .child(
            Element::new("button")
                .class("cw-start")
                .attr("type", "button")
                .attr("data-action", "open-chat")
                .text("Start chat"),
        )
}

fn chat_screen(state: &UiState) -> Element {
    Element::new("section")
        .class("cw-chat")
        .flag("hidden", state.screen != Screen::Chat)
        .child(
            Element::new("div")
                .id(MESSAGES_ID)
                .class("cw-messages")
                .attr("role", "log")
                .attr("aria-live", "polite"),
        )
        .child(
            Element::new("div")
                .class("cw-compose")
                .child(
                    Element::new("input")
                        .id(INPUT_ID)
                        .class("cw-input")
                        .attr("type", "text")
                        .attr("placeholder", "Type your message…")
                        .attr("autocomplete", "off")
                        .attr("value", ""),
                )
                .child(
                    Element::new("button")
                        .class("cw-send")
                        .attr("type", "button")
                        .attr("data-action", "send")
                        .text("Send"),
                ),
        )
}

/// Builds the whole widget subtree from state. Pure: the caller swaps the
/// result in and carries over the live message list and input value.
pub fn render(state: &UiState, settings: &WidgetSettings, host_id: &str) -> Element {
    let appearance = &settings.appearance;
    let launcher = Element::new("button")
        .class("cw-launcher")
        .attr("type", "button")
        .attr("data-action", "toggle")
        .attr("aria-expanded", state.open.to_string())
        .attr("aria-label", if state.open { "Close chat" } else { "Open chat" })
        .text(if state.open { "×" } else { "💬" });
    let panel = Element::new("div")
        .class("cw-panel")
        .attr("role", "dialog")
        .flag("hidden", !state.open)
        .child(header(appearance, state))
        .child(home_screen(settings, state))
        .child(chat_screen(state));

    Element::new("div")
        .id(host_id)
        .class("cw-host")
        .attr("data-position", appearance.position.as_str())
        .attr("data-sound", if appearance.sound { "on" } else { "off" })
        .child(Node::Style(stylesheet(appearance)))
        .child(launcher)
        .child(panel)
}

/// Chat bubble element; `id` is set on assistant placeholders that are
/// filled in later.
pub fn bubble(role: &str, text: &str, id: Option<&str>) -> Element {
    let mut el = Element::new("div").class(format!("cw-bubble cw-{role}"));
    if let Some(id) = id {
        el = el.id(id);
    }
    el.attr("data-role", role).text(text)
}
