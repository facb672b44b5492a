use crate::render::{self, INPUT_ID, MESSAGES_ID, Screen, UiState};
use crate::resolver::WidgetConfig;
use crate::settings::{RetryPolicy, WidgetSettings};
use crate::transport::Transport;
use crate::view::{Element, Node};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// User interactions routed from `data-action` attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Toggle,
    Close,
    OpenChat,
    BackHome,
    Starter(usize),
    Send,
}

impl Action {
    /// Maps a clicked element to its action, if it carries one.
    pub fn from_element(el: &Element) -> Option<Self> {
        match el.get_attr("data-action")? {
            "toggle" => Some(Action::Toggle),
            "close" => Some(Action::Close),
            "open-chat" => Some(Action::OpenChat),
            "back-home" => Some(Action::BackHome),
            "send" => Some(Action::Send),
            "starter" => el
                .get_attr("data-index")
                .and_then(|i| i.parse().ok())
                .map(Action::Starter),
            _ => None,
        }
    }
}

struct Mounted {
    state: UiState,
    tree: Element,
    next_bubble: u64,
}

/// A booted widget mounted on a host page.
pub struct Widget {
    pub(crate) config: WidgetConfig,
    pub(crate) session_id: String,
    pub(crate) settings: WidgetSettings,
    pub(crate) policy: RetryPolicy,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) welcome_requested: AtomicBool,
    dom: Mutex<Mounted>,
}

impl Widget {
    pub fn new(
        config: WidgetConfig,
        session_id: String,
        settings: WidgetSettings,
        policy: RetryPolicy,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let state = UiState::default();
        let tree = render::render(&state, &settings, &config.host_id());
        Self {
            config,
            session_id,
            settings,
            policy,
            transport,
            welcome_requested: AtomicBool::new(false),
            dom: Mutex::new(Mounted {
                state,
                tree,
                next_bubble: 0,
            }),
        }
    }

    fn dom(&self) -> MutexGuard<'_, Mounted> {
        self.dom.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }

    pub fn state(&self) -> UiState {
        self.dom().state
    }

    /// Copy of the current subtree.
    pub fn snapshot(&self) -> Element {
        self.dom().tree.clone()
    }

    pub fn to_html(&self) -> String {
        self.dom().tree.to_html()
    }

    /// Rebuilds the subtree from state, keeping the live message list and
    /// whatever the visitor has typed.
    pub fn render(&self) {
        let mut dom = self.dom();
        let host_id = self.config.host_id();
        let mut fresh = render::render(&dom.state, &self.settings, &host_id);
        let messages = dom
            .tree
            .find_by_id_mut(MESSAGES_ID)
            .map(|list| std::mem::take(&mut list.children))
            .unwrap_or_default();
        let typed = dom
            .tree
            .find_by_id(INPUT_ID)
            .and_then(|input| input.get_attr("value"))
            .unwrap_or_default()
            .to_string();
        if let Some(list) = fresh.find_by_id_mut(MESSAGES_ID) {
            list.children = messages;
        }
        if let Some(input) = fresh.find_by_id_mut(INPUT_ID) {
            input.set_attr("value", typed);
        }
        dom.tree = fresh;
    }

    fn update(&self, change: impl FnOnce(&mut UiState)) {
        {
            let mut dom = self.dom();
            change(&mut dom.state);
            debug!(open = dom.state.open, screen = ?dom.state.screen, "widget state changed");
        }
        self.render();
    }

    pub fn toggle(&self) {
        self.update(|s| s.open = !s.open);
    }

    pub fn close(&self) {
        self.update(|s| s.open = false);
    }

    pub fn back_home(&self) {
        self.update(|s| s.screen = Screen::Home);
    }

    /// Shows the chat screen; the first call per widget also loads the
    /// welcome message.
    pub async fn open_chat(&self) {
        self.update(|s| {
            s.open = true;
            s.screen = Screen::Chat;
        });
        self.load_welcome().await;
    }

    /// Opens the chat and submits the starter's text. Unknown or hidden
    /// starters are ignored.
    pub async fn click_starter(&self, index: usize) {
        let Some(text) = self
            .settings
            .starters
            .get(index)
            .filter(|s| s.is_visible())
            .map(|s| s.text.clone())
        else {
            return;
        };
        self.open_chat().await;
        self.send_message(Some(&text)).await;
    }

    /// Replaces the input field's value, as typing would.
    pub fn type_input(&self, text: &str) {
        if let Some(input) = self.dom().tree.find_by_id_mut(INPUT_ID) {
            input.set_attr("value", text);
        }
    }

    pub fn input_value(&self) -> String {
        self.dom()
            .tree
            .find_by_id(INPUT_ID)
            .and_then(|input| input.get_attr("value"))
            .unwrap_or_default()
            .to_string()
    }

    pub async fn dispatch(&self, action: Action) {
        match action {
            Action::Toggle => self.toggle(),
            Action::Close => self.close(),
            Action::BackHome => self.back_home(),
            Action::OpenChat => self.open_chat().await,
            Action::Starter(index) => self.click_starter(index).await,
            Action::Send => self.send_message(None).await,
        }
    }

    /// Trimmed input value. The field is cleared unless it held only
    /// whitespace.
    pub(crate) fn take_input(&self) -> String {
        let mut dom = self.dom();
        let Some(input) = dom.tree.find_by_id_mut(INPUT_ID) else {
            return String::new();
        };
        let value = input.get_attr("value").unwrap_or_default().trim().to_string();
        if !value.is_empty() {
            input.set_attr("value", "");
        }
        value
    }

    /// Appends a bubble to the message list. With `placeholder` set the
    /// bubble gets a unique id so it can be filled in later.
    pub(crate) fn append_bubble(&self, role: &str, text: &str, placeholder: bool) -> Option<String> {
        let mut dom = self.dom();
        let id = placeholder.then(|| {
            dom.next_bubble += 1;
            format!("cw-msg-{}", dom.next_bubble)
        });
        let bubble = render::bubble(role, text, id.as_deref());
        dom.tree
            .find_by_id_mut(MESSAGES_ID)?
            .children
            .push(bubble.into());
        id
    }

    pub(crate) fn append_node(&self, node: Node) {
        if let Some(list) = self.dom().tree.find_by_id_mut(MESSAGES_ID) {
            list.children.push(node);
        }
    }

    pub(crate) fn fill_bubble(&self, id: &str, text: &str) {
        if let Some(bubble) = self.dom().tree.find_by_id_mut(id) {
            bubble.children = vec![Node::text(text)];
        }
    }

    /// Bubbles currently in the message list, as `(role, text)`.
    pub fn bubbles(&self) -> Vec<(String, String)> {
        let dom = self.dom();
        dom.tree
            .find_by_id(MESSAGES_ID)
            .map(|list| {
                list.children
                    .iter()
                    .filter_map(Node::as_element)
                    .map(|b| {
                        (
                            b.get_attr("data-role").unwrap_or_default().to_string(),
                            b.text_content(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
