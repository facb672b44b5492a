use crate::session::KeyValueStore;
use crate::widget::Widget;
use kuchiki::traits::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

/// A `<script>` element as seen by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptTag {
    pub src: Option<String>,
    pub attrs: HashMap<String, String>,
}

impl ScriptTag {
    pub fn with_src(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            attrs: HashMap::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }
}

/// The embedding page: its URL, script tags, element ids present in its
/// markup, page-global flags, mounted widget hosts and the browser's durable
/// storage.
pub struct HostPage {
    url: Url,
    element_ids: HashSet<String>,
    scripts: Vec<ScriptTag>,
    current_script: Option<usize>,
    globals: Mutex<HashMap<String, String>>,
    hosts: Mutex<BTreeMap<String, Arc<Widget>>>,
    storage: Arc<dyn KeyValueStore>,
}

impl HostPage {
    pub fn new(url: Url, scripts: Vec<ScriptTag>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            url,
            element_ids: HashSet::new(),
            scripts,
            current_script: None,
            globals: Mutex::new(HashMap::new()),
            hosts: Mutex::new(BTreeMap::new()),
            storage,
        }
    }

    /// Parses `html`, collecting its script tags in document order and the
    /// ids of its elements.
    pub fn from_html(url: Url, html: &str, storage: Arc<dyn KeyValueStore>) -> Self {
        let document = kuchiki::parse_html().one(html);
        let element_ids = match document.select("[id]") {
            Ok(nodes) => nodes
                .filter_map(|node| node.attributes.borrow().get("id").map(str::to_string))
                .collect(),
            Err(()) => HashSet::new(),
        };
        let scripts = match document.select("script") {
            Ok(nodes) => nodes
                .map(|node| {
                    let attributes = node.attributes.borrow();
                    let attrs: HashMap<String, String> = attributes
                        .map
                        .iter()
                        .map(|(name, attr)| (name.local.to_string(), attr.value.clone()))
                        .collect();
                    ScriptTag {
                        src: attrs.get("src").cloned(),
                        attrs,
                    }
                })
                .collect(),
            Err(()) => Vec::new(),
        };
        let mut page = Self::new(url, scripts, storage);
        page.element_ids = element_ids;
        page
    }

    /// Marks the script currently executing, as `document.currentScript` would.
    pub fn with_current_script(mut self, index: usize) -> Self {
        self.current_script = Some(index);
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scripts(&self) -> &[ScriptTag] {
        &self.scripts
    }

    pub fn current_script(&self) -> Option<&ScriptTag> {
        self.current_script.and_then(|i| self.scripts.get(i))
    }

    pub fn storage(&self) -> &dyn KeyValueStore {
        self.storage.as_ref()
    }

    pub fn global(&self, name: &str) -> Option<String> {
        self.globals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn set_global(&self, name: &str, value: &str) {
        self.globals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
    }

    /// True when `host_id` is already in the page markup or was mounted by
    /// an earlier boot.
    pub fn has_host(&self, host_id: &str) -> bool {
        self.element_ids.contains(host_id)
            || self
                .hosts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(host_id)
    }

    pub fn mount(&self, host_id: &str, widget: Arc<Widget>) {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host_id.to_string(), widget);
    }

    pub fn host_count(&self) -> usize {
        self.hosts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn widgets(&self) -> Vec<Arc<Widget>> {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}
