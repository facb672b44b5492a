use crate::page::HostPage;

/// Version stamped on the page once the runtime has started.
pub const RUNTIME_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Page-global flag name (`window.__CHAT_WIDGET_LOADED__` in a browser).
pub const LOADED_FLAG: &str = "__CHAT_WIDGET_LOADED__";

/// Stamps the version flag. Returns `false` when this version already ran on
/// the page, in which case the caller must stop without side effects.
pub fn claim_page(page: &HostPage) -> bool {
    if page.global(LOADED_FLAG).as_deref() == Some(RUNTIME_VERSION) {
        return false;
    }
    page.set_global(LOADED_FLAG, RUNTIME_VERSION);
    true
}

/// Second line of defence: a host element for this widget already exists,
/// either in the page markup or mounted by an earlier run.
pub fn host_already_mounted(page: &HostPage, host_id: &str) -> bool {
    page.has_host(host_id)
}
