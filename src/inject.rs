use kuchiki::NodeRef;
use kuchiki::traits::*;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("html manipulation failed: {0}")]
    Html(String),
}

/// Appends `widget_html` as the last children of `<body>` in `page_html`.
pub fn inject_widget(page_html: &str, widget_html: &str) -> Result<String, InjectError> {
    let document = kuchiki::parse_html().one(page_html);
    append_to_selector(&document, "body", widget_html)?;
    Ok(document.to_string())
}

fn append_to_selector(
    document: &NodeRef,
    selector: &str,
    new_html: &str,
) -> Result<(), InjectError> {
    let mut nodes = document
        .select(selector)
        .map_err(|e| InjectError::Html(format!("query selector {selector} failed: {e:?}")))?;
    let Some(target) = nodes.next() else {
        warn!(%selector, "injection target not found");
        return Err(InjectError::Html(format!("no element matches {selector}")));
    };

    // Parse wrapped so the fragment keeps its structure.
    let wrapper_html = format!("<div id=\"__chat_widget_inject_wrapper\">{new_html}</div>");
    let fragment_doc = kuchiki::parse_html().one(wrapper_html);
    let mut wrappers = fragment_doc
        .select("#__chat_widget_inject_wrapper")
        .map_err(|e| InjectError::Html(format!("select wrapper failed: {e:?}")))?;
    if let Some(wrapper) = wrappers.next() {
        let children: Vec<_> = wrapper.as_node().children().collect();
        for child in children {
            target.as_node().append(child);
        }
    }
    Ok(())
}
