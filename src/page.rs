// Held page markup plus the presentation state that has no markup
// representation (loading overlay, results dimming).
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Which regions were actually replaced by a background refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionSwap {
    pub table_replaced: bool,
    pub count_replaced: bool,
}

/// The current page, owned as data.
///
/// The markup is normalized through one parse/serialize round trip at
/// construction, so the serialized form of any element found later is an
/// exact substring of the held document and can be spliced in place.
#[derive(Debug, Clone)]
pub struct ResultsPage {
    html: String,
    overlay_visible: bool,
    results_dimmed: bool,
}

impl ResultsPage {
    pub fn new(markup: &str) -> Self {
        let html = Html::parse_document(markup).root_element().html();
        Self {
            html,
            overlay_visible: false,
            results_dimmed: false,
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Parses the held markup. Callers re-derive element references per
    /// operation; nothing borrows across a splice.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// Shows the full-page loading overlay. The overlay element is created
    /// lazily by the host on first use; here it collapses to a flag that is
    /// reused across submissions.
    pub fn show_overlay(&mut self) {
        self.overlay_visible = true;
    }

    pub fn hide_overlay(&mut self) {
        self.overlay_visible = false;
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Dims the results container while a refresh is in flight. An opacity
    /// transition, not a structural change.
    pub fn dim_results(&mut self) {
        self.results_dimmed = true;
    }

    pub fn restore_results(&mut self) {
        self.results_dimmed = false;
    }

    pub fn results_dimmed(&self) -> bool {
        self.results_dimmed
    }

    /// Serialized outer markup of the first element matching `selector`.
    pub fn first_fragment(&self, selector: &Selector) -> Option<String> {
        self.document().select(selector).next().map(|el| el.html())
    }

    /// Current results table region, if the page has one.
    pub fn table_fragment(&self) -> Option<String> {
        let table = Selector::parse(".table-responsive").unwrap();
        self.first_fragment(&table)
    }

    /// Text of the results-count label, if the page has one.
    pub fn results_count_text(&self) -> Option<String> {
        let count = Selector::parse("#resultsCount").unwrap();
        self.document()
            .select(&count)
            .next()
            .map(|el| el.text().collect())
    }

    /// Replaces the results table and count label with the versions found in
    /// a refreshed response document. A target missing from the response
    /// skips that replacement; neither is an error.
    pub fn replace_results_regions(&mut self, response_html: &str) -> RegionSwap {
        let table = Selector::parse(".table-responsive").unwrap();
        let count = Selector::parse("#resultsCount").unwrap();
        let response = Html::parse_document(response_html);
        let mut swap = RegionSwap::default();

        let new_table = response.select(&table).next().map(|el| el.html());
        match new_table {
            Some(fragment) => {
                if let Some(current) = self.first_fragment(&table) {
                    swap.table_replaced = self.replace_fragment(&current, &fragment);
                }
            }
            None => debug!("refresh response carries no results table, swap skipped"),
        }

        let new_count = response
            .select(&count)
            .next()
            .map(|el| el.text().collect::<String>());
        match new_count {
            Some(text) => swap.count_replaced = self.set_results_count(&text),
            None => debug!("refresh response carries no results count, swap skipped"),
        }

        swap
    }

    /// Rewrites the row container with the given row fragments in order.
    pub(crate) fn write_rows(&mut self, fragments: &[&str]) -> bool {
        let tbody = Selector::parse("tbody").unwrap();
        let current = match self.first_fragment(&tbody) {
            Some(outer) => outer,
            None => {
                warn!("page has no row container, render skipped");
                return false;
            }
        };
        let open_end = match current.find('>') {
            Some(pos) => pos + 1,
            None => return false,
        };
        let rebuilt = format!("{}{}</tbody>", &current[..open_end], fragments.concat());
        self.replace_fragment(&current, &rebuilt)
    }

    /// Sets the text content of the results-count label.
    pub(crate) fn set_results_count(&mut self, text: &str) -> bool {
        let count = Selector::parse("#resultsCount").unwrap();
        let (outer, inner, name) = {
            let doc = self.document();
            match doc.select(&count).next() {
                Some(el) => (el.html(), el.inner_html(), el.value().name().to_string()),
                None => return false,
            }
        };
        let rebuilt = match replace_inner_text(&outer, &inner, &name, text) {
            Some(fragment) => fragment,
            None => return false,
        };
        self.replace_fragment(&outer, &rebuilt)
    }

    /// Appends a fragment inside the element with the given id, e.g. a
    /// freshly built airline checkbox label.
    pub(crate) fn append_to_container(&mut self, id: &str, fragment: &str) -> bool {
        let selector = match Selector::parse(&format!("#{id}")) {
            Ok(s) => s,
            Err(_) => return false,
        };
        let (outer, name) = {
            let doc = self.document();
            match doc.select(&selector).next() {
                Some(el) => (el.html(), el.value().name().to_string()),
                None => {
                    debug!(container = id, "container absent, append skipped");
                    return false;
                }
            }
        };
        let close = format!("</{name}>");
        if !outer.ends_with(&close) {
            warn!(container = id, "container has no closing tag, append skipped");
            return false;
        }
        let rebuilt = format!("{}{}{}", &outer[..outer.len() - close.len()], fragment, close);
        self.replace_fragment(&outer, &rebuilt)
    }

    /// Removes an attribute from every element matched by `selector`,
    /// e.g. `selected` from a dropdown's options or `checked` from the
    /// airline boxes. Returns how many elements were rewritten.
    pub(crate) fn remove_attr(&mut self, selector: &Selector, attr: &str) -> usize {
        let rewrites: Vec<(String, String)> = {
            let doc = self.document();
            doc.select(selector)
                .filter(|el| el.value().attr(attr).is_some())
                .map(|el| {
                    let kept: Vec<(String, String)> = el
                        .value()
                        .attrs()
                        .filter(|(name, _)| *name != attr)
                        .map(|(name, value)| (name.to_string(), value.to_string()))
                        .collect();
                    (el.html(), rebuilt_outer(el, &kept))
                })
                .collect()
        };
        let mut changed = 0;
        for (old, new) in &rewrites {
            if self.replace_fragment(old, new) {
                changed += 1;
            }
        }
        changed
    }

    /// Splices `new` over the first occurrence of `old` in the held markup.
    fn replace_fragment(&mut self, old: &str, new: &str) -> bool {
        match self.html.find(old) {
            Some(pos) => {
                self.html.replace_range(pos..pos + old.len(), new);
                true
            }
            None => {
                warn!("fragment not found in held page, splice skipped");
                false
            }
        }
    }
}

/// Rebuilds an element's outer markup from a modified attribute list. The
/// result matches what the serializer would emit for the same content, so
/// it stays splice-safe on later round trips.
fn rebuilt_outer(el: ElementRef<'_>, attrs: &[(String, String)]) -> String {
    let name = el.value().name();
    let mut tag = format!("<{name}");
    for (attr, value) in attrs {
        tag.push_str(&format!(" {attr}=\"{}\"", escape_attr_value(value)));
    }
    tag.push('>');
    if is_void_element(name) {
        tag
    } else {
        format!("{tag}{}</{name}>", el.inner_html())
    }
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Escaping for hand-built attribute values, matching the serializer's
/// attribute escaping so round trips stay byte-identical.
pub(crate) fn escape_attr_value(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('"', "&quot;")
}

/// Escaping for hand-built text content.
pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Rebuilds an element's outer markup with its text content replaced.
fn replace_inner_text(outer: &str, inner: &str, name: &str, text: &str) -> Option<String> {
    let close = format!("</{name}>");
    if inner.is_empty() {
        let body = outer.strip_suffix(close.as_str())?;
        return Some(format!("{body}{text}{close}"));
    }
    let open_end = outer.find('>')? + 1;
    let (head, tail) = outer.split_at(open_end);
    Some(format!("{}{}", head, tail.replacen(inner, text, 1)))
}
