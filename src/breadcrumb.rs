//! Human readable "site > section > page" trails for search results.

use crate::data_models::ApiItem;

pub const SEPARATOR: &str = " > ";
pub const ELLIPSIS: &str = "...";

/// Longest URL segment shown as-is.
pub const MAX_SEGMENT_CHARS: usize = 30;
/// Longest trail before it is cut. The trail is rendered inline.
pub const MAX_TRAIL_CHARS: usize = 95;

/// Builds the breadcrumb trail for one API item.
///
/// Structured `pagemap.listitem` metadata wins when present; otherwise the
/// trail is derived from the result link.
pub fn build(item: &ApiItem) -> String {
    let listitems = item
        .pagemap
        .as_ref()
        .map(|pagemap| pagemap.listitem.as_slice())
        .unwrap_or_default();

    if listitems.is_empty() {
        from_link(&item.link)
    } else {
        let names = listitems[..listitems.len() - 1]
            .iter()
            .filter_map(|li| li.name.as_deref());
        std::iter::once(item.display_link.as_str())
            .chain(names)
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }
}

/// Derives a trail from a URL: protocol, query string and page extension are
/// dropped, the path becomes the trail segments.
pub fn from_link(link: &str) -> String {
    let without_scheme = link
        .strip_prefix("https://")
        .or_else(|| link.strip_prefix("http://"))
        .unwrap_or(link);

    let cut = ["?", ".php", ".html"]
        .iter()
        .filter_map(|marker| without_scheme.find(marker))
        .min()
        .unwrap_or(without_scheme.len());
    let path = &without_scheme[..cut];

    let mut segments = path.split('/');
    let host = segments.next().unwrap_or_default();
    let rest: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();

    let mut trail: Vec<String> = Vec::with_capacity(rest.len() + 1);
    trail.push(host.to_string());
    if let Some((last, interior)) = rest.split_last() {
        trail.extend(interior.iter().map(|segment| {
            if segment.chars().count() > MAX_SEGMENT_CHARS {
                ELLIPSIS.to_string()
            } else {
                segment.to_string()
            }
        }));
        trail.push(truncate_chars(last, MAX_SEGMENT_CHARS));
    }

    truncate_chars(&trail.join(SEPARATOR), MAX_TRAIL_CHARS)
}

/// Keeps the first `max` characters, appending an ellipsis when anything was cut.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}{ELLIPSIS}", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[test]
fn test_truncate_chars() {
    assert_eq!(truncate_chars("abc", 3), "abc");
    assert_eq!(truncate_chars("abcd", 3), "abc...");
    assert_eq!(truncate_chars("", 3), "");
    assert_eq!(truncate_chars("ééééé", 2), "éé...");
}
