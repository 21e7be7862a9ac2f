//! Bare URL linking.

use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};

const SCHEMES: [&str; 2] = ["https://", "http://"];

/// Wrap bare `http(s)://` URLs found in text into autolinks.
///
/// Text inside links, code blocks and raw HTML blocks is left alone. Expects
/// adjacent text events to be merged already.
pub(crate) fn link_bare_urls(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut link_depth = 0usize;
    let mut in_code = false;
    let mut in_html = false;

    for event in events {
        match &event {
            Event::Start(Tag::Link { .. }) => link_depth += 1,
            Event::End(TagEnd::Link) => link_depth = link_depth.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) => in_code = true,
            Event::End(TagEnd::CodeBlock) => in_code = false,
            Event::Start(Tag::HtmlBlock) => in_html = true,
            Event::End(TagEnd::HtmlBlock) => in_html = false,
            Event::Text(text) if link_depth == 0 && !in_code && !in_html => {
                if let Some(split) = split_urls(text) {
                    out.extend(split);
                    continue;
                }
            }
            _ => {}
        }
        out.push(event);
    }

    out
}

/// Split `text` into text and link events, or `None` if it holds no URL.
fn split_urls(text: &str) -> Option<Vec<Event<'static>>> {
    let mut events = Vec::new();
    let mut rest = text;

    while let Some((start, end)) = find_url(rest) {
        if start > 0 {
            events.push(Event::Text(CowStr::from(rest[..start].to_owned())));
        }
        let url = &rest[start..end];
        events.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(url.to_owned()),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        events.push(Event::Text(CowStr::from(url.to_owned())));
        events.push(Event::End(TagEnd::Link));
        rest = &rest[end..];
    }

    if events.is_empty() {
        return None;
    }
    if !rest.is_empty() {
        events.push(Event::Text(CowStr::from(rest.to_owned())));
    }
    Some(events)
}

/// Byte range of the first URL in `text`.
fn find_url(text: &str) -> Option<(usize, usize)> {
    let mut search_from = 0;
    loop {
        let (start, scheme_len) = SCHEMES
            .iter()
            .filter_map(|scheme| {
                text[search_from..]
                    .find(scheme)
                    .map(|i| (search_from + i, scheme.len()))
            })
            .min_by_key(|(i, _)| *i)?;

        let at_boundary = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let body_len = text[start..]
            .find(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"'))
            .unwrap_or(text.len() - start);
        let end = start + trim_trailing(&text[start..start + body_len]);

        if at_boundary && end > start + scheme_len {
            return Some((start, end));
        }
        search_from = start + scheme_len;
    }
}

/// Length of `url` once trailing punctuation is dropped.
fn trim_trailing(url: &str) -> usize {
    let mut url = url;
    loop {
        let Some(last) = url.chars().next_back() else {
            return 0;
        };
        let unbalanced_paren =
            last == ')' && url.matches('(').count() < url.matches(')').count();
        if matches!(last, '.' | ',' | ';' | ':' | '!' | '?' | '\'') || unbalanced_paren {
            url = &url[..url.len() - last.len_utf8()];
        } else {
            return url.len();
        }
    }
}
