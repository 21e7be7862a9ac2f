//! Heading anchor ids.

use std::collections::{HashMap, HashSet};

use pulldown_cmark::{Event, Tag, TagEnd};

/// Assign a unique id to every heading that has none.
///
/// Ids are slugs of the heading text; repeated slugs get `-1`, `-2`, ... suffixes.
pub(crate) fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut used = UsedIds::default();
    let mut open: Option<(usize, String)> = None;

    for i in 0..events.len() {
        if matches!(events[i], Event::End(TagEnd::Heading(_))) {
            let Some((start, text)) = open.take() else {
                continue;
            };
            let id = used.unique(&slugify(&text));
            if let Event::Start(Tag::Heading { id: slot, .. }) = &mut events[start] {
                *slot = Some(id.into());
            }
            continue;
        }

        match &events[i] {
            Event::Start(Tag::Heading { id: None, .. }) => open = Some((i, String::new())),
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = open.as_mut() {
                    buf.push_str(text);
                }
            }
            _ => {}
        }
    }
}

/// Lowercase the text, keep alphanumerics and join words with `-`.
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "section".to_owned()
    } else {
        slug
    }
}

/// Ids already handed out in a document.
#[derive(Default)]
struct UsedIds {
    ids: HashSet<String>,
    /// Next suffix to try per slug.
    next: HashMap<String, usize>,
}

impl UsedIds {
    /// First of `slug`, `slug-1`, `slug-2`, ... not handed out yet.
    fn unique(&mut self, slug: &str) -> String {
        let mut id = slug.to_owned();
        let next = self.next.entry(slug.to_owned()).or_insert(0);
        while self.ids.contains(&id) {
            *next += 1;
            id = format!("{slug}-{next}");
        }
        self.ids.insert(id.clone());
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Section Title"), "section-title");
        assert_eq!(slugify("  Install `npm` now! "), "install-npm-now");
        assert_eq!(slugify("snake_case-and--dashes"), "snake-case-and-dashes");
        assert_eq!(slugify("Ünïcode Çafé"), "ünïcode-çafé");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify("?!"), "section");
    }

    #[test]
    fn test_unique_ids() {
        let mut used = UsedIds::default();
        assert_eq!(used.unique("faq"), "faq");
        assert_eq!(used.unique("faq"), "faq-1");
        assert_eq!(used.unique("faq"), "faq-2");
        assert_eq!(used.unique("intro"), "intro");
    }

    #[test]
    fn test_unique_ids_skip_taken_suffixes() {
        let mut used = UsedIds::default();
        assert_eq!(used.unique("faq"), "faq");
        assert_eq!(used.unique("faq"), "faq-1");
        assert_eq!(used.unique("faq-1"), "faq-1-1");

        let mut used = UsedIds::default();
        assert_eq!(used.unique("faq-1"), "faq-1");
        assert_eq!(used.unique("faq"), "faq");
        assert_eq!(used.unique("faq"), "faq-2");
    }
}
