//! DOM passes of the cleaner, each removing one class of noise.
//!
//! Every pass collects node ids first and detaches afterwards, since the
//! tree cannot be mutated while a selection borrows it.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Node, Selector};

use super::rules::{CompiledRules, fold_text};

/// Inline wrappers that are removed together with a phrase they hold.
const TEXT_WRAPPERS: &[&str] = &["p", "span", "li", "font", "strong", "em", "b", "i", "label"];

/// Detach every element matched by `selector` that `remove` accepts.
fn remove_matching(doc: &mut Html, selector: &Selector, mut remove: impl FnMut(ElementRef<'_>) -> bool) -> usize {
    let ids: Vec<_> = doc.select(selector).filter(|el| remove(*el)).map(|el| el.id()).collect();
    let count = ids.len();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
    count
}

fn is_structural(el: ElementRef<'_>) -> bool {
    matches!(el.value().name(), "html" | "head" | "body")
}

pub(crate) fn strip_unreadable(doc: &mut Html, rules: &CompiledRules) -> usize {
    rules.strip.iter().map(|sel| remove_matching(doc, sel, |_| true)).sum()
}

pub(crate) fn strip_chrome(doc: &mut Html, rules: &CompiledRules) -> usize {
    rules
        .chrome
        .iter()
        .map(|sel| remove_matching(doc, sel, |el| !is_structural(el)))
        .sum()
}

pub(crate) fn strip_iframes(doc: &mut Html, rules: &CompiledRules) -> usize {
    remove_matching(doc, &rules.iframe, |_| true)
}

/// Whether the element's text or any attribute in its subtree contains the
/// folded phrase.
fn mentions(el: ElementRef<'_>, phrase: &str) -> bool {
    if fold_text(&el.text().collect::<String>()).contains(phrase) {
        return true;
    }
    el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|d| d.value().attrs().any(|(_, value)| fold_text(value).contains(phrase)))
}

/// The innermost element carrying a phrase: it mentions it, none of its
/// child elements do.
fn is_phrase_leaf(el: ElementRef<'_>, phrase: &str) -> bool {
    mentions(el, phrase) && !el.children().filter_map(ElementRef::wrap).any(|child| mentions(child, phrase))
}

/// What to remove for a phrase leaf: the nearest configured container, else
/// the enclosing text wrapper, else the leaf itself.
fn removal_target<'a>(leaf: ElementRef<'a>, rules: &CompiledRules) -> ElementRef<'a> {
    let lineage = std::iter::once(leaf).chain(leaf.ancestors().filter_map(ElementRef::wrap));
    for el in lineage {
        if is_structural(el) {
            break;
        }
        if rules.containers.iter().any(|sel| sel.matches(&el)) {
            return el;
        }
    }

    match leaf.parent().and_then(ElementRef::wrap) {
        Some(parent) if !is_structural(parent) && TEXT_WRAPPERS.contains(&parent.value().name()) => parent,
        _ => leaf,
    }
}

pub(crate) fn remove_phrases(doc: &mut Html, rules: &CompiledRules) -> usize {
    if rules.phrases.is_empty() {
        return 0;
    }

    let targets: HashSet<_> = doc
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !is_structural(*el))
        .filter(|el| rules.phrases.iter().any(|phrase| is_phrase_leaf(*el, phrase)))
        .map(|leaf| removal_target(leaf, rules))
        .filter(|target| !is_structural(*target))
        .map(|target| target.id())
        .collect();

    let count = targets.len();
    for id in targets {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
    count
}

/// Drop repeated `h2`/`h3` headings with identical text, keeping the first.
pub(crate) fn dedupe_headings(doc: &mut Html, rules: &CompiledRules) -> usize {
    if !rules.dedupe_headings {
        return 0;
    }

    let mut seen = HashSet::new();
    remove_matching(doc, &rules.headings, |el| {
        let text = fold_text(&el.text().collect::<String>());
        if text.is_empty() {
            return false;
        }
        !seen.insert(format!("{}:{}", el.value().name(), text))
    })
}

fn is_decorative_image(img: ElementRef<'_>, rules: &CompiledRules) -> bool {
    let spacer = match img.value().attr("src").map(str::trim) {
        None | Some("") => true,
        Some(src) => {
            let src = src.to_ascii_lowercase();
            src.starts_with("data:image/gif;base64") || src.contains("spacer")
        }
    };
    if spacer {
        return true;
    }

    if img.value().classes().any(|class| class.to_ascii_lowercase().contains("icon")) {
        return true;
    }

    img.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| rules.image_containers.iter().any(|sel| sel.matches(&ancestor)))
}

pub(crate) fn remove_images(doc: &mut Html, rules: &CompiledRules) -> usize {
    remove_matching(doc, &rules.img, |img| is_decorative_image(img, rules))
}

pub(crate) fn remove_empty_paragraphs(doc: &mut Html, rules: &CompiledRules) -> usize {
    remove_matching(doc, &rules.paragraph, |p| {
        let blank = p.text().all(|text| fold_text(text).is_empty());
        blank && p.select(&rules.media).next().is_none()
    })
}

/// The parser drops one newline right after `<pre>`, `<textarea>` and
/// `<listing>` and the serializer never writes it back. Double a leading
/// newline so the serialized output parses to the same text.
pub(crate) fn keep_leading_newlines(doc: &mut Html, rules: &CompiledRules) {
    let ids: Vec<_> = doc
        .select(&rules.preformatted)
        .filter_map(|el| el.first_child())
        .filter(|child| child.value().as_text().is_some_and(|text| text.starts_with('\n')))
        .map(|child| child.id())
        .collect();

    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id)
            && let Node::Text(text) = node.value()
        {
            text.text = format!("\n{}", &*text.text).into();
        }
    }
}
