//! The fundamental unit of output: a rendered file with ordering metadata.

/// One output page: content, the output path relative to the output root,
/// the absolute URL the page will live at, and its order key.
// Serialization used in the templates
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Page<T> {
    #[serde(rename = "Content")]
    pub(crate) content: T,
    #[serde(rename = "Path")]
    pub(crate) path: String,
    #[serde(rename = "URL")]
    pub(crate) url: Url,
    #[serde(rename = "Order")]
    pub(crate) order: i64,
}

/// A page cross-linked to its neighbours.
///
/// Position 0 of every ordered sequence is the newest element: `next` points
/// at the newer neighbour, `prev` at the older one.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct OrderedPage<T> {
    #[serde(flatten)]
    pub(crate) page: Arc<Page<T>>,
    #[serde(rename = "Next", skip_serializing_if = "Option::is_none")]
    pub(crate) next: Option<Url>,
    #[serde(rename = "Prev", skip_serializing_if = "Option::is_none")]
    pub(crate) prev: Option<Url>,
}

/// Sorts newest-first: descending order key, ties broken by ascending path so
/// every run orders the same.
pub(crate) fn sort_newest_first<T>(pages: &mut [Page<T>]) {
    pages.sort_unstable_by(|a, b| b.order.cmp(&a.order).then_with(|| a.path.cmp(&b.path)));
}

/// Links each page to its neighbours. `pages` must already be newest-first.
pub(crate) fn crosslink<T>(pages: Vec<Page<T>>) -> Vec<OrderedPage<T>> {
    let urls: Vec<Url> = pages.iter().map(|page| page.url.clone()).collect();
    pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| OrderedPage {
            page: Arc::new(page),
            next: i.checked_sub(1).map(|newer| urls[newer].clone()),
            prev: urls.get(i + 1).cloned(),
        })
        .collect()
}


use serde::Serialize;
use std::sync::Arc;
use url::Url;
