//! Tag and global indices: accumulation, pagination, cross-linking.

pub(crate) const DEFAULT_PAGE_SIZE: usize = 10;

/// One page of an index.
///
/// The empty id names the global index; any other id is a tag.
// Serialization used in the templates
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct IndexPage {
    pub(crate) id: String,
    pub(crate) number: usize,
    pub(crate) posts: Vec<OrderedPage<Post>>,
}

/// Input actor (one worker) that files every post under the global index and
/// under each of its tags, then paginates and cross-links every index once
/// the input closes.
///
/// Within one index, pages come out newest-first (ascending page number);
/// across indices the order is unspecified.
pub(crate) fn indexer(
    name: &'static str,
    site: Arc<SiteData>,
    page_size: usize,
    input: Rx<Vec<OrderedPage<Post>>>,
    output: Tx<OrderedPage<IndexPage>>,
) -> impl Actor {
    // The global index exists even when there are no posts at all.
    let indices: Arc<Mutex<HashMap<String, Vec<OrderedPage<Post>>>>> =
        Arc::new(Mutex::new(HashMap::from([(String::new(), Vec::new())])));
    let ingest = Arc::clone(&indices);
    actor::sink_then(
        name,
        1,
        input,
        move |_, posts: Vec<OrderedPage<Post>>| {
            let mut indices = ingest.lock().unwrap();
            for post in posts {
                for tag in &post.page.content.tags {
                    indices
                        .entry(tag.text.clone())
                        .or_insert_with(Vec::new)
                        .push(post.clone());
                }
                indices
                    .entry(String::new())
                    .or_insert_with(Vec::new)
                    .push(post);
            }
            Ok(())
        },
        move |stop| {
            let indices = mem::take(&mut *indices.lock().unwrap());
            for (id, posts) in indices {
                log::info!(
                    "paginating {} ({} posts)",
                    match &*id {
                        "" => "the global index",
                        tag => tag,
                    },
                    posts.len(),
                );
                for page in paginate(&site, &id, posts, page_size)? {
                    output.send(stop, page)?;
                }
            }
            Ok(())
        },
    )
}

fn paginate(
    site: &SiteData,
    id: &str,
    mut posts: Vec<OrderedPage<Post>>,
    page_size: usize,
) -> anyhow::Result<Vec<OrderedPage<IndexPage>>> {
    // Each index owns its reference vector; sort it even though the global
    // slice already arrives ordered.
    posts.sort_unstable_by(|a, b| {
        b.page
            .order
            .cmp(&a.page.order)
            .then_with(|| a.page.path.cmp(&b.page.path))
    });

    let mut groups: Vec<Vec<OrderedPage<Post>>> = posts
        .chunks(page_size.max(1))
        .map(<[OrderedPage<Post>]>::to_vec)
        .collect();
    if groups.is_empty() {
        groups.push(Vec::new());
    }

    let pages = groups
        .into_iter()
        .enumerate()
        .map(|(number, posts)| {
            let path = page_path(id, number);
            let url = site
                .base_url
                .join(&path)
                .with_context(|| format!("cannot resolve `{path}` against the base URL"))?;
            Ok(Page {
                content: IndexPage {
                    id: id.to_owned(),
                    number,
                    posts,
                },
                order: number as i64,
                path,
                url,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    // Page 0 carries the newest posts, so ascending page number is already
    // newest-first.
    Ok(crosslink(pages))
}

/// Page 0 is `index.html`; later pages are `page-NNN.html`. Tag pages live
/// under the tag's directory.
pub(crate) fn page_path(id: &str, number: usize) -> String {
    let file = match number {
        0 => "index.html".to_owned(),
        n => format!("page-{n:03}.html"),
    };
    match id {
        "" => file,
        tag => format!("{tag}/{file}"),
    }
}


use crate::actor;
use crate::actor::Actor;
use crate::actor::Rx;
use crate::actor::Tx;
use crate::config::SiteData;
use crate::page::crosslink;
use crate::page::OrderedPage;
use crate::page::Page;
use crate::post::Post;
use anyhow::Context as _;
use serde::Serialize;
use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::sync::Mutex;
