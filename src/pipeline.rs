//! The site-generation graph: every actor, wired by rendezvous channels.
//!
//! ```text
//! theme-finder ──► theme-copier
//! source-finder ──► source-reader ──► post-parser ──► orderer ─┬─► post-templater
//!                                                              └─► indexer ──► fan-out ─┬─► index-templater
//!                                                                                       └─► feed-builder
//! ```

pub(crate) fn generate(
    site_dir: &Path,
    out_dir: &Path,
    site: &Arc<SiteData>,
    metadata: &FeedMetadata,
    theme: &Theme,
    page_size: usize,
) -> anyhow::Result<()> {
    let posts_dir = site_dir.join("posts");
    let static_dir = site_dir.join("theme/static");

    let (source_path_tx, source_path_rx) = actor::pipe();
    let (source_file_tx, source_file_rx) = actor::pipe();
    let (post_tx, post_rx) = actor::pipe();
    let (all_posts_tx, all_posts_rx) = actor::pipe();
    let (each_post_tx, each_post_rx) = actor::pipe();
    let (index_tx, index_rx) = actor::pipe();
    let (index_page_tx, index_page_rx) = actor::pipe();
    let (feed_page_tx, feed_page_rx) = actor::pipe();

    let mut actors: Vec<Box<dyn Actor + '_>> = vec![
        Box::new(files::finder(
            "source-finder",
            posts_dir.clone(),
            ".md",
            source_path_tx,
        )),
        Box::new(files::reader(
            "source-reader",
            posts_dir,
            source_path_rx,
            source_file_tx,
        )),
        Box::new(post::parser(
            "post-parser",
            Arc::clone(site),
            source_file_rx,
            post_tx,
        )),
        Box::new(order::orderer(
            "orderer",
            post_rx,
            all_posts_tx,
            each_post_tx,
        )),
        Box::new(index::indexer(
            "indexer",
            Arc::clone(site),
            page_size,
            all_posts_rx,
            index_tx,
        )),
        Box::new(actor::fan_out(
            "index-fan-out",
            index_rx,
            vec![index_page_tx, feed_page_tx],
        )),
        Box::new(templater::pages(
            "post-templater",
            out_dir.to_owned(),
            theme.templater.clone(),
            theme.post_root.clone(),
            Arc::clone(site),
            each_post_rx,
        )),
        Box::new(templater::pages(
            "index-templater",
            out_dir.to_owned(),
            theme.templater.clone(),
            theme.index_root.clone(),
            Arc::clone(site),
            index_page_rx,
        )),
        Box::new(feed::builder(
            "feed-builder",
            out_dir.to_owned(),
            Arc::clone(site),
            metadata.clone(),
            feed_page_rx,
        )),
    ];

    if static_dir.is_dir() {
        let (asset_tx, asset_rx) = actor::pipe();
        actors.push(Box::new(files::finder(
            "theme-finder",
            static_dir.clone(),
            "",
            asset_tx,
        )));
        actors.push(Box::new(files::copier(
            "theme-copier",
            static_dir,
            out_dir.join(THEME_ASSETS_PREFIX),
            asset_rx,
        )));
    } else {
        log::warn!("no theme assets at `{}`", static_dir.display());
    }

    actor::run_all(actors)
}


use crate::actor;
use crate::actor::Actor;
use crate::config::SiteData;
use crate::config::THEME_ASSETS_PREFIX;
use crate::feed;
use crate::feed::FeedMetadata;
use crate::files;
use crate::index;
use crate::order;
use crate::post;
use crate::templater;
use crate::theme::Theme;
use std::path::Path;
use std::sync::Arc;
