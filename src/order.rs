//! The Orderer: the single point where every post is collected, sorted, and
//! cross-linked.

/// Input actor (strictly one worker: ingest is serial) that accumulates every
/// parsed post. Once the input closes it sorts newest-first, links
/// neighbours, emits the whole ordered vector once for the indexer, then
/// each page individually for the post templater. Both outputs close when
/// the actor exits.
pub(crate) fn orderer(
    name: &'static str,
    input: Rx<Page<Post>>,
    all_output: Tx<Vec<OrderedPage<Post>>>,
    each_output: Tx<OrderedPage<Post>>,
) -> impl Actor {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let ingest = Arc::clone(&collected);
    actor::sink_then(
        name,
        1,
        input,
        move |_, page: Page<Post>| {
            ingest.lock().unwrap().push(page);
            Ok(())
        },
        move |stop| {
            let mut pages = mem::take(&mut *collected.lock().unwrap());
            log::info!("ordering {} posts", pages.len());
            sort_newest_first(&mut pages);
            let ordered = crosslink(pages);

            all_output.send(stop, ordered.clone())?;
            for page in ordered {
                each_output.send(stop, page)?;
            }
            Ok(())
        },
    )
}


use crate::actor;
use crate::actor::Actor;
use crate::actor::Rx;
use crate::actor::Tx;
use crate::page::crosslink;
use crate::page::sort_newest_first;
use crate::page::OrderedPage;
use crate::page::Page;
use crate::post::Post;
use std::mem;
use std::sync::Arc;
use std::sync::Mutex;
