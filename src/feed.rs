//! JSON Feed documents, emitted for the global index only.

/// Fixed header fields shared by every feed document, from `futhorc.jsonc`.
#[derive(Debug, Clone, Default)]
pub(crate) struct FeedMetadata {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) description: String,
}

const FEED_WORKERS: usize = 8;
const VERSION: &str = "https://jsonfeed.org/version/1";

/// Input actor mirroring each global index page to a `.json` feed document.
/// Tag index pages are skipped silently.
pub(crate) fn builder(
    name: &'static str,
    out_dir: PathBuf,
    site: Arc<SiteData>,
    metadata: FeedMetadata,
    input: Rx<OrderedPage<IndexPage>>,
) -> impl Actor {
    actor::sink(
        name,
        FEED_WORKERS,
        input,
        move |_, page: OrderedPage<IndexPage>| {
            if !page.page.content.id.is_empty() {
                return Ok(());
            }
            let json_path = feed_path(&page.page.path);
            let path = out_dir.join(&json_path);
            let feed = build(&site, &metadata, &page, &json_path)?;

            make_parents(&path)?;
            let file = File::create(&path)
                .with_context(|| format!("failed to create `{}`", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &feed)
                .with_context(|| format!("failed to write `{}`", path.display()))?;
            writer
                .flush()
                .with_context(|| format!("failed to write `{}`", path.display()))?;
            log::info!("emitted {}", path.display());
            Ok(())
        },
    )
}

/// Feed paths mirror index page paths with a `.json` extension.
fn feed_path(page_path: &str) -> String {
    match page_path.strip_suffix(".html") {
        Some(stem) => format!("{stem}.json"),
        None => format!("{page_path}.json"),
    }
}

#[derive(Serialize)]
struct Feed<'a> {
    version: &'static str,
    title: &'a str,
    home_page_url: &'a Url,
    feed_url: Url,
    description: &'a str,
    author: Author<'a>,
    /// The older sibling page, when there is one. Non-standard but widely
    /// understood by readers.
    #[serde(skip_serializing_if = "Option::is_none")]
    next_url: Option<&'a Url>,
    items: Vec<Item<'a>>,
}

#[derive(Serialize)]
struct Author<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct Item<'a> {
    id: &'a Url,
    url: &'a Url,
    title: &'a str,
    content_html: &'a str,
    date_published: String,
    author: Author<'a>,
}

fn build<'a>(
    site: &'a SiteData,
    metadata: &'a FeedMetadata,
    page: &'a OrderedPage<IndexPage>,
    json_path: &str,
) -> anyhow::Result<Feed<'a>> {
    let items = page
        .page
        .content
        .posts
        .iter()
        .map(|post| Item {
            id: &post.page.url,
            url: &post.page.url,
            title: &post.page.content.title,
            content_html: &post.page.content.snippet,
            date_published: published(post.page.content.date),
            author: Author {
                name: &post.page.content.author,
            },
        })
        .collect();

    Ok(Feed {
        version: VERSION,
        title: &metadata.title,
        home_page_url: &page.page.url,
        feed_url: site
            .base_url
            .join(json_path)
            .with_context(|| format!("cannot resolve `{json_path}` against the base URL"))?,
        description: &metadata.description,
        author: Author {
            name: &metadata.author,
        },
        next_url: page.prev.as_ref(),
        items,
    })
}

fn published(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    fn site() -> Arc<SiteData> {
        Arc::new(SiteData::new(Url::parse("https://blog.example/").unwrap()))
    }

    fn post(site: &SiteData, name: &str, date: &str) -> OrderedPage<Post> {
        let path = format!("posts/{name}.html");
        let url = site.base_url.join(&path).unwrap();
        OrderedPage {
            page: Arc::new(Page {
                content: Post {
                    title: name.to_owned(),
                    author: "A".to_owned(),
                    date: date.parse().unwrap(),
                    tags: Vec::new(),
                    body: format!("<p>{name} body</p>"),
                    snippet: format!("<p>{name} body</p>"),
                },
                path,
                url,
                order: 0,
            }),
            next: None,
            prev: None,
        }
    }

    fn index_page(
        site: &SiteData,
        id: &str,
        number: usize,
        posts: Vec<OrderedPage<Post>>,
    ) -> OrderedPage<IndexPage> {
        let path = crate::index::page_path(id, number);
        let url = site.base_url.join(&path).unwrap();
        OrderedPage {
            page: Arc::new(Page {
                content: IndexPage {
                    id: id.to_owned(),
                    number,
                    posts,
                },
                path,
                url,
                order: number as i64,
            }),
            next: None,
            prev: None,
        }
    }

    fn run(pages: Vec<OrderedPage<IndexPage>>, out: &Path, metadata: FeedMetadata) {
        let (tx, rx) = actor::pipe();
        let mut pending = pages;
        let actors: Vec<Box<dyn Actor + '_>> = vec![
            Box::new(actor::source("pages", 1, tx, move |_| Ok(pending.pop()))),
            Box::new(builder(
                "feed-builder",
                out.to_owned(),
                site(),
                metadata,
                rx,
            )),
        ];
        actor::run_all(actors).unwrap();
    }

    #[test]
    fn one_post_makes_one_item_and_no_next_url() {
        let out = tempfile::tempdir().unwrap();
        let site = site();
        let page = index_page(&site, "", 0, vec![post(&site, "hello", "2020-01-01")]);
        run(
            vec![page],
            out.path(),
            FeedMetadata {
                title: "The Blog".to_owned(),
                author: "A".to_owned(),
                description: "words".to_owned(),
            },
        );

        let feed: serde_json::Value =
            serde_json::from_slice(&fs::read(out.path().join("index.json")).unwrap()).unwrap();
        assert_eq!(feed["version"], "https://jsonfeed.org/version/1");
        assert_eq!(feed["title"], "The Blog");
        assert_eq!(feed["home_page_url"], "https://blog.example/index.html");
        assert_eq!(feed["feed_url"], "https://blog.example/index.json");
        assert!(feed.get("next_url").is_none());

        let items = feed["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["url"], "https://blog.example/posts/hello.html");
        assert_eq!(items[0]["date_published"], "2020-01-01T00:00:00Z");
        assert_eq!(items[0]["author"]["name"], "A");
        assert_eq!(items[0]["content_html"], "<p>hello body</p>");
    }

    #[test]
    fn next_url_points_at_the_older_page() {
        let out = tempfile::tempdir().unwrap();
        let site = site();
        let mut page = index_page(&site, "", 0, vec![post(&site, "hello", "2020-01-01")]);
        page.prev = Some(site.base_url.join("page-001.html").unwrap());
        run(vec![page], out.path(), FeedMetadata::default());

        let feed: serde_json::Value =
            serde_json::from_slice(&fs::read(out.path().join("index.json")).unwrap()).unwrap();
        assert_eq!(feed["next_url"], "https://blog.example/page-001.html");
    }

    #[test]
    fn tag_index_pages_get_no_feed() {
        let out = tempfile::tempdir().unwrap();
        let site = site();
        let global = index_page(&site, "", 0, vec![post(&site, "hello", "2020-01-01")]);
        let tagged = index_page(&site, "golang", 0, vec![post(&site, "hello", "2020-01-01")]);
        run(vec![global, tagged], out.path(), FeedMetadata::default());

        assert!(out.path().join("index.json").exists());
        assert!(!out.path().join("golang/index.json").exists());
        assert!(!out.path().join("golang").exists());
    }

    #[test]
    fn later_pages_mirror_their_page_path() {
        assert_eq!(super::feed_path("index.html"), "index.json");
        assert_eq!(super::feed_path("page-001.html"), "page-001.json");
    }

    use super::builder;
    use super::FeedMetadata;
    use crate::actor;
    use crate::actor::Actor;
    use crate::config::SiteData;
    use crate::index::IndexPage;
    use crate::page::OrderedPage;
    use crate::page::Page;
    use crate::post::Post;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use url::Url;
}

use crate::actor;
use crate::actor::Actor;
use crate::actor::Rx;
use crate::config::SiteData;
use crate::index::IndexPage;
use crate::page::OrderedPage;
use crate::util::make_parents;
use anyhow::Context as _;
use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::SecondsFormat;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;
