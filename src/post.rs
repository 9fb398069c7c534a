//! Post sources: the frontmatter block, the markdown body, and the page they
//! become.

/// The YAML block between the `---` fences at the top of every post source.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Frontmatter {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) author: String,
    pub(crate) date: NaiveDate,
    #[serde(default, deserialize_with = "lowercased")]
    pub(crate) tags: Vec<String>,
}

/// A converted post as the templates and the feed see it.
// Serialization used in the templates
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Post {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) date: NaiveDate,
    pub(crate) tags: Vec<Tag>,
    /// The body after markdown conversion.
    pub(crate) body: String,
    /// An HTML prefix of the body, used on index pages and in feeds.
    pub(crate) snippet: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Tag {
    #[serde(rename = "Text")]
    pub(crate) text: String,
    /// Absolute URL of the tag's first index page.
    #[serde(rename = "URL")]
    pub(crate) url: Url,
}

const PARSE_WORKERS: usize = 8;

/// Map actor turning raw source files into pages ready for templating.
pub(crate) fn parser(
    name: &'static str,
    site: Arc<SiteData>,
    input: Rx<SourceFile>,
    output: Tx<Page<Post>>,
) -> impl Actor {
    actor::map(
        name,
        PARSE_WORKERS,
        input,
        output,
        move |_, file: SourceFile| {
            parse(&site, &file)
                .with_context(|| format!("failed to parse post `{}`", file.path.display()))
        },
    )
}

fn parse(site: &SiteData, file: &SourceFile) -> anyhow::Result<Page<Post>> {
    let (frontmatter, body) = split_fences(&file.bytes)?;
    let frontmatter: Frontmatter =
        serde_yaml::from_slice(frontmatter).context("invalid frontmatter YAML")?;
    convert(site, &file.path, frontmatter, body)
}

const START_FENCE: &[u8] = b"---\n";
const END_FENCE: &[u8] = b"\n---\n";

fn split_fences(bytes: &[u8]) -> anyhow::Result<(&[u8], &[u8])> {
    let rest = bytes
        .strip_prefix(START_FENCE)
        .ok_or(Error::MissingStartFence)?;
    let end = find(rest, END_FENCE).ok_or(Error::MissingEndFence)?;
    Ok((&rest[..end], &rest[end + END_FENCE.len()..]))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn convert(
    site: &SiteData,
    source_path: &Path,
    frontmatter: Frontmatter,
    body: &[u8],
) -> anyhow::Result<Page<Post>> {
    let path = output_path(source_path)?;
    let url = site
        .base_url
        .join(&path)
        .with_context(|| format!("cannot resolve `{path}` against the base URL"))?;

    let body = str::from_utf8(body).context("post body is not valid UTF-8")?;
    let body = markdown::to_html(body, &site.base_url, &url);
    let snippet = snippet(&body).to_owned();

    let tags = frontmatter
        .tags
        .into_iter()
        .map(|text| {
            let url = site
                .base_url
                .join(&format!("{text}/index.html"))
                .with_context(|| format!("cannot resolve tag `{text}` against the base URL"))?;
            Ok(Tag { text, url })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Page {
        order: order_key(frontmatter.date)?,
        content: Post {
            title: frontmatter.title,
            author: frontmatter.author,
            date: frontmatter.date,
            tags,
            body,
            snippet,
        },
        path,
        url,
    })
}

/// `<source>.md` becomes `posts/<source>.html`.
fn output_path(source: &Path) -> anyhow::Result<String> {
    let source = source
        .to_str()
        .with_context(|| format!("source path `{}` is not valid UTF-8", source.display()))?;
    let stem = source.strip_suffix(".md").unwrap_or(source);
    Ok(format!("posts/{stem}.html"))
}

/// A post's order key is its publication date at midnight UTC, in nanoseconds
/// since the epoch.
fn order_key(date: NaiveDate) -> anyhow::Result<i64> {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp_nanos_opt()
        .with_context(|| format!("date `{date}` does not fit in a nanosecond timestamp"))
}

const MORE_MARKER: &str = "<!-- more -->";
const PARAGRAPH_END: &str = "</p>";
const SNIPPET_CAP: usize = 1024;

/// The body prefix before the first `<!-- more -->` marker; failing that the
/// prefix through the first closing paragraph tag, capped at 1 KiB; failing
/// that, empty.
pub(crate) fn snippet(body: &str) -> &str {
    if let Some(i) = body.find(MORE_MARKER) {
        return &body[..i];
    }
    match body.find(PARAGRAPH_END) {
        Some(i) => {
            let end = cmp::min(i + PARAGRAPH_END.len(), SNIPPET_CAP);
            &body[..floor_char_boundary(body, end)]
        }
        None => "",
    }
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn lowercased<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let tags = Vec::<String>::deserialize(deserializer)?;
    Ok(tags.into_iter().map(|tag| tag.to_lowercase()).collect())
}


use crate::actor;
use crate::actor::Actor;
use crate::actor::Rx;
use crate::actor::Tx;
use crate::config::SiteData;
use crate::error::Error;
use crate::files::SourceFile;
use crate::page::Page;
use crate::util::markdown;
use anyhow::Context as _;
use chrono::NaiveDate;
use chrono::NaiveTime;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use std::cmp;
use std::path::Path;
use std::str;
use std::sync::Arc;
use url::Url;
