//! Markdown-to-HTML conversion with the site's link and heading rules.
//!
//! Link destinations are rewritten while rendering: a bare absolute path
//! resolves against the base URL's path, anything else against the page's own
//! URL, and an in-site destination ending in `.md` gets an `.html` extension.
//! Headings are pushed down by [`HEADING_DELTA`] because the site header
//! occupies `<h1>` and the post title `<h2>`. Footnote anchors are rendered
//! absolute so a snippet embedded elsewhere still points back into its page.

/// How far headings are pushed down, clamped at `<h6>`.
const HEADING_DELTA: u8 = 2;

pub(crate) fn to_html(source: &str, base: &Url, page: &Url) -> String {
    let options = pulldown_cmark::Options::empty()
        | pulldown_cmark::Options::ENABLE_STRIKETHROUGH
        | pulldown_cmark::Options::ENABLE_FOOTNOTES;

    Renderer {
        parser: pulldown_cmark::Parser::new_ext(source, options),
        body: String::new(),
        base,
        page,
        footnotes: HashMap::new(),
    }
    .render()
}

struct Renderer<'a> {
    parser: pulldown_cmark::Parser<'a, 'a>,
    body: String,
    base: &'a Url,
    page: &'a Url,
    /// Footnote numbers by label, in order of first appearance.
    footnotes: HashMap<String, usize>,
}

impl<'a> Renderer<'a> {
    fn render(mut self) -> String {
        while let Some(event) = self.parser.next() {
            match event {
                pulldown_cmark::Event::Start(tag) => self.start_tag(tag),
                pulldown_cmark::Event::End(tag) => self.end_tag(tag),
                pulldown_cmark::Event::Text(text) => escape_html(&mut self.body, &text).unwrap(),
                pulldown_cmark::Event::Code(text) => {
                    self.body.push_str("<code>");
                    escape_html(&mut self.body, &text).unwrap();
                    self.body.push_str("</code>");
                }
                pulldown_cmark::Event::Html(html) => self.body.push_str(&html),
                pulldown_cmark::Event::SoftBreak => self.body.push_str(" "),
                pulldown_cmark::Event::HardBreak => self.body.push_str("<br>"),
                pulldown_cmark::Event::Rule => self.body.push_str("<hr>"),
                pulldown_cmark::Event::FootnoteReference(label) => {
                    let n = self.footnote_number(&label);
                    write!(
                        self.body,
                        "<sup class=\"footnote-ref\" id=\"fnref:{n}\"><a href=\"",
                    )
                    .unwrap();
                    escape_html(&mut self.body, self.page.as_str()).unwrap();
                    write!(self.body, "#fn:{n}\">{n}</a></sup>").unwrap();
                }
                // We do not enable this extension
                pulldown_cmark::Event::TaskListMarker(_) => unreachable!(),
            }
        }
        self.body
    }

    fn start_tag(&mut self, tag: pulldown_cmark::Tag<'a>) {
        match tag {
            pulldown_cmark::Tag::Paragraph => self.body.push_str("<p>"),
            pulldown_cmark::Tag::Heading(level, _id, _classes) => {
                write!(self.body, "<h{}>", deprecated(level)).unwrap();
            }
            pulldown_cmark::Tag::BlockQuote => self.body.push_str("<blockquote>"),
            pulldown_cmark::Tag::CodeBlock(_) => self.body.push_str("<pre><code>"),
            pulldown_cmark::Tag::List(Some(1)) => self.body.push_str("<ol>"),
            pulldown_cmark::Tag::List(Some(start)) => {
                write!(self.body, "<ol start='{start}'>").unwrap();
            }
            pulldown_cmark::Tag::List(None) => self.body.push_str("<ul>"),
            pulldown_cmark::Tag::Item => self.body.push_str("<li>"),
            pulldown_cmark::Tag::Emphasis => self.body.push_str("<em>"),
            pulldown_cmark::Tag::Strong => self.body.push_str("<strong>"),
            pulldown_cmark::Tag::Strikethrough => self.body.push_str("<del>"),
            pulldown_cmark::Tag::Link(_type, dest, title) => {
                self.body.push_str("<a href='");
                match self.patch_link(&dest) {
                    Some(url) => escape_html(&mut self.body, url.as_str()).unwrap(),
                    None => escape_html(&mut self.body, &dest).unwrap(),
                }
                if !title.is_empty() {
                    self.body.push_str("' title='");
                    escape_html(&mut self.body, &title).unwrap();
                }
                self.body.push_str("'>");
            }
            pulldown_cmark::Tag::Image(_, url, title) => {
                self.body.push_str("<img src='");
                escape_html(&mut self.body, &url).unwrap();
                self.body.push_str("' alt='");
                while let Some(event) = self.parser.next() {
                    match event {
                        pulldown_cmark::Event::End(_) => break,
                        pulldown_cmark::Event::Text(text) => {
                            escape_html(&mut self.body, &text).unwrap();
                        }
                        pulldown_cmark::Event::SoftBreak
                        | pulldown_cmark::Event::HardBreak => self.body.push_str(" "),
                        _ => {}
                    }
                }
                if !title.is_empty() {
                    self.body.push_str("' title='");
                    escape_html(&mut self.body, &title).unwrap();
                }
                self.body.push_str("'>");
            }
            pulldown_cmark::Tag::FootnoteDefinition(label) => {
                let n = self.footnote_number(&label);
                write!(self.body, "<div class=\"footnote\" id=\"fn:{n}\">").unwrap();
            }
            // We do not enable this extension
            pulldown_cmark::Tag::Table(_)
            | pulldown_cmark::Tag::TableHead
            | pulldown_cmark::Tag::TableRow
            | pulldown_cmark::Tag::TableCell => unreachable!(),
        }
    }

    fn end_tag(&mut self, tag: pulldown_cmark::Tag<'a>) {
        match tag {
            pulldown_cmark::Tag::Paragraph => self.body.push_str("</p>"),
            pulldown_cmark::Tag::Heading(level, _id, _classes) => {
                write!(self.body, "</h{}>", deprecated(level)).unwrap();
            }
            pulldown_cmark::Tag::BlockQuote => self.body.push_str("</blockquote>"),
            pulldown_cmark::Tag::CodeBlock(_) => self.body.push_str("</code></pre>"),
            pulldown_cmark::Tag::List(Some(_)) => self.body.push_str("</ol>"),
            pulldown_cmark::Tag::List(None) => self.body.push_str("</ul>"),
            pulldown_cmark::Tag::Item => self.body.push_str("</li>"),
            pulldown_cmark::Tag::Emphasis => self.body.push_str("</em>"),
            pulldown_cmark::Tag::Strong => self.body.push_str("</strong>"),
            pulldown_cmark::Tag::Strikethrough => self.body.push_str("</del>"),
            pulldown_cmark::Tag::Link(_, _, _) => self.body.push_str("</a>"),
            pulldown_cmark::Tag::FootnoteDefinition(_) => self.body.push_str("</div>"),
            // We do not enable this extension
            pulldown_cmark::Tag::Table(_)
            | pulldown_cmark::Tag::TableHead
            | pulldown_cmark::Tag::TableRow
            | pulldown_cmark::Tag::TableCell
            // We handle closing of this tag in the opening logic
            | pulldown_cmark::Tag::Image(_, _, _) => unreachable!(),
        }
    }

    /// The patched destination, or `None` (with a warning logged) when the
    /// destination is empty or does not parse as a URL; the link is then left
    /// as written.
    fn patch_link(&self, dest: &str) -> Option<Url> {
        if dest.is_empty() {
            return None;
        }
        let resolved = if dest.starts_with('/') && !dest.starts_with("//") {
            // A bare absolute path is site-rooted, not host-rooted.
            self.base.join(&dest[1..])
        } else {
            self.page.join(dest)
        };
        let mut url = match resolved {
            Ok(url) => url,
            Err(e) => {
                log::warn!("invalid link URL `{dest}` in {}: {e}", self.page);
                return None;
            }
        };
        if url.as_str().starts_with(self.base.as_str()) {
            if let Some(stem) = url.path().strip_suffix(".md") {
                let path = format!("{stem}.html");
                url.set_path(&path);
            }
        }
        Some(url)
    }

    fn footnote_number(&mut self, label: &str) -> usize {
        let next = self.footnotes.len() + 1;
        *self.footnotes.entry(label.to_owned()).or_insert(next)
    }
}

fn deprecated(level: pulldown_cmark::HeadingLevel) -> u8 {
    cmp::min(level as u8 + HEADING_DELTA, 6)
}

#[cfg(test)]
mod tests {
    fn render(source: &str) -> String {
        let base = Url::parse("https://blog.example/").unwrap();
        let page = base.join("posts/hello.html").unwrap();
        to_html(source, &base, &page)
    }

    #[test]
    fn paragraphs_and_spacing() {
        assert_eq!(render("Hi."), "<p>Hi.</p>");
        assert_eq!(render("foo\nbar"), "<p>foo bar</p>");
        assert_eq!(render("foo  \nbar"), "<p>foo<br>bar</p>");
        assert_eq!(render("a\n\nb"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn headings_are_deprecated_by_two() {
        assert_eq!(render("# Title\n## Sub"), "<h3>Title</h3><h4>Sub</h4>");
    }

    #[test]
    fn deep_headings_clamp_at_six() {
        assert_eq!(render("##### Fine\n###### Deep"), "<h6>Fine</h6><h6>Deep</h6>");
    }

    #[test]
    fn relative_markdown_links_become_absolute_html() {
        assert_eq!(
            render("[next](./other.md)"),
            "<p><a href='https://blog.example/posts/other.html'>next</a></p>",
        );
    }

    #[test]
    fn bare_absolute_paths_resolve_against_the_site_root() {
        assert_eq!(
            render("[x](/absolute/path.md)"),
            "<p><a href='https://blog.example/absolute/path.html'>x</a></p>",
        );
    }

    #[test]
    fn offsite_markdown_links_keep_their_extension() {
        assert_eq!(
            render("[e](https://other.example/doc.md)"),
            "<p><a href='https://other.example/doc.md'>e</a></p>",
        );
    }

    #[test]
    fn unparseable_destinations_are_left_as_written() {
        assert_eq!(
            render("[bad](http://[)"),
            "<p><a href='http://['>bad</a></p>",
        );
    }

    #[test]
    fn footnote_anchors_are_absolute() {
        assert_eq!(
            render("Hi[^note].\n\n[^note]: The note."),
            "<p>Hi<sup class=\"footnote-ref\" id=\"fnref:1\">\
             <a href=\"https://blog.example/posts/hello.html#fn:1\">1</a></sup>.</p>\
             <div class=\"footnote\" id=\"fn:1\"><p>The note.</p></div>",
        );
    }

    #[test]
    fn inline_and_block_code() {
        assert_eq!(render("`let x = 5;`"), "<p><code>let x = 5;</code></p>");
        assert_eq!(render("```\ncode\n```"), "<pre><code>code\n</code></pre>");
    }

    #[test]
    fn lists_and_emphasis() {
        assert_eq!(
            render("- *a*\n- **b**"),
            "<ul><li><em>a</em></li><li><strong>b</strong></li></ul>",
        );
        assert_eq!(
            render("1. one\n1. two"),
            "<ol><li>one</li><li>two</li></ol>",
        );
    }

    #[test]
    fn snippet_marker_survives_as_raw_html() {
        assert_eq!(
            render("Hi.\n\n<!-- more -->\n\nMore."),
            "<p>Hi.</p><!-- more -->\n<p>More.</p>",
        );
    }

    #[test]
    fn empty_destinations_are_left_alone() {
        assert_eq!(render("[nowhere]()"), "<p><a href=''>nowhere</a></p>");
    }

    #[test]
    fn fragment_links_resolve_against_the_page() {
        assert_eq!(
            render("[above](#section)"),
            "<p><a href='https://blog.example/posts/hello.html#section'>above</a></p>",
        );
    }

    #[test]
    fn blockquotes_rules_and_strikethrough() {
        assert_eq!(render("> foo"), "<blockquote><p>foo</p></blockquote>");
        assert_eq!(render("foo\n\n---"), "<p>foo</p><hr>");
        assert_eq!(render("~~not~~ good"), "<p><del>not</del> good</p>");
    }

    #[test]
    fn images_pass_through_unrewritten() {
        assert_eq!(
            render("![a nice image](image.jpg)"),
            "<p><img src='image.jpg' alt='a nice image'></p>",
        );
    }

    use super::to_html;
    use url::Url;
}

use pulldown_cmark::escape::escape_html;
use std::cmp;
use std::collections::HashMap;
use std::fmt::Write as _;
use url::Url;
