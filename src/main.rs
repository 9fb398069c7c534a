#![warn(
    noop_method_call,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications,
    clippy::pedantic
)]
#![allow(
    clippy::cast_possible_wrap,
    clippy::items_after_statements,
    clippy::match_bool,
    clippy::too_many_lines
)]

mod actor;
mod error;
mod feed;
mod files;
mod index;
mod order;
mod page;
mod pipeline;
mod post;
mod templater;
mod theme;

mod config;
use config::SiteData;

mod util;

/// Batch static site generator: markdown posts in, a deployable tree of
/// pages, indices, and feeds out.
#[derive(clap::Parser)]
struct Args {
    /// Site directory to build.
    #[clap(default_value = ".")]
    site: PathBuf,

    /// Absolute URL of the site root, overriding `siteRootURL`.
    #[clap(long)]
    site_root: Option<String>,

    /// Output directory. Defaults to `_site` inside the site directory.
    #[clap(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_custom_env("LOG_LEVEL");

    let args: Args = clap::Parser::parse();

    let config = config::load(&args.site)?;

    let out_dir = args
        .output
        .or_else(|| config.output_dir.as_ref().map(|dir| args.site.join(dir)))
        .unwrap_or_else(|| args.site.join("_site"));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create `{}`", out_dir.display()))?;

    let base_url = config::base_url(args.site_root.as_deref(), &config, &out_dir)?;
    log::info!("building {} under {base_url}", args.site.display());

    let site = Arc::new(SiteData::new(base_url));
    let metadata = feed::FeedMetadata {
        title: config.title.clone().unwrap_or_default(),
        author: config.author.clone().unwrap_or_default(),
        description: config.description.clone().unwrap_or_default(),
    };
    let theme = theme::load(&args.site.join("theme"))?;

    pipeline::generate(
        &args.site,
        &out_dir,
        &site,
        &metadata,
        &theme,
        config.page_size.unwrap_or(index::DEFAULT_PAGE_SIZE),
    )?;

    log::info!("site built in {}", out_dir.display());
    Ok(())
}

use anyhow::Context as _;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
