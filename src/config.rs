//! Site configuration and the shared site data record.

/// Optional `futhorc.jsonc` at the site root. Every field has a default.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Config {
    /// Absolute URL the generated site will be served under.
    pub(crate) site_root_url: Option<String>,

    /// Output directory, relative to the site directory.
    pub(crate) output_dir: Option<PathBuf>,

    /// Posts per index page.
    pub(crate) page_size: Option<usize>,

    /// Feed header metadata.
    pub(crate) title: Option<String>,
    pub(crate) author: Option<String>,
    pub(crate) description: Option<String>,
}

pub(crate) const CONFIG_FILE: &str = "futhorc.jsonc";

/// Loads `futhorc.jsonc` from the site directory; a missing file is just the
/// defaults.
#[context("failed to load configuration")]
pub(crate) fn load(site_dir: &Path) -> anyhow::Result<Config> {
    let path = site_dir.join(CONFIG_FILE);
    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read `{}`", path.display()))
        }
    };
    serde_json5::from_str(&source).with_context(|| format!("invalid `{}`", path.display()))
}

/// Picks the site base URL: the `--site-root` flag wins over `siteRootURL`,
/// and with neither the site is addressed by `file://` URLs under the output
/// directory. The result always ends in `/` so it resolves like a directory.
pub(crate) fn base_url(
    flag: Option<&str>,
    config: &Config,
    out_dir: &Path,
) -> anyhow::Result<Url> {
    let configured = flag.or(config.site_root_url.as_deref());
    let mut url = match configured {
        Some(raw) => {
            Url::parse(raw).with_context(|| format!("invalid site root URL `{raw}`"))?
        }
        None => {
            let abs = fs::canonicalize(out_dir).with_context(|| {
                format!("failed to resolve output directory `{}`", out_dir.display())
            })?;
            Url::from_directory_path(&abs).map_err(|()| {
                anyhow!("output directory `{}` is not absolute", abs.display())
            })?
        }
    };
    ensure!(
        !url.cannot_be_a_base(),
        "site root URL `{url}` cannot be a base"
    );
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) const FEED_TYPE: &str = "application/feed+json";
pub(crate) const THEME_ASSETS_PREFIX: &str = "static/theme";

/// Constructed once per run and shared read-only by every templater
/// invocation.
// Serialization used in the templates
#[derive(Debug, Serialize)]
pub(crate) struct SiteData {
    #[serde(rename = "BaseURL")]
    pub(crate) base_url: Url,
    #[serde(rename = "HomePage")]
    pub(crate) home_page: Url,
    #[serde(rename = "FeedURL")]
    pub(crate) feed_url: Url,
    #[serde(rename = "FeedType")]
    pub(crate) feed_type: &'static str,
    #[serde(rename = "ThemeAssets")]
    pub(crate) theme_assets: Url,
}

impl SiteData {
    /// `base_url` must be a directory URL ending in `/`, as produced by
    /// [`base_url`]; the joins below cannot fail on one.
    pub(crate) fn new(base_url: Url) -> Self {
        SiteData {
            home_page: base_url.clone(),
            feed_url: base_url.join("index.json").unwrap(),
            feed_type: FEED_TYPE,
            theme_assets: base_url.join(&format!("{THEME_ASSETS_PREFIX}/")).unwrap(),
            base_url,
        }
    }
}


use anyhow::anyhow;
use anyhow::ensure;
use anyhow::Context as _;
use fn_error_context::context;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use url::Url;
