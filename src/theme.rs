//! Theme loading: the manifest and the two template sets.

/// `theme.jsonc`: ordered lists of template files, relative to the theme
/// directory. Each list is registered as one set and its first entry is the
/// root template; the rest are partials it may reference by file stem.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    index_template: Vec<String>,
    post_template: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct Theme {
    pub(crate) templater: Templater,
    /// Root template name for post pages.
    pub(crate) post_root: String,
    /// Root template name for index pages.
    pub(crate) index_root: String,
}

pub(crate) const MANIFEST_FILE: &str = "theme.jsonc";

#[context("failed to load theme from `{}`", theme_dir.display())]
pub(crate) fn load(theme_dir: &Path) -> anyhow::Result<Theme> {
    let manifest_path = theme_dir.join(MANIFEST_FILE);
    let source = fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read `{}`", manifest_path.display()))?;
    let manifest: Manifest = serde_json5::from_str(&source)
        .with_context(|| format!("invalid `{}`", manifest_path.display()))?;

    let mut handlebars = Handlebars::new();
    for path in manifest.index_template.iter().chain(&manifest.post_template) {
        let full = theme_dir.join(path);
        let source = fs::read_to_string(&full)
            .with_context(|| format!("failed to read template `{}`", full.display()))?;
        handlebars
            .register_template_string(&stem(path)?, source)
            .with_context(|| format!("failed to compile template `{}`", full.display()))?;
    }

    let index_root = manifest
        .index_template
        .first()
        .context("`indexTemplate` names no files")?;
    let post_root = manifest
        .post_template
        .first()
        .context("`postTemplate` names no files")?;
    Ok(Theme {
        templater: Templater::new(handlebars),
        index_root: stem(index_root)?,
        post_root: stem(post_root)?,
    })
}

fn stem(path: &str) -> anyhow::Result<String> {
    Path::new(path)
        .file_stem()
        .and_then(OsStr::to_str)
        .map(str::to_owned)
        .with_context(|| format!("template path `{path}` has no usable file name"))
}

#[cfg(test)]
mod tests {
    #[test]
    fn loads_both_template_sets() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            "{\n\
                // the shared layout comes last in each set\n\
                indexTemplate: [\"index.hbs\", \"layout.hbs\"],\n\
                postTemplate: [\"post.hbs\", \"layout.hbs\"],\n\
            }",
        )
        .unwrap();
        fs::write(dir.path().join("layout.hbs"), "[{{title}}]").unwrap();
        fs::write(dir.path().join("index.hbs"), "index: {{> layout}}").unwrap();
        fs::write(dir.path().join("post.hbs"), "post: {{> layout}}").unwrap();

        let theme = load(dir.path()).unwrap();
        assert_eq!(theme.index_root, "index");
        assert_eq!(theme.post_root, "post");

        let mut rendered = Vec::new();
        theme
            .templater
            .render_to(&theme.post_root, &serde_json::json!({"title": "T"}), &mut rendered)
            .unwrap();
        assert_eq!(rendered, b"post: [T]");
    }

    #[test]
    fn empty_template_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            "{ indexTemplate: [], postTemplate: [\"post.hbs\"] }",
        )
        .unwrap();
        fs::write(dir.path().join("post.hbs"), "").unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(format!("{err:?}").contains("indexTemplate"));
    }

    use super::load;
    use super::MANIFEST_FILE;
    use std::fs;
}

use crate::templater::Templater;
use anyhow::Context as _;
use fn_error_context::context;
use handlebars::Handlebars;
use serde::Deserialize;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
