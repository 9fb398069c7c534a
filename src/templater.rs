//! The handlebars wrapper shared by every templating sink, and the sinks
//! themselves.

/// Cheap to clone; the registry is shared.
#[derive(Clone, Debug)]
pub(crate) struct Templater {
    handlebars: Arc<Handlebars<'static>>,
}

impl Templater {
    pub(crate) fn new(handlebars: Handlebars<'static>) -> Self {
        Templater {
            handlebars: Arc::new(handlebars),
        }
    }

    pub(crate) fn render_to(
        &self,
        name: &str,
        vars: &impl Serialize,
        writer: impl io::Write,
    ) -> anyhow::Result<()> {
        self.handlebars.render_to_write(name, vars, writer)?;
        Ok(())
    }
}

const TEMPLATE_WORKERS: usize = 8;

/// Input actor rendering each received page to `<out_dir>/<page path>`. The
/// template sees the shared site data and the page's fields side by side.
pub(crate) fn pages<T>(
    name: &'static str,
    out_dir: PathBuf,
    templater: Templater,
    template: String,
    site: Arc<SiteData>,
    input: Rx<OrderedPage<T>>,
) -> impl Actor
where
    T: Serialize + Send + Sync,
{
    actor::sink(
        name,
        TEMPLATE_WORKERS,
        input,
        move |_, page: OrderedPage<T>| {
            let path = out_dir.join(&page.page.path);
            make_parents(&path)?;
            let file = File::create(&path)
                .with_context(|| format!("failed to create `{}`", path.display()))?;
            let mut writer = BufWriter::new(file);

            let vars = TemplateVars {
                site: &site,
                page: &page,
            };
            templater
                .render_to(&template, &vars, &mut writer)
                .with_context(|| format!("failed to render `{}`", path.display()))?;
            writer
                .flush()
                .with_context(|| format!("failed to write `{}`", path.display()))?;
            log::info!("emitted {}", path.display());
            Ok(())
        },
    )
}

#[derive(Serialize)]
struct TemplateVars<'a, T> {
    #[serde(flatten)]
    site: &'a SiteData,
    #[serde(flatten)]
    page: &'a OrderedPage<T>,
}


use crate::actor;
use crate::actor::Actor;
use crate::actor::Rx;
use crate::config::SiteData;
use crate::page::OrderedPage;
use crate::util::make_parents;
use anyhow::Context as _;
use handlebars::Handlebars;
use serde::Serialize;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
