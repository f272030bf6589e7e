//! Built-in spacetraveling templates using the Tera template engine
//!
//! Templates and static assets are embedded directly in the binary.
//! Autoescaping stays on for every template; the only values emitted
//! with `| safe` are [`TrustedHtml`](crate::content::TrustedHtml) bodies.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::helpers::{html_escape, url_for};

/// Static files written next to the generated pages
pub const ASSETS: &[(&str, &str)] = &[
    (
        "css/style.css",
        include_str!("spacetraveling/assets/style.css"),
    ),
    ("logo.svg", include_str!("spacetraveling/assets/logo.svg")),
];

/// Template renderer with the embedded spacetraveling theme
pub struct TemplateRenderer {
    tera: Tera,
    config: ConfigData,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();

        // Same escaping as the rest of the crate; leaves `/` in URLs alone
        tera.set_escape_fn(html_escape);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("index.html", include_str!("spacetraveling/index.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("fallback.html", include_str!("spacetraveling/fallback.html")),
            ("404.html", include_str!("spacetraveling/404.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
            (
                "partials/post_items.html",
                include_str!("spacetraveling/partials/post_items.html"),
            ),
        ])?;

        Ok(Self {
            tera,
            config: ConfigData::new(config),
        })
    }

    /// Create a context holding the site-wide variables
    pub fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("config", &self.config);
        context
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Site-wide template variables
#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub language: String,
    pub home: String,
    pub stylesheet: String,
    pub logo: String,
}

impl ConfigData {
    fn new(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            language: config.language.clone(),
            home: url_for(config, ""),
            stylesheet: url_for(config, "css/style.css"),
            logo: url_for(config, "logo.svg"),
        }
    }
}
