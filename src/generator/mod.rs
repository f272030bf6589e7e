//! Generator module - renders the post list and post pages to static HTML

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::content::{ContentApi, Post, RichTextRenderer};
use crate::helpers::{is_valid_slug, url_for};
use crate::pages::detail::{resolve, static_paths};
use crate::pages::list::first_page;
use crate::pages::{PostList, PostSummary, PostView};
use crate::server::LOAD_MORE_PATH;
use crate::templates::{TemplateRenderer, ASSETS};
use crate::Blog;

/// Seconds before the fallback page reloads itself
const FALLBACK_REFRESH_SECS: u32 = 1;

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    rich_text: RichTextRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new(&blog.config)?;
        let rich_text =
            RichTextRenderer::with_document_root(&url_for(&blog.config, &blog.config.post_dir));

        Ok(Self {
            blog: blog.clone(),
            renderer,
            rich_text,
        })
    }

    /// Generate the entire site
    pub async fn generate<C: ContentApi>(&self, api: &C) -> Result<()> {
        let config = &self.blog.config;

        // Ensure public directory exists
        fs::create_dir_all(&self.blog.public_dir)?;
        self.write_assets()?;

        // Post list, first page only
        let list = PostList::new(first_page(api, config).await?);
        let html = self.render_index(&list)?;
        fs::write(self.blog.public_dir.join("index.html"), html)?;
        tracing::info!(
            "Generated index with {} posts (more: {})",
            list.posts().len(),
            list.has_more()
        );

        // Post pages for every known slug
        let slugs = static_paths(api, config).await?;
        let mut generated = 0;
        for slug in &slugs {
            if !is_valid_slug(slug) {
                tracing::warn!("Skipping post with unusable slug {:?}", slug);
                continue;
            }
            let post = resolve(api, config, slug).await?;
            let html = self.render_ready(&post)?;
            self.write_post(slug, &html).await?;
            generated += 1;
        }
        tracing::info!("Generated {} post pages", generated);

        fs::write(
            self.blog.public_dir.join("404.html"),
            self.render_not_found()?,
        )?;

        Ok(())
    }

    /// Render the post list page
    pub fn render_index(&self, list: &PostList) -> Result<String> {
        let mut context = self.renderer.base_context();
        context.insert("posts", &list.summaries(&self.blog.config));
        context.insert("next_page", &list.next_page());
        context.insert(
            "load_more_endpoint",
            &url_for(&self.blog.config, LOAD_MORE_PATH),
        );
        self.renderer.render("index.html", &context)
    }

    /// Render list items alone, for appending on "load more"
    pub fn render_post_items(&self, posts: &[PostSummary]) -> Result<String> {
        let mut context = self.renderer.base_context();
        context.insert("posts", posts);
        self.renderer.render("partials/post_items.html", &context)
    }

    /// Render a post route in either state
    pub fn render_post(&self, view: &PostView) -> Result<String> {
        let mut context = self.renderer.base_context();
        match view {
            PostView::Fallback => {
                context.insert("refresh_seconds", &FALLBACK_REFRESH_SECS);
                self.renderer.render("fallback.html", &context)
            }
            PostView::Ready(page) => {
                context.insert("post", page);
                self.renderer.render("post.html", &context)
            }
        }
    }

    /// Render a resolved post
    pub fn render_ready(&self, post: &Post) -> Result<String> {
        self.render_post(&PostView::ready(post, &self.blog.config, &self.rich_text))
    }

    pub fn render_not_found(&self) -> Result<String> {
        self.renderer
            .render("404.html", &self.renderer.base_context())
    }

    /// Output file of a post route
    pub fn post_output_path(&self, slug: &str) -> PathBuf {
        self.blog
            .public_dir
            .join(self.blog.config.post_dir.trim_matches('/'))
            .join(slug)
            .join("index.html")
    }

    /// Write a rendered post page
    pub async fn write_post(&self, slug: &str, html: &str) -> Result<PathBuf> {
        let output_path = self.post_output_path(slug);
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        tokio::fs::write(&output_path, html)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", output_path, e))?;
        tracing::debug!("Generated post: {:?}", output_path);
        Ok(output_path)
    }

    /// Copy embedded stylesheet and logo
    fn write_assets(&self) -> Result<()> {
        for (path, content) in ASSETS {
            let dest = self.blog.public_dir.join(path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&dest, content)?;
        }
        Ok(())
    }
}
