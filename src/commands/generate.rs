//! Generate static files

use anyhow::Result;

use crate::content::ContentApi;
use crate::generator::Generator;
use crate::Blog;

/// Generate the static site from the configured content API
pub async fn run(blog: &Blog) -> Result<()> {
    let client = blog.client()?;
    run_with(blog, &client).await
}

/// Generate the static site from a given content source
pub async fn run_with<C: ContentApi>(blog: &Blog, api: &C) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog)?;
    generator.generate(api).await?;

    let elapsed = start.elapsed();
    tracing::info!("Generated in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}
