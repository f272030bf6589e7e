//! List posts

use anyhow::Result;

use crate::content::ContentApi;
use crate::pages::list::first_page;
use crate::pages::PostList;
use crate::Blog;

/// Print every post, following pagination to the end
pub async fn run(blog: &Blog) -> Result<()> {
    let client = blog.client()?;
    let lines = collect_lines(blog, &client).await?;

    println!("Posts ({}):", lines.len());
    for line in lines {
        println!("  {}", line);
    }

    Ok(())
}

/// One `date - title [uid]` line per post, in API order
pub async fn collect_lines<C: ContentApi>(blog: &Blog, api: &C) -> Result<Vec<String>> {
    let mut list = PostList::new(first_page(api, &blog.config).await?);
    list.load_all(api).await?;

    Ok(list
        .summaries(&blog.config)
        .into_iter()
        .map(|post| {
            format!(
                "{} - {} [{}]",
                post.date.as_deref().unwrap_or("----"),
                post.title,
                post.uid
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::pages::list::tests::{page, Pages};

    #[tokio::test]
    async fn test_lines_cover_all_pages() {
        let tmp = tempfile::tempdir().unwrap();
        let blog = Blog::with_config(tmp.path(), SiteConfig::default());

        let mut api = Pages::default();
        api.pages.insert("first".into(), page(&["a", "b"], Some("p2")));
        api.pages.insert("p2".into(), page(&["c"], None));

        let lines = collect_lines(&blog, &api).await.unwrap();
        assert_eq!(
            lines,
            [
                "15 mar 2023 - Title a [a]",
                "15 mar 2023 - Title b [b]",
                "15 mar 2023 - Title c [c]",
            ]
        );
    }
}
