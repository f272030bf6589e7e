//! Blog server: static files plus the load-more API and on-demand post pages

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::{ContentApi, PostPagination};
use crate::generator::Generator;
use crate::helpers::is_valid_slug;
use crate::pages::detail::resolve;
use crate::pages::{OnDemand, PostList, PostSummary, PostView};
use crate::Blog;

/// Route of the load-more endpoint, relative to the site root
pub const LOAD_MORE_PATH: &str = "api/posts";

/// Server state
pub struct ServerState<C> {
    blog: Blog,
    generator: Generator,
    api: C,
    /// Only `next_page` URLs on this origin are followed
    api_endpoint: reqwest::Url,
    on_demand: OnDemand,
}

impl<C: ContentApi> ServerState<C> {
    pub fn new(blog: Blog, api: C) -> Result<Self> {
        let api_endpoint = reqwest::Url::parse(blog.config.prismic.endpoint()?)?;
        let generator = Generator::new(&blog)?;

        Ok(Self {
            blog,
            generator,
            api,
            api_endpoint,
            on_demand: OnDemand::new(),
        })
    }

    fn is_api_url(&self, url: &str) -> bool {
        reqwest::Url::parse(url)
            .map(|url| url.origin() == self.api_endpoint.origin())
            .unwrap_or(false)
    }
}

/// Build the router for a blog
pub fn router<C: ContentApi + 'static>(blog: Blog, api: C) -> Result<Router> {
    Ok(app(Arc::new(ServerState::new(blog, api)?)))
}

fn app<C: ContentApi + 'static>(state: Arc<ServerState<C>>) -> Router {
    let post_route = format!("/{}/:slug", state.blog.config.post_dir.trim_matches('/'));

    Router::new()
        .route(&format!("/{}", LOAD_MORE_PATH), get(load_more_handler::<C>))
        .route(&post_route, get(post_handler::<C>))
        .fallback(fallback_handler::<C>)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the blog server
pub async fn start<C: ContentApi + 'static>(
    blog: &Blog,
    api: C,
    ip: &str,
    port: u16,
    open: bool,
) -> Result<()> {
    let app = router(blog.clone(), api)?;

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct LoadMoreQuery {
    next_page: String,
}

/// Body of a load-more response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoadMoreResponse {
    pub next_page: Option<String>,
    pub results: Vec<PostSummary>,
    /// Rendered list items, ready to append
    pub html: String,
}

/// Fetch the page behind `next_page` and return it formatted
async fn load_more_handler<C: ContentApi + 'static>(
    State(state): State<Arc<ServerState<C>>>,
    Query(query): Query<LoadMoreQuery>,
) -> Response {
    if !state.is_api_url(&query.next_page) {
        tracing::warn!("Rejected next_page outside the content API");
        return (StatusCode::BAD_REQUEST, "Invalid next_page").into_response();
    }

    let mut list = PostList::new(PostPagination {
        next_page: Some(query.next_page),
        results: Vec::new(),
    });
    if let Err(e) = list.load_more(&state.api).await {
        tracing::error!("Load more failed: {}", e);
        return (StatusCode::BAD_GATEWAY, "Failed to load posts").into_response();
    }

    let results = list.summaries(&state.blog.config);
    let html = match state.generator.render_post_items(&results) {
        Ok(html) => html,
        Err(e) => return server_error(e),
    };

    Json(LoadMoreResponse {
        next_page: list.next_page().map(str::to_string),
        results,
        html,
    })
    .into_response()
}

/// Serve a generated post, generating it first when it is not on disk yet
async fn post_handler<C: ContentApi + 'static>(
    State(state): State<Arc<ServerState<C>>>,
    Path(slug): Path<String>,
) -> Response {
    if !is_valid_slug(&slug) {
        return not_found(&state);
    }

    let output_path = state.generator.post_output_path(&slug);
    if let Ok(html) = tokio::fs::read_to_string(&output_path).await {
        return Html(html).into_response();
    }

    let Some(_claim) = state.on_demand.claim(&slug) else {
        tracing::debug!("Post {} is already being generated", slug);
        return match state.generator.render_post(&PostView::Fallback) {
            Ok(html) => ([(header::CACHE_CONTROL, "no-store")], Html(html)).into_response(),
            Err(e) => server_error(e),
        };
    };

    let post = match resolve(&state.api, &state.blog.config, &slug).await {
        Ok(post) => post,
        Err(e) if e.is_not_found() => return not_found(&state),
        Err(e) => {
            tracing::error!("Failed to resolve post {}: {}", slug, e);
            return (StatusCode::BAD_GATEWAY, "Failed to load post").into_response();
        }
    };

    let html = match state.generator.render_ready(&post) {
        Ok(html) => html,
        Err(e) => return server_error(e),
    };
    match state.generator.write_post(&slug, &html).await {
        Ok(path) => tracing::info!("Generated post on demand: {:?}", path),
        Err(e) => tracing::warn!("Failed to persist post {}: {}", slug, e),
    }

    Html(html).into_response()
}

/// Fallback handler that serves files from the public directory
async fn fallback_handler<C: ContentApi + 'static>(
    State(state): State<Arc<ServerState<C>>>,
    request: Request<Body>,
) -> Response {
    let mut service = ServeDir::new(&state.blog.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => not_found(&state),
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

fn not_found<C>(state: &ServerState<C>) -> Response {
    match state.generator.render_not_found() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => server_error(e),
    }
}

fn server_error(e: anyhow::Error) -> Response {
    tracing::error!("Render failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::{ContentError, Post, PostData, Predicate, QueryOptions};
    use axum::body::to_bytes;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    const ENDPOINT: &str = "https://blog.cdn.prismic.io/api/v2";

    #[derive(Default)]
    struct Repo {
        pages: HashMap<String, PostPagination>,
        docs: HashMap<String, Post>,
        lookups: AtomicUsize,
        fail: bool,
    }

    impl ContentApi for Repo {
        async fn query(
            &self,
            _predicate: &Predicate,
            _options: &QueryOptions,
        ) -> Result<PostPagination, ContentError> {
            Ok(PostPagination::default())
        }

        async fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Post, ContentError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ContentError::Status {
                    status: 503,
                    url: ENDPOINT.to_string(),
                });
            }
            self.docs
                .get(uid)
                .cloned()
                .ok_or_else(|| ContentError::NotFound {
                    document_type: document_type.to_string(),
                    uid: uid.to_string(),
                })
        }

        async fn fetch_page(&self, url: &str) -> Result<PostPagination, ContentError> {
            self.pages.get(url).cloned().ok_or(ContentError::NoMasterRef)
        }
    }

    fn post(uid: &str) -> Post {
        Post {
            uid: uid.to_string(),
            first_publication_date: Some("2021-04-02T12:00:00Z".to_string()),
            data: PostData {
                title: format!("Post {}", uid),
                subtitle: "Sub".to_string(),
                author: "Joseph Oliveira".to_string(),
                ..Default::default()
            },
        }
    }

    fn blog(dir: &std::path::Path) -> Blog {
        let mut config = SiteConfig::default();
        config.prismic.api_endpoint = Some(ENDPOINT.to_string());
        Blog::with_config(dir, config)
    }

    fn state(blog: &Blog, repo: Repo) -> Arc<ServerState<Repo>> {
        Arc::new(ServerState::new(blog.clone(), repo).unwrap())
    }

    async fn get(state: &Arc<ServerState<Repo>>, uri: &str) -> (StatusCode, String) {
        let response = app(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_load_more_returns_formatted_page() {
        let tmp = tempfile::tempdir().unwrap();
        let next = format!("{}/documents/search?page=2", ENDPOINT);
        let mut repo = Repo::default();
        repo.pages.insert(
            next.clone(),
            PostPagination {
                next_page: Some(format!("{}/documents/search?page=3", ENDPOINT)),
                results: vec![post("d"), post("e")],
            },
        );
        let state = state(&blog(tmp.path()), repo);

        let uri = format!(
            "/api/posts?next_page={}",
            percent_encoding::utf8_percent_encode(&next, percent_encoding::NON_ALPHANUMERIC)
        );
        let (status, body) = get(&state, &uri).await;
        assert_eq!(status, StatusCode::OK);

        let page: LoadMoreResponse = serde_json::from_str(&body).unwrap();
        let uids: Vec<_> = page.results.iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(uids, ["d", "e"]);
        assert_eq!(page.results[0].date.as_deref(), Some("02 abr 2021"));
        assert!(page.next_page.unwrap().ends_with("page=3"));
        assert!(page.html.contains(r#"href="/post/d""#));
    }

    #[tokio::test]
    async fn test_load_more_rejects_foreign_urls() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(&blog(tmp.path()), Repo::default());

        let (status, _) = get(&state, "/api/posts?next_page=http%3A%2F%2Fevil.test%2Fx").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_generated_on_demand_once() {
        let tmp = tempfile::tempdir().unwrap();
        let blog = blog(tmp.path());
        let mut repo = Repo::default();
        repo.docs.insert("late".into(), post("late"));
        let state = state(&blog, repo);

        let (status, body) = get(&state, "/post/late").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>Post late</h1>"));
        assert!(blog.public_dir.join("post/late/index.html").is_file());

        // Second request is served from disk
        let (status, _) = get(&state, "/post/late").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.api.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pending_post_gets_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let mut repo = Repo::default();
        repo.docs.insert("late".into(), post("late"));
        let state = state(&blog(tmp.path()), repo);

        let _claim = state.on_demand.claim("late").unwrap();
        let (status, body) = get(&state, "/post/late").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Carregando..."));
        assert_eq!(state.api.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_post_is_404() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(&blog(tmp.path()), Repo::default());

        let (status, body) = get(&state, "/post/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Post não encontrado"));
        assert!(!state.on_demand.is_pending("nope"));
    }

    #[tokio::test]
    async fn test_api_failure_is_bad_gateway() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Repo {
            fail: true,
            ..Default::default()
        };
        let state = state(&blog(tmp.path()), repo);

        let (status, _) = get(&state, "/post/any").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_serves_generated_files() {
        let tmp = tempfile::tempdir().unwrap();
        let blog = blog(tmp.path());
        std::fs::create_dir_all(&blog.public_dir).unwrap();
        std::fs::write(blog.public_dir.join("index.html"), "<p>home</p>").unwrap();
        let state = state(&blog, Repo::default());

        let (status, body) = get(&state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<p>home</p>");

        let (status, body) = get(&state, "/missing.css").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Post não encontrado"));
    }

    #[test]
    fn test_state_requires_endpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let blog = Blog::with_config(tmp.path(), SiteConfig::default());
        assert!(ServerState::new(blog, Repo::default()).is_err());
    }
}
