//! Static file serving module
//!
//! Serves the web client from the configured directory, with index file
//! resolution and `ETag` revalidation.

use crate::config::HttpConfig;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::Path;
use tokio::fs;

/// Serve a request path from `http.static_dir`
pub async fn serve_directory(
    ctx: &RequestContext<'_>,
    http_config: &HttpConfig,
) -> Response<Full<Bytes>> {
    let Some((content, content_type)) =
        load_from_directory(&http_config.static_dir, ctx.path, &http_config.index_files).await
    else {
        return http::build_404_response();
    };

    let etag = cache::generate_etag(&content);
    if cache::check_etag_match(ctx.if_none_match.as_deref(), &etag) {
        return http::build_304_response(&etag);
    }
    http::build_cached_response(Bytes::from(content), content_type, &etag, ctx.is_head)
}

/// Load a file below `static_dir`, trying index files for directories
pub async fn load_from_directory(
    static_dir: &str,
    path: &str,
    index_files: &[String],
) -> Option<(Vec<u8>, &'static str)> {
    // Remove leading slash and prevent directory traversal
    let relative_path = path.trim_start_matches('/').replace("..", "");

    let static_dir_canonical = match Path::new(static_dir).canonicalize() {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{static_dir}': {e}"
            ));
            return None;
        }
    };

    let requested = static_dir_canonical.join(&relative_path);
    let file_path = if requested.is_dir() {
        index_files
            .iter()
            .map(|index| requested.join(index))
            .find(|candidate| candidate.is_file())?
    } else {
        requested
    };

    // File not found is common (404), no need to log at warning level
    let file_path = file_path.canonicalize().ok()?;
    if !file_path.starts_with(&static_dir_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            path,
            file_path.display()
        ));
        return None;
    }

    let content = match fs::read(&file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            return None;
        }
    };

    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
    Some((content, content_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_files() -> Vec<String> {
        vec!["index.html".to_string()]
    }

    fn scratch_site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>channels</h1>").unwrap();
        std::fs::write(dir.path().join("index.js"), "const create = 1;").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.html"), "docs").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_root_resolves_index() {
        let site = scratch_site();
        let root = site.path().to_str().unwrap();
        let (content, content_type) = load_from_directory(root, "/", &index_files()).await.unwrap();
        assert_eq!(content, b"<h1>channels</h1>");
        assert_eq!(content_type, "text/html; charset=utf-8");

        let (content, _) = load_from_directory(root, "/docs/", &index_files()).await.unwrap();
        assert_eq!(content, b"docs");
    }

    #[tokio::test]
    async fn test_script_asset() {
        let site = scratch_site();
        let root = site.path().to_str().unwrap();
        let (_, content_type) = load_from_directory(root, "/index.js", &index_files()).await.unwrap();
        assert_eq!(content_type, "text/javascript; charset=utf-8");
    }

    #[tokio::test]
    async fn test_missing_file_and_traversal() {
        let site = scratch_site();
        let inner = site.path().join("public");
        std::fs::create_dir(&inner).unwrap();
        let root = inner.to_str().unwrap();

        assert!(load_from_directory(root, "/nope.css", &index_files()).await.is_none());
        assert!(load_from_directory(root, "/../index.html", &index_files()).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_static_dir() {
        assert!(load_from_directory("/no/such/static", "/", &index_files()).await.is_none());
    }

    #[tokio::test]
    async fn test_bundled_client_loads_helpers_first() {
        let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/static");
        let (page, _) = load_from_directory(static_dir, "/", &index_files()).await.unwrap();
        let page = String::from_utf8(page).unwrap();
        let helpers = page.find(r#"src="channel.js""#).unwrap();
        let client = page.find(r#"src="index.js""#).unwrap();
        assert!(helpers < client);

        let (_, content_type) = load_from_directory(static_dir, "/channel.js", &index_files()).await.unwrap();
        assert_eq!(content_type, "text/javascript; charset=utf-8");
    }
}
