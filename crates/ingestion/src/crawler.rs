//! Archive directory crawling.
//!
//! [`LinkLister`] fetches one directory listing page with bounded
//! retry/backoff and fails soft: after exhausting retries it returns an
//! empty sequence, which callers treat as "nothing found", never as a
//! fatal abort of the traversal.
//!
//! [`DirectoryWalker`] discovers profile-file URLs under an archive root,
//! handling both layouts published by the data centres: `<float>_prof.nc`
//! directly inside a float directory, and per-cycle files under a
//! `profiles/` subdirectory.

use std::time::Duration;

use regex::Regex;
use reqwest::{Client, Url};
use tracing::{error, warn};

use crate::config::RetryConfig;

/// Extract every `href` target from a listing page, in document order.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    // Compiled once; the pattern is a literal so it cannot fail.
    static HREF: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = HREF.get_or_init(|| Regex::new(r#"href="([^"]+)""#).unwrap());

    re.captures_iter(html)
        .map(|c| c[1].to_string())
        .collect()
}

/// Fetches directory listing pages and extracts hyperlink targets.
pub struct LinkLister {
    client: Client,
    config: RetryConfig,
}

impl LinkLister {
    pub fn new(client: Client, config: RetryConfig) -> Self {
        Self { client, config }
    }

    /// List hyperlink targets on a directory page, optionally filtered.
    ///
    /// Transient failures retry with exponential backoff plus jitter; an
    /// exhausted retry budget yields an empty Vec and an error log.
    pub async fn list_links(&self, url: &str, pattern: Option<&Regex>) -> Vec<String> {
        for attempt in 0..self.config.max_retries {
            match self.fetch_page(url).await {
                Ok(body) => {
                    let mut links = extract_hrefs(&body);
                    if let Some(re) = pattern {
                        links.retain(|l| re.is_match(l));
                    }
                    return links;
                }
                Err(e) => {
                    // No backoff after the final attempt.
                    if attempt + 1 == self.config.max_retries {
                        warn!(
                            url = %url,
                            attempt = attempt + 1,
                            error = %e,
                            "Listing fetch failed"
                        );
                        break;
                    }
                    let wait = self.config.backoff_base * 2u32.pow(attempt)
                        + Duration::from_secs_f64(rand::random::<f64>());
                    warn!(
                        url = %url,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        wait_secs = wait.as_secs_f64(),
                        error = %e,
                        "Listing fetch failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        error!(
            url = %url,
            retries = self.config.max_retries,
            "Listing fetch failed after all retries"
        );
        Vec::new()
    }

    async fn fetch_page(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .timeout(self.config.listing_timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// Discovers profile-file URLs under a float-archive root.
pub struct DirectoryWalker {
    lister: LinkLister,
    float_dir: Regex,
    prof_file: Regex,
    nc_file: Regex,
}

impl DirectoryWalker {
    pub fn new(lister: LinkLister) -> Self {
        // Literal patterns; compilation cannot fail.
        Self {
            lister,
            float_dir: Regex::new(r"^[0-9]+/$").unwrap(),
            prof_file: Regex::new(r"_prof\.nc$").unwrap(),
            nc_file: Regex::new(r"\.nc$").unwrap(),
        }
    }

    /// Discover profile-file URLs under `root`, depth-first per float
    /// directory in listing order, capped at `limit` when given.
    ///
    /// A float directory may match both layouts; files from either are
    /// emitted. Listing failures degrade to empty results, so an
    /// unreachable subdirectory never aborts the traversal.
    pub async fn discover_profile_files(&self, root: &str, limit: Option<usize>) -> Vec<String> {
        let mut found = Vec::new();

        let float_dirs = self.lister.list_links(root, Some(&self.float_dir)).await;
        'floats: for fdir in float_dirs {
            let Some(fdir_url) = join_url(root, &fdir) else {
                warn!(base = %root, link = %fdir, "Unresolvable float directory link");
                continue;
            };

            let entries = self.lister.list_links(&fdir_url, None).await;

            // Layout (a): <float>_prof.nc directly inside the float directory.
            for entry in &entries {
                if self.prof_file.is_match(entry) {
                    if let Some(url) = join_url(&fdir_url, entry) {
                        found.push(url);
                        if at_limit(&found, limit) {
                            break 'floats;
                        }
                    }
                }
            }

            // Layout (b): per-cycle files under a profiles/ subdirectory.
            if entries.iter().any(|e| e == "profiles/") {
                let Some(prof_url) = join_url(&fdir_url, "profiles/") else {
                    continue;
                };
                for entry in self.lister.list_links(&prof_url, Some(&self.nc_file)).await {
                    if let Some(url) = join_url(&prof_url, &entry) {
                        found.push(url);
                        if at_limit(&found, limit) {
                            break 'floats;
                        }
                    }
                }
            }
        }

        found
    }
}

fn at_limit(found: &[String], limit: Option<usize>) -> bool {
    limit.is_some_and(|cap| found.len() >= cap)
}

/// Resolve a listing link (absolute, host-relative or relative) against
/// its base URL.
fn join_url(base: &str, link: &str) -> Option<String> {
    Url::parse(base).ok()?.join(link).ok().map(Url::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_hrefs_in_document_order() {
        let html = r#"
            <html><body>
            <a href="1901820/">1901820/</a>
            <a href="2902746/">2902746/</a>
            <a href="readme.txt">readme</a>
            </body></html>
        "#;
        assert_eq!(
            extract_hrefs(html),
            vec!["1901820/", "2902746/", "readme.txt"]
        );
    }

    #[test]
    fn test_extract_hrefs_empty_page() {
        assert!(extract_hrefs("<html><body>no links</body></html>").is_empty());
    }

    #[test]
    fn test_float_dir_pattern() {
        let re = Regex::new(r"^[0-9]+/$").unwrap();
        assert!(re.is_match("1901820/"));
        assert!(!re.is_match("profiles/"));
        assert!(!re.is_match("1901820"));
        assert!(!re.is_match("doc/1901820/"));
    }

    #[test]
    fn test_profile_file_patterns() {
        let prof = Regex::new(r"_prof\.nc$").unwrap();
        assert!(prof.is_match("1901820_prof.nc"));
        assert!(!prof.is_match("1901820_meta.nc"));

        let nc = Regex::new(r"\.nc$").unwrap();
        assert!(nc.is_match("D1901820_042.nc"));
        assert!(!nc.is_match("index.html"));
    }

    async fn serve_fixture_archive() -> std::net::SocketAddr {
        use axum::{response::Html, routing::get, Router};

        let app = Router::new()
            .route(
                "/dac/",
                get(|| async {
                    Html(r#"<a href="1901820/">1901820/</a><a href="readme.txt">readme</a>"#)
                }),
            )
            .route(
                "/dac/1901820/",
                get(|| async { Html(r#"<a href="profiles/">profiles/</a>"#) }),
            )
            .route(
                "/dac/1901820/profiles/",
                get(|| async {
                    Html(
                        r#"<a href="D1901820_001.nc">D1901820_001.nc</a>
                           <a href="D1901820_002.nc">D1901820_002.nc</a>
                           <a href="index.html">index</a>"#,
                    )
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_walker_discovers_profiles_subdirectory_layout() {
        let addr = serve_fixture_archive().await;

        let config = RetryConfig {
            max_retries: 1,
            backoff_base: Duration::from_millis(10),
            ..RetryConfig::default()
        };
        let walker = DirectoryWalker::new(LinkLister::new(Client::new(), config));

        let root = format!("http://{}/dac/", addr);
        let files = walker.discover_profile_files(&root, None).await;

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("/1901820/profiles/D1901820_001.nc"));
        assert!(files[1].ends_with("/1901820/profiles/D1901820_002.nc"));
    }

    #[tokio::test]
    async fn test_walker_respects_file_limit() {
        let addr = serve_fixture_archive().await;

        let config = RetryConfig {
            max_retries: 1,
            backoff_base: Duration::from_millis(10),
            ..RetryConfig::default()
        };
        let walker = DirectoryWalker::new(LinkLister::new(Client::new(), config));

        let root = format!("http://{}/dac/", addr);
        let files = walker.discover_profile_files(&root, Some(1)).await;
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_without_a_final_backoff() {
        let config = RetryConfig {
            max_retries: 1,
            backoff_base: Duration::from_secs(30),
            ..RetryConfig::default()
        };
        let lister = LinkLister::new(Client::new(), config);

        let started = std::time::Instant::now();
        let links = lister.list_links("http://127.0.0.1:9/dac/", None).await;

        assert!(links.is_empty());
        // Connection refusal is immediate; any 30s backoff would mean the
        // loop slept after its last attempt.
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "slept after the final attempt"
        );
    }

    #[tokio::test]
    async fn test_unreachable_listing_degrades_to_empty() {
        let config = RetryConfig {
            max_retries: 1,
            backoff_base: Duration::from_millis(10),
            ..RetryConfig::default()
        };
        let lister = LinkLister::new(Client::new(), config);

        // Discard port; nothing listens there.
        let links = lister
            .list_links("http://127.0.0.1:9/unreachable/", None)
            .await;
        assert!(links.is_empty());
    }

    #[test]
    fn test_join_url_variants() {
        let base = "https://data.example.org/dac/aoml/";
        assert_eq!(
            join_url(base, "1901820/").as_deref(),
            Some("https://data.example.org/dac/aoml/1901820/")
        );
        assert_eq!(
            join_url(base, "/top.nc").as_deref(),
            Some("https://data.example.org/top.nc")
        );
        assert_eq!(
            join_url(base, "https://other.example.org/x.nc").as_deref(),
            Some("https://other.example.org/x.nc")
        );
        assert!(join_url("not a url", "x").is_none());
    }
}
