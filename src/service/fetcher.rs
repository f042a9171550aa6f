//! Page fetching - resolve a page/language pair to a URL and download its HTML.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::FetchSettings;
use crate::error::{AppError, Result};
use crate::site::SiteTree;

/// Details of the HTTP request that triggered an analysis, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Scheme and authority of the current request, e.g. "https://cms.example.com".
    pub base_url: Option<String>,
}

impl RequestContext {
    pub fn with_base(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn resolve_url(
        &self,
        page_id: i64,
        language_id: i64,
        context: Option<&RequestContext>,
    ) -> Result<Url>;

    /// Download `url`. Any HTTP status is returned as-is; only transport failures error.
    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;
}

/// Join a relative route onto `base`. Absolute routes are returned unchanged.
pub fn make_absolute_with_base(route: &str, base: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(route) {
        return Some(url);
    }
    Url::parse(base).ok()?.join(route).ok()
}

/// Fetches pages from the live site over HTTP.
pub struct HttpPageFetcher {
    site: Arc<SiteTree>,
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(site: Arc<SiteTree>, settings: &FetchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { site, client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    fn resolve_url(
        &self,
        page_id: i64,
        language_id: i64,
        context: Option<&RequestContext>,
    ) -> Result<Url> {
        let route = self.site.route(page_id, language_id)?;

        let absolute = match context.and_then(|c| c.base_url.as_deref()) {
            Some(base) => make_absolute_with_base(&route, base),
            None => Url::parse(&route).ok(),
        };

        absolute
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| {
                AppError::url_resolution(format!(
                    "Could not build absolute URL for page ID {}. (Base must not be \"/\" in Site configuration for CLI command)",
                    page_id
                ))
            })
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| AppError::fetch(format!("Could not fetch page HTML: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::fetch(format!("Could not read page HTML: {}", e)))?;

        Ok(FetchedPage { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::{SiteConfig, SitePage};

    fn fetcher(base_url: &str) -> HttpPageFetcher {
        let site = SiteConfig {
            base_url: base_url.to_string(),
            pages: vec![
                SitePage { id: 1, slug: "".into(), ..Default::default() },
                SitePage { id: 2, parent: 1, slug: "contact".into(), ..Default::default() },
            ],
            ..SiteConfig::default()
        };
        HttpPageFetcher::new(Arc::new(SiteTree::new(site)), &FetchSettings::default()).unwrap()
    }

    #[test]
    fn test_make_absolute_with_base() {
        assert_eq!(
            make_absolute_with_base("/contact/", "https://cms.example.com").unwrap().as_str(),
            "https://cms.example.com/contact/"
        );
        assert_eq!(
            make_absolute_with_base("https://other.test/x", "https://cms.example.com").unwrap().as_str(),
            "https://other.test/x"
        );
        assert!(make_absolute_with_base("/x", "not a url").is_none());
    }

    #[test]
    fn test_relative_site_needs_request_context() {
        let fetcher = fetcher("/");
        let err = fetcher.resolve_url(2, 0, None).unwrap_err();
        assert_eq!(err.code(), AppError::CODE_URL_RESOLUTION);

        let context = RequestContext::with_base("https://cms.example.com");
        let url = fetcher.resolve_url(2, 0, Some(&context)).unwrap();
        assert_eq!(url.as_str(), "https://cms.example.com/contact/");
    }

    #[test]
    fn test_absolute_site_ignores_missing_context() {
        let url = fetcher("https://example.com").resolve_url(2, 0, None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/contact/");
    }

    #[tokio::test]
    async fn test_fetch_returns_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/contact/")
            .with_status(200)
            .with_body("<html><title>Contact</title></html>")
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/gone/")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = fetcher(&server.url());
        let page = fetcher.fetch(&Url::parse(&format!("{}/contact/", server.url())).unwrap()).await.unwrap();
        assert_eq!(page.status, 200);
        assert!(page.body.contains("Contact"));

        let page = fetcher.fetch(&Url::parse(&format!("{}/gone/", server.url())).unwrap()).await.unwrap();
        assert_eq!(page.status, 404);
    }
}
