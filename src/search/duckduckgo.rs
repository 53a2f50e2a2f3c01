//! DuckDuckGo search over the HTML endpoint (no API key)

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::{format_hits, SearchError, SearchHit, SearchProvider};
use crate::utils::strip_html;

const DUCKDUCKGO_HTML_BASE: &str = "https://html.duckduckgo.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; reflection-agent/0.1)";

pub struct DuckDuckGoClient {
    client: Client,
    api_base: String,
    max_results: usize,
}

impl DuckDuckGoClient {
    pub fn new(client: Client, base_url: Option<&str>, max_results: usize) -> Self {
        Self {
            client,
            api_base: base_url
                .unwrap_or(DUCKDUCKGO_HTML_BASE)
                .trim_end_matches('/')
                .to_string(),
            max_results,
        }
    }
}

/// Text between the end of the opening tag that follows `marker` and the next `close`
fn element_text<'a>(chunk: &'a str, marker: &str, close: &str) -> Option<&'a str> {
    let after_marker = chunk.split(marker).nth(1)?;
    let body_start = after_marker.find('>')? + 1;
    let body = &after_marker[body_start..];
    Some(body.split(close).next().unwrap_or(body))
}

/// Resolve DuckDuckGo's `/l/?uddg=<encoded>` redirect links
fn resolve_link(href: &str) -> String {
    let href = href.replace("&amp;", "&");
    if let Some(encoded) = href
        .split("uddg=")
        .nth(1)
        .and_then(|rest| rest.split('&').next())
    {
        if let Ok(url) = reqwest::Url::parse(&format!("http://x/?u={}", encoded)) {
            if let Some((_, decoded)) = url.query_pairs().find(|(k, _)| k == "u") {
                return decoded.into_owned();
            }
        }
    }
    if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href
    }
}

/// Extract search results from DuckDuckGo HTML
fn extract_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    html.split("result__body")
        .skip(1)
        .filter_map(|chunk| {
            let title = strip_html(element_text(chunk, "class=\"result__a\"", "</a>")?);
            if title.is_empty() {
                return None;
            }

            let snippet = element_text(chunk, "class=\"result__snippet\"", "</a>")
                .map(strip_html)
                .unwrap_or_default();

            let link = chunk
                .split("class=\"result__a\"")
                .nth(1)
                .and_then(|s| s.split("href=\"").nth(1))
                .and_then(|s| s.split('"').next())
                .map(resolve_link)
                .unwrap_or_default();

            Some(SearchHit { title, snippet, link })
        })
        .take(max_results)
        .collect()
}

#[async_trait]
impl SearchProvider for DuckDuckGoClient {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str) -> Result<String, SearchError> {
        info!(query = %query, "Searching DuckDuckGo");

        let response = self
            .client
            .get(format!("{}/html/", self.api_base))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::RequestFailed(format!("HTTP {}", status)));
        }

        let html = response
            .text()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;
        debug!(bytes = html.len(), "DuckDuckGo page received");

        let hits = extract_results(&html, self.max_results);
        info!(count = hits.len(), "DuckDuckGo search completed");
        Ok(format_hits(query, &hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="results">
  <div class="result results_links web-result">
    <div class="links_main links_deep result__body">
      <h2 class="result__title">
        <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.nih.gov%2Ffasting&amp;rut=abc">Intermittent <b>Fasting</b> Study</a>
      </h2>
      <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">A <b>2023</b> trial found weight loss &amp; better insulin.</a>
    </div>
  </div>
  <div class="result results_links web-result">
    <div class="links_main links_deep result__body">
      <h2 class="result__title">
        <a rel="nofollow" class="result__a" href="https://example.org/review">Review article</a>
      </h2>
    </div>
  </div>
</div>
"#;

    #[test]
    fn test_extract_results() {
        let hits = extract_results(PAGE, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Intermittent Fasting Study");
        assert_eq!(hits[0].snippet, "A 2023 trial found weight loss & better insulin.");
        assert_eq!(hits[0].link, "https://www.nih.gov/fasting");
        assert_eq!(hits[1].link, "https://example.org/review");
        assert!(hits[1].snippet.is_empty());
    }

    #[test]
    fn test_extract_respects_max() {
        assert_eq!(extract_results(PAGE, 1).len(), 1);
        assert!(extract_results("<html>nothing</html>", 5).is_empty());
    }

    #[test]
    fn test_untitled_blocks_do_not_use_up_slots() {
        let page = format!(
            r#"<div class="result__body"><a class="result__a" href="https://ad.example"></a></div>{}"#,
            PAGE
        );
        let hits = extract_results(&page, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Intermittent Fasting Study");
        assert_eq!(hits[1].title, "Review article");
    }

    #[tokio::test]
    async fn test_search_against_mock() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/html/")
            .match_query(mockito::Matcher::UrlEncoded("q".into(), "fasting".into()))
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(PAGE)
            .create_async()
            .await;

        let client = DuckDuckGoClient::new(Client::new(), Some(server.url().as_str()), 5);
        let text = client.search("fasting").await.unwrap();

        mock.assert_async().await;
        assert!(text.starts_with("1. Intermittent Fasting Study"));
        assert!(text.contains("Source: https://example.org/review"));
    }

    #[tokio::test]
    async fn test_empty_page_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/html/")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html></html>")
            .create_async()
            .await;

        let client = DuckDuckGoClient::new(Client::new(), Some(server.url().as_str()), 5);
        let text = client.search("zzzz").await.unwrap();
        assert_eq!(text, "No results found for: zzzz");
    }
}
