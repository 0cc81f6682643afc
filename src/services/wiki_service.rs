use crate::config::ArticlePick;
use crate::error::{Error, Result};
use crate::models::quiz::{SearchHit, SourceDocument};
use crate::utils::text::strip_html_tags;
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Bonus added when a hit's title equals the topic outright.
pub const EXACT_TITLE_BONUS: usize = 3;

/// Full-text encyclopedia with search and plain-text extracts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Encyclopedia: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
    async fn extract(&self, title: &str) -> Result<Option<SourceDocument>>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No encyclopedia results found for: {0}")]
    NoResults(String),
    #[error("Failed to retrieve article content for: {0}")]
    NoContent(String),
}

#[derive(Clone)]
pub struct WikipediaClient {
    client: Client,
    api_url: String,
    article_base: String,
    user_agent: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: HashMap<String, ExtractPage>,
}

#[derive(Deserialize)]
struct ExtractPage {
    title: Option<String>,
    extract: Option<String>,
}

impl WikipediaClient {
    pub fn new(
        client: Client,
        api_url: String,
        article_base: String,
        user_agent: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_url,
            article_base,
            user_agent,
            timeout,
        }
    }

    pub fn article_url(&self, title: &str) -> String {
        article_url(&self.article_base, title)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let res = self
            .client
            .get(&self.api_url)
            .query(params)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            return Err(Error::Upstream(format!("Wikipedia API Error {}", status)));
        }
        Ok(res.json::<T>().await?)
    }
}

#[async_trait]
impl Encyclopedia for WikipediaClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let limit = limit.to_string();
        let body: SearchResponse = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .await?;

        Ok(body
            .query
            .map(|q| {
                q.search
                    .into_iter()
                    .map(|hit| SearchHit {
                        snippet: strip_html_tags(&hit.snippet),
                        title: hit.title,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn extract(&self, title: &str) -> Result<Option<SourceDocument>> {
        let body: ExtractResponse = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("titles", title),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("format", "json"),
            ])
            .await?;

        let Some(query) = body.query else {
            return Ok(None);
        };
        Ok(query
            .pages
            .into_iter()
            .find(|(page_id, _)| page_id != "-1")
            .and_then(|(_, page)| {
                let content = page.extract.filter(|e| !e.trim().is_empty())?;
                let title = page.title.unwrap_or_else(|| title.to_string());
                Some(SourceDocument {
                    url: self.article_url(&title),
                    title,
                    content,
                })
            }))
    }
}

pub fn article_url(base: &str, title: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(title.replace(' ', "_").as_bytes()).collect();
    format!("{}{}", base, encoded)
}

/// Lower-cased topic tokens, split on whitespace and colons.
pub fn topic_tokens(topic: &str) -> Vec<String> {
    topic
        .split(|c: char| c.is_whitespace() || c == ':' || c == '：')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub fn relevance_score(topic: &str, tokens: &[String], hit: &SearchHit) -> usize {
    let haystack = format!("{} {}", hit.title, hit.snippet).to_lowercase();
    let mut score = tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
    if hit.title.trim().to_lowercase() == topic.trim().to_lowercase() {
        score += EXACT_TITLE_BONUS;
    }
    score
}

/// Stable sort by descending token-overlap score.
pub fn rerank(topic: &str, hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let tokens = topic_tokens(topic);
    let mut scored: Vec<(usize, SearchHit)> = hits
        .into_iter()
        .map(|hit| (relevance_score(topic, &tokens, &hit), hit))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, hit)| hit).collect()
}

/// Finds the one grounding document a quiz request is built on.
#[derive(Clone)]
pub struct SourceResolver {
    encyclopedia: Arc<dyn Encyclopedia>,
    search_limit: usize,
    pick: ArticlePick,
}

impl SourceResolver {
    pub fn new(encyclopedia: Arc<dyn Encyclopedia>, search_limit: usize, pick: ArticlePick) -> Self {
        Self {
            encyclopedia,
            search_limit,
            pick,
        }
    }

    pub async fn resolve(&self, topic: &str) -> std::result::Result<SourceDocument, ResolveError> {
        let hits = match self.encyclopedia.search(topic, self.search_limit).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(topic, error = %e, "Encyclopedia search failed");
                Vec::new()
            }
        };
        if hits.is_empty() {
            return Err(ResolveError::NoResults(topic.to_string()));
        }

        let ranked = rerank(topic, hits);
        let index = match self.pick {
            ArticlePick::Top => 0,
            ArticlePick::RandomTopThree => rand::thread_rng().gen_range(0..ranked.len().min(3)),
        };
        let chosen = &ranked[index];
        tracing::info!(topic, article = %chosen.title, rank = index, "Selected source article");

        match self.encyclopedia.extract(&chosen.title).await {
            Ok(Some(doc)) if !doc.content.trim().is_empty() => Ok(doc),
            Ok(_) => Err(ResolveError::NoContent(chosen.title.clone())),
            Err(e) => {
                tracing::warn!(article = %chosen.title, error = %e, "Encyclopedia extract failed");
                Err(ResolveError::NoContent(chosen.title.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str, snippet: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            snippet: snippet.to_string(),
        }
    }

    fn doc(title: &str) -> SourceDocument {
        SourceDocument {
            title: title.to_string(),
            content: format!("{} is a subject with a long history.", title),
            url: article_url("https://en.wikipedia.org/wiki/", title),
        }
    }

    #[test]
    fn overlapping_hit_ranks_first() {
        let ranked = rerank("Foo", vec![hit("A", "x"), hit("B Foo", "Foo bar")]);
        assert_eq!(ranked[0].title, "B Foo");
    }

    #[test]
    fn exact_title_gets_bonus() {
        let tokens = topic_tokens("Jaws");
        assert_eq!(relevance_score("Jaws", &tokens, &hit("jaws", "")), 1 + EXACT_TITLE_BONUS);
        assert_eq!(relevance_score("Jaws", &tokens, &hit("Jaws (film)", "")), 1);
    }

    #[test]
    fn ties_keep_search_order() {
        let ranked = rerank("zzz", vec![hit("first", ""), hit("second", ""), hit("third", "")]);
        let titles: Vec<_> = ranked.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn hierarchical_topics_split_on_colons() {
        assert_eq!(
            topic_tokens("Universal Studios Japan : Jaws"),
            vec!["universal", "studios", "japan", "jaws"]
        );
        assert_eq!(topic_tokens("映画：ジョーズ"), vec!["映画", "ジョーズ"]);
    }

    #[test]
    fn article_url_encodes_title() {
        assert_eq!(
            article_url("https://en.wikipedia.org/wiki/", "Black hole"),
            "https://en.wikipedia.org/wiki/Black_hole"
        );
        assert_eq!(
            article_url("https://ja.wikipedia.org/wiki/", "天文学"),
            "https://ja.wikipedia.org/wiki/%E5%A4%A9%E6%96%87%E5%AD%A6"
        );
    }

    #[tokio::test]
    async fn resolves_top_reranked_article() {
        let mut wiki = MockEncyclopedia::new();
        wiki.expect_search()
            .returning(|_, _| Ok(vec![hit("Telescope", "optics"), hit("Astronomy", "astronomy science")]));
        wiki.expect_extract()
            .withf(|title| title == "Astronomy")
            .returning(|t| Ok(Some(doc(t))));

        let resolver = SourceResolver::new(Arc::new(wiki), 5, ArticlePick::Top);
        let resolved = resolver.resolve("Astronomy").await.unwrap();
        assert_eq!(resolved.title, "Astronomy");
    }

    #[tokio::test]
    async fn random_pick_stays_within_top_three() {
        let mut wiki = MockEncyclopedia::new();
        wiki.expect_search().returning(|_, _| {
            Ok(vec![
                hit("Star", "star"),
                hit("Star cluster", "star"),
                hit("Star chart", "star"),
                hit("Unrelated", "nothing"),
            ])
        });
        wiki.expect_extract().returning(|t| Ok(Some(doc(t))));

        let resolver = SourceResolver::new(Arc::new(wiki), 5, ArticlePick::RandomTopThree);
        for _ in 0..20 {
            let resolved = resolver.resolve("Star").await.unwrap();
            assert_ne!(resolved.title, "Unrelated");
        }
    }

    #[tokio::test]
    async fn empty_search_is_not_found() {
        let mut wiki = MockEncyclopedia::new();
        wiki.expect_search().returning(|_, _| Ok(vec![]));
        wiki.expect_extract().never();

        let resolver = SourceResolver::new(Arc::new(wiki), 5, ArticlePick::Top);
        let err = resolver.resolve("Qwzx").await.unwrap_err();
        assert_eq!(err, ResolveError::NoResults("Qwzx".to_string()));
    }

    #[tokio::test]
    async fn page_without_text_is_not_found() {
        let mut wiki = MockEncyclopedia::new();
        wiki.expect_search().returning(|_, _| Ok(vec![hit("Stub", "")]));
        wiki.expect_extract().returning(|_| Ok(None));

        let resolver = SourceResolver::new(Arc::new(wiki), 5, ArticlePick::Top);
        assert_eq!(
            resolver.resolve("Stub").await.unwrap_err(),
            ResolveError::NoContent("Stub".to_string())
        );
    }

    #[tokio::test]
    async fn search_transport_error_counts_as_no_results() {
        let mut wiki = MockEncyclopedia::new();
        wiki.expect_search()
            .returning(|_, _| Err(Error::Upstream("offline".into())));

        let resolver = SourceResolver::new(Arc::new(wiki), 5, ArticlePick::Top);
        assert!(matches!(
            resolver.resolve("Astronomy").await,
            Err(ResolveError::NoResults(_))
        ));
    }

    mod wikipedia_client {
        use super::*;
        use axum::{extract::Query, http::HeaderMap, http::StatusCode, routing::get, Json, Router};
        use serde_json::json;
        use tokio::net::TcpListener;

        const AGENT: &str = "QuizTest/1.0";

        async fn api(
            headers: HeaderMap,
            Query(params): Query<HashMap<String, String>>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            if headers.get(axum::http::header::USER_AGENT).and_then(|v| v.to_str().ok()) != Some(AGENT) {
                return (StatusCode::FORBIDDEN, Json(json!({})));
            }
            let param = |k: &str| params.get(k).cloned().unwrap_or_default();
            if param("list") == "search" {
                if param("srsearch") == "outage" {
                    return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})));
                }
                let body = json!({ "query": { "search": [
                    { "title": "Jupiter", "snippet": "<span class=\"searchmatch\">Jupiter</span> is the fifth planet" },
                    { "title": "Io (moon)" },
                ] } });
                return (StatusCode::OK, Json(body));
            }
            let body = match param("titles").as_str() {
                "Missing" => json!({ "query": { "pages": { "-1": { "title": "Missing", "missing": "" } } } }),
                "Blank" => json!({ "query": { "pages": { "7": { "title": "Blank", "extract": "   " } } } }),
                "Jupiter (planet)" => json!({ "query": {
                    "redirects": [{ "from": "Jupiter (planet)", "to": "Jupiter" }],
                    "pages": { "38930": { "title": "Jupiter", "extract": "Jupiter is the largest planet." } }
                } }),
                _ => json!({ "batchcomplete": "" }),
            };
            (StatusCode::OK, Json(body))
        }

        async fn client() -> WikipediaClient {
            let app = Router::new().route("/w/api.php", get(api));
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
            WikipediaClient::new(
                Client::new(),
                format!("http://{}/w/api.php", addr),
                "https://en.wikipedia.org/wiki/".to_string(),
                AGENT.to_string(),
                Duration::from_secs(5),
            )
        }

        #[tokio::test]
        async fn search_strips_highlight_markup() {
            let hits = client().await.search("jupiter", 5).await.unwrap();
            assert_eq!(
                hits,
                vec![hit("Jupiter", "Jupiter is the fifth planet"), hit("Io (moon)", "")]
            );
        }

        #[tokio::test]
        async fn failed_search_is_an_upstream_error() {
            let err = client().await.search("outage", 5).await.unwrap_err();
            assert!(matches!(err, Error::Upstream(msg) if msg.contains("503")));
        }

        #[tokio::test]
        async fn missing_or_blank_pages_have_no_document() {
            let wiki = client().await;
            assert_eq!(wiki.extract("Missing").await.unwrap(), None);
            assert_eq!(wiki.extract("Blank").await.unwrap(), None);
            assert_eq!(wiki.extract("Anything").await.unwrap(), None);
        }

        #[tokio::test]
        async fn redirected_title_names_the_document() {
            let doc = client().await.extract("Jupiter (planet)").await.unwrap().unwrap();
            assert_eq!(doc.title, "Jupiter");
            assert_eq!(doc.content, "Jupiter is the largest planet.");
            assert_eq!(doc.url, "https://en.wikipedia.org/wiki/Jupiter");
        }
    }
}
