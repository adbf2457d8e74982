use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use super::*;
use crate::article::ArticleId;
use crate::error::{FetchError, SimilarityError, WalkError};
use crate::pathfinder::Perturbation;
use crate::similarity::testing::ScriptedSimilarity;
use crate::USER_AGENT;

fn id(slug: &str) -> ArticleId {
    ArticleId::parse(slug).unwrap()
}

fn ids(slugs: &[&str]) -> BTreeSet<ArticleId> {
    slugs.iter().map(|s| id(s)).collect()
}

/// Minimal rendered article whose body paragraph links to `links`
fn article_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="/wiki/{}">{}</a> "#, l, l))
        .collect();
    format!(
        r#"<html><body><div id="mw-content-text"><div class="mw-parser-output"><p>{}</p></div></div></body></html>"#,
        anchors
    )
}

fn test_config(server: &MockServer, start: &str, target: &str) -> CrawlerConfig {
    CrawlerConfig::new(Url::parse(&server.uri()).unwrap(), id(start), id(target))
        .with_perturbation(Perturbation::none())
        .with_max_retries(0)
        .with_request_timeout(Duration::from_secs(2))
}

async fn mount_article(server: &MockServer, slug: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/wiki/{}", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_page(links)))
        .mount(server)
        .await;
}

// tests for `extract_links` start here

#[test]
fn test_extract_body_links_only() -> Result<(), Box<dyn std::error::Error>> {
    let html = r##"
        <html><body>
        <div id="mw-navigation"><a href="/wiki/Main_Page">Main page</a></div>
        <div id="mw-content-text">
            <div class="mw-parser-output">
                <table class="infobox"><tr><td><a href="/wiki/Infobox_link">x</a></td></tr></table>
                <p>The <a href="/wiki/Gluon">gluon</a> binds <a href="/wiki/Quark">quarks</a>.</p>
                <p>See <a href="/wiki/Gluon">gluon</a> again and <a href="#cite_note-1">[1]</a>.</p>
                <ul><li><a href="/wiki/List_link">listed</a></li></ul>
            </div>
        </div>
        </body></html>
    "##;

    let links = extract_links(html, false)?;
    assert_eq!(links, ids(&["Gluon", "Quark"]));
    Ok(())
}

#[test]
fn test_extract_skips_sections_and_external_links() -> Result<(), Box<dyn std::error::Error>> {
    let html = article_page(&["Quark#History", "Strong_interaction"]).replace(
        "</p>",
        r#"<a href="https://example.com/wiki/Elsewhere">ext</a><a>no href</a></p>"#,
    );
    let links = extract_links(&html, false)?;
    assert_eq!(links, ids(&["Strong_interaction"]));
    Ok(())
}

#[test]
fn test_extract_normalizes_percent_encoding() -> Result<(), Box<dyn std::error::Error>> {
    let links = extract_links(&article_page(&["Schr%C3%B6dinger_equation"]), false)?;
    assert!(links.contains(&id("Schrödinger equation")));
    Ok(())
}

#[test]
fn test_namespace_links_are_configurable() -> Result<(), Box<dyn std::error::Error>> {
    let html = article_page(&["Category:Physics", "Help:IPA", "Physics", "Star_Wars:_Episode_IV"]);
    assert_eq!(
        extract_links(&html, false)?,
        ids(&["Category:Physics", "Help:IPA", "Physics", "Star_Wars:_Episode_IV"])
    );
    // a colon inside a real article title is kept
    assert_eq!(extract_links(&html, true)?, ids(&["Physics", "Star_Wars:_Episode_IV"]));
    Ok(())
}

#[test]
fn test_extract_empty_page() -> Result<(), Box<dyn std::error::Error>> {
    assert!(extract_links("", false)?.is_empty());
    Ok(())
}
// tests for `extract_links` end here

// tests for `WikiClient` start here

#[tokio::test]
async fn test_fetch_links_from_article() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    mount_article(&server, "Quantum_chromodynamics", &["Gluon", "Quark"]).await;

    let client = WikiClient::new(Arc::new(test_config(&server, "Quantum_chromodynamics", "Gluon")))?;
    let links = client.links(&id("Quantum chromodynamics")).await?;
    assert_eq!(links, ids(&["Gluon", "Quark"]));
    Ok(())
}

#[tokio::test]
async fn test_fetch_identifies_itself() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Gluon"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_page(&["Quark"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = WikiClient::new(Arc::new(test_config(&server, "Gluon", "Quark")))?;
    assert_eq!(client.links(&id("Gluon")).await?, ids(&["Quark"]));
    Ok(())
}

#[tokio::test]
async fn test_fetch_404_is_not_retried() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server, "Missing", "Target").with_max_retries(3);
    let result = WikiClient::new(Arc::new(config))?.fetch_page(&id("Missing")).await;
    assert!(matches!(result, Err(FetchError::Status(s)) if s.as_u16() == 404));
    Ok(())
}

#[tokio::test]
async fn test_fetch_retries_server_errors() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_article(&server, "Flaky", &["Quark"]).await;

    let config = test_config(&server, "Flaky", "Target").with_max_retries(2);
    let links = WikiClient::new(Arc::new(config))?.links(&id("Flaky")).await?;
    assert_eq!(links, ids(&["Quark"]));
    Ok(())
}

#[tokio::test]
async fn test_fetch_gives_up_after_retries() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server, "Down", "Target").with_max_retries(1);
    let result = WikiClient::new(Arc::new(config))?.fetch_page(&id("Down")).await;
    assert!(matches!(result, Err(FetchError::Status(_))));
    Ok(())
}

#[tokio::test]
async fn test_fetch_timeout() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/Slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = test_config(&server, "Slow", "Target").with_request_timeout(Duration::from_millis(200));
    let result = WikiClient::new(Arc::new(config))?.fetch_page(&id("Slow")).await;
    assert!(matches!(result, Err(FetchError::Timeout)));
    Ok(())
}
// tests for `WikiClient` end here

// test suite for `walk` start here

#[tokio::test]
async fn test_walk_reaches_target() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    mount_article(&server, "Start", &["A", "B"]).await;
    mount_article(&server, "A", &["Start", "C"]).await;
    mount_article(&server, "C", &["B", "Target"]).await;

    let config = test_config(&server, "Start", "Target");
    let client = WikiClient::new(Arc::new(config.clone()))?;
    let model = ScriptedSimilarity::new(&[("A", 0.9), ("B", 0.1), ("C", 0.5)]);
    let mut rng = StdRng::seed_from_u64(0);

    let outcome = walk(&client, &model, &config, &mut rng).await?;
    assert_eq!(outcome.hops, 3);
    assert_eq!(outcome.terminal, id("Target"));
    assert_eq!(outcome.path, vec![id("Start"), id("A"), id("C"), id("Target")]);
    assert_eq!(outcome.backtracks, 0);
    assert_eq!(outcome.visited, outcome.hops + 1);
    Ok(())
}

#[tokio::test]
async fn test_walk_start_is_target() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    let config = test_config(&server, "Target", "Target");
    let client = WikiClient::new(Arc::new(config.clone()))?;
    let model = ScriptedSimilarity::new(&[]);

    let outcome = walk(&client, &model, &config, &mut StdRng::seed_from_u64(0)).await?;
    assert_eq!(outcome.hops, 0);
    assert_eq!(outcome.path, vec![id("Target")]);
    assert_eq!(model.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_walk_stuck_aborts() {
    let server = MockServer::start().await;
    mount_article(&server, "Start", &["A"]).await;
    mount_article(&server, "A", &["Start", "A"]).await;

    let config = test_config(&server, "Start", "Target");
    let client = WikiClient::new(Arc::new(config.clone())).unwrap();
    let model = ScriptedSimilarity::new(&[]);

    let result = walk(&client, &model, &config, &mut StdRng::seed_from_u64(0)).await;
    match result {
        Err(WalkError::NoViableLink { article, hops }) => {
            assert_eq!(article, id("A"));
            assert_eq!(hops, 1);
        }
        other => panic!("expected NoViableLink, got {:?}", other),
    }
}

#[tokio::test]
async fn test_walk_backtracks_out_of_dead_end() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    mount_article(&server, "Start", &["A", "B"]).await;
    mount_article(&server, "A", &["Start"]).await;
    mount_article(&server, "B", &["Target"]).await;

    let config = test_config(&server, "Start", "Target").with_stuck_policy(StuckPolicy::Backtrack);
    let client = WikiClient::new(Arc::new(config.clone()))?;
    let model = ScriptedSimilarity::new(&[("A", 0.9), ("B", 0.1)]);

    let outcome = walk(&client, &model, &config, &mut StdRng::seed_from_u64(0)).await?;
    assert_eq!(outcome.path, vec![id("Start"), id("B"), id("Target")]);
    assert_eq!(outcome.hops, 2);
    assert_eq!(outcome.backtracks, 1);
    // the abandoned dead end still counts as visited
    assert_eq!(outcome.visited, 4);
    Ok(())
}

#[tokio::test]
async fn test_walk_backtrack_gives_up_at_start() {
    let server = MockServer::start().await;
    mount_article(&server, "Start", &[]).await;

    let config = test_config(&server, "Start", "Target").with_stuck_policy(StuckPolicy::Backtrack);
    let client = WikiClient::new(Arc::new(config.clone())).unwrap();
    let model = ScriptedSimilarity::new(&[]);

    let result = walk(&client, &model, &config, &mut StdRng::seed_from_u64(0)).await;
    assert!(matches!(result, Err(WalkError::NoViableLink { hops: 0, .. })));
}

#[tokio::test]
async fn test_walk_reports_fetch_failure_position() {
    let server = MockServer::start().await;
    mount_article(&server, "Start", &["Broken"]).await;
    Mock::given(path("/wiki/Broken"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config(&server, "Start", "Target");
    let client = WikiClient::new(Arc::new(config.clone())).unwrap();
    let model = ScriptedSimilarity::new(&[]);

    let err = walk(&client, &model, &config, &mut StdRng::seed_from_u64(0))
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::Fetch { .. }));
    assert_eq!(err.article(), &id("Broken"));
    assert_eq!(err.hops(), 1);
}

#[tokio::test]
async fn test_walk_propagates_similarity_failure() {
    let server = MockServer::start().await;
    mount_article(&server, "Start", &["Zyzzyva"]).await;

    let config = test_config(&server, "Start", "Target");
    let client = WikiClient::new(Arc::new(config.clone())).unwrap();
    let model = ScriptedSimilarity::new(&[]).failing_on("Zyzzyva");

    let err = walk(&client, &model, &config, &mut StdRng::seed_from_u64(0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WalkError::Similarity { source: SimilarityError::OutOfVocabulary(_), hops: 0, .. }
    ));
}

/// In-memory link graph that remembers which articles were expanded
struct MapLinks {
    graph: HashMap<ArticleId, BTreeSet<ArticleId>>,
    expanded: std::sync::Mutex<Vec<ArticleId>>,
}

#[async_trait]
impl LinkSource for MapLinks {
    async fn links(&self, article: &ArticleId) -> Result<BTreeSet<ArticleId>, FetchError> {
        self.expanded.lock().unwrap().push(article.clone());
        Ok(self.graph.get(article).cloned().unwrap_or_default())
    }
}

#[tokio::test]
async fn test_visited_grows_by_one_per_hop() -> Result<(), Box<dyn std::error::Error>> {
    // a ring of twelve articles, every one also linking back to the start
    let names: Vec<String> = (0..12).map(|i| format!("N{:02}", i)).collect();
    let mut graph = HashMap::new();
    for (i, name) in names.iter().enumerate() {
        let mut out = ids(&["N00"]);
        out.insert(id(&names[(i + 1) % names.len()]));
        if i == names.len() - 1 {
            out.insert(id("Target"));
        }
        graph.insert(id(name), out);
    }
    let links = MapLinks {
        graph,
        expanded: std::sync::Mutex::new(Vec::new()),
    };

    let base = Url::parse("http://unused.invalid")?;
    let config = CrawlerConfig::new(base, id("N00"), id("Target"));
    let model = ScriptedSimilarity::new(&[]);

    let outcome = walk(&links, &model, &config, &mut StdRng::seed_from_u64(9)).await?;
    let expanded = links.expanded.lock().unwrap().clone();

    assert_eq!(outcome.hops, 12);
    assert_eq!(outcome.path.len(), outcome.hops + 1);
    // start plus one new article per hop
    assert_eq!(outcome.visited, outcome.hops + 1);
    // every hop expands a brand-new article, never one already on the path
    let distinct: BTreeSet<_> = expanded.iter().cloned().collect();
    assert_eq!(distinct.len(), expanded.len());
    assert_eq!(expanded.len(), outcome.hops);
    Ok(())
}
// tests for `walk` end here
