//! End-to-end tests: the real HTTP fetcher, parser and extractor against
//! mock servers.
//!
//! Each test starts its own wiremock server and its own cache.

use fullfeed::{CacheHandle, Config, Options, OutputFormat, Pipeline, PipelineError, TextEncoding};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pipeline() -> Pipeline {
    let config = Config::default();
    Pipeline::from_config(&config, CacheHandle::new(config.cache_capacity)).unwrap()
}

fn rss(server: &MockServer, paths: &[&str]) -> String {
    let items: String = paths
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "<item><title>Post {n}</title><link>{base}{p}</link>\
                 <description>Summary {n}</description></item>",
                n = i + 1,
                base = server.uri()
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Blog</title>
<link>{}</link><description>A blog</description>{items}</channel></rss>"#,
        server.uri()
    )
}

fn article_page(text: &str) -> String {
    format!(
        r#"<html><head><title>Post</title><script>track()</script></head><body>
<nav><a href="/">Home</a></nav>
<article><h1>Post</h1><p>{text}</p><p>{text}</p><p>{text}</p>
<img src="/img/photo.png"></article>
<footer>Copyright</footer></body></html>"#
    )
}

async fn mount(server: &MockServer, at: &str, content_type: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
        .mount(server)
        .await;
}

fn json_options() -> Options {
    Options {
        format: OutputFormat::Json,
        ..Options::default()
    }
}

#[tokio::test]
async fn test_full_text_replaces_summaries() {
    let server = MockServer::start().await;
    mount(&server, "/feed.xml", "application/rss+xml", rss(&server, &["/p/1", "/p/2"])).await;
    mount(
        &server,
        "/p/1",
        "text/html; charset=utf-8",
        article_page("The first article has plenty of words to keep the extractor happy."),
    )
    .await;
    mount(
        &server,
        "/p/2",
        "text/html",
        article_page("The second article is just as long as the first one, give or take."),
    )
    .await;

    let out = pipeline()
        .process(&format!("{}/feed.xml", server.uri()), &json_options(), TextEncoding::Unicode)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();

    assert_eq!(value["title"], "Blog");
    let items = value["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["link"], format!("{}/p/1", server.uri()));
    assert_eq!(items[0]["desc"], "Summary 1");

    let content = items[0]["content"].as_str().unwrap();
    assert!(content.contains("The first article has plenty of words"));
    assert!(content.contains(&format!("src=\"{}/img/photo.png\"", server.uri())));
    assert!(!content.contains("track()"));
    assert!(!content.contains("Copyright"));
}

#[tokio::test]
async fn test_missing_article_keeps_item() {
    let server = MockServer::start().await;
    mount(&server, "/feed.xml", "application/rss+xml", rss(&server, &["/gone"])).await;

    let out = pipeline()
        .process(&format!("{}/feed.xml", server.uri()), &json_options(), TextEncoding::Unicode)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();

    assert_eq!(value["items"][0]["title"], "Post 1");
    assert_eq!(value["items"][0]["content"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_proxy_mode_never_fetches_articles() {
    let server = MockServer::start().await;
    mount(&server, "/feed.xml", "application/rss+xml", rss(&server, &["/p/1"])).await;
    Mock::given(path("/p/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let options = Options {
        proxy: true,
        ..json_options()
    };
    let out = pipeline()
        .process(&format!("{}/feed.xml", server.uri()), &options, TextEncoding::Unicode)
        .await
        .unwrap();

    assert!(out.contains("Summary 1"));
}

#[tokio::test]
async fn test_html_page_with_alternate_feed() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        "text/html",
        r#"<html><head><link rel="alternate" type="application/rss+xml" href="/feed.xml"></head><body></body></html>"#
            .to_owned(),
    )
    .await;
    mount(&server, "/feed.xml", "application/rss+xml", rss(&server, &["/p/1"])).await;

    let options = Options {
        proxy: true,
        ..Options::default()
    };
    let out = pipeline()
        .process(&format!("{}/", server.uri()), &options, TextEncoding::Utf8)
        .await
        .unwrap();

    assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(out.contains("<title>Post 1</title>"));
}

#[tokio::test]
async fn test_plain_page_is_rejected() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        "text/html",
        "<html><body><p>No feed here</p></body></html>".to_owned(),
    )
    .await;

    let err = pipeline()
        .process(&format!("{}/", server.uri()), &Options::default(), TextEncoding::Utf8)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Parse(_)));
}

#[tokio::test]
async fn test_feed_download_failure() {
    let server = MockServer::start().await;
    Mock::given(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = pipeline()
        .process(&format!("{}/feed.xml", server.uri()), &Options::default(), TextEncoding::Utf8)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Fetch(_)));
    assert_eq!(err.to_string(), "Error downloading feed: HTTP error: status 503");
}

#[tokio::test]
async fn test_custom_rules_scrape_page() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/news",
        "text/html",
        r#"<html><head><title>News</title>
<meta name="description" content="Latest headlines"></head><body>
<ul class="news">
  <li><a href="/n/1">First headline</a><span class="when">2024-03-01T08:00:00Z</span></li>
  <li><a href="/n/2">Second headline</a><span class="when">Fri, 01 Mar 2024 09:00:00 +0000</span></li>
</ul></body></html>"#
            .to_owned(),
    )
    .await;

    let options = Options {
        items: Some("ul.news > li".into()),
        item_title: Some("a".into()),
        item_time: Some("span.when".into()),
        proxy: true,
        ..json_options()
    };
    let out = pipeline()
        .process(&format!("{}/news", server.uri()), &options, TextEncoding::Unicode)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();

    assert_eq!(value["title"], "News");
    assert_eq!(value["desc"], "Latest headlines");
    let items = value["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "First headline");
    assert_eq!(items[0]["link"], format!("{}/n/1", server.uri()));
    assert_eq!(items[0]["time"], "2024-03-01T08:00:00+00:00");
    assert_eq!(items[1]["time"], "2024-03-01T09:00:00+00:00");
}

#[tokio::test]
async fn test_invalid_callback_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let options = Options {
        callback: Some("not valid".into()),
        ..Options::default()
    };
    let err = pipeline()
        .process(&format!("{}/feed.xml", server.uri()), &options, TextEncoding::Utf8)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidCallback(_)));
}

#[tokio::test]
async fn test_jsonp_callback() {
    let server = MockServer::start().await;
    mount(&server, "/feed.xml", "application/rss+xml", rss(&server, &["/p/1"])).await;

    let options = Options {
        callback: Some("feeds.render".into()),
        proxy: true,
        ..Options::default()
    };
    let out = pipeline()
        .process(&format!("{}/feed.xml", server.uri()), &options, TextEncoding::Utf8)
        .await
        .unwrap();

    assert!(out.starts_with("feeds.render({\"title\":\"Blog\""));
    assert!(out.ends_with("})"));
}

#[tokio::test]
async fn test_cache_option_serves_earlier_downloads() {
    let server = MockServer::start().await;
    Mock::given(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(rss(&server, &["/p/1"]), "application/rss+xml"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline();
    let url = format!("{}/feed.xml", server.uri());
    let proxy = Options {
        proxy: true,
        ..json_options()
    };
    let first = pipeline.process(&url, &proxy, TextEncoding::Unicode).await.unwrap();

    let cached = Options {
        cache: true,
        ..proxy
    };
    let second = pipeline.process(&url, &cached, TextEncoding::Unicode).await.unwrap();

    assert_eq!(first, second);
}
