use std::time::Duration;

use mirror_engine::{
    FailureKind, FetchSettings, HeadlessChromeRenderer, PageFetcher, RenderSettings,
    ReqwestFetcher,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fetcher_returns_html_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/codes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<table></table>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/codes", server.uri());

    let output = fetcher.render(&url).await.expect("fetch ok");
    assert_eq!(output.metadata.original_url, url);
    assert_eq!(output.metadata.final_url, output.metadata.original_url);
    assert_eq!(output.metadata.redirect_count, 0);
    assert_eq!(output.metadata.byte_len, 15);
    assert!(output
        .metadata
        .content_type
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(output.bytes, b"<table></table>");
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/missing", server.uri());

    let err = fetcher.render(&url).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let url = format!("{}/slow", server.uri());

    let err = fetcher.render(&url).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_non_html_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/data.json", server.uri());

    let err = fetcher.render(&url).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "application/json".to_string()
        }
    );
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html")
                .set_body_string("01234567890"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let url = format!("{}/large", server.uri());

    let err = fetcher.render(&url).await.unwrap_err();
    assert!(matches!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    ));
}

#[tokio::test]
async fn fetcher_rejects_invalid_url() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher.render("not a url").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[cfg(unix)]
#[tokio::test]
async fn renderer_returns_process_stdout() {
    // `echo` stands in for the browser and prints the arguments it was given.
    let renderer = HeadlessChromeRenderer::new(RenderSettings {
        binary: "echo".into(),
        timeout: Duration::from_secs(5),
        virtual_time_budget: Some(Duration::from_millis(1500)),
        extra_args: vec!["--lang=en".to_string()],
    });

    let output = renderer.render("https://example.com/codes").await.unwrap();
    let printed = String::from_utf8(output.bytes).unwrap();
    assert!(printed.contains("--headless"));
    assert!(printed.contains("--dump-dom"));
    assert!(printed.contains("--virtual-time-budget=1500"));
    assert!(printed.contains("--lang=en"));
    assert!(printed.trim_end().ends_with("https://example.com/codes"));
    assert_eq!(
        output.metadata.content_type.as_deref(),
        Some("text/html; charset=utf-8")
    );
}

#[cfg(unix)]
#[tokio::test]
async fn renderer_reports_failed_process() {
    let renderer = HeadlessChromeRenderer::new(RenderSettings {
        binary: "false".into(),
        ..RenderSettings::default()
    });
    let err = renderer.render("https://example.com/").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Renderer { exit_code: Some(1) });
}

#[tokio::test]
async fn renderer_reports_missing_binary() {
    let renderer = HeadlessChromeRenderer::new(RenderSettings {
        binary: "/nonexistent/chromium-for-tests".into(),
        ..RenderSettings::default()
    });
    let err = renderer.render("https://example.com/").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Renderer { exit_code: None });
}
