//! End-to-end request scenarios against the router.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Extensions, Method, Request, StatusCode, header};
use axum::response::Response;
use mdr_config::{Engine, LocationConfig, OutputMode, RouteConfig, RouteSettings, RouteTable};
use mdr_renderer::{ConvertError, Converter, MarkdownConverter, RenderFlags, Rendered};
use mdr_server::{
    Buffer, BufferChain, FilterContext, HostResponse, MarkdownFilter, OutputPipeline,
    RangeFilter, ResponseMetadata, ServerConfig, build_router, build_router_with_converter,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tower::ServiceExt;

const FIXTURE: &str = "# Guide\n\nRead https://example.com first.\n\n## Steps\n\n- one\n- two\n";

fn location(path: &str, engine: Engine, output: OutputMode, utf8: bool) -> LocationConfig {
    LocationConfig {
        path: path.to_owned(),
        settings: RouteSettings {
            enabled: Some(true),
            utf8: Some(utf8),
            output: Some(output),
            engine: Some(engine),
        },
    }
}

/// Converter that rejects every document.
struct FailingConverter;

impl Converter for FailingConverter {
    fn convert(&self, _source: &[u8], _flags: RenderFlags) -> Result<Rendered, ConvertError> {
        Err(ConvertError::Failed("unsupported document".to_owned()))
    }
}

/// Site with the fixture copied under every configured location.
fn site() -> (TempDir, Router) {
    site_with(Arc::new(MarkdownConverter))
}

fn site_with(converter: Arc<dyn Converter>) -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let locations = vec![
        location("/handler/raw", Engine::Handler, OutputMode::Raw, false),
        location("/handler/html", Engine::Handler, OutputMode::Html, true),
        location("/filter/raw", Engine::Filter, OutputMode::Raw, false),
        location("/filter/html", Engine::Filter, OutputMode::Html, true),
        LocationConfig {
            path: "/filter/html/off".to_owned(),
            settings: RouteSettings {
                enabled: Some(false),
                ..RouteSettings::default()
            },
        },
    ];
    for loc in &locations {
        let target = dir.path().join(loc.path.trim_start_matches('/'));
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("doc.md"), FIXTURE).unwrap();
    }
    std::fs::write(dir.path().join("doc.md"), FIXTURE).unwrap();

    let config = ServerConfig {
        root: dir.path().to_path_buf(),
        routes: RouteTable::new(&RouteSettings::default(), &locations),
        ..ServerConfig::default()
    };
    let router = build_router_with_converter(&config, converter);
    (dir, router)
}

async fn send(router: &Router, method: Method, uri: &str) -> Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

fn header_value<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).map(|v| v.to_str().unwrap())
}

fn rendered_fixture() -> String {
    MarkdownConverter
        .convert(FIXTURE.as_bytes(), RenderFlags::default())
        .unwrap()
        .html
}

#[tokio::test]
async fn test_scenario_a_raw_output() {
    let (_dir, router) = site();

    for uri in ["/handler/raw/doc.md", "/filter/raw/doc.md"] {
        let response = send(&router, Method::GET, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(header_value(&response, header::CONTENT_TYPE), Some("text/plain"));
        assert_eq!(body(response).await, FIXTURE.as_bytes());
    }
}

#[tokio::test]
async fn test_scenario_b_rendered_output() {
    let (_dir, router) = site();
    let expected = rendered_fixture();

    let response = send(&router, Method::GET, "/handler/html/doc.md").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::CONTENT_TYPE),
        Some("text/html; charset=\"UTF-8\"")
    );
    let length = header_value(&response, header::CONTENT_LENGTH).map(str::to_owned);
    let body = body(response).await;
    assert_eq!(body, expected.as_bytes());
    assert_eq!(length, Some(body.len().to_string()));
}

#[tokio::test]
async fn test_scenario_b_filter_has_no_length() {
    let (_dir, router) = site();

    let response = send(&router, Method::GET, "/filter/html/doc.md").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::CONTENT_TYPE),
        Some("text/html; charset=\"UTF-8\"")
    );
    assert_eq!(header_value(&response, header::CONTENT_LENGTH), None);
    assert_eq!(header_value(&response, header::ACCEPT_RANGES), None);
    assert_eq!(body(response).await, rendered_fixture().as_bytes());
}

#[tokio::test]
async fn test_scenario_c_head_matches_get() {
    let (_dir, router) = site();

    let get = send(&router, Method::GET, "/handler/html/doc.md").await;
    let get_length = header_value(&get, header::CONTENT_LENGTH).map(str::to_owned);
    let get_body = body(get).await;

    let head = send(&router, Method::HEAD, "/handler/html/doc.md").await;
    assert_eq!(head.status(), StatusCode::OK);
    assert_eq!(
        header_value(&head, header::CONTENT_LENGTH).map(str::to_owned),
        get_length
    );
    assert_eq!(get_length, Some(get_body.len().to_string()));
    assert!(body(head).await.is_empty());
}

#[tokio::test]
async fn test_scenario_d_missing_file() {
    let (_dir, router) = site();

    for uri in [
        "/handler/html/missing.md",
        "/handler/raw/missing.md",
        "/filter/html/missing.md",
    ] {
        let response = send(&router, Method::GET, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_scenario_e_memory_terminal_passes_through() {
    let pipeline = OutputPipeline::new().with_filter(MarkdownFilter::new(
        Arc::new(MarkdownConverter),
        RenderFlags::default(),
    ));
    let route = RouteConfig {
        enabled: true,
        use_utf8: false,
        output_mode: OutputMode::Html,
        engine: Engine::Filter,
    };
    let (request, ()) = Request::get("/generated.md")
        .body(())
        .unwrap()
        .into_parts();
    let mut state = Extensions::new();
    let mut ctx = FilterContext {
        route: &route,
        request: &request,
        state: &mut state,
    };

    let meta = ResponseMetadata {
        content_type: Some("text/markdown".to_owned()),
        content_length: Some(9),
        accept_ranges: true,
        ..ResponseMetadata::default()
    };
    let batch = BufferChain::single(Buffer::memory("# Memory\n").terminal());
    let response = pipeline
        .send(&mut ctx, HostResponse::new(meta, vec![batch]))
        .await
        .unwrap();

    // Headers already advertise HTML while the body is the unconverted source.
    assert_eq!(header_value(&response, header::CONTENT_TYPE), Some("text/html"));
    assert_eq!(header_value(&response, header::CONTENT_LENGTH), None);
    assert_eq!(body(response).await, "# Memory\n".as_bytes());
}

#[tokio::test]
async fn test_disabled_route_matches_baseline() {
    let (dir, router) = site();
    let baseline = build_router(&ServerConfig {
        root: dir.path().to_path_buf(),
        ..ServerConfig::default()
    });

    for uri in ["/doc.md", "/filter/html/off/doc.md"] {
        let served = send(&router, Method::GET, uri).await;
        let plain = send(&baseline, Method::GET, uri).await;

        assert_eq!(served.status(), plain.status());
        assert_eq!(served.headers(), plain.headers());
        assert_eq!(body(served).await, body(plain).await);
    }
}

#[tokio::test]
async fn test_range_honored_only_without_rewrite() {
    let (_dir, router) = site();
    let ranged = |uri: &str| {
        Request::get(uri)
            .header(header::RANGE, "bytes=0-6")
            .body(Body::empty())
            .unwrap()
    };

    let plain = router.clone().oneshot(ranged("/doc.md")).await.unwrap();
    assert_eq!(plain.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        header_value(&plain, header::CONTENT_RANGE).map(str::to_owned),
        Some(format!("bytes 0-6/{}", FIXTURE.len()))
    );
    assert_eq!(body(plain).await, "# Guide".as_bytes());

    let filtered = router
        .clone()
        .oneshot(ranged("/filter/html/doc.md"))
        .await
        .unwrap();
    assert_eq!(filtered.status(), StatusCode::OK);
    assert_eq!(body(filtered).await, rendered_fixture().as_bytes());
}

#[test]
fn test_range_filter_after_markdown_filter() {
    let pipeline = OutputPipeline::new()
        .with_filter(MarkdownFilter::new(
            Arc::new(MarkdownConverter),
            RenderFlags::default(),
        ))
        .with_filter(RangeFilter);
    assert_eq!(pipeline.names().collect::<Vec<_>>(), vec!["markdown", "range"]);
}

#[tokio::test]
async fn test_handler_route_other_methods() {
    let (_dir, router) = site();

    let response = send(&router, Method::POST, "/handler/html/doc.md").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(header_value(&response, header::ALLOW), Some("GET, HEAD"));
}

#[tokio::test]
async fn test_directory_is_forbidden() {
    let (_dir, router) = site();

    let response = send(&router, Method::GET, "/handler").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_conversion_failure_fails_closed() {
    let (_dir, router) = site_with(Arc::new(FailingConverter));

    for uri in ["/filter/html/doc.md", "/handler/html/doc.md"] {
        let response = send(&router, Method::GET, uri).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(body(response).await, "500 Internal Server Error\n".as_bytes());
    }
}

#[tokio::test]
async fn test_non_utf8_markdown_is_rendered() {
    let (dir, router) = site();
    std::fs::write(dir.path().join("filter/html/latin1.md"), b"# Caf\xe9\n").unwrap();
    std::fs::write(dir.path().join("handler/html/latin1.md"), b"# Caf\xe9\n").unwrap();

    for uri in ["/filter/html/latin1.md", "/handler/html/latin1.md"] {
        let response = send(&router, Method::GET, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(
            body(response).await,
            "<h1 id=\"caf\">Caf\u{fffd}</h1>\n".as_bytes()
        );
    }
}

#[tokio::test]
async fn test_route_matched_on_normalized_path() {
    let (_dir, router) = site();
    let expected = rendered_fixture();

    for uri in [
        "/handler/html/doc.md",
        "/x/../handler/html/doc.md",
        "/%68andler/html/doc.md",
        "/handler%2Fhtml/doc.md",
        "/filter/html/doc.md",
        "/x/../filter/html/doc.md",
        "/%66ilter/html/doc.md",
    ] {
        let response = send(&router, Method::GET, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(
            header_value(&response, header::CONTENT_TYPE),
            Some("text/html; charset=\"UTF-8\""),
            "{uri}"
        );
        assert_eq!(body(response).await, expected.as_bytes(), "{uri}");
    }
}

#[tokio::test]
async fn test_path_escaping_root_not_found() {
    let (_dir, router) = site();

    for uri in ["/../doc.md", "/handler/%2e%2e/%2e%2e/%2e%2e/doc.md"] {
        let response = send(&router, Method::GET, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_head_on_filter_route() {
    let (_dir, router) = site();

    let response = send(&router, Method::HEAD, "/filter/html/doc.md").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::CONTENT_TYPE),
        Some("text/html; charset=\"UTF-8\"")
    );
    assert_eq!(header_value(&response, header::CONTENT_LENGTH), None);
    assert!(body(response).await.is_empty());
}
