use super::*;
use crate::error::{MANIFEST_UNKNOWN, NAME_UNKNOWN};
use mockito::Matcher;

const DIGEST: &str = "sha256:7173b809ca12ec5dee4506cd86be934c4596dd234ee82c0662eac04a8c2c71dc";

fn endpoint(url: &str) -> Endpoint {
    Endpoint {
        url: url.to_string(),
        mirror: false,
        skip_tls_verify: false,
    }
}

fn repository(url: &str, name: &str) -> RemoteRepository {
    RemoteRepository::new(endpoint(url), name, Credentials::Anonymous, &ClientConfig::default())
        .unwrap()
}

#[test]
fn test_client_config_default() {
    let config = ClientConfig::new();
    assert_eq!(config.timeout_seconds, 30);
    assert_eq!(config.max_idle_per_host, 10);
}

#[test]
fn test_client_config_with_timeout() {
    let config = ClientConfig::new().with_timeout(60);
    assert_eq!(config.timeout_seconds, 60);
    assert_eq!(config.max_idle_per_host, 10); // Other settings unchanged
}

#[test]
fn test_client_config_builds_insecure_client() {
    let config = ClientConfig::new();
    assert!(config.build_http_client(true).is_ok());
    assert!(config.build_http_client(false).is_ok());
}

#[test]
fn test_remote_repository_rejects_empty_name() {
    let result = RemoteRepository::new(
        endpoint("http://localhost:5000"),
        "/",
        Credentials::Anonymous,
        &ClientConfig::default(),
    );
    assert!(matches!(result, Err(TagCheckError::Validation { .. })));
}

#[test]
fn test_manifest_url_construction() {
    let repo = repository("http://localhost:5000/", "team/app");
    assert_eq!(
        repo.manifest_url("v1"),
        "http://localhost:5000/v2/team/app/manifests/v1"
    );
    assert_eq!(repo.describe(), "http://localhost:5000/");
}

#[test]
fn test_extract_next_link() {
    let mut headers = HeaderMap::new();
    headers.insert(
        LINK,
        "</v2/app/tags/list?n=2&last=b>; rel=\"next\"".parse().unwrap(),
    );
    assert_eq!(
        extract_next_link(&headers),
        Some("/v2/app/tags/list?n=2&last=b".to_string())
    );

    let empty = HeaderMap::new();
    assert_eq!(extract_next_link(&empty), None);
}

#[test]
fn test_descriptor_from_headers_requires_digest() {
    let headers = HeaderMap::new();
    assert_eq!(descriptor_from_headers("v1", &headers).unwrap(), None);
}

#[test]
fn test_descriptor_from_headers_rejects_invalid_digest() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_DIGEST, "sha256:nothex".parse().unwrap());
    assert!(descriptor_from_headers("v1", &headers).is_err());
}

#[test]
fn test_descriptor_from_body_computes_digest() {
    let body = br#"{"schemaVersion":2,"mediaType":"application/vnd.oci.image.manifest.v1+json"}"#;
    let descriptor = descriptor_from_body("v1", &HeaderMap::new(), body).unwrap();

    assert_eq!(
        descriptor.digest,
        format!("sha256:{:x}", Sha256::digest(body))
    );
    assert_eq!(
        descriptor.media_type.as_deref(),
        Some("application/vnd.oci.image.manifest.v1+json")
    );
    assert_eq!(descriptor.size, Some(body.len() as u64));
}

#[tokio::test]
async fn test_get_tag_from_head() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("HEAD", "/v2/app/manifests/v1")
        .with_status(200)
        .with_header("Docker-Content-Digest", DIGEST)
        .with_header("Content-Type", "application/vnd.oci.image.manifest.v1+json")
        .create_async()
        .await;

    let repo = repository(&server.url(), "app");
    let descriptor = repo.get_tag("v1").await.unwrap();

    mock.assert_async().await;
    assert_eq!(descriptor.tag, "v1");
    assert_eq!(descriptor.digest, DIGEST);
    assert_eq!(
        descriptor.media_type.as_deref(),
        Some("application/vnd.oci.image.manifest.v1+json")
    );
}

#[tokio::test]
async fn test_get_tag_falls_back_to_get_for_error_document() {
    let mut server = mockito::Server::new_async().await;
    let head = server
        .mock("HEAD", "/v2/app/manifests/v9")
        .with_status(404)
        .create_async()
        .await;
    let get = server
        .mock("GET", "/v2/app/manifests/v9")
        .with_status(404)
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"errors":[{"code":"MANIFEST_UNKNOWN","message":"manifest unknown"}]}"#)
        .create_async()
        .await;

    let repo = repository(&server.url(), "app");
    let err = repo.get_tag("v9").await.unwrap_err();

    head.assert_async().await;
    get.assert_async().await;
    assert_eq!(err.api_code(), Some(MANIFEST_UNKNOWN));
}

#[tokio::test]
async fn test_get_tag_unstructured_404_is_not_definitive() {
    let mut server = mockito::Server::new_async().await;
    let _head = server
        .mock("HEAD", "/v2/app/manifests/v1")
        .with_status(404)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/v2/app/manifests/v1")
        .with_status(404)
        .with_body("404 page not found")
        .create_async()
        .await;

    let repo = repository(&server.url(), "app");
    let err = repo.get_tag("v1").await.unwrap_err();

    assert!(matches!(err, TagCheckError::NotFound { .. }));
    assert_eq!(err.api_code(), None);
}

#[tokio::test]
async fn test_get_tag_get_without_digest_header() {
    let mut server = mockito::Server::new_async().await;
    let body = r#"{"schemaVersion":2,"mediaType":"application/vnd.docker.distribution.manifest.v2+json"}"#;
    let _head = server
        .mock("HEAD", "/v2/app/manifests/v1")
        .with_status(200)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/v2/app/manifests/v1")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let repo = repository(&server.url(), "app");
    let descriptor = repo.get_tag("v1").await.unwrap();

    assert_eq!(
        descriptor.digest,
        format!("sha256:{:x}", Sha256::digest(body.as_bytes()))
    );
    assert_eq!(
        descriptor.media_type.as_deref(),
        Some("application/vnd.docker.distribution.manifest.v2+json")
    );
}

#[tokio::test]
async fn test_get_tag_server_error() {
    let mut server = mockito::Server::new_async().await;
    let _head = server
        .mock("HEAD", "/v2/app/manifests/v1")
        .with_status(503)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/v2/app/manifests/v1")
        .with_status(503)
        .with_body("service unavailable")
        .create_async()
        .await;

    let repo = repository(&server.url(), "app");
    let err = repo.get_tag("v1").await.unwrap_err();

    assert!(matches!(
        err,
        TagCheckError::Server {
            status_code: 503,
            ..
        }
    ));
}

#[tokio::test]
async fn test_get_tag_rate_limit_parses_retry_after() {
    let mut server = mockito::Server::new_async().await;
    let _head = server
        .mock("HEAD", "/v2/app/manifests/v1")
        .with_status(429)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/v2/app/manifests/v1")
        .with_status(429)
        .with_header("Retry-After", " 60 ")
        .with_body("too many requests")
        .create_async()
        .await;

    let repo = repository(&server.url(), "app");
    match repo.get_tag("v1").await.unwrap_err() {
        TagCheckError::RateLimit {
            message,
            retry_after,
        } => {
            assert!(message.contains("Rate limit exceeded"));
            assert_eq!(retry_after, Some(60));
        }
        other => panic!("Expected RateLimit error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_tag_answers_bearer_challenge() {
    let mut server = mockito::Server::new_async().await;
    let challenge = format!(
        r#"Bearer realm="{}/token",service="registry.test",scope="repository:app:pull""#,
        server.url()
    );

    let unauthorized = server
        .mock("HEAD", "/v2/app/manifests/v1")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_header("WWW-Authenticate", &challenge)
        .create_async()
        .await;
    let token = server
        .mock("GET", "/token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("service".into(), "registry.test".into()),
            Matcher::UrlEncoded("scope".into(), "repository:app:pull".into()),
        ]))
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(200)
        .with_body(r#"{"token":"t0k3n"}"#)
        .create_async()
        .await;
    let authorized = server
        .mock("HEAD", "/v2/app/manifests/v1")
        .match_header("authorization", "Bearer t0k3n")
        .with_status(200)
        .with_header("Docker-Content-Digest", DIGEST)
        .create_async()
        .await;

    let repo = RemoteRepository::new(
        endpoint(&server.url()),
        "app",
        Credentials::basic("user", "pass"),
        &ClientConfig::default(),
    )
    .unwrap();
    let descriptor = repo.get_tag("v1").await.unwrap();

    unauthorized.assert_async().await;
    token.assert_async().await;
    authorized.assert_async().await;
    assert_eq!(descriptor.digest, DIGEST);
}

#[tokio::test]
async fn test_get_tag_answers_basic_challenge() {
    let mut server = mockito::Server::new_async().await;
    let _unauthorized = server
        .mock("HEAD", "/v2/app/manifests/v1")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_header("WWW-Authenticate", r#"Basic realm="Registry""#)
        .create_async()
        .await;
    let authorized = server
        .mock("HEAD", "/v2/app/manifests/v1")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(200)
        .with_header("Docker-Content-Digest", DIGEST)
        .create_async()
        .await;

    let repo = RemoteRepository::new(
        endpoint(&server.url()),
        "app",
        Credentials::basic("user", "pass"),
        &ClientConfig::default(),
    )
    .unwrap();

    assert!(repo.get_tag("v1").await.is_ok());
    authorized.assert_async().await;
}

#[tokio::test]
async fn test_get_tag_anonymous_basic_challenge_is_authentication_error() {
    let mut server = mockito::Server::new_async().await;
    let _head = server
        .mock("HEAD", "/v2/app/manifests/v1")
        .with_status(401)
        .with_header("WWW-Authenticate", r#"Basic realm="Registry""#)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/v2/app/manifests/v1")
        .with_status(401)
        .with_header("WWW-Authenticate", r#"Basic realm="Registry""#)
        .with_body(r#"{"errors":[{"code":"UNAUTHORIZED"}]}"#)
        .create_async()
        .await;

    let repo = repository(&server.url(), "app");
    let err = repo.get_tag("v1").await.unwrap_err();

    assert!(matches!(
        err,
        TagCheckError::Authentication {
            status_code: Some(401),
            ..
        }
    ));
}

#[tokio::test]
async fn test_list_tags_single_page() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/team/app/tags/list")
        .with_status(200)
        .with_body(r#"{"name":"team/app","tags":["v2","v1","latest"]}"#)
        .create_async()
        .await;

    let repo = repository(&server.url(), "team/app");
    let tags = repo.list_tags().await.unwrap();

    mock.assert_async().await;
    assert_eq!(tags, vec!["v2", "v1", "latest"]);
}

#[tokio::test]
async fn test_list_tags_follows_pagination() {
    let mut server = mockito::Server::new_async().await;
    let second = server
        .mock("GET", "/v2/app/tags/list")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("last".into(), "b".into()),
            Matcher::UrlEncoded("n".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"name":"app","tags":["c"]}"#)
        .expect(1)
        .create_async()
        .await;
    let first = server
        .mock("GET", "/v2/app/tags/list")
        .with_status(200)
        .with_header("Link", "</v2/app/tags/list?last=b&n=2>; rel=\"next\"")
        .with_body(r#"{"name":"app","tags":["a","b"]}"#)
        .expect(1)
        .create_async()
        .await;

    let repo = repository(&server.url(), "app");
    let tags = repo.list_tags().await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(tags, vec!["a", "b", "c"]);
}

#[test]
fn test_next_page_url_resolves_relative_links() {
    let current = Url::parse("http://registry.local:5000/v2/app/tags/list").unwrap();

    let absolute_path = next_page_url(&current, "/v2/app/tags/list?last=b").unwrap();
    assert_eq!(
        absolute_path.as_str(),
        "http://registry.local:5000/v2/app/tags/list?last=b"
    );

    let relative = next_page_url(&current, "list?last=c").unwrap();
    assert_eq!(
        relative.as_str(),
        "http://registry.local:5000/v2/app/tags/list?last=c"
    );
}

#[test]
fn test_next_page_url_refuses_other_origins() {
    let current = Url::parse("http://registry.local:5000/v2/app/tags/list").unwrap();

    for link in [
        "http://elsewhere.local:5000/v2/app/tags/list?last=a",
        "https://registry.local:5000/v2/app/tags/list?last=a",
        "http://registry.local:6000/v2/app/tags/list?last=a",
        "//elsewhere.local/v2/app/tags/list",
    ] {
        let err = next_page_url(&current, link).unwrap_err();
        assert!(matches!(err, TagCheckError::Validation { .. }), "{link}");
    }
}

#[tokio::test]
async fn test_list_tags_stops_on_repeated_page() {
    let mut server = mockito::Server::new_async().await;
    let page = server
        .mock("GET", "/v2/app/tags/list")
        .with_status(200)
        .with_header("Link", "</v2/app/tags/list>; rel=\"next\"")
        .with_body(r#"{"name":"app","tags":["a"]}"#)
        .expect(1)
        .create_async()
        .await;

    let repo = repository(&server.url(), "app");
    let result = tokio::time::timeout(Duration::from_secs(3), repo.list_tags())
        .await
        .expect("list_tags finished");

    page.assert_async().await;
    assert!(matches!(result, Err(TagCheckError::Validation { .. })));
}

#[tokio::test]
async fn test_list_tags_keeps_credentials_on_endpoint() {
    let mut other = mockito::Server::new_async().await;
    let foreign = other
        .mock("GET", "/v2/app/tags/list")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"name":"app","tags":["b"]}"#)
        .expect(0)
        .create_async()
        .await;

    let mut server = mockito::Server::new_async().await;
    let _challenge = server
        .mock("GET", "/v2/app/tags/list")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_header("WWW-Authenticate", r#"Basic realm="Registry""#)
        .create_async()
        .await;
    let authorized = server
        .mock("GET", "/v2/app/tags/list")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(200)
        .with_header(
            "Link",
            &format!("<{}/v2/app/tags/list?last=a>; rel=\"next\"", other.url()),
        )
        .with_body(r#"{"name":"app","tags":["a"]}"#)
        .expect(1)
        .create_async()
        .await;

    let repo = RemoteRepository::new(
        endpoint(&server.url()),
        "app",
        Credentials::basic("user", "pass"),
        &ClientConfig::default(),
    )
    .unwrap();

    let err = repo.list_tags().await.unwrap_err();

    authorized.assert_async().await;
    foreign.assert_async().await;
    assert!(matches!(err, TagCheckError::Validation { .. }));
}

#[tokio::test]
async fn test_list_tags_null_list_is_empty() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/app/tags/list")
        .with_status(200)
        .with_body(r#"{"name":"app","tags":null}"#)
        .create_async()
        .await;

    let repo = repository(&server.url(), "app");
    assert!(repo.list_tags().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_tags_rejects_wrong_repository() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/app/tags/list")
        .with_status(200)
        .with_body(r#"{"name":"other","tags":["v1"]}"#)
        .create_async()
        .await;

    let repo = repository(&server.url(), "app");
    let err = repo.list_tags().await.unwrap_err();
    assert!(matches!(err, TagCheckError::Validation { .. }));
}

#[tokio::test]
async fn test_list_tags_unknown_repository() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/missing/tags/list")
        .with_status(404)
        .with_body(r#"{"errors":[{"code":"NAME_UNKNOWN","message":"repository name not known to registry"}]}"#)
        .create_async()
        .await;

    let repo = repository(&server.url(), "missing");
    let err = repo.list_tags().await.unwrap_err();
    assert_eq!(err.api_code(), Some(NAME_UNKNOWN));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Port 9 (discard) is not expected to accept HTTP connections.
    let repo = repository("http://127.0.0.1:9", "app");
    let err = repo.list_tags().await.unwrap_err();
    assert!(matches!(err, TagCheckError::Network { .. }));
}
