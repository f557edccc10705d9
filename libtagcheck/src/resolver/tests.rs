use super::*;
use crate::error::ApiError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a fake handle answers with.
#[derive(Clone)]
enum Reply {
    Tag(&'static str),
    Tags(Vec<&'static str>),
    Code(&'static str),
    Timeout,
    Refused,
    Unauthorized,
}

struct FakeHandle {
    name: &'static str,
    reply: Reply,
    calls: AtomicUsize,
}

impl FakeHandle {
    fn new(name: &'static str, reply: Reply) -> Self {
        Self {
            name,
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> TagCheckError {
        match &self.reply {
            Reply::Code(code) => TagCheckError::api(
                404,
                vec![ApiError {
                    code: code.to_string(),
                    message: "unknown".to_string(),
                }],
            ),
            Reply::Timeout => TagCheckError::network("Request timed out after 30s"),
            Reply::Refused => TagCheckError::network("Connection refused"),
            Reply::Unauthorized => TagCheckError::authentication("Unauthorized", Some(401)),
            Reply::Tag(_) | Reply::Tags(_) => TagCheckError::validation("unexpected query"),
        }
    }
}

impl TagSource for FakeHandle {
    fn describe(&self) -> String {
        self.name.to_string()
    }

    async fn get_tag(&self, tag: &str) -> Result<TagDescriptor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Tag(digest) => Ok(TagDescriptor {
                tag: tag.to_string(),
                digest: digest.to_string(),
                media_type: None,
                size: None,
            }),
            _ => Err(self.fail()),
        }
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Tags(tags) => Ok(tags.iter().map(|t| t.to_string()).collect()),
            _ => Err(self.fail()),
        }
    }
}

const DIGEST: &str = "sha256:6a1c0e1f1e3bb2a8e1c3c4a9b6f8d2e5a7c9b1d3f5e7a9c1b3d5f7e9a1c3b5d7";

fn reference(image: &str) -> Reference {
    image.parse().unwrap()
}

#[tokio::test]
async fn test_missing_tag_contacts_no_handle() {
    let handles = vec![
        FakeHandle::new("a", Reply::Tag(DIGEST)),
        FakeHandle::new("b", Reply::Tag(DIGEST)),
    ];

    let err = check_tag(&reference("registry.example.com/app"), &handles)
        .await
        .unwrap_err();

    assert!(matches!(err, TagCheckError::Validation { .. }));
    assert_eq!(err.to_string(), "Validation error: Image must have tag");
    assert!(handles.iter().all(|h| h.calls() == 0));
}

#[tokio::test]
async fn test_first_success_short_circuits() {
    let handles = vec![
        FakeHandle::new("mirror", Reply::Tag(DIGEST)),
        FakeHandle::new("hub", Reply::Tag(DIGEST)),
    ];

    let resolution = check_tag(&reference("docker.io/library/alpine:3.19"), &handles)
        .await
        .unwrap();

    let descriptor = resolution.found().unwrap();
    assert_eq!(descriptor.tag, "3.19");
    assert_eq!(descriptor.digest, DIGEST);
    assert!(resolution.failures().is_empty());
    assert_eq!(handles[0].calls(), 1);
    assert_eq!(handles[1].calls(), 0);
}

#[tokio::test]
async fn test_manifest_unknown_is_definitive() {
    let handles = vec![
        FakeHandle::new("a", Reply::Code(MANIFEST_UNKNOWN)),
        FakeHandle::new("b", Reply::Tag(DIGEST)),
    ];

    let resolution = check_tag(&reference("registry.example.com/app:v9"), &handles)
        .await
        .unwrap();

    match resolution {
        Resolution::Absent {
            endpoint,
            error,
            failures,
        } => {
            assert_eq!(endpoint, "a");
            assert_eq!(error.api_code(), Some(MANIFEST_UNKNOWN));
            assert!(failures.is_empty());
        }
        other => panic!("expected Absent, got {:?}", other),
    }
    assert_eq!(handles[1].calls(), 0);
}

#[tokio::test]
async fn test_transient_failure_moves_to_next_handle() {
    let handles = vec![
        FakeHandle::new("mirror", Reply::Timeout),
        FakeHandle::new("hub", Reply::Tag(DIGEST)),
    ];

    let resolution = check_tag(&reference("alpine:3.19"), &handles)
        .await
        .unwrap();

    match resolution {
        Resolution::Found {
            endpoint,
            value,
            failures,
        } => {
            assert_eq!(endpoint, "hub");
            assert_eq!(value.digest, DIGEST);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].endpoint, "mirror");
            assert!(matches!(failures[0].error, TagCheckError::Network { .. }));
        }
        other => panic!("expected Found, got {:?}", other),
    }
    assert_eq!(handles[0].calls(), 1);
    assert_eq!(handles[1].calls(), 1);
}

#[tokio::test]
async fn test_not_found_after_transient_failure() {
    let handles = vec![
        FakeHandle::new("a", Reply::Refused),
        FakeHandle::new("b", Reply::Code(MANIFEST_UNKNOWN)),
        FakeHandle::new("c", Reply::Tag(DIGEST)),
    ];

    let resolution = check_tag(&reference("registry.example.com/app:v9"), &handles)
        .await
        .unwrap();

    assert!(resolution.is_absent());
    assert_eq!(resolution.failures().len(), 1);
    assert_eq!(handles[2].calls(), 0);
}

#[tokio::test]
async fn test_all_generic_failures_exhaust() {
    let handles = vec![
        FakeHandle::new("a", Reply::Timeout),
        FakeHandle::new("b", Reply::Unauthorized),
        FakeHandle::new("c", Reply::Code("DENIED")),
    ];

    let resolution = check_tag(&reference("registry.example.com/app:v1"), &handles)
        .await
        .unwrap();

    assert!(resolution.is_exhausted());
    let endpoints: Vec<&str> = resolution
        .failures()
        .iter()
        .map(|a| a.endpoint.as_str())
        .collect();
    assert_eq!(endpoints, vec!["a", "b", "c"]);
    assert!(handles.iter().all(|h| h.calls() == 1));
}

#[tokio::test]
async fn test_name_unknown_is_not_definitive_for_tag_check() {
    let handles = vec![
        FakeHandle::new("a", Reply::Code(NAME_UNKNOWN)),
        FakeHandle::new("b", Reply::Tag(DIGEST)),
    ];

    let resolution = check_tag(&reference("registry.example.com/app:v1"), &handles)
        .await
        .unwrap();

    assert!(resolution.found().is_some());
    assert_eq!(resolution.failures().len(), 1);
}

#[tokio::test]
async fn test_no_handles_is_exhausted() {
    let handles: Vec<FakeHandle> = Vec::new();

    let resolution = check_tag(&reference("registry.example.com/app:v1"), &handles)
        .await
        .unwrap();
    assert!(resolution.is_exhausted());
    assert!(resolution.failures().is_empty());

    let listing = list_all_tags(&handles).await;
    assert!(listing.is_exhausted());
}

#[tokio::test]
async fn test_list_returns_first_answer_unmodified() {
    let handles = vec![
        FakeHandle::new("a", Reply::Timeout),
        FakeHandle::new("b", Reply::Tags(vec!["v2", "latest", "v1", "v1"])),
        FakeHandle::new("c", Reply::Tags(vec!["other"])),
    ];

    let resolution = list_all_tags(&handles).await;

    assert_eq!(
        resolution.found().unwrap(),
        &vec![
            "v2".to_string(),
            "latest".to_string(),
            "v1".to_string(),
            "v1".to_string()
        ]
    );
    assert_eq!(resolution.failures().len(), 1);
    assert_eq!(handles[2].calls(), 0);
}

#[tokio::test]
async fn test_list_name_unknown_is_definitive() {
    let handles = vec![
        FakeHandle::new("a", Reply::Code(NAME_UNKNOWN)),
        FakeHandle::new("b", Reply::Tags(vec!["v1"])),
    ];

    let resolution = list_all_tags(&handles).await;

    assert!(resolution.is_absent());
    assert_eq!(handles[1].calls(), 0);
}

#[tokio::test]
async fn test_list_manifest_unknown_is_not_definitive() {
    let handles = vec![
        FakeHandle::new("a", Reply::Code(MANIFEST_UNKNOWN)),
        FakeHandle::new("b", Reply::Tags(vec![])),
    ];

    let resolution = list_all_tags(&handles).await;

    assert_eq!(resolution.found().unwrap().len(), 0);
    assert_eq!(resolution.failures().len(), 1);
}
