use super::*;
use std::str::FromStr;

#[test]
fn test_reference_from_valid_string_succeeds() {
    let reference = Reference::from_str("ghcr.io/user/repo:latest");
    assert!(reference.is_ok());
}

#[test]
fn test_reference_from_invalid_string_fails() {
    let reference = Reference::from_str("Invalid-Reference-With-Caps");
    assert!(matches!(
        reference.unwrap_err(),
        TagCheckError::Validation { .. }
    ));
}

#[test]
fn test_reference_from_empty_string_fails() {
    for input in ["", "   "] {
        let err = Reference::from_str(input).unwrap_err();
        assert!(err.to_string().contains("can not be empty"));
    }
}

#[test]
fn test_reference_accessors() {
    let reference = Reference::from_str("registry.example.com/app:v1").unwrap();
    assert_eq!(reference.domain(), "registry.example.com");
    assert_eq!(reference.repository(), "app");
    assert_eq!(reference.tag(), Some("v1"));
    assert_eq!(reference.digest(), None);
}

#[test]
fn test_reference_with_port_and_tag() {
    let reference = Reference::from_str("localhost:5000/team/app:1.2.3").unwrap();
    assert_eq!(reference.domain(), "localhost:5000");
    assert_eq!(reference.repository(), "team/app");
    assert_eq!(reference.tag(), Some("1.2.3"));
}

#[test]
fn test_reference_without_tag_has_no_tag() {
    let reference = Reference::from_str("registry.example.com/app").unwrap();
    assert_eq!(reference.tag(), None);
}

#[test]
fn test_reference_with_port_without_tag_has_no_tag() {
    let reference = Reference::from_str("localhost:5000/app").unwrap();
    assert_eq!(reference.domain(), "localhost:5000");
    assert_eq!(reference.tag(), None);
}

#[test]
fn test_short_name_normalizes_to_docker_hub() {
    let reference = Reference::from_str("alpine:3.19").unwrap();
    assert_eq!(reference.domain(), "docker.io");
    assert_eq!(reference.repository(), "library/alpine");
    assert_eq!(reference.tag(), Some("3.19"));
}

#[test]
fn test_require_tag() {
    let tagged = Reference::from_str("registry.example.com/app:v1").unwrap();
    assert_eq!(tagged.require_tag().unwrap(), "v1");

    let untagged = Reference::from_str("registry.example.com/app").unwrap();
    let err = untagged.require_tag().unwrap_err();
    assert!(matches!(err, TagCheckError::Validation { .. }));
    assert!(err.to_string().contains("must have tag"));
}

#[test]
fn test_digest_only_reference_has_no_tag() {
    let reference = Reference::from_str(
        "registry.example.com/app@sha256:7173b809ca12ec5dee4506cd86be934c4596dd234ee82c0662eac04a8c2c71dc",
    )
    .unwrap();
    assert_eq!(reference.tag(), None);
    assert!(reference.digest().is_some());
}

#[test]
fn test_reference_display() {
    let reference = Reference::from_str("registry.example.com/app:v1").unwrap();
    assert_eq!(reference.to_string(), "registry.example.com/app:v1");

    let untagged = Reference::from_str("registry.example.com/app").unwrap();
    assert_eq!(untagged.to_string(), "registry.example.com/app");
}
