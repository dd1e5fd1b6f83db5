//! Image Upload Mock Tests
//!
//! Two-phase upload (register metadata, then stream the file) against a
//! wiremock server standing in for Glance v2.

use nanocloud_openstack::{
    IdentityToken, ImageMetadata, OpenStackConfig, OpenStackError, ProjectScope, ProjectToken,
    TokenSubject,
};
use serde_json::json;
use std::io::Write;
use wiremock::{
    matchers::{body_bytes, body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const IMAGE_ID: &str = "b2173dd3-7ad6-4362-baa6-a68bce3565cb";

fn scope(mock_server: &MockServer) -> ProjectScope {
    let config = OpenStackConfig::default()
        .with_compute_url(format!("{}/compute/v2", mock_server.uri()))
        .with_image_url(format!("{}/v2", mock_server.uri()));

    ProjectScope::new(
        config,
        IdentityToken {
            token: "unscoped-token".to_string(),
            expires_at: None,
            user: None,
            catalog: None,
        },
        ProjectToken {
            token: "scoped-token".to_string(),
            expires_at: None,
            project: TokenSubject {
                id: "p-42".to_string(),
                name: None,
            },
            catalog: None,
        },
    )
}

fn image_file(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

async fn mount_registration(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v2/images"))
        .and(header("X-Auth-Token", "scoped-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": IMAGE_ID,
            "name": "windows-server",
            "status": "queued",
            "disk_format": "qcow2",
            "container_format": "bare",
            "visibility": "private",
            "file": format!("/v2/images/{}/file", IMAGE_ID)
        })))
        .expect(1)
        .mount(mock_server)
        .await;
}

fn metadata() -> ImageMetadata {
    ImageMetadata::new("windows-server").with_formats("qcow2", "bare")
}

#[tokio::test]
async fn test_upload_image_registers_then_streams() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/images"))
        .and(body_json(json!({
            "name": "windows-server",
            "disk_format": "qcow2",
            "container_format": "bare",
            "visibility": "public",
            "os_distro": "windows"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": IMAGE_ID,
            "name": "windows-server",
            "status": "queued"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("/v2/images/{}/file", IMAGE_ID)))
        .and(header("X-Auth-Token", "scoped-token"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(body_bytes(b"QFI\xfb disk bytes".to_vec()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let file = image_file(b"QFI\xfb disk bytes");
    let metadata = metadata()
        .with_visibility("public")
        .with_property("os_distro", json!("windows"));

    let image = scope(&mock_server)
        .upload_image(file.path(), metadata)
        .await
        .unwrap();

    assert_eq!(image.id, IMAGE_ID);
    assert_eq!(image.status.as_deref(), Some("queued"));
}

#[tokio::test]
async fn test_stream_failure_leaves_single_registration() {
    let mock_server = MockServer::start().await;
    mount_registration(&mock_server).await;

    Mock::given(method("PUT"))
        .and(path(format!("/v2/images/{}/file", IMAGE_ID)))
        .respond_with(ResponseTemplate::new(413).set_body_string("Image exceeds the storage quota"))
        .expect(1)
        .mount(&mock_server)
        .await;

    // No compensating delete is issued
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let file = image_file(b"disk");
    let error = scope(&mock_server)
        .upload_image(file.path(), metadata())
        .await
        .unwrap_err();

    assert!(error.to_string().contains("413"));
}

#[tokio::test]
async fn test_missing_file_fails_after_registration() {
    let mock_server = MockServer::start().await;
    mount_registration(&mock_server).await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let error = scope(&mock_server)
        .upload_image(dir.path().join("absent.qcow2"), metadata())
        .await
        .unwrap_err();

    assert!(matches!(error, OpenStackError::Io(_)));
}

#[tokio::test]
async fn test_registration_failure_skips_upload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/images"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid disk format"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let file = image_file(b"disk");
    let error = scope(&mock_server)
        .upload_image(file.path(), metadata())
        .await
        .unwrap_err();

    assert!(error.to_string().contains("Invalid disk format"));
}

#[tokio::test]
async fn test_get_image_after_upload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/images/{}", IMAGE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": IMAGE_ID,
            "status": "active",
            "size": 4096,
            "checksum": "7fa2b6a3"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let image = scope(&mock_server).image().get_image(IMAGE_ID).await.unwrap();

    assert_eq!(image.status.as_deref(), Some("active"));
    assert_eq!(image.size, Some(4096));
    assert_eq!(image.extra["checksum"], "7fa2b6a3");
}
