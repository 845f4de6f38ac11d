mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use common::{body, bootcamp_body, TestServer};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use devcamper_api::database::{BootcampStore, MemoryStore};
use devcamper_api::uploads::{AssetUploader, LocalUploader, PhotoFile, UploadError, UPLOAD_SUBDIR};

#[tokio::test]
async fn owner_deletes_own_bootcamp() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    let b1 = server.bootcamp_for(&u1, "Devworks Bootcamp").await?;

    let res = server
        .client
        .delete(server.api(&format!("/bootcamps/{}", b1)))
        .bearer_auth(&u1.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await?["data"], json!({}));

    assert_eq!(server.get_bootcamp(b1).await?.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn non_owner_update_is_forbidden_and_changes_nothing() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    let u2 = server.register("User Two", "u2@gmail.com").await?;
    let b1 = server.bootcamp_for(&u1, "Devworks Bootcamp").await?;

    let res = server
        .client
        .put(server.api(&format!("/bootcamps/{}", b1)))
        .bearer_auth(&u2.token)
        .json(&json!({"name": "Hijacked"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let err = body(res).await?;
    assert_eq!(err["code"], "FORBIDDEN");
    assert_eq!(err["error"], format!("User {} is not authorized to update this bootcamp", u2.id));

    let res = server
        .client
        .delete(server.api(&format!("/bootcamps/{}", b1)))
        .bearer_auth(&u2.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let current = body(server.get_bootcamp(b1).await?).await?;
    assert_eq!(current["data"]["name"], "Devworks Bootcamp");
    assert_eq!(current["data"]["user"], u1.id.to_string());
    Ok(())
}

#[tokio::test]
async fn owner_update_keeps_ownership_and_slug_in_step() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    let u2 = server.register("User Two", "u2@gmail.com").await?;
    let b1 = server.bootcamp_for(&u1, "Devworks Bootcamp").await?;

    let res = server
        .client
        .put(server.api(&format!("/bootcamps/{}", b1)))
        .bearer_auth(&u1.token)
        .json(&json!({"name": "Devworks Academy", "user": u2.id}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = body(res).await?;
    assert_eq!(updated["data"]["slug"], "devworks-academy");
    assert_eq!(updated["data"]["user"], u1.id.to_string());
    Ok(())
}

#[tokio::test]
async fn second_bootcamp_needs_admin() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    server.bootcamp_for(&u1, "Devworks Bootcamp").await?;

    let res = server.create_bootcamp(&u1, "Second Bootcamp").await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err = body(res).await?;
    assert_eq!(err["code"], "ALREADY_PUBLISHED");
    assert_eq!(err["error"], format!("the user with ID {} has already published a bootcamp", u1.id));

    let admin = server.admin().await?;
    server.bootcamp_for(&admin, "Admin Bootcamp One").await?;
    let second = server.bootcamp_for(&admin, "Admin Bootcamp Two").await?;
    assert_eq!(server.get_bootcamp(second).await?.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn concurrent_creates_publish_one_bootcamp() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;

    let (a, b) = tokio::join!(
        server.create_bootcamp(&u1, "Race One"),
        server.create_bootcamp(&u1, "Race Two")
    );
    let mut statuses = vec![a?.status(), b?.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    Ok(())
}

#[tokio::test]
async fn admin_deletes_any_bootcamp() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    let b1 = server.bootcamp_for(&u1, "Devworks Bootcamp").await?;
    let admin = server.admin().await?;

    let res = server
        .client
        .delete(server.api(&format!("/bootcamps/{}", b1)))
        .bearer_auth(&admin.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(server.get_bootcamp(b1).await?.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn orphaned_bootcamp_is_locked_even_for_admins() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    let b1 = server.bootcamp_for(&u1, "Devworks Bootcamp").await?;
    let admin = server.admin().await?;

    let res = server
        .client
        .delete(server.api(&format!("/users/{}", u1.id)))
        .bearer_auth(&admin.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let orphan = body(server.get_bootcamp(b1).await?).await?;
    assert!(orphan["data"]["user"].is_null());

    let res = server
        .client
        .put(server.api(&format!("/bootcamps/{}", b1)))
        .bearer_auth(&admin.token)
        .json(&json!({"housing": false}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn missing_and_malformed_ids_are_not_found() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;

    let res = server.get_bootcamp(uuid::Uuid::new_v4()).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.client.get(server.api("/bootcamps/not-a-uuid")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server
        .client
        .put(server.api(&format!("/bootcamps/{}", uuid::Uuid::new_v4())))
        .bearer_auth(&u1.token)
        .json(&json!({"housing": false}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn create_requires_auth_and_valid_body() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .post(server.api("/bootcamps"))
        .json(&bootcamp_body("Anonymous"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let u1 = server.register("User One", "u1@gmail.com").await?;
    let res = server
        .client
        .post(server.api("/bootcamps"))
        .bearer_auth(&u1.token)
        .json(&json!({"name": "No description", "careers": ["Astrology"]}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err = body(res).await?;
    assert_eq!(err["field_errors"]["description"], "Please add a description");
    assert!(err["field_errors"]["careers"].is_string());
    Ok(())
}

#[tokio::test]
async fn list_supports_filters_paging_and_select() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    for name in ["Alpha Camp", "Bravo Camp", "Charlie Camp"] {
        server.bootcamp_for(&admin, name).await?;
    }

    let res = server
        .client
        .get(server.api("/bootcamps?sort=name&limit=2&select=name"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let page = body(res).await?;
    assert_eq!(page["count"], 2);
    assert_eq!(page["pagination"]["next"], json!({"page": 2, "limit": 2}));
    assert_eq!(page["data"][0]["name"], "Alpha Camp");
    assert!(page["data"][0]["id"].is_string());
    assert!(page["data"][0].get("description").is_none());

    let res = server
        .client
        .get(server.api("/bootcamps?sort=name&limit=2&page=2"))
        .send()
        .await?;
    let page = body(res).await?;
    assert_eq!(page["count"], 1);
    assert_eq!(page["pagination"]["prev"], json!({"page": 1, "limit": 2}));

    let res = server.client.get(server.api("/bootcamps?colour=red")).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn photo_upload_is_authorized_then_validated() -> Result<()> {
    let server = TestServer::spawn_with(|config| config.uploads.max_file_bytes = 1024).await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    let u2 = server.register("User Two", "u2@gmail.com").await?;
    let b1 = server.bootcamp_for(&u1, "Devworks Bootcamp").await?;
    let url = server.api(&format!("/bootcamps/{}/photo", b1));

    let image = || Form::new().part("file", Part::bytes(vec![1u8; 16]).file_name("cat.jpg").mime_str("image/jpeg").unwrap());

    let res = server.client.put(&url).bearer_auth(&u2.token).multipart(image()).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let text = Form::new().part("file", Part::bytes(b"hello".to_vec()).file_name("a.txt").mime_str("text/plain")?);
    let res = server.client.put(&url).bearer_auth(&u1.token).multipart(text).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(res).await?["error"], "Please upload an image file");

    let big = Form::new().part("file", Part::bytes(vec![0u8; 2048]).file_name("big.jpg").mime_str("image/jpeg")?);
    let res = server.client.put(&url).bearer_auth(&u1.token).multipart(big).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.client.put(&url).bearer_auth(&u1.token).multipart(image()).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let photo = body(res).await?["data"]["photo"].as_str().unwrap_or_default().to_string();
    assert_eq!(photo, format!("photo_{}.jpg", b1));

    let res = server
        .client
        .get(format!("{}/uploads/{}", server.base_url, photo))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await?.len(), 16);
    Ok(())
}

#[tokio::test]
async fn request_bodies_are_sanitized() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;

    let mut payload = bootcamp_body("Script Camp");
    payload["description"] = json!("<script>alert(1)</script>");
    payload["$where"] = json!("1");
    let res = server
        .client
        .post(server.api("/bootcamps"))
        .bearer_auth(&u1.token)
        .json(&payload)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(body(res).await?["data"]["description"], "&lt;script&gt;alert(1)&lt;/script&gt;");
    Ok(())
}

/// Stores the photo, then deletes the bootcamp as a concurrent request would
struct DeleteDuringUpload {
    store: MemoryStore,
    inner: LocalUploader,
}

#[async_trait]
impl AssetUploader for DeleteDuringUpload {
    async fn store_photo(&self, bootcamp_id: Uuid, file: &PhotoFile) -> Result<String, UploadError> {
        let name = self.inner.store_photo(bootcamp_id, file).await?;
        let _ = self.store.delete_bootcamp(bootcamp_id).await;
        Ok(name)
    }

    async fn remove_photo(&self, name: &str) -> Result<(), UploadError> {
        self.inner.remove_photo(name).await
    }
}

#[tokio::test]
async fn photo_of_deleted_bootcamp_is_not_left_behind() -> Result<()> {
    let server = TestServer::spawn_with_uploader(|store, config| {
        Arc::new(DeleteDuringUpload {
            store: store.clone(),
            inner: LocalUploader::new(&config.uploads),
        })
    })
    .await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    let b1 = server.bootcamp_for(&u1, "Devworks Bootcamp").await?;

    let form = Form::new().part("file", Part::bytes(vec![1u8; 16]).file_name("cat.jpg").mime_str("image/jpeg")?);
    let res = server
        .client
        .put(server.api(&format!("/bootcamps/{}/photo", b1)))
        .bearer_auth(&u1.token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let stored = server.uploads.path().join(UPLOAD_SUBDIR).join(format!("photo_{}.jpg", b1));
    assert!(!stored.exists());
    Ok(())
}

#[tokio::test]
async fn oversized_json_body_is_rejected() -> Result<()> {
    let server = TestServer::spawn_with(|config| config.api.max_request_size_bytes = 512).await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;

    let mut payload = bootcamp_body("Verbose Camp");
    payload["description"] = json!("x".repeat(2048));
    let res = server
        .client
        .post(server.api("/bootcamps"))
        .bearer_auth(&u1.token)
        .json(&payload)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body(res).await?["code"], "PAYLOAD_TOO_LARGE");

    let res = server.client.get(server.api("/bootcamps")).send().await?;
    assert_eq!(body(res).await?["count"], 0);
    Ok(())
}

#[tokio::test]
async fn extreme_paging_values() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    for name in ["Alpha Camp", "Bravo Camp", "Charlie Camp"] {
        server.bootcamp_for(&admin, name).await?;
    }

    let res = server.client.get(server.api("/bootcamps?page=4294967295")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let page = body(res).await?;
    assert_eq!(page["count"], 0);
    assert!(page["pagination"].get("next").is_none());
    assert_eq!(page["pagination"]["prev"], json!({"page": 4294967294u32, "limit": 25}));

    let res = server.client.get(server.api("/bootcamps?limit=1000000")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let page = body(res).await?;
    assert_eq!(page["count"], 3);
    assert_eq!(page["pagination"], json!({}));

    let res = server.client.get(server.api("/bootcamps?limit=1&page=3")).send().await?;
    let page = body(res).await?;
    assert_eq!(page["count"], 1);
    assert_eq!(page["pagination"], json!({"prev": {"page": 2, "limit": 1}}));

    for bad in ["page=0", "page=4294967296", "limit=0", "limit=-5", "page=abc"] {
        let res = server.client.get(server.api(&format!("/bootcamps?{}", bad))).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", bad);
    }
    Ok(())
}

#[tokio::test]
async fn website_must_have_a_real_host() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;

    for website in ["http://.", "https://devworks.", "ftp://devworks.com", "devworks.com"] {
        let mut payload = bootcamp_body("Devworks Bootcamp");
        payload["website"] = json!(website);
        let res = server
            .client
            .post(server.api("/bootcamps"))
            .bearer_auth(&u1.token)
            .json(&payload)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", website);
        assert_eq!(body(res).await?["field_errors"]["website"], "Please use a valid URL with HTTP or HTTPS");
    }
    Ok(())
}
