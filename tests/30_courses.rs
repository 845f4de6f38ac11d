mod common;

use anyhow::{Context, Result};
use common::{body, TestServer};
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

async fn course_id(res: reqwest::Response) -> Result<Uuid> {
    anyhow::ensure!(res.status() == StatusCode::CREATED, "course create failed: {}", res.status());
    Ok(body(res).await?["data"]["id"].as_str().context("id missing")?.parse()?)
}

#[tokio::test]
async fn owner_adds_courses_and_average_cost_follows() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    let b1 = server.bootcamp_for(&u1, "Devworks Bootcamp").await?;

    let front = course_id(server.add_course(&u1, b1, "Front End", 8000).await?).await?;
    course_id(server.add_course(&u1, b1, "Full Stack", 10001).await?).await?;

    let bootcamp = body(server.get_bootcamp(b1).await?).await?;
    assert_eq!(bootcamp["data"]["average_cost"], 9010);

    let res = server
        .client
        .delete(server.api(&format!("/courses/{}", front)))
        .bearer_auth(&u1.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let bootcamp = body(server.get_bootcamp(b1).await?).await?;
    assert_eq!(bootcamp["data"]["average_cost"], 10010);
    Ok(())
}

#[tokio::test]
async fn courses_inherit_bootcamp_ownership() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    let u2 = server.register("User Two", "u2@gmail.com").await?;
    let b1 = server.bootcamp_for(&u1, "Devworks Bootcamp").await?;
    let course = course_id(server.add_course(&u1, b1, "Front End", 8000).await?).await?;

    let res = server.add_course(&u2, b1, "Intruder Course", 1).await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .put(server.api(&format!("/courses/{}", course)))
        .bearer_auth(&u2.token)
        .json(&json!({"tuition": 1}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body(res).await?["error"],
        format!("User {} is not authorized to update this course", u2.id)
    );

    let res = server
        .client
        .put(server.api(&format!("/courses/{}", course)))
        .bearer_auth(&u1.token)
        .json(&json!({"tuition": 9000, "minimum_skill": "advanced"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = body(res).await?;
    assert_eq!(updated["data"]["tuition"], 9000);
    assert_eq!(updated["data"]["minimum_skill"], "advanced");

    let admin = server.admin().await?;
    let res = server
        .client
        .delete(server.api(&format!("/courses/{}", course)))
        .bearer_auth(&admin.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client.get(server.api(&format!("/courses/{}", course))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn bootcamp_courses_listing_and_cascade() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    let u2 = server.register("User Two", "u2@gmail.com").await?;
    let b1 = server.bootcamp_for(&u1, "Devworks Bootcamp").await?;
    let b2 = server.bootcamp_for(&u2, "ModernTech Bootcamp").await?;
    let course = course_id(server.add_course(&u1, b1, "Front End", 8000).await?).await?;
    course_id(server.add_course(&u2, b2, "UI/UX", 10000).await?).await?;

    let res = server.client.get(server.api(&format!("/bootcamps/{}/courses", b1))).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let listing = body(res).await?;
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["data"][0]["title"], "Front End");
    assert_eq!(listing["data"][0]["bootcamp"], b1.to_string());

    let res = server.client.get(server.api("/courses?minimum_skill=beginner")).send().await?;
    assert_eq!(body(res).await?["count"], 2);

    let res = server
        .client
        .get(server.api(&format!("/bootcamps/{}/courses", Uuid::new_v4())))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server
        .client
        .delete(server.api(&format!("/bootcamps/{}", b1)))
        .bearer_auth(&u1.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client.get(server.api(&format!("/courses/{}", course))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = server.client.get(server.api("/courses")).send().await?;
    assert_eq!(body(res).await?["count"], 1);
    Ok(())
}

#[tokio::test]
async fn invalid_course_is_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;
    let u1 = server.register("User One", "u1@gmail.com").await?;
    let b1 = server.bootcamp_for(&u1, "Devworks Bootcamp").await?;

    let res = server
        .client
        .post(server.api(&format!("/bootcamps/{}/courses", b1)))
        .bearer_auth(&u1.token)
        .json(&json!({"title": "No weeks", "description": "d", "tuition": 100}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err = body(res).await?;
    assert_eq!(err["field_errors"]["weeks"], "Please add number of weeks");
    assert_eq!(err["field_errors"]["minimum_skill"], "Please add a minimum skill");
    Ok(())
}
