//! Integration tests for video listings, fetch, view counting and deletion.

mod common;

use std::collections::BTreeMap;

use common::{signup, upload, wait_for_settled, TestHarness};
use serde_json::Value;
use vs_core::{UserId, VideoId};
use vs_db::queries::videos::{self, ReadyRecord};

/// Insert a ready video straight into the database.
fn seed_ready(h: &TestHarness, uploader: &str, title: &str, views: i64) -> VideoId {
    let conn = h.conn();
    let uploader: UserId = uploader.parse().unwrap();
    let video = videos::create_placeholder(&conn, title, "seeded", "1-src.mp4", uploader).unwrap();
    let dir = format!("processed/{}", video.id);
    let record = ReadyRecord {
        file_path: format!("{dir}/{}-720p.mp4", video.id),
        thumbnail_path: None,
        formats: BTreeMap::from([("mp4".to_string(), format!("{dir}/{}-h264.mp4", video.id))]),
        qualities: BTreeMap::from([("720p".to_string(), format!("{dir}/{}-720p.mp4", video.id))]),
        duration_secs: Some(3.0),
        size_bytes: Some(100),
    };
    assert!(videos::mark_ready(&conn, video.id, &record).unwrap());
    for _ in 0..views {
        videos::increment_views(&conn, video.id).unwrap();
    }
    video.id
}

fn titles(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|v| v["title"].as_str().unwrap().to_string())
        .collect()
}

async fn get_json(url: String) -> (u16, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
async fn list_newest_first_with_status_filter() {
    let (h, addr) = TestHarness::with_server().await;
    let creator = signup(addr, "maker", "creator").await;
    seed_ready(&h, &creator.id, "older", 0);
    seed_ready(&h, &creator.id, "newer", 0);
    {
        let conn = h.conn();
        let uploader: UserId = creator.id.parse().unwrap();
        let pending = videos::create_placeholder(&conn, "pending", "d", "2-src.mp4", uploader).unwrap();
        videos::mark_failed(&conn, pending.id, "Probe error: bad").unwrap();
    }

    let (status, body) = get_json(format!("http://{addr}/api/videos")).await;
    assert_eq!(status, 200);
    assert_eq!(titles(&body), vec!["pending", "newer", "older"]);

    let (_, ready) = get_json(format!("http://{addr}/api/videos?status=ready")).await;
    assert_eq!(titles(&ready), vec!["newer", "older"]);

    let (_, page) = get_json(format!("http://{addr}/api/videos?offset=1&limit=1")).await;
    assert_eq!(titles(&page), vec!["newer"]);

    let (status, _) = get_json(format!("http://{addr}/api/videos?status=bogus")).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn featured_and_trending_order_by_views() {
    let (h, addr) = TestHarness::with_server().await;
    let creator = signup(addr, "maker", "creator").await;
    seed_ready(&h, &creator.id, "quiet", 1);
    seed_ready(&h, &creator.id, "popular", 5);
    seed_ready(&h, &creator.id, "middling", 3);

    let (_, featured) = get_json(format!("http://{addr}/api/videos/featured")).await;
    assert_eq!(titles(&featured), vec!["popular", "middling", "quiet"]);

    let (_, trending) = get_json(format!("http://{addr}/api/videos/trending")).await;
    assert_eq!(titles(&trending), vec!["popular", "middling", "quiet"]);
}

#[tokio::test]
async fn featured_is_capped_at_six() {
    let (h, addr) = TestHarness::with_server().await;
    let creator = signup(addr, "maker", "creator").await;
    for i in 0..8 {
        seed_ready(&h, &creator.id, &format!("v{i}"), 0);
    }
    let (_, featured) = get_json(format!("http://{addr}/api/videos/featured")).await;
    assert_eq!(featured.as_array().unwrap().len(), 6);
    let (_, trending) = get_json(format!("http://{addr}/api/videos/trending")).await;
    assert_eq!(trending.as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn get_video_resolves_urls_from_host() {
    let (h, addr) = TestHarness::with_server().await;
    let creator = signup(addr, "maker", "creator").await;
    let id = seed_ready(&h, &creator.id, "resolved", 0);

    let (status, body) = get_json(format!("http://{addr}/api/videos/{id}")).await;
    assert_eq!(status, 200);
    assert_eq!(
        body["file_url"],
        format!("http://{addr}/uploads/processed/{id}/{id}-720p.mp4")
    );
    assert_eq!(
        body["formats"]["mp4"],
        format!("http://{addr}/uploads/processed/{id}/{id}-h264.mp4")
    );
}

#[tokio::test]
async fn public_url_overrides_host() {
    let mut config = common::test_config();
    config.server.public_url = Some("https://cdn.example.com/".into());
    let (h, addr) = TestHarness::with_server_config(config).await;
    let creator = signup(addr, "maker", "creator").await;
    let id = seed_ready(&h, &creator.id, "cdn", 0);

    let (_, body) = get_json(format!("http://{addr}/api/videos/{id}")).await;
    assert_eq!(
        body["file_url"],
        format!("https://cdn.example.com/uploads/processed/{id}/{id}-720p.mp4")
    );
}

#[tokio::test]
async fn unknown_and_malformed_ids() {
    let (_h, addr) = TestHarness::with_server().await;

    let (status, body) = get_json(format!("http://{addr}/api/videos/{}", VideoId::new())).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "not_found");

    let (status, body) = get_json(format!("http://{addr}/api/videos/not-a-uuid")).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid video ID");
}

#[tokio::test]
async fn record_view_increments() {
    let (h, addr) = TestHarness::with_server().await;
    let creator = signup(addr, "maker", "creator").await;
    let id = seed_ready(&h, &creator.id, "watched", 0);
    let client = reqwest::Client::new();

    for expected in 1..=2 {
        let body: Value = client
            .post(format!("http://{addr}/api/videos/{id}/view"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["views"], expected);
    }

    let resp = client
        .post(format!("http://{addr}/api/videos/{}/view", VideoId::new()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn uploader_listing_requires_auth_and_includes_all_statuses() {
    let (h, addr) = TestHarness::with_server().await;
    let creator = signup(addr, "maker", "creator").await;
    seed_ready(&h, &creator.id, "done", 0);
    {
        let conn = h.conn();
        let uploader: UserId = creator.id.parse().unwrap();
        videos::create_placeholder(&conn, "in flight", "d", "3-src.mp4", uploader).unwrap();
    }
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/videos/user/{}", creator.id);

    assert_eq!(client.get(&url).send().await.unwrap().status(), 401);

    let body: Value = client
        .get(&url)
        .bearer_auth(&creator.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&body), vec!["in flight", "done"]);
}

#[tokio::test]
async fn only_uploader_can_delete() {
    let (h, addr) = TestHarness::with_server().await;
    let owner = signup(addr, "owner", "creator").await;
    let other = signup(addr, "other", "creator").await;

    let uploaded = upload(addr, &owner.token, "Mine", "mine.mp4").await;
    let id = uploaded["video"]["id"].as_str().unwrap().to_string();
    wait_for_settled(addr, &id).await;
    assert!(h.processed_dir().join(&id).exists());

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/videos/{id}");

    let resp = client.delete(&url).bearer_auth(&other.token).send().await.unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Access denied: You can only delete your own videos");

    let resp = client.delete(&url).bearer_auth(&owner.token).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(!h.processed_dir().join(&id).exists());

    let resp = client.delete(&url).bearer_auth(&owner.token).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(client.get(&url).send().await.unwrap().status(), 404);
}
