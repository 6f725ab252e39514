//! Feed Tests

mod common;

use axum::http::StatusCode;
use common::{app, post_id};
use serde_json::json;

#[tokio::test]
async fn empty_feed_is_an_empty_list() {
    let app = app().await;
    let alice = app.create_user("alice").await;

    let resp = app.get("/feed", Some(&alice.token)).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json(), json!([]));
}

#[tokio::test]
async fn feed_requires_authentication() {
    let app = app().await;

    let resp = app.get("/feed", None).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn feed_is_newest_first_with_authors_and_viewer_state() {
    let app = app().await;
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let first = app.create_post(&alice, Some("first")).await;
    let second = app.create_post(&bob, Some("second")).await;
    let third = app.create_post(&alice, Some("third")).await;

    app.post_json(
        &format!("/posts/{}/like", post_id(&first)),
        json!({}),
        Some(&bob.token),
    )
    .await;
    app.post_json(
        &format!("/posts/{}/bookmark", post_id(&third)),
        json!({}),
        Some(&bob.token),
    )
    .await;

    let feed = app.get("/feed", Some(&bob.token)).await.json();
    let feed = feed.as_array().unwrap();
    let ids: Vec<&str> = feed.iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert_eq!(
        ids,
        [
            third["id"].as_str().unwrap(),
            second["id"].as_str().unwrap(),
            first["id"].as_str().unwrap(),
        ]
    );

    assert_eq!(feed[0]["author"]["username"], "alice");
    assert_eq!(feed[0]["author"]["image"], "https://img.example.com/alice.png");
    assert_eq!(feed[1]["author"]["id"], bob.id.to_string());
    assert_eq!(feed[0]["is_bookmarked"], true);
    assert_eq!(feed[0]["is_liked"], false);
    assert_eq!(feed[2]["is_liked"], true);
    assert_eq!(feed[2]["is_bookmarked"], false);

    let alice_feed = app.get("/feed", Some(&alice.token)).await.json();
    assert_eq!(alice_feed[2]["is_liked"], false);
    assert_eq!(alice_feed[2]["like_count"], 1);
}

#[tokio::test]
async fn reading_the_feed_does_not_write() {
    let app = app().await;
    let alice = app.create_user("alice").await;
    app.create_post(&alice, None).await;

    for _ in 0..3 {
        app.get("/feed", Some(&alice.token)).await;
    }

    assert_eq!(app.count_all("likes").await, 0);
    assert_eq!(app.count_all("bookmarks").await, 0);
    assert_eq!(app.count_all("notifications").await, 0);
    assert_eq!(app.user(alice.id).await["post_count"], 1);
}
