use serde_json::{json, Value};
use std::time::Duration;
use vinyl_drop::sources::{RedditClient, RedditSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn reddit_post(id: &str, title: &str, flair: Option<&str>, score: i64) -> Value {
    json!({
        "data": {
            "id": id,
            "title": title,
            "url": "https://www.roughtrade.com/en-us/product/x",
            "permalink": format!("/r/VinylReleases/comments/{}/", id),
            "created_utc": 1_700_000_000.0,
            "score": score,
            "num_comments": 4,
            "author": "poster",
            "link_flair_text": flair,
            "thumbnail": "self"
        }
    })
}

/// Serves `posts` as the newest listing of `subreddit`.
pub async fn mount_listing(server: &MockServer, subreddit: &str, posts: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(format!("/r/{}/new.json", subreddit)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "children": posts }
        })))
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer, subreddit: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/r/{}/new.json", subreddit)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub fn reddit_source(server: &MockServer, subreddit: &str, flairs: &[&str]) -> RedditSource {
    let client =
        RedditClient::with_base_url("vinyl-drop-test", Duration::from_secs(5), &server.uri())
            .unwrap();
    RedditSource::new(
        client,
        subreddit,
        flairs.iter().map(|f| f.to_string()).collect(),
    )
}
