mod common;

use std::time::Duration;

use common::{signed_in_client, spawn_server, test_config};
use serde_json::{json, Value};

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> Value {
    let res = client.post(url).json(&body).send().await.unwrap();
    assert_eq!(res.status(), 200);
    res.json().await.unwrap()
}

#[tokio::test]
async fn timer_starts_idle_at_the_focus_preset() {
    let server = spawn_server(test_config()).await;
    let (client, _) = signed_in_client(&server, "ada@example.com").await;

    let timer: Value = client
        .get(server.url("/api/timer"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(timer["state"], "idle");
    assert_eq!(timer["kind"], "focus");
    assert_eq!(timer["display"], "25:00");
}

#[tokio::test]
async fn duration_changes_are_ignored_while_running() {
    let server = spawn_server(test_config()).await;
    let (client, _) = signed_in_client(&server, "ada@example.com").await;

    let selected = post_json(&client, server.url("/api/timer/duration"), json!({ "preset": "short_break" })).await;
    assert_eq!(selected["applied"], true);
    assert_eq!(selected["display"], "05:00");

    let zero = post_json(&client, server.url("/api/timer/duration"), json!({ "secs": 0 })).await;
    assert_eq!(zero["applied"], false);

    let started = post_json(&client, server.url("/api/timer/start"), json!({})).await;
    assert_eq!(started["state"], "running");

    let ignored = post_json(&client, server.url("/api/timer/duration"), json!({ "secs": 60 })).await;
    assert_eq!(ignored["applied"], false);
    assert_eq!(ignored["duration_secs"], 300);

    let stopped = post_json(&client, server.url("/api/timer/stop"), json!({})).await;
    assert_eq!(stopped["state"], "idle");

    let reset = post_json(&client, server.url("/api/timer/reset"), json!({})).await;
    assert_eq!(reset["remaining_secs"], 300);

    let res = client
        .post(server.url("/api/timer/duration"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn finished_focus_session_lands_in_stats_and_leaderboard() {
    let server = spawn_server(test_config()).await;
    let (client, user) = signed_in_client(&server, "ada@example.com").await;

    post_json(&client, server.url("/api/timer/duration"), json!({ "secs": 1 })).await;
    post_json(&client, server.url("/api/timer/start"), json!({})).await;

    let mut stats = Value::Null;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stats = client
            .get(server.url("/api/stats/me"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if stats["timers_finished"] == 1 {
            break;
        }
    }
    assert_eq!(stats["timers_finished"], 1);
    assert_eq!(stats["seconds_focused"], 1);
    assert_eq!(stats["streak"], 1);

    let timer: Value = client
        .get(server.url("/api/timer"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(timer["state"], "idle");
    assert_eq!(timer["remaining_secs"], 1);

    let board: Value = client
        .get(server.url("/api/leaderboard?limit=5"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(board[0]["uid"], user["id"]);
    assert_eq!(board[0]["rank"], 1);
}

#[tokio::test]
async fn event_stream_opens_with_the_current_state() {
    let server = spawn_server(test_config()).await;
    let (client, _) = signed_in_client(&server, "ada@example.com").await;

    let mut res = client
        .get(server.url("/api/timer/events"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let chunk = tokio::time::timeout(Duration::from_secs(5), res.chunk())
        .await
        .expect("no event within timeout")
        .unwrap()
        .unwrap();
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("event: updated"), "unexpected frame: {text}");
    assert!(text.contains("\"state\":\"idle\""));
}

#[tokio::test]
async fn event_stream_ends_after_the_last_sign_out() {
    let server = spawn_server(test_config()).await;
    let (client, _) = signed_in_client(&server, "ada@example.com").await;

    let mut res = client
        .get(server.url("/api/timer/events"))
        .send()
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), res.chunk())
        .await
        .expect("no event within timeout")
        .unwrap();

    let logout = client.post(server.url("/auth/logout")).send().await.unwrap();
    assert_eq!(logout.status(), 204);

    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(_frame) = res.chunk().await.unwrap() {}
    })
    .await;
    assert!(ended.is_ok(), "event stream stayed open after sign-out");
}
