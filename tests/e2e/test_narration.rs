use crate::e2e::helpers;

use audiobook_backend::domain::book::CreateBookResponse;
use audiobook_backend::infrastructure::storage::BlobStore;
use helpers::fixtures::{create_book_body, sample_book_text, FakeTts};
use helpers::{token_for, TestContext};
use hyper::StatusCode;
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::time::Duration;
use test_context::test_context;
use uuid::Uuid;

const OWNER: &str = "narrator@example.com";

async fn upload(ctx: &TestContext, source: &[u8]) -> Uuid {
    let body = create_book_body("Narrated", source, None);
    let response = ctx
        .client
        .post_with_auth("/api/books", &body, &token_for(OWNER))
        .await
        .unwrap();
    response.assert_status(StatusCode::CREATED);
    response.json::<CreateBookResponse>().unwrap().id
}

/// Poll the status endpoint until the run leaves `running`
async fn wait_for_terminal_state(ctx: &TestContext, id: Uuid) -> serde_json::Value {
    let path = format!("/api/books/{}/narration", id);
    for _ in 0..100 {
        let response = ctx.client.get_with_auth(&path, &token_for(OWNER)).await.unwrap();
        response.assert_status(StatusCode::OK);
        let body = response.body.unwrap();
        if body["state"] != "running" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("narration of {} did not finish in time", id);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_narrate_a_book_end_to_end(ctx: &TestContext) {
    let id = upload(ctx, sample_book_text().as_bytes()).await;
    let token = token_for(OWNER);

    ctx.client
        .get_with_auth(&format!("/api/books/{}/audio", id), &token)
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_message("Audio not yet available");

    let response = ctx
        .client
        .post_empty_with_auth(&format!("/api/books/{}/narration", id), &token)
        .await
        .unwrap();
    response.assert_status(StatusCode::ACCEPTED);
    assert_eq!(response.str_field("message"), Some("Process started"));

    let status = wait_for_terminal_state(ctx, id).await;
    assert_eq!(status["state"], "complete");

    let audio_key = format!("{}/{}/audio", OWNER, id);
    let audio = ctx.blobs.get(&audio_key).await.unwrap().unwrap();
    assert!(audio.starts_with(&FakeTts::audio_for("The quick brown fox")[..20]));
    assert!(!ctx
        .blobs
        .exists(&format!("{}/{}/audio_scratch", OWNER, id))
        .await
        .unwrap());

    let response = ctx
        .client
        .get_with_auth(&format!("/api/books/{}/audio", id), &token)
        .await
        .unwrap();
    response.assert_status(StatusCode::OK);
    assert!(response.str_field("audio_url").unwrap().contains(&audio_key));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_not_restart_when_audio_exists(ctx: &TestContext) {
    let id = upload(ctx, sample_book_text().as_bytes()).await;
    ctx.blobs
        .put(&format!("{}/{}/audio", OWNER, id), b"mp3".to_vec(), "audio/mpeg")
        .await
        .unwrap();

    let response = ctx
        .client
        .post_empty_with_auth(&format!("/api/books/{}/narration", id), &token_for(OWNER))
        .await
        .unwrap();
    response.assert_status(StatusCode::OK);
    assert_eq!(response.str_field("message"), Some("Audio already exists"));
    assert_eq!(ctx.tts.calls.load(Ordering::SeqCst), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_not_started_before_any_request(ctx: &TestContext) {
    let id = upload(ctx, sample_book_text().as_bytes()).await;

    let response = ctx
        .client
        .get_with_auth(&format!("/api/books/{}/narration", id), &token_for("someone@example.com"))
        .await
        .unwrap();
    response.assert_status(StatusCode::OK);
    assert_eq!(response.str_field("state"), Some("not_started"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_only_let_owner_request_narration(ctx: &TestContext) {
    let id = upload(ctx, sample_book_text().as_bytes()).await;

    ctx.client
        .post_empty_with_auth(
            &format!("/api/books/{}/narration", id),
            &token_for("stranger@example.com"),
        )
        .await
        .unwrap()
        .assert_status(StatusCode::FORBIDDEN);

    ctx.client
        .post_empty_with_auth(
            &format!("/api/books/{}/narration", Uuid::new_v4()),
            &token_for(OWNER),
        )
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_run_for_unreadable_source(ctx: &TestContext) {
    let id = upload(ctx, &[0xff, 0xfe, 0x00, 0x9f, 0x80]).await;

    ctx.client
        .post_empty_with_auth(&format!("/api/books/{}/narration", id), &token_for(OWNER))
        .await
        .unwrap()
        .assert_status(StatusCode::ACCEPTED);

    let status = wait_for_terminal_state(ctx, id).await;
    assert_eq!(status["state"], "failed");
    assert!(status["error"].as_str().unwrap().contains("text extraction failed"));
    assert_eq!(ctx.tts.calls.load(Ordering::SeqCst), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_run_when_provider_keeps_failing(ctx: &TestContext) {
    ctx.tts.fail_all.store(true, Ordering::SeqCst);
    let id = upload(ctx, sample_book_text().as_bytes()).await;

    ctx.client
        .post_empty_with_auth(&format!("/api/books/{}/narration", id), &token_for(OWNER))
        .await
        .unwrap()
        .assert_status(StatusCode::ACCEPTED);

    let status = wait_for_terminal_state(ctx, id).await;
    assert_eq!(status["state"], "failed");
    // default retry policy makes three attempts at the first chunk
    assert_eq!(ctx.tts.calls.load(Ordering::SeqCst), 3);
    assert!(!ctx.blobs.exists(&format!("{}/{}/audio", OWNER, id)).await.unwrap());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_stop_narration_when_book_is_deleted(ctx: &TestContext) {
    ctx.tts.latency_ms.store(30, Ordering::SeqCst);
    let id = upload(ctx, sample_book_text().as_bytes()).await;
    let token = token_for(OWNER);

    ctx.client
        .post_empty_with_auth(&format!("/api/books/{}/narration", id), &token)
        .await
        .unwrap()
        .assert_status(StatusCode::ACCEPTED);
    tokio::time::sleep(Duration::from_millis(80)).await;

    ctx.client
        .delete_with_auth(&format!("/api/books/{}", id), &token)
        .await
        .unwrap()
        .assert_status(StatusCode::NO_CONTENT);
    let calls_at_delete = ctx.tts.calls.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(250)).await;

    let leftovers = ctx.blobs.list(&format!("{}/{}/", OWNER, id)).await.unwrap();
    assert!(leftovers.is_empty(), "blobs left after delete: {:?}", leftovers);
    assert_eq!(ctx.tts.calls.load(Ordering::SeqCst), calls_at_delete);

    ctx.client
        .get_with_auth(&format!("/api/books/{}/narration", id), &token)
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}
