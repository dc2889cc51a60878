//! End-to-end capture/submit scenarios

mod common;

use axum::{http::StatusCode, routing::post, Json, Router};
use camera_capture::SyntheticCamera;
use capture_session::{Mode, SessionError, UPLOAD_CANCELLED};
use common::*;
use std::sync::Arc;
use std::time::Duration;
use upload_client::{UploadClient, UploadConfig, UploadError, Uploader, MISSING_IMAGE};

async fn serve_once(status: StatusCode, body: serde_json::Value) -> Arc<dyn Uploader> {
    let app = Router::new().route(
        "/process-image",
        post(move || {
            let body = body.clone();
            async move { (status, Json(body)) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Arc::new(UploadClient::new(UploadConfig::new(format!("http://{addr}"))).unwrap())
}

#[tokio::test]
async fn capture_then_successful_submit() {
    let camera = Arc::new(SyntheticCamera::new(24, 16));
    let (mut session, _) = open_session(&camera).await;
    let uploader = serve_once(
        StatusCode::OK,
        serde_json::json!({
            "inserted_id": "abc123",
            "data": { "products": { "Widget": { "quantity": "3", "price": "$9" } } }
        }),
    )
    .await;

    assert!(session.capture());
    session.submit(uploader.as_ref()).await.unwrap();

    assert_eq!(session.mode(), Mode::Succeeded);
    assert!(session.invariants_hold());
    let view = session.result_view().unwrap();
    assert_eq!(view.document_id, "abc123");
    assert_eq!(view.product_count, 1);
    assert_eq!(view.products[0].name, "Widget");
}

#[tokio::test]
async fn server_error_returns_to_preview_with_message() {
    let camera = Arc::new(SyntheticCamera::new(24, 16));
    let (mut session, previews) = open_session(&camera).await;
    let uploader = serve_once(
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({ "message": "disk full" }),
    )
    .await;

    session.capture();
    let err = session.submit(uploader.as_ref()).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Upload(UploadError::Rejected { status: 500, .. })
    ));
    assert_eq!(session.mode(), Mode::Preview);
    assert_eq!(session.last_error(), Some("disk full"));
    assert!(session.payload().is_some());
    assert_eq!(previews.live_handles(), 1);

    // Retry stays available
    let retry = ScriptedUploader::new(vec![Ok(widget_result())]);
    session.submit(&retry).await.unwrap();
    assert_eq!(session.mode(), Mode::Succeeded);
    assert!(session.last_error().is_none());
}

#[tokio::test]
async fn malformed_success_body_is_a_failure() {
    let camera = Arc::new(SyntheticCamera::new(8, 8));
    let (mut session, _) = open_session(&camera).await;
    let uploader = serve_once(StatusCode::OK, serde_json::json!(["not", "an", "object"])).await;

    session.capture();
    let err = session.submit(uploader.as_ref()).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Upload(UploadError::MalformedResponse(_))
    ));
    assert_eq!(session.mode(), Mode::Preview);
    assert!(session.last_error().unwrap().starts_with("Upload failed"));
    assert!(session.payload().is_some());
}

#[tokio::test]
async fn denied_camera_falls_back_to_file_pick() {
    let camera = Arc::new(SyntheticCamera::denied());
    let (mut session, _) = open_session(&camera).await;

    assert_eq!(session.mode(), Mode::Acquiring);
    assert!(session.camera_unavailable());
    assert!(session.last_error().unwrap().contains("gallery"));
    assert!(!session.capture());

    assert!(session.pick_file(jpeg_file()));
    assert_eq!(session.mode(), Mode::Preview);
    assert!(session.last_error().is_none());

    let uploader = ScriptedUploader::new(vec![Ok(widget_result())]);
    session.submit(&uploader).await.unwrap();
    assert_eq!(session.mode(), Mode::Succeeded);
    assert_eq!(camera.stats().acquisitions(), 0);
}

#[tokio::test]
async fn empty_payload_never_reaches_the_network() {
    let camera = Arc::new(SyntheticCamera::new(8, 8));
    let (mut session, _) = open_session(&camera).await;
    let uploader = ScriptedUploader::new(vec![Ok(widget_result())]);

    // Nothing captured yet
    let err = session.submit(&uploader).await.unwrap_err();
    assert!(matches!(err, SessionError::Upload(UploadError::Validation(_))));
    assert_eq!(session.mode(), Mode::Live);
    assert_eq!(session.last_error(), Some(MISSING_IMAGE));

    // Zero-byte file
    assert!(session.pick_file_bytes(Some("blank.png".into()), "image/png", Vec::new()));
    let err = session.submit(&uploader).await.unwrap_err();
    assert!(matches!(err, SessionError::Upload(UploadError::Validation(_))));
    assert_eq!(session.mode(), Mode::Preview);

    assert_eq!(uploader.calls(), 0);
    assert!(session.invariants_hold());
}

#[tokio::test]
async fn retake_clears_error_and_result() {
    let camera = Arc::new(SyntheticCamera::new(8, 8));
    let (mut session, previews) = open_session(&camera).await;
    let uploader = ScriptedUploader::new(vec![
        Err(UploadError::Network("connection reset".into())),
        Ok(widget_result()),
    ]);

    session.capture();
    session.submit(&uploader).await.unwrap_err();
    assert!(session.last_error().is_some());

    assert!(session.retake().await);
    assert_eq!(session.mode(), Mode::Live);
    assert!(session.last_error().is_none());
    assert!(session.payload().is_none());
    assert_eq!(previews.live_handles(), 0);

    session.capture();
    session.submit(&uploader).await.unwrap();
    assert!(session.result().is_some());

    assert!(session.upload_another().await);
    assert_eq!(session.mode(), Mode::Live);
    assert!(session.result().is_none());
    assert!(session.last_error().is_none());
    assert_eq!(uploader.calls(), 2);
}

#[tokio::test]
async fn retake_with_camera_gone_enters_no_camera_state() {
    let camera = Arc::new(SyntheticCamera::new(8, 8));
    let (mut session, _) = open_session(&camera).await;
    session.capture();

    camera.set_behavior(camera_capture::SyntheticBehavior::Absent);
    assert!(session.retake().await);

    assert_eq!(session.mode(), Mode::Acquiring);
    assert!(session.camera_unavailable());
    assert!(session.pick_file(jpeg_file()));
}

#[tokio::test]
async fn submit_while_uploading_issues_one_request() {
    let camera = Arc::new(SyntheticCamera::new(8, 8));
    let (handle, _) = open_handle(&camera).await;
    let uploader = Arc::new(GatedUploader::new(Ok(widget_result())));

    handle.capture().await.unwrap();
    let in_flight = tokio::spawn({
        let handle = handle.clone();
        let uploader: Arc<dyn Uploader> = uploader.clone();
        async move { handle.submit(uploader).await }
    });
    uploader.wait_started().await;
    assert_eq!(handle.mode().await, Some(Mode::Uploading));

    for _ in 0..3 {
        let again = handle.submit(uploader.clone()).await;
        assert!(matches!(again, Err(SessionError::Busy)));
    }
    assert!(!handle.retake().await.unwrap());

    uploader.open_gate();
    in_flight.await.unwrap().unwrap();

    assert_eq!(uploader.calls(), 1);
    assert_eq!(handle.mode().await, Some(Mode::Succeeded));
}

#[tokio::test]
async fn abandoned_submit_leaves_session_actionable() {
    let camera = Arc::new(SyntheticCamera::new(8, 8));
    let (mut session, previews) = open_session(&camera).await;
    let stalled = GatedUploader::new(Ok(widget_result()));

    session.capture();
    let timed_out =
        tokio::time::timeout(Duration::from_millis(50), session.submit(&stalled)).await;
    assert!(timed_out.is_err());
    assert_eq!(stalled.calls(), 1);

    assert_eq!(session.mode(), Mode::Preview);
    assert_eq!(session.last_error(), Some(UPLOAD_CANCELLED));
    assert!(session.payload().is_some());
    assert_eq!(previews.live_handles(), 1);
    assert!(session.invariants_hold());

    let retry = ScriptedUploader::new(vec![Ok(widget_result())]);
    session.submit(&retry).await.unwrap();
    assert_eq!(session.mode(), Mode::Succeeded);
    assert!(session.retake().await);
}

#[tokio::test]
async fn close_during_upload_discards_late_result() {
    let camera = Arc::new(SyntheticCamera::new(8, 8));
    let stats = camera.stats();
    let (handle, previews) = open_handle(&camera).await;
    let mut events = handle.subscribe().await.unwrap();
    let uploader = Arc::new(GatedUploader::new(Ok(widget_result())));

    handle.capture().await.unwrap();
    let in_flight = tokio::spawn({
        let handle = handle.clone();
        let uploader: Arc<dyn Uploader> = uploader.clone();
        async move { handle.submit(uploader).await }
    });
    uploader.wait_started().await;

    assert!(handle.close().await);
    assert_eq!(stats.open_streams(), 0);
    assert_eq!(previews.live_handles(), 0);

    uploader.open_gate();
    let late = in_flight.await.unwrap();
    assert!(matches!(late, Err(SessionError::Closed)));

    assert!(!handle.is_open().await);
    assert_eq!(handle.mode().await, None);
    assert!(matches!(events.recv().await, Some(capture_session::SessionEvent::Closed { .. })));
    assert_eq!(events.recv().await, None);
}

#[tokio::test]
async fn close_while_live_releases_camera() {
    let camera = Arc::new(SyntheticCamera::new(8, 8));
    let stats = camera.stats();
    let (handle, _) = open_handle(&camera).await;
    assert_eq!(stats.open_streams(), 1);

    assert!(handle.close().await);
    assert!(!handle.close().await);
    assert_eq!(stats.open_streams(), 0);
    assert!(matches!(handle.capture().await, Err(SessionError::Closed)));
}

#[tokio::test]
async fn repeated_open_close_cycles_do_not_leak() {
    let camera = Arc::new(SyntheticCamera::new(8, 8));
    let stats = camera.stats();
    let previews = capture_session::PreviewRegistry::new();

    for round in 0..20 {
        let provider: Arc<dyn camera_capture::CameraProvider> = camera.clone();
        let mut session =
            capture_session::CaptureSession::open(provider, previews.clone(), metadata(), config())
                .await;
        match round % 3 {
            0 => {}
            1 => {
                session.capture();
            }
            _ => {
                session.capture();
                session.retake().await;
            }
        }
        session.close();
    }

    assert_eq!(stats.open_streams(), 0);
    assert_eq!(stats.peak_open_streams(), 1);
    assert_eq!(stats.acquisitions(), stats.releases());
    assert_eq!(previews.live_handles(), 0);
}
