mod common;

use std::sync::Arc;
use std::time::Duration;

use blossom_client::actions::{
    delete_blob, download_blob, has_blob, list_blobs, mirror_blob, upload_blob, upload_media,
    ListQuery,
};
use blossom_client::{ActionOptions, AuthMode};
use blossom_core::{AuthTemplate, AuthType, BlossomError, Handler, PaymentProof, Sha256};
use common::*;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn network(mock: &Arc<MockServer>) -> MockNetwork {
    MockNetwork::new(&[mock.clone()])
}

#[tokio::test]
async fn upload_probes_then_puts() {
    let mock = MockServer::new("https://cdn.example", Kind::Healthy);
    let blob = prepared();

    let descriptor = upload_blob(&network(&mock), &mock.server, &blob, &ActionOptions::new())
        .await
        .unwrap();

    assert_eq!(mock.endpoints(), vec!["HEAD /upload", "PUT /upload"]);
    let probe = &mock.hits()[0];
    assert_eq!(probe.sha256.as_deref(), Some(blob.sha256().as_str()));
    assert_eq!(probe.content_length.as_deref(), Some("12"));
    assert!(probe.body.is_empty());
    assert_eq!(mock.hits()[1].body.as_ref(), CONTENT);
    assert_eq!(descriptor.sha256, *blob.sha256());
    assert_eq!(descriptor.url, format!("https://cdn.example/{}", blob.sha256()));
}

#[tokio::test]
async fn forbidden_is_an_auth_challenge() {
    let mock = MockServer::new("https://cdn.example", Kind::Forbidden);
    let auth = Arc::new(CountingAuth::default());
    let options = ActionOptions::new().with_auth_resolver(auth.clone());

    upload_blob(&network(&mock), &mock.server, &prepared(), &options)
        .await
        .unwrap();

    assert_eq!(auth.calls(), 1);
    assert_eq!(*auth.actions.lock().unwrap(), vec![AuthType::Upload]);
    assert!(mock.hits()[1].auth_event().is_some());
}

#[tokio::test]
async fn always_mode_authorizes_the_probe() {
    let mock = MockServer::new("https://cdn.example", Kind::RequireAuth);
    let auth = Arc::new(CountingAuth::default());
    let options = ActionOptions::new()
        .with_auth(AuthMode::Always)
        .with_auth_resolver(auth.clone());

    upload_blob(&network(&mock), &mock.server, &prepared(), &options)
        .await
        .unwrap();

    assert_eq!(mock.endpoints(), vec!["HEAD /upload", "PUT /upload"]);
    assert!(mock.hits().iter().all(|hit| hit.authorization.is_some()));
    assert_eq!(auth.calls(), 1);
}

#[tokio::test]
async fn disabled_auth_fails_on_challenge() {
    let mock = MockServer::new("https://cdn.example", Kind::RequireAuth);
    let options = ActionOptions::new()
        .with_auth(AuthMode::Disabled)
        .with_auth_resolver(Arc::new(CountingAuth::default()));

    let err = assert_err!(upload_blob(&network(&mock), &mock.server, &prepared(), &options).await);

    assert!(matches!(err, BlossomError::AuthDisabled));
    assert_eq!(mock.endpoints(), vec!["HEAD /upload"]);
}

#[tokio::test]
async fn missing_auth_handler_is_distinct_from_protocol_errors() {
    let mock = MockServer::new("https://cdn.example", Kind::RequireAuth);

    let err = upload_blob(&network(&mock), &mock.server, &prepared(), &ActionOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BlossomError::MissingHandler(Handler::Auth)));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn preset_payment_is_sent_up_front() {
    let mock = MockServer::new("https://cdn.example", Kind::RequirePayment);
    let options = ActionOptions::new().with_payment(PaymentProof::new(PAYMENT_TOKEN));

    upload_blob(&network(&mock), &mock.server, &prepared(), &options)
        .await
        .unwrap();

    assert!(mock
        .hits()
        .iter()
        .all(|hit| hit.cashu.as_deref() == Some(PAYMENT_TOKEN)));
}

#[tokio::test]
async fn media_probe_404_is_a_sentinel() {
    let mock = MockServer::new("https://cdn.example", Kind::NoMedia);

    let err = upload_media(&network(&mock), &mock.server, &prepared(), &ActionOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BlossomError::MediaUnsupported { .. }));
    assert_eq!(mock.endpoints(), vec!["HEAD /media"]);
}

#[tokio::test]
async fn upload_head_404_sends_content_directly() {
    let mock = MockServer::new("https://cdn.example", Kind::NoUploadHead);
    let blob = prepared();

    let descriptor = upload_blob(&network(&mock), &mock.server, &blob, &ActionOptions::new())
        .await
        .unwrap();

    assert_eq!(mock.endpoints(), vec!["HEAD /upload", "PUT /upload"]);
    assert_eq!(mock.hits()[1].body.as_ref(), CONTENT);
    assert_eq!(descriptor.sha256, *blob.sha256());
}

#[tokio::test]
async fn direct_put_after_head_404_resolves_its_challenge() {
    let mock = MockServer::new("https://cdn.example", Kind::NoUploadHeadRequireAuth);
    let auth = Arc::new(CountingAuth::default());
    let options = ActionOptions::new().with_auth_resolver(auth.clone());

    let descriptor = upload_blob(&network(&mock), &mock.server, &prepared(), &options).await;

    assert_ok!(descriptor);
    assert_eq!(auth.calls(), 1);
    assert_eq!(
        mock.endpoints(),
        vec!["HEAD /upload", "PUT /upload", "PUT /upload"]
    );
    let hits = mock.hits();
    assert!(hits[1].authorization.is_none());
    assert_eq!(
        hits[2].auth_event().unwrap().auth_type(),
        Some(AuthType::Upload)
    );
}

#[tokio::test]
async fn mirror_sends_json_reference() {
    let source = MockServer::new("https://source.example", Kind::Healthy);
    let target = MockServer::new("https://target.example", Kind::Healthy);
    let stored = source.store(CONTENT);

    let descriptor = mirror_blob(&network(&target), &target.server, &stored, &ActionOptions::new())
        .await
        .unwrap();

    assert_eq!(target.endpoints(), vec!["PUT /mirror"]);
    let body: serde_json::Value = serde_json::from_slice(&target.hits()[0].body).unwrap();
    assert_eq!(body, serde_json::json!({ "url": stored.url }));
    assert_eq!(descriptor.sha256, stored.sha256);
    assert!(descriptor.url.starts_with("https://target.example/"));
}

#[tokio::test]
async fn mirror_is_authorized_as_upload() {
    let source = MockServer::new("https://source.example", Kind::Healthy);
    let target = MockServer::new("https://target.example", Kind::RequireAuth);
    let auth = Arc::new(CountingAuth::default());
    let stored = source.store(CONTENT);

    mirror_blob(
        &network(&target),
        &target.server,
        &stored,
        &ActionOptions::new().with_auth_resolver(auth.clone()),
    )
    .await
    .unwrap();

    assert_eq!(*auth.actions.lock().unwrap(), vec![AuthType::Upload]);
}

#[tokio::test]
async fn download_and_has_blob() {
    let mock = MockServer::new("https://cdn.example", Kind::Healthy);
    let stored = mock.store(CONTENT);
    let missing = Sha256::of(b"missing");
    let net = network(&mock);
    let options = ActionOptions::new();

    let bytes = download_blob(&net, &mock.server, &stored.sha256, &options)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), CONTENT);

    assert!(has_blob(&net, &mock.server, &stored.sha256, &options).await.unwrap());
    assert!(!has_blob(&net, &mock.server, &missing, &options).await.unwrap());

    let err = download_blob(&net, &mock.server, &missing, &options)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Server responded 404: blob not found");
}

#[tokio::test]
async fn list_sends_time_range() {
    let mock = MockServer::new("https://cdn.example", Kind::Healthy);
    mock.store(CONTENT);
    mock.store(b"second");

    let listed = list_blobs(
        &network(&mock),
        &mock.server,
        "npubkey",
        ListQuery::new().since(10).until(20),
        &ActionOptions::new(),
    )
    .await
    .unwrap();

    assert_eq!(listed.len(), 2);
    let hit = &mock.hits()[0];
    assert_eq!(hit.endpoint(), "GET /list/npubkey");
    assert_eq!(hit.query.as_deref(), Some("since=10&until=20"));
}

#[tokio::test]
async fn list_without_range_has_no_query() {
    let mock = MockServer::new("https://cdn.example", Kind::Healthy);

    let listed = list_blobs(
        &network(&mock),
        &mock.server,
        "npubkey",
        ListQuery::default(),
        &ActionOptions::new(),
    )
    .await
    .unwrap();

    assert!(listed.is_empty());
    assert_eq!(mock.hits()[0].query, None);
}

#[tokio::test]
async fn delete_uses_preset_token() {
    let mock = MockServer::new("https://cdn.example", Kind::RequireAuth);
    let stored = mock.store(CONTENT);
    let token = fake_sign(AuthTemplate::delete(stored.sha256.clone()));

    let deleted = assert_ok!(
        delete_blob(
            &network(&mock),
            &mock.server,
            &stored.sha256,
            &ActionOptions::new().with_preset_auth(token.clone()),
        )
        .await
    );

    assert!(deleted);
    assert_eq!(mock.endpoints(), vec![format!("DELETE /{}", stored.sha256)]);
    assert_eq!(mock.hits()[0].auth_event(), Some(token));
}

#[tokio::test]
async fn timeout_and_cancellation_are_distinguishable() {
    let mock = MockServer::new("https://cdn.example", Kind::Slow(Duration::from_secs(30)));
    let hash = Sha256::of(CONTENT);

    let timed_out = download_blob(
        &network(&mock),
        &mock.server,
        &hash,
        &ActionOptions::new().with_timeout(Duration::from_millis(20)),
    )
    .await
    .unwrap_err();
    assert!(timed_out.is_timeout());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let cancelled = download_blob(
        &network(&mock),
        &mock.server,
        &hash,
        &ActionOptions::new().with_cancel(cancel),
    )
    .await
    .unwrap_err();
    assert!(cancelled.is_cancellation());
    // a cancelled handle sends nothing
    assert_eq!(mock.hits().len(), 1);
}
