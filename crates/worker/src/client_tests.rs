// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn errors_read_like_operator_messages() {
    let err = ClientError::Transient { attempts: 4, message: "connection refused".into() };
    assert_eq!(
        err.to_string(),
        "master unreachable after 4 attempts: connection refused"
    );

    let err = ClientError::Rejected {
        status: StatusCode::TOO_MANY_REQUESTS,
        message: "quota exceeded".into(),
    };
    assert!(err.to_string().contains("429"));
    assert!(err.to_string().contains("quota exceeded"));
}

#[tokio::test]
async fn unreachable_master_surfaces_transient_after_retries() {
    // Nothing listens on port 1: connections are refused immediately.
    let client = MasterClient::new("http://127.0.0.1:1", "key", "default");
    let worker = recode_core::worker::WorkerId::from_string("wrk-test");
    let err = client.next_job(&worker).await.unwrap_err();
    assert!(matches!(err, ClientError::Transient { attempts: 4, .. }), "got {err:?}");
}
