// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::test_state;
use recode_core::tenant::TenantId;

#[tokio::test]
async fn default_context_is_admin_and_unscoped() {
    let (state, _) = test_state().await;
    let tenant = state.store.resolve_tenant("default").await.unwrap();
    let context = TenantContext(tenant);
    assert!(context.is_admin());
    assert!(context.filter().is_none());
}

#[tokio::test]
async fn named_tenant_scopes_to_itself() {
    let (state, _) = test_state().await;
    let tenant = state
        .store
        .create_tenant("acme", "standard", Default::default(), None)
        .await
        .unwrap();
    let context = TenantContext(tenant.clone());
    assert!(!context.is_admin());
    assert_eq!(context.filter(), Some(tenant.id));
    let _: Option<TenantId> = context.filter();
}

#[tokio::test]
async fn api_key_digest_comparison() {
    let (state, _) = test_state().await;
    assert!(state.api_key_matches(crate::test_helpers::TEST_API_KEY));
    assert!(!state.api_key_matches("test-api-kez"));
    assert!(!state.api_key_matches(""));
    assert!(!state.api_key_matches("test-api-key-with-suffix"));
}
