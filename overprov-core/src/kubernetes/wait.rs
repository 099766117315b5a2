//! Bounded waits on resource state
//!
//! Each wait re-reads the object every `interval` until a condition holds or
//! `timeout` elapses. Nothing here cancels the underlying API calls.

use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::api::Api;
use kube::runtime::wait::{conditions, Condition};
use kube::Resource;
use overprov_common::ResourceKind;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use crate::kubernetes::error::{K8sError, K8sResult};

/// Timeout and poll interval for a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(3),
        }
    }
}

/// Call `fetch` every `options.interval` until `condition` holds
///
/// The object is checked once more at the deadline, so a wait never gives
/// up between a state change and its final poll.
pub async fn poll_until<K, C, F, Fut>(
    mut fetch: F,
    condition: C,
    kind: ResourceKind,
    name: &str,
    description: &str,
    options: &WaitOptions,
) -> K8sResult<Option<K>>
where
    C: Condition<K>,
    F: FnMut() -> Fut,
    Fut: Future<Output = K8sResult<Option<K>>>,
{
    let deadline = tokio::time::Instant::now() + options.timeout;

    loop {
        let obj = fetch().await?;
        if condition.matches_object(obj.as_ref()) {
            return Ok(obj);
        }

        let now = tokio::time::Instant::now();
        if now >= deadline {
            return Err(K8sError::Timeout {
                kind,
                name: name.to_string(),
                condition: description.to_string(),
                seconds: options.timeout.as_secs(),
            });
        }

        tokio::time::sleep(options.interval.min(deadline - now)).await;
    }
}

/// Poll `name` through `api` until `condition` holds
pub async fn wait_for_condition<K, C>(
    api: &Api<K>,
    kind: ResourceKind,
    name: &str,
    description: &str,
    condition: C,
    options: &WaitOptions,
) -> K8sResult<Option<K>>
where
    K: Clone + Debug + DeserializeOwned + Resource,
    C: Condition<K>,
{
    poll_until(
        move || async move { Ok::<_, K8sError>(api.get_opt(name).await?) },
        condition,
        kind,
        name,
        description,
        options,
    )
    .await
}

/// Block until the pod reports phase Running
pub async fn wait_for_pod_running(api: &Api<Pod>, name: &str, options: &WaitOptions) -> K8sResult<()> {
    tracing::info!(
        pod = %name,
        timeout_secs = options.timeout.as_secs(),
        interval_secs = options.interval.as_secs(),
        "Waiting for pod to run"
    );

    wait_for_condition(
        api,
        ResourceKind::Pod,
        name,
        "reach phase Running",
        conditions::is_pod_running(),
        options,
    )
    .await?;

    Ok(())
}

/// Whether the claim reports phase Bound
fn is_pvc_bound(obj: Option<&PersistentVolumeClaim>) -> bool {
    obj.and_then(|pvc| pvc.status.as_ref())
        .and_then(|status| status.phase.as_deref())
        .map(|phase| phase == "Bound")
        .unwrap_or(false)
}

/// Block until the claim reports phase Bound
pub async fn wait_for_pvc_bound(
    api: &Api<PersistentVolumeClaim>,
    name: &str,
    options: &WaitOptions,
) -> K8sResult<()> {
    tracing::info!(pvc = %name, timeout_secs = options.timeout.as_secs(), "Waiting for claim to bind");

    wait_for_condition(
        api,
        ResourceKind::PersistentVolumeClaim,
        name,
        "reach phase Bound",
        is_pvc_bound,
        options,
    )
    .await?;

    Ok(())
}

/// Block until the object is gone
///
/// With a known UID a same-named replacement counts as deleted. Without one
/// the wait ends only when the API answers 404.
pub async fn wait_for_delete<K>(
    api: &Api<K>,
    kind: ResourceKind,
    name: &str,
    uid: Option<&str>,
    options: &WaitOptions,
) -> K8sResult<()>
where
    K: Clone + Debug + DeserializeOwned + Resource,
{
    tracing::debug!(kind = %kind, name = %name, "Waiting for delete");

    match uid {
        Some(uid) => {
            wait_for_condition(api, kind, name, "be deleted", conditions::is_deleted(uid), options)
                .await?
        }
        None => {
            let is_absent = |obj: Option<&K>| obj.is_none();
            wait_for_condition(api, kind, name, "be deleted", is_absent, options).await?
        }
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PersistentVolumeClaimStatus, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick() -> WaitOptions {
        WaitOptions::new(Duration::from_millis(200), Duration::from_millis(10))
    }

    fn pod(phase: &str, uid: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("pod-test-1".to_string()),
                uid: Some(uid.to_string()),
                ..Default::default()
            },
            spec: None,
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_default_wait_options() {
        let options = WaitOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(60));
        assert_eq!(options.interval, Duration::from_secs(3));
    }

    #[test]
    fn test_pvc_bound_condition() {
        let mut pvc = PersistentVolumeClaim::default();
        assert!(!is_pvc_bound(None));
        assert!(!is_pvc_bound(Some(&pvc)));

        pvc.status = Some(PersistentVolumeClaimStatus {
            phase: Some("Bound".to_string()),
            ..Default::default()
        });
        assert!(is_pvc_bound(Some(&pvc)));
    }

    #[tokio::test]
    async fn test_poll_until_running() {
        let counter = AtomicUsize::new(0);
        let fetches = &counter;

        let found = poll_until(
            move || async move {
                let n = fetches.fetch_add(1, Ordering::SeqCst);
                let phase = if n < 2 { "Pending" } else { "Running" };
                Ok::<_, K8sError>(Some(pod(phase, "uid-1")))
            },
            conditions::is_pod_running(),
            ResourceKind::Pod,
            "pod-test-1",
            "reach phase Running",
            &quick(),
        )
        .await
        .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_poll_until_sleeps_between_fetches() {
        let counter = AtomicUsize::new(0);
        let fetches = &counter;
        let options = WaitOptions::new(Duration::from_millis(95), Duration::from_millis(40));

        let err = poll_until(
            move || async move {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok::<_, K8sError>(Some(pod("Pending", "uid-1")))
            },
            conditions::is_pod_running(),
            ResourceKind::Pod,
            "pod-test-1",
            "reach phase Running",
            &options,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, K8sError::Timeout { kind: ResourceKind::Pod, .. }));
        // at 0ms, 40ms, 80ms and the deadline
        let n = counter.load(Ordering::SeqCst);
        assert!((3..=5).contains(&n), "fetched {} times", n);
    }

    #[tokio::test]
    async fn test_poll_until_deleted_by_uid() {
        let counter = AtomicUsize::new(0);
        let fetches = &counter;

        poll_until(
            move || async move {
                let n = fetches.fetch_add(1, Ordering::SeqCst);
                let uid = if n == 0 { "uid-old" } else { "uid-new" };
                Ok::<_, K8sError>(Some(pod("Running", uid)))
            },
            conditions::is_deleted("uid-old"),
            ResourceKind::Pod,
            "pod-test-1",
            "be deleted",
            &quick(),
        )
        .await
        .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_poll_until_propagates_fetch_error() {
        let err = poll_until(
            || async { Err::<Option<Pod>, _>(K8sError::Internal("connection refused".to_string())) },
            conditions::is_pod_running(),
            ResourceKind::Pod,
            "pod-test-1",
            "reach phase Running",
            &quick(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, K8sError::Internal(_)));
    }
}
