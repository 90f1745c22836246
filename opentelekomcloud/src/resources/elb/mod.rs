//! Elastic load balancer (LBaaS v2)

pub mod resource_pool_v2;

pub use resource_pool_v2::LbPoolV2Resource;

use std::time::Duration;
use tfplug::context::Context;
use tfplug::wait::WaitError;

use crate::api::Client;
use crate::provider_data::PollSettings;

/// Blocks until the load balancer leaves its pending states. Pool changes
/// are rejected with 409 while the balancer is being provisioned.
pub(crate) async fn wait_for_load_balancer(
    ctx: &Context,
    client: &Client,
    poll: PollSettings,
    lb_id: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    tracing::debug!(lb_id, "Waiting for load balancer to become ACTIVE");
    poll.state_change(
        &["PENDING_CREATE", "PENDING_UPDATE", "PENDING_DELETE"],
        &["ACTIVE"],
        timeout,
        Duration::ZERO,
        Duration::from_secs(1),
    )
    .wait_for_state(ctx, || async {
        let lb = client.load_balancers().get(lb_id).await?;
        Ok::<_, crate::api::ApiError>(Some(((), lb.provisioning_status)))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::Server;

    #[tokio::test]
    async fn waits_through_pending_update() {
        let mut server = Server::new_async().await;
        let pending = server
            .mock("GET", "/loadbalancers/lb-1")
            .with_body(r#"{"loadbalancer": {"id": "lb-1", "provisioning_status": "PENDING_UPDATE"}}"#)
            .expect(1)
            .create_async()
            .await;
        let active = server
            .mock("GET", "/loadbalancers/lb-1")
            .with_body(r#"{"loadbalancer": {"id": "lb-1", "provisioning_status": "ACTIVE"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        wait_for_load_balancer(
            &Context::new(),
            &client,
            PollSettings::fixed(Duration::from_millis(1)),
            "lb-1",
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        pending.assert_async().await;
        active.assert_async().await;
    }

    #[tokio::test]
    async fn error_state_fails_the_wait() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/loadbalancers/lb-1")
            .with_body(r#"{"loadbalancer": {"id": "lb-1", "provisioning_status": "ERROR"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = wait_for_load_balancer(
            &Context::new(),
            &client,
            PollSettings::fixed(Duration::from_millis(1)),
            "lb-1",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::UnexpectedState { .. }));
    }
}
