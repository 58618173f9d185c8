//! Extra handlers attached to the WebSocket while it is connected.

use async_trait::async_trait;
use fleetlink_shared::Action;

use super::send::SendPipeline;

/// Reacts to specific actions while connected, typically by sending one or
/// more requests with follow-up actions attached.
///
/// ```rust,ignore
/// struct CreateAndFetch;
///
/// #[async_trait]
/// impl MessageHandler for CreateAndFetch {
///     fn matches(&self, action: &Action) -> bool {
///         action.r#type == "machine/createAndFetch"
///     }
///
///     async fn handle(&self, pipeline: SendPipeline, action: Action) {
///         let fetch: NextActionBuilder = Arc::new(|result: &Value| {
///             Action::request("machine/get", "machine", "get")
///                 .with_params(json!({"system_id": result["system_id"]}))
///         });
///         pipeline.send_with_next_actions(action, vec![fetch]).await;
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn matches(&self, action: &Action) -> bool;

    async fn handle(&self, pipeline: SendPipeline, action: Action);
}
