use super::*;
use crate::error::ProviderErrorKind;
use crate::message::Message;
use crate::transport::ScriptedTransport;

fn scripted_router(transport: Arc<ScriptedTransport>) -> ProviderRouter {
    ProviderRouter::empty(RouterConfig::default()).with_transport(ProviderKind::Mock, transport)
}

fn prompt() -> Prompt {
    Prompt::new().with_message(Message::user("hello"))
}

#[tokio::test]
async fn test_routes_to_registered_transport() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_reply(ModelReply::text("hi there"));
    let router = scripted_router(Arc::clone(&transport));

    let reply = router
        .complete(&prompt(), &ProviderCredential::new(ProviderKind::Mock))
        .await
        .unwrap();

    assert_eq!(reply.content, "hi there");
    assert_eq!(transport.call_count(), 1);
    assert_eq!(transport.prompts()[0].1, "mock-model");
}

#[tokio::test]
async fn test_missing_key_is_unauthorized_without_network() {
    let transport = Arc::new(ScriptedTransport::new());
    let router = ProviderRouter::empty(RouterConfig::default())
        .with_transport(ProviderKind::OpenAi, Arc::clone(&transport) as Arc<dyn ProviderTransport>);

    let err = router
        .complete(&prompt(), &ProviderCredential::new(ProviderKind::OpenAi))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ProviderErrorKind::Unauthorized);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_unregistered_provider_is_not_found() {
    let router = ProviderRouter::empty(RouterConfig::default());
    let err = router
        .complete(&prompt(), &ProviderCredential::new(ProviderKind::Ollama))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ProviderErrorKind::NotFound);
}

#[tokio::test]
async fn test_transport_errors_pass_through() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_error(ProviderError::from_status(429, "mock", "slow down", Some(3)));
    let router = scripted_router(transport);

    let err = router
        .complete(&prompt(), &ProviderCredential::new(ProviderKind::Mock))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ProviderError::RateLimited {
            provider: "mock".to_string(),
            retry_after: Some(3)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_times_out_as_transient() {
    let transport = Arc::new(ScriptedTransport::new().with_delay(Duration::from_secs(120)));
    let router = ProviderRouter::empty(RouterConfig::default().with_timeout(Duration::from_secs(5)))
        .with_transport(ProviderKind::Mock, transport);

    let err = router
        .complete(&prompt(), &ProviderCredential::new(ProviderKind::Mock))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ProviderErrorKind::Transient);
    assert!(err.to_string().contains("timeout"));
}

#[test]
fn test_default_router_covers_networked_providers() {
    let router = ProviderRouter::new(RouterConfig::default()).unwrap();
    assert!(router.supports(ProviderKind::Anthropic));
    assert!(router.supports(ProviderKind::OpenAi));
    assert!(router.supports(ProviderKind::Ollama));
    assert!(!router.supports(ProviderKind::Mock));
}
