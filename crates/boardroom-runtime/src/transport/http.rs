//! REST surface of a stage agent.
//!
//! `POST <stage path>` takes a [`StageInput`] and always answers 200 with
//! the stage output as the body. Whether that output is genuine or the
//! static fallback travels in the `x-stage-success` header, so the body is
//! exactly the stage schema either way.
//!
//! Also served:
//! - `GET /health`: stage name, provider readiness and usage counters.
//!   `status` is `ok` while at least one provider is ready, else `degraded`
//! - `POST /market-context` (research only): knowledge-store facts for an
//!   idea, without any LLM call

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use boardroom_core::{BusinessProfile, Facts, KnowledgeStore, StageInput, StageKind};

use crate::agents::StageAgent;
use crate::resilience::{LlmUsage, ProviderHealth};

/// Header carrying the stage success flag.
pub const SUCCESS_HEADER: &str = "x-stage-success";

#[derive(Clone)]
struct StageState {
    agent: Arc<StageAgent>,
    store: Arc<dyn KnowledgeStore>,
}

/// Health report of one stage agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageHealth {
    pub stage: String,
    pub status: String,
    pub providers: Vec<ProviderHealth>,
    pub usage: LlmUsage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketContextRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketContext {
    pub profile: BusinessProfile,
    pub facts: BTreeMap<&'static str, Facts>,
}

/// Router for one stage agent.
pub fn stage_router(agent: Arc<StageAgent>, store: Arc<dyn KnowledgeStore>) -> Router {
    let kind = agent.kind();
    let mut router = Router::new()
        .route(kind.path(), post(run_stage))
        .route("/health", get(health));
    if kind == StageKind::Research {
        router = router.route("/market-context", post(market_context));
    }
    router
        .with_state(StageState { agent, store })
        .layer(TraceLayer::new_for_http())
}

async fn run_stage(
    State(state): State<StageState>,
    Json(input): Json<StageInput>,
) -> Result<Response, (StatusCode, String)> {
    let result = state
        .agent
        .handle(&input)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let flag = if result.success { "true" } else { "false" };
    Ok(([(SUCCESS_HEADER, flag)], Json(result.output)).into_response())
}

async fn health(State(state): State<StageState>) -> Json<StageHealth> {
    let providers = state.agent.chain().health().await;
    let status = if providers.iter().any(|p| p.ready) { "ok" } else { "degraded" };
    Json(StageHealth {
        stage: state.agent.name().to_string(),
        status: status.to_string(),
        providers,
        usage: state.agent.usage(),
    })
}

async fn market_context(
    State(state): State<StageState>,
    Json(req): Json<MarketContextRequest>,
) -> Json<MarketContext> {
    let profile = BusinessProfile::classify(&req.title, &req.description);
    let facts = profile.gather(state.store.as_ref());
    Json(MarketContext { profile, facts })
}

/// Bind `addr` and serve `router` until the task is dropped.
pub async fn serve(addr: SocketAddr, router: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, router).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentFactory;
    use crate::providers::ProviderCause;
    use crate::testing::{chain_of, ScriptedProvider};
    use boardroom_core::StaticKnowledgeStore;
    use serde_json::{json, Value};

    async fn spawn(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn router_for(kind: StageKind, provider: &Arc<ScriptedProvider>) -> Router {
        let store: Arc<dyn KnowledgeStore> = Arc::new(StaticKnowledgeStore::seeded());
        let factory = AgentFactory::new(chain_of(&[provider]), Arc::clone(&store));
        stage_router(Arc::new(factory.build(kind).unwrap()), store)
    }

    #[tokio::test]
    async fn test_stage_endpoint_success_header() {
        let provider = Arc::new(ScriptedProvider::answering(
            "cerebras",
            r#"{"title": "TutorBot", "description": "AI tutoring"}"#,
        ));
        let addr = spawn(router_for(StageKind::Concept, &provider)).await;

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/develop-concept"))
            .json(&json!({"user_input": "AI tutor"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()[SUCCESS_HEADER], "true");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["title"], "TutorBot");
    }

    #[tokio::test]
    async fn test_fallback_is_still_200() {
        let provider = Arc::new(ScriptedProvider::failing("cerebras", ProviderCause::EmptyContent));
        let addr = spawn(router_for(StageKind::Finance, &provider)).await;

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/analyze-revenue"))
            .json(&json!({"user_input": "AI tutor", "context": {}}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()[SUCCESS_HEADER], "false");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, StageKind::Finance.fallback());
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let provider = Arc::new(ScriptedProvider::answering("cerebras", "{}"));
        let addr = spawn(router_for(StageKind::Concept, &provider)).await;

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/develop-concept"))
            .json(&json!({"user_input": "   "}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_health_reports_usage() {
        let provider = Arc::new(ScriptedProvider::answering("cerebras", "not json"));
        let addr = spawn(router_for(StageKind::Concept, &provider)).await;
        let client = reqwest::Client::new();

        client
            .post(format!("http://{addr}/develop-concept"))
            .json(&json!({"user_input": "AI tutor"}))
            .send()
            .await
            .unwrap();
        let health: StageHealth = client
            .get(format!("http://{addr}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(health.stage, "concept");
        assert_eq!(health.status, "ok");
        assert_eq!(health.providers, vec![ProviderHealth { id: "cerebras".into(), ready: true }]);
        assert_eq!(health.usage.stage_runs, 1);
        assert_eq!(health.usage.stage_fallbacks, 1);
    }

    #[tokio::test]
    async fn test_health_is_degraded_without_a_ready_provider() {
        let provider = Arc::new(ScriptedProvider::answering("cerebras", "{}").unready());
        let addr = spawn(router_for(StageKind::Finance, &provider)).await;

        let health: StageHealth = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(health.status, "degraded");
        assert!(!health.providers[0].ready);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_market_context_only_on_research() {
        let provider = Arc::new(ScriptedProvider::answering("cerebras", "{}"));
        let research = spawn(router_for(StageKind::Research, &provider)).await;
        let concept = spawn(router_for(StageKind::Concept, &provider)).await;
        let client = reqwest::Client::new();
        let body = json!({"title": "TutorBot", "description": "AI tutoring for students"});

        let context: Value = client
            .post(format!("http://{research}/market-context"))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(context["profile"]["industry"], "AI");
        assert_eq!(context["facts"]["industry"]["market_size"], "$50B");
        assert_eq!(provider.calls(), 0);

        let missing = client
            .post(format!("http://{concept}/market-context"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);
    }
}
