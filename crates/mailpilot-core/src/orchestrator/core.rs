//! Orchestrator core structure
//!
//! Contains the `ConversationOrchestrator` struct, its builder methods and the
//! per-session state it owns.

use crate::approval::{ApprovalGate, PendingApproval, SharedApprovalGate};
use crate::broadcaster::{ObserverResult, SessionEvent, StateBroadcaster, Subscription};
use crate::host::{ContextProvider, NoContext, ToolExecutor};
use crate::planner::ToolCallPlanner;
use crate::state::{AgentState, ConversationHistory, ConversationTurn};
use mailpilot_llm::ProviderRouter;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::config::{OrchestratorConfig, ProviderSelection};

/// The turn currently holding the session
pub(crate) struct ActiveTurn {
    pub(crate) id: Uuid,
    pub(crate) cancel: CancellationToken,
}

/// Mutable state of one session
#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) is_processing: bool,
    pub(crate) current_task: Option<String>,
    pub(crate) active_turn: Option<ActiveTurn>,
    pub(crate) history: ConversationHistory,
}

/// Runs conversation turns for one session
pub struct ConversationOrchestrator {
    pub(crate) router: Arc<ProviderRouter>,
    pub(crate) planner: ToolCallPlanner,
    pub(crate) gate: SharedApprovalGate,
    pub(crate) broadcaster: StateBroadcaster,
    pub(crate) executor: Arc<dyn ToolExecutor>,
    pub(crate) context: Arc<dyn ContextProvider>,
    pub(crate) selection: ProviderSelection,
    pub(crate) config: OrchestratorConfig,
    pub(crate) session: Mutex<SessionState>,
}

impl ConversationOrchestrator {
    /// Create an orchestrator with an empty session
    #[must_use]
    pub fn new(
        router: Arc<ProviderRouter>,
        selection: ProviderSelection,
        executor: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            router,
            planner: ToolCallPlanner::new(),
            gate: Arc::new(ApprovalGate::new()),
            broadcaster: StateBroadcaster::default(),
            executor,
            context: Arc::new(NoContext),
            selection,
            config: OrchestratorConfig::default(),
            session: Mutex::new(SessionState::default()),
        }
    }

    /// Set the context collaborator
    #[must_use]
    pub fn with_context(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = context;
        self
    }

    /// Set the configuration
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a broadcaster with other components
    #[must_use]
    pub fn with_broadcaster(mut self, broadcaster: StateBroadcaster) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    /// Get the broadcaster
    #[must_use]
    pub fn broadcaster(&self) -> &StateBroadcaster {
        &self.broadcaster
    }

    /// Get the approval gate
    #[must_use]
    pub fn gate(&self) -> &SharedApprovalGate {
        &self.gate
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Get the provider selection
    #[must_use]
    pub fn selection(&self) -> &ProviderSelection {
        &self.selection
    }

    /// Register observers; see [`StateBroadcaster::subscribe`]
    pub fn subscribe<S, M>(&self, on_state: S, on_message: M) -> Subscription
    where
        S: Fn(&AgentState) -> ObserverResult + Send + Sync + 'static,
        M: Fn(&SessionEvent) -> ObserverResult + Send + Sync + 'static,
    {
        self.broadcaster.subscribe(on_state, on_message)
    }

    pub(crate) fn session(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state snapshot
    #[must_use]
    pub fn state(&self) -> AgentState {
        let (is_processing, current_task) = {
            let session = self.session();
            (session.is_processing, session.current_task.clone())
        };
        AgentState {
            is_processing,
            current_task,
            pending_approvals: self.gate.pending(),
        }
    }

    /// Whether a turn is in flight
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.session().is_processing
    }

    /// Conversation history, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.session().history.turns().to_vec()
    }

    /// Approvals awaiting a decision, oldest first
    #[must_use]
    pub fn pending_approvals(&self) -> Vec<PendingApproval> {
        self.gate.pending()
    }

    /// Push the current state to observers
    pub(crate) fn publish_state(&self) {
        let state = self.state();
        self.broadcaster.publish_state(&state);
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        self.broadcaster.publish_message(&event);
    }
}
