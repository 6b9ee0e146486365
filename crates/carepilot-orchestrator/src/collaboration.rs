use crate::engine::bounded;
use crate::metrics::compute_success_metrics;
use crate::pool::{Dispatcher, Job};
use carepilot_agent::{CollaborationProvider, ContributionRequest};
use carepilot_core::{
    agent_id, AgentType, CarePilotError, CarePilotResult, CollaborationMessage,
    CollaborationSession, SessionStatus,
};
use carepilot_store::CollaborationStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Plans collaborations synchronously and runs the exchange in the background.
pub struct CollaborationCoordinator {
    store: Arc<dyn CollaborationStore>,
    provider: Arc<dyn CollaborationProvider>,
    dispatcher: Dispatcher,
    call_timeout: Duration,
}

impl CollaborationCoordinator {
    pub fn new(
        store: Arc<dyn CollaborationStore>,
        provider: Arc<dyn CollaborationProvider>,
        dispatcher: Dispatcher,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            dispatcher,
            call_timeout,
        }
    }

    /// Create and plan a session, then schedule its exchange.
    ///
    /// A planning failure is returned to the caller and nothing is persisted.
    /// The returned session is in `planning`; poll [`get_session`](Self::get_session)
    /// for the outcome.
    pub async fn initiate(
        &self,
        agents: Vec<AgentType>,
        goal: impl Into<String>,
        context: serde_json::Value,
    ) -> CarePilotResult<CollaborationSession> {
        let mut session = CollaborationSession::new(agents, goal, context)?;
        session.transition(SessionStatus::Planning)?;

        let plan = bounded(
            self.call_timeout,
            "collaboration planning",
            self.provider
                .plan(&session.participating_agents, &session.goal, &session.context),
        )
        .await?;
        session.execution_plan = plan;

        let session = self.store.create(&session).await?;
        info!(
            session_id = %session.session_id,
            agents = session.participating_agents.len(),
            "Collaboration planned"
        );

        let job = Job::Collaboration {
            session_id: session.session_id.clone(),
        };
        if let Err(e) = self.dispatcher.submit(job).await {
            let mut failed = session;
            failed.fail(e.to_string());
            self.store.update(&failed).await?;
            return Err(e);
        }
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> CarePilotResult<Option<CollaborationSession>> {
        self.store.get(session_id).await
    }

    /// Worker entry point: contributions, synthesis and metrics for a planned session.
    ///
    /// Any failure marks the session `failed` with the reason.
    pub async fn run_collaboration(&self, session_id: &str) {
        let mut session = match self.store.get(session_id).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                debug!(session_id, "Collaboration not found");
                return;
            }
            Err(e) => {
                error!(session_id, error = %e, "Could not load collaboration");
                return;
            }
        };
        if session.status != SessionStatus::Planning {
            debug!(session_id, status = ?session.status, "Collaboration already ran");
            return;
        }

        match self.exchange(&mut session).await {
            Ok(()) => info!(session_id, "Collaboration completed"),
            Err(e) => {
                error!(session_id, status = ?session.status, error = %e, "Collaboration failed");
                session.fail(e.to_string());
                if let Err(e) = self.persist(&session).await {
                    error!(session_id, error = %e, "Could not record collaboration failure");
                }
            }
        }
    }

    async fn exchange(&self, session: &mut CollaborationSession) -> CarePilotResult<()> {
        let started = Instant::now();
        session.transition(SessionStatus::Exchanging)?;
        self.persist(session).await?;

        let participants = session.participating_agents.clone();
        for (index, agent_type) in participants.into_iter().enumerate() {
            let position = index + 1;
            let id = agent_id(agent_type, position);
            let request = ContributionRequest {
                agent_id: &id,
                agent_type,
                goal: &session.goal,
                plan: &session.execution_plan,
                transcript: &session.message_exchange,
            };
            let content = bounded(
                self.call_timeout,
                "collaboration contribution",
                self.provider.contribute(request),
            )
            .await?;
            debug!(session_id = %session.session_id, agent_id = %id, "Contribution received");
            session.add_message(CollaborationMessage::proposal(agent_type, position, content))?;
            self.persist(session).await?;
        }

        session.transition(SessionStatus::Synthesizing)?;
        self.persist(session).await?;
        let final_decision = bounded(
            self.call_timeout,
            "collaboration synthesis",
            self.provider
                .synthesize(&session.goal, &session.message_exchange),
        )
        .await?;

        let provider_calls = session.message_exchange.len() + 2;
        session.success_metrics = Some(compute_success_metrics(
            &session.participating_agents,
            &session.message_exchange,
            &final_decision,
            provider_calls,
            started.elapsed(),
        ));
        session.final_decision = Some(final_decision);
        session.transition(SessionStatus::Completed)?;
        self.persist(session).await
    }

    async fn persist(&self, session: &CollaborationSession) -> CarePilotResult<()> {
        match self.store.update(session).await? {
            Some(_) => Ok(()),
            None => Err(CarePilotError::NotFound(format!(
                "collaboration {} vanished from the store",
                session.session_id
            ))),
        }
    }
}
