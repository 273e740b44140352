//! Arcus controller implementation
//!
//! One run per trigger:
//!
//! 1. Load the Arcus by namespace/name. Gone means deleted; children are
//!    garbage collected through their owner references, nothing to do.
//! 2. Fill defaults. If anything was filled, write the Arcus back and stop;
//!    the write triggers the next run.
//! 3. Validate the defaulted spec.
//! 4. Compile the four children and, in [`ChildKind::RECONCILE_ORDER`],
//!    create each missing one or synchronize and update each drifted one.
//!
//! The first failure aborts the run. There is no retry loop here; the
//! controller runtime requeues through [`error_policy`].

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use super::store::{KubeStore, ObjectStore};
use crate::child::{ChildKind, ChildResource};
use crate::compiler::EnsembleCompiler;
use crate::config::ControllerConfig;
use crate::crd::{Arcus, EnsembleIdentity};
use crate::events::{actions, reasons, EventPublisher, KubeEventPublisher};
use crate::Error;

/// Controller context shared by every reconcile run
pub struct Context {
    /// Object store the runs read from and write to
    pub store: Arc<dyn ObjectStore>,
    /// Event sink for user-visible outcomes
    pub events: Arc<dyn EventPublisher>,
    /// Requeue intervals and naming settings
    pub config: ControllerConfig,
}

impl Context {
    /// Create a builder for the controller context
    pub fn builder(client: Client) -> ContextBuilder {
        ContextBuilder::new(client)
    }

    /// Create a context backed by the Kubernetes API with default settings
    pub fn new(client: Client) -> Self {
        Self::builder(client).build()
    }

    /// Create a context for testing with custom store and events
    #[cfg(test)]
    pub fn for_testing(store: Arc<dyn ObjectStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            events,
            config: ControllerConfig::default(),
        }
    }
}

/// Builder for [`Context`]
pub struct ContextBuilder {
    client: Client,
    store: Option<Arc<dyn ObjectStore>>,
    events: Option<Arc<dyn EventPublisher>>,
    config: ControllerConfig,
}

impl ContextBuilder {
    fn new(client: Client) -> Self {
        Self {
            client,
            store: None,
            events: None,
            config: ControllerConfig::default(),
        }
    }

    /// Use the given controller settings
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the object store
    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the event publisher
    pub fn events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the context, filling unset collaborators with API-backed ones
    pub fn build(self) -> Context {
        let field_manager = self.config.field_manager.clone();
        Context {
            store: self
                .store
                .unwrap_or_else(|| Arc::new(KubeStore::new(self.client.clone(), &field_manager))),
            events: self.events.unwrap_or_else(|| {
                Arc::new(KubeEventPublisher::new(self.client.clone(), &field_manager))
            }),
            config: self.config,
        }
    }
}

/// What a child reconcile step did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildAction {
    /// The child was missing and has been created
    Created,
    /// Owned fields had drifted and the child was updated
    Updated,
    /// The child already matched
    Unchanged,
}

/// Per-kind results of a completed run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Kinds that were created
    pub created: Vec<ChildKind>,
    /// Kinds that were updated
    pub updated: Vec<ChildKind>,
    /// Kinds that needed no write
    pub unchanged: Vec<ChildKind>,
}

impl SyncReport {
    fn record(&mut self, kind: ChildKind, action: ChildAction) {
        match action {
            ChildAction::Created => self.created.push(kind),
            ChildAction::Updated => self.updated.push(kind),
            ChildAction::Unchanged => self.unchanged.push(kind),
        }
    }

    /// Number of writes the run issued
    pub fn writes(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

/// Result of one reconcile run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The Arcus no longer exists
    NotFound,
    /// Defaults were written back; the children were not touched
    Defaulted,
    /// The defaulted spec is invalid; the children were not touched
    Invalid(String),
    /// Every child was created or synchronized
    Synced(SyncReport),
}

/// Reconcile an Arcus resource
///
/// Entry point for the controller runtime. Runs [`reconcile_ensemble`],
/// reports the outcome as events and decides when to look again.
#[instrument(
    skip(arcus, ctx),
    fields(namespace = %arcus.namespace().unwrap_or_default(), name = %arcus.name_any())
)]
pub async fn reconcile(arcus: Arc<Arcus>, ctx: Arc<Context>) -> Result<Action, Error> {
    let identity = arcus.identity()?;
    let reference = arcus.object_ref(&());
    debug!("reconciling arcus");

    let outcome = match reconcile_ensemble(
        ctx.store.as_ref(),
        &ctx.config,
        identity.namespace(),
        identity.name(),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            ctx.events
                .publish(
                    &reference,
                    EventType::Warning,
                    reasons::RECONCILE_FAILED,
                    actions::RECONCILE,
                    Some(e.to_string()),
                )
                .await;
            return Err(e);
        }
    };

    match outcome {
        ReconcileOutcome::NotFound => Ok(Action::await_change()),
        ReconcileOutcome::Defaulted => {
            ctx.events
                .publish(
                    &reference,
                    EventType::Normal,
                    reasons::DEFAULTS_APPLIED,
                    actions::DEFAULT,
                    Some("filled unset spec fields with defaults".to_string()),
                )
                .await;
            Ok(Action::requeue(ctx.config.defaulted_requeue))
        }
        ReconcileOutcome::Invalid(message) => {
            ctx.events
                .publish(
                    &reference,
                    EventType::Warning,
                    reasons::VALIDATION_FAILED,
                    actions::RECONCILE,
                    Some(message),
                )
                .await;
            // Only a spec change can fix this.
            Ok(Action::await_change())
        }
        ReconcileOutcome::Synced(report) => {
            publish_child_writes(&ctx, &reference, &identity, &report).await;
            Ok(Action::requeue(ctx.config.resync_interval))
        }
    }
}

async fn publish_child_writes(
    ctx: &Context,
    reference: &k8s_openapi::api::core::v1::ObjectReference,
    identity: &EnsembleIdentity,
    report: &SyncReport,
) {
    let writes = report
        .created
        .iter()
        .map(|k| (k, reasons::CHILD_CREATED, actions::CREATE, "created"))
        .chain(
            report
                .updated
                .iter()
                .map(|k| (k, reasons::CHILD_UPDATED, actions::UPDATE, "updated")),
        );
    for (kind, reason, action, verb) in writes {
        ctx.events
            .publish(
                reference,
                EventType::Normal,
                reason,
                action,
                Some(format!("{verb} {kind} {}", kind.object_name(identity))),
            )
            .await;
    }
}

/// Drive one Arcus and its children toward the declared state
///
/// Works purely through `store`, so it can run against any implementation.
pub async fn reconcile_ensemble(
    store: &dyn ObjectStore,
    config: &ControllerConfig,
    namespace: &str,
    name: &str,
) -> Result<ReconcileOutcome, Error> {
    let Some(mut arcus) = store.get_arcus(namespace, name).await? else {
        info!("arcus not found, assuming it was deleted");
        return Ok(ReconcileOutcome::NotFound);
    };

    if arcus.with_defaults() {
        info!("applying default settings");
        store.update_arcus(&arcus).await?;
        return Ok(ReconcileOutcome::Defaulted);
    }

    if let Err(e) = arcus.spec.zookeeper.validate() {
        warn!(error = %e, "arcus validation failed");
        return Ok(ReconcileOutcome::Invalid(e.to_string()));
    }

    let identity = arcus.identity()?;
    let owner = arcus.owner_reference()?;
    let desired = EnsembleCompiler::new(&identity, &arcus.spec.zookeeper, &owner)
        .with_cluster_domain(&config.cluster_domain)
        .compile()?;

    let mut report = SyncReport::default();
    for kind in ChildKind::RECONCILE_ORDER {
        let action = reconcile_child(store, namespace, desired.child(kind)).await?;
        report.record(kind, action);
    }

    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        "arcus reconciled"
    );
    Ok(ReconcileOutcome::Synced(report))
}

/// Create `desired` if missing, otherwise synchronize and update if drifted
async fn reconcile_child(
    store: &dyn ObjectStore,
    namespace: &str,
    desired: ChildResource,
) -> Result<ChildAction, Error> {
    let kind = desired.kind();
    let name = desired.name();

    let Some(mut observed) = store.get_child(kind, namespace, &name).await? else {
        info!(%kind, %name, "creating child resource");
        store.create_child(namespace, &desired).await?;
        return Ok(ChildAction::Created);
    };

    if observed.synchronize(&desired)? {
        info!(%kind, %name, "updating child resource");
        store.update_child(namespace, &observed).await?;
        Ok(ChildAction::Updated)
    } else {
        debug!(%kind, %name, "child resource up to date");
        Ok(ChildAction::Unchanged)
    }
}

/// Error policy for the controller
///
/// Retryable failures are retried after the configured delay. Others wait
/// for the Arcus to change.
pub fn error_policy(arcus: Arc<Arcus>, error: &Error, ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        kind = "Arcus",
        namespace = %arcus.namespace().unwrap_or_default(),
        name = %arcus.name_any(),
        retryable = error.is_retryable(),
        "reconciliation failed"
    );

    if error.is_retryable() {
        Action::requeue(ctx.config.error_requeue)
    } else {
        Action::await_change()
    }
}
