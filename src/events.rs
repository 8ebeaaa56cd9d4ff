//! In-process domain events
//!
//! Publishers hold an [`EventPublisher`] handed to them at construction;
//! there is no global emitter. Listeners are plain closures registered
//! synchronously and invoked on the publishing thread, in registration order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{ArtefactKind, DeploymentId, OrganizationId, PackageId, SpaceId, UserId};
use crate::deployments::ports::PackageRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    ArtefactDeleted {
        kind: ArtefactKind,
        id: String,
        space_id: SpaceId,
    },
    PackagesDeleted {
        package_ids: Vec<PackageId>,
        space_id: SpaceId,
        deleted_by: UserId,
    },
    PackagesPublished {
        organization_id: OrganizationId,
        package_ids: Vec<PackageId>,
        deployment_ids: Vec<DeploymentId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ArtefactDeleted,
    PackagesDeleted,
    PackagesPublished,
}

impl DomainEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::ArtefactDeleted { .. } => EventKind::ArtefactDeleted,
            Self::PackagesDeleted { .. } => EventKind::PackagesDeleted,
            Self::PackagesPublished { .. } => EventKind::PackagesPublished,
        }
    }
}

pub trait EventPublisher: Send + Sync {
    /// Deliver `event`. Returns whether at least one listener received it.
    fn publish(&self, event: &DomainEvent) -> bool;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: &DomainEvent) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    listener: Listener,
}

#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscriptions: RwLock<Vec<Subscription>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.read().len())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().push(Subscription {
            id,
            kind,
            listener: Arc::new(listener),
        });
        debug!(?kind, subscription = id.0, "Listener subscribed");
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        before != subscriptions.len()
    }

    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: &DomainEvent) -> bool {
        let kind = event.kind();
        // Snapshot so listeners may (un)subscribe while being called.
        let listeners: Vec<Listener> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| Arc::clone(&s.listener))
            .collect();
        for listener in &listeners {
            listener(event);
        }
        debug!(?kind, listeners = listeners.len(), "Event published");
        !listeners.is_empty()
    }
}

/// Remove deleted artefacts from every package of their space.
pub fn register_package_cleanup(
    bus: &EventBus,
    packages: Arc<dyn PackageRepository>,
) -> SubscriptionId {
    bus.subscribe(EventKind::ArtefactDeleted, move |event| {
        let DomainEvent::ArtefactDeleted { kind, id, space_id } = event else {
            return;
        };
        match packages.remove_artefact_from_packages(space_id, id) {
            Ok(touched) => info!(
                kind = %kind,
                artefact_id = %id,
                space_id = %space_id,
                packages = touched,
                "Removed deleted artefact from packages"
            ),
            Err(e) => warn!(
                kind = %kind,
                artefact_id = %id,
                error = %e,
                "Failed to remove deleted artefact from packages"
            ),
        }
    })
}
