use std::sync::Arc;

use async_trait::async_trait;
use domain::{DomainError, Relay};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Handle of one registered child inside a [`DependentRelay`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildId(usize);

struct Child {
    target: Arc<dyn Relay>,
    demand: bool,
}

#[derive(Default)]
struct DemandState {
    children: Vec<Child>,
    /// Last state the underlying relay was successfully switched to
    applied: Option<bool>,
}

/// Shared actuator that is on exactly while at least one dependent child asks for it.
///
/// Children are the [`SignalingRelay`]s handed out by [`DependentRelay::signaling`]. Recording a
/// child's demand and switching the underlying relay happen under one lock, so two children
/// reporting at the same time cannot leave the relay in a state neither of them computed.
pub struct DependentRelay {
    name: String,
    relay: Arc<dyn Relay>,
    state: Mutex<DemandState>,
}

impl DependentRelay {
    pub fn new(name: impl Into<String>, relay: Arc<dyn Relay>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            relay,
            state: Mutex::new(DemandState::default()),
        })
    }

    /// Wraps `target` so that switching it also reports demand to this node.
    ///
    /// Asking twice for the same target (same allocation) yields the same child with its
    /// demand preserved.
    pub async fn signaling(self: &Arc<Self>, target: Arc<dyn Relay>) -> SignalingRelay {
        let mut state = self.state.lock().await;

        let existing = state
            .children
            .iter()
            .position(|child| Arc::ptr_eq(&child.target, &target));
        let child = match existing {
            Some(index) => ChildId(index),
            None => {
                state.children.push(Child {
                    target: target.clone(),
                    demand: false,
                });
                ChildId(state.children.len() - 1)
            }
        };

        SignalingRelay {
            node: self.clone(),
            child,
            target,
        }
    }

    /// Records `demand` for `child` and switches the underlying relay if the OR changed.
    async fn update(&self, child: ChildId, demand: bool) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;

        let slot = state.children.get_mut(child.0).ok_or_else(|| {
            DomainError::device(format!("{} has no child {:?}", self.name, child))
        })?;
        slot.demand = demand;

        let wanted = state.children.iter().any(|child| child.demand);
        if state.applied == Some(wanted) {
            return Ok(());
        }

        debug!(node = %self.name, enabled = wanted, "Dependent demand changed");
        let result = if wanted {
            self.relay.enable().await
        } else {
            self.relay.disable().await
        };

        match result {
            Ok(()) => {
                state.applied = Some(wanted);
                Ok(())
            }
            Err(e) => {
                warn!(node = %self.name, enabled = wanted, error = %e, "Dependent relay switch failed");
                Err(e)
            }
        }
    }

    /// Whether the underlying relay was last switched on; `None` before the first switch.
    pub async fn applied(&self) -> Option<bool> {
        self.state.lock().await.applied
    }

    pub async fn demand(&self) -> bool {
        self.state.lock().await.children.iter().any(|child| child.demand)
    }

    pub async fn children(&self) -> usize {
        self.state.lock().await.children.len()
    }
}

/// Virtual relay: forwards to its target, then reports the new demand to its parent node.
#[derive(Clone)]
pub struct SignalingRelay {
    node: Arc<DependentRelay>,
    child: ChildId,
    target: Arc<dyn Relay>,
}

impl SignalingRelay {
    pub fn child(&self) -> ChildId {
        self.child
    }
}

#[async_trait]
impl Relay for SignalingRelay {
    async fn enable(&self) -> Result<(), DomainError> {
        self.target.enable().await?;
        self.node.update(self.child, true).await
    }

    async fn disable(&self) -> Result<(), DomainError> {
        self.target.disable().await?;
        self.node.update(self.child, false).await
    }
}
