//! Authentication pipeline — turns one reader scan into a decision.
//!
//! Each scan walks a fixed sequence of stages:
//!
//! ```text
//! Idle → TokenExtracted → Resolved → Logged → Notified → Idle
//! ```
//!
//! The attempt is always logged before anyone is notified, and the pipeline
//! is back in [`ScanStage::Idle`] when [`AuthPipeline::process`] returns,
//! whatever the result. UID bounds are checked when the [`ScanEvent`] is
//! built, so a malformed scan never reaches this module.

use serde::Serialize;

use crate::error::{AccessError, Result};
use crate::event::{AccessEvent, CardRead, ScanEvent};
use crate::identity::{Identity, IdentityDirectory, IdentityId};
use crate::storage::BackingStore;

/// Where the pipeline is within the current scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanStage {
    Idle,
    TokenExtracted,
    Resolved,
    Logged,
    Notified,
}

impl std::fmt::Display for ScanStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::TokenExtracted => "token-extracted",
            Self::Resolved => "resolved",
            Self::Logged => "logged",
            Self::Notified => "notified",
        };
        f.write_str(s)
    }
}

/// Result of resolving a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Granted { identity_id: IdentityId },
    Denied,
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Everything one processed scan produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub decision: Decision,
    /// The event as written, with its sequence number.
    pub event: AccessEvent,
    pub card: CardRead,
    /// The matched identity after its last-seen stamp; `None` when denied.
    pub identity: Option<Identity>,
}

/// What a grant listener is told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantNotice {
    pub card: CardRead,
    pub identity: Identity,
    pub event: AccessEvent,
}

/// A listener's own failure, handed back to the caller untouched.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Called synchronously for every granted scan, in registration order.
pub trait GrantListener: Send {
    /// React to a grant (open a door, blink a LED, ...).
    ///
    /// # Errors
    ///
    /// Any error stops the remaining listeners and is returned from
    /// [`AuthPipeline::process`] as `AccessError::Listener`.
    fn on_granted(&mut self, notice: &GrantNotice) -> std::result::Result<(), ListenerError>;
}

impl<F> GrantListener for F
where
    F: FnMut(&GrantNotice) -> std::result::Result<(), ListenerError> + Send,
{
    fn on_granted(&mut self, notice: &GrantNotice) -> std::result::Result<(), ListenerError> {
        self(notice)
    }
}

/// Per-controller scan processor.
pub struct AuthPipeline {
    location: String,
    listeners: Vec<Box<dyn GrantListener>>,
    stage: ScanStage,
    last_card: Option<CardRead>,
}

impl AuthPipeline {
    /// Create a pipeline that tags every event with `location`.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            listeners: Vec::new(),
            stage: ScanStage::Idle,
            last_card: None,
        }
    }

    /// Register a listener; it runs after those already registered.
    pub fn add_listener(&mut self, listener: impl GrantListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Current stage. Always `Idle` between scans.
    pub fn stage(&self) -> ScanStage {
        self.stage
    }

    /// The most recent card seen, granted or not.
    pub fn last_card(&self) -> Option<&CardRead> {
        self.last_card.as_ref()
    }

    /// Run one scan through every stage.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::StoreFault` if the event could not be appended,
    /// in which case no listener was called, or `AccessError::Listener` if a
    /// listener failed after the event was logged.
    pub fn process<B: BackingStore>(
        &mut self,
        directory: &mut IdentityDirectory<B>,
        scan: &ScanEvent,
    ) -> Result<ScanOutcome> {
        let result = self.run(directory, scan);
        self.enter(ScanStage::Idle);
        result
    }

    fn run<B: BackingStore>(
        &mut self,
        directory: &mut IdentityDirectory<B>,
        scan: &ScanEvent,
    ) -> Result<ScanOutcome> {
        let card = scan.to_card();
        self.last_card = Some(card.clone());
        self.enter(ScanStage::TokenExtracted);

        let matched = match directory.authenticate(&card.token) {
            Ok(identity) => Some(identity),
            Err(AccessError::NotFound(_)) => None,
            Err(e) => {
                log::warn!("denying {} after lookup failure: {e}", card.token);
                None
            }
        };
        self.enter(ScanStage::Resolved);

        let event = match &matched {
            Some(identity) => AccessEvent::granted(identity.id, &card, &self.location),
            None => AccessEvent::denied(&card, &self.location),
        };
        let event = directory.store_mut().append_event(event)?;
        self.enter(ScanStage::Logged);

        let Some(identity) = matched else {
            log::warn!("access denied for {} at {}", card.token, self.location);
            return Ok(ScanOutcome {
                decision: Decision::Denied,
                event,
                card,
                identity: None,
            });
        };

        log::info!(
            "access granted to {} ({}) at {}",
            identity.id,
            identity.name,
            self.location
        );
        let identity = match directory.touch_last_seen(identity.id) {
            Ok(updated) => updated,
            Err(e) => {
                // The grant is already on record; the door still opens.
                log::error!("could not stamp last-seen for {}: {e}", identity.id);
                identity
            }
        };

        let notice = GrantNotice {
            card: card.clone(),
            identity: identity.clone(),
            event: event.clone(),
        };
        for listener in &mut self.listeners {
            listener.on_granted(&notice).map_err(AccessError::Listener)?;
        }
        self.enter(ScanStage::Notified);

        Ok(ScanOutcome {
            decision: Decision::Granted {
                identity_id: identity.id,
            },
            event,
            card,
            identity: Some(identity),
        })
    }

    fn enter(&mut self, stage: ScanStage) {
        log::debug!("scan stage {} -> {}", self.stage, stage);
        self.stage = stage;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
