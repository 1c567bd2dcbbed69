//! Relay session: reacts to channel events on behalf of one terminal identity.

use crate::courier::{CourierHandle, RaiseTrigger, TriggerOutcome};
use crate::jobs::{RaisePayload, RAISE_PRINTER_EVENT};
use crate::registration::{Announcer, Identity, RegistrationStatus, RegistrationTracker};
use crate::CourierResult;
use fiscal_channel::{ChannelEvent, ChannelHandle, ConnectionState};
use std::future::Future;
use tracing::{debug, error, info, warn};

/// Why [`RelaySession::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayExit {
    /// The shutdown future resolved.
    Shutdown,
    /// The channel gave up reconnecting.
    ChannelClosed,
}

/// Session state shared by the event loop and the operator.
pub struct RelaySession<A: Announcer> {
    state: ConnectionState,
    registration: RegistrationTracker,
    announcer: A,
    courier: CourierHandle,
}

impl<A: Announcer> RelaySession<A> {
    pub fn new(announcer: A, courier: CourierHandle) -> Self {
        Self {
            state: ConnectionState::Connecting,
            registration: RegistrationTracker::new(),
            announcer,
            courier,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_registered()
    }

    pub fn registration(&self) -> &RegistrationStatus {
        self.registration.status()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.registration.identity()
    }

    pub fn courier(&self) -> &CourierHandle {
        &self.courier
    }

    pub fn into_courier(self) -> CourierHandle {
        self.courier
    }

    /// Validate and store an identity, announcing it now if connected.
    ///
    /// Invalid input is rejected without touching the network or the stored identity.
    pub async fn submit(&mut self, circuit_id: &str, pos_ids: &str) -> CourierResult<()> {
        let identity = Identity::parse(circuit_id, pos_ids)?;
        info!(
            circuit_id = identity.circuit_id(),
            pos_ids = ?identity.pos_ids(),
            "Identity submitted"
        );
        self.registration.submit(identity);

        if self.state == ConnectionState::Connected {
            self.announce().await;
        } else {
            info!("Not connected, registration will be sent on connect");
        }
        Ok(())
    }

    /// Apply one channel event.
    pub async fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::StateChanged(state) => self.on_state(state).await,
            ChannelEvent::Event { name, payload } if name == RAISE_PRINTER_EVENT => {
                let payload = RaisePayload::from_value(&payload);
                info!(
                    pos_id = ?payload.pos_id,
                    circuit_id = ?payload.circuit_id,
                    kind = ?payload.kind,
                    timestamp = ?payload.timestamp,
                    "Printer raised"
                );
                if self.courier.trigger(RaiseTrigger::new(payload)) == TriggerOutcome::Closed {
                    error!("Raise could not be handled, courier has stopped");
                }
            }
            ChannelEvent::Event { name, .. } => {
                debug!(event = %name, "Ignoring channel event");
            }
            ChannelEvent::Ack { id, args } => {
                self.registration.on_ack(id, &args);
            }
        }
    }

    async fn on_state(&mut self, state: ConnectionState) {
        let previous = std::mem::replace(&mut self.state, state);
        match state {
            ConnectionState::Connected => {
                info!("Connected to event channel");
                // A new connection never inherits an earlier announcement.
                self.registration.clear_announcement();
                self.announce().await;
            }
            ConnectionState::Disconnected => {
                if previous == ConnectionState::Connected {
                    warn!("Disconnected from event channel");
                }
                self.registration.clear_announcement();
            }
            ConnectionState::Connecting => debug!("Connecting to event channel"),
        }
    }

    async fn announce(&mut self) {
        let Some(identity) = self.registration.identity() else {
            debug!("No identity yet, nothing to announce");
            return;
        };

        match self.announcer.announce(identity).await {
            Ok(ack_id) => {
                info!(
                    circuit_id = identity.circuit_id(),
                    pos_ids = ?identity.pos_ids(),
                    ack_id,
                    "Registration sent"
                );
                self.registration.mark_announced(ack_id);
            }
            Err(e) => {
                warn!(error = %e, "Failed to send registration, will retry on next connect");
            }
        }
    }

    /// Consume channel events until `shutdown` resolves or the channel gives up.
    pub async fn run(
        &mut self,
        channel: &mut ChannelHandle,
        shutdown: impl Future<Output = ()>,
    ) -> RelayExit {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    return RelayExit::Shutdown;
                }
                event = channel.next_event() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        error!("Event channel stopped reconnecting");
                        return RelayExit::ChannelClosed;
                    }
                },
            }
        }
    }
}
