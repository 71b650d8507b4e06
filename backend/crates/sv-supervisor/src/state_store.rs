//! Authoritative per-port worker state.
//!
//! One `watch` channel per registered port: readers get consistent
//! snapshots without locking, and subscribers see every committed change.

use crate::{ServerState, ServerStatus};

use std::collections::{BTreeMap, HashMap};

use tokio::sync::watch;

#[derive(Debug)]
pub struct StateStore {
    states: HashMap<u16, watch::Sender<ServerState>>,
}

impl StateStore {
    pub fn new<I: IntoIterator<Item = u16>>(ports: I) -> Self {
        let states = ports
            .into_iter()
            .map(|port| {
                let (tx, _rx) = watch::channel(ServerState::stopped(port));
                (port, tx)
            })
            .collect();

        Self { states }
    }

    pub fn get(&self, port: u16) -> Option<ServerState> {
        self.states.get(&port).map(|tx| tx.borrow().clone())
    }

    /// Snapshot of every worker, keyed by port.
    pub fn all(&self) -> BTreeMap<u16, ServerState> {
        self.states
            .iter()
            .map(|(port, tx)| (*port, tx.borrow().clone()))
            .collect()
    }

    pub fn subscribe(&self, port: u16) -> Option<watch::Receiver<ServerState>> {
        self.states.get(&port).map(watch::Sender::subscribe)
    }

    /// Ports currently in `status`, ascending.
    pub fn ports_with_status(&self, status: ServerStatus) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .states
            .iter()
            .filter(|(_, tx)| tx.borrow().status() == status)
            .map(|(port, _)| *port)
            .collect();
        ports.sort_unstable();
        ports
    }

    /// Returns the replaced state, or `None` for an unknown port.
    pub(crate) fn replace(&self, state: ServerState) -> Option<ServerState> {
        self.states
            .get(&state.port())
            .map(|tx| tx.send_replace(state))
    }
}
