//! Client heartbeat watchdog
//!
//! Tracks the liveness of remote controllers. Each client sends a heartbeat
//! at least once per interval; a client that stays silent longer is dropped.
//! Depending on the mode, losing one client or losing the last client trips
//! the watchdog, and the engine brings the machine to a stop.

use heapless::{LinearMap, String};

/// Default heartbeat interval
pub const HEARTBEAT_INTERVAL_MS: u32 = 3000;

/// Maximum tracked clients
pub const MAX_CLIENTS: usize = 8;

/// Maximum client identifier length in bytes
pub const MAX_CLIENT_ID_LEN: usize = 24;

/// Client identifier
pub type ClientId = String<MAX_CLIENT_ID_LEN>;

/// When the watchdog trips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogMode {
    /// Watchdog disabled
    #[default]
    None,
    /// Trip as soon as any client goes missing
    Any,
    /// Trip once the last client has gone missing
    Last,
}

/// Result of a watchdog check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogStatus {
    /// All clients alive (or watchdog disabled)
    Ok,
    /// Clients went missing but the mode tolerates it
    ClientMissing(u8),
    /// The machine must stop
    Tripped,
}

/// Errors when registering clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogError {
    /// Identifier longer than [`MAX_CLIENT_ID_LEN`]
    IdTooLong,
    /// Already tracking [`MAX_CLIENTS`] clients
    TooManyClients,
}

/// Heartbeat watchdog
#[derive(Debug, Clone)]
pub struct HeartbeatWatchdog {
    interval_ms: u32,
    mode: WatchdogMode,
    /// Last heartbeat per client (absolute ms)
    clients: LinearMap<ClientId, u64, MAX_CLIENTS>,
}

impl Default for HeartbeatWatchdog {
    fn default() -> Self {
        Self::new(HEARTBEAT_INTERVAL_MS)
    }
}

impl HeartbeatWatchdog {
    /// Create a disabled watchdog
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            mode: WatchdogMode::None,
            clients: LinearMap::new(),
        }
    }

    /// Change the mode
    ///
    /// Enabling the watchdog forgets every known client and starts fresh.
    pub fn set_mode(&mut self, mode: WatchdogMode) {
        self.mode = mode;
        if mode != WatchdogMode::None {
            self.clients.clear();
        }
        info!("watchdog mode: {}", mode);
    }

    pub fn get_mode(&self) -> WatchdogMode {
        self.mode
    }

    pub fn set_interval(&mut self, interval_ms: u32) {
        self.interval_ms = interval_ms;
    }

    pub fn get_interval(&self) -> u32 {
        self.interval_ms
    }

    /// Register a client, counting registration as its first heartbeat
    pub fn add_client(&mut self, id: &str, now_ms: u64) -> Result<(), WatchdogError> {
        self.heartbeat(id, now_ms)
    }

    /// Forget a client without tripping
    pub fn remove_client(&mut self, id: &str) {
        if let Ok(key) = ClientId::try_from(id) {
            self.clients.remove(&key);
        }
    }

    /// Record a heartbeat; unknown clients are added
    pub fn heartbeat(&mut self, id: &str, now_ms: u64) -> Result<(), WatchdogError> {
        let key = ClientId::try_from(id).map_err(|_| WatchdogError::IdTooLong)?;
        self.clients
            .insert(key, now_ms)
            .map_err(|_| WatchdogError::TooManyClients)?;
        Ok(())
    }

    pub fn number_of_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn is_client_alive(&self, id: &str) -> bool {
        ClientId::try_from(id)
            .map(|key| self.clients.contains_key(&key))
            .unwrap_or(false)
    }

    /// Drop silent clients and decide whether the machine must stop
    pub fn check(&mut self, now_ms: u64) -> WatchdogStatus {
        if self.mode == WatchdogMode::None {
            return WatchdogStatus::Ok;
        }

        let interval = u64::from(self.interval_ms);
        let before = self.clients.len();
        let mut missing: heapless::Vec<ClientId, MAX_CLIENTS> = heapless::Vec::new();
        for (id, last) in self.clients.iter() {
            if now_ms.saturating_sub(*last) > interval {
                let _ = missing.push(id.clone());
            }
        }
        for id in &missing {
            self.clients.remove(id);
        }

        let lost = before - self.clients.len();
        if lost == 0 {
            return WatchdogStatus::Ok;
        }
        warn!("watchdog: {} client(s) missing", lost);

        match self.mode {
            WatchdogMode::Any => WatchdogStatus::Tripped,
            WatchdogMode::Last if self.clients.is_empty() => WatchdogStatus::Tripped,
            _ => WatchdogStatus::ClientMissing(lost as u8),
        }
    }
}
