//! The admission state machine and in-flight accounting

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::store::ListStore;

/// Outcome of admission for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Execute the request normally.
    Proceed,
    /// The identity re-sent its previous command text; do nothing.
    SuppressDuplicate,
    /// Banned identity. Deliberately no feedback at all, so retries are
    /// never rewarded.
    Ignore,
    /// Rate-limit offense; this warning replaces the usual response.
    Warn(String),
}

/// Tunables for the admission machine.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Minimum time between commands before warnings accrue.
    pub min_interval: Duration,

    /// Warning count at which an identity is permanently banned.
    pub ban_limit: u32,

    /// Whether rate limiting and load shedding are enabled at startup.
    pub limit_rate: bool,

    /// In-flight ceiling above which non-admin work is shed silently.
    /// Defaults to `ban_limit` when unset.
    pub load_ceiling: Option<u32>,

    /// Baseline delivery delay, letting counter updates settle.
    pub base_delay: Duration,

    /// Per-in-flight-unit delivery delay under load.
    pub load_delay: Duration,

    /// Admins seeded when the store has none.
    pub default_admins: Vec<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(3),
            ban_limit: 3,
            limit_rate: true,
            load_ceiling: None,
            base_delay: Duration::from_millis(250),
            load_delay: Duration::from_secs(2),
            default_admins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct WarnState {
    last: Instant,
    count: u32,
}

#[derive(Debug, Clone)]
struct LastHandled {
    identity: String,
    at: Instant,
}

#[derive(Debug, Default)]
struct ControllerState {
    admins: HashSet<String>,
    banned: Vec<String>,
    warned: HashMap<String, WarnState>,
    /// Last handled command text, per identity (duplicate suppression).
    last_commands: HashMap<String, String>,
    /// Identity and time of the most recent handled message, globally.
    last_handled: Option<LastHandled>,
    limit_rate: bool,
    in_flight: u32,
    handled: u64,
}

/// Decides, for each inbound request, whether to execute it, warn, or drop
/// it, and spreads response delivery under load.
///
/// All shared mutable state lives behind a single lock; no method calls back
/// out while holding it, so no lock ordering concerns exist. Persistence
/// goes through the injected [`ListStore`] and is best-effort: a failed save
/// is logged and the in-memory state stays authoritative.
pub struct AdmissionController {
    config: AdmissionConfig,
    store: Arc<dyn ListStore>,
    state: RwLock<ControllerState>,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig, store: Arc<dyn ListStore>) -> Self {
        let admins = match store.load_admins() {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => config.default_admins.clone(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load admin list, using defaults");
                config.default_admins.clone()
            }
        };
        let banned = match store.load_banned() {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load ban list, starting empty");
                Vec::new()
            }
        };
        tracing::info!(
            admins = admins.len(),
            banned = banned.len(),
            "admission controller initialized"
        );

        let state = ControllerState {
            admins: admins.into_iter().collect(),
            banned,
            limit_rate: config.limit_rate,
            ..Default::default()
        };
        Self {
            config,
            store,
            state: RwLock::new(state),
        }
    }

    /// Decide how to treat one inbound message.
    ///
    /// Warning accrual is evaluated before duplicate suppression; a rapid
    /// duplicate still counts as an offense.
    pub async fn evaluate(
        &self,
        identity: &str,
        message: &str,
        is_command: bool,
        now: Instant,
    ) -> Decision {
        let mut state = self.state.write().await;

        // Admins bypass the machine entirely.
        if state.admins.contains(identity) {
            return Decision::Proceed;
        }

        if state.banned.iter().any(|n| n == identity) {
            return Decision::Ignore;
        }

        if state.limit_rate && is_command {
            if let Some(prev) = state.last_handled.clone() {
                let offense = match state.warned.get_mut(identity) {
                    // Already warned: another command inside the window.
                    Some(warn) => {
                        if now.duration_since(warn.last) < self.config.min_interval {
                            true
                        } else {
                            // Cadence is fine again; refresh the window.
                            warn.last = now;
                            false
                        }
                    }
                    // First offense: this identity was also the previous
                    // respondent, and came back too fast.
                    None => {
                        prev.identity == identity
                            && now.duration_since(prev.at) < self.config.min_interval
                    }
                };
                if offense {
                    let message = self.apply_warning(&mut state, identity, now);
                    return Decision::Warn(message);
                }
            }
        }

        if state.last_commands.get(identity).map(String::as_str) == Some(message) {
            return Decision::SuppressDuplicate;
        }

        Decision::Proceed
    }

    /// Record a warning for `identity`, banning at the configured limit.
    fn apply_warning(&self, state: &mut ControllerState, identity: &str, now: Instant) -> String {
        let warn = state
            .warned
            .entry(identity.to_string())
            .or_insert(WarnState { last: now, count: 0 });
        warn.last = now;
        warn.count += 1;
        let count = warn.count;

        if count >= self.config.ban_limit {
            if !state.banned.iter().any(|n| n == identity) {
                state.banned.push(identity.to_string());
            }
            self.persist_banned(&state.banned);
            tracing::info!(identity, warnings = count, "identity permanently banned");
            "no more.".to_string()
        } else if count == self.config.ban_limit - 1 {
            tracing::debug!(identity, warnings = count, "final warning issued");
            "really, slow down with your commands.".to_string()
        } else {
            tracing::debug!(identity, warnings = count, "warning issued");
            "slow down with your commands.".to_string()
        }
    }

    /// Coarse backpressure valve: refuse non-admin work outright while too
    /// many requests are between admission and final delivery.
    pub async fn admit_load(&self, identity: &str) -> bool {
        let state = self.state.read().await;
        if !state.limit_rate || state.admins.contains(identity) {
            return true;
        }
        let ceiling = self.config.load_ceiling.unwrap_or(self.config.ban_limit);
        state.in_flight <= ceiling
    }

    /// Note that a message was handled: refresh the global last-response
    /// slot and, when a command was dispatched, the per-identity duplicate
    /// slot.
    pub async fn record_handled(&self, identity: &str, command: Option<&str>, now: Instant) {
        let mut state = self.state.write().await;
        if let Some(text) = command {
            state
                .last_commands
                .insert(identity.to_string(), text.to_string());
        }
        state.last_handled = Some(LastHandled {
            identity: identity.to_string(),
            at: now,
        });
    }

    /// Increment the in-flight counter. Must be paired with exactly one
    /// [`Self::decrease`] on every path, including timeout and error paths.
    pub async fn increase(&self) {
        let mut state = self.state.write().await;
        state.in_flight += 1;
    }

    /// Decrement the in-flight counter and bump the handled total. Called
    /// exactly once when a response is finally dispatched.
    pub async fn decrease(&self) {
        let mut state = self.state.write().await;
        if state.in_flight > 0 {
            state.in_flight -= 1;
        }
        state.handled += 1;
    }

    /// Delay to apply before delivering a response.
    ///
    /// Low load gets a small fixed settle delay; above one in-flight request
    /// the delay scales linearly to spread bursty sends. Payload-less
    /// responses always go out at the baseline.
    pub async fn response_delay(&self, has_payload: bool) -> Duration {
        let state = self.state.read().await;
        if has_payload && state.in_flight > 1 {
            self.config.load_delay * state.in_flight
        } else {
            self.config.base_delay
        }
    }

    pub async fn is_admin(&self, identity: &str) -> bool {
        self.state.read().await.admins.contains(identity)
    }

    pub async fn limit_rate(&self) -> bool {
        self.state.read().await.limit_rate
    }

    pub async fn set_limit_rate(&self, enabled: bool) {
        self.state.write().await.limit_rate = enabled;
    }

    pub async fn in_flight(&self) -> u32 {
        self.state.read().await.in_flight
    }

    pub async fn handled(&self) -> u64 {
        self.state.read().await.handled
    }

    /// Ban identities outright, bypassing the warning stages. Admins and
    /// already-banned identities are skipped; returns those actually banned.
    pub async fn ban(&self, identities: &[String]) -> Vec<String> {
        let mut state = self.state.write().await;
        let mut added = Vec::new();
        for identity in identities {
            if state.admins.contains(identity) || state.banned.contains(identity) {
                continue;
            }
            state.banned.push(identity.clone());
            added.push(identity.clone());
        }
        if !added.is_empty() {
            self.persist_banned(&state.banned);
        }
        added
    }

    /// Lift bans; warning counts reset to zero but the entries remain.
    pub async fn unban(&self, identities: &[String]) -> Vec<String> {
        let mut state = self.state.write().await;
        let mut removed = Vec::new();
        for identity in identities {
            if state.banned.contains(identity) {
                state.banned.retain(|n| n != identity);
                if let Some(warn) = state.warned.get_mut(identity) {
                    warn.count = 0;
                }
                removed.push(identity.clone());
            }
        }
        if !removed.is_empty() {
            self.persist_banned(&state.banned);
        }
        removed
    }

    pub async fn banned(&self) -> Vec<String> {
        let mut list = self.state.read().await.banned.clone();
        list.sort();
        list
    }

    /// Current warning counts, sorted by identity.
    pub async fn warn_counts(&self) -> Vec<(String, u32)> {
        let state = self.state.read().await;
        let mut counts: Vec<(String, u32)> = state
            .warned
            .iter()
            .map(|(identity, warn)| (identity.clone(), warn.count))
            .collect();
        counts.sort();
        counts
    }

    /// Add an admin; returns false if already present.
    pub async fn add_admin(&self, identity: &str) -> bool {
        let mut state = self.state.write().await;
        if !state.admins.insert(identity.to_string()) {
            return false;
        }
        self.persist_admins(&state.admins);
        true
    }

    /// Remove an admin; returns false if not present.
    pub async fn remove_admin(&self, identity: &str) -> bool {
        let mut state = self.state.write().await;
        if !state.admins.remove(identity) {
            return false;
        }
        self.persist_admins(&state.admins);
        true
    }

    pub async fn admins(&self) -> Vec<String> {
        let mut list: Vec<String> = self.state.read().await.admins.iter().cloned().collect();
        list.sort();
        list
    }

    fn persist_banned(&self, banned: &[String]) {
        if let Err(err) = self.store.save_banned(banned) {
            tracing::warn!(error = %err, "failed to persist ban list, keeping in-memory state");
        }
    }

    fn persist_admins(&self, admins: &HashSet<String>) {
        let mut list: Vec<String> = admins.iter().cloned().collect();
        list.sort();
        if let Err(err) = self.store.save_admins(&list) {
            tracing::warn!(error = %err, "failed to persist admin list, keeping in-memory state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryListStore;

    fn controller() -> AdmissionController {
        AdmissionController::new(AdmissionConfig::default(), Arc::new(MemoryListStore::default()))
    }

    #[tokio::test]
    async fn test_fresh_identity_proceeds() {
        let admission = controller();
        let decision = admission
            .evaluate("alice", "!py 1+1", true, Instant::now())
            .await;
        assert_eq!(decision, Decision::Proceed);
    }

    #[tokio::test]
    async fn test_warn_escalation_to_ban() {
        let admission = controller();
        let start = Instant::now();

        // Baseline response establishes the rate-limit reference point.
        admission.record_handled("mallory", Some("!py 0"), start).await;

        let step = Duration::from_millis(500);
        let decisions = [
            admission.evaluate("mallory", "!py 1", true, start + step).await,
            admission.evaluate("mallory", "!py 2", true, start + step * 2).await,
            admission.evaluate("mallory", "!py 3", true, start + step * 3).await,
        ];
        assert_eq!(
            decisions[0],
            Decision::Warn("slow down with your commands.".to_string())
        );
        assert_eq!(
            decisions[1],
            Decision::Warn("really, slow down with your commands.".to_string())
        );
        assert_eq!(decisions[2], Decision::Warn("no more.".to_string()));

        // Banned now: complete silence.
        let fourth = admission
            .evaluate("mallory", "!py 4", true, start + step * 4)
            .await;
        assert_eq!(fourth, Decision::Ignore);
    }

    #[tokio::test]
    async fn test_warned_identity_recovers_by_slowing_down() {
        let admission = controller();
        let start = Instant::now();
        admission.record_handled("bob", Some("!py 0"), start).await;

        let warned = admission
            .evaluate("bob", "!py 1", true, start + Duration::from_secs(1))
            .await;
        assert!(matches!(warned, Decision::Warn(_)));

        // Waiting out the interval clears the offense without clearing the
        // count.
        let later = start + Duration::from_secs(10);
        let decision = admission.evaluate("bob", "!py 2", true, later).await;
        assert_eq!(decision, Decision::Proceed);
        assert_eq!(admission.warn_counts().await, vec![("bob".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_duplicate_suppression_is_per_identity() {
        let admission = controller();
        let now = Instant::now();
        admission.record_handled("alice", Some("!py 1+1"), now).await;

        let same = admission
            .evaluate("alice", "!py 1+1", true, now + Duration::from_secs(10))
            .await;
        assert_eq!(same, Decision::SuppressDuplicate);

        // A different identity sending the same text is not suppressed.
        let other = admission
            .evaluate("carol", "!py 1+1", true, now + Duration::from_secs(10))
            .await;
        assert_eq!(other, Decision::Proceed);
    }

    #[tokio::test]
    async fn test_admins_bypass_everything() {
        let admission = controller();
        admission.add_admin("root").await;
        let now = Instant::now();
        admission.record_handled("root", Some("!py 1"), now).await;

        // Rapid duplicate command from an admin still proceeds.
        let decision = admission
            .evaluate("root", "!py 1", true, now + Duration::from_millis(100))
            .await;
        assert_eq!(decision, Decision::Proceed);
        assert!(admission.ban(&["root".to_string()]).await.is_empty());
    }

    #[tokio::test]
    async fn test_unban_resets_warning_count() {
        let admission = controller();
        let banned = admission.ban(&["mallory".to_string()]).await;
        assert_eq!(banned, vec!["mallory"]);

        let removed = admission.unban(&["mallory".to_string()]).await;
        assert_eq!(removed, vec!["mallory"]);
        let decision = admission
            .evaluate("mallory", "!py 1", true, Instant::now())
            .await;
        assert_eq!(decision, Decision::Proceed);
    }

    #[tokio::test]
    async fn test_load_counter_pairing() {
        let admission = controller();
        for _ in 0..3 {
            admission.increase().await;
        }
        assert_eq!(admission.in_flight().await, 3);
        assert_eq!(
            admission.response_delay(true).await,
            Duration::from_secs(6)
        );

        for _ in 0..3 {
            admission.decrease().await;
        }
        assert_eq!(admission.in_flight().await, 0);
        assert_eq!(
            admission.response_delay(true).await,
            Duration::from_millis(250)
        );
        assert_eq!(admission.handled().await, 3);
    }

    #[tokio::test]
    async fn test_payloadless_response_uses_baseline_delay() {
        let admission = controller();
        for _ in 0..4 {
            admission.increase().await;
        }
        assert_eq!(
            admission.response_delay(false).await,
            Duration::from_millis(250)
        );
    }

    #[tokio::test]
    async fn test_load_ceiling_sheds_non_admin_work() {
        let admission = controller();
        admission.add_admin("root").await;
        for _ in 0..4 {
            admission.increase().await;
        }
        assert!(!admission.admit_load("alice").await);
        assert!(admission.admit_load("root").await);
    }

    #[tokio::test]
    async fn test_limit_rate_toggle() {
        let admission = controller();
        admission.set_limit_rate(false).await;
        let start = Instant::now();
        admission.record_handled("alice", Some("!py 0"), start).await;
        let decision = admission
            .evaluate("alice", "!py 1", true, start + Duration::from_millis(100))
            .await;
        assert_eq!(decision, Decision::Proceed);
        assert!(admission.admit_load("alice").await);
    }

    #[tokio::test]
    async fn test_ban_persists_through_store() {
        let store = Arc::new(MemoryListStore::default());
        let admission =
            AdmissionController::new(AdmissionConfig::default(), store.clone());
        admission.ban(&["mallory".to_string()]).await;
        assert_eq!(store.load_banned().unwrap(), vec!["mallory"]);
    }
}
