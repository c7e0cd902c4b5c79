//! Page config persistence across the edit buffer, the local cache and remote settings.
//!
//! Edits are written to the local cache at once and pushed to the remote store after a
//! debounce delay. [`ConfigStore::tick`] is the timer driver: production code calls it from
//! a real timer, tests call it after advancing a [`ManualClock`](crate::clock::ManualClock).

use crate::clock::{Clock, Duration, Instant};
use crate::normalize::normalize_page_config;
use crate::page::PageConfig;
use crate::settings::{Settings, SettingsBackend};
use crate::storage::{LOCAL_CACHE_KEY, LocalCache, PageCache};
use crate::timestamp::compare_timestamps;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Default delay between the last edit and the remote write, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 260;

/// Tunables for a [`ConfigStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    /// Delay between the last edit and the remote write.
    pub debounce: Duration,
    /// Local cache namespace key.
    pub cache_key: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            cache_key: LOCAL_CACHE_KEY.to_string(),
        }
    }
}

/// What a flush attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was due.
    Idle,
    /// The buffer matched the last confirmed remote write.
    Skipped,
    /// The remote store accepted the write.
    Saved,
    /// The remote store did not write; the buffer stays unconfirmed.
    Failed,
}

/// A remote write taken from the buffer.
///
/// It owns everything the write needs, so it can be sent without holding the store.
/// Hand the result back to [`ConfigStore::complete_flush`].
pub struct PendingSave<B: SettingsBackend> {
    backend: Arc<B>,
    json: String,
    patch: Settings,
}

impl<B: SettingsBackend> PendingSave<B> {
    /// JSON of the config being written.
    pub fn json(&self) -> &str {
        &self.json
    }

    pub async fn send(&self) -> Option<Settings> {
        self.backend.save_settings(self.patch.clone()).await
    }
}

/// First half of a flush.
pub enum FlushStep<B: SettingsBackend> {
    /// Finished without a remote call.
    Done(FlushOutcome),
    /// A write to send.
    Save(PendingSave<B>),
}

/// Keeps one page's config consistent between the editor, the local cache and the
/// remote settings object.
pub struct ConfigStore<B: SettingsBackend, L: LocalCache> {
    page_id: String,
    template: PageConfig,
    options: StoreOptions,
    backend: Arc<B>,
    cache: PageCache<L>,
    clock: Arc<dyn Clock>,
    /// In-session copy of the remote settings.
    settings: Settings,
    /// The edit buffer.
    config: PageConfig,
    local_json: String,
    /// JSON of the last write the remote store confirmed.
    saved_json: Option<String>,
    /// Wake time of the pending debounced flush.
    flush_due: Option<Instant>,
    /// JSON of the write currently awaiting the remote store.
    in_flight: Option<String>,
    hydrated: bool,
}

impl<B: SettingsBackend, L: LocalCache> ConfigStore<B, L> {
    /// Create a store for `template.id`. The buffer holds the template until [`start`](Self::start).
    pub fn new(
        template: PageConfig,
        backend: Arc<B>,
        cache: Arc<L>,
        clock: Arc<dyn Clock>,
        options: StoreOptions,
    ) -> Self {
        let local_json = snapshot(&template);
        Self {
            page_id: template.id.clone(),
            cache: PageCache::new(cache, options.cache_key.clone()),
            config: template.clone(),
            template,
            options,
            backend,
            clock,
            settings: Settings::default(),
            local_json,
            saved_json: None,
            flush_due: None,
            in_flight: None,
            hydrated: false,
        }
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// The edit buffer.
    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// In-session copy of the remote settings, including optimistic local edits.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn local_json(&self) -> &str {
        &self.local_json
    }

    pub fn saved_json(&self) -> Option<&str> {
        self.saved_json.as_deref()
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn has_pending_flush(&self) -> bool {
        self.flush_due.is_some()
    }

    pub fn flush_due(&self) -> Option<Instant> {
        self.flush_due
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Load the page from `settings` and the local cache.
    pub fn start(&mut self, settings: Settings) {
        log::debug!("starting config store for page {}", self.page_id);
        self.rehydrate(settings);
    }

    /// Reconcile the buffer with new remote settings and the local cache.
    ///
    /// A buffer that is newer than everything incoming (or equally old but different) is
    /// kept and pushed again. Otherwise the newer of cache and remote is adopted; on equal
    /// stamps the cache wins. A config kept over a different one with the same stamp is
    /// stamped again, since the remote store keeps its own copy on ties.
    pub fn rehydrate(&mut self, settings: Settings) {
        self.settings = settings;
        let remote = self.decode(self.settings.page_config(&self.page_id).cloned());
        let local = self.decode(self.cache.read(&self.page_id));
        let remote_json = remote.as_ref().map(snapshot);
        let mut conflict = false;

        let incoming = match (local, remote) {
            (Some(local), Some(remote)) => {
                match compare_timestamps(local.updated_at.as_deref(), remote.updated_at.as_deref()) {
                    Ordering::Less => remote,
                    Ordering::Greater => local,
                    Ordering::Equal => {
                        conflict = remote_json.as_deref() != Some(snapshot(&local).as_str());
                        local
                    }
                }
            }
            (Some(local), None) => local,
            (None, Some(remote)) => remote,
            (None, None) => {
                self.seed();
                return;
            }
        };
        let incoming_json = snapshot(&incoming);

        if self.hydrated && self.buffer_wins(&incoming, &incoming_json) {
            log::debug!(
                "page {}: keeping local buffer over incoming config ({:?} vs {:?})",
                self.page_id,
                self.config.updated_at,
                incoming.updated_at
            );
            if compare_timestamps(self.config.updated_at.as_deref(), incoming.updated_at.as_deref())
                == Ordering::Equal
            {
                self.restamp();
            }
            self.push_to_settings();
            self.schedule_flush();
            return;
        }

        self.config = incoming;
        self.local_json = incoming_json;
        self.hydrated = true;
        self.flush_due = None;
        if conflict {
            log::debug!("page {}: cached config conflicts with remote at the same stamp", self.page_id);
            self.restamp();
        }

        if remote_json.as_deref() == Some(self.local_json.as_str()) {
            self.saved_json = Some(self.local_json.clone());
        } else {
            log::debug!("page {}: local cache is ahead of remote, pushing", self.page_id);
            self.push_to_settings();
            self.schedule_flush();
        }
    }

    /// Record a user edit: stamp it, cache it, and schedule the remote write.
    pub fn commit(&mut self, mut config: PageConfig) {
        config.id = self.page_id.clone();
        config.stamp(self.clock.utc_now());
        self.local_json = snapshot(&config);
        self.config = config;
        self.hydrated = true;

        self.cache.write(&self.page_id, &self.config);
        self.push_to_settings();
        self.schedule_flush();
    }

    /// (Re)arm the debounce timer. Any earlier pending flush is replaced.
    pub fn schedule_flush(&mut self) {
        self.flush_due = Some(self.clock.now() + self.options.debounce);
    }

    /// Fire the pending flush if its debounce delay has elapsed.
    pub async fn tick(&mut self) -> FlushOutcome {
        let step = self.begin_due_flush();
        self.finish(step).await
    }

    /// Write the buffer to the remote store now, cancelling the debounce timer.
    pub async fn flush_now(&mut self) -> FlushOutcome {
        let step = self.begin_flush();
        self.finish(step).await
    }

    /// Take the due debounced write, if any. While another write is awaiting the remote
    /// store the deadline stays armed and nothing is taken.
    pub fn begin_due_flush(&mut self) -> FlushStep<B> {
        match self.flush_due {
            Some(due) if self.clock.now() >= due && self.in_flight.is_none() => self.begin_flush(),
            _ => FlushStep::Done(FlushOutcome::Idle),
        }
    }

    /// Take the buffer as a write now, cancelling the debounce timer.
    pub fn begin_flush(&mut self) -> FlushStep<B> {
        self.flush_due = None;
        if !self.hydrated {
            return FlushStep::Done(FlushOutcome::Idle);
        }
        let current = Some(self.local_json.as_str());
        if self.saved_json.as_deref() == current || self.in_flight.as_deref() == current {
            return FlushStep::Done(FlushOutcome::Skipped);
        }

        let value = match serde_json::to_value(&self.config) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("page {} not serializable: {}", self.page_id, e);
                return FlushStep::Done(FlushOutcome::Failed);
            }
        };
        self.in_flight = Some(self.local_json.clone());
        FlushStep::Save(PendingSave {
            backend: self.backend.clone(),
            json: self.local_json.clone(),
            patch: Settings::page_patch(&self.page_id, value),
        })
    }

    /// Apply the remote store's answer to `save`. `None` means nothing was written.
    pub fn complete_flush(&mut self, save: PendingSave<B>, result: Option<Settings>) -> FlushOutcome {
        if self.in_flight.as_deref() == Some(save.json.as_str()) {
            self.in_flight = None;
        }
        match result {
            Some(updated) => {
                log::debug!("page {} saved to remote settings", self.page_id);
                self.saved_json = Some(save.json);
                self.rehydrate(updated);
                FlushOutcome::Saved
            }
            None => {
                log::warn!("remote save of page {} failed", self.page_id);
                FlushOutcome::Failed
            }
        }
    }

    async fn finish(&mut self, step: FlushStep<B>) -> FlushOutcome {
        match step {
            FlushStep::Done(outcome) => outcome,
            FlushStep::Save(save) => {
                let result = save.send().await;
                self.complete_flush(save, result)
            }
        }
    }

    /// Browser `pagehide`: flush without waiting for the debounce.
    pub async fn on_page_hide(&mut self) -> FlushOutcome {
        self.flush_now().await
    }

    /// Browser `visibilitychange`: flush when the document became hidden.
    pub async fn on_visibility_change(&mut self, hidden: bool) -> FlushOutcome {
        if hidden {
            self.flush_now().await
        } else {
            FlushOutcome::Idle
        }
    }

    /// Tear down, flushing any unsaved edit.
    pub async fn dispose(mut self) -> FlushOutcome {
        log::debug!("disposing config store for page {}", self.page_id);
        self.flush_now().await
    }

    /// Normalize a raw stored config. Entries without a `blocks` array count as absent.
    fn decode(&self, raw: Option<Value>) -> Option<PageConfig> {
        let raw = raw?;
        if !raw.get("blocks").is_some_and(Value::is_array) {
            log::warn!("ignoring malformed stored config for page {}", self.page_id);
            return None;
        }
        Some(normalize_page_config(Some(&raw), &self.template))
    }

    fn buffer_wins(&self, incoming: &PageConfig, incoming_json: &str) -> bool {
        match compare_timestamps(self.config.updated_at.as_deref(), incoming.updated_at.as_deref()) {
            Ordering::Greater => true,
            Ordering::Equal => self.local_json != incoming_json,
            Ordering::Less => false,
        }
    }

    /// Nothing stored anywhere: keep the buffer if we have one, else start from the template.
    fn seed(&mut self) {
        if !self.hydrated {
            let mut seed = self.template.clone();
            seed.repack();
            seed.stamp(self.clock.utc_now());
            log::debug!("seeding page {} from template", self.page_id);
            self.local_json = snapshot(&seed);
            self.config = seed;
            self.hydrated = true;
        }
        self.cache.write(&self.page_id, &self.config);
        self.push_to_settings();
        self.schedule_flush();
    }

    /// Stamp the buffer with the current time and cache it.
    fn restamp(&mut self) {
        self.config.stamp(self.clock.utc_now());
        self.local_json = snapshot(&self.config);
        self.cache.write(&self.page_id, &self.config);
    }

    /// Optimistically place the buffer in the in-session settings copy.
    fn push_to_settings(&mut self) {
        match serde_json::to_value(&self.config) {
            Ok(value) => {
                self.settings.page_configs.insert(self.page_id.clone(), value);
            }
            Err(e) => log::warn!("page {} not serializable: {}", self.page_id, e),
        }
    }
}

fn snapshot(config: &PageConfig) -> String {
    config.to_json().unwrap_or_else(|e| {
        log::warn!("page {} not serializable: {}", config.id, e);
        String::new()
    })
}
