//! The controller owns the block list, the schedule set and the active
//! state, and is the only thing that edits the hosts file.
//!
//! Every caller (scheduler ticks, socket clients, the in-process CLI) goes
//! through one `&mut Controller`, so transitions never overlap. Mutations
//! are written through to the [`SnapshotStore`] immediately.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use siteblock_core::{
    normalize, read_snapshot_at, write_snapshot_at, BlockList, Day, Domain, Schedule,
    ScheduleSet, Snapshot, SnapshotStore, TimeOfDay,
};
use siteblock_hosts::{HostsFile, Platform, WriteOutcome};

use crate::error::ControllerError;
use crate::protocol::{DaemonInfo, DaemonRequest};
use crate::settings::Settings;

/// What switched blocking on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationSource {
    Manual,
    Schedule,
}

/// State change performed by a scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Activated,
    Deactivated,
}

/// One schedule as reported to callers, with its removal index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub index: usize,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub days: Vec<Day>,
}

impl ScheduleEntry {
    fn new(index: usize, schedule: &Schedule) -> Self {
        Self {
            index,
            start: schedule.start(),
            end: schedule.end(),
            days: schedule.days().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub active: bool,
    pub source: Option<ActivationSource>,
    pub domains: Vec<Domain>,
    pub schedules: Vec<ScheduleEntry>,
    pub hosts_file: PathBuf,
    /// `None` when the hosts file could not be read.
    pub managed_block_present: Option<bool>,
    pub elevated: bool,
    pub sticky_manual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon: Option<DaemonInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub path: PathBuf,
    pub domains: usize,
    pub schedules: usize,
}

pub struct Controller {
    store: Box<dyn SnapshotStore>,
    hosts: HostsFile,
    platform: Arc<dyn Platform>,
    settings: Settings,
    sites: BlockList,
    schedules: ScheduleSet,
    active: Option<ActivationSource>,
}

impl Controller {
    /// Build a controller from whatever `store` holds. Blocking starts off.
    pub fn new(
        store: Box<dyn SnapshotStore>,
        hosts: HostsFile,
        platform: Arc<dyn Platform>,
        settings: Settings,
    ) -> Self {
        let snapshot = store.load();
        tracing::debug!(
            domains = snapshot.blocked_sites.len(),
            schedules = snapshot.scheduled_blocks.len(),
            "loaded snapshot",
        );
        Self {
            store,
            hosts,
            platform,
            settings,
            sites: snapshot.blocked_sites,
            schedules: snapshot.scheduled_blocks,
            active: None,
        }
    }

    /// Take over a managed block already present in the hosts file as a
    /// manual block. A controller that lives for a single command calls this
    /// so block list edits keep the file in step and `toggle` can switch the
    /// block off again. Returns whether a block was found.
    pub fn adopt_existing_block(&mut self) -> bool {
        match self.hosts.has_managed_block() {
            Ok(true) => {
                tracing::debug!(path = %self.hosts.path().display(), "adopting managed block");
                self.active = Some(ActivationSource::Manual);
                true
            }
            Ok(false) => false,
            Err(err) => {
                tracing::debug!(error = %err, "could not inspect hosts file");
                false
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn activation_source(&self) -> Option<ActivationSource> {
        self.active
    }

    pub fn domains(&self) -> Vec<Domain> {
        self.sites.snapshot()
    }

    pub fn schedules(&self) -> Vec<ScheduleEntry> {
        self.schedules
            .iter()
            .enumerate()
            .map(|(index, schedule)| ScheduleEntry::new(index, schedule))
            .collect()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn elevated(&self) -> bool {
        self.platform.has_elevated_privileges()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.sites.clone(), self.schedules.clone())
    }

    // -----------------------------------------------------------------------
    // Block list
    // -----------------------------------------------------------------------

    pub fn add_domain(&mut self, raw: &str) -> Result<Domain, ControllerError> {
        let domain = normalize(raw)?;
        if self.sites.contains(&domain) {
            return Err(ControllerError::DuplicateDomain { domain });
        }
        let mut next = self.sites.clone();
        next.add(domain.clone());
        self.replace_sites(next)?;
        tracing::info!(domain = %domain, "added domain");
        self.persist()?;
        Ok(domain)
    }

    pub fn remove_domain(&mut self, raw: &str) -> Result<Domain, ControllerError> {
        let domain = normalize(raw)?;
        if !self.sites.contains(&domain) {
            return Err(ControllerError::DomainNotFound { domain });
        }
        let mut next = self.sites.clone();
        next.remove(&domain);
        self.replace_sites(next)?;
        tracing::info!(domain = %domain, "removed domain");
        self.persist()?;
        Ok(domain)
    }

    /// Empty the block list, returning how many domains were dropped.
    pub fn clear_domains(&mut self) -> Result<usize, ControllerError> {
        let removed = self.sites.len();
        if removed == 0 {
            return Ok(0);
        }
        self.replace_sites(BlockList::new())?;
        tracing::info!(removed, "cleared block list");
        self.persist()?;
        Ok(removed)
    }

    /// Swap in a new block list, keeping the hosts file in step while
    /// blocking is active. On failure nothing changes.
    fn replace_sites(&mut self, next: BlockList) -> Result<(), ControllerError> {
        if self.is_active() {
            let outcome = self.hosts.resync(&self.sites.snapshot(), &next.snapshot())?;
            if outcome.is_written() {
                self.flush_dns();
            }
        }
        self.sites = next;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Schedules
    // -----------------------------------------------------------------------

    pub fn add_schedule(
        &mut self,
        start: &str,
        end: &str,
        days: impl IntoIterator<Item = Day>,
    ) -> Result<ScheduleEntry, ControllerError> {
        let schedule = Schedule::parse(start, end, days)?;
        let entry = ScheduleEntry::new(self.schedules.len(), &schedule);
        tracing::info!(schedule = %schedule, "added schedule");
        self.schedules.push(schedule);
        self.persist()?;
        Ok(entry)
    }

    pub fn remove_schedule(&mut self, index: usize) -> Result<ScheduleEntry, ControllerError> {
        let len = self.schedules.len();
        let removed = self
            .schedules
            .remove(index)
            .ok_or(ControllerError::ScheduleNotFound { index, len })?;
        tracing::info!(index, schedule = %removed, "removed schedule");
        self.persist()?;
        Ok(ScheduleEntry::new(index, &removed))
    }

    // -----------------------------------------------------------------------
    // Activation
    // -----------------------------------------------------------------------

    /// Switch blocking on by hand. Always rewrites the block, so a block left
    /// behind by an earlier process is completed rather than trusted.
    pub fn activate(&mut self) -> Result<WriteOutcome, ControllerError> {
        self.enable(ActivationSource::Manual)
    }

    /// Switch blocking off by hand. Always reverts, even when the in-memory
    /// state says inactive.
    pub fn deactivate(&mut self) -> Result<WriteOutcome, ControllerError> {
        self.disable()
    }

    /// Flip the active state and return the new value.
    pub fn toggle(&mut self) -> Result<bool, ControllerError> {
        if self.is_active() {
            self.disable()?;
            Ok(false)
        } else {
            self.enable(ActivationSource::Manual)?;
            Ok(true)
        }
    }

    /// Evaluate the schedules at `now` and switch state if they disagree
    /// with it.
    pub fn tick(&mut self, now: NaiveDateTime) -> Result<Option<Transition>, ControllerError> {
        let in_window = self.schedules.is_active_on(&now);
        match self.active {
            None if in_window && !self.sites.is_empty() => {
                self.enable(ActivationSource::Schedule)?;
                tracing::info!(
                    at = %now,
                    domains = self.sites.len(),
                    "schedule window opened, blocking",
                );
                Ok(Some(Transition::Activated))
            }
            Some(source) if !in_window && self.tick_may_end(source) => {
                self.disable()?;
                tracing::info!(at = %now, "outside every schedule window, unblocking");
                Ok(Some(Transition::Deactivated))
            }
            _ => Ok(None),
        }
    }

    fn tick_may_end(&self, source: ActivationSource) -> bool {
        source == ActivationSource::Schedule || !self.settings.sticky_manual
    }

    fn enable(&mut self, source: ActivationSource) -> Result<WriteOutcome, ControllerError> {
        if self.sites.is_empty() {
            return Err(ControllerError::EmptyBlockList);
        }
        let outcome = self.hosts.apply(&self.sites.snapshot())?;
        self.flush_dns();
        self.active = Some(source);
        Ok(outcome)
    }

    fn disable(&mut self) -> Result<WriteOutcome, ControllerError> {
        let outcome = self.hosts.revert(&self.sites.snapshot())?;
        self.flush_dns();
        self.active = None;
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    pub fn status(&self) -> Status {
        let managed_block_present = match self.hosts.has_managed_block() {
            Ok(present) => Some(present),
            Err(err) => {
                tracing::debug!(error = %err, "could not inspect hosts file");
                None
            }
        };
        Status {
            active: self.is_active(),
            source: self.active,
            domains: self.domains(),
            schedules: self.schedules(),
            hosts_file: self.hosts.path().to_path_buf(),
            managed_block_present,
            elevated: self.elevated(),
            sticky_manual: self.settings.sticky_manual,
            daemon: None,
        }
    }

    /// Unified diff of what activation would write; empty when nothing would
    /// change.
    pub fn preview(&self) -> Result<String, ControllerError> {
        Ok(self.hosts.preview_apply(&self.sites.snapshot())?)
    }

    // -----------------------------------------------------------------------
    // Backup / export
    // -----------------------------------------------------------------------

    pub fn backup_hosts(&self) -> Result<(PathBuf, u64), ControllerError> {
        let path = self.settings.backup_path.clone();
        let bytes = self.hosts.backup_to(&path)?;
        Ok((path, bytes))
    }

    /// Put the backed-up hosts file back. The restored file is whatever was
    /// backed up, so blocking is considered off afterwards.
    pub fn restore_hosts(&mut self) -> Result<WriteOutcome, ControllerError> {
        let outcome = self.hosts.restore_from(&self.settings.backup_path)?;
        self.flush_dns();
        self.active = None;
        tracing::info!(backup = %self.settings.backup_path.display(), "restored hosts file");
        Ok(outcome)
    }

    pub fn export_snapshot(&self, path: &Path) -> Result<PathBuf, ControllerError> {
        write_snapshot_at(path, &self.snapshot()).map_err(ControllerError::Snapshot)?;
        tracing::info!(path = %path.display(), "exported snapshot");
        Ok(path.to_path_buf())
    }

    /// Replace the block list and schedules with those in `path`.
    pub fn import_snapshot(&mut self, path: &Path) -> Result<ImportSummary, ControllerError> {
        let imported = read_snapshot_at(path).map_err(ControllerError::Snapshot)?;
        self.replace_sites(imported.blocked_sites)?;
        self.schedules = imported.scheduled_blocks;
        let summary = ImportSummary {
            path: path.to_path_buf(),
            domains: self.sites.len(),
            schedules: self.schedules.len(),
        };
        tracing::info!(
            path = %path.display(),
            domains = summary.domains,
            schedules = summary.schedules,
            "imported snapshot",
        );
        self.persist()?;
        Ok(summary)
    }

    /// Save state and take the block down if it is up.
    pub fn shutdown(&mut self) -> Result<(), ControllerError> {
        let saved = self.persist();
        if self.is_active() {
            self.disable()?;
        }
        saved
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Run one protocol request and encode its result.
    pub fn handle(&mut self, request: &DaemonRequest) -> Result<Value, ControllerError> {
        let data = match request {
            DaemonRequest::Add { site } => json!({ "domain": self.add_domain(site)? }),
            DaemonRequest::Remove { site } => json!({ "domain": self.remove_domain(site)? }),
            DaemonRequest::List => json!(self.domains()),
            DaemonRequest::Clear => json!({ "removed": self.clear_domains()? }),
            DaemonRequest::ScheduleAdd { start, end, days } => {
                let days = days
                    .iter()
                    .map(|d| d.parse::<Day>())
                    .collect::<Result<Vec<_>, _>>()?;
                json!(self.add_schedule(start, end, days)?)
            }
            DaemonRequest::ScheduleList => json!(self.schedules()),
            DaemonRequest::ScheduleRemove { index } => json!(self.remove_schedule(*index)?),
            DaemonRequest::On => {
                let outcome = self.activate()?;
                json!({ "active": true, "changed": outcome.is_written() })
            }
            DaemonRequest::Off => {
                let outcome = self.deactivate()?;
                json!({ "active": false, "changed": outcome.is_written() })
            }
            DaemonRequest::Toggle => json!({ "active": self.toggle()? }),
            DaemonRequest::Status => json!(self.status()),
            DaemonRequest::Diff => json!({ "diff": self.preview()? }),
            DaemonRequest::Backup => {
                let (path, bytes) = self.backup_hosts()?;
                json!({ "path": path, "bytes": bytes })
            }
            DaemonRequest::Restore => {
                let outcome = self.restore_hosts()?;
                json!({ "path": self.settings.backup_path, "changed": outcome.is_written() })
            }
            DaemonRequest::Export { path } => json!({ "path": self.export_snapshot(path)? }),
            DaemonRequest::Import { path } => json!(self.import_snapshot(path)?),
            DaemonRequest::Stop => json!({ "stopping": true }),
        };
        Ok(data)
    }

    fn persist(&mut self) -> Result<(), ControllerError> {
        let snapshot = self.snapshot();
        self.store.save(&snapshot).map_err(|err| {
            tracing::error!(error = %err, "failed to save snapshot");
            ControllerError::Persist(err)
        })
    }

    fn flush_dns(&self) {
        if !self.settings.flush_dns {
            return;
        }
        if let Err(err) = self.platform.flush_dns_cache() {
            tracing::warn!(error = %err, "DNS cache flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use chrono::NaiveDate;
    use siteblock_core::MemoryStore;
    use siteblock_hosts::NoopPlatform;
    use tempfile::TempDir;

    const STOCK: &str = "127.0.0.1 localhost\n";

    struct Fixture {
        dir: TempDir,
        store: MemoryStore,
        platform: NoopPlatform,
        controller: Controller,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with(MemoryStore::new(), |_| {})
        }

        fn with(store: MemoryStore, tweak: impl FnOnce(&mut Settings)) -> Self {
            let dir = TempDir::new().unwrap();
            let hosts_path = dir.path().join("hosts");
            fs::write(&hosts_path, STOCK).unwrap();
            let mut settings = Settings::for_home(dir.path()).with_hosts_path(&hosts_path);
            tweak(&mut settings);
            let platform = NoopPlatform::new(true);
            let controller = Controller::new(
                Box::new(store.clone()),
                HostsFile::new(hosts_path),
                Arc::new(platform.clone()),
                settings,
            );
            Self {
                dir,
                store,
                platform,
                controller,
            }
        }

        fn hosts(&self) -> String {
            fs::read_to_string(self.dir.path().join("hosts")).unwrap()
        }
    }

    /// 2024-01-01 was a Monday.
    fn monday(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn with_work_hours(fx: &mut Fixture) {
        fx.controller.add_domain("example.com").unwrap();
        fx.controller
            .add_schedule("09:00", "17:00", [Day::Monday])
            .unwrap();
    }

    // --- block list -------------------------------------------------------

    #[test]
    fn add_normalizes_and_persists() {
        let mut fx = Fixture::new();
        let domain = fx.controller.add_domain("https://www.Example.com").unwrap();
        assert_eq!(domain.as_str(), "example.com");
        let saved = fx.store.saved().unwrap();
        assert!(saved.blocked_sites.contains(&domain));
    }

    #[test]
    fn duplicate_and_invalid_domains_are_rejected() {
        let mut fx = Fixture::new();
        fx.controller.add_domain("example.com").unwrap();
        let dup = fx.controller.add_domain("www.example.com").unwrap_err();
        assert_eq!(dup.kind(), "duplicate_domain");
        let bad = fx.controller.add_domain("not a domain!!").unwrap_err();
        assert_eq!(bad.kind(), "invalid_domain");
        assert_eq!(fx.controller.domains().len(), 1);
        assert_eq!(fx.store.save_count(), 1);
    }

    #[test]
    fn removing_unknown_domain_fails() {
        let mut fx = Fixture::new();
        let err = fx.controller.remove_domain("example.com").unwrap_err();
        assert!(matches!(err, ControllerError::DomainNotFound { .. }));
    }

    #[test]
    fn save_failure_keeps_mutation() {
        let mut fx = Fixture::new();
        fx.store.fail_saves(true);
        let err = fx.controller.add_domain("example.com").unwrap_err();
        assert_eq!(err.kind(), "persist");
        assert_eq!(fx.controller.domains().len(), 1);
    }

    #[test]
    fn loads_existing_snapshot() {
        let sites: BlockList = [normalize("a.com").unwrap()].into_iter().collect();
        let store = MemoryStore::with_snapshot(Snapshot::new(sites, ScheduleSet::new()));
        let fx = Fixture::with(store, |_| {});
        assert_eq!(fx.controller.domains()[0].as_str(), "a.com");
        assert!(!fx.controller.is_active());
    }

    // --- schedules --------------------------------------------------------

    #[test]
    fn schedule_validation() {
        let mut fx = Fixture::new();
        let err = fx.controller.add_schedule("9am", "17:00", [Day::Monday]).unwrap_err();
        assert_eq!(err.kind(), "malformed_time");
        let err = fx.controller.add_schedule("09:00", "17:00", []).unwrap_err();
        assert_eq!(err.kind(), "empty_day_set");
        let err = fx.controller.remove_schedule(0).unwrap_err();
        assert!(matches!(err, ControllerError::ScheduleNotFound { index: 0, len: 0 }));
    }

    #[test]
    fn schedule_entries_are_indexed() {
        let mut fx = Fixture::new();
        fx.controller.add_schedule("09:00", "12:00", [Day::Monday]).unwrap();
        let second = fx
            .controller
            .add_schedule("13:00", "17:00", [Day::Friday, Day::Tuesday])
            .unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.days, [Day::Tuesday, Day::Friday]);

        let removed = fx.controller.remove_schedule(0).unwrap();
        assert_eq!(removed.start.to_string(), "09:00");
        assert_eq!(fx.controller.schedules()[0].index, 0);
    }

    // --- activation -------------------------------------------------------

    #[test]
    fn toggle_requires_domains() {
        let mut fx = Fixture::new();
        let err = fx.controller.toggle().unwrap_err();
        assert_eq!(err.kind(), "empty_block_list");
        assert!(!fx.controller.is_active());
        assert_eq!(fx.hosts(), STOCK);
    }

    #[test]
    fn toggle_applies_and_reverts() {
        let mut fx = Fixture::new();
        fx.controller.add_domain("example.com").unwrap();

        assert!(fx.controller.toggle().unwrap());
        assert_eq!(
            fx.controller.activation_source(),
            Some(ActivationSource::Manual)
        );
        assert!(fx.hosts().contains("127.0.0.1 www.example.com\n"));

        assert!(!fx.controller.toggle().unwrap());
        assert_eq!(fx.hosts(), STOCK);
        assert_eq!(fx.platform.flush_count(), 2);
    }

    #[test]
    fn deactivate_reverts_a_block_left_by_another_process() {
        let mut fx = Fixture::new();
        fx.controller.add_domain("example.com").unwrap();
        fx.controller.activate().unwrap();

        let mut settings = fx.controller.settings().clone();
        settings.flush_dns = false;
        let mut fresh = Controller::new(
            Box::new(fx.store.clone()),
            HostsFile::new(settings.hosts_path.clone()),
            Arc::new(NoopPlatform::new(true)),
            settings,
        );
        assert!(!fresh.is_active());
        assert!(fresh.deactivate().unwrap().is_written());
        assert_eq!(fx.hosts(), STOCK);
    }

    #[test]
    fn failed_transition_leaves_state_unchanged() {
        let mut fx = Fixture::new();
        fx.controller.add_domain("example.com").unwrap();
        fs::remove_file(fx.dir.path().join("hosts")).unwrap();

        let err = fx.controller.activate().unwrap_err();
        assert_eq!(err.kind(), "io");
        assert!(!fx.controller.is_active());
        assert_eq!(fx.platform.flush_count(), 0);
    }

    #[test]
    fn flush_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let hosts_path = dir.path().join("hosts");
        fs::write(&hosts_path, STOCK).unwrap();
        let platform = NoopPlatform::new(true).failing_flush();
        let mut controller = Controller::new(
            Box::new(MemoryStore::new()),
            HostsFile::new(&hosts_path),
            Arc::new(platform.clone()),
            Settings::for_home(dir.path()).with_hosts_path(&hosts_path),
        );
        controller.add_domain("example.com").unwrap();
        assert!(controller.toggle().unwrap());
        assert_eq!(platform.flush_count(), 1);
    }

    #[test]
    fn disabled_flush_never_calls_platform() {
        let mut fx = Fixture::with(MemoryStore::new(), |s| s.flush_dns = false);
        fx.controller.add_domain("example.com").unwrap();
        fx.controller.toggle().unwrap();
        assert_eq!(fx.platform.flush_count(), 0);
    }

    // --- domain changes while active --------------------------------------

    #[test]
    fn adding_while_active_extends_block() {
        let mut fx = Fixture::new();
        fx.controller.add_domain("a.com").unwrap();
        fx.controller.activate().unwrap();
        fx.controller.add_domain("b.com").unwrap();
        assert!(fx.hosts().contains("127.0.0.1 www.b.com\n"));
    }

    #[test]
    fn removing_while_active_drops_entries() {
        let mut fx = Fixture::new();
        fx.controller.add_domain("a.com").unwrap();
        fx.controller.add_domain("b.com").unwrap();
        fx.controller.activate().unwrap();

        fx.controller.remove_domain("a.com").unwrap();
        let hosts = fx.hosts();
        assert!(!hosts.contains("a.com"), "{hosts}");
        assert!(hosts.contains("127.0.0.1 b.com\n"));

        fx.controller.deactivate().unwrap();
        assert_eq!(fx.hosts(), STOCK);
    }

    #[test]
    fn clear_while_active_empties_block() {
        let mut fx = Fixture::new();
        fx.controller.add_domain("a.com").unwrap();
        fx.controller.activate().unwrap();
        assert_eq!(fx.controller.clear_domains().unwrap(), 1);
        assert_eq!(fx.hosts(), STOCK);
        assert_eq!(fx.controller.clear_domains().unwrap(), 0);
    }

    // --- ticks -------------------------------------------------------------

    #[test]
    fn tick_follows_schedule_window() {
        let mut fx = Fixture::new();
        with_work_hours(&mut fx);

        assert_eq!(fx.controller.tick(monday(8, 59)).unwrap(), None);
        assert_eq!(
            fx.controller.tick(monday(9, 0)).unwrap(),
            Some(Transition::Activated)
        );
        assert_eq!(
            fx.controller.activation_source(),
            Some(ActivationSource::Schedule)
        );
        assert_eq!(fx.controller.tick(monday(17, 0)).unwrap(), None);
        assert_eq!(
            fx.controller.tick(monday(17, 1)).unwrap(),
            Some(Transition::Deactivated)
        );
        assert_eq!(fx.hosts(), STOCK);
    }

    #[test]
    fn tick_with_empty_block_list_stays_inactive() {
        let mut fx = Fixture::new();
        fx.controller.add_schedule("00:00", "23:59", Day::ALL).unwrap();
        assert_eq!(fx.controller.tick(monday(12, 0)).unwrap(), None);
        assert!(!fx.controller.is_active());
    }

    #[test]
    fn tick_ends_manual_block_by_default() {
        let mut fx = Fixture::new();
        with_work_hours(&mut fx);
        fx.controller.activate().unwrap();
        assert_eq!(
            fx.controller.tick(monday(20, 0)).unwrap(),
            Some(Transition::Deactivated)
        );
    }

    #[test]
    fn sticky_manual_block_survives_ticks() {
        let mut fx = Fixture::with(MemoryStore::new(), |s| s.sticky_manual = true);
        with_work_hours(&mut fx);
        fx.controller.activate().unwrap();
        assert_eq!(fx.controller.tick(monday(20, 0)).unwrap(), None);
        assert!(fx.controller.is_active());

        fx.controller.deactivate().unwrap();
        fx.controller.tick(monday(10, 0)).unwrap();
        assert_eq!(
            fx.controller.tick(monday(20, 0)).unwrap(),
            Some(Transition::Deactivated)
        );
    }

    #[test]
    fn failed_tick_keeps_state_for_next_tick() {
        let mut fx = Fixture::new();
        with_work_hours(&mut fx);
        let hosts_path = fx.dir.path().join("hosts");
        fs::remove_file(&hosts_path).unwrap();
        assert!(fx.controller.tick(monday(10, 0)).is_err());
        assert!(!fx.controller.is_active());

        fs::write(&hosts_path, STOCK).unwrap();
        assert_eq!(
            fx.controller.tick(monday(10, 1)).unwrap(),
            Some(Transition::Activated)
        );
    }

    // --- reporting, backup, snapshots --------------------------------------

    #[test]
    fn status_reports_state() {
        let mut fx = Fixture::new();
        with_work_hours(&mut fx);
        fx.controller.activate().unwrap();
        let status = fx.controller.status();
        assert!(status.active);
        assert_eq!(status.source, Some(ActivationSource::Manual));
        assert_eq!(status.managed_block_present, Some(true));
        assert_eq!(status.schedules.len(), 1);
        assert!(status.elevated);
        assert!(status.daemon.is_none());
    }

    #[test]
    fn preview_does_not_touch_hosts() {
        let mut fx = Fixture::new();
        fx.controller.add_domain("example.com").unwrap();
        let diff = fx.controller.preview().unwrap();
        assert!(diff.contains("+127.0.0.1 example.com"));
        assert_eq!(fx.hosts(), STOCK);
    }

    #[test]
    fn restore_clears_active_state() {
        let mut fx = Fixture::new();
        fx.controller.add_domain("example.com").unwrap();
        let (path, bytes) = fx.controller.backup_hosts().unwrap();
        assert_eq!(bytes, STOCK.len() as u64);
        assert!(path.ends_with(".siteblock/hosts.backup"));

        fx.controller.activate().unwrap();
        assert!(fx.controller.restore_hosts().unwrap().is_written());
        assert!(!fx.controller.is_active());
        assert_eq!(fx.hosts(), STOCK);
    }

    #[test]
    fn restore_without_backup() {
        let mut fx = Fixture::new();
        let err = fx.controller.restore_hosts().unwrap_err();
        assert_eq!(err.kind(), "backup_not_found");
    }

    #[test]
    fn export_then_import_into_another_controller() {
        let mut source = Fixture::new();
        with_work_hours(&mut source);
        let exported = source.dir.path().join("export.json");
        source.controller.export_snapshot(&exported).unwrap();

        let mut target = Fixture::new();
        target.controller.add_domain("old.com").unwrap();
        let summary = target.controller.import_snapshot(&exported).unwrap();
        assert_eq!(summary.domains, 1);
        assert_eq!(summary.schedules, 1);
        assert_eq!(target.controller.domains()[0].as_str(), "example.com");
        assert_eq!(target.store.saved().unwrap(), source.controller.snapshot());
    }

    #[test]
    fn import_of_garbage_is_corrupt_snapshot() {
        let mut fx = Fixture::new();
        let path = fx.dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = fx.controller.import_snapshot(&path).unwrap_err();
        assert_eq!(err.kind(), "corrupt_snapshot");
        let err = fx
            .controller
            .import_snapshot(&fx.dir.path().join("missing.json"))
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn shutdown_saves_and_reverts() {
        let mut fx = Fixture::new();
        fx.controller.add_domain("example.com").unwrap();
        fx.controller.activate().unwrap();
        let saves = fx.store.save_count();

        fx.controller.shutdown().unwrap();
        assert_eq!(fx.store.save_count(), saves + 1);
        assert!(!fx.controller.is_active());
        assert_eq!(fx.hosts(), STOCK);
    }

    // --- request dispatch ---------------------------------------------------

    #[test]
    fn handle_encodes_results() {
        let mut fx = Fixture::new();
        let added = fx
            .controller
            .handle(&DaemonRequest::Add {
                site: "http://www.Example.com".into(),
            })
            .unwrap();
        assert_eq!(added, json!({ "domain": "example.com" }));

        let schedule = fx
            .controller
            .handle(&DaemonRequest::ScheduleAdd {
                start: "9:00".into(),
                end: "17:00".into(),
                days: vec!["mon".into(), "Friday".into()],
            })
            .unwrap();
        assert_eq!(
            schedule,
            json!({ "index": 0, "start": "09:00", "end": "17:00", "days": ["Monday", "Friday"] })
        );

        let status: Status =
            serde_json::from_value(fx.controller.handle(&DaemonRequest::Status).unwrap()).unwrap();
        assert_eq!(status, fx.controller.status());
    }

    #[test]
    fn handle_rejects_unknown_day() {
        let mut fx = Fixture::new();
        let err = fx
            .controller
            .handle(&DaemonRequest::ScheduleAdd {
                start: "09:00".into(),
                end: "17:00".into(),
                days: vec!["Funday".into()],
            })
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_day");
        assert!(fx.controller.schedules().is_empty());
    }

    fn second_controller(fx: &Fixture) -> Controller {
        Controller::new(
            Box::new(fx.store.clone()),
            HostsFile::new(fx.dir.path().join("hosts")),
            Arc::new(fx.platform.clone()),
            fx.controller.settings().clone(),
        )
    }

    #[test]
    fn adopted_block_follows_list_edits_and_reverts_cleanly() {
        let mut fx = Fixture::new();
        fx.controller.add_domain("a.com").unwrap();
        fx.controller.add_domain("b.com").unwrap();
        fx.controller.activate().unwrap();

        let mut next = second_controller(&fx);
        assert!(!next.is_active());
        assert!(next.adopt_existing_block());
        assert_eq!(next.activation_source(), Some(ActivationSource::Manual));

        next.remove_domain("a.com").unwrap();
        assert!(!fx.hosts().contains("a.com"));
        assert!(fx.hosts().contains("127.0.0.1 www.b.com\n"));

        let mut last = second_controller(&fx);
        assert!(last.adopt_existing_block());
        assert!(!last.toggle().unwrap());
        assert_eq!(fx.hosts(), STOCK);
    }

    #[test]
    fn nothing_to_adopt_in_a_clean_file() {
        let fx = Fixture::new();
        let mut next = second_controller(&fx);
        assert!(!next.adopt_existing_block());
        assert!(!next.is_active());
    }
}
