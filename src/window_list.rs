//! Keeps the panel's button list in step with the live window set.
//!
//! Entries are stored in a map keyed by window handle; the on-screen order
//! is a separate explicit sequence of handles. Every pass renumbers
//! `slot_index` from that sequence, so slots stay dense and unique no matter
//! how entries came and went.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::entry::ButtonEntry;
use crate::error::{EnumerationError, PanelError};
use crate::platform::{TextMeasure, WindowHandle, WindowManager, WindowRecord};
use crate::text_layout::TextLayoutEngine;

/// What happens to manual reordering when windows come or go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReorderPolicy {
    /// Swapped positions survive; new windows append, closed ones are cut.
    #[default]
    Preserve,
    /// Any structural change restores first-seen order, dropping swaps.
    Reset,
}

impl fmt::Display for ReorderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preserve => "preserve",
            Self::Reset => "reset",
        })
    }
}

impl FromStr for ReorderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "reset" => Ok(Self::Reset),
            other => Err(format!(
                "unknown reorder policy '{other}' (expected 'preserve' or 'reset')"
            )),
        }
    }
}

/// Handles touched by one synchronization pass. Empty means nothing on
/// screen needs to change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub added: Vec<WindowHandle>,
    pub removed: Vec<WindowHandle>,
    pub relabeled: Vec<WindowHandle>,
    pub moved: Vec<WindowHandle>,
}

impl RefreshReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.relabeled.is_empty()
            && self.moved.is_empty()
    }

    /// Entries were added or removed.
    pub fn is_structural(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Handles whose button has to be (re)drawn, each listed once.
    pub fn dirty(&self) -> Vec<WindowHandle> {
        let mut seen = HashSet::new();
        self.added
            .iter()
            .chain(&self.relabeled)
            .chain(&self.moved)
            .copied()
            .filter(|h| seen.insert(*h))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct WindowListSynchronizer {
    entries: HashMap<WindowHandle, ButtonEntry>,
    order: Vec<WindowHandle>,
    layout: TextLayoutEngine,
    policy: ReorderPolicy,
    next_sequence: u64,
}

impl Default for WindowListSynchronizer {
    fn default() -> Self {
        Self::new(TextLayoutEngine::default(), ReorderPolicy::default())
    }
}

impl WindowListSynchronizer {
    pub fn new(layout: TextLayoutEngine, policy: ReorderPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            layout,
            policy,
            next_sequence: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, handle: WindowHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn get(&self, handle: WindowHandle) -> Option<&ButtonEntry> {
        self.entries.get(&handle)
    }

    /// Handles in on-screen order.
    pub fn order(&self) -> &[WindowHandle] {
        &self.order
    }

    /// Entries in on-screen order.
    pub fn iter(&self) -> impl Iterator<Item = &ButtonEntry> {
        self.order.iter().filter_map(|h| self.entries.get(h))
    }

    pub fn layout(&self) -> &TextLayoutEngine {
        &self.layout
    }

    pub fn policy(&self) -> ReorderPolicy {
        self.policy
    }

    /// Re-enumerate windows and reconcile the entry list with the result.
    ///
    /// On enumeration failure nothing is touched and the error is returned;
    /// a stale list is better than an empty one. Malformed records are
    /// skipped individually.
    pub fn refresh<W, M>(&mut self, wm: &W, measure: &M) -> Result<RefreshReport, EnumerationError>
    where
        W: WindowManager + ?Sized,
        M: TextMeasure + ?Sized,
    {
        let records = wm.enumerate_top_level_windows()?;
        let fresh = eligible_records(wm, records);
        Ok(self.reconcile(wm, measure, &fresh))
    }

    fn reconcile<W, M>(&mut self, wm: &W, measure: &M, fresh: &[WindowRecord]) -> RefreshReport
    where
        W: WindowManager + ?Sized,
        M: TextMeasure + ?Sized,
    {
        let mut report = RefreshReport::default();
        let present: HashSet<WindowHandle> = fresh.iter().map(|r| r.handle).collect();

        let entries = &mut self.entries;
        self.order.retain(|handle| {
            if present.contains(handle) {
                return true;
            }
            entries.remove(handle);
            report.removed.push(*handle);
            false
        });

        for record in fresh {
            if let Some(entry) = self.entries.get_mut(&record.handle) {
                if entry.title_differs(&record.title, self.layout.ellipsis()) {
                    let display = self.layout.label(measure, &record.title, entry.has_icon());
                    trace!(handle = %record.handle, title = %record.title, "title changed");
                    entry.set_title(record.title.clone(), display);
                    report.relabeled.push(record.handle);
                }
                continue;
            }

            let icon = wm.icon(record.handle);
            let display = self.layout.label(measure, &record.title, icon.is_some());
            let entry = ButtonEntry::new(
                record.handle,
                record.title.clone(),
                display,
                icon,
                self.order.len(),
                self.next_sequence,
            );
            self.next_sequence += 1;
            self.entries.insert(record.handle, entry);
            self.order.push(record.handle);
            report.added.push(record.handle);
        }

        if self.policy == ReorderPolicy::Reset && report.is_structural() {
            let entries = &self.entries;
            self.order
                .sort_by_key(|h| entries.get(h).map_or(u64::MAX, ButtonEntry::sequence));
        }

        self.renumber(&mut report);

        if !report.is_empty() {
            debug!(
                added = report.added.len(),
                removed = report.removed.len(),
                relabeled = report.relabeled.len(),
                moved = report.moved.len(),
                total = self.order.len(),
                "window list synchronized"
            );
        }
        report
    }

    /// Assign dense slots from the order sequence. Entries added in this
    /// pass are not reported as moved.
    fn renumber(&mut self, report: &mut RefreshReport) {
        for (slot, handle) in self.order.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(handle)
                && entry.set_slot_index(slot)
                && !report.added.contains(handle)
            {
                report.moved.push(*handle);
            }
        }
    }

    /// Exchange the positions of two entries.
    ///
    /// Returns `Ok(false)` when both handles are the same entry.
    pub fn swap(&mut self, a: WindowHandle, b: WindowHandle) -> Result<bool, PanelError> {
        if a == b {
            return Ok(false);
        }
        let pos_a = self.position(a).ok_or(PanelError::UnknownWindow(a))?;
        let pos_b = self.position(b).ok_or(PanelError::UnknownWindow(b))?;
        self.order.swap(pos_a, pos_b);
        if let Some(entry) = self.entries.get_mut(&a) {
            entry.set_slot_index(pos_b);
        }
        if let Some(entry) = self.entries.get_mut(&b) {
            entry.set_slot_index(pos_a);
        }
        debug!(%a, %b, "swapped window buttons");
        Ok(true)
    }

    /// Recompute every label, e.g. after the font changed. Returns the
    /// handles whose label text actually changed.
    pub fn relabel_all<M: TextMeasure + ?Sized>(&mut self, measure: &M) -> Vec<WindowHandle> {
        let mut changed = Vec::new();
        for handle in &self.order {
            if let Some(entry) = self.entries.get_mut(handle) {
                let display = self.layout.label(measure, entry.full_title(), entry.has_icon());
                if display != entry.display_text() {
                    entry.set_display_text(display);
                    changed.push(*handle);
                }
            }
        }
        changed
    }

    fn position(&self, handle: WindowHandle) -> Option<usize> {
        self.order.iter().position(|h| *h == handle)
    }
}

/// Drop records that must never become buttons: null handles, blank titles,
/// repeats within one enumeration, and tool windows.
fn eligible_records<W: WindowManager + ?Sized>(
    wm: &W,
    records: Vec<WindowRecord>,
) -> Vec<WindowRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| {
            if record.handle.is_null() {
                debug!("skipping window record with null handle");
                return false;
            }
            if record.title.trim().is_empty() {
                debug!(handle = %record.handle, "skipping untitled window");
                return false;
            }
            if !seen.insert(record.handle) {
                debug!(handle = %record.handle, "skipping duplicate window record");
                return false;
            }
            match wm.is_tool_window(record.handle) {
                Ok(is_tool) => !is_tool,
                Err(err) => {
                    debug!(handle = %record.handle, error = %err, "skipping window with unreadable style");
                    false
                }
            }
        })
        .collect()
}
