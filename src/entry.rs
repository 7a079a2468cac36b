use crate::platform::{Icon, WindowHandle};

/// One window button: the OS handle plus everything needed to draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonEntry {
    handle: WindowHandle,
    full_title: String,
    display_text: String,
    icon: Option<Icon>,
    slot_index: usize,
    /// First-seen counter; restores natural order under the reset policy.
    sequence: u64,
}

impl ButtonEntry {
    pub(crate) fn new(
        handle: WindowHandle,
        full_title: String,
        display_text: String,
        icon: Option<Icon>,
        slot_index: usize,
        sequence: u64,
    ) -> Self {
        Self {
            handle,
            full_title,
            display_text,
            icon,
            slot_index,
            sequence,
        }
    }

    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    /// Complete window title. Also used as the tooltip.
    pub fn full_title(&self) -> &str {
        &self.full_title
    }

    /// Label as drawn, possibly truncated with an ellipsis.
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn icon(&self) -> Option<Icon> {
        self.icon
    }

    pub fn has_icon(&self) -> bool {
        self.icon.is_some()
    }

    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn set_title(&mut self, full_title: String, display_text: String) {
        self.full_title = full_title;
        self.display_text = display_text;
    }

    pub(crate) fn set_display_text(&mut self, display_text: String) {
        self.display_text = display_text;
    }

    /// Returns true when the slot actually changed.
    pub(crate) fn set_slot_index(&mut self, slot_index: usize) -> bool {
        if self.slot_index == slot_index {
            return false;
        }
        self.slot_index = slot_index;
        true
    }

    /// Whether `reported` is a different title than the one on record.
    ///
    /// A trailing ellipsis on the stored title is ignored, so a title that
    /// once ended in the marker does not register as changed when the OS
    /// reports it without one.
    pub(crate) fn title_differs(&self, reported: &str, ellipsis: &str) -> bool {
        if self.full_title == reported {
            return false;
        }
        self.full_title
            .strip_suffix(ellipsis)
            .is_none_or(|stem| stem != reported)
    }
}
