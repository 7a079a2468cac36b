//! Label truncation for window buttons.
//!
//! A label either fits and is returned unchanged, or it is cut on a `char`
//! boundary and suffixed with the ellipsis marker. The cut point is found by
//! bisecting on character count, so a pathological title costs O(log n)
//! measurements instead of one per dropped character.

use crate::constants::{ELLIPSIS, ICON_SIZE, LABEL_PADDING, PANEL_WIDTH};
use crate::platform::TextMeasure;

/// Pixel budget of a window button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelMetrics {
    pub button_width: u32,
    /// Reserved only for entries that actually have an icon.
    pub icon_width: u32,
    pub padding: u32,
}

impl Default for LabelMetrics {
    fn default() -> Self {
        Self {
            button_width: PANEL_WIDTH,
            icon_width: ICON_SIZE,
            padding: LABEL_PADDING,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextLayoutEngine {
    ellipsis: String,
    metrics: LabelMetrics,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new(ELLIPSIS, LabelMetrics::default())
    }
}

impl TextLayoutEngine {
    pub fn new(ellipsis: impl Into<String>, metrics: LabelMetrics) -> Self {
        Self {
            ellipsis: ellipsis.into(),
            metrics,
        }
    }

    pub fn ellipsis(&self) -> &str {
        &self.ellipsis
    }

    pub fn metrics(&self) -> LabelMetrics {
        self.metrics
    }

    /// Label for a window button using the panel's own metrics.
    pub fn label<M: TextMeasure + ?Sized>(&self, measure: &M, title: &str, has_icon: bool) -> String {
        let icon_width = if has_icon { self.metrics.icon_width } else { 0 };
        self.layout(
            measure,
            title,
            self.metrics.button_width,
            icon_width,
            self.metrics.padding,
        )
    }

    /// Fit `title` into `available - icon_width - padding` pixels.
    ///
    /// Returns the title itself when it fits. Otherwise returns the longest
    /// prefix that still fits once the ellipsis is appended, or the bare
    /// ellipsis if not even that fits.
    pub fn layout<M: TextMeasure + ?Sized>(
        &self,
        measure: &M,
        title: &str,
        available: u32,
        icon_width: u32,
        padding: u32,
    ) -> String {
        let budget = available.saturating_sub(icon_width).saturating_sub(padding);
        if measure.text_width(title) <= budget {
            return title.to_string();
        }

        // Byte offset where a prefix of `k` chars ends, for k in 0..=n.
        let mut ends: Vec<usize> = title.char_indices().map(|(idx, _)| idx).collect();
        ends.push(title.len());
        let char_count = ends.len() - 1;

        let mut candidate = String::with_capacity(title.len() + self.ellipsis.len());
        let mut fits = |chars: usize| {
            candidate.clear();
            candidate.push_str(&title[..ends[chars]]);
            candidate.push_str(&self.ellipsis);
            measure.text_width(&candidate) <= budget
        };

        if !fits(0) {
            return self.ellipsis.clone();
        }

        // fits(lo) holds; the full title plus ellipsis is treated as too wide
        // because the bare title already was.
        let (mut lo, mut hi) = (0, char_count);
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if fits(mid) {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let mut label = String::with_capacity(ends[lo] + self.ellipsis.len());
        label.push_str(&title[..ends[lo]]);
        label.push_str(&self.ellipsis);
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every char is `advance` pixels wide.
    struct Monospace {
        advance: u32,
    }

    impl TextMeasure for Monospace {
        fn text_width(&self, text: &str) -> u32 {
            text.chars().count() as u32 * self.advance
        }
    }

    /// Narrow 'i'/'l', wide 'W'/'M', everything else medium.
    struct Proportional;

    impl TextMeasure for Proportional {
        fn text_width(&self, text: &str) -> u32 {
            text.chars()
                .map(|c| match c {
                    'i' | 'l' | '.' | ' ' => 3,
                    'W' | 'M' => 11,
                    _ => 7,
                })
                .sum()
        }
    }

    const MONO: Monospace = Monospace { advance: 6 };

    #[test]
    fn fitting_title_is_returned_verbatim() {
        let engine = TextLayoutEngine::default();
        assert_eq!(engine.layout(&MONO, "Notepad", 96, 16, 15), "Notepad");
    }

    #[test]
    fn long_title_is_truncated_with_ellipsis() {
        let engine = TextLayoutEngine::default();
        // budget = 96 - 16 - 15 = 65px -> 10 chars, 3 of them the marker
        let label = engine.layout(&MONO, "Notepad - untitled.txt", 96, 16, 15);
        assert_eq!(label, "Notepad...");
        assert!(MONO.text_width(&label) <= 65);
    }

    #[test]
    fn exact_fit_gets_no_ellipsis() {
        let engine = TextLayoutEngine::default();
        let title = "a".repeat(10);
        assert_eq!(engine.layout(&MONO, &title, 60, 0, 0), title);
    }

    #[test]
    fn bare_ellipsis_when_nothing_else_fits() {
        let engine = TextLayoutEngine::default();
        assert_eq!(engine.layout(&MONO, "Mail - Inbox", 20, 0, 0), "...");
        assert_eq!(engine.layout(&MONO, "Mail - Inbox", 5, 16, 15), "...");
    }

    #[test]
    fn cuts_on_char_boundaries() {
        let engine = TextLayoutEngine::default();
        let label = engine.layout(&MONO, "日本語のウィンドウタイトル", 60, 0, 0);
        assert_eq!(label, "日本語のウィン...");
    }

    #[test]
    fn icon_width_only_counts_when_present() {
        let engine = TextLayoutEngine::default();
        let title = "Calculator app";
        let with_icon = engine.label(&MONO, title, true);
        let without_icon = engine.label(&MONO, title, false);
        assert!(with_icon.chars().count() < without_icon.chars().count());
        assert!(MONO.text_width(&with_icon) <= 96 - 16 - 15);
        assert!(MONO.text_width(&without_icon) <= 96 - 15);
    }

    #[test]
    fn truncation_never_exceeds_budget() {
        let engine = TextLayoutEngine::default();
        let titles = [
            "",
            "W",
            "iiiiiiiiiiiiiiiiiiiiiiiiiiiiii",
            "WMWMWMWMWMWMWMWM",
            "Mail - Inbox - someone@example.com - Outlook",
            "a.b.c.d.e.f.g.h",
        ];
        for title in titles {
            for budget in 0..120 {
                let label = engine.layout(&Proportional, title, budget, 0, 0);
                let width = Proportional.text_width(&label);
                if label == title {
                    assert!(width <= budget, "{title:?} @ {budget}");
                } else {
                    assert!(label.ends_with("..."), "{label:?}");
                    if label != "..." {
                        assert!(width <= budget, "{label:?} @ {budget}");
                        assert!(title.starts_with(label.trim_end_matches("...")));
                    }
                }
            }
        }
    }

    #[test]
    fn picks_the_longest_fitting_prefix() {
        let engine = TextLayoutEngine::default();
        let title = "WiWiWiWiWiWi";
        let label = engine.layout(&Proportional, title, 40, 0, 0);
        let kept = label.trim_end_matches("...");
        let longer = &title[..kept.len() + 1];
        assert!(Proportional.text_width(&format!("{longer}...")) > 40);
    }

    #[test]
    fn custom_ellipsis_marker() {
        let engine = TextLayoutEngine::new("~", LabelMetrics::default());
        assert_eq!(engine.layout(&MONO, "abcdefghij", 30, 0, 0), "abcd~");
    }
}
