use edgebar::config::Config;
use edgebar::platform::scripted::{ScriptedDesktop, ScriptedView};
use edgebar::platform::{WindowHandle, WindowRecord};
use edgebar::window_list::{ReorderPolicy, WindowListSynchronizer};
use pretty_assertions::assert_eq;

fn h(raw: usize) -> WindowHandle {
    WindowHandle::new(raw)
}

fn synchronizer(policy: ReorderPolicy) -> WindowListSynchronizer {
    WindowListSynchronizer::new(Config::default().text_layout(), policy)
}

fn slots(list: &WindowListSynchronizer) -> Vec<(WindowHandle, usize)> {
    list.iter().map(|e| (e.handle(), e.slot_index())).collect()
}

#[test]
fn open_close_retitle_walkthrough() {
    let desktop = ScriptedDesktop::new();
    let wm = desktop.window_manager();
    let view = ScriptedView::new();
    let mut list = synchronizer(ReorderPolicy::Preserve);

    desktop.open(1, "Notepad", 100);
    desktop.open(2, "Mail - Inbox", 200);
    list.refresh(&wm, &view).unwrap();
    assert_eq!(slots(&list), vec![(h(1), 0), (h(2), 1)]);

    desktop.close(h(2));
    let report = list.refresh(&wm, &view).unwrap();
    assert_eq!(report.removed, vec![h(2)]);
    assert_eq!(slots(&list), vec![(h(1), 0)]);

    desktop.set_title(h(1), "Notepad - untitled.txt");
    let report = list.refresh(&wm, &view).unwrap();
    assert_eq!(report.relabeled, vec![h(1)]);
    let entry = list.get(h(1)).unwrap();
    assert_eq!(entry.full_title(), "Notepad - untitled.txt");
    assert!(entry.display_text().ends_with("..."));
    assert!(entry.display_text().len() < entry.full_title().len());
}

#[test]
fn double_trigger_is_harmless() {
    let desktop = ScriptedDesktop::new();
    let wm = desktop.window_manager();
    let view = ScriptedView::new();
    let mut list = synchronizer(ReorderPolicy::Preserve);
    desktop.open(1, "Notepad", 100);
    desktop.open(2, "Mail - Inbox", 200);

    // A shell notification and the poll tick landing back to back.
    let first = list.refresh(&wm, &view).unwrap();
    let second = list.refresh(&wm, &view).unwrap();

    assert_eq!(first.added, vec![h(1), h(2)]);
    assert!(second.is_empty());
    assert_eq!(list.len(), 2);
}

#[test]
fn malformed_records_never_reach_the_list() {
    let desktop = ScriptedDesktop::new();
    let wm = desktop.window_manager();
    let view = ScriptedView::new();
    let mut list = synchronizer(ReorderPolicy::Preserve);
    desktop.open(1, "Notepad", 100);
    desktop.open_tool_window(2, "Floating palette", 100);
    desktop.inject_record(WindowRecord::new(h(0), "null handle"));
    desktop.inject_record(WindowRecord::new(h(1), "Notepad again"));
    desktop.inject_record(WindowRecord::new(h(9), "   "));

    list.refresh(&wm, &view).unwrap();

    assert_eq!(list.order(), &[h(1)]);
    assert_eq!(list.get(h(1)).unwrap().full_title(), "Notepad");
}

#[test]
fn transient_enumeration_failure_recovers() {
    let desktop = ScriptedDesktop::new();
    let wm = desktop.window_manager();
    let view = ScriptedView::new();
    let mut list = synchronizer(ReorderPolicy::Preserve);
    desktop.open(1, "Notepad", 100);
    list.refresh(&wm, &view).unwrap();

    desktop.open(2, "Calculator", 200);
    desktop.fail_enumerations(1);
    assert!(list.refresh(&wm, &view).is_err());
    assert_eq!(list.order(), &[h(1)]);

    let report = list.refresh(&wm, &view).unwrap();
    assert_eq!(report.added, vec![h(2)]);
    assert_eq!(slots(&list), vec![(h(1), 0), (h(2), 1)]);
}

#[test]
fn manual_order_follows_the_configured_policy() {
    for (policy, expected) in [
        (ReorderPolicy::Preserve, vec![h(3), h(2), h(1), h(4)]),
        (ReorderPolicy::Reset, vec![h(1), h(2), h(3), h(4)]),
    ] {
        let desktop = ScriptedDesktop::new();
        let wm = desktop.window_manager();
        let view = ScriptedView::new();
        let mut list = synchronizer(policy);
        desktop.open(1, "One", 1);
        desktop.open(2, "Two", 2);
        desktop.open(3, "Three", 3);
        list.refresh(&wm, &view).unwrap();
        assert!(list.swap(h(1), h(3)).unwrap());

        desktop.open(4, "Four", 4);
        list.refresh(&wm, &view).unwrap();

        assert_eq!(list.order(), expected.as_slice(), "{policy}");
        let dense: Vec<usize> = list.iter().map(|e| e.slot_index()).collect();
        assert_eq!(dense, vec![0, 1, 2, 3]);
    }
}

#[test]
fn narrow_font_change_widens_labels() {
    let desktop = ScriptedDesktop::new();
    let wm = desktop.window_manager();
    let wide_font = ScriptedView::with_advance(12);
    let mut list = synchronizer(ReorderPolicy::Preserve);
    desktop.open(1, "Quarterly report draft", 100);
    list.refresh(&wm, &wide_font).unwrap();
    let before = list.get(h(1)).unwrap().display_text().to_string();

    let narrow_font = ScriptedView::with_advance(4);
    let changed = list.relabel_all(&narrow_font);

    assert_eq!(changed, vec![h(1)]);
    let after = list.get(h(1)).unwrap().display_text();
    assert!(after.chars().count() > before.chars().count());
}
