use std::io;
use std::time::Duration;

use edgebar::config::Config;
use edgebar::controller::{Activation, PanelController};
use edgebar::event_loop::{ControlFlow, EventLoop, EventQueue, EventSource, PanelEvent};
use edgebar::platform::scripted::{Call, ScriptedDesktop, ScriptedView};
use edgebar::platform::{ProcessId, Row, ScreenEdge, ShellEvent, WindowHandle};
use pretty_assertions::assert_eq;

fn h(raw: usize) -> WindowHandle {
    WindowHandle::new(raw)
}

/// Replays a fixed script of UI events, then lets the shell's queued
/// notifications through.
struct ScriptSource {
    script: Vec<PanelEvent>,
    shell: EventQueue,
}

impl EventSource for ScriptSource {
    fn poll(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(!self.shell.is_empty() || !self.script.is_empty())
    }

    fn read(&mut self) -> io::Result<PanelEvent> {
        if let Some(event) = self.shell.pop() {
            return Ok(event);
        }
        if self.script.is_empty() {
            return Err(io::Error::other("script exhausted"));
        }
        Ok(self.script.remove(0))
    }
}

#[test]
fn activate_toggles_between_foreground_and_minimized() {
    let desktop = ScriptedDesktop::new();
    desktop.open(1, "Notepad", 100);
    let events = EventQueue::new();
    let mut controller = PanelController::start(
        desktop.window_manager(),
        desktop.shell(),
        ScriptedView::new(),
        &Config::default(),
        &events,
    );

    assert_eq!(controller.activate(h(1)).unwrap(), Activation::Foregrounded);
    assert_eq!(controller.tracked_process(), Some(ProcessId(100)));
    assert_eq!(desktop.foreground(), Some(h(1)));

    assert_eq!(controller.activate(h(1)).unwrap(), Activation::Minimized);
    assert_eq!(controller.tracked_process(), None);
    assert!(desktop.is_minimized(h(1)));
}

#[test]
fn full_session_through_the_event_loop() {
    let desktop = ScriptedDesktop::new();
    desktop.open(1, "Notepad", 100);
    desktop.open(2, "Mail - Inbox", 200);
    let view = ScriptedView::new();
    let events = EventQueue::new();
    let mut controller = PanelController::start(
        desktop.window_manager(),
        desktop.shell(),
        view.clone(),
        &Config::default(),
        &events,
    );
    assert_eq!(desktop.reservation(), Some((ScreenEdge::Left, 96)));

    // A window opens while the panel is idle; the shell tells us about it.
    desktop.open(3, "Terminal", 300);
    desktop.emit(ShellEvent::WindowCreated(h(3)));

    let mut event_loop = EventLoop::new(
        ScriptSource {
            script: vec![
                PanelEvent::Click(Row::Window(h(2))),
                PanelEvent::Drop {
                    source: h(3),
                    target: h(1),
                },
                PanelEvent::Click(Row::StartKey),
                PanelEvent::Click(Row::Close),
                PanelEvent::MetricsChanged,
            ],
            shell: events.clone(),
        },
        Duration::from_millis(1),
    );
    event_loop
        .run(|_, event| {
            Ok(match event {
                Some(event) => controller.handle(event),
                None => ControlFlow::Continue,
            })
        })
        .unwrap();

    assert_eq!(view.window_rows(), vec![h(3), h(2), h(1)]);
    assert_eq!(desktop.foreground(), Some(h(2)));
    assert_eq!(controller.tracked_process(), Some(ProcessId(200)));
    assert!(desktop.calls().contains(&Call::StartKey));
    // Close released the edge and stopped the loop before the last event.
    assert_eq!(desktop.reservation(), None);
    assert!(events.is_empty());
}

#[test]
fn degraded_startup_still_tracks_windows_by_polling() {
    let desktop = ScriptedDesktop::new();
    desktop.reject_reservation();
    desktop.reject_subscription();
    let view = ScriptedView::new();
    let events = EventQueue::new();
    let mut controller = PanelController::start(
        desktop.window_manager(),
        desktop.shell(),
        view.clone(),
        &Config::default(),
        &events,
    );
    assert!(controller.is_degraded());
    assert!(!desktop.emit(ShellEvent::WindowCreated(h(1))));

    desktop.open(1, "Notepad", 100);
    controller.refresh().unwrap();
    assert_eq!(view.window_rows(), vec![h(1)]);

    // Nothing was reserved, so nothing is released.
    controller.shutdown();
    assert!(!desktop.calls().contains(&Call::Release));
}

#[test]
fn clicking_a_window_that_just_closed_resets_the_toggle() {
    let desktop = ScriptedDesktop::new();
    desktop.open(1, "Notepad", 100);
    desktop.open(2, "Paint", 200);
    let events = EventQueue::new();
    let mut controller = PanelController::start(
        desktop.window_manager(),
        desktop.shell(),
        ScriptedView::new(),
        &Config::default(),
        &events,
    );
    controller.handle(PanelEvent::Click(Row::Window(h(1))));
    assert_eq!(controller.tracked_process(), Some(ProcessId(100)));

    desktop.close(h(2));
    let flow = controller.handle(PanelEvent::Click(Row::Window(h(2))));

    assert_eq!(flow, ControlFlow::Continue);
    assert_eq!(controller.tracked_process(), None);
}
