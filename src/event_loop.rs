use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use crate::platform::{Row, ShellEvent, WindowHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Quit,
}

/// Everything the panel reacts to, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEvent {
    Shell(ShellEvent),
    Click(Row),
    /// A window row was dragged onto another window row.
    Drop {
        source: WindowHandle,
        target: WindowHandle,
    },
    Hover(Option<Row>),
    /// Font or DPI changed; labels have to be measured again.
    MetricsChanged,
    Quit,
}

/// Single-threaded FIFO shared between OS callbacks and the event loop.
///
/// Callbacks only ever push. State is mutated exclusively by the loop's
/// handler, so a callback that fires while the handler is still redrawing
/// cannot observe or corrupt half-applied state.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Rc<RefCell<VecDeque<PanelEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: PanelEvent) {
        self.inner.borrow_mut().push_back(event);
    }

    pub fn pop(&self) -> Option<PanelEvent> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

pub trait EventSource {
    /// Wait up to `timeout` for an event; true when one is ready.
    fn poll(&mut self, timeout: Duration) -> io::Result<bool>;
    fn read(&mut self) -> io::Result<PanelEvent>;
}

impl<T: EventSource + ?Sized> EventSource for &mut T {
    fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
        (**self).poll(timeout)
    }

    fn read(&mut self) -> io::Result<PanelEvent> {
        (**self).read()
    }
}

/// Drives the event thread.
///
/// The handler is called with `None` once per wake-up (at start-up and
/// whenever the poll interval elapses without input), which is where the
/// periodic refresh hangs off, and with `Some(event)` for every queued event.
pub struct EventLoop<S> {
    source: S,
    poll_interval: Duration,
}

impl<S: EventSource> EventLoop<S> {
    pub fn new(source: S, poll_interval: Duration) -> Self {
        Self {
            source,
            poll_interval,
        }
    }

    pub fn source(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn run<F>(&mut self, mut handler: F) -> io::Result<()>
    where
        F: FnMut(&mut S, Option<PanelEvent>) -> io::Result<ControlFlow>,
    {
        loop {
            if let ControlFlow::Quit = handler(&mut self.source, None)? {
                break;
            }

            if self.source.poll(self.poll_interval)? {
                // Drain bursts (a window opening often produces several
                // shell notifications back to back) before the next idle call.
                loop {
                    let event = self.source.read()?;
                    if let ControlFlow::Quit = handler(&mut self.source, Some(event))? {
                        return Ok(());
                    }
                    if !self.source.poll(Duration::from_millis(0))? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}
