//! Routing of unsolicited server pushes.
//!
//! Each push kind keeps its own list of observers; every observer registered
//! for a kind sees every push of that kind, in wire order. Observers run on the
//! dispatch task, so they must not block. Slow consumers should use
//! [`Notifications::subscribe`] instead. A panicking observer is logged and
//! skipped; the connection keeps running.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::broadcast;
use tracing::error;

use crate::error::{Error, RealtimeError, Result};
use crate::proto::{self, envelope::Message};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

fn call_guarded<T>(f: &Observer<T>, value: &T, kind: &'static str) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(value))) {
        error!(kind, panic = panic_message(&*payload), "observer panicked");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic"
    }
}

struct Observers<T> {
    kind: &'static str,
    list: RwLock<Vec<Observer<T>>>,
}

impl<T> Observers<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            list: RwLock::new(Vec::new()),
        }
    }

    fn add(&self, f: Observer<T>) {
        self.list
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(f);
    }

    fn notify(&self, value: &T) {
        // Snapshot so an observer may register further observers.
        let list: Vec<Observer<T>> = self
            .list
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for f in &list {
            call_guarded(f, value, self.kind);
        }
    }

    fn len(&self) -> usize {
        self.list
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Connect observers. Registering after the loop has started runs the
/// observer immediately, so it fires exactly once either way.
#[derive(Default)]
struct ConnectLatch {
    inner: Mutex<LatchState>,
}

#[derive(Default)]
struct LatchState {
    fired: bool,
    list: Vec<Observer<()>>,
}

impl ConnectLatch {
    fn add(&self, f: Observer<()>) {
        let fire_now = {
            let mut state = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            state.list.push(f.clone());
            state.fired
        };
        if fire_now {
            call_guarded(&f, &(), "connect");
        }
    }

    fn fire(&self) {
        let list = {
            let mut state = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            state.fired = true;
            state.list.clone()
        };
        for f in &list {
            call_guarded(f, &(), "connect");
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).list.len()
    }
}

/// Everything the connection reports outside of call replies.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected,
    Disconnected,
    Error(proto::Error),
    ChannelMessage(proto::ChannelMessage),
    ChannelPresence(proto::ChannelPresenceEvent),
    MatchData(proto::MatchData),
    MatchPresence(proto::MatchPresenceEvent),
    MatchmakerMatched(proto::MatchmakerMatched),
    Notifications(proto::Notifications),
    StatusPresence(proto::StatusPresenceEvent),
    StreamData(proto::StreamData),
    StreamPresence(proto::StreamPresenceEvent),
}

macro_rules! observer_methods {
    ($( $(#[$doc:meta])* $method:ident => $field:ident : $ty:ty ),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $method(&self, f: impl Fn(&$ty) + Send + Sync + 'static) {
                self.$field.add(Arc::new(f));
            }
        )*
    };
}

/// Observer registry for every push kind plus lifecycle transitions.
pub struct Notifications {
    connect: ConnectLatch,
    disconnect: Observers<()>,
    error: Observers<proto::Error>,
    channel_message: Observers<proto::ChannelMessage>,
    channel_presence: Observers<proto::ChannelPresenceEvent>,
    match_data: Observers<proto::MatchData>,
    match_presence: Observers<proto::MatchPresenceEvent>,
    matchmaker_matched: Observers<proto::MatchmakerMatched>,
    notifications: Observers<proto::Notifications>,
    status_presence: Observers<proto::StatusPresenceEvent>,
    stream_data: Observers<proto::StreamData>,
    stream_presence: Observers<proto::StreamPresenceEvent>,
    events: broadcast::Sender<Event>,
}

impl Notifications {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            connect: ConnectLatch::default(),
            disconnect: Observers::new("disconnect"),
            error: Observers::new("error"),
            channel_message: Observers::new("channel_message"),
            channel_presence: Observers::new("channel_presence_event"),
            match_data: Observers::new("match_data"),
            match_presence: Observers::new("match_presence_event"),
            matchmaker_matched: Observers::new("matchmaker_matched"),
            notifications: Observers::new("notifications"),
            status_presence: Observers::new("status_presence_event"),
            stream_data: Observers::new("stream_data"),
            stream_presence: Observers::new("stream_presence_event"),
            events,
        }
    }

    /// Receive every push and lifecycle transition as an [`Event`].
    ///
    /// Events sent before the receiver existed are not replayed; a receiver
    /// created after the loop started will not see [`Event::Connected`].
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Fires once the dispatch loop is running, or right away if it already is.
    pub fn on_connect(&self, f: impl Fn(&()) + Send + Sync + 'static) {
        self.connect.add(Arc::new(f));
    }

    observer_methods! {
        /// Fires once after the connection has fully closed.
        on_disconnect => disconnect: (),
        /// Error payloads that carried no correlation id.
        on_error => error: proto::Error,
        on_channel_message => channel_message: proto::ChannelMessage,
        on_channel_presence_event => channel_presence: proto::ChannelPresenceEvent,
        on_match_data => match_data: proto::MatchData,
        on_match_presence_event => match_presence: proto::MatchPresenceEvent,
        on_matchmaker_matched => matchmaker_matched: proto::MatchmakerMatched,
        on_notifications => notifications: proto::Notifications,
        on_status_presence_event => status_presence: proto::StatusPresenceEvent,
        on_stream_data => stream_data: proto::StreamData,
        on_stream_presence_event => stream_presence: proto::StreamPresenceEvent,
    }

    /// Total observers registered across all kinds.
    pub fn observer_count(&self) -> usize {
        self.connect.len()
            + self.disconnect.len()
            + self.error.len()
            + self.channel_message.len()
            + self.channel_presence.len()
            + self.match_data.len()
            + self.match_presence.len()
            + self.matchmaker_matched.len()
            + self.notifications.len()
            + self.status_presence.len()
            + self.stream_data.len()
            + self.stream_presence.len()
    }

    pub(crate) fn connected(&self) {
        self.connect.fire();
        self.publish(Event::Connected);
    }

    pub(crate) fn disconnected(&self) {
        self.disconnect.notify(&());
        self.publish(Event::Disconnected);
    }

    /// Route one untagged payload.
    ///
    /// An error payload is delivered to the error observers and then returned
    /// as `Error::Realtime`. Kinds that are only valid as call replies return
    /// `Error::Protocol`.
    pub(crate) fn dispatch(&self, message: Message) -> Result<()> {
        match message {
            Message::Error(e) => {
                self.error.notify(&e);
                self.publish(Event::Error(e.clone()));
                return Err(RealtimeError::from(e).into());
            }
            Message::ChannelMessage(m) => {
                self.channel_message.notify(&m);
                self.publish(Event::ChannelMessage(m));
            }
            Message::ChannelPresenceEvent(m) => {
                self.channel_presence.notify(&m);
                self.publish(Event::ChannelPresence(m));
            }
            Message::MatchData(m) => {
                self.match_data.notify(&m);
                self.publish(Event::MatchData(m));
            }
            Message::MatchPresenceEvent(m) => {
                self.match_presence.notify(&m);
                self.publish(Event::MatchPresence(m));
            }
            Message::MatchmakerMatched(m) => {
                self.matchmaker_matched.notify(&m);
                self.publish(Event::MatchmakerMatched(m));
            }
            Message::Notifications(m) => {
                self.notifications.notify(&m);
                self.publish(Event::Notifications(m));
            }
            Message::StatusPresenceEvent(m) => {
                self.status_presence.notify(&m);
                self.publish(Event::StatusPresence(m));
            }
            Message::StreamData(m) => {
                self.stream_data.notify(&m);
                self.publish(Event::StreamData(m));
            }
            Message::StreamPresenceEvent(m) => {
                self.stream_presence.notify(&m);
                self.publish(Event::StreamPresence(m));
            }
            other => {
                return Err(Error::Protocol(format!(
                    "{} payload without a correlation id",
                    other.kind()
                )));
            }
        }
        Ok(())
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn match_data(op_code: i64) -> Message {
        Message::MatchData(proto::MatchData {
            match_id: "m1".into(),
            op_code,
            data: vec![1, 2, 3],
            ..Default::default()
        })
    }

    #[test]
    fn every_observer_for_a_kind_is_called() {
        let n = Notifications::default();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = hits.clone();
            n.on_match_data(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        n.dispatch(match_data(1)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delivery_follows_wire_order() {
        let n = Notifications::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        n.on_match_data(move |m| sink.lock().unwrap().push(m.op_code));
        for op in [5, 1, 9] {
            n.dispatch(match_data(op)).unwrap();
        }
        assert_eq!(*seen.lock().unwrap(), vec![5, 1, 9]);
    }

    #[test]
    fn push_reaches_only_its_own_kind() {
        let n = Notifications::default();
        let chat = Arc::new(AtomicUsize::new(0));
        let c = chat.clone();
        n.on_channel_message(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        n.dispatch(match_data(1)).unwrap();
        assert_eq!(chat.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn error_push_notifies_then_reports() {
        let n = Notifications::default();
        let codes = Arc::new(Mutex::new(Vec::new()));
        let sink = codes.clone();
        n.on_error(move |e| sink.lock().unwrap().push(e.code));

        let err = n
            .dispatch(Message::Error(proto::Error {
                code: 6,
                message: "full".into(),
                ..Default::default()
            }))
            .unwrap_err();
        assert!(err.is_realtime_code(6));
        assert_eq!(*codes.lock().unwrap(), vec![6]);
    }

    #[test]
    fn reply_only_kind_is_a_protocol_error() {
        let n = Notifications::default();
        let err = n
            .dispatch(Message::Channel(proto::Channel::default()))
            .unwrap_err();
        match err {
            Error::Protocol(msg) => assert!(msg.contains("channel"), "{msg}"),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unobserved_push_is_accepted() {
        let n = Notifications::default();
        n.dispatch(Message::Notifications(proto::Notifications::default()))
            .unwrap();
    }

    #[tokio::test]
    async fn subscribers_see_pushes_and_lifecycle() {
        let n = Notifications::default();
        let mut rx = n.subscribe();
        n.connected();
        n.dispatch(match_data(7)).unwrap();
        n.disconnected();

        assert_eq!(rx.recv().await.unwrap(), Event::Connected);
        match rx.recv().await.unwrap() {
            Event::MatchData(m) => assert_eq!(m.op_code, 7),
            other => panic!("wrong variant: {other:?}"),
        }
        assert_eq!(rx.recv().await.unwrap(), Event::Disconnected);
    }

    #[test]
    fn panicking_observer_does_not_stop_the_rest() {
        let n = Notifications::default();
        let hits = Arc::new(AtomicUsize::new(0));
        n.on_match_data(|_| panic!("observer bug"));
        let h = hits.clone();
        n.on_match_data(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        n.dispatch(match_data(1)).unwrap();
        n.dispatch(match_data(2)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn late_connect_observer_fires_immediately_once() {
        let n = Notifications::default();
        let early = Arc::new(AtomicUsize::new(0));
        let e = early.clone();
        n.on_connect(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });
        n.connected();

        let late = Arc::new(AtomicUsize::new(0));
        let l = late.clone();
        n.on_connect(move |_| {
            l.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(early.load(Ordering::SeqCst), 1);
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_may_register_another_observer() {
        let n = Arc::new(Notifications::default());
        let inner = n.clone();
        n.on_connect(move |_| inner.on_disconnect(|_| {}));
        n.connected();
        assert_eq!(n.observer_count(), 2);
    }
}
