//! Live view synchronization.
//!
//! Mutations publish small "table X changed" notices to Redis; a listener thread
//! forwards them into an in-process broadcast channel, and every open live view turns
//! them into refresh signals for its client. Notices carry no row data: clients always
//! re-read the full listing, once right away, once more after a settle delay (multi-row
//! writes may still be landing), and on a periodic poll that does not depend on the
//! feed at all.

use std::convert::Infallible;
use std::future::pending;
use std::pin::Pin;
use std::thread;
use std::time::Duration;

use actix_web::web::Bytes;
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

use crate::types::{Role, FEED_KEY};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedTable {
    Products,
    Orders,
    OrderItems,
    OrderStationStatus,
}

impl FeedTable {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedTable::Products => "products",
            FeedTable::Orders => "orders",
            FeedTable::OrderItems => "order_items",
            FeedTable::OrderStationStatus => "order_station_status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub table: FeedTable,
    pub event: FeedEvent,
}

impl ChangeNotice {
    pub fn new(table: FeedTable, event: FeedEvent) -> Self {
        ChangeNotice { table, event }
    }

    pub fn order_created() -> [ChangeNotice; 3] {
        [
            ChangeNotice::new(FeedTable::Orders, FeedEvent::Insert),
            ChangeNotice::new(FeedTable::OrderStationStatus, FeedEvent::Insert),
            ChangeNotice::new(FeedTable::OrderItems, FeedEvent::Insert),
        ]
    }

    pub fn station_done() -> [ChangeNotice; 2] {
        [
            ChangeNotice::new(FeedTable::OrderStationStatus, FeedEvent::Update),
            ChangeNotice::new(FeedTable::Orders, FeedEvent::Update),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventFilter {
    #[serde(rename = "insert")]
    Insert,
    #[serde(rename = "update")]
    Update,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "*")]
    Any,
}

/// Interest in one table, optionally narrowed to one kind of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub table: FeedTable,
    pub event: EventFilter,
}

impl Subscription {
    pub fn any(table: FeedTable) -> Self {
        Subscription { table, event: EventFilter::Any }
    }

    pub fn matches(&self, notice: &ChangeNotice) -> bool {
        if self.table != notice.table {
            return false;
        }

        matches!(
            (self.event, notice.event),
            (EventFilter::Any, _)
                | (EventFilter::Insert, FeedEvent::Insert)
                | (EventFilter::Update, FeedEvent::Update)
                | (EventFilter::Delete, FeedEvent::Delete)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Waiter,
    Bar,
    Shisha,
    Admin,
}

impl View {
    pub fn as_str(self) -> &'static str {
        match self {
            View::Waiter => "waiter",
            View::Bar => "bar",
            View::Shisha => "shisha",
            View::Admin => "admin",
        }
    }

    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            View::Waiter => &[Role::Waiter, Role::Admin],
            View::Bar => &[Role::Bar, Role::Admin],
            View::Shisha => &[Role::Shisha, Role::Admin],
            View::Admin => &[Role::Admin],
        }
    }

    pub fn subscriptions(self) -> Vec<Subscription> {
        let mut subs = vec![
            Subscription::any(FeedTable::Orders),
            Subscription::any(FeedTable::OrderItems),
            Subscription::any(FeedTable::OrderStationStatus),
        ];

        // waiters pick from the catalog, the admin manages it
        if matches!(self, View::Waiter | View::Admin) {
            subs.push(Subscription::any(FeedTable::Products));
        }

        subs
    }

    pub fn wants(self, notice: &ChangeNotice) -> bool {
        self.subscriptions().iter().any(|sub| sub.matches(notice))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshCause {
    Connected,
    Notified,
    Settled,
    Poll,
}

impl RefreshCause {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshCause::Connected => "connected",
            RefreshCause::Notified => "notified",
            RefreshCause::Settled => "settled",
            RefreshCause::Poll => "poll",
        }
    }
}

/// Turns feed notices into refresh signals for one view.
pub struct Reconciler {
    view: View,
    feed: Option<broadcast::Receiver<ChangeNotice>>,
    settle_delay: Duration,
    settle: Option<Pin<Box<Sleep>>>,
    poll: Interval,
}

async fn next_notice(
    feed: &mut Option<broadcast::Receiver<ChangeNotice>>,
) -> Result<ChangeNotice, RecvError> {
    match feed {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

async fn settled(settle: &mut Option<Pin<Box<Sleep>>>) {
    match settle {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

impl Reconciler {
    pub fn new(
        view: View,
        feed: broadcast::Receiver<ChangeNotice>,
        settle_delay: Duration,
        poll_interval: Duration,
    ) -> Self {
        let mut poll = interval_at(Instant::now() + poll_interval, poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Reconciler {
            view,
            feed: Some(feed),
            settle_delay,
            settle: None,
            poll,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    // Each new notice pushes the settle re-read further out.
    fn arm_settle(&mut self) {
        self.settle = Some(Box::pin(sleep(self.settle_delay)));
    }

    /// Waits for the next reason to re-read the view.
    pub async fn next(&mut self) -> RefreshCause {
        loop {
            tokio::select! {
                received = next_notice(&mut self.feed) => match received {
                    Ok(notice) if self.view.wants(&notice) => {
                        self.arm_settle();
                        return RefreshCause::Notified;
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(view = self.view.as_str(), skipped, "live view lagged behind the feed");
                        self.arm_settle();
                        return RefreshCause::Notified;
                    }
                    Err(RecvError::Closed) => {
                        warn!(view = self.view.as_str(), "change feed closed, polling only");
                        self.feed = None;
                    }
                },
                () = settled(&mut self.settle) => {
                    self.settle = None;
                    return RefreshCause::Settled;
                }
                _ = self.poll.tick() => return RefreshCause::Poll,
            }
        }
    }
}

pub fn sse_frame(view: View, cause: RefreshCause) -> String {
    format!(
        "event: refresh\ndata: {{\"view\":\"{}\",\"cause\":\"{}\"}}\n\n",
        view.as_str(),
        cause.as_str()
    )
}

/// Server-sent event stream: one `refresh` frame on connect, then one per signal.
pub fn event_stream(reconciler: Reconciler) -> impl Stream<Item = Result<Bytes, Infallible>> {
    let view = reconciler.view();
    let greeting = stream::once(async move {
        Ok::<_, Infallible>(Bytes::from(sse_frame(view, RefreshCause::Connected)))
    });

    let updates = stream::unfold(reconciler, |mut reconciler| async move {
        let cause = reconciler.next().await;
        let frame = Bytes::from(sse_frame(reconciler.view(), cause));
        Some((Ok(frame), reconciler))
    });

    greeting.chain(updates)
}

fn pump_feed(
    client: &redis::Client,
    sender: &broadcast::Sender<ChangeNotice>,
) -> redis::RedisResult<()> {
    let mut conn = client.get_connection()?;
    let mut pubsub = conn.as_pubsub();
    pubsub.psubscribe(format!("{FEED_KEY}:*"))?;
    info!("subscribed to change feed");

    loop {
        let msg = pubsub.get_message()?;
        let payload: String = msg.get_payload()?;

        match serde_json::from_str::<ChangeNotice>(&payload) {
            // no open live views is not an error
            Ok(notice) => {
                let _ = sender.send(notice);
            }
            Err(err) => warn!(error = %err, channel = msg.get_channel_name(), "ignoring malformed change notice"),
        }
    }
}

/// Forwards Redis feed notices into `sender`, reconnecting forever.
pub fn spawn_feed_listener(
    client: redis::Client,
    sender: broadcast::Sender<ChangeNotice>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("change-feed".into())
        .spawn(move || loop {
            if let Err(err) = pump_feed(&client, &sender) {
                warn!(error = %err, "change feed connection lost");
            }
            thread::sleep(RECONNECT_DELAY);
        })
}
