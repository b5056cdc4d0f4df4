#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use ratatui::{Frame, Terminal, backend::TestBackend};
use roster::prelude::*;
use roster::query::Query;
use roster::subscription::time::Timer;
use tokio::time::{Duration, Instant, sleep, timeout};

// Quit from the startup command must not wait for a frame.
struct QuitAtStart;

impl Application for QuitAtStart {
    type Message = ();
    type Flags = ();

    fn new(_: ()) -> (Self, Command<()>) {
        (Self, Command::effect(Action::Quit))
    }

    fn update(&mut self, _: ()) -> Command<()> {
        Command::none()
    }

    fn view(&self, _frame: &mut Frame<'_>) {}

    fn subscriptions(&self) -> Vec<Subscription<()>> {
        vec![]
    }
}

#[tokio::test]
async fn test_quit_is_not_delayed_by_low_frame_rate() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

    let start = Instant::now();
    let result = timeout(
        Duration::from_millis(500),
        Runtime::<QuitAtStart>::new(()).run(&mut terminal, 2),
    )
    .await;

    assert!(result.unwrap().is_ok());
    assert!(start.elapsed() < Duration::from_millis(400));
}

// Quit arriving while the loop waits for the next frame.
struct QuitLater;

impl Application for QuitLater {
    type Message = ();
    type Flags = ();

    fn new(_: ()) -> (Self, Command<()>) {
        (Self, Command::future(sleep(Duration::from_millis(50))))
    }

    fn update(&mut self, _: ()) -> Command<()> {
        Command::effect(Action::Quit)
    }

    fn view(&self, _frame: &mut Frame<'_>) {}

    fn subscriptions(&self) -> Vec<Subscription<()>> {
        vec![]
    }
}

#[tokio::test]
async fn test_quit_during_frame_wait() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

    let start = Instant::now();
    let result = timeout(
        Duration::from_millis(500),
        Runtime::<QuitLater>::new(()).run(&mut terminal, 4),
    )
    .await;

    assert!(result.unwrap().is_ok());
    assert!(start.elapsed() < Duration::from_millis(240));
}

// A timer that is only wanted while `ticking` holds.
struct Toggle {
    ticks: u32,
    ticking: bool,
}

#[derive(Debug)]
enum ToggleMsg {
    Tick,
    Stop,
    Done,
}

impl Application for Toggle {
    type Message = ToggleMsg;
    type Flags = ();

    fn new(_: ()) -> (Self, Command<ToggleMsg>) {
        (
            Self {
                ticks: 0,
                ticking: true,
            },
            Command::none(),
        )
    }

    fn update(&mut self, msg: ToggleMsg) -> Command<ToggleMsg> {
        match msg {
            ToggleMsg::Tick if !self.ticking => Command::none(),
            ToggleMsg::Tick => {
                self.ticks += 1;
                if self.ticks == 3 {
                    Command::message(ToggleMsg::Stop)
                } else {
                    Command::none()
                }
            }
            ToggleMsg::Stop => {
                self.ticking = false;
                Command::future(async {
                    sleep(Duration::from_millis(60)).await;
                    ToggleMsg::Done
                })
            }
            ToggleMsg::Done => Command::effect(Action::Quit),
        }
    }

    fn view(&self, _frame: &mut Frame<'_>) {}

    fn subscriptions(&self) -> Vec<Subscription<ToggleMsg>> {
        if self.ticking {
            vec![Subscription::new(Timer::new(Duration::from_millis(10))).map(|()| ToggleMsg::Tick)]
        } else {
            vec![]
        }
    }
}

#[tokio::test]
async fn test_subscription_stops_when_no_longer_declared() {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let result = timeout(
        Duration::from_secs(2),
        Runtime::<Toggle>::new(()).run(&mut terminal, 60),
    )
    .await;
    assert!(result.unwrap().is_ok());
}

// Walks pages 1..=3 through a query subscription keyed by the current page.
struct Walker {
    page: u32,
    client: Arc<QueryClient>,
    loads: Arc<AtomicUsize>,
}

#[derive(Debug)]
enum WalkMsg {
    Loaded(QueryResult<u32>),
}

impl Application for Walker {
    type Message = WalkMsg;
    type Flags = Arc<AtomicUsize>;

    fn new(loads: Arc<AtomicUsize>) -> (Self, Command<WalkMsg>) {
        (
            Self {
                page: 1,
                client: Arc::new(QueryClient::new()),
                loads,
            },
            Command::none(),
        )
    }

    fn update(&mut self, msg: WalkMsg) -> Command<WalkMsg> {
        let WalkMsg::Loaded(result) = msg;
        match result.data() {
            Some(&page) if page == self.page && page == 3 => Command::effect(Action::Quit),
            Some(&page) if page == self.page => {
                self.page += 1;
                Command::none()
            }
            _ => Command::none(),
        }
    }

    fn view(&self, _frame: &mut Frame<'_>) {}

    fn subscriptions(&self) -> Vec<Subscription<WalkMsg>> {
        let page = self.page;
        let loads = Arc::clone(&self.loads);
        let query = Query::new(
            QueryKey::new("pages").with(page),
            move || {
                loads.fetch_add(1, Ordering::SeqCst);
                async move { Ok(page) }.boxed()
            },
            Arc::clone(&self.client),
        );
        vec![Subscription::new(query).map(WalkMsg::Loaded)]
    }
}

#[tokio::test]
async fn test_query_subscription_follows_state() {
    let loads = Arc::new(AtomicUsize::new(0));
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

    let result = timeout(
        Duration::from_secs(2),
        Runtime::<Walker>::new(Arc::clone(&loads)).run(&mut terminal, 60),
    )
    .await;

    assert!(result.unwrap().is_ok());
    assert_eq!(loads.load(Ordering::SeqCst), 3);
}
