use std::time::Duration;

use color_eyre::eyre::Result;
use futures::stream::StreamExt;
use ratatui::prelude::Backend;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};

use crate::application::Application;
use crate::command::{Action, Command};
use crate::subscription::SubscriptionManager;

/// Drives an [`Application`]: renders frames, feeds messages into `update`,
/// executes commands and keeps subscriptions in sync with the state.
pub struct Runtime<A: Application> {
    app: A,
    init: Option<Command<A::Message>>,
    actions_tx: mpsc::UnboundedSender<Action<A::Message>>,
    actions_rx: mpsc::UnboundedReceiver<Action<A::Message>>,
    messages_rx: mpsc::UnboundedReceiver<A::Message>,
    subscriptions: SubscriptionManager<A::Message>,
}

impl<A: Application> Runtime<A> {
    /// Initializes the application with `flags`. The startup command runs once
    /// [`run`](Self::run) is called.
    pub fn new(flags: A::Flags) -> Self {
        let (app, init) = A::new(flags);
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();

        Self {
            app,
            init: Some(init),
            actions_tx,
            actions_rx,
            messages_rx,
            subscriptions: SubscriptionManager::new(messages_tx),
        }
    }

    /// The application state. Mainly useful in tests.
    pub const fn app(&self) -> &A {
        &self.app
    }

    fn spawn_command(&self, cmd: Command<A::Message>) {
        let Some(mut stream) = cmd.stream else {
            return;
        };
        let tx = self.actions_tx.clone();
        tokio::spawn(async move {
            while let Some(action) = stream.next().await {
                if tx.send(action).is_err() {
                    break;
                }
            }
        });
    }

    fn apply(&mut self, msg: A::Message) {
        let cmd = self.app.update(msg);
        self.spawn_command(cmd);
        self.subscriptions.update(self.app.subscriptions());
    }

    /// Applies everything already queued without waiting. Returns `true` on quit.
    fn drain(&mut self) -> bool {
        loop {
            if let Ok(action) = self.actions_rx.try_recv() {
                match action {
                    Action::Message(msg) => self.apply(msg),
                    Action::Quit => return true,
                }
                continue;
            }
            if let Ok(msg) = self.messages_rx.try_recv() {
                self.apply(msg);
                continue;
            }
            return false;
        }
    }

    /// Runs the event loop until the application emits [`Action::Quit`].
    ///
    /// The view is redrawn at most `frame_rate` times per second. Quit requests are
    /// handled as soon as they arrive rather than at the next frame boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if drawing to the terminal fails.
    pub async fn run<B: Backend>(
        mut self,
        terminal: &mut ratatui::Terminal<B>,
        frame_rate: u32,
    ) -> Result<()> {
        let frame_duration = Duration::from_millis(1000 / u64::from(frame_rate.max(1)));
        let mut ticker = interval(frame_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if let Some(init) = self.init.take() {
            self.spawn_command(init);
        }
        self.subscriptions.update(self.app.subscriptions());

        loop {
            if self.drain() {
                break;
            }

            terminal.draw(|frame| self.app.view(frame))?;

            tokio::select! {
                _ = ticker.tick() => {}
                Some(action) = self.actions_rx.recv() => match action {
                    Action::Message(msg) => self.apply(msg),
                    Action::Quit => break,
                },
                Some(msg) = self.messages_rx.recv() => self.apply(msg),
            }
        }

        self.subscriptions.shutdown();
        Ok(())
    }
}
