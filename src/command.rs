use futures::{
    FutureExt, Stream, StreamExt,
    stream::{self, BoxStream, select_all},
};

/// An action emitted by a running command.
pub enum Action<Msg> {
    /// Deliver a message to `Application::update`.
    Message(Msg),

    /// Stop the runtime and hand the terminal back.
    Quit,
}

/// A side effect to run after an update.
///
/// Commands are the only way the dashboard touches the outside world from
/// `update`: fetching a page, submitting the create form, invalidating cached
/// pages, quitting. The runtime spawns each command as a detached task, so a
/// command keeps running even if the view that issued it is no longer shown.
///
/// # Examples
///
/// ```
/// use roster::command::Command;
///
/// enum Message {
///     GotResult(i32),
/// }
///
/// let cmd = Command::perform(async { 42 }, Message::GotResult);
/// ```
pub struct Command<Msg: Send + 'static> {
    pub(crate) stream: Option<BoxStream<'static, Action<Msg>>>,
}

impl<Msg: Send + 'static> Command<Msg> {
    /// A command that does nothing.
    #[must_use]
    pub fn none() -> Self {
        Self { stream: None }
    }

    /// Runs a future and converts its output into a message.
    pub fn perform<A>(
        future: impl Future<Output = A> + Send + 'static,
        f: impl FnOnce(A) -> Msg + Send + 'static,
    ) -> Self {
        Self::future(future.map(f))
    }

    /// Runs a future that produces a message directly.
    pub fn future(future: impl Future<Output = Msg> + Send + 'static) -> Self {
        Self {
            stream: Some(future.into_stream().map(Action::Message).boxed()),
        }
    }

    /// Runs a future purely for its side effect; no message is produced.
    pub fn effect_future(future: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            stream: Some(
                future
                    .into_stream()
                    .filter_map(|()| async { None })
                    .boxed(),
            ),
        }
    }

    /// Performs a single action immediately.
    ///
    /// ```
    /// use roster::command::{Action, Command};
    ///
    /// let quit: Command<i32> = Command::effect(Action::Quit);
    /// let now = Command::effect(Action::Message(42));
    /// ```
    pub fn effect(action: Action<Msg>) -> Self {
        Self {
            stream: Some(stream::once(async move { action }).boxed()),
        }
    }

    /// Shorthand for `Command::effect(Action::Message(msg))`.
    pub fn message(msg: Msg) -> Self {
        Self::effect(Action::Message(msg))
    }

    /// Runs several commands concurrently. Arrival order is not guaranteed and
    /// `Command::none()` entries are dropped.
    pub fn batch(commands: impl IntoIterator<Item = Self>) -> Self {
        let streams: Vec<_> = commands.into_iter().filter_map(|cmd| cmd.stream).collect();

        if streams.is_empty() {
            Self::none()
        } else {
            Self {
                stream: Some(select_all(streams).boxed()),
            }
        }
    }

    /// Sends every item of `stream` as a message.
    pub fn stream(stream: impl Stream<Item = Msg> + Send + 'static) -> Self {
        Self {
            stream: Some(stream.map(Action::Message).boxed()),
        }
    }

    /// Converts the messages this command produces. `Quit` passes through unchanged.
    pub fn map<U: Send + 'static>(self, f: impl Fn(Msg) -> U + Send + 'static) -> Command<U> {
        Command {
            stream: self.stream.map(|stream| {
                stream
                    .map(move |action| match action {
                        Action::Message(msg) => Action::Message(f(msg)),
                        Action::Quit => Action::Quit,
                    })
                    .boxed()
            }),
        }
    }

    /// Returns `true` if running this command would do nothing.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.stream.is_none()
    }
}
