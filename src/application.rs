use ratatui::Frame;

use crate::{command::Command, subscription::Subscription};

/// A terminal application following the Elm Architecture.
///
/// State lives in `Self`. It changes only inside [`update`](Self::update), in
/// response to messages coming from commands or subscriptions, and is drawn by
/// [`view`](Self::view).
///
/// # Example
///
/// ```
/// use ratatui::Frame;
/// use roster::{application::Application, command::Command, subscription::Subscription};
///
/// enum Message {
///     NextPage,
/// }
///
/// struct Pager {
///     page: u32,
/// }
///
/// impl Application for Pager {
///     type Message = Message;
///     type Flags = u32;
///
///     fn new(first: u32) -> (Self, Command<Message>) {
///         (Pager { page: first }, Command::none())
///     }
///
///     fn update(&mut self, msg: Message) -> Command<Message> {
///         match msg {
///             Message::NextPage => self.page += 1,
///         }
///         Command::none()
///     }
///
///     fn view(&self, _frame: &mut Frame<'_>) {}
///
///     fn subscriptions(&self) -> Vec<Subscription<Message>> {
///         vec![]
///     }
/// }
/// ```
pub trait Application: Sized {
    /// Everything that can happen to the application.
    type Message: Send + 'static;

    /// Data passed at startup. Use `()` if nothing is needed.
    type Flags: Clone + Send;

    /// Builds the initial state and an optional startup command.
    fn new(flags: Self::Flags) -> (Self, Command<Self::Message>);

    /// Applies a message to the state and returns the next side effect.
    fn update(&mut self, msg: Self::Message) -> Command<Self::Message>;

    /// Draws the current state. Must not change it.
    fn view(&self, frame: &mut Frame<'_>);

    /// Event sources the application wants while in its current state.
    ///
    /// Called after every update; the runtime starts what is new and stops what is
    /// gone, so returning different subscriptions for different states (for
    /// example, a query for whichever page is on screen) is the normal pattern.
    fn subscriptions(&self) -> Vec<Subscription<Self::Message>>;
}
