//! The admin dashboard: sidebar navigation, the paginated user list and the
//! create-user form.

mod view;

use std::num::NonZeroU32;
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;

use crate::application::Application;
use crate::command::{Action, Command};
use crate::query::{MutationState, QueryError, QueryResult, QueryState};
use crate::subscription::Subscription;
use crate::subscription::terminal::TerminalEvents;
use crate::subscription::time::Timer;
use crate::users::{
    Field, FormState, Page, User, UserListResult, UsersService, users_key, users_prefix,
};

const GC_PERIOD: Duration = Duration::from_secs(60);

/// Sidebar entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Dashboard,
    Users,
    CreateUser,
}

impl Section {
    pub const ALL: [Self; 3] = [Self::Dashboard, Self::Users, Self::CreateUser];

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Users => "Users",
            Self::CreateUser => "Create user",
        }
    }
}

/// Startup data for [`Dashboard`].
#[derive(Debug, Clone)]
pub struct DashboardFlags {
    pub users: UsersService,
    pub page_size: NonZeroU32,
    pub profile_name: String,
    pub api_url: String,
}

#[derive(Debug)]
pub enum Message {
    Terminal(Event),
    TerminalError(String),
    Navigate(Section),
    UsersLoaded(QueryResult<UserListResult>),
    NextPage,
    PrevPage,
    Refresh,
    Focus(Field),
    Input(char),
    Backspace,
    Submit,
    Cancel,
    UserCreated(Result<User, QueryError>),
    SweepCache,
    Quit,
}

/// Dashboard state.
pub struct Dashboard {
    users: UsersService,
    page_size: NonZeroU32,
    profile_name: String,
    api_url: String,
    section: Section,
    page: Page,
    list: QueryState<UserListResult>,
    total_users: Option<u64>,
    form: FormState,
    focus: Field,
    creation: MutationState<User>,
    status: String,
}

impl Dashboard {
    #[must_use]
    pub const fn section(&self) -> Section {
        self.section
    }

    #[must_use]
    pub const fn page(&self) -> Page {
        self.page
    }

    #[must_use]
    pub const fn list(&self) -> &QueryState<UserListResult> {
        &self.list
    }

    #[must_use]
    pub const fn form(&self) -> &FormState {
        &self.form
    }

    #[must_use]
    pub const fn creation(&self) -> &MutationState<User> {
        &self.creation
    }

    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Pages in the collection, once the current page has loaded.
    #[must_use]
    pub fn total_pages(&self) -> Option<u64> {
        match &self.list {
            QueryState::Success { data, .. } => Some(data.total_pages(self.page_size)),
            _ => None,
        }
    }

    fn on_key(&self, key: KeyEvent) -> Command<Message> {
        if key.kind != KeyEventKind::Press {
            return Command::none();
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Command::message(Message::Quit);
        }

        if self.section == Section::CreateUser {
            return match key.code {
                KeyCode::Esc => Command::message(Message::Cancel),
                KeyCode::Enter => Command::message(Message::Submit),
                KeyCode::Tab | KeyCode::Down => {
                    Command::message(Message::Focus(self.focus.next()))
                }
                KeyCode::BackTab | KeyCode::Up => {
                    Command::message(Message::Focus(self.focus.prev()))
                }
                KeyCode::Backspace => Command::message(Message::Backspace),
                KeyCode::Char(c) => Command::message(Message::Input(c)),
                _ => Command::none(),
            };
        }

        match key.code {
            KeyCode::Char('q') => Command::message(Message::Quit),
            KeyCode::Char('1') => Command::message(Message::Navigate(Section::Dashboard)),
            KeyCode::Char('2') => Command::message(Message::Navigate(Section::Users)),
            KeyCode::Char('3' | 'n') => Command::message(Message::Navigate(Section::CreateUser)),
            KeyCode::Char('r') => Command::message(Message::Refresh),
            KeyCode::Right | KeyCode::Char('l') if self.section == Section::Users => {
                Command::message(Message::NextPage)
            }
            KeyCode::Left | KeyCode::Char('h') if self.section == Section::Users => {
                Command::message(Message::PrevPage)
            }
            _ => Command::none(),
        }
    }

    fn show_page(&mut self, page: Page) {
        if page != self.page {
            self.page = page;
            self.list = QueryState::Loading;
        }
    }
}

impl Application for Dashboard {
    type Message = Message;
    type Flags = DashboardFlags;

    fn new(flags: DashboardFlags) -> (Self, Command<Message>) {
        let dashboard = Self {
            users: flags.users,
            page_size: flags.page_size,
            profile_name: flags.profile_name,
            api_url: flags.api_url,
            section: Section::default(),
            page: Page::FIRST,
            list: QueryState::Loading,
            total_users: None,
            form: FormState::new(),
            focus: Field::Name,
            creation: MutationState::Idle,
            status: String::new(),
        };
        (dashboard, Command::none())
    }

    fn update(&mut self, msg: Message) -> Command<Message> {
        match msg {
            Message::Terminal(Event::Key(key)) => self.on_key(key),
            Message::Terminal(_) => Command::none(),
            Message::TerminalError(e) => {
                tracing::error!(error = %e, "terminal input failed");
                self.status = format!("Terminal error: {e}");
                Command::none()
            }
            Message::Navigate(section) => {
                tracing::debug!(?section, "navigate");
                self.section = section;
                Command::none()
            }
            Message::UsersLoaded(result) => {
                if result.key == users_key(Page::FIRST)
                    && let Some(data) = result.data()
                {
                    self.total_users = Some(data.total_count);
                }
                if result.key == users_key(self.page) {
                    self.list = result.state;
                }
                Command::none()
            }
            Message::NextPage => {
                if let QueryState::Success { data, .. } = &self.list {
                    let next = self.page.next();
                    if !data.is_past_end(next, self.page_size) {
                        self.show_page(next);
                    }
                }
                Command::none()
            }
            Message::PrevPage => {
                if let Some(prev) = self.page.prev() {
                    self.show_page(prev);
                }
                Command::none()
            }
            Message::Refresh => self.users.client().invalidate_command(&users_prefix()),
            Message::Focus(field) => {
                self.focus = field;
                Command::none()
            }
            Message::Input(c) => {
                self.form.push_char(self.focus, c);
                Command::none()
            }
            Message::Backspace => {
                self.form.pop_char(self.focus);
                Command::none()
            }
            Message::Submit => match self.form.begin_submit() {
                Some(user) => {
                    self.creation = MutationState::Loading;
                    self.status = "Saving...".to_string();
                    self.users.submit(user).map(Message::UserCreated)
                }
                None => {
                    let first_invalid = Field::ALL
                        .into_iter()
                        .find(|field| self.form.error(*field).is_some());
                    if let Some(field) = first_invalid {
                        self.focus = field;
                    }
                    Command::none()
                }
            },
            Message::Cancel => {
                if !self.form.is_submitting() {
                    self.form = FormState::new();
                    self.focus = Field::Name;
                }
                self.section = Section::Users;
                Command::none()
            }
            Message::UserCreated(result) => {
                self.form.finish_submit(&result);
                match &result {
                    Ok(user) => {
                        self.status = format!("Created {}", user.name);
                        self.focus = Field::Name;
                        if self.section == Section::CreateUser {
                            self.section = Section::Users;
                        }
                    }
                    Err(e) => self.status = format!("Could not create user: {e}"),
                }
                self.creation = result.into();
                Command::none()
            }
            Message::SweepCache => {
                self.users.client().gc();
                Command::none()
            }
            Message::Quit => Command::effect(Action::Quit),
        }
    }

    fn view(&self, frame: &mut Frame<'_>) {
        view::render(self, frame);
    }

    fn subscriptions(&self) -> Vec<Subscription<Message>> {
        let mut subs = vec![
            Subscription::new(TerminalEvents::new()).map(|result| match result {
                Ok(event) => Message::Terminal(event),
                Err(e) => Message::TerminalError(e.to_string()),
            }),
            Subscription::new(Timer::new(GC_PERIOD)).map(|()| Message::SweepCache),
        ];

        let page = match self.section {
            Section::Dashboard => Some(Page::FIRST),
            Section::Users => Some(self.page),
            Section::CreateUser => None,
        };
        if let Some(page) = page {
            subs.push(Subscription::new(self.users.page_query(page)).map(Message::UsersLoaded));
        }

        subs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, RawUser, UserListResponse, UsersApi};
    use crate::query::QueryClient;
    use crate::users::NewUser;
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use std::sync::Arc;

    struct Offline;

    impl UsersApi for Offline {
        fn list_users(&self, _page: Page) -> BoxFuture<'static, Result<UserListResponse, ApiError>> {
            async { Err(ApiError::Network("offline".to_string())) }.boxed()
        }

        fn create_user(&self, _user: NewUser) -> BoxFuture<'static, Result<RawUser, ApiError>> {
            async { Err(ApiError::Network("offline".to_string())) }.boxed()
        }
    }

    fn dashboard() -> Dashboard {
        let users = UsersService::new(Arc::new(Offline), Arc::new(QueryClient::new()));
        let (dashboard, _) = Dashboard::new(DashboardFlags {
            users,
            page_size: NonZeroU32::new(10).unwrap(),
            profile_name: "Admin".to_string(),
            api_url: "http://localhost".to_string(),
        });
        dashboard
    }

    fn loaded(page: Page, total_count: u64) -> Message {
        Message::UsersLoaded(QueryResult {
            key: users_key(page),
            state: QueryState::Success {
                data: UserListResult {
                    users: vec![],
                    total_count,
                },
                is_stale: false,
            },
        })
    }

    #[test]
    fn test_subscriptions_follow_section() {
        let mut app = dashboard();
        assert_eq!(app.subscriptions().len(), 3);

        app.update(Message::Navigate(Section::CreateUser));
        assert_eq!(app.subscriptions().len(), 2);
    }

    #[test]
    fn test_paging_stops_at_last_page() {
        let mut app = dashboard();
        app.update(Message::Navigate(Section::Users));
        app.update(loaded(Page::FIRST, 42));
        assert_eq!(app.total_pages(), Some(5));

        for page in 2..=5 {
            app.update(Message::NextPage);
            assert_eq!(app.page().get(), page);
            assert!(matches!(app.list(), QueryState::Loading));
            app.update(loaded(app.page(), 42));
        }

        app.update(Message::NextPage);
        assert_eq!(app.page().get(), 5);
    }

    #[test]
    fn test_results_for_other_pages_are_ignored() {
        let mut app = dashboard();
        app.update(Message::Navigate(Section::Users));
        app.update(loaded(Page::new(3).unwrap(), 42));
        assert!(matches!(app.list(), QueryState::Loading));
    }

    #[test]
    fn test_invalid_submit_sends_nothing() {
        let mut app = dashboard();
        app.update(Message::Navigate(Section::CreateUser));
        let cmd = app.update(Message::Submit);
        assert!(cmd.is_none());
        assert!(app.form().error(Field::Name).is_some());
        assert!(!app.form().is_submitting());
    }

    #[test]
    fn test_typing_goes_to_focused_field() {
        let mut app = dashboard();
        app.update(Message::Navigate(Section::CreateUser));
        app.update(Message::Input('A'));
        app.update(Message::Focus(Field::Email));
        app.update(Message::Input('a'));
        assert_eq!(app.form().value(Field::Name), "A");
        assert_eq!(app.form().value(Field::Email), "a");
    }

    #[test]
    fn test_failed_creation_keeps_form() {
        let mut app = dashboard();
        app.update(Message::Navigate(Section::CreateUser));
        for c in "Ana".chars() {
            app.update(Message::Input(c));
        }
        app.update(Message::UserCreated(Err(QueryError::FetchError("down".to_string()))));

        assert_eq!(app.section(), Section::CreateUser);
        assert_eq!(app.form().value(Field::Name), "Ana");
        assert!(app.creation().is_error());
    }
}
