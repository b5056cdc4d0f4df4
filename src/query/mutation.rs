//! One-off writes.
//!
//! A mutation is a discrete side effect with a clear start and end, so it is a
//! [`Command`] rather than a subscription. Cache maintenance after a write belongs
//! in the mutator itself, as a statement after the write succeeded, so the order
//! "write, then invalidate" is visible in one place and testable on its own.

use std::marker::PhantomData;

use futures::future::BoxFuture;

use crate::command::Command;

use super::client::QueryError;

/// Lifecycle of a mutation as seen by the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MutationState<T> {
    /// Not started.
    #[default]
    Idle,
    /// Submitted; waiting for the server.
    Loading,
    /// Acknowledged by the server.
    Success(T),
    /// Rejected. Holds the message to show.
    Error(String),
}

impl<T> MutationState<T> {
    /// Returns the result if the mutation succeeded.
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl<T> From<Result<T, QueryError>> for MutationState<T> {
    fn from(result: Result<T, QueryError>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

/// Entry point for running mutations as commands.
///
/// ```rust,ignore
/// Mutation::mutate(form, move |input| {
///     Box::pin(async move { create_user(&*api, &client, input).await })
/// })
/// .map(Message::UserCreated)
/// ```
pub struct Mutation<I, O> {
    _phantom: PhantomData<(I, O)>,
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Runs `mutator(input)` and delivers its result.
    ///
    /// The returned command is not tied to any view, so it completes even if the
    /// user navigates away before the server answers.
    pub fn mutate<F>(input: I, mutator: F) -> Command<Result<O, QueryError>>
    where
        F: FnOnce(I) -> BoxFuture<'static, Result<O, QueryError>> + Send + 'static,
    {
        Command::future(async move { mutator(input).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Action;
    use futures::StreamExt;

    #[test]
    fn test_mutation_state_data() {
        assert_eq!(MutationState::Success(42).data(), Some(&42));
        assert_eq!(MutationState::<i32>::Idle.data(), None);
        assert_eq!(MutationState::<i32>::Loading.data(), None);
        assert_eq!(MutationState::<i32>::Error("error".to_string()).data(), None);
    }

    #[test]
    fn test_mutation_state_predicates() {
        let idle = MutationState::<i32>::default();
        assert!(!idle.is_loading() && !idle.is_success() && !idle.is_error());
        assert!(MutationState::<i32>::Loading.is_loading());
        assert!(MutationState::Success(1).is_success());
        assert!(MutationState::<i32>::Error(String::new()).is_error());
    }

    #[test]
    fn test_mutation_state_from_result() {
        let ok: MutationState<i32> = Ok(1).into();
        assert_eq!(ok, MutationState::Success(1));

        let err: MutationState<i32> = Err(QueryError::FetchError("nope".to_string())).into();
        assert_eq!(err, MutationState::Error("Fetch failed: nope".to_string()));
    }

    #[tokio::test]
    async fn test_mutate_delivers_result() {
        let cmd = Mutation::mutate(20, |n: i32| Box::pin(async move { Ok::<_, QueryError>(n + 1) }));

        let mut stream = cmd.stream.expect("mutation should run");
        match stream.next().await {
            Some(Action::Message(result)) => assert_eq!(result, Ok(21)),
            _ => panic!("expected a message"),
        }
        assert!(stream.next().await.is_none());
    }
}
