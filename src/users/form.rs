//! The create-user form and its validation.
//!
//! Every submission attempt runs the form through
//! `Untouched -> Validating -> {Valid, Invalid}`. Only a `Valid` form yields a
//! [`NewUser`]; an `Invalid` one keeps its values and carries one message per
//! failing field, and nothing is sent.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::model::NewUser;

#[allow(clippy::expect_used)]
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@.]+$").expect("email pattern compiles")
});

/// A form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    PasswordConfirm,
}

impl Field {
    /// Fields in tab order.
    pub const ALL: [Self; 4] = [
        Self::Name,
        Self::Email,
        Self::Password,
        Self::PasswordConfirm,
    ];

    /// The field's wire/form name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Password => "password",
            Self::PasswordConfirm => "password_confirm",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Full name",
            Self::Email => "Email",
            Self::Password => "Password",
            Self::PasswordConfirm => "Confirm password",
        }
    }

    #[must_use]
    pub const fn is_secret(self) -> bool {
        matches!(self, Self::Password | Self::PasswordConfirm)
    }

    #[must_use]
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    #[must_use]
    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One failing rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: &'static str,
}

/// Every failing rule of one validation pass, at most one per field.
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("form has {} invalid field(s)", .0.len())]
pub struct ValidationErrors(BTreeMap<Field, ValidationError>);

impl ValidationErrors {
    fn add(&mut self, field: Field, message: &'static str) {
        self.0
            .entry(field)
            .or_insert(ValidationError { field, message });
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&ValidationError> {
        self.0.get(&field)
    }

    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.values()
    }
}

/// Raw values as typed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl fmt::Debug for FormValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormValues")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Checks `values` against the create-user rules.
///
/// # Errors
///
/// Returns every failing field with its message.
pub fn validate(values: &FormValues) -> Result<NewUser, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = values.name.trim();
    if name.is_empty() {
        errors.add(Field::Name, "Name is required");
    }

    let email = values.email.trim();
    if email.is_empty() {
        errors.add(Field::Email, "Email is required");
    } else if !EMAIL.is_match(email) {
        errors.add(Field::Email, "Email is not valid");
    }

    if values.password.is_empty() {
        errors.add(Field::Password, "Password is required");
    }

    if !values.password_confirm.is_empty() && values.password_confirm != values.password {
        errors.add(Field::PasswordConfirm, "Passwords must match");
    }

    if errors.is_empty() {
        Ok(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: values.password.clone(),
        })
    } else {
        Err(errors)
    }
}

/// Where the form is in its validation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationStatus {
    #[default]
    Untouched,
    Validating,
    Valid,
    Invalid,
}

/// Draft values, field errors and submission state of the create form.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    values: FormValues,
    errors: ValidationErrors,
    status: ValidationStatus,
    submitting: bool,
    submit_error: Option<String>,
}

impl FormState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn values(&self) -> &FormValues {
        &self.values
    }

    #[must_use]
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.values.name,
            Field::Email => &self.values.email,
            Field::Password => &self.values.password,
            Field::PasswordConfirm => &self.values.password_confirm,
        }
    }

    fn value_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Name => &mut self.values.name,
            Field::Email => &mut self.values.email,
            Field::Password => &mut self.values.password,
            Field::PasswordConfirm => &mut self.values.password_confirm,
        }
    }

    /// Replaces a field's value and clears its error.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        if self.submitting {
            return;
        }
        *self.value_mut(field) = value.into();
        self.errors.0.remove(&field);
    }

    pub fn push_char(&mut self, field: Field, c: char) {
        let mut value = self.value(field).to_string();
        value.push(c);
        self.set(field, value);
    }

    pub fn pop_char(&mut self, field: Field) {
        let mut value = self.value(field).to_string();
        value.pop();
        self.set(field, value);
    }

    #[must_use]
    pub fn error(&self, field: Field) -> Option<&'static str> {
        self.errors.get(field).map(|e| e.message)
    }

    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    #[must_use]
    pub const fn status(&self) -> ValidationStatus {
        self.status
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// The server's rejection of the last submission, if any.
    #[must_use]
    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    /// Runs validation and records the outcome on the form.
    ///
    /// # Errors
    ///
    /// Returns the failing fields; they are also kept on the form for display.
    pub fn validate(&mut self) -> Result<NewUser, ValidationErrors> {
        self.status = ValidationStatus::Validating;
        match validate(&self.values) {
            Ok(user) => {
                self.status = ValidationStatus::Valid;
                self.errors = ValidationErrors::default();
                Ok(user)
            }
            Err(errors) => {
                self.status = ValidationStatus::Invalid;
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }

    /// Starts a submission if the form is valid and not already submitting.
    ///
    /// Returns the payload to send, or `None` when nothing should be sent.
    pub fn begin_submit(&mut self) -> Option<NewUser> {
        if self.submitting {
            tracing::debug!("submission already in flight, ignoring");
            return None;
        }
        self.submit_error = None;
        match self.validate() {
            Ok(user) => {
                self.submitting = true;
                Some(user)
            }
            Err(errors) => {
                tracing::debug!(invalid = errors.len(), "form rejected");
                None
            }
        }
    }

    /// Records the server's answer. Success clears the form; failure keeps every
    /// value so the user can retry.
    pub fn finish_submit<T, E: fmt::Display>(&mut self, result: &Result<T, E>) {
        self.submitting = false;
        match result {
            Ok(_) => *self = Self::default(),
            Err(e) => self.submit_error = Some(e.to_string()),
        }
    }
}
