//! Submitted forms and their validation.
//!
//! Each form deserializes leniently (every field optional, so a missing
//! field never becomes an extractor rejection) and `validate` turns it
//! into the typed value or a set of per-field messages for re-rendering.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::category::Category;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Not a valid choice.";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, &'static str>);

impl FieldErrors {
    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.0.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn add(&mut self, field: &'static str, message: &'static str) {
        self.0.entry(field).or_insert(message);
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

fn required<'a>(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &'a Option<String>,
) -> &'a str {
    let value = value.as_deref().map(str::trim).unwrap_or_default();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    }
    value
}

fn choice(errors: &mut FieldErrors, field: &'static str, value: &Option<String>) -> Category {
    let raw = required(errors, field, value);
    if raw.is_empty() {
        return Category::DEFAULT;
    }
    raw.parse().unwrap_or_else(|_| {
        errors.add(field, INVALID_CHOICE);
        Category::DEFAULT
    })
}

/// Title search box on the add page.
#[derive(Debug, Default, Deserialize)]
pub struct AddForm {
    pub title: Option<String>,
}

impl AddForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::default();
        let title = required(&mut errors, "title", &self.title).to_string();
        errors.into_result(|| title)
    }
}

/// Category picker on the "surprise me" page.
#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    pub category: Option<String>,
}

impl SearchForm {
    pub fn validate(&self) -> Result<Category, FieldErrors> {
        let mut errors = FieldErrors::default();
        let category = choice(&mut errors, "category", &self.category);
        errors.into_result(|| category)
    }
}

/// Category radio on the edit page.
#[derive(Debug, Default, Deserialize)]
pub struct DetailsForm {
    pub category: Option<String>,
}

impl DetailsForm {
    pub fn validate(&self) -> Result<Category, FieldErrors> {
        let mut errors = FieldErrors::default();
        let category = choice(&mut errors, "category", &self.category);
        errors.into_result(|| category)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = required(&mut errors, "email", &self.email).to_string();
        let name = required(&mut errors, "name", &self.name).to_string();
        // Passwords are taken verbatim; only emptiness is checked.
        let password = self.password.clone().unwrap_or_default();
        if password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(|| Registration { email, password, name })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = required(&mut errors, "email", &self.email).to_string();
        let password = self.password.clone().unwrap_or_default();
        if password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(|| Credentials { email, password })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_is_required() {
        let err = AddForm { title: Some("   ".into()) }.validate().unwrap_err();
        assert_eq!(err.get("title"), Some(REQUIRED));
        assert_eq!(AddForm::default().validate().unwrap_err().get("title"), Some(REQUIRED));
        assert_eq!(AddForm { title: Some(" Heat ".into()) }.validate().unwrap(), "Heat");
    }

    #[test]
    fn category_must_be_a_known_choice() {
        let ok = SearchForm { category: Some("Christmas rom-com".into()) }.validate();
        assert_eq!(ok.unwrap(), Category::ChristmasRomCom);

        let bad = DetailsForm { category: Some("Easter".into()) }.validate().unwrap_err();
        assert_eq!(bad.get("category"), Some(INVALID_CHOICE));

        let missing = DetailsForm::default().validate().unwrap_err();
        assert_eq!(missing.get("category"), Some(REQUIRED));
    }

    #[test]
    fn registration_reports_every_missing_field() {
        let err = RegisterForm::default().validate().unwrap_err();
        assert_eq!(err.get("email"), Some(REQUIRED));
        assert_eq!(err.get("password"), Some(REQUIRED));
        assert_eq!(err.get("name"), Some(REQUIRED));

        let ok = RegisterForm {
            email: Some("a@b.c".into()),
            password: Some(" spaced ".into()),
            name: Some("A".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.password, " spaced ");
    }

    #[test]
    fn login_needs_both_fields() {
        let err = LoginForm { email: Some("a@b.c".into()), password: None }.validate().unwrap_err();
        assert_eq!(err.get("email"), None);
        assert_eq!(err.get("password"), Some(REQUIRED));
    }
}
