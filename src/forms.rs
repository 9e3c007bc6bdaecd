//! Login-form discovery
//!
//! Extracts the first `<form>` element from an HTML document together with
//! its `<input>` descendants, so the browser-less session can fill in
//! credentials and post the form back. This is deliberately not a general
//! DOM engine: one form, its inputs, nothing else.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::error::SessionError;

static FORM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").expect("static selector"));
static INPUT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input").expect("static selector"));

/// The first `<form>` found in a login page.
///
/// `action` may be relative or absolute; `method` is the raw attribute value
/// and is normalized to uppercase at submission time. Discarded after one
/// submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub action: String,
    pub method: String,
}

/// One `<input>` descendant of the login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
    pub kind: String,
}

/// Extract the first `<form>` element and its input fields from `html`.
///
/// Inputs are collected recursively through all descendants of the form, in
/// document order. Submit-type inputs are UI affordances, not form data, and
/// are filtered out in a single pass before the fields are returned.
///
/// # Errors
///
/// Returns [`SessionError::NoFormFound`] when the document contains no
/// `<form>` element.
pub fn extract_login_form(html: &str) -> Result<(LoginForm, Vec<FormField>), SessionError> {
    let document = Html::parse_document(html);

    let form_element = document
        .select(&FORM_SELECTOR)
        .next()
        .ok_or(SessionError::NoFormFound)?;

    let form = LoginForm {
        action: form_element.value().attr("action").unwrap_or("").to_string(),
        method: form_element.value().attr("method").unwrap_or("").to_string(),
    };

    let fields = form_element
        .select(&INPUT_SELECTOR)
        .map(|input| FormField {
            name: input.value().attr("name").unwrap_or("").to_string(),
            value: input.value().attr("value").unwrap_or("").to_string(),
            kind: input.value().attr("type").unwrap_or("").to_string(),
        })
        .filter(|field| field.kind != "submit")
        .collect();

    Ok((form, fields))
}
