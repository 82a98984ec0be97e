//! Declarative form rules shared by the HTTP layer and the client.
//!
//! A rule set is plain data; [`validate`] is a pure function over it, so the
//! same checks run before a request leaves the client and again on arrival.

use std::collections::BTreeMap;

use crate::{
    domain::MAX_NAME_CHARS,
    protocol::{CampaignForm, NewList, NewSubscriber, NewTemplate},
};

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const INVALID_EMAIL_MESSAGE: &str = "The specified email is not valid.";

/// Field name to first failing message.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Email,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub required: bool,
    pub max_len: Option<(usize, &'static str)>,
    pub format: Option<Format>,
}

impl FieldRule {
    pub const fn required(field: &'static str) -> Self {
        Self {
            field,
            required: true,
            max_len: None,
            format: None,
        }
    }

    pub const fn max_len(mut self, max: usize, message: &'static str) -> Self {
        self.max_len = Some((max, message));
        self
    }

    pub const fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    fn check(&self, value: Option<&str>) -> Option<&'static str> {
        let value = value.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return self.required.then_some(REQUIRED_MESSAGE);
        }
        if let Some((max, message)) = self.max_len {
            if value.chars().count() > max {
                return Some(message);
            }
        }
        match self.format {
            Some(Format::Email) if !looks_like_email(value) => Some(INVALID_EMAIL_MESSAGE),
            _ => None,
        }
    }
}

pub const CAMPAIGN_RULES: &[FieldRule] = &[
    FieldRule::required("name").max_len(MAX_NAME_CHARS, "The name must not exceed 191 characters."),
    FieldRule::required("template_name").max_len(
        MAX_NAME_CHARS,
        "The template name must not exceed 191 characters.",
    ),
];

pub const TEMPLATE_RULES: &[FieldRule] = &[
    FieldRule::required("name").max_len(MAX_NAME_CHARS, "The name must not exceed 191 characters."),
    FieldRule::required("subject"),
];

pub const LIST_RULES: &[FieldRule] = &[FieldRule::required("name")
    .max_len(MAX_NAME_CHARS, "The name must not exceed 191 characters.")];

pub const SUBSCRIBER_RULES: &[FieldRule] = &[
    FieldRule::required("name").max_len(MAX_NAME_CHARS, "The name must not exceed 191 characters."),
    FieldRule::required("email").format(Format::Email),
];

/// Lookup of a submitted field by name.
pub trait FormFields {
    fn field(&self, name: &str) -> Option<&str>;
}

impl FormFields for CampaignForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(&self.name),
            "template_name" => Some(&self.template_name),
            _ => None,
        }
    }
}

impl FormFields for NewTemplate {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(&self.name),
            "subject" => Some(&self.subject),
            "html_part" => Some(&self.html_part),
            "text_part" => Some(&self.text_part),
            _ => None,
        }
    }
}

impl FormFields for NewList {
    fn field(&self, name: &str) -> Option<&str> {
        (name == "name").then_some(self.name.as_str())
    }
}

impl FormFields for NewSubscriber {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(&self.name),
            "email" => Some(&self.email),
            _ => None,
        }
    }
}

pub fn validate<F: FormFields + ?Sized>(form: &F, rules: &[FieldRule]) -> FieldErrors {
    rules
        .iter()
        .filter_map(|rule| {
            rule.check(form.field(rule.field))
                .map(|message| (rule.field.to_string(), message.to_string()))
        })
        .collect()
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
        && !value.chars().any(char::is_whitespace)
}
