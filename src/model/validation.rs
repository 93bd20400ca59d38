use regex::Regex;
use std::sync::OnceLock;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
            .expect("email pattern is a valid regex")
    })
}

pub fn is_url(candidate: &str) -> bool {
    match url::Url::parse(candidate) {
        Ok(parsed) => parsed.has_host(),
        Err(_) => false,
    }
}

pub fn is_email(candidate: &str) -> bool {
    email_pattern().is_match(candidate)
}

/// Collects `"<field>: <message>"` entries for a request body.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(format!("{}: {}", field, message));
    }

    pub fn not_null<T>(&mut self, field: &str, value: &Option<T>) -> bool {
        if value.is_none() {
            self.push(field, "must not be null");
            return false;
        }
        true
    }

    pub fn not_blank(&mut self, field: &str, value: &Option<String>) -> bool {
        match value {
            Some(v) if !v.trim().is_empty() => true,
            _ => {
                self.push(field, "must not be blank");
                false
            }
        }
    }

    /// `not_null` followed by `not_blank`, reporting only the first failure.
    pub fn required(&mut self, field: &str, value: &Option<String>) -> bool {
        self.not_null(field, value) && self.not_blank(field, value)
    }

    pub fn max_len(&mut self, field: &str, value: &Option<String>, max: usize) {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.push(field, &format!("size must be between 0 and {}", max));
            }
        }
    }

    pub fn url(&mut self, field: &str, value: &Option<String>) {
        if let Some(v) = value {
            if !is_url(v) {
                self.push(field, "must be a valid URL");
            }
        }
    }

    pub fn email(&mut self, field: &str, value: &Option<String>) {
        if let Some(v) = value {
            if !v.is_empty() && !is_email(v) {
                self.push(field, "must be a well-formed email address");
            }
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        self.errors
    }
}
