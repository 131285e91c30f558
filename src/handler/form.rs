//! Todo form decoding and validation

use serde::Deserialize;

use crate::store::TodoInput;

/// Raw `application/x-www-form-urlencoded` submission
#[derive(Debug, Default, Deserialize)]
pub struct TodoForm {
    pub title: Option<String>,
    pub desc: Option<String>,
}

/// Why a submission was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("malformed form body")]
    Malformed,
    #[error("field `{0}` is required")]
    Missing(&'static str),
}

impl TodoForm {
    /// Decode a urlencoded request body
    pub fn parse(body: &[u8]) -> Result<Self, FormError> {
        serde_urlencoded::from_bytes(body).map_err(|_| FormError::Malformed)
    }

    /// Check both fields are present and non-empty
    ///
    /// Values are stored as submitted: whitespace is kept and there is no
    /// length cap.
    pub fn validate(self) -> Result<TodoInput, FormError> {
        let title = required(self.title, "title")?;
        let description = required(self.desc, "desc")?;
        Ok(TodoInput { title, description })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, FormError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(FormError::Missing(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_validate() {
        let form = TodoForm::parse(b"title=Buy+milk&desc=2%20litres").unwrap();
        let input = form.validate().unwrap();
        assert_eq!(input.title, "Buy milk");
        assert_eq!(input.description, "2 litres");
    }

    #[test]
    fn test_missing_fields() {
        let form = TodoForm::parse(b"title=only").unwrap();
        assert_eq!(form.validate(), Err(FormError::Missing("desc")));

        let form = TodoForm::parse(b"").unwrap();
        assert_eq!(form.validate(), Err(FormError::Missing("title")));
    }

    #[test]
    fn test_empty_fields() {
        let form = TodoForm::parse(b"title=&desc=x").unwrap();
        assert_eq!(form.validate(), Err(FormError::Missing("title")));

        let form = TodoForm::parse(b"title=x&desc=").unwrap();
        assert_eq!(form.validate(), Err(FormError::Missing("desc")));
    }

    #[test]
    fn test_whitespace_is_kept() {
        let input = TodoForm::parse(b"title=+&desc=+x+")
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(input.title, " ");
        assert_eq!(input.description, " x ");
    }

    #[test]
    fn test_long_values_are_accepted() {
        let form = TodoForm {
            title: Some("t".repeat(201)),
            desc: Some("d".repeat(5000)),
        };
        let input = form.validate().unwrap();
        assert_eq!(input.title.len(), 201);
        assert_eq!(input.description.len(), 5000);
    }

    #[test]
    fn test_duplicate_field_is_malformed() {
        assert_eq!(
            TodoForm::parse(b"title=a&title=b&desc=c").unwrap_err(),
            FormError::Malformed
        );
    }
}
