//! The compose form.

use crate::error::{Error, Result};

/// Draft of an outgoing message as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeForm {
    /// Principal or alias, as typed.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Body text.
    pub body: String,
}

impl ComposeForm {
    /// Creates a filled-in form.
    #[must_use]
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// The recipient with surrounding whitespace removed.
    #[must_use]
    pub fn recipient(&self) -> &str {
        self.recipient.trim()
    }

    /// Checks that the form can be sent. The body may be empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCompose`] when the recipient or subject is
    /// missing.
    pub fn validate(&self) -> Result<()> {
        if self.recipient().is_empty() {
            return Err(Error::InvalidCompose("recipient is required"));
        }
        if self.subject.trim().is_empty() {
            return Err(Error::InvalidCompose("subject is required"));
        }
        Ok(())
    }

    /// Empties every field.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(ComposeForm::new("bob", "Hi", "").validate().is_ok());
        assert!(matches!(
            ComposeForm::new("   ", "Hi", "x").validate(),
            Err(Error::InvalidCompose(_))
        ));
        assert!(matches!(
            ComposeForm::new("bob", "", "x").validate(),
            Err(Error::InvalidCompose(_))
        ));
    }

    #[test]
    fn test_blank_subject_is_missing() {
        assert!(matches!(
            ComposeForm::new("bob", " \t ", "x").validate(),
            Err(Error::InvalidCompose("subject is required"))
        ));
    }

    #[test]
    fn test_recipient_is_trimmed() {
        assert_eq!(ComposeForm::new("  bob \n", "s", "b").recipient(), "bob");
    }

    #[test]
    fn test_clear() {
        let mut form = ComposeForm::new("bob", "Hi", "there");
        form.clear();
        assert_eq!(form, ComposeForm::default());
    }
}
