//! The caller's in-progress input: a text box plus an attachment tray.

use cedarbot_core::types::AttachmentRef;

/// Text and attachments queued for the next turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Draft {
    text: String,
    attachments: Vec<AttachmentRef>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn attachments(&self) -> &[AttachmentRef] {
        &self.attachments
    }

    pub fn add_attachment(&mut self, attachment: AttachmentRef) {
        self.attachments.push(attachment);
    }

    /// Remove the attachment at `index`, if any.
    pub fn remove_attachment(&mut self, index: usize) -> Option<AttachmentRef> {
        if index < self.attachments.len() {
            Some(self.attachments.remove(index))
        } else {
            None
        }
    }

    /// Nothing to send: blank text and no attachments.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.attachments.clear();
    }
}
