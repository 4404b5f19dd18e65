use serde::Deserialize;

use crate::domain::{ChatId, MessageId, UpdateId};

/// An incoming event from `getUpdates`.
///
/// Only the fields the dispatcher needs are modelled; everything else the Bot
/// API sends is ignored during decoding.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Update {
    pub update_id: UpdateId,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    pub chat: Chat,
    /// Absent for non-text messages (stickers, photos, ...).
    #[serde(default)]
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

impl Update {
    /// The message text, if this update carries a non-empty one.
    pub fn text(&self) -> Option<(&Message, &str)> {
        let msg = self.message.as_ref()?;
        if msg.text.is_empty() {
            return None;
        }
        Some((msg, msg.text.as_str()))
    }
}
