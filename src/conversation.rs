use serde::{Deserialize, Serialize};

/// One message in the conversation, authored by either side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub sender: Sender,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Assistant,
}

/// Chronological, append-only sequence of turns for one session.
/// Turns are never edited or removed once pushed.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            sender: Sender::User,
            text: text.into(),
        });
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            sender: Sender::Assistant,
            text: text.into(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last_sender(&self) -> Option<Sender> {
        self.turns.last().map(|turn| turn.sender)
    }

    /// True when the newest turn is user-authored, i.e. a reply is owed.
    pub fn awaiting_reply(&self) -> bool {
        self.last_sender() == Some(Sender::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_conversation_owes_no_reply() {
        let conversation = Conversation::new();
        assert!(conversation.is_empty());
        assert_eq!(conversation.last_sender(), None);
        assert!(!conversation.awaiting_reply());
    }

    #[test]
    fn test_push_preserves_order() {
        let mut conversation = Conversation::new();
        conversation.push_user("Hello");
        conversation.push_assistant("Hi there!");
        conversation.push_user("How are you?");

        let senders: Vec<Sender> = conversation.turns().iter().map(|t| t.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Assistant, Sender::User]);
        assert_eq!(conversation.turns()[1].text, "Hi there!");
    }

    #[test]
    fn test_awaiting_reply_tracks_last_sender() {
        let mut conversation = Conversation::new();
        conversation.push_user("Hello");
        assert!(conversation.awaiting_reply());

        conversation.push_assistant("Hi there!");
        assert!(!conversation.awaiting_reply());
    }
}
