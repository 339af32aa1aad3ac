use crate::config::ChatId;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Which voucher each conversation is currently working on.
#[derive(Default)]
pub struct Sessions {
    active: Mutex<HashMap<ChatId, String>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&self, chat: ChatId, voucher: &str) {
        self.active.lock().insert(chat, voucher.to_string());
    }

    pub fn active(&self, chat: ChatId) -> Option<String> {
        self.active.lock().get(&chat).cloned()
    }

    /// Returns the voucher that was active, if any.
    pub fn finish(&self, chat: ChatId) -> Option<String> {
        self.active.lock().remove(&chat)
    }

    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_per_chat() {
        let s = Sessions::new();
        s.activate(1, "2023111201");
        s.activate(2, "v");
        assert_eq!(s.active(1).as_deref(), Some("2023111201"));
        assert_eq!(s.active(2).as_deref(), Some("v"));
        assert_eq!(s.active(3), None);
    }

    #[test]
    fn finish_is_one_shot() {
        let s = Sessions::new();
        s.activate(1, "v");
        assert_eq!(s.finish(1).as_deref(), Some("v"));
        assert_eq!(s.finish(1), None);
        assert!(s.is_empty());
    }

    #[test]
    fn activate_replaces_previous_voucher() {
        let s = Sessions::new();
        s.activate(1, "a");
        s.activate(1, "b");
        assert_eq!(s.active(1).as_deref(), Some("b"));
        assert_eq!(s.len(), 1);
    }
}
