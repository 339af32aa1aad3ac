use crate::config::{ChatId, Config};
use crate::error::LedgerError;
use crate::messages;
use crate::session::Sessions;
use crate::store::LedgerStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// One inbound message from a conversation.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Update {
    pub update_id: u64,
    pub chat_id: ChatId,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat_id: ChatId,
    pub text: String,
}

fn reply(chat_id: ChatId, text: impl Into<String>) -> Reply {
    Reply { chat_id, text: text.into() }
}

/// Cashier desk: turns operator messages into ledger calls and renders the
/// results. Conversations are independent; each keeps its own active voucher.
pub struct Desk {
    store: Arc<LedgerStore>,
    sessions: Sessions,
    config: Arc<Config>,
}

impl Desk {
    pub fn new(store: Arc<LedgerStore>, config: Arc<Config>) -> Self {
        Self { store, sessions: Sessions::new(), config }
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    pub async fn handle(&self, upd: &Update) -> Vec<Reply> {
        let Some(raw) = upd.text.as_deref() else {
            info!("got empty update #{}, skip", upd.update_id);
            return vec![];
        };
        let chat = upd.chat_id;
        let text = raw.trim().to_lowercase();

        if !self.config.allowed_chats.contains(&chat) {
            warn!(chat, "rejected message from caller outside the allow-list");
            return vec![reply(chat, messages::NOT_PERMITTED)];
        }

        match text.as_str() {
            "/start" => vec![reply(chat, messages::HELP)],
            "/stop" => match self.sessions.finish(chat) {
                Some(v) => {
                    info!(chat, voucher = %v, "voucher session finished");
                    vec![reply(chat, messages::FINISHED)]
                }
                None => vec![reply(chat, messages::ALREADY_FINISHED)],
            },
            t if t == "/balance" || t.starts_with("/balance ") => {
                self.show_balance(chat, t["/balance".len()..].trim()).await
            }
            t if self.is_voucher_code(chat, t) => self.select(chat, t).await,
            t => match self.sessions.active(chat) {
                Some(voucher) => self.withdraw(chat, &voucher, t).await,
                None => vec![reply(chat, messages::NO_VOUCHER)],
            },
        }
    }

    fn is_voucher_code(&self, chat: ChatId, text: &str) -> bool {
        if self.config.voucher_codes.is_empty() {
            !text.starts_with('/') && self.sessions.active(chat).is_none()
        } else {
            self.config.voucher_codes.contains(text)
        }
    }

    fn remaining(&self, total: u32) -> i64 {
        self.config.voucher_limit - i64::from(total)
    }

    async fn select(&self, chat: ChatId, voucher: &str) -> Vec<Reply> {
        match self.accumulate(voucher, 0).await {
            Ok(total) => {
                self.sessions.activate(chat, voucher);
                info!(chat, voucher, total, "voucher selected");
                vec![reply(chat, messages::selected(self.remaining(total)))]
            }
            Err(e) => self.failed(chat, "select", e),
        }
    }

    async fn withdraw(&self, chat: ChatId, voucher: &str, text: &str) -> Vec<Reply> {
        let amount = match text.parse::<u32>() {
            Ok(a) => a,
            Err(e) => {
                warn!(chat, "could not parse '{}' as an amount: {}", text, e);
                return vec![reply(chat, messages::BAD_AMOUNT)];
            }
        };

        let total = match self.accumulate(voucher, amount).await {
            Ok(t) => t,
            Err(e) => return self.failed(chat, "withdraw", e),
        };
        info!(chat, voucher, amount, total, "withdrawal recorded");

        let remaining = self.remaining(total);
        let outcome = if remaining < 0 {
            messages::insufficient(-remaining)
        } else {
            messages::withdrawn(remaining)
        };
        vec![reply(chat, outcome), reply(chat, messages::continue_or_stop(total))]
    }

    async fn show_balance(&self, chat: ChatId, voucher: &str) -> Vec<Reply> {
        if voucher.is_empty() {
            return vec![reply(chat, messages::BALANCE_USAGE)];
        }
        match self.peek(voucher).await {
            Ok(total) => vec![reply(chat, messages::balance(voucher, self.remaining(total)))],
            Err(e) => self.failed(chat, "balance", e),
        }
    }

    fn failed(&self, chat: ChatId, op: &str, e: LedgerError) -> Vec<Reply> {
        if let LedgerError::InvalidVoucher(_) = e {
            warn!(chat, "{} rejected: {}", op, e);
            return vec![reply(chat, messages::INVALID_VOUCHER)];
        }
        if e.is_retryable() {
            warn!(chat, "{} failed, nothing was written: {}", op, e);
        } else {
            error!(chat, "{} failed: {}", op, e);
        }
        vec![reply(chat, messages::LEDGER_UNAVAILABLE)]
    }

    async fn accumulate(&self, voucher: &str, delta: u32) -> Result<u32, LedgerError> {
        let store = self.store.clone();
        let voucher = voucher.to_string();
        tokio::task::spawn_blocking(move || store.accumulate(voucher, delta))
            .await
            .map_err(|e| LedgerError::PersistFailed(format!("accumulate task: {}", e)))?
    }

    async fn peek(&self, voucher: &str) -> Result<u32, LedgerError> {
        let store = self.store.clone();
        let voucher = voucher.to_string();
        tokio::task::spawn_blocking(move || store.peek(voucher))
            .await
            .map_err(|e| LedgerError::ReadFailed(format!("peek task: {}", e)))?
    }
}
