use crate::billing::{BillingSummary, Transaction, TransactionPage};
use crate::chat::{AgentInfo, ChatMessage, ConnectionStatus, MessageKind};

/// Everything the background tasks can ask the UI loop to apply. Events are
/// drained once per frame, in arrival order.
#[derive(Debug, Clone)]
pub enum AppEvent {
    ChatStatus(ConnectionStatus),
    MessageReceived(ChatMessage),
    AgentAssigned(AgentInfo),
    AgentTyping(bool),
    QueueUpdate {
        position: u32,
        wait_estimate_minutes: Option<u32>,
    },
    HistoryLoaded(Vec<ChatMessage>),
    AttachmentUploaded {
        file_name: String,
        kind: MessageKind,
    },
    ChatError(String),
    TransactionsLoaded {
        seq: u64,
        page: TransactionPage,
    },
    SummaryLoaded {
        seq: u64,
        summary: BillingSummary,
    },
    TransactionDetail(Box<Transaction>),
    BillingError {
        /// Tag of the fetch that failed; `None` for untagged detail fetches.
        seq: Option<u64>,
        message: String,
    },
}
