use std::collections::BTreeSet;

pub const BOT_NAME: &str = "Parceldesk Assistant";
pub const BOT_REPLY_DELAY_MS: u64 = 900;
pub const AGENT_ASSIGN_DELAY_MS: u64 = 2000;

const GREETING: &str = "Hi! I'm the Parceldesk assistant. Ask me about a delivery, \
or tell me what you need help with and I'll find the right person.";

const TRACKING_ANSWER: &str = "You can follow your delivery in real time from the \
Orders tab. The courier's position and the estimated arrival window update every \
few minutes. If the status hasn't moved in over an hour, send me the order \
reference and I'll have someone take a look.";

const ESCALATION_REPLY: &str = "Let me connect you with a member of our support \
team. Hold on one moment...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Topic {
    DeliveryTracking,
    PaymentBilling,
    AccountLogin,
    Urgent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BotAction {
    Answer { topic: Topic, reply: String },
    Escalate { reply: String },
}

/// Scans a user message for the fixed support topics, case-insensitively,
/// matching whole tokens plus a few multi-word phrases.
pub fn topics_in(text: &str) -> BTreeSet<Topic> {
    let lowered = text.to_ascii_lowercase();
    let tokens = token_set(&lowered);
    let has = |term: &str| tokens.contains(term);
    let has_any_phrase = |phrases: &[&str]| phrases.iter().any(|phrase| lowered.contains(phrase));

    let mut topics = BTreeSet::new();

    if has("track")
        || has("tracking")
        || has("delivery")
        || has("deliveries")
        || has("order")
        || has("orders")
        || has("package")
        || has("parcel")
        || has("courier")
        || has("driver")
        || has("shipment")
        || has_any_phrase(&["where is my"])
    {
        topics.insert(Topic::DeliveryTracking);
    }

    if has("payment")
        || has("payments")
        || has("billing")
        || has("charge")
        || has("charged")
        || has("refund")
        || has("refunded")
        || has("invoice")
        || has("fee")
        || has("fees")
    {
        topics.insert(Topic::PaymentBilling);
    }

    if has("account")
        || has("login")
        || has("password")
        || has_any_phrase(&["sign in", "log in"])
    {
        topics.insert(Topic::AccountLogin);
    }

    if has("urgent")
        || has("emergency")
        || has("asap")
        || has("immediately")
        || has_any_phrase(&["right now"])
    {
        topics.insert(Topic::Urgent);
    }

    topics
}

fn token_set(text: &str) -> BTreeSet<&str> {
    text.split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect()
}

/// The scripted responder that fronts a session until a human takes over.
/// Flow: greeting, then keyword routing per message, until the first
/// escalation. Default-to-human: anything that is not purely a
/// delivery/tracking question is handed off.
#[derive(Debug, Default)]
pub struct EscalationScript {
    greeted: bool,
    escalated: bool,
}

impl EscalationScript {
    pub fn greeting(&mut self) -> Option<String> {
        if self.greeted {
            return None;
        }
        self.greeted = true;
        Some(GREETING.to_string())
    }

    pub fn escalation_triggered(&self) -> bool {
        self.escalated
    }

    /// Decides the bot's response to a user message. Returns `None` once the
    /// session has escalated; the bot stays silent while a human handles it.
    pub fn route(&mut self, text: &str) -> Option<BotAction> {
        if self.escalated {
            return None;
        }

        let topics = topics_in(text);
        let tracking_only =
            topics.len() == 1 && topics.contains(&Topic::DeliveryTracking);

        if tracking_only {
            return Some(BotAction::Answer {
                topic: Topic::DeliveryTracking,
                reply: TRACKING_ANSWER.to_string(),
            });
        }

        self.escalated = true;
        Some(BotAction::Escalate {
            reply: ESCALATION_REPLY.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_is_sent_once() {
        let mut script = EscalationScript::default();
        assert!(script.greeting().is_some());
        assert!(script.greeting().is_none());
    }

    #[test]
    fn tracking_only_question_gets_the_tracking_answer() {
        let mut script = EscalationScript::default();
        let action = script
            .route("Where is my package? The tracking page looks stuck")
            .expect("bot should respond before escalation");
        assert!(matches!(
            action,
            BotAction::Answer {
                topic: Topic::DeliveryTracking,
                ..
            }
        ));
        assert!(!script.escalation_triggered());
    }

    #[test]
    fn billing_question_escalates() {
        let mut script = EscalationScript::default();
        let action = script
            .route("I was charged twice on my last invoice")
            .expect("bot should respond before escalation");
        assert!(matches!(action, BotAction::Escalate { .. }));
        assert!(script.escalation_triggered());
    }

    #[test]
    fn account_question_escalates() {
        let mut script = EscalationScript::default();
        let action = script
            .route("I can't log in to my account")
            .expect("bot should respond before escalation");
        assert!(matches!(action, BotAction::Escalate { .. }));
        assert!(script.escalation_triggered());
    }

    #[test]
    fn unmatched_text_defaults_to_a_human() {
        let mut script = EscalationScript::default();
        let action = script
            .route("the app keeps crashing on startup")
            .expect("bot should respond before escalation");
        assert!(matches!(action, BotAction::Escalate { .. }));
        assert!(script.escalation_triggered());
    }

    #[test]
    fn urgent_delivery_question_escalates_despite_tracking_match() {
        let mut script = EscalationScript::default();
        let action = script
            .route("I need help with urgent delivery")
            .expect("bot should respond before escalation");
        assert!(matches!(action, BotAction::Escalate { .. }));
        assert!(script.escalation_triggered());
    }

    #[test]
    fn same_question_without_urgent_gets_auto_answered() {
        let mut script = EscalationScript::default();
        let action = script
            .route("I need help with delivery")
            .expect("bot should respond before escalation");
        assert!(matches!(action, BotAction::Answer { .. }));
        assert!(!script.escalation_triggered());
    }

    #[test]
    fn bot_stays_silent_after_escalation() {
        let mut script = EscalationScript::default();
        script.route("refund please").expect("first route should respond");
        assert!(script.route("where is my order?").is_none());
    }

    #[test]
    fn topic_matching_is_case_insensitive() {
        let topics = topics_in("URGENT: my PARCEL is missing");
        assert!(topics.contains(&Topic::Urgent));
        assert!(topics.contains(&Topic::DeliveryTracking));
    }

    #[test]
    fn keyword_matching_uses_whole_tokens() {
        // "coffee" must not match the "fee" keyword.
        let topics = topics_in("the coffee I ordered");
        assert!(!topics.contains(&Topic::PaymentBilling));
    }
}
