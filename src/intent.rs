//! Intent parsing.
//!
//! [`IntentParser::parse`] never fails: any model error, timeout, non-2xx
//! status or unreadable reply is logged and replaced by
//! [`fallback_intent`].

use chrono::{DateTime, Utc};
use std::sync::Arc;

use federated_search_core::intent::{fallback_intent, parse_model_reply};
use federated_search_core::models::{ConversationTurn, Intent};

use crate::llm::LanguageModel;

pub const SYSTEM_PROMPT: &str = r#"You classify search queries for a sign-industry community platform.
Reply with a single JSON object and nothing else, using exactly these fields:

{
  "dataTypes": [...],   // any of: "files", "people", "events", "forumPosts", "stories", "videos", "equipment", "suppliers"; empty means all
  "filters": {
    "tags": [...],      // optional topic tags
    "dateRange": "...", // optional: "today", "thisWeek", "lastWeek", "thisMonth", "lastMonth", "thisYear", "upcoming"
    "location": "..."   // optional city or state
  },
  "keywords": [...],    // the important search terms, lowercase
  "sortBy": "..."       // "relevance", "recency" or "popularity"
}

Use earlier conversation turns, when given, to refine the latest query."#;

pub struct IntentParser {
    model: Arc<dyn LanguageModel>,
}

impl IntentParser {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn parse(&self, query: &str, conversation: &[ConversationTurn]) -> Intent {
        self.parse_at(query, conversation, Utc::now()).await
    }

    /// Like [`parse`](Self::parse) with an explicit clock for date buckets.
    pub async fn parse_at(
        &self,
        query: &str,
        conversation: &[ConversationTurn],
        now: DateTime<Utc>,
    ) -> Intent {
        let prompt = user_prompt(query, conversation);
        let reply = match self.model.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(model = self.model.name(), error = %e, "intent model call failed; using fallback");
                return fallback_intent(query);
            }
        };

        match parse_model_reply(&reply, query, now) {
            Ok(intent) => {
                tracing::debug!(?intent, "parsed intent");
                intent
            }
            Err(e) => {
                tracing::warn!(model = self.model.name(), error = %e, "unreadable intent reply; using fallback");
                fallback_intent(query)
            }
        }
    }
}

fn user_prompt(query: &str, conversation: &[ConversationTurn]) -> String {
    if conversation.is_empty() {
        return query.to_string();
    }
    let mut out = String::from("Conversation so far:\n");
    for turn in conversation {
        out.push_str(&format!("{}: {}\n", turn.role, turn.content));
    }
    out.push_str("\nLatest query: ");
    out.push_str(query);
    out
}
