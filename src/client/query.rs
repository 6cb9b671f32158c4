use serde_json::{Value, json};
use tracing::debug;

use super::{NotebookClient, sources_nested};
use crate::conversation::ConversationTurn;
use crate::error::Result;
use crate::types::QueryResult;

/// Ask a question. Without `conversation_id` a new conversation starts;
/// with one, the cached turns are sent as history.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions<'a> {
    /// Restrict the answer to these sources; all sources when `None`.
    pub source_ids: Option<&'a [String]>,
    pub conversation_id: Option<&'a str>,
}

pub(crate) fn query_params(
    source_ids: &[String],
    question: &str,
    history: Option<Value>,
    conversation_id: &str,
) -> Value {
    json!([
        sources_nested(source_ids),
        question,
        history,
        [2, null, [1]],
        conversation_id
    ])
}

impl NotebookClient {
    pub async fn query(
        &self,
        notebook_id: &str,
        question: &str,
        options: QueryOptions<'_>,
    ) -> Result<QueryResult> {
        let source_ids = match options.source_ids {
            Some(ids) => ids.to_vec(),
            None => self.notebook_source_ids(notebook_id).await?,
        };

        let (conversation_id, history) = match options.conversation_id {
            Some(id) => (id.to_string(), self.conversations.history(id)),
            None => (self.conversations.new_conversation_id(), None),
        };

        let params = query_params(&source_ids, question, history, &conversation_id);
        let body = self
            .stream_call(params, self.config.timeouts.query())
            .await?;
        let answer = self.chat_parser.parse(&body);
        debug!(
            notebook_id,
            conversation_id = %conversation_id,
            answer_chars = answer.chars().count(),
            "query answered"
        );

        let turn_number = if answer.is_empty() {
            self.conversations.turn_count(&conversation_id)
        } else {
            self.conversations.record(&conversation_id, question, &answer)
        };
        Ok(QueryResult {
            turn_number,
            answer,
            conversation_id,
            is_follow_up: options.conversation_id.is_some(),
        })
    }

    pub fn conversation_turns(&self, conversation_id: &str) -> Option<Vec<ConversationTurn>> {
        self.conversations.turns(conversation_id)
    }

    /// Forget a conversation; `true` when it had turns.
    pub fn clear_conversation(&self, conversation_id: &str) -> bool {
        self.conversations.clear(conversation_id)
    }
}
