//! Prompt rendering shared by the generation backends.

use serde::Serialize;

/// System message opening every chat-completions conversation.
pub const SYSTEM_MESSAGE: &str =
    "You are a helpful assistant that generates sql queries. Here are some examples:";

/// Fixed (schema, question, query) demonstrations sent ahead of the live question.
pub const FEW_SHOT_EXAMPLES: [(&str, &str, &str); 3] = [
    (
        "CREATE TABLE album ( albumid INTEGER, title TEXT, artistid INTEGER )",
        "How many albums are there by the artist with id 1?",
        "SELECT COUNT(*) FROM album WHERE artistid = 1",
    ),
    (
        "CREATE TABLE album ( albumid INTEGER, title TEXT, artistid INTEGER )",
        "What is the title of the album with the lowest id and title starting with the letter 'Z'?",
        "SELECT title FROM album WHERE albumid = (SELECT MIN(albumid) FROM album) AND title LIKE 'Z%'",
    ),
    (
        "CREATE TABLE appellations ( no INTEGER, appelation TEXT, county TEXT, state TEXT, area TEXT, isava TEXT )",
        "What is the top 5 states with the highest appelation count?",
        "SELECT state, COUNT(*) as count FROM appellations GROUP BY state ORDER BY count DESC LIMIT 5;",
    ),
];

/// Render the instruction prompt for one schema/question pair.
pub fn render(schemas: &str, question: &str) -> String {
    format!(
        "Given the PostgreSQL schema\n{schemas}\ngenerate only the sql query with no additional text for this question: {question}"
    )
}

/// One chat-completions message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Build the full conversation: system message, demonstrations, live question.
pub fn chat_messages(question: &str, schemas: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(FEW_SHOT_EXAMPLES.len() + 2);
    messages.push(ChatMessage::system(SYSTEM_MESSAGE));
    for (schema, example_question, query) in FEW_SHOT_EXAMPLES {
        messages.push(ChatMessage::system(format!(
            "{}\n\n{query}",
            render(schema, example_question)
        )));
    }
    messages.push(ChatMessage::user(render(schemas, question)));
    messages
}
