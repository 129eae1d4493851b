/// End-to-end reads: classification, Codex conversion, validation and tool correlation
mod common;

use std::fs;

use common::{
    StoreBuilder, claude_tool_result, claude_tool_use, claude_user, codex_assistant_message,
    codex_function_call, codex_function_output, codex_session_meta, codex_user_message,
};
use serde_json::json;
use session_ingest::models::{AssistantContent, MessageBody, UserContent};
use session_ingest::utils::MAX_READ_SIZE;
use session_ingest::{
    CanonicalEntry, ConversationStore, GroupScope, ReadOutcome, build_tool_index, parse_entries,
};

fn content(outcome: ReadOutcome) -> String {
    match outcome {
        ReadOutcome::Content(text) => text,
        ReadOutcome::TooLarge { size, limit } => panic!("unexpected refusal: {size} > {limit}"),
    }
}

#[test]
fn test_codex_session_converts_to_user_entry() {
    let store = StoreBuilder::new().with_codex_session(
        "2026/02/03",
        "rollout-a.jsonl",
        &[codex_session_meta("s-1", "/repo/app"), codex_user_message("fix the bug")],
    );
    let conversations = ConversationStore::new(store.config());

    let text = content(
        conversations.read_conversation(&store.codex_path("2026/02/03", "rollout-a.jsonl")).unwrap(),
    );
    let entries = parse_entries(&text);
    assert_eq!(entries.len(), 1);

    let CanonicalEntry::User(user) = &entries[0] else {
        panic!("expected user entry, got {:?}", entries[0]);
    };
    assert_eq!(user.meta.cwd, "/repo/app");
    assert_eq!(user.meta.session_id, "s-1");
    assert_eq!(user.meta.parent_uuid, None);
    assert_eq!(
        user.message.content,
        MessageBody::Blocks(vec![UserContent::Text { text: "fix the bug".into() }])
    );
}

#[test]
fn test_codex_order_preserved_and_tools_correlate() {
    let store = StoreBuilder::new().with_codex_session(
        "2026/02/03",
        "rollout-a.jsonl",
        &[
            codex_session_meta("s-1", "/repo"),
            codex_user_message("list files"),
            codex_function_call("call_1", "shell", r#"{"command":["ls"]}"#),
            codex_function_output("call_1", "Cargo.toml\nsrc"),
            codex_assistant_message("Two entries."),
        ],
    );
    let conversations = ConversationStore::new(store.config());
    let path = store.codex_path("2026/02/03", "rollout-a.jsonl");

    let entries = parse_entries(&content(conversations.read_conversation(&path).unwrap()));
    let kinds: Vec<_> = entries.iter().map(CanonicalEntry::entry_type).collect();
    assert_eq!(kinds, vec!["user", "assistant", "user", "assistant"]);

    let CanonicalEntry::Assistant(call) = &entries[1] else { panic!("expected assistant") };
    let MessageBody::Blocks(items) = &call.message.content else { panic!("expected blocks") };
    assert!(matches!(
        &items[0],
        AssistantContent::ToolUse { id, name, input }
            if id == "call_1" && name == "shell" && input == &json!({"command": ["ls"]})
    ));

    let index = build_tool_index(&entries);
    assert_eq!(index["call_1"].name, "shell");
    assert_eq!(index["call_1"].result, json!("Cargo.toml\nsrc"));
}

#[test]
fn test_unrecognized_codex_file_is_returned_verbatim() {
    let raw = format!("{}\n{}\n", r#"{"type":"session_meta","payload":{"id":"s"}}"#, " ".repeat(1100));
    let store = StoreBuilder::new().with_raw_file(".codex/sessions/2026/02/03/rollout-x.jsonl", raw.as_bytes());
    let conversations = ConversationStore::new(store.config());

    let text = content(
        conversations.read_conversation(&store.codex_path("2026/02/03", "rollout-x.jsonl")).unwrap(),
    );
    assert_eq!(text, raw);
}

#[test]
fn test_claude_session_with_malformed_lines() {
    let body = [
        claude_user("first").to_string(),
        "not json at all".to_string(),
        json!({"type": "mystery", "uuid": "x"}).to_string(),
        claude_tool_use("tool_1", "Bash").to_string(),
        claude_tool_result("tool_1", "ok").to_string(),
        claude_tool_result("tool_9", "orphan").to_string(),
        " ".repeat(1100),
    ]
    .join("\n");
    let store = StoreBuilder::new().with_raw_file(".claude/projects/-repo/s.jsonl", body.as_bytes());
    let conversations = ConversationStore::new(store.config());

    let text = content(conversations.read_conversation(&store.claude_path("-repo", "s.jsonl")).unwrap());
    // Native files are handed back untouched
    assert_eq!(text, body);

    let entries = parse_entries(&text);
    assert_eq!(entries.len(), 6);
    assert!(matches!(&entries[1], CanonicalEntry::Error(e) if e.raw == "not json at all"));
    assert!(entries[2].is_error());

    let index = build_tool_index(&entries);
    assert_eq!(index["tool_1"].name, "Bash");
    assert_eq!(index["tool_9"].name, "unknown");
    assert_eq!(index["tool_9"].result, json!("orphan"));
}

#[test]
fn test_invalid_utf8_line_becomes_error_entry() {
    let mut body = claude_user("still readable").to_string().into_bytes();
    body.extend_from_slice(b"\nbroken \xff\xfe line\n");
    body.extend_from_slice(" ".repeat(1100).as_bytes());
    let store = StoreBuilder::new().with_raw_file(".claude/projects/-repo/s.jsonl", &body);
    let conversations = ConversationStore::new(store.config());
    let path = store.claude_path("-repo", "s.jsonl");

    let text = content(conversations.read_conversation(&path).unwrap());
    assert!(text.contains('\u{FFFD}'));

    let entries = parse_entries(&text);
    assert_eq!(entries.len(), 2);
    assert!(matches!(&entries[0], CanonicalEntry::User(_)));
    assert!(matches!(&entries[1], CanonicalEntry::Error(e) if e.raw == "broken \u{FFFD}\u{FFFD} line"));
}

#[test]
fn test_relocated_codex_file_is_sniffed() {
    // A Codex rollout copied into a Claude project directory
    let store = StoreBuilder::new().with_claude_session(
        "-repo",
        "copied.jsonl",
        &[codex_session_meta("s-2", "/repo"), codex_user_message("hello there")],
    );
    let conversations = ConversationStore::new(store.config());

    let entries = parse_entries(&content(
        conversations.read_conversation(&store.claude_path("-repo", "copied.jsonl")).unwrap(),
    ));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].meta().map(|m| m.session_id.as_str()), Some("s-2"));
}

#[test]
fn test_oversized_file_is_refused() {
    let store = StoreBuilder::new().with_claude_session("-repo", "big.jsonl", &[claude_user("x")]);
    let path = store.claude_path("-repo", "big.jsonl");
    let file = fs::File::options().write(true).open(&path).unwrap();
    file.set_len(MAX_READ_SIZE + 1).unwrap();

    let conversations = ConversationStore::new(store.config());
    assert_eq!(
        conversations.read_conversation(&path).unwrap(),
        ReadOutcome::TooLarge { size: MAX_READ_SIZE + 1, limit: MAX_READ_SIZE }
    );
}

#[test]
fn test_failed_read_leaves_listing_intact() {
    let store = StoreBuilder::new().with_claude_session("-repo", "a.jsonl", &[claude_user("x")]);
    let conversations = ConversationStore::new(store.config());
    let before = conversations.list_files(&GroupScope::All);

    let missing = store.claude_path("-repo", "gone.jsonl");
    assert!(conversations.read_conversation(&missing).is_err());
    assert_eq!(conversations.list_files(&GroupScope::All), before);
}

#[tokio::test]
async fn test_async_read_matches_blocking() {
    let store = StoreBuilder::new().with_claude_session("-repo", "a.jsonl", &[claude_user("x")]);
    let conversations = ConversationStore::new(store.config());
    let path = store.claude_path("-repo", "a.jsonl");

    assert_eq!(
        conversations.read_conversation_async(&path).await.unwrap(),
        conversations.read_conversation(&path).unwrap()
    );
}
