#[cfg(test)]
mod tests {
    use crate::compaction::testing::exact_accountant;
    use crate::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct FixedGenerator(&'static str);

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(
            &self,
            _system_prompt: &str,
            _prompt: &str,
            _max_output_tokens: u32,
        ) -> Result<String, CompactionError> {
            Ok(self.0.to_string())
        }
    }

    fn wire_tool(call_id: &str, chars: usize) -> WireMessage {
        WireMessage::tool(vec![WirePart::ToolResult {
            tool_call_id: call_id.to_string(),
            tool_name: "bash".to_string(),
            output: Value::String("x".repeat(chars)),
        }])
    }

    #[test]
    fn round_trip_law_holds_for_uncompacted_messages() {
        let wire = vec![
            WireMessage::user("first question"),
            WireMessage::assistant(vec![
                WirePart::Reasoning {
                    text: "let me think".to_string(),
                },
                WirePart::Text {
                    text: "I'll run a command".to_string(),
                },
                WirePart::ToolCall {
                    tool_call_id: "c1".to_string(),
                    tool_name: "bash".to_string(),
                    input: json!({"command": "cargo check"}),
                },
            ]),
            WireMessage::tool(vec![WirePart::ToolResult {
                tool_call_id: "c1".to_string(),
                tool_name: "bash".to_string(),
                output: json!({"exit_code": 0}),
            }]),
        ];

        let rich = to_rich_batch(&wire, "session-1");
        let back = to_wire_batch(&rich);
        assert_eq!(back, wire);
    }

    #[tokio::test]
    async fn prune_then_recheck_avoids_summarization_entirely() {
        // A transcript whose overflow is entirely explained by stale tool
        // output: the full pipeline resolves it without a provider call.
        let accountant = Arc::new(exact_accountant());
        let preparer = ContextPreparer::new(accountant.clone(), Arc::new(FixedGenerator("nope")));

        let wire = vec![
            WireMessage::user("read the big file"),
            wire_tool("c1", 900),
            WireMessage::user("thanks"),
        ];
        let options = PrepareOptions::new("session-1", "test-model").with_config(CompactionConfig {
            prune_minimum: 50,
            prune_protect: 100,
            output_reserve: 100,
            min_turns_to_keep: 1,
        });

        let result = preparer.prepare_context(&wire, &options).await.unwrap();

        assert!(result.was_pruned);
        assert!(!result.was_compacted);

        let check = accountant.check_overflow(&result.messages, "test-model", Some(100), None);
        assert!(!check.is_overflow);
    }

    #[tokio::test]
    async fn prepared_transcript_stays_loadable_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlTranscriptStore::new(dir.path());
        store.init().await.unwrap();

        let accountant = Arc::new(exact_accountant());
        let preparer = ContextPreparer::new(
            accountant,
            Arc::new(FixedGenerator("summarized earlier work")),
        );

        let wire = vec![
            WireMessage::user("a".repeat(600)),
            WireMessage::assistant(vec![WirePart::Text {
                text: "b".repeat(600),
            }]),
            WireMessage::user("recent"),
        ];
        store.save_transcript("session-1", &wire).await.unwrap();

        let loaded = store.load_transcript("session-1").await.unwrap();
        let options = PrepareOptions::new("session-1", "test-model").with_config(CompactionConfig {
            prune_minimum: 50,
            prune_protect: 100,
            output_reserve: 100,
            min_turns_to_keep: 1,
        });
        let prepared = preparer
            .prepare_context_for_llm(&loaded, &options)
            .await
            .unwrap();

        assert!(prepared.report.was_compacted);
        store
            .save_transcript("session-1", &prepared.messages)
            .await
            .unwrap();

        let reloaded = store.load_transcript("session-1").await.unwrap();
        assert_eq!(reloaded, prepared.messages);
        // Summary text made it through the wire round trip.
        match &reloaded[1].content {
            WireContent::Parts(parts) => {
                assert!(matches!(
                    &parts[0],
                    WirePart::Text { text } if text == "summarized earlier work"
                ));
            }
            WireContent::Text(text) => assert_eq!(text, "summarized earlier work"),
        }
    }

    #[tokio::test]
    async fn interleaved_prior_summary_limits_rescanning() {
        // Boundary condition: a summary sitting mid-transcript stops the
        // prune scan, so older tool output is left alone even when huge.
        let accountant = Arc::new(exact_accountant());

        let mut summary = RichMessage::assistant("session-1", vec![MessagePart::text("old summary")]);
        if let RichMessage::Assistant(m) = &mut summary {
            m.is_summary = true;
        }
        let messages = vec![
            RichMessage::tool(
                "session-1",
                vec![MessagePart::tool_result("c0", "bash", json!("y".repeat(100_000)))],
            ),
            summary,
            RichMessage::user("session-1", "next task"),
            RichMessage::tool(
                "session-1",
                vec![MessagePart::tool_result("c1", "bash", json!("z".repeat(30_000)))],
            ),
            RichMessage::user("session-1", "latest"),
        ];

        let config = CompactionConfig {
            prune_minimum: 100,
            prune_protect: 1_000,
            output_reserve: 100,
            min_turns_to_keep: 1,
        };

        let savings = estimate_prune_savings(&messages, &config, &accountant);
        assert_eq!(savings.outputs_count, 1);

        let outcome = prune_tool_outputs(&messages, &config, &accountant);
        assert_eq!(outcome.outputs_pruned, 1);
        assert!(!outcome.messages[0].parts()[0].is_compacted_tool_result());
        assert!(outcome.messages[3].parts()[0].is_compacted_tool_result());
    }
}
