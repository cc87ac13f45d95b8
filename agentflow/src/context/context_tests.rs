//! Tests for the stage context.

#[cfg(test)]
mod tests {
    use crate::context::{RunIdentity, StageContext};
    use crate::errors::ToolError;
    use crate::events::{CollectingEventSink, TOOL_COMPLETED, TOOL_FAILED, TOOL_INVOKED};
    use crate::testing::{FailingTool, StaticTool};
    use crate::tools::ToolRegistry;
    use std::sync::Arc;

    fn context(sink: Arc<CollectingEventSink>) -> StageContext {
        StageContext::new(RunIdentity::new(), "summary", "fetch", 0, sink)
    }

    #[test]
    fn test_events_are_enriched() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = context(sink.clone());

        ctx.try_emit_event("custom", serde_json::json!({"k": 1}));
        ctx.try_emit_event("scalar", serde_json::json!(5));

        let events = sink.events();
        assert_eq!(events[0].field("k"), Some(&serde_json::json!(1)));
        assert_eq!(events[0].field("pipeline"), Some(&serde_json::json!("summary")));
        assert_eq!(events[0].field("stage"), Some(&serde_json::json!("fetch")));
        assert_eq!(
            events[0].field("pipeline_run_id"),
            Some(&serde_json::json!(ctx.pipeline_run_id().to_string()))
        );
        assert_eq!(events[1].field("value"), Some(&serde_json::json!(5)));
    }

    #[tokio::test]
    async fn test_tool_success_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = context(sink.clone());
        let tool = StaticTool::new("echo", "hello");

        let output = ctx.invoke_tool(&tool, serde_json::json!({})).await;
        assert!(!output.is_failure());
        assert_eq!(sink.event_types(), vec![TOOL_INVOKED, TOOL_COMPLETED]);
        assert_eq!(sink.events()[1].field("chars"), Some(&serde_json::json!(5)));
    }

    #[tokio::test]
    async fn test_tool_failure_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = context(sink.clone());
        let registry = ToolRegistry::new().with_tool(Arc::new(FailingTool::new(
            "flaky",
            ToolError::execution_failed("flaky", "boom"),
        )));

        let output = ctx
            .invoke_registered(&registry, "flaky", serde_json::json!({}))
            .await;
        assert!(output.is_failure());

        let missing = ctx
            .invoke_registered(&registry, "nope", serde_json::json!({}))
            .await;
        assert!(missing.into_raw_content().is_failure_sentinel());

        assert_eq!(
            sink.event_types(),
            vec![TOOL_INVOKED, TOOL_FAILED, TOOL_INVOKED, TOOL_FAILED]
        );
        assert_eq!(sink.events()[1].field("cause"), Some(&serde_json::json!("boom")));
        assert_eq!(
            sink.events()[3].field("error_type"),
            Some(&serde_json::json!("ToolNotFound"))
        );
    }

    #[test]
    fn test_detached_context() {
        let ctx = StageContext::detached("translate");
        assert_eq!(ctx.stage_name(), "translate");
        assert_eq!(ctx.index(), 0);
        ctx.try_emit_event("ignored", serde_json::Value::Null);
        assert!(format!("{ctx:?}").contains("translate"));
    }
}
