//! End-to-end tests for pipeline execution.

#[cfg(test)]
mod tests {
    use crate::agents::{
        resource_summary_pipeline, translation_pipeline, ResourceSummary, FETCH_STAGE,
        SUMMARIZE_STAGE,
    };
    use crate::config::{FetchConfig, ModelConfig};
    use crate::context::StageContext;
    use crate::contracts::{FieldType, SchemaContract, StructuredRecord};
    use crate::core::{StageKind, StageStatus, StageValue};
    use crate::errors::{FailureKind, ModelError, PipelineError, StageError, ToolError};
    use crate::events::{
        CollectingEventSink, PIPELINE_COMPLETED, PIPELINE_FAILED, PIPELINE_STARTED,
        STAGE_COMPLETED, STAGE_FAILED, STAGE_STARTED, TOOL_FAILED, TOOL_INVOKED,
    };
    use crate::llm::ModelResponse;
    use crate::pipeline::{PipelineBuilder, PipelineDefinition};
    use crate::stages::{Stage, ToolStage};
    use crate::testing::{
        assert_failed_at, assert_fields_non_empty, assert_sentinel, assert_stage_order,
        FailingStage, FailingTool, RecordingStage, ScriptedModel,
    };
    use crate::tools::{FetchTool, HttpFetcher, Tool};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EXAMPLE_PAGE: &str = "<html><head><title>Example Domain</title></head><body>\
        <h1>Example Domain</h1>\
        <p>This domain is for use in illustrative examples in documents.</p>\
        <p><a href=\"https://www.iana.org/domains/example\">More information...</a></p>\
        </body></html>";

    fn http_fetch_tool() -> Arc<dyn Tool> {
        let config = FetchConfig::new().with_timeout(5.0);
        let fetcher = HttpFetcher::new(&config).unwrap();
        Arc::new(FetchTool::new(Arc::new(fetcher), config))
    }

    fn recording(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Stage> {
        Arc::new(RecordingStage::new(name, Arc::clone(log)))
    }

    fn linear(names: &[&str], log: &Arc<Mutex<Vec<String>>>) -> PipelineDefinition {
        let mut builder = PipelineBuilder::new("linear");
        for name in names {
            builder = builder.stage(recording(name, log)).unwrap();
        }
        builder.build().unwrap()
    }

    /// Declares a contract but emits raw text.
    #[derive(Debug)]
    struct UnconformingStage {
        contract: SchemaContract,
    }

    #[async_trait]
    impl Stage for UnconformingStage {
        fn name(&self) -> &str {
            "unconforming"
        }

        fn kind(&self) -> StageKind {
            StageKind::Transform
        }

        fn output_contract(&self) -> Option<&SchemaContract> {
            Some(&self.contract)
        }

        async fn run(&self, _ctx: &StageContext, input: StageValue) -> Result<StageValue, StageError> {
            Ok(input)
        }
    }

    #[tokio::test]
    async fn test_translation_scenario() {
        let model = Arc::new(ScriptedModel::replying(
            r#"```json
{"source": "Bonjour le monde", "en": "Hello world", "zh_tw": "哈囉，世界"}
```"#,
        ));
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline = translation_pipeline(model, &ModelConfig::default())
            .unwrap()
            .with_event_sink(sink.clone());

        let value = pipeline.run_structured("Bonjour le monde").await.unwrap();

        assert_eq!(value.contract(), "bilingual_text");
        assert_fields_non_empty(&value, &["source", "en", "zh_tw"]);
        assert_eq!(
            sink.event_types(),
            vec![PIPELINE_STARTED, STAGE_STARTED, STAGE_COMPLETED, PIPELINE_COMPLETED]
        );
    }

    #[tokio::test]
    async fn test_resource_summary_scenario_with_reachable_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(EXAMPLE_PAGE, "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/", server.uri());
        let answer = serde_json::json!({
            "url": url,
            "title": "Example Domain",
            "excerpt": "此網域供文件中的範例使用。可自由引用，無需事先許可。",
        })
        .to_string();
        let model = Arc::new(ScriptedModel::new("m").respond_with(move |request| {
            let content = request.last_user_content().unwrap_or_default();
            assert!(content.contains("Example Domain"), "model saw: {content}");
            Ok(ModelResponse::text("m", answer.clone()))
        }));

        let pipeline =
            resource_summary_pipeline(model.clone(), &ModelConfig::default(), http_fetch_tool())
                .unwrap();
        let run = pipeline.run_traced(url.as_str()).await;

        assert_stage_order(&run, &[FETCH_STAGE, SUMMARIZE_STAGE]);
        assert!(!run.record(FETCH_STAGE).unwrap().sentinel);
        assert_eq!(run.record(FETCH_STAGE).unwrap().kind, StageKind::Tool);

        let value = run.into_output().unwrap();
        let summary = ResourceSummary::from_structured(value.as_structured().unwrap()).unwrap();
        assert_eq!(summary.url, url);
        assert_eq!(summary.title, "Example Domain");

        let requests = model.requests();
        let fetched = requests[0].last_user_content().unwrap();
        assert!(fetched.starts_with("Title: Example Domain"));
        assert!(!fetched.contains("<p>"));
    }

    /// Either the model reports the failure in the excerpt, or the run fails
    /// with a schema violation at the summary stage. Nothing else is allowed.
    async fn assert_unreachable_outcome(url: &str, model_reply: &str) {
        let model = Arc::new(ScriptedModel::replying(model_reply));
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline =
            resource_summary_pipeline(model.clone(), &ModelConfig::default(), http_fetch_tool())
                .unwrap()
                .with_event_sink(sink.clone());

        let run = pipeline.run_traced(url).await;
        assert!(run.record(FETCH_STAGE).unwrap().sentinel);
        assert_eq!(sink.events_of_type(TOOL_FAILED).len(), 1);

        let requests = model.requests();
        let seen = StageValue::raw(requests[0].last_user_content().unwrap());
        assert_sentinel(&seen);

        match run.output {
            Ok(value) => {
                let summary =
                    ResourceSummary::from_structured(value.as_structured().unwrap()).unwrap();
                assert!(
                    summary.excerpt.contains("無法") || summary.excerpt.contains("失敗"),
                    "excerpt does not report the failure: {}",
                    summary.excerpt
                );
            }
            Err(ref err) => assert_failed_at(err, SUMMARIZE_STAGE, FailureKind::SchemaViolation),
        }
    }

    #[tokio::test]
    async fn test_unresolvable_host_reported_in_excerpt() {
        let reply = serde_json::json!({
            "url": "https://nonexistent.invalid/",
            "title": "https://nonexistent.invalid/",
            "excerpt": "無法取得此網頁：連線失敗。",
        })
        .to_string();
        assert_unreachable_outcome("https://nonexistent.invalid/", &reply).await;
    }

    #[tokio::test]
    async fn test_unresolvable_host_schema_violation() {
        assert_unreachable_outcome(
            "https://nonexistent.invalid/",
            "The page could not be fetched, so there is nothing to summarize.",
        )
        .await;
    }

    #[tokio::test]
    async fn test_refused_connection_schema_violation() {
        assert_unreachable_outcome(
            "http://127.0.0.1:1/",
            r#"{"url": "http://127.0.0.1:1/", "title": "", "excerpt": ""}"#,
        )
        .await;
    }

    #[tokio::test]
    async fn test_stages_run_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = linear(&["c", "a", "b"], &log);

        let run = pipeline.run_traced("seed").await;

        assert_stage_order(&run, &["c", "a", "b"]);
        assert_eq!(*log.lock(), vec!["c#0", "a#1", "b#2"]);
        assert_eq!(run.into_output().unwrap(), StageValue::raw("seed > c > a > b"));
    }

    #[tokio::test]
    async fn test_concurrent_runs_share_a_definition() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = linear(&["a", "b"], &log);

        let runs = futures::future::join_all(
            (0..5).map(|i| pipeline.run_traced(format!("in{i}"))),
        )
        .await;

        for (i, run) in runs.iter().enumerate() {
            assert_eq!(
                run.output.as_ref().unwrap(),
                &StageValue::raw(format!("in{i} > a > b"))
            );
        }
        let mut ids: Vec<_> = runs.iter().map(|r| r.identity.pipeline_run_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        assert_eq!(log.lock().len(), 10);
    }

    #[tokio::test]
    async fn test_hard_error_aborts_remaining_stages() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing = FailingStage::new(
            "b",
            StageError::ModelInvocation(ModelError::Transport("connection reset".to_string())),
        )
        .with_log(Arc::clone(&log));
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline = PipelineBuilder::new("abort")
            .stage(recording("a", &log))
            .unwrap()
            .stage(Arc::new(failing))
            .unwrap()
            .stage(recording("c", &log))
            .unwrap()
            .build()
            .unwrap()
            .with_event_sink(sink.clone());

        let run = pipeline.run_traced("seed").await;

        assert_eq!(*log.lock(), vec!["a#0", "b#1"]);
        assert_stage_order(&run, &["a", "b"]);
        assert_eq!(run.records[1].status, StageStatus::Fail);

        let err = run.into_output().unwrap_err();
        assert_failed_at(&err, "b", FailureKind::ModelInvocation);
        match err {
            PipelineError::StageFailed {
                ref pipeline,
                index,
                ..
            } => {
                assert_eq!(pipeline, "abort");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(sink.events_of_type(STAGE_FAILED).len(), 1);
        assert_eq!(sink.events_of_type(PIPELINE_FAILED).len(), 1);
        assert!(sink
            .events_of_type(STAGE_STARTED)
            .iter()
            .all(|e| e.field("stage") != Some(&serde_json::json!("c"))));
    }

    #[tokio::test]
    async fn test_tool_failure_does_not_abort() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let tool = FailingTool::new(
            "fetch_url",
            ToolError::http_status("fetch_url", 503, "https://down.example/"),
        );
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline = PipelineBuilder::new("contained")
            .stage(Arc::new(ToolStage::new("fetch", Arc::new(tool), "url")))
            .unwrap()
            .stage(recording("after", &log))
            .unwrap()
            .build()
            .unwrap()
            .with_event_sink(sink.clone());

        let run = pipeline.run_traced("https://down.example/").await;

        assert!(run.succeeded());
        assert!(run.records[0].sentinel);
        assert_eq!(*log.lock(), vec!["after#1"]);
        assert_eq!(sink.events_of_type(TOOL_INVOKED).len(), 1);
        assert_eq!(
            sink.events_of_type(TOOL_FAILED)[0].field("error_type"),
            Some(&serde_json::json!("ToolHttpStatus"))
        );
        assert_eq!(
            run.into_output().unwrap(),
            StageValue::raw("[ERROR] fetch_url: HTTP 503 from https://down.example/ > after")
        );
    }

    #[tokio::test]
    async fn test_final_contract_rechecked_at_boundary() {
        let contract = SchemaContract::new("note", "").field("body", FieldType::NonEmptyString, "");
        let pipeline = PipelineBuilder::new("boundary")
            .stage(Arc::new(UnconformingStage { contract }))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(pipeline.output_contract().map(SchemaContract::name), Some("note"));

        let err = pipeline.run("plain text").await.unwrap_err();
        assert_failed_at(&err, "unconforming", FailureKind::SchemaViolation);
        assert!(err.validation_error().unwrap().malformed.is_some());
    }

    #[tokio::test]
    async fn test_run_structured_rejects_raw_output() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let err = linear(&["only"], &log)
            .run_structured("text")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UnstructuredOutput { .. }));
        assert_eq!(err.kind(), FailureKind::UnstructuredOutput);
        assert_eq!(err.stage(), "only");
    }
}
