use catalyst_ops::assistant::{Assistant, TurnAction, Workflow};
use catalyst_ops::llm::{MockContextStore, MockLanguageModel, WorkflowCall};
use catalyst_ops::pipeline::{MockPipelineTrigger, TriggerOutcome};
use serde_json::json;

#[tokio::test]
async fn matched_workflow_is_planned_and_triggers_the_pipeline() {
    let mut model = MockLanguageModel::new();
    model.expect_select_workflow().returning(|_, catalog| {
        assert_eq!(catalog.len(), 3, "the full catalog goes to the model");
        Ok(Some(WorkflowCall {
            name: "software_distribution".to_string(),
            arguments: json!({ "hostname": "PDX-RN" }),
        }))
    });
    let retrieval = MockContextStore::new();
    let mut pipeline = MockPipelineTrigger::new();
    pipeline
        .expect_trigger()
        .withf(|workflow, params| {
            *workflow == Workflow::SoftwareDistribution
                && params.contains(&("hostname".to_string(), "PDX-RN".to_string()))
        })
        .times(1)
        .returning(|workflow, _| {
            Ok(TriggerOutcome::Started {
                status_url: format!("https://jenkins.example.com/job/{}/", workflow.job_path()),
            })
        });

    let assistant = Assistant::new(&model, &retrieval, &pipeline);
    let action = assistant
        .plan_turn("please upgrade PDX-RN")
        .await
        .expect("planning should succeed");

    let (workflow, arguments) = match action {
        TurnAction::RunWorkflow {
            workflow,
            arguments,
        } => (workflow, arguments),
        TurnAction::Answer(answer) => panic!("expected a workflow, got answer: {answer}"),
    };
    assert_eq!(workflow, Workflow::SoftwareDistribution);

    let outcome = assistant
        .execute(workflow, &arguments)
        .await
        .expect("trigger should succeed");
    assert!(matches!(outcome, TriggerOutcome::Started { .. }));
}

#[tokio::test]
async fn unmatched_input_falls_back_to_retrieval_and_answer() {
    let mut model = MockLanguageModel::new();
    model.expect_select_workflow().returning(|_, _| Ok(None));
    model.expect_answer().returning(|question, context| {
        assert_eq!(context.len(), 2);
        Ok(format!("answer to: {question}"))
    });
    let mut retrieval = MockContextStore::new();
    retrieval.expect_similar().withf(|_, k| *k == 6).returning(|_, _| {
        Ok(vec![
            "controller release notes".to_string(),
            "upgrade guide".to_string(),
        ])
    });
    let pipeline = MockPipelineTrigger::new();

    let assistant = Assistant::new(&model, &retrieval, &pipeline);
    let action = assistant
        .plan_turn("what is a golden image?")
        .await
        .expect("planning should succeed");
    match action {
        TurnAction::Answer(answer) => {
            assert_eq!(answer, "answer to: what is a golden image?");
        }
        TurnAction::RunWorkflow { workflow, .. } => {
            panic!("expected an answer, got workflow {workflow:?}");
        }
    }
}

#[tokio::test]
async fn unknown_workflow_name_never_dispatches() {
    let mut model = MockLanguageModel::new();
    model.expect_select_workflow().returning(|_, _| {
        Ok(Some(WorkflowCall {
            name: "wipe_all_configs".to_string(),
            arguments: json!({}),
        }))
    });
    model
        .expect_answer()
        .returning(|_, _| Ok("no such workflow".to_string()));
    let mut retrieval = MockContextStore::new();
    retrieval
        .expect_similar()
        .returning(|_, _| Ok(vec!["doc".to_string()]));
    // No trigger expectation: dispatching here would panic the mock.
    let pipeline = MockPipelineTrigger::new();

    let assistant = Assistant::new(&model, &retrieval, &pipeline);
    let action = assistant
        .plan_turn("wipe all configs")
        .await
        .expect("planning should fall back, not fail");
    assert!(matches!(action, TurnAction::Answer(_)));
}

#[tokio::test]
async fn pipeline_rejection_is_reported_not_an_error() {
    let mut model = MockLanguageModel::new();
    model.expect_select_workflow().returning(|_, _| {
        Ok(Some(WorkflowCall {
            name: "add_device".to_string(),
            arguments: json!({ "device_ip_address": "10.93.141.23" }),
        }))
    });
    let retrieval = MockContextStore::new();
    let mut pipeline = MockPipelineTrigger::new();
    pipeline
        .expect_trigger()
        .returning(|_, _| Ok(TriggerOutcome::NotStarted { status: 403 }));

    let assistant = Assistant::new(&model, &retrieval, &pipeline);
    let action = assistant.plan_turn("add device 10.93.141.23").await.unwrap();
    let (workflow, arguments) = match action {
        TurnAction::RunWorkflow {
            workflow,
            arguments,
        } => (workflow, arguments),
        _ => panic!("expected workflow"),
    };
    assert_eq!(workflow, Workflow::AddDevice);

    let outcome = assistant.execute(workflow, &arguments).await.unwrap();
    assert_eq!(outcome, TriggerOutcome::NotStarted { status: 403 });
}
