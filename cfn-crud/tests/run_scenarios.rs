//! Full runs against the scripted provider.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cfn_crud::core::{StackEvent, StackOperationOutcome, StackOutput, StackStatus};
use cfn_crud::errors::{CrudError, Operation};
use cfn_crud::events::{self, CollectingEventSink};
use cfn_crud::lifecycle::Poller;
use cfn_crud::provider::ProviderError;
use cfn_crud::run::{RunReport, StackRun};
use cfn_crud::testing::{
    DefinitionFixture, ProviderCall, RecordingSleeper, ScriptedStackProvider, TemplateFixture,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

struct Scenario {
    dir: TempDir,
    provider: Arc<ScriptedStackProvider>,
    sleeper: Arc<RecordingSleeper>,
    sink: Arc<CollectingEventSink>,
}

impl Scenario {
    fn new(provider: ScriptedStackProvider) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            provider: Arc::new(provider),
            sleeper: Arc::new(RecordingSleeper::new()),
            sink: Arc::new(CollectingEventSink::new()),
        }
    }

    fn write(&self, name: &str, contents: &str) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path.display().to_string()
    }

    fn template(&self, name: &str, template: &TemplateFixture) -> String {
        self.write(name, &template.to_json())
    }

    fn definition(&self, definition: &DefinitionFixture) -> PathBuf {
        PathBuf::from(self.write("definition.json", &definition.to_json()))
    }

    async fn run(&self, definition: &Path) -> Result<RunReport, CrudError> {
        StackRun::new(self.provider.clone())
            .with_poller(Poller::new(self.sleeper.clone(), Duration::from_secs(5)))
            .with_event_sink(self.sink.clone())
            .execute_file(definition)
            .await
    }

    fn request(&self, stack: &str) -> Option<cfn_crud::provider::StackRequest> {
        self.provider
            .mutations()
            .into_iter()
            .find_map(|call| match call {
                ProviderCall::CreateStack(request) | ProviderCall::UpdateStack(request)
                    if request.stack_name == stack =>
                {
                    Some(request)
                }
                _ => None,
            })
    }
}

#[tokio::test]
async fn test_identical_values_from_every_source_collapse_to_one_entry() {
    let scenario = Scenario::new(ScriptedStackProvider::new().with_existing_stack(
        "shared",
        StackStatus::CreateComplete,
        vec![StackOutput::new("Env", "prod")],
    ));
    let params = scenario.write(
        "params.json",
        &json!([{"ParameterKey": "Env", "ParameterValue": "prod"}]).to_string(),
    );
    let definition = scenario.definition(
        &DefinitionFixture::new()
            .with_file("common", &params)
            .with_existing_stack("shared")
            .with_pair("Env", "prod")
            .with_pair("Env", "prod"),
    );

    let report = scenario.run(&definition).await.unwrap();

    assert_eq!(report.parameters.pool().len(), 1);
    assert_eq!(report.parameters.get("Env"), Some("prod"));
    assert!(report.parameters.conflicts().is_empty());
    assert!(scenario.sink.events_of_type(events::PARAMETER_CONFLICT).is_empty());
}

#[tokio::test]
async fn test_conflicting_inline_pairs_are_quarantined_in_order() {
    let scenario = Scenario::new(ScriptedStackProvider::new());
    let definition = scenario.definition(
        &DefinitionFixture::new()
            .with_pair("K", "A")
            .with_pair("K", "B")
            .with_pair("K", "A"),
    );

    let report = scenario.run(&definition).await.unwrap();

    assert_eq!(report.parameters.get("K"), None);
    assert_eq!(
        report.parameters.conflicting_values("K"),
        Some(&["A".to_string(), "B".to_string(), "A".to_string()][..])
    );
    assert_eq!(scenario.sink.events_of_type(events::PARAMETER_CONFLICT).len(), 2);
}

#[tokio::test]
async fn test_conflicted_key_surfaces_as_missing_parameter() {
    let scenario = Scenario::new(ScriptedStackProvider::new());
    let template = scenario.template("app.json", &TemplateFixture::new().with_parameter("K"));
    let definition = scenario.definition(
        &DefinitionFixture::new()
            .with_pair("K", "A")
            .with_pair("K", "B")
            .with_stack("app", &template),
    );

    let err = scenario.run(&definition).await.unwrap_err();

    match err {
        CrudError::MissingParameters(e) => {
            assert_eq!(e.stack, "app");
            assert_eq!(e.missing, vec!["K".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(scenario.provider.mutations().is_empty());
}

#[tokio::test]
async fn test_template_default_fills_unset_parameter() {
    let scenario = Scenario::new(ScriptedStackProvider::new());
    let template = scenario.template(
        "app.json",
        &TemplateFixture::new()
            .with_default("InstanceType", "t3.micro")
            .with_parameter("Env"),
    );
    let definition = scenario.definition(
        &DefinitionFixture::new()
            .with_pair("Env", "dev")
            .with_stack("app", &template),
    );

    scenario.run(&definition).await.unwrap();

    let mut parameters: Vec<(String, String)> = scenario
        .request("app")
        .unwrap()
        .parameters
        .into_iter()
        .map(|p| (p.key, p.value))
        .collect();
    parameters.sort();
    assert_eq!(
        parameters,
        vec![
            ("Env".to_string(), "dev".to_string()),
            ("InstanceType".to_string(), "t3.micro".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_create_polls_four_times_and_merges_outputs() {
    let scenario = Scenario::new(
        ScriptedStackProvider::new()
            .with_operation_statuses(
                "vpc",
                vec![
                    StackStatus::CreateInProgress,
                    StackStatus::CreateInProgress,
                    StackStatus::CreateInProgress,
                    StackStatus::CreateComplete,
                ],
            )
            .with_outputs("vpc", vec![StackOutput::new("VpcId", "vpc-0abc")]),
    );
    let template = scenario.template("vpc.json", &TemplateFixture::new());
    let definition = scenario.definition(&DefinitionFixture::new().with_stack("vpc", &template));

    let report = scenario.run(&definition).await.unwrap();

    let entry = report.entry("vpc", Operation::Create).unwrap();
    assert_eq!(
        entry.outcome,
        StackOperationOutcome::succeeded(vec![cfn_crud::core::ParameterRecord::new(
            "VpcId", "vpc-0abc"
        )])
    );
    assert_eq!(report.parameters.get("VpcId"), Some("vpc-0abc"));
    assert_eq!(scenario.sleeper.count(), 3);
    assert_eq!(scenario.sink.events_of_type(events::STACK_POLL).len(), 4);
}

#[tokio::test]
async fn test_outputs_stay_out_of_the_pool_when_disabled() {
    let scenario = Scenario::new(
        ScriptedStackProvider::new().with_outputs("vpc", vec![StackOutput::new("VpcId", "vpc-1")]),
    );
    let template = scenario.template("vpc.json", &TemplateFixture::new());
    let definition = scenario.definition(&DefinitionFixture::new().with_stack_properties(
        "vpc",
        json!({"Template": template, "AddOutputsToParameters": false}),
    ));

    let report = scenario.run(&definition).await.unwrap();

    assert_eq!(report.parameters.get("VpcId"), None);
}

#[tokio::test]
async fn test_nested_resource_events_do_not_end_polling() {
    let scenario = Scenario::new(ScriptedStackProvider::new().with_operation_events(
        "app",
        vec![
            StackEvent::for_stack("e1", "app", StackStatus::CreateInProgress),
            StackEvent::for_resource(
                "e2",
                "app",
                "Child",
                "AWS::CloudFormation::Stack",
                StackStatus::CreateComplete,
            ),
            StackEvent::for_resource("e3", "app", "Queue", "AWS::SQS::Queue", StackStatus::CreateFailed),
            StackEvent::for_stack("e4", "app", StackStatus::CreateComplete),
        ],
    ));
    let template = scenario.template("app.json", &TemplateFixture::new());
    let definition = scenario.definition(&DefinitionFixture::new().with_stack("app", &template));

    let report = scenario.run(&definition).await.unwrap();

    assert!(matches!(
        report.entry("app", Operation::Create).unwrap().outcome,
        StackOperationOutcome::Succeeded { .. }
    ));
    assert_eq!(scenario.sleeper.count(), 3);
}

#[tokio::test]
async fn test_no_updates_is_a_successful_no_op_and_the_run_continues() {
    let scenario = Scenario::new(
        ScriptedStackProvider::new()
            .with_existing_stack("api", StackStatus::UpdateComplete, Vec::new())
            .with_no_updates("api"),
    );
    let api = scenario.template("api.json", &TemplateFixture::new());
    let worker = scenario.template("worker.json", &TemplateFixture::new());
    let definition = scenario.definition(
        &DefinitionFixture::new()
            .with_stack("api", &api)
            .with_stack("worker", &worker),
    );

    let report = scenario.run(&definition).await.unwrap();

    assert_eq!(
        report.entry("api", Operation::Update).unwrap().outcome,
        StackOperationOutcome::NoOpSucceeded
    );
    assert!(report.entry("worker", Operation::Create).is_some());
    assert_eq!(scenario.sink.events_of_type(events::STACK_NOOP).len(), 1);
    // Only the worker create is polled.
    assert_eq!(scenario.sleeper.count(), 1);
}

#[tokio::test]
async fn test_stack_in_progress_is_not_modifiable() {
    let scenario = Scenario::new(ScriptedStackProvider::new().with_existing_stack(
        "busy",
        StackStatus::UpdateInProgress,
        Vec::new(),
    ));
    let template = scenario.template("busy.json", &TemplateFixture::new());
    let definition = scenario.definition(&DefinitionFixture::new().with_stack("busy", &template));

    let err = scenario.run(&definition).await.unwrap_err();

    assert!(matches!(err, CrudError::StackNotModifiable(ref e) if e.stack == "busy"));
    assert!(scenario.provider.mutations().is_empty());
}

#[tokio::test]
async fn test_rollback_complete_stops_the_run() {
    let scenario = Scenario::new(ScriptedStackProvider::new().with_operation_statuses(
        "db",
        vec![
            StackStatus::CreateInProgress,
            StackStatus::RollbackInProgress,
            StackStatus::RollbackComplete,
        ],
    ));
    let db = scenario.template("db.json", &TemplateFixture::new());
    let app = scenario.template("app.json", &TemplateFixture::new());
    let definition = scenario.definition(
        &DefinitionFixture::new()
            .with_stack("db", &db)
            .with_stack("app", &app)
            .with_deletion("legacy"),
    );

    let err = scenario.run(&definition).await.unwrap_err();

    assert!(matches!(
        err,
        CrudError::OperationFailed(ref e) if e.status == StackStatus::RollbackComplete
    ));
    assert!(scenario.request("app").is_none());
    assert_eq!(scenario.sink.events_of_type(events::STACK_FAILED).len(), 1);
    assert!(scenario.sink.events_of_type(events::RUN_COMPLETED).is_empty());
}

#[tokio::test]
async fn test_deleting_absent_stack_makes_no_request() {
    let scenario = Scenario::new(ScriptedStackProvider::new().with_existing_stack(
        "old",
        StackStatus::CreateComplete,
        Vec::new(),
    ));
    let definition = scenario.definition(
        &DefinitionFixture::new()
            .with_deletion("ghost")
            .with_deletion("old"),
    );

    let report = scenario.run(&definition).await.unwrap();

    assert_eq!(
        report.entry("ghost", Operation::Delete).unwrap().outcome,
        StackOperationOutcome::Skipped
    );
    assert!(scenario.provider.calls_for("ghost").is_empty());
    assert_eq!(
        scenario.provider.mutations(),
        vec![ProviderCall::DeleteStack("old".into())]
    );
}

#[tokio::test]
async fn test_unresolvable_existing_stack_is_skipped() {
    let scenario = Scenario::new(ScriptedStackProvider::new().with_existing_stack(
        "shared",
        StackStatus::CreateComplete,
        vec![StackOutput::new("SubnetId", "subnet-1")],
    ));
    let definition = scenario.definition(
        &DefinitionFixture::new()
            .with_existing_stack("missing")
            .with_existing_stack("shared"),
    );

    let report = scenario.run(&definition).await.unwrap();

    assert_eq!(report.parameters.get("SubnetId"), Some("subnet-1"));
    let skipped = scenario.sink.events_of_type(events::PARAMETER_SOURCE_SKIPPED);
    assert_eq!(skipped.len(), 1);
    assert_eq!(
        skipped[0].1.as_ref().unwrap()["reason"],
        json!("unresolvable_stack")
    );
}

#[tokio::test]
async fn test_sources_are_ingested_files_then_stacks_then_pairs() {
    let scenario = Scenario::new(ScriptedStackProvider::new().with_existing_stack(
        "shared",
        StackStatus::CreateComplete,
        vec![StackOutput::new("K", "stack")],
    ));
    let params = scenario.write(
        "params.json",
        &json!([{"ParameterKey": "K", "ParameterValue": "file"}]).to_string(),
    );
    let definition = scenario.definition(
        &DefinitionFixture::new()
            .with_pair("K", "pair")
            .with_existing_stack("shared")
            .with_file("common", &params),
    );

    let report = scenario.run(&definition).await.unwrap();

    assert_eq!(report.parameters.get("K"), None);
    assert_eq!(
        report.parameters.conflicting_values("K"),
        Some(&["file".to_string(), "stack".to_string(), "pair".to_string()][..])
    );
}

#[tokio::test]
async fn test_existing_stack_access_denied_is_skipped() {
    let scenario = Scenario::new(
        ScriptedStackProvider::new()
            .with_existing_stack(
                "shared",
                StackStatus::CreateComplete,
                vec![StackOutput::new("SubnetId", "subnet-1")],
            )
            .with_describe_error(
                "shared",
                ProviderError::new("AccessDenied", "not authorized to describe shared"),
            ),
    );
    let definition = scenario.definition(&DefinitionFixture::new().with_existing_stack("shared"));

    let report = scenario.run(&definition).await.unwrap();

    assert!(report.parameters.pool().is_empty());
    let skipped = scenario.sink.events_of_type(events::PARAMETER_SOURCE_SKIPPED);
    assert_eq!(skipped.len(), 1);
    assert_eq!(
        skipped[0].1.clone().unwrap(),
        json!({"source": "stack:shared", "reason": "unresolvable_stack", "code": "AccessDenied"})
    );
}

#[tokio::test]
async fn test_malformed_inline_payload_is_skipped() {
    let scenario = Scenario::new(ScriptedStackProvider::new());
    let definition = scenario.definition(
        &DefinitionFixture::new()
            .with_raw_pair(json!({"Key": "Env", "Value": "dev"}))
            .with_pair("Region", "eu-west-1"),
    );

    let report = scenario.run(&definition).await.unwrap();

    assert_eq!(report.parameters.pool().len(), 1);
    assert_eq!(
        scenario
            .sink
            .events_of_type(events::PARAMETER_SOURCE_SKIPPED)
            .len(),
        1
    );
}

#[tokio::test]
async fn test_invalid_definition_element_aborts_before_provider_calls() {
    let scenario = Scenario::new(ScriptedStackProvider::new());
    let path = PathBuf::from(scenario.write(
        "definition.json",
        &json!({"Parameters": {"ExistingStacks": [{"a": {}, "b": {}}]}}).to_string(),
    ));

    let err = scenario.run(&path).await.unwrap_err();

    assert!(matches!(err, CrudError::Definition(_)));
    assert!(scenario.provider.calls().is_empty());
}

#[tokio::test]
async fn test_yaml_definition_and_template_are_accepted() {
    let scenario = Scenario::new(ScriptedStackProvider::new());
    let template = scenario.write(
        "bucket.yaml",
        "Parameters:\n  BucketName:\n    Type: String\n    Default: logs\nResources:\n  Bucket:\n    Type: AWS::S3::Bucket\n    Properties:\n      BucketName: !Ref BucketName\n",
    );
    let definition = PathBuf::from(scenario.write(
        "definition.yml",
        &format!(
            "StacksToCreateOrUpdate:\n  - bucket:\n      Properties:\n        Template: file://{template}\n        Capabilities: [CAPABILITY_IAM]\n"
        ),
    ));

    let report = scenario.run(&definition).await.unwrap();

    assert!(report.entry("bucket", Operation::Create).is_some());
    let request = scenario.request("bucket").unwrap();
    assert_eq!(request.capabilities, vec!["CAPABILITY_IAM".to_string()]);
    assert_eq!(request.parameters[0].value, "logs");
}
