//! Conversational dispatcher: maps free-text requests onto a closed set of
//! automation workflows, or falls back to retrieval-augmented answering.
//!
//! Dispatch is a closed enum: the model proposes a workflow *name*, and only
//! names that map onto [`Workflow`] variants can trigger anything. Each turn
//! is independent; there is no conversation memory.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::llm::{ContextStore, LanguageModel};
use crate::pipeline::{PipelineTrigger, TriggerOutcome};

/// Number of similar documents pulled in for the retrieval fallback.
pub const RETRIEVAL_MATCHES: usize = 6;

/// The closed set of workflows the assistant can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    AddDevice,
    ProvisionDevice,
    SoftwareDistribution,
}

impl Workflow {
    /// The workflow's catalog name, as presented to the model.
    pub fn name(self) -> &'static str {
        match self {
            Workflow::AddDevice => "add_device",
            Workflow::ProvisionDevice => "provision_network_device",
            Workflow::SoftwareDistribution => "software_distribution",
        }
    }

    /// Maps a model-proposed name back onto the enum. Unknown names never
    /// dispatch.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "add_device" => Some(Workflow::AddDevice),
            "provision_network_device" => Some(Workflow::ProvisionDevice),
            "software_distribution" => Some(Workflow::SoftwareDistribution),
            _ => None,
        }
    }

    /// URL path segment of the CI job that runs this workflow.
    pub fn job_path(self) -> &'static str {
        match self {
            Workflow::AddDevice => "Add%20Device",
            Workflow::ProvisionDevice => "Provision%20Device",
            Workflow::SoftwareDistribution => "Software%20Distribution",
        }
    }
}

/// Static function-calling catalog handed to the model: one schema per
/// workflow, with a natural-language description and parameter schema.
pub fn workflow_catalog() -> Vec<Value> {
    vec![
        serde_json::json!({
            "name": Workflow::AddDevice.name(),
            "description": "Add a new network device, switch or router, to the controller \
                inventory. Call this when the user asks to add a device, node or host to the \
                inventory while providing the IP address the controller will use to manage it. \
                For example: 'add device'.",
            "parameters": {
                "type": "object",
                "properties": {
                    "device_ip_address": {
                        "type": "string",
                        "description": "The device IP address that will be used to manage the device"
                    }
                },
                "required": ["device_ip_address"],
                "additionalProperties": false
            }
        }),
        serde_json::json!({
            "name": Workflow::ProvisionDevice.name(),
            "description": "Provision a network device to a site. Call this whenever a device \
                needs to be provisioned to a location. For example: 'provision a network device \
                to a site'.",
            "parameters": {
                "type": "object",
                "properties": {
                    "hostname": {
                        "type": "string",
                        "description": "The device name or hostname"
                    },
                    "siteHierarchy": {
                        "type": "string",
                        "description": "The site hierarchy, or site name, where the device will be provisioned"
                    }
                },
                "required": ["hostname", "siteHierarchy"],
                "additionalProperties": false
            }
        }),
        serde_json::json!({
            "name": Workflow::SoftwareDistribution.name(),
            "description": "Start a software upgrade for a device: distribute the golden image \
                designated for the device and its site. Call this whenever the user asks for a \
                software upgrade or image distribution. For example: 'software distribution'.",
            "parameters": {
                "type": "object",
                "properties": {
                    "hostname": {
                        "type": "string",
                        "description": "The device name or hostname"
                    }
                },
                "required": ["hostname"],
                "additionalProperties": false
            }
        }),
    ]
}

/// Flattens the model's extracted arguments into build parameters.
pub fn workflow_params(arguments: &Value) -> Vec<(String, String)> {
    match arguments.as_object() {
        Some(map) => map
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect(),
        None => Vec::new(),
    }
}

/// What one turn resolved to, before any confirmation.
#[derive(Debug)]
pub enum TurnAction {
    /// The model matched a known workflow and extracted its parameters.
    RunWorkflow {
        workflow: Workflow,
        arguments: Value,
    },
    /// No workflow matched; a retrieval-augmented answer was generated.
    Answer(String),
}

/// The dispatcher: classification, retrieval fallback, and pipeline trigger
/// behind trait seams so every piece mocks cleanly.
pub struct Assistant<'a> {
    model: &'a dyn LanguageModel,
    retrieval: &'a dyn ContextStore,
    pipeline: &'a dyn PipelineTrigger,
}

impl<'a> Assistant<'a> {
    pub fn new(
        model: &'a dyn LanguageModel,
        retrieval: &'a dyn ContextStore,
        pipeline: &'a dyn PipelineTrigger,
    ) -> Self {
        Self {
            model,
            retrieval,
            pipeline,
        }
    }

    /// Classifies one user turn. A workflow match wins; anything else goes
    /// through retrieval plus answer generation.
    pub async fn plan_turn(&self, input: &str) -> Result<TurnAction> {
        let catalog = workflow_catalog();
        let selected = self
            .model
            .select_workflow(input, &catalog)
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .context("workflow classification")?;

        if let Some(call) = selected {
            match Workflow::from_name(&call.name) {
                Some(workflow) => {
                    info!(workflow = workflow.name(), "[ASSIST] Workflow identified");
                    return Ok(TurnAction::RunWorkflow {
                        workflow,
                        arguments: call.arguments,
                    });
                }
                None => {
                    warn!(name = %call.name, "[ASSIST] Model proposed an unknown workflow, falling back to retrieval");
                }
            }
        }

        let context = self
            .retrieval
            .similar(input, RETRIEVAL_MATCHES)
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .context("similarity search")?;
        let answer = self
            .model
            .answer(input, &context)
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .context("answer generation")?;
        Ok(TurnAction::Answer(answer))
    }

    /// Triggers the CI pipeline for a confirmed workflow.
    pub async fn execute(&self, workflow: Workflow, arguments: &Value) -> Result<TriggerOutcome> {
        let params = workflow_params(arguments);
        self.pipeline
            .trigger(workflow, &params)
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .context("pipeline trigger")
    }
}

/// Interactive loop over stdin/stdout. Blank input is skipped; `exit`,
/// `quit` or `q` ends the session. A matched workflow is echoed with its
/// parameters and only triggered after a `y` confirmation.
pub async fn run_chat(assistant: &Assistant<'_>) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("\n I am a network assistant running network automation workflows. What can I help you with? ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q") {
            println!("Exiting assistant...");
            break;
        }

        match assistant.plan_turn(input).await? {
            TurnAction::RunWorkflow {
                workflow,
                arguments,
            } => {
                println!("\n Workflow name: {}", workflow.name());
                println!(" Params identified:\n      {arguments}");
                print!("\n Do you want to continue or not (y/n)? ");
                stdout.flush()?;
                let mut confirmation = String::new();
                stdin.lock().read_line(&mut confirmation)?;
                if !matches!(confirmation.trim(), "y" | "Y") {
                    continue;
                }
                match assistant.execute(workflow, &arguments).await? {
                    TriggerOutcome::Started { status_url } => {
                        println!(
                            "\n Network assistant: happy to help, the workflow started. See status here: {status_url}"
                        );
                    }
                    TriggerOutcome::NotStarted { status } => {
                        println!(
                            "\n Network assistant: the pipeline did not start (HTTP {status})."
                        );
                    }
                }
            }
            TurnAction::Answer(answer) => {
                println!("{answer}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_names_round_trip_through_the_closed_mapping() {
        for workflow in [
            Workflow::AddDevice,
            Workflow::ProvisionDevice,
            Workflow::SoftwareDistribution,
        ] {
            assert_eq!(Workflow::from_name(workflow.name()), Some(workflow));
        }
    }

    #[test]
    fn unknown_workflow_names_never_dispatch() {
        assert_eq!(Workflow::from_name("delete_everything"), None);
        assert_eq!(Workflow::from_name(""), None);
        assert_eq!(Workflow::from_name("Add Device"), None);
    }

    #[test]
    fn catalog_names_all_map_back_onto_variants() {
        for schema in workflow_catalog() {
            let name = schema["name"].as_str().unwrap();
            assert!(Workflow::from_name(name).is_some(), "unmapped: {name}");
        }
    }

    #[test]
    fn workflow_params_flatten_strings_and_numbers() {
        let arguments = serde_json::json!({
            "hostname": "PDX-RN",
            "retries": 3,
        });
        let params = workflow_params(&arguments);
        assert!(params.contains(&("hostname".to_string(), "PDX-RN".to_string())));
        assert!(params.contains(&("retries".to_string(), "3".to_string())));
    }

    #[test]
    fn workflow_params_of_non_object_is_empty() {
        assert!(workflow_params(&serde_json::json!("just a string")).is_empty());
    }
}
