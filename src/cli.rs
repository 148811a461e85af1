use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::assistant::{run_chat, Assistant};
use crate::config::{
    ControllerSettings, GitHubSettings, JenkinsSettings, OnboardProfile, OpenAiSettings,
    RetrievalSettings,
};
use crate::controller::RestController;
use crate::distribute::{distribute_image, DistributionOutcome};
use crate::inventory::{self, DATA_FOLDER};
use crate::llm::{ChromaStore, OpenAiChat};
use crate::onboard::{add_device, OnboardOutcome};
use crate::pipeline::JenkinsClient;
use crate::publish::GitHubStore;
use crate::task::PollPolicy;

/// CLI for catalyst-ops: network-controller automation commands.
#[derive(Parser)]
#[clap(
    name = "catalyst-ops",
    version,
    about = "Network-controller automation: inventory, onboarding, image distribution, and a workflow assistant"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect the device inventory and publish the report files
    Inventory,
    /// Add a device to the controller inventory
    AddDevice {
        /// The device management IP address
        device_ip_address: String,
    },
    /// Distribute the golden software image to a device
    Distribute {
        /// The network device hostname
        hostname: String,
    },
    /// Interactive assistant that maps requests onto automation pipelines
    Chat,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Inventory => {
            let controller = ControllerSettings::from_env()?;
            let github = GitHubSettings::from_env()?;
            let api = RestController::connect(&controller)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            let store = GitHubStore::new(&github).map_err(|e| anyhow::anyhow!(e))?;
            let report = inventory::run(&api, &store, Path::new(DATA_FOLDER)).await?;
            println!(
                "Inventory complete: {} devices, {} access points ({} managed in total).",
                report.devices, report.access_points, report.device_count
            );
            println!(
                "Non-compliant: {} software image, {} security advisories. Published {} files.",
                report.image_non_compliant, report.advisory_non_compliant, report.published_files
            );
            Ok(())
        }
        Commands::AddDevice { device_ip_address } => {
            let controller = ControllerSettings::from_env()?;
            let profile = OnboardProfile::from_env()?;
            let api = RestController::connect(&controller)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            let outcome =
                add_device(&api, &profile, &device_ip_address, &PollPolicy::default()).await?;
            match outcome {
                OnboardOutcome::AlreadyManaged => {
                    println!("The device is already managed by the controller.");
                }
                OnboardOutcome::Finished(task) => {
                    if task.is_success() {
                        println!("Add device completed for {device_ip_address}.");
                    } else {
                        println!(
                            "Add device did not complete successfully for {device_ip_address}."
                        );
                    }
                    if let Some(location) = task.result_location {
                        println!(
                            "Details may be found here: {}{location}",
                            controller.base_url
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Distribute { hostname } => {
            let controller = ControllerSettings::from_env()?;
            let api = RestController::connect(&controller)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            // Distribution can run long; poll at the slower cadence.
            let policy = PollPolicy {
                interval: std::time::Duration::from_secs(10),
                max_attempts: 180,
            };
            let outcome = distribute_image(&api, &controller.base_url, &hostname, &policy).await?;
            match outcome {
                DistributionOutcome::NotManaged => {
                    println!("The controller does not manage the device {hostname}.");
                }
                DistributionOutcome::Completed => {
                    println!("Image distribution completed successfully for device {hostname}.");
                }
                DistributionOutcome::Failed { status, detail_url } => {
                    println!(
                        "Image distribution failed for device {hostname} (status {status}), for details call API: {detail_url}"
                    );
                }
            }
            Ok(())
        }
        Commands::Chat => {
            let model =
                OpenAiChat::new(&OpenAiSettings::from_env()?).map_err(|e| anyhow::anyhow!(e))?;
            let retrieval =
                ChromaStore::new(&RetrievalSettings::from_env()?).map_err(|e| anyhow::anyhow!(e))?;
            let pipeline =
                JenkinsClient::new(&JenkinsSettings::from_env()?).map_err(|e| anyhow::anyhow!(e))?;
            let assistant = Assistant::new(&model, &retrieval, &pipeline);
            run_chat(&assistant).await
        }
    }
}
