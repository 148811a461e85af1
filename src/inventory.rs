//! Inventory collection: paginate the managed-device list, enrich each device
//! with its site hierarchy, split into device/access-point buckets, and
//! cross-reference the controller's compliance reports.
//!
//! The per-device site lookups are deliberately sequential; the controller is
//! the bottleneck and the run is a batch job.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::controller::{ComplianceCategory, ControllerApi};
use crate::publish::{publish_dir, RepoStore};

/// Page size for the device-list endpoint.
pub const PAGE_LIMIT: usize = 500;

/// Device family the controller reports for access points.
pub const ACCESS_POINT_FAMILY: &str = "Unified AP";

/// Folder the report files are written to before publishing.
pub const DATA_FOLDER: &str = "inventory";

/// Commit message used when pushing report files to the repository.
pub const COMMIT_MESSAGE: &str = "committed by Jenkins - Device Inventory build";

/// One device as written to the report files. Field order is the
/// serialization order for both JSON and YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub hostname: String,
    pub device_ip: String,
    pub device_id: String,
    pub version: String,
    pub device_family: String,
    pub role: String,
    pub site: String,
    pub site_id: String,
}

/// The collected inventory, bucketed by device family.
#[derive(Debug, Default)]
pub struct Inventory {
    /// Device count the controller reported when pagination started.
    pub reported_count: usize,
    pub devices: Vec<DeviceRecord>,
    pub access_points: Vec<DeviceRecord>,
}

impl Inventory {
    pub fn total(&self) -> usize {
        self.devices.len() + self.access_points.len()
    }
}

/// Summary of one inventory run, returned to the CLI.
#[derive(Debug)]
pub struct InventoryReport {
    pub device_count: usize,
    pub devices: usize,
    pub access_points: usize,
    pub image_non_compliant: usize,
    pub advisory_non_compliant: usize,
    pub published_files: usize,
}

/// Collects every managed device and enriches it with site data.
///
/// Devices without a site assignment keep an empty `site_id` and are still
/// bucketed. Access points (`Unified AP` family) go to their own bucket.
pub async fn collect<C>(api: &C) -> Result<Inventory>
where
    C: ControllerApi + ?Sized,
{
    let device_count = api.device_count().await.map_err(|e| anyhow::anyhow!(e))?;
    info!(device_count, "[INVENTORY] Devices managed by the controller");

    let mut managed = Vec::new();
    let mut offset = 1;
    while offset <= device_count {
        let page = api
            .device_page(offset, PAGE_LIMIT)
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .with_context(|| format!("device page at offset {offset}"))?;
        managed.extend(page);
        offset += PAGE_LIMIT;
    }
    if managed.len() != device_count {
        warn!(
            collected = managed.len(),
            reported = device_count,
            "[INVENTORY] Collected device count differs from reported count"
        );
    }
    info!("[INVENTORY] Collected the device list");

    let mut inventory = Inventory {
        reported_count: device_count,
        ..Inventory::default()
    };
    for device in managed {
        let is_access_point = device.family == ACCESS_POINT_FAMILY;
        let site = api
            .device_location(&device.id)
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .with_context(|| format!("site hierarchy for device {}", device.hostname))?;
        let site_id = if site.is_empty() {
            String::new()
        } else {
            api.site_id(&site)
                .await
                .map_err(|e| anyhow::anyhow!(e))
                .with_context(|| format!("site id for {site}"))?
        };
        let record = DeviceRecord {
            hostname: device.hostname,
            device_ip: device.management_ip_address,
            device_id: device.id,
            version: device.software_version,
            device_family: device.type_name,
            role: device.role,
            site,
            site_id,
        };
        if is_access_point {
            inventory.access_points.push(record);
        } else {
            inventory.devices.push(record);
        }
    }
    info!(
        devices = inventory.devices.len(),
        access_points = inventory.access_points.len(),
        "[INVENTORY] Built the device inventory"
    );
    Ok(inventory)
}

/// Filters `records` down to those whose id appears in `non_compliant_ids`.
pub fn cross_reference(records: &[DeviceRecord], non_compliant_ids: &[String]) -> Vec<DeviceRecord> {
    records
        .iter()
        .filter(|record| non_compliant_ids.iter().any(|id| id == &record.device_id))
        .cloned()
        .collect()
}

fn write_pair(
    dir: &Path,
    stem: &str,
    yaml_header: &str,
    records: &[DeviceRecord],
) -> Result<Vec<PathBuf>> {
    let json_path = dir.join(format!("{stem}.json"));
    fs::write(&json_path, serde_json::to_string_pretty(records)?)
        .with_context(|| format!("writing {}", json_path.display()))?;

    let yaml_path = dir.join(format!("{stem}.yaml"));
    let yaml = serde_yaml::to_string(records)?;
    fs::write(&yaml_path, format!("{yaml_header}\n{yaml}"))
        .with_context(|| format!("writing {}", yaml_path.display()))?;

    info!(stem, "[INVENTORY] Saved report pair");
    Ok(vec![json_path, yaml_path])
}

/// Writes the four report pairs (JSON + YAML with a descriptive header line)
/// into `dir`, creating it when absent. Returns the written paths.
pub fn write_reports(
    dir: &Path,
    inventory: &Inventory,
    image_non_compliant: &[DeviceRecord],
    advisory_non_compliant: &[DeviceRecord],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut paths = Vec::new();
    paths.extend(write_pair(
        dir,
        "device_inventory",
        "device inventory, managed by the network controller:",
        &inventory.devices,
    )?);
    paths.extend(write_pair(
        dir,
        "ap_inventory",
        "access point inventory, managed by the network controller:",
        &inventory.access_points,
    )?);
    paths.extend(write_pair(
        dir,
        "image_non_compliant_devices",
        "software image non-compliant:",
        image_non_compliant,
    )?);
    paths.extend(write_pair(
        dir,
        "psirts_non_compliant_devices",
        "security advisories non-compliant:",
        advisory_non_compliant,
    )?);
    Ok(paths)
}

fn log_non_compliant(label: &str, records: &[DeviceRecord]) {
    info!(count = records.len(), "[INVENTORY] Devices {label} non-compliant");
    for record in records {
        info!(hostname = %record.hostname, site = %record.site, "[INVENTORY] {label} non-compliant device");
    }
}

/// Full inventory run: collect, cross-reference compliance, write the report
/// files, and publish each one to the repository.
pub async fn run<C, S>(api: &C, store: &S, data_dir: &Path) -> Result<InventoryReport>
where
    C: ControllerApi + ?Sized,
    S: RepoStore + ?Sized,
{
    let inventory = collect(api).await?;

    let image_ids = api
        .non_compliant(ComplianceCategory::Image)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("image compliance detail")?;
    let image_non_compliant = cross_reference(&inventory.devices, &image_ids);
    log_non_compliant("software image", &image_non_compliant);

    let advisory_ids = api
        .non_compliant(ComplianceCategory::SecurityAdvisory)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("security advisory compliance detail")?;
    let advisory_non_compliant = cross_reference(&inventory.devices, &advisory_ids);
    log_non_compliant("security advisories", &advisory_non_compliant);

    let paths = write_reports(data_dir, &inventory, &image_non_compliant, &advisory_non_compliant)?;

    let published = publish_dir(store, &paths, COMMIT_MESSAGE)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("publishing report files")?;

    Ok(InventoryReport {
        device_count: inventory.reported_count,
        devices: inventory.devices.len(),
        access_points: inventory.access_points.len(),
        image_non_compliant: image_non_compliant.len(),
        advisory_non_compliant: advisory_non_compliant.len(),
        published_files: published,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> DeviceRecord {
        DeviceRecord {
            hostname: format!("host-{id}"),
            device_ip: "10.0.0.1".into(),
            device_id: id.into(),
            version: "17.9.4".into(),
            device_family: "Cisco Catalyst 9300 Switch".into(),
            role: "ACCESS".into(),
            site: "Global/OR/PDX".into(),
            site_id: "site-1".into(),
        }
    }

    #[test]
    fn cross_reference_keeps_only_matching_ids() {
        let records = vec![record("a"), record("b"), record("c")];
        let picked = cross_reference(&records, &["c".to_string(), "a".to_string()]);
        let ids: Vec<_> = picked.iter().map(|r| r.device_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn cross_reference_with_no_matches_is_empty() {
        let records = vec![record("a")];
        assert!(cross_reference(&records, &["x".to_string()]).is_empty());
    }
}
