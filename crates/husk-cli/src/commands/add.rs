//! `husk add` command implementation.
//!
//! Records each `name[@range]` in package.json, then installs. A bare name is
//! pinned to a caret range on the registry's `latest` tag.

use camino::Utf8Path;
use husk_config::merge::MANIFEST_FILE;
use husk_config::{HuskConfig, ManifestEditor};
use husk_core::error::{HuskError, HuskResult};
use husk_core::types::{PackageRef, ResolvedPackage};
use husk_registry::RegistryClient;

use super::install::{self, registry_client, InstallOptions};
use super::CommandContext;

/// Execute the `husk add` command
pub async fn execute(packages: Vec<String>, dev: bool, ctx: &CommandContext) -> HuskResult<()> {
    let config = ctx.load_config(&[]).await?;
    let project_dir = ctx.project_dir()?;

    let added = add_to_manifest(&project_dir.join(MANIFEST_FILE), &packages, dev, &config).await?;
    let group = if dev { "devDependencies" } else { "dependencies" };
    for spec in &added {
        ctx.output.step("Adding", &format!("{}@{} to {}", spec.name, spec.version_range, group));
    }

    install::execute_with(&project_dir, &config, InstallOptions::default(), ctx).await
}

/// Write the requested packages into the manifest, returning the exact ranges used
pub async fn add_to_manifest(
    manifest_path: &Utf8Path,
    specs: &[String],
    dev: bool,
    config: &HuskConfig,
) -> HuskResult<Vec<PackageRef>> {
    let mut editor = ManifestEditor::open(manifest_path).await?;
    let client = registry_client(config)?;
    let mut added = Vec::with_capacity(specs.len());

    for spec in specs {
        let mut package = PackageRef::parse_spec(spec);
        if !ResolvedPackage::is_valid_name(&package.name) {
            return Err(HuskError::ConfigValidation {
                field: "package".to_string(),
                reason: format!("'{}' is not a valid package name", package.name),
            });
        }
        if !package.has_range() {
            package.version_range = latest_range(&client, &package.name).await?;
        }
        editor.add_dependency(&package.name, &package.version_range, dev);
        added.push(package);
    }

    editor.save().await?;
    Ok(added)
}

/// `^<latest>` for a package
async fn latest_range(client: &RegistryClient, name: &str) -> HuskResult<String> {
    let metadata = client.fetch_metadata(name).await?;
    metadata
        .dist_tag("latest")
        .map(|latest| format!("^{}", latest))
        .ok_or_else(|| HuskError::NoMatchingVersion {
            name: name.to_string(),
            range: "latest".to_string(),
        })
}
