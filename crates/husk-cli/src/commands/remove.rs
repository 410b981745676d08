//! `husk remove` command implementation.

use camino::Utf8Path;
use husk_config::merge::MANIFEST_FILE;
use husk_config::ManifestEditor;
use husk_core::error::HuskResult;

use super::install::{self, InstallOptions};
use super::CommandContext;

/// Execute the `husk remove` command
pub async fn execute(packages: Vec<String>, ctx: &CommandContext) -> HuskResult<()> {
    let config = ctx.load_config(&[]).await?;
    let project_dir = ctx.project_dir()?;

    let outcome = remove_from_manifest(&project_dir.join(MANIFEST_FILE), &packages).await?;
    for name in &outcome.removed {
        ctx.output.step("Removing", name);
    }
    for name in &outcome.unknown {
        ctx.output.warn(&format!("{} is not a dependency of this project", name));
    }

    install::execute_with(&project_dir, &config, InstallOptions::default(), ctx).await
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub removed: Vec<String>,
    /// Names no dependency group declared
    pub unknown: Vec<String>,
}

/// Drop `names` from every dependency group of the manifest
pub async fn remove_from_manifest(manifest_path: &Utf8Path, names: &[String]) -> HuskResult<RemoveOutcome> {
    let mut editor = ManifestEditor::open(manifest_path).await?;
    let mut outcome = RemoveOutcome::default();

    for name in names {
        if editor.remove_dependency(name) {
            outcome.removed.push(name.clone());
        } else {
            outcome.unknown.push(name.clone());
        }
    }

    if !outcome.removed.is_empty() {
        editor.save().await?;
    }
    Ok(outcome)
}
