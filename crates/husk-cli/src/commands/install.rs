//! `husk install` command implementation.
//!
//! Installs the dependencies declared in package.json: reuse the lockfile
//! when it still satisfies the manifest (otherwise resolve against the
//! registry), fetch whatever the store lacks, rebuild `node_modules` from the
//! store and record what made it in `husk-lock.json`.
//!
//! Per-package failures become warnings and leave the package out; only
//! errors outside a single package abort the run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use futures_util::future::join_all;
use husk_cache::{CasStore, Linker, StoreEntry};
use husk_config::json::{load_from_file, DependencySelection};
use husk_config::merge::MANIFEST_FILE;
use husk_config::HuskConfig;
use husk_core::error::{HuskError, HuskResult};
use husk_core::types::{PackageRef, ResolvedPackage};
use husk_lockfile::Lockfile;
use husk_registry::{ClientOptions, RegistryClient, RetryConfig};
use husk_resolver::{DependencyGraph, DependencyResolver, ResolveOptions, MAX_DEPTH};
use tracing::{debug, info, warn};

use super::CommandContext;
use crate::output::progress::ProgressBar;
use crate::output::OutputHandler;
use crate::InstallArgs;

/// What an install should do beyond the configured settings
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    pub selection: DependencySelection,
    pub frozen: bool,
}

impl From<&InstallArgs> for InstallOptions {
    fn from(args: &InstallArgs) -> Self {
        let selection = if args.dev {
            DependencySelection::DevOnly
        } else if args.production {
            DependencySelection::Production
        } else {
            DependencySelection::All
        };
        Self {
            selection,
            frozen: args.frozen,
        }
    }
}

#[derive(Debug, Default)]
pub struct InstallReport {
    /// Packages in the install plan
    pub resolved: usize,
    pub downloaded: usize,
    /// Packages already in the store
    pub reused: usize,
    pub linked: usize,
    pub from_lockfile: bool,
    /// One line per package left out
    pub warnings: Vec<String>,
    pub lockfile: Option<Utf8PathBuf>,
    pub elapsed: Duration,
}

/// Execute the `husk install` command
pub async fn execute(args: InstallArgs, ctx: &CommandContext) -> HuskResult<()> {
    let mut extra = Vec::new();
    if let Some(n) = args.parallel {
        extra.push(("parallel", n.to_string()));
    }
    if let Some(mode) = &args.link_mode {
        extra.push(("link-mode", mode.clone()));
    }

    let config = ctx.load_config(&extra).await?;
    let project_dir = ctx.project_dir()?;
    execute_with(&project_dir, &config, InstallOptions::from(&args), ctx).await
}

/// Install with settings already loaded and print the summary
pub async fn execute_with(
    project_dir: &Utf8Path,
    config: &HuskConfig,
    options: InstallOptions,
    ctx: &CommandContext,
) -> HuskResult<()> {
    let report = install(project_dir, config, options, &ctx.output).await?;
    print_summary(&report, &ctx.output);
    Ok(())
}

/// Run a full install for the project in `project_dir`
pub async fn install(
    project_dir: &Utf8Path,
    config: &HuskConfig,
    options: InstallOptions,
    output: &OutputHandler,
) -> HuskResult<InstallReport> {
    let start = Instant::now();
    let manifest = load_from_file(&project_dir.join(MANIFEST_FILE)).await?;
    let roots = manifest.root_dependencies(options.selection);
    let client = registry_client(config)?;
    let mut report = InstallReport::default();

    let mut packages = match locked_plan(project_dir, &roots, config, options.frozen)? {
        Some(packages) => {
            report.from_lockfile = true;
            output.step("Locked", &format!("{} package(s) from husk-lock.json", packages.len()));
            packages
        },
        None => {
            output.step("Resolving", &format!("{} root dependencies", roots.len()));
            let resolver = DependencyResolver::new(
                client.clone(),
                ResolveOptions {
                    concurrency: config.resolve_concurrency,
                    max_depth: MAX_DEPTH,
                    warn_on_conflict: config.warn_on_conflict,
                },
            );
            let resolution = resolver.resolve(&roots).await?;
            report.warnings.extend(resolution.warnings.iter().map(|w| w.to_string()));
            resolution.packages
        },
    };
    report.resolved = packages.len();

    let store = Arc::new(CasStore::open(config.store_dir())?);
    let missing: Vec<ResolvedPackage> = packages
        .values()
        .filter(|p| !store.has(&p.name, &p.version.to_string()))
        .cloned()
        .collect();
    report.reused = packages.len() - missing.len();

    if !missing.is_empty() {
        output.step("Fetching", &format!("{} package(s)", missing.len()));
    }
    let fetched = fetch_missing(&client, &store, &missing, config.network_concurrency).await?;
    report.downloaded = fetched.downloaded;
    for (name, err) in fetched.failures {
        warn!("{}: {}", name, err);
        report.warnings.push(format!("{}: {}", name, err));
        packages.remove(&name);
    }

    output.step("Linking", &format!("{} package(s) ({})", packages.len(), config.link_mode));
    let node_modules = project_dir.join("node_modules");
    let order = DependencyGraph::from_packages(&packages).link_order();
    let linked = Linker::new(config.link_mode).link(&packages, &order, &store, node_modules.as_std_path())?;
    report.linked = linked.packages_linked;
    for id in &linked.missing {
        report.warnings.push(format!("{}: no usable store entry", id));
        packages.retain(|_, p| &p.id() != id);
    }

    if !options.frozen {
        let lockfile = Lockfile::from_resolved(packages.values());
        let path = lockfile.save(project_dir.as_std_path())?;
        report.lockfile = Utf8PathBuf::from_path_buf(path).ok();
    }

    report.elapsed = start.elapsed();
    info!(
        "install finished: {} resolved, {} downloaded, {} reused, {} warning(s)",
        report.resolved,
        report.downloaded,
        report.reused,
        report.warnings.len()
    );
    Ok(report)
}

/// The package set from `husk-lock.json`, when it still satisfies the roots.
///
/// In frozen mode an unusable lockfile is fatal instead of a cue to resolve.
fn locked_plan(
    project_dir: &Utf8Path,
    roots: &[PackageRef],
    config: &HuskConfig,
    frozen: bool,
) -> HuskResult<Option<BTreeMap<String, ResolvedPackage>>> {
    let Some(lockfile) = Lockfile::load(project_dir.as_std_path()) else {
        if frozen {
            return Err(HuskError::LockfileOutOfDate {
                reason: "husk-lock.json is missing or unreadable".to_string(),
            });
        }
        return Ok(None);
    };

    match lockfile.covers(roots) {
        Ok(()) => Ok(Some(
            lockfile.reachable_from(roots).to_resolved(config.registry_base()),
        )),
        Err(e) if frozen => Err(e),
        Err(e) => {
            debug!("re-resolving: {}", e);
            Ok(None)
        },
    }
}

pub fn registry_client(config: &HuskConfig) -> HuskResult<RegistryClient> {
    RegistryClient::with_options(ClientOptions {
        base_url: config.registry_base().to_string(),
        timeout: Duration::from_secs(config.fetch_timeout_secs),
        retry: RetryConfig {
            max_retries: config.retries,
            ..RetryConfig::default()
        },
        pool_max_idle_per_host: config.network_concurrency.max(1),
    })
}

#[derive(Debug, Default)]
struct FetchOutcome {
    downloaded: usize,
    failures: Vec<(String, HuskError)>,
}

/// Download and ingest `packages` in batches of `batch_size`.
///
/// The store index is written after every batch, so packages stored before
/// an abort stay indexed.
async fn fetch_missing(
    client: &RegistryClient,
    store: &Arc<CasStore>,
    packages: &[ResolvedPackage],
    batch_size: usize,
) -> HuskResult<FetchOutcome> {
    let mut outcome = FetchOutcome::default();
    let mut progress = ProgressBar::new(packages.len() as u64, "Downloading");

    for batch in packages.chunks(batch_size.max(1)) {
        let results = join_all(batch.iter().map(|package| fetch_one(client, Arc::clone(store), package))).await;

        let mut fatal = None;
        for (package, result) in batch.iter().zip(results) {
            match result {
                Ok(entry) => {
                    debug!("stored {} ({})", package.id(), entry.dictionary);
                    outcome.downloaded += 1;
                },
                Err(e) if e.is_per_package() => outcome.failures.push((package.name.clone(), e)),
                Err(e) => {
                    fatal.get_or_insert(e);
                },
            }
        }
        progress.advance(batch.len() as u64);
        store.save_index()?;

        if let Some(e) = fatal {
            progress.finish();
            return Err(e);
        }
    }

    progress.finish();
    Ok(outcome)
}

/// Download one tarball, then unpack it into the store off the async threads
async fn fetch_one(
    client: &RegistryClient,
    store: Arc<CasStore>,
    package: &ResolvedPackage,
) -> HuskResult<StoreEntry> {
    let id = package.id();
    let bytes = client
        .download_tarball(&id, &package.tarball_url, &package.integrity)
        .await?;

    let name = package.name.clone();
    let version = package.version.to_string();
    let integrity = package.integrity.clone();
    tokio::task::spawn_blocking(move || store.ingest(&name, &version, &integrity, &bytes))
        .await
        .map_err(|e| HuskError::Extraction {
            package: id,
            message: format!("extraction task failed: {}", e),
        })?
}

fn print_summary(report: &InstallReport, output: &OutputHandler) {
    for warning in &report.warnings {
        output.warn(warning);
    }

    output.success(&format!(
        "Installed {} package(s) in {:.2}s",
        report.linked,
        report.elapsed.as_secs_f64()
    ));
    output.field("resolved", report.resolved);
    output.field("downloaded", report.downloaded);
    output.field("reused", report.reused);
    output.field("linked", report.linked);
    if !report.warnings.is_empty() {
        output.field("warnings", report.warnings.len());
    }
}
