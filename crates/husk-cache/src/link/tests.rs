use super::*;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use camino::Utf8PathBuf;
use husk_core::types::{LinkMode, ResolvedPackage, Version};
use tempfile::{tempdir, TempDir};

use crate::cas::CasStore;
use crate::test_support::npm_tarball;

struct Fixture {
    temp: TempDir,
    store: CasStore,
    packages: BTreeMap<String, ResolvedPackage>,
}

impl Fixture {
    fn new() -> Self {
        let temp = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("store")).unwrap();
        let store = CasStore::open(&root).unwrap();
        Self {
            temp,
            store,
            packages: BTreeMap::new(),
        }
    }

    fn add(&mut self, name: &str, version: &str, deps: &[&str]) {
        let manifest = format!(r#"{{"name":"{}","version":"{}"}}"#, name, version);
        let gz = npm_tarball(&[("package.json", &manifest), ("lib/index.js", "module.exports = 42;")]);
        self.store.ingest(name, version, "", &gz).unwrap();

        let mut package = ResolvedPackage::new(
            name.to_string(),
            version.parse::<Version>().unwrap(),
            String::new(),
            String::new(),
        );
        for dep in deps {
            package.dependencies.insert(dep.to_string(), "*".to_string());
        }
        self.packages.insert(name.to_string(), package);
    }

    fn node_modules(&self) -> std::path::PathBuf {
        self.temp.path().join("project").join("node_modules")
    }

    fn link(&self, mode: LinkMode) -> LinkReport {
        self.link_in(mode, &[])
    }

    fn link_in(&self, mode: LinkMode, order: &[&str]) -> LinkReport {
        let order: Vec<String> = order.iter().map(|name| name.to_string()).collect();
        Linker::new(mode)
            .link(&self.packages, &order, &self.store, &self.node_modules())
            .unwrap()
    }
}

#[test]
fn test_virtual_dir_names() {
    assert_eq!(virtual_dir_name("react", "18.2.0"), "react@18.2.0");
    assert_eq!(virtual_dir_name("@types/node", "20.1.0"), "@types+node@20.1.0");
    assert_eq!(
        virtual_package_dir(Path::new(".husk"), "@types/node", "20.1.0"),
        Path::new(".husk/@types+node@20.1.0/node_modules/@types/node")
    );
}

#[test]
fn test_links_virtual_store_and_top_level() {
    let mut fixture = Fixture::new();
    fixture.add("react", "18.2.0", &["loose-envify"]);
    fixture.add("loose-envify", "1.4.0", &[]);

    let report = fixture.link(LinkMode::Hardlink);
    let node_modules = fixture.node_modules();

    assert_eq!(report.packages_linked, 2);
    assert_eq!(report.top_level_links, 2);
    assert_eq!(report.sibling_links, 1);
    assert_eq!(report.files_linked + report.files_copied, 4);
    assert!(report.missing.is_empty());

    let virtual_react = node_modules.join(".husk/react@18.2.0/node_modules/react");
    assert!(virtual_react.join("package.json").is_file());
    assert_eq!(
        fs::read_to_string(node_modules.join("react/lib/index.js")).unwrap(),
        "module.exports = 42;"
    );
    assert!(node_modules
        .join(".husk/react@18.2.0/node_modules/loose-envify/package.json")
        .is_file());
}

#[cfg(unix)]
#[test]
fn test_top_level_links_are_relative() {
    let mut fixture = Fixture::new();
    fixture.add("react", "18.2.0", &[]);
    fixture.link(LinkMode::Copy);

    let target = fs::read_link(fixture.node_modules().join("react")).unwrap();
    assert_eq!(target, Path::new(".husk/react@18.2.0/node_modules/react"));
}

#[test]
fn test_scoped_package_layout() {
    let mut fixture = Fixture::new();
    fixture.add("@types/node", "20.1.0", &[]);
    fixture.link(LinkMode::Hardlink);

    let node_modules = fixture.node_modules();
    assert!(node_modules.join("@types").is_dir());
    assert!(node_modules.join("@types/node/package.json").is_file());
    assert!(node_modules
        .join(".husk/@types+node@20.1.0/node_modules/@types/node/lib/index.js")
        .is_file());
}

#[test]
fn test_copy_mode_copies_every_file() {
    let mut fixture = Fixture::new();
    fixture.add("left-pad", "1.3.0", &[]);

    let report = fixture.link(LinkMode::Copy);
    assert_eq!(report.files_copied, 2);
    assert_eq!(report.files_linked, 0);
}

#[test]
fn test_existing_node_modules_is_replaced() {
    let mut fixture = Fixture::new();
    fixture.add("left-pad", "1.3.0", &[]);

    let node_modules = fixture.node_modules();
    fs::create_dir_all(node_modules.join("stale-package")).unwrap();
    fs::write(node_modules.join("stale-package/index.js"), "old").unwrap();

    fixture.link(LinkMode::Hardlink);
    assert!(!node_modules.join("stale-package").exists());
    assert!(node_modules.join("left-pad").exists());

    // Linking twice is fine too.
    let report = fixture.link(LinkMode::Hardlink);
    assert_eq!(report.packages_linked, 1);
}

#[test]
fn test_missing_store_entry_is_reported() {
    let mut fixture = Fixture::new();
    fixture.add("present", "1.0.0", &["absent"]);
    fixture.packages.insert(
        "absent".to_string(),
        ResolvedPackage::new("absent".to_string(), Version::new(1, 0, 0), String::new(), String::new()),
    );

    let report = fixture.link(LinkMode::Hardlink);
    assert_eq!(report.packages_linked, 1);
    assert_eq!(report.sibling_links, 0);
    assert_eq!(report.missing, vec!["absent@1.0.0".to_string()]);
    assert!(!fixture.node_modules().join("absent").exists());
}

#[test]
fn test_place_file_falls_back_to_copy() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("src.txt");
    fs::write(&src, "payload").unwrap();

    let dst = temp.path().join("dst.txt");
    assert_eq!(place_file(&src, &dst, LinkMode::Copy).unwrap(), Placement::Copied);
    assert_eq!(fs::read_to_string(&dst).unwrap(), "payload");

    // Hardlinking onto an existing file fails and is silently copied over instead.
    let existing = temp.path().join("existing.txt");
    fs::write(&existing, "stale").unwrap();
    let placement = place_file(&src, &existing, LinkMode::Hardlink).unwrap();
    assert_eq!(placement, Placement::Copied);
    assert_eq!(fs::read_to_string(&existing).unwrap(), "payload");
}

#[test]
fn test_links_follow_given_order() {
    let mut fixture = Fixture::new();
    fixture.add("app-lib", "1.0.0", &["tiny"]);
    fixture.add("tiny", "2.0.0", &[]);
    fixture.add("zod", "3.0.0", &[]);

    let report = fixture.link_in(LinkMode::Copy, &["tiny", "app-lib", "tiny", "unknown"]);

    assert_eq!(report.linked, vec!["tiny@2.0.0", "app-lib@1.0.0", "zod@3.0.0"]);
    assert_eq!(report.packages_linked, 3);
    assert_eq!(report.sibling_links, 1);
}
