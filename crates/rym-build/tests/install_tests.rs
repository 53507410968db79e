//! End-to-end install pipeline against toolchain and resolver fakes

mod common;

use common::*;
use pretty_assertions::assert_eq;
use rym_build::archive::{entry_names, read_entry};
use rym_build::descriptor::parse_module_info;
use rym_build::{BuildError, InstallConfig, InstallState, Installer, Reporter, Toolchain};
use rym_package::{ArtifactId, ResolvedNode, LOCK_FILENAME, MANIFEST_FILENAME};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn id(s: &str) -> ArtifactId {
    s.parse().unwrap()
}

fn project(manifest: &str) -> (TempDir, InstallConfig) {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join(MANIFEST_FILENAME), manifest).unwrap();
    let config = InstallConfig::for_project(temp.path());
    (temp, config)
}

/// Resolver serving `org.example:foo:1.0`, an archive with no descriptor
fn foo_resolver(dir: &Path) -> GraphResolver {
    let content = write_jar(
        &dir.join("downloads").join("foo-1.0.jar"),
        &[("org/example/foo/Foo.class", b"\xCA\xFE\xBA\xBE")],
    );
    GraphResolver {
        nodes: vec![ResolvedNode::new(id("org.example:foo:1.0")).with_content(content)],
    }
}

fn installer(config: InstallConfig, resolver: GraphResolver, toolchain: Toolchain) -> Installer<GraphResolver> {
    Installer::new(config, resolver, toolchain)
}

const FOO_MANIFEST: &str = r#"{ "dependencies": ["org.example:foo:1.0"] }"#;

mod scenario_a {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_successful_synthesis_stages_standalone_module() {
        let (temp, config) = project(FOO_MANIFEST);
        let (toolchain, calls) = fake_toolchain(false, false);
        let mut installer = installer(config.clone(), foo_resolver(temp.path()), toolchain);
        let mut reporter = Reporter::capture();

        let report = installer.install(&mut reporter).unwrap();

        assert_eq!(report.state, InstallState::LauncherEmitted);
        assert_eq!(report.staged, vec!["foo"]);
        assert_eq!(report.promoted, 1);
        assert_eq!(report.delegated, 0);
        assert_eq!(calls.borrow().linked, vec![vec!["foo".to_string()]]);

        let staged = config.modules_dir().join("foo.jar");
        let descriptor = read_entry(&staged, "module-info.class").unwrap().unwrap();
        assert_eq!(parse_module_info(&descriptor).unwrap().name, "foo");
        assert!(entry_names(&staged)
            .unwrap()
            .contains(&"org/example/foo/Foo.class".to_string()));
        assert!(!reporter.has_errors());
    }

    #[test]
    fn test_failed_synthesis_delegates_module() {
        let (temp, config) = project(FOO_MANIFEST);
        let (toolchain, calls) = fake_toolchain(true, false);
        let mut installer = installer(config.clone(), foo_resolver(temp.path()), toolchain);
        let mut reporter = Reporter::capture();

        let report = installer.install(&mut reporter).unwrap();

        assert_eq!(report.state, InstallState::LauncherEmitted);
        assert_eq!(report.staged, vec!["foo", "rym.delegate"]);
        assert_eq!(report.promoted, 0);
        assert_eq!(report.delegated, 1);

        // foo is a zero-content forwarder, its classes live in the delegate
        let forwarder = config.modules_dir().join("foo.jar");
        assert_eq!(entry_names(&forwarder).unwrap(), vec!["module-info.class"]);
        let delegate = config.modules_dir().join("rym.delegate.jar");
        assert!(entry_names(&delegate)
            .unwrap()
            .contains(&"org/example/foo/Foo.class".to_string()));

        let calls = calls.borrow();
        let forwarder_request = calls
            .compiled
            .iter()
            .find(|r| r.module_name == "foo")
            .unwrap();
        assert_eq!(
            forwarder_request.source,
            "open module foo {\n    requires transitive rym.delegate;\n}\n"
        );
        let delegate_request = calls
            .compiled
            .iter()
            .find(|r| r.module_name == "rym.delegate")
            .unwrap();
        assert!(delegate_request.source.contains("exports org.example.foo;"));
        assert!(reporter.warnings().count() >= 2);
    }
}

#[test]
fn test_launcher_references_image() {
    let (temp, mut config) = project(FOO_MANIFEST);
    config.launcher_main = Some("foo/org.example.foo.Foo".to_string());
    let (toolchain, _) = fake_toolchain(false, false);
    let mut installer = installer(config.clone(), foo_resolver(temp.path()), toolchain);

    let report = installer.install(&mut Reporter::capture()).unwrap();

    assert_eq!(report.launcher, config.launcher_path());
    let script = fs::read_to_string(&report.launcher).unwrap();
    assert!(script.starts_with("#!/bin/sh\nJLINK_VM_OPTIONS=\n"));
    assert!(script.contains(&config.image_dir().join("bin").join("java").display().to_string()));
    assert!(script.contains("-m foo/org.example.foo.Foo \"$@\""));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&report.launcher).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}

#[test]
fn test_second_install_keeps_lock() {
    let (temp, config) = project(FOO_MANIFEST);

    let (toolchain, _) = fake_toolchain(false, false);
    let first = installer(config.clone(), foo_resolver(temp.path()), toolchain)
        .install(&mut Reporter::capture())
        .unwrap();
    let lock = fs::read_to_string(temp.path().join(LOCK_FILENAME)).unwrap();

    let (toolchain, _) = fake_toolchain(false, false);
    let second = installer(config, foo_resolver(temp.path()), toolchain)
        .install(&mut Reporter::capture())
        .unwrap();

    assert!(first.lock_updated);
    assert!(!second.lock_updated);
    assert_eq!(fs::read_to_string(temp.path().join(LOCK_FILENAME)).unwrap(), lock);
    assert_eq!(first.staged, second.staged);
}

#[test]
fn test_link_failure_aborts_without_launcher() {
    let (temp, config) = project(FOO_MANIFEST);
    let (toolchain, _) = fake_toolchain(false, true);
    let mut installer = installer(config.clone(), foo_resolver(temp.path()), toolchain);
    let mut reporter = Reporter::capture();

    let err = installer.install(&mut reporter).unwrap_err();

    assert!(matches!(err, BuildError::Link(_)));
    assert_eq!(installer.state(), InstallState::Aborted);
    assert!(config.modules_dir().join("foo.jar").exists());
    assert!(!config.launcher_path().exists());
    assert!(reporter.has_errors());
}

#[test]
fn test_resolution_failure_stages_nothing() {
    let (_temp, config) = project(r#"{ "dependencies": ["org.example:missing:1.0"] }"#);
    let (toolchain, calls) = fake_toolchain(false, false);
    let mut installer = installer(config.clone(), GraphResolver { nodes: vec![] }, toolchain);

    let err = installer.install(&mut Reporter::capture()).unwrap_err();

    assert!(matches!(err, BuildError::Resolution(_)));
    assert_eq!(installer.state(), InstallState::Aborted);
    assert!(!config.modules_dir().exists());
    assert!(!config.lock_path().exists());
    assert!(calls.borrow().linked.is_empty());
}

#[test]
fn test_missing_manifest_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let config = InstallConfig::for_project(temp.path());
    let (toolchain, _) = fake_toolchain(false, false);
    let mut installer = installer(config, GraphResolver { nodes: vec![] }, toolchain);

    let err = installer.install(&mut Reporter::capture()).unwrap_err();

    assert!(matches!(err, BuildError::Manifest(_)));
    assert_eq!(installer.state(), InstallState::Aborted);
}

#[test]
fn test_named_modules_stage_alongside_delegate() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(
        temp.path().join(MANIFEST_FILENAME),
        r#"{ "dependencies": ["org.example:app:1.0", "org.example:tool:1.0"] }"#,
    )
    .unwrap();
    let downloads = temp.path().join("downloads");
    let app = write_jar(
        &downloads.join("app-1.0.jar"),
        &[
            ("module-info.class", &module_info("org.example.app", &["java.base"])),
            ("org/example/app/App.class", b""),
        ],
    );
    let tool = write_jar(&downloads.join("tool-1.0.jar"), &[("tool/Tool.class", b"")]);
    let legacy = write_jar(&downloads.join("1legacy-1.0.jar"), &[("Legacy.class", b"")]);
    let resolver = GraphResolver {
        nodes: vec![
            ResolvedNode::new(id("org.example:app:1.0")).with_content(app),
            ResolvedNode::new(id("org.example:tool:1.0"))
                .with_content(tool)
                .with_dependencies(vec![id("org.example:1legacy:1.0")]),
            ResolvedNode::new(id("org.example:1legacy:1.0")).with_content(legacy),
        ],
    };

    let config = InstallConfig::for_project(temp.path());
    let (toolchain, _) = fake_toolchain(false, false);
    let report = installer(config, resolver, toolchain)
        .install(&mut Reporter::capture())
        .unwrap();

    assert_eq!(report.artifacts, 3);
    assert_eq!(report.named, 1);
    assert_eq!(report.unnamed, 1);
    assert_eq!(report.delegated, 1);
    assert_eq!(report.staged, vec!["org.example.app", "rym.delegate", "tool"]);
}
