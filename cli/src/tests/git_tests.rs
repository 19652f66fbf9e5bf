// Git-compare tests
// The mock covers loading semantics; the scratch repository covers the git plumbing

use crate::git::{is_yaml_path, load_with_source_tracking, Git, GitError, VersionSource};
use crate::tests::mocks::MockVersionSource;
use std::path::Path;
use std::process::Command;
use yamlcmtdiff::Engine;

const APP_V1: &str = "metadata:\n  name: app\nreplicas: 1\n---\nmetadata:\n  name: worker\n";
const APP_V2: &str = "metadata:\n  name: app\nreplicas: 2\n";

#[test]
fn test_yaml_paths() {
    assert!(is_yaml_path("deploy/app.yaml"));
    assert!(is_yaml_path("app.yml"));
    assert!(!is_yaml_path("README.md"));
    assert!(!is_yaml_path("yaml"));
}

#[test]
fn test_load_tags_documents_with_their_file() {
    let source = MockVersionSource::new("main")
        .with_old("app.yaml", APP_V1)
        .with_current("app.yaml", APP_V2);

    let (old, new) =
        load_with_source_tracking(&source, "main", &[String::from("app.yaml")]).unwrap();

    assert_eq!(old.len(), 2);
    assert_eq!(new.len(), 1);
    assert!(old
        .iter()
        .chain(new.iter())
        .all(|doc| doc.source_file.as_deref() == Some("app.yaml")));

    let result = Engine::default().compare(&old, &new);
    assert_eq!(result.modified.keys().collect::<Vec<_>>(), vec!["app"]);
    assert_eq!(result.deleted.keys().collect::<Vec<_>>(), vec!["worker"]);
}

#[test]
fn test_file_missing_at_reference_is_new() {
    let source = MockVersionSource::new("main").with_current("new.yaml", APP_V2);

    let (old, new) =
        load_with_source_tracking(&source, "main", &[String::from("new.yaml")]).unwrap();

    assert!(old.is_empty());
    let result = Engine::default().compare(&old, &new);
    assert_eq!(result.added.keys().collect::<Vec<_>>(), vec!["app"]);
}

#[test]
fn test_same_name_in_two_files_is_disambiguated() {
    let source = MockVersionSource::new("main")
        .with_current("base.yaml", "metadata:\n  name: app\n")
        .with_current("overlay.yaml", "metadata:\n  name: app\nextra: true\n");
    let files = source.changed_files("main").unwrap();
    assert_eq!(files, vec!["base.yaml", "overlay.yaml"]);

    let (old, new) = load_with_source_tracking(&source, "main", &files).unwrap();
    let result = Engine::default().compare(&old, &new);

    assert_eq!(
        result.added.keys().collect::<Vec<_>>(),
        vec!["app (from base.yaml)", "app (from overlay.yaml)"]
    );
}

#[test]
fn test_broken_old_version_names_the_file() {
    let source = MockVersionSource::new("main")
        .with_old("app.yaml", "a: [unclosed\n")
        .with_current("app.yaml", APP_V2);

    let err =
        load_with_source_tracking(&source, "main", &[String::from("app.yaml")]).unwrap_err();

    match err {
        GitError::Parse { version, path, .. } => {
            assert_eq!(version, "old");
            assert_eq!(path, "app.yaml");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_invalid_utf8_is_an_error_not_a_replacement() {
    let source = MockVersionSource::new("main")
        .with_old_bytes("app.yaml", b"metadata:\n  name: app\nv: \"\xff\"\n")
        .with_current_bytes("app.yaml", b"metadata:\n  name: app\nv: \"\xfe\"\n");

    let err =
        load_with_source_tracking(&source, "main", &[String::from("app.yaml")]).unwrap_err();

    match err {
        GitError::Encoding { version, path, .. } => {
            assert_eq!(version, "old");
            assert_eq!(path, "app.yaml");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_invalid_utf8_in_working_tree_names_new_version() {
    let source = MockVersionSource::new("main")
        .with_old("app.yaml", APP_V2)
        .with_current_bytes("app.yaml", b"metadata:\n  name: app\nv: \"\xfe\"\n");

    let err =
        load_with_source_tracking(&source, "main", &[String::from("app.yaml")]).unwrap_err();

    assert!(matches!(err, GitError::Encoding { version: "new", .. }));
    assert!(err.to_string().contains("app.yaml"));
}

#[test]
fn test_file_missing_from_working_tree_is_an_error() {
    let source = MockVersionSource::new("main").with_old("app.yaml", APP_V1);
    let err =
        load_with_source_tracking(&source, "main", &[String::from("app.yaml")]).unwrap_err();
    assert!(matches!(err, GitError::Read { .. }));
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git {:?} failed", args);
}

#[test]
fn test_scratch_repository() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    git(root, &["init", "--quiet"]);
    std::fs::write(root.join("app.yaml"), APP_V1).unwrap();
    std::fs::write(root.join("notes.txt"), "v1").unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "--quiet", "-m", "initial"]);

    std::fs::write(root.join("app.yaml"), APP_V2).unwrap();
    std::fs::write(root.join("notes.txt"), "v2").unwrap();
    std::fs::write(root.join("fresh.yml"), "metadata:\n  name: fresh\n").unwrap();
    git(root, &["add", "fresh.yml"]);

    let repo = Git::in_dir(root);
    assert!(repo.is_repository().unwrap());
    repo.verify_reference("HEAD").unwrap();
    assert!(matches!(
        repo.verify_reference("no-such-branch"),
        Err(GitError::UnknownReference(_))
    ));

    let files = repo.changed_files("HEAD").unwrap();
    assert_eq!(files, vec!["app.yaml", "fresh.yml"]);

    assert_eq!(
        repo.read_at("HEAD", "app.yaml").unwrap().as_deref(),
        Some(APP_V1.as_bytes())
    );
    assert!(repo.read_at("HEAD", "fresh.yml").unwrap().is_none());

    let (old, new) = load_with_source_tracking(&repo, "HEAD", &files).unwrap();
    let result = Engine::default().compare(&old, &new);
    assert_eq!(result.added.keys().collect::<Vec<_>>(), vec!["fresh"]);
    assert_eq!(result.deleted.keys().collect::<Vec<_>>(), vec!["worker"]);
    assert_eq!(result.modified.keys().collect::<Vec<_>>(), vec!["app"]);
}

#[test]
fn test_outside_repository() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let repo = Git::in_dir(dir.path());
    assert!(matches!(
        repo.verify_reference("HEAD"),
        Err(GitError::NotARepository)
    ));
}
