use assert_cmd::Command;
use assert_cmd::cargo;
use flate2::Compression;
use flate2::write::GzEncoder;
use mockito::Server;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::io::prelude::*;
use std::path::Path;
use tar::Builder;
use tempfile::tempdir;

fn create_tar_gz(files: &[(&str, &str, u32)]) -> Vec<u8> {
    let mut tar_builder = Builder::new(Vec::new());
    for (name, content, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_path(name).unwrap();
        header.set_mode(*mode);
        header.set_cksum();
        tar_builder.append(&header, content.as_bytes()).unwrap();
    }
    let tar = tar_builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

/// `sepia` with a clean environment, the builtin extractor and `root`.
fn sepia(root: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("sepia"));
    cmd.env_remove("SEPIA_ROOT")
        .env_remove("SEPIA_NPM_INSTALLER")
        .env_remove("SEPIA_MAX_CONCURRENCY")
        .env_remove("SEPIA_EXTRACTOR")
        .arg("--root")
        .arg(root)
        .arg("--extractor")
        .arg("builtin");
    cmd
}

fn write_descriptors(dir: &Path, descriptors: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("packages.json");
    fs::write(&path, descriptors.to_string()).unwrap();
    path
}

#[test]
fn test_install_then_uninstall_file_and_tarball() {
    let mut server = Server::new();
    let url = server.url();

    let _mock_file = server
        .mock("GET", "/download/jq-linux64")
        .with_status(200)
        .with_body("#!/bin/sh\necho jq\n")
        .create();
    let tarball = create_tar_gz(&[("rg-14.1.0/rg", "#!/bin/sh\necho rg\n", 0o755)]);
    let _mock_tar = server
        .mock("GET", "/download/rg-14.1.0.tar.gz")
        .with_status(200)
        .with_body(&tarball)
        .create();

    let work = tempdir().unwrap();
    let root = work.path().join("root");
    let descriptors = write_descriptors(
        work.path(),
        json!([
            { "type": "file", "package": { "name": "jq", "url": format!("{}/download/jq-linux64", url) } },
            { "type": "compressed", "package": {
                "name": "rg",
                "url": format!("{}/download/rg-14.1.0.tar.gz", url),
                "binPath": "rg-14.1.0/rg"
            } }
        ]),
    );

    sepia(&root)
        .arg("install")
        .arg(&descriptors)
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed jq ->"))
        .stdout(predicate::str::contains("Installed rg ->"));

    let jq = root.join("bin/jq");
    let rg = root.join("bin/rg");
    assert!(jq.is_symlink());
    assert_eq!(fs::read_link(&jq).unwrap(), root.join("packages/jq/package"));
    assert_eq!(
        fs::read_link(&rg).unwrap(),
        root.join("packages/rg/content/rg-14.1.0/rg")
    );
    assert_eq!(fs::read_to_string(&rg).unwrap(), "#!/bin/sh\necho rg\n");

    sepia(&root)
        .arg("uninstall")
        .arg(&descriptors)
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalled jq"))
        .stdout(predicate::str::contains("Uninstalled rg"));

    assert!(!root.join("packages/jq").exists());
    assert!(!root.join("packages/rg").exists());
    assert!(fs::symlink_metadata(&jq).is_err());
    assert!(fs::symlink_metadata(&rg).is_err());
}

#[test]
fn test_uninstall_never_installed_succeeds() {
    let work = tempdir().unwrap();
    let root = work.path().join("root");

    sepia(&root)
        .arg("uninstall")
        .arg("-")
        .write_stdin(
            json!([{ "type": "gem", "package": { "name": "haml_lint", "version": "0.51.0" } }])
                .to_string(),
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalled haml_lint"));
}

#[test]
fn test_reinstall_replaces_stale_content() {
    let mut server = Server::new();
    let _mock_file = server
        .mock("GET", "/tool")
        .with_status(200)
        .with_body("fresh")
        .create();

    let work = tempdir().unwrap();
    let root = work.path().join("root");
    let stale = root.join("packages/tool/leftover.txt");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "stale").unwrap();

    let descriptors = write_descriptors(
        work.path(),
        json!([{ "type": "file", "package": { "name": "tool", "url": format!("{}/tool", server.url()) } }]),
    );

    sepia(&root).arg("install").arg(&descriptors).assert().success();

    assert!(!stale.exists());
    assert_eq!(fs::read_to_string(root.join("bin/tool")).unwrap(), "fresh");
}

#[test]
fn test_failure_is_isolated_and_exit_code_nonzero() {
    let mut server = Server::new();
    let _mock_file = server
        .mock("GET", "/ok")
        .with_status(200)
        .with_body("ok")
        .create();

    let work = tempdir().unwrap();
    let root = work.path().join("root");
    let descriptors = write_descriptors(
        work.path(),
        json!([
            { "type": "file", "package": { "name": "ok", "url": format!("{}/ok", server.url()) } },
            { "type": "tar", "package": {
                "name": "rg",
                "url": "https://example.invalid/rg.zip",
                "binPath": "rg"
            } }
        ]),
    );

    sepia(&root)
        .arg("install")
        .arg(&descriptors)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Installed ok ->"))
        .stderr(predicate::str::contains("Failed to install rg"))
        .stderr(predicate::str::contains("must be a tar file extension"));

    assert!(root.join("bin/ok").exists());
    assert!(!root.join("packages/rg").exists());
}

#[test]
fn test_download_error_reports_status() {
    let mut server = Server::new();
    let _mock_missing = server
        .mock("GET", "/missing")
        .with_status(404)
        .create();

    let work = tempdir().unwrap();
    let root = work.path().join("root");

    sepia(&root)
        .arg("install")
        .arg("-")
        .write_stdin(
            json!([{ "type": "file", "package": { "name": "gone", "url": format!("{}/missing", server.url()) } }])
                .to_string(),
        )
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to install gone"))
        .stderr(predicate::str::contains("HTTP 404"));

    assert!(fs::symlink_metadata(root.join("bin/gone")).is_err());
}

#[test]
fn test_malformed_input_fails() {
    let work = tempdir().unwrap();
    let root = work.path().join("root");

    sepia(&root)
        .arg("install")
        .arg("-")
        .write_stdin("{ not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON array"));
}
