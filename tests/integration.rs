// Integration tests drive the binary as a subprocess, the image tool is a shell script that
// records its arguments.
use predicates::prelude::*;
use std::{fs, path::Path, path::PathBuf};
use tempfile::TempDir;

fn imgfill() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("imgfill").unwrap();
    cmd.env("NO_COLOR", "1").env("CLICOLOR", "0");
    cmd
}

fn write_manifest(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("user.bootfs.manifest");
    fs::write(&path, content).unwrap();
    path
}

/// A fake image tool appending each call to `calls.log`, exiting with `exit_code` for mkdir.
#[cfg(unix)]
fn fake_tool(dir: &Path, mkdir_exit_code: i32) -> (PathBuf, PathBuf) {
    use std::os::unix::fs::PermissionsExt;

    let log = dir.join("calls.log");
    let tool = dir.join("minfs");
    let script = format!(
        "#!/bin/sh\n\
         echo \"$@\" >> '{log}'\n\
         if [ \"$2\" = ls ]; then echo \"entries of $3\"; fi\n\
         if [ \"$2\" = mkdir ]; then exit {code}; fi\n\
         exit 0\n",
        log = log.display(),
        code = mkdir_exit_code,
    );
    fs::write(&tool, script).unwrap();
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

    (tool, log)
}

#[test]
fn plan_prints_commands_without_running_anything() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "# generated\na/b/c/file.txt=local1.txt\na/b/d/file2.txt=local2.txt\n",
    );

    imgfill()
        .arg("plan")
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("Preview"))
        .stdout(predicate::str::contains("<tool> <image> mkdir ::/a/b/c"))
        .stdout(predicate::str::contains(
            "<tool> <image> cp local2.txt ::/a/b/d/file2.txt",
        ))
        .stdout(predicate::str::contains("<tool> <image> ls ::/a/b/d"));
}

#[test]
fn plan_requires_a_manifest() {
    imgfill()
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("manifest"));
}

#[test]
fn populate_fails_on_missing_manifest() {
    let dir = TempDir::new().unwrap();

    imgfill()
        .arg("populate")
        .arg("--manifest")
        .arg(dir.path().join("missing.manifest"))
        .arg("--image")
        .arg(dir.path().join("minfs.img"))
        .arg("--tool")
        .arg(dir.path().join("minfs"))
        .assert()
        .failure();
}

#[test]
fn populate_fails_when_tool_cannot_be_launched() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), "bin/sh=out/sh\n");

    imgfill()
        .arg("populate")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--image")
        .arg(dir.path().join("minfs.img"))
        .arg("--tool")
        .arg(dir.path().join("no-such-tool"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to launch image tool"));
}

#[cfg(unix)]
#[test]
fn populate_creates_shared_parent_once() {
    let dir = TempDir::new().unwrap();
    let (tool, log) = fake_tool(dir.path(), 0);
    let manifest = write_manifest(
        dir.path(),
        "data/one.txt=out/one.txt\ndata/two.txt=out/two.txt\ndata/three.txt=out/three.txt\n",
    );

    imgfill()
        .arg("populate")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--image")
        .arg("minfs.img")
        .arg("--tool")
        .arg(&tool)
        .assert()
        .success()
        .stdout("/data\nentries of ::/data\n");

    let calls = fs::read_to_string(&log).unwrap();
    let calls: Vec<&str> = calls.lines().collect();

    assert_eq!(
        calls,
        vec![
            "minfs.img mkdir ::/data",
            "minfs.img cp out/one.txt ::/data/one.txt",
            "minfs.img cp out/two.txt ::/data/two.txt",
            "minfs.img cp out/three.txt ::/data/three.txt",
            "minfs.img ls ::/data",
        ]
    );
}

#[cfg(unix)]
#[test]
fn populate_ignores_tool_failures_by_default() {
    let dir = TempDir::new().unwrap();
    let (tool, log) = fake_tool(dir.path(), 1);
    let manifest = write_manifest(dir.path(), "bin/sh=out/sh\n");

    imgfill()
        .arg("populate")
        .arg("-m")
        .arg(&manifest)
        .arg("-i")
        .arg("minfs.img")
        .arg("-t")
        .arg(&tool)
        .assert()
        .success();

    let calls = fs::read_to_string(&log).unwrap();
    assert!(calls.contains("minfs.img cp out/sh ::/bin/sh"));
}

#[cfg(unix)]
#[test]
fn strict_populate_stops_at_first_failure() {
    let dir = TempDir::new().unwrap();
    let (tool, log) = fake_tool(dir.path(), 1);
    let manifest = write_manifest(dir.path(), "bin/sh=out/sh\n");

    imgfill()
        .arg("populate")
        .arg("-m")
        .arg(&manifest)
        .arg("-i")
        .arg("minfs.img")
        .arg("-t")
        .arg(&tool)
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("image tool exited with status 1"));

    let calls = fs::read_to_string(&log).unwrap();
    assert_eq!(calls.lines().collect::<Vec<_>>(), vec!["minfs.img mkdir ::/bin"]);
}

#[cfg(unix)]
#[test]
fn config_file_supplies_locations() {
    let dir = TempDir::new().unwrap();
    let (tool, log) = fake_tool(dir.path(), 0);
    let manifest = write_manifest(dir.path(), "boot/kernel.bin=out/kernel.bin\n");
    let config = dir.path().join("imgfill.toml");
    fs::write(
        &config,
        format!(
            "manifest = '{}'\nimage = 'disk.img'\ntool = '{}'\nroot_marker = '@'\n",
            manifest.display(),
            tool.display()
        ),
    )
    .unwrap();

    imgfill()
        .arg("--config")
        .arg(&config)
        .arg("populate")
        .assert()
        .success();

    let calls = fs::read_to_string(&log).unwrap();
    assert_eq!(
        calls.lines().collect::<Vec<_>>(),
        vec![
            "disk.img mkdir @/boot",
            "disk.img cp out/kernel.bin @/boot/kernel.bin",
            "disk.img ls @/boot",
        ]
    );
}
