//! End-to-end tests of the binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

const ENV_VARS: &[&str] = &[
    "IMAGE_RELEASE_REGISTRY",
    "IMAGE_RELEASE_NAMESPACE",
    "IMAGE_RELEASE_IMAGE",
    "IMAGE_RELEASE_TAG",
    "IMAGE_RELEASE_FILE",
    "IMAGE_RELEASE_CONTEXT",
    "IMAGE_RELEASE_ENGINE",
    "IMAGE_RELEASE_ENGINE_PATH",
    "IMAGE_RELEASE_USERNAME",
];

/// Binary isolated from the caller's environment and user config
fn image_release(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("image_release").expect("binary built");
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.current_dir(workdir)
        .env("HOME", workdir)
        .env("XDG_CONFIG_HOME", workdir.join(".config"))
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_describes_tool() {
    let dir = tempfile::tempdir().expect("tempdir");
    image_release(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Build a container image"));
}

#[test]
fn test_missing_descriptor_exits_with_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    image_release(dir.path())
        .args(["--namespace", "acme", "--image", "app"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Build descriptor not found"));
}

#[test]
fn test_invalid_tag_exits_with_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    image_release(dir.path())
        .args(["--namespace", "acme", "--image", "app", "--tag", "1:2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("tag"));
}

#[test]
fn test_malformed_project_config_exits_with_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("image-release.toml"), "[image\n").expect("write config");
    image_release(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("image-release.toml"));
}

#[test]
fn test_settings_layers_take_precedence_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let user_config = "[image]\n\
registry = \"user.io\"\n\
namespace = \"userns\"\n\
name = \"userimg\"\n\
tag = \"usertag\"\n";
    // Linux reads $XDG_CONFIG_HOME, macOS reads ~/Library/Application Support
    for config_dir in [
        dir.path().join(".config"),
        dir.path().join("Library").join("Application Support"),
    ] {
        let app_dir = config_dir.join("image-release");
        std::fs::create_dir_all(&app_dir).expect("create user config dir");
        std::fs::write(app_dir.join("config.toml"), user_config).expect("write user config");
    }
    std::fs::write(
        dir.path().join("image-release.toml"),
        "[image]\nnamespace = \"projns\"\nname = \"projimg\"\ntag = \"projtag\"\n",
    )
    .expect("write project config");

    // No Dockerfile: the run stops at the descriptor check after resolving settings
    image_release(dir.path())
        .env("IMAGE_RELEASE_TAG", "envtag")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Releasing user.io/projns/projimg:envtag"));
}

#[test]
fn test_flag_overrides_environment() {
    let dir = tempfile::tempdir().expect("tempdir");
    image_release(dir.path())
        .env("IMAGE_RELEASE_TAG", "envtag")
        .args(["--namespace", "acme", "--image", "app", "--tag", "flagtag"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Releasing quay.io/acme/app:flagtag"));
}

#[cfg(unix)]
mod fake_engine {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SCRIPT: &str = r#"#!/bin/sh
echo "$@" >> "$FAKE_ENGINE_LOG"
case "$1" in
  build) echo "STEP 1/1: FROM scratch" ;;
  images) printf 'quay.io/acme/app\tlatest\t3f2a9c1b7e44\t12MB\n' ;;
esac
exit 0
"#;

    struct Fixture {
        dir: TempDir,
        engine: PathBuf,
        log: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n")
                .expect("write Dockerfile");

            let engine = dir.path().join("fake-engine");
            std::fs::write(&engine, SCRIPT).expect("write script");
            std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755))
                .expect("chmod script");

            let log = dir.path().join("engine.log");
            Self { dir, engine, log }
        }

        fn command(&self) -> Command {
            let mut cmd = image_release(self.dir.path());
            cmd.env("FAKE_ENGINE_LOG", &self.log).args([
                "--registry",
                "quay.io",
                "--namespace",
                "acme",
                "--image",
                "app",
                "--engine-path",
            ]);
            cmd.arg(&self.engine);
            cmd
        }

        fn calls(&self) -> String {
            std::fs::read_to_string(&self.log).unwrap_or_default()
        }
    }

    #[test]
    fn test_confirmed_release_pushes() {
        let fixture = Fixture::new();
        fixture
            .command()
            .write_stdin("y\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("quay.io/acme/app:latest"));

        let calls = fixture.calls();
        assert!(calls.contains("info"));
        assert!(calls.contains("build -f"));
        assert!(calls.contains("-t quay.io/acme/app:latest"));
        assert!(calls.contains("login quay.io"));
        assert!(calls.contains("push quay.io/acme/app:latest"));
    }

    #[test]
    fn test_declined_release_does_not_push() {
        let fixture = Fixture::new();
        fixture.command().write_stdin("n\n").assert().code(1);

        let calls = fixture.calls();
        assert!(calls.contains("build"));
        assert!(!calls.contains("login"));
        assert!(!calls.contains("push"));
    }

    #[test]
    fn test_end_of_input_declines() {
        let fixture = Fixture::new();
        fixture.command().write_stdin("").assert().code(1);
        assert!(!fixture.calls().contains("push"));
    }

    #[test]
    fn test_unanswered_prompt_times_out_as_decline() {
        use std::process::{Command as StdCommand, Stdio};
        use std::time::{Duration, Instant};

        let fixture = Fixture::new();
        let mut cmd = StdCommand::new(env!("CARGO_BIN_EXE_image_release"));
        for var in ENV_VARS {
            cmd.env_remove(var);
        }
        cmd.current_dir(fixture.dir.path())
            .env("HOME", fixture.dir.path())
            .env("XDG_CONFIG_HOME", fixture.dir.path().join(".config"))
            .env("NO_COLOR", "1")
            .env("FAKE_ENGINE_LOG", &fixture.log)
            .args([
                "--registry",
                "quay.io",
                "--namespace",
                "acme",
                "--image",
                "app",
                "--confirm-timeout",
                "1",
                "--engine-path",
            ])
            .arg(&fixture.engine)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().expect("spawn binary");
        // Stdin stays open and silent until the binary exits
        let _stdin = child.stdin.take();

        let deadline = Instant::now() + Duration::from_secs(30);
        let status = loop {
            if let Some(status) = child.try_wait().expect("poll child") {
                break status;
            }
            if Instant::now() > deadline {
                let _ = child.kill();
                panic!("binary still waiting for an answer after the timeout");
            }
            std::thread::sleep(Duration::from_millis(50));
        };

        assert_eq!(status.code(), Some(1));
        let calls = fixture.calls();
        assert!(calls.contains("build"));
        assert!(!calls.contains("login"));
        assert!(!calls.contains("push"));
    }

    #[test]
    fn test_yes_flag_pushes_without_prompt() {
        let fixture = Fixture::new();
        fixture
            .command()
            .args(["--yes", "--username", "robot"])
            .assert()
            .success();
        assert!(fixture.calls().contains("login -u robot quay.io"));
    }
}
