use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write file");
}

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir_all(dir.path().join("home")).expect("mkdir");
        fs::create_dir_all(dir.path().join("work/.git")).expect("mkdir");
        Self { dir }
    }

    fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    fn work(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    fn data(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn bin(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("skillsync"));
        cmd.env("HOME", self.home())
            .env("SKILLSYNC_HOME", self.data())
            .env_remove("RUST_LOG")
            .current_dir(self.work());
        cmd
    }

    fn backup_ids(&self) -> Vec<String> {
        let output = self
            .bin()
            .args(["backup", "list"])
            .output()
            .expect("run list");
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.split('\t').next().map(str::to_string))
            .collect()
    }
}

#[test]
fn cli_discover_lists_merged_skills() {
    let env = Env::new();
    write_file(
        &env.work().join(".claude/skills/review/SKILL.md"),
        "---\nname: review\ndescription: Review code\n---\nBody\n",
    );
    write_file(
        &env.home().join(".claude/skills/review/SKILL.md"),
        "---\nname: review\ndescription: User copy\n---\nBody\n",
    );
    write_file(
        &env.home().join(".claude/skills/notes/SKILL.md"),
        "---\nname: notes\n---\nBody\n",
    );

    env.bin()
        .args(["discover", "--platform", "claude-code"])
        .assert()
        .success()
        .stdout(contains("review\trepo\t.claude/skills/review/SKILL.md\tReview code"))
        .stdout(contains("notes\tuser"));
}

#[test]
fn cli_discover_json_and_scope_filter() {
    let env = Env::new();
    write_file(
        &env.work().join(".cursor/skills/style.mdc"),
        "---\nglobs: '*.rs'\n---\nUse rustfmt.\n",
    );
    write_file(
        &env.home().join(".cursor/skills/personal/SKILL.md"),
        "---\nname: personal\n---\nMine\n",
    );

    env.bin()
        .args(["discover", "-p", "cursor", "--scope", "repo", "--json"])
        .assert()
        .success()
        .stdout(contains(r#""name": "style""#))
        .stdout(contains(r#""platform": "cursor""#))
        .stdout(contains(r#""scope": "repo""#))
        .stdout(contains("personal").not());
}

#[test]
fn cli_discover_rejects_unknown_platform() {
    let env = Env::new();
    env.bin()
        .args(["discover", "--platform", "vim"])
        .assert()
        .failure()
        .stderr(contains("Unknown platform"));
}

#[test]
fn cli_discover_skips_broken_files() {
    let env = Env::new();
    write_file(
        &env.work().join(".codex/skills/good/SKILL.md"),
        "---\nname: good\n---\nfine\n",
    );
    write_file(
        &env.work().join(".codex/skills/bad/SKILL.md"),
        "---\nname: [unclosed\n---\nbroken\n",
    );

    env.bin()
        .args(["discover", "--platform", "codex"])
        .assert()
        .success()
        .stdout(contains("good\trepo"))
        .stderr(contains("WARN"));
}

#[test]
fn cli_backup_create_verify_restore() {
    let env = Env::new();
    let source = env.work().join(".claude/skills/review/SKILL.md");
    write_file(&source, "---\nname: review\n---\nOriginal\n");

    env.bin()
        .args(["backup", "create", "-p", "claude-code", "--tag", "pre-sync"])
        .arg(&source)
        .assert()
        .success();
    assert!(env.data().join("metadata/index.json").exists());

    let ids = env.backup_ids();
    assert_eq!(ids.len(), 1);
    let id = &ids[0];

    env.bin()
        .args(["backup", "verify", id.as_str()])
        .assert()
        .success()
        .stdout(contains("OK"));

    fs::write(&source, "changed").expect("write");
    env.bin().args(["backup", "restore", id.as_str()]).assert().success();
    assert_eq!(
        fs::read_to_string(&source).expect("read"),
        "---\nname: review\n---\nOriginal\n"
    );

    env.bin()
        .args(["backup", "history"])
        .arg(&source)
        .arg("--json")
        .assert()
        .success()
        .stdout(contains(r#""tags": ["#))
        .stdout(contains("pre-sync"));
}

#[test]
fn cli_backup_verify_reports_tampering() {
    let env = Env::new();
    let source = env.work().join("rules/style.mdc");
    write_file(&source, "Use tabs.\n");

    env.bin()
        .args(["backup", "create", "-p", "cursor"])
        .arg(&source)
        .assert()
        .success();

    let stored = env.data().join("backups/cursor");
    let entry = fs::read_dir(&stored)
        .expect("read dir")
        .next()
        .expect("one backup")
        .expect("entry");
    fs::write(entry.path(), "tampered").expect("write");

    env.bin()
        .args(["backup", "verify"])
        .assert()
        .failure()
        .stderr(contains("integrity check"));
}

#[test]
fn cli_backup_directory_then_cleanup_and_stats() {
    let env = Env::new();
    let skill_dir = env.work().join(".codex/skills/deploy");
    write_file(&skill_dir.join("SKILL.md"), "---\nname: deploy\n---\nShip it.\n");
    write_file(&skill_dir.join("scripts/deploy.sh"), "echo deploy\n");

    env.bin()
        .args(["backup", "create", "--platform", "codex"])
        .arg(&skill_dir)
        .assert()
        .success();

    env.bin()
        .args(["backup", "stats"])
        .assert()
        .success()
        .stdout(contains("Backups: 2"))
        .stdout(contains("codex: 2"));

    env.bin()
        .args(["backup", "cleanup", "--max-count", "0", "--keep-at-least-one", "--dry-run"])
        .assert()
        .success()
        .stdout(predicates::str::is_empty());

    env.bin()
        .args(["backup", "cleanup", "--max-count", "0", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("Would delete"));
    assert_eq!(env.backup_ids().len(), 2);

    env.bin()
        .args(["backup", "cleanup", "--max-count", "0"])
        .assert()
        .success()
        .stdout(contains("Deleted"));
    assert!(env.backup_ids().is_empty());
}

#[test]
fn cli_backup_reports_corrupt_index() {
    let env = Env::new();
    write_file(&env.data().join("metadata/index.json"), "{oops");

    env.bin()
        .args(["backup", "list"])
        .assert()
        .failure()
        .stderr(contains("corrupt"));
    assert_eq!(
        fs::read_to_string(env.data().join("metadata/index.json")).expect("read"),
        "{oops"
    );
}

#[test]
fn cli_backup_unknown_id_fails() {
    let env = Env::new();
    env.bin()
        .args(["backup", "delete", "20250101-000000-deadbeef"])
        .assert()
        .failure()
        .stderr(contains("Backup not found"));
}
