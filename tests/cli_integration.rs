//! Integration tests for the `bm` CLI.
//!
//! Each test creates a temp workspace, runs `bm` as a subprocess,
//! and verifies stdout and/or file contents.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const RUST_101: &str = "\
# Rust 101

> An introduction to Rust.

## 0

- [ ] `1` forum: Announcements

## 1 Week one

- [ ] `11` page: Syllabus
- [ ] `12` quiz: Warm-up
  - [~] `13` url: Rust book
- [-] `14` assign: Setup

## 2 Week two

- [ ] `21` page: Ownership

## 3 Week three

## 4 Week four

- [ ] `41` page: Traits
- [ ] `42` quiz: Generics
";

const ADVANCED: &str = "\
# Advanced Rust

## 0

- [ ] `201` page: Welcome
";

/// Create a workspace with two collections in the given directory.
fn create_test_workspace(root: &Path) {
    let bulk_dir = root.join("bulkmod");
    fs::create_dir_all(bulk_dir.join("collections")).unwrap();

    fs::write(
        bulk_dir.join("workspace.toml"),
        r#"[workspace]
name = "Fall term"

[[collections]]
id = 1
file = "collections/rust-101.md"
allow_stealth = true

[[collections]]
id = 2
file = "collections/advanced.md"
max_containers = 3
"#,
    )
    .unwrap();
    fs::write(bulk_dir.join("collections/rust-101.md"), RUST_101).unwrap();
    fs::write(bulk_dir.join("collections/advanced.md"), ADVANCED).unwrap();
}

fn read_collection(root: &Path, file: &str) -> String {
    fs::read_to_string(root.join("bulkmod/collections").join(file)).unwrap()
}

/// Run `bm` with the given args in the given directory, returning (stdout, stderr, success).
fn run_bm(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_bm"))
        .args(args)
        .current_dir(dir)
        .env_remove("BM_LOG")
        .output()
        .expect("failed to run bm");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `bm` expecting success, return stdout.
fn run_bm_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_bm(dir, args);
    if !success {
        panic!(
            "bm {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// Run `bm` expecting failure, return stderr.
fn run_bm_err(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_bm(dir, args);
    if success {
        panic!("bm {:?} unexpectedly succeeded:\nstdout: {}", args, stdout);
    }
    stderr
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

#[test]
fn test_init_creates_workspace() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_bm_ok(
        tmp.path(),
        &["init", "--name", "Fall term", "--collection", "2", "Rust 101"],
    );
    assert!(out.contains("Initialized bulkmod workspace: Fall term"));
    assert!(out.contains("collections/rust-101.md"));

    let config = fs::read_to_string(tmp.path().join("bulkmod/workspace.toml")).unwrap();
    assert!(config.contains("name = \"Fall term\""));
    assert!(config.contains("file = \"collections/rust-101.md\""));
    assert!(read_collection(tmp.path(), "rust-101.md").starts_with("# Rust 101\n\n## 0"));

    let out = run_bm_ok(tmp.path(), &["collections"]);
    assert!(out.contains("Rust 101"));
    assert!(out.contains("1 container"));
}

#[test]
fn test_init_refuses_existing_workspace() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());
    let err = run_bm_err(tmp.path(), &["init"]);
    assert!(err.contains("already exists"));
}

#[test]
fn test_init_rejects_duplicate_collection_ids() {
    let tmp = tempfile::TempDir::new().unwrap();
    let err = run_bm_err(
        tmp.path(),
        &["init", "--collection", "2", "A", "--collection", "2", "B"],
    );
    assert!(err.contains("duplicate collection id 2"));
    assert!(!tmp.path().join("bulkmod").exists());
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

#[test]
fn test_outside_workspace_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let err = run_bm_err(tmp.path(), &["collections"]);
    assert!(err.contains("error: not a bulkmod workspace"));
}

#[test]
fn test_collections_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["collections", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let arr = parsed.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["title"], "Rust 101");
    assert_eq!(arr[0]["containers"], 5);
    assert_eq!(arr[0]["items"], 8);
    assert_eq!(arr[1]["max_containers"], 3);
}

#[test]
fn test_list() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["list", "1"]);
    assert!(out.contains("Week one"));
    assert!(out.contains("  [~] 13 url: Rust book"));
    assert!(out.contains("[-] 14 assign: Setup"));
}

#[test]
fn test_list_with_name_filter() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["list", "1", "--name", "^Syl"]);
    assert!(out.contains("11 page: Syllabus"));
    assert!(!out.contains("Traits"));
    assert!(!out.contains("Week four"));

    let err = run_bm_err(tmp.path(), &["list", "1", "--name", "("]);
    assert!(err.contains("invalid --name pattern"));
}

#[test]
fn test_list_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["list", "1", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["collection"], 1);
    assert_eq!(parsed["containers"][1]["name"], "Week one");
    assert_eq!(parsed["containers"][1]["items"][0]["id"], 11);
    assert_eq!(parsed["containers"][1]["items"][2]["indent"], 1);
}

#[test]
fn test_list_unknown_collection() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());
    let err = run_bm_err(tmp.path(), &["list", "9"]);
    assert!(err.contains("collection not found: 9"));
}

#[test]
fn test_workspace_dir_flag() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());
    let elsewhere = tempfile::TempDir::new().unwrap();

    let dir = tmp.path().to_str().unwrap();
    let out = run_bm_ok(elsewhere.path(), &["-C", dir, "list", "2"]);
    assert!(out.contains("201 page: Welcome"));
}

#[test]
fn test_check_valid() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["check"]);
    assert!(out.contains("✓ workspace is valid"));

    let out = run_bm_ok(tmp.path(), &["check", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["valid"], true);
}

#[test]
fn test_check_reports_duplicate_placement() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());
    let path = tmp.path().join("bulkmod/collections/advanced.md");
    fs::write(&path, format!("{}- [ ] `11` page: Clash\n", ADVANCED)).unwrap();

    let out = run_bm_ok(tmp.path(), &["check"]);
    assert!(out.contains("11 is duplicated in collections: 1, 2"));
    assert!(out.contains("✗ workspace has errors"));
}

// ---------------------------------------------------------------------------
// Batch commands
// ---------------------------------------------------------------------------

#[test]
fn test_mv_appends_in_container_order() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["mv", "1", "14", "11", "--to", "4"]);
    assert!(out.contains("move-to: 2 items changed"));

    let text = read_collection(tmp.path(), "rust-101.md");
    assert!(text.contains(
        "## 4 Week four\n\n\
         - [ ] `41` page: Traits\n\
         - [ ] `42` quiz: Generics\n\
         - [ ] `11` page: Syllabus\n\
         - [-] `14` assign: Setup\n"
    ));
    assert!(text.contains("## 1 Week one\n\n- [ ] `12` quiz: Warm-up\n"));
}

#[test]
fn test_mv_to_missing_container() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let err = run_bm_err(tmp.path(), &["mv", "1", "21", "--to", "9"]);
    assert!(err.contains("move-to: invalid target: container 9 is not an allowed target"));
    assert_eq!(read_collection(tmp.path(), "rust-101.md"), RUST_101);

    // The next free number is created on demand
    let out = run_bm_ok(tmp.path(), &["mv", "1", "21", "--to", "5"]);
    assert!(out.contains("created container 5 in collection 1"));
    let text = read_collection(tmp.path(), "rust-101.md");
    assert!(text.contains("## 5\n\n- [ ] `21` page: Ownership"));
}

#[test]
fn test_indent_and_outdent() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    run_bm_ok(tmp.path(), &["indent", "1", "12"]);
    run_bm_ok(tmp.path(), &["outdent", "1", "13"]);

    let text = read_collection(tmp.path(), "rust-101.md");
    assert!(text.contains("\n  - [ ] `12` quiz: Warm-up\n"));
    assert!(text.contains("\n- [~] `13` url: Rust book\n"));
}

#[test]
fn test_outdent_at_zero_changes_nothing() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["outdent", "1", "11"]);
    assert!(out.contains("move-left: 0 items changed"));
    assert_eq!(read_collection(tmp.path(), "rust-101.md"), RUST_101);
}

#[test]
fn test_hide_and_show() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    run_bm_ok(tmp.path(), &["hide", "1", "11"]);
    run_bm_ok(tmp.path(), &["show", "1", "14", "--stealth"]);

    let text = read_collection(tmp.path(), "rust-101.md");
    assert!(text.contains("- [-] `11` page: Syllabus"));
    assert!(text.contains("- [~] `14` assign: Setup"));
}

#[test]
fn test_stale_ids_are_reported() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["hide", "1", "11", "999", "201"]);
    assert_eq!(out.trim(), "hide: 1 item changed, 2 stale ids ignored");
}

#[test]
fn test_batch_json_report() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["--json", "hide", "1", "11"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["action"], "hide");
    assert_eq!(parsed["selected"], 1);
    assert_eq!(parsed["changed"], serde_json::json!([11]));
}

#[test]
fn test_dup_in_place() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["dup", "1", "11"]);
    // Ids are unique across collections, so the next id follows 201
    assert!(out.contains("duplicate: 1 copy created (11 -> 202)"));

    let text = read_collection(tmp.path(), "rust-101.md");
    assert!(text.contains("- [-] `14` assign: Setup\n- [ ] `202` page: Syllabus (copy)\n"));
}

#[test]
fn test_dup_into_other_collection_drops_stealth() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    run_bm_ok(tmp.path(), &["dup", "1", "13", "--into", "2", "--to", "0"]);

    let text = read_collection(tmp.path(), "advanced.md");
    assert!(text.contains("- [ ] `202` url: Rust book (copy)"));
    assert!(!text.contains("[~]"));
    // The source is untouched
    assert_eq!(read_collection(tmp.path(), "rust-101.md"), RUST_101);
}

#[test]
fn test_dup_into_requires_target() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let err = run_bm_err(tmp.path(), &["dup", "1", "11", "--into", "2"]);
    assert!(err.contains("--into requires --to or --keep-original"));
}

#[test]
fn test_dup_keep_original_over_container_limit() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    // Item 41 sits in container 4; collection 2 holds at most 3 containers
    let err = run_bm_err(
        tmp.path(),
        &["dup", "1", "41", "--into", "2", "--keep-original"],
    );
    assert!(err.contains("invalid target"));
    assert_eq!(read_collection(tmp.path(), "advanced.md"), ADVANCED);
}

#[test]
fn test_rm_then_purge() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["rm", "1", "12"]);
    assert!(out.contains("delete: 1 item marked for deletion"));
    let text = read_collection(tmp.path(), "rust-101.md");
    assert!(text.contains("`12` quiz: Warm-up #deleting"));
    let journal = tmp.path().join("bulkmod/deletions.jsonl");
    assert!(journal.exists());

    let out = run_bm_ok(tmp.path(), &["purge"]);
    assert!(out.contains("purged 1 item(s), skipped 0"));
    let text = read_collection(tmp.path(), "rust-101.md");
    assert!(!text.contains("`12`"));
    assert!(!journal.exists());

    let out = run_bm_ok(tmp.path(), &["purge"]);
    assert!(out.contains("nothing to purge"));
}

#[test]
fn test_purge_removes_flagged_items_missing_from_journal() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());
    let path = tmp.path().join("bulkmod/collections/rust-101.md");
    fs::write(
        &path,
        RUST_101.replace("`21` page: Ownership", "`21` page: Ownership #deleting"),
    )
    .unwrap();

    let out = run_bm_ok(tmp.path(), &["purge"]);
    assert!(out.contains("purged 1 item(s), skipped 0"));
    assert!(out.contains("1 flagged item(s) had no journal entry"));
    let text = read_collection(tmp.path(), "rust-101.md");
    assert!(!text.contains("`21`"));
    assert!(text.contains("## 2 Week two\n"));
}

#[test]
fn test_apply_from_stdin() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let mut child = Command::new(env!("CARGO_BIN_EXE_bm"))
        .args(["apply", "1", "-"])
        .current_dir(tmp.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(br#"{"action":"move-right","itemIds":["21"]}"#)
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("move-right: 1 item changed"));

    let text = read_collection(tmp.path(), "rust-101.md");
    assert!(text.contains("  - [ ] `21` page: Ownership"));
}

#[test]
fn test_apply_malformed_payload() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let err = run_bm_err(tmp.path(), &["apply", "1", r#"{"itemIds":[11]}"#]);
    assert!(err.contains("error: malformed payload: payload has no action"));

    let err = run_bm_err(tmp.path(), &["apply", "1", r#"{"action":"move-to","itemIds":[11]}"#]);
    assert!(err.contains("move-to requires target"));
    assert_eq!(read_collection(tmp.path(), "rust-101.md"), RUST_101);
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

#[test]
fn test_gate_veto_blocks_target() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["gate", "veto", "4"]);
    assert!(out.contains("container 4 vetoed"));
    assert!(out.contains("veto: [4]"));

    let err = run_bm_err(tmp.path(), &["mv", "1", "11", "--to", "4"]);
    assert!(err.contains("move-to: invalid target: container 4 is not an allowed target"));
    assert_eq!(read_collection(tmp.path(), "rust-101.md"), RUST_101);

    run_bm_ok(tmp.path(), &["gate", "allow", "4"]);
    run_bm_ok(tmp.path(), &["mv", "1", "11", "--to", "4"]);
}

#[test]
fn test_gate_policy_denies_creation_in_other_collection() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_bm_ok(tmp.path(), &["gate", "policy", "--create-new", "false"]);
    assert!(out.contains("create_new: false"));
    let config = fs::read_to_string(tmp.path().join("bulkmod/workspace.toml")).unwrap();
    assert!(config.contains("create_new = false"));
    // The rest of the file is left as written
    assert!(config.starts_with("[workspace]\nname = \"Fall term\"\n"));

    let err = run_bm_err(tmp.path(), &["dup", "1", "11", "--into", "2", "--to", "1"]);
    assert!(err.contains("does not exist and new containers may not be created"));

    // Inside one collection the policy flags do not apply
    run_bm_ok(tmp.path(), &["mv", "1", "11", "--to", "5"]);
}
