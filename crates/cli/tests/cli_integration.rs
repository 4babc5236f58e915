//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `anglish` binary and verify exit codes,
//! stdout content, and stderr content.
//!
//! All tests set `current_dir` to the workspace root so that relative
//! paths to `fixtures/` resolve correctly.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `anglish` binary, rooted at workspace,
/// with no endpoint settings leaking in from the environment.
fn anglish() -> Command {
    let mut cmd = cargo_bin_cmd!("anglish");
    cmd.current_dir(workspace_root())
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_BASE_URL")
        .env_remove("OPENAI_MODEL")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().expect("run anglish");
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    anglish()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Anglish contract language toolchain",
        ));
}

#[test]
fn version_exits_0() {
    anglish()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("anglish"));
}

#[test]
fn prompt_help_lists_flags() {
    anglish()
        .args(["prompt", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--node"));
}

// ──────────────────────────────────────────────
// 2. check
// ──────────────────────────────────────────────

#[test]
fn check_clean_contract_exits_0() {
    anglish()
        .args(["check", "fixtures/shop.anglish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fixtures/shop.anglish: ok"));
}

#[test]
fn check_broken_contract_exits_1_with_diagnostics() {
    anglish()
        .args(["check", "fixtures/broken.anglish"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::starts_with("1, 0: "))
        .stdout(predicate::str::contains("Undeclared Identifier"));
}

#[test]
fn check_demo_renders_position_and_message() {
    anglish()
        .args(["check", "fixtures/demo.anglish"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("1, 8: Unknown Tag Name"));
}

#[test]
fn check_json_lists_every_diagnostic() {
    let json = stdout_json(anglish().args(["--output", "json", "check", "fixtures/broken.anglish"]));
    assert_eq!(json["ok"], false);
    let diags = json["diagnostics"].as_array().unwrap();
    assert_eq!(diags.len(), 10);
    assert_eq!(diags[0]["kind"], "ExpectedOuterDecl");
    assert_eq!(diags[9]["kind"], "UndeclaredIdentifier");
    assert_eq!(diags[9]["identifier"], "$missing");
}

#[test]
fn check_json_clean() {
    let json = stdout_json(anglish().args(["check", "fixtures/shop.anglish", "--output", "json"]));
    assert_eq!(json["ok"], true);
    assert_eq!(json["diagnostics"].as_array().unwrap().len(), 0);
}

#[test]
fn check_cycle_exits_1() {
    anglish()
        .args(["check", "fixtures/cycle.anglish"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("5, 0: Node $cook is in a cycle"));
}

#[test]
fn check_missing_file_exits_1() {
    anglish()
        .args(["check", "fixtures/nope.anglish"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error reading"));
}

#[test]
fn check_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tiny.anglish");
    fs::write(&path, "@hub:IO\n> Moves bytes.\n$pump\n> Runs forever.\n").unwrap();
    anglish()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains(": ok"));
}

// ──────────────────────────────────────────────
// 3. parse
// ──────────────────────────────────────────────

#[test]
fn parse_prints_the_declaration_tree() {
    anglish()
        .args(["parse", "fixtures/shop.anglish"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "@storefront:UI:REPLICABLE (in=%cart, out=%receipt)",
        ))
        .stdout(predicate::str::contains("  #cashier:DF (in=%cart)"))
        .stdout(predicate::str::contains("=orders:INVOKE(@storefront, @storefront)"));
}

#[test]
fn parse_json_has_contract_and_diagnostics() {
    let json = stdout_json(anglish().args(["--output", "json", "parse", "fixtures/demo.anglish"]));
    let decls = json["contract"]["decls"].as_array().unwrap();
    assert_eq!(decls.len(), 1);
    assert_eq!(decls[0]["decl"], "space");
    assert_eq!(json["diagnostics"][0]["kind"], "UnknownTag");
}

#[test]
fn parse_reports_diagnostics_on_stderr_but_succeeds() {
    anglish()
        .args(["parse", "fixtures/broken.anglish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#agent:UNKNOWN"))
        .stderr(predicate::str::contains("1, 0: "));
}

// ──────────────────────────────────────────────
// 4. order
// ──────────────────────────────────────────────

#[test]
fn order_lists_dependencies_first() {
    anglish()
        .args(["order", "fixtures/shop.anglish"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1. #cashier\n2. $price\n"))
        .stdout(predicate::str::contains("3. $checkout <- #cashier, $price"))
        .stdout(predicate::str::contains("6. =orders <- @storefront"));
}

#[test]
fn order_reports_cycle_and_exits_1() {
    anglish()
        .args(["order", "fixtures/cycle.anglish"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("1. $wash"))
        .stderr(predicate::str::contains("cycle: $cook \u{2192} $plate \u{2192} $cook"));
}

#[test]
fn order_json() {
    let json = stdout_json(anglish().args(["--output", "json", "order", "fixtures/shop.anglish"]));
    let order = json["order"].as_array().unwrap();
    assert_eq!(order.len(), 6);
    assert_eq!(order[0]["ident"], "#cashier");
    assert_eq!(order[0]["parent"], "@storefront");
    assert_eq!(order[5]["kind"], "path");
    assert!(json["cycle"].is_null());
}

#[test]
fn strict_flag_excludes_unresolved_nodes() {
    anglish()
        .args(["--strict", "order", "fixtures/broken.anglish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. #agent"))
        .stdout(predicate::str::contains("excluded: @space"));
}

#[test]
fn config_file_turns_on_strict() {
    anglish()
        .args([
            "--config",
            "fixtures/anglish.toml",
            "order",
            "fixtures/broken.anglish",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("excluded: @space"));
}

#[test]
fn invalid_config_exits_1() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("anglish.toml");
    fs::write(&path, "[order]\nstrict = \"yes\"\n").unwrap();
    anglish()
        .arg("--config")
        .arg(&path)
        .args(["order", "fixtures/shop.anglish"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

// ──────────────────────────────────────────────
// 5. prompt
// ──────────────────────────────────────────────

#[test]
fn prompt_dry_run_prints_template_fields() {
    anglish()
        .args(["prompt", "fixtures/shop.anglish", "--node", "$checkout", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== $checkout ==="))
        .stdout(predicate::str::contains("Type: Component"))
        .stdout(predicate::str::contains("Inputs: in=%cart"))
        .stdout(predicate::str::contains(
            "Endpoints: =orders: @storefront -> @storefront",
        ));
}

#[test]
fn prompt_dry_run_json() {
    let json = stdout_json(anglish().args([
        "--output",
        "json",
        "prompt",
        "fixtures/shop.anglish",
        "--dry-run",
    ]));
    let reqs = json["requests"].as_array().unwrap();
    assert_eq!(reqs.len(), 6);
    assert_eq!(reqs[0]["ident"], "#cashier");
    assert_eq!(reqs[0]["system"], "ui");
    assert_eq!(reqs[4]["ident"], "#courier");
    assert_eq!(reqs[4]["system"], "func");
    assert_eq!(reqs[4]["fields"]["Type"], "Agent");
}

#[test]
fn prompt_unknown_node_exits_1() {
    anglish()
        .args(["prompt", "fixtures/shop.anglish", "--node", "ghost", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no node named 'ghost'"));
}

#[test]
fn prompt_refuses_a_cyclic_contract() {
    anglish()
        .args(["prompt", "fixtures/cycle.anglish", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dependency cycle"));
}

#[test]
fn prompt_without_api_key_exits_1() {
    anglish()
        .args([
            "--config",
            "fixtures/anglish.toml",
            "prompt",
            "fixtures/shop.anglish",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn dotenv_in_working_directory_supplies_the_endpoint() {
    let dir = TempDir::new().unwrap();
    fs::copy(
        workspace_root().join("fixtures/shop.anglish"),
        dir.path().join("shop.anglish"),
    )
    .unwrap();
    fs::write(
        dir.path().join(".env"),
        "OPENAI_API_KEY=sk-from-dotenv\nOPENAI_BASE_URL=http://127.0.0.1:9\nOPENAI_MODEL=dotenv-model\n",
    )
    .unwrap();
    fs::write(dir.path().join("anglish.toml"), "[endpoint]\nmax_retries = 0\n").unwrap();

    // The key, model and URL all come from .env, so the request is attempted.
    anglish()
        .current_dir(dir.path())
        .args(["prompt", "shop.anglish"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("completion for #cashier failed"))
        .stderr(predicate::str::contains("OPENAI_API_KEY").not());
}

#[test]
fn prompts_dir_overrides_system_prompts() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("func_space_agent_system.md"), "FUNC FROM FILE").unwrap();
    fs::write(dir.path().join("ui_space_agent_system.md"), "UI FROM FILE").unwrap();
    anglish()
        .args(["prompt", "fixtures/shop.anglish", "--dry-run", "--prompts"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[system] UI FROM FILE"))
        .stdout(predicate::str::contains("[system] FUNC FROM FILE"));
}

#[test]
fn missing_prompts_dir_exits_1() {
    anglish()
        .args([
            "prompt",
            "fixtures/shop.anglish",
            "--dry-run",
            "--prompts",
            "fixtures/no-such-prompts",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read prompt file"));
}

#[test]
fn prompt_reports_unreachable_endpoint() {
    anglish()
        .env("OPENAI_API_KEY", "sk-test")
        .args([
            "--config",
            "fixtures/anglish.toml",
            "prompt",
            "fixtures/shop.anglish",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("completion for #cashier failed"));
}
