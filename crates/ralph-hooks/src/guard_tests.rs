use super::*;

fn protection() -> ProtectionConfig {
    ProtectionConfig::default()
}

#[test]
fn test_rm_of_config_is_denied() {
    let decision = evaluate("rm .claude/ralph-config.json", &protection());
    match decision {
        GuardDecision::Deny { reason } => {
            assert!(reason.contains(".claude/ralph-config.json"));
        }
        GuardDecision::Allow => panic!("rm of config must be denied"),
    }
}

#[test]
fn test_rm_rf_of_sessions_dir_is_denied() {
    let decision = evaluate("rm -rf .claude/ralph-sessions", &protection());
    assert!(decision.is_deny());
}

#[test]
fn test_mv_away_is_denied() {
    let decision = evaluate("mv .claude/ralph-state.json /tmp/", &protection());
    assert!(decision.is_deny());
}

#[test]
fn test_truncate_is_denied() {
    let decision = evaluate("truncate -s 0 .claude/ralph-config.json", &protection());
    assert!(decision.is_deny());
}

#[test]
fn test_overwrite_redirection_is_denied() {
    let decision = evaluate("echo '{}' > .claude/ralph-config.json", &protection());
    assert!(decision.is_deny());
}

#[test]
fn test_append_redirection_is_denied() {
    let decision = evaluate("echo x >> .claude/ralph-state.json", &protection());
    assert!(decision.is_deny());
}

#[test]
fn test_basename_reference_is_caught() {
    let decision = evaluate("cd .claude && rm ralph-config.json", &protection());
    assert!(decision.is_deny());
}

#[test]
fn test_absolute_path_is_caught() {
    let decision = evaluate("rm /work/proj/.claude/ralph-config.json", &protection());
    assert!(decision.is_deny());
}

#[test]
fn test_read_of_protected_file_is_allowed() {
    let decision = evaluate("cat .claude/ralph-config.json", &protection());
    assert_eq!(decision, GuardDecision::Allow);
}

#[test]
fn test_grep_of_protected_file_is_allowed() {
    let decision = evaluate(
        "grep similarity .claude/ralph-config.json | head",
        &protection(),
    );
    assert_eq!(decision, GuardDecision::Allow);
}

#[test]
fn test_rm_of_unprotected_file_is_allowed() {
    let decision = evaluate("rm target/debug/stale.o", &protection());
    assert_eq!(decision, GuardDecision::Allow);
}

#[test]
fn test_bypass_marker_allows() {
    let decision = evaluate(
        "rm .claude/ralph-config.json # RALPH_STOP_SCRIPT",
        &protection(),
    );
    assert_eq!(decision, GuardDecision::Allow);
}

#[test]
fn test_word_boundary_avoids_false_positives() {
    // "format" contains "rm" but is not a destructive op.
    let decision = evaluate("format .claude/ralph-config.json", &protection());
    assert_eq!(decision, GuardDecision::Allow);
}

#[test]
fn test_empty_command_is_allowed() {
    assert_eq!(evaluate("", &protection()), GuardDecision::Allow);
    assert_eq!(evaluate("   ", &protection()), GuardDecision::Allow);
}

#[test]
fn test_custom_protected_file() {
    let mut protection = protection();
    protection.protected_files.push("docs/plan.md".into());
    let decision = evaluate("rm docs/plan.md", &protection);
    assert!(decision.is_deny());
}

#[test]
fn test_kill_switch_creation_is_allowed() {
    // Touching STOP_LOOP is how a user requests a stop; it is not in the
    // protected list and must stay writable.
    let decision = evaluate("touch .claude/STOP_LOOP", &protection());
    assert_eq!(decision, GuardDecision::Allow);
}

#[test]
fn test_builtin_protection_survives_config_edit() {
    let trimmed = ProtectionConfig {
        protected_files: vec![],
        bypass_markers: vec!["RALPH_STOP_SCRIPT".into()],
    };
    let decision = evaluate("rm .claude/ralph-config.json", &trimmed);
    assert!(decision.is_deny());
}
