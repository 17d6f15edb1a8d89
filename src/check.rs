use std::path::Path;

use dialflow_flow::{lint, Flow, Severity};

struct CheckResult {
    label: String,
    ok: bool,
    detail: String,
}

/// Load a flow file and print every check in `[OK]`/`[!!]` form.
///
/// Fails only when the flow cannot be loaded; lint findings are reported
/// but do not fail the run.
pub fn run_checks(path: &Path) -> anyhow::Result<()> {
    let flow = match Flow::from_file(path) {
        Ok(flow) => flow,
        Err(e) => {
            print_checks(&[CheckResult {
                label: "Load".into(),
                ok: false,
                detail: e.to_string(),
            }]);
            return Err(e.into());
        }
    };

    let mut checks = vec![check_load(&flow), check_entry(&flow)];
    checks.extend(check_lint(&flow));
    print_checks(&checks);
    Ok(())
}

fn print_checks(checks: &[CheckResult]) {
    let mut ok_count = 0;
    let mut fail_count = 0;

    for check in checks {
        let icon = if check.ok { "[OK]" } else { "[!!]" };
        println!("  {} {}: {}", icon, check.label, check.detail);
        if check.ok {
            ok_count += 1;
        } else {
            fail_count += 1;
        }
    }

    println!();
    println!("  {} passed, {} issues found", ok_count, fail_count);
}

fn check_load(flow: &Flow) -> CheckResult {
    let edges: usize = flow.nodes.iter().map(|n| n.edges.len()).sum();
    CheckResult {
        label: "Load".into(),
        ok: true,
        detail: format!(
            "{} nodes, {} edges, {} actions",
            flow.nodes.len(),
            edges,
            flow.actions.len()
        ),
    }
}

fn check_entry(flow: &Flow) -> CheckResult {
    let finals = flow.nodes.iter().filter(|n| n.is_final).count();
    CheckResult {
        label: "Entry".into(),
        ok: true,
        detail: format!(
            "starts at '{}', {} final node(s)",
            flow.initial_node, finals
        ),
    }
}

fn check_lint(flow: &Flow) -> Vec<CheckResult> {
    let findings = lint(flow);
    if findings.is_empty() {
        return vec![CheckResult {
            label: "Lint".into(),
            ok: true,
            detail: "no findings".into(),
        }];
    }

    findings
        .into_iter()
        .map(|f| CheckResult {
            label: f.check.to_string(),
            ok: f.severity == Severity::Info,
            detail: f.message,
        })
        .collect()
}
