//! Diagnostic checks run by `snapback doctor`: configuration validity,
//! workspace writability, and reachability of the optional upstream and
//! documentation services. Never starts the server.

use snapback_domain::config::{Config, ConfigSeverity};

fn print_check(name: &str, passed: bool, detail: &str) {
    let mark = if passed { "ok" } else { "FAIL" };
    println!("[{mark}] {name}: {detail}");
}

fn check_config(config: &Config, all_passed: &mut bool) {
    let production = !config.telemetry.is_development();
    let issues = config.validate(production);
    let errors: Vec<_> = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .collect();
    if errors.is_empty() {
        print_check("config", true, "no fatal issues");
    } else {
        *all_passed = false;
        print_check("config", false, &format!("{} fatal issue(s)", errors.len()));
        for e in errors {
            println!("       {e}");
        }
    }
}

fn check_workspace(config: &Config, all_passed: &mut bool) {
    let root = config.workspace.resolved_root();
    match std::fs::create_dir_all(config.workspace.state_path()) {
        Ok(()) => print_check("workspace", true, &format!("{} is writable", root.display())),
        Err(e) => {
            *all_passed = false;
            print_check("workspace", false, &format!("{}: {e}", root.display()));
        }
    }
}

async fn check_service_reachable(name: &str, base_url: &Option<String>, all_passed: &mut bool) {
    let Some(base_url) = base_url else {
        print_check(name, true, "not configured, skipped");
        return;
    };

    let client = match reqwest::Client::builder().timeout(std::time::Duration::from_secs(5)).build() {
        Ok(c) => c,
        Err(e) => {
            *all_passed = false;
            print_check(name, false, &format!("building HTTP client: {e}"));
            return;
        }
    };

    match client.get(base_url).send().await {
        Ok(resp) => print_check(name, true, &format!("responded with status {}", resp.status())),
        Err(e) => {
            *all_passed = false;
            print_check(name, false, &format!("{base_url}: {e}"));
        }
    }
}

/// Runs every check and prints a pass/fail line for each. Returns whether
/// every check passed.
pub async fn run(config: &Config) -> bool {
    let mut all_passed = true;

    check_config(config, &mut all_passed);
    check_workspace(config, &mut all_passed);
    check_service_reachable("upstream", &config.upstream.base_url, &mut all_passed).await;
    check_service_reachable("docs", &config.docs.base_url, &mut all_passed).await;

    if all_passed {
        println!("all checks passed");
    } else {
        println!("one or more checks failed");
    }
    all_passed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_config_check_in_development() {
        let mut all_passed = true;
        check_config(&Config::default(), &mut all_passed);
        assert!(all_passed);
    }

    #[test]
    fn workspace_check_creates_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.workspace.root = Some(dir.path().to_path_buf());
        let mut all_passed = true;
        check_workspace(&config, &mut all_passed);
        assert!(all_passed);
        assert!(config.workspace.state_path().exists());
    }

    #[tokio::test]
    async fn unconfigured_service_reachability_passes_trivially() {
        let mut all_passed = true;
        check_service_reachable("upstream", &None, &mut all_passed).await;
        assert!(all_passed);
    }
}
