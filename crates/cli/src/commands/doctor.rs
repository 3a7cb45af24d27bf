use std::time::Instant;

use clientdesk_core::config::{DeskConfig, LoadOptions};
use serde::Serialize;

use crate::commands::customers::{build_api, Backend};
use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, backend: Backend, json_output: bool) -> CommandResult {
    let report = build_report(options, backend);
    let exit_code = u8::from(report.overall_status != CheckStatus::Pass);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult::text(exit_code, output)
}

pub fn build_report(options: &LoadOptions, backend: Backend) -> DoctorReport {
    let mut checks = Vec::new();

    match DeskConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_backend(&config, backend));
            checks.push(check_export_directory(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["backend_reachability", "export_directory"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_backend(config: &DeskConfig, backend: Backend) -> DoctorCheck {
    let fail = |details: String| DoctorCheck {
        name: "backend_reachability",
        status: CheckStatus::Fail,
        details,
    };

    let api = match build_api(config, backend) {
        Ok(api) => api,
        Err(message) => return fail(message),
    };
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => return fail(format!("failed to initialize async runtime: {error}")),
    };

    let started = Instant::now();
    match runtime.block_on(api.list_all()) {
        Ok(customers) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Pass,
            details: format!(
                "{} answered with {} customers in {} ms",
                target(config, backend),
                customers.len(),
                started.elapsed().as_millis()
            ),
        },
        Err(error) => fail(format!("{}: {}", target(config, backend), error.user_message())),
    }
}

fn check_export_directory(config: &DeskConfig) -> DoctorCheck {
    let directory = &config.export.directory;
    match std::fs::metadata(directory) {
        Ok(metadata) if metadata.is_dir() && !metadata.permissions().readonly() => DoctorCheck {
            name: "export_directory",
            status: CheckStatus::Pass,
            details: format!("`{}` is writable", directory.display()),
        },
        Ok(_) => DoctorCheck {
            name: "export_directory",
            status: CheckStatus::Fail,
            details: format!("`{}` is not a writable directory", directory.display()),
        },
        // Exports create the directory on demand.
        Err(_) => DoctorCheck {
            name: "export_directory",
            status: CheckStatus::Pass,
            details: format!("`{}` will be created on first export", directory.display()),
        },
    }
}

fn target(config: &DeskConfig, backend: Backend) -> String {
    match backend {
        Backend::Http => format!("`{}`", config.api.base_url),
        Backend::Memory => "in-memory backend".to_string(),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
