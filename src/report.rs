//! Post-processing of API performance runs.
//!
//! Reads the JSON export of a Newman run, groups executions by endpoint and
//! turns their response times into CSV, Markdown and JSON reports.

use crate::error::ReportError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct RunSummary {
    pub run: Run,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    #[serde(default)]
    pub executions: Vec<Execution>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Execution {
    pub item: Item,
    pub request: Option<Request>,
    pub response: Option<Response>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: Option<RequestUrl>,
}

/// Newman writes either a structured URL or the raw string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RequestUrl {
    Structured {
        #[serde(default)]
        path: Vec<String>,
    },
    Raw(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(rename = "responseTime")]
    pub response_time: f64,
    #[serde(default)]
    pub code: u16,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RequestUrl {
    fn endpoint(&self) -> String {
        match self {
            RequestUrl::Structured { path } => format!("/{}", path.join("/")),
            RequestUrl::Raw(raw) => {
                let without_scheme = raw.split_once("://").map_or(raw.as_str(), |(_, rest)| rest);
                let path = without_scheme
                    .find('/')
                    .map_or("", |i| &without_scheme[i..]);
                let path = path.split(['?', '#']).next().unwrap_or("");
                if path.is_empty() {
                    "/".to_string()
                } else {
                    path.to_string()
                }
            }
        }
    }
}

/// Response time statistics of one endpoint, in whole milliseconds.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub request: String,
    pub method: String,
    pub endpoint: String,
    pub iterations: usize,
    pub min: i64,
    pub max: i64,
    pub average: i64,
    pub median: i64,
    pub std_dev: i64,
    pub success_rate: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub endpoints: Vec<EndpointStats>,
    pub total_executions: usize,
    pub overall_average: i64,
    pub overall_min: i64,
    pub overall_max: i64,
}

#[derive(Default)]
struct Samples {
    request: String,
    method: String,
    endpoint: String,
    times: Vec<f64>,
    codes: Vec<u16>,
}

pub fn parse_run(json: &str) -> Result<RunSummary, ReportError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_run(path: impl AsRef<Path>) -> Result<RunSummary, ReportError> {
    let content = std::fs::read_to_string(path)?;
    parse_run(&content)
}

/// Groups executions by `"<METHOD> <endpoint>"` in first-seen order and
/// computes per-endpoint statistics.
///
/// Executions without a response (the request never completed) are skipped.
pub fn analyze(summary: &RunSummary) -> Result<PerformanceReport, ReportError> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Samples> = HashMap::new();
    let mut all_times = Vec::new();

    for execution in &summary.run.executions {
        let Some(response) = &execution.response else {
            log::warn!("Skipping '{}': no response recorded", execution.item.name);
            continue;
        };
        let (method, endpoint) = match &execution.request {
            Some(request) => (
                request.method.to_uppercase(),
                request.url.as_ref().map_or_else(|| "/".to_string(), RequestUrl::endpoint),
            ),
            None => (default_method(), "/".to_string()),
        };

        let key = format!("{} {}", method, endpoint);
        let samples = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Samples {
                request: execution.item.name.clone(),
                method,
                endpoint,
                ..Samples::default()
            }
        });
        samples.times.push(response.response_time);
        samples.codes.push(response.code);
        all_times.push(response.response_time);
    }

    if all_times.is_empty() {
        return Err(ReportError::Empty);
    }

    let endpoints: Vec<EndpointStats> = order
        .iter()
        .filter_map(|key| groups.remove(key))
        .map(endpoint_stats)
        .collect();

    let overall_min = all_times.iter().copied().fold(f64::INFINITY, f64::min);
    let overall_max = all_times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let overall_average = all_times.iter().sum::<f64>() / all_times.len() as f64;

    Ok(PerformanceReport {
        endpoints,
        total_executions: all_times.len(),
        overall_average: overall_average.round() as i64,
        overall_min: overall_min.round() as i64,
        overall_max: overall_max.round() as i64,
    })
}

fn endpoint_stats(samples: Samples) -> EndpointStats {
    let mut sorted = samples.times.clone();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let average = sorted.iter().sum::<f64>() / n as f64;
    let mid = n / 2;
    let median = if n % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };
    let variance = sorted.iter().map(|t| (t - average).powi(2)).sum::<f64>() / n as f64;

    let successes = samples
        .codes
        .iter()
        .filter(|&&code| (200..300).contains(&code))
        .count();
    let success_rate = format!("{:.1}%", successes as f64 / samples.codes.len() as f64 * 100.0);

    EndpointStats {
        request: samples.request,
        method: samples.method,
        endpoint: samples.endpoint,
        iterations: n,
        min: sorted[0].round() as i64,
        max: sorted[n - 1].round() as i64,
        average: average.round() as i64,
        median: median.round() as i64,
        std_dev: variance.sqrt().round() as i64,
        success_rate,
    }
}

/// Bucket used for the per-category Markdown tables.
pub fn category_of(request: &str) -> &'static str {
    if request.contains("User") {
        "Users"
    } else if request.contains("Function") {
        "Functions"
    } else if request.contains("Point") {
        "Points"
    } else {
        "Other"
    }
}

pub fn to_csv(report: &PerformanceReport) -> String {
    let mut csv =
        String::from("Method,Endpoint,Request,Iterations,Avg(ms),Min(ms),Max(ms),Median(ms),StdDev,SuccessRate\n");
    for stat in &report.endpoints {
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{},{},{},{}",
            stat.method,
            stat.endpoint,
            csv_field(&stat.request),
            stat.iterations,
            stat.average,
            stat.min,
            stat.max,
            stat.median,
            stat.std_dev,
            stat.success_rate
        );
    }
    csv
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn to_markdown(
    report: &PerformanceReport,
    title: &str,
    generated_at: DateTime<Local>,
) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# {}\n", title);
    let _ = writeln!(md, "**Test date:** {}  ", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(md, "**Endpoints:** {}  ", report.endpoints.len());
    let _ = writeln!(md, "**Executions:** {}  \n", report.total_executions);

    let _ = writeln!(md, "## Response Time Statistics (ms)\n");
    let _ = writeln!(md, "| # | Method | Endpoint | Request | Avg | Min | Max | Median | Std Dev | Success |");
    let _ = writeln!(md, "|---|--------|----------|---------|-----|-----|-----|--------|---------|---------|");
    for (i, stat) in report.endpoints.iter().enumerate() {
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            i + 1,
            stat.method,
            stat.endpoint,
            stat.request,
            stat.average,
            stat.min,
            stat.max,
            stat.median,
            stat.std_dev,
            stat.success_rate
        );
    }

    for category in ["Users", "Functions", "Points", "Other"] {
        let members: Vec<&EndpointStats> = report
            .endpoints
            .iter()
            .filter(|s| category_of(&s.request) == category)
            .collect();
        if members.is_empty() {
            continue;
        }
        let _ = writeln!(md, "\n### {}\n", category);
        let _ = writeln!(md, "| Endpoint | Min | Max | Avg | Median | Std Dev |");
        let _ = writeln!(md, "|----------|-----|-----|-----|--------|---------|");
        for stat in members {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} | {} |",
                stat.request, stat.min, stat.max, stat.average, stat.median, stat.std_dev
            );
        }
    }

    let _ = writeln!(md, "\n## Summary\n");
    let _ = writeln!(md, "| Metric | Value |");
    let _ = writeln!(md, "|--------|-------|");
    let _ = writeln!(md, "| Endpoints tested | {} |", report.endpoints.len());
    let _ = writeln!(md, "| Total requests | {} |", report.total_executions);
    let _ = writeln!(md, "| Average response time | {} ms |", report.overall_average);
    let _ = writeln!(md, "| Minimum time | {} ms |", report.overall_min);
    let _ = writeln!(md, "| Maximum time | {} ms |", report.overall_max);
    if let Some(fastest) = fastest_endpoint(report) {
        let _ = writeln!(md, "| Fastest endpoint | {} ({} ms) |", fastest.request, fastest.average);
    }
    if let Some(slowest) = slowest_endpoint(report) {
        let _ = writeln!(md, "| Slowest endpoint | {} ({} ms) |", slowest.request, slowest.average);
    }
    md
}

/// Lowest average; the earliest endpoint wins a tie.
pub fn fastest_endpoint(report: &PerformanceReport) -> Option<&EndpointStats> {
    report
        .endpoints
        .iter()
        .reduce(|best, s| if s.average < best.average { s } else { best })
}

/// Highest average; the earliest endpoint wins a tie.
pub fn slowest_endpoint(report: &PerformanceReport) -> Option<&EndpointStats> {
    report
        .endpoints
        .iter()
        .reduce(|best, s| if s.average > best.average { s } else { best })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    timestamp: String,
    environment: &'a str,
    #[serde(flatten)]
    report: &'a PerformanceReport,
}

pub fn to_json(
    report: &PerformanceReport,
    environment: &str,
    generated_at: DateTime<Local>,
) -> Result<String, ReportError> {
    let json = JsonReport {
        timestamp: generated_at.to_rfc3339(),
        environment,
        report,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

/// Writes `<prefix>-<timestamp>.{csv,md,json}` into `dir`, creating it if needed.
pub fn write_reports(
    report: &PerformanceReport,
    dir: impl AsRef<Path>,
    prefix: &str,
    title: &str,
    generated_at: DateTime<Local>,
) -> Result<Vec<PathBuf>, ReportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let stamp = generated_at.format("%Y-%m-%dT%H-%M-%S").to_string();

    let csv_path = dir.join(format!("{}-{}.csv", prefix, stamp));
    let md_path = dir.join(format!("{}-{}.md", prefix, stamp));
    let json_path = dir.join(format!("{}-{}.json", prefix, stamp));

    std::fs::write(&csv_path, to_csv(report))?;
    std::fs::write(&md_path, to_markdown(report, title, generated_at))?;
    std::fs::write(&json_path, to_json(report, title, generated_at)?)?;

    log::info!("Reports written to {}", dir.display());
    Ok(vec![csv_path, md_path, json_path])
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN: &str = r#"{
        "run": {
            "stats": {"items": {"total": 5, "failed": 0}},
            "executions": [
                {"item": {"name": "Get User"}, "request": {"method": "GET", "url": {"path": ["api", "users", "1"]}}, "response": {"responseTime": 10, "code": 200}},
                {"item": {"name": "Create Function"}, "request": {"method": "post", "url": {"path": ["api", "functions"]}}, "response": {"responseTime": 30, "code": 201}},
                {"item": {"name": "Get User"}, "request": {"method": "GET", "url": {"path": ["api", "users", "1"]}}, "response": {"responseTime": 20, "code": 500}},
                {"item": {"name": "Get User"}, "request": {"method": "GET", "url": {"path": ["api", "users", "1"]}}, "response": {"responseTime": 40, "code": 200}},
                {"item": {"name": "Health"}, "request": {"method": "GET", "url": "http://localhost:8080/health?full=1"}, "response": {"responseTime": 5, "code": 200}},
                {"item": {"name": "Timed out"}, "request": {"method": "GET", "url": {"path": ["slow"]}}}
            ]
        }
    }"#;

    fn report() -> PerformanceReport {
        analyze(&parse_run(RUN).unwrap()).unwrap()
    }

    #[test]
    fn groups_in_first_seen_order() {
        let report = report();
        let keys: Vec<String> = report
            .endpoints
            .iter()
            .map(|s| format!("{} {}", s.method, s.endpoint))
            .collect();
        assert_eq!(
            keys,
            vec!["GET /api/users/1", "POST /api/functions", "GET /health"]
        );
        assert_eq!(report.total_executions, 5);
    }

    #[test]
    fn endpoint_statistics() {
        let users = &report().endpoints[0];
        assert_eq!(users.iterations, 3);
        assert_eq!(users.min, 10);
        assert_eq!(users.max, 40);
        assert_eq!(users.average, 23);
        assert_eq!(users.median, 20);
        assert_eq!(users.std_dev, 12);
        assert_eq!(users.success_rate, "66.7%");
    }

    #[test]
    fn even_counts_average_the_middle_pair() {
        let run = r#"{"run": {"executions": [
            {"item": {"name": "A"}, "request": {"method": "GET", "url": {"path": ["a"]}}, "response": {"responseTime": 1, "code": 200}},
            {"item": {"name": "A"}, "request": {"method": "GET", "url": {"path": ["a"]}}, "response": {"responseTime": 4, "code": 200}}
        ]}}"#;
        let report = analyze(&parse_run(run).unwrap()).unwrap();
        assert_eq!(report.endpoints[0].median, 3);
        assert_eq!(report.endpoints[0].success_rate, "100.0%");
    }

    #[test]
    fn empty_run_is_an_error() {
        let summary = parse_run(r#"{"run": {"executions": []}}"#).unwrap();
        assert!(matches!(analyze(&summary), Err(ReportError::Empty)));
    }

    #[test]
    fn categories_follow_request_names() {
        assert_eq!(category_of("Get User"), "Users");
        assert_eq!(category_of("Create Function"), "Functions");
        assert_eq!(category_of("List Points"), "Points");
        assert_eq!(category_of("Health"), "Other");
    }

    #[test]
    fn csv_has_one_row_per_endpoint() {
        let csv = to_csv(&report());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "GET,/api/users/1,Get User,3,23,10,40,20,12,66.7%");
    }

    #[test]
    fn markdown_names_fastest_and_slowest() {
        let md = to_markdown(&report(), "API Performance", Local::now());
        assert!(md.starts_with("# API Performance"));
        assert!(md.contains("### Users"));
        assert!(md.contains("### Functions"));
        assert!(!md.contains("### Points"));
        assert!(md.contains("| Fastest endpoint | Health (5 ms) |"));
        assert!(md.contains("| Slowest endpoint | Create Function (30 ms) |"));
    }

    #[test]
    fn reports_are_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_reports(&report(), dir.path(), "api", "API", Local::now()).unwrap();
        assert_eq!(paths.len(), 3);
        for path in &paths {
            assert!(path.exists());
        }
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths[2]).unwrap()).unwrap();
        assert_eq!(json["environment"], "API");
        assert_eq!(json["endpoints"][0]["successRate"], "66.7%");
    }
}
