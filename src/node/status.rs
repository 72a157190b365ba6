//! Fixed-width scheduler host report (`key   value` blocks) to a Markdown summary.
//!
//! Keys start at column 0 and are separated from their value by at least two
//! spaces. Indented lines continue the previous value. `load_values` holds a
//! comma-separated `k=v` list whose values may themselves contain commas inside
//! square brackets.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::OnceLock;

use regex::Regex;

use crate::errors::Result;

fn key_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\S+\s{2,}").expect("valid regex"))
}

fn wide_gap() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("valid regex"))
}

fn clean(value: &str) -> String {
    value.trim().trim_end_matches([',', '\\']).to_owned()
}

pub fn parse_fixed_format<S: AsRef<str>>(lines: &[S]) -> HashMap<String, String> {
    let mut data = HashMap::new();
    let mut current: Option<(String, String)> = None;

    for line in lines.iter().map(AsRef::as_ref) {
        if line.trim().is_empty() {
            continue;
        }

        if key_line().is_match(line) {
            if let Some((key, value)) = current.take() {
                data.insert(key, clean(&value));
            }
            let mut parts = wide_gap().splitn(line.trim(), 2);
            let key = parts.next().unwrap_or_default().trim().to_owned();
            let value = clean(parts.next().unwrap_or_default());
            current = Some((key, value));
        } else if let Some((_, value)) = current.as_mut() {
            value.push_str(&clean(line));
        }
    }

    if let Some((key, value)) = current {
        data.insert(key, clean(&value));
    }
    data
}

pub fn read_fixed_format<R: BufRead>(reader: R) -> Result<HashMap<String, String>> {
    let lines = reader.lines().collect::<std::io::Result<Vec<String>>>()?;
    Ok(parse_fixed_format(&lines))
}

/// Split `k=v` pairs on commas that are not inside `[...]`.
pub fn parse_embedded_kv(s: &str) -> HashMap<String, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);

    parts
        .into_iter()
        .filter_map(|part| part.trim().split_once('='))
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .collect()
}

/// Size with an optional K/M/G suffix, in megabytes. Unreadable values are 0.
pub fn parse_with_units(value: &str) -> f64 {
    let value = value.trim().to_ascii_uppercase();
    if value.is_empty() {
        return 0.0;
    }
    let (number, multiplier) = match value.chars().last() {
        Some('K') => (&value[..value.len() - 1], 1.0 / 1024.0),
        Some('M') => (&value[..value.len() - 1], 1.0),
        Some('G') => (&value[..value.len() - 1], 1024.0),
        _ => (value.as_str(), 1.0),
    };
    number.parse::<f64>().map(|n| n * multiplier).unwrap_or(0.0)
}

pub fn human_readable_report(data: &HashMap<String, String>) -> String {
    let mut report = Vec::new();
    let hostname = data.get("hostname").map(String::as_str).unwrap_or("unknown");
    report.push(format!("Node: {}\n", hostname));

    let load = parse_embedded_kv(data.get("load_values").map(String::as_str).unwrap_or(""));
    let get = |key: &str| load.get(key).map(String::as_str);
    let mb = |key: &str| parse_with_units(get(key).unwrap_or("0"));

    let cpu_usage = get("cpu").and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0);
    report.push("### System Overview".to_owned());
    report.push(format!("- CPU Threads: {}", get("num_proc").unwrap_or("N/A")));
    report.push(format!("- CPU Load: {:.1}%", cpu_usage));
    report.push(format!(
        "- Memory: {:.1} MB total / {:.1} MB used / {:.1} MB free",
        mb("mem_total"),
        mb("mem_used"),
        mb("mem_free")
    ));
    report.push(format!(
        "- Swap: {:.1} MB total / {:.1} MB used / {:.1} MB free",
        mb("swap_total"),
        mb("swap_used"),
        mb("swap_free")
    ));
    report.push(format!("- SSD Scratch: {:.1} GB\n", mb("scratch")));

    report.push("### Load Averages".to_owned());
    report.push(format!("- 1-min: {}", get("load_short").unwrap_or("N/A")));
    report.push(format!("- 5-min: {}", get("load_avg").unwrap_or("N/A")));
    report.push(format!("- 15-min: {}\n", get("load_long").unwrap_or("N/A")));

    report.push("### GPUs".to_owned());
    let gpu_names = get("gpu.names").unwrap_or("");
    let gpus = gpu_names.split(';').filter(|_| !gpu_names.is_empty());
    for (idx, name) in gpus.enumerate() {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let field = |f: &str| get(&format!("gpu.cuda.{}.{}", idx, f)).unwrap_or("N/A").to_owned();
        let mem_free = get(&format!("gpu.cuda.{}.mem_free", idx))
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0);

        report.push(format!("#### GPU {} - {}", idx, name));
        report.push(format!("- Utilization: {}%", field("util")));
        report.push(format!("- Processes Running: {}", field("procs")));
        report.push(format!(
            "- Memory Free: {:.2} GB",
            mem_free / 1024f64.powi(3)
        ));
        report.push(format!("- Clock Speed: {} MHz\n", field("clock")));
    }

    report.join("\n")
}
