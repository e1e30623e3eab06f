//! Text exposition format 0.0.4 for summary metrics.
//!
//! Each series renders one line per quantile target, a `_sum` line and a
//! `_total` line. A quantile with no data in the window renders the `NaN`
//! sentinel rather than being omitted.

use std::fmt::Write;

use crate::accumulator::Accumulator;
use crate::registry::SummaryRegistry;
use crate::summary::Summary;

/// Content type clients should be served alongside this encoding.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub fn encode_text(registry: &SummaryRegistry) -> String {
    let mut out = String::new();
    for summary in registry.summaries() {
        encode_summary(&mut out, &summary);
    }
    out
}

pub fn encode_summary<A: Accumulator>(out: &mut String, summary: &Summary<A>) {
    let descriptor = summary.descriptor();
    let _ = writeln!(out, "# TYPE {} summary", descriptor.name);
    let _ = writeln!(out, "# HELP {} {}", descriptor.name, descriptor.help);

    let mut series = summary.values();
    series.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (label_values, value) in series {
        let base_labels = format_labels(descriptor.labels, &label_values, None);
        for (quantile, estimate) in &value.quantiles {
            let labels = format_labels(descriptor.labels, &label_values, Some(*quantile));
            let _ = writeln!(
                out,
                "{}{} {}",
                descriptor.name,
                labels,
                format_float(estimate.unwrap_or(f64::NAN))
            );
        }
        let _ = writeln!(
            out,
            "{}_sum{} {}",
            descriptor.name,
            base_labels,
            format_float(value.sum)
        );
        let _ = writeln!(
            out,
            "{}_total{} {}",
            descriptor.name, base_labels, value.count
        );
    }
}

fn format_labels(names: &[&str], values: &[String], quantile: Option<f64>) -> String {
    let mut pairs: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let value = values.get(idx).map(|s| s.as_str()).unwrap_or("unknown");
            format!("{}=\"{}\"", name, escape_label(value))
        })
        .collect();
    if let Some(quantile) = quantile {
        pairs.push(format!("quantile=\"{}\"", format_float(quantile)));
    }
    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", pairs.join(","))
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() {
            "-Inf".to_string()
        } else {
            "+Inf".to_string()
        };
    }
    let mut s = format!("{:.6}", value);
    while s.contains('.') && s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s.is_empty() {
        s.push('0');
    }
    s
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
