//! Prometheus text exposition format.
//!
//! Renders gauge samples into the Prometheus text exposition format
//! for scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use surge_autoscale::Measurement;

use crate::registry::GaugeSample;

/// Render gauge samples into Prometheus text format.
///
/// Every measurement gets HELP and TYPE lines, followed by one line per
/// service that reported it, labelled with `service`.
pub fn render_prometheus(samples: &[GaugeSample]) -> String {
    let mut out = String::new();

    for measurement in Measurement::ALL {
        let name = metric_name(measurement);
        let _ = writeln!(out, "# HELP {name} {}", measurement.help());
        let _ = writeln!(out, "# TYPE {name} gauge");
        for s in samples.iter().filter(|s| s.measurement == measurement) {
            let _ = writeln!(
                out,
                "{name}{{service=\"{}\"}} {}",
                escape_label(&s.service),
                format_value(measurement, s.value)
            );
        }
    }

    out
}

fn metric_name(measurement: Measurement) -> String {
    format!("surge_{}", measurement.name())
}

fn format_value(measurement: Measurement, value: f64) -> String {
    match measurement {
        Measurement::DesiredPods | Measurement::ObservedPods | Measurement::PanicMode => {
            format!("{}", value as i64)
        }
        _ => format!("{value:.2}"),
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
