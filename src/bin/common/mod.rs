// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for CLI commands.

use std::path::Path;

use c3dcodec::{Acquisition, AcquisitionFileIo, C3dFormat, Value, ValueData};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise warnings only, or debug with
/// `verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber installed earlier stays in place.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Format a duration in seconds to human-readable string.
pub fn format_duration(secs: f64) -> String {
    let millis = (secs * 1000.0).round() as u64;
    let whole = millis / 1000;

    if whole >= 3600 {
        format!("{}h {}m", whole / 3600, (whole % 3600) / 60)
    } else if whole >= 60 {
        format!("{}m {}s", whole / 60, whole % 60)
    } else if whole > 0 {
        format!("{}.{:03}s", whole, millis % 1000)
    } else {
        format!("{}ms", millis)
    }
}

/// Render a parameter value on one line.
pub fn format_value(value: &Value) -> String {
    const MAX_ITEMS: usize = 8;

    let items: Vec<String> = match value.data() {
        ValueData::String(_) => value
            .to_strings()
            .into_iter()
            .map(|s| format!("{s:?}"))
            .collect(),
        _ => value.to_strings(),
    };
    let shown = items.len().min(MAX_ITEMS);
    let mut text = items[..shown].join(", ");
    if items.len() > shown {
        text.push_str(&format!(", ... ({} total)", items.len()));
    }
    format!("[{text}]")
}

/// Read a C3D file, returning the handler with the state of the read.
pub fn open_acquisition(path: &Path) -> Result<(C3dFormat, Acquisition)> {
    let mut io = C3dFormat::new();
    let mut acq = Acquisition::new();
    io.read(path, &mut acq)?;
    Ok((io, acq))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.5), "500ms");
        assert_eq!(format_duration(1.5), "1.500s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3600.0), "1h 0m");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::int16s(vec![1, 2, 3])), "[1, 2, 3]");
        assert_eq!(format_value(&Value::string("mm")), "[\"mm\"]");
        let long = Value::int16s((0..10).collect());
        assert!(format_value(&long).ends_with("... (10 total)]"));
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging(false);
        init_logging(true);
        tracing::debug!("still logging");
    }
}
