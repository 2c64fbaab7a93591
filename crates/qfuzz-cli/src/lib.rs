//! Helpers shared by the `qfuzz` binary.

#![warn(missing_docs)]

use qfuzz_core::OutlierPolicy;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Parse an outlier policy argument.
///
/// Accepted forms:
/// - `iqr` or `iqr:<fence>`
/// - `relative` or `relative:<k>` (bound relative to the sample mean)
/// - `relative:<k>@<r>` (bound relative to a fixed reference)
pub fn parse_outlier(arg: &str) -> Result<OutlierPolicy, String> {
    let number = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid number {s:?} in outlier policy: {e}"))
    };

    let (name, params) = match arg.split_once(':') {
        Some((name, params)) => (name, Some(params)),
        None => (arg, None),
    };

    let policy = match (name.trim().to_lowercase().as_str(), params) {
        ("iqr", None) => OutlierPolicy::iqr(),
        ("iqr", Some(fence)) => OutlierPolicy::Iqr {
            fence: number(fence)?,
        },
        ("relative", None) => OutlierPolicy::relative_default(),
        ("relative", Some(p)) => match p.split_once('@') {
            Some((k, r)) => OutlierPolicy::relative_to(number(k)?, number(r)?),
            None => OutlierPolicy::relative(number(p)?),
        },
        _ => {
            return Err(format!(
                "unknown outlier policy {arg:?}; expected iqr[:fence] or relative[:k[@r]]"
            ))
        }
    };

    policy.validate().map_err(|e| e.to_string())?;
    Ok(policy)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` picks the level
/// (0 = info, 1 = debug, 2+ = trace).
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
