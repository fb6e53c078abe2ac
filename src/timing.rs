//! Stage timing for packaging runs.

use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::Result;
use crate::task::pack::PackStage;

/// Run `stage`, logging its start and how long it took.
///
/// The stage's result is passed through unchanged.
pub fn timed<T>(stage: PackStage, run: impl FnOnce() -> Result<T>) -> Result<T> {
    info!("{}...", stage);
    let start = Instant::now();
    let result = run();
    let elapsed = format_elapsed(start.elapsed());

    match &result {
        Ok(_) => info!("[{}] {} done", elapsed, stage),
        Err(_) => warn!("[{}] {} failed", elapsed, stage),
    }
    result
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs >= 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_elapsed(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_timed_passes_result_through() {
        assert_eq!(timed(PackStage::Staging, || Ok(7)).unwrap(), 7);

        let err = timed(PackStage::Imaging, || -> Result<()> { Err(Error::image("boom")) })
            .unwrap_err();
        assert!(err.is_image());
    }
}
