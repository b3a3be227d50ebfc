use crate::api::Tracker;

/// Builds the announce list from the daemon's tracker rows.
///
/// DHT, PeX and LSD pseudo-rows are dropped. Real trackers keep the
/// daemon's tier order and are de-duplicated. `primary` (the tracker the
/// daemon is currently using) is only consulted when no real row is left.
pub fn announce_list(trackers: &[Tracker], primary: Option<&str>) -> Vec<String> {
    let mut real: Vec<&Tracker> = trackers.iter().filter(|t| is_real_tracker(t)).collect();
    // Stable sort keeps the daemon order within a tier.
    real.sort_by_key(|t| t.tier);

    let mut urls: Vec<String> = Vec::with_capacity(real.len());
    for tracker in real {
        if !urls.contains(&tracker.url) {
            urls.push(tracker.url.clone());
        }
    }

    if urls.is_empty() {
        if let Some(primary) = primary.filter(|p| !p.is_empty()) {
            urls.push(primary.to_string());
        }
    }

    urls
}

fn is_real_tracker(tracker: &Tracker) -> bool {
    tracker.tier >= 0 && tracker.url.contains("://")
}
