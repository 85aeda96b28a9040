//! Playback timeline for digital screens.
//!
//! A screen plays a loop of `spots_per_loop` fixed-length spots, over and
//! over, starting at a configured time of day. Spot times are produced by
//! stepping a clock forward one spot at a time; the clock wraps at
//! midnight and spots that finish on a later day are flagged.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{CmsConfig, MediaKind, Record, ScreenSchedule};

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Upper bound on spots produced by one request.
pub const MAX_SPOTS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopConfig {
    pub start: NaiveTime,
    pub spot_duration_secs: u32,
    pub spots_per_loop: u32,
}

impl From<&CmsConfig> for LoopConfig {
    fn from(cms: &CmsConfig) -> Self {
        Self {
            start: cms.start_time,
            spot_duration_secs: cms.spot_duration_secs,
            spots_per_loop: cms.spots_per_loop,
        }
    }
}

impl LoopConfig {
    #[must_use]
    pub fn loop_duration_secs(&self) -> u64 {
        u64::from(self.spot_duration_secs) * u64::from(self.spots_per_loop)
    }

    /// Most whole loops a single request may lay out.
    #[must_use]
    pub fn max_loops(&self) -> u32 {
        match u64::from(self.spots_per_loop) {
            0 => 0,
            spots => u32::try_from(MAX_SPOTS / spots).unwrap_or(u32::MAX),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.spot_duration_secs == 0 {
            return Err(Error::BadRequest(
                "spot_duration_secs must be greater than zero".to_string(),
            ));
        }
        if self.spots_per_loop == 0 {
            return Err(Error::BadRequest(
                "spots_per_loop must be greater than zero".to_string(),
            ));
        }
        if self.loop_duration_secs() > SECONDS_PER_DAY {
            return Err(Error::BadRequest(
                "one loop cannot be longer than 24 hours".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Spot {
    /// Zero-based loop this spot belongs to.
    pub loop_index: u32,
    /// One-based position within the loop.
    pub spot_number: u32,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub wraps_midnight: bool,
}

/// Spots of loops `first_loop..first_loop + loops`.
fn build_spots(cfg: &LoopConfig, first_loop: u32, loops: u32) -> Result<Vec<Spot>> {
    cfg.validate()?;
    let total = u64::from(loops) * u64::from(cfg.spots_per_loop);
    if total > MAX_SPOTS {
        return Err(Error::BadRequest(format!(
            "timeline would have {total} spots, the limit is {MAX_SPOTS}"
        )));
    }

    let last_loop = first_loop
        .checked_add(loops)
        .ok_or_else(|| Error::BadRequest(format!("loop index {first_loop} is out of range")))?;

    let step = Duration::seconds(i64::from(cfg.spot_duration_secs));
    let skip = Duration::seconds((u64::from(first_loop) * cfg.loop_duration_secs()) as i64);
    let (mut cursor, carry) = cfg.start.overflowing_add_signed(skip);
    let mut days = carry / SECONDS_PER_DAY as i64;

    let mut spots = Vec::with_capacity(total as usize);
    for loop_index in first_loop..last_loop {
        for spot_number in 1..=cfg.spots_per_loop {
            let (end, carry) = cursor.overflowing_add_signed(step);
            let end_days = days + carry / SECONDS_PER_DAY as i64;
            spots.push(Spot {
                loop_index,
                spot_number,
                start: cursor,
                end,
                wraps_midnight: end_days > 0,
            });
            cursor = end;
            days = end_days;
        }
    }
    Ok(spots)
}

/// Spots of a single loop.
pub fn build_loop(cfg: &LoopConfig, loop_index: u32) -> Result<Vec<Spot>> {
    build_spots(cfg, loop_index, 1)
}

/// Consecutive loops starting from the configured start time.
pub fn build_timeline(cfg: &LoopConfig, loops: u32) -> Result<Vec<Spot>> {
    build_spots(cfg, 0, loops)
}

/// Whole loops that fit between the start time and `end`.
///
/// An `end` at or before the start means the window runs past midnight.
#[must_use]
pub fn loops_between(cfg: &LoopConfig, end: NaiveTime) -> u32 {
    let loop_secs = cfg.loop_duration_secs();
    if loop_secs == 0 {
        return 0;
    }
    let window = if end > cfg.start {
        (end - cfg.start).num_seconds() as u64
    } else {
        SECONDS_PER_DAY - (cfg.start - end).num_seconds() as u64
    };
    u32::try_from(window / loop_secs).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotContent {
    pub schedule_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub content_type: MediaKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineSlot {
    #[serde(flatten)]
    pub spot: Spot,
    pub content: Option<SlotContent>,
}

/// Pairs each spot with the schedule that plays in it on `date`.
#[must_use]
pub fn assign_content(
    spots: Vec<Spot>,
    schedules: &[Record<ScreenSchedule>],
    date: NaiveDate,
) -> Vec<TimelineSlot> {
    spots
        .into_iter()
        .map(|spot| {
            let content = schedules
                .iter()
                .find(|s| s.data.spot_number == spot.spot_number && s.data.active_on(date))
                .map(|s| SlotContent {
                    schedule_id: s.id.clone(),
                    title: s.data.title.clone(),
                    media_url: s.data.media_url.clone(),
                    content_type: s.data.content_type,
                });
            TimelineSlot { spot, content }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn cfg(start: NaiveTime, duration: u32, spots: u32) -> LoopConfig {
        LoopConfig {
            start,
            spot_duration_secs: duration,
            spots_per_loop: spots,
        }
    }

    #[test]
    fn test_single_loop_fixed_increments() {
        let spots = build_loop(&cfg(time(6, 0, 0), 15, 4), 0).unwrap();
        assert_eq!(spots.len(), 4);
        assert_eq!(spots[0].start, time(6, 0, 0));
        assert_eq!(spots[0].end, time(6, 0, 15));
        assert_eq!(spots[3].spot_number, 4);
        assert_eq!(spots[3].start, time(6, 0, 45));
        assert_eq!(spots[3].end, time(6, 1, 0));
        assert!(spots.iter().all(|s| !s.wraps_midnight));
    }

    #[test]
    fn test_later_loop_starts_after_previous() {
        let c = cfg(time(6, 0, 0), 15, 4);
        let second = build_loop(&c, 1).unwrap();
        assert_eq!(second[0].loop_index, 1);
        assert_eq!(second[0].start, time(6, 1, 0));

        let timeline = build_timeline(&c, 3).unwrap();
        assert_eq!(timeline.len(), 12);
        assert_eq!(timeline[4], second[0]);
        assert_eq!(timeline[11].end, time(6, 3, 0));
    }

    #[test]
    fn test_wraps_past_midnight() {
        let spots = build_timeline(&cfg(time(23, 59, 30), 20, 3), 1).unwrap();
        assert_eq!(spots[0].end, time(23, 59, 50));
        assert!(!spots[0].wraps_midnight);
        assert_eq!(spots[1].start, time(23, 59, 50));
        assert_eq!(spots[1].end, time(0, 0, 10));
        assert!(spots[1].wraps_midnight);
        assert_eq!(spots[2].start, time(0, 0, 10));
        assert!(spots[2].wraps_midnight);
    }

    #[test]
    fn test_validation() {
        assert!(build_loop(&cfg(time(0, 0, 0), 0, 4), 0).is_err());
        assert!(build_loop(&cfg(time(0, 0, 0), 15, 0), 0).is_err());
        // 2 x 12h + 1s
        assert!(build_loop(&cfg(time(0, 0, 0), 43_201, 2), 0).is_err());
        assert!(build_loop(&cfg(time(0, 0, 0), 43_200, 2), 0).is_ok());
        assert!(build_timeline(&cfg(time(0, 0, 0), 1, 100), 101).is_err());
        assert!(build_timeline(&cfg(time(0, 0, 0), 1, 100), 100).is_ok());
    }

    #[test]
    fn test_max_loops_and_out_of_range_loop() {
        assert_eq!(cfg(time(6, 0, 0), 5, 12).max_loops(), 833);
        assert_eq!(cfg(time(6, 0, 0), 5, 20_000).max_loops(), 0);
        assert!(matches!(
            build_loop(&cfg(time(6, 0, 0), 15, 4), u32::MAX),
            Err(Error::BadRequest(_))
        ));
        let last = build_loop(&cfg(time(6, 0, 0), 15, 4), u32::MAX - 1).unwrap();
        assert_eq!(last[0].loop_index, u32::MAX - 1);
    }

    #[test]
    fn test_loops_between() {
        let c = cfg(time(6, 0, 0), 15, 4); // one minute loops
        assert_eq!(loops_between(&c, time(7, 0, 0)), 60);
        assert_eq!(loops_between(&c, time(6, 0, 59)), 0);
        // 22:00 to 02:00 crosses midnight
        let night = cfg(time(22, 0, 0), 60, 60);
        assert_eq!(loops_between(&night, time(2, 0, 0)), 4);
        assert_eq!(loops_between(&night, time(22, 0, 0)), 24);
    }

    #[test]
    fn test_assign_content_by_spot_and_date() {
        let now = Utc::now();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let schedule = |id: &str, spot_number: u32, start: NaiveDate, end: NaiveDate| Record {
            id: id.to_string(),
            company_id: "co-1".to_string(),
            created_at: now,
            updated_at: now,
            deleted: false,
            data: ScreenSchedule {
                product_id: "p-1".to_string(),
                spot_number,
                title: format!("Ad {id}"),
                media_url: None,
                content_type: MediaKind::Video,
                start_date: start,
                end_date: end,
            },
        };
        let schedules = vec![
            schedule("s-1", 1, date, date),
            schedule("s-2", 2, date.succ_opt().unwrap(), date.succ_opt().unwrap()),
        ];

        let spots = build_loop(&cfg(time(8, 0, 0), 30, 2), 0).unwrap();
        let slots = assign_content(spots, &schedules, date);
        assert_eq!(slots[0].content.as_ref().unwrap().schedule_id, "s-1");
        assert!(slots[1].content.is_none());
    }
}
