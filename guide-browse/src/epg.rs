//! EPG synthesis from day-bucketed container queries

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDateTime, NaiveTime};
use guide_model::{Channel, DirectoryClass, DirectoryObject, Program};

use crate::engine::{QueryEngine, ROOT};

/// How EPG data is addressed on a server.
///
/// The reference server exposes one container per channel per calendar day
/// under `0/EPG`; other servers may lay their guide out differently, so the
/// aggregator goes through this trait instead of hard-coding paths.
pub trait EpgAddressing: Send + Sync {
    /// Container holding the channel list.
    fn channels_container(&self) -> String;

    /// Container holding one channel's programs for one day token.
    fn day_container(&self, channel_id: &str, day_token: &str) -> String;
}

/// The reference server layout: `0/Channels` and `0/EPG/<channel>/<M-D>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceAddressing;

impl EpgAddressing for ReferenceAddressing {
    fn channels_container(&self) -> String {
        format!("{ROOT}/Channels")
    }

    fn day_container(&self, channel_id: &str, day_token: &str) -> String {
        format!("{ROOT}/EPG/{channel_id}/{day_token}")
    }
}

/// The day tokens touched by the half-open window `[start, end)`.
///
/// Walks calendar days from `start`'s date while the day's midnight is
/// before `end`. Tokens are month-dash-day with no leading zeros
/// (2024-03-05 becomes `3-5`), the server's local calendar with no zone
/// conversion.
pub fn day_tokens(start: NaiveDateTime, end: NaiveDateTime) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut day = start.date();
    while day.and_time(NaiveTime::MIN) < end {
        tokens.push(format!("{}-{}", day.month(), day.day()));
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    tokens
}

fn overlaps(program: &Program, start: NaiveDateTime, end: NaiveDateTime) -> bool {
    start < program.end && end > program.start
}

/// Stitches per-day, per-channel queries into one guide view.
pub struct EpgAggregator {
    engine: Arc<QueryEngine>,
    addressing: Arc<dyn EpgAddressing>,
}

impl EpgAggregator {
    /// Aggregator using the reference server layout.
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self::with_addressing(engine, Arc::new(ReferenceAddressing))
    }

    pub fn with_addressing(engine: Arc<QueryEngine>, addressing: Arc<dyn EpgAddressing>) -> Self {
        Self { engine, addressing }
    }

    /// The server's channel list.
    pub fn channels(&self, udn: &str) -> Vec<Channel> {
        self.engine
            .browse(
                udn,
                &self.addressing.channels_container(),
                DirectoryClass::VideoBroadcast,
                None,
            )
            .into_iter()
            .filter_map(|object| match object {
                DirectoryObject::Channel(channel) => Some(channel),
                _ => None,
            })
            .collect()
    }

    /// Every program on the given channels whose interval overlaps
    /// `[start, end)`.
    ///
    /// A program ending exactly at `start`, or starting exactly at `end`,
    /// is excluded. Results concatenate in (channel, then day) iteration
    /// order; callers wanting chronological order sort themselves. No
    /// de-duplication is performed: the day buckets are assumed to
    /// partition programs, so a server that repeats an overnight program
    /// under two adjacent tokens will produce it twice here.
    pub fn programs(
        &self,
        udn: &str,
        channel_ids: &[String],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<Program> {
        let days = day_tokens(start, end);
        tracing::debug!(
            udn,
            channels = channel_ids.len(),
            days = days.len(),
            "Aggregating EPG window"
        );

        let mut programs = Vec::new();
        for channel_id in channel_ids {
            for day in &days {
                let container = self.addressing.day_container(channel_id, day);
                for object in
                    self.engine
                        .browse(udn, &container, DirectoryClass::VideoProgram, None)
                {
                    let DirectoryObject::Program(program) = object else {
                        continue;
                    };
                    if overlaps(&program, start, end) {
                        programs.push(program);
                    }
                }
            }
        }
        programs
    }

    /// Convenience overload taking channel records instead of raw ids.
    pub fn programs_for_channels(
        &self,
        udn: &str,
        channels: &[Channel],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<Program> {
        let ids: Vec<String> = channels.iter().map(|c| c.channel_id.clone()).collect();
        self.programs(udn, &ids, start, end)
    }

    /// The program airing on `channel` right now, if the current day bucket
    /// has one.
    pub fn current_program(&self, udn: &str, channel: &Channel) -> Option<Program> {
        self.current_program_at(udn, channel, Local::now().naive_local())
    }

    /// Testable seam for [`current_program`](Self::current_program): `now`
    /// is explicit. A program starting exactly at `now` is airing; one
    /// ending exactly at `now` is over.
    pub fn current_program_at(
        &self,
        udn: &str,
        channel: &Channel,
        now: NaiveDateTime,
    ) -> Option<Program> {
        let token = format!("{}-{}", now.date().month(), now.date().day());
        let container = self.addressing.day_container(&channel.channel_id, &token);
        self.engine
            .browse(udn, &container, DirectoryClass::VideoProgram, None)
            .into_iter()
            .find_map(|object| match object {
                DirectoryObject::Program(program)
                    if program.start <= now && now < program.end =>
                {
                    Some(program)
                }
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::connected_engine;
    use chrono::{Duration, NaiveDate};
    use guide_model::names;
    use guide_transport::Row;
    use proptest::prelude::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        day.and_hms_opt(h, min, 0).unwrap()
    }

    fn program_row(id: &str, start: NaiveDateTime, end: NaiveDateTime) -> Row {
        Row::new()
            .with(names::ID, id)
            .with(names::TITLE, format!("show {id}"))
            .with(names::CLASS, "object.item.epgItem.videoProgram")
            .with(names::SCHEDULED_START, start.format("%Y-%m-%dT%H:%M:%S").to_string())
            .with(names::SCHEDULED_END, end.format("%Y-%m-%dT%H:%M:%S").to_string())
    }

    #[rstest]
    #[case::no_leading_zeros(at(date(2024, 3, 5), 0, 0), at(date(2024, 3, 5), 12, 0), vec!["3-5"])]
    #[case::two_days(at(date(2024, 3, 5), 20, 0), at(date(2024, 3, 6), 4, 0), vec!["3-5", "3-6"])]
    #[case::month_boundary(at(date(2024, 1, 31), 23, 0), at(date(2024, 2, 1), 1, 0), vec!["1-31", "2-1"])]
    #[case::end_at_midnight_excludes_next_day(at(date(2024, 3, 5), 6, 0), at(date(2024, 3, 6), 0, 0), vec!["3-5"])]
    #[case::double_digit(at(date(2024, 11, 28), 0, 0), at(date(2024, 11, 29), 12, 0), vec!["11-28", "11-29"])]
    fn test_day_tokens(
        #[case] start: NaiveDateTime,
        #[case] end: NaiveDateTime,
        #[case] expected: Vec<&str>,
    ) {
        assert_eq!(day_tokens(start, end), expected);
    }

    proptest! {
        /// A program is in the window iff `start < p.end && end > p.start`.
        #[test]
        fn prop_overlap_is_strict_half_open(
            window_start in 0i64..20_000,
            window_len in 1i64..20_000,
            program_start in 0i64..20_000,
            program_len in 1i64..20_000,
        ) {
            let base = at(date(2024, 1, 1), 0, 0);
            let ws = base + Duration::minutes(window_start);
            let we = ws + Duration::minutes(window_len);
            let ps = base + Duration::minutes(program_start);
            let pe = ps + Duration::minutes(program_len);

            let program = Program {
                core: Default::default(),
                start: ps,
                end: pe,
                description: String::new(),
                genre: String::new(),
                rating: String::new(),
            };
            prop_assert_eq!(overlaps(&program, ws, we), ws < pe && we > ps);
        }
    }

    #[test]
    fn test_window_filter_boundaries() {
        let (engine, handle, _hub) = connected_engine();
        let day = date(2024, 3, 5);
        handle.directory().seed_container(
            "s1",
            "0/EPG/kwtv/3-5",
            vec![
                // Ends exactly at window start: out.
                program_row("p1", at(day, 18, 0), at(day, 19, 0)),
                // Straddles the start boundary: in.
                program_row("p2", at(day, 18, 30), at(day, 19, 30)),
                // Inside: in.
                program_row("p3", at(day, 19, 30), at(day, 20, 30)),
                // Starts exactly at window end: out.
                program_row("p4", at(day, 21, 0), at(day, 22, 0)),
            ],
        );

        let aggregator = EpgAggregator::new(engine);
        let programs = aggregator.programs(
            "s1",
            &["kwtv".to_string()],
            at(day, 19, 0),
            at(day, 21, 0),
        );
        let ids: Vec<&str> = programs.iter().map(|p| p.core.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3"]);
    }

    #[test]
    fn test_channel_then_day_iteration_order() {
        let (engine, handle, _hub) = connected_engine();
        let day1 = date(2024, 3, 5);
        let day2 = date(2024, 3, 6);
        for (channel, day, name) in [
            ("a", day1, "a1"),
            ("a", day2, "a2"),
            ("b", day1, "b1"),
            ("b", day2, "b2"),
        ] {
            let token = format!("{}-{}", day.month(), day.day());
            handle.directory().seed_container(
                "s1",
                &format!("0/EPG/{channel}/{token}"),
                vec![program_row(name, at(day, 12, 0), at(day, 13, 0))],
            );
        }

        let aggregator = EpgAggregator::new(engine);
        let programs = aggregator.programs(
            "s1",
            &["a".to_string(), "b".to_string()],
            at(day1, 0, 0),
            at(day2, 23, 0),
        );

        let ids: Vec<&str> = programs.iter().map(|p| p.core.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "b1", "b2"]);
        // Sub-queries were issued channel-major, day-minor.
        assert_eq!(
            handle.directory().queries(),
            vec![
                ("s1".to_string(), "0/EPG/a/3-5".to_string()),
                ("s1".to_string(), "0/EPG/a/3-6".to_string()),
                ("s1".to_string(), "0/EPG/b/3-5".to_string()),
                ("s1".to_string(), "0/EPG/b/3-6".to_string()),
            ]
        );
    }

    #[test]
    fn test_channels_filters_to_broadcast_variants() {
        let (engine, handle, _hub) = connected_engine();
        handle.directory().seed_container(
            "s1",
            "0/Channels",
            vec![
                Row::new()
                    .with(names::ID, "0/Channels/7")
                    .with(names::TITLE, "KWTV")
                    .with(names::CLASS, "object.item.videoItem.videoBroadcast")
                    .with(names::CHANNEL_ID, "kwtv"),
                Row::new()
                    .with(names::ID, "0/Channels/folder")
                    .with(names::TITLE, "More")
                    .with(names::CLASS, "object.container"),
            ],
        );

        let aggregator = EpgAggregator::new(engine);
        let channels = aggregator.channels("s1");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].channel_id, "kwtv");
    }

    #[test]
    fn test_current_program_with_gap() {
        let (engine, handle, _hub) = connected_engine();
        let day = date(2024, 3, 5);
        handle.directory().seed_container(
            "s1",
            "0/EPG/kwtv/3-5",
            vec![
                program_row("morning", at(day, 8, 0), at(day, 9, 0)),
                // Gap from 9:00 to 10:00.
                program_row("late", at(day, 10, 0), at(day, 11, 0)),
            ],
        );

        let channel = Channel {
            core: Default::default(),
            channel_number: Some(7),
            channel_id: "kwtv".to_string(),
            call_sign: "KWTV".to_string(),
        };
        let aggregator = EpgAggregator::new(engine);

        let airing = aggregator.current_program_at("s1", &channel, at(day, 8, 30));
        assert_eq!(airing.unwrap().core.id, "morning");

        // In the gap: none found, not an error.
        assert!(aggregator
            .current_program_at("s1", &channel, at(day, 9, 30))
            .is_none());

        // Boundary: a program is airing from its first instant and not at
        // its last.
        assert_eq!(
            aggregator
                .current_program_at("s1", &channel, at(day, 10, 0))
                .unwrap()
                .core
                .id,
            "late"
        );
        assert!(aggregator
            .current_program_at("s1", &channel, at(day, 11, 0))
            .is_none());
    }
}
