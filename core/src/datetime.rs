pub mod datetime {

    pub const NTP_PACKET_LEN: usize = 48;

    // Seconds between the NTP epoch (1900) and the Unix epoch (1970)
    const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

    // LI 0, version 3, client mode
    const NTP_CLIENT_REQUEST: u8 = 0x1B;

    const SECS_PER_DAY: i64 = 86_400;
    const SECS_PER_HOUR: i64 = 3_600;
    const MINUTES_PER_DAY: u32 = 1_440;

    const MONTH_DAYS: [i32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Date {
        pub year: i32,
        pub month: u8,
        pub day: u8,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Time {
        pub hour: u8,
        pub minute: u8,
        pub second: u8,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum SntpError {
        Network,
        BadResponse,
    }

    /// One UDP round trip to an NTP server: send `request`, fill `response`.
    pub trait SntpExchange {
        fn exchange(
            &mut self,
            request: &[u8; NTP_PACKET_LEN],
            response: &mut [u8; NTP_PACKET_LEN],
        ) -> Result<(), SntpError>;
    }

    /// Network date/time source with a fixed UTC offset.
    pub struct DatetimeClient {
        utc_offset_secs: i64,
    }

    impl DatetimeClient {
        pub fn new(utc_offset_hours: i32) -> Self {
            DatetimeClient {
                utc_offset_secs: SECS_PER_HOUR * utc_offset_hours as i64,
            }
        }

        /// Seconds since the Unix epoch, straight from the server.
        pub fn unix_time(&self, link: &mut impl SntpExchange) -> Result<u64, SntpError> {
            let mut request = [0u8; NTP_PACKET_LEN];
            request[0] = NTP_CLIENT_REQUEST;
            let mut response = [0u8; NTP_PACKET_LEN];
            link.exchange(&request, &mut response)?;

            let mode = response[0] & 0x07;
            let stratum = response[1];
            if (mode != 4 && mode != 5) || stratum == 0 {
                return Err(SntpError::BadResponse);
            }

            // Transmit timestamp, seconds field
            let ntp_secs = u32::from_be_bytes([
                response[40],
                response[41],
                response[42],
                response[43],
            ]) as u64;
            if ntp_secs < NTP_UNIX_OFFSET_SECS {
                return Err(SntpError::BadResponse);
            }
            Ok(ntp_secs - NTP_UNIX_OFFSET_SECS)
        }

        pub fn local_secs(&self, unix_secs: u64) -> i64 {
            unix_secs as i64 + self.utc_offset_secs
        }

        /// Current date in the configured timezone.
        pub fn date(&self, link: &mut impl SntpExchange) -> Result<Date, SntpError> {
            Ok(date_from_local(self.local_secs(self.unix_time(link)?)))
        }

        /// Current time of day (24 hour clock) in the configured timezone.
        pub fn time(&self, link: &mut impl SntpExchange) -> Result<Time, SntpError> {
            Ok(time_from_local(self.local_secs(self.unix_time(link)?)))
        }
    }

    /// Civil date for a local timestamp (proleptic Gregorian).
    pub fn date_from_local(local_secs: i64) -> Date {
        let days = local_secs.div_euclid(SECS_PER_DAY);
        // days-to-civil, anchored on the 400 year Gregorian cycle
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z - era * 146_097;
        let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
        let mut year = yoe + era * 400;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = doy - (153 * mp + 2) / 5 + 1;
        let month = if mp < 10 { mp + 3 } else { mp - 9 };
        if month <= 2 {
            year += 1;
        }
        Date {
            year: year as i32,
            month: month as u8,
            day: day as u8,
        }
    }

    pub fn time_from_local(local_secs: i64) -> Time {
        let of_day = local_secs.rem_euclid(SECS_PER_DAY);
        Time {
            hour: (of_day / SECS_PER_HOUR) as u8,
            minute: (of_day % SECS_PER_HOUR / 60) as u8,
            second: (of_day % 60) as u8,
        }
    }

    // Counts number of leap years before the given date
    pub fn count_leap_years(date: Date) -> i32 {
        let mut years = date.year;
        if date.month <= 2 {
            years -= 1;
        }
        years / 4 - years / 100 + years / 400
    }

    /// Number of days between two given dates.
    pub fn days_between(from: Date, to: Date) -> i32 {
        day_number(to) - day_number(from)
    }

    // Days before the date, counted with a fixed 28-day February plus the
    // leap years completed so far
    fn day_number(date: Date) -> i32 {
        let mut n = date.year * 365 + date.day as i32;
        for days in MONTH_DAYS.iter().take(date.month as usize - 1) {
            n += days;
        }
        n + count_leap_years(date)
    }

    /// Whether `time` falls inside the nightly sleep window starting at
    /// `start_hour` o'clock and running for `duration_min` minutes. The
    /// window may wrap past midnight.
    pub fn in_sleep_window(time: Time, start_hour: u32, duration_min: u32) -> bool {
        let minute_of_day = time.hour as u32 * 60 + time.minute as u32;
        let start = (start_hour % 24) * 60;
        let into_window = (minute_of_day + MINUTES_PER_DAY - start) % MINUTES_PER_DAY;
        into_window < duration_min
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn date(year: i32, month: u8, day: u8) -> Date {
            Date { year, month, day }
        }

        fn time(hour: u8, minute: u8, second: u8) -> Time {
            Time {
                hour,
                minute,
                second,
            }
        }

        #[test]
        fn leap_years_before_march_exclude_the_current_year() {
            assert_eq!(count_leap_years(date(2024, 3, 1)), 491);
            assert_eq!(count_leap_years(date(2024, 2, 1)), 490);
        }

        #[test]
        fn day_difference_over_a_leap_year() {
            assert_eq!(days_between(date(2020, 1, 1), date(2020, 12, 31)), 365);
            assert_eq!(days_between(date(2023, 6, 15), date(2024, 6, 15)), 366);
        }

        #[test]
        fn day_difference_over_february() {
            assert_eq!(days_between(date(2023, 1, 31), date(2023, 3, 1)), 29);
            assert_eq!(days_between(date(2024, 1, 31), date(2024, 3, 1)), 30);
        }

        #[test]
        fn day_difference_of_the_same_date_is_zero() {
            assert_eq!(days_between(date(2019, 6, 21), date(2019, 6, 21)), 0);
        }

        #[test]
        fn anniversary_span_counts_both_leap_days() {
            assert_eq!(days_between(date(2019, 6, 21), date(2024, 6, 21)), 1827);
        }

        #[test]
        fn civil_date_from_epoch_seconds() {
            assert_eq!(date_from_local(0), date(1970, 1, 1));
            assert_eq!(date_from_local(19_723 * SECS_PER_DAY), date(2024, 1, 1));
            assert_eq!(date_from_local(1_700_000_000), date(2023, 11, 14));
        }

        #[test]
        fn time_of_day_from_epoch_seconds() {
            assert_eq!(time_from_local(1_700_000_000), time(22, 13, 20));
            assert_eq!(time_from_local(0), time(0, 0, 0));
        }

        #[test]
        fn negative_local_seconds_land_before_the_epoch() {
            let client = DatetimeClient::new(-5);
            let local = client.local_secs(0);
            assert_eq!(date_from_local(local), date(1969, 12, 31));
            assert_eq!(time_from_local(local), time(19, 0, 0));
        }

        struct CannedServer {
            response: [u8; NTP_PACKET_LEN],
            request_seen: Option<[u8; NTP_PACKET_LEN]>,
        }

        impl CannedServer {
            fn with_unix_secs(unix_secs: u64) -> Self {
                let mut response = [0u8; NTP_PACKET_LEN];
                response[0] = 0x1C; // LI 0, version 3, server mode
                response[1] = 2; // stratum
                let ntp_secs = (unix_secs + NTP_UNIX_OFFSET_SECS) as u32;
                response[40..44].copy_from_slice(&ntp_secs.to_be_bytes());
                CannedServer {
                    response,
                    request_seen: None,
                }
            }
        }

        impl SntpExchange for CannedServer {
            fn exchange(
                &mut self,
                request: &[u8; NTP_PACKET_LEN],
                response: &mut [u8; NTP_PACKET_LEN],
            ) -> Result<(), SntpError> {
                self.request_seen = Some(*request);
                *response = self.response;
                Ok(())
            }
        }

        #[test]
        fn a_server_reply_resolves_to_date_and_time() {
            let client = DatetimeClient::new(0);
            let mut server = CannedServer::with_unix_secs(1_700_000_000);
            assert_eq!(client.unix_time(&mut server), Ok(1_700_000_000));
            assert_eq!(client.date(&mut server), Ok(date(2023, 11, 14)));
            assert_eq!(client.time(&mut server), Ok(time(22, 13, 20)));
            let request = server.request_seen.unwrap();
            assert_eq!(request[0], 0x1B);
        }

        #[test]
        fn the_utc_offset_shifts_the_reported_time() {
            let client = DatetimeClient::new(2);
            let mut server = CannedServer::with_unix_secs(1_700_000_000);
            assert_eq!(client.time(&mut server), Ok(time(0, 13, 20)));
            assert_eq!(client.date(&mut server), Ok(date(2023, 11, 15)));
        }

        #[test]
        fn kiss_of_death_replies_are_rejected() {
            let mut server = CannedServer::with_unix_secs(1_700_000_000);
            server.response[1] = 0; // stratum 0
            let client = DatetimeClient::new(0);
            assert_eq!(client.unix_time(&mut server), Err(SntpError::BadResponse));
        }

        #[test]
        fn replies_that_are_not_from_a_server_are_rejected() {
            let mut server = CannedServer::with_unix_secs(1_700_000_000);
            server.response[0] = 0x1B; // client mode echoed back
            let client = DatetimeClient::new(0);
            assert_eq!(client.unix_time(&mut server), Err(SntpError::BadResponse));
        }

        #[test]
        fn sleep_window_wrapping_midnight() {
            assert!(in_sleep_window(time(23, 30, 0), 22, 480));
            assert!(in_sleep_window(time(5, 59, 0), 22, 480));
            assert!(!in_sleep_window(time(6, 0, 0), 22, 480));
            assert!(!in_sleep_window(time(12, 0, 0), 22, 480));
        }

        #[test]
        fn sleep_window_within_one_day() {
            assert!(in_sleep_window(time(1, 30, 0), 1, 60));
            assert!(!in_sleep_window(time(2, 0, 0), 1, 60));
            assert!(!in_sleep_window(time(0, 59, 0), 1, 60));
        }

        #[test]
        fn zero_length_sleep_window_never_matches() {
            assert!(!in_sleep_window(time(22, 0, 0), 22, 0));
        }
    }
}
