use chrono_tz::Tz;
use std::str::FromStr;

/// Resolve the service timezone, used for the date shown in the weather
/// block. A configured value wins; otherwise the system timezone; if
/// both fail, Asia/Seoul, since the service talks about Cheongju.
pub fn get_local_timezone(configured_timezone: Option<&str>) -> Tz {
    if let Some(tz_str) = configured_timezone {
        if let Ok(tz) = Tz::from_str(tz_str) {
            return tz;
        }
    }

    match iana_time_zone::get_timezone() {
        Ok(tz_str) => Tz::from_str(&tz_str).unwrap_or(chrono_tz::Asia::Seoul),
        Err(_) => chrono_tz::Asia::Seoul,
    }
}
