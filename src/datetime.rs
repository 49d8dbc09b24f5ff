use time::PrimitiveDateTime;

/// Decodes MS-DOS date/time words.  Returns `None` for bit patterns that do
/// not name a real calendar date or time of day.
pub fn datetime_from_bits(date: u16, time: u16) -> Option<PrimitiveDateTime> {
    let day = (date & 0x1f) as u8;
    let month = time::Month::try_from(((date >> 5) & 0xf) as u8).ok()?;
    let year = 1980 + (date >> 9) as i32;
    let hour = (time >> 11) as u8;
    let minute = ((time >> 5) & 0x3f) as u8;
    let second = ((time & 0x1f) * 2) as u8;
    let date = time::Date::from_calendar_date(year, month, day).ok()?;
    let time = time::Time::from_hms(hour, minute, second).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

/// Encodes a datetime as MS-DOS date/time words:
/// `date = ((year - 1980) << 9) | (month << 5) | day` and
/// `time = (hour << 11) | (minute << 5) | (second / 2)`.
///
/// The representable range is 1980 through 2107 with two-second
/// resolution; odd seconds round up and out-of-range datetimes are clamped
/// to the nearest representable instant.
pub fn datetime_to_bits(mut datetime: PrimitiveDateTime) -> (u16, u16) {
    if datetime.second() % 2 != 0 {
        datetime += time::Duration::seconds(1);
    }
    if datetime.year() < 1980 {
        return encode_fields(1980, 1, 1, 0, 0, 0);
    }
    if datetime.year() > 2107 {
        return encode_fields(2107, 12, 31, 23, 59, 58);
    }
    encode_fields(
        datetime.year() as u16,
        datetime.month() as u16,
        datetime.day() as u16,
        datetime.hour() as u16,
        datetime.minute() as u16,
        datetime.second() as u16,
    )
}

fn encode_fields(
    year: u16,
    month: u16,
    day: u16,
    hour: u16,
    minute: u16,
    second: u16,
) -> (u16, u16) {
    let date = ((year - 1980) << 9) | (month << 5) | day;
    let time = (hour << 11) | (minute << 5) | (second / 2);
    (date, time)
}
