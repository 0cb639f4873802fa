use crate::udbc::value::Value;
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use mysql_async::Value as MyValue;

pub fn from_mysql_value(v: &MyValue) -> Value {
    match v {
        MyValue::NULL => Value::Null,
        MyValue::Int(i) => Value::I64(*i),
        MyValue::UInt(u) => i64::try_from(*u).map_or_else(|_| Value::Str(u.to_string()), Value::I64),
        MyValue::Float(f) => Value::F64(*f as f64),
        MyValue::Double(d) => Value::F64(*d),
        MyValue::Bytes(b) => Value::Bytes(b.clone()),
        MyValue::Date(y, m, d, h, min, s, micro) => {
            let Some(date) = NaiveDate::from_ymd_opt(*y as i32, *m as u32, *d as u32) else {
                // zero dates such as 0000-00-00 have no chrono equivalent
                return Value::Str(format!("{y:04}-{m:02}-{d:02} {h:02}:{min:02}:{s:02}"));
            };
            if *h == 0 && *min == 0 && *s == 0 && *micro == 0 {
                Value::Date(date)
            } else {
                date.and_hms_micro_opt(*h as u32, *min as u32, *s as u32, *micro)
                    .map_or(Value::Date(date), Value::DateTime)
            }
        }
        MyValue::Time(is_neg, days, h, min, s, micro) => {
            let total_h = *days * 24 + (*h as u32);
            match NaiveTime::from_hms_micro_opt(total_h, *min as u32, *s as u32, *micro) {
                Some(t) if !*is_neg => Value::Time(t),
                // negative or >24h intervals only fit MySQL's own notation
                _ => Value::Str(format!(
                    "{}{total_h:02}:{min:02}:{s:02}.{micro:06}",
                    if *is_neg { "-" } else { "" }
                )),
            }
        }
    }
}

pub fn to_mysql_value(v: &Value) -> MyValue {
    match v {
        Value::Null => MyValue::NULL,
        Value::Bool(b) => MyValue::Int(*b as i64),
        Value::I16(i) => MyValue::Int(*i as i64),
        Value::I32(i) => MyValue::Int(*i as i64),
        Value::I64(i) => MyValue::Int(*i),
        Value::U8(u) => MyValue::UInt(*u as u64),
        Value::F64(f) => MyValue::Double(*f),
        Value::Str(s) => MyValue::Bytes(s.clone().into_bytes()),
        Value::Bytes(b) => MyValue::Bytes(b.clone()),
        Value::Date(d) => MyValue::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0),
        Value::Time(t) => MyValue::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1000,
        ),
        Value::DateTime(dt) => MyValue::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1000,
        ),
        Value::DateTimeUtc(dt) => to_mysql_value(&Value::DateTime(dt.naive_utc())),
        Value::Decimal(d) => MyValue::Bytes(d.to_string().into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_date_is_kept_as_text() {
        let v = from_mysql_value(&MyValue::Date(0, 0, 0, 0, 0, 0, 0));
        assert_eq!(v, Value::Str("0000-00-00 00:00:00".to_string()));
    }

    #[test]
    fn datetime_round_trips_through_mysql_value() {
        let dt = NaiveDate::from_ymd_opt(2023, 2, 16)
            .unwrap()
            .and_hms_micro_opt(9, 52, 1, 250)
            .unwrap();
        let my = to_mysql_value(&Value::DateTime(dt));
        assert_eq!(my, MyValue::Date(2023, 2, 16, 9, 52, 1, 250));
        assert_eq!(from_mysql_value(&my), Value::DateTime(dt));
    }

    #[test]
    fn negative_time_is_text() {
        let v = from_mysql_value(&MyValue::Time(true, 1, 2, 3, 4, 0));
        assert_eq!(v, Value::Str("-26:03:04.000000".to_string()));
    }
}
