//! Value codecs: how a single value type is turned into a text or binary
//! value node and back.
//!
//! A [`ValueCodec<T>`] handles one value type in both encodings. The reader
//! and writer cores never pick the encoding themselves: on write the backend
//! asks for text or binary, on read the backend reports what it stored.
//!
//! Codecs are looked up by type in a [`CodecRegistry`], which is passed to
//! readers and writers explicitly. `CodecRegistry::default()` knows the
//! basic types implemented by [`BasicCodec`].
//!
//! ## Encodings of the basic types
//!
//! | Type | Text | Binary (little endian) |
//! |------|------|------------------------|
//! | integers | decimal | natural width |
//! | `f32`/`f64` | shortest round-trip form | IEEE 754 |
//! | `bool` | `true`/`false` (any case on read) | one byte |
//! | `char` | the character | `u32` scalar value |
//! | `String` | verbatim | `i32` UTF-16 unit count + units |
//! | `DateTime<Utc>` | RFC 3339, 7 fractional digits, `Z` | `i64` ticks since 0001-01-01 |
//! | `TimeDelta` | `[-][d.]hh:mm:ss[.fffffff]` | `i64` ticks |
//!
//! A tick is 100 nanoseconds. Date/times without a time zone
//! ([`NaiveDateTime`]) are refused rather than guessed.
//!
//! ## Examples
//!
//! ```rust
//! use data_store::codec::{BasicCodec, CodecRegistry, ValueCodec};
//! use data_store::backend::{TextReader, TextWriter};
//! use std::borrow::Cow;
//!
//! let mut text = String::new();
//! BasicCodec.write_text(&42i32, &mut TextWriter::new(&mut text)).unwrap();
//! assert_eq!(text, "42");
//!
//! let registry = CodecRegistry::default();
//! let codec = registry.get::<i32>().unwrap();
//! let value = codec.read_text(&mut TextReader::new(Cow::Borrowed("-7"))).unwrap();
//! assert_eq!(value, -7);
//! ```

use crate::backend::{BinaryReader, BinaryWriter, TextReader, TextWriter};
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, TimeDelta, Utc};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::rc::Rc;
use std::str::FromStr;

/// Serializes and deserializes one value type, as text or as binary.
pub trait ValueCodec<T> {
    fn write_text(&self, value: &T, out: &mut TextWriter<'_>) -> Result<()>;

    fn write_binary(&self, value: &T, out: &mut BinaryWriter<'_>) -> Result<()>;

    fn read_text(&self, input: &mut TextReader<'_>) -> Result<T>;

    fn read_binary(&self, input: &mut BinaryReader<'_>) -> Result<T>;
}

impl<T, C: ValueCodec<T> + ?Sized> ValueCodec<T> for Rc<C> {
    fn write_text(&self, value: &T, out: &mut TextWriter<'_>) -> Result<()> {
        (**self).write_text(value, out)
    }

    fn write_binary(&self, value: &T, out: &mut BinaryWriter<'_>) -> Result<()> {
        (**self).write_binary(value, out)
    }

    fn read_text(&self, input: &mut TextReader<'_>) -> Result<T> {
        (**self).read_text(input)
    }

    fn read_binary(&self, input: &mut BinaryReader<'_>) -> Result<T> {
        (**self).read_binary(input)
    }
}

/// A lookup table of codecs, keyed by value type.
pub struct CodecRegistry {
    codecs: HashMap<TypeId, Box<dyn Any>>,
}

impl CodecRegistry {
    /// Creates a registry with no codecs at all.
    #[must_use]
    pub fn empty() -> Self {
        CodecRegistry {
            codecs: HashMap::new(),
        }
    }

    /// Registers `codec` for `T`, replacing any previous codec for `T`.
    pub fn register<T, C>(&mut self, codec: C) -> &mut Self
    where
        T: 'static,
        C: ValueCodec<T> + 'static,
    {
        let codec: Rc<dyn ValueCodec<T>> = Rc::new(codec);
        self.codecs.insert(TypeId::of::<T>(), Box::new(codec));
        self
    }

    /// Builder form of [`register`](CodecRegistry::register).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use data_store::codec::{BasicCodec, CodecRegistry};
    ///
    /// let registry = CodecRegistry::empty().with::<i32, _>(BasicCodec);
    /// assert!(registry.contains::<i32>());
    /// assert!(!registry.contains::<i64>());
    /// ```
    #[must_use]
    pub fn with<T, C>(mut self, codec: C) -> Self
    where
        T: 'static,
        C: ValueCodec<T> + 'static,
    {
        self.register::<T, C>(codec);
        self
    }

    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.codecs.contains_key(&TypeId::of::<T>())
    }

    /// Resolves the codec registered for `T`.
    ///
    /// # Errors
    ///
    /// Returns a usage error if no codec is registered for `T`.
    pub fn get<T: 'static>(&self) -> Result<Rc<dyn ValueCodec<T>>> {
        self.codecs
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Rc<dyn ValueCodec<T>>>())
            .cloned()
            .ok_or_else(|| {
                Error::usage(format!("no value codec registered for {}", type_name::<T>()))
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl Default for CodecRegistry {
    /// A registry holding [`BasicCodec`] for every basic type.
    fn default() -> Self {
        let mut registry = CodecRegistry::empty();
        registry
            .register::<bool, _>(BasicCodec)
            .register::<char, _>(BasicCodec)
            .register::<i8, _>(BasicCodec)
            .register::<i16, _>(BasicCodec)
            .register::<i32, _>(BasicCodec)
            .register::<i64, _>(BasicCodec)
            .register::<u8, _>(BasicCodec)
            .register::<u16, _>(BasicCodec)
            .register::<u32, _>(BasicCodec)
            .register::<u64, _>(BasicCodec)
            .register::<f32, _>(BasicCodec)
            .register::<f64, _>(BasicCodec)
            .register::<String, _>(BasicCodec)
            .register::<DateTime<Utc>, _>(BasicCodec)
            .register::<DateTime<FixedOffset>, _>(BasicCodec)
            .register::<NaiveDateTime, _>(BasicCodec)
            .register::<TimeDelta, _>(BasicCodec);
        registry
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codecs", &self.codecs.len())
            .finish()
    }
}

/// The built-in codec for basic types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasicCodec;

fn parse_text<T>(type_name: &str, s: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| Error::codec(type_name, format!("invalid value {:?}: {}", s, e)))
}

fn binary_error(type_name: &str, err: std::io::Error) -> Error {
    Error::codec(type_name, format!("invalid binary value: {}", err))
}

macro_rules! number_codec {
    ($($ty:ty => $write:ident, $read:ident);* $(;)?) => {$(
        impl ValueCodec<$ty> for BasicCodec {
            fn write_text(&self, value: &$ty, out: &mut TextWriter<'_>) -> Result<()> {
                out.push_str(&value.to_string());
                Ok(())
            }

            fn write_binary(&self, value: &$ty, out: &mut BinaryWriter<'_>) -> Result<()> {
                out.$write::<LittleEndian>(*value)
                    .map_err(|e| binary_error(stringify!($ty), e))
            }

            fn read_text(&self, input: &mut TextReader<'_>) -> Result<$ty> {
                parse_text(stringify!($ty), input.as_str())
            }

            fn read_binary(&self, input: &mut BinaryReader<'_>) -> Result<$ty> {
                input.$read::<LittleEndian>()
                    .map_err(|e| binary_error(stringify!($ty), e))
            }
        }
    )*};
}

number_codec! {
    i16 => write_i16, read_i16;
    i32 => write_i32, read_i32;
    i64 => write_i64, read_i64;
    u16 => write_u16, read_u16;
    u32 => write_u32, read_u32;
    u64 => write_u64, read_u64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

macro_rules! byte_codec {
    ($($ty:ty => $write:ident, $read:ident);* $(;)?) => {$(
        impl ValueCodec<$ty> for BasicCodec {
            fn write_text(&self, value: &$ty, out: &mut TextWriter<'_>) -> Result<()> {
                out.push_str(&value.to_string());
                Ok(())
            }

            fn write_binary(&self, value: &$ty, out: &mut BinaryWriter<'_>) -> Result<()> {
                out.$write(*value).map_err(|e| binary_error(stringify!($ty), e))
            }

            fn read_text(&self, input: &mut TextReader<'_>) -> Result<$ty> {
                parse_text(stringify!($ty), input.as_str())
            }

            fn read_binary(&self, input: &mut BinaryReader<'_>) -> Result<$ty> {
                input.$read().map_err(|e| binary_error(stringify!($ty), e))
            }
        }
    )*};
}

byte_codec! {
    i8 => write_i8, read_i8;
    u8 => write_u8, read_u8;
}

impl ValueCodec<bool> for BasicCodec {
    fn write_text(&self, value: &bool, out: &mut TextWriter<'_>) -> Result<()> {
        out.push_str(if *value { "true" } else { "false" });
        Ok(())
    }

    fn write_binary(&self, value: &bool, out: &mut BinaryWriter<'_>) -> Result<()> {
        out.write_u8(u8::from(*value))
            .map_err(|e| binary_error("bool", e))
    }

    fn read_text(&self, input: &mut TextReader<'_>) -> Result<bool> {
        let s = input.as_str();
        if s.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if s.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(Error::codec("bool", format!("invalid literal: {:?}", s)))
        }
    }

    fn read_binary(&self, input: &mut BinaryReader<'_>) -> Result<bool> {
        Ok(input.read_u8().map_err(|e| binary_error("bool", e))? != 0)
    }
}

impl ValueCodec<char> for BasicCodec {
    fn write_text(&self, value: &char, out: &mut TextWriter<'_>) -> Result<()> {
        let mut buf = [0u8; 4];
        out.push_str(value.encode_utf8(&mut buf));
        Ok(())
    }

    fn write_binary(&self, value: &char, out: &mut BinaryWriter<'_>) -> Result<()> {
        out.write_u32::<LittleEndian>(u32::from(*value))
            .map_err(|e| binary_error("char", e))
    }

    fn read_text(&self, input: &mut TextReader<'_>) -> Result<char> {
        let mut chars = input.as_str().chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(ch),
            _ => Err(Error::codec(
                "char",
                format!("expected exactly one character, found {:?}", input.as_str()),
            )),
        }
    }

    fn read_binary(&self, input: &mut BinaryReader<'_>) -> Result<char> {
        let scalar = input
            .read_u32::<LittleEndian>()
            .map_err(|e| binary_error("char", e))?;
        char::from_u32(scalar)
            .ok_or_else(|| Error::codec("char", format!("invalid scalar value {:#x}", scalar)))
    }
}

impl ValueCodec<String> for BasicCodec {
    fn write_text(&self, value: &String, out: &mut TextWriter<'_>) -> Result<()> {
        out.push_str(value);
        Ok(())
    }

    fn write_binary(&self, value: &String, out: &mut BinaryWriter<'_>) -> Result<()> {
        let units: Vec<u16> = value.encode_utf16().collect();
        let len = i32::try_from(units.len())
            .map_err(|_| Error::codec("String", "string too long for binary encoding"))?;
        out.write_i32::<LittleEndian>(len)
            .map_err(|e| binary_error("String", e))?;
        for unit in units {
            out.write_u16::<LittleEndian>(unit)
                .map_err(|e| binary_error("String", e))?;
        }
        Ok(())
    }

    fn read_text(&self, input: &mut TextReader<'_>) -> Result<String> {
        Ok(input.as_str().to_string())
    }

    fn read_binary(&self, input: &mut BinaryReader<'_>) -> Result<String> {
        let len = input
            .read_i32::<LittleEndian>()
            .map_err(|e| binary_error("String", e))?;
        let len = usize::try_from(len)
            .map_err(|_| Error::codec("String", format!("negative length {}", len)))?;

        let mut units = Vec::with_capacity(len.min(input.remaining().len() / 2));
        for _ in 0..len {
            units.push(
                input
                    .read_u16::<LittleEndian>()
                    .map_err(|e| binary_error("String", e))?,
            );
        }
        String::from_utf16(&units).map_err(|e| Error::codec("String", e))
    }
}

const TICKS_PER_SECOND: i64 = 10_000_000;
const TICKS_PER_MINUTE: i64 = TICKS_PER_SECOND * 60;
const TICKS_PER_HOUR: i64 = TICKS_PER_MINUTE * 60;
const TICKS_PER_DAY: i64 = TICKS_PER_HOUR * 24;
const NANOS_PER_TICK: i64 = 100;

// seconds from 0001-01-01T00:00:00Z to the Unix epoch
const UNIX_EPOCH_SECONDS: i64 = 62_135_596_800;

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn date_time_to_ticks(value: &DateTime<Utc>) -> Result<i64> {
    let fraction = i64::from(value.timestamp_subsec_nanos()) / NANOS_PER_TICK;
    value
        .timestamp()
        .checked_add(UNIX_EPOCH_SECONDS)
        .and_then(|s| s.checked_mul(TICKS_PER_SECOND))
        .and_then(|t| t.checked_add(fraction))
        .filter(|t| *t >= 0)
        .ok_or_else(|| Error::codec("DateTime", format!("{} is out of range", value)))
}

fn date_time_from_ticks(ticks: i64) -> Result<DateTime<Utc>> {
    let secs = ticks.div_euclid(TICKS_PER_SECOND) - UNIX_EPOCH_SECONDS;
    let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK) as u32;
    if ticks < 0 {
        return Err(Error::codec("DateTime", format!("negative tick count {}", ticks)));
    }
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .ok_or_else(|| Error::codec("DateTime", format!("tick count {} is out of range", ticks)))
}

fn parse_date_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::codec("DateTime", format!("invalid value {:?}: {}", s, e)))
}

impl ValueCodec<DateTime<Utc>> for BasicCodec {
    fn write_text(&self, value: &DateTime<Utc>, out: &mut TextWriter<'_>) -> Result<()> {
        if !(1..=9999).contains(&value.year()) {
            return Err(Error::codec("DateTime", format!("{} is out of range", value)));
        }
        let ticks = i64::from(value.timestamp_subsec_nanos()) / NANOS_PER_TICK;
        write!(out, "{}.{:07}Z", value.format(DATE_TIME_FORMAT), ticks)
            .map_err(|e| Error::codec("DateTime", e))
    }

    fn write_binary(&self, value: &DateTime<Utc>, out: &mut BinaryWriter<'_>) -> Result<()> {
        out.write_i64::<LittleEndian>(date_time_to_ticks(value)?)
            .map_err(|e| binary_error("DateTime", e))
    }

    fn read_text(&self, input: &mut TextReader<'_>) -> Result<DateTime<Utc>> {
        parse_date_time(input.as_str())
    }

    fn read_binary(&self, input: &mut BinaryReader<'_>) -> Result<DateTime<Utc>> {
        let ticks = input
            .read_i64::<LittleEndian>()
            .map_err(|e| binary_error("DateTime", e))?;
        date_time_from_ticks(ticks)
    }
}

/// Offsets are not preserved: values are written as UTC and read back with a
/// zero offset.
impl ValueCodec<DateTime<FixedOffset>> for BasicCodec {
    fn write_text(&self, value: &DateTime<FixedOffset>, out: &mut TextWriter<'_>) -> Result<()> {
        self.write_text(&value.with_timezone(&Utc), out)
    }

    fn write_binary(
        &self,
        value: &DateTime<FixedOffset>,
        out: &mut BinaryWriter<'_>,
    ) -> Result<()> {
        self.write_binary(&value.with_timezone(&Utc), out)
    }

    fn read_text(&self, input: &mut TextReader<'_>) -> Result<DateTime<FixedOffset>> {
        Ok(parse_date_time(input.as_str())?.fixed_offset())
    }

    fn read_binary(&self, input: &mut BinaryReader<'_>) -> Result<DateTime<FixedOffset>> {
        let utc: DateTime<Utc> = self.read_binary(input)?;
        Ok(utc.fixed_offset())
    }
}

fn unspecified_kind() -> Error {
    Error::codec(
        "NaiveDateTime",
        "date/time values without a time zone are not supported; convert to UTC first",
    )
}

/// Always fails: a date/time without a time zone is ambiguous.
impl ValueCodec<NaiveDateTime> for BasicCodec {
    fn write_text(&self, _value: &NaiveDateTime, _out: &mut TextWriter<'_>) -> Result<()> {
        Err(unspecified_kind())
    }

    fn write_binary(&self, _value: &NaiveDateTime, _out: &mut BinaryWriter<'_>) -> Result<()> {
        Err(unspecified_kind())
    }

    fn read_text(&self, _input: &mut TextReader<'_>) -> Result<NaiveDateTime> {
        Err(unspecified_kind())
    }

    fn read_binary(&self, _input: &mut BinaryReader<'_>) -> Result<NaiveDateTime> {
        Err(unspecified_kind())
    }
}

fn time_delta_to_ticks(value: &TimeDelta) -> Result<i64> {
    value
        .num_seconds()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|t| t.checked_add(i64::from(value.subsec_nanos()) / NANOS_PER_TICK))
        .ok_or_else(|| Error::codec("TimeDelta", format!("{} is out of range", value)))
}

fn time_delta_from_ticks(ticks: i64) -> Result<TimeDelta> {
    let secs = TimeDelta::try_seconds(ticks / TICKS_PER_SECOND).ok_or_else(|| {
        Error::codec("TimeDelta", format!("tick count {} is out of range", ticks))
    })?;
    Ok(secs + TimeDelta::nanoseconds((ticks % TICKS_PER_SECOND) * NANOS_PER_TICK))
}

fn format_time_delta(ticks: i64) -> String {
    let abs = ticks.unsigned_abs();
    let days = abs / TICKS_PER_DAY as u64;
    let hours = abs % TICKS_PER_DAY as u64 / TICKS_PER_HOUR as u64;
    let minutes = abs % TICKS_PER_HOUR as u64 / TICKS_PER_MINUTE as u64;
    let seconds = abs % TICKS_PER_MINUTE as u64 / TICKS_PER_SECOND as u64;
    let fraction = abs % TICKS_PER_SECOND as u64;

    let mut s = String::with_capacity(26);
    if ticks < 0 {
        s.push('-');
    }
    if days > 0 {
        s.push_str(&format!("{}.", days));
    }
    s.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if fraction > 0 {
        s.push_str(&format!(".{:07}", fraction));
    }
    s
}

fn parse_time_delta(s: &str) -> Result<i64> {
    let invalid = || Error::codec("TimeDelta", format!("invalid value {:?}", s));
    let number = |part: &str| -> Result<i64> {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        part.parse::<i64>().map_err(|_| invalid())
    };

    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let mut parts = body.split(':');
    let (Some(first), Some(minutes), Some(last), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let (days, hours) = match first.split_once('.') {
        Some((d, h)) => (number(d)?, number(h)?),
        None => (0, number(first)?),
    };
    let minutes = number(minutes)?;
    let (seconds, fraction) = match last.split_once('.') {
        Some((sec, frac)) if frac.len() <= 7 => {
            let scale = 10i64.pow(7 - frac.len() as u32);
            (number(sec)?, number(frac)? * scale)
        }
        Some(_) => return Err(invalid()),
        None => (number(last)?, 0),
    };

    if hours >= 24 || minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }

    let ticks = days
        .checked_mul(TICKS_PER_DAY)
        .and_then(|t| t.checked_add(hours * TICKS_PER_HOUR))
        .and_then(|t| t.checked_add(minutes * TICKS_PER_MINUTE))
        .and_then(|t| t.checked_add(seconds * TICKS_PER_SECOND))
        .and_then(|t| t.checked_add(fraction))
        .ok_or_else(invalid)?;

    Ok(if negative { -ticks } else { ticks })
}

impl ValueCodec<TimeDelta> for BasicCodec {
    fn write_text(&self, value: &TimeDelta, out: &mut TextWriter<'_>) -> Result<()> {
        out.push_str(&format_time_delta(time_delta_to_ticks(value)?));
        Ok(())
    }

    fn write_binary(&self, value: &TimeDelta, out: &mut BinaryWriter<'_>) -> Result<()> {
        out.write_i64::<LittleEndian>(time_delta_to_ticks(value)?)
            .map_err(|e| binary_error("TimeDelta", e))
    }

    fn read_text(&self, input: &mut TextReader<'_>) -> Result<TimeDelta> {
        time_delta_from_ticks(parse_time_delta(input.as_str())?)
    }

    fn read_binary(&self, input: &mut BinaryReader<'_>) -> Result<TimeDelta> {
        let ticks = input
            .read_i64::<LittleEndian>()
            .map_err(|e| binary_error("TimeDelta", e))?;
        time_delta_from_ticks(ticks)
    }
}
