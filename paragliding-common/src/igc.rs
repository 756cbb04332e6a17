//! IGC flight-track parsing
//!
//! Understands the subset of the IGC format the tracker needs:
//! - `A` record: manufacturer id, must be the first record of the file
//! - `H` records: `DTE` (flight date), `PLT` (pilot), `GTY` (glider type),
//!   `GID` (glider id)
//! - `B` records: timestamped fixes
//!
//! Every other record type is ignored.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Mean earth radius used for great-circle distances (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Minimum length of a B record: B + time(6) + lat(8) + lon(9) + validity + 2 x altitude(5)
const B_RECORD_LEN: usize = 35;

/// IGC parsing errors
#[derive(Debug, Error, PartialEq)]
pub enum IgcError {
    /// File does not start with an A record
    #[error("Not an IGC file: {0}")]
    NotIgc(String),

    /// A record is present but cannot be decoded
    #[error("Malformed {record} record on line {line}: {reason}")]
    MalformedRecord {
        record: char,
        line: usize,
        reason: String,
    },
}

/// A single GNSS fix from a B record
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub time: NaiveTime,
    /// Decimal degrees, north positive
    pub latitude: f64,
    /// Decimal degrees, east positive
    pub longitude: f64,
    /// `A` (3D fix) or `V` (2D / no fix)
    pub valid: bool,
    /// Metres, ICAO standard atmosphere
    pub pressure_altitude: i32,
    /// Metres above the WGS84 ellipsoid
    pub gnss_altitude: i32,
}

impl GeoPoint {
    /// Point at the given coordinates with zeroed time/altitude
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            time: NaiveTime::MIN,
            latitude,
            longitude,
            valid: true,
            pressure_altitude: 0,
            gnss_altitude: 0,
        }
    }

    /// Great-circle (haversine) distance to `other` in kilometres
    pub fn distance(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

/// Metadata and fixes extracted from one IGC file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IgcTrack {
    pub pilot: String,
    pub glider_type: String,
    pub glider_id: String,
    pub date: Option<NaiveDate>,
    pub points: Vec<GeoPoint>,
}

impl IgcTrack {
    /// Header date as `YYYY-MM-DD`, empty when the file carries none
    pub fn header_date(&self) -> String {
        self.date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    /// Total track length in kilometres
    pub fn total_length(&self) -> f64 {
        track_length(&self.points)
    }
}

/// Sum of distances between consecutive points; 0 for fewer than two points
pub fn track_length(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|pair| pair[0].distance(&pair[1])).sum()
}

/// Parse the text of an IGC file
pub fn parse_igc(content: &str) -> Result<IgcTrack, IgcError> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end()))
        .filter(|(_, l)| !l.is_empty());

    match lines.next() {
        Some((_, first)) if first.starts_with('A') => {}
        Some((_, first)) => {
            return Err(IgcError::NotIgc(format!(
                "first record must be an A record, found '{}'",
                first.chars().next().unwrap_or(' ')
            )))
        }
        None => return Err(IgcError::NotIgc("empty file".to_string())),
    }

    let mut track = IgcTrack::default();

    for (line_no, line) in lines {
        match line.as_bytes()[0] {
            b'H' => parse_header(line, line_no, &mut track)?,
            b'B' => track.points.push(parse_fix(line, line_no)?),
            _ => {}
        }
    }

    Ok(track)
}

fn parse_header(line: &str, line_no: usize, track: &mut IgcTrack) -> Result<(), IgcError> {
    let code = match line.get(2..5) {
        Some(code) => code,
        None => return Ok(()),
    };

    let value = match line.find(':') {
        Some(idx) => line[idx + 1..].trim(),
        None => line.get(5..).unwrap_or("").trim(),
    };

    match code {
        "DTE" => track.date = Some(parse_header_date(value, line_no)?),
        "PLT" => track.pilot = value.to_string(),
        "GTY" => track.glider_type = value.to_string(),
        "GID" => track.glider_id = value.to_string(),
        _ => {}
    }
    Ok(())
}

/// `DDMMYY`, optionally followed by `,NN` (flight number of the day)
fn parse_header_date(value: &str, line_no: usize) -> Result<NaiveDate, IgcError> {
    let malformed = |reason: &str| IgcError::MalformedRecord {
        record: 'H',
        line: line_no,
        reason: reason.to_string(),
    };

    let digits = value
        .get(0..6)
        .filter(|d| d.is_ascii())
        .ok_or_else(|| malformed("date too short"))?;
    let day = parse_digits(&digits[0..2]).ok_or_else(|| malformed("bad day"))?;
    let month = parse_digits(&digits[2..4]).ok_or_else(|| malformed("bad month"))?;
    let yy = parse_digits(&digits[4..6]).ok_or_else(|| malformed("bad year"))? as i32;
    let year = if yy < 80 { 2000 + yy } else { 1900 + yy };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| malformed("invalid calendar date"))
}

fn parse_fix(line: &str, line_no: usize) -> Result<GeoPoint, IgcError> {
    let malformed = |reason: &str| IgcError::MalformedRecord {
        record: 'B',
        line: line_no,
        reason: reason.to_string(),
    };

    if line.len() < B_RECORD_LEN || !line.is_ascii() {
        return Err(malformed("record too short"));
    }

    let hh = parse_digits(&line[1..3]).ok_or_else(|| malformed("bad hour"))?;
    let mm = parse_digits(&line[3..5]).ok_or_else(|| malformed("bad minute"))?;
    let ss = parse_digits(&line[5..7]).ok_or_else(|| malformed("bad second"))?;
    let time = NaiveTime::from_hms_opt(hh, mm, ss).ok_or_else(|| malformed("invalid time"))?;

    let latitude = parse_coordinate(&line[7..9], &line[9..14], &line[14..15], 90, 'N', 'S')
        .ok_or_else(|| malformed("bad latitude"))?;
    let longitude = parse_coordinate(&line[15..18], &line[18..23], &line[23..24], 180, 'E', 'W')
        .ok_or_else(|| malformed("bad longitude"))?;

    let valid = match &line[24..25] {
        "A" => true,
        "V" => false,
        _ => return Err(malformed("bad fix validity")),
    };

    let pressure_altitude =
        parse_number::<i32>(&line[25..30]).ok_or_else(|| malformed("bad pressure altitude"))?;
    let gnss_altitude =
        parse_number::<i32>(&line[30..35]).ok_or_else(|| malformed("bad GNSS altitude"))?;

    Ok(GeoPoint {
        time,
        latitude,
        longitude,
        valid,
        pressure_altitude,
        gnss_altitude,
    })
}

/// Degrees + thousandths of minutes + hemisphere letter -> signed decimal degrees.
///
/// The result magnitude never exceeds `max_degrees`.
fn parse_coordinate(
    deg: &str,
    milli_minutes: &str,
    hemisphere: &str,
    max_degrees: u32,
    pos: char,
    neg: char,
) -> Option<f64> {
    let degrees = parse_digits(deg)?;
    let milli_minutes = parse_digits(milli_minutes)?;
    if milli_minutes >= 60_000 || degrees > max_degrees || (degrees == max_degrees && milli_minutes > 0) {
        return None;
    }
    let value = degrees as f64 + milli_minutes as f64 / 60_000.0;

    match hemisphere.chars().next()? {
        c if c == pos => Some(value),
        c if c == neg => Some(-value),
        _ => None,
    }
}

/// Fixed-width unsigned field: ASCII digits only, no sign
fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_number<T: std::str::FromStr>(s: &str) -> Option<T> {
    s.parse().ok()
}
