//! Roster entities as handed over by the storage collaborator.
//!
//! These are read-only snapshots: the engine validates them per call (date
//! ranges, time windows, weekday masks, shift shape) but never mutates or
//! retains them. Field names follow the JSON documents the storage layer emits,
//! with `"HH:MM"` times and `YYYY-MM-DD` dates.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, RosterError};
use crate::time::{ClockTime, MinuteSpan};

// ---------------------------------------------------------------------------
// Dates and weekdays
// ---------------------------------------------------------------------------

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        check_range("date range", start, end)?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start <= end && start <= self.end
    }

    /// Monday-to-Friday dates inside the range, in order.
    pub fn school_days(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .filter(|d| is_school_day(*d))
            .collect()
    }
}

pub(crate) fn check_range(entity: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Err(RosterError::InvalidDateRange {
            entity: entity.to_string(),
            start,
            end,
        });
    }
    Ok(())
}

/// True for Monday through Friday.
pub fn is_school_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The set of school weekdays a block recurs on.
///
/// Serialized as a list of day codes. Accepted codes are English or French,
/// full or abbreviated, case-insensitive (`"Mon"`, `"MO"`, `"lundi"`, `"Lu"`).
/// Saturday and Sunday are recognized but rejected: blocks only run on
/// school days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct WeekdayMask(u8);

impl WeekdayMask {
    /// Monday through Friday.
    pub const SCHOOL_WEEK: WeekdayMask = WeekdayMask(0b1_1111);

    pub fn from_days(days: &[Weekday]) -> Result<Self> {
        if days.is_empty() {
            return Err(RosterError::InvalidWeekdayMask("empty weekday set".to_string()));
        }
        let mut bits = 0u8;
        for day in days {
            if matches!(day, Weekday::Sat | Weekday::Sun) {
                return Err(RosterError::InvalidWeekdayMask(format!(
                    "{} is not a school day",
                    day
                )));
            }
            bits |= 1 << day.num_days_from_monday();
        }
        Ok(Self(bits))
    }

    /// Parse a list of day codes.
    pub fn parse<S: AsRef<str>>(codes: &[S]) -> Result<Self> {
        let days = codes
            .iter()
            .map(|code| {
                parse_weekday_code(code.as_ref()).ok_or_else(|| {
                    RosterError::InvalidWeekdayMask(format!(
                        "unrecognized weekday code '{}'",
                        code.as_ref()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_days(&days)
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn days(self) -> Vec<Weekday> {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ]
        .into_iter()
        .filter(|d| self.contains(*d))
        .collect()
    }
}

impl Default for WeekdayMask {
    fn default() -> Self {
        Self::SCHOOL_WEEK
    }
}

impl TryFrom<Vec<String>> for WeekdayMask {
    type Error = RosterError;

    fn try_from(codes: Vec<String>) -> Result<Self> {
        Self::parse(&codes)
    }
}

impl From<WeekdayMask> for Vec<String> {
    fn from(mask: WeekdayMask) -> Self {
        mask.days().iter().map(|d| d.to_string()).collect()
    }
}

fn parse_weekday_code(code: &str) -> Option<Weekday> {
    let day = match code.trim().to_lowercase().as_str() {
        "mo" | "mon" | "monday" | "lu" | "lun" | "lundi" => Weekday::Mon,
        "tu" | "tue" | "tuesday" | "ma" | "mar" | "mardi" => Weekday::Tue,
        "we" | "wed" | "wednesday" | "me" | "mer" | "mercredi" => Weekday::Wed,
        "th" | "thu" | "thursday" | "je" | "jeu" | "jeudi" => Weekday::Thu,
        "fr" | "fri" | "friday" | "ve" | "ven" | "vendredi" => Weekday::Fri,
        "sa" | "sat" | "saturday" | "samedi" => Weekday::Sat,
        "su" | "sun" | "sunday" | "di" | "dim" | "dimanche" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

// ---------------------------------------------------------------------------
// People and places
// ---------------------------------------------------------------------------

/// Reads an optional driver reference. `null`, `""` and blank strings all mean
/// "no driver".
fn driver_ref<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id: Option<String> = Option::deserialize(deserializer)?;
    Ok(id.filter(|id| !id.trim().is_empty()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    /// Inactive drivers get no new activations; their circuits need replacements.
    #[serde(default)]
    pub is_inactive: bool,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: String,
    pub name: String,
    #[serde(default = "default_school_color")]
    pub color: String,
}

fn default_school_color() -> String {
    "#4CAF50".to_string()
}

// ---------------------------------------------------------------------------
// Circuits
// ---------------------------------------------------------------------------

/// One school run inside a shift, with optional approach time (HLP) on
/// either side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: String,
    pub school_id: String,
    #[serde(rename = "start_time")]
    pub start: ClockTime,
    #[serde(rename = "end_time")]
    pub end: ClockTime,
    #[serde(default, alias = "hlp_before")]
    pub approach_before: u16,
    #[serde(default, alias = "hlp_after")]
    pub approach_after: u16,
    #[serde(default)]
    pub days: WeekdayMask,
}

/// A block's effective span split into its parts, for detailed display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockBreakdown {
    pub approach_before: Option<MinuteSpan>,
    pub block: MinuteSpan,
    pub approach_after: Option<MinuteSpan>,
}

impl TimeBlock {
    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(RosterError::InvalidTimeRange {
                start: self.start.to_string(),
                end: self.end.to_string(),
            });
        }
        Ok(())
    }

    /// `[start - approach_before, end + approach_after]`.
    pub fn effective_span(&self) -> MinuteSpan {
        let own = MinuteSpan::between(self.start, self.end);
        MinuteSpan::new(
            own.start - i32::from(self.approach_before),
            own.end + i32::from(self.approach_after),
        )
    }

    pub fn breakdown(&self) -> BlockBreakdown {
        let own = MinuteSpan::between(self.start, self.end);
        let effective = self.effective_span();
        BlockBreakdown {
            approach_before: (self.approach_before > 0)
                .then(|| MinuteSpan::new(effective.start, own.start)),
            block: own,
            approach_after: (self.approach_after > 0)
                .then(|| MinuteSpan::new(own.end, effective.end)),
        }
    }
}

/// A named part of the circuit's day (AM, MIDI, PM) made of blocks, or a
/// flat-rate administrative role paid a fixed daily duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<TimeBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_minutes: Option<u32>,
}

/// The validated shape of a [`Shift`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShiftKind<'a> {
    Blocks(&'a [TimeBlock]),
    Flat(u32),
}

impl Shift {
    /// Classify the shift, rejecting shifts that are neither (or both) block-based
    /// and flat-rate.
    pub fn kind(&self) -> Result<ShiftKind<'_>> {
        let flat = self.flat_minutes.filter(|m| *m > 0);
        match (self.blocks.is_empty(), flat) {
            (false, None) => Ok(ShiftKind::Blocks(&self.blocks)),
            (true, Some(minutes)) => Ok(ShiftKind::Flat(minutes)),
            (true, None) => Err(self.invalid("no blocks and no flat duration")),
            (false, Some(_)) => Err(self.invalid("has both blocks and a flat duration")),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let ShiftKind::Blocks(blocks) = self.kind()? {
            for block in blocks {
                block.validate()?;
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> RosterError {
        RosterError::InvalidShift {
            shift: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

/// A recurring circuit with zero or one assigned driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub circuit_number: String,
    #[serde(default, deserialize_with = "driver_ref")]
    pub employee_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub shifts: Vec<Shift>,
    /// Adapted (accessible) vehicle circuit. Carried for display only.
    #[serde(default)]
    pub is_adapted: bool,
}

impl Assignment {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn validate(&self) -> Result<()> {
        check_range(
            &format!("assignment {}", self.circuit_number),
            self.start_date,
            self.end_date,
        )?;
        self.shifts.iter().try_for_each(Shift::validate)
    }
}

// ---------------------------------------------------------------------------
// Exceptions
// ---------------------------------------------------------------------------

/// A one-off work item on a single date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporaryTask {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    #[serde(rename = "start_time")]
    pub start: ClockTime,
    #[serde(rename = "end_time")]
    pub end: ClockTime,
    #[serde(default, deserialize_with = "driver_ref")]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub school_id: Option<String>,
}

impl TemporaryTask {
    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(RosterError::InvalidTimeRange {
                start: self.start.to_string(),
                end: self.end.to_string(),
            });
        }
        Ok(())
    }

    pub fn span(&self) -> MinuteSpan {
        MinuteSpan::between(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Absence {
    pub id: String,
    pub employee_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Shift names this absence covers. Empty means the whole day.
    #[serde(default)]
    pub shift_types: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

impl Absence {
    pub fn validate(&self) -> Result<()> {
        check_range(&format!("absence {}", self.id), self.start_date, self.end_date)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn is_whole_day(&self) -> bool {
        self.shift_types.is_empty()
    }

    /// Whether the absence affects a shift with this name. Items without a shift
    /// name (temporary tasks) are only affected by whole-day absences.
    pub fn affects(&self, shift_name: Option<&str>) -> bool {
        if self.is_whole_day() {
            return true;
        }
        match shift_name {
            Some(name) => self
                .shift_types
                .iter()
                .any(|label| label.trim().eq_ignore_ascii_case(name.trim())),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
}

/// A one-date override moving a single block to another driver, or to the
/// replacement pool when `new_employee_id` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockReassignment {
    pub id: String,
    pub date: NaiveDate,
    pub assignment_id: String,
    pub shift_id: String,
    pub block_id: String,
    #[serde(default, deserialize_with = "driver_ref")]
    pub new_employee_id: Option<String>,
}

impl BlockReassignment {
    pub fn matches(&self, date: NaiveDate, assignment_id: &str, shift_id: &str, block_id: &str) -> bool {
        self.date == date
            && self.assignment_id == assignment_id
            && self.shift_id == shift_id
            && self.block_id == block_id
    }
}
