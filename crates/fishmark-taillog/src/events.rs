use nalgebra::Point2;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Matches `Position "<field>" was set to (X,Y)!` with at least two digits
/// per coordinate.
const POSITION_PATTERN: &str =
    r#"Position "([A-Za-z0-9_]+)" was set to \(([0-9]{2,}),([0-9]{2,})\)!"#;

/// Coordinates of a recorded click.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedPosition {
    Pixel(Point2<i32>),
    /// A coordinate does not fit in `i32`.
    OutOfRange,
}

/// One recorded click: `field` was set to `position`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEvent {
    pub field: String,
    pub position: RecordedPosition,
}

impl PositionEvent {
    pub fn new(field: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            field: field.into(),
            position: RecordedPosition::Pixel(Point2::new(x, y)),
        }
    }

    pub fn out_of_range(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            position: RecordedPosition::OutOfRange,
        }
    }
}

/// Trim every line and concatenate them without separator.
///
/// `\n`, `\r\n` and a lone `\r` all end a line. Records broken over several
/// lines become contiguous again.
pub fn normalize_log_text(raw: &str) -> String {
    raw.split(['\n', '\r']).map(str::trim).collect()
}

/// Compiled extractor for position records.
#[derive(Clone, Debug)]
pub struct PositionEventParser {
    pattern: Regex,
}

impl PositionEventParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(POSITION_PATTERN)?,
        })
    }

    /// All position records of an already normalized text, in file order.
    ///
    /// Records whose coordinates overflow `i32` are kept as
    /// [`RecordedPosition::OutOfRange`] so they still override earlier clicks.
    pub fn parse(&self, text: &str) -> Vec<PositionEvent> {
        self.pattern
            .captures_iter(text)
            .map(|caps| {
                let field = &caps[1];
                match (caps[2].parse::<i32>(), caps[3].parse::<i32>()) {
                    (Ok(x), Ok(y)) => PositionEvent::new(field, x, y),
                    _ => {
                        log::warn!("out-of-range position record for {field:?}");
                        PositionEvent::out_of_range(field)
                    }
                }
            })
            .collect()
    }
}

/// Last-write-wins view over an append-only sequence of position events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionLog {
    latest: BTreeMap<String, RecordedPosition>,
    counts: BTreeMap<String, usize>,
}

impl PositionLog {
    /// Fold events in order; later events overwrite earlier ones.
    pub fn from_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = PositionEvent>,
    {
        events.into_iter().fold(Self::default(), |mut log, ev| {
            log.apply(ev);
            log
        })
    }

    pub fn apply(&mut self, event: PositionEvent) {
        *self.counts.entry(event.field.clone()).or_insert(0) += 1;
        self.latest.insert(event.field, event.position);
    }

    /// Final value of `field`, if it was ever set.
    pub fn get(&self, field: &str) -> Option<RecordedPosition> {
        self.latest.get(field).copied()
    }

    /// Number of times `field` was set.
    pub fn count(&self, field: &str) -> usize {
        self.counts.get(field).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

impl FromIterator<PositionEvent> for PositionLog {
    fn from_iter<I: IntoIterator<Item = PositionEvent>>(iter: I) -> Self {
        Self::from_events(iter)
    }
}
