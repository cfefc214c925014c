//! Conversions between the host's Automation vocabulary and Rust types.
//!
//! Everything here is a pure function. Enumerations mirror the host's
//! constants member for member and carry an `Other(i32)` arm, so values
//! newer than this crate pass through unchanged instead of failing.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

/// Two-way mapping between an enumeration and its native `Long` value.
pub trait NativeEnum: Copy {
    fn from_native(value: i32) -> Self;
    fn to_native(self) -> i32;
}

/// Converts a native enumeration value to its Rust representation.
pub fn to_enum<T: NativeEnum>(value: i32) -> T {
    T::from_native(value)
}

/// Converts a Rust enumeration back to its native value.
pub fn to_native<T: NativeEnum>(value: T) -> i32 {
    value.to_native()
}

/// Declares an enumeration with value parity to a host constant table.
///
/// ```
/// office_interop::native_enum! {
///     /// Line spacing rule.
///     pub enum LineSpacing {
///         Single = 0,
///         OnePointFive = 1,
///     }
/// }
/// use office_interop::convert::NativeEnum as _;
/// assert_eq!(LineSpacing::from_native(1), LineSpacing::OnePointFive);
/// assert_eq!(LineSpacing::from_native(7), LineSpacing::Other(7));
/// assert_eq!(LineSpacing::Other(7).to_native(), 7);
/// ```
#[macro_export]
macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)+
            /// A native value without a named member.
            Other(i32),
        }

        impl $name {
            /// Every named member, in declaration order.
            pub const KNOWN: &'static [Self] = &[$(Self::$variant),+];
        }

        impl $crate::convert::NativeEnum for $name {
            fn from_native(value: i32) -> Self {
                $(if value == $value {
                    return Self::$variant;
                })+
                Self::Other(value)
            }

            fn to_native(self) -> i32 {
                match self {
                    $(Self::$variant => $value,)+
                    Self::Other(value) => value,
                }
            }
        }
    };
}

native_enum! {
    /// `MsoTriState`.
    pub enum TriState {
        True = -1,
        False = 0,
        CTrue = 1,
        Mixed = -2,
        Toggle = -9,
    }
}

/// Word reports mixed formatting on a range as `wdUndefined`.
pub const WD_UNDEFINED: i32 = 9_999_999;

impl TriState {
    /// Reads a Word font-style value, where `wdUndefined` means mixed.
    pub fn from_font_value(value: i32) -> Self {
        if value == WD_UNDEFINED {
            Self::Mixed
        } else {
            Self::from_native(value)
        }
    }
}

/// `true` for `msoTrue` and `msoCTrue`; every other state reads as `false`.
pub fn to_bool(value: TriState) -> bool {
    matches!(value, TriState::True | TriState::CTrue)
}

pub fn to_tri_state(value: bool) -> TriState {
    if value { TriState::True } else { TriState::False }
}

native_enum! {
    /// `WdPaperSize`.
    pub enum PaperSize {
        Paper10x14 = 0,
        Paper11x17 = 1,
        Letter = 2,
        LetterSmall = 3,
        Legal = 4,
        Executive = 5,
        A3 = 6,
        A4 = 7,
        A4Small = 8,
        A5 = 9,
        B4 = 10,
        B5 = 11,
        Custom = 41,
    }
}

native_enum! {
    /// `WdOrientation`.
    pub enum Orientation {
        Portrait = 0,
        Landscape = 1,
    }
}

native_enum! {
    /// `WdWindowState`.
    pub enum WindowState {
        Normal = 0,
        Maximize = 1,
        Minimize = 2,
    }
}

native_enum! {
    /// `WdSaveOptions`.
    pub enum SaveOptions {
        DoNotSaveChanges = 0,
        SaveChanges = -1,
        PromptToSaveChanges = -2,
    }
}

native_enum! {
    /// `MsoTextOrientation`.
    pub enum TextOrientation {
        Mixed = -2,
        Horizontal = 1,
        Upward = 2,
        Downward = 3,
        VerticalFarEast = 4,
        Vertical = 5,
        HorizontalRotatedFarEast = 6,
    }
}

native_enum! {
    /// `MsoShapeType`.
    pub enum ShapeType {
        Mixed = -2,
        AutoShape = 1,
        Callout = 2,
        Chart = 3,
        Comment = 4,
        FreeForm = 5,
        Group = 6,
        EmbeddedOleObject = 7,
        FormControl = 8,
        Line = 9,
        LinkedOleObject = 10,
        LinkedPicture = 11,
        OleControlObject = 12,
        Picture = 13,
        Placeholder = 14,
        TextEffect = 15,
        Media = 16,
        TextBox = 17,
        ScriptAnchor = 18,
        Table = 19,
        Canvas = 20,
        Diagram = 21,
        Ink = 22,
        InkComment = 23,
        SmartArt = 24,
    }
}

// ── OLE Automation dates ────────────────────────────────────────────

/// Smallest and largest dates the host accepts (0100-01-01 .. 9999-12-31).
const OLE_DATE_MIN: f64 = -657_434.0;
const OLE_DATE_MAX: f64 = 2_958_466.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn ole_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Converts an OLE Automation date (days since 1899-12-30, fraction is
/// the time of day) to a naive datetime. Returns `None` outside the range
/// the host supports.
///
/// Before the epoch the integer part counts backwards but the fraction is
/// still added forwards, so `-1.25` is 1899-12-29 06:00.
#[allow(clippy::cast_possible_truncation)]
pub fn ole_date_to_datetime(value: f64) -> Option<NaiveDateTime> {
    if !value.is_finite() || !(OLE_DATE_MIN..OLE_DATE_MAX).contains(&value) {
        return None;
    }
    let days = value.trunc() as i64;
    let millis = (value.fract().abs() * MILLIS_PER_DAY).round() as i64;
    ole_epoch().checked_add_signed(Duration::days(days) + Duration::milliseconds(millis))
}

/// Inverse of [`ole_date_to_datetime`], with millisecond precision.
#[allow(clippy::cast_precision_loss)]
pub fn datetime_to_ole_date(value: NaiveDateTime) -> f64 {
    let epoch = ole_epoch();
    let days = (value.date() - epoch.date()).num_days();
    let millis_of_day = i64::from(value.num_seconds_from_midnight()) * 1000
        + i64::from(value.nanosecond() / 1_000_000);
    let fraction = millis_of_day as f64 / MILLIS_PER_DAY;
    if days < 0 {
        days as f64 - fraction
    } else {
        days as f64 + fraction
    }
}
