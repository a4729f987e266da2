//! Fixed lookup tables for seismic intensity, depth, magnitude and tsunami
//! status, modelled as enums so every unmapped upstream value lands in an
//! explicit fallback arm instead of a silent dictionary miss.

use std::fmt;

/// Seismic intensity on the JMA shindo scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intensity {
    One,
    Two,
    Three,
    Four,
    FiveLower,
    FiveUpper,
    SixLower,
    SixUpper,
    Seven,
    /// Any raw code outside the published table.
    Unknown,
}

impl Intensity {
    /// Ranking used when listing observation blocks, most severe first.
    pub const SEVERITY_ORDER: [Intensity; 10] = [
        Intensity::Seven,
        Intensity::SixUpper,
        Intensity::SixLower,
        Intensity::FiveUpper,
        Intensity::FiveLower,
        Intensity::Four,
        Intensity::Three,
        Intensity::Two,
        Intensity::One,
        Intensity::Unknown,
    ];

    /// Maps the P2PQuake raw scale code (10, 20, ... 70) to an intensity.
    pub fn from_code(code: i64) -> Self {
        match code {
            10 => Intensity::One,
            20 => Intensity::Two,
            30 => Intensity::Three,
            40 => Intensity::Four,
            45 => Intensity::FiveLower,
            50 => Intensity::FiveUpper,
            55 => Intensity::SixLower,
            60 => Intensity::SixUpper,
            70 => Intensity::Seven,
            _ => Intensity::Unknown,
        }
    }

    /// Japanese label as printed in notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Intensity::One => "1",
            Intensity::Two => "2",
            Intensity::Three => "3",
            Intensity::Four => "4",
            Intensity::FiveLower => "5弱",
            Intensity::FiveUpper => "5強",
            Intensity::SixLower => "6弱",
            Intensity::SixUpper => "6強",
            Intensity::Seven => "7",
            Intensity::Unknown => "不明",
        }
    }

    /// Short ordinal form (`5-`, `6+`) used in log fields.
    pub fn ordinal(&self) -> &'static str {
        match self {
            Intensity::One => "1",
            Intensity::Two => "2",
            Intensity::Three => "3",
            Intensity::Four => "4",
            Intensity::FiveLower => "5-",
            Intensity::FiveUpper => "5+",
            Intensity::SixLower => "6-",
            Intensity::SixUpper => "6+",
            Intensity::Seven => "7",
            Intensity::Unknown => "unknown",
        }
    }

    /// Position in [`Intensity::SEVERITY_ORDER`]; lower sorts first.
    pub fn severity_rank(&self) -> usize {
        Self::SEVERITY_ORDER
            .iter()
            .position(|i| i == self)
            .unwrap_or(Self::SEVERITY_ORDER.len())
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Hypocenter depth as reported by the quake feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Unknown,
    VeryShallow,
    Kilometers(i64),
}

impl Depth {
    /// `-1` means the depth has not been determined, `0` means very shallow.
    pub fn from_km(km: i64) -> Self {
        match km {
            -1 => Depth::Unknown,
            0 => Depth::VeryShallow,
            km => Depth::Kilometers(km),
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Depth::Unknown => f.write_str("不明"),
            Depth::VeryShallow => f.write_str("ごく浅い"),
            Depth::Kilometers(km) => write!(f, "約{}km", km),
        }
    }
}

/// Earthquake magnitude; `-1` upstream means not yet determined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Magnitude {
    Unknown,
    Value(f64),
}

impl Magnitude {
    pub fn from_raw(raw: f64) -> Self {
        if raw == -1.0 {
            Magnitude::Unknown
        } else {
            Magnitude::Value(raw)
        }
    }
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Magnitude::Unknown => f.write_str("不明"),
            Magnitude::Value(m) => write!(f, "{:.1}", m),
        }
    }
}

/// Domestic tsunami status attached to an earthquake report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomesticTsunami {
    None,
    Unknown,
    Checking,
    NonEffective,
    Watch,
    Warning,
    /// A status string this relay has no phrase for, or no status at all.
    Unrecognized(String),
}

impl DomesticTsunami {
    pub fn from_code(code: &str) -> Self {
        match code {
            "None" => DomesticTsunami::None,
            "Unknown" => DomesticTsunami::Unknown,
            "Checking" => DomesticTsunami::Checking,
            "NonEffective" => DomesticTsunami::NonEffective,
            "Watch" => DomesticTsunami::Watch,
            "Warning" => DomesticTsunami::Warning,
            other => DomesticTsunami::Unrecognized(other.to_string()),
        }
    }

    /// The fixed sentence printed under the report header.
    pub fn phrase(&self) -> &'static str {
        match self {
            DomesticTsunami::None => "この地震による津波の心配はありません。",
            DomesticTsunami::Unknown => "不明",
            DomesticTsunami::Checking => "津波の有無を調査中です。今後の情報に注意してください。",
            DomesticTsunami::NonEffective => {
                "若干の海面変動があるかもしれませんが、被害の心配はありません。"
            }
            DomesticTsunami::Watch => "現在、津波注意報を発表中です。",
            DomesticTsunami::Warning => {
                "津波警報等（大津波警報・津波警報あるいは津波注意報）を発表中です。"
            }
            DomesticTsunami::Unrecognized(_) => "（津波情報なし）",
        }
    }
}

/// Severity grade of a tsunami advisory area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsunamiGrade {
    MajorWarning,
    Warning,
    Watch,
    /// Explicit `Unknown` upstream.
    Unknown,
    /// Any other grade string, or none at all.
    Unrecognized,
}

impl TsunamiGrade {
    pub fn from_code(code: &str) -> Self {
        match code {
            "MajorWarning" => TsunamiGrade::MajorWarning,
            "Warning" => TsunamiGrade::Warning,
            "Watch" => TsunamiGrade::Watch,
            "Unknown" => TsunamiGrade::Unknown,
            _ => TsunamiGrade::Unrecognized,
        }
    }

    /// Header block that opens an advisory notification.
    pub fn header(&self) -> &'static str {
        match self {
            TsunamiGrade::MajorWarning => {
                "【大津波警報🟪】\n大津波警報を発表しました！\n今すぐ高台やビルに避難！！\n【対象地域】"
            }
            TsunamiGrade::Warning => {
                "【津波警報🟥】\n津波警報を発表しています！\n高台や近くのビルへ避難！\n【対象地域】"
            }
            TsunamiGrade::Watch => {
                "【津波注意報🟨】\n津波注意報を発表しています。\n海や川から離れて下さい！\n【対象地域】"
            }
            // Loud on purpose: an unknown grade means the upstream schema moved.
            TsunamiGrade::Unknown => {
                "【津波情報❓️】\n津波の状況は不明です。\n今後の情報に注意してください。\n※プログラムエラーの可能性大。開発者をメンションして下さい。"
            }
            TsunamiGrade::Unrecognized => "【津波情報】\n津波の状況が不明です。\n【対象地域】",
        }
    }

    /// Extra line appended after the safety sentence, if any.
    pub fn emphasis(&self) -> Option<&'static str> {
        match self {
            TsunamiGrade::MajorWarning => Some("⚠️絶対に避難⚠️"),
            TsunamiGrade::Warning
            | TsunamiGrade::Watch
            | TsunamiGrade::Unknown
            | TsunamiGrade::Unrecognized => None,
        }
    }
}
