/// Available system sounds from System Settings > Sound > Sound Effects
/// (located in /System/Library/Sounds)
pub const SOUNDS: [&str; 14] = [
    "Basso",
    "Blow",
    "Bottle",
    "Frog",
    "Funk",
    "Glass",
    "Hero",
    "Morse",
    "Ping",
    "Pop",
    "Purr",
    "Sosumi",
    "Submarine",
    "Tink",
];

/// Outcome of resolving a requested sound against the catalog
///
/// Keeps "no sound requested" and "name not in the catalog" distinct
/// internally; both turn into the empty helper argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundResolution {
    /// No sound was requested
    Unspecified,
    /// The requested name is not a known system sound
    Unrecognized(String),
    /// A catalog entry, in its canonical title-cased spelling
    Recognized(&'static str),
}

impl SoundResolution {
    /// Canonical sound name, if one was recognized
    pub fn canonical(&self) -> Option<&'static str> {
        match self {
            Self::Recognized(name) => Some(name),
            Self::Unspecified | Self::Unrecognized(_) => None,
        }
    }

    /// Value passed to the helper's --sound flag (empty string = no sound)
    pub fn as_argument(&self) -> &'static str {
        self.canonical().unwrap_or("")
    }
}

/// Resolve a requested sound name against the catalog
///
/// Matching is case-insensitive. Absent or empty input means no sound,
/// and an unknown name coerces to no sound rather than an error.
pub fn resolve(input: Option<&str>) -> SoundResolution {
    let requested = match input {
        Some(s) if !s.is_empty() => s,
        _ => return SoundResolution::Unspecified,
    };

    match SOUNDS.iter().find(|s| s.eq_ignore_ascii_case(requested)) {
        Some(name) => SoundResolution::Recognized(name),
        None => SoundResolution::Unrecognized(requested.to_string()),
    }
}

/// Coerce `input` to a valid sound name
///
/// Returns the catalog's canonical spelling, or `None` for absent,
/// empty, or unknown names.
pub fn validate(input: Option<&str>) -> Option<&'static str> {
    resolve(input).canonical()
}
