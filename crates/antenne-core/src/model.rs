// ── Domain types ──
//
// Identifiers and snapshots shared by the probes, the relay and the
// platform adapters. Identifiers are platform snowflakes wrapped in
// distinct newtypes so a room id can never be passed where a user id
// is expected.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Identifiers ─────────────────────────────────────────────────────

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

snowflake!(
    /// A community (guild) on the chat platform.
    CommunityId
);
snowflake!(
    /// A room (channel) inside a community.
    RoomId
);
snowflake!(
    /// A platform user.
    UserId
);

// ── Platform entities ───────────────────────────────────────────────

/// Resolved community handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Community {
    pub id: CommunityId,
    pub name: String,
}

/// What kind of room a channel id points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RoomKind {
    Voice,
    Stage,
    Text,
    Other,
}

/// Resolved room handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub kind: RoomKind,
}

impl Room {
    /// Only voice and stage rooms accept an audio connection.
    pub fn is_voice_capable(&self) -> bool {
        matches!(self.kind, RoomKind::Voice | RoomKind::Stage)
    }
}

// ── Playback ────────────────────────────────────────────────────────

/// A playable file from the audio directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    pub name: String,
}

impl Track {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ── Condition snapshot ──────────────────────────────────────────────

/// Both external conditions as observed during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConditionSnapshot {
    pub live: bool,
    pub user_present: bool,
}

impl ConditionSnapshot {
    pub fn should_connect(self) -> bool {
        self.live && self.user_present
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_from_str_trims() {
        let id: CommunityId = " 261939673662750721 ".parse().unwrap();
        assert_eq!(id.get(), 261_939_673_662_750_721);
        assert_eq!(id.to_string(), "261939673662750721");
    }

    #[test]
    fn snowflake_rejects_garbage() {
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn decision_truth_table() {
        let cases = [
            (false, false, false),
            (false, true, false),
            (true, false, false),
            (true, true, true),
        ];
        for (live, user_present, expected) in cases {
            let snap = ConditionSnapshot { live, user_present };
            assert_eq!(snap.should_connect(), expected, "{snap:?}");
        }
    }

    #[test]
    fn voice_capable_rooms() {
        let room = |kind| Room {
            id: RoomId::new(1),
            name: "r".into(),
            kind,
        };
        assert!(room(RoomKind::Voice).is_voice_capable());
        assert!(room(RoomKind::Stage).is_voice_capable());
        assert!(!room(RoomKind::Text).is_voice_capable());
        assert!(!room(RoomKind::Other).is_voice_capable());
    }

    #[test]
    fn track_name_is_file_name() {
        let track = Track::new(PathBuf::from("/srv/audios/01 - Intro.mp3"));
        assert_eq!(track.name, "01 - Intro.mp3");
        assert_eq!(track.to_string(), "01 - Intro.mp3");
    }
}
