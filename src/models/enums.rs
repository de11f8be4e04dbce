use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unrecognised string for a closed set of values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: {value}")]
pub struct UnknownVariant {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
///
/// Parsing is case-insensitive. The `fallback` form maps any unrecognised
/// string to the given variant instead of failing.
macro_rules! str_enum {
    (@common $name:ident { $($variant:ident => $s:literal),+ }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            fn lookup(s: &str) -> Option<Self> {
                let s = s.trim();
                $(if s.eq_ignore_ascii_case($s) {
                    return Some(Self::$variant);
                })+
                None
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        str_enum!(@common $name { $($variant => $s),+ });

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::lookup(s).ok_or_else(|| UnknownVariant {
                    field: stringify!($name).into(),
                    value: s.into(),
                })
            }
        }
    };
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? } fallback $fallback:ident) => {
        str_enum!(@common $name { $($variant => $s),+ });

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::lookup(s).unwrap_or(Self::$fallback))
            }
        }
    };
}

// The backend stores gender as free text ("Female", "Male", ...).
str_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
} fallback Other);

str_enum!(Sender {
    Patient => "patient",
    Ai => "ai",
    Doctor => "doctor",
});

str_enum!(SeverityAssessment {
    Low => "Low",
    Moderate => "Moderate",
    High => "High",
});
