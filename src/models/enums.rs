//! Text-backed enumerations stored as lowercase slugs

use serde::{Deserialize, Serialize};
use sqlx::{
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    Decode, Encode, Postgres,
};
use utoipa::ToSchema;

/// Implements `as_str`, `Display`, `FromStr` and the SQLx text conversions for a slug enum
macro_rules! slug_enum {
    ($name:ident { $($variant:ident => $slug:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $slug),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($slug => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <str as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <str as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as Decode<Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reader,
    Librarian,
}

slug_enum!(Role {
    Reader => "reader",
    Librarian => "librarian",
});

impl Default for Role {
    fn default() -> Self {
        Role::Reader
    }
}

/// Status of a physical copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InventoryStatus {
    Available,
    Borrowed,
    Deleted,
}

slug_enum!(InventoryStatus {
    Available => "available",
    Borrowed => "borrowed",
    Deleted => "deleted",
});

/// Book category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookCategory {
    Textbook,
    Manual,
    Fiction,
    Science,
    Journalism,
    Other,
}

slug_enum!(BookCategory {
    Textbook => "textbook",
    Manual => "manual",
    Fiction => "fiction",
    Science => "science",
    Journalism => "journalism",
    Other => "other",
});

impl Default for BookCategory {
    fn default() -> Self {
        BookCategory::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slugs() {
        assert_eq!("Librarian".parse::<Role>(), Ok(Role::Librarian));
        assert_eq!("borrowed".parse::<InventoryStatus>(), Ok(InventoryStatus::Borrowed));
        assert_eq!("journalism".parse::<BookCategory>(), Ok(BookCategory::Journalism));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_matches_slug() {
        let json = serde_json::to_string(&InventoryStatus::Available).unwrap();
        assert_eq!(json, "\"available\"");
        assert_eq!(BookCategory::default().as_str(), "other");
    }
}
