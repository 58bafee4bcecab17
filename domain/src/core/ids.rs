//! Platform identifiers
//!
//! Every entity on the chat platform is addressed by a 64-bit snowflake.
//! The newtypes below keep community, channel, role and user ids from being
//! mixed up. They serialize as decimal strings (the platform's own wire
//! format, which also survives JavaScript number precision) and accept either
//! a string or a bare number when deserializing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSnowflake {
    Number(u64),
    Text(String),
}

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match RawSnowflake::deserialize(deserializer)? {
                    RawSnowflake::Number(raw) => Ok(Self(raw)),
                    RawSnowflake::Text(text) => text.parse().map_err(serde::de::Error::custom),
                }
            }
        }
    };
}

snowflake_id!(
    /// A community (guild) on the platform
    CommunityId
);
snowflake_id!(
    /// A channel or category
    ChannelId
);
snowflake_id!(
    /// A role within a community
    RoleId
);
snowflake_id!(
    /// A user account
    UserId
);

impl CommunityId {
    /// The implicit `@everyone` role shares its id with the community.
    pub const fn everyone_role(self) -> RoleId {
        RoleId(self.0)
    }
}
