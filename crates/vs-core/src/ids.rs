//! Typed ID wrappers over `Uuid`.
//!
//! Keeps a `UserId` from being passed where a `VideoId` is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Declares `Uuid` newtypes. Each carries an entity name used in parse
/// errors, so a bad path segment reads "invalid video id" rather than a
/// bare uuid complaint.
macro_rules! typed_id {
    ($($(#[doc = $doc:expr])* $name:ident => $entity:literal),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(Uuid);

            impl $name {
                pub const ENTITY: &'static str = $entity;

                /// Mint a fresh random id.
                #[must_use]
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.fmt(f)
                }
            }

            impl FromStr for $name {
                type Err = Error;

                fn from_str(s: &str) -> Result<Self> {
                    Uuid::parse_str(s.trim())
                        .map(Self)
                        .map_err(|_| Error::Validation(format!("invalid {} id: {s:?}", $entity)))
                }
            }

            impl From<Uuid> for $name {
                fn from(uuid: Uuid) -> Self {
                    Self(uuid)
                }
            }
        )+
    };
}

typed_id! {
    /// Identifier of an uploaded video (the ingestion record).
    VideoId => "video",
    /// Identifier of a registered user.
    UserId => "user",
    /// Identifier of a comment on a video.
    CommentId => "comment",
}
