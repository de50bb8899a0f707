use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{CommentId, ItemId, ThreadId, UserId};

/// A stored or supplied value that is not part of a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {vocabulary} value '{value}'")]
pub struct UnknownVariant {
    pub vocabulary: &'static str,
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` for a unit-only enum whose
/// wire names are fixed.
macro_rules! text_vocabulary {
    ($name:ident, $vocabulary:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        vocabulary: $vocabulary,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

// -- Items --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    Furniture,
    Electronics,
    Clothing,
    Books,
    Household,
    Sports,
    Other,
}

text_vocabulary!(CategoryType, "category", {
    Furniture => "furniture",
    Electronics => "electronics",
    Clothing => "clothing",
    Books => "books",
    Household => "household",
    Sports => "sports",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Sale,
    Rent,
    Exchange,
    Giveaway,
}

text_vocabulary!(TransactionType, "transaction type", {
    Sale => "sale",
    Rent => "rent",
    Exchange => "exchange",
    Giveaway => "giveaway",
});

/// A listed good.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "item_id")]
    pub id: ItemId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub category: CategoryType,
    pub transaction_type: TransactionType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Threads --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadType {
    ItemDiscussion,
    GeneralChat,
}

text_vocabulary!(ThreadType, "thread type", {
    ItemDiscussion => "item_discussion",
    GeneralChat => "general_chat",
});

impl ThreadType {
    /// Item discussions must point at an item; general chat must not.
    pub fn requires_item(&self) -> bool {
        match self {
            ThreadType::ItemDiscussion => true,
            ThreadType::GeneralChat => false,
        }
    }
}

/// Thread read view. `comment_count` and `vote_score` are derived from the
/// comment and vote ledgers and are never written by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    #[serde(rename = "thread_id")]
    pub id: ThreadId,
    pub author_id: UserId,
    pub thread_type: ThreadType,
    pub item_id: Option<ItemId>,
    pub title: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub comment_count: i64,
    pub vote_score: i64,
}

// -- Comments --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "comment_id")]
    pub id: CommentId,
    pub thread_id: ThreadId,
    pub author_id: UserId,
    pub content: String,
    pub parent_comment_id: Option<CommentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Votes --

/// Direction of a vote. Serialized as the integers -1, 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteDirection {
    Downvote,
    Neutral,
    Upvote,
}

impl VoteDirection {
    /// Contribution of this vote to a thread's score.
    pub fn value(self) -> i64 {
        match self {
            VoteDirection::Downvote => -1,
            VoteDirection::Neutral => 0,
            VoteDirection::Upvote => 1,
        }
    }
}

impl From<VoteDirection> for i64 {
    fn from(direction: VoteDirection) -> Self {
        direction.value()
    }
}

impl TryFrom<i64> for VoteDirection {
    type Error = UnknownVariant;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(VoteDirection::Downvote),
            0 => Ok(VoteDirection::Neutral),
            1 => Ok(VoteDirection::Upvote),
            other => Err(UnknownVariant {
                vocabulary: "vote direction",
                value: other.to_string(),
            }),
        }
    }
}

/// The single vote slot a user holds on a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub thread_id: ThreadId,
    pub user_id: UserId,
    pub direction: VoteDirection,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
