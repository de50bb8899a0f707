use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{BazaarError, Result};
use crate::ids::{CommentId, ItemId, UserId};
use crate::models::{CategoryType, ThreadType, TransactionType, VoteDirection};

pub const THREAD_TITLE_MIN: usize = 3;
pub const THREAD_TITLE_MAX: usize = 100;
pub const THREAD_CONTENT_MIN: usize = 10;
pub const ITEM_TITLE_MAX: usize = 100;

fn check_len(field: &str, value: &str, min: usize, max: Option<usize>) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(BazaarError::Validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    if let Some(max) = max {
        if len > max {
            return Err(BazaarError::Validation(format!(
                "{field} must be at most {max} characters"
            )));
        }
    }
    Ok(())
}

fn check_price(price_cents: Option<i64>) -> Result<()> {
    match price_cents {
        Some(p) if p < 0 => Err(BazaarError::Validation(
            "price_cents must not be negative".into(),
        )),
        _ => Ok(()),
    }
}

fn default_true() -> bool {
    true
}

/// Present-but-null becomes `Some(None)`; an absent field stays `None`
/// through `#[serde(default)]`.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -- Items --

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateItemRequest {
    pub owner_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    pub category: CategoryType,
    pub transaction_type: TransactionType,
}

impl CreateItemRequest {
    pub fn validate(&self) -> Result<()> {
        check_len("title", &self.title, 1, Some(ITEM_TITLE_MAX))?;
        check_price(self.price_cents)
    }
}

/// Partial item update: absent fields are left untouched. `description` and
/// `price_cents` are cleared by an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<Option<i64>>,
    pub category: Option<CategoryType>,
    pub transaction_type: Option<TransactionType>,
}

impl UpdateItemRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            check_len("title", title, 1, Some(ITEM_TITLE_MAX))?;
        }
        check_price(self.price_cents.flatten())
    }
}

/// Equality filters for item listing, combined with AND.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ItemFilter {
    pub item_id: Option<ItemId>,
    pub category: Option<CategoryType>,
    pub transaction_type: Option<TransactionType>,
}

// -- Threads --

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateThreadRequest {
    pub author_id: UserId,
    pub thread_type: ThreadType,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    pub title: String,
    pub content: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateThreadRequest {
    pub fn validate(&self) -> Result<()> {
        check_len("title", &self.title, THREAD_TITLE_MIN, Some(THREAD_TITLE_MAX))?;
        check_len("content", &self.content, THREAD_CONTENT_MIN, None)?;

        match (self.thread_type.requires_item(), self.item_id) {
            (true, None) => Err(BazaarError::Validation(format!(
                "item_id is required for {} threads",
                self.thread_type
            ))),
            (false, Some(_)) => Err(BazaarError::Validation(format!(
                "item_id is not allowed for {} threads",
                self.thread_type
            ))),
            _ => Ok(()),
        }
    }
}

/// Partial thread update. Author, type and item are fixed at creation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateThreadRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateThreadRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            check_len("title", title, THREAD_TITLE_MIN, Some(THREAD_TITLE_MAX))?;
        }
        if let Some(content) = &self.content {
            check_len("content", content, THREAD_CONTENT_MIN, None)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ThreadFilter {
    pub thread_type: Option<ThreadType>,
    pub item_id: Option<ItemId>,
    pub author_id: Option<UserId>,
    pub is_active: Option<bool>,
}

// -- Comments --

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub author_id: UserId,
    pub content: String,
    #[serde(default)]
    pub parent_comment_id: Option<CommentId>,
}

impl CreateCommentRequest {
    pub fn validate(&self) -> Result<()> {
        validate_comment_content(&self.content)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    pub content: String,
}

impl UpdateCommentRequest {
    pub fn validate(&self) -> Result<()> {
        validate_comment_content(&self.content)
    }
}

fn validate_comment_content(content: &str) -> Result<()> {
    if content.is_empty() {
        return Err(BazaarError::Validation("content must not be empty".into()));
    }
    Ok(())
}

// -- Votes --

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CastVoteRequest {
    pub user_id: UserId,
    pub direction: VoteDirection,
}

/// Identifies whose vote to cancel. The user id is trusted as supplied.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CancelVoteRequest {
    pub user_id: UserId,
}
