//! Newsletter subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Email, SubscriberId};

/// A newsletter subscriber.
///
/// Created once per address. Creation triggers the welcome email; after that
/// the record is never touched again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub subscribed_at: DateTime<Utc>,
}
