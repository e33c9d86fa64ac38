use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::db::types::ActiveStatus;

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) nickname: Option<String>,
    pub(crate) avatar: Option<String>,
    pub(crate) status: ActiveStatus,
    pub(crate) is_superuser: bool,
    pub(crate) last_login_at: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            nickname: user.nickname,
            avatar: user.avatar,
            status: user.status,
            is_superuser: user.is_superuser,
            last_login_at: user.last_login_at.map(format_primitive),
            created_at: format_primitive(user.created_at),
            updated_at: format_primitive(user.updated_at),
        }
    }
}

/// Status change shared by administrator and student management.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdate {
    pub(crate) status: ActiveStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserStatisticsResponse {
    pub(crate) total: i64,
    pub(crate) active: i64,
    pub(crate) inactive: i64,
    pub(crate) recently_active: i64,
    pub(crate) never_logged_in: i64,
}
