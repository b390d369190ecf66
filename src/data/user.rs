use crate::auth::PermissionsTarget;
use axum_login::AuthUser;
use maud::Render;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Teacher,
    Nurse,
    Security,
    Admin,
}

impl Role {
    ///roles that have to type in their shared phrase before getting in
    pub const fn requires_phrase(self) -> bool {
        match self {
            Self::Admin | Self::Nurse => true,
            Self::Student | Self::Teacher | Self::Security => false,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Teacher => "TEACHER",
            Self::Nurse => "NURSE",
            Self::Security => "SECURITY",
            Self::Admin => "ADMIN",
        }
    }

    pub fn permissions(self) -> PermissionsTarget {
        match self {
            Self::Student => PermissionsTarget::empty(),
            Self::Teacher => PermissionsTarget::REVIEW_REQUESTS | PermissionsTarget::CONFIRM_RETURN,
            Self::Nurse => PermissionsTarget::DISPATCH_EMERGENCY,
            Self::Security => PermissionsTarget::CONFIRM_EXIT | PermissionsTarget::VIEW_GATE,
            Self::Admin => {
                PermissionsTarget::all()
                    - PermissionsTarget::CONFIRM_EXIT
                    - PermissionsTarget::DISPATCH_EMERGENCY
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: &'static str,
    pub name: &'static str,
    pub role: Role,
    pub avatar: &'static str,
}

pub static STAFF_USERS: [User; 4] = [
    User {
        id: "admin1",
        name: "Geraid Mutegi",
        role: Role::Admin,
        avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=Geraid",
    },
    User {
        id: "nurse1",
        name: "Nurse Joy",
        role: Role::Nurse,
        avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=Joy",
    },
    User {
        id: "sec1",
        name: "Officer Mutua",
        role: Role::Security,
        avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=Mutua",
    },
    User {
        id: "teacher1",
        name: "Mr. Kamau",
        role: Role::Teacher,
        avatar: "https://api.dicebear.com/7.x/avataaars/svg?seed=Kamau",
    },
];

impl User {
    pub fn find_staff(id: &str) -> Option<&'static Self> {
        STAFF_USERS.iter().find(|user| user.id == id)
    }

    ///requests record who acted by staff id, this turns one back into a name for display
    pub fn display_name(id: &str) -> &str {
        Self::find_staff(id).map_or(id, |user| user.name)
    }

    pub fn get_permissions(&self) -> PermissionsTarget {
        self.role.permissions()
    }
}

impl Render for User {
    fn render_to(&self, buffer: &mut String) {
        self.name.render_to(buffer);
    }
}

impl AuthUser for User {
    type Id = String;

    fn id(&self) -> Self::Id {
        self.id.to_string()
    }

    //staff accounts are static, so the id is all there is to invalidate against
    fn session_auth_hash(&self) -> &[u8] {
        self.id.as_bytes()
    }
}
