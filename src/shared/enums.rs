use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Account role. Controls which operations a caller may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Faculty,
    Tech,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Faculty => "FACULTY",
            Self::Tech => "TECH",
            Self::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STUDENT" => Some(Self::Student),
            "FACULTY" => Some(Self::Faculty),
            "TECH" => Some(Self::Tech),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Staff roles may triage tickets: change status, assign, list users.
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Tech | Self::Admin)
    }
}

impl ToSql<Text, Pg> for Role {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for Role {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = std::str::from_utf8(value.as_bytes())?;
        Self::parse(raw).ok_or_else(|| format!("unrecognized role: {raw}").into())
    }
}

/// Ticket lifecycle state. Any state may be set to any other; there is no
/// enforced ordering between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPEN" => Some(Self::Open),
            "IN_PROGRESS" => Some(Self::InProgress),
            "RESOLVED" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl ToSql<Text, Pg> for TicketStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for TicketStatus {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = std::str::from_utf8(value.as_bytes())?;
        Self::parse(raw).ok_or_else(|| format!("unrecognized ticket status: {raw}").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Student, Role::Faculty, Role::Tech, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("JANITOR"), None);
        assert_eq!(Role::parse("student"), None);
    }

    #[test]
    fn test_staff_roles() {
        assert!(Role::Tech.is_staff());
        assert!(Role::Admin.is_staff());
        assert!(!Role::Student.is_staff());
        assert!(!Role::Faculty.is_staff());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [TicketStatus::Open, TicketStatus::InProgress, TicketStatus::Resolved] {
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TicketStatus::parse("CLOSED"), None);
    }

    #[test]
    fn test_serde_wire_format() {
        let json = serde_json::to_string(&TicketStatus::InProgress).expect("serialize");
        assert_eq!(json, "\"IN_PROGRESS\"");
        let back: TicketStatus = serde_json::from_str("\"RESOLVED\"").expect("deserialize");
        assert_eq!(back, TicketStatus::Resolved);
    }
}
