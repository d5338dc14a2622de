//! Demo data for local development, mirroring the stock campus accounts.

use anyhow::Result;
use chrono::Utc;
use diesel::prelude::*;
use tracing::info;
use uuid::Uuid;

use crate::security::password::hash_password;
use crate::shared::enums::{Role, TicketStatus};
use crate::shared::schema::{tickets, users};
use crate::shared::utils::DbPool;
use crate::tickets::Ticket;
use crate::users::User;

pub fn run(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;

    let user_count: i64 = users::table.count().get_result(&mut conn)?;
    if user_count == 0 {
        let demo: [(&str, &str, Role, &str); 4] = [
            ("Newton Student", "newton@student.test", Role::Student, "newton123"),
            ("Charmant Faculty", "charmant@faculty.test", Role::Faculty, "charmant123"),
            ("Glorion Tech", "glorion@it.test", Role::Tech, "glorion123"),
            ("Bissombolo Admin", "bissombolo@it.test", Role::Admin, "bissombolo123"),
        ];

        for (name, email, role, password) in demo {
            let user = User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                name: name.to_string(),
                password_hash: hash_password(password)?,
                role,
                created_at: Utc::now(),
            };
            diesel::insert_into(users::table)
                .values(&user)
                .execute(&mut conn)?;
        }
        info!("seeded {} demo users", demo.len());
    }

    let ticket_count: i64 = tickets::table.count().get_result(&mut conn)?;
    if ticket_count == 0 {
        let student: Option<User> = users::table
            .filter(users::email.eq("newton@student.test"))
            .first(&mut conn)
            .optional()?;

        if let Some(student) = student {
            let now = Utc::now();
            let ticket = Ticket {
                id: Uuid::new_v4(),
                title: "Can't connect to campus Wi-Fi".to_string(),
                description: "Wifi times out".to_string(),
                status: TicketStatus::Open,
                creator_id: student.id,
                assignee_id: None,
                created_at: now,
                updated_at: now,
            };
            diesel::insert_into(tickets::table)
                .values(&ticket)
                .execute(&mut conn)?;
            info!("seeded demo ticket {}", ticket.id);
        }
    }

    info!("Seed complete.");
    Ok(())
}
