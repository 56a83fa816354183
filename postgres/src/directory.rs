//! `PostgreSQL` lookups for events, RSVPs, groups and users.

use crate::{corrupt_row, db_error};
use gatherly_core::{
    Coordinates, Event, EventId, EventRsvp, GroupId, GroupRole, RsvpStatus, UserId, Visibility,
};
use gatherly_rsvp::Result;
use gatherly_rsvp::providers::{
    EventDetails, EventDirectory, Group, GroupDirectory, GroupMember, GroupWithMembers,
    RsvpRepository, UserDirectory, UserProfile, Venue,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Directory over the `users`, `groups`, `group_members`, `events` and
/// `event_rsvps` tables.
///
/// One value implements all four directory traits, so the same clone can be
/// handed to each slot of the environment.
#[derive(Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    /// Create a directory over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_event(row: &PgRow) -> Result<EventDetails> {
    let latitude: Option<f64> = row.try_get("latitude").map_err(corrupt_row)?;
    let longitude: Option<f64> = row.try_get("longitude").map_err(corrupt_row)?;
    let capacity = row
        .try_get::<Option<i32>, _>("capacity")
        .map_err(corrupt_row)?
        .map(u32::try_from)
        .transpose()
        .map_err(corrupt_row)?;
    let visibility: Visibility = row
        .try_get::<String, _>("visibility")
        .map_err(corrupt_row)?
        .parse()
        .map_err(corrupt_row)?;
    let group_id: Option<Uuid> = row.try_get("group_id").map_err(corrupt_row)?;
    let host_id = UserId::from_uuid(row.try_get("host_id").map_err(corrupt_row)?);

    let event = Event {
        id: EventId::from_uuid(row.try_get("id").map_err(corrupt_row)?),
        host_id,
        group_id: group_id.map(GroupId::from_uuid),
        title: row.try_get("title").map_err(corrupt_row)?,
        coordinates: latitude
            .zip(longitude)
            .map(|(latitude, longitude)| Coordinates {
                latitude,
                longitude,
            }),
        capacity,
        starts_at: row.try_get("starts_at").map_err(corrupt_row)?,
        ends_at: row.try_get("ends_at").map_err(corrupt_row)?,
        visibility,
    };

    let venue = row
        .try_get::<Option<String>, _>("venue_name")
        .map_err(corrupt_row)?
        .map(|name| -> Result<Venue> {
            Ok(Venue {
                name,
                address: row.try_get("venue_address").map_err(corrupt_row)?,
            })
        })
        .transpose()?;

    let group = match (event.group_id, row.try_get::<Option<String>, _>("group_name")) {
        (Some(id), Ok(Some(name))) => Some(Group { id, name }),
        (_, Err(e)) => return Err(corrupt_row(e)),
        _ => None,
    };

    Ok(EventDetails {
        host: UserProfile {
            user_id: host_id,
            display_name: row.try_get("host_name").map_err(corrupt_row)?,
            email: row.try_get("host_email").map_err(corrupt_row)?,
        },
        event,
        venue,
        group,
    })
}

fn decode_rsvp(row: &PgRow) -> Result<EventRsvp> {
    let status: RsvpStatus = row
        .try_get::<String, _>("status")
        .map_err(corrupt_row)?
        .parse()
        .map_err(corrupt_row)?;
    Ok(EventRsvp {
        event_id: EventId::from_uuid(row.try_get("event_id").map_err(corrupt_row)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(corrupt_row)?),
        status,
        created_at: row.try_get("created_at").map_err(corrupt_row)?,
        updated_at: row.try_get("updated_at").map_err(corrupt_row)?,
    })
}

impl EventDirectory for PostgresDirectory {
    async fn get_event_with_details(&self, event_id: EventId) -> Result<Option<EventDetails>> {
        let row = sqlx::query(
            r"
            SELECT e.id, e.host_id, e.group_id, e.title, e.latitude, e.longitude,
                   e.venue_name, e.venue_address, e.capacity, e.starts_at,
                   e.ends_at, e.visibility,
                   u.display_name AS host_name, u.email AS host_email,
                   g.name AS group_name
            FROM events e
            JOIN users u ON u.id = e.host_id
            LEFT JOIN groups g ON g.id = e.group_id
            WHERE e.id = $1
            ",
        )
        .bind(event_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load event"))?;

        row.as_ref().map(decode_event).transpose()
    }
}

impl RsvpRepository for PostgresDirectory {
    async fn get_event_rsvps(&self, event_id: EventId) -> Result<Vec<EventRsvp>> {
        let rows = sqlx::query(
            r"
            SELECT event_id, user_id, status, created_at, updated_at
            FROM event_rsvps
            WHERE event_id = $1
            ",
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load RSVPs"))?;

        rows.iter().map(decode_rsvp).collect()
    }

    async fn save_rsvp(&self, rsvp: &EventRsvp) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO event_rsvps (event_id, user_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id, user_id)
            DO UPDATE SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(rsvp.event_id.as_uuid())
        .bind(rsvp.user_id.as_uuid())
        .bind(rsvp.status.as_str())
        .bind(rsvp.created_at)
        .bind(rsvp.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to save RSVP"))?;
        Ok(())
    }

    async fn delete_rsvp(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM event_rsvps WHERE event_id = $1 AND user_id = $2")
            .bind(event_id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete RSVP"))?;
        Ok(result.rows_affected() > 0)
    }
}

impl GroupDirectory for PostgresDirectory {
    async fn get_group_with_members(&self, group_id: GroupId) -> Result<Option<GroupWithMembers>> {
        let Some(group) = sqlx::query("SELECT id, name FROM groups WHERE id = $1")
            .bind(group_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load group"))?
        else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r"
            SELECT user_id, role FROM group_members
            WHERE group_id = $1
            ORDER BY joined_at ASC
            ",
        )
        .bind(group_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load group members"))?;

        let members = rows
            .iter()
            .map(|row| -> Result<GroupMember> {
                let role: GroupRole = row
                    .try_get::<String, _>("role")
                    .map_err(corrupt_row)?
                    .parse()
                    .map_err(corrupt_row)?;
                Ok(GroupMember {
                    user_id: UserId::from_uuid(row.try_get("user_id").map_err(corrupt_row)?),
                    role,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(GroupWithMembers {
            group: Group {
                id: group_id,
                name: group.try_get("name").map_err(corrupt_row)?,
            },
            members,
        }))
    }
}

impl UserDirectory for PostgresDirectory {
    async fn get_user_with_profile(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT display_name, email FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load user"))?;

        row.map(|row| -> Result<UserProfile> {
            Ok(UserProfile {
                user_id,
                display_name: row.try_get("display_name").map_err(corrupt_row)?,
                email: row.try_get("email").map_err(corrupt_row)?,
            })
        })
        .transpose()
    }
}
