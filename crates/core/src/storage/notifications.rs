//! Notification storage operations

use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::parse::{datetime_from_secs, parse_content, parse_kind, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::Notification;

const COLUMNS: &str = "id, room_id, user_id, priority, created_at, type, content";

pub struct NotificationStore<'a> {
    conn: &'a Connection,
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        room_id: row.get(1)?,
        user_id: row.get(2)?,
        priority: row.get(3)?,
        created_at: datetime_from_secs(row.get(4)?)?,
        kind: parse_kind(&row.get::<_, String>(5)?)?,
        content: parse_content(&row.get::<_, String>(6)?)?,
    })
}

impl<'a> NotificationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Persist an accepted notification
    pub fn create(&self, notification: &Notification) -> Result<()> {
        let content = serde_json::to_string(&notification.content)?;
        self.conn.execute(
            "INSERT INTO notifications (id, room_id, user_id, priority, created_at, type, content)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                notification.id.to_string(),
                notification.room_id,
                notification.user_id,
                notification.priority,
                notification.created_at.timestamp(),
                notification.kind.as_str(),
                content,
            ],
        )?;
        Ok(())
    }

    /// Find notification by ID
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>> {
        let sql = format!("SELECT {COLUMNS} FROM notifications WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;

        let notification = stmt
            .query_row(params![id.to_string()], notification_from_row)
            .optional()?;

        Ok(notification)
    }

    /// Notifications in any of `rooms` created at or after `since`,
    /// oldest first with ties broken by ID
    pub fn list_for_rooms(
        &self,
        rooms: &[String],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Notification>> {
        if rooms.is_empty() {
            return Ok(Vec::new());
        }

        let since = since.map(|t| t.timestamp()).unwrap_or(i64::MIN);
        let placeholders = (0..rooms.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE created_at >= ?1 AND room_id IN ({placeholders})
             ORDER BY created_at ASC, id ASC"
        );

        let mut args: Vec<&dyn ToSql> = Vec::with_capacity(rooms.len() + 1);
        args.push(&since);
        for room in rooms {
            args.push(room);
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let notifications = stmt
            .query_map(args.as_slice(), notification_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notifications)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::models::{Content, NewNotification, Notification, NotificationType};
    use crate::storage::Database;

    fn post(room: &str, kind: NotificationType, at: i64) -> Notification {
        Notification::accept(
            NewNotification::new(room, kind, Content::text("hello")),
            "@alice:x",
            Utc.timestamp_opt(at, 0).unwrap(),
        )
    }

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();
        let poll = Notification::accept(
            NewNotification::new(
                "!r1:x",
                NotificationType::Poll,
                Content::text("Lunch?")
                    .with_choice("Pizza", "pizza")
                    .with_collapse_key("lunch"),
            )
            .with_priority(3),
            "@alice:x",
            Utc::now(),
        );
        db.notifications().create(&poll).unwrap();

        let found = db.notifications().find_by_id(poll.id).unwrap().unwrap();
        assert_eq!(found, poll);
        assert!(db
            .notifications()
            .find_by_id(uuid::Uuid::now_v7())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_list_filters_rooms() {
        let db = Database::open_in_memory().unwrap();
        db.notifications()
            .create(&post("!r1:x", NotificationType::Panic, 100))
            .unwrap();
        db.notifications()
            .create(&post("!r2:x", NotificationType::Panic, 100))
            .unwrap();
        db.notifications()
            .create(&post("!r3:x", NotificationType::Panic, 100))
            .unwrap();

        let rooms = vec!["!r1:x".to_string(), "!r3:x".to_string()];
        let listed = db.notifications().list_for_rooms(&rooms, None).unwrap();
        let listed_rooms: Vec<_> = listed.iter().map(|n| n.room_id.as_str()).collect();
        assert_eq!(listed_rooms, vec!["!r1:x", "!r3:x"]);

        assert!(db.notifications().list_for_rooms(&[], None).unwrap().is_empty());
    }

    #[test]
    fn test_list_since_inclusive_and_ordered() {
        let db = Database::open_in_memory().unwrap();
        let early = post("!r1:x", NotificationType::Panic, 100);
        let exact = post("!r1:x", NotificationType::Question, 200);
        let later = post("!r1:x", NotificationType::Broadcast, 300);
        for n in [&later, &early, &exact] {
            db.notifications().create(n).unwrap();
        }

        let rooms = vec!["!r1:x".to_string()];
        let since = Utc.timestamp_opt(200, 0).unwrap();
        let listed = db
            .notifications()
            .list_for_rooms(&rooms, Some(since))
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![exact.id, later.id]);

        let all = db.notifications().list_for_rooms(&rooms, None).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));

        let future = since + Duration::days(1);
        assert!(db
            .notifications()
            .list_for_rooms(&rooms, Some(future))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_list_same_second_ordered_by_id() {
        let db = Database::open_in_memory().unwrap();
        let with_id = |id: u128, kind| Notification {
            id: uuid::Uuid::from_u128(id),
            ..post("!r1:x", kind, 500)
        };
        let first = with_id(0x0190_0000_0000_7000_8000_0000_0000_0001, NotificationType::Panic);
        let second = with_id(0x0190_0000_0000_7000_8000_0000_0000_0002, NotificationType::Poll);
        let third = with_id(0x0190_0000_0000_7000_8000_0000_0000_0003, NotificationType::Question);
        for n in [&third, &first, &second] {
            db.notifications().create(n).unwrap();
        }
        db.notifications()
            .create(&post("!r1:x", NotificationType::Broadcast, 499))
            .unwrap();

        let rooms = vec!["!r1:x".to_string()];
        let since = Utc.timestamp_opt(500, 0).unwrap();
        let listed = db
            .notifications()
            .list_for_rooms(&rooms, Some(since))
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
    }
}
