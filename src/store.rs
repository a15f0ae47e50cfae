//! Persistence of the scheduling state over SQLite.
//!
//! The stored format is owned by this module. Each artifact is small and
//! rewritten wholesale on mutation: the card collection and the mistake set
//! as tables, session progress and the best streak as rows of a key-value
//! table. Anything unreadable at load time degrades to a default and the
//! caller reshuffles; a missing or corrupt value is never fatal.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Card, CardRow};
use crate::schema::{cards, mistakes, session_state};

const STUDY_PROGRESS_KEY: &str = "study_progress";
const BEST_STREAK_KEY: &str = "best_streak";
const NEXT_CARD_ID_KEY: &str = "next_card_id";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Study-session progress as persisted: the queue is authoritative, the
/// index hint is advisory.
#[derive(Debug, Serialize, Deserialize)]
pub struct StudyProgress {
    pub current_index_hint: usize,
    pub study_queue: Vec<usize>,
}

/// Everything the scheduler needs to pick up where the last session left
/// off.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub cards: Vec<Card>,
    pub mistakes: Vec<usize>,
    pub progress: Option<StudyProgress>,
    pub best_streak: i32,
    pub next_card_id: i32,
}

pub fn load_snapshot(conn: &mut SqliteConnection) -> Result<Snapshot, StoreError> {
    let rows: Vec<CardRow> = cards::table.order(cards::position.asc()).load(conn)?;
    let loaded: Vec<Card> = rows.into_iter().map(CardRow::into_card).collect();

    let mistake_rows: Vec<i32> = mistakes::table.select(mistakes::position).load(conn)?;

    let progress = match read_state(conn, STUDY_PROGRESS_KEY)? {
        Some(raw) => match serde_json::from_str::<StudyProgress>(&raw) {
            Ok(progress) => Some(progress),
            Err(e) => {
                log::warn!("Discarding unreadable study progress: {}", e);
                None
            }
        },
        None => None,
    };

    let best_streak = read_state(conn, BEST_STREAK_KEY)?
        .and_then(|raw| match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Discarding unreadable best streak {:?}", raw);
                None
            }
        })
        .unwrap_or(0);

    let fallback_next_id = loaded.iter().map(|c| c.card_id).max().map_or(1, |m| m + 1);
    let next_card_id = read_state(conn, NEXT_CARD_ID_KEY)?
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(fallback_next_id);

    Ok(Snapshot {
        cards: loaded,
        mistakes: mistake_rows.into_iter().map(|p| p as usize).collect(),
        progress,
        best_streak,
        next_card_id,
    })
}

/// Rewrites the whole card collection in store order.
pub fn save_cards(conn: &mut SqliteConnection, collection: &[Card]) -> Result<(), StoreError> {
    let rows: Vec<CardRow> = collection
        .iter()
        .enumerate()
        .map(|(position, card)| CardRow::from_card(card, position))
        .collect();
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(cards::table).execute(conn)?;
        diesel::insert_into(cards::table).values(&rows).execute(conn)
    })?;
    Ok(())
}

/// Rewrites the whole mistake set.
pub fn save_mistakes(conn: &mut SqliteConnection, positions: &[usize]) -> Result<(), StoreError> {
    let rows: Vec<_> = positions
        .iter()
        .map(|&p| mistakes::position.eq(p as i32))
        .collect();
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(mistakes::table).execute(conn)?;
        diesel::insert_into(mistakes::table)
            .values(&rows)
            .execute(conn)
    })?;
    Ok(())
}

pub fn save_progress(conn: &mut SqliteConnection, progress: &StudyProgress) -> Result<(), StoreError> {
    let raw = serde_json::to_string(progress).expect("progress serializes");
    write_state(conn, STUDY_PROGRESS_KEY, &raw)
}

pub fn save_best_streak(conn: &mut SqliteConnection, best_streak: i32) -> Result<(), StoreError> {
    write_state(conn, BEST_STREAK_KEY, &best_streak.to_string())
}

pub fn save_next_card_id(conn: &mut SqliteConnection, next_card_id: i32) -> Result<(), StoreError> {
    write_state(conn, NEXT_CARD_ID_KEY, &next_card_id.to_string())
}

/// Drops every persisted artifact, best streak included.
pub fn clear_all(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(cards::table).execute(conn)?;
        diesel::delete(mistakes::table).execute(conn)?;
        diesel::delete(session_state::table).execute(conn)
    })?;
    Ok(())
}

fn read_state(conn: &mut SqliteConnection, key: &str) -> Result<Option<String>, StoreError> {
    session_state::table
        .filter(session_state::key.eq(key))
        .select(session_state::value)
        .first::<String>(conn)
        .optional()
        .map_err(Into::into)
}

fn write_state(conn: &mut SqliteConnection, key: &str, value: &str) -> Result<(), StoreError> {
    diesel::insert_into(session_state::table)
        .values((session_state::key.eq(key), session_state::value.eq(value)))
        .on_conflict(session_state::key)
        .do_update()
        .set(session_state::value.eq(value))
        .execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewCard;
    use chrono::NaiveDate;

    fn connection() -> SqliteConnection {
        use diesel::connection::SimpleConnection;

        let mut conn = SqliteConnection::establish(":memory:").expect("in-memory database");
        conn.batch_execute(include_str!(
            "../migrations/2026-07-14-000000_create_scheduler_tables/up.sql"
        ))
        .expect("schema DDL");
        conn
    }

    fn sample_card(card_id: i32) -> Card {
        let mut card = Card::new(
            card_id,
            NewCard {
                prompt: format!("q{}", card_id),
                response: format!("a{}", card_id),
                media_ref: None,
            },
        );
        card.correct_count = 2;
        card.last_answered_at = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0);
        card
    }

    #[test]
    fn snapshot_round_trips() {
        let mut conn = connection();
        let collection = vec![sample_card(1), sample_card(2), sample_card(3)];

        save_cards(&mut conn, &collection).unwrap();
        save_mistakes(&mut conn, &[2, 0]).unwrap();
        save_progress(
            &mut conn,
            &StudyProgress {
                current_index_hint: 1,
                study_queue: vec![2, 1],
            },
        )
        .unwrap();
        save_best_streak(&mut conn, 9).unwrap();
        save_next_card_id(&mut conn, 4).unwrap();

        let snapshot = load_snapshot(&mut conn).unwrap();
        assert_eq!(snapshot.cards.len(), 3);
        assert_eq!(snapshot.cards[0].card_id, 1);
        assert_eq!(snapshot.cards[0].correct_count, 2);
        let mut stored_mistakes = snapshot.mistakes.clone();
        stored_mistakes.sort_unstable();
        assert_eq!(stored_mistakes, vec![0, 2]);
        assert_eq!(snapshot.progress.unwrap().study_queue, vec![2, 1]);
        assert_eq!(snapshot.best_streak, 9);
        assert_eq!(snapshot.next_card_id, 4);
    }

    #[test]
    fn rewrites_replace_previous_state() {
        let mut conn = connection();
        save_cards(&mut conn, &[sample_card(1), sample_card(2)]).unwrap();
        save_cards(&mut conn, &[sample_card(7)]).unwrap();

        let snapshot = load_snapshot(&mut conn).unwrap();
        assert_eq!(snapshot.cards.len(), 1);
        assert_eq!(snapshot.cards[0].card_id, 7);
        // No stored counter: fall back to one past the highest id.
        assert_eq!(snapshot.next_card_id, 8);
    }

    #[test]
    fn corrupt_progress_degrades_to_none() {
        let mut conn = connection();
        write_state(&mut conn, STUDY_PROGRESS_KEY, "not json").unwrap();
        write_state(&mut conn, BEST_STREAK_KEY, "also not a number").unwrap();

        let snapshot = load_snapshot(&mut conn).unwrap();
        assert!(snapshot.progress.is_none());
        assert_eq!(snapshot.best_streak, 0);
    }

    #[test]
    fn clear_all_leaves_nothing_behind() {
        let mut conn = connection();
        save_cards(&mut conn, &[sample_card(1)]).unwrap();
        save_best_streak(&mut conn, 3).unwrap();
        clear_all(&mut conn).unwrap();

        let snapshot = load_snapshot(&mut conn).unwrap();
        assert!(snapshot.cards.is_empty());
        assert_eq!(snapshot.best_streak, 0);
        assert_eq!(snapshot.next_card_id, 1);
    }
}
