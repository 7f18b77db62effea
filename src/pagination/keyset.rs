//! Keyset pagination over `(timestamp, id)` ordered listings.
//!
//! Rows are totally ordered by their timestamp with the id as tie-breaker,
//! both in the same direction. A page continues strictly after the cursor
//! position. Rows inserted between two page fetches with a key that falls
//! behind the cursor are not seen by that traversal, and a row whose key
//! changes between fetches may show up twice; this is inherent to keyset
//! pagination and callers should not expect snapshot semantics.

#[cfg(test)]
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use super::cursor::{CursorError, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn keyword(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    fn beyond(self) -> &'static str {
        match self {
            Direction::Asc => ">",
            Direction::Desc => "<",
        }
    }
}

/// Default and maximum page size of one listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub default: i64,
    pub max: i64,
}

impl Limits {
    pub const LESSONS: Limits = Limits { default: 20, max: 50 };
    pub const LESSONS_RANGE: Limits = Limits { default: 50, max: 50 };
    pub const LESSONS_MONTH: Limits = Limits { default: 100, max: 100 };
    pub const FEED: Limits = Limits { default: 20, max: 50 };

    /// Out-of-range values are clamped, never rejected.
    pub fn clamp(&self, requested: Option<i64>) -> i64 {
        requested.unwrap_or(self.default).clamp(1, self.max.max(1))
    }
}

/// Anything that can be placed in a keyset ordering.
pub trait Keyed {
    fn position(&self) -> Position;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub after: Option<Position>,
    pub direction: Direction,
}

impl PageRequest {
    #[cfg(test)]
    pub fn first(limit: i64, direction: Direction) -> Self {
        Self {
            limit,
            after: None,
            direction,
        }
    }

    /// Builds a request from raw query parameters. An empty cursor is the same as none.
    pub fn parse(
        limit: Option<i64>,
        cursor: Option<&str>,
        limits: Limits,
        direction: Direction,
    ) -> Result<Self, CursorError> {
        let after = match cursor.filter(|c| !c.is_empty()) {
            Some(token) => Some(Position::decode(token)?),
            None => None,
        };
        Ok(Self {
            limit: limits.clamp(limit),
            after,
            direction,
        })
    }

    #[cfg(test)]
    pub fn after(self, position: Position) -> Self {
        Self {
            after: Some(position),
            ..self
        }
    }

    #[cfg(test)]
    /// Order of two positions under this request's direction.
    pub fn ordering(&self, a: &Position, b: &Position) -> Ordering {
        let natural = a.at.cmp(&b.at).then_with(|| a.id.cmp(&b.id));
        match self.direction {
            Direction::Asc => natural,
            Direction::Desc => natural.reverse(),
        }
    }

    #[cfg(test)]
    /// Whether a row at `position` lies strictly beyond the cursor.
    pub fn admits(&self, position: &Position) -> bool {
        match &self.after {
            Some(after) => self.ordering(position, after) == Ordering::Greater,
            None => true,
        }
    }

    /// Appends ` AND (<cursor predicate>)` when a cursor is present.
    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>, ts_col: &str, id_col: &str) {
        let Some(after) = self.after else {
            return;
        };
        let op = self.direction.beyond();
        qb.push(" AND (")
            .push(ts_col)
            .push(format!(" {op} "))
            .push_bind(after.at)
            .push(" OR (")
            .push(ts_col)
            .push(" = ")
            .push_bind(after.at)
            .push(" AND ")
            .push(id_col)
            .push(format!(" {op} "))
            .push_bind(after.id)
            .push("))");
    }

    /// Appends ` ORDER BY ts, id LIMIT n`.
    pub fn push_order_and_limit(
        &self,
        qb: &mut QueryBuilder<'_, Postgres>,
        ts_col: &str,
        id_col: &str,
    ) {
        let dir = self.direction.keyword();
        qb.push(format!(" ORDER BY {ts_col} {dir}, {id_col} {dir} LIMIT "))
            .push_bind(self.limit);
    }

    #[cfg(test)]
    /// Same selection the SQL fragments express, for rows already in memory.
    pub fn apply<T, I>(&self, rows: I) -> Vec<T>
    where
        T: Keyed,
        I: IntoIterator<Item = T>,
    {
        let mut kept: Vec<T> = rows
            .into_iter()
            .filter(|row| self.admits(&row.position()))
            .collect();
        kept.sort_by(|a, b| self.ordering(&a.position(), &b.position()));
        kept.truncate(usize::try_from(self.limit).unwrap_or(0));
        kept
    }
}

/// `?limit=&cursor=` of a plain newest-first feed.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

impl PageQuery {
    pub fn request(&self, limits: Limits, direction: Direction) -> Result<PageRequest, CursorError> {
        PageRequest::parse(self.limit, self.cursor.as_deref(), limits, direction)
    }

    /// Descending by `(created_at, id)` with the feed limits.
    pub fn newest_first(&self) -> Result<PageRequest, CursorError> {
        self.request(Limits::FEED, Direction::Desc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

impl<T: Keyed> Page<T> {
    /// A continuation cursor is emitted iff the page is full. A last page that
    /// happens to be exactly full therefore costs clients one extra, empty fetch.
    pub fn from_rows(rows: Vec<T>, request: &PageRequest) -> Result<Self, CursorError> {
        let full = i64::try_from(rows.len()).map_or(false, |n| n == request.limit);
        let next_cursor = match rows.last() {
            Some(last) if full => Some(last.position().encode()?),
            _ => None,
        };
        Ok(Self {
            items: rows,
            next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::datetime, Duration, OffsetDateTime};
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq)]
    struct Row(Position);

    impl Keyed for Row {
        fn position(&self) -> Position {
            self.0
        }
    }

    fn rows_with_collisions(n: usize) -> Vec<Row> {
        let base = datetime!(2026-03-02 10:00 UTC);
        (0..n)
            .map(|i| {
                // every three rows share a timestamp
                let at = base + Duration::hours((i / 3) as i64);
                Row(Position::new(at, Uuid::new_v4()))
            })
            .collect()
    }

    fn traverse(rows: &[Row], limit: i64, direction: Direction) -> (Vec<Row>, usize) {
        let mut request = PageRequest::first(limit, direction);
        let mut seen = Vec::new();
        let mut fetches = 0;
        loop {
            fetches += 1;
            let page = Page::from_rows(request.apply(rows.to_vec()), &request).unwrap();
            seen.extend(page.items);
            match page.next_cursor {
                Some(token) => request = request.after(Position::decode(&token).unwrap()),
                None => break,
            }
        }
        (seen, fetches)
    }

    #[test]
    fn limit_is_clamped_not_rejected() {
        let limits = Limits { default: 20, max: 50 };
        assert_eq!(limits.clamp(None), 20);
        assert_eq!(limits.clamp(Some(0)), 1);
        assert_eq!(limits.clamp(Some(-7)), 1);
        assert_eq!(limits.clamp(Some(51)), 50);
        assert_eq!(limits.clamp(Some(i64::MAX)), 50);
        assert_eq!(Limits::LESSONS_MONTH.clamp(Some(100)), 100);
    }

    #[test]
    fn empty_cursor_means_first_page() {
        let req = PageRequest::parse(Some(5), Some(""), Limits::FEED, Direction::Desc).unwrap();
        assert!(req.after.is_none());
        assert_eq!(req.limit, 5);
    }

    #[test]
    fn invalid_cursor_is_reported() {
        let err = PageRequest::parse(None, Some("garbage"), Limits::FEED, Direction::Desc);
        assert!(err.is_err());
    }

    #[test]
    fn descending_traversal_visits_every_row_once_in_order() {
        let rows = rows_with_collisions(23);
        let (seen, _) = traverse(&rows, 4, Direction::Desc);
        assert_eq!(seen.len(), rows.len());

        let mut expected = rows.clone();
        expected.sort_by(|a, b| b.0.at.cmp(&a.0.at).then_with(|| b.0.id.cmp(&a.0.id)));
        assert_eq!(seen, expected);
    }

    #[test]
    fn ascending_traversal_visits_every_row_once_in_order() {
        let rows = rows_with_collisions(17);
        let (seen, _) = traverse(&rows, 5, Direction::Asc);
        let mut expected = rows.clone();
        expected.sort_by(|a, b| a.0.at.cmp(&b.0.at).then_with(|| a.0.id.cmp(&b.0.id)));
        assert_eq!(seen, expected);
    }

    #[test]
    fn exactly_full_last_page_needs_one_more_fetch() {
        let rows = rows_with_collisions(6);
        let (seen, fetches) = traverse(&rows, 3, Direction::Desc);
        assert_eq!(seen.len(), 6);
        assert_eq!(fetches, 3);
    }

    #[test]
    fn short_page_has_no_cursor() {
        let rows = rows_with_collisions(2);
        let req = PageRequest::first(5, Direction::Desc);
        let page = Page::from_rows(req.apply(rows), &req).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next_cursor.is_none());

        let empty: Page<Row> = Page::from_rows(Vec::new(), &req).unwrap();
        assert!(empty.items.is_empty());
        assert!(empty.next_cursor.is_none());
    }

    #[test]
    fn cursor_points_at_last_row() {
        let rows = rows_with_collisions(5);
        let req = PageRequest::first(2, Direction::Asc);
        let page = Page::from_rows(req.apply(rows), &req).unwrap();
        let token = page.next_cursor.clone().unwrap();
        assert_eq!(Position::decode(&token).unwrap(), page.items[1].0);
    }

    #[test]
    fn admits_is_strict_on_ties() {
        let at = OffsetDateTime::UNIX_EPOCH;
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);
        let desc = PageRequest::first(10, Direction::Desc).after(Position::new(at, high));
        assert!(desc.admits(&Position::new(at, low)));
        assert!(!desc.admits(&Position::new(at, high)));
        assert!(!desc.admits(&Position::new(at + Duration::SECOND, low)));

        let asc = PageRequest::first(10, Direction::Asc).after(Position::new(at, low));
        assert!(asc.admits(&Position::new(at, high)));
        assert!(!asc.admits(&Position::new(at, low)));
        assert!(!asc.admits(&Position::new(at - Duration::SECOND, high)));
    }

    #[test]
    fn sql_fragments_follow_direction() {
        let at = datetime!(2026-03-02 10:00 UTC);
        let req = PageRequest::first(10, Direction::Desc).after(Position::new(at, Uuid::nil()));
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM lessons l WHERE TRUE");
        req.push_predicate(&mut qb, "l.starts_at", "l.id");
        req.push_order_and_limit(&mut qb, "l.starts_at", "l.id");
        assert_eq!(
            qb.sql(),
            "SELECT id FROM lessons l WHERE TRUE AND (l.starts_at < $1 OR (l.starts_at = $2 AND l.id < $3)) \
             ORDER BY l.starts_at DESC, l.id DESC LIMIT $4"
        );

        let first = PageRequest::first(10, Direction::Asc);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM payments p WHERE TRUE");
        first.push_predicate(&mut qb, "p.created_at", "p.id");
        first.push_order_and_limit(&mut qb, "p.created_at", "p.id");
        assert_eq!(
            qb.sql(),
            "SELECT id FROM payments p WHERE TRUE ORDER BY p.created_at ASC, p.id ASC LIMIT $1"
        );
    }
}
