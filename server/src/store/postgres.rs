use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::{
    already_paid, duplicate_transaction, event_not_found, no_seats, ticket_not_found, Repository,
    StoreResult,
};
use crate::models::{
    Event, EventDetail, EventFilter, EventInput, EventOrdering, Festival, FestivalInput, Payment,
    PaymentConfirmation, Performer, PerformerInput, Review, ReviewFilter, ReviewInput, Ticket,
    TicketInput, TicketUpdate, Venue, VenueInput,
};
use crate::utils::error::AppError;

const EVENT_DETAIL_SELECT: &str = "SELECT e.id, e.title, e.description, e.starts_at, e.venue_id, \
     e.price, e.total_seats, e.available_seats, e.festival_id, e.created_at, e.updated_at, \
     COALESCE((SELECT ARRAY_AGG(ep.performer_id ORDER BY ep.performer_id) \
               FROM event_performers ep WHERE ep.event_id = e.id), '{}'::BIGINT[]) AS performer_ids, \
     COALESCE((SELECT ROUND(AVG(r.rating)::NUMERIC, 1)::FLOAT8 \
               FROM reviews r WHERE r.event_id = e.id), 0)::FLOAT8 AS average_rating \
     FROM events e";

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Turns constraint violations caused by client input into validation errors.
/// SQLSTATE class 22: a bound value does not fit its column.
const DATA_EXCEPTION_CLASS: &str = "22";

fn map_write_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_foreign_key_violation() {
            return super::missing_reference();
        }
        if db_err.is_check_violation() {
            return AppError::ValidationError(format!(
                "Constraint '{}' was violated",
                db_err.constraint().unwrap_or("unknown")
            ));
        }
        if is_data_exception(db_err.code().as_deref()) {
            return AppError::ValidationError(
                "A value does not fit its column".to_string(),
            );
        }
    }
    AppError::DatabaseError(err)
}

fn is_data_exception(code: Option<&str>) -> bool {
    code.is_some_and(|code| code.starts_with(DATA_EXCEPTION_CLASS))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_event_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &EventFilter) {
    builder.push(" WHERE TRUE");
    if let Some(venue_id) = filter.venue {
        builder.push(" AND e.venue_id = ").push_bind(venue_id);
    }
    if let Some(festival_id) = filter.festival {
        builder.push(" AND e.festival_id = ").push_bind(festival_id);
    }
    if let Some(term) = filter.search_term() {
        let pattern = escape_like(term);
        builder
            .push(" AND (e.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR e.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if filter.upcoming {
        builder.push(" AND e.starts_at >= NOW()");
    }
}

fn order_clause(ordering: EventOrdering) -> &'static str {
    match ordering {
        EventOrdering::DateAsc => " ORDER BY e.starts_at ASC, e.id ASC",
        EventOrdering::DateDesc => " ORDER BY e.starts_at DESC, e.id DESC",
        EventOrdering::PriceAsc => " ORDER BY e.price ASC, e.id ASC",
        EventOrdering::PriceDesc => " ORDER BY e.price DESC, e.id DESC",
    }
}

async fn fetch_event_detail(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<EventDetail>, sqlx::Error> {
    let sql = format!("{EVENT_DETAIL_SELECT} WHERE e.id = $1");
    sqlx::query_as::<_, EventDetail>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

async fn replace_performers(
    conn: &mut PgConnection,
    event_id: i64,
    performer_ids: &[i64],
) -> StoreResult<()> {
    sqlx::query("DELETE FROM event_performers WHERE event_id = $1")
        .bind(event_id)
        .execute(&mut *conn)
        .await?;

    if !performer_ids.is_empty() {
        sqlx::query(
            "INSERT INTO event_performers (event_id, performer_id) \
             SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
        )
        .bind(event_id)
        .bind(performer_ids)
        .execute(&mut *conn)
        .await
        .map_err(map_write_error)?;
    }
    Ok(())
}

#[async_trait]
impl Repository for PgRepository {
    async fn list_venues(&self) -> StoreResult<Vec<Venue>> {
        let venues = sqlx::query_as::<_, Venue>("SELECT * FROM venues ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(venues)
    }

    async fn get_venue(&self, id: i64) -> StoreResult<Option<Venue>> {
        let venue = sqlx::query_as::<_, Venue>("SELECT * FROM venues WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(venue)
    }

    async fn create_venue(&self, input: &VenueInput) -> StoreResult<Venue> {
        let venue = sqlx::query_as::<_, Venue>(
            "INSERT INTO venues (name, address, latitude, longitude) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&input.name)
        .bind(&input.address)
        .bind(input.latitude)
        .bind(input.longitude)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(venue)
    }

    async fn update_venue(&self, id: i64, input: &VenueInput) -> StoreResult<Option<Venue>> {
        let venue = sqlx::query_as::<_, Venue>(
            "UPDATE venues SET name = $2, address = $3, latitude = $4, longitude = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(input.latitude)
        .bind(input.longitude)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(venue)
    }

    async fn delete_venue(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM venues WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_performers(&self) -> StoreResult<Vec<Performer>> {
        let performers = sqlx::query_as::<_, Performer>("SELECT * FROM performers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(performers)
    }

    async fn get_performer(&self, id: i64) -> StoreResult<Option<Performer>> {
        let performer = sqlx::query_as::<_, Performer>("SELECT * FROM performers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(performer)
    }

    async fn create_performer(&self, input: &PerformerInput) -> StoreResult<Performer> {
        let performer = sqlx::query_as::<_, Performer>(
            "INSERT INTO performers (name, bio) VALUES ($1, $2) RETURNING *",
        )
        .bind(&input.name)
        .bind(&input.bio)
        .fetch_one(&self.pool)
        .await?;
        Ok(performer)
    }

    async fn update_performer(
        &self,
        id: i64,
        input: &PerformerInput,
    ) -> StoreResult<Option<Performer>> {
        let performer = sqlx::query_as::<_, Performer>(
            "UPDATE performers SET name = $2, bio = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.bio)
        .fetch_optional(&self.pool)
        .await?;
        Ok(performer)
    }

    async fn delete_performer(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM performers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_festivals(&self) -> StoreResult<Vec<Festival>> {
        let festivals =
            sqlx::query_as::<_, Festival>("SELECT * FROM festivals ORDER BY start_date, id")
                .fetch_all(&self.pool)
                .await?;
        Ok(festivals)
    }

    async fn get_festival(&self, id: i64) -> StoreResult<Option<Festival>> {
        let festival = sqlx::query_as::<_, Festival>("SELECT * FROM festivals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(festival)
    }

    async fn create_festival(&self, input: &FestivalInput) -> StoreResult<Festival> {
        let festival = sqlx::query_as::<_, Festival>(
            "INSERT INTO festivals (title, description, start_date, end_date, venue, organizer_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.venue)
        .bind(input.organizer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(festival)
    }

    async fn update_festival(
        &self,
        id: i64,
        input: &FestivalInput,
    ) -> StoreResult<Option<Festival>> {
        let festival = sqlx::query_as::<_, Festival>(
            "UPDATE festivals SET title = $2, description = $3, start_date = $4, end_date = $5, \
             venue = $6, organizer_id = $7, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.venue)
        .bind(input.organizer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(festival)
    }

    async fn delete_festival(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM festivals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_events(&self, filter: &EventFilter) -> StoreResult<(Vec<EventDetail>, i64)> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events e");
        push_event_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(EVENT_DETAIL_SELECT);
        push_event_filters(&mut query, filter);
        query.push(order_clause(filter.ordering));
        query
            .push(" LIMIT ")
            .push_bind(i64::from(filter.page_size()))
            .push(" OFFSET ")
            .push_bind(filter.offset());

        let events = query
            .build_query_as::<EventDetail>()
            .fetch_all(&self.pool)
            .await?;
        Ok((events, total))
    }

    async fn get_event(&self, id: i64) -> StoreResult<Option<EventDetail>> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_event_detail(&mut conn, id).await?)
    }

    async fn create_event(&self, input: &EventInput) -> StoreResult<EventDetail> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO events (title, description, starts_at, venue_id, price, total_seats, \
             available_seats, festival_id) VALUES ($1, $2, $3, $4, $5, $6, $6, $7) RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.starts_at)
        .bind(input.venue_id)
        .bind(input.price)
        .bind(input.total_seats)
        .bind(input.festival_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        replace_performers(&mut tx, id, &input.performer_ids).await?;

        let detail = fetch_event_detail(&mut tx, id)
            .await?
            .ok_or_else(|| event_not_found(id))?;
        tx.commit().await?;
        Ok(detail)
    }

    async fn update_event(&self, id: i64, input: &EventInput) -> StoreResult<Option<EventDetail>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(current) = current else {
            return Ok(None);
        };
        let available_seats = current.resized_available_seats(input.total_seats)?;

        sqlx::query(
            "UPDATE events SET title = $2, description = $3, starts_at = $4, venue_id = $5, \
             price = $6, total_seats = $7, available_seats = $8, festival_id = $9, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.starts_at)
        .bind(input.venue_id)
        .bind(input.price)
        .bind(input.total_seats)
        .bind(available_seats)
        .bind(input.festival_id)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        replace_performers(&mut tx, id, &input.performer_ids).await?;

        let detail = fetch_event_detail(&mut tx, id).await?;
        tx.commit().await?;
        Ok(detail)
    }

    async fn delete_event(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_performer(&self, event_id: i64, performer_id: i64) -> StoreResult<EventDetail> {
        let mut tx = self.pool.begin().await?;

        let event_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;
        if !event_exists {
            return Err(event_not_found(event_id));
        }

        let inserted = sqlx::query(
            "INSERT INTO event_performers (event_id, performer_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(event_id)
        .bind(performer_id)
        .execute(&mut *tx)
        .await;
        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                return Err(AppError::NotFound(format!(
                    "Performer with id '{performer_id}' was not found"
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let detail = fetch_event_detail(&mut tx, event_id)
            .await?
            .ok_or_else(|| event_not_found(event_id))?;
        tx.commit().await?;
        Ok(detail)
    }

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(tickets)
    }

    async fn get_ticket(&self, id: i64) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn book_ticket(&self, input: &TicketInput) -> StoreResult<Ticket> {
        let mut tx = self.pool.begin().await?;

        // The conditional decrement takes the row lock, so concurrent bookings
        // for the same event queue here and re-check the seat count.
        let reserved: Option<i64> = sqlx::query_scalar(
            "UPDATE events SET available_seats = available_seats - 1, updated_at = NOW() \
             WHERE id = $1 AND available_seats > 0 RETURNING id",
        )
        .bind(input.event_id)
        .fetch_optional(&mut *tx)
        .await?;

        if reserved.is_none() {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
                .bind(input.event_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                no_seats(input.event_id)
            } else {
                event_not_found(input.event_id)
            });
        }

        let ticket = sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets (event_id, user_id, guest_name, seat_number) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(input.event_id)
        .bind(input.user_id)
        .bind(&input.guest_name)
        .bind(&input.seat_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        debug!(ticket_id = ticket.id, event_id = ticket.event_id, "Seat reserved");
        Ok(ticket)
    }

    async fn update_ticket(&self, id: i64, input: &TicketUpdate) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET seat_number = $2, guest_name = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&input.seat_number)
        .bind(&input.guest_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(ticket)
    }

    async fn delete_ticket(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i64, bool)> =
            sqlx::query_as("SELECT event_id, is_paid FROM tickets WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((event_id, is_paid)) = row else {
            return Ok(false);
        };
        if is_paid {
            return Err(already_paid(id));
        }

        sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE events SET available_seats = LEAST(available_seats + 1, total_seats), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_payments(&self) -> StoreResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>("SELECT * FROM payments ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(payments)
    }

    async fn get_payment(&self, id: i64) -> StoreResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    async fn record_payment(
        &self,
        confirmation: &PaymentConfirmation,
        qr_png: Vec<u8>,
    ) -> StoreResult<Payment> {
        let ticket_id = confirmation.ticket_id;
        let mut tx = self.pool.begin().await?;

        let marked: Option<i64> = sqlx::query_scalar(
            "UPDATE tickets SET is_paid = TRUE, qr_code = $2 \
             WHERE id = $1 AND is_paid = FALSE RETURNING id",
        )
        .bind(ticket_id)
        .bind(qr_png)
        .fetch_optional(&mut *tx)
        .await?;

        if marked.is_none() {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tickets WHERE id = $1)")
                    .bind(ticket_id)
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists {
                already_paid(ticket_id)
            } else {
                ticket_not_found(ticket_id)
            });
        }

        let payment = sqlx::query_as::<_, Payment>(
            "INSERT INTO payments (ticket_id, amount, payment_method, transaction_id) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(ticket_id)
        .bind(confirmation.amount)
        .bind(&confirmation.method)
        .bind(&confirmation.transaction_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                duplicate_transaction(&confirmation.transaction_id)
            }
            other => map_write_error(other),
        })?;

        tx.commit().await?;
        Ok(payment)
    }

    async fn list_reviews(&self, filter: &ReviewFilter) -> StoreResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE ($1::BIGINT IS NULL OR event_id = $1) ORDER BY id",
        )
        .bind(filter.event)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn get_review(&self, id: i64) -> StoreResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn create_review(&self, input: &ReviewInput) -> StoreResult<Review> {
        let review = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (user_id, event_id, rating, comment) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(input.user_id)
        .bind(input.event_id)
        .bind(input.rating)
        .bind(&input.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(review)
    }

    async fn update_review(&self, id: i64, input: &ReviewInput) -> StoreResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(
            "UPDATE reviews SET user_id = $2, event_id = $3, rating = $4, comment = $5 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(input.user_id)
        .bind(input.event_id)
        .bind(input.rating)
        .bind(&input.comment)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(review)
    }

    async fn delete_review(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::*;

    async fn seed_event(repo: &PgRepository, seats: i32) -> EventDetail {
        let venue = repo
            .create_venue(&VenueInput {
                name: "Tundikhel".to_string(),
                address: "Kathmandu".to_string(),
                latitude: None,
                longitude: None,
            })
            .await
            .unwrap();
        repo.create_event(&EventInput {
            title: "Open Air".to_string(),
            description: "Rock night".to_string(),
            starts_at: Utc::now() + Duration::days(7),
            venue_id: venue.id,
            price: Decimal::new(1500, 0),
            total_seats: seats,
            festival_id: None,
            performer_ids: vec![],
        })
        .await
        .unwrap()
    }

    fn booking(event_id: i64, seat: &str) -> TicketInput {
        TicketInput {
            event_id,
            seat_number: seat.to_string(),
            user_id: None,
            guest_name: Some("Guest".to_string()),
        }
    }

    fn confirmation(ticket_id: i64, transaction_id: &str) -> PaymentConfirmation {
        PaymentConfirmation {
            ticket_id,
            amount: Decimal::new(150000, 2),
            transaction_id: transaction_id.to_string(),
            method: "esewa".to_string(),
        }
    }

    async fn available_seats(repo: &PgRepository, event_id: i64) -> i32 {
        repo.get_event(event_id)
            .await
            .unwrap()
            .unwrap()
            .event
            .available_seats
    }

    #[test]
    fn test_data_exceptions_are_recognised() {
        assert!(is_data_exception(Some("22001")));
        assert!(is_data_exception(Some("22003")));
        assert!(!is_data_exception(Some("23505")));
        assert!(!is_data_exception(None));
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_last_seat_goes_to_one_of_two_concurrent_bookings(pool: PgPool) {
        let repo = PgRepository::new(pool);
        let event_id = seed_event(&repo, 1).await.event.id;

        let first = tokio::spawn({
            let repo = repo.clone();
            async move { repo.book_ticket(&booking(event_id, "A1")).await }
        });
        let second = tokio::spawn({
            let repo = repo.clone();
            async move { repo.book_ticket(&booking(event_id, "A2")).await }
        });
        let results = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::CapacityExceeded(_)))));
        assert_eq!(available_seats(&repo, event_id).await, 0);
        assert_eq!(repo.list_tickets().await.unwrap().len(), 1);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_seat_count_holds_under_many_bookings(pool: PgPool) {
        let repo = PgRepository::new(pool);
        let event_id = seed_event(&repo, 3).await.event.id;

        let handles: Vec<_> = (0..10)
            .map(|n| {
                let repo = repo.clone();
                let input = booking(event_id, &format!("S{n}"));
                tokio::spawn(async move { repo.book_ticket(&input).await })
            })
            .collect();
        let mut booked = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                booked += 1;
            }
        }

        assert_eq!(booked, 3);
        assert_eq!(available_seats(&repo, event_id).await, 0);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_concurrent_confirmations_record_one_payment(pool: PgPool) {
        let repo = PgRepository::new(pool);
        let event_id = seed_event(&repo, 5).await.event.id;
        let ticket_id = repo.book_ticket(&booking(event_id, "B1")).await.unwrap().id;

        let first = tokio::spawn({
            let repo = repo.clone();
            async move {
                repo.record_payment(&confirmation(ticket_id, "TXN-A"), vec![1])
                    .await
            }
        });
        let second = tokio::spawn({
            let repo = repo.clone();
            async move {
                repo.record_payment(&confirmation(ticket_id, "TXN-B"), vec![2])
                    .await
            }
        });
        let results = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::AlreadyPaid(_)))));
        assert_eq!(repo.list_payments().await.unwrap().len(), 1);
        assert!(repo.get_ticket(ticket_id).await.unwrap().unwrap().is_paid);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_reused_transaction_id_rolls_back(pool: PgPool) {
        let repo = PgRepository::new(pool);
        let event_id = seed_event(&repo, 5).await.event.id;
        let paid = repo.book_ticket(&booking(event_id, "C1")).await.unwrap();
        let other = repo.book_ticket(&booking(event_id, "C2")).await.unwrap();

        repo.record_payment(&confirmation(paid.id, "TXN-1"), vec![1])
            .await
            .unwrap();
        let result = repo
            .record_payment(&confirmation(other.id, "TXN-1"), vec![1])
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert!(!repo.get_ticket(other.id).await.unwrap().unwrap().is_paid);
        assert_eq!(repo.list_payments().await.unwrap().len(), 1);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_oversized_seat_is_a_validation_error(pool: PgPool) {
        let repo = PgRepository::new(pool);
        let event_id = seed_event(&repo, 2).await.event.id;

        let padded = format!("A1{}", " ".repeat(30));
        let result = repo.book_ticket(&booking(event_id, &padded)).await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert_eq!(available_seats(&repo, event_id).await, 2);
    }

    #[test]
    fn test_escape_like_wraps_and_escapes() {
        assert_eq!(escape_like("jazz"), "%jazz%");
        assert_eq!(escape_like("100%_off"), "%100\\%\\_off%");
    }

    #[test]
    fn test_filters_bind_search_twice() {
        let filter = EventFilter {
            venue: Some(2),
            search: Some(" rock ".to_string()),
            upcoming: true,
            ..EventFilter::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events e");
        push_event_filters(&mut builder, &filter);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM events e WHERE TRUE AND e.venue_id = $1 \
             AND (e.title ILIKE $2 OR e.description ILIKE $3) AND e.starts_at >= NOW()"
        );
    }
}
