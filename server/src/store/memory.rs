use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{
    already_paid, duplicate_transaction, event_not_found, missing_reference, no_seats,
    ticket_not_found, Repository, StoreResult,
};
use crate::models::event::average_rating;
use crate::models::{
    Event, EventDetail, EventFilter, EventInput, EventOrdering, Festival, FestivalInput, Payment,
    PaymentConfirmation, Performer, PerformerInput, Review, ReviewFilter, ReviewInput, Ticket,
    TicketInput, TicketUpdate, Venue, VenueInput,
};
use crate::utils::error::AppError;

#[derive(Default)]
struct Tables {
    sequences: HashMap<&'static str, i64>,
    venues: BTreeMap<i64, Venue>,
    performers: BTreeMap<i64, Performer>,
    festivals: BTreeMap<i64, Festival>,
    events: BTreeMap<i64, Event>,
    event_performers: BTreeSet<(i64, i64)>,
    tickets: BTreeMap<i64, Ticket>,
    payments: BTreeMap<i64, Payment>,
    reviews: BTreeMap<i64, Review>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.sequences.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn event_detail(&self, event: &Event) -> EventDetail {
        let performer_ids = self
            .event_performers
            .range((event.id, i64::MIN)..=(event.id, i64::MAX))
            .map(|(_, performer_id)| *performer_id)
            .collect();
        let ratings: Vec<i32> = self
            .reviews
            .values()
            .filter(|review| review.event_id == event.id)
            .map(|review| review.rating)
            .collect();

        EventDetail {
            event: event.clone(),
            performer_ids,
            average_rating: average_rating(&ratings),
        }
    }

    fn check_event_references(&self, input: &EventInput) -> StoreResult<()> {
        let venue_ok = self.venues.contains_key(&input.venue_id);
        let festival_ok = input
            .festival_id
            .map_or(true, |id| self.festivals.contains_key(&id));
        let performers_ok = input
            .performer_ids
            .iter()
            .all(|id| self.performers.contains_key(id));

        if venue_ok && festival_ok && performers_ok {
            Ok(())
        } else {
            Err(missing_reference())
        }
    }

    fn replace_performers(&mut self, event_id: i64, performer_ids: &[i64]) {
        self.event_performers
            .retain(|(linked_event, _)| *linked_event != event_id);
        for performer_id in performer_ids {
            self.event_performers.insert((event_id, *performer_id));
        }
    }

    fn remove_event(&mut self, event_id: i64) -> bool {
        if self.events.remove(&event_id).is_none() {
            return false;
        }
        let ticket_ids: Vec<i64> = self
            .tickets
            .values()
            .filter(|ticket| ticket.event_id == event_id)
            .map(|ticket| ticket.id)
            .collect();
        for ticket_id in ticket_ids {
            self.tickets.remove(&ticket_id);
            self.payments.retain(|_, payment| payment.ticket_id != ticket_id);
        }
        self.reviews.retain(|_, review| review.event_id != event_id);
        self.event_performers
            .retain(|(linked_event, _)| *linked_event != event_id);
        true
    }
}

fn matches_filter(event: &Event, filter: &EventFilter, search: Option<&str>) -> bool {
    if filter.venue.is_some_and(|venue_id| event.venue_id != venue_id) {
        return false;
    }
    if filter
        .festival
        .is_some_and(|festival_id| event.festival_id != Some(festival_id))
    {
        return false;
    }
    if let Some(term) = search {
        let in_title = event.title.to_lowercase().contains(term);
        let in_description = event.description.to_lowercase().contains(term);
        if !in_title && !in_description {
            return false;
        }
    }
    if filter.upcoming && event.starts_at < Utc::now() {
        return false;
    }
    true
}

/// Repository that keeps everything in process memory behind one lock.
///
/// Holding the lock for a whole operation gives the same all-or-nothing
/// behaviour the Postgres backend gets from transactions.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_venues(&self) -> StoreResult<Vec<Venue>> {
        Ok(self.tables.lock().await.venues.values().cloned().collect())
    }

    async fn get_venue(&self, id: i64) -> StoreResult<Option<Venue>> {
        Ok(self.tables.lock().await.venues.get(&id).cloned())
    }

    async fn create_venue(&self, input: &VenueInput) -> StoreResult<Venue> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let venue = Venue {
            id: tables.next_id("venues"),
            name: input.name.clone(),
            address: input.address.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
            created_at: now,
            updated_at: now,
        };
        tables.venues.insert(venue.id, venue.clone());
        Ok(venue)
    }

    async fn update_venue(&self, id: i64, input: &VenueInput) -> StoreResult<Option<Venue>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.venues.get_mut(&id).map(|venue| {
            venue.name = input.name.clone();
            venue.address = input.address.clone();
            venue.latitude = input.latitude;
            venue.longitude = input.longitude;
            venue.updated_at = Utc::now();
            venue.clone()
        }))
    }

    async fn delete_venue(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.venues.remove(&id).is_none() {
            return Ok(false);
        }
        let event_ids: Vec<i64> = tables
            .events
            .values()
            .filter(|event| event.venue_id == id)
            .map(|event| event.id)
            .collect();
        for event_id in event_ids {
            tables.remove_event(event_id);
        }
        Ok(true)
    }

    async fn list_performers(&self) -> StoreResult<Vec<Performer>> {
        Ok(self.tables.lock().await.performers.values().cloned().collect())
    }

    async fn get_performer(&self, id: i64) -> StoreResult<Option<Performer>> {
        Ok(self.tables.lock().await.performers.get(&id).cloned())
    }

    async fn create_performer(&self, input: &PerformerInput) -> StoreResult<Performer> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let performer = Performer {
            id: tables.next_id("performers"),
            name: input.name.clone(),
            bio: input.bio.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.performers.insert(performer.id, performer.clone());
        Ok(performer)
    }

    async fn update_performer(
        &self,
        id: i64,
        input: &PerformerInput,
    ) -> StoreResult<Option<Performer>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.performers.get_mut(&id).map(|performer| {
            performer.name = input.name.clone();
            performer.bio = input.bio.clone();
            performer.updated_at = Utc::now();
            performer.clone()
        }))
    }

    async fn delete_performer(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.performers.remove(&id).is_none() {
            return Ok(false);
        }
        tables
            .event_performers
            .retain(|(_, performer_id)| *performer_id != id);
        Ok(true)
    }

    async fn list_festivals(&self) -> StoreResult<Vec<Festival>> {
        let tables = self.tables.lock().await;
        let mut festivals: Vec<Festival> = tables.festivals.values().cloned().collect();
        festivals.sort_by_key(|festival| (festival.start_date, festival.id));
        Ok(festivals)
    }

    async fn get_festival(&self, id: i64) -> StoreResult<Option<Festival>> {
        Ok(self.tables.lock().await.festivals.get(&id).cloned())
    }

    async fn create_festival(&self, input: &FestivalInput) -> StoreResult<Festival> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let festival = Festival {
            id: tables.next_id("festivals"),
            title: input.title.clone(),
            description: input.description.clone(),
            start_date: input.start_date,
            end_date: input.end_date,
            venue: input.venue.clone(),
            organizer_id: input.organizer_id,
            created_at: now,
            updated_at: now,
        };
        tables.festivals.insert(festival.id, festival.clone());
        Ok(festival)
    }

    async fn update_festival(
        &self,
        id: i64,
        input: &FestivalInput,
    ) -> StoreResult<Option<Festival>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.festivals.get_mut(&id).map(|festival| {
            festival.title = input.title.clone();
            festival.description = input.description.clone();
            festival.start_date = input.start_date;
            festival.end_date = input.end_date;
            festival.venue = input.venue.clone();
            festival.organizer_id = input.organizer_id;
            festival.updated_at = Utc::now();
            festival.clone()
        }))
    }

    async fn delete_festival(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.festivals.remove(&id).is_none() {
            return Ok(false);
        }
        for event in tables.events.values_mut() {
            if event.festival_id == Some(id) {
                event.festival_id = None;
            }
        }
        Ok(true)
    }

    async fn list_events(&self, filter: &EventFilter) -> StoreResult<(Vec<EventDetail>, i64)> {
        let tables = self.tables.lock().await;
        let search = filter.search_term().map(str::to_lowercase);

        let mut matching: Vec<&Event> = tables
            .events
            .values()
            .filter(|event| matches_filter(event, filter, search.as_deref()))
            .collect();
        match filter.ordering {
            EventOrdering::DateAsc => matching.sort_by_key(|e| (e.starts_at, e.id)),
            EventOrdering::DateDesc => {
                matching.sort_by_key(|e| std::cmp::Reverse((e.starts_at, e.id)))
            }
            EventOrdering::PriceAsc => matching.sort_by_key(|e| (e.price, e.id)),
            EventOrdering::PriceDesc => matching.sort_by_key(|e| std::cmp::Reverse((e.price, e.id))),
        }

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.page_size() as usize)
            .map(|event| tables.event_detail(event))
            .collect();
        Ok((page, total))
    }

    async fn get_event(&self, id: i64) -> StoreResult<Option<EventDetail>> {
        let tables = self.tables.lock().await;
        Ok(tables.events.get(&id).map(|event| tables.event_detail(event)))
    }

    async fn create_event(&self, input: &EventInput) -> StoreResult<EventDetail> {
        let mut tables = self.tables.lock().await;
        tables.check_event_references(input)?;

        let now = Utc::now();
        let event = Event {
            id: tables.next_id("events"),
            title: input.title.clone(),
            description: input.description.clone(),
            starts_at: input.starts_at,
            venue_id: input.venue_id,
            price: input.price,
            total_seats: input.total_seats,
            available_seats: input.total_seats,
            festival_id: input.festival_id,
            created_at: now,
            updated_at: now,
        };
        tables.replace_performers(event.id, &input.performer_ids);
        tables.events.insert(event.id, event.clone());
        Ok(tables.event_detail(&event))
    }

    async fn update_event(&self, id: i64, input: &EventInput) -> StoreResult<Option<EventDetail>> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.events.get(&id).cloned() else {
            return Ok(None);
        };
        let available_seats = current.resized_available_seats(input.total_seats)?;
        tables.check_event_references(input)?;

        let updated = Event {
            title: input.title.clone(),
            description: input.description.clone(),
            starts_at: input.starts_at,
            venue_id: input.venue_id,
            price: input.price,
            total_seats: input.total_seats,
            available_seats,
            festival_id: input.festival_id,
            updated_at: Utc::now(),
            ..current
        };
        tables.replace_performers(id, &input.performer_ids);
        tables.events.insert(id, updated.clone());
        Ok(Some(tables.event_detail(&updated)))
    }

    async fn delete_event(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.lock().await.remove_event(id))
    }

    async fn add_performer(&self, event_id: i64, performer_id: i64) -> StoreResult<EventDetail> {
        let mut tables = self.tables.lock().await;
        let Some(event) = tables.events.get(&event_id).cloned() else {
            return Err(event_not_found(event_id));
        };
        if !tables.performers.contains_key(&performer_id) {
            return Err(AppError::NotFound(format!(
                "Performer with id '{performer_id}' was not found"
            )));
        }
        tables.event_performers.insert((event_id, performer_id));
        Ok(tables.event_detail(&event))
    }

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>> {
        Ok(self.tables.lock().await.tickets.values().cloned().collect())
    }

    async fn get_ticket(&self, id: i64) -> StoreResult<Option<Ticket>> {
        Ok(self.tables.lock().await.tickets.get(&id).cloned())
    }

    async fn book_ticket(&self, input: &TicketInput) -> StoreResult<Ticket> {
        let mut tables = self.tables.lock().await;
        let event = tables
            .events
            .get_mut(&input.event_id)
            .ok_or_else(|| event_not_found(input.event_id))?;
        if event.available_seats <= 0 {
            return Err(no_seats(input.event_id));
        }
        event.available_seats -= 1;
        event.updated_at = Utc::now();

        let ticket = Ticket {
            id: tables.next_id("tickets"),
            event_id: input.event_id,
            user_id: input.user_id,
            guest_name: input.guest_name.clone(),
            seat_number: input.seat_number.clone(),
            is_paid: false,
            qr_code: None,
            created_at: Utc::now(),
        };
        tables.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn update_ticket(&self, id: i64, input: &TicketUpdate) -> StoreResult<Option<Ticket>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.tickets.get_mut(&id).map(|ticket| {
            ticket.seat_number = input.seat_number.clone();
            ticket.guest_name = input.guest_name.clone();
            ticket.clone()
        }))
    }

    async fn delete_ticket(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(ticket) = tables.tickets.get(&id) else {
            return Ok(false);
        };
        if ticket.is_paid {
            return Err(already_paid(id));
        }
        let event_id = ticket.event_id;
        tables.tickets.remove(&id);
        if let Some(event) = tables.events.get_mut(&event_id) {
            event.available_seats = (event.available_seats + 1).min(event.total_seats);
            event.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn list_payments(&self) -> StoreResult<Vec<Payment>> {
        Ok(self.tables.lock().await.payments.values().cloned().collect())
    }

    async fn get_payment(&self, id: i64) -> StoreResult<Option<Payment>> {
        Ok(self.tables.lock().await.payments.get(&id).cloned())
    }

    async fn record_payment(
        &self,
        confirmation: &PaymentConfirmation,
        qr_png: Vec<u8>,
    ) -> StoreResult<Payment> {
        let mut tables = self.tables.lock().await;
        let ticket_id = confirmation.ticket_id;

        match tables.tickets.get(&ticket_id) {
            None => return Err(ticket_not_found(ticket_id)),
            Some(ticket) if ticket.is_paid => return Err(already_paid(ticket_id)),
            Some(_) => {}
        }
        if tables
            .payments
            .values()
            .any(|payment| payment.transaction_id == confirmation.transaction_id)
        {
            return Err(duplicate_transaction(&confirmation.transaction_id));
        }

        let payment = Payment {
            id: tables.next_id("payments"),
            ticket_id,
            amount: confirmation.amount,
            payment_method: confirmation.method.clone(),
            transaction_id: confirmation.transaction_id.clone(),
            created_at: Utc::now(),
        };
        if let Some(ticket) = tables.tickets.get_mut(&ticket_id) {
            ticket.is_paid = true;
            ticket.qr_code = Some(qr_png);
        }
        tables.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn list_reviews(&self, filter: &ReviewFilter) -> StoreResult<Vec<Review>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reviews
            .values()
            .filter(|review| filter.event.map_or(true, |id| review.event_id == id))
            .cloned()
            .collect())
    }

    async fn get_review(&self, id: i64) -> StoreResult<Option<Review>> {
        Ok(self.tables.lock().await.reviews.get(&id).cloned())
    }

    async fn create_review(&self, input: &ReviewInput) -> StoreResult<Review> {
        let mut tables = self.tables.lock().await;
        if !tables.events.contains_key(&input.event_id) {
            return Err(missing_reference());
        }
        let review = Review {
            id: tables.next_id("reviews"),
            user_id: input.user_id,
            event_id: input.event_id,
            rating: input.rating,
            comment: input.comment.clone(),
            created_at: Utc::now(),
        };
        tables.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn update_review(&self, id: i64, input: &ReviewInput) -> StoreResult<Option<Review>> {
        let mut tables = self.tables.lock().await;
        if !tables.reviews.contains_key(&id) {
            return Ok(None);
        }
        if !tables.events.contains_key(&input.event_id) {
            return Err(missing_reference());
        }
        Ok(tables.reviews.get_mut(&id).map(|review| {
            review.user_id = input.user_id;
            review.event_id = input.event_id;
            review.rating = input.rating;
            review.comment = input.comment.clone();
            review.clone()
        }))
    }

    async fn delete_review(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.lock().await.reviews.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use rust_decimal::Decimal;

    use super::*;

    async fn seed_event(repo: &MemoryRepository, seats: i32) -> EventDetail {
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
            amount: Decimal::new(1500, 0),
            transaction_id: transaction_id.to_string(),
            method: "esewa".to_string(),
        }
    }

    #[tokio::test]
    async fn test_new_event_has_all_seats_available() {
        let repo = MemoryRepository::new();
        let event = seed_event(&repo, 25).await;
        assert_eq!(event.event.available_seats, 25);
        assert_eq!(event.average_rating, 0.0);
    }

    #[tokio::test]
    async fn test_event_with_unknown_venue_is_rejected() {
        let repo = MemoryRepository::new();
        let result = repo
            .create_event(&EventInput {
                title: "Nowhere".to_string(),
                description: String::new(),
                starts_at: Utc::now(),
                venue_id: 99,
                price: Decimal::ZERO,
                total_seats: 1,
                festival_id: None,
                performer_ids: vec![],
            })
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_concurrent_bookings_for_last_seat() {
        let repo = Arc::new(MemoryRepository::new());
        let event = seed_event(&repo, 1).await;

        let first = {
            let repo = Arc::clone(&repo);
            let input = booking(event.event.id, "A1");
            tokio::spawn(async move { repo.book_ticket(&input).await })
        };
        let second = {
            let repo = Arc::clone(&repo);
            let input = booking(event.event.id, "A2");
            tokio::spawn(async move { repo.book_ticket(&input).await })
        };
        let results = [first.await.unwrap(), second.await.unwrap()];

        let booked = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::CapacityExceeded(_))))
            .count();
        assert_eq!(booked, 1);
        assert_eq!(rejected, 1);

        let event = repo.get_event(event.event.id).await.unwrap().unwrap();
        assert_eq!(event.event.available_seats, 0);
    }

    #[tokio::test]
    async fn test_seats_never_go_negative_under_load() {
        let repo = Arc::new(MemoryRepository::new());
        let event = seed_event(&repo, 10).await;

        let mut handles = Vec::new();
        for i in 0..40 {
            let repo = Arc::clone(&repo);
            let input = booking(event.event.id, &format!("S{i}"));
            handles.push(tokio::spawn(async move { repo.book_ticket(&input).await }));
        }
        let mut booked = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                booked += 1;
            }
        }

        assert_eq!(booked, 10);
        let event = repo.get_event(event.event.id).await.unwrap().unwrap();
        assert_eq!(event.event.available_seats, 0);
        assert_eq!(repo.list_tickets().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_booking_unknown_event() {
        let repo = MemoryRepository::new();
        let result = repo.book_ticket(&booking(404, "A1")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_record_payment_twice_keeps_one_row() {
        let repo = MemoryRepository::new();
        let event = seed_event(&repo, 5).await;
        let ticket = repo.book_ticket(&booking(event.event.id, "B2")).await.unwrap();

        repo.record_payment(&confirmation(ticket.id, "TXN1"), vec![1])
            .await
            .unwrap();
        let second = repo
            .record_payment(&confirmation(ticket.id, "TXN2"), vec![2])
            .await;

        assert!(matches!(second, Err(AppError::AlreadyPaid(_))));
        assert_eq!(repo.list_payments().await.unwrap().len(), 1);
        let ticket = repo.get_ticket(ticket.id).await.unwrap().unwrap();
        assert!(ticket.is_paid);
        assert_eq!(ticket.qr_code, Some(vec![1]));
    }

    #[tokio::test]
    async fn test_reused_transaction_id_leaves_ticket_unpaid() {
        let repo = MemoryRepository::new();
        let event = seed_event(&repo, 5).await;
        let first = repo.book_ticket(&booking(event.event.id, "C1")).await.unwrap();
        let second = repo.book_ticket(&booking(event.event.id, "C2")).await.unwrap();

        repo.record_payment(&confirmation(first.id, "TXN1"), vec![])
            .await
            .unwrap();
        let result = repo
            .record_payment(&confirmation(second.id, "TXN1"), vec![])
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert!(!repo.get_ticket(second.id).await.unwrap().unwrap().is_paid);
    }

    #[tokio::test]
    async fn test_deleting_unpaid_ticket_releases_seat() {
        let repo = MemoryRepository::new();
        let event = seed_event(&repo, 2).await;
        let ticket = repo.book_ticket(&booking(event.event.id, "D1")).await.unwrap();

        assert!(repo.delete_ticket(ticket.id).await.unwrap());
        let event = repo.get_event(event.event.id).await.unwrap().unwrap();
        assert_eq!(event.event.available_seats, 2);
    }

    #[tokio::test]
    async fn test_paid_ticket_cannot_be_deleted() {
        let repo = MemoryRepository::new();
        let event = seed_event(&repo, 2).await;
        let ticket = repo.book_ticket(&booking(event.event.id, "D2")).await.unwrap();
        repo.record_payment(&confirmation(ticket.id, "TXN9"), vec![])
            .await
            .unwrap();

        let result = repo.delete_ticket(ticket.id).await;
        assert!(matches!(result, Err(AppError::AlreadyPaid(_))));
    }

    #[tokio::test]
    async fn test_list_events_filters_and_orders() {
        let repo = MemoryRepository::new();
        let cheap = seed_event(&repo, 5).await;
        let venue_id = cheap.event.venue_id;
        repo.create_event(&EventInput {
            title: "Jazz Evening".to_string(),
            description: String::new(),
            starts_at: Utc::now() + Duration::days(1),
            venue_id,
            price: Decimal::new(3000, 0),
            total_seats: 5,
            festival_id: None,
            performer_ids: vec![],
        })
        .await
        .unwrap();

        let filter = EventFilter {
            ordering: EventOrdering::PriceDesc,
            ..EventFilter::default()
        };
        let (events, total) = repo.list_events(&filter).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(events[0].event.title, "Jazz Evening");

        let filter = EventFilter {
            search: Some("ROCK".to_string()),
            ..EventFilter::default()
        };
        let (events, total) = repo.list_events(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(events[0].event.id, cheap.event.id);
    }

    #[tokio::test]
    async fn test_reviews_feed_average_rating() {
        let repo = MemoryRepository::new();
        let event = seed_event(&repo, 5).await;
        for rating in [5, 4, 4] {
            repo.create_review(&ReviewInput {
                user_id: 1,
                event_id: event.event.id,
                rating,
                comment: None,
            })
            .await
            .unwrap();
        }
        let event = repo.get_event(event.event.id).await.unwrap().unwrap();
        assert_eq!(event.average_rating, 4.3);
    }

    #[tokio::test]
    async fn test_update_missing_review_is_not_found_before_reference_check() {
        let repo = MemoryRepository::new();
        let input = ReviewInput {
            user_id: 1,
            event_id: 404,
            rating: 3,
            comment: None,
        };
        assert!(repo.update_review(77, &input).await.unwrap().is_none());

        let event = seed_event(&repo, 5).await;
        let review = repo
            .create_review(&ReviewInput {
                event_id: event.event.id,
                ..input.clone()
            })
            .await
            .unwrap();
        let result = repo.update_review(review.id, &input).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_deleting_venue_cascades_to_events() {
        let repo = MemoryRepository::new();
        let event = seed_event(&repo, 5).await;
        let ticket = repo.book_ticket(&booking(event.event.id, "E1")).await.unwrap();

        assert!(repo.delete_venue(event.event.venue_id).await.unwrap());
        assert!(repo.get_event(event.event.id).await.unwrap().is_none());
        assert!(repo.get_ticket(ticket.id).await.unwrap().is_none());
    }
}
