//! # Database Queries
//!
//! This module contains all the SQL queries for interacting with the database.
//! Each function performs a specific database operation.
//!
//! ## Query Organization
//!
//! Queries are grouped by the table they operate on:
//! - `user_*` / `host_profile_*` - Accounts
//! - `listing_*` - Listings and their images
//! - `booking_*` - Bookings and availability
//! - `payment_*` / `refund_issue_*` - Payments and refund reconciliation
//! - `review_*` / `dispute_*` - Post-stay records
//!
//! ## Transactions
//!
//! Writes that must be atomic with a read (booking creation, review plus
//! rating refresh, host profile plus role upgrade) open their own
//! transaction and lock the listing or user row first.
//!
//! ## Error Handling
//!
//! All queries return `Result<T, DatabaseError>`. Common errors:
//! - `NotFound` - Record doesn't exist
//! - `Conflict` - Unique key or exclusion constraint violated
//! - `QueryError` - SQL execution failed

use chrono::NaiveDate;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use tracing::{debug, info};

use super::models::*;
use super::DatabaseError;

const USER_COLUMNS: &str =
    "id, email, name, phone, password_hash, role, suspended, created_at, updated_at";

const LISTING_COLUMNS: &str = "id, host_id, title, description, property_type, province, city, \
    address, price_per_night, cleaning_fee, max_guests, bedrooms, beds, bathrooms, amenities, \
    status, is_active, admin_notes, avg_rating, review_count, created_at, updated_at";

const BOOKING_COLUMNS: &str = "id, listing_id, guest_id, check_in, check_out, guest_count, \
    nightly_rate, nights, subtotal, cleaning_fee, service_fee, total_amount, status, \
    created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, booking_id, amount, currency, method, status, gateway_ref, \
    refund_ref, paid_at, refunded_at, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, booking_id, listing_id, author_id, subject_id, rating, \
    comment, response, responded_at, created_at";

const DISPUTE_COLUMNS: &str = "id, booking_id, opened_by_id, category, description, status, \
    resolution, resolved_by_id, created_at, updated_at, resolved_at";

const REFUND_ISSUE_COLUMNS: &str =
    "id, booking_id, payment_id, amount, trigger, reason, refund_ref, resolved, created_at, resolved_at";

/// Half-open overlap against bookings that still hold their dates.
const OVERLAP_EXISTS_SQL: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM bookings
        WHERE listing_id = $1
          AND status IN ('PENDING', 'CONFIRMED')
          AND check_in < $3
          AND check_out > $2
    )
"#;

// ============================================
// HELPER FUNCTIONS
// ============================================

fn row_to_user(row: &Row) -> Result<UserRecord, DatabaseError> {
    let role: String = row.try_get("role")?;
    Ok(UserRecord {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse()?,
        suspended: row.try_get("suspended")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_host_profile(row: &Row) -> Result<HostProfileRecord, DatabaseError> {
    Ok(HostProfileRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        bio: row.try_get("bio")?,
        bank_name: row.try_get("bank_name")?,
        account_number: row.try_get("account_number")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_listing(row: &Row) -> Result<ListingRecord, DatabaseError> {
    let property_type: String = row.try_get("property_type")?;
    let province: String = row.try_get("province")?;
    let status: String = row.try_get("status")?;
    Ok(ListingRecord {
        id: row.try_get("id")?,
        host_id: row.try_get("host_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        property_type: property_type.parse()?,
        province: province.parse()?,
        city: row.try_get("city")?,
        address: row.try_get("address")?,
        price_per_night: row.try_get("price_per_night")?,
        cleaning_fee: row.try_get("cleaning_fee")?,
        max_guests: row.try_get("max_guests")?,
        bedrooms: row.try_get("bedrooms")?,
        beds: row.try_get("beds")?,
        bathrooms: row.try_get("bathrooms")?,
        amenities: row.try_get("amenities")?,
        status: status.parse()?,
        is_active: row.try_get("is_active")?,
        admin_notes: row.try_get("admin_notes")?,
        avg_rating: row.try_get("avg_rating")?,
        review_count: row.try_get("review_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_image(row: &Row) -> Result<ListingImageRecord, DatabaseError> {
    Ok(ListingImageRecord {
        id: row.try_get("id")?,
        listing_id: row.try_get("listing_id")?,
        url: row.try_get("url")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_booking(row: &Row) -> Result<BookingRecord, DatabaseError> {
    let status: String = row.try_get("status")?;
    Ok(BookingRecord {
        id: row.try_get("id")?,
        listing_id: row.try_get("listing_id")?,
        guest_id: row.try_get("guest_id")?,
        check_in: row.try_get("check_in")?,
        check_out: row.try_get("check_out")?,
        guest_count: row.try_get("guest_count")?,
        nightly_rate: row.try_get("nightly_rate")?,
        nights: row.try_get("nights")?,
        subtotal: row.try_get("subtotal")?,
        cleaning_fee: row.try_get("cleaning_fee")?,
        service_fee: row.try_get("service_fee")?,
        total_amount: row.try_get("total_amount")?,
        status: status.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_payment(row: &Row) -> Result<PaymentRecord, DatabaseError> {
    let method: String = row.try_get("method")?;
    let status: String = row.try_get("status")?;
    Ok(PaymentRecord {
        id: row.try_get("id")?,
        booking_id: row.try_get("booking_id")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        method: method.parse()?,
        status: status.parse()?,
        gateway_ref: row.try_get("gateway_ref")?,
        refund_ref: row.try_get("refund_ref")?,
        paid_at: row.try_get("paid_at")?,
        refunded_at: row.try_get("refunded_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_review(row: &Row) -> Result<ReviewRecord, DatabaseError> {
    Ok(ReviewRecord {
        id: row.try_get("id")?,
        booking_id: row.try_get("booking_id")?,
        listing_id: row.try_get("listing_id")?,
        author_id: row.try_get("author_id")?,
        subject_id: row.try_get("subject_id")?,
        rating: row.try_get("rating")?,
        comment: row.try_get("comment")?,
        response: row.try_get("response")?,
        responded_at: row.try_get("responded_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_dispute(row: &Row) -> Result<DisputeRecord, DatabaseError> {
    let category: String = row.try_get("category")?;
    let status: String = row.try_get("status")?;
    Ok(DisputeRecord {
        id: row.try_get("id")?,
        booking_id: row.try_get("booking_id")?,
        opened_by_id: row.try_get("opened_by_id")?,
        category: category.parse()?,
        description: row.try_get("description")?,
        status: status.parse()?,
        resolution: row.try_get("resolution")?,
        resolved_by_id: row.try_get("resolved_by_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        resolved_at: row.try_get("resolved_at")?,
    })
}

fn row_to_refund_issue(row: &Row) -> Result<RefundIssueRecord, DatabaseError> {
    let trigger: String = row.try_get("trigger")?;
    Ok(RefundIssueRecord {
        id: row.try_get("id")?,
        booking_id: row.try_get("booking_id")?,
        payment_id: row.try_get("payment_id")?,
        amount: row.try_get("amount")?,
        trigger: trigger.parse()?,
        reason: row.try_get("reason")?,
        refund_ref: row.try_get("refund_ref")?,
        resolved: row.try_get("resolved")?,
        created_at: row.try_get("created_at")?,
        resolved_at: row.try_get("resolved_at")?,
    })
}

fn collect<T>(
    rows: Vec<Row>,
    convert: fn(&Row) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError> {
    rows.iter().map(convert).collect()
}

// ============================================
// USER QUERIES
// ============================================

pub async fn insert_user(pool: &Pool, user: &UserRecord) -> Result<(), DatabaseError> {
    debug!("Inserting user {}", user.id);

    let client = pool.get().await?;
    client.execute(
        r#"
        INSERT INTO users (
            id, email, name, phone, password_hash, role, suspended, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
        &[
            &user.id,
            &user.email,
            &user.name,
            &user.phone,
            &user.password_hash,
            &user.role.as_str(),
            &user.suspended,
            &user.created_at,
            &user.updated_at,
        ],
    ).await?;

    Ok(())
}

pub async fn get_user(pool: &Pool, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    client.query_opt(sql.as_str(), &[&id]).await?
        .map(|row| row_to_user(&row))
        .transpose()
}

pub async fn get_user_by_email(
    pool: &Pool,
    email: &str,
) -> Result<Option<UserRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
    client.query_opt(sql.as_str(), &[&email]).await?
        .map(|row| row_to_user(&row))
        .transpose()
}

pub async fn list_users(
    pool: &Pool,
    limit: i64,
    offset: i64,
) -> Result<Vec<UserRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        "SELECT {} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        USER_COLUMNS
    );
    let rows = client.query(sql.as_str(), &[&limit, &offset]).await?;
    collect(rows, row_to_user)
}

pub async fn set_user_suspended(
    pool: &Pool,
    id: Uuid,
    suspended: bool,
) -> Result<UserRecord, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        "UPDATE users SET suspended = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        USER_COLUMNS
    );
    let row = client.query_opt(sql.as_str(), &[&id, &suspended]).await?
        .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;

    info!("User {} suspended={}", id, suspended);
    row_to_user(&row)
}

pub async fn set_user_role(
    pool: &Pool,
    id: Uuid,
    role: UserRole,
) -> Result<UserRecord, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        USER_COLUMNS
    );
    let row = client.query_opt(sql.as_str(), &[&id, &role.as_str()]).await?
        .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
    row_to_user(&row)
}

/// Create a host profile and upgrade the owner to HOST in one transaction.
///
/// Admins keep their role.
pub async fn create_host_profile(
    pool: &Pool,
    profile: &HostProfileRecord,
) -> Result<UserRecord, DatabaseError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    tx.execute(
        r#"
        INSERT INTO host_profiles (id, user_id, bio, bank_name, account_number, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
        &[
            &profile.id,
            &profile.user_id,
            &profile.bio,
            &profile.bank_name,
            &profile.account_number,
            &profile.created_at,
        ],
    ).await?;

    let sql = format!(
        r#"
        UPDATE users
        SET role = CASE WHEN role = 'ADMIN' THEN role ELSE 'HOST' END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        USER_COLUMNS
    );
    let row = tx.query_opt(sql.as_str(), &[&profile.user_id]).await?
        .ok_or_else(|| DatabaseError::NotFound(format!("user {}", profile.user_id)))?;
    let user = row_to_user(&row)?;

    tx.commit().await?;

    info!("Host profile created for user {}", profile.user_id);
    Ok(user)
}

pub async fn get_host_profile(
    pool: &Pool,
    user_id: Uuid,
) -> Result<Option<HostProfileRecord>, DatabaseError> {
    let client = pool.get().await?;
    client.query_opt(
        r#"
        SELECT id, user_id, bio, bank_name, account_number, created_at
        FROM host_profiles
        WHERE user_id = $1
        "#,
        &[&user_id],
    ).await?
        .map(|row| row_to_host_profile(&row))
        .transpose()
}

// ============================================
// LISTING QUERIES
// ============================================

/// Insert a listing together with its image URLs.
pub async fn insert_listing(
    pool: &Pool,
    listing: &ListingRecord,
    images: &[ListingImageRecord],
) -> Result<(), DatabaseError> {
    debug!("Inserting listing {} for host {}", listing.id, listing.host_id);

    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    tx.execute(
        r#"
        INSERT INTO listings (
            id, host_id, title, description, property_type, province, city, address,
            price_per_night, cleaning_fee, max_guests, bedrooms, beds, bathrooms, amenities,
            status, is_active, admin_notes, avg_rating, review_count, created_at, updated_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
            $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
        )
        "#,
        &[
            &listing.id,
            &listing.host_id,
            &listing.title,
            &listing.description,
            &listing.property_type.as_str(),
            &listing.province.as_str(),
            &listing.city,
            &listing.address,
            &listing.price_per_night,
            &listing.cleaning_fee,
            &listing.max_guests,
            &listing.bedrooms,
            &listing.beds,
            &listing.bathrooms,
            &listing.amenities,
            &listing.status.as_str(),
            &listing.is_active,
            &listing.admin_notes,
            &listing.avg_rating,
            &listing.review_count,
            &listing.created_at,
            &listing.updated_at,
        ],
    ).await?;

    for image in images {
        tx.execute(
            "INSERT INTO listing_images (id, listing_id, url, created_at) VALUES ($1, $2, $3, $4)",
            &[&image.id, &image.listing_id, &image.url, &image.created_at],
        ).await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn get_listing(pool: &Pool, id: Uuid) -> Result<Option<ListingRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!("SELECT {} FROM listings WHERE id = $1", LISTING_COLUMNS);
    client.query_opt(sql.as_str(), &[&id]).await?
        .map(|row| row_to_listing(&row))
        .transpose()
}

pub async fn list_listing_images(
    pool: &Pool,
    listing_id: Uuid,
) -> Result<Vec<ListingImageRecord>, DatabaseError> {
    let client = pool.get().await?;
    let rows = client.query(
        r#"
        SELECT id, listing_id, url, created_at
        FROM listing_images
        WHERE listing_id = $1
        ORDER BY created_at
        "#,
        &[&listing_id],
    ).await?;
    collect(rows, row_to_image)
}

/// Search bookable listings. Returns one page and the total match count.
pub async fn search_listings(
    pool: &Pool,
    filter: &ListingFilter,
) -> Result<(Vec<ListingRecord>, i64), DatabaseError> {
    debug!("Searching listings: {:?}", filter);

    let client = pool.get().await?;

    // City matching uses strpos so user input is never a LIKE pattern.
    let predicate = r#"
        status = 'APPROVED' AND is_active
          AND ($1::text IS NULL OR strpos(lower(city), lower($1)) > 0)
          AND ($2::text IS NULL OR property_type = $2)
          AND ($3::bigint IS NULL OR price_per_night >= $3)
          AND ($4::bigint IS NULL OR price_per_night <= $4)
    "#;
    let order_by = match filter.sort {
        ListingSort::Newest => "created_at DESC",
        ListingSort::PriceAsc => "price_per_night ASC, created_at DESC",
        ListingSort::PriceDesc => "price_per_night DESC, created_at DESC",
        ListingSort::Rating => "avg_rating DESC, review_count DESC, created_at DESC",
    };

    let property_type = filter.property_type.map(|p| p.as_str());

    let count_sql = format!("SELECT COUNT(*) FROM listings WHERE {}", predicate);
    let total: i64 = client.query_one(
        count_sql.as_str(),
        &[&filter.city, &property_type, &filter.min_price, &filter.max_price],
    ).await?.try_get(0)?;

    let page_sql = format!(
        "SELECT {} FROM listings WHERE {} ORDER BY {} LIMIT $5 OFFSET $6",
        LISTING_COLUMNS, predicate, order_by
    );
    let rows = client.query(
        page_sql.as_str(),
        &[
            &filter.city,
            &property_type,
            &filter.min_price,
            &filter.max_price,
            &filter.limit,
            &filter.offset,
        ],
    ).await?;

    Ok((collect(rows, row_to_listing)?, total))
}

pub async fn list_host_listings(
    pool: &Pool,
    host_id: Uuid,
) -> Result<Vec<ListingRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        "SELECT {} FROM listings WHERE host_id = $1 ORDER BY created_at DESC",
        LISTING_COLUMNS
    );
    let rows = client.query(sql.as_str(), &[&host_id]).await?;
    collect(rows, row_to_listing)
}

pub async fn list_listings_by_status(
    pool: &Pool,
    status: ListingStatus,
) -> Result<Vec<ListingRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        "SELECT {} FROM listings WHERE status = $1 ORDER BY created_at ASC",
        LISTING_COLUMNS
    );
    let rows = client.query(sql.as_str(), &[&status.as_str()]).await?;
    collect(rows, row_to_listing)
}

pub async fn update_listing_pricing(
    pool: &Pool,
    id: Uuid,
    price_per_night: i64,
    cleaning_fee: i64,
) -> Result<ListingRecord, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        r#"
        UPDATE listings
        SET price_per_night = $2, cleaning_fee = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        LISTING_COLUMNS
    );
    let row = client.query_opt(sql.as_str(), &[&id, &price_per_night, &cleaning_fee]).await?
        .ok_or_else(|| DatabaseError::NotFound(format!("listing {}", id)))?;
    row_to_listing(&row)
}

pub async fn set_listing_active(
    pool: &Pool,
    id: Uuid,
    active: bool,
) -> Result<ListingRecord, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        "UPDATE listings SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        LISTING_COLUMNS
    );
    let row = client.query_opt(sql.as_str(), &[&id, &active]).await?
        .ok_or_else(|| DatabaseError::NotFound(format!("listing {}", id)))?;
    row_to_listing(&row)
}

/// Write a moderation decision.
pub async fn set_listing_moderation(
    pool: &Pool,
    id: Uuid,
    status: ListingStatus,
    active: bool,
    admin_notes: Option<String>,
) -> Result<ListingRecord, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        r#"
        UPDATE listings
        SET status = $2, is_active = $3, admin_notes = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        LISTING_COLUMNS
    );
    let row = client.query_opt(
        sql.as_str(),
        &[&id, &status.as_str(), &active, &admin_notes],
    ).await?
        .ok_or_else(|| DatabaseError::NotFound(format!("listing {}", id)))?;

    info!("Listing {} moderated: {} (active={})", id, status, active);
    row_to_listing(&row)
}

// ============================================
// BOOKING QUERIES
// ============================================

pub async fn has_conflicting_booking(
    pool: &Pool,
    listing_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<bool, DatabaseError> {
    let client = pool.get().await?;
    let row = client.query_one(OVERLAP_EXISTS_SQL, &[&listing_id, &check_in, &check_out]).await?;
    Ok(row.try_get(0)?)
}

/// Insert a PENDING booking if its dates are still free.
///
/// The listing row is locked for the duration of the check, so two
/// requests for the same listing are serialized, and a listing that was
/// deactivated or rejected in the meantime takes no new bookings. The exclusion constraint
/// on `bookings` rejects anything that slips past.
pub async fn insert_booking(pool: &Pool, booking: &BookingRecord) -> Result<(), DatabaseError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let bookable: bool = tx
        .query_opt(
            "SELECT status = 'APPROVED' AND is_active FROM listings WHERE id = $1 FOR UPDATE",
            &[&booking.listing_id],
        )
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("listing {}", booking.listing_id)))?
        .try_get(0)?;

    if !bookable {
        debug!("Booking {} rejected: listing no longer bookable", booking.id);
        return Err(DatabaseError::NotFound(format!("listing {}", booking.listing_id)));
    }

    let clash: bool = tx.query_one(
        OVERLAP_EXISTS_SQL,
        &[&booking.listing_id, &booking.check_in, &booking.check_out],
    ).await?.try_get(0)?;

    if clash {
        debug!("Booking {} rejected: dates taken", booking.id);
        return Err(DatabaseError::Conflict(
            "dates overlap an existing booking".to_string(),
        ));
    }

    tx.execute(
        r#"
        INSERT INTO bookings (
            id, listing_id, guest_id, check_in, check_out, guest_count,
            nightly_rate, nights, subtotal, cleaning_fee, service_fee, total_amount,
            status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
        &[
            &booking.id,
            &booking.listing_id,
            &booking.guest_id,
            &booking.check_in,
            &booking.check_out,
            &booking.guest_count,
            &booking.nightly_rate,
            &booking.nights,
            &booking.subtotal,
            &booking.cleaning_fee,
            &booking.service_fee,
            &booking.total_amount,
            &booking.status.as_str(),
            &booking.created_at,
            &booking.updated_at,
        ],
    ).await?;

    tx.commit().await?;

    info!("Booking {} created for listing {}", booking.id, booking.listing_id);
    Ok(())
}

pub async fn get_booking(pool: &Pool, id: Uuid) -> Result<Option<BookingRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
    client.query_opt(sql.as_str(), &[&id]).await?
        .map(|row| row_to_booking(&row))
        .transpose()
}

/// Compare-and-set a booking's status. `None` means it was not in `from`.
pub async fn transition_booking(
    pool: &Pool,
    id: Uuid,
    from: BookingStatus,
    to: BookingStatus,
) -> Result<Option<BookingRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        r#"
        UPDATE bookings
        SET status = $3, updated_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING {}
        "#,
        BOOKING_COLUMNS
    );
    client.query_opt(sql.as_str(), &[&id, &from.as_str(), &to.as_str()]).await?
        .map(|row| row_to_booking(&row))
        .transpose()
}

/// Move every CONFIRMED booking whose stay has ended to COMPLETED.
pub async fn complete_finished_stays(
    pool: &Pool,
    today: NaiveDate,
) -> Result<Vec<Uuid>, DatabaseError> {
    let client = pool.get().await?;
    let rows = client.query(
        r#"
        UPDATE bookings
        SET status = 'COMPLETED', updated_at = NOW()
        WHERE status = 'CONFIRMED' AND check_out <= $1
        RETURNING id
        "#,
        &[&today],
    ).await?;
    rows.iter()
        .map(|row| row.try_get("id").map_err(DatabaseError::from))
        .collect()
}

pub async fn list_guest_bookings(
    pool: &Pool,
    guest_id: Uuid,
) -> Result<Vec<BookingRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        "SELECT {} FROM bookings WHERE guest_id = $1 ORDER BY created_at DESC",
        BOOKING_COLUMNS
    );
    let rows = client.query(sql.as_str(), &[&guest_id]).await?;
    collect(rows, row_to_booking)
}

pub async fn list_host_bookings(
    pool: &Pool,
    host_id: Uuid,
) -> Result<Vec<BookingRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        r#"
        SELECT {} FROM bookings
        WHERE listing_id IN (SELECT id FROM listings WHERE host_id = $1)
        ORDER BY created_at DESC
        "#,
        BOOKING_COLUMNS
    );
    let rows = client.query(sql.as_str(), &[&host_id]).await?;
    collect(rows, row_to_booking)
}

/// Date ranges still held on a listing that end after `from`.
pub async fn list_booked_ranges(
    pool: &Pool,
    listing_id: Uuid,
    from: NaiveDate,
) -> Result<Vec<StayRange>, DatabaseError> {
    let client = pool.get().await?;
    let rows = client.query(
        r#"
        SELECT check_in, check_out FROM bookings
        WHERE listing_id = $1
          AND status IN ('PENDING', 'CONFIRMED')
          AND check_out > $2
        ORDER BY check_in
        "#,
        &[&listing_id, &from],
    ).await?;
    rows.iter()
        .map(|row| -> Result<StayRange, DatabaseError> {
            Ok(StayRange {
                check_in: row.try_get("check_in")?,
                check_out: row.try_get("check_out")?,
            })
        })
        .collect()
}

// ============================================
// PAYMENT QUERIES
// ============================================

pub async fn get_payment_for_booking(
    pool: &Pool,
    booking_id: Uuid,
) -> Result<Option<PaymentRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!("SELECT {} FROM payments WHERE booking_id = $1", PAYMENT_COLUMNS);
    client.query_opt(sql.as_str(), &[&booking_id]).await?
        .map(|row| row_to_payment(&row))
        .transpose()
}

/// Record a charge. A second payment for the same booking is a `Conflict`.
pub async fn insert_payment(pool: &Pool, payment: &PaymentRecord) -> Result<(), DatabaseError> {
    let client = pool.get().await?;
    client.execute(
        r#"
        INSERT INTO payments (
            id, booking_id, amount, currency, method, status, gateway_ref,
            refund_ref, paid_at, refunded_at, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
        &[
            &payment.id,
            &payment.booking_id,
            &payment.amount,
            &payment.currency,
            &payment.method.as_str(),
            &payment.status.as_str(),
            &payment.gateway_ref,
            &payment.refund_ref,
            &payment.paid_at,
            &payment.refunded_at,
            &payment.created_at,
            &payment.updated_at,
        ],
    ).await?;

    info!("Payment {} recorded for booking {}", payment.id, payment.booking_id);
    Ok(())
}

/// COMPLETED -> REFUNDED. Any other current status is a `Conflict`.
/// Move a COMPLETED payment to REFUNDING. Only one caller can win the
/// claim, so only one refund reaches the gateway.
pub async fn claim_payment_for_refund(
    pool: &Pool,
    payment_id: Uuid,
) -> Result<Option<PaymentRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        r#"
        UPDATE payments
        SET status = 'REFUNDING', updated_at = NOW()
        WHERE id = $1 AND status = 'COMPLETED'
        RETURNING {}
        "#,
        PAYMENT_COLUMNS
    );
    client.query_opt(sql.as_str(), &[&payment_id]).await?
        .map(|row| row_to_payment(&row))
        .transpose()
}

/// Hand a claimed payment back after the gateway refused the refund.
pub async fn release_payment_claim(pool: &Pool, payment_id: Uuid) -> Result<(), DatabaseError> {
    let client = pool.get().await?;
    let released = client.execute(
        r#"
        UPDATE payments
        SET status = 'COMPLETED', updated_at = NOW()
        WHERE id = $1 AND status = 'REFUNDING'
        "#,
        &[&payment_id],
    ).await?;
    if released == 0 {
        return Err(DatabaseError::Conflict(format!("payment {} is not being refunded", payment_id)));
    }
    Ok(())
}

pub async fn mark_payment_refunded(
    pool: &Pool,
    payment_id: Uuid,
    refund_ref: &str,
) -> Result<PaymentRecord, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        r#"
        UPDATE payments
        SET status = 'REFUNDED', refund_ref = $2, refunded_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'REFUNDING'
        RETURNING {}
        "#,
        PAYMENT_COLUMNS
    );
    let row = client.query_opt(sql.as_str(), &[&payment_id, &refund_ref]).await?
        .ok_or_else(|| {
            DatabaseError::Conflict(format!("payment {} is not refundable", payment_id))
        })?;
    row_to_payment(&row)
}

pub async fn insert_refund_issue(
    pool: &Pool,
    issue: &RefundIssueRecord,
) -> Result<(), DatabaseError> {
    let client = pool.get().await?;
    client.execute(
        r#"
        INSERT INTO refund_issues (
            id, booking_id, payment_id, amount, trigger, reason, refund_ref, resolved,
            created_at, resolved_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
        &[
            &issue.id,
            &issue.booking_id,
            &issue.payment_id,
            &issue.amount,
            &issue.trigger.as_str(),
            &issue.reason,
            &issue.refund_ref,
            &issue.resolved,
            &issue.created_at,
            &issue.resolved_at,
        ],
    ).await?;
    Ok(())
}

pub async fn list_open_refund_issues(pool: &Pool) -> Result<Vec<RefundIssueRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        "SELECT {} FROM refund_issues WHERE NOT resolved ORDER BY created_at",
        REFUND_ISSUE_COLUMNS
    );
    let rows = client.query(sql.as_str(), &[]).await?;
    collect(rows, row_to_refund_issue)
}

/// Close all open issues for a booking once its refund went through.
pub async fn resolve_refund_issues(pool: &Pool, booking_id: Uuid) -> Result<u64, DatabaseError> {
    let client = pool.get().await?;
    let closed = client.execute(
        r#"
        UPDATE refund_issues
        SET resolved = TRUE, resolved_at = NOW()
        WHERE booking_id = $1 AND NOT resolved
        "#,
        &[&booking_id],
    ).await?;
    Ok(closed)
}

// ============================================
// REVIEW QUERIES
// ============================================

/// Insert a review and refresh the listing's rating from a fresh aggregate.
pub async fn insert_review(pool: &Pool, review: &ReviewRecord) -> Result<ListingRating, DatabaseError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    tx.query_opt("SELECT id FROM listings WHERE id = $1 FOR UPDATE", &[&review.listing_id])
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("listing {}", review.listing_id)))?;

    tx.execute(
        r#"
        INSERT INTO reviews (
            id, booking_id, listing_id, author_id, subject_id, rating, comment,
            response, responded_at, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
        &[
            &review.id,
            &review.booking_id,
            &review.listing_id,
            &review.author_id,
            &review.subject_id,
            &review.rating,
            &review.comment,
            &review.response,
            &review.responded_at,
            &review.created_at,
        ],
    ).await?;

    let row = tx.query_one(
        r#"
        SELECT COALESCE(AVG(rating), 0)::float8 AS avg_rating, COUNT(*)::int4 AS review_count
        FROM reviews
        WHERE listing_id = $1
        "#,
        &[&review.listing_id],
    ).await?;
    let rating = ListingRating {
        avg_rating: row.try_get("avg_rating")?,
        review_count: row.try_get("review_count")?,
    };

    tx.execute(
        "UPDATE listings SET avg_rating = $2, review_count = $3, updated_at = NOW() WHERE id = $1",
        &[&review.listing_id, &rating.avg_rating, &rating.review_count],
    ).await?;

    tx.commit().await?;

    info!(
        "Review {} saved, listing {} now {:.2} over {} reviews",
        review.id, review.listing_id, rating.avg_rating, rating.review_count
    );
    Ok(rating)
}

pub async fn get_review(pool: &Pool, id: Uuid) -> Result<Option<ReviewRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!("SELECT {} FROM reviews WHERE id = $1", REVIEW_COLUMNS);
    client.query_opt(sql.as_str(), &[&id]).await?
        .map(|row| row_to_review(&row))
        .transpose()
}

pub async fn get_review_for_booking(
    pool: &Pool,
    booking_id: Uuid,
) -> Result<Option<ReviewRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!("SELECT {} FROM reviews WHERE booking_id = $1", REVIEW_COLUMNS);
    client.query_opt(sql.as_str(), &[&booking_id]).await?
        .map(|row| row_to_review(&row))
        .transpose()
}

pub async fn set_review_response(
    pool: &Pool,
    id: Uuid,
    response: &str,
) -> Result<ReviewRecord, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        r#"
        UPDATE reviews
        SET response = $2, responded_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        REVIEW_COLUMNS
    );
    let row = client.query_opt(sql.as_str(), &[&id, &response]).await?
        .ok_or_else(|| DatabaseError::NotFound(format!("review {}", id)))?;
    row_to_review(&row)
}

pub async fn list_listing_reviews(
    pool: &Pool,
    listing_id: Uuid,
    limit: i64,
) -> Result<Vec<ReviewRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        "SELECT {} FROM reviews WHERE listing_id = $1 ORDER BY created_at DESC LIMIT $2",
        REVIEW_COLUMNS
    );
    let rows = client.query(sql.as_str(), &[&listing_id, &limit]).await?;
    collect(rows, row_to_review)
}

// ============================================
// DISPUTE QUERIES
// ============================================

pub async fn insert_dispute(pool: &Pool, dispute: &DisputeRecord) -> Result<(), DatabaseError> {
    let client = pool.get().await?;
    client.execute(
        r#"
        INSERT INTO disputes (
            id, booking_id, opened_by_id, category, description, status,
            resolution, resolved_by_id, created_at, updated_at, resolved_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
        &[
            &dispute.id,
            &dispute.booking_id,
            &dispute.opened_by_id,
            &dispute.category.as_str(),
            &dispute.description,
            &dispute.status.as_str(),
            &dispute.resolution,
            &dispute.resolved_by_id,
            &dispute.created_at,
            &dispute.updated_at,
            &dispute.resolved_at,
        ],
    ).await?;

    info!("Dispute {} opened on booking {}", dispute.id, dispute.booking_id);
    Ok(())
}

pub async fn get_dispute(pool: &Pool, id: Uuid) -> Result<Option<DisputeRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!("SELECT {} FROM disputes WHERE id = $1", DISPUTE_COLUMNS);
    client.query_opt(sql.as_str(), &[&id]).await?
        .map(|row| row_to_dispute(&row))
        .transpose()
}

pub async fn get_dispute_for_booking(
    pool: &Pool,
    booking_id: Uuid,
) -> Result<Option<DisputeRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!("SELECT {} FROM disputes WHERE booking_id = $1", DISPUTE_COLUMNS);
    client.query_opt(sql.as_str(), &[&booking_id]).await?
        .map(|row| row_to_dispute(&row))
        .transpose()
}

/// Close an OPEN dispute. `None` means it was already closed.
pub async fn resolve_dispute(
    pool: &Pool,
    id: Uuid,
    status: DisputeStatus,
    resolution: &str,
    resolved_by: Uuid,
) -> Result<Option<DisputeRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        r#"
        UPDATE disputes
        SET status = $2, resolution = $3, resolved_by_id = $4,
            resolved_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'OPEN'
        RETURNING {}
        "#,
        DISPUTE_COLUMNS
    );
    client.query_opt(sql.as_str(), &[&id, &status.as_str(), &resolution, &resolved_by]).await?
        .map(|row| row_to_dispute(&row))
        .transpose()
}

pub async fn list_disputes(
    pool: &Pool,
    status: Option<DisputeStatus>,
) -> Result<Vec<DisputeRecord>, DatabaseError> {
    let client = pool.get().await?;
    let sql = format!(
        r#"
        SELECT {} FROM disputes
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY created_at DESC
        "#,
        DISPUTE_COLUMNS
    );
    let status = status.map(|s| s.as_str());
    let rows = client.query(sql.as_str(), &[&status]).await?;
    collect(rows, row_to_dispute)
}
